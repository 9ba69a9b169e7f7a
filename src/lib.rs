pub mod config;
pub mod engine_config;
pub mod models;
pub mod pipeline;
pub mod response_cache;
pub mod stats;
pub mod engine;
pub mod service;

use std::path::Path;
use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing_subscriber::EnvFilter;

use engine::TriageEngine;
use engine_config::{ConfigError, EngineConfig};
use service::TriageService;

/// Line-oriented triage loop over stdin/stdout.
///
/// Each input line is a query; each output line is a JSON response.
/// `/stats`, `/health`, `/reload <path>` and `/quit` are commands.
pub fn run() {
    // CARELINE_LOG, then RUST_LOG, then the build default
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_env(config::LOG_ENV)
                .or_else(|_| EnvFilter::try_from_default_env())
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .init();

    tracing::info!("{} starting v{}", config::APP_NAME, config::APP_VERSION);

    let path = config::config_path();
    let engine = match load_config(&path).map_err(engine::EngineError::from).and_then(TriageEngine::from_config) {
        Ok(engine) => Arc::new(engine),
        Err(e) => {
            tracing::error!(error = %e, config = %path.display(), "Engine failed to start");
            std::process::exit(1);
        }
    };

    let runtime = match tokio::runtime::Builder::new_multi_thread().enable_all().build() {
        Ok(rt) => rt,
        Err(e) => {
            tracing::error!(error = %e, "Failed to build async runtime");
            std::process::exit(1);
        }
    };

    if let Err(e) = runtime.block_on(serve(TriageService::new(engine))) {
        tracing::error!(error = %e, "Input loop ended with error");
        std::process::exit(1);
    }
    tracing::info!("{} stopped", config::APP_NAME);
}

/// Config file if present, otherwise defaults pointing into the app data dir.
fn load_config(path: &Path) -> Result<EngineConfig, ConfigError> {
    if path.exists() {
        return EngineConfig::load(path);
    }
    tracing::info!(config = %path.display(), "No config file, using defaults");
    let mut config = EngineConfig::default();
    config.classifier.artifact_path = Some(config::models_dir().join("classifier.json"));
    config.knowledge_base.corpus_path = Some(config::knowledge_dir().join("corpus.jsonl"));
    config.validate()?;
    Ok(config)
}

async fn serve(service: TriageService) -> std::io::Result<()> {
    let pruner = {
        let engine = Arc::clone(service.engine());
        let every = std::time::Duration::from_secs(engine.config().cache.ttl_secs);
        tokio::spawn(async move {
            let mut tick = tokio::time::interval(every);
            tick.tick().await;
            loop {
                tick.tick().await;
                let removed = engine.prune_cache();
                if removed > 0 {
                    tracing::debug!(removed, "Pruned expired cache entries");
                }
            }
        })
    };

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut out = tokio::io::stdout();

    while let Some(line) = lines.next_line().await? {
        let reply = match line.trim() {
            "/quit" => break,
            "/stats" => serde_json::to_string(&service.stats().await),
            "/health" => serde_json::to_string(&service.health().await),
            cmd if cmd.starts_with("/reload ") => {
                let target = Path::new(cmd.trim_start_matches("/reload ").trim());
                let outcome = match service.engine().reload_model(target) {
                    Ok(version) => serde_json::json!({ "reloaded": true, "model_version": version }),
                    Err(e) => serde_json::json!({ "reloaded": false, "error": e.to_string() }),
                };
                serde_json::to_string(&outcome)
            }
            _ => match service.handle_text(&line).await {
                Ok(response) => serde_json::to_string(&response),
                Err(e) => serde_json::to_string(&serde_json::json!({ "error": e.to_string() })),
            },
        };
        let reply = reply.map_err(std::io::Error::other)?;
        out.write_all(reply.as_bytes()).await?;
        out.write_all(b"\n").await?;
        out.flush().await?;
    }

    pruner.abort();
    service.close();
    Ok(())
}

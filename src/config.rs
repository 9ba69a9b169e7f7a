use std::path::PathBuf;

/// Application-level constants
pub const APP_NAME: &str = "Careline";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Environment variable naming the engine configuration file.
pub const CONFIG_ENV: &str = "CARELINE_CONFIG";

/// Environment variable holding a tracing filter directive.
pub const LOG_ENV: &str = "CARELINE_LOG";

/// Get the application data directory
/// ~/Careline/ on all platforms, or ./Careline when no home directory exists
pub fn app_data_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_NAME)
}

/// Get the models directory (classifier artifacts)
pub fn models_dir() -> PathBuf {
    app_data_dir().join("models")
}

/// Get the knowledge corpus directory
pub fn knowledge_dir() -> PathBuf {
    app_data_dir().join("knowledge")
}

/// Resolve the engine configuration path: `CARELINE_CONFIG` wins,
/// otherwise ~/Careline/engine.json.
pub fn config_path() -> PathBuf {
    match std::env::var_os(CONFIG_ENV) {
        Some(path) if !path.is_empty() => PathBuf::from(path),
        _ => app_data_dir().join("engine.json"),
    }
}

/// Filter used when neither `CARELINE_LOG` nor `RUST_LOG` is set.
pub fn default_log_filter() -> &'static str {
    if cfg!(debug_assertions) {
        "careline_lib=debug,careline=debug,warn"
    } else {
        "careline_lib=info,careline=info,warn"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn app_data_dir_named_after_app() {
        let dir = app_data_dir();
        assert!(dir.ends_with("Careline"));
        if let Some(home) = dirs::home_dir() {
            assert!(dir.starts_with(home));
        }
    }

    #[test]
    fn models_dir_under_app_data() {
        let models = models_dir();
        assert!(models.starts_with(app_data_dir()));
        assert!(models.ends_with("models"));
    }

    #[test]
    fn knowledge_dir_under_app_data() {
        assert!(knowledge_dir().starts_with(app_data_dir()));
    }

    #[test]
    fn app_name_is_careline() {
        assert_eq!(APP_NAME, "Careline");
    }

    #[test]
    fn app_version_matches_cargo() {
        assert_eq!(APP_VERSION, env!("CARGO_PKG_VERSION"));
    }

    #[test]
    fn default_filter_targets_crate() {
        assert!(default_log_filter().contains("careline_lib="));
    }
}

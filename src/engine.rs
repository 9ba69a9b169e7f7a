//! Triage orchestrator.
//!
//! Per request: sanitize → crisis check → cache lookup → classify →
//! context → response chain → commit. Evaluation is side-effect free;
//! the commit step (cache write, counters) runs last and is skipped for
//! a cancelled request. Query text never reaches the logs.

use std::path::Path;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

use crate::engine_config::{ConfigError, EngineConfig, ResponseMode};
use crate::models::{Category, ResponseMethod, TimingBreakdown, TriageResponse};
use crate::pipeline::classify::{CategoryClassifier, ClassifierError, ModelArtifact, ModelHandle};
use crate::pipeline::context::extract_context;
use crate::pipeline::knowledge::{KnowledgeCorpus, KnowledgeError, KnowledgeMatcher};
use crate::pipeline::response::{ResponseChain, ResponseRenderer, SourceInput, TemplateCatalog, TemplateError};
use crate::pipeline::safety::sanitize::sanitize_query;
use crate::pipeline::safety::CrisisDetector;
use crate::pipeline::text;
use crate::response_cache::{CacheEntry, ResponseCache};
use crate::stats::{RequestRecord, StatsSnapshot, UsageStats};

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Classifier model unavailable: {0}")]
    ModelUnavailable(#[source] ClassifierError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Knowledge(#[from] KnowledgeError),

    #[error(transparent)]
    Template(#[from] TemplateError),

    #[error("Request cancelled before commit")]
    Cancelled,
}

/// Readiness report.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HealthStatus {
    pub ready: bool,
    pub model_loaded: bool,
    pub model_version: Option<String>,
    pub knowledge_base_entries: usize,
    pub mode: ResponseMode,
}

/// Where a request is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RequestStage {
    Received,
    Clarified,
    CrisisChecked,
    CrisisResponse,
    CacheChecked,
    CacheHit,
    Classified,
    ContextExtracted,
    ResponseRendered,
}

/// A fully computed request that has not touched shared state yet.
struct Evaluation {
    response: TriageResponse,
    record: RequestRecord,
    cache_put: Option<(String, CacheEntry)>,
    stage: RequestStage,
}

/// Decides, exactly once, whether a request commits or is abandoned.
///
/// The worker claims the commit and the timeout side claims the cancel;
/// whichever `compare_exchange` lands first wins and the other sees it lost.
#[derive(Debug, Default)]
pub struct CommitGate(AtomicU8);

impl CommitGate {
    const PENDING: u8 = 0;
    const COMMITTING: u8 = 1;
    const CANCELLED: u8 = 2;

    pub fn new() -> Self {
        Self::default()
    }

    /// Pending → committing. False if the request was already cancelled.
    pub fn begin_commit(&self) -> bool {
        self.transition(Self::COMMITTING)
    }

    /// Pending → cancelled. False if the commit already started.
    pub fn cancel(&self) -> bool {
        self.transition(Self::CANCELLED)
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire) == Self::CANCELLED
    }

    fn transition(&self, to: u8) -> bool {
        self.0
            .compare_exchange(Self::PENDING, to, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }
}

pub struct TriageEngine {
    config: EngineConfig,
    detector: CrisisDetector,
    classifier: CategoryClassifier,
    matcher: Option<Arc<KnowledgeMatcher>>,
    renderer: Arc<ResponseRenderer>,
    chain: ResponseChain,
    cache: ResponseCache,
    stats: UsageStats,
}

// ═══════════════════════════════════════════════════════════
// Construction
// ═══════════════════════════════════════════════════════════

impl TriageEngine {
    /// Load every configured artifact from disk and build the engine.
    pub fn from_config(config: EngineConfig) -> Result<Self, EngineError> {
        config.validate()?;

        let artifact = match &config.classifier.artifact_path {
            Some(path) => match ModelArtifact::load(path) {
                Ok(artifact) => Some(artifact),
                Err(e) if config.allow_knowledge_base_only => {
                    tracing::warn!(error = %e, "Classifier artifact unusable, continuing knowledge-base only");
                    None
                }
                Err(e) => return Err(EngineError::ModelUnavailable(e)),
            },
            None => None,
        };

        let corpus = match (&config.knowledge_base.corpus_path, config.knowledge_base.enabled) {
            (Some(path), true) => match KnowledgeCorpus::load_jsonl(path, config.knowledge_base.max_entries) {
                Ok(corpus) => Some(corpus),
                // without a model the knowledge base is all there is
                Err(e) if artifact.is_none() => return Err(e.into()),
                Err(e) => {
                    tracing::warn!(error = %e, "Knowledge corpus unavailable, continuing without it");
                    None
                }
            },
            _ => None,
        };

        let catalog = match &config.templates.catalog_path {
            Some(path) => TemplateCatalog::load(path)?,
            None => TemplateCatalog::builtin(),
        };

        Self::from_parts(config, artifact, corpus, catalog)
    }

    /// Build from in-memory parts. Fails without a model unless
    /// knowledge-base-only operation is allowed and a corpus is present.
    pub fn from_parts(
        config: EngineConfig,
        artifact: Option<ModelArtifact>,
        corpus: Option<KnowledgeCorpus>,
        catalog: TemplateCatalog,
    ) -> Result<Self, EngineError> {
        config.validate()?;
        catalog.validate()?;

        let handle = Arc::new(ModelHandle::new(
            config.classifier.smoothing_alpha,
            config.classifier.max_vocabulary,
        ));
        let model_error = match artifact {
            Some(artifact) => handle.install(artifact).err(),
            None => Some(ClassifierError::Unavailable),
        };

        let matcher = match corpus.filter(|_| config.knowledge_base.enabled) {
            Some(corpus) => match KnowledgeMatcher::build(corpus, &config.knowledge_base) {
                Ok(m) => Some(Arc::new(m)),
                Err(e) if model_error.is_some() => return Err(e.into()),
                Err(e) => {
                    tracing::warn!(error = %e, "Knowledge matcher not built");
                    None
                }
            },
            None => None,
        };

        if let Some(e) = model_error {
            if !(config.allow_knowledge_base_only && matcher.is_some()) {
                return Err(EngineError::ModelUnavailable(e));
            }
            tracing::warn!(error = %e, "Starting without a classifier model");
        }

        let renderer = Arc::new(ResponseRenderer::new(Arc::new(catalog)));
        let chain = ResponseChain::for_mode(config.mode, Arc::clone(&renderer), matcher.clone());
        let cache = ResponseCache::new(config.cache.capacity, Duration::from_secs(config.cache.ttl_secs));

        let engine = Self {
            detector: CrisisDetector::new(&config.crisis),
            classifier: CategoryClassifier::new(handle, &config.classifier),
            matcher,
            renderer,
            chain,
            cache,
            stats: UsageStats::new(),
            config,
        };

        let version = engine.model_version();
        tracing::info!(
            mode = %engine.config.mode,
            model_version = version.as_deref().unwrap_or("none"),
            knowledge_entries = engine.knowledge_base_entries(),
            templates = engine.renderer.catalog().version.as_str(),
            "Triage engine ready"
        );
        Ok(engine)
    }
}

// ═══════════════════════════════════════════════════════════
// Request path
// ═══════════════════════════════════════════════════════════

impl TriageEngine {
    /// Triage one query. Never fails: every path ends in a response.
    pub fn handle(&self, query: &str) -> TriageResponse {
        let evaluation = self.evaluate(query);
        self.commit(evaluation)
    }

    /// `handle`, but commits only if the gate is still pending once the
    /// evaluation is done. A cancelled request leaves no trace.
    pub fn handle_guarded(&self, query: &str, gate: &CommitGate) -> Result<TriageResponse, EngineError> {
        let evaluation = self.evaluate(query);
        if !gate.begin_commit() {
            tracing::debug!(
                request_id = %evaluation.response.request_id,
                stage = ?evaluation.stage,
                "Request cancelled, nothing committed"
            );
            return Err(EngineError::Cancelled);
        }
        Ok(self.commit(evaluation))
    }

    fn evaluate(&self, raw: &str) -> Evaluation {
        let started = Instant::now();
        let request_id = Uuid::new_v4();
        let span = tracing::info_span!("triage", %request_id);
        let _guard = span.enter();

        let mut timing = TimingBreakdown::default();
        let mut stage = RequestStage::Received;

        let input = sanitize_query(raw, self.config.max_query_chars);
        if input.was_modified {
            tracing::debug!(modifications = ?input.modifications, "Query sanitized");
        }
        let normalized = text::normalize(&input.text);

        if normalized.is_empty() {
            timing.total_us = micros(started);
            return self.clarifying(request_id, timing);
        }

        // ── crisis: always first, on the untruncated text ──
        let t = Instant::now();
        let assessment = self.detector.assess(raw);
        timing.crisis_us = micros(t);
        advance(&mut stage, RequestStage::CrisisChecked);

        if assessment.is_crisis {
            advance(&mut stage, RequestStage::CrisisResponse);
            timing.total_us = micros(started);
            return Evaluation {
                response: TriageResponse {
                    request_id,
                    response: self.renderer.render_crisis(),
                    category: Some(Category::CrisisMentalHealth),
                    confidence: assessment.confidence,
                    method: ResponseMethod::CrisisDetection,
                    cached: false,
                    cached_from: None,
                    low_confidence: false,
                    secondary: Vec::new(),
                    disclaimer: None,
                    resources: Some(self.renderer.crisis_resources().clone()),
                    timing,
                },
                record: record(ResponseMethod::CrisisDetection, Some(Category::CrisisMentalHealth), false, &timing),
                cache_put: None,
                stage,
            };
        }

        // ── cache ──
        let key = text::fingerprint(&normalized);
        let t = Instant::now();
        let current_version = self.model_version();
        let hit = self
            .cache
            .get(&key)
            .filter(|entry| entry.model_version == current_version);
        timing.cache_us = micros(t);
        advance(&mut stage, RequestStage::CacheChecked);

        if let Some(entry) = hit {
            advance(&mut stage, RequestStage::CacheHit);
            timing.total_us = micros(started);
            return Evaluation {
                response: TriageResponse {
                    request_id,
                    response: entry.response,
                    category: Some(entry.category),
                    confidence: entry.confidence,
                    method: ResponseMethod::Cache,
                    cached: true,
                    cached_from: Some(entry.method),
                    low_confidence: entry.low_confidence,
                    secondary: entry.secondary,
                    disclaimer: Some(entry.disclaimer),
                    resources: None,
                    timing,
                },
                record: record(ResponseMethod::Cache, Some(entry.category), false, &timing),
                cache_put: None,
                stage,
            };
        }

        // ── classify ──
        let t = Instant::now();
        let classification = self
            .classifier
            .classify(&normalized)
            .inspect_err(|e| tracing::debug!(error = %e, "Classification skipped"))
            .ok();
        timing.classify_us = micros(t);
        advance(&mut stage, RequestStage::Classified);

        // ── context ──
        let t = Instant::now();
        let context = extract_context(&normalized);
        timing.context_us = micros(t);
        advance(&mut stage, RequestStage::ContextExtracted);

        // ── respond ──
        let t = Instant::now();
        let output = self.chain.respond(&SourceInput {
            normalized: &normalized,
            classification: classification.as_ref(),
            context: &context,
            seed: text::seed_from_fingerprint(&key),
        });
        timing.render_us = micros(t);
        advance(&mut stage, RequestStage::ResponseRendered);

        let (low_confidence, secondary) = classification
            .as_ref()
            .map_or((true, Vec::new()), |c| (c.low_confidence, c.secondary.clone()));
        let disclaimer = self.renderer.disclaimer().to_string();
        timing.total_us = micros(started);

        let entry = CacheEntry {
            response: output.text.clone(),
            category: output.category,
            confidence: output.confidence,
            method: output.method,
            disclaimer: disclaimer.clone(),
            low_confidence,
            secondary: secondary.clone(),
            model_version: classification.as_ref().map(|c| c.model_version.clone()),
            created_at: Instant::now(),
        };

        Evaluation {
            response: TriageResponse {
                request_id,
                response: output.text,
                category: Some(output.category),
                confidence: output.confidence,
                method: output.method,
                cached: false,
                cached_from: None,
                low_confidence,
                secondary,
                disclaimer: Some(disclaimer),
                resources: None,
                timing,
            },
            record: record(output.method, Some(output.category), classification.is_some(), &timing),
            cache_put: Some((key, entry)),
            stage,
        }
    }

    /// Empty query: ask for more detail. Never cached.
    fn clarifying(&self, request_id: Uuid, timing: TimingBreakdown) -> Evaluation {
        let mut record = record(ResponseMethod::Fallback, None, false, &timing);
        record.empty_query = true;
        Evaluation {
            response: TriageResponse {
                request_id,
                response: self.renderer.render_clarifying(),
                category: None,
                confidence: 0.0,
                method: ResponseMethod::Fallback,
                cached: false,
                cached_from: None,
                low_confidence: true,
                secondary: Vec::new(),
                disclaimer: Some(self.renderer.disclaimer().to_string()),
                resources: None,
                timing,
            },
            record,
            cache_put: None,
            stage: RequestStage::Clarified,
        }
    }

    fn commit(&self, evaluation: Evaluation) -> TriageResponse {
        let Evaluation {
            response,
            record,
            cache_put,
            stage,
        } = evaluation;

        let mut cached = false;
        if let Some((key, entry)) = cache_put {
            // computed against a model that was swapped out mid-request
            if entry.model_version == self.model_version() {
                self.cache.put(key, entry);
                cached = true;
            }
        }
        self.stats.record(&record);

        tracing::info!(
            request_id = %response.request_id,
            method = %response.method,
            category = response.category.map(|c| c.as_str()).unwrap_or("none"),
            confidence = response.confidence,
            low_confidence = response.low_confidence,
            stage = ?stage,
            stored = cached,
            elapsed_us = response.timing.total_us,
            "Query triaged"
        );
        response
    }
}

// ═══════════════════════════════════════════════════════════
// Introspection & maintenance
// ═══════════════════════════════════════════════════════════

impl TriageEngine {
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn response_timeout(&self) -> Duration {
        Duration::from_millis(self.config.response_timeout_ms)
    }

    pub fn is_model_loaded(&self) -> bool {
        self.classifier.handle().is_loaded()
    }

    pub fn model_version(&self) -> Option<String> {
        self.classifier.handle().current().map(|m| m.version().to_string())
    }

    pub fn knowledge_base_entries(&self) -> usize {
        self.matcher.as_ref().map_or(0, |m| m.len())
    }

    pub fn cache_len(&self) -> usize {
        self.cache.len()
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.stats
            .snapshot(self.cache.len(), self.knowledge_base_entries(), self.model_version())
    }

    pub fn health(&self) -> HealthStatus {
        let model_loaded = self.is_model_loaded();
        HealthStatus {
            ready: model_loaded || self.matcher.is_some(),
            model_loaded,
            model_version: self.model_version(),
            knowledge_base_entries: self.knowledge_base_entries(),
            mode: self.config.mode,
        }
    }

    /// Swap in a new classifier artifact. On success the response cache is
    /// cleared; on failure the previous model keeps serving.
    pub fn reload_model(&self, path: &Path) -> Result<String, EngineError> {
        let snapshot = self
            .classifier
            .handle()
            .load_from_path(path)
            .map_err(EngineError::ModelUnavailable)?;
        self.cache.clear();
        Ok(snapshot.version().to_string())
    }

    /// Drop expired cache entries.
    pub fn prune_cache(&self) -> usize {
        self.cache.prune_expired()
    }

    pub(crate) fn note_discarded(&self) {
        self.stats.record_discarded();
    }
}

fn advance(stage: &mut RequestStage, next: RequestStage) {
    tracing::trace!(from = ?*stage, to = ?next, "Stage");
    *stage = next;
}

fn micros(since: Instant) -> u64 {
    u64::try_from(since.elapsed().as_micros()).unwrap_or(u64::MAX)
}

fn record(method: ResponseMethod, category: Option<Category>, classified: bool, timing: &TimingBreakdown) -> RequestRecord {
    RequestRecord {
        method,
        category,
        classified,
        empty_query: false,
        elapsed_us: timing.total_us,
    }
}

//! Engine configuration bundle.
//!
//! One JSON document carries every tunable: crisis lexicon and thresholds,
//! classifier artifact location, knowledge-base settings, template catalog
//! location, and cache bounds. Every field has a default, so an empty `{}`
//! is a valid (template-only, no-model) configuration that `validate()`
//! accepts but the engine will refuse to start without an artifact.
//!
//! Relative paths are resolved against the directory holding the config file.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::pipeline::text;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Cannot read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Config parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid config: {0}")]
    Invalid(String),
}

// ═══════════════════════════════════════════════════════════
// Response mode
// ═══════════════════════════════════════════════════════════

/// Which response source the engine consults first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseMode {
    /// Classifier category drives a template; knowledge base only on low confidence.
    #[default]
    Template,
    /// Nearest historical answer first; templates when nothing is similar enough.
    KnowledgeBase,
    /// Knowledge base restricted to the classified category, then templates.
    Hybrid,
}

impl std::fmt::Display for ResponseMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Template => write!(f, "template"),
            Self::KnowledgeBase => write!(f, "knowledge_base"),
            Self::Hybrid => write!(f, "hybrid"),
        }
    }
}

// ═══════════════════════════════════════════════════════════
// Sections
// ═══════════════════════════════════════════════════════════

/// A lexicon phrase with a weight in (0, 1].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeightedTerm {
    pub term: String,
    pub weight: f64,
}

impl WeightedTerm {
    pub fn new(term: &str, weight: f64) -> Self {
        Self {
            term: term.to_string(),
            weight,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CrisisConfig {
    /// Confidence at or above which a query is a crisis.
    pub escalation_threshold: f64,
    /// Confidence assigned to a single direct-phrase match.
    pub direct_confidence: f64,
    /// Unconditional high-severity phrases. Never suppressed by the guard.
    pub direct_phrases: Vec<String>,
    /// Direct-tier phrases with benign readings ("hurt myself"); guarded.
    pub guarded_phrases: Vec<String>,
    /// Weaker signals combined by noisy-OR; guarded.
    pub indicators: Vec<WeightedTerm>,
    /// Amplifiers applied only when some indicator already scored.
    pub urgency_markers: Vec<WeightedTerm>,
    /// Terms that mark a benign context near a guarded match.
    pub disqualifiers: Vec<String>,
    /// Words on either side of a match searched for disqualifiers.
    pub guard_window: usize,
    /// Multiplier applied to a guarded match near a disqualifier.
    pub guard_factor: f64,
}

impl Default for CrisisConfig {
    fn default() -> Self {
        let phrases = |list: &[&str]| list.iter().map(|s| s.to_string()).collect::<Vec<_>>();
        Self {
            escalation_threshold: 0.85,
            direct_confidence: 0.95,
            direct_phrases: phrases(&[
                "suicide",
                "suicidal",
                "kill myself",
                "killing myself",
                "end my life",
                "end it all",
                "want to die",
                "wanna die",
                "take my own life",
                "better off dead",
                "no reason to live",
            ]),
            guarded_phrases: phrases(&[
                "hurt myself",
                "hurting myself",
                "harm myself",
                "cut myself",
                "cutting myself",
            ]),
            indicators: vec![
                WeightedTerm::new("hopeless", 0.45),
                WeightedTerm::new("can't go on", 0.6),
                WeightedTerm::new("nothing to live for", 0.7),
                WeightedTerm::new("no way out", 0.5),
                WeightedTerm::new("self harm", 0.7),
                WeightedTerm::new("don't want to be here", 0.6),
                WeightedTerm::new("burden to everyone", 0.5),
                WeightedTerm::new("worthless", 0.35),
                WeightedTerm::new("give up on life", 0.6),
                WeightedTerm::new("say goodbye", 0.3),
            ],
            urgency_markers: vec![
                WeightedTerm::new("tonight", 0.45),
                WeightedTerm::new("right now", 0.4),
                WeightedTerm::new("today", 0.25),
                WeightedTerm::new("this weekend", 0.25),
            ],
            disqualifiers: phrases(&[
                "exercise",
                "exercising",
                "workout",
                "working out",
                "gym",
                "sport",
                "sports",
                "training",
                "running",
                "lifting",
                "accident",
                "accidentally",
                "fell",
                "fall",
                "cooking",
                "kitchen",
                "shaving",
                "gardening",
                "game",
                "practice",
            ]),
            guard_window: 4,
            guard_factor: 0.2,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    /// Path to the JSON model artifact.
    pub artifact_path: Option<PathBuf>,
    /// Posterior below which a prediction is tagged low confidence.
    pub acceptance_threshold: f64,
    /// Overrides the artifact's smoothing parameter when set.
    pub smoothing_alpha: Option<f64>,
    /// Upper bound on artifact vocabulary size.
    pub max_vocabulary: usize,
    /// Ranked alternatives reported alongside the winner.
    pub secondary_limit: usize,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            artifact_path: None,
            acceptance_threshold: 0.5,
            smoothing_alpha: None,
            max_vocabulary: 5000,
            secondary_limit: 3,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KnowledgeBaseConfig {
    pub enabled: bool,
    /// JSON Lines corpus of prior query/response pairs.
    pub corpus_path: Option<PathBuf>,
    /// Provisional: recalibrate against labeled data.
    pub min_similarity: f64,
    pub top_k: usize,
    pub max_entries: usize,
    /// Largest n-gram in the matcher's TF-IDF space.
    pub ngram_max: usize,
}

impl Default for KnowledgeBaseConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            corpus_path: None,
            min_similarity: 0.35,
            top_k: 3,
            max_entries: 10_000,
            ngram_max: 2,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TemplateConfig {
    /// JSON template catalog. The built-in catalog is used when absent.
    pub catalog_path: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub ttl_secs: u64,
    pub capacity: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_secs: 3600,
            capacity: 1000,
        }
    }
}

// ═══════════════════════════════════════════════════════════
// EngineConfig
// ═══════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub mode: ResponseMode,
    /// Start without a classifier artifact, answering from the knowledge base.
    pub allow_knowledge_base_only: bool,
    /// Longer queries are truncated at a word boundary.
    pub max_query_chars: usize,
    /// Per-request budget enforced by the async service.
    pub response_timeout_ms: u64,
    pub crisis: CrisisConfig,
    pub classifier: ClassifierConfig,
    pub knowledge_base: KnowledgeBaseConfig,
    pub templates: TemplateConfig,
    pub cache: CacheConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            mode: ResponseMode::default(),
            allow_knowledge_base_only: false,
            max_query_chars: 2_000,
            response_timeout_ms: 250,
            crisis: CrisisConfig::default(),
            classifier: ClassifierConfig::default(),
            knowledge_base: KnowledgeBaseConfig::default(),
            templates: TemplateConfig::default(),
            cache: CacheConfig::default(),
        }
    }
}

impl EngineConfig {
    /// Read, resolve relative paths, and validate a config file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let mut config = Self::from_json(&raw)?;
        if let Some(base) = path.parent() {
            config.resolve_paths(base);
        }
        config.validate()?;
        Ok(config)
    }

    /// Parse without path resolution or validation.
    pub fn from_json(raw: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(raw)?)
    }

    /// Make every relative path absolute against `base`.
    pub fn resolve_paths(&mut self, base: &Path) {
        for slot in [
            &mut self.classifier.artifact_path,
            &mut self.knowledge_base.corpus_path,
            &mut self.templates.catalog_path,
        ] {
            if let Some(p) = slot.as_mut() {
                if p.is_relative() {
                    *p = base.join(&*p);
                }
            }
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |msg: String| Err(ConfigError::Invalid(msg));

        // ── crisis ──
        let c = &self.crisis;
        if !unit_interval(c.escalation_threshold) || c.escalation_threshold == 0.0 {
            return invalid(format!(
                "crisis.escalation_threshold must be in (0, 1], got {}",
                c.escalation_threshold
            ));
        }
        if !unit_interval(c.direct_confidence) || c.direct_confidence < c.escalation_threshold {
            return invalid(format!(
                "crisis.direct_confidence must be in [escalation_threshold, 1], got {}",
                c.direct_confidence
            ));
        }
        // phrases are matched in normalized form
        if c.direct_phrases.iter().all(|p| text::normalize(p).is_empty()) {
            return invalid("crisis.direct_phrases must not be empty".into());
        }
        for term in c.indicators.iter().chain(c.urgency_markers.iter()) {
            if text::normalize(&term.term).is_empty() || term.weight <= 0.0 || term.weight > 1.0 {
                return invalid(format!(
                    "crisis term '{}' needs non-empty text and weight in (0, 1]",
                    term.term
                ));
            }
        }
        if !unit_interval(c.guard_factor) {
            return invalid(format!("crisis.guard_factor must be in [0, 1], got {}", c.guard_factor));
        }

        // ── classifier ──
        let cl = &self.classifier;
        if !unit_interval(cl.acceptance_threshold) {
            return invalid(format!(
                "classifier.acceptance_threshold must be in [0, 1], got {}",
                cl.acceptance_threshold
            ));
        }
        if let Some(alpha) = cl.smoothing_alpha {
            if !(alpha.is_finite() && alpha > 0.0) {
                return invalid(format!("classifier.smoothing_alpha must be > 0, got {alpha}"));
            }
        }
        if cl.max_vocabulary == 0 {
            return invalid("classifier.max_vocabulary must be at least 1".into());
        }

        // ── knowledge base ──
        let kb = &self.knowledge_base;
        if !unit_interval(kb.min_similarity) {
            return invalid(format!(
                "knowledge_base.min_similarity must be in [0, 1], got {}",
                kb.min_similarity
            ));
        }
        if kb.top_k == 0 || kb.max_entries == 0 {
            return invalid("knowledge_base.top_k and max_entries must be at least 1".into());
        }
        if !(1..=3).contains(&kb.ngram_max) {
            return invalid(format!("knowledge_base.ngram_max must be 1..=3, got {}", kb.ngram_max));
        }
        if !kb.enabled && self.mode != ResponseMode::Template {
            return invalid(format!("mode '{}' requires knowledge_base.enabled", self.mode));
        }
        if !kb.enabled && self.allow_knowledge_base_only {
            return invalid("allow_knowledge_base_only requires knowledge_base.enabled".into());
        }

        // ── cache / request ──
        if self.cache.capacity == 0 {
            return invalid("cache.capacity must be at least 1".into());
        }
        if self.cache.ttl_secs == 0 {
            return invalid("cache.ttl_secs must be at least 1".into());
        }
        if self.max_query_chars == 0 {
            return invalid("max_query_chars must be at least 1".into());
        }
        if self.response_timeout_ms == 0 {
            return invalid("response_timeout_ms must be at least 1".into());
        }
        Ok(())
    }
}

fn unit_interval(v: f64) -> bool {
    v.is_finite() && (0.0..=1.0).contains(&v)
}

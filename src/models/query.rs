use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::enums::{Category, ResponseMethod};

/// An incoming question. Ephemeral: never persisted, never logged.
#[derive(Debug, Clone)]
pub struct Query {
    pub text: String,
    pub received_at: DateTime<Utc>,
}

impl Query {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            received_at: Utc::now(),
        }
    }
}

/// A category with its posterior probability.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CategoryScore {
    pub category: Category,
    pub probability: f64,
}

/// Hotline contacts attached to every crisis response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrisisResources {
    /// Suicide & crisis lifeline number.
    pub lifeline: String,
    /// Crisis text line instruction.
    pub text_line: String,
    /// Emergency services number.
    pub emergency: String,
}

impl Default for CrisisResources {
    fn default() -> Self {
        Self {
            lifeline: "988".into(),
            text_line: "Text HOME to 741741".into(),
            emergency: "911".into(),
        }
    }
}

/// Microseconds spent in each stage. Stages that did not run stay at zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimingBreakdown {
    pub crisis_us: u64,
    pub cache_us: u64,
    pub classify_us: u64,
    pub context_us: u64,
    pub render_us: u64,
    pub total_us: u64,
}

/// Everything the engine returns for one query.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TriageResponse {
    pub request_id: Uuid,
    pub response: String,
    /// `None` only for the clarifying response to an empty query.
    pub category: Option<Category>,
    pub confidence: f64,
    pub method: ResponseMethod,
    pub cached: bool,
    /// Method that originally produced a cached response.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cached_from: Option<ResponseMethod>,
    pub low_confidence: bool,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub secondary: Vec<CategoryScore>,
    /// Present on every non-crisis response.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub disclaimer: Option<String>,
    /// Present on every crisis response.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resources: Option<CrisisResources>,
    pub timing: TimingBreakdown,
}

impl TriageResponse {
    pub fn is_crisis(&self) -> bool {
        self.method == ResponseMethod::CrisisDetection
    }
}

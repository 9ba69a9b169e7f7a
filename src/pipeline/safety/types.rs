use serde::{Deserialize, Serialize};

/// Which lexicon tier produced a trigger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CrisisTier {
    /// High-severity phrase; a single match escalates.
    Direct,
    /// Weaker signal, combined by noisy-OR.
    Indicator,
    /// Time-pressure marker; amplifies indicators, never scores alone.
    Urgency,
}

/// One lexicon term found in a query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrisisTrigger {
    pub tier: CrisisTier,
    /// Normalized lexicon term (never query text).
    pub term: String,
    /// Effective weight after the negative-context guard.
    pub weight: f64,
    /// True when a disqualifier near every occurrence down-weighted it.
    pub suppressed: bool,
}

/// Outcome of the crisis detector. Immutable once produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrisisAssessment {
    pub is_crisis: bool,
    /// In [0, 1].
    pub confidence: f64,
    pub triggers: Vec<CrisisTrigger>,
}

impl CrisisAssessment {
    /// Nothing matched.
    pub fn clear() -> Self {
        Self {
            is_crisis: false,
            confidence: 0.0,
            triggers: Vec::new(),
        }
    }

    pub fn count(&self, tier: CrisisTier) -> usize {
        self.triggers.iter().filter(|t| t.tier == tier).count()
    }

    pub fn suppressed_count(&self) -> usize {
        self.triggers.iter().filter(|t| t.suppressed).count()
    }
}

/// Result of input sanitization.
#[derive(Debug, Clone)]
pub struct SanitizedInput {
    /// The cleaned query text.
    pub text: String,
    /// Whether any modifications were made.
    pub was_modified: bool,
    /// What was stripped (for logs, no query text).
    pub modifications: Vec<InputModificationKind>,
}

/// Types of input sanitization applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum InputModificationKind {
    InvisibleUnicodeRemoved,
    ControlCharacterRemoved,
    ExcessiveLengthTruncated,
}

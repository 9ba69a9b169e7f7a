//! Crisis detector. Always evaluated before anything else and never fails:
//! the worst case is a clear assessment.
//!
//! Scoring:
//! - direct tier: `direct_confidence`, plus 0.01 per extra direct phrase
//! - indicator tier: noisy-OR of indicator weights, then noisy-OR with
//!   urgency weights when the indicator score is non-zero
//! - confidence is the larger of the two; `is_crisis` when it reaches the
//!   escalation threshold

use crate::engine_config::CrisisConfig;
use crate::pipeline::{safety::sanitize, text};

use super::keywords::CrisisLexicon;
use super::types::{CrisisAssessment, CrisisTier, CrisisTrigger};

const EXTRA_DIRECT_BONUS: f64 = 0.01;

#[derive(Debug, Clone)]
pub struct CrisisDetector {
    lexicon: CrisisLexicon,
    escalation_threshold: f64,
}

impl CrisisDetector {
    pub fn new(config: &CrisisConfig) -> Self {
        Self {
            lexicon: CrisisLexicon::compile(config),
            escalation_threshold: config.escalation_threshold,
        }
    }

    pub fn escalation_threshold(&self) -> f64 {
        self.escalation_threshold
    }

    /// Assess raw query text.
    pub fn assess(&self, query: &str) -> CrisisAssessment {
        let cleaned = sanitize::remove_invisible_unicode(query);
        self.assess_normalized(&text::normalize(&cleaned))
    }

    /// Assess text already passed through `text::normalize`.
    pub fn assess_normalized(&self, normalized: &str) -> CrisisAssessment {
        let triggers = self.lexicon.scan(normalized);
        if triggers.is_empty() {
            return CrisisAssessment::clear();
        }

        let confidence = score(&triggers);
        let is_crisis = confidence >= self.escalation_threshold;
        let assessment = CrisisAssessment {
            is_crisis,
            confidence,
            triggers,
        };
        log_assessment(&assessment);
        assessment
    }
}

fn score(triggers: &[CrisisTrigger]) -> f64 {
    let direct: Vec<f64> = triggers
        .iter()
        .filter(|t| t.tier == CrisisTier::Direct)
        .map(|t| t.weight)
        .collect();
    let direct_score = match direct.iter().copied().reduce(f64::max) {
        Some(base) => base + EXTRA_DIRECT_BONUS * (direct.len() - 1) as f64,
        None => 0.0,
    };

    let indicator_score = noisy_or(
        triggers
            .iter()
            .filter(|t| t.tier == CrisisTier::Indicator)
            .map(|t| t.weight),
    );
    let amplified = if indicator_score > 0.0 {
        let urgency_miss: f64 = triggers
            .iter()
            .filter(|t| t.tier == CrisisTier::Urgency)
            .map(|t| 1.0 - t.weight.clamp(0.0, 1.0))
            .product();
        1.0 - (1.0 - indicator_score) * urgency_miss
    } else {
        0.0
    };

    direct_score.max(amplified).clamp(0.0, 1.0)
}

/// 1 - Π(1 - w); zero for an empty input.
fn noisy_or(weights: impl Iterator<Item = f64>) -> f64 {
    1.0 - weights.map(|w| 1.0 - w.clamp(0.0, 1.0)).product::<f64>()
}

/// Log the assessment WITHOUT query text or matched terms.
fn log_assessment(assessment: &CrisisAssessment) {
    if assessment.is_crisis {
        tracing::warn!(
            confidence = assessment.confidence,
            direct = assessment.count(CrisisTier::Direct),
            indicators = assessment.count(CrisisTier::Indicator),
            urgency = assessment.count(CrisisTier::Urgency),
            "Crisis detected"
        );
    } else {
        tracing::debug!(
            confidence = assessment.confidence,
            triggers = assessment.triggers.len(),
            suppressed = assessment.suppressed_count(),
            "Crisis signals below threshold"
        );
    }
}

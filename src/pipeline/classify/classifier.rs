//! Multinomial naive Bayes over TF-IDF features.
//!
//! `ModelSnapshot` is immutable after construction; the request path only
//! ever holds an `Arc` to one. `CategoryClassifier` pairs the swappable
//! handle with acceptance settings.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::engine_config::ClassifierConfig;
use crate::models::{Category, CategoryScore};
use crate::pipeline::vectorize::TfidfVectorizer;

use super::artifact::ModelArtifact;
use super::model_store::ModelHandle;
use super::ClassifierError;

// ═══════════════════════════════════════════════════════════
// ModelSnapshot
// ═══════════════════════════════════════════════════════════

#[derive(Debug)]
pub struct ModelSnapshot {
    version: String,
    vectorizer: TfidfVectorizer,
    classes: Vec<Category>,
    class_log_prior: Vec<f64>,
    /// `[class][column]` = ln((N_cj + α) / (N_c + α|V|))
    feature_log_prob: Vec<Vec<f64>>,
    alpha: f64,
    loaded_at: DateTime<Utc>,
}

impl ModelSnapshot {
    /// Build from an artifact that already passed `validate`.
    pub fn from_artifact(artifact: ModelArtifact, alpha_override: Option<f64>) -> Self {
        let alpha = alpha_override.unwrap_or(artifact.alpha);
        let width = artifact.vocabulary.len() as f64;

        let total: u64 = artifact.class_counts.iter().sum();
        let class_log_prior = artifact
            .class_counts
            .iter()
            .map(|&c| (c as f64 / total as f64).ln())
            .collect();

        let feature_log_prob = artifact
            .feature_counts
            .iter()
            .map(|row| {
                let denom = (row.iter().sum::<f64>() + alpha * width).ln();
                row.iter().map(|n| (n + alpha).ln() - denom).collect()
            })
            .collect();

        let vectorizer = TfidfVectorizer::from_parts(
            artifact.vocabulary.into_iter().collect(),
            artifact.idf,
            artifact.ngram_range,
            artifact.sublinear_tf,
        );

        Self {
            version: artifact.version,
            vectorizer,
            classes: artifact.classes,
            class_log_prior,
            feature_log_prob,
            alpha,
            loaded_at: Utc::now(),
        }
    }

    /// Posterior per class, highest first. Probabilities sum to 1.
    pub fn predict_proba(&self, normalized: &str) -> Vec<CategoryScore> {
        let x = self.vectorizer.transform(normalized);

        let joint: Vec<f64> = self
            .class_log_prior
            .iter()
            .zip(&self.feature_log_prob)
            .map(|(prior, row)| prior + x.iter().map(|(col, v)| v * row[col]).sum::<f64>())
            .collect();

        // log-sum-exp softmax
        let max = joint.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let exp: Vec<f64> = joint.iter().map(|j| (j - max).exp()).collect();
        let sum: f64 = exp.iter().sum();

        let mut scores: Vec<CategoryScore> = self
            .classes
            .iter()
            .zip(exp)
            .map(|(&category, e)| CategoryScore {
                category,
                probability: (e / sum).clamp(0.0, 1.0),
            })
            .collect();
        scores.sort_by(|a, b| {
            b.probability
                .total_cmp(&a.probability)
                .then_with(|| a.category.cmp(&b.category))
        });
        scores
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn classes(&self) -> &[Category] {
        &self.classes
    }

    pub fn vocabulary_size(&self) -> usize {
        self.vectorizer.len()
    }

    pub fn alpha(&self) -> f64 {
        self.alpha
    }

    pub fn loaded_at(&self) -> DateTime<Utc> {
        self.loaded_at
    }
}

// ═══════════════════════════════════════════════════════════
// Classification
// ═══════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationResult {
    pub category: Category,
    /// Posterior of `category`, in [0, 1].
    pub confidence: f64,
    /// Runner-up categories, highest first.
    pub secondary: Vec<CategoryScore>,
    /// Confidence fell below the acceptance threshold.
    pub low_confidence: bool,
    pub model_version: String,
}

pub struct CategoryClassifier {
    handle: Arc<ModelHandle>,
    acceptance_threshold: f64,
    secondary_limit: usize,
}

impl CategoryClassifier {
    pub fn new(handle: Arc<ModelHandle>, config: &ClassifierConfig) -> Self {
        Self {
            handle,
            acceptance_threshold: config.acceptance_threshold,
            secondary_limit: config.secondary_limit,
        }
    }

    pub fn handle(&self) -> &Arc<ModelHandle> {
        &self.handle
    }

    pub fn acceptance_threshold(&self) -> f64 {
        self.acceptance_threshold
    }

    /// Classify normalized text against the current snapshot.
    pub fn classify(&self, normalized: &str) -> Result<ClassificationResult, ClassifierError> {
        let snapshot = self.handle.current().ok_or(ClassifierError::Unavailable)?;
        let mut ranked = snapshot.predict_proba(normalized).into_iter();
        let top = ranked.next().ok_or(ClassifierError::Unavailable)?;

        Ok(ClassificationResult {
            category: top.category,
            confidence: top.probability,
            secondary: ranked.take(self.secondary_limit).collect(),
            low_confidence: top.probability < self.acceptance_threshold,
            model_version: snapshot.version().to_string(),
        })
    }
}

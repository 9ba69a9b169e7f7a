//! Versioned classifier artifact.
//!
//! The artifact carries raw counts, not log-probabilities, so the
//! smoothing parameter can be overridden at load time. Layout:
//!
//! ```json
//! {
//!   "version": "2024-06-01",
//!   "ngram_range": [1, 3],
//!   "sublinear_tf": false,
//!   "vocabulary": {"balance": 0, "balance exercises": 1},
//!   "idf": [1.4, 2.1],
//!   "classes": ["adl_mobility", "senior_social"],
//!   "class_counts": [40, 38],
//!   "feature_counts": [[3.2, 1.1], [0.0, 0.0]],
//!   "alpha": 0.1
//! }
//! ```

use std::collections::{BTreeMap, HashSet};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::models::Category;
use crate::pipeline::text;
use crate::pipeline::vectorize::TfidfVectorizer;

use super::ClassifierError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelArtifact {
    pub version: String,
    pub ngram_range: (usize, usize),
    #[serde(default)]
    pub sublinear_tf: bool,
    pub vocabulary: BTreeMap<String, usize>,
    pub idf: Vec<f64>,
    pub classes: Vec<Category>,
    /// Training samples per class.
    pub class_counts: Vec<u64>,
    /// Summed TF-IDF weight per class and column.
    pub feature_counts: Vec<Vec<f64>>,
    pub alpha: f64,
}

/// One labeled training example.
#[derive(Debug, Clone)]
pub struct LabeledSample {
    pub category: Category,
    pub text: String,
}

impl LabeledSample {
    pub fn new(category: Category, text: &str) -> Self {
        Self {
            category,
            text: text.to_string(),
        }
    }
}

/// Parameters for `ModelArtifact::fit`.
#[derive(Debug, Clone)]
pub struct FitParams {
    pub version: String,
    pub ngram_range: (usize, usize),
    pub max_features: usize,
    pub alpha: f64,
    pub sublinear_tf: bool,
}

impl Default for FitParams {
    fn default() -> Self {
        Self {
            version: "dev".into(),
            ngram_range: (1, 3),
            max_features: 5000,
            alpha: 0.1,
            sublinear_tf: false,
        }
    }
}

impl ModelArtifact {
    pub fn load(path: &Path) -> Result<Self, ClassifierError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ClassifierError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(serde_json::from_str(&raw)?)
    }

    pub fn save(&self, path: &Path) -> Result<(), ClassifierError> {
        let json = serde_json::to_string(self)?;
        std::fs::write(path, json).map_err(|source| ClassifierError::Io {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Check every table against every other. Nothing is built from an
    /// artifact that fails here.
    pub fn validate(&self, max_vocabulary: usize) -> Result<(), ClassifierError> {
        let invalid = |msg: String| Err(ClassifierError::Invalid(msg));

        if self.version.trim().is_empty() {
            return invalid("empty version".into());
        }
        let (min_n, max_n) = self.ngram_range;
        if !(1 <= min_n && min_n <= max_n && max_n <= 3) {
            return invalid(format!("ngram_range {:?} outside 1..=3", self.ngram_range));
        }
        if !(self.alpha.is_finite() && self.alpha > 0.0) {
            return invalid(format!("alpha must be > 0, got {}", self.alpha));
        }

        // ── classes ──
        if self.classes.is_empty() {
            return invalid("no classes".into());
        }
        let unique: HashSet<_> = self.classes.iter().collect();
        if unique.len() != self.classes.len() {
            return invalid("duplicate class".into());
        }
        if self.class_counts.len() != self.classes.len() {
            return invalid(format!(
                "class_counts has {} entries for {} classes",
                self.class_counts.len(),
                self.classes.len()
            ));
        }
        if self.class_counts.iter().any(|&c| c == 0) {
            return invalid("class with zero training samples".into());
        }

        // ── vocabulary ──
        let width = self.vocabulary.len();
        if width == 0 {
            return invalid("empty vocabulary".into());
        }
        if width > max_vocabulary {
            return invalid(format!("vocabulary {width} exceeds bound {max_vocabulary}"));
        }
        let mut seen = vec![false; width];
        for (term, &col) in &self.vocabulary {
            if col >= width || seen[col] {
                return invalid(format!("column {col} for '{term}' out of range or repeated"));
            }
            seen[col] = true;
        }
        if self.idf.len() != width {
            return invalid(format!("idf has {} entries for vocabulary {width}", self.idf.len()));
        }
        if self.idf.iter().any(|v| !(v.is_finite() && *v > 0.0)) {
            return invalid("idf values must be finite and positive".into());
        }

        // ── feature counts ──
        if self.feature_counts.len() != self.classes.len() {
            return invalid("feature_counts row count differs from classes".into());
        }
        for (row, class) in self.feature_counts.iter().zip(&self.classes) {
            if row.len() != width {
                return invalid(format!("feature_counts row for {class} has {} columns", row.len()));
            }
            if row.iter().any(|v| !(v.is_finite() && *v >= 0.0)) {
                return invalid(format!("feature_counts row for {class} has negative or non-finite values"));
            }
        }
        Ok(())
    }

    /// Fit vectorizer tables and per-class counts from labeled samples.
    pub fn fit(samples: &[LabeledSample], params: &FitParams) -> Result<Self, ClassifierError> {
        if samples.is_empty() {
            return Err(ClassifierError::NoSamples);
        }

        let normalized: Vec<String> = samples.iter().map(|s| text::normalize(&s.text)).collect();
        let vectorizer = TfidfVectorizer::fit(
            &normalized,
            params.ngram_range,
            params.max_features,
            params.sublinear_tf,
        );

        let mut classes: Vec<Category> = samples.iter().map(|s| s.category).collect();
        classes.sort();
        classes.dedup();

        let width = vectorizer.len();
        let mut class_counts = vec![0u64; classes.len()];
        let mut feature_counts = vec![vec![0.0; width]; classes.len()];

        for (sample, doc) in samples.iter().zip(&normalized) {
            // classes holds every sample category
            let Ok(row) = classes.binary_search(&sample.category) else {
                continue;
            };
            class_counts[row] += 1;
            for (col, weight) in vectorizer.transform(doc).iter() {
                feature_counts[row][col] += weight;
            }
        }

        Ok(Self {
            version: params.version.clone(),
            ngram_range: params.ngram_range,
            sublinear_tf: params.sublinear_tf,
            vocabulary: vectorizer
                .vocabulary()
                .iter()
                .map(|(t, &c)| (t.clone(), c))
                .collect(),
            idf: vectorizer.idf().to_vec(),
            classes,
            class_counts,
            feature_counts,
            alpha: params.alpha,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tiny() -> ModelArtifact {
        ModelArtifact::fit(
            &[
                LabeledSample::new(Category::AdlMobility, "walker for stairs"),
                LabeledSample::new(Category::SeniorSocial, "lonely grandmother friends"),
            ],
            &FitParams::default(),
        )
        .unwrap()
    }

    #[test]
    fn fit_produces_valid_artifact() {
        let artifact = tiny();
        artifact.validate(5000).unwrap();
        assert_eq!(artifact.classes, vec![Category::AdlMobility, Category::SeniorSocial]);
        assert_eq!(artifact.class_counts, vec![1, 1]);
        assert!(artifact.vocabulary.contains_key("walker"));
        assert!(artifact.vocabulary.contains_key("walker for stairs"));
    }

    #[test]
    fn fit_rejects_empty_samples() {
        assert!(matches!(
            ModelArtifact::fit(&[], &FitParams::default()),
            Err(ClassifierError::NoSamples)
        ));
    }

    #[test]
    fn json_round_trip_through_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.json");
        let artifact = tiny();
        artifact.save(&path).unwrap();
        let loaded = ModelArtifact::load(&path).unwrap();
        assert_eq!(loaded.vocabulary, artifact.vocabulary);
        assert_eq!(loaded.classes, artifact.classes);
        assert_eq!(loaded.class_counts, artifact.class_counts);
        for (a, b) in loaded.idf.iter().zip(&artifact.idf) {
            assert!((a - b).abs() < 1e-12);
        }
    }

    #[test]
    fn load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            ModelArtifact::load(&dir.path().join("missing.json")),
            Err(ClassifierError::Io { .. })
        ));
    }

    #[test]
    fn load_corrupt_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.json");
        std::fs::write(&path, "{not json").unwrap();
        assert!(matches!(ModelArtifact::load(&path), Err(ClassifierError::Parse(_))));
    }

    #[test]
    fn unknown_class_name_is_parse_error() {
        let mut value = serde_json::to_value(tiny()).unwrap();
        value["classes"][0] = serde_json::json!("cardiology");
        assert!(serde_json::from_value::<ModelArtifact>(value).is_err());
    }

    #[test]
    fn vocabulary_bound_enforced() {
        let artifact = tiny();
        let width = artifact.vocabulary.len();
        assert!(artifact.validate(width).is_ok());
        assert!(matches!(artifact.validate(width - 1), Err(ClassifierError::Invalid(_))));
    }

    #[test]
    fn dimension_mismatch_rejected() {
        let mut artifact = tiny();
        artifact.idf.pop();
        assert!(artifact.validate(5000).is_err());

        let mut artifact = tiny();
        artifact.feature_counts[0].push(1.0);
        assert!(artifact.validate(5000).is_err());

        let mut artifact = tiny();
        artifact.class_counts.push(3);
        assert!(artifact.validate(5000).is_err());
    }

    #[test]
    fn duplicate_class_rejected() {
        let mut artifact = tiny();
        artifact.classes[1] = artifact.classes[0];
        assert!(artifact.validate(5000).is_err());
    }

    #[test]
    fn repeated_column_rejected() {
        let mut artifact = tiny();
        let first = artifact.vocabulary.keys().next().unwrap().clone();
        let last = artifact.vocabulary.keys().last().unwrap().clone();
        let col = artifact.vocabulary[&first];
        artifact.vocabulary.insert(last, col);
        assert!(artifact.validate(5000).is_err());
    }

    #[test]
    fn non_positive_alpha_rejected() {
        let mut artifact = tiny();
        artifact.alpha = 0.0;
        assert!(artifact.validate(5000).is_err());
    }

    #[test]
    fn bad_ngram_range_rejected() {
        let mut artifact = tiny();
        artifact.ngram_range = (2, 1);
        assert!(artifact.validate(5000).is_err());
        artifact.ngram_range = (1, 4);
        assert!(artifact.validate(5000).is_err());
    }
}

//! TF-IDF vectorizer over word n-grams.
//!
//! Used twice: inside the classifier (vocabulary and idf come from the
//! model artifact) and by the knowledge matcher (fitted over the corpus at
//! load time). Vectors are sparse and L2-normalized.

use std::collections::HashMap;

use super::text;

// ═══════════════════════════════════════════════════════════
// SparseVector
// ═══════════════════════════════════════════════════════════

/// Column-sorted sparse vector.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SparseVector {
    entries: Vec<(usize, f64)>,
}

impl SparseVector {
    /// Build from unsorted (column, value) pairs. Duplicate columns are summed.
    pub fn from_pairs(mut pairs: Vec<(usize, f64)>) -> Self {
        pairs.sort_by_key(|(col, _)| *col);
        let mut entries: Vec<(usize, f64)> = Vec::with_capacity(pairs.len());
        for (col, value) in pairs {
            if let Some((last, acc)) = entries.last_mut() {
                if *last == col {
                    *acc += value;
                    continue;
                }
            }
            entries.push((col, value));
        }
        Self { entries }
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, f64)> + '_ {
        self.entries.iter().copied()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn nnz(&self) -> usize {
        self.entries.len()
    }

    pub fn norm(&self) -> f64 {
        self.entries.iter().map(|(_, v)| v * v).sum::<f64>().sqrt()
    }

    pub fn dot(&self, other: &SparseVector) -> f64 {
        let (mut i, mut j) = (0, 0);
        let mut sum = 0.0;
        while i < self.entries.len() && j < other.entries.len() {
            let (ca, va) = self.entries[i];
            let (cb, vb) = other.entries[j];
            match ca.cmp(&cb) {
                std::cmp::Ordering::Less => i += 1,
                std::cmp::Ordering::Greater => j += 1,
                std::cmp::Ordering::Equal => {
                    sum += va * vb;
                    i += 1;
                    j += 1;
                }
            }
        }
        sum
    }

    fn normalize_l2(&mut self) {
        let norm = self.norm();
        if norm > 0.0 {
            for (_, v) in self.entries.iter_mut() {
                *v /= norm;
            }
        }
    }
}

/// Cosine similarity; 0.0 when either side is empty.
pub fn cosine_similarity(a: &SparseVector, b: &SparseVector) -> f64 {
    let norm_a = a.norm();
    let norm_b = b.norm();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    (a.dot(b) / (norm_a * norm_b)).clamp(0.0, 1.0)
}

// ═══════════════════════════════════════════════════════════
// TfidfVectorizer
// ═══════════════════════════════════════════════════════════

#[derive(Debug, Clone)]
pub struct TfidfVectorizer {
    vocabulary: HashMap<String, usize>,
    idf: Vec<f64>,
    ngram_range: (usize, usize),
    sublinear_tf: bool,
}

impl TfidfVectorizer {
    /// Assemble from precomputed tables. Callers validate dimensions.
    pub fn from_parts(
        vocabulary: HashMap<String, usize>,
        idf: Vec<f64>,
        ngram_range: (usize, usize),
        sublinear_tf: bool,
    ) -> Self {
        Self {
            vocabulary,
            idf,
            ngram_range,
            sublinear_tf,
        }
    }

    /// Fit vocabulary and smooth idf over normalized documents.
    ///
    /// Keeps the `max_features` most frequent terms (ties broken
    /// alphabetically); columns are assigned in sorted term order.
    pub fn fit(
        documents: &[String],
        ngram_range: (usize, usize),
        max_features: usize,
        sublinear_tf: bool,
    ) -> Self {
        let mut term_count: HashMap<String, usize> = HashMap::new();
        let mut doc_freq: HashMap<String, usize> = HashMap::new();

        for doc in documents {
            let toks = text::tokens(doc);
            let grams = text::ngrams(&toks, ngram_range.0, ngram_range.1);
            let mut seen: Vec<&String> = Vec::new();
            for gram in &grams {
                *term_count.entry(gram.clone()).or_default() += 1;
                if !seen.contains(&gram) {
                    seen.push(gram);
                    *doc_freq.entry(gram.clone()).or_default() += 1;
                }
            }
        }

        let mut ranked: Vec<(String, usize)> = term_count.into_iter().collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        ranked.truncate(max_features);
        let mut terms: Vec<String> = ranked.into_iter().map(|(t, _)| t).collect();
        terms.sort();

        let n_docs = documents.len() as f64;
        let idf = terms
            .iter()
            .map(|t| {
                let df = doc_freq.get(t).copied().unwrap_or(0) as f64;
                ((1.0 + n_docs) / (1.0 + df)).ln() + 1.0
            })
            .collect();
        let vocabulary = terms.into_iter().enumerate().map(|(i, t)| (t, i)).collect();

        Self {
            vocabulary,
            idf,
            ngram_range,
            sublinear_tf,
        }
    }

    /// Vectorize normalized text. Out-of-vocabulary terms are ignored.
    pub fn transform(&self, normalized: &str) -> SparseVector {
        let toks = text::tokens(normalized);
        let grams = text::ngrams(&toks, self.ngram_range.0, self.ngram_range.1);

        let mut counts: HashMap<usize, f64> = HashMap::new();
        for gram in &grams {
            if let Some(&col) = self.vocabulary.get(gram) {
                *counts.entry(col).or_default() += 1.0;
            }
        }

        let pairs = counts
            .into_iter()
            .map(|(col, tf)| {
                let tf = if self.sublinear_tf { 1.0 + tf.ln() } else { tf };
                (col, tf * self.idf[col])
            })
            .collect();

        let mut vector = SparseVector::from_pairs(pairs);
        vector.normalize_l2();
        vector
    }

    pub fn vocabulary(&self) -> &HashMap<String, usize> {
        &self.vocabulary
    }

    pub fn idf(&self) -> &[f64] {
        &self.idf
    }

    pub fn ngram_range(&self) -> (usize, usize) {
        self.ngram_range
    }

    pub fn sublinear_tf(&self) -> bool {
        self.sublinear_tf
    }

    pub fn len(&self) -> usize {
        self.idf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.idf.is_empty()
    }
}

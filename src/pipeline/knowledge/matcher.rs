use std::cmp::Ordering;

use serde::Serialize;

use crate::engine_config::KnowledgeBaseConfig;
use crate::models::Category;
use crate::pipeline::text;
use crate::pipeline::vectorize::{cosine_similarity, SparseVector, TfidfVectorizer};

use super::corpus::{KnowledgeCorpus, KnowledgeEntry};
use super::KnowledgeError;

/// Vocabulary bound for the corpus TF-IDF space.
const MAX_FEATURES: usize = 20_000;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KnowledgeMatch {
    pub query: String,
    pub response: String,
    pub category: Category,
    pub similarity: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub enum MatchOutcome {
    Matched(KnowledgeMatch),
    /// Best candidate fell below the configured minimum.
    NoSufficientMatch { best_similarity: f64 },
}

/// Cosine-similarity search over historical queries.
pub struct KnowledgeMatcher {
    vectorizer: TfidfVectorizer,
    entries: Vec<KnowledgeEntry>,
    vectors: Vec<SparseVector>,
    query_chars: Vec<usize>,
    min_similarity: f64,
    top_k: usize,
}

impl KnowledgeMatcher {
    /// Fit the TF-IDF space over corpus queries and index every entry.
    pub fn build(corpus: KnowledgeCorpus, config: &KnowledgeBaseConfig) -> Result<Self, KnowledgeError> {
        if corpus.is_empty() {
            return Err(KnowledgeError::EmptyCorpus);
        }
        let entries = corpus.into_entries();
        let normalized: Vec<String> = entries.iter().map(|e| text::normalize(&e.query)).collect();
        let vectorizer = TfidfVectorizer::fit(&normalized, (1, config.ngram_max), MAX_FEATURES, true);
        let vectors = normalized.iter().map(|q| vectorizer.transform(q)).collect();
        let query_chars = entries.iter().map(|e| e.query.chars().count()).collect();

        tracing::info!(
            entries = entries.len(),
            vocabulary = vectorizer.len(),
            min_similarity = config.min_similarity,
            "Knowledge matcher ready"
        );

        Ok(Self {
            vectorizer,
            entries,
            vectors,
            query_chars,
            min_similarity: config.min_similarity,
            top_k: config.top_k,
        })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn min_similarity(&self) -> f64 {
        self.min_similarity
    }

    /// Top `k` entries sharing at least one term with the query.
    ///
    /// Ordered by similarity, then shorter historical query, then
    /// insertion order.
    pub fn retrieve(&self, normalized: &str, k: usize) -> Vec<KnowledgeMatch> {
        self.retrieve_in(normalized, k, None)
    }

    /// `retrieve`, optionally restricted to one category.
    pub fn retrieve_in(&self, normalized: &str, k: usize, category: Option<Category>) -> Vec<KnowledgeMatch> {
        let q = self.vectorizer.transform(normalized);
        if q.is_empty() || k == 0 {
            return Vec::new();
        }

        let mut scored: Vec<(usize, f64)> = self
            .vectors
            .iter()
            .enumerate()
            .filter(|(i, _)| category.map_or(true, |c| self.entries[*i].category == c))
            .map(|(i, v)| (i, cosine_similarity(&q, v)))
            .filter(|(_, sim)| *sim > 0.0)
            .collect();

        scored.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(Ordering::Equal)
                .then_with(|| self.query_chars[a.0].cmp(&self.query_chars[b.0]))
                .then_with(|| a.0.cmp(&b.0))
        });
        scored.truncate(k);

        scored
            .into_iter()
            .map(|(i, similarity)| {
                let entry = &self.entries[i];
                KnowledgeMatch {
                    query: entry.query.clone(),
                    response: entry.response.clone(),
                    category: entry.category,
                    similarity,
                }
            })
            .collect()
    }

    /// Best match if it clears the similarity floor.
    pub fn best(&self, normalized: &str, category: Option<Category>) -> MatchOutcome {
        let top = self.retrieve_in(normalized, self.top_k, category).into_iter().next();
        match top {
            Some(m) if m.similarity >= self.min_similarity => MatchOutcome::Matched(m),
            Some(m) => MatchOutcome::NoSufficientMatch {
                best_similarity: m.similarity,
            },
            None => MatchOutcome::NoSufficientMatch { best_similarity: 0.0 },
        }
    }
}

//! Process-wide usage counters.
//!
//! Counters are monotonic atomics; latency is a bounded window behind a
//! mutex. Updated once per request, at commit. Counts only, never content.

use std::collections::{BTreeMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError};

use serde::Serialize;

use crate::models::{Category, ResponseMethod};

/// Requests kept for the rolling latency average.
pub const LATENCY_WINDOW: usize = 1000;

pub const MODEL_TYPE: &str = "tfidf+multinomial_nb";

/// What one finished request contributes to the counters.
#[derive(Debug, Clone, Copy)]
pub struct RequestRecord {
    pub method: ResponseMethod,
    pub category: Option<Category>,
    /// The classifier produced a prediction for this request.
    pub classified: bool,
    pub empty_query: bool,
    pub elapsed_us: u64,
}

#[derive(Default)]
pub struct UsageStats {
    total: AtomicU64,
    crisis: AtomicU64,
    predictions: AtomicU64,
    knowledge_base: AtomicU64,
    fallback: AtomicU64,
    cache_hits: AtomicU64,
    empty: AtomicU64,
    discarded: AtomicU64,
    per_category: [AtomicU64; Category::ALL.len()],
    latencies_us: Mutex<VecDeque<u64>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatsSnapshot {
    pub total_requests: u64,
    pub crisis_detections: u64,
    pub ml_predictions: u64,
    pub knowledge_base_responses: u64,
    pub fallback_responses: u64,
    pub cache_hits: u64,
    pub empty_queries: u64,
    pub discarded_requests: u64,
    pub category_counts: BTreeMap<Category, u64>,
    pub avg_latency_ms: f64,
    pub cache_size: usize,
    pub knowledge_base_entries: usize,
    pub model_type: &'static str,
    pub model_version: Option<String>,
    pub categories: usize,
    pub category_list: Vec<Category>,
}

impl UsageStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, record: &RequestRecord) {
        self.total.fetch_add(1, Ordering::Relaxed);
        let counter = match record.method {
            ResponseMethod::CrisisDetection => Some(&self.crisis),
            ResponseMethod::KnowledgeBase => Some(&self.knowledge_base),
            ResponseMethod::Fallback => Some(&self.fallback),
            ResponseMethod::Cache => Some(&self.cache_hits),
            ResponseMethod::MlModel => None,
        };
        if let Some(counter) = counter {
            counter.fetch_add(1, Ordering::Relaxed);
        }
        if record.classified {
            self.predictions.fetch_add(1, Ordering::Relaxed);
        }
        if record.empty_query {
            self.empty.fetch_add(1, Ordering::Relaxed);
        }
        if let Some(category) = record.category {
            self.per_category[category.index()].fetch_add(1, Ordering::Relaxed);
        }

        let mut window = self.latencies_us.lock().unwrap_or_else(PoisonError::into_inner);
        if window.len() == LATENCY_WINDOW {
            window.pop_front();
        }
        window.push_back(record.elapsed_us);
    }

    /// A request abandoned after timeout. Not part of `total_requests`.
    pub fn record_discarded(&self) {
        self.discarded.fetch_add(1, Ordering::Relaxed);
    }

    pub fn total_requests(&self) -> u64 {
        self.total.load(Ordering::Relaxed)
    }

    pub fn discarded(&self) -> u64 {
        self.discarded.load(Ordering::Relaxed)
    }

    pub fn avg_latency_ms(&self) -> f64 {
        let window = self.latencies_us.lock().unwrap_or_else(PoisonError::into_inner);
        if window.is_empty() {
            return 0.0;
        }
        window.iter().sum::<u64>() as f64 / window.len() as f64 / 1000.0
    }

    /// Counters plus the engine-level figures only the caller knows.
    pub fn snapshot(
        &self,
        cache_size: usize,
        knowledge_base_entries: usize,
        model_version: Option<String>,
    ) -> StatsSnapshot {
        let load = |c: &AtomicU64| c.load(Ordering::Relaxed);
        StatsSnapshot {
            total_requests: load(&self.total),
            crisis_detections: load(&self.crisis),
            ml_predictions: load(&self.predictions),
            knowledge_base_responses: load(&self.knowledge_base),
            fallback_responses: load(&self.fallback),
            cache_hits: load(&self.cache_hits),
            empty_queries: load(&self.empty),
            discarded_requests: load(&self.discarded),
            category_counts: Category::ALL
                .iter()
                .map(|&c| (c, load(&self.per_category[c.index()])))
                .filter(|(_, n)| *n > 0)
                .collect(),
            avg_latency_ms: self.avg_latency_ms(),
            cache_size,
            knowledge_base_entries,
            model_type: MODEL_TYPE,
            model_version,
            categories: Category::SPECIFIC_COUNT,
            category_list: Category::ALL.to_vec(),
        }
    }
}

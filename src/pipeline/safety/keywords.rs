//! Crisis lexicon: configured phrases compiled to normalized token
//! sequences and matched on word boundaries.
//!
//! Matching runs on normalized text (see `pipeline::text::normalize`), so
//! casing, punctuation noise and apostrophes ("can't" vs "cant") do not
//! affect it.

use crate::engine_config::CrisisConfig;
use crate::pipeline::text;

use super::types::{CrisisTier, CrisisTrigger};

/// A compiled phrase with its scoring metadata.
#[derive(Debug, Clone)]
struct LexiconEntry {
    term: String,
    tokens: Vec<String>,
    weight: f64,
}

impl LexiconEntry {
    fn compile(raw: &str, weight: f64) -> Option<Self> {
        let term = text::normalize(raw);
        if term.is_empty() {
            return None;
        }
        let tokens = term.split(' ').map(str::to_string).collect();
        Some(Self { term, tokens, weight })
    }
}

/// Compiled crisis lexicon.
#[derive(Debug, Clone)]
pub struct CrisisLexicon {
    direct: Vec<LexiconEntry>,
    guarded: Vec<LexiconEntry>,
    indicators: Vec<LexiconEntry>,
    urgency: Vec<LexiconEntry>,
    disqualifiers: Vec<LexiconEntry>,
    guard_window: usize,
    guard_factor: f64,
}

impl CrisisLexicon {
    pub fn compile(config: &CrisisConfig) -> Self {
        let phrases = |list: &[String], weight: f64| {
            list.iter()
                .filter_map(|p| LexiconEntry::compile(p, weight))
                .collect::<Vec<_>>()
        };
        let weighted = |list: &[crate::engine_config::WeightedTerm]| {
            list.iter()
                .filter_map(|t| LexiconEntry::compile(&t.term, t.weight))
                .collect::<Vec<_>>()
        };

        Self {
            direct: phrases(&config.direct_phrases, config.direct_confidence),
            guarded: phrases(&config.guarded_phrases, config.direct_confidence),
            indicators: weighted(&config.indicators),
            urgency: weighted(&config.urgency_markers),
            disqualifiers: phrases(&config.disqualifiers, 0.0),
            guard_window: config.guard_window,
            guard_factor: config.guard_factor,
        }
    }

    /// Total number of compiled phrases across all tiers.
    pub fn len(&self) -> usize {
        self.direct.len() + self.guarded.len() + self.indicators.len() + self.urgency.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Scan normalized text. One trigger per matched lexicon term.
    pub fn scan(&self, normalized: &str) -> Vec<CrisisTrigger> {
        let words: Vec<&str> = normalized.split(' ').filter(|w| !w.is_empty()).collect();
        if words.is_empty() {
            return Vec::new();
        }

        let disqualified_spans: Vec<(usize, usize)> = self
            .disqualifiers
            .iter()
            .flat_map(|d| {
                find_occurrences(&words, &d.tokens)
                    .into_iter()
                    .map(|start| (start, start + d.tokens.len()))
            })
            .collect();

        let mut triggers = Vec::new();

        // ── direct: unconditional ──
        for entry in &self.direct {
            if !find_occurrences(&words, &entry.tokens).is_empty() {
                triggers.push(trigger(CrisisTier::Direct, entry, entry.weight, false));
            }
        }

        // ── guarded: direct unless every occurrence sits near a disqualifier ──
        for entry in &self.guarded {
            match self.guard(&words, entry, &disqualified_spans) {
                GuardOutcome::Absent => {}
                GuardOutcome::Clear => {
                    triggers.push(trigger(CrisisTier::Direct, entry, entry.weight, false));
                }
                GuardOutcome::Suppressed => triggers.push(trigger(
                    CrisisTier::Indicator,
                    entry,
                    entry.weight * self.guard_factor,
                    true,
                )),
            }
        }

        // ── indicators ──
        for entry in &self.indicators {
            match self.guard(&words, entry, &disqualified_spans) {
                GuardOutcome::Absent => {}
                GuardOutcome::Clear => {
                    triggers.push(trigger(CrisisTier::Indicator, entry, entry.weight, false));
                }
                GuardOutcome::Suppressed => triggers.push(trigger(
                    CrisisTier::Indicator,
                    entry,
                    entry.weight * self.guard_factor,
                    true,
                )),
            }
        }

        // ── urgency ──
        for entry in &self.urgency {
            if !find_occurrences(&words, &entry.tokens).is_empty() {
                triggers.push(trigger(CrisisTier::Urgency, entry, entry.weight, false));
            }
        }

        triggers
    }

    fn guard(&self, words: &[&str], entry: &LexiconEntry, disqualified: &[(usize, usize)]) -> GuardOutcome {
        let starts = find_occurrences(words, &entry.tokens);
        if starts.is_empty() {
            return GuardOutcome::Absent;
        }
        let near_disqualifier = |start: usize| {
            let lo = start.saturating_sub(self.guard_window);
            let hi = start + entry.tokens.len() + self.guard_window;
            disqualified.iter().any(|&(ds, de)| ds < hi && de > lo)
        };
        if starts.into_iter().all(near_disqualifier) {
            GuardOutcome::Suppressed
        } else {
            GuardOutcome::Clear
        }
    }
}

enum GuardOutcome {
    Absent,
    Clear,
    Suppressed,
}

fn trigger(tier: CrisisTier, entry: &LexiconEntry, weight: f64, suppressed: bool) -> CrisisTrigger {
    CrisisTrigger {
        tier,
        term: entry.term.clone(),
        weight,
        suppressed,
    }
}

/// Word-bounded start positions of `phrase` within `words`.
pub fn find_occurrences<S: AsRef<str>>(words: &[&str], phrase: &[S]) -> Vec<usize> {
    if phrase.is_empty() || phrase.len() > words.len() {
        return Vec::new();
    }
    words
        .windows(phrase.len())
        .enumerate()
        .filter(|(_, window)| window.iter().zip(phrase).all(|(w, p)| *w == p.as_ref()))
        .map(|(i, _)| i)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lexicon() -> CrisisLexicon {
        CrisisLexicon::compile(&CrisisConfig::default())
    }

    fn scan(query: &str) -> Vec<CrisisTrigger> {
        lexicon().scan(&text::normalize(query))
    }

    // =================================================================
    // DIRECT TIER
    // =================================================================

    #[test]
    fn keyword_suicide_is_direct() {
        let triggers = scan("I'm thinking about suicide");
        assert!(triggers.iter().any(|t| t.tier == CrisisTier::Direct && t.term == "suicide"));
    }

    #[test]
    fn keyword_kill_myself_any_casing() {
        let triggers = scan("I want to KILL MYSELF.");
        assert!(triggers.iter().any(|t| t.tier == CrisisTier::Direct && t.term == "kill myself"));
    }

    #[test]
    fn keyword_punctuation_noise_still_matches() {
        let triggers = scan("kill...myself!!!");
        assert!(triggers.iter().any(|t| t.term == "kill myself"));
    }

    #[test]
    fn keyword_requires_word_boundary() {
        // "suicidesque" is not "suicide"
        let triggers = scan("a suicidesque plot twist");
        assert!(triggers.iter().all(|t| t.term != "suicide"));
    }

    #[test]
    fn direct_never_suppressed_by_disqualifier() {
        let triggers = scan("after my workout I want to kill myself");
        let t = triggers.iter().find(|t| t.term == "kill myself").unwrap();
        assert_eq!(t.tier, CrisisTier::Direct);
        assert!(!t.suppressed);
    }

    // =================================================================
    // GUARD
    // =================================================================

    #[test]
    fn guarded_phrase_near_disqualifier_suppressed() {
        let triggers = scan("I hurt myself exercising yesterday");
        let t = triggers.iter().find(|t| t.term == "hurt myself").unwrap();
        assert_eq!(t.tier, CrisisTier::Indicator);
        assert!(t.suppressed);
        assert!(t.weight < 0.25);
    }

    #[test]
    fn guarded_phrase_without_disqualifier_is_direct() {
        let triggers = scan("I want to hurt myself");
        let t = triggers.iter().find(|t| t.term == "hurt myself").unwrap();
        assert_eq!(t.tier, CrisisTier::Direct);
        assert!(!t.suppressed);
    }

    #[test]
    fn guarded_phrase_outside_window_not_suppressed() {
        let triggers =
            scan("I went to the gym on monday and the week went on and now I want to hurt myself");
        let t = triggers.iter().find(|t| t.term == "hurt myself").unwrap();
        assert_eq!(t.tier, CrisisTier::Direct);
    }

    #[test]
    fn one_clear_occurrence_defeats_guard() {
        let triggers = scan(
            "I cut myself cooking last week but that is not why I am writing to you now because I cut myself on purpose",
        );
        let t = triggers.iter().find(|t| t.term == "cut myself").unwrap();
        assert_eq!(t.tier, CrisisTier::Direct);
    }

    #[test]
    fn multiword_disqualifier_matches() {
        let triggers = scan("hurt myself working out");
        assert!(triggers.iter().any(|t| t.term == "hurt myself" && t.suppressed));
    }

    // =================================================================
    // INDICATORS / URGENCY
    // =================================================================

    #[test]
    fn apostrophe_indicator_matches_both_spellings() {
        assert!(scan("I can't go on").iter().any(|t| t.term == "cant go on"));
        assert!(scan("i cant go on").iter().any(|t| t.term == "cant go on"));
    }

    #[test]
    fn urgency_marker_recorded() {
        let triggers = scan("feeling hopeless tonight");
        assert!(triggers.iter().any(|t| t.tier == CrisisTier::Urgency && t.term == "tonight"));
        assert!(triggers.iter().any(|t| t.tier == CrisisTier::Indicator && t.term == "hopeless"));
    }

    #[test]
    fn benign_query_has_no_triggers() {
        assert!(scan("What are some balance exercises for seniors?").is_empty());
    }

    #[test]
    fn empty_query_has_no_triggers() {
        assert!(scan("").is_empty());
    }

    #[test]
    fn empty_phrases_skipped_at_compile() {
        let mut config = CrisisConfig::default();
        config.direct_phrases.push("   ".into());
        config.direct_phrases.push("?!".into());
        assert_eq!(CrisisLexicon::compile(&config).len(), lexicon().len());
    }

    #[test]
    fn find_occurrences_multiple() {
        let words = vec!["cut", "myself", "and", "cut", "myself"];
        assert_eq!(find_occurrences(&words, &["cut", "myself"]), vec![0, 3]);
        assert!(find_occurrences(&words, &["myself", "cut", "and", "x", "y", "z"]).is_empty());
    }
}

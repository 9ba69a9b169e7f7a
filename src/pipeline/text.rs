//! Text normalization shared by every stage.
//!
//! The crisis lexicon, the cache fingerprint, the classifier and the
//! knowledge matcher all see the same normalized form, so a phrase that
//! matches in one stage matches in all of them.

use sha2::{Digest, Sha256};

/// Lower-case, drop apostrophes, map other punctuation to spaces and
/// collapse whitespace. "Can't  go-on!" becomes "cant go on".
pub fn normalize(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut pending_space = false;

    for c in text.chars().flat_map(char::to_lowercase) {
        if is_apostrophe(c) {
            continue;
        }
        if c.is_alphanumeric() {
            if pending_space && !out.is_empty() {
                out.push(' ');
            }
            pending_space = false;
            out.push(c);
        } else {
            pending_space = true;
        }
    }
    out
}

fn is_apostrophe(c: char) -> bool {
    matches!(c, '\'' | '\u{2018}' | '\u{2019}' | '\u{02BC}' | '`')
}

/// Cache key: hex SHA-256 of the normalized query.
pub fn fingerprint(normalized: &str) -> String {
    format!("{:x}", Sha256::digest(normalized.as_bytes()))
}

/// Word tokens of two or more characters from normalized text.
pub fn tokens(normalized: &str) -> Vec<&str> {
    normalized
        .split(' ')
        .filter(|t| t.chars().nth(1).is_some())
        .collect()
}

/// All n-grams of length `min_n..=max_n`, space-joined, in text order.
pub fn ngrams(tokens: &[&str], min_n: usize, max_n: usize) -> Vec<String> {
    let mut grams = Vec::new();
    let min_n = min_n.max(1);
    for n in min_n..=max_n {
        if n > tokens.len() {
            break;
        }
        for window in tokens.windows(n) {
            grams.push(window.join(" "));
        }
    }
    grams
}

/// Seed derived from a fingerprint, used for stable variant rotation.
pub fn seed_from_fingerprint(fingerprint: &str) -> u64 {
    fingerprint
        .get(..16)
        .and_then(|hex| u64::from_str_radix(hex, 16).ok())
        .unwrap_or(0)
}

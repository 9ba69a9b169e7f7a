//! Relationship and severity extraction for template personalization.
//!
//! Pure and infallible. Runs on normalized text, so patterns are written
//! lower-case without apostrophes ("im", "wont").

use std::collections::{BTreeMap, BTreeSet};
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::models::{RelationshipRole, SeverityModifier};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractedContext {
    /// Role → earliest surface phrase, e.g. family_member → "my mother".
    pub relationships: BTreeMap<RelationshipRole, String>,
    pub severity: BTreeSet<SeverityModifier>,
    /// Subject used for personalization.
    pub primary: Option<RelationshipRole>,
}

impl ExtractedContext {
    pub fn is_empty(&self) -> bool {
        self.relationships.is_empty() && self.severity.is_empty()
    }

    /// Second-person subject: "my mother" → "your mother".
    pub fn subject(&self) -> Option<String> {
        let role = self.primary?;
        if role == RelationshipRole::Myself {
            return Some("your situation".to_string());
        }
        let phrase = self.relationships.get(&role)?;
        Some(match phrase.strip_prefix("my ") {
            Some(rest) => format!("your {rest}"),
            None => phrase.clone(),
        })
    }

    pub fn has_urgent_severity(&self) -> bool {
        self.severity.iter().any(SeverityModifier::is_urgent)
    }
}

static RELATIONSHIP_PATTERNS: LazyLock<Vec<(RelationshipRole, Regex)>> = LazyLock::new(|| {
    vec![
        (
            RelationshipRole::FamilyMember,
            Regex::new(r"\bmy (mother|mom|mum|father|dad|parent|grandmother|grandma|grandfather|grandpa|aunt|uncle|brother|sister)s?\b").unwrap(),
        ),
        (
            RelationshipRole::Spouse,
            Regex::new(r"\bmy (husband|wife|spouse|partner)s?\b").unwrap(),
        ),
        (
            RelationshipRole::Child,
            Regex::new(r"\bmy (son|daughter|children|child|kid)s?\b").unwrap(),
        ),
        (
            RelationshipRole::Myself,
            Regex::new(r"\b(?:myself|i feel|i am|im)\b").unwrap(),
        ),
    ]
});

static SEVERITY_PATTERNS: LazyLock<Vec<(SeverityModifier, Regex)>> = LazyLock::new(|| {
    vec![
        (
            SeverityModifier::Severe,
            Regex::new(r"\b(?:severe|severely|extreme|excruciating|unbearable)\b").unwrap(),
        ),
        (
            SeverityModifier::Sudden,
            Regex::new(r"\b(?:sudden|suddenly|abrupt|abruptly|out of nowhere)\b").unwrap(),
        ),
        (
            SeverityModifier::Chronic,
            Regex::new(r"\b(?:chronic|long term|ongoing|for years)\b").unwrap(),
        ),
        (
            SeverityModifier::Worsening,
            Regex::new(r"\b(?:worse|worsening|getting worse|deteriorating|declining)\b").unwrap(),
        ),
        (
            SeverityModifier::Persistent,
            Regex::new(r"\b(?:persistent|constant|constantly|wont go away|all the time)\b").unwrap(),
        ),
        (
            SeverityModifier::Mild,
            Regex::new(r"\b(?:mild|mildly|slight|slightly|minor)\b").unwrap(),
        ),
    ]
});

/// Extract context from normalized query text.
pub fn extract_context(normalized: &str) -> ExtractedContext {
    let mut context = ExtractedContext::default();
    let mut earliest: Option<(usize, RelationshipRole)> = None;

    for (role, regex) in RELATIONSHIP_PATTERNS.iter() {
        let Some(caps) = regex.captures(normalized) else {
            continue;
        };
        let Some(found) = caps.get(0) else {
            continue;
        };
        // possessive "my fathers" is recorded as "my father"
        let phrase = match caps.get(1) {
            Some(noun) => format!("my {}", noun.as_str()),
            None => found.as_str().to_string(),
        };
        context.relationships.insert(*role, phrase);
        // self is the subject only when nobody else is mentioned
        if *role != RelationshipRole::Myself && earliest.map_or(true, |(pos, _)| found.start() < pos) {
            earliest = Some((found.start(), *role));
        }
    }
    context.primary = earliest.map(|(_, role)| role).or_else(|| {
        context
            .relationships
            .contains_key(&RelationshipRole::Myself)
            .then_some(RelationshipRole::Myself)
    });

    for (modifier, regex) in SEVERITY_PATTERNS.iter() {
        if regex.is_match(normalized) {
            context.severity.insert(*modifier);
        }
    }

    context
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::text::normalize;

    fn extract(q: &str) -> ExtractedContext {
        extract_context(&normalize(q))
    }

    #[test]
    fn mother_is_family_member() {
        let ctx = extract("How can I help my mom with bathing?");
        assert_eq!(ctx.relationships[&RelationshipRole::FamilyMember], "my mom");
        assert_eq!(ctx.primary, Some(RelationshipRole::FamilyMember));
        assert_eq!(ctx.subject().unwrap(), "your mom");
    }

    #[test]
    fn spouse_and_child_recognized() {
        let ctx = extract("My wife and my son both struggle with stairs");
        assert!(ctx.relationships.contains_key(&RelationshipRole::Spouse));
        assert!(ctx.relationships.contains_key(&RelationshipRole::Child));
        assert_eq!(ctx.primary, Some(RelationshipRole::Spouse));
    }

    #[test]
    fn earliest_relationship_is_primary() {
        let ctx = extract("my daughter asked about my father's pills");
        assert_eq!(ctx.relationships[&RelationshipRole::FamilyMember], "my father");
        assert_eq!(ctx.primary, Some(RelationshipRole::Child));
        assert_eq!(ctx.subject().unwrap(), "your daughter");
    }

    #[test]
    fn self_only_when_nobody_else() {
        let ctx = extract("I'm caring for my mother and I feel exhausted");
        assert!(ctx.relationships.contains_key(&RelationshipRole::Myself));
        assert_eq!(ctx.primary, Some(RelationshipRole::FamilyMember));

        let ctx = extract("I feel anxious all the time");
        assert_eq!(ctx.primary, Some(RelationshipRole::Myself));
        assert_eq!(ctx.subject().unwrap(), "your situation");
    }

    #[test]
    fn severity_modifiers_collected() {
        let ctx = extract("Sudden, severe knee pain that keeps getting worse");
        assert!(ctx.severity.contains(&SeverityModifier::Sudden));
        assert!(ctx.severity.contains(&SeverityModifier::Severe));
        assert!(ctx.severity.contains(&SeverityModifier::Worsening));
        assert!(ctx.has_urgent_severity());
    }

    #[test]
    fn apostrophe_forms_match() {
        let ctx = extract("the ache won't go away");
        assert!(ctx.severity.contains(&SeverityModifier::Persistent));
        assert!(!ctx.has_urgent_severity());
    }

    #[test]
    fn word_boundaries_respected() {
        // "momentum" is not "mom", "severed" is not "severe"
        let ctx = extract("my momentum severed");
        assert!(ctx.is_empty());
    }

    #[test]
    fn empty_query_empty_context() {
        let ctx = extract("");
        assert!(ctx.is_empty());
        assert_eq!(ctx.primary, None);
        assert_eq!(ctx.subject(), None);
    }
}

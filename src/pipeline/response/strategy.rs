//! Ordered response sources.
//!
//! Each source either answers or declines; the chain asks them in the
//! order the configured `ResponseMode` dictates and ends with an
//! infallible fallback. Modes:
//!
//! - `template`: classifier template → knowledge base → fallback
//! - `knowledge_base`: knowledge base → classifier template → fallback
//! - `hybrid`: knowledge base within the classified category → classifier
//!   template → unrestricted knowledge base → fallback

use std::sync::Arc;

use crate::engine_config::ResponseMode;
use crate::models::{Category, ResponseMethod};
use crate::pipeline::classify::ClassificationResult;
use crate::pipeline::context::ExtractedContext;
use crate::pipeline::knowledge::{KnowledgeMatcher, MatchOutcome};

use super::render::ResponseRenderer;

/// Everything a source may use to answer.
pub struct SourceInput<'a> {
    pub normalized: &'a str,
    /// `None` when no classifier model is loaded.
    pub classification: Option<&'a ClassificationResult>,
    pub context: &'a ExtractedContext,
    pub seed: u64,
}

impl SourceInput<'_> {
    /// Classification that cleared the acceptance threshold.
    fn confident(&self) -> Option<&ClassificationResult> {
        self.classification.filter(|c| !c.low_confidence)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SourceOutput {
    pub text: String,
    pub category: Category,
    pub confidence: f64,
    pub method: ResponseMethod,
}

pub trait ResponseSource: Send + Sync {
    fn name(&self) -> &'static str;

    /// Answer, or `None` to let the next source try.
    fn respond(&self, input: &SourceInput<'_>) -> Option<SourceOutput>;
}

// ═══════════════════════════════════════════════════════════
// Sources
// ═══════════════════════════════════════════════════════════

/// Category template for a confident classification.
pub struct ClassifierTemplateSource {
    renderer: Arc<ResponseRenderer>,
}

impl ResponseSource for ClassifierTemplateSource {
    fn name(&self) -> &'static str {
        "classifier_template"
    }

    fn respond(&self, input: &SourceInput<'_>) -> Option<SourceOutput> {
        let c = input.confident()?;
        Some(SourceOutput {
            text: self.renderer.render_template(c.category, input.context, input.seed),
            category: c.category,
            confidence: c.confidence,
            method: ResponseMethod::MlModel,
        })
    }
}

/// Nearest historical answer above the similarity floor.
pub struct KnowledgeSource {
    matcher: Arc<KnowledgeMatcher>,
    renderer: Arc<ResponseRenderer>,
    /// Only search within a confidently classified category.
    restrict_to_category: bool,
}

impl ResponseSource for KnowledgeSource {
    fn name(&self) -> &'static str {
        if self.restrict_to_category {
            "knowledge_base_in_category"
        } else {
            "knowledge_base"
        }
    }

    fn respond(&self, input: &SourceInput<'_>) -> Option<SourceOutput> {
        let restriction = if self.restrict_to_category {
            Some(input.confident()?.category)
        } else {
            None
        };

        match self.matcher.best(input.normalized, restriction) {
            MatchOutcome::Matched(found) => Some(SourceOutput {
                text: self.renderer.render_knowledge(&found, input.context),
                category: found.category,
                confidence: found.similarity.clamp(0.0, 1.0),
                method: ResponseMethod::KnowledgeBase,
            }),
            MatchOutcome::NoSufficientMatch { best_similarity } => {
                tracing::debug!(
                    source = self.name(),
                    best_similarity,
                    floor = self.matcher.min_similarity(),
                    "No sufficiently similar knowledge entry"
                );
                None
            }
        }
    }
}

/// Generic safe answer. Never declines.
pub struct FallbackSource {
    renderer: Arc<ResponseRenderer>,
}

impl FallbackSource {
    /// Fallback text for the classifier's best guess, even a low-confidence
    /// one; `general` when nothing was classified.
    pub fn produce(&self, input: &SourceInput<'_>) -> SourceOutput {
        let (category, confidence) = input
            .classification
            .map_or((Category::General, 0.0), |c| (c.category, c.confidence));
        SourceOutput {
            text: self.renderer.render_fallback(category, input.context),
            category,
            confidence,
            method: ResponseMethod::Fallback,
        }
    }
}

impl ResponseSource for FallbackSource {
    fn name(&self) -> &'static str {
        "fallback"
    }

    fn respond(&self, input: &SourceInput<'_>) -> Option<SourceOutput> {
        Some(self.produce(input))
    }
}

// ═══════════════════════════════════════════════════════════
// Chain
// ═══════════════════════════════════════════════════════════

pub struct ResponseChain {
    sources: Vec<Box<dyn ResponseSource>>,
    fallback: FallbackSource,
}

impl ResponseChain {
    /// Order sources for `mode`. Knowledge sources are skipped when no
    /// matcher is available.
    pub fn for_mode(
        mode: ResponseMode,
        renderer: Arc<ResponseRenderer>,
        matcher: Option<Arc<KnowledgeMatcher>>,
    ) -> Self {
        let template = || -> Box<dyn ResponseSource> {
            Box::new(ClassifierTemplateSource {
                renderer: Arc::clone(&renderer),
            })
        };
        let knowledge = |restrict_to_category: bool| -> Option<Box<dyn ResponseSource>> {
            matcher.as_ref().map(|m| {
                Box::new(KnowledgeSource {
                    matcher: Arc::clone(m),
                    renderer: Arc::clone(&renderer),
                    restrict_to_category,
                }) as Box<dyn ResponseSource>
            })
        };

        let ordered: Vec<Option<Box<dyn ResponseSource>>> = match mode {
            ResponseMode::Template => vec![Some(template()), knowledge(false)],
            ResponseMode::KnowledgeBase => vec![knowledge(false), Some(template())],
            ResponseMode::Hybrid => vec![knowledge(true), Some(template()), knowledge(false)],
        };
        let sources: Vec<_> = ordered.into_iter().flatten().collect();

        tracing::debug!(
            mode = %mode,
            sources = ?sources.iter().map(|s| s.name()).collect::<Vec<_>>(),
            "Response chain assembled"
        );

        Self {
            sources,
            fallback: FallbackSource {
                renderer: Arc::clone(&renderer),
            },
        }
    }

    pub fn source_names(&self) -> Vec<&'static str> {
        self.sources
            .iter()
            .map(|s| s.name())
            .chain(std::iter::once(self.fallback.name()))
            .collect()
    }

    /// First source that answers; the fallback otherwise.
    pub fn respond(&self, input: &SourceInput<'_>) -> SourceOutput {
        self.sources
            .iter()
            .find_map(|source| source.respond(input))
            .unwrap_or_else(|| self.fallback.produce(input))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine_config::KnowledgeBaseConfig;
    use crate::pipeline::knowledge::{KnowledgeCorpus, KnowledgeEntry};
    use crate::pipeline::response::templates::TemplateCatalog;
    use crate::pipeline::text::normalize;

    fn renderer() -> Arc<ResponseRenderer> {
        Arc::new(ResponseRenderer::new(Arc::new(TemplateCatalog::builtin())))
    }

    fn matcher() -> Arc<KnowledgeMatcher> {
        let corpus = KnowledgeCorpus::from_entries(vec![
            KnowledgeEntry::new(Category::AdlMobility, "balance exercises for seniors", "Tai chi improves balance."),
            KnowledgeEntry::new(Category::SeniorSocial, "balance work and social life", "Group classes combine both."),
            KnowledgeEntry::new(Category::CaregiverRespite, "adult day care options", "Adult day programs offer respite."),
        ]);
        Arc::new(KnowledgeMatcher::build(corpus, &KnowledgeBaseConfig::default()).unwrap())
    }

    fn classification(category: Category, confidence: f64, low: bool) -> ClassificationResult {
        ClassificationResult {
            category,
            confidence,
            secondary: Vec::new(),
            low_confidence: low,
            model_version: "test".into(),
        }
    }

    fn run(chain: &ResponseChain, query: &str, classification: Option<&ClassificationResult>) -> SourceOutput {
        let normalized = normalize(query);
        let context = ExtractedContext::default();
        chain.respond(&SourceInput {
            normalized: &normalized,
            classification,
            context: &context,
            seed: 3,
        })
    }

    #[test]
    fn template_mode_prefers_classifier() {
        let chain = ResponseChain::for_mode(ResponseMode::Template, renderer(), Some(matcher()));
        let c = classification(Category::AdlMobility, 0.9, false);
        let out = run(&chain, "balance exercises for seniors", Some(&c));
        assert_eq!(out.method, ResponseMethod::MlModel);
        assert_eq!(out.category, Category::AdlMobility);
        assert_eq!(out.confidence, 0.9);
    }

    #[test]
    fn template_mode_low_confidence_uses_knowledge() {
        let chain = ResponseChain::for_mode(ResponseMode::Template, renderer(), Some(matcher()));
        let c = classification(Category::General, 0.3, true);
        let out = run(&chain, "adult day care options", Some(&c));
        assert_eq!(out.method, ResponseMethod::KnowledgeBase);
        assert_eq!(out.category, Category::CaregiverRespite);
        assert!(out.text.contains("Adult day programs"));
    }

    #[test]
    fn knowledge_mode_prefers_knowledge() {
        let chain = ResponseChain::for_mode(ResponseMode::KnowledgeBase, renderer(), Some(matcher()));
        let c = classification(Category::AdlMobility, 0.95, false);
        let out = run(&chain, "balance exercises for seniors", Some(&c));
        assert_eq!(out.method, ResponseMethod::KnowledgeBase);
        assert!(out.text.contains("Tai chi"));
    }

    #[test]
    fn knowledge_mode_without_match_uses_template() {
        let chain = ResponseChain::for_mode(ResponseMode::KnowledgeBase, renderer(), Some(matcher()));
        let c = classification(Category::DisabilityRights, 0.8, false);
        let out = run(&chain, "workplace accommodations", Some(&c));
        assert_eq!(out.method, ResponseMethod::MlModel);
        assert_eq!(out.category, Category::DisabilityRights);
    }

    #[test]
    fn hybrid_restricts_knowledge_to_category() {
        let chain = ResponseChain::for_mode(ResponseMode::Hybrid, renderer(), Some(matcher()));
        let c = classification(Category::SeniorSocial, 0.8, false);
        let out = run(&chain, "balance work and social life", Some(&c));
        assert_eq!(out.method, ResponseMethod::KnowledgeBase);
        assert_eq!(out.category, Category::SeniorSocial);
    }

    #[test]
    fn hybrid_without_confident_class_searches_everything() {
        let chain = ResponseChain::for_mode(ResponseMode::Hybrid, renderer(), Some(matcher()));
        let out = run(&chain, "adult day care options", None);
        assert_eq!(out.method, ResponseMethod::KnowledgeBase);
        assert_eq!(out.category, Category::CaregiverRespite);
    }

    #[test]
    fn no_model_no_match_falls_back() {
        let chain = ResponseChain::for_mode(ResponseMode::Template, renderer(), Some(matcher()));
        let out = run(&chain, "zebra xylophone", None);
        assert_eq!(out.method, ResponseMethod::Fallback);
        assert_eq!(out.category, Category::General);
        assert_eq!(out.confidence, 0.0);
        assert!(out.text.contains("consult"));
    }

    #[test]
    fn low_confidence_without_match_uses_best_guess_fallback() {
        let chain = ResponseChain::for_mode(ResponseMode::Template, renderer(), Some(matcher()));
        let c = classification(Category::CaregiverRespite, 0.42, true);
        let out = run(&chain, "zebra xylophone", Some(&c));
        assert_eq!(out.method, ResponseMethod::Fallback);
        assert_eq!(out.category, Category::CaregiverRespite);
        assert_eq!(out.confidence, 0.42);
        let respite = &TemplateCatalog::builtin().templates[&Category::CaregiverRespite].fallback;
        assert!(out.text.starts_with(respite.as_str()), "{}", out.text);
    }

    #[test]
    fn missing_matcher_skips_knowledge_sources() {
        let chain = ResponseChain::for_mode(ResponseMode::Hybrid, renderer(), None);
        assert_eq!(chain.source_names(), vec!["classifier_template", "fallback"]);
    }

    #[test]
    fn source_order_per_mode() {
        let names = |mode| ResponseChain::for_mode(mode, renderer(), Some(matcher())).source_names();
        assert_eq!(names(ResponseMode::Template), vec!["classifier_template", "knowledge_base", "fallback"]);
        assert_eq!(names(ResponseMode::KnowledgeBase), vec!["knowledge_base", "classifier_template", "fallback"]);
        assert_eq!(
            names(ResponseMode::Hybrid),
            vec!["knowledge_base_in_category", "classifier_template", "knowledge_base", "fallback"]
        );
    }
}

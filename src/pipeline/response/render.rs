//! Renders final response text from the template catalog.
//!
//! Variant choice is a pure function of (category, fingerprint seed): the
//! same query always renders the same way, distinct queries vary.

use std::sync::Arc;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use crate::models::{Category, CrisisResources, RelationshipRole};
use crate::pipeline::context::ExtractedContext;
use crate::pipeline::knowledge::KnowledgeMatch;

use super::templates::{ResponseTemplate, TemplateCatalog, SUBJECT_SLOT};

pub struct ResponseRenderer {
    catalog: Arc<TemplateCatalog>,
}

impl ResponseRenderer {
    pub fn new(catalog: Arc<TemplateCatalog>) -> Self {
        Self { catalog }
    }

    pub fn catalog(&self) -> &TemplateCatalog {
        &self.catalog
    }

    pub fn disclaimer(&self) -> &str {
        &self.catalog.disclaimer
    }

    pub fn crisis_resources(&self) -> &CrisisResources {
        &self.catalog.crisis.resources
    }

    /// Single entry point: crisis overrides everything else.
    pub fn render(
        &self,
        category: Category,
        confidence: f64,
        context: &ExtractedContext,
        crisis: bool,
        seed: u64,
    ) -> String {
        if crisis {
            tracing::debug!(category = %category, confidence, "Rendering crisis template");
            return self.render_crisis();
        }
        self.render_template(category, context, seed)
    }

    /// Fixed crisis message. Carries no disclaimer.
    pub fn render_crisis(&self) -> String {
        let c = &self.catalog.crisis;
        let r = &c.resources;
        format!(
            "{}\n\n{}\n\n\
             • Suicide & Crisis Lifeline: call or text {}\n\
             • Crisis Text Line: {}\n\
             • Emergency services: {}\n\n{}",
            c.alert_marker, c.headline, r.lifeline, r.text_line, r.emergency, c.supportive_message
        )
    }

    /// Opening, body and closing for `category`, plus severity note and disclaimer.
    pub fn render_template(&self, category: Category, context: &ExtractedContext, seed: u64) -> String {
        let Some(template) = self.template_for(category) else {
            return self.render_fallback(category, context);
        };
        let mut rng = StdRng::seed_from_u64(seed ^ (category.index() as u64).rotate_left(32));

        let subject = context.subject();
        let opening = match (&subject, template.personalized_openings.choose(&mut rng)) {
            (Some(subject), Some(personal)) => personal.replace(SUBJECT_SLOT, subject),
            _ => pick(&template.openings, &mut rng),
        };
        let body = pick(&template.bodies, &mut rng);
        let closing = pick(&template.closings, &mut rng);

        let mut text = format!("{opening} {body}");
        self.push_severity_note(&mut text, context);
        text.push(' ');
        text.push_str(&closing);
        self.finish(text)
    }

    /// A historical answer with optional personalized lead-in.
    pub fn render_knowledge(&self, found: &KnowledgeMatch, context: &ExtractedContext) -> String {
        let mut text = String::new();
        let about_someone_else = context.primary.is_some_and(|r| r != RelationshipRole::Myself);
        if let Some(subject) = context.subject().filter(|_| about_someone_else) {
            if self.catalog.knowledge_lead_in.contains(SUBJECT_SLOT) {
                text.push_str(&self.catalog.knowledge_lead_in.replace(SUBJECT_SLOT, &subject));
                text.push(' ');
            }
        }
        text.push_str(&found.response);
        self.push_severity_note(&mut text, context);
        self.finish(text)
    }

    /// Category fallback text; general fallback when the category has none.
    pub fn render_fallback(&self, category: Category, context: &ExtractedContext) -> String {
        let mut text = self
            .template_for(category)
            .or_else(|| self.template_for(Category::General))
            .map(|t| t.fallback.clone())
            .unwrap_or_default();
        self.push_severity_note(&mut text, context);
        self.finish(text)
    }

    /// Reply to an empty query, disclaimer attached.
    pub fn render_clarifying(&self) -> String {
        self.finish(self.catalog.clarifying_message.clone())
    }

    fn template_for(&self, category: Category) -> Option<&ResponseTemplate> {
        self.catalog.template(category)
    }

    fn push_severity_note(&self, text: &mut String, context: &ExtractedContext) {
        if context.has_urgent_severity() && !self.catalog.severity_note.is_empty() {
            if !text.is_empty() {
                text.push(' ');
            }
            text.push_str(&self.catalog.severity_note);
        }
    }

    fn finish(&self, mut text: String) -> String {
        if !text.is_empty() {
            text.push_str("\n\n");
        }
        text.push_str(&self.catalog.disclaimer);
        text
    }
}

fn pick(list: &[String], rng: &mut StdRng) -> String {
    list.choose(rng).cloned().unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::context::extract_context;
    use crate::pipeline::text::{fingerprint, normalize, seed_from_fingerprint};

    fn renderer() -> ResponseRenderer {
        ResponseRenderer::new(Arc::new(TemplateCatalog::builtin()))
    }

    fn seed(q: &str) -> u64 {
        seed_from_fingerprint(&fingerprint(&normalize(q)))
    }

    #[test]
    fn crisis_contains_all_resources() {
        let text = renderer().render(Category::General, 0.1, &ExtractedContext::default(), true, 0);
        assert!(text.contains("988"));
        assert!(text.contains("741741"));
        assert!(text.contains("911"));
        assert!(text.contains("🚨"));
        assert!(!text.contains("consult"));
    }

    #[test]
    fn template_always_has_disclaimer() {
        let r = renderer();
        for category in Category::ALL {
            let text = r.render(category, 0.9, &ExtractedContext::default(), false, 42);
            assert!(text.ends_with(r.disclaimer()), "{category}");
            assert!(text.contains("consult"));
        }
    }

    #[test]
    fn same_seed_same_text() {
        let r = renderer();
        let ctx = ExtractedContext::default();
        let a = r.render_template(Category::AdlMobility, &ctx, seed("balance exercises"));
        let b = r.render_template(Category::AdlMobility, &ctx, seed("balance exercises"));
        assert_eq!(a, b);
    }

    #[test]
    fn variants_rotate_across_queries() {
        let r = renderer();
        let ctx = ExtractedContext::default();
        let distinct: std::collections::HashSet<String> = (0..40)
            .map(|i| r.render_template(Category::AdlMobility, &ctx, seed(&format!("query {i}"))))
            .collect();
        assert!(distinct.len() > 1);
    }

    #[test]
    fn personalized_opening_uses_subject() {
        let r = renderer();
        let ctx = extract_context(&normalize("how can my mother avoid falls"));
        let text = r.render_template(Category::AdlMobility, &ctx, 7);
        assert!(text.starts_with("Helping your mother"));
        assert!(!text.contains(SUBJECT_SLOT));
    }

    #[test]
    fn severity_note_for_urgent_modifiers() {
        let r = renderer();
        let ctx = extract_context(&normalize("sudden dizziness when standing"));
        let text = r.render_template(Category::AdlMobility, &ctx, 1);
        assert!(text.contains(&r.catalog().severity_note));

        let calm = r.render_template(Category::AdlMobility, &ExtractedContext::default(), 1);
        assert!(!calm.contains(&r.catalog().severity_note));
    }

    #[test]
    fn knowledge_answer_with_lead_in() {
        let r = renderer();
        let found = KnowledgeMatch {
            query: "walker for dad".into(),
            response: "A physical therapist can fit a walker.".into(),
            category: Category::AdlMobility,
            similarity: 0.8,
        };
        let ctx = extract_context(&normalize("my dad needs a walker"));
        let text = r.render_knowledge(&found, &ctx);
        assert!(text.starts_with("Here is what has helped others in a similar situation with your dad."));
        assert!(text.contains("A physical therapist can fit a walker."));
        assert!(text.ends_with(r.disclaimer()));

        let plain = r.render_knowledge(&found, &ExtractedContext::default());
        assert!(plain.starts_with("A physical therapist"));
    }

    #[test]
    fn fallback_and_clarifying_have_disclaimer() {
        let r = renderer();
        let fb = r.render_fallback(Category::CaregiverRespite, &ExtractedContext::default());
        assert!(fb.starts_with("Respite care"));
        assert!(fb.ends_with(r.disclaimer()));
        assert!(r.render_clarifying().ends_with(r.disclaimer()));
    }
}

//! Response template catalog.
//!
//! One template per category (11 specific + `general`), the crisis
//! template with its hotline resources, the catalog-wide disclaimer and
//! the clarifying message for empty queries. Loaded once at startup and
//! never mutated. The built-in catalog can be replaced by a JSON file of
//! the same shape.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::models::{Category, CrisisResources};

use super::TemplateError;

/// Slot filled with the personalization subject ("your mother").
pub const SUBJECT_SLOT: &str = "{subject}";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseTemplate {
    /// Interchangeable first sentences.
    pub openings: Vec<String>,
    /// Openings containing `{subject}`, used when context names someone.
    #[serde(default)]
    pub personalized_openings: Vec<String>,
    pub bodies: Vec<String>,
    pub closings: Vec<String>,
    /// Complete text used when no better source answers.
    pub fallback: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrisisTemplate {
    /// Visual alert line, e.g. "🚨 CRISIS SUPPORT NEEDED 🚨".
    pub alert_marker: String,
    pub headline: String,
    pub supportive_message: String,
    pub resources: CrisisResources,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemplateCatalog {
    pub version: String,
    /// Appended to every non-crisis response.
    pub disclaimer: String,
    /// Reply to an empty query.
    pub clarifying_message: String,
    /// Appended when severe, sudden or worsening symptoms are mentioned.
    pub severity_note: String,
    /// Lead-in for knowledge-base answers; may contain `{subject}`.
    pub knowledge_lead_in: String,
    pub crisis: CrisisTemplate,
    pub templates: BTreeMap<Category, ResponseTemplate>,
}

impl TemplateCatalog {
    pub fn load(path: &Path) -> Result<Self, TemplateError> {
        let raw = std::fs::read_to_string(path).map_err(|source| TemplateError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let catalog: Self = serde_json::from_str(&raw)?;
        catalog.validate()?;
        Ok(catalog)
    }

    pub fn template(&self, category: Category) -> Option<&ResponseTemplate> {
        self.templates.get(&category)
    }

    /// Every category has a template with non-empty fragment lists;
    /// disclaimer and crisis contacts are present.
    pub fn validate(&self) -> Result<(), TemplateError> {
        let invalid = |msg: String| Err(TemplateError::Invalid(msg));

        if self.disclaimer.trim().is_empty() {
            return invalid("disclaimer is empty".into());
        }
        if self.clarifying_message.trim().is_empty() {
            return invalid("clarifying_message is empty".into());
        }
        let r = &self.crisis.resources;
        if [&r.lifeline, &r.text_line, &r.emergency].iter().any(|s| s.trim().is_empty()) {
            return invalid("crisis resources must all be set".into());
        }
        if self.crisis.alert_marker.trim().is_empty() || self.crisis.supportive_message.trim().is_empty() {
            return invalid("crisis template is incomplete".into());
        }

        for category in Category::ALL {
            let Some(t) = self.templates.get(&category) else {
                return invalid(format!("no template for {category}"));
            };
            let lists = [("openings", &t.openings), ("bodies", &t.bodies), ("closings", &t.closings)];
            for (name, list) in lists {
                if list.is_empty() || list.iter().any(|s| s.trim().is_empty()) {
                    return invalid(format!("{category}: {name} empty or has blank entries"));
                }
            }
            if t.personalized_openings.iter().any(|s| !s.contains(SUBJECT_SLOT)) {
                return invalid(format!("{category}: personalized opening without {SUBJECT_SLOT}"));
            }
            if t.fallback.trim().is_empty() {
                return invalid(format!("{category}: fallback is empty"));
            }
        }
        Ok(())
    }

    /// Catalog compiled into the binary.
    pub fn builtin() -> Self {
        let mut templates = BTreeMap::new();
        for (category, template) in builtin_templates() {
            templates.insert(category, template);
        }

        Self {
            version: "builtin-1".into(),
            disclaimer: "⚠️ This is general information, not medical advice. Please consult your \
                         doctor or another qualified healthcare provider about your specific situation."
                .into(),
            clarifying_message: "I didn't catch a question there. You can ask me about mobility and daily \
                                 living, senior care and medications, mental health, caregiver support, \
                                 or disability equipment and rights."
                .into(),
            severity_note: "Because you mentioned symptoms that are severe, sudden or getting worse, \
                            please contact a healthcare provider promptly. If it feels like an \
                            emergency, call 911."
                .into(),
            knowledge_lead_in: "Here is what has helped others in a similar situation with {subject}.".into(),
            crisis: CrisisTemplate {
                alert_marker: "🚨 CRISIS SUPPORT NEEDED 🚨".into(),
                headline: "If you are having thoughts of suicide or self-harm, please reach out for \
                           help right now:"
                    .into(),
                supportive_message: "You are not alone, and you don't have to go through this by \
                                     yourself. Trained counselors are available 24/7, free and \
                                     confidential."
                    .into(),
                resources: CrisisResources::default(),
            },
            templates,
        }
    }
}

impl Default for TemplateCatalog {
    fn default() -> Self {
        Self::builtin()
    }
}

fn template(
    openings: &[&str],
    personalized: &[&str],
    bodies: &[&str],
    closings: &[&str],
    fallback: &str,
) -> ResponseTemplate {
    let owned = |list: &[&str]| list.iter().map(|s| s.to_string()).collect();
    ResponseTemplate {
        openings: owned(openings),
        personalized_openings: owned(personalized),
        bodies: owned(bodies),
        closings: owned(closings),
        fallback: fallback.to_string(),
    }
}

fn builtin_templates() -> Vec<(Category, ResponseTemplate)> {
    vec![
        (
            Category::AdlMobility,
            template(
                &[
                    "Staying mobile and steady on your feet makes a real difference to independence.",
                    "Mobility questions are some of the most common we hear, and there is a lot that helps.",
                ],
                &["Helping {subject} stay mobile and safe is worth the effort."],
                &[
                    "Gentle balance and strength work, such as tai chi, chair exercises or heel-to-toe walking, can lower fall risk. A physical therapist can tailor a program and check whether a cane or walker would help.",
                    "Simple home changes help too: clear walkways, good lighting, grab bars near the toilet and shower, and sturdy handrails on both sides of the stairs.",
                ],
                &[
                    "Start slowly and build up as comfort and confidence grow.",
                    "Each person's needs are different, so a professional mobility assessment is a good first step.",
                ],
                "For mobility and daily living support, an occupational or physical therapist can assess needs and suggest adaptive strategies and equipment.",
            ),
        ),
        (
            Category::AdlSelfCare,
            template(
                &[
                    "Keeping up with daily self-care can get harder, and asking about it is a good step.",
                    "Bathing, dressing and grooming can all be made easier and safer.",
                ],
                &["Supporting {subject} with daily self-care takes patience, and there are tools that help."],
                &[
                    "A shower chair, handheld shower head and non-slip mats make bathing safer. Long-handled sponges and sock aids reduce bending.",
                    "Breaking tasks into smaller steps and laying out clothes in order can keep dressing manageable while preserving independence.",
                ],
                &[
                    "An occupational therapist can suggest adaptations that fit the home and routine.",
                    "Small adjustments often make the biggest difference in day-to-day comfort.",
                ],
                "For help with bathing, dressing or grooming, an occupational therapist can recommend adaptive techniques and equipment.",
            ),
        ),
        (
            Category::SeniorMedication,
            template(
                &[
                    "Managing several medications is a common challenge.",
                    "Keeping medications organized is one of the best things you can do for safety.",
                ],
                &["Keeping track of medications for {subject} can be simplified."],
                &[
                    "A weekly pill organizer, phone alarms or a pharmacy blister pack can help doses get taken on time. Keep an up-to-date list of every medication, including supplements.",
                    "Ask the pharmacist for a medication review. They can spot interactions, duplicate drugs and side effects that are easy to miss.",
                ],
                &[
                    "Never stop or change a medication without talking to the prescriber first.",
                    "Bring the full medication list to every appointment.",
                ],
                "For medication questions, a pharmacist or prescribing doctor can review the full list of medicines and help set up a simple routine.",
            ),
        ),
        (
            Category::SeniorSocial,
            template(
                &[
                    "Staying connected with other people is important for health at any age.",
                    "Loneliness is common later in life, and it can be eased.",
                ],
                &["It's thoughtful to look out for {subject}'s social connections."],
                &[
                    "Senior centers, faith communities, libraries and volunteer programs offer regular chances to meet people. Many areas also run friendly-visitor or phone-buddy programs.",
                    "Regular video calls, shared meals or a weekly outing can give structure and something to look forward to.",
                ],
                &[
                    "Your local Area Agency on Aging can point you to programs nearby.",
                    "Even small, regular contact can lift mood and wellbeing.",
                ],
                "For social connection, local senior centers and Area Agencies on Aging can suggest activities, visiting programs and community groups.",
            ),
        ),
        (
            Category::MentalHealthAnxiety,
            template(
                &[
                    "Anxiety can be exhausting, and these feelings are valid and common.",
                    "Thank you for reaching out about anxiety. Support is available.",
                ],
                &["Worrying about how anxiety is affecting {subject} is understandable."],
                &[
                    "Slow breathing, grounding exercises and regular physical activity can ease anxious moments. Limiting caffeine and keeping a steady sleep routine also help.",
                    "Talking therapies such as cognitive behavioral therapy are effective for anxiety, and a counselor can build a plan that fits.",
                ],
                &[
                    "Don't hesitate to reach out to a mental health professional.",
                    "Take things one step at a time. Support is available.",
                ],
                "For anxiety, a mental health professional can offer strategies and support. Therapy, support groups and helplines are all available.",
            ),
        ),
        (
            Category::MentalHealthDepression,
            template(
                &[
                    "Feeling low for a long stretch is hard, and reaching out matters.",
                    "Depression is a real health condition, and help works.",
                ],
                &["Noticing low mood in {subject} and asking about it is an important step."],
                &[
                    "Keeping a simple daily routine, getting outside, and staying in touch with people you trust can help. Be gentle with yourself on harder days.",
                    "A doctor or counselor can talk through options such as therapy, support groups or medication.",
                ],
                &[
                    "Your wellbeing matters and support is available.",
                    "If things ever feel unbearable, you can call or text 988 at any time.",
                ],
                "For depression or persistent low mood, please talk with a doctor or mental health professional. If you feel unsafe, call or text 988.",
            ),
        ),
        (
            Category::CrisisMentalHealth,
            template(
                &[
                    "It sounds like things are really difficult right now.",
                    "Thank you for reaching out. What you're feeling matters.",
                ],
                &["It sounds like {subject} is going through something very hard."],
                &[
                    "Talking to someone can help, even when it feels like nothing will. The 988 Suicide & Crisis Lifeline is free and confidential, by call or text, at any hour.",
                    "If there is any immediate danger, call 911. Otherwise, reaching out to a trusted person or a crisis line today is a strong first step.",
                ],
                &[
                    "You don't have to go through this alone.",
                    "Support is available right now.",
                ],
                "If you or someone you know is struggling, call or text 988 for the Suicide & Crisis Lifeline, or text HOME to 741741. In an emergency, call 911.",
            ),
        ),
        (
            Category::CaregiverRespite,
            template(
                &[
                    "Taking breaks from caregiving isn't selfish. It's essential.",
                    "Every caregiver needs time to rest and recharge.",
                ],
                &["Arranging a break from caring for {subject} is a healthy choice for both of you."],
                &[
                    "Respite options include adult day programs, in-home respite aides and short stays in a care facility. Family and friends can often help more than you might expect.",
                    "Local caregiver support organizations and the Area Agency on Aging can explain respite services and possible funding.",
                ],
                &[
                    "Taking care of yourself helps you care for others better.",
                    "You deserve support and time for yourself.",
                ],
                "Respite care, adult day programs and caregiver support groups are available in most communities. Local care agencies can explain the options.",
            ),
        ),
        (
            Category::CaregiverBurnout,
            template(
                &[
                    "Caregiver burnout is real, and feeling worn out doesn't mean you're failing.",
                    "Caring for someone over a long time takes a heavy toll.",
                ],
                &["Caring for {subject} is demanding, and your own health counts too."],
                &[
                    "Watch for signs like constant fatigue, irritability or trouble sleeping. Sharing tasks, accepting help and joining a caregiver support group can lighten the load.",
                    "Setting small, realistic goals and protecting a little time each week for yourself can prevent exhaustion from building up.",
                ],
                &[
                    "Don't wait until you're overwhelmed to ask for help.",
                    "Your wellbeing as a caregiver matters.",
                ],
                "Caregiver burnout is common and treatable. Support groups, respite services and talking with your own doctor can all help.",
            ),
        ),
        (
            Category::DisabilityEquipment,
            template(
                &[
                    "The right equipment can make daily life much more independent.",
                    "There are many adaptive tools available, and choosing well matters.",
                ],
                &["Finding the right equipment for {subject} is worth doing carefully."],
                &[
                    "An occupational therapist can assess needs and recommend mobility aids, wheelchairs, or home modifications that fit. Many suppliers offer trials before purchase.",
                    "Insurance, Medicare or state assistive technology programs may cover part of the cost, and loan closets sometimes lend equipment for free.",
                ],
                &[
                    "Getting the fit right matters as much as the equipment itself.",
                    "A professional assessment helps avoid costly mistakes.",
                ],
                "For adaptive equipment, an occupational therapist or your state's assistive technology program can help you find and fund the right tools.",
            ),
        ),
        (
            Category::DisabilityRights,
            template(
                &[
                    "Knowing your rights is an important part of getting the support you need.",
                    "Disability rights protections apply in many areas of life.",
                ],
                &["Understanding the rights that protect {subject} can help you advocate effectively."],
                &[
                    "Laws such as the Americans with Disabilities Act cover workplace accommodations, public access and services. Requests for accommodations are usually best made in writing.",
                    "Disability advocacy organizations and Protection & Advocacy agencies can explain your options and help if a request is refused.",
                ],
                &[
                    "Your independence and dignity come first.",
                    "Many resources exist to support you.",
                ],
                "For questions about disability rights, advocacy organizations and your state's Protection & Advocacy agency can explain protections and next steps.",
            ),
        ),
        (
            Category::General,
            template(
                &[
                    "Thanks for your question.",
                    "That's a good question to ask.",
                ],
                &["It's good that you're looking into this for {subject}."],
                &[
                    "A primary care provider is the best first contact for most health concerns and can refer you to specialists when needed.",
                    "Writing down your questions and symptoms before an appointment helps you get the most from the visit.",
                ],
                &[
                    "Feel free to ask a more specific question.",
                    "Reliable information and professional guidance go hand in hand.",
                ],
                "I can help with daily living and mobility, senior care and medications, mental health, caregiver support, and disability equipment and rights.",
            ),
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_catalog_is_valid() {
        TemplateCatalog::builtin().validate().unwrap();
    }

    #[test]
    fn builtin_covers_every_category_once() {
        let catalog = TemplateCatalog::builtin();
        assert_eq!(catalog.templates.len(), Category::ALL.len());
        for category in Category::ALL {
            assert!(catalog.template(category).is_some(), "missing {category}");
        }
    }

    #[test]
    fn disclaimer_mentions_provider() {
        let d = TemplateCatalog::builtin().disclaimer.to_lowercase();
        assert!(d.contains("consult"));
        assert!(d.contains("healthcare provider"));
    }

    #[test]
    fn crisis_resources_verbatim() {
        let r = TemplateCatalog::builtin().crisis.resources;
        assert_eq!(r.lifeline, "988");
        assert!(r.text_line.contains("741741"));
        assert_eq!(r.emergency, "911");
    }

    #[test]
    fn missing_category_rejected() {
        let mut catalog = TemplateCatalog::builtin();
        catalog.templates.remove(&Category::DisabilityRights);
        let err = catalog.validate().unwrap_err();
        assert!(err.to_string().contains("disability_rights"));
    }

    #[test]
    fn empty_fragment_list_rejected() {
        let mut catalog = TemplateCatalog::builtin();
        catalog.templates.get_mut(&Category::General).unwrap().bodies.clear();
        assert!(catalog.validate().is_err());
    }

    #[test]
    fn personalized_opening_requires_slot() {
        let mut catalog = TemplateCatalog::builtin();
        catalog
            .templates
            .get_mut(&Category::AdlMobility)
            .unwrap()
            .personalized_openings
            .push("No slot here.".into());
        assert!(catalog.validate().is_err());
    }

    #[test]
    fn empty_disclaimer_rejected() {
        let mut catalog = TemplateCatalog::builtin();
        catalog.disclaimer = "  ".into();
        assert!(catalog.validate().is_err());
    }

    #[test]
    fn load_from_json_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("templates.json");
        std::fs::write(&path, serde_json::to_string(&TemplateCatalog::builtin()).unwrap()).unwrap();
        assert_eq!(TemplateCatalog::load(&path).unwrap(), TemplateCatalog::builtin());
    }

    #[test]
    fn load_rejects_unknown_category_key() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("templates.json");
        let mut value = serde_json::to_value(TemplateCatalog::builtin()).unwrap();
        value["templates"]["cardiology"] = value["templates"]["general"].clone();
        std::fs::write(&path, value.to_string()).unwrap();
        assert!(matches!(TemplateCatalog::load(&path), Err(TemplateError::Parse(_))));
    }
}

//! Shared test fixtures: a small fitted model and knowledge corpus.

use std::sync::LazyLock;

use crate::models::Category;
use crate::pipeline::classify::{FitParams, LabeledSample, ModelArtifact};
use crate::pipeline::knowledge::{KnowledgeCorpus, KnowledgeEntry};

pub const MODEL_VERSION: &str = "fixture-1";

const SAMPLES: &[(Category, &str)] = &[
    (Category::AdlMobility, "What are some balance exercises for seniors"),
    (Category::AdlMobility, "Best walker or cane to prevent falls"),
    (Category::AdlMobility, "Stairs are getting hard, how to improve balance and walking"),
    (Category::AdlMobility, "Strength exercises to avoid falls at home"),
    (Category::AdlSelfCare, "Helping my dad with bathing and showering"),
    (Category::AdlSelfCare, "Tips for dressing and grooming an elderly parent"),
    (Category::AdlSelfCare, "Shower chair for safe bathing"),
    (Category::AdlSelfCare, "Toileting and personal hygiene help"),
    (Category::SeniorMedication, "How to keep track of daily pills"),
    (Category::SeniorMedication, "Pill organizer to track medications"),
    (Category::SeniorMedication, "Side effects of blood pressure medication"),
    (Category::SeniorMedication, "Forgetting to take pills on time"),
    (Category::General, "Memory loss and dementia warning signs"),
    (Category::General, "Annual checkup screenings for older adults"),
    (Category::General, "Healthy diet and nutrition in old age"),
    (Category::General, "Hearing and vision decline with aging"),
    (Category::SeniorSocial, "My grandmother is lonely and isolated"),
    (Category::SeniorSocial, "Lonely grandmother needs friends and visits"),
    (Category::SeniorSocial, "Social activities and community centers for retirees"),
    (Category::SeniorSocial, "Ways to reduce isolation and loneliness"),
    (Category::MentalHealthAnxiety, "Constant worry and racing thoughts"),
    (Category::MentalHealthAnxiety, "Panic attacks and nervous feelings"),
    (Category::MentalHealthAnxiety, "How to calm worry and panic"),
    (Category::MentalHealthAnxiety, "Anxiety keeps me nervous all day"),
    (Category::MentalHealthDepression, "Feeling sad and empty for weeks"),
    (Category::MentalHealthDepression, "Lost interest in everything, low mood"),
    (Category::MentalHealthDepression, "Depression and sadness every morning"),
    (Category::MentalHealthDepression, "Crying often and feeling down"),
    (Category::CaregiverBurnout, "Exhausted and overwhelmed from caring for my wife"),
    (Category::CaregiverBurnout, "Caregiver burnout and resentment"),
    (Category::CaregiverBurnout, "So tired and burned out looking after mom"),
    (Category::CaregiverBurnout, "Overwhelmed, exhausted, no energy left"),
    (Category::CaregiverRespite, "Respite care options to get a break"),
    (Category::CaregiverRespite, "Need a break from caregiving"),
    (Category::CaregiverRespite, "Adult day care and short term respite"),
    (Category::CaregiverRespite, "Is there respite care for a weekend break"),
    (Category::DisabilityEquipment, "Which wheelchair should we buy"),
    (Category::DisabilityEquipment, "Power wheelchair versus manual wheelchair"),
    (Category::DisabilityEquipment, "Grab bars, ramps and hearing aids to buy"),
    (Category::DisabilityEquipment, "Adaptive equipment and mobility scooters"),
    (Category::DisabilityRights, "Workplace accommodations under the ADA"),
    (Category::DisabilityRights, "Rights under the Americans with Disabilities Act"),
    (Category::DisabilityRights, "Requesting accommodations from an employer"),
    (Category::DisabilityRights, "Disability discrimination at the workplace"),
    (Category::General, "Where can I find health information"),
    (Category::General, "General question about insurance coverage"),
    (Category::General, "What services are available near me"),
    (Category::General, "Finding a doctor who accepts insurance"),
];

pub fn samples() -> Vec<LabeledSample> {
    SAMPLES
        .iter()
        .map(|(category, text)| LabeledSample::new(*category, text))
        .collect()
}

static ARTIFACT: LazyLock<ModelArtifact> = LazyLock::new(|| {
    let params = FitParams {
        version: MODEL_VERSION.into(),
        ngram_range: (1, 2),
        alpha: 0.01,
        ..FitParams::default()
    };
    ModelArtifact::fit(&samples(), &params).expect("fixture samples fit")
});

/// Fitted over every category.
pub fn artifact() -> ModelArtifact {
    ARTIFACT.clone()
}

pub fn knowledge_corpus() -> KnowledgeCorpus {
    KnowledgeCorpus::from_entries(vec![
        KnowledgeEntry::new(
            Category::AdlMobility,
            "What are some balance exercises for seniors?",
            "Tai chi, heel-to-toe walking and standing on one foot near a counter all build balance.",
        ),
        KnowledgeEntry::new(
            Category::SeniorSocial,
            "My grandmother is lonely since moving",
            "Senior centers and volunteer visiting programs helped many families in this situation.",
        ),
        KnowledgeEntry::new(
            Category::CaregiverRespite,
            "Where can I find adult day care",
            "Your local Area Agency on Aging keeps a list of adult day programs.",
        ),
        KnowledgeEntry::new(
            Category::DisabilityEquipment,
            "How do I choose a wheelchair",
            "An occupational therapist can measure and recommend the right chair.",
        ),
    ])
}

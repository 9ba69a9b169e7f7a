use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A string did not name any variant of the target enum.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Invalid {field} value: {value}")]
pub struct ParseEnumError {
    pub field: String,
    pub value: String,
}

/// Macro to generate enum with as_str + std::str::FromStr + Display pattern
macro_rules! str_enum {
    ($(#[$meta:meta])* $name:ident { $($variant:ident => $s:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub enum $name {
            $(#[serde(rename = $s)] $variant),+
        }

        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $s),+
                }
            }
        }

        impl std::str::FromStr for $name {
            type Err = ParseEnumError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($s => Ok(Self::$variant)),+,
                    _ => Err(ParseEnumError {
                        field: stringify!($name).into(),
                        value: s.into(),
                    }),
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

str_enum!(
    /// Healthcare query taxonomy. `General` is the fallback bucket.
    Category {
        AdlMobility => "adl_mobility",
        AdlSelfCare => "adl_self_care",
        SeniorMedication => "senior_medication",
        SeniorSocial => "senior_social",
        MentalHealthAnxiety => "mental_health_anxiety",
        MentalHealthDepression => "mental_health_depression",
        CrisisMentalHealth => "crisis_mental_health",
        CaregiverRespite => "caregiver_respite",
        CaregiverBurnout => "caregiver_burnout",
        DisabilityEquipment => "disability_equipment",
        DisabilityRights => "disability_rights",
        General => "general",
    }
);

impl Category {
    /// Every category, fallback last. Index order is stable and used for
    /// per-category counters.
    pub const ALL: [Category; 12] = [
        Category::AdlMobility,
        Category::AdlSelfCare,
        Category::SeniorMedication,
        Category::SeniorSocial,
        Category::MentalHealthAnxiety,
        Category::MentalHealthDepression,
        Category::CrisisMentalHealth,
        Category::CaregiverRespite,
        Category::CaregiverBurnout,
        Category::DisabilityEquipment,
        Category::DisabilityRights,
        Category::General,
    ];

    /// Number of specific (non-fallback) categories.
    pub const SPECIFIC_COUNT: usize = 11;

    pub fn index(&self) -> usize {
        // ALL is declared in variant order
        *self as usize
    }

    /// Short human-readable label for logs and rendered text.
    pub fn label(&self) -> &'static str {
        match self {
            Self::AdlMobility => "mobility and daily activities",
            Self::AdlSelfCare => "self-care and daily living",
            Self::SeniorMedication => "medication management",
            Self::SeniorSocial => "social connection",
            Self::MentalHealthAnxiety => "anxiety",
            Self::MentalHealthDepression => "depression and low mood",
            Self::CrisisMentalHealth => "crisis support",
            Self::CaregiverRespite => "caregiver respite",
            Self::CaregiverBurnout => "caregiver burnout",
            Self::DisabilityEquipment => "adaptive equipment",
            Self::DisabilityRights => "disability rights",
            Self::General => "general health",
        }
    }
}

str_enum!(
    /// Which path produced a response.
    ResponseMethod {
        CrisisDetection => "crisis_detection",
        MlModel => "ml_model",
        KnowledgeBase => "knowledge_base",
        Fallback => "fallback",
        Cache => "cache",
    }
);

str_enum!(
    /// Canonical relationship roles recognized in queries.
    RelationshipRole {
        FamilyMember => "family_member",
        Spouse => "spouse",
        Child => "child",
        Myself => "self",
    }
);

str_enum!(
    /// Severity modifiers recognized in queries.
    SeverityModifier {
        Severe => "severe",
        Sudden => "sudden",
        Chronic => "chronic",
        Worsening => "worsening",
        Persistent => "persistent",
        Mild => "mild",
    }
);

impl SeverityModifier {
    /// Modifiers that warrant a prompt-care note in the rendered response.
    pub fn is_urgent(&self) -> bool {
        matches!(self, Self::Severe | Self::Sudden | Self::Worsening)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn category_round_trips_through_str() {
        for category in Category::ALL {
            assert_eq!(Category::from_str(category.as_str()).unwrap(), category);
        }
    }

    #[test]
    fn category_index_matches_all_order() {
        for (i, category) in Category::ALL.iter().enumerate() {
            assert_eq!(category.index(), i);
        }
        assert_eq!(Category::General.index(), Category::SPECIFIC_COUNT);
    }

    #[test]
    fn category_serde_uses_snake_case_names() {
        let json = serde_json::to_string(&Category::MentalHealthAnxiety).unwrap();
        assert_eq!(json, "\"mental_health_anxiety\"");
        let back: Category = serde_json::from_str("\"adl_mobility\"").unwrap();
        assert_eq!(back, Category::AdlMobility);
    }

    #[test]
    fn unknown_category_rejected() {
        let err = Category::from_str("cardiology").unwrap_err();
        assert_eq!(err.field, "Category");
        assert_eq!(err.value, "cardiology");
    }

    #[test]
    fn self_role_serializes_as_self() {
        assert_eq!(RelationshipRole::Myself.as_str(), "self");
        let json = serde_json::to_string(&RelationshipRole::Myself).unwrap();
        assert_eq!(json, "\"self\"");
    }

    #[test]
    fn response_method_display() {
        assert_eq!(ResponseMethod::CrisisDetection.to_string(), "crisis_detection");
        assert_eq!(ResponseMethod::MlModel.to_string(), "ml_model");
    }

    #[test]
    fn urgent_severity_modifiers() {
        assert!(SeverityModifier::Severe.is_urgent());
        assert!(SeverityModifier::Sudden.is_urgent());
        assert!(!SeverityModifier::Chronic.is_urgent());
        assert!(!SeverityModifier::Mild.is_urgent());
    }
}

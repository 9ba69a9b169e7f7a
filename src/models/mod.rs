pub mod enums;
pub mod query;

pub use enums::{Category, ParseEnumError, RelationshipRole, ResponseMethod, SeverityModifier};
pub use query::{CategoryScore, CrisisResources, Query, TimingBreakdown, TriageResponse};

//! Crisis safety layer: input sanitation, the crisis lexicon and the
//! detector that runs ahead of every other stage.

pub mod types;
pub mod sanitize;
pub mod keywords;
pub mod detector;

pub use detector::CrisisDetector;
pub use types::{CrisisAssessment, CrisisTier, CrisisTrigger};

pub mod artifact;
pub mod classifier;
pub mod model_store;

use std::path::PathBuf;

use thiserror::Error;

pub use artifact::{FitParams, LabeledSample, ModelArtifact};
pub use classifier::{CategoryClassifier, ClassificationResult, ModelSnapshot};
pub use model_store::ModelHandle;

#[derive(Error, Debug)]
pub enum ClassifierError {
    #[error("No classifier model loaded")]
    Unavailable,

    #[error("Model artifact I/O error {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Model artifact parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid model artifact: {0}")]
    Invalid(String),

    #[error("Cannot fit a model from zero samples")]
    NoSamples,

    #[error("Internal lock error")]
    LockPoisoned,
}

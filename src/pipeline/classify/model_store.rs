//! Atomically swappable classifier model.
//!
//! Readers clone the `Arc` under a short read lock and classify without
//! holding it. A new artifact is fully validated and built before the
//! write lock is taken, so a failed reload leaves the old model serving.

use std::path::Path;
use std::sync::{Arc, RwLock};

use super::artifact::ModelArtifact;
use super::classifier::ModelSnapshot;
use super::ClassifierError;

pub struct ModelHandle {
    current: RwLock<Option<Arc<ModelSnapshot>>>,
    alpha_override: Option<f64>,
    max_vocabulary: usize,
}

impl ModelHandle {
    pub fn new(alpha_override: Option<f64>, max_vocabulary: usize) -> Self {
        Self {
            current: RwLock::new(None),
            alpha_override,
            max_vocabulary,
        }
    }

    /// The serving snapshot, if any.
    pub fn current(&self) -> Option<Arc<ModelSnapshot>> {
        self.current.read().ok().and_then(|guard| guard.clone())
    }

    pub fn is_loaded(&self) -> bool {
        self.current().is_some()
    }

    /// Validate, build and swap in an artifact.
    pub fn install(&self, artifact: ModelArtifact) -> Result<Arc<ModelSnapshot>, ClassifierError> {
        artifact.validate(self.max_vocabulary)?;
        let snapshot = Arc::new(ModelSnapshot::from_artifact(artifact, self.alpha_override));

        let previous = {
            let mut guard = self.current.write().map_err(|_| ClassifierError::LockPoisoned)?;
            guard.replace(Arc::clone(&snapshot))
        };

        tracing::info!(
            version = snapshot.version(),
            previous = previous.as_ref().map(|p| p.version()).unwrap_or("none"),
            classes = snapshot.classes().len(),
            vocabulary = snapshot.vocabulary_size(),
            alpha = snapshot.alpha(),
            "Classifier model installed"
        );
        Ok(snapshot)
    }

    /// Load an artifact from disk and install it.
    pub fn load_from_path(&self, path: &Path) -> Result<Arc<ModelSnapshot>, ClassifierError> {
        let artifact = ModelArtifact::load(path).inspect_err(|e| {
            tracing::warn!(error = %e, "Classifier artifact load failed");
        })?;
        self.install(artifact).inspect_err(|e| {
            tracing::warn!(error = %e, "Classifier artifact rejected");
        })
    }
}

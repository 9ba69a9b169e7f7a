//! Response generation: template catalog, renderer and the ordered chain
//! of response sources.

pub mod templates;
pub mod render;
pub mod strategy;

use std::path::PathBuf;

use thiserror::Error;

pub use render::ResponseRenderer;
pub use strategy::{ResponseChain, ResponseSource, SourceInput, SourceOutput};
pub use templates::{CrisisTemplate, ResponseTemplate, TemplateCatalog};

#[derive(Error, Debug)]
pub enum TemplateError {
    #[error("Cannot read template catalog {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Template catalog parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid template catalog: {0}")]
    Invalid(String),
}

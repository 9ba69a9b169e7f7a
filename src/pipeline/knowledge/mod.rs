//! Knowledge base: prior query/response pairs and a cosine-similarity
//! matcher over them.

pub mod corpus;
pub mod matcher;

use std::path::PathBuf;

use thiserror::Error;

pub use corpus::{KnowledgeCorpus, KnowledgeEntry};
pub use matcher::{KnowledgeMatch, KnowledgeMatcher, MatchOutcome};

#[derive(Error, Debug)]
pub enum KnowledgeError {
    #[error("Cannot read knowledge corpus {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Knowledge corpus has no usable entries")]
    EmptyCorpus,
}

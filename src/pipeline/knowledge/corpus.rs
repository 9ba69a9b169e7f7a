use std::io::BufRead;
use std::path::Path;
use std::str::FromStr;

use serde::Deserialize;

use crate::models::Category;

use super::KnowledgeError;

/// One historical exchange.
#[derive(Debug, Clone, PartialEq)]
pub struct KnowledgeEntry {
    pub query: String,
    pub response: String,
    pub category: Category,
}

impl KnowledgeEntry {
    pub fn new(category: Category, query: &str, response: &str) -> Self {
        Self {
            query: query.to_string(),
            response: response.to_string(),
            category,
        }
    }
}

#[derive(Debug, Deserialize)]
struct Message {
    role: String,
    content: String,
}

/// Accepted line shapes.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum CorpusLine {
    Conversation { category: String, messages: Vec<Message> },
    Flat { category: String, query: String, response: String },
}

impl CorpusLine {
    fn into_entry(self) -> Option<KnowledgeEntry> {
        let (category, query, response) = match self {
            Self::Conversation { category, messages } => {
                let user = messages.iter().position(|m| m.role == "user")?;
                let reply = messages[user + 1..].iter().find(|m| m.role == "assistant")?;
                (category, messages[user].content.clone(), reply.content.clone())
            }
            Self::Flat { category, query, response } => (category, query, response),
        };
        let category = Category::from_str(category.trim()).ok()?;
        if query.trim().is_empty() || response.trim().is_empty() {
            return None;
        }
        Some(KnowledgeEntry {
            query: query.trim().to_string(),
            response: response.trim().to_string(),
            category,
        })
    }
}

/// Loaded corpus, insertion order preserved.
#[derive(Debug, Clone, Default)]
pub struct KnowledgeCorpus {
    entries: Vec<KnowledgeEntry>,
    skipped: usize,
}

impl KnowledgeCorpus {
    pub fn from_entries(entries: Vec<KnowledgeEntry>) -> Self {
        Self { entries, skipped: 0 }
    }

    /// Load a JSON Lines file, keeping at most `max_entries` usable lines.
    pub fn load_jsonl(path: &Path, max_entries: usize) -> Result<Self, KnowledgeError> {
        let io_err = |source| KnowledgeError::Io {
            path: path.to_path_buf(),
            source,
        };
        let file = std::fs::File::open(path).map_err(io_err)?;
        let corpus = Self::parse_jsonl(std::io::BufReader::new(file), max_entries).map_err(io_err)?;

        tracing::info!(
            entries = corpus.len(),
            skipped = corpus.skipped,
            "Knowledge corpus loaded"
        );
        Ok(corpus)
    }

    /// Parse JSON Lines. Malformed or non-UTF-8 lines, unknown categories
    /// and lines without a user/assistant pair are skipped and counted.
    pub fn parse_jsonl(reader: impl BufRead, max_entries: usize) -> std::io::Result<Self> {
        let mut corpus = Self::default();
        for (line_no, line) in reader.split(b'\n').enumerate() {
            if corpus.entries.len() >= max_entries {
                break;
            }
            let line = line?;
            if line.trim_ascii().is_empty() {
                continue;
            }
            match serde_json::from_slice::<CorpusLine>(&line).ok().and_then(CorpusLine::into_entry) {
                Some(entry) => corpus.entries.push(entry),
                None => {
                    corpus.skipped += 1;
                    tracing::debug!(line = line_no + 1, "Skipping unusable corpus line");
                }
            }
        }
        Ok(corpus)
    }

    pub fn entries(&self) -> &[KnowledgeEntry] {
        &self.entries
    }

    pub fn into_entries(self) -> Vec<KnowledgeEntry> {
        self.entries
    }

    pub fn skipped(&self) -> usize {
        self.skipped
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

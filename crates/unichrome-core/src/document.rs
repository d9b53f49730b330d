//! Document data structure: text, embedding vector, and string metadata.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A stored unit in a collection.
///
/// A document consists of:
/// - A store-assigned integer identifier
/// - The original text (not interpreted by the engine)
/// - A string-to-string metadata map (absent keys are distinct from empty values)
/// - The embedding vector
/// - Creation and modification timestamps (UTC wall-clock)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    /// Unique identifier, assigned by the document store.
    pub id: i32,

    /// The document text.
    pub text: String,

    /// String metadata attached to the document.
    #[serde(default)]
    pub metadata: HashMap<String, String>,

    /// The embedding vector.
    pub vector: Vec<f32>,

    /// When the document was first inserted.
    #[serde(with = "chrono::serde::ts_microseconds")]
    pub created_at: DateTime<Utc>,

    /// When the document was last updated.
    #[serde(with = "chrono::serde::ts_microseconds")]
    pub modified_at: DateTime<Utc>,
}

/// Current wall-clock time truncated to microsecond precision, the
/// resolution of the on-disk encoding. Stamping at storage precision keeps
/// persisted snapshots equal to their in-memory source.
#[must_use]
pub(crate) fn now_micros() -> DateTime<Utc> {
    let now = Utc::now();
    DateTime::from_timestamp_micros(now.timestamp_micros()).unwrap_or(now)
}

impl Document {
    /// Creates a new document stamped with the current time.
    #[must_use]
    pub fn new(id: i32, text: String, vector: Vec<f32>, metadata: HashMap<String, String>) -> Self {
        let now = now_micros();
        Self {
            id,
            text,
            metadata,
            vector,
            created_at: now,
            modified_at: now,
        }
    }

    /// Returns the dimension of the embedding vector.
    #[must_use]
    pub fn dimension(&self) -> usize {
        self.vector.len()
    }
}

/// A search result: a matching document and its cosine distance to the query.
#[derive(Debug, Clone)]
pub struct SearchResult {
    /// The matching document.
    pub document: Document,

    /// Cosine distance to the query (lower is more similar).
    pub distance: f32,
}

impl SearchResult {
    /// Creates a new search result.
    #[must_use]
    pub const fn new(document: Document, distance: f32) -> Self {
        Self { document, distance }
    }
}

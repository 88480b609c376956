//! Data types for chunks, points, and search results.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Metadata key holding the identifier of the source document.
pub const DOCUMENT_ID_KEY: &str = "pdf_id";

/// Metadata key holding the uploaded file name.
pub const SOURCE_KEY: &str = "source";

/// A segment of PDF-derived text ready to be embedded.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DocumentChunk {
    /// The text content of the chunk.
    pub text: String,
    /// Key-value metadata; always carries [`DOCUMENT_ID_KEY`] once chunked.
    pub metadata: HashMap<String, String>,
}

impl DocumentChunk {
    /// Create a chunk belonging to the document `document_id`.
    pub fn new(text: impl Into<String>, document_id: impl Into<String>) -> Self {
        let metadata = HashMap::from([(DOCUMENT_ID_KEY.to_string(), document_id.into())]);
        Self { text: text.into(), metadata }
    }

    /// The identifier of the document this chunk was cut from, if set.
    pub fn document_id(&self) -> Option<&str> {
        self.metadata.get(DOCUMENT_ID_KEY).map(String::as_str)
    }
}

/// A source document prior to chunking: one extracted upload.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SourceDocument {
    /// The file name the text was extracted from.
    pub name: String,
    /// The full extracted text.
    pub text: String,
}

/// A sparse embedding: parallel index/value arrays.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct SparseVector {
    /// Term indices, strictly ascending.
    pub indices: Vec<u32>,
    /// Weights aligned with `indices`.
    pub values: Vec<f32>,
}

impl SparseVector {
    /// Create a sparse vector, checking that both arrays have the same length.
    pub fn new(indices: Vec<u32>, values: Vec<f32>) -> Option<Self> {
        (indices.len() == values.len()).then_some(Self { indices, values })
    }

    /// Number of non-zero entries.
    pub fn len(&self) -> usize {
        self.indices.len()
    }

    /// Whether the vector has no entries.
    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// Dot product with another sparse vector, and whether any index overlapped.
    ///
    /// Both vectors must have ascending indices.
    pub fn dot(&self, other: &SparseVector) -> Option<f32> {
        let (mut i, mut j) = (0, 0);
        let mut sum = 0.0;
        let mut overlap = false;
        while i < self.indices.len() && j < other.indices.len() {
            match self.indices[i].cmp(&other.indices[j]) {
                std::cmp::Ordering::Less => i += 1,
                std::cmp::Ordering::Greater => j += 1,
                std::cmp::Ordering::Equal => {
                    sum += self.values[i] * other.values[j];
                    overlap = true;
                    i += 1;
                    j += 1;
                }
            }
        }
        overlap.then_some(sum)
    }
}

/// A stored point: both named vectors plus the chunk payload.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Point {
    /// Generated unique identifier (UUID v4).
    pub id: String,
    /// Vector for the `dense` field.
    pub dense: Vec<f32>,
    /// Vector for the `sparse` field.
    pub sparse: SparseVector,
    /// The original chunk text.
    pub content: String,
    /// The original chunk metadata.
    pub metadata: HashMap<String, String>,
}

impl Point {
    /// The document identifier stored in the point's metadata.
    pub fn document_id(&self) -> Option<&str> {
        self.metadata.get(DOCUMENT_ID_KEY).map(String::as_str)
    }
}

/// A point returned by a search, with its relevance score.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScoredPoint {
    /// The point identifier.
    pub id: String,
    /// The relevance score (higher is more relevant).
    pub score: f32,
    /// The chunk text stored in the payload.
    pub content: String,
    /// The chunk metadata stored in the payload.
    pub metadata: HashMap<String, String>,
}

impl ScoredPoint {
    /// The document identifier stored in the point's metadata.
    pub fn document_id(&self) -> Option<&str> {
        self.metadata.get(DOCUMENT_ID_KEY).map(String::as_str)
    }
}

/// Order scored points by descending score, ties by ascending id.
pub(crate) fn sort_by_score(points: &mut [ScoredPoint]) {
    points.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.id.cmp(&b.id))
    });
}

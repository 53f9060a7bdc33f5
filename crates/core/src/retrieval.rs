//! In-memory vector index for retrieval-augmented prompts
//!
//! Documents are short text lines (schema fields, flattened records) with
//! their embedding. Search is a linear cosine scan, which is plenty for a few
//! thousand lines.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

use crate::error::RetrievalError;

/// Default dimensionality of [`HashingEmbedder`]
pub const DEFAULT_HASH_DIMENSIONS: usize = 384;

/// A text with its embedding and free-form metadata (e.g. `patient_id`)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IndexedDocument {
    pub text: String,
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
    pub vector: Vec<f32>,
}

/// Search hit
#[derive(Debug, Clone, Copy)]
pub struct ScoredDocument<'a> {
    pub document: &'a IndexedDocument,
    pub score: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VectorIndex {
    dimensions: usize,
    documents: Vec<IndexedDocument>,
}

impl VectorIndex {
    pub fn new(dimensions: usize) -> Self {
        Self {
            dimensions,
            documents: Vec::new(),
        }
    }

    /// Build an index from texts and their embeddings (same order)
    pub fn from_embeddings(
        texts: Vec<String>,
        vectors: Vec<Vec<f32>>,
    ) -> Result<Self, RetrievalError> {
        let dimensions = vectors.first().map(Vec::len).unwrap_or(0);
        let mut index = Self::new(dimensions);
        for (text, vector) in texts.into_iter().zip(vectors) {
            index.insert(text, BTreeMap::new(), vector)?;
        }
        Ok(index)
    }

    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    pub fn documents(&self) -> &[IndexedDocument] {
        &self.documents
    }

    pub fn insert(
        &mut self,
        text: String,
        metadata: BTreeMap<String, String>,
        vector: Vec<f32>,
    ) -> Result<(), RetrievalError> {
        self.check_dimensions(&vector)?;
        self.documents.push(IndexedDocument {
            text,
            metadata,
            vector,
        });
        Ok(())
    }

    /// Top `k` documents by cosine similarity, best first.
    ///
    /// Ties keep insertion order.
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<ScoredDocument<'_>>, RetrievalError> {
        self.check_dimensions(query)?;

        let mut hits: Vec<ScoredDocument<'_>> = self
            .documents
            .iter()
            .map(|document| ScoredDocument {
                document,
                score: cosine_similarity(query, &document.vector),
            })
            .collect();
        hits.sort_by(|a, b| b.score.total_cmp(&a.score));
        hits.truncate(k);
        Ok(hits)
    }

    /// Write the index as JSON
    pub fn save(&self, path: &Path) -> Result<(), RetrievalError> {
        let json = serde_json::to_vec(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self, RetrievalError> {
        let bytes = std::fs::read(path)?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    fn check_dimensions(&self, vector: &[f32]) -> Result<(), RetrievalError> {
        if vector.len() != self.dimensions {
            return Err(RetrievalError::DimensionMismatch {
                expected: self.dimensions,
                actual: vector.len(),
            });
        }
        Ok(())
    }
}

/// Cosine similarity; 0 when either vector has zero length
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;
    for (x, y) in a.iter().zip(b) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a.sqrt() * norm_b.sqrt())
}

/// Deterministic bag-of-words embedding.
///
/// Words and their character trigrams are hashed into a fixed number of
/// buckets and the result is L2-normalised. It needs no model download and
/// is good enough to match "diabetic patients" against `diabetes: string`.
#[derive(Debug, Clone, Copy)]
pub struct HashingEmbedder {
    dimensions: usize,
}

impl Default for HashingEmbedder {
    fn default() -> Self {
        Self::new(DEFAULT_HASH_DIMENSIONS)
    }
}

impl HashingEmbedder {
    pub fn new(dimensions: usize) -> Self {
        Self {
            dimensions: dimensions.max(1),
        }
    }

    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    pub fn embed(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; self.dimensions];

        for word in text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
            .map(str::to_lowercase)
        {
            self.add_feature(&mut vector, word.as_bytes(), 1.0);

            let chars: Vec<char> = word.chars().collect();
            if chars.len() > 3 {
                for window in chars.windows(3) {
                    let trigram: String = window.iter().collect();
                    self.add_feature(&mut vector, trigram.as_bytes(), 0.5);
                }
            }
        }

        let norm = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            vector.iter_mut().for_each(|x| *x /= norm);
        }
        vector
    }

    pub fn embed_all<S: AsRef<str>>(&self, texts: &[S]) -> Vec<Vec<f32>> {
        texts.iter().map(|t| self.embed(t.as_ref())).collect()
    }

    fn add_feature(&self, vector: &mut [f32], feature: &[u8], weight: f32) {
        let hash = seahash::hash(feature);
        let bucket = (hash % self.dimensions as u64) as usize;
        let sign = if hash >> 63 == 0 { 1.0 } else { -1.0 };
        vector[bucket] += sign * weight;
    }
}

//! Flat vector index over (vector, document) pairs
//!
//! Nearest-neighbor lookup by squared-L2 distance, ascending (lower is
//! closer). Built once at startup, read-only afterwards; persists to and
//! restores from a JSON file with exact round-trip of scores and
//! rankings.

use crate::error::AgentError;
use crate::models::Document;
use crate::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

#[derive(Debug, Clone, Serialize, Deserialize)]
struct IndexEntry {
    id: String,
    vector: Vec<f32>,
    document: Document,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct VectorIndex {
    entries: Vec<IndexEntry>,
}

impl VectorIndex {
    /// Build an index from parallel document and vector sequences,
    /// assigning stable sequential string identifiers.
    pub fn build(documents: Vec<Document>, vectors: Vec<Vec<f32>>) -> Result<Self> {
        if documents.len() != vectors.len() {
            return Err(AgentError::Retrieval(format!(
                "document/vector count mismatch: {} vs {}",
                documents.len(),
                vectors.len()
            )));
        }
        if documents.is_empty() {
            return Err(AgentError::Retrieval(
                "no documents available for index creation".to_string(),
            ));
        }

        let dimension = vectors[0].len();
        if vectors.iter().any(|v| v.len() != dimension) {
            return Err(AgentError::Retrieval(
                "vectors in one index must share one dimensionality".to_string(),
            ));
        }

        let entries = documents
            .into_iter()
            .zip(vectors)
            .enumerate()
            .map(|(i, (document, vector))| IndexEntry {
                id: i.to_string(),
                vector,
                document,
            })
            .collect();

        Ok(Self { entries })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Top-k nearest entries by squared-L2 distance, ascending.
    pub fn search(&self, query_vector: &[f32], k: usize) -> Vec<(Document, f32)> {
        let mut scored: Vec<(f32, &IndexEntry)> = self
            .entries
            .iter()
            .map(|entry| (squared_l2(query_vector, &entry.vector), entry))
            .collect();

        scored.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal));

        scored
            .into_iter()
            .take(k)
            .map(|(score, entry)| (entry.document.clone(), score))
            .collect()
    }

    /// Persist the full index as JSON.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, serde_json::to_string(self)?)?;
        info!(path = %path.display(), entries = self.entries.len(), "Saved vector index");
        Ok(())
    }

    /// Reload a persisted index. Fails when the file is missing,
    /// unreadable, or empty; the caller falls back to a full rebuild.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        let index: VectorIndex = serde_json::from_str(&raw)?;
        if index.is_empty() {
            return Err(AgentError::Retrieval(format!(
                "persisted index at {} holds no entries",
                path.display()
            )));
        }
        info!(path = %path.display(), entries = index.entries.len(), "Loaded vector index");
        Ok(index)
    }
}

fn squared_l2(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return f32::MAX;
    }
    a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::DocumentMetadata;
    use tempfile::tempdir;

    fn doc(id: &str, content: &str) -> Document {
        Document {
            content: content.to_string(),
            metadata: DocumentMetadata::new(id, "test", 0),
        }
    }

    fn sample_index() -> VectorIndex {
        let documents = vec![
            doc("faq_0", "savings account"),
            doc("faq_1", "home loan"),
            doc("faq_2", "atm withdrawal"),
        ];
        let vectors = vec![
            vec![1.0, 0.0, 0.0],
            vec![0.0, 1.0, 0.0],
            vec![0.0, 0.0, 1.0],
        ];
        VectorIndex::build(documents, vectors).unwrap()
    }

    #[test]
    fn test_search_ascending_distance() {
        let index = sample_index();
        let results = index.search(&[0.9, 0.1, 0.0], 3);

        assert_eq!(results.len(), 3);
        assert_eq!(results[0].0.metadata.doc_id, "faq_0");
        for pair in results.windows(2) {
            assert!(pair[0].1 <= pair[1].1);
        }
    }

    #[test]
    fn test_search_caps_at_k() {
        let index = sample_index();
        assert_eq!(index.search(&[1.0, 0.0, 0.0], 2).len(), 2);
        assert_eq!(index.search(&[1.0, 0.0, 0.0], 10).len(), 3);
    }

    #[test]
    fn test_build_rejects_mismatched_lengths() {
        let result = VectorIndex::build(vec![doc("a", "x")], vec![]);
        assert!(result.is_err());
    }

    #[test]
    fn test_build_rejects_empty_corpus() {
        assert!(VectorIndex::build(vec![], vec![]).is_err());
    }

    #[test]
    fn test_build_rejects_mixed_dimensions() {
        let documents = vec![doc("a", "x"), doc("b", "y")];
        let vectors = vec![vec![1.0, 0.0], vec![1.0]];
        assert!(VectorIndex::build(documents, vectors).is_err());
    }

    #[test]
    fn test_save_load_round_trip_identical_rankings() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("index.json");

        let index = sample_index();
        index.save(&path).unwrap();
        let reloaded = VectorIndex::load(&path).unwrap();

        let query = [0.3, 0.8, 0.1];
        let before = index.search(&query, 3);
        let after = reloaded.search(&query, 3);

        assert_eq!(before.len(), after.len());
        for (b, a) in before.iter().zip(&after) {
            assert_eq!(b.0.metadata.doc_id, a.0.metadata.doc_id);
            assert_eq!(b.1, a.1);
        }
    }

    #[test]
    fn test_load_missing_file_fails() {
        let dir = tempdir().unwrap();
        assert!(VectorIndex::load(&dir.path().join("absent.json")).is_err());
    }
}

//! Retrieval subsystem
//!
//! Splits the knowledge base into chunks, fits a TF-IDF model over the
//! chunk corpus, and serves top-k similarity lookups from a flat vector
//! index. The fitted model and the index are persisted together; a
//! persisted index without its vectorizer is meaningless, so loading
//! fails closed into a full rebuild.

pub mod corpus;
pub mod index;
pub mod splitter;
pub mod vectorizer;

use crate::config::Settings;
use crate::models::RetrievedChunk;
use crate::Result;
use corpus::CorpusProvider;
use index::VectorIndex;
use splitter::TextSplitter;
use std::sync::Mutex;
use tracing::{error, info, warn};
use vectorizer::TfidfVectorizer;

/// Context marker returned when retrieval comes back empty
pub const NO_CONTEXT_MARKER: &str = "No relevant documents found.";

/// Retrieval engine: owns the fitted vectorizer and the vector index
pub struct BankingRag {
    vectorizer: Mutex<TfidfVectorizer>,
    index: VectorIndex,
    top_k: usize,
}

impl BankingRag {
    /// Load the persisted index + vectorizer, or rebuild both from the
    /// corpus provider. Rebuilds fall back to the built-in corpus when
    /// the provider yields nothing, so retrieval is never fully empty.
    pub fn initialize(settings: &Settings, provider: &dyn CorpusProvider) -> Result<Self> {
        let tfidf_path = settings.tfidf_path();
        let index_path = settings.index_path();

        match (TfidfVectorizer::load(&tfidf_path), VectorIndex::load(&index_path)) {
            (Ok(vectorizer), Ok(index)) => {
                info!(entries = index.len(), "Loaded existing vectorstore");
                return Ok(Self {
                    vectorizer: Mutex::new(vectorizer),
                    index,
                    top_k: settings.top_k_retrieval,
                });
            }
            (vectorizer, index) => {
                if let Err(e) = vectorizer {
                    warn!("No usable TF-IDF model ({}); rebuilding vectorstore", e);
                }
                if let Err(e) = index {
                    warn!("No usable vector index ({}); rebuilding vectorstore", e);
                }
            }
        }

        let splitter = TextSplitter::new(settings.chunk_size, settings.chunk_overlap);
        let mut documents = provider.load_documents(&splitter);
        if documents.is_empty() {
            warn!("Corpus provider yielded nothing; using built-in default corpus");
            documents = corpus::default_documents(&splitter);
        }

        let engine = Self::from_documents(documents, settings.top_k_retrieval)?;

        // Persist both halves so a restart skips the re-fit. Save
        // failures degrade to rebuild-on-restart, not startup failure.
        {
            let vectorizer = engine.vectorizer.lock().expect("vectorizer lock");
            if let Err(e) = vectorizer.save(&tfidf_path) {
                warn!("Failed to save TF-IDF model: {}", e);
            }
        }
        if let Err(e) = engine.index.save(&index_path) {
            warn!("Failed to save vector index: {}", e);
        }

        Ok(engine)
    }

    /// Build an in-memory engine: fit the vectorizer over the chunk set,
    /// embed every chunk, build the index.
    pub fn from_documents(
        documents: Vec<crate::models::Document>,
        top_k: usize,
    ) -> Result<Self> {
        let contents: Vec<&str> = documents.iter().map(|d| d.content.as_str()).collect();

        let mut vectorizer = TfidfVectorizer::new();
        let vectors = vectorizer.embed(&contents);
        let index = VectorIndex::build(documents, vectors)?;

        info!(entries = index.len(), "Vectorstore created");
        Ok(Self {
            vectorizer: Mutex::new(vectorizer),
            index,
            top_k,
        })
    }

    /// Top-k similarity lookup. Best-effort: internal failures come back
    /// as an empty result set, never as an error; the agent still works
    /// in a context-free mode.
    pub fn retrieve(&self, query: &str, k: usize) -> Vec<RetrievedChunk> {
        let query_vector = match self.vectorizer.lock() {
            Ok(mut vectorizer) => vectorizer.embed_query(query),
            Err(e) => {
                error!("Vectorizer lock poisoned: {}", e);
                return Vec::new();
            }
        };

        self.index
            .search(&query_vector, k)
            .into_iter()
            .map(|(document, score)| RetrievedChunk {
                content: document.content,
                metadata: document.metadata,
                score,
            })
            .collect()
    }

    /// Render the top-k passages into a single context block with the
    /// matching score against each passage.
    pub fn get_context(&self, query: &str) -> String {
        let results = self.retrieve(query, self.top_k);

        if results.is_empty() {
            return NO_CONTEXT_MARKER.to_string();
        }

        let mut context = String::from("## Relevant Banking Information:\n\n");
        for (i, result) in results.iter().enumerate() {
            context.push_str(&format!("Document {} (Score: {:.4}):\n", i + 1, result.score));
            context.push_str(&result.content);
            context.push_str("\n\n");
        }
        context
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Document, DocumentMetadata};
    use tempfile::tempdir;

    fn docs() -> Vec<Document> {
        let texts = [
            "Savings accounts require a minimum balance of Rs. 5000",
            "Personal loans carry interest between 9 and 12 percent",
            "ATM withdrawals are limited to Rs. 50000 per day",
            "NEFT transfers settle within one to two hours",
        ];
        texts
            .iter()
            .enumerate()
            .map(|(i, text)| Document {
                content: text.to_string(),
                metadata: DocumentMetadata::new(format!("faq_{}", i), "banking_docs", i),
            })
            .collect()
    }

    fn settings_in(dir: &std::path::Path) -> Settings {
        Settings {
            data_dir: dir.join("data"),
            vectorstore_dir: dir.join("vectorstore"),
            ..Settings::default()
        }
    }

    struct StaticCorpus(Vec<Document>);

    impl corpus::CorpusProvider for StaticCorpus {
        fn load_documents(&self, _splitter: &TextSplitter) -> Vec<Document> {
            self.0.clone()
        }
    }

    #[test]
    fn test_self_retrieval_sanity() {
        let engine = BankingRag::from_documents(docs(), 5).unwrap();

        // Every indexed document, queried with its own content, must
        // surface itself in the top-k.
        for doc in docs() {
            let results = engine.retrieve(&doc.content, 5);
            assert!(
                results
                    .iter()
                    .any(|r| r.metadata.doc_id == doc.metadata.doc_id),
                "{} missing from its own top-k",
                doc.metadata.doc_id
            );
        }
    }

    #[test]
    fn test_retrieve_ranked_ascending() {
        let engine = BankingRag::from_documents(docs(), 5).unwrap();
        let results = engine.retrieve("minimum balance savings account", 4);
        assert!(!results.is_empty());
        for pair in results.windows(2) {
            assert!(pair[0].score <= pair[1].score);
        }
        assert_eq!(results[0].metadata.doc_id, "faq_0");
    }

    #[test]
    fn test_get_context_includes_scores() {
        let engine = BankingRag::from_documents(docs(), 3).unwrap();
        let context = engine.get_context("loan interest rate");
        assert!(context.starts_with("## Relevant Banking Information:"));
        assert!(context.contains("(Score: "));
        assert!(context.contains("Personal loans"));
    }

    #[test]
    fn test_get_context_empty_marker() {
        let engine = BankingRag::from_documents(docs(), 0).unwrap();
        assert_eq!(engine.get_context("anything"), NO_CONTEXT_MARKER);
    }

    #[test]
    fn test_initialize_persists_and_reloads_identically() {
        let dir = tempdir().unwrap();
        let settings = settings_in(dir.path());
        let provider = StaticCorpus(docs());

        let built = BankingRag::initialize(&settings, &provider).unwrap();
        assert!(settings.tfidf_path().exists());
        assert!(settings.index_path().exists());

        // Second initialize must load, not rebuild, and rank identically.
        let loaded = BankingRag::initialize(&settings, &StaticCorpus(Vec::new())).unwrap();
        assert_eq!(loaded.len(), built.len());

        let query = "daily atm withdrawal limit";
        let before = built.retrieve(query, 3);
        let after = loaded.retrieve(query, 3);
        assert_eq!(before.len(), after.len());
        for (b, a) in before.iter().zip(&after) {
            assert_eq!(b.metadata.doc_id, a.metadata.doc_id);
            assert_eq!(b.score, a.score);
        }
    }

    #[test]
    fn test_initialize_rebuilds_on_corrupt_index() {
        let dir = tempdir().unwrap();
        let settings = settings_in(dir.path());

        std::fs::create_dir_all(&settings.vectorstore_dir).unwrap();
        std::fs::write(settings.index_path(), "not json").unwrap();

        let engine = BankingRag::initialize(&settings, &StaticCorpus(docs())).unwrap();
        assert_eq!(engine.len(), docs().len());
    }

    #[test]
    fn test_initialize_empty_provider_uses_default_corpus() {
        let dir = tempdir().unwrap();
        let settings = settings_in(dir.path());

        let engine = BankingRag::initialize(&settings, &StaticCorpus(Vec::new())).unwrap();
        assert!(!engine.is_empty());
    }
}

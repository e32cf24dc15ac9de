//! TF-IDF vectorizer
//!
//! Corpus-relative term weighting: vectors are only comparable under the
//! same fit, so the fitted model is persisted next to the index and
//! reloaded on restart instead of being re-fitted.

use crate::error::AgentError;
use crate::Result;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use tracing::{info, warn};

/// Bounded vocabulary size (fixes vector dimensionality)
pub const MAX_FEATURES: usize = 384;

/// English stop words excluded from the vocabulary
const STOP_WORDS: &[&str] = &[
    "a", "about", "above", "after", "again", "against", "all", "am", "an", "and", "any", "are",
    "as", "at", "be", "because", "been", "before", "being", "below", "between", "both", "but",
    "by", "can", "cannot", "could", "did", "do", "does", "doing", "down", "during", "each",
    "few", "for", "from", "further", "had", "has", "have", "having", "he", "her", "here",
    "hers", "herself", "him", "himself", "his", "how", "i", "if", "in", "into", "is", "it",
    "its", "itself", "me", "more", "most", "my", "myself", "no", "nor", "not", "of", "off",
    "on", "once", "only", "or", "other", "our", "ours", "ourselves", "out", "over", "own",
    "same", "she", "should", "so", "some", "such", "than", "that", "the", "their", "theirs",
    "them", "themselves", "then", "there", "these", "they", "this", "those", "through", "to",
    "too", "under", "until", "up", "very", "was", "we", "were", "what", "when", "where",
    "which", "while", "who", "whom", "why", "will", "with", "would", "you", "your", "yours",
    "yourself", "yourselves",
];

#[derive(Debug, Serialize, Deserialize)]
struct PersistedModel {
    vocabulary: Vec<String>,
    idf: Vec<f32>,
}

/// TF-IDF term-weighting model over a fitted corpus vocabulary
#[derive(Debug, Clone)]
pub struct TfidfVectorizer {
    max_features: usize,
    vocabulary: Vec<String>,
    term_index: HashMap<String, usize>,
    idf: Vec<f32>,
    fitted: bool,
}

impl TfidfVectorizer {
    pub fn new() -> Self {
        Self::with_max_features(MAX_FEATURES)
    }

    pub fn with_max_features(max_features: usize) -> Self {
        Self {
            max_features,
            vocabulary: Vec::new(),
            term_index: HashMap::new(),
            idf: Vec::new(),
            fitted: false,
        }
    }

    pub fn is_fitted(&self) -> bool {
        self.fitted
    }

    /// Vector dimensionality, fixed once fitted
    pub fn dimension(&self) -> usize {
        self.vocabulary.len()
    }

    /// Fit the vocabulary and idf weights over the full chunk corpus.
    /// Must run exactly once per index build, before any vector is
    /// produced; a re-fit invalidates previously stored vectors.
    pub fn fit<S: AsRef<str>>(&mut self, corpus: &[S]) {
        let mut doc_freq: HashMap<String, usize> = HashMap::new();
        let mut corpus_freq: HashMap<String, usize> = HashMap::new();

        for text in corpus {
            let tokens = tokenize(text.as_ref());
            let mut seen: HashMap<&str, usize> = HashMap::new();
            for token in &tokens {
                *seen.entry(token.as_str()).or_insert(0) += 1;
            }
            for (token, count) in seen {
                *doc_freq.entry(token.to_string()).or_insert(0) += 1;
                *corpus_freq.entry(token.to_string()).or_insert(0) += count;
            }
        }

        // Keep the most frequent terms, ties broken alphabetically, then
        // order the final vocabulary alphabetically.
        let mut terms: Vec<(String, usize)> = corpus_freq.into_iter().collect();
        terms.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        terms.truncate(self.max_features);

        let mut vocabulary: Vec<String> = terms.into_iter().map(|(t, _)| t).collect();
        vocabulary.sort();

        let n_docs = corpus.len() as f64;
        let idf: Vec<f32> = vocabulary
            .iter()
            .map(|term| {
                let df = *doc_freq.get(term).unwrap_or(&0) as f64;
                (((1.0 + n_docs) / (1.0 + df)).ln() + 1.0) as f32
            })
            .collect();

        self.term_index = vocabulary
            .iter()
            .enumerate()
            .map(|(i, t)| (t.clone(), i))
            .collect();
        self.vocabulary = vocabulary;
        self.idf = idf;
        self.fitted = true;

        info!(
            vocabulary_size = self.vocabulary.len(),
            documents = corpus.len(),
            "TF-IDF model fitted"
        );
    }

    /// Embed a batch of documents. Fits on the batch first when no model
    /// has been fitted yet (index-build path).
    pub fn embed<S: AsRef<str>>(&mut self, texts: &[S]) -> Vec<Vec<f32>> {
        if !self.fitted {
            self.fit(texts);
        }
        texts.iter().map(|t| self.transform(t.as_ref())).collect()
    }

    /// Embed a single query with the already-fitted model.
    ///
    /// If no fit has occurred the model degrades by fitting on the query
    /// text alone so the system stays available; results are
    /// low-confidence and a warning is logged.
    pub fn embed_query(&mut self, text: &str) -> Vec<f32> {
        if !self.fitted {
            warn!("TF-IDF not fitted; query embedding will be poor. Rebuild the vectorstore.");
            self.fit(&[text]);
        }
        self.transform(text)
    }

    fn transform(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; self.vocabulary.len()];
        for token in tokenize(text) {
            if let Some(&i) = self.term_index.get(&token) {
                vector[i] += 1.0;
            }
        }
        for (i, weight) in vector.iter_mut().enumerate() {
            *weight *= self.idf[i];
        }

        let norm: f32 = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm > 0.0 {
            for v in &mut vector {
                *v /= norm;
            }
        }
        vector
    }

    /// Persist the fitted model as JSON.
    pub fn save(&self, path: &Path) -> Result<()> {
        if !self.fitted {
            return Err(AgentError::VectorizerNotFitted(
                "refusing to save an unfitted model".to_string(),
            ));
        }
        let model = PersistedModel {
            vocabulary: self.vocabulary.clone(),
            idf: self.idf.clone(),
        };
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, serde_json::to_string(&model)?)?;
        info!(path = %path.display(), "Saved TF-IDF model");
        Ok(())
    }

    /// Reload a fitted model from JSON. Fails when the file is missing,
    /// unreadable, or holds an empty vocabulary.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        let model: PersistedModel = serde_json::from_str(&raw)?;
        if model.vocabulary.is_empty() || model.vocabulary.len() != model.idf.len() {
            return Err(AgentError::VectorizerNotFitted(format!(
                "persisted model at {} is empty or inconsistent",
                path.display()
            )));
        }

        let term_index = model
            .vocabulary
            .iter()
            .enumerate()
            .map(|(i, t)| (t.clone(), i))
            .collect();

        info!(path = %path.display(), "Loaded TF-IDF model");
        Ok(Self {
            max_features: MAX_FEATURES,
            term_index,
            vocabulary: model.vocabulary,
            idf: model.idf,
            fitted: true,
        })
    }
}

impl Default for TfidfVectorizer {
    fn default() -> Self {
        Self::new()
    }
}

/// Lowercased alphanumeric tokens of two or more characters, stop words
/// removed.
fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| t.chars().count() >= 2)
        .filter(|t| !STOP_WORDS.contains(t))
        .map(|t| t.to_string())
        .collect()
}

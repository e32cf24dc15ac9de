//! Environment-driven configuration
//!
//! Binaries call `dotenv::dotenv().ok()` before `Settings::from_env()`.

use std::env;
use std::path::PathBuf;

/// Application settings, resolved once at startup
#[derive(Debug, Clone)]
pub struct Settings {
    pub gemini_api_key: String,
    pub gemini_model: String,

    pub backend_port: u16,

    pub data_dir: PathBuf,
    pub vectorstore_dir: PathBuf,

    // RAG knobs
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    pub top_k_retrieval: usize,

    // Model gateway knobs
    pub max_retries: u32,
    pub retry_base_delay_secs: f64,
    pub retry_max_wait_secs: f64,
    pub min_request_interval_secs: f64,
}

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

impl Settings {
    /// Load settings from environment variables with sane defaults.
    pub fn from_env() -> Self {
        let data_dir = env::var("DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("data"));
        let vectorstore_dir = env::var("VECTORSTORE_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("vectorstore"));

        Self {
            gemini_api_key: env::var("GEMINI_API_KEY").unwrap_or_default(),
            gemini_model: env::var("GEMINI_MODEL")
                .unwrap_or_else(|_| "gemini-2.0-flash".to_string()),
            backend_port: env_or("BACKEND_PORT", 8000),
            data_dir,
            vectorstore_dir,
            chunk_size: env_or("CHUNK_SIZE", 800),
            chunk_overlap: env_or("CHUNK_OVERLAP", 200),
            top_k_retrieval: env_or("TOP_K_RETRIEVAL", 5),
            max_retries: env_or("MAX_RETRIES", 3),
            retry_base_delay_secs: env_or("RETRY_BASE_DELAY_SECS", 2.0),
            retry_max_wait_secs: env_or("RETRY_MAX_WAIT_SECS", 8.0),
            min_request_interval_secs: env_or("MIN_REQUEST_INTERVAL_SECS", 1.5),
        }
    }

    /// Path of the persisted TF-IDF model
    pub fn tfidf_path(&self) -> PathBuf {
        self.vectorstore_dir.join("tfidf_model.json")
    }

    /// Path of the persisted vector index
    pub fn index_path(&self) -> PathBuf {
        self.vectorstore_dir.join("banking_vectorstore.json")
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            gemini_api_key: String::new(),
            gemini_model: "gemini-2.0-flash".to_string(),
            backend_port: 8000,
            data_dir: PathBuf::from("data"),
            vectorstore_dir: PathBuf::from("vectorstore"),
            chunk_size: 800,
            chunk_overlap: 200,
            top_k_retrieval: 5,
            max_retries: 3,
            retry_base_delay_secs: 2.0,
            retry_max_wait_secs: 8.0,
            min_request_interval_secs: 1.5,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings() {
        let settings = Settings::default();
        assert_eq!(settings.chunk_size, 800);
        assert_eq!(settings.chunk_overlap, 200);
        assert_eq!(settings.top_k_retrieval, 5);
        assert_eq!(settings.max_retries, 3);
    }

    #[test]
    fn test_store_paths() {
        let settings = Settings::default();
        assert!(settings.tfidf_path().ends_with("tfidf_model.json"));
        assert!(settings.index_path().ends_with("banking_vectorstore.json"));
    }
}

//! Document corpus for the knowledge base
//!
//! The retrieval engine pulls (text, metadata) documents from a
//! `CorpusProvider`. The file-backed provider reads the FAQ file and the
//! branch records; the built-in default FAQ keeps retrieval from ever
//! being fully empty.

use crate::models::{Document, DocumentMetadata};
use crate::rag::splitter::TextSplitter;
use crate::tools::data::{default_branches, BranchRecord};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Fallback FAQ used when no knowledge-base file is present
const DEFAULT_FAQ: &str = r#"
# BANKING CUSTOMER SERVICE DOCUMENTATION

## Account Management
### How do I open a new account?
To open a new account, visit your nearest branch with valid ID proof, PAN card, and address proof.
You can also apply online. The process takes 2-3 business days.

### What are the minimum balance requirements?
- Savings Account: Rs. 5,000
- Current Account: Rs. 50,000
- Salary Account: No minimum balance required

### What is the daily transaction limit?
- ATM Withdrawals: Rs. 50,000 per day
- NEFT/RTGS Transfer: Rs. 10,00,000 per transaction
- Mobile Banking: Rs. 2,00,000 per day

### How long do transfers take?
- NEFT: 1-2 hours (during banking hours)
- RTGS: 30 minutes
- IMPS: Instant (24/7 available)

## Loan Services
### What loan options are available?
1. Personal Loan: Up to Rs. 50 lakhs, 9% - 12% interest rate
2. Home Loan: Up to Rs. 1 crore, 8.5% - 9.5% interest rate
3. Business Loan: Up to Rs. 10 lakhs, 12% - 15% interest rate
4. Auto Loan: Up to Rs. 50 lakhs, 8% - 10% interest rate

### How do I apply for a loan?
Submit your application online or visit the nearest branch with salary slips, income tax returns,
bank statements, and identity proof. Approval typically takes 3-5 business days.

## Branch & ATM Services
### What are branch timings?
Standard timings: 9:00 AM - 5:00 PM (Monday - Friday),
9:00 AM - 2:00 PM (Saturday), Closed on Sundays and national holidays.
"#;

/// Source of knowledge-base documents for index builds
pub trait CorpusProvider: Send + Sync {
    fn load_documents(&self, splitter: &TextSplitter) -> Vec<Document>;
}

/// File-backed provider over `banking_docs.txt` + `branch_data.json`
pub struct FileCorpus {
    data_dir: PathBuf,
}

impl FileCorpus {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    fn load_faq(&self, splitter: &TextSplitter) -> Vec<Document> {
        let faq_path = self.data_dir.join("banking_docs.txt");
        if let Ok(content) = std::fs::read_to_string(&faq_path) {
            let chunks = splitter.split(&content);
            if !chunks.is_empty() {
                info!(chunks = chunks.len(), "Loaded FAQ chunks from banking_docs.txt");
                return faq_documents(chunks, "faq", "banking_docs");
            }
        }

        warn!("No banking_docs.txt found or file empty; loading default FAQ");
        default_faq_documents(splitter)
    }
}

impl CorpusProvider for FileCorpus {
    fn load_documents(&self, splitter: &TextSplitter) -> Vec<Document> {
        let mut documents = self.load_faq(splitter);
        let branches = crate::tools::data::BankingData::load(&self.data_dir).branches;
        documents.extend(branch_documents(&branches));
        info!(documents = documents.len(), "Corpus loaded");
        documents
    }
}

/// Chunk the built-in FAQ. Used when the provider yields nothing, so a
/// fresh install still retrieves something sensible.
pub fn default_faq_documents(splitter: &TextSplitter) -> Vec<Document> {
    let chunks = splitter.split(DEFAULT_FAQ);
    info!(chunks = chunks.len(), "Loaded default FAQ chunks");
    faq_documents(chunks, "default_faq", "default_faq")
}

/// Default FAQ plus default branch records
pub fn default_documents(splitter: &TextSplitter) -> Vec<Document> {
    let mut documents = default_faq_documents(splitter);
    documents.extend(branch_documents(&default_branches()));
    documents
}

fn faq_documents(chunks: Vec<String>, id_prefix: &str, source: &str) -> Vec<Document> {
    chunks
        .into_iter()
        .enumerate()
        .map(|(i, chunk)| Document {
            content: chunk,
            metadata: DocumentMetadata::new(format!("{}_{}", id_prefix, i), source, i),
        })
        .collect()
}

/// One descriptive-text document per branch record
pub fn branch_documents(branches: &[BranchRecord]) -> Vec<Document> {
    branches
        .iter()
        .map(|branch| {
            let content = format!(
                "Branch Name: {}\nBranch ID: {}\nCity: {}\nAddress: {}\nPhone: {}\nEmail: {}\nTimings: {}\nServices: {}\nATM Available: {}",
                branch.name,
                branch.id,
                branch.city,
                branch.address,
                branch.phone,
                branch.email,
                branch.timings,
                branch.services.join(", "),
                branch.atm_available,
            );

            let mut metadata =
                DocumentMetadata::new(format!("branch_{}", branch.id), "branch_info", 0);
            metadata.city = Some(branch.city.clone());
            metadata.branch_id = Some(branch.id.clone());

            Document { content, metadata }
        })
        .collect()
}

/// Provider over an arbitrary path (tests, alternate data roots)
pub fn file_corpus(data_dir: &Path) -> FileCorpus {
    FileCorpus::new(data_dir)
}

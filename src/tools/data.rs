//! Simulated banking records
//!
//! The toolkit's backing store: accounts, branches, transactions, and the
//! loan catalog. Loaded once at startup and read-only afterwards; branch
//! and transaction files are optional, with embedded defaults so the
//! agent runs with no data directory present.

use chrono::{Duration, Utc};
use lazy_static::lazy_static;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{info, warn};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountRecord {
    pub account_id: String,
    pub customer_name: String,
    pub account_type: String,
    pub balance: i64,
    pub account_status: String,
    pub opening_date: String,
    pub account_number: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BranchRecord {
    pub id: String,
    pub name: String,
    pub city: String,
    pub address: String,
    pub phone: String,
    pub email: String,
    pub timings: String,
    pub services: Vec<String>,
    pub atm_available: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransactionRecord {
    pub transaction_id: String,
    pub account_id: String,
    pub customer_name: String,
    /// ISO-8601; lexicographic order matches chronological order
    pub date: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub amount: f64,
    pub description: String,
    pub status: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoanProduct {
    pub max_amount: i64,
    pub interest_rate: String,
    pub tenure: String,
    pub min_balance_required: i64,
}

lazy_static! {
    /// Fixed loan catalog keyed by loan type
    pub static ref LOAN_CATALOG: BTreeMap<&'static str, LoanProduct> = {
        let mut catalog = BTreeMap::new();
        catalog.insert(
            "personal",
            LoanProduct {
                max_amount: 5_000_000,
                interest_rate: "9% - 12% p.a.".to_string(),
                tenure: "12 - 60 months".to_string(),
                min_balance_required: 50_000,
            },
        );
        catalog.insert(
            "home",
            LoanProduct {
                max_amount: 10_000_000,
                interest_rate: "8.5% - 9.5% p.a.".to_string(),
                tenure: "120 - 360 months".to_string(),
                min_balance_required: 100_000,
            },
        );
        catalog.insert(
            "business",
            LoanProduct {
                max_amount: 1_000_000,
                interest_rate: "12% - 15% p.a.".to_string(),
                tenure: "24 - 84 months".to_string(),
                min_balance_required: 200_000,
            },
        );
        catalog.insert(
            "auto",
            LoanProduct {
                max_amount: 5_000_000,
                interest_rate: "8% - 10% p.a.".to_string(),
                tenure: "24 - 84 months".to_string(),
                min_balance_required: 100_000,
            },
        );
        catalog
    };
}

/// In-memory banking dataset, shared read-only by the toolkit
#[derive(Debug, Clone)]
pub struct BankingData {
    pub accounts: Vec<AccountRecord>,
    pub branches: Vec<BranchRecord>,
    pub transactions: Vec<TransactionRecord>,
}

impl BankingData {
    /// Load from `branch_data.json` / `transactions.json` under
    /// `data_dir`, falling back to embedded defaults for anything
    /// missing or unreadable.
    pub fn load(data_dir: &Path) -> Self {
        let branches = load_branches(data_dir);
        let transactions = load_transactions(data_dir);
        let data = Self {
            accounts: default_accounts(),
            branches,
            transactions,
        };
        info!(
            accounts = data.accounts.len(),
            branches = data.branches.len(),
            transactions = data.transactions.len(),
            "Banking dataset loaded"
        );
        data
    }

    pub fn account(&self, account_id: &str) -> Option<&AccountRecord> {
        self.accounts.iter().find(|a| a.account_id == account_id)
    }

    /// Distinct branch cities, in dataset order
    pub fn known_cities(&self) -> Vec<String> {
        let mut cities: Vec<String> = Vec::new();
        for branch in &self.branches {
            if !cities.contains(&branch.city) {
                cities.push(branch.city.clone());
            }
        }
        cities
    }
}

impl Default for BankingData {
    fn default() -> Self {
        Self {
            accounts: default_accounts(),
            branches: default_branches(),
            transactions: sample_transactions(),
        }
    }
}

fn default_accounts() -> Vec<AccountRecord> {
    vec![
        AccountRecord {
            account_id: "ACC001".to_string(),
            customer_name: "Rajesh Kumar".to_string(),
            account_type: "Savings Account".to_string(),
            balance: 250_000,
            account_status: "Active".to_string(),
            opening_date: "2020-01-15".to_string(),
            account_number: "1234567890123456".to_string(),
        },
        AccountRecord {
            account_id: "ACC002".to_string(),
            customer_name: "Priya Sharma".to_string(),
            account_type: "Current Account".to_string(),
            balance: 500_000,
            account_status: "Active".to_string(),
            opening_date: "2019-06-22".to_string(),
            account_number: "2345678901234567".to_string(),
        },
        AccountRecord {
            account_id: "ACC003".to_string(),
            customer_name: "Amit Patel".to_string(),
            account_type: "Salary Account".to_string(),
            balance: 125_000,
            account_status: "Active".to_string(),
            opening_date: "2021-03-10".to_string(),
            account_number: "3456789012345678".to_string(),
        },
    ]
}

pub fn default_branches() -> Vec<BranchRecord> {
    vec![
        BranchRecord {
            id: "BR001".to_string(),
            name: "Downtown Branch".to_string(),
            city: "Mumbai".to_string(),
            address: "123 Financial Plaza, Mumbai - 400001".to_string(),
            phone: "022-1234-5678".to_string(),
            email: "downtown@bankassist.com".to_string(),
            timings: "9:00 AM - 5:00 PM".to_string(),
            services: vec![
                "Account Opening".to_string(),
                "Loan Application".to_string(),
                "Safe Deposit Lockers".to_string(),
            ],
            atm_available: true,
        },
        BranchRecord {
            id: "BR002".to_string(),
            name: "Airport Branch".to_string(),
            city: "Mumbai".to_string(),
            address: "Terminal 2, Mumbai Airport".to_string(),
            phone: "022-9876-5432".to_string(),
            email: "airport@bankassist.com".to_string(),
            timings: "24/7".to_string(),
            services: vec![
                "International Transfers".to_string(),
                "Forex".to_string(),
                "Travel Cards".to_string(),
            ],
            atm_available: true,
        },
        BranchRecord {
            id: "BR003".to_string(),
            name: "IT Hub Branch".to_string(),
            city: "Bangalore".to_string(),
            address: "Tech Park, Whitefield, Bangalore - 560066".to_string(),
            phone: "080-4456-7890".to_string(),
            email: "ithub@bankassist.com".to_string(),
            timings: "9:00 AM - 6:00 PM".to_string(),
            services: vec![
                "Account Opening".to_string(),
                "Credit Cards".to_string(),
                "Digital Services".to_string(),
            ],
            atm_available: true,
        },
        BranchRecord {
            id: "BR004".to_string(),
            name: "Central Branch".to_string(),
            city: "Delhi".to_string(),
            address: "456 Business Central, New Delhi - 110001".to_string(),
            phone: "011-2345-6789".to_string(),
            email: "central@bankassist.com".to_string(),
            timings: "9:00 AM - 5:00 PM".to_string(),
            services: vec![
                "Bulk Services".to_string(),
                "Corporate Accounts".to_string(),
                "Investment".to_string(),
            ],
            atm_available: true,
        },
    ]
}

/// Fabricated recent transactions, ten per known account
pub fn sample_transactions() -> Vec<TransactionRecord> {
    let descriptions = [
        "Salary Deposit",
        "Grocery Purchase",
        "Electricity Bill",
        "ATM Withdrawal",
        "Online Shopping",
        "Transfer to Friend",
    ];

    let mut rng = rand::thread_rng();
    let base = Utc::now();
    let mut transactions = Vec::new();

    for account in default_accounts() {
        for i in 0..10 {
            let days_ago = rng.gen_range(1..=30);
            let date = base - Duration::days(days_ago);
            transactions.push(TransactionRecord {
                transaction_id: format!("TXN{}{:03}", account.account_id, i),
                account_id: account.account_id.clone(),
                customer_name: account.customer_name.clone(),
                date: date.format("%Y-%m-%dT%H:%M:%S").to_string(),
                kind: if rng.gen_bool(0.5) { "Credit" } else { "Debit" }.to_string(),
                amount: (rng.gen_range(1_000.0..50_000.0) * 100.0_f64).round() / 100.0,
                description: descriptions[rng.gen_range(0..descriptions.len())].to_string(),
                status: "Completed".to_string(),
            });
        }
    }

    transactions
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum BranchFile {
    Wrapped { branches: Vec<BranchRecord> },
    Bare(Vec<BranchRecord>),
}

fn load_branches(data_dir: &Path) -> Vec<BranchRecord> {
    let path = data_dir.join("branch_data.json");
    match std::fs::read_to_string(&path) {
        Ok(raw) => match serde_json::from_str::<BranchFile>(&raw) {
            Ok(BranchFile::Wrapped { branches }) | Ok(BranchFile::Bare(branches))
                if !branches.is_empty() =>
            {
                branches
            }
            Ok(_) => {
                warn!("branch_data.json is empty; using default branches");
                default_branches()
            }
            Err(e) => {
                warn!("Failed to parse branch_data.json: {}; using default branches", e);
                default_branches()
            }
        },
        Err(_) => {
            warn!("No branch_data.json found; using default branches");
            default_branches()
        }
    }
}

fn load_transactions(data_dir: &Path) -> Vec<TransactionRecord> {
    let path = data_dir.join("transactions.json");
    match std::fs::read_to_string(&path) {
        Ok(raw) => match serde_json::from_str::<Vec<TransactionRecord>>(&raw) {
            Ok(transactions) if !transactions.is_empty() => transactions,
            Ok(_) | Err(_) => {
                warn!("transactions.json missing or unreadable; using sample transactions");
                sample_transactions()
            }
        },
        Err(_) => sample_transactions(),
    }
}

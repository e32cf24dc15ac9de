//! Banking toolkit: a closed capability set
//!
//! Each tool is a validated operation over the simulated banking records:
//! typed argument structs in, tagged `ToolOutcome` out. Failures are data
//! (an outcome with `success: false`), never an error escaping to the
//! orchestrator. Reads are idempotent; escalation is the only
//! non-idempotent action since every call represents a new request.

pub mod data;

use crate::error::AgentError;
use crate::models::ToolOutcome;
use crate::Result;
use chrono::Utc;
use serde::Deserialize;
use serde_json::{json, Value};
use std::path::Path;
use tracing::debug;

use data::{BankingData, LOAN_CATALOG};

//
// ================= Typed Arguments =================
//

#[derive(Debug, Clone, Deserialize)]
pub struct AccountDetailsArgs {
    pub account_id: String,
}

fn default_days() -> i64 {
    30
}

#[derive(Debug, Clone, Deserialize)]
pub struct TransactionHistoryArgs {
    pub account_id: String,
    #[serde(default = "default_days")]
    pub days: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NearestBranchArgs {
    pub city: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoanEligibilityArgs {
    pub account_id: String,
    pub loan_type: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EscalateArgs {
    pub account_id: String,
    pub reason: String,
}

//
// ================= Tool Request =================
//

/// The closed capability set, one variant per tool
#[derive(Debug, Clone)]
pub enum ToolRequest {
    AccountDetails(AccountDetailsArgs),
    TransactionHistory(TransactionHistoryArgs),
    NearestBranch(NearestBranchArgs),
    LoanEligibility(LoanEligibilityArgs),
    Escalate(EscalateArgs),
}

impl ToolRequest {
    /// Validate a (name, args) pair into a typed request.
    pub fn parse(name: &str, args: Value) -> Result<Self> {
        fn typed<T: serde::de::DeserializeOwned>(name: &str, args: Value) -> Result<T> {
            serde_json::from_value(args)
                .map_err(|e| AgentError::InvalidToolInput(format!("{}: {}", name, e)))
        }

        match name {
            "get_account_details" => Ok(Self::AccountDetails(typed(name, args)?)),
            "get_transaction_history" => Ok(Self::TransactionHistory(typed(name, args)?)),
            "find_nearest_branch" => Ok(Self::NearestBranch(typed(name, args)?)),
            "check_loan_eligibility" => Ok(Self::LoanEligibility(typed(name, args)?)),
            "escalate_to_human" => Ok(Self::Escalate(typed(name, args)?)),
            other => Err(AgentError::ToolNotFound(other.to_string())),
        }
    }
}

//
// ================= Toolkit =================

/// Set of tools for the banking customer service agent
pub struct BankingToolkit {
    data: BankingData,
}

impl BankingToolkit {
    pub fn new(data_dir: &Path) -> Self {
        Self {
            data: BankingData::load(data_dir),
        }
    }

    /// Build over an explicit dataset (tests, alternate backing stores)
    pub fn with_data(data: BankingData) -> Self {
        Self { data }
    }

    /// Dispatch by name. Unknown names and invalid arguments come back as
    /// tagged error outcomes, never as errors.
    pub fn dispatch(&self, name: &str, args: Value) -> ToolOutcome {
        debug!(tool = name, "Dispatching tool call");
        match ToolRequest::parse(name, args) {
            Ok(request) => self.execute(request),
            Err(e) => ToolOutcome::err(e.to_string()),
        }
    }

    pub fn execute(&self, request: ToolRequest) -> ToolOutcome {
        match request {
            ToolRequest::AccountDetails(args) => self.get_account_details(&args.account_id),
            ToolRequest::TransactionHistory(args) => {
                self.get_transaction_history(&args.account_id, args.days)
            }
            ToolRequest::NearestBranch(args) => self.find_nearest_branch(&args.city),
            ToolRequest::LoanEligibility(args) => {
                self.check_loan_eligibility(&args.account_id, &args.loan_type)
            }
            ToolRequest::Escalate(args) => self.escalate_to_human(&args.account_id, &args.reason),
        }
    }

    /// Account record by id
    pub fn get_account_details(&self, account_id: &str) -> ToolOutcome {
        match self.data.account(account_id) {
            Some(account) => ToolOutcome::ok(json!(account)),
            None => {
                let known: Vec<&str> = self
                    .data
                    .accounts
                    .iter()
                    .map(|a| a.account_id.as_str())
                    .collect();
                ToolOutcome::err(format!(
                    "Account {} not found. Try {}",
                    account_id,
                    known.join(", ")
                ))
            }
        }
    }

    /// Most recent transactions for an account, newest first, capped at 10
    pub fn get_transaction_history(&self, account_id: &str, days: i64) -> ToolOutcome {
        let mut relevant: Vec<_> = self
            .data
            .transactions
            .iter()
            .filter(|t| t.account_id == account_id)
            .collect();

        if relevant.is_empty() {
            return ToolOutcome::err(format!("No transactions found for account {}", account_id));
        }

        // ISO dates sort lexicographically
        relevant.sort_by(|a, b| b.date.cmp(&a.date));
        relevant.truncate(10);

        ToolOutcome::ok(json!({
            "account_id": account_id,
            "days": days,
            "transaction_count": relevant.len(),
            "transactions": relevant,
        }))
    }

    /// Case-insensitive substring match over the branch city field
    pub fn find_nearest_branch(&self, city: &str) -> ToolOutcome {
        let needle = city.to_lowercase();
        let matching: Vec<_> = self
            .data
            .branches
            .iter()
            .filter(|b| b.city.to_lowercase().contains(&needle))
            .collect();

        if matching.is_empty() {
            return ToolOutcome::err(format!(
                "No branches found in {}. Available cities: {}",
                city,
                self.data.known_cities().join(", ")
            ));
        }

        ToolOutcome::ok(json!({
            "city": city,
            "branch_count": matching.len(),
            "branches": matching,
        }))
    }

    /// Eligibility is `balance >= min_balance_required` for the loan type.
    /// An unknown loan type is a distinct error from an unknown account.
    pub fn check_loan_eligibility(&self, account_id: &str, loan_type: &str) -> ToolOutcome {
        let account = match self.data.account(account_id) {
            Some(account) => account,
            None => return self.get_account_details(account_id),
        };

        let key = loan_type.to_lowercase();
        let product = match LOAN_CATALOG.get(key.as_str()) {
            Some(product) => product,
            None => {
                let available: Vec<&str> = LOAN_CATALOG.keys().copied().collect();
                return ToolOutcome::err(format!(
                    "Unknown loan type '{}'. Available: {}",
                    loan_type,
                    available.join(", ")
                ));
            }
        };

        let eligible = account.balance >= product.min_balance_required;
        let message = if eligible {
            format!("Eligible for {} loan", loan_type)
        } else {
            format!(
                "Minimum balance of Rs. {} required",
                product.min_balance_required
            )
        };

        ToolOutcome::ok(json!({
            "account_id": account_id,
            "customer_name": account.customer_name,
            "loan_type": loan_type,
            "eligible": eligible,
            "loan_details": product,
            "message": message,
        }))
    }

    /// Always succeeds: generates a time-based ticket id. The only
    /// non-idempotent tool.
    pub fn escalate_to_human(&self, account_id: &str, reason: &str) -> ToolOutcome {
        let ticket_id = format!("TKT{}", Utc::now().format("%Y%m%d%H%M%S"));

        ToolOutcome::ok(json!({
            "ticket_id": ticket_id,
            "account_id": account_id,
            "reason": reason,
            "status": "Created",
            "message": format!(
                "Your request has been escalated. Ticket ID: {}. A human agent will contact you within 2 hours.",
                ticket_id
            ),
            "priority": "high",
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use data::AccountRecord;

    fn toolkit() -> BankingToolkit {
        BankingToolkit::with_data(BankingData::default())
    }

    #[test]
    fn test_get_account_details_found() {
        let outcome = toolkit().get_account_details("ACC001");
        assert!(outcome.success);
        assert_eq!(outcome.data["customer_name"], "Rajesh Kumar");
        assert_eq!(outcome.data["balance"], 250_000);
    }

    #[test]
    fn test_get_account_details_not_found() {
        let outcome = toolkit().get_account_details("ACC999");
        assert!(!outcome.success);
        let error = outcome.error.unwrap();
        assert!(error.contains("ACC999"));
        assert!(error.contains("ACC001"));
    }

    #[test]
    fn test_transaction_history_capped_and_sorted() {
        let outcome = toolkit().get_transaction_history("ACC001", 30);
        assert!(outcome.success);
        let transactions = outcome.data["transactions"].as_array().unwrap();
        assert!(transactions.len() <= 10);

        let dates: Vec<&str> = transactions
            .iter()
            .map(|t| t["date"].as_str().unwrap())
            .collect();
        for pair in dates.windows(2) {
            assert!(pair[0] >= pair[1], "not sorted descending: {:?}", dates);
        }
    }

    #[test]
    fn test_transaction_history_unknown_account() {
        let outcome = toolkit().get_transaction_history("ACC999", 30);
        assert!(!outcome.success);
        assert!(outcome.error.unwrap().contains("ACC999"));
    }

    #[test]
    fn test_find_nearest_branch_case_insensitive() {
        let outcome = toolkit().find_nearest_branch("mumbai");
        assert!(outcome.success);
        assert_eq!(outcome.data["branch_count"], 2);
        for branch in outcome.data["branches"].as_array().unwrap() {
            assert_eq!(branch["city"], "Mumbai");
        }
    }

    #[test]
    fn test_find_nearest_branch_lists_known_cities_on_miss() {
        let outcome = toolkit().find_nearest_branch("Pune");
        assert!(!outcome.success);
        let error = outcome.error.unwrap();
        assert!(error.contains("Mumbai"));
        assert!(error.contains("Bangalore"));
        assert!(error.contains("Delhi"));
    }

    #[test]
    fn test_loan_eligibility_balance_rule() {
        let kit = toolkit();

        // ACC001 balance 250000: personal (50k) yes, business (200k) yes
        let outcome = kit.check_loan_eligibility("ACC001", "personal");
        assert!(outcome.success);
        assert_eq!(outcome.data["eligible"], true);

        // ACC003 balance 125000: business needs 200k
        let outcome = kit.check_loan_eligibility("ACC003", "business");
        assert!(outcome.success);
        assert_eq!(outcome.data["eligible"], false);
    }

    #[test]
    fn test_loan_eligibility_monotonic_in_balance() {
        let threshold = LOAN_CATALOG["home"].min_balance_required;

        let eligible_at = |balance: i64| -> bool {
            let mut data = BankingData::default();
            data.accounts.push(AccountRecord {
                account_id: "ACC777".to_string(),
                customer_name: "Test Customer".to_string(),
                account_type: "Savings Account".to_string(),
                balance,
                account_status: "Active".to_string(),
                opening_date: "2022-01-01".to_string(),
                account_number: "0000111122223333".to_string(),
            });
            let outcome =
                BankingToolkit::with_data(data).check_loan_eligibility("ACC777", "home");
            outcome.data["eligible"].as_bool().unwrap()
        };

        assert!(!eligible_at(threshold - 1));
        assert!(eligible_at(threshold));
        assert!(eligible_at(threshold + 1));
    }

    #[test]
    fn test_loan_eligibility_unknown_type_distinct_from_unknown_account() {
        let kit = toolkit();

        let unknown_type = kit.check_loan_eligibility("ACC001", "yacht");
        assert!(!unknown_type.success);
        assert!(unknown_type.error.unwrap().contains("Unknown loan type"));

        let unknown_account = kit.check_loan_eligibility("ACC999", "home");
        assert!(!unknown_account.success);
        assert!(unknown_account.error.unwrap().contains("ACC999"));
    }

    #[test]
    fn test_escalate_always_succeeds() {
        let outcome = toolkit().escalate_to_human("ACC001", "unauthorized transaction");
        assert!(outcome.success);
        let ticket = outcome.data["ticket_id"].as_str().unwrap();
        assert!(ticket.starts_with("TKT"));
        assert!(outcome.data["message"]
            .as_str()
            .unwrap()
            .contains("within 2 hours"));
    }

    #[test]
    fn test_dispatch_unknown_tool_is_tagged_error() {
        let outcome = toolkit().dispatch("transfer_funds", json!({}));
        assert!(!outcome.success);
        assert!(outcome.error.unwrap().contains("transfer_funds"));
    }

    #[test]
    fn test_dispatch_invalid_args_is_tagged_error() {
        let outcome = toolkit().dispatch("get_account_details", json!({"city": "Mumbai"}));
        assert!(!outcome.success);
        assert!(outcome.error.unwrap().contains("get_account_details"));
    }

    #[test]
    fn test_dispatch_defaults_days() {
        let outcome = toolkit().dispatch(
            "get_transaction_history",
            json!({"account_id": "ACC002"}),
        );
        assert!(outcome.success);
        assert_eq!(outcome.data["days"], 30);
    }
}

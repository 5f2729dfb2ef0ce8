//! # Debit Core
//!
//! A direct debit collection library providing SEPA pain.008 batch export,
//! invoice settlement, and double-entry posting of the collected funds.
//!
//! ## Features
//!
//! - **Batch assembly**: Collection batches built from invoices and signed mandates
//! - **SEPA export**: Deterministic pain.008.001.02 files with one payment block per collection date
//! - **Exact amounts**: Integer cent arithmetic with half-up rounding at two decimals
//! - **Settlement**: One validated voucher per collected invoice, allocated to its receivable line
//! - **Aggregate posting**: A single balancing journal entry per settlement run
//! - **Ledger abstraction**: Backend-agnostic design with a trait-based ledger port
//!
//! ## Quick Start
//!
//! ```rust
//! use debit_core::{BatchBuilder, CreditorConfig, Pain008, PostingConfig, SettlementPlanner};
//! use bigdecimal::BigDecimal;
//! use chrono::NaiveDate;
//!
//! // This example shows basic usage - you need to implement the LedgerPort trait
//! // let mut planner = SettlementPlanner::new(your_ledger, posting_config);
//! // let (result, entry_id) = planner.settle_and_post(&batch).await?;
//! ```

pub mod amount;
pub mod batch;
pub mod sepa;
pub mod settlement;
pub mod traits;
pub mod types;
pub mod utils;

// Re-export commonly used types
pub use amount::*;
pub use batch::*;
pub use sepa::*;
pub use settlement::*;
pub use traits::*;
pub use types::*;

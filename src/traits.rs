//! Traits for ledger abstraction and extensibility

use async_trait::async_trait;
use bigdecimal::BigDecimal;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::types::*;

/// Ledger abstraction the settlement engine runs against
///
/// This trait allows the direct debit core to work with any bookkeeping
/// backend (an ERP, a SQL schema, an in-memory double, etc.) by implementing
/// these methods. Implementations are expected to keep each call atomic;
/// the engine never asks for cross-call transactions.
#[async_trait]
pub trait LedgerPort: Send + Sync {
    /// Look up an invoice by its reference
    async fn find_invoice(&self, invoice_id: &str) -> DebitResult<Option<Invoice>>;

    /// All accounting move lines recorded for an invoice
    async fn invoice_move_lines(&self, invoice_id: &str) -> DebitResult<Vec<MoveLine>>;

    /// Create a draft voucher, returning its identifier
    async fn create_voucher(&mut self, voucher: &VoucherData) -> DebitResult<String>;

    /// Create a voucher line allocating a voucher to a move line
    async fn create_voucher_line(&mut self, line: &VoucherLineData) -> DebitResult<String>;

    /// Run the validation workflow on a draft voucher.
    /// Marks the voucher's invoice as paid on success.
    async fn signal_voucher_validated(&mut self, voucher_id: &str) -> DebitResult<()>;

    /// Create a draft journal entry, returning its identifier
    async fn create_journal_entry(&mut self, entry: &JournalEntryData) -> DebitResult<String>;

    /// Create a journal line on a draft entry
    async fn create_journal_line(&mut self, line: &JournalLineData) -> DebitResult<String>;

    /// Post a draft journal entry to the books
    async fn post_journal_entry(&mut self, entry_id: &str) -> DebitResult<()>;

    /// Identifiers of the non-special accounting periods containing `date`
    async fn find_periods(&self, date: NaiveDate) -> DebitResult<Vec<String>>;
}

/// Snapshot of an invoice as stored by the ledger backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Invoice {
    /// Invoice reference, unique within the ledger
    pub id: String,
    /// Identifier of the payer the invoice is addressed to
    pub payer_id: String,
    /// Receivable account the settlement is allocated against
    pub account_id: String,
    /// Invoice total in major currency units
    pub total: BigDecimal,
    /// Current lifecycle state
    pub state: InvoiceState,
}

/// One accounting move line underlying an invoice
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MoveLine {
    /// Line identifier, unique within the ledger
    pub id: String,
    /// Product linkage; lines carrying one are inventory postings
    pub product_id: Option<String>,
    /// Account the line is booked against
    pub account_id: String,
    /// Debit amount, zero when the line is a credit
    pub debit: BigDecimal,
    /// Credit amount, zero when the line is a debit
    pub credit: BigDecimal,
}

/// Data for creating a settlement voucher
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VoucherData {
    /// Payer the voucher settles with
    pub payer_id: String,
    /// Amount received, in major currency units
    pub amount: BigDecimal,
    /// Journal the voucher is booked in
    pub journal_id: String,
    /// Booking date
    pub date: NaiveDate,
    /// Accounting period the booking date falls in
    pub period_id: String,
    /// Bank account the money arrives on
    pub account_id: String,
    /// Receipt for incoming money, payment for outgoing
    pub kind: VoucherKind,
    /// Reference of the invoice being settled
    pub reference: String,
}

/// Data for creating a voucher line
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VoucherLineData {
    /// Voucher the line belongs to
    pub voucher_id: String,
    /// Receivable move line the voucher is allocated to
    pub move_line_id: String,
    /// Receivable account of the invoice
    pub account_id: String,
    /// Payer the allocation concerns
    pub payer_id: String,
    /// Label shown on the line, the invoice reference
    pub label: String,
    /// Allocated amount; allocations are always for the full line
    pub amount: BigDecimal,
}

/// Data for creating a journal entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JournalEntryData {
    /// Journal the entry is booked in
    pub journal_id: String,
    /// Booking date
    pub date: NaiveDate,
    /// Accounting period the booking date falls in
    pub period_id: String,
}

/// Data for creating a journal line
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JournalLineData {
    /// Entry the line belongs to
    pub entry_id: String,
    /// Journal of the parent entry
    pub journal_id: String,
    /// Account the line is booked against
    pub account_id: String,
    /// Accounting period of the parent entry
    pub period_id: String,
    /// Booking date of the parent entry
    pub date: NaiveDate,
    /// Label shown on the line
    pub label: String,
    /// Debit amount, zero when the line is a credit
    pub debit: BigDecimal,
    /// Credit amount, zero when the line is a debit
    pub credit: BigDecimal,
}

/// An accounting period as stored by the ledger backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Period {
    /// Period identifier, unique within the ledger
    pub id: String,
    /// First day of the period
    pub date_start: NaiveDate,
    /// Last day of the period, inclusive
    pub date_stop: NaiveDate,
    /// Opening or closing periods, never used for bookings
    pub special: bool,
}

impl Period {
    /// Whether `date` falls inside the period
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.date_start <= date && date <= self.date_stop
    }
}

/// Read-only directory of payer mandates
pub trait MandateDirectory {
    /// The mandate on file for a payer, if any
    fn mandate_for(&self, payer_id: &str) -> Option<DebtorMandate>;
}

impl MandateDirectory for HashMap<String, DebtorMandate> {
    fn mandate_for(&self, payer_id: &str) -> Option<DebtorMandate> {
        self.get(payer_id).cloned()
    }
}

/// Trait for implementing custom payment validation rules
pub trait IntentValidator: Send + Sync {
    /// Validate a collection order before it enters a batch
    fn validate_intent(&self, intent: &PaymentIntent) -> DebitResult<()>;
}

/// Default payment validator with basic rules
pub struct DefaultIntentValidator;

impl IntentValidator for DefaultIntentValidator {
    fn validate_intent(&self, intent: &PaymentIntent) -> DebitResult<()> {
        let invalid = |reason: &str| {
            Err(DebitError::InvalidPayment {
                invoice_id: intent.invoice_id.clone(),
                reason: reason.to_string(),
            })
        };

        if intent.invoice_id.trim().is_empty() {
            return Err(DebitError::InvalidPayment {
                invoice_id: "<unknown>".to_string(),
                reason: "invoice reference cannot be empty".to_string(),
            });
        }

        if intent.debtor.name.trim().is_empty() {
            return invalid("debtor name cannot be empty");
        }

        if intent.debtor.iban.trim().is_empty() {
            return invalid("debtor IBAN cannot be empty");
        }

        if intent.debtor.bic.trim().is_empty() {
            return invalid("debtor BIC cannot be empty");
        }

        if intent.debtor.reference.trim().is_empty() {
            return invalid("mandate reference cannot be empty");
        }

        if intent.amount <= BigDecimal::from(0) {
            return invalid("amount must be positive");
        }

        Ok(())
    }
}

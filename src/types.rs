//! Core types and data structures for the direct debit system

use bigdecimal::BigDecimal;
use chrono::{Duration, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::batch::schedule::MIN_NOTICE_DAYS;

/// Sequence types defined by the SEPA direct debit scheme
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SequenceType {
    /// First collection of a recurrent series
    First,
    /// Follow-up collection of a recurrent series
    Recurring,
    /// Single collection not part of a series
    OneOff,
    /// Last collection of a recurrent series
    Final,
}

impl SequenceType {
    /// Returns the ISO 20022 code used in the `SeqTp` element
    pub fn code(&self) -> &'static str {
        match self {
            SequenceType::First => "FRST",
            SequenceType::Recurring => "RCUR",
            SequenceType::OneOff => "OOFF",
            SequenceType::Final => "FNAL",
        }
    }
}

/// Creditor identity and defaults used when assembling collection batches.
/// All fields are supplied by the caller; nothing is discovered at runtime.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreditorConfig {
    /// Legal name of the creditor
    pub name: String,
    /// IBAN of the account the collections are credited to
    pub iban: String,
    /// BIC of the creditor's bank
    pub bic: String,
    /// Creditor scheme identifier issued for the direct debit scheme
    pub scheme_id: String,
    /// ISO 4217 currency shared by every payment in a batch
    pub currency: String,
}

/// Ledger coordinates used when posting settlement results
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostingConfig {
    /// Journal the vouchers and the aggregate entry are booked in
    pub journal_id: String,
    /// Bank account both legs of the aggregate entry are booked against
    pub bank_account_id: String,
}

/// A payer's standing authorization for collections
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DebtorMandate {
    /// Name of the payer as registered with their bank
    pub name: String,
    /// IBAN of the account being debited
    pub iban: String,
    /// BIC of the payer's bank
    pub bic: String,
    /// Unique mandate reference agreed with the payer
    pub reference: String,
    /// Date the mandate was signed
    pub signed_on: NaiveDate,
}

/// A single collection order within a batch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentIntent {
    /// Reference of the invoice being collected
    pub invoice_id: String,
    /// Bank identity and mandate of the payer
    pub debtor: DebtorMandate,
    /// Amount to collect, in major currency units
    pub amount: BigDecimal,
    /// ISO 4217 currency of the amount
    pub currency: String,
    /// Date the funds are requested from the payer's bank
    pub collection_date: NaiveDate,
    /// Free-text remittance description shown to the payer
    pub description: String,
}

/// An ordered set of collection orders exported as one pain.008 file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Batch {
    /// Caller-supplied reference, embedded in the message identifiers
    pub reference: String,
    /// Creditor identity the collections are made under
    pub creditor: CreditorConfig,
    /// Sequence type reported for every payment in the batch
    pub sequence_type: SequenceType,
    /// When the batch was assembled; also the message creation timestamp
    pub created_at: NaiveDateTime,
    /// Default collection date for payments added without their own
    pub collection_date: NaiveDate,
    /// The collection orders in insertion order
    pub intents: Vec<PaymentIntent>,
}

impl Batch {
    /// Create an empty batch
    pub fn new(
        reference: String,
        creditor: CreditorConfig,
        created_at: NaiveDateTime,
        collection_date: NaiveDate,
    ) -> Self {
        Self {
            reference,
            creditor,
            sequence_type: SequenceType::Recurring,
            created_at,
            collection_date,
            intents: Vec::new(),
        }
    }

    /// Add a collection order to the batch
    pub fn add_intent(&mut self, intent: PaymentIntent) {
        self.intents.push(intent);
    }

    /// Number of collection orders in the batch
    pub fn count(&self) -> usize {
        self.intents.len()
    }

    /// Sum of all order amounts, before minor-unit rounding
    pub fn total_amount(&self) -> BigDecimal {
        self.intents.iter().map(|i| &i.amount).sum()
    }

    /// Validate the batch invariants
    pub fn validate(&self) -> Result<(), DebitError> {
        if self.reference.is_empty() {
            return Err(DebitError::Validation(
                "Batch reference must not be empty".to_string(),
            ));
        }

        if self.intents.is_empty() {
            return Err(DebitError::Validation(
                "Batch must contain at least one payment".to_string(),
            ));
        }

        if self.creditor.name.is_empty()
            || self.creditor.iban.is_empty()
            || self.creditor.bic.is_empty()
            || self.creditor.scheme_id.is_empty()
            || self.creditor.currency.is_empty()
        {
            return Err(DebitError::Validation(
                "Creditor identity is incomplete".to_string(),
            ));
        }

        let earliest_collection = self.created_at.date() + Duration::days(MIN_NOTICE_DAYS);

        for intent in &self.intents {
            if intent.currency != self.creditor.currency {
                return Err(DebitError::InvalidPayment {
                    invoice_id: intent.invoice_id.clone(),
                    reason: format!(
                        "currency {} does not match batch currency {}",
                        intent.currency, self.creditor.currency
                    ),
                });
            }

            if intent.amount <= BigDecimal::from(0) {
                return Err(DebitError::InvalidPayment {
                    invoice_id: intent.invoice_id.clone(),
                    reason: "amount must be positive".to_string(),
                });
            }

            if intent.debtor.signed_on > intent.collection_date {
                return Err(DebitError::InvalidPayment {
                    invoice_id: intent.invoice_id.clone(),
                    reason: format!(
                        "mandate signed on {} is after the collection date {}",
                        intent.debtor.signed_on, intent.collection_date
                    ),
                });
            }

            if intent.collection_date < earliest_collection {
                return Err(DebitError::InvalidPayment {
                    invoice_id: intent.invoice_id.clone(),
                    reason: format!(
                        "collection date {} leaves less than {} days of notice",
                        intent.collection_date, MIN_NOTICE_DAYS
                    ),
                });
            }
        }

        Ok(())
    }
}

/// Invoice lifecycle states as reported by the ledger
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum InvoiceState {
    /// Not yet confirmed, nothing to collect
    Draft,
    /// Confirmed and awaiting payment
    Open,
    /// Fully paid
    Paid,
    /// Cancelled, never to be collected
    Cancelled,
}

impl InvoiceState {
    /// Whether the invoice is eligible for settlement
    pub fn is_open(&self) -> bool {
        matches!(self, InvoiceState::Open)
    }
}

/// Why an invoice was left out of a settlement run
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SkipReason {
    /// The invoice was already paid before the run
    AlreadySettled,
    /// The invoice is in a state that cannot be settled
    NotOpen(InvoiceState),
}

impl SkipReason {
    /// Classify a non-open invoice state
    pub fn for_state(state: InvoiceState) -> Self {
        match state {
            InvoiceState::Paid => SkipReason::AlreadySettled,
            other => SkipReason::NotOpen(other),
        }
    }
}

/// Kinds of payment vouchers
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VoucherKind {
    /// Money received from a payer
    Receipt,
    /// Money paid out to a supplier
    Payment,
}

/// Voucher workflow states
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VoucherState {
    /// Created but not yet confirmed
    Draft,
    /// Confirmed; the paired invoice is considered paid
    Validated,
}

impl VoucherState {
    /// Advance the voucher to its validated state.
    /// Validation is terminal, a validated voucher never goes back.
    pub fn validated(self) -> Result<VoucherState, DebitError> {
        match self {
            VoucherState::Draft => Ok(VoucherState::Validated),
            VoucherState::Validated => Err(DebitError::InvalidTransition(
                "voucher is already validated".to_string(),
            )),
        }
    }

    /// Whether no further transitions are possible
    pub fn is_final(&self) -> bool {
        matches!(self, VoucherState::Validated)
    }
}

/// Journal entry workflow states
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum JournalState {
    /// Created but not yet posted to the books
    Draft,
    /// Posted; the entry is immutable from here on
    Posted,
}

impl JournalState {
    /// Advance the entry to its posted state.
    /// Posting is terminal, a posted entry never goes back to draft.
    pub fn posted(self) -> Result<JournalState, DebitError> {
        match self {
            JournalState::Draft => Ok(JournalState::Posted),
            JournalState::Posted => Err(DebitError::InvalidTransition(
                "journal entry is already posted".to_string(),
            )),
        }
    }

    /// Whether no further transitions are possible
    pub fn is_final(&self) -> bool {
        matches!(self, JournalState::Posted)
    }
}

/// Errors that can occur in the direct debit system
#[derive(Debug, thiserror::Error)]
pub enum DebitError {
    #[error("Storage error: {0}")]
    Storage(String),
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),
    #[error("Invalid payment for invoice {invoice_id}: {reason}")]
    InvalidPayment { invoice_id: String, reason: String },
    #[error("Invoice not found: {0}")]
    InvoiceNotFound(String),
    #[error("No accounting period contains {0}")]
    NoPeriodFound(NaiveDate),
    #[error("More than one accounting period contains {0}")]
    AmbiguousPeriod(NaiveDate),
    #[error("Invoice {invoice_id} has {candidates} reconcilable move lines, expected exactly one")]
    AmbiguousReconciliation {
        invoice_id: String,
        candidates: usize,
    },
    #[error("Posting error: {0}")]
    Posting(String),
    #[error("Invalid state transition: {0}")]
    InvalidTransition(String),
    #[error("Serialization error: {0}")]
    Serialization(String),
    #[error("Validation error: {0}")]
    Validation(String),
}

/// Result type for direct debit operations
pub type DebitResult<T> = Result<T, DebitError>;

//! In-memory ledger implementation for testing

use async_trait::async_trait;
use chrono::NaiveDate;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use uuid::Uuid;

use crate::traits::*;
use crate::types::*;

/// A voucher as stored by the in-memory ledger
#[derive(Debug, Clone, PartialEq)]
pub struct StoredVoucher {
    pub data: VoucherData,
    pub state: VoucherState,
}

/// A journal entry as stored by the in-memory ledger
#[derive(Debug, Clone, PartialEq)]
pub struct StoredJournalEntry {
    pub data: JournalEntryData,
    pub state: JournalState,
}

/// In-memory ledger implementation for testing and development.
/// Clones share the same state, so a handle kept aside still sees
/// everything the settlement engine wrote.
#[derive(Debug, Clone)]
pub struct MemoryLedger {
    invoices: Arc<RwLock<HashMap<String, Invoice>>>,
    move_lines: Arc<RwLock<HashMap<String, Vec<MoveLine>>>>,
    vouchers: Arc<RwLock<HashMap<String, StoredVoucher>>>,
    voucher_lines: Arc<RwLock<Vec<VoucherLineData>>>,
    journal_entries: Arc<RwLock<HashMap<String, StoredJournalEntry>>>,
    journal_lines: Arc<RwLock<Vec<JournalLineData>>>,
    periods: Arc<RwLock<Vec<Period>>>,
}

impl MemoryLedger {
    /// Create a new empty ledger
    pub fn new() -> Self {
        Self {
            invoices: Arc::new(RwLock::new(HashMap::new())),
            move_lines: Arc::new(RwLock::new(HashMap::new())),
            vouchers: Arc::new(RwLock::new(HashMap::new())),
            voucher_lines: Arc::new(RwLock::new(Vec::new())),
            journal_entries: Arc::new(RwLock::new(HashMap::new())),
            journal_lines: Arc::new(RwLock::new(Vec::new())),
            periods: Arc::new(RwLock::new(Vec::new())),
        }
    }

    /// Clear all data (useful for testing)
    pub fn clear(&self) {
        self.invoices.write().unwrap().clear();
        self.move_lines.write().unwrap().clear();
        self.vouchers.write().unwrap().clear();
        self.voucher_lines.write().unwrap().clear();
        self.journal_entries.write().unwrap().clear();
        self.journal_lines.write().unwrap().clear();
        self.periods.write().unwrap().clear();
    }

    /// Register an invoice
    pub fn add_invoice(&self, invoice: Invoice) {
        self.invoices
            .write()
            .unwrap()
            .insert(invoice.id.clone(), invoice);
    }

    /// Register a move line under an invoice
    pub fn add_move_line(&self, invoice_id: &str, line: MoveLine) {
        self.move_lines
            .write()
            .unwrap()
            .entry(invoice_id.to_string())
            .or_default()
            .push(line);
    }

    /// Register an accounting period
    pub fn add_period(&self, period: Period) {
        self.periods.write().unwrap().push(period);
    }

    /// Look up a stored invoice
    pub fn invoice(&self, invoice_id: &str) -> Option<Invoice> {
        self.invoices.read().unwrap().get(invoice_id).cloned()
    }

    /// Look up a stored voucher
    pub fn voucher(&self, voucher_id: &str) -> Option<StoredVoucher> {
        self.vouchers.read().unwrap().get(voucher_id).cloned()
    }

    /// Number of vouchers created so far
    pub fn voucher_count(&self) -> usize {
        self.vouchers.read().unwrap().len()
    }

    /// Lines allocated under a voucher
    pub fn voucher_lines(&self, voucher_id: &str) -> Vec<VoucherLineData> {
        self.voucher_lines
            .read()
            .unwrap()
            .iter()
            .filter(|line| line.voucher_id == voucher_id)
            .cloned()
            .collect()
    }

    /// Look up a stored journal entry
    pub fn journal_entry(&self, entry_id: &str) -> Option<StoredJournalEntry> {
        self.journal_entries.read().unwrap().get(entry_id).cloned()
    }

    /// Number of journal entries created so far
    pub fn journal_entry_count(&self) -> usize {
        self.journal_entries.read().unwrap().len()
    }

    /// Lines booked on a journal entry
    pub fn journal_lines(&self, entry_id: &str) -> Vec<JournalLineData> {
        self.journal_lines
            .read()
            .unwrap()
            .iter()
            .filter(|line| line.entry_id == entry_id)
            .cloned()
            .collect()
    }

    fn next_id(prefix: &str) -> String {
        format!("{}-{}", prefix, Uuid::new_v4())
    }
}

impl Default for MemoryLedger {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LedgerPort for MemoryLedger {
    async fn find_invoice(&self, invoice_id: &str) -> DebitResult<Option<Invoice>> {
        Ok(self.invoices.read().unwrap().get(invoice_id).cloned())
    }

    async fn invoice_move_lines(&self, invoice_id: &str) -> DebitResult<Vec<MoveLine>> {
        Ok(self
            .move_lines
            .read()
            .unwrap()
            .get(invoice_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn create_voucher(&mut self, voucher: &VoucherData) -> DebitResult<String> {
        let id = Self::next_id("VCH");
        self.vouchers.write().unwrap().insert(
            id.clone(),
            StoredVoucher {
                data: voucher.clone(),
                state: VoucherState::Draft,
            },
        );
        Ok(id)
    }

    async fn create_voucher_line(&mut self, line: &VoucherLineData) -> DebitResult<String> {
        if !self
            .vouchers
            .read()
            .unwrap()
            .contains_key(&line.voucher_id)
        {
            return Err(DebitError::Storage(format!(
                "voucher {} does not exist",
                line.voucher_id
            )));
        }

        self.voucher_lines.write().unwrap().push(line.clone());
        Ok(Self::next_id("VCHL"))
    }

    async fn signal_voucher_validated(&mut self, voucher_id: &str) -> DebitResult<()> {
        let invoice_id = {
            let mut vouchers = self.vouchers.write().unwrap();
            let voucher = vouchers.get_mut(voucher_id).ok_or_else(|| {
                DebitError::Storage(format!("voucher {} does not exist", voucher_id))
            })?;

            voucher.state = voucher.state.clone().validated()?;
            voucher.data.reference.clone()
        };

        // the validated voucher settles its invoice
        if let Some(invoice) = self.invoices.write().unwrap().get_mut(&invoice_id) {
            invoice.state = InvoiceState::Paid;
        }

        Ok(())
    }

    async fn create_journal_entry(&mut self, entry: &JournalEntryData) -> DebitResult<String> {
        let id = Self::next_id("JE");
        self.journal_entries.write().unwrap().insert(
            id.clone(),
            StoredJournalEntry {
                data: entry.clone(),
                state: JournalState::Draft,
            },
        );
        Ok(id)
    }

    async fn create_journal_line(&mut self, line: &JournalLineData) -> DebitResult<String> {
        {
            let entries = self.journal_entries.read().unwrap();
            let entry = entries.get(&line.entry_id).ok_or_else(|| {
                DebitError::Storage(format!("journal entry {} does not exist", line.entry_id))
            })?;

            if entry.state.is_final() {
                return Err(DebitError::InvalidTransition(
                    "cannot add lines to a posted journal entry".to_string(),
                ));
            }
        }

        self.journal_lines.write().unwrap().push(line.clone());
        Ok(Self::next_id("JEL"))
    }

    async fn post_journal_entry(&mut self, entry_id: &str) -> DebitResult<()> {
        let mut entries = self.journal_entries.write().unwrap();
        let entry = entries.get_mut(entry_id).ok_or_else(|| {
            DebitError::Storage(format!("journal entry {} does not exist", entry_id))
        })?;

        entry.state = entry.state.clone().posted()?;
        Ok(())
    }

    async fn find_periods(&self, date: NaiveDate) -> DebitResult<Vec<String>> {
        Ok(self
            .periods
            .read()
            .unwrap()
            .iter()
            .filter(|period| !period.special && period.contains(date))
            .map(|period| period.id.clone())
            .collect())
    }
}

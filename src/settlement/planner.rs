//! Settlement of collection batches against open invoices

use bigdecimal::{BigDecimal, RoundingMode};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::settlement::{LedgerPoster, PeriodResolver};
use crate::traits::*;
use crate::types::*;

/// An invoice settled during a run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SettledInvoice {
    /// Invoice that was marked paid
    pub invoice_id: String,
    /// Voucher created and validated for it
    pub voucher_id: String,
    /// Settled amount, the invoice total rounded to two decimals
    pub amount: BigDecimal,
}

/// An invoice left out of a run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkippedInvoice {
    pub invoice_id: String,
    pub reason: SkipReason,
}

/// An invoice whose settlement was aborted
#[derive(Debug)]
pub struct FailedInvoice {
    pub invoice_id: String,
    pub error: DebitError,
}

/// Outcome of a settlement run
#[derive(Debug, Default)]
pub struct SettlementResult {
    /// Invoices settled, in batch order
    pub settled: Vec<SettledInvoice>,
    /// Invoices skipped because they cannot be settled
    pub skipped: Vec<SkippedInvoice>,
    /// Invoices whose settlement was aborted by an error
    pub failed: Vec<FailedInvoice>,
    /// Sum of the settled amounts only; skips and failures contribute nothing
    pub total_collected: BigDecimal,
}

impl SettlementResult {
    /// Whether every invoice in the batch was settled
    pub fn is_complete(&self) -> bool {
        self.skipped.is_empty() && self.failed.is_empty()
    }
}

enum SettleOutcome {
    Settled {
        voucher_id: String,
        amount: BigDecimal,
    },
    Skipped(SkipReason),
}

/// Settlement engine that marks collected invoices as paid
pub struct SettlementPlanner<L: LedgerPort> {
    ledger: L,
    config: PostingConfig,
}

impl<L: LedgerPort> SettlementPlanner<L> {
    /// Create a new planner over a ledger backend
    pub fn new(ledger: L, config: PostingConfig) -> Self {
        Self { ledger, config }
    }

    /// The underlying ledger backend
    pub fn ledger(&self) -> &L {
        &self.ledger
    }

    /// Settle every invoice of the batch, one voucher per invoice.
    ///
    /// Business problems (a skipped state, a reconciliation mismatch, an
    /// unknown invoice) are recorded in the result and the run continues
    /// with the next invoice. Backend failures abort the run.
    pub async fn settle(&mut self, batch: &Batch) -> DebitResult<SettlementResult> {
        let posting_date = batch.created_at.date();
        let mut result = SettlementResult::default();

        for intent in &batch.intents {
            match self.settle_invoice(&intent.invoice_id, posting_date).await {
                Ok(SettleOutcome::Settled { voucher_id, amount }) => {
                    debug!(
                        invoice = %intent.invoice_id,
                        voucher = %voucher_id,
                        amount = %amount,
                        "invoice settled"
                    );
                    result.total_collected += &amount;
                    result.settled.push(SettledInvoice {
                        invoice_id: intent.invoice_id.clone(),
                        voucher_id,
                        amount,
                    });
                }
                Ok(SettleOutcome::Skipped(reason)) => {
                    warn!(
                        invoice = %intent.invoice_id,
                        reason = ?reason,
                        "invoice cannot be marked paid, skipping"
                    );
                    result.skipped.push(SkippedInvoice {
                        invoice_id: intent.invoice_id.clone(),
                        reason,
                    });
                }
                Err(error @ DebitError::Storage(_)) => return Err(error),
                Err(error) => {
                    warn!(invoice = %intent.invoice_id, error = %error, "settlement aborted");
                    result.failed.push(FailedInvoice {
                        invoice_id: intent.invoice_id.clone(),
                        error,
                    });
                }
            }
        }

        info!(
            settled = result.settled.len(),
            skipped = result.skipped.len(),
            failed = result.failed.len(),
            total = %result.total_collected,
            "settlement run finished"
        );

        Ok(result)
    }

    /// Settle the batch, then post the aggregate bank movement in one
    /// balancing journal entry. Returns the result and the entry id.
    ///
    /// A posting failure aborts the run after the vouchers are already in
    /// the ledger, and the error carries no settlement report. Callers that
    /// need the report in that case run the two phases themselves:
    /// [`settle`](Self::settle) keeps the report in hand, and
    /// [`post`](Self::post) can be retried with it.
    pub async fn settle_and_post(
        &mut self,
        batch: &Batch,
    ) -> DebitResult<(SettlementResult, String)> {
        let result = self.settle(batch).await?;
        let entry_id = self.post(batch, &result).await?;
        Ok((result, entry_id))
    }

    /// Post the aggregate of a completed settlement run, returning the
    /// journal entry id. Kept separate from [`settle`](Self::settle) so a
    /// run whose posting failed can be retried without settling twice.
    pub async fn post(
        &mut self,
        batch: &Batch,
        result: &SettlementResult,
    ) -> DebitResult<String> {
        LedgerPoster::post(
            &mut self.ledger,
            &result.total_collected,
            batch.created_at.date(),
            &self.config.journal_id,
            &self.config.bank_account_id,
        )
        .await
    }

    async fn settle_invoice(
        &mut self,
        invoice_id: &str,
        posting_date: NaiveDate,
    ) -> DebitResult<SettleOutcome> {
        let invoice = self
            .ledger
            .find_invoice(invoice_id)
            .await?
            .ok_or_else(|| DebitError::InvoiceNotFound(invoice_id.to_string()))?;

        if !invoice.state.is_open() {
            return Ok(SettleOutcome::Skipped(SkipReason::for_state(invoice.state)));
        }

        // The one receivable line the voucher allocates against, found
        // before anything is written so a rejected invoice leaves no trace.
        let lines = self.ledger.invoice_move_lines(invoice_id).await?;
        let candidates: Vec<&MoveLine> = lines
            .iter()
            .filter(|line| line.product_id.is_none() && line.debit > BigDecimal::from(0))
            .collect();

        if candidates.len() != 1 {
            return Err(DebitError::AmbiguousReconciliation {
                invoice_id: invoice_id.to_string(),
                candidates: candidates.len(),
            });
        }
        let receivable = candidates[0];

        let period_id = PeriodResolver::resolve(&self.ledger, posting_date).await?;
        let amount = invoice.total.with_scale_round(2, RoundingMode::HalfUp);

        let voucher_id = self
            .ledger
            .create_voucher(&VoucherData {
                payer_id: invoice.payer_id.clone(),
                amount: amount.clone(),
                journal_id: self.config.journal_id.clone(),
                date: posting_date,
                period_id,
                account_id: self.config.bank_account_id.clone(),
                kind: VoucherKind::Receipt,
                reference: invoice.id.clone(),
            })
            .await?;

        self.ledger
            .create_voucher_line(&VoucherLineData {
                voucher_id: voucher_id.clone(),
                move_line_id: receivable.id.clone(),
                account_id: invoice.account_id.clone(),
                payer_id: invoice.payer_id.clone(),
                label: invoice.id.clone(),
                amount: receivable.debit.abs(),
            })
            .await?;

        self.ledger.signal_voucher_validated(&voucher_id).await?;

        Ok(SettleOutcome::Settled { voucher_id, amount })
    }
}

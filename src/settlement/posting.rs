//! Aggregate journal posting for settlement runs

use bigdecimal::{BigDecimal, RoundingMode};
use chrono::NaiveDate;
use tracing::info;

use crate::settlement::PeriodResolver;
use crate::traits::*;
use crate::types::*;

/// Label carried by both legs of the aggregate entry
pub const AGGREGATE_LINE_LABEL: &str = "/";

/// Posts the aggregate bank movement of a settlement run
pub struct LedgerPoster;

impl LedgerPoster {
    /// Create and post one balancing journal entry for the aggregate amount.
    ///
    /// Both legs are booked on the bank account: the credit records the
    /// collection arriving as a single batch booking, the debit balances
    /// the entry. Posting is all or nothing; any failure propagates and a
    /// zero aggregate is refused rather than silently posted.
    pub async fn post<L: LedgerPort>(
        ledger: &mut L,
        aggregate: &BigDecimal,
        date: NaiveDate,
        journal_id: &str,
        bank_account_id: &str,
    ) -> DebitResult<String> {
        let zero = BigDecimal::from(0);
        if *aggregate <= zero {
            return Err(DebitError::Posting(format!(
                "aggregate amount must be positive, got {}",
                aggregate
            )));
        }

        let amount = aggregate.with_scale_round(2, RoundingMode::HalfUp);
        let period_id = PeriodResolver::resolve(ledger, date).await?;

        let entry_id = ledger
            .create_journal_entry(&JournalEntryData {
                journal_id: journal_id.to_string(),
                date,
                period_id: period_id.clone(),
            })
            .await?;

        ledger
            .create_journal_line(&JournalLineData {
                entry_id: entry_id.clone(),
                journal_id: journal_id.to_string(),
                account_id: bank_account_id.to_string(),
                period_id: period_id.clone(),
                date,
                label: AGGREGATE_LINE_LABEL.to_string(),
                debit: zero.clone(),
                credit: amount.clone(),
            })
            .await?;

        ledger
            .create_journal_line(&JournalLineData {
                entry_id: entry_id.clone(),
                journal_id: journal_id.to_string(),
                account_id: bank_account_id.to_string(),
                period_id,
                date,
                label: AGGREGATE_LINE_LABEL.to_string(),
                debit: amount.clone(),
                credit: zero,
            })
            .await?;

        ledger.post_journal_entry(&entry_id).await?;

        info!(entry = %entry_id, amount = %amount, "posted aggregate settlement entry");

        Ok(entry_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::Period;
    use crate::utils::memory_ledger::MemoryLedger;
    use std::str::FromStr;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn decimal(s: &str) -> BigDecimal {
        BigDecimal::from_str(s).unwrap()
    }

    fn ledger_with_period() -> MemoryLedger {
        let ledger = MemoryLedger::new();
        ledger.add_period(Period {
            id: "2026-08".to_string(),
            date_start: date(2026, 8, 1),
            date_stop: date(2026, 8, 31),
            special: false,
        });
        ledger
    }

    #[tokio::test]
    async fn test_posts_balanced_entry_on_the_bank_account() {
        let mut ledger = ledger_with_period();

        let entry_id = LedgerPoster::post(
            &mut ledger,
            &decimal("165.50"),
            date(2026, 8, 1),
            "BANK",
            "512",
        )
        .await
        .unwrap();

        let entry = ledger.journal_entry(&entry_id).unwrap();
        assert_eq!(entry.state, JournalState::Posted);
        assert_eq!(entry.data.period_id, "2026-08");

        let lines = ledger.journal_lines(&entry_id);
        assert_eq!(lines.len(), 2);

        let total_debit: BigDecimal = lines.iter().map(|l| &l.debit).sum();
        let total_credit: BigDecimal = lines.iter().map(|l| &l.credit).sum();
        assert_eq!(total_debit, decimal("165.50"));
        assert_eq!(total_credit, decimal("165.50"));

        for line in &lines {
            assert_eq!(line.account_id, "512");
            assert_eq!(line.label, AGGREGATE_LINE_LABEL);
        }
    }

    #[tokio::test]
    async fn test_zero_aggregate_is_refused() {
        let mut ledger = ledger_with_period();

        let err = LedgerPoster::post(
            &mut ledger,
            &BigDecimal::from(0),
            date(2026, 8, 1),
            "BANK",
            "512",
        )
        .await
        .unwrap_err();

        assert!(matches!(err, DebitError::Posting(_)));
        assert_eq!(ledger.journal_entry_count(), 0);
    }

    #[tokio::test]
    async fn test_negative_aggregate_is_refused() {
        let mut ledger = ledger_with_period();

        let err = LedgerPoster::post(
            &mut ledger,
            &decimal("-5.00"),
            date(2026, 8, 1),
            "BANK",
            "512",
        )
        .await
        .unwrap_err();

        assert!(matches!(err, DebitError::Posting(_)));
    }

    #[tokio::test]
    async fn test_missing_period_aborts_the_posting() {
        let mut ledger = MemoryLedger::new();

        let err = LedgerPoster::post(
            &mut ledger,
            &decimal("165.50"),
            date(2026, 8, 1),
            "BANK",
            "512",
        )
        .await
        .unwrap_err();

        assert!(matches!(err, DebitError::NoPeriodFound(_)));
        assert_eq!(ledger.journal_entry_count(), 0);
    }
}

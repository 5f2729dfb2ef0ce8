//! Accounting period resolution

use chrono::NaiveDate;
use tracing::debug;

use crate::traits::LedgerPort;
use crate::types::{DebitError, DebitResult};

/// Maps booking dates to accounting periods
pub struct PeriodResolver;

impl PeriodResolver {
    /// Resolve the single open period containing `date`.
    ///
    /// Exactly one period must match. None or several are both errors;
    /// the books cannot decide where the booking belongs.
    pub async fn resolve<L: LedgerPort>(ledger: &L, date: NaiveDate) -> DebitResult<String> {
        let mut periods = ledger.find_periods(date).await?;
        debug!(date = %date, candidates = periods.len(), "resolved accounting periods");

        if periods.len() > 1 {
            return Err(DebitError::AmbiguousPeriod(date));
        }

        match periods.pop() {
            Some(period_id) => Ok(period_id),
            None => Err(DebitError::NoPeriodFound(date)),
        }
    }
}

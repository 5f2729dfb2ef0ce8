//! Minor-unit conversion for monetary amounts

use bigdecimal::{BigDecimal, FromPrimitive, RoundingMode, ToPrimitive};

use crate::types::{DebitError, DebitResult};

/// Convert a major-unit amount to integer minor units (cents).
///
/// The amount is rounded half-up to two decimal places before scaling,
/// so `10.005` becomes `1001`, never `1000`. Zero and negative amounts
/// are rejected; money only flows one way in a collection.
pub fn to_minor_units(amount: &BigDecimal) -> DebitResult<i64> {
    if *amount <= BigDecimal::from(0) {
        return Err(DebitError::InvalidAmount(format!(
            "amount must be positive, got {}",
            amount
        )));
    }

    let rounded = amount.with_scale_round(2, RoundingMode::HalfUp);
    (rounded * BigDecimal::from(100))
        .to_i64()
        .ok_or_else(|| DebitError::InvalidAmount(format!("amount {} is out of range", amount)))
}

/// Convert a float amount to integer minor units.
/// NaN and infinities are rejected before the decimal conversion.
pub fn to_minor_units_f64(amount: f64) -> DebitResult<i64> {
    let decimal = BigDecimal::from_f64(amount).ok_or_else(|| {
        DebitError::InvalidAmount(format!("amount {} is not a finite number", amount))
    })?;
    to_minor_units(&decimal)
}

/// Render minor units as a decimal string with exactly two fraction digits,
/// the form ISO 20022 amount elements expect
pub fn format_minor_units(units: i64) -> String {
    let sign = if units < 0 { "-" } else { "" };
    let magnitude = units.unsigned_abs();
    format!("{}{}.{:02}", sign, magnitude / 100, magnitude % 100)
}

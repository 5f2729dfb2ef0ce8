//! Validation utilities

use crate::traits::*;
use crate::types::*;

/// Validate the structure of an IBAN.
///
/// Checks length, layout and character set only; the check digits are not
/// recomputed here.
pub fn validate_iban(iban: &str) -> DebitResult<()> {
    if iban.trim().is_empty() {
        return Err(DebitError::Validation("IBAN cannot be empty".to_string()));
    }

    if iban.len() < 15 || iban.len() > 34 {
        return Err(DebitError::Validation(
            "IBAN must be between 15 and 34 characters".to_string(),
        ));
    }

    let bytes = iban.as_bytes();
    if !bytes[0].is_ascii_uppercase() || !bytes[1].is_ascii_uppercase() {
        return Err(DebitError::Validation(
            "IBAN must start with a two-letter country code".to_string(),
        ));
    }

    if !bytes[2].is_ascii_digit() || !bytes[3].is_ascii_digit() {
        return Err(DebitError::Validation(
            "IBAN positions 3 and 4 must be check digits".to_string(),
        ));
    }

    if !iban
        .chars()
        .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit())
    {
        return Err(DebitError::Validation(
            "IBAN can only contain uppercase letters and digits".to_string(),
        ));
    }

    Ok(())
}

/// Validate the structure of a BIC (8 or 11 characters)
pub fn validate_bic(bic: &str) -> DebitResult<()> {
    if bic.trim().is_empty() {
        return Err(DebitError::Validation("BIC cannot be empty".to_string()));
    }

    if bic.len() != 8 && bic.len() != 11 {
        return Err(DebitError::Validation(
            "BIC must be 8 or 11 characters".to_string(),
        ));
    }

    if !bic.as_bytes()[..6].iter().all(|b| b.is_ascii_uppercase()) {
        return Err(DebitError::Validation(
            "BIC institution and country codes must be uppercase letters".to_string(),
        ));
    }

    if !bic
        .chars()
        .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit())
    {
        return Err(DebitError::Validation(
            "BIC can only contain uppercase letters and digits".to_string(),
        ));
    }

    Ok(())
}

/// Validate a batch reference.
/// The reference is embedded in the message identifiers, which caps it
/// well below the 35 characters ISO 20022 allows for them.
pub fn validate_batch_reference(reference: &str) -> DebitResult<()> {
    if reference.trim().is_empty() {
        return Err(DebitError::Validation(
            "Batch reference cannot be empty".to_string(),
        ));
    }

    if reference.len() > 20 {
        return Err(DebitError::Validation(
            "Batch reference cannot exceed 20 characters".to_string(),
        ));
    }

    if !reference
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-' || c == '_')
    {
        return Err(DebitError::Validation(
            "Batch reference can only contain alphanumeric characters, dashes, and underscores"
                .to_string(),
        ));
    }

    Ok(())
}

/// Enhanced payment validator with structural bank identifier checks
pub struct EnhancedIntentValidator;

impl IntentValidator for EnhancedIntentValidator {
    fn validate_intent(&self, intent: &PaymentIntent) -> DebitResult<()> {
        // Basic validation
        DefaultIntentValidator.validate_intent(intent)?;

        // Enhanced validations
        validate_iban(&intent.debtor.iban).map_err(|e| payment_error(intent, e))?;
        validate_bic(&intent.debtor.bic).map_err(|e| payment_error(intent, e))?;

        Ok(())
    }
}

fn payment_error(intent: &PaymentIntent, error: DebitError) -> DebitError {
    let reason = match error {
        DebitError::Validation(msg) => msg,
        other => other.to_string(),
    };

    DebitError::InvalidPayment {
        invoice_id: intent.invoice_id.clone(),
        reason,
    }
}

//! Batch assembly from invoices and mandates

use std::fmt;

use bigdecimal::BigDecimal;
use chrono::{NaiveDate, NaiveDateTime};

use crate::traits::*;
use crate::types::*;
use crate::utils::validation::validate_batch_reference;

/// Builder for assembling collection batches
pub struct BatchBuilder {
    batch: Batch,
    validator: Box<dyn IntentValidator>,
}

impl BatchBuilder {
    /// Create a new batch builder
    pub fn new(
        reference: String,
        creditor: CreditorConfig,
        created_at: NaiveDateTime,
        collection_date: NaiveDate,
    ) -> Self {
        Self {
            batch: Batch::new(reference, creditor, created_at, collection_date),
            validator: Box::new(DefaultIntentValidator),
        }
    }

    /// Replace the payment validator
    pub fn with_validator(mut self, validator: Box<dyn IntentValidator>) -> Self {
        self.validator = validator;
        self
    }

    /// Set the sequence type reported for the batch
    pub fn sequence_type(mut self, sequence_type: SequenceType) -> Self {
        self.batch.sequence_type = sequence_type;
        self
    }

    /// Add a fully specified collection order
    pub fn add_intent(mut self, intent: PaymentIntent) -> DebitResult<Self> {
        self.validator.validate_intent(&intent)?;
        self.batch.add_intent(intent);
        Ok(self)
    }

    /// Add a collection for an invoice, taking the payer's bank identity
    /// from the mandate directory and the batch defaults for everything else
    pub fn add_invoice<D: MandateDirectory>(
        self,
        directory: &D,
        payer_id: &str,
        invoice_id: &str,
        amount: BigDecimal,
        description: &str,
    ) -> DebitResult<Self> {
        let debtor =
            directory
                .mandate_for(payer_id)
                .ok_or_else(|| DebitError::InvalidPayment {
                    invoice_id: invoice_id.to_string(),
                    reason: format!("no mandate on file for payer {}", payer_id),
                })?;

        let intent = PaymentIntent {
            invoice_id: invoice_id.to_string(),
            debtor,
            amount,
            currency: self.batch.creditor.currency.clone(),
            collection_date: self.batch.collection_date,
            description: description.to_string(),
        };

        self.add_intent(intent)
    }

    /// Build the batch
    pub fn build(self) -> DebitResult<Batch> {
        validate_batch_reference(&self.batch.reference)?;
        self.batch.validate()?;
        Ok(self.batch)
    }
}

// Manual impl: the boxed validator has no Debug bound
impl fmt::Debug for BatchBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BatchBuilder")
            .field("batch", &self.batch)
            .finish_non_exhaustive()
    }
}

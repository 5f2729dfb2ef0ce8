//! pain.008.001.02 customer direct debit initiation files

use std::collections::BTreeMap;
use std::io::Write;

use chrono::NaiveDate;
use quick_xml::events::{BytesDecl, BytesStart, BytesText, Event};
use quick_xml::Writer;
use tracing::debug;

use crate::amount::{format_minor_units, to_minor_units};
use crate::types::{Batch, DebitError, DebitResult, PaymentIntent};
use crate::utils::validation::validate_batch_reference;

/// Namespace of the pain.008.001.02 message
pub const PAIN008_NAMESPACE: &str = "urn:iso:std:iso:20022:tech:xsd:pain.008.001.02";

/// Maximum length of `MsgId`, `PmtInfId` and `EndToEndId` values
const MAX_ID_LEN: usize = 35;
/// Maximum length of the unstructured remittance text
const MAX_REMITTANCE_LEN: usize = 140;

/// Writer for SEPA core direct debit initiation messages
pub struct Pain008;

impl Pain008 {
    /// Encode the batch into an in-memory pain.008 document
    pub fn encode(batch: &Batch) -> DebitResult<Vec<u8>> {
        let mut out = Vec::new();
        Self::write(&mut out, batch)?;
        Ok(out)
    }

    /// Write the batch as a pain.008 document.
    ///
    /// The output is deterministic: every identifier derives from the batch
    /// reference and creation timestamp, and payments are grouped into one
    /// `PmtInf` block per collection date in ascending date order. Nothing
    /// is written until the whole batch has passed validation.
    pub fn write<W: Write>(mut w: W, batch: &Batch) -> DebitResult<()> {
        batch.validate()?;
        // the reference feeds MsgId and PmtInfId, its cap keeps them within
        // the 35 characters the schema allows
        validate_batch_reference(&batch.reference)?;

        let msg_id = message_id(batch);

        let payments = batch
            .intents
            .iter()
            .map(|intent| CheckedPayment::try_from_intent(intent))
            .collect::<DebitResult<Vec<_>>>()?;

        let mut groups: BTreeMap<NaiveDate, Vec<&CheckedPayment>> = BTreeMap::new();
        for payment in &payments {
            groups
                .entry(payment.intent.collection_date)
                .or_default()
                .push(payment);
        }

        let mut group_sums: BTreeMap<NaiveDate, i64> = BTreeMap::new();
        let mut control_sum = 0i64;
        for (date, group) in &groups {
            let group_sum = group
                .iter()
                .try_fold(0i64, |sum, payment| sum.checked_add(payment.minor_units))
                .ok_or_else(control_sum_overflow)?;
            control_sum = control_sum
                .checked_add(group_sum)
                .ok_or_else(control_sum_overflow)?;
            group_sums.insert(*date, group_sum);
        }

        let mut wr = Writer::new_with_indent(&mut w, b' ', 2);

        wr.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))
            .map_err(xml)?;

        let mut doc = BytesStart::new("Document");
        doc.push_attribute(("xmlns", PAIN008_NAMESPACE));
        doc.push_attribute(("xmlns:xsi", "http://www.w3.org/2001/XMLSchema-instance"));
        wr.write_event(Event::Start(doc)).map_err(xml)?;

        wr.write_event(Event::Start(BytesStart::new("CstmrDrctDbtInitn")))
            .map_err(xml)?;

        write_group_header(&mut wr, batch, &msg_id, payments.len(), control_sum).map_err(xml)?;

        for (date, group) in &groups {
            write_payment_info(&mut wr, batch, *date, group, group_sums[date]).map_err(xml)?;
        }

        wr.write_event(Event::End(BytesStart::new("CstmrDrctDbtInitn").to_end()))
            .map_err(xml)?;
        wr.write_event(Event::End(BytesStart::new("Document").to_end()))
            .map_err(xml)?;

        debug!(
            message_id = %msg_id,
            transactions = payments.len(),
            control_sum = %format_minor_units(control_sum),
            "encoded pain.008 document"
        );
        Ok(())
    }
}

/// A payment that passed the pre-flight checks, its amount fixed in cents
struct CheckedPayment<'a> {
    intent: &'a PaymentIntent,
    minor_units: i64,
}

impl<'a> CheckedPayment<'a> {
    fn try_from_intent(intent: &'a PaymentIntent) -> DebitResult<Self> {
        let invalid = |reason: String| DebitError::InvalidPayment {
            invoice_id: intent.invoice_id.clone(),
            reason,
        };

        if intent.invoice_id.is_empty() || intent.invoice_id.len() > MAX_ID_LEN {
            return Err(invalid(format!(
                "invoice reference must be 1 to {} characters",
                MAX_ID_LEN
            )));
        }

        if intent.debtor.name.is_empty() {
            return Err(invalid("debtor name is missing".to_string()));
        }

        if intent.debtor.iban.is_empty() {
            return Err(invalid("debtor IBAN is missing".to_string()));
        }

        if intent.debtor.bic.is_empty() {
            return Err(invalid("debtor BIC is missing".to_string()));
        }

        if intent.debtor.reference.is_empty() || intent.debtor.reference.len() > MAX_ID_LEN {
            return Err(invalid(format!(
                "mandate reference must be 1 to {} characters",
                MAX_ID_LEN
            )));
        }

        if intent.description.is_empty() || intent.description.len() > MAX_REMITTANCE_LEN {
            return Err(invalid(format!(
                "remittance description must be 1 to {} characters",
                MAX_REMITTANCE_LEN
            )));
        }

        let minor_units = to_minor_units(&intent.amount).map_err(|e| invalid(e.to_string()))?;

        Ok(Self {
            intent,
            minor_units,
        })
    }
}

/// Message identifier, derived from the reference and creation time so the
/// same batch always encodes to the same document
fn message_id(batch: &Batch) -> String {
    format!(
        "{}-{}",
        batch.reference,
        batch.created_at.format("%Y%m%d%H%M%S")
    )
}

fn write_group_header<W: Write>(
    wr: &mut Writer<W>,
    batch: &Batch,
    msg_id: &str,
    count: usize,
    control_sum: i64,
) -> std::result::Result<(), quick_xml::Error> {
    wr.write_event(Event::Start(BytesStart::new("GrpHdr")))?;

    text_el(wr, "MsgId", msg_id)?;
    text_el(
        wr,
        "CreDtTm",
        &batch.created_at.format("%Y-%m-%dT%H:%M:%S").to_string(),
    )?;
    text_el(wr, "NbOfTxs", &count.to_string())?;
    text_el(wr, "CtrlSum", &format_minor_units(control_sum))?;

    wr.write_event(Event::Start(BytesStart::new("InitgPty")))?;
    text_el(wr, "Nm", &batch.creditor.name)?;
    wr.write_event(Event::End(BytesStart::new("InitgPty").to_end()))?;

    wr.write_event(Event::End(BytesStart::new("GrpHdr").to_end()))?;
    Ok(())
}

fn write_payment_info<W: Write>(
    wr: &mut Writer<W>,
    batch: &Batch,
    collection_date: NaiveDate,
    payments: &[&CheckedPayment],
    control_sum: i64,
) -> std::result::Result<(), quick_xml::Error> {
    let group_id = format!("{}-{}", batch.reference, collection_date.format("%Y%m%d"));

    wr.write_event(Event::Start(BytesStart::new("PmtInf")))?;

    text_el(wr, "PmtInfId", &group_id)?;
    text_el(wr, "PmtMtd", "DD")?;
    text_el(wr, "BtchBookg", "true")?;
    text_el(wr, "NbOfTxs", &payments.len().to_string())?;
    text_el(wr, "CtrlSum", &format_minor_units(control_sum))?;

    wr.write_event(Event::Start(BytesStart::new("PmtTpInf")))?;
    wr.write_event(Event::Start(BytesStart::new("SvcLvl")))?;
    text_el(wr, "Cd", "SEPA")?;
    wr.write_event(Event::End(BytesStart::new("SvcLvl").to_end()))?;
    wr.write_event(Event::Start(BytesStart::new("LclInstrm")))?;
    text_el(wr, "Cd", "CORE")?;
    wr.write_event(Event::End(BytesStart::new("LclInstrm").to_end()))?;
    text_el(wr, "SeqTp", batch.sequence_type.code())?;
    wr.write_event(Event::End(BytesStart::new("PmtTpInf").to_end()))?;

    text_el(
        wr,
        "ReqdColltnDt",
        &collection_date.format("%Y-%m-%d").to_string(),
    )?;

    wr.write_event(Event::Start(BytesStart::new("Cdtr")))?;
    text_el(wr, "Nm", &batch.creditor.name)?;
    wr.write_event(Event::End(BytesStart::new("Cdtr").to_end()))?;

    wr.write_event(Event::Start(BytesStart::new("CdtrAcct")))?;
    wr.write_event(Event::Start(BytesStart::new("Id")))?;
    text_el(wr, "IBAN", &batch.creditor.iban)?;
    wr.write_event(Event::End(BytesStart::new("Id").to_end()))?;
    wr.write_event(Event::End(BytesStart::new("CdtrAcct").to_end()))?;

    wr.write_event(Event::Start(BytesStart::new("CdtrAgt")))?;
    wr.write_event(Event::Start(BytesStart::new("FinInstnId")))?;
    text_el(wr, "BIC", &batch.creditor.bic)?;
    wr.write_event(Event::End(BytesStart::new("FinInstnId").to_end()))?;
    wr.write_event(Event::End(BytesStart::new("CdtrAgt").to_end()))?;

    text_el(wr, "ChrgBr", "SLEV")?;

    wr.write_event(Event::Start(BytesStart::new("CdtrSchmeId")))?;
    wr.write_event(Event::Start(BytesStart::new("Id")))?;
    wr.write_event(Event::Start(BytesStart::new("PrvtId")))?;
    wr.write_event(Event::Start(BytesStart::new("Othr")))?;
    text_el(wr, "Id", &batch.creditor.scheme_id)?;
    wr.write_event(Event::Start(BytesStart::new("SchmeNm")))?;
    text_el(wr, "Prtry", "SEPA")?;
    wr.write_event(Event::End(BytesStart::new("SchmeNm").to_end()))?;
    wr.write_event(Event::End(BytesStart::new("Othr").to_end()))?;
    wr.write_event(Event::End(BytesStart::new("PrvtId").to_end()))?;
    wr.write_event(Event::End(BytesStart::new("Id").to_end()))?;
    wr.write_event(Event::End(BytesStart::new("CdtrSchmeId").to_end()))?;

    for payment in payments {
        write_transaction(wr, batch, payment)?;
    }

    wr.write_event(Event::End(BytesStart::new("PmtInf").to_end()))?;
    Ok(())
}

fn write_transaction<W: Write>(
    wr: &mut Writer<W>,
    batch: &Batch,
    payment: &CheckedPayment,
) -> std::result::Result<(), quick_xml::Error> {
    let intent = payment.intent;

    wr.write_event(Event::Start(BytesStart::new("DrctDbtTxInf")))?;

    wr.write_event(Event::Start(BytesStart::new("PmtId")))?;
    text_el(wr, "EndToEndId", &intent.invoice_id)?;
    wr.write_event(Event::End(BytesStart::new("PmtId").to_end()))?;

    let amount = format_minor_units(payment.minor_units);
    wr.write_event(Event::Start(
        BytesStart::new("InstdAmt").with_attributes([("Ccy", batch.creditor.currency.as_str())]),
    ))?;
    wr.write_event(Event::Text(BytesText::new(&amount)))?;
    wr.write_event(Event::End(BytesStart::new("InstdAmt").to_end()))?;

    wr.write_event(Event::Start(BytesStart::new("DrctDbtTx")))?;
    wr.write_event(Event::Start(BytesStart::new("MndtRltdInf")))?;
    text_el(wr, "MndtId", &intent.debtor.reference)?;
    text_el(
        wr,
        "DtOfSgntr",
        &intent.debtor.signed_on.format("%Y-%m-%d").to_string(),
    )?;
    wr.write_event(Event::End(BytesStart::new("MndtRltdInf").to_end()))?;
    wr.write_event(Event::End(BytesStart::new("DrctDbtTx").to_end()))?;

    wr.write_event(Event::Start(BytesStart::new("DbtrAgt")))?;
    wr.write_event(Event::Start(BytesStart::new("FinInstnId")))?;
    text_el(wr, "BIC", &intent.debtor.bic)?;
    wr.write_event(Event::End(BytesStart::new("FinInstnId").to_end()))?;
    wr.write_event(Event::End(BytesStart::new("DbtrAgt").to_end()))?;

    wr.write_event(Event::Start(BytesStart::new("Dbtr")))?;
    text_el(wr, "Nm", &intent.debtor.name)?;
    wr.write_event(Event::End(BytesStart::new("Dbtr").to_end()))?;

    wr.write_event(Event::Start(BytesStart::new("DbtrAcct")))?;
    wr.write_event(Event::Start(BytesStart::new("Id")))?;
    text_el(wr, "IBAN", &intent.debtor.iban)?;
    wr.write_event(Event::End(BytesStart::new("Id").to_end()))?;
    wr.write_event(Event::End(BytesStart::new("DbtrAcct").to_end()))?;

    wr.write_event(Event::Start(BytesStart::new("RmtInf")))?;
    text_el(wr, "Ustrd", &intent.description)?;
    wr.write_event(Event::End(BytesStart::new("RmtInf").to_end()))?;

    wr.write_event(Event::End(BytesStart::new("DrctDbtTxInf").to_end()))?;
    Ok(())
}

fn text_el<W: Write>(
    wr: &mut Writer<W>,
    tag: &str,
    text: &str,
) -> std::result::Result<(), quick_xml::Error> {
    wr.write_event(Event::Start(BytesStart::new(tag)))?;
    wr.write_event(Event::Text(BytesText::new(text)))?;
    wr.write_event(Event::End(BytesStart::new(tag).to_end()))?;
    Ok(())
}

fn xml<E: std::fmt::Display>(e: E) -> DebitError {
    DebitError::Serialization(e.to_string())
}

fn control_sum_overflow() -> DebitError {
    DebitError::InvalidAmount("control sum is out of range".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{CreditorConfig, DebtorMandate};
    use bigdecimal::BigDecimal;
    use std::str::FromStr;

    fn creditor() -> CreditorConfig {
        CreditorConfig {
            name: "Acme Hosting".to_string(),
            iban: "FR7630006000011234567890189".to_string(),
            bic: "AGRIFRPP".to_string(),
            scheme_id: "FR12ZZZ123456".to_string(),
            currency: "EUR".to_string(),
        }
    }

    fn intent(invoice_id: &str, amount: &str, day: u32) -> PaymentIntent {
        PaymentIntent {
            invoice_id: invoice_id.to_string(),
            debtor: DebtorMandate {
                name: "Dupont SARL".to_string(),
                iban: "FR1420041010050500013M02606".to_string(),
                bic: "PSSTFRPP".to_string(),
                reference: "RUM-2025-0042".to_string(),
                signed_on: date(2025, 3, 1),
            },
            amount: BigDecimal::from_str(amount).unwrap(),
            currency: "EUR".to_string(),
            collection_date: date(2026, 8, day),
            description: format!("Invoice {}", invoice_id),
        }
    }

    fn date(y: i32, m: u32, d: u32) -> chrono::NaiveDate {
        chrono::NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn batch(intents: Vec<PaymentIntent>) -> Batch {
        let mut batch = Batch::new(
            "DD-2026-08".to_string(),
            creditor(),
            date(2026, 8, 1).and_hms_opt(9, 30, 0).unwrap(),
            date(2026, 8, 20),
        );
        for intent in intents {
            batch.add_intent(intent);
        }
        batch
    }

    fn encode_to_string(batch: &Batch) -> String {
        String::from_utf8(Pain008::encode(batch).unwrap()).unwrap()
    }

    #[test]
    fn test_message_header() {
        let xml = encode_to_string(&batch(vec![intent("INV-001", "120.00", 20)]));

        assert!(xml.starts_with("<?xml version=\"1.0\" encoding=\"UTF-8\"?>"));
        assert!(xml.contains("urn:iso:std:iso:20022:tech:xsd:pain.008.001.02"));
        assert!(xml.contains("<MsgId>DD-2026-08-20260801093000</MsgId>"));
        assert!(xml.contains("<CreDtTm>2026-08-01T09:30:00</CreDtTm>"));
        assert!(xml.contains("<Nm>Acme Hosting</Nm>"));
    }

    #[test]
    fn test_control_sum_and_count() {
        let xml = encode_to_string(&batch(vec![
            intent("INV-001", "120.00", 20),
            intent("INV-002", "45.50", 20),
        ]));

        assert_eq!(xml.matches("<CtrlSum>165.50</CtrlSum>").count(), 2);
        assert_eq!(xml.matches("<NbOfTxs>2</NbOfTxs>").count(), 2);
        assert!(xml.contains("<InstdAmt Ccy=\"EUR\">120.00</InstdAmt>"));
        assert!(xml.contains("<InstdAmt Ccy=\"EUR\">45.50</InstdAmt>"));
    }

    #[test]
    fn test_amounts_rounded_half_up() {
        let xml = encode_to_string(&batch(vec![intent("INV-001", "10.005", 20)]));

        assert!(xml.contains("<InstdAmt Ccy=\"EUR\">10.01</InstdAmt>"));
        assert!(xml.contains("<CtrlSum>10.01</CtrlSum>"));
    }

    #[test]
    fn test_payments_grouped_by_collection_date() {
        let xml = encode_to_string(&batch(vec![
            intent("INV-003", "10.00", 25),
            intent("INV-001", "120.00", 20),
            intent("INV-002", "45.50", 20),
        ]));

        assert_eq!(xml.matches("<PmtInf>").count(), 2);
        assert_eq!(xml.matches("<NbOfTxs>3</NbOfTxs>").count(), 1);

        let early = xml.find("<ReqdColltnDt>2026-08-20</ReqdColltnDt>").unwrap();
        let late = xml.find("<ReqdColltnDt>2026-08-25</ReqdColltnDt>").unwrap();
        assert!(early < late);

        assert!(xml.contains("<PmtInfId>DD-2026-08-20260820</PmtInfId>"));
        assert!(xml.contains("<PmtInfId>DD-2026-08-20260825</PmtInfId>"));
    }

    #[test]
    fn test_scheme_and_mandate_fields() {
        let xml = encode_to_string(&batch(vec![intent("INV-001", "120.00", 20)]));

        assert!(xml.contains("<PmtMtd>DD</PmtMtd>"));
        assert!(xml.contains("<BtchBookg>true</BtchBookg>"));
        assert!(xml.contains("<Cd>SEPA</Cd>"));
        assert!(xml.contains("<Cd>CORE</Cd>"));
        assert!(xml.contains("<SeqTp>RCUR</SeqTp>"));
        assert!(xml.contains("<ChrgBr>SLEV</ChrgBr>"));
        assert!(xml.contains("<Prtry>SEPA</Prtry>"));
        assert!(xml.contains("<Id>FR12ZZZ123456</Id>"));
        assert!(xml.contains("<MndtId>RUM-2025-0042</MndtId>"));
        assert!(xml.contains("<DtOfSgntr>2025-03-01</DtOfSgntr>"));
        assert!(xml.contains("<EndToEndId>INV-001</EndToEndId>"));
        assert!(xml.contains("<Ustrd>Invoice INV-001</Ustrd>"));
    }

    #[test]
    fn test_output_is_deterministic() {
        let batch = batch(vec![
            intent("INV-001", "120.00", 20),
            intent("INV-002", "45.50", 25),
        ]);

        assert_eq!(Pain008::encode(&batch).unwrap(), Pain008::encode(&batch).unwrap());
    }

    #[test]
    fn test_reserved_characters_escaped() {
        let mut bad = intent("INV-001", "120.00", 20);
        bad.debtor.name = "Dupont & Fils <SA>".to_string();

        let xml = encode_to_string(&batch(vec![bad]));
        assert!(xml.contains("Dupont &amp; Fils &lt;SA&gt;"));
    }

    #[test]
    fn test_invalid_amount_names_the_invoice() {
        let err = Pain008::encode(&batch(vec![intent("INV-009", "0.00", 20)])).unwrap_err();

        assert!(
            matches!(err, DebitError::InvalidPayment { invoice_id, .. } if invoice_id == "INV-009")
        );
    }

    #[test]
    fn test_control_sum_out_of_range_is_rejected() {
        // each amount fits in 64-bit cents on its own, their sum does not
        let err = Pain008::encode(&batch(vec![
            intent("INV-001", "70000000000000000.00", 20),
            intent("INV-002", "70000000000000000.00", 20),
        ]))
        .unwrap_err();

        assert!(matches!(err, DebitError::InvalidAmount(_)));
    }

    #[test]
    fn test_reference_is_validated_at_encode() {
        // batches assembled without the builder get their reference vetted too
        let mut long = batch(vec![intent("INV-001", "120.00", 20)]);
        long.reference = "DD-2026-08-RETRY-BATCH-SECOND".to_string();
        assert!(matches!(
            Pain008::encode(&long).unwrap_err(),
            DebitError::Validation(_)
        ));

        let mut odd = batch(vec![intent("INV-002", "45.50", 20)]);
        odd.reference = "DD 2026/08".to_string();
        assert!(matches!(
            Pain008::encode(&odd).unwrap_err(),
            DebitError::Validation(_)
        ));
    }

    #[test]
    fn test_currency_mismatch_rejected() {
        let mut odd = intent("INV-010", "10.00", 20);
        odd.currency = "USD".to_string();

        let err = Pain008::encode(&batch(vec![odd])).unwrap_err();
        assert!(matches!(err, DebitError::InvalidPayment { .. }));
    }

    #[test]
    fn test_mandate_signed_after_collection_rejected() {
        let mut odd = intent("INV-011", "10.00", 20);
        odd.debtor.signed_on = date(2026, 9, 1);

        let err = Pain008::encode(&batch(vec![odd])).unwrap_err();
        assert!(matches!(err, DebitError::InvalidPayment { .. }));
    }

    #[test]
    fn test_overlong_remittance_rejected() {
        let mut odd = intent("INV-012", "10.00", 20);
        odd.description = "x".repeat(141);

        let err = Pain008::encode(&batch(vec![odd])).unwrap_err();
        assert!(matches!(err, DebitError::InvalidPayment { .. }));
    }

    #[test]
    fn test_nothing_written_when_validation_fails() {
        let mut out = Vec::new();
        let mut odd = intent("INV-013", "10.00", 20);
        odd.debtor.iban = String::new();

        assert!(Pain008::write(&mut out, &batch(vec![odd])).is_err());
        assert!(out.is_empty());
    }
}

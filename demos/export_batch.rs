//! Batch assembly and pain.008 export example

use bigdecimal::BigDecimal;
use chrono::Local;
use debit_core::{
    default_collection_date, BatchBuilder, CreditorConfig, DebtorMandate, Pain008, SequenceType,
    MIN_NOTICE_DAYS,
};
use std::collections::HashMap;
use std::str::FromStr;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("🏦 Debit Core - Batch Export Example\n");

    // 1. Load the mandates the payers have signed
    println!("📋 Loading Mandate Directory...");
    let directory: HashMap<String, DebtorMandate> = serde_json::from_str(
        r#"{
            "P-001": {
                "name": "Dupont SARL",
                "iban": "FR1420041010050500013M02606",
                "bic": "PSSTFRPP",
                "reference": "RUM-2025-0042",
                "signed_on": "2025-03-01"
            },
            "P-002": {
                "name": "Martin et Fils",
                "iban": "FR7630004000031234567890143",
                "bic": "PSSTFRPP",
                "reference": "RUM-2025-0091",
                "signed_on": "2024-11-18"
            }
        }"#,
    )?;

    for (payer, mandate) in &directory {
        println!("  ✓ {} pays under mandate {}", payer, mandate.reference);
    }
    println!();

    // 2. Pick the collection date
    let today = Local::now().date_naive();
    let collection_date = default_collection_date(today, MIN_NOTICE_DAYS);
    println!("📅 Collections requested for {}\n", collection_date);

    // 3. Assemble the batch
    let creditor = CreditorConfig {
        name: "Acme Hosting".to_string(),
        iban: "FR7630006000011234567890189".to_string(),
        bic: "AGRIFRPP".to_string(),
        scheme_id: "FR12ZZZ123456".to_string(),
        currency: "EUR".to_string(),
    };

    let batch = BatchBuilder::new(
        format!("DD-{}", today.format("%Y-%m")),
        creditor,
        Local::now().naive_local(),
        collection_date,
    )
    .sequence_type(SequenceType::Recurring)
    .add_invoice(
        &directory,
        "P-001",
        "INV-001",
        BigDecimal::from_str("120.00")?,
        "Hosting subscription",
    )?
    .add_invoice(
        &directory,
        "P-002",
        "INV-002",
        BigDecimal::from_str("45.50")?,
        "Domain renewals",
    )?
    .build()?;

    println!(
        "💰 Batch {} collects €{} over {} payments\n",
        batch.reference,
        batch.total_amount(),
        batch.count()
    );

    // 4. Export the pain.008 file the bank will receive
    let xml = Pain008::encode(&batch)?;
    println!("{}", String::from_utf8(xml)?);

    println!("🎉 Example completed successfully!");
    Ok(())
}

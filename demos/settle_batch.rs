//! Invoice settlement and aggregate posting example

use bigdecimal::BigDecimal;
use chrono::NaiveDate;
use debit_core::utils::MemoryLedger;
use debit_core::{
    BatchBuilder, CreditorConfig, DebtorMandate, Invoice, InvoiceState, MoveLine, Period,
    PostingConfig, SettlementPlanner,
};
use std::collections::HashMap;
use std::str::FromStr;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn seed_invoice(
    ledger: &MemoryLedger,
    invoice_id: &str,
    payer_id: &str,
    total: &str,
    state: InvoiceState,
) {
    let total = BigDecimal::from_str(total).unwrap();
    ledger.add_invoice(Invoice {
        id: invoice_id.to_string(),
        payer_id: payer_id.to_string(),
        account_id: "411".to_string(),
        total: total.clone(),
        state,
    });
    ledger.add_move_line(
        invoice_id,
        MoveLine {
            id: format!("{}-recv", invoice_id),
            product_id: None,
            account_id: "411".to_string(),
            debit: total.clone(),
            credit: BigDecimal::from(0),
        },
    );
    ledger.add_move_line(
        invoice_id,
        MoveLine {
            id: format!("{}-rev", invoice_id),
            product_id: Some("HOSTING".to_string()),
            account_id: "706".to_string(),
            debit: BigDecimal::from(0),
            credit: total,
        },
    );
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    println!("🏦 Debit Core - Settlement Example\n");

    // 1. Seed the in-memory ledger
    println!("📒 Seeding Ledger...");
    let ledger = MemoryLedger::new();
    ledger.add_period(Period {
        id: "2026-08".to_string(),
        date_start: NaiveDate::from_ymd_opt(2026, 8, 1).unwrap(),
        date_stop: NaiveDate::from_ymd_opt(2026, 8, 31).unwrap(),
        special: false,
    });

    seed_invoice(&ledger, "INV-001", "P-001", "120.00", InvoiceState::Open);
    seed_invoice(&ledger, "INV-002", "P-002", "45.50", InvoiceState::Open);
    seed_invoice(&ledger, "INV-003", "P-001", "80.00", InvoiceState::Paid);
    println!("  ✓ 3 invoices on the books, one already paid\n");

    // 2. Assemble the collection batch
    let mut directory = HashMap::new();
    directory.insert(
        "P-001".to_string(),
        DebtorMandate {
            name: "Dupont SARL".to_string(),
            iban: "FR1420041010050500013M02606".to_string(),
            bic: "PSSTFRPP".to_string(),
            reference: "RUM-2025-0042".to_string(),
            signed_on: NaiveDate::from_ymd_opt(2025, 3, 1).unwrap(),
        },
    );
    directory.insert(
        "P-002".to_string(),
        DebtorMandate {
            name: "Martin et Fils".to_string(),
            iban: "FR7630004000031234567890143".to_string(),
            bic: "PSSTFRPP".to_string(),
            reference: "RUM-2025-0091".to_string(),
            signed_on: NaiveDate::from_ymd_opt(2024, 11, 18).unwrap(),
        },
    );

    let creditor = CreditorConfig {
        name: "Acme Hosting".to_string(),
        iban: "FR7630006000011234567890189".to_string(),
        bic: "AGRIFRPP".to_string(),
        scheme_id: "FR12ZZZ123456".to_string(),
        currency: "EUR".to_string(),
    };

    let batch = BatchBuilder::new(
        "DD-2026-08".to_string(),
        creditor,
        NaiveDate::from_ymd_opt(2026, 8, 1)
            .unwrap()
            .and_hms_opt(9, 30, 0)
            .unwrap(),
        NaiveDate::from_ymd_opt(2026, 8, 20).unwrap(),
    )
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
    .add_invoice(
        &directory,
        "P-001",
        "INV-003",
        BigDecimal::from_str("80.00")?,
        "Support hours",
    )?
    .build()?;

    // 3. Settle the batch and post the aggregate bank movement
    println!("💰 Settling Batch {}...\n", batch.reference);
    let config = PostingConfig {
        journal_id: "BANK".to_string(),
        bank_account_id: "512".to_string(),
    };
    let mut planner = SettlementPlanner::new(ledger.clone(), config);
    let (result, entry_id) = planner.settle_and_post(&batch).await?;

    println!("  Settlement Summary:");
    for settled in &result.settled {
        println!(
            "    ✓ {} settled for €{} by voucher {}",
            settled.invoice_id, settled.amount, settled.voucher_id
        );
    }
    for skipped in &result.skipped {
        println!("    - {} skipped ({:?})", skipped.invoice_id, skipped.reason);
    }
    for failed in &result.failed {
        println!("    ❌ {} failed: {}", failed.invoice_id, failed.error);
    }
    println!("  Total collected: €{}\n", result.total_collected);

    // 4. Inspect the posted aggregate entry
    let entry = ledger
        .journal_entry(&entry_id)
        .ok_or("aggregate entry missing")?;
    println!(
        "📊 Aggregate entry {} in journal {} ({:?}):",
        entry_id, entry.data.journal_id, entry.state
    );
    for line in ledger.journal_lines(&entry_id) {
        println!(
            "    account {}  debit €{}  credit €{}",
            line.account_id, line.debit, line.credit
        );
    }

    println!("\n🎉 Example completed successfully!");
    Ok(())
}

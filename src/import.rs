// 📥 CSV Import - bulk load entries of any of the three categories
//
// Expected headers:
//   transfers: date,time,ref_no,source_amount,rate,submitted[,reference2]
//   special:   user_name,date,balance_type,name_amount,submitted_amount
//   ledger:    date,reference_type,amount_added,amount_withdrawn
//
// Amounts are read as text. Anything that does not parse as a decimal
// (after dropping thousands separators) becomes 0 and is logged.

use crate::entities::{ForeignTransferEntry, LedgerEntry, ReferenceType, SpecialBalanceEntry};
use anyhow::{Context, Result};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::io::Read;
use std::path::Path;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportKind {
    Transfers,
    Special,
    Ledger,
}

impl ImportKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ImportKind::Transfers => "transfers",
            ImportKind::Special => "special",
            ImportKind::Ledger => "ledger",
        }
    }
}

// ============================================================================
// RAW ROWS
// ============================================================================

#[derive(Debug, Deserialize)]
struct TransferRow {
    date: String,
    time: String,
    ref_no: String,
    source_amount: String,
    rate: String,
    submitted: String,
    #[serde(default)]
    reference2: String,
}

#[derive(Debug, Deserialize)]
struct SpecialRow {
    user_name: String,
    date: String,
    balance_type: String,
    name_amount: String,
    submitted_amount: String,
}

#[derive(Debug, Deserialize)]
struct LedgerRow {
    date: String,
    reference_type: String,
    amount_added: String,
    amount_withdrawn: String,
}

// ============================================================================
// LOADERS
// ============================================================================

pub fn load_transfers_csv(csv_path: &Path) -> Result<Vec<ForeignTransferEntry>> {
    let file = std::fs::File::open(csv_path)
        .with_context(|| format!("Failed to open CSV file {}", csv_path.display()))?;
    read_transfers(file)
}

pub fn load_special_csv(csv_path: &Path) -> Result<Vec<SpecialBalanceEntry>> {
    let file = std::fs::File::open(csv_path)
        .with_context(|| format!("Failed to open CSV file {}", csv_path.display()))?;
    read_special(file)
}

pub fn load_ledger_csv(csv_path: &Path) -> Result<Vec<LedgerEntry>> {
    let file = std::fs::File::open(csv_path)
        .with_context(|| format!("Failed to open CSV file {}", csv_path.display()))?;
    read_ledger(file)
}

pub fn read_transfers<R: Read>(reader: R) -> Result<Vec<ForeignTransferEntry>> {
    let mut rdr = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
    let mut entries = Vec::new();

    for (index, result) in rdr.deserialize().enumerate() {
        let row: TransferRow = result.context("Failed to deserialize transfer row")?;
        let line = index + 2;

        let entry = ForeignTransferEntry::new(
            &row.date,
            &row.time,
            &row.ref_no,
            sanitize_amount(&row.source_amount, line, "source_amount"),
            sanitize_amount(&row.rate, line, "rate"),
            sanitize_amount(&row.submitted, line, "submitted"),
        )
        .with_reference2(&row.reference2);

        entries.push(entry);
    }

    tracing::debug!(count = entries.len(), "read transfer rows");
    Ok(entries)
}

pub fn read_special<R: Read>(reader: R) -> Result<Vec<SpecialBalanceEntry>> {
    let mut rdr = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
    let mut entries = Vec::new();

    for (index, result) in rdr.deserialize().enumerate() {
        let row: SpecialRow = result.context("Failed to deserialize special balance row")?;
        let line = index + 2;

        entries.push(SpecialBalanceEntry::new(
            &row.user_name,
            &row.date,
            sanitize_reference_type(&row.balance_type, line),
            sanitize_amount(&row.name_amount, line, "name_amount"),
            sanitize_amount(&row.submitted_amount, line, "submitted_amount"),
        ));
    }

    tracing::debug!(count = entries.len(), "read special balance rows");
    Ok(entries)
}

pub fn read_ledger<R: Read>(reader: R) -> Result<Vec<LedgerEntry>> {
    let mut rdr = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
    let mut entries = Vec::new();

    for (index, result) in rdr.deserialize().enumerate() {
        let row: LedgerRow = result.context("Failed to deserialize ledger row")?;
        let line = index + 2;

        entries.push(LedgerEntry::new(
            &row.date,
            sanitize_reference_type(&row.reference_type, line),
            sanitize_amount(&row.amount_added, line, "amount_added"),
            sanitize_amount(&row.amount_withdrawn, line, "amount_withdrawn"),
        ));
    }

    tracing::debug!(count = entries.len(), "read ledger rows");
    Ok(entries)
}

// ============================================================================
// SANITIZING
// ============================================================================

/// Parse an amount cell; "1,250,000.50" is accepted, anything else unreadable is 0.
pub fn parse_amount(raw: &str) -> Option<Decimal> {
    let cleaned: String = raw.trim().chars().filter(|c| *c != ',').collect();
    if cleaned.is_empty() {
        return None;
    }
    Decimal::from_str(&cleaned).ok()
}

fn sanitize_amount(raw: &str, line: usize, field: &str) -> Decimal {
    match parse_amount(raw) {
        Some(amount) => amount,
        None => {
            tracing::warn!(line, field, value = raw, "non-numeric amount imported as 0");
            Decimal::ZERO
        }
    }
}

fn sanitize_reference_type(raw: &str, line: usize) -> ReferenceType {
    match ReferenceType::parse(raw) {
        Some(reference_type) => reference_type,
        None => {
            tracing::warn!(line, value = raw, "unknown reference type, using Online");
            ReferenceType::default()
        }
    }
}

// ✅ Data Quality Engine - flags entries the engine will silently recover from
//
// The balance engine never fails on bad numbers or dates: a zero rate yields a
// non-computable transfer, an unreadable date sinks an item to the bottom of
// the feed. This engine makes those recoveries visible.
//
// Critical: entry cannot be identified or labeled (the merger refuses it)
// Warning:  value is recovered with a fallback (zero rate, negative amount,
//           bad date, balance saturated at Decimal's range)
// Info:     value is usable but degraded (time ignored, short code too long)

use crate::activity::check_structure;
use crate::entities::EntryCategory;
use crate::formula::difference_fits;
use crate::rollup::rollup_trader;
use crate::snapshot::Snapshot;
use crate::temporal::{parse_date, parse_time_of_day};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Trader short codes are meant for compact badges.
pub const MAX_SHORT_NAME_LEN: usize = 10;

const OUT_OF_RANGE_HINT: &str = "Check the amounts for a misplaced digit";

// ============================================================================
// QUALITY REPORT
// ============================================================================

#[derive(Debug, Clone, Serialize)]
pub struct QualityReport {
    pub checked_entries: usize,
    pub issues: Vec<QualityIssue>,
}

impl QualityReport {
    pub fn summary(&self) -> String {
        format!(
            "Checked {} entries, Issues: {} ({} critical, {} warnings, {} info)",
            self.checked_entries,
            self.issues.len(),
            self.count(Severity::Critical),
            self.count(Severity::Warning),
            self.count(Severity::Info),
        )
    }

    pub fn count(&self, severity: Severity) -> usize {
        self.issues.iter().filter(|i| i.severity == severity).count()
    }

    pub fn has_critical_issues(&self) -> bool {
        self.issues
            .iter()
            .any(|i| i.severity == Severity::Critical)
    }

    pub fn is_clean(&self) -> bool {
        self.issues.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QualityIssue {
    pub severity: Severity,
    pub category: EntryCategory,
    pub entry_id: String,
    pub field: String,
    pub issue: String,
    pub recommendation: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Severity {
    Critical, // Entry cannot be identified or labeled
    Warning,  // Value replaced by a fallback during computation
    Info,     // Value usable but degraded
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Critical => "critical",
            Severity::Warning => "warning",
            Severity::Info => "info",
        }
    }
}

// ============================================================================
// DATA QUALITY ENGINE
// ============================================================================

pub struct DataQualityEngine {
    max_short_name_len: usize,
}

impl Default for DataQualityEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl DataQualityEngine {
    pub fn new() -> Self {
        DataQualityEngine {
            max_short_name_len: MAX_SHORT_NAME_LEN,
        }
    }

    pub fn check(&self, snapshot: &Snapshot) -> QualityReport {
        let mut issues = Vec::new();

        // Rule 1: identifying fields present
        for violation in check_structure(&snapshot.transfers, &snapshot.special, &snapshot.traders) {
            issues.push(QualityIssue {
                severity: Severity::Critical,
                category: violation.category,
                entry_id: violation.entry_id,
                field: violation.field.to_string(),
                issue: format!("Missing {} at {}", violation.field, violation.location),
                recommendation: "Fill in the field; the activity feed refuses this entry".to_string(),
            });
        }

        // Rules 2-5: foreign transfers
        for entry in &snapshot.transfers {
            let mut flag = |severity: Severity, field: &str, issue: String, recommendation: &str| {
                issues.push(issue_for(
                    severity,
                    EntryCategory::ForeignTransfer,
                    &entry.id,
                    field,
                    issue,
                    recommendation,
                ))
            };

            if entry.rate <= Decimal::ZERO {
                flag(
                    Severity::Warning,
                    "rate",
                    format!("Rate {} is not positive; balance shown as 0", entry.rate),
                    "Enter the exchange rate used for this transfer",
                );
            } else if !entry.balance().computable {
                flag(
                    Severity::Warning,
                    "balance",
                    "Converted amount is out of range; balance shown as 0".to_string(),
                    OUT_OF_RANGE_HINT,
                );
            }
            negative(&mut flag, "source_amount", entry.source_amount);
            negative(&mut flag, "submitted", entry.submitted);
            bad_date(&mut flag, &entry.date);

            if parse_time_of_day(&entry.time).is_none() {
                flag(
                    Severity::Info,
                    "time",
                    format!("Time '{}' could not be read; date alone is used", entry.time),
                    "Use HH:MM, optionally followed by AM/PM",
                );
            }
        }

        // Rules 3-4: special balances
        for entry in &snapshot.special {
            let mut flag = |severity: Severity, field: &str, issue: String, recommendation: &str| {
                issues.push(issue_for(
                    severity,
                    EntryCategory::SpecialBalance,
                    &entry.id,
                    field,
                    issue,
                    recommendation,
                ))
            };

            negative(&mut flag, "name_amount", entry.name_amount);
            negative(&mut flag, "submitted_amount", entry.submitted_amount);
            bad_date(&mut flag, &entry.date);

            if !difference_fits(entry.name_amount, entry.submitted_amount) {
                flag(
                    Severity::Warning,
                    "balance",
                    format!("Balance is out of range; shown as {}", entry.balance()),
                    OUT_OF_RANGE_HINT,
                );
            }
        }

        // Rules 3-4 and 6: traders and their ledgers
        for trader in &snapshot.traders {
            if trader.short_name.chars().count() > self.max_short_name_len {
                issues.push(issue_for(
                    Severity::Info,
                    EntryCategory::BankLedger,
                    &trader.id,
                    "short_name",
                    format!(
                        "Short code '{}' is longer than {} characters",
                        trader.short_name, self.max_short_name_len
                    ),
                    "Shorten the trader code",
                ));
            }

            for bank in &trader.banks {
                for entry in &bank.entries {
                    let mut flag = |severity: Severity, field: &str, issue: String, recommendation: &str| {
                        issues.push(issue_for(
                            severity,
                            EntryCategory::BankLedger,
                            &entry.id,
                            field,
                            issue,
                            recommendation,
                        ))
                    };

                    negative(&mut flag, "amount_added", entry.amount_added);
                    negative(&mut flag, "amount_withdrawn", entry.amount_withdrawn);
                    bad_date(&mut flag, &entry.date);
                }
            }

            // Rule 7: totals that saturated
            let summary = rollup_trader(trader);
            for bank in summary.banks.iter().filter(|bank| bank.overflowed) {
                issues.push(issue_for(
                    Severity::Warning,
                    EntryCategory::BankLedger,
                    &bank.bank_id,
                    "total_balance",
                    format!(
                        "{} - {} balance is out of range; shown as {}",
                        trader.name, bank.bank_name, bank.total_balance
                    ),
                    OUT_OF_RANGE_HINT,
                ));
            }
            if summary.overflowed && !summary.banks.iter().any(|bank| bank.overflowed) {
                issues.push(issue_for(
                    Severity::Warning,
                    EntryCategory::BankLedger,
                    &trader.id,
                    "total_balance",
                    format!(
                        "{} total is out of range; shown as {}",
                        trader.name, summary.total_balance
                    ),
                    OUT_OF_RANGE_HINT,
                ));
            }
        }

        let report = QualityReport {
            checked_entries: entry_count(snapshot),
            issues,
        };

        if !report.is_clean() {
            tracing::warn!(summary = %report.summary(), "data quality issues found");
        }

        report
    }
}

fn entry_count(snapshot: &Snapshot) -> usize {
    snapshot.transfers.len()
        + snapshot.special.len()
        + snapshot.traders.iter().map(|t| t.entry_count()).sum::<usize>()
}

fn issue_for(
    severity: Severity,
    category: EntryCategory,
    entry_id: &str,
    field: &str,
    issue: String,
    recommendation: &str,
) -> QualityIssue {
    QualityIssue {
        severity,
        category,
        entry_id: entry_id.to_string(),
        field: field.to_string(),
        issue,
        recommendation: recommendation.to_string(),
    }
}

fn negative<F>(flag: &mut F, field: &str, amount: Decimal)
where
    F: FnMut(Severity, &str, String, &str),
{
    if amount < Decimal::ZERO {
        flag(
            Severity::Warning,
            field,
            format!("Negative amount {}", amount),
            "Amounts are entered as positive values",
        );
    }
}

fn bad_date<F>(flag: &mut F, date: &str)
where
    F: FnMut(Severity, &str, String, &str),
{
    if parse_date(date).is_none() {
        flag(
            Severity::Warning,
            "date",
            format!("Date '{}' could not be read; entry sorts as oldest", date),
            "Fix date format to YYYY-MM-DD or MM/DD/YYYY",
        );
    }
}

// ============================================================================
// TESTS
// ============================================================================

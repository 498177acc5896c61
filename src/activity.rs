// 📰 Activity Merger - one recent-activity feed across all categories
//
// Each category is mapped to the same ActivityItem shape:
//   transfer  → debit when something was submitted, amount = -submitted (target currency)
//   special   → credit when balance >= 0, amount = balance
//   ledger    → credit when delta >= 0, amount = delta, "Deposit"/"Withdrawal"
//
// Items are concatenated (transfers, special, ledger), stably sorted newest
// first and capped. An entry with an unreadable date takes the sentinel
// timestamp and sinks to the bottom instead of failing the merge.

use crate::entities::{
    EntryCategory, EntryLocation, ForeignTransferEntry, LedgerEntry, SpecialBalanceEntry, Trader,
};
use crate::error::{EngineError, EngineResult};
use crate::formula;
use crate::temporal::{TimestampResolver, TimestampSource};
use chrono::{DateTime, Local, TimeZone, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Feed size shown on the dashboard when no limit is configured.
pub const DEFAULT_ACTIVITY_LIMIT: usize = 4;
pub const DEFAULT_SOURCE_CURRENCY: &str = "PKR";
pub const DEFAULT_TARGET_CURRENCY: &str = "SAR";

// ============================================================================
// ACTIVITY ITEM
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityKind {
    Credit,
    Debit,
}

impl ActivityKind {
    fn from_signed(amount: Decimal) -> Self {
        if amount >= Decimal::ZERO {
            ActivityKind::Credit
        } else {
            ActivityKind::Debit
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ActivityKind::Credit => "credit",
            ActivityKind::Debit => "debit",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityItem {
    pub kind: ActivityKind,
    pub category: EntryCategory,
    pub entry_id: String,
    pub label: String,

    /// Signed amount shown for the item
    pub amount: Decimal,
    pub currency: String,

    pub timestamp: DateTime<Utc>,
    pub timestamp_source: TimestampSource,
}

impl ActivityItem {
    /// e.g. "+150,000.00 PKR", "-6,000.00 SAR"
    pub fn display_amount(&self) -> String {
        format!("{} {}", formula::format_signed(self.amount), self.currency)
    }

    pub fn relative_time(&self, now: DateTime<Utc>) -> String {
        if self.timestamp_source == TimestampSource::Sentinel {
            return "Unknown time".to_string();
        }
        relative_time(self.timestamp, now)
    }
}

/// "Just now", "N minute(s) ago", "N hour(s) ago", "N day(s) ago".
///
/// Timestamps in the future read as "Just now".
pub fn relative_time(timestamp: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let seconds = (now - timestamp).num_seconds();

    if seconds < 60 {
        return "Just now".to_string();
    }
    if seconds < 3_600 {
        return ago(seconds / 60, "minute");
    }
    if seconds < 86_400 {
        return ago(seconds / 3_600, "hour");
    }
    ago(seconds / 86_400, "day")
}

fn ago(count: i64, unit: &str) -> String {
    if count == 1 {
        format!("{} {} ago", count, unit)
    } else {
        format!("{} {}s ago", count, unit)
    }
}

// ============================================================================
// STRUCTURAL CHECKS
// ============================================================================

/// An entry missing a field the feed needs to identify or label it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StructuralViolation {
    pub category: EntryCategory,
    pub location: EntryLocation,
    pub entry_id: String,
    pub field: &'static str,
}

impl From<StructuralViolation> for EngineError {
    fn from(violation: StructuralViolation) -> Self {
        EngineError::InvalidEntry {
            category: violation.category,
            location: violation.location,
            field: violation.field,
        }
    }
}

fn blank(value: &str) -> bool {
    value.trim().is_empty()
}

/// Every missing identifying field across the three sources.
pub fn check_structure(
    transfers: &[ForeignTransferEntry],
    special: &[SpecialBalanceEntry],
    traders: &[Trader],
) -> Vec<StructuralViolation> {
    let mut violations = Vec::new();
    let mut flag = |category, location, entry_id: &str, field| {
        violations.push(StructuralViolation {
            category,
            location,
            entry_id: entry_id.to_string(),
            field,
        })
    };

    for (index, entry) in transfers.iter().enumerate() {
        let at = EntryLocation::Entry { index };
        if blank(&entry.id) {
            flag(EntryCategory::ForeignTransfer, at, &entry.id, "id");
        }
        if blank(&entry.ref_no) {
            flag(EntryCategory::ForeignTransfer, at, &entry.id, "reference code");
        }
    }

    for (index, entry) in special.iter().enumerate() {
        let at = EntryLocation::Entry { index };
        if blank(&entry.id) {
            flag(EntryCategory::SpecialBalance, at, &entry.id, "id");
        }
        if blank(&entry.user_name) {
            flag(EntryCategory::SpecialBalance, at, &entry.id, "user name");
        }
    }

    for (trader_index, trader) in traders.iter().enumerate() {
        let at = EntryLocation::Trader {
            trader: trader_index,
        };
        if blank(&trader.id) {
            flag(EntryCategory::BankLedger, at, &trader.id, "trader id");
        }
        if blank(&trader.name) {
            flag(EntryCategory::BankLedger, at, &trader.id, "trader name");
        }
        for (bank_index, bank) in trader.banks.iter().enumerate() {
            let at = EntryLocation::Bank {
                trader: trader_index,
                bank: bank_index,
            };
            if blank(&bank.id) {
                flag(EntryCategory::BankLedger, at, &bank.id, "bank id");
            }
            if blank(&bank.name) {
                flag(EntryCategory::BankLedger, at, &bank.id, "bank name");
            }
            for (index, entry) in bank.entries.iter().enumerate() {
                if blank(&entry.id) {
                    let at = EntryLocation::Ledger {
                        trader: trader_index,
                        bank: bank_index,
                        entry: index,
                    };
                    flag(EntryCategory::BankLedger, at, &entry.id, "id");
                }
            }
        }
    }

    violations
}

// ============================================================================
// MERGER
// ============================================================================

#[derive(Debug, Clone)]
pub struct ActivityMerger<Tz: TimeZone> {
    resolver: TimestampResolver<Tz>,
    source_currency: String,
    target_currency: String,
}

impl ActivityMerger<Local> {
    pub fn local() -> Self {
        Self::new(TimestampResolver::local())
    }
}

impl<Tz: TimeZone> ActivityMerger<Tz> {
    pub fn new(resolver: TimestampResolver<Tz>) -> Self {
        ActivityMerger {
            resolver,
            source_currency: DEFAULT_SOURCE_CURRENCY.to_string(),
            target_currency: DEFAULT_TARGET_CURRENCY.to_string(),
        }
    }

    /// Currency labels: `source` for special/ledger amounts, `target` for transfers.
    pub fn with_currencies(mut self, source: &str, target: &str) -> Self {
        self.source_currency = source.to_string();
        self.target_currency = target.to_string();
        self
    }

    /// Newest-first feed of at most `limit` items.
    ///
    /// Fails only when an entry is structurally invalid; nothing is emitted then.
    pub fn merge(
        &self,
        transfers: &[ForeignTransferEntry],
        special: &[SpecialBalanceEntry],
        traders: &[Trader],
        limit: usize,
    ) -> EngineResult<Vec<ActivityItem>> {
        if let Some(violation) = check_structure(transfers, special, traders).into_iter().next() {
            tracing::warn!(
                category = %violation.category,
                location = %violation.location,
                field = violation.field,
                "refusing to merge activity with an invalid entry"
            );
            return Err(violation.into());
        }

        let mut items: Vec<ActivityItem> = Vec::new();
        items.extend(transfers.iter().map(|entry| self.transfer_item(entry)));
        items.extend(special.iter().map(|entry| self.special_item(entry)));
        for trader in traders {
            for bank in &trader.banks {
                items.extend(
                    bank.entries
                        .iter()
                        .map(|entry| self.ledger_item(&trader.name, &bank.name, entry)),
                );
            }
        }

        let total = items.len();
        // Stable: equal timestamps keep concatenation order
        items.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        items.truncate(limit);

        tracing::debug!(total, kept = items.len(), limit, "merged activity feed");

        Ok(items)
    }

    fn transfer_item(&self, entry: &ForeignTransferEntry) -> ActivityItem {
        let resolved = self.resolver.resolve(entry);
        let kind = if entry.submitted > Decimal::ZERO {
            ActivityKind::Debit
        } else {
            ActivityKind::Credit
        };

        ActivityItem {
            kind,
            category: EntryCategory::ForeignTransfer,
            entry_id: entry.id.clone(),
            label: format!("Transfer - {}", entry.ref_no),
            amount: -entry.submitted,
            currency: self.target_currency.clone(),
            timestamp: resolved.at,
            timestamp_source: resolved.source,
        }
    }

    fn special_item(&self, entry: &SpecialBalanceEntry) -> ActivityItem {
        let resolved = self.resolver.resolve(entry);
        let balance = entry.balance();

        ActivityItem {
            kind: ActivityKind::from_signed(balance),
            category: EntryCategory::SpecialBalance,
            entry_id: entry.id.clone(),
            label: format!("{} - {}", entry.user_name, entry.balance_type),
            amount: balance,
            currency: self.source_currency.clone(),
            timestamp: resolved.at,
            timestamp_source: resolved.source,
        }
    }

    fn ledger_item(&self, trader_name: &str, bank_name: &str, entry: &LedgerEntry) -> ActivityItem {
        let resolved = self.resolver.resolve(entry);
        let delta = entry.delta();
        let movement = if entry.is_deposit() {
            "Deposit"
        } else {
            "Withdrawal"
        };

        ActivityItem {
            kind: ActivityKind::from_signed(delta),
            category: EntryCategory::BankLedger,
            entry_id: entry.id.clone(),
            label: format!("{} - {} {}", trader_name, bank_name, movement),
            amount: delta,
            currency: self.source_currency.clone(),
            timestamp: resolved.at,
            timestamp_source: resolved.source,
        }
    }
}

/// Merge with the local time zone and default currency labels.
pub fn merge_activity(
    transfers: &[ForeignTransferEntry],
    special: &[SpecialBalanceEntry],
    traders: &[Trader],
    limit: usize,
) -> EngineResult<Vec<ActivityItem>> {
    ActivityMerger::local().merge(transfers, special, traders, limit)
}

// ============================================================================
// TESTS
// ============================================================================

// ⚖️ Running Balance Accumulator
//
// For one bank account:
//   running_balance[i] = running_balance[i-1] + (added[i] - withdrawn[i])
//   running_balance[-1] = 0
//   total = last running balance (0 when empty)
//
// Entries are ordered oldest first by calendar date. Entries sharing a date
// keep the order they were supplied in (stable sort), so the same input
// always produces the same running-balance sequence.
//
// Sums that leave Decimal's range saturate and set `overflowed`.

use crate::entities::LedgerEntry;
use crate::formula;
use crate::temporal::parse_date;
use rust_decimal::Decimal;
use serde::Serialize;

/// One ledger entry annotated with the balance after it was applied.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BalancedEntry<'a> {
    pub entry: &'a LedgerEntry,
    pub delta: Decimal,
    pub running_balance: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunningBalances<'a> {
    pub rows: Vec<BalancedEntry<'a>>,
    pub total_balance: Decimal,

    /// A delta or running balance saturated at Decimal's range
    pub overflowed: bool,
}

impl<'a> RunningBalances<'a> {
    pub fn entry_count(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Sort a bank account's entries oldest first and fold their deltas.
///
/// Undated entries (date unreadable) sort ahead of every dated entry.
pub fn compute_running_balances(entries: &[LedgerEntry]) -> RunningBalances<'_> {
    let mut ordered: Vec<&LedgerEntry> = entries.iter().collect();
    // Option<NaiveDate> orders None first
    ordered.sort_by_key(|entry| parse_date(&entry.date));

    let mut running_balance = Decimal::ZERO;
    let mut overflowed = false;
    let rows: Vec<BalancedEntry<'_>> = ordered
        .into_iter()
        .map(|entry| {
            let delta = entry.delta();
            if !formula::difference_fits(entry.amount_added, entry.amount_withdrawn) {
                overflowed = true;
            }
            running_balance = match running_balance.checked_add(delta) {
                Some(sum) => sum,
                None => {
                    overflowed = true;
                    running_balance.saturating_add(delta)
                }
            };
            BalancedEntry {
                entry,
                delta,
                running_balance,
            }
        })
        .collect();

    tracing::debug!(
        entries = rows.len(),
        total = %running_balance,
        overflowed,
        "computed running balances"
    );

    RunningBalances {
        rows,
        total_balance: running_balance,
        overflowed,
    }
}

// ============================================================================
// TESTS
// ============================================================================

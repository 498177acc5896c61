// Entity Models
//
// Three account categories, each a plain snapshot of what the store holds:
// - Foreign transfers (source currency converted at a per-entry rate)
// - Special balances (ad-hoc per-user balances)
// - Traders → bank accounts → ledger entries (strict parent-owns-child tree)
//
// Balances are never stored on these types; they are projected on read.

use serde::{Deserialize, Serialize};
use std::fmt;

pub mod special;
pub mod trader;
pub mod transfer;

pub use special::SpecialBalanceEntry;
pub use trader::{generate_bank_code, BankAccount, LedgerEntry, Trader, DEFAULT_TRADER_COLOR};
pub use transfer::ForeignTransferEntry;

// ============================================================================
// ENTRY CATEGORY
// ============================================================================

/// The three entry streams that feed balances and the activity feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryCategory {
    ForeignTransfer,
    SpecialBalance,
    BankLedger,
}

impl EntryCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntryCategory::ForeignTransfer => "foreign transfer",
            EntryCategory::SpecialBalance => "special balance",
            EntryCategory::BankLedger => "bank ledger",
        }
    }
}

impl fmt::Display for EntryCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// ENTRY LOCATION
// ============================================================================

/// Position of an entry in the batch handed to the engine.
///
/// Flat categories use a single index; the trader tree carries every level
/// so a nested ledger entry can be found again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryLocation {
    Entry { index: usize },
    Trader { trader: usize },
    Bank { trader: usize, bank: usize },
    Ledger { trader: usize, bank: usize, entry: usize },
}

impl fmt::Display for EntryLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntryLocation::Entry { index } => write!(f, "index {}", index),
            EntryLocation::Trader { trader } => write!(f, "trader {}", trader),
            EntryLocation::Bank { trader, bank } => write!(f, "trader {} / bank {}", trader, bank),
            EntryLocation::Ledger { trader, bank, entry } => {
                write!(f, "trader {} / bank {} / entry {}", trader, bank, entry)
            }
        }
    }
}

// ============================================================================
// REFERENCE TYPE
// ============================================================================

/// How money moved: online transfer or cash.
///
/// Used both as the balance type of special entries and as the reference
/// type of bank ledger entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ReferenceType {
    #[default]
    Online,
    Cash,
}

impl ReferenceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReferenceType::Online => "Online",
            ReferenceType::Cash => "Cash",
        }
    }

    /// Lenient parse used by importers and the store ("cash", "CASH", ...).
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "online" => Some(ReferenceType::Online),
            "cash" => Some(ReferenceType::Cash),
            _ => None,
        }
    }
}

impl fmt::Display for ReferenceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

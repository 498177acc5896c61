// 🏦 Trader → Bank Account → Ledger Entry
//
// Ownership is strictly top-down:
// - A Trader exclusively owns its bank accounts (deleting a trader cascades)
// - A BankAccount exclusively owns its ledger entries
//
// No back-pointers: rollups are computed bottom-up on demand.

use super::ReferenceType;
use crate::formula;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Display color token used when a trader is created without one.
pub const DEFAULT_TRADER_COLOR: &str = "from-blue-500 to-blue-600";

// ============================================================================
// LEDGER ENTRY
// ============================================================================

/// A dated record of funds added to / withdrawn from one bank account.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub id: String,
    pub date: String,
    pub reference_type: ReferenceType,
    pub amount_added: Decimal,
    pub amount_withdrawn: Decimal,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
}

impl LedgerEntry {
    pub fn new(
        date: &str,
        reference_type: ReferenceType,
        amount_added: Decimal,
        amount_withdrawn: Decimal,
    ) -> Self {
        LedgerEntry {
            id: uuid::Uuid::new_v4().to_string(),
            date: date.to_string(),
            reference_type,
            amount_added,
            amount_withdrawn,
            created_at: None,
        }
    }

    /// Net movement of this entry (never stored)
    pub fn delta(&self) -> Decimal {
        formula::ledger_delta(self.amount_added, self.amount_withdrawn)
    }

    /// Deposits include zero-net entries, matching the feed's credit rule
    pub fn is_deposit(&self) -> bool {
        self.delta() >= Decimal::ZERO
    }
}

// ============================================================================
// BANK ACCOUNT
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BankAccount {
    pub id: String,
    pub name: String,

    /// Short code, e.g. "HBL", "MZN"
    pub code: String,

    /// Entries in the order the store supplied them
    #[serde(default)]
    pub entries: Vec<LedgerEntry>,
}

impl BankAccount {
    /// Create a bank account; the code is derived from the name when absent.
    pub fn new(name: &str, code: Option<&str>) -> Self {
        let name = name.trim().to_string();
        let code = match code.map(str::trim) {
            Some(code) if !code.is_empty() => code.to_uppercase(),
            _ => generate_bank_code(&name),
        };

        BankAccount {
            id: uuid::Uuid::new_v4().to_string(),
            name,
            code,
            entries: Vec::new(),
        }
    }

    pub fn entry_count(&self) -> usize {
        self.entries.len()
    }
}

/// Bank code from a bank name: upper-case alphanumerics, first four.
///
/// Example: "Bank Alfalah" → "BANK", "HBL" → "HBL"
pub fn generate_bank_code(bank_name: &str) -> String {
    bank_name
        .trim()
        .to_uppercase()
        .chars()
        .filter(|c| c.is_ascii_uppercase() || c.is_ascii_digit())
        .take(4)
        .collect()
}

// ============================================================================
// TRADER
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trader {
    pub id: String,
    pub name: String,

    /// Short code shown on cards, at most 10 chars by convention
    pub short_name: String,

    /// Display color token (opaque to the engine)
    pub color: String,

    #[serde(default)]
    pub banks: Vec<BankAccount>,
}

impl Trader {
    pub fn new(name: &str, short_name: &str, color: Option<&str>) -> Self {
        Trader {
            id: uuid::Uuid::new_v4().to_string(),
            name: name.trim().to_string(),
            short_name: short_name.trim().to_uppercase(),
            color: color.unwrap_or(DEFAULT_TRADER_COLOR).to_string(),
            banks: Vec::new(),
        }
    }

    pub fn bank(&self, bank_id: &str) -> Option<&BankAccount> {
        self.banks.iter().find(|b| b.id == bank_id)
    }

    pub fn entry_count(&self) -> usize {
        self.banks.iter().map(BankAccount::entry_count).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_generate_bank_code() {
        assert_eq!(generate_bank_code("HBL"), "HBL");
        assert_eq!(generate_bank_code("Bank Alfalah"), "BANK");
        assert_eq!(generate_bank_code("  meezan "), "MEEZ");
        assert_eq!(generate_bank_code("J&K-1"), "JK1");
        assert_eq!(generate_bank_code("---"), "");
    }

    #[test]
    fn test_bank_account_code_defaults_to_generated() {
        let generated = BankAccount::new("JazzCash", None);
        assert_eq!(generated.code, "JAZZ");

        let explicit = BankAccount::new("JazzCash", Some("jzc"));
        assert_eq!(explicit.code, "JZC");

        let blank = BankAccount::new("Easypaisa", Some("  "));
        assert_eq!(blank.code, "EASY");
    }

    #[test]
    fn test_trader_new_normalizes_fields() {
        let trader = Trader::new(" Sulman Traders ", "st", None);
        assert_eq!(trader.name, "Sulman Traders");
        assert_eq!(trader.short_name, "ST");
        assert_eq!(trader.color, DEFAULT_TRADER_COLOR);
        assert!(trader.banks.is_empty());
    }

    #[test]
    fn test_ledger_entry_delta() {
        let withdrawal = LedgerEntry::new("2024-12-18", ReferenceType::Online, dec!(0), dec!(100000));
        assert_eq!(withdrawal.delta(), dec!(-100000));
        assert!(!withdrawal.is_deposit());

        let flat = LedgerEntry::new("2024-12-18", ReferenceType::Cash, dec!(0), dec!(0));
        assert_eq!(flat.delta(), Decimal::ZERO);
        assert!(flat.is_deposit());
    }

    #[test]
    fn test_trader_lookup_and_counts() {
        let mut trader = Trader::new("Kashif Traders", "KT", Some("from-purple-500 to-purple-600"));
        let mut hbl = BankAccount::new("HBL", None);
        hbl.entries.push(LedgerEntry::new("2024-12-20", ReferenceType::Online, dec!(280000), dec!(100000)));
        let hbl_id = hbl.id.clone();
        trader.banks.push(hbl);
        trader.banks.push(BankAccount::new("JazzCash", Some("JZC")));

        assert_eq!(trader.entry_count(), 1);
        assert_eq!(trader.bank(&hbl_id).map(|b| b.name.as_str()), Some("HBL"));
        assert!(trader.bank("missing").is_none());
    }
}

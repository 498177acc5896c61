// 📊 Trader Rollup - bank totals → trader total
//
// trader_total = Σ bank.total_balance
//
// Unlike the running-balance fold, rollup order never matters: a trader with
// banks listed in any order has the same total. Banks with no entries count
// as zero. A total past Decimal's range saturates and marks the summary
// as overflowed.

use crate::entities::{BankAccount, Trader};
use crate::running_balance::compute_running_balances;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BankTotal {
    pub bank_id: String,
    pub bank_name: String,
    pub code: String,
    pub entry_count: usize,
    pub total_balance: Decimal,
    pub overflowed: bool,
}

impl BankTotal {
    pub fn from_account(bank: &BankAccount) -> Self {
        let balances = compute_running_balances(&bank.entries);
        BankTotal {
            bank_id: bank.id.clone(),
            bank_name: bank.name.clone(),
            code: bank.code.clone(),
            entry_count: balances.entry_count(),
            total_balance: balances.total_balance,
            overflowed: balances.overflowed,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraderSummary {
    pub trader_id: String,
    pub name: String,
    pub short_name: String,
    pub color: String,
    pub bank_account_count: usize,
    pub entry_count: usize,
    pub total_balance: Decimal,

    /// A bank total or the trader total saturated at Decimal's range
    pub overflowed: bool,
    pub banks: Vec<BankTotal>,
}

impl TraderSummary {
    pub fn is_positive(&self) -> bool {
        self.total_balance >= Decimal::ZERO
    }

    /// "1 Bank Account" / "3 Bank Accounts"
    pub fn bank_account_label(&self) -> String {
        let noun = if self.bank_account_count == 1 {
            "Account"
        } else {
            "Accounts"
        };
        format!("{} Bank {}", self.bank_account_count, noun)
    }
}

/// Sum of bank totals; zero for no banks. Saturates instead of overflowing.
pub fn compute_trader_total(bank_totals: &[BankTotal]) -> Decimal {
    bank_totals
        .iter()
        .fold(Decimal::ZERO, |total, bank| total.saturating_add(bank.total_balance))
}

fn trader_total_fits(bank_totals: &[BankTotal]) -> bool {
    bank_totals
        .iter()
        .try_fold(Decimal::ZERO, |total, bank| total.checked_add(bank.total_balance))
        .is_some()
}

pub fn rollup_trader(trader: &Trader) -> TraderSummary {
    let banks: Vec<BankTotal> = trader.banks.iter().map(BankTotal::from_account).collect();
    let total_balance = compute_trader_total(&banks);
    let entry_count = banks.iter().map(|bank| bank.entry_count).sum();
    let overflowed = banks.iter().any(|bank| bank.overflowed) || !trader_total_fits(&banks);

    tracing::debug!(
        trader = %trader.id,
        banks = banks.len(),
        total = %total_balance,
        "rolled up trader"
    );

    TraderSummary {
        trader_id: trader.id.clone(),
        name: trader.name.clone(),
        short_name: trader.short_name.clone(),
        color: trader.color.clone(),
        bank_account_count: banks.len(),
        entry_count,
        total_balance,
        overflowed,
        banks,
    }
}

pub fn rollup_all(traders: &[Trader]) -> Vec<TraderSummary> {
    traders.iter().map(rollup_trader).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::{LedgerEntry, ReferenceType};
    use rust_decimal_macros::dec;

    fn bank(name: &str, entries: &[(&str, Decimal, Decimal)]) -> BankAccount {
        let mut account = BankAccount::new(name, None);
        for (date, added, withdrawn) in entries {
            account
                .entries
                .push(LedgerEntry::new(date, ReferenceType::Online, *added, *withdrawn));
        }
        account
    }

    fn sulman() -> Trader {
        let mut trader = Trader::new("Sulman Traders", "ST", None);
        trader.banks.push(bank(
            "HBL",
            &[
                ("2024-12-20", dec!(500000), dec!(200000)),
                ("2024-12-19", dec!(300000), dec!(150000)),
                ("2024-12-18", dec!(0), dec!(100000)),
            ],
        ));
        trader.banks.push(bank(
            "UBL",
            &[
                ("2024-12-20", dec!(400000), dec!(180000)),
                ("2024-12-19", dec!(250000), dec!(300000)),
            ],
        ));
        trader
            .banks
            .push(bank("Meezan", &[("2024-12-20", dec!(600000), dec!(400000))]));
        trader
    }

    #[test]
    fn test_rollup_trader() {
        let summary = rollup_trader(&sulman());

        assert_eq!(summary.bank_account_count, 3);
        assert_eq!(summary.entry_count, 6);
        assert_eq!(summary.banks[0].total_balance, dec!(350000));
        assert_eq!(summary.banks[1].total_balance, dec!(170000));
        assert_eq!(summary.banks[2].total_balance, dec!(200000));
        assert_eq!(summary.total_balance, dec!(720000));
        assert_eq!(summary.bank_account_label(), "3 Bank Accounts");
        assert!(summary.is_positive());
        assert!(!summary.overflowed);

        println!("✅ Trader rollup: {} = {}", summary.name, summary.total_balance);
    }

    #[test]
    fn test_rollup_is_order_independent() {
        let summary = rollup_trader(&sulman());

        let mut reversed = summary.banks.clone();
        reversed.reverse();
        let mut rotated = summary.banks.clone();
        rotated.rotate_left(1);

        assert_eq!(compute_trader_total(&reversed), summary.total_balance);
        assert_eq!(compute_trader_total(&rotated), summary.total_balance);
    }

    #[test]
    fn test_empty_banks_count_as_zero() {
        let mut trader = Trader::new("Abid Traders", "AT", None);
        trader.banks.push(BankAccount::new("UBL", None));
        trader
            .banks
            .push(bank("Allied Bank", &[("2024-12-20", dec!(0), dec!(45000))]));

        let summary = rollup_trader(&trader);
        assert_eq!(summary.banks[0].entry_count, 0);
        assert_eq!(summary.banks[0].total_balance, Decimal::ZERO);
        assert_eq!(summary.total_balance, dec!(-45000));
        assert!(!summary.is_positive());
    }

    #[test]
    fn test_trader_without_banks() {
        let trader = Trader::new("Noor Traders", "NT", None);
        let summary = rollup_trader(&trader);

        assert_eq!(summary.total_balance, Decimal::ZERO);
        assert_eq!(summary.bank_account_count, 0);
        assert_eq!(compute_trader_total(&[]), Decimal::ZERO);
        assert_eq!(summary.bank_account_label(), "0 Bank Accounts");
    }

    #[test]
    fn test_overflowing_trader_total_saturates() {
        let huge = Decimal::from_i128_with_scale(50_000_000_000_000_000_000_000_000_000, 0);
        let mut trader = Trader::new("Sulman Traders", "ST", None);
        trader.banks.push(bank("HBL", &[("2024-12-20", huge, dec!(0))]));
        trader.banks.push(bank("UBL", &[("2024-12-20", huge, dec!(0))]));

        let summary = rollup_trader(&trader);

        assert!(!summary.banks[0].overflowed);
        assert!(summary.overflowed);
        assert_eq!(summary.total_balance, Decimal::MAX);
    }

    #[test]
    fn test_rollup_all() {
        let traders = vec![sulman(), Trader::new("Yousuf Traders", "YT", None)];
        let summaries = rollup_all(&traders);

        assert_eq!(summaries.len(), 2);
        assert_eq!(summaries[1].bank_account_label(), "0 Bank Accounts");
    }
}

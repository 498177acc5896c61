// ⭐ Special Balance Entry - ad-hoc per-user balances

use super::ReferenceType;
use crate::formula;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpecialBalanceEntry {
    pub id: String,
    pub user_name: String,
    pub date: String,
    pub balance_type: ReferenceType,

    /// Amount owed "in the name of" the user
    pub name_amount: Decimal,

    /// Amount the user has submitted against it
    pub submitted_amount: Decimal,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
}

impl SpecialBalanceEntry {
    pub fn new(
        user_name: &str,
        date: &str,
        balance_type: ReferenceType,
        name_amount: Decimal,
        submitted_amount: Decimal,
    ) -> Self {
        SpecialBalanceEntry {
            id: uuid::Uuid::new_v4().to_string(),
            user_name: user_name.trim().to_string(),
            date: date.to_string(),
            balance_type,
            name_amount,
            submitted_amount,
            created_at: None,
        }
    }

    pub fn balance(&self) -> Decimal {
        formula::special_balance(self.name_amount, self.submitted_amount)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_special_entry_balance() {
        let entry = SpecialBalanceEntry::new(
            "Zainab Malik",
            "2024-12-16",
            ReferenceType::Online,
            dec!(95000),
            dec!(110000),
        );

        assert_eq!(entry.balance(), dec!(-15000));
        assert_eq!(entry.user_name, "Zainab Malik");
    }
}

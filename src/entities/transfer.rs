// 🌍 Foreign Transfer Entry
//
// Source-currency amount converted at a per-entry rate into the target
// currency, minus what has already been submitted in the target currency.

use crate::formula::{self, TransferBalance};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForeignTransferEntry {
    pub id: String,

    /// Calendar date (date only), e.g. "2024-12-20"
    pub date: String,

    /// Wall-clock time of day as entered, e.g. "09:30 AM"
    pub time: String,

    /// Reference code, unique per entry by convention only
    pub ref_no: String,

    /// Amount in the source currency
    pub source_amount: Decimal,

    /// Source units per one target unit
    pub rate: Decimal,

    /// Amount already submitted in the target currency
    pub submitted: Decimal,

    /// Free-text secondary reference
    #[serde(default)]
    pub reference2: String,

    /// Creation instant set by the store
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
}

impl ForeignTransferEntry {
    pub fn new(
        date: &str,
        time: &str,
        ref_no: &str,
        source_amount: Decimal,
        rate: Decimal,
        submitted: Decimal,
    ) -> Self {
        ForeignTransferEntry {
            id: uuid::Uuid::new_v4().to_string(),
            date: date.to_string(),
            time: time.to_string(),
            ref_no: ref_no.trim().to_uppercase(),
            source_amount,
            rate,
            submitted,
            reference2: String::new(),
            created_at: None,
        }
    }

    pub fn with_reference2(mut self, reference2: &str) -> Self {
        self.reference2 = reference2.to_string();
        self
    }

    /// Target amount and outstanding balance for this entry.
    pub fn balance(&self) -> TransferBalance {
        formula::foreign_transfer(self.source_amount, self.rate, self.submitted)
    }
}

// 🧮 Balance Formulas - one pure function per entry category
//
//   foreign transfer:  source_amount / rate - submitted
//   special balance:   name_amount - submitted_amount
//   bank ledger:       amount_added - amount_withdrawn
//
// Full Decimal precision is kept through the division; rounding to two
// fractional digits only happens in the presentation helpers below.
// Subtractions saturate at Decimal's range instead of panicking; callers
// that need to know use `difference_fits`.

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

// ============================================================================
// FORMULAS
// ============================================================================

/// Outcome of the foreign-transfer formula.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferBalance {
    /// Source amount converted into the target currency
    pub target_amount: Decimal,

    /// Target amount still outstanding after submissions
    pub balance: Decimal,

    /// False when the rate was zero or negative; both amounts are then zero
    pub computable: bool,
}

impl TransferBalance {
    fn non_computable() -> Self {
        TransferBalance {
            target_amount: Decimal::ZERO,
            balance: Decimal::ZERO,
            computable: false,
        }
    }
}

/// `source_amount / rate - submitted`, or a flagged zero when `rate <= 0`.
///
/// Never fails: the caller decides how to surface a non-computable entry.
pub fn foreign_transfer(source_amount: Decimal, rate: Decimal, submitted: Decimal) -> TransferBalance {
    if rate <= Decimal::ZERO {
        return TransferBalance::non_computable();
    }

    // Quotient or difference outside Decimal's range
    let Some(target_amount) = source_amount.checked_div(rate) else {
        return TransferBalance::non_computable();
    };
    match target_amount.checked_sub(submitted) {
        Some(balance) => TransferBalance {
            target_amount,
            balance,
            computable: true,
        },
        None => TransferBalance::non_computable(),
    }
}

/// Balance only; see [`foreign_transfer`] for the computability flag.
pub fn foreign_transfer_balance(source_amount: Decimal, rate: Decimal, submitted: Decimal) -> Decimal {
    foreign_transfer(source_amount, rate, submitted).balance
}

pub fn special_balance(name_amount: Decimal, submitted_amount: Decimal) -> Decimal {
    name_amount.saturating_sub(submitted_amount)
}

pub fn ledger_delta(amount_added: Decimal, amount_withdrawn: Decimal) -> Decimal {
    amount_added.saturating_sub(amount_withdrawn)
}

/// False when `minuend - subtrahend` had to saturate.
pub fn difference_fits(minuend: Decimal, subtrahend: Decimal) -> bool {
    minuend.checked_sub(subtrahend).is_some()
}

// ============================================================================
// PRESENTATION
// ============================================================================

/// Two fractional digits with `,` thousands grouping: `6622.5165` → `"6,622.52"`.
///
/// Negative values keep their minus sign.
pub fn format_amount(amount: Decimal) -> String {
    let rounded = round_for_display(amount);
    let negative = rounded.is_sign_negative() && !rounded.is_zero();
    let text = format!("{:.2}", rounded.abs());

    let (whole, fraction) = match text.split_once('.') {
        Some((whole, fraction)) => (whole, fraction),
        None => (text.as_str(), "00"),
    };

    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (i, digit) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }

    format!("{}{}.{}", if negative { "-" } else { "" }, grouped, fraction)
}

fn round_for_display(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Like [`format_amount`] but positive values get an explicit `+`.
pub fn format_signed(amount: Decimal) -> String {
    let formatted = format_amount(amount);
    if round_for_display(amount) > Decimal::ZERO {
        format!("+{}", formatted)
    } else {
        formatted
    }
}

// ============================================================================
// TESTS
// ============================================================================

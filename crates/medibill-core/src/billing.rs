//! # Billing Math
//!
//! Pure computation of bill totals and the daily bill number format.
//!
//! ## Totals
//! ```text
//! line.subtotal        = quantity × cost_per_piece
//! medicines_subtotal   = Σ line.subtotal
//! prescription_charge  = fixed fee iff has_prescription, else 0
//! grand_total          = medicines_subtotal + prescription_charge
//! ```
//!
//! ## Bill Numbers
//! `{YYYYMMDD}-{NNNN}` - a per-day sequence padded to 4 digits, e.g.
//! `20260829-0007`. The sequence is a display convenience: gaps are
//! acceptable, repeats never are. Allocation (count + retry) lives in
//! medibill-db; only the formatting is pure.

use chrono::NaiveDate;

use crate::money::Money;
use crate::types::NewLineItem;

/// Computed monetary breakdown of a bill.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BillTotals {
    pub medicines_subtotal_cents: i64,
    pub prescription_charge_cents: i64,
    pub grand_total_cents: i64,
}

/// Subtotal of one line in cents.
#[inline]
pub fn line_subtotal_cents(quantity: i64, cost_per_piece_cents: i64) -> i64 {
    Money::from_cents(cost_per_piece_cents).times(quantity).cents()
}

/// Computes the full monetary breakdown for a set of line items.
///
/// Totals are always recomputed from scratch - never incrementally patched -
/// so that edit and create cannot drift apart.
pub fn compute_totals(
    items: &[NewLineItem],
    has_prescription: bool,
    prescription_charge_cents: i64,
) -> BillTotals {
    let medicines_subtotal: Money = items
        .iter()
        .map(|item| Money::from_cents(line_subtotal_cents(item.quantity, item.cost_per_piece_cents)))
        .sum();

    let prescription_charge = if has_prescription {
        Money::from_cents(prescription_charge_cents)
    } else {
        Money::zero()
    };

    BillTotals {
        medicines_subtotal_cents: medicines_subtotal.cents(),
        prescription_charge_cents: prescription_charge.cents(),
        grand_total_cents: (medicines_subtotal + prescription_charge).cents(),
    }
}

/// Formats a daily bill number: `{YYYYMMDD}-{seq:04}`.
///
/// ## Example
/// ```rust
/// use chrono::NaiveDate;
/// use medibill_core::billing::format_bill_number;
///
/// let date = NaiveDate::from_ymd_opt(2026, 8, 29).unwrap();
/// assert_eq!(format_bill_number(date, 7), "20260829-0007");
/// ```
pub fn format_bill_number(date: NaiveDate, seq: u32) -> String {
    format!("{}-{:04}", date.format("%Y%m%d"), seq)
}

/// The `LIKE` prefix matching every bill number of one day, used when
/// counting a day's bills.
pub fn bill_number_day_prefix(date: NaiveDate) -> String {
    format!("{}-%", date.format("%Y%m%d"))
}

// =============================================================================
// Unit Tests
// =============================================================================

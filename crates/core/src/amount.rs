use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A receipt amount that has passed the plausibility check.
///
/// Receipts are full of numbers that are not amounts (phone numbers, UTRs,
/// reference codes). Anything outside `[MIN, MAX]` is rejected at
/// construction, so holding an `Amount` means the bound already held.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Amount(#[serde(with = "rust_decimal::serde::float")] Decimal);

impl Amount {
    pub const MIN: Decimal = Decimal::ONE;
    pub const MAX: Decimal = Decimal::from_parts(500_000, 0, 0, false, 0);

    /// Accept `value` only if it lies within the plausible range (inclusive).
    pub fn plausible(value: Decimal) -> Option<Self> {
        (Self::MIN..=Self::MAX)
            .contains(&value)
            .then(|| Amount(value.normalize()))
    }

    pub fn value(self) -> Decimal {
        self.0
    }

    pub fn to_f64(self) -> f64 {
        self.0.to_f64().unwrap_or_default()
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "₹{:.2}", self.0)
    }
}

use crate::error::ShippingError;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Fractional digits carried by every persisted or reported amount.
pub const CURRENCY_DECIMAL_PLACES: u32 = 2;

/// A non-negative monetary amount with exactly two fractional digits.
///
/// Construction rejects values whose extra fractional digits are not all
/// zero (`1.234`), while `1.2300` is accepted and normalized to `1.23`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "Decimal", into = "Decimal")]
pub struct Amount(Decimal);

impl Amount {
    pub const ZERO: Self = Self(Decimal::ZERO);

    pub fn new(value: Decimal) -> Result<Self, ShippingError> {
        if value < Decimal::ZERO {
            return Err(ShippingError::InvalidAmount(format!(
                "{value} must not be negative"
            )));
        }
        Ok(Self(to_currency(value)?))
    }

    pub fn value(&self) -> Decimal {
        self.0
    }
}

impl TryFrom<Decimal> for Amount {
    type Error = ShippingError;

    fn try_from(value: Decimal) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Amount> for Decimal {
    fn from(amount: Amount) -> Self {
        amount.0
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Rescales `value` to exactly two fractional digits without rounding.
///
/// Signed values are allowed here; a reduced price is not clamped at zero.
pub fn to_currency(value: Decimal) -> Result<Decimal, ShippingError> {
    if value.normalize().scale() > CURRENCY_DECIMAL_PLACES {
        return Err(ShippingError::InvalidAmount(format!(
            "{value} must have exactly {CURRENCY_DECIMAL_PLACES} decimal places"
        )));
    }
    let mut scaled = value;
    scaled.rescale(CURRENCY_DECIMAL_PLACES);
    Ok(scaled)
}

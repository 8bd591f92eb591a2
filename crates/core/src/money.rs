//! Money - a quantity together with its token denomination

use crate::amount::{Amount, AmountError};
use crate::currency::Currency;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Quantity of a specific token.
///
/// Two `Money` values are equal only if both quantity and token match,
/// so `100 USD != 100 EUR`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Money {
    pub quantity: Amount,
    pub token: Currency,
}

impl Money {
    pub fn new(quantity: Decimal, token: Currency) -> Result<Self, AmountError> {
        Ok(Self {
            quantity: Amount::new(quantity)?,
            token,
        })
    }

    /// Zero of the given token
    pub fn zero(token: Currency) -> Self {
        Self {
            quantity: Amount::ZERO,
            token,
        }
    }

    /// Greater than zero in its own denomination
    pub fn is_positive(&self) -> bool {
        self.quantity.is_positive()
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.quantity, self.token)
    }
}

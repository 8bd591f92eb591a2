//! IOU Core - Value types
//!
//! - `Amount`: Non-negative decimal quantity
//! - `Currency`: Type-safe token codes
//! - `Money`: Quantity paired with its token

pub mod amount;
pub mod currency;
pub mod money;

pub use amount::{Amount, AmountError};
pub use currency::{Currency, CurrencyError};
pub use money::Money;

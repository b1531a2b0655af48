//! Common types used across the workspace.

pub mod id;
pub mod money;

pub use id::*;
pub use money::{CurrencyCode, MonetaryCurrency, Money, MoneyError};

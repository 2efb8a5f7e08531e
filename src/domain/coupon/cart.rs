//! Cart line items.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::foundation::ValidationError;

/// A single cart line as submitted by the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartItem {
    pub id: String,
    pub category: String,
    /// Unit price, never negative.
    pub price: Decimal,
    pub qty: u32,
}

impl CartItem {
    /// Creates a cart line, rejecting negative prices.
    pub fn new(
        id: impl Into<String>,
        category: impl Into<String>,
        price: Decimal,
        qty: u32,
    ) -> Result<Self, ValidationError> {
        let item = Self {
            id: id.into(),
            category: category.into(),
            price,
            qty,
        };
        item.validate()?;
        Ok(item)
    }

    /// Checks invariants on an item received over the wire.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.price.is_sign_negative() && !self.price.is_zero() {
            return Err(ValidationError::negative("price"));
        }
        Ok(())
    }

    /// `qty × price`, or `None` if it does not fit in a `Decimal`.
    pub fn line_total(&self) -> Option<Decimal> {
        Decimal::from(self.qty).checked_mul(self.price)
    }
}

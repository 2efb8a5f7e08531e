//! Data Transfer Objects for coupon HTTP endpoints.
//!
//! These types define the JSON request/response format for the API.
//! Money is carried as JSON numbers.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::coupon::{CartItem, CouponError, ValidationResponse};
use crate::domain::foundation::{Timestamp, ValidationError};

// ════════════════════════════════════════════════════════════════════════════════
// Request DTOs
// ════════════════════════════════════════════════════════════════════════════════

/// One cart line as sent by clients.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CartItemDto {
    pub id: String,
    #[serde(default)]
    pub category: String,
    pub price: Decimal,
    pub qty: u32,
}

impl TryFrom<CartItemDto> for CartItem {
    type Error = ValidationError;

    fn try_from(dto: CartItemDto) -> Result<Self, Self::Error> {
        CartItem::new(dto.id, dto.category, dto.price, dto.qty)
    }
}

/// Request to validate and consume a coupon.
#[derive(Debug, Clone, Deserialize)]
pub struct ValidateCouponRequest {
    pub user_id: String,
    pub coupon_code: String,
    #[serde(default)]
    pub cart_items: Vec<CartItemDto>,
    pub order_total: Decimal,
}

/// JSON body for the applicable-coupons query.
#[derive(Debug, Clone, Deserialize)]
pub struct ApplicableCouponsRequest {
    pub user_id: String,
    #[serde(default)]
    pub cart_items: Vec<CartItemDto>,
    #[serde(default)]
    pub order_total: Decimal,
    /// RFC 3339; defaults to now.
    #[serde(default)]
    pub timestamp: Option<String>,
}

/// Query-string form of the applicable-coupons query.
///
/// `items` is a comma-separated list of `id|category|price|qty` entries.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ApplicableCouponsParams {
    pub user: Option<String>,
    pub order_total: Option<String>,
    pub timestamp: Option<String>,
    pub items: Option<String>,
}

/// Parses the `items` query parameter.
///
/// Entries with fewer than four fields are skipped; malformed prices or
/// quantities are an error.
pub fn parse_items_param(raw: &str) -> Result<Vec<CartItem>, ValidationError> {
    let mut items = Vec::new();
    for entry in raw.split(',').map(str::trim).filter(|e| !e.is_empty()) {
        let fields: Vec<&str> = entry.split('|').map(str::trim).collect();
        if fields.len() < 4 {
            continue;
        }
        let price: Decimal = fields[2]
            .parse()
            .map_err(|_| ValidationError::invalid_format("price", "must be a decimal number"))?;
        let qty: u32 = fields[3]
            .parse()
            .map_err(|_| ValidationError::invalid_format("qty", "must be a non-negative integer"))?;
        items.push(CartItem::new(fields[0], fields[1], price, qty)?);
    }
    Ok(items)
}

/// Parses an optional RFC 3339 timestamp; blank means absent.
pub fn parse_optional_timestamp(raw: Option<&str>) -> Result<Option<Timestamp>, ValidationError> {
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        None => Ok(None),
        Some(s) => Timestamp::parse_rfc3339(s)
            .map(Some)
            .map_err(|_| ValidationError::invalid_format("timestamp", "must be RFC 3339")),
    }
}

/// Parses an optional decimal amount; blank means zero.
pub fn parse_amount(field: &str, raw: Option<&str>) -> Result<Decimal, ValidationError> {
    let amount = match raw.map(str::trim).filter(|s| !s.is_empty()) {
        None => Decimal::ZERO,
        Some(s) => s
            .parse()
            .map_err(|_| ValidationError::invalid_format(field, "must be a decimal number"))?,
    };
    if amount < Decimal::ZERO {
        return Err(ValidationError::negative(field));
    }
    Ok(amount)
}

// ════════════════════════════════════════════════════════════════════════════════
// Response DTOs
// ════════════════════════════════════════════════════════════════════════════════

/// Business outcome of a validation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidateCouponResponse {
    pub is_valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub discount: Option<Decimal>,
    pub message: String,
}

impl From<ValidationResponse> for ValidateCouponResponse {
    fn from(response: ValidationResponse) -> Self {
        Self {
            is_valid: response.is_valid(),
            discount: response.discount(),
            message: response.message().to_string(),
        }
    }
}

/// Codes of coupons the cart could use.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApplicableCouponsResponse {
    pub applicable_coupons: Vec<String>,
}

/// Operational failure body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Stable machine-readable message.
    pub error: String,
    /// Human-readable detail (optional).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    /// Whether the same request may be retried.
    pub retryable: bool,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            detail: None,
            retryable: false,
        }
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }
}

impl From<&CouponError> for ErrorResponse {
    fn from(err: &CouponError) -> Self {
        Self {
            error: err.message().to_string(),
            detail: None,
            retryable: err.is_retryable(),
        }
    }
}

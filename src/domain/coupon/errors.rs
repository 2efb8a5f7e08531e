//! Operational failures of a validation attempt.
//!
//! Business rejections are not errors; see [`super::RejectionReason`].

use thiserror::Error;

use crate::domain::foundation::DomainError;

use super::discount::DiscountOverflow;

/// A validation that could not reach a business decision.
///
/// Whenever one of these is returned, no usage was consumed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CouponError {
    /// The request deadline elapsed while evaluating cart items.
    #[error("deadline exceeded during item checks")]
    Timeout,

    /// The caller cancelled the request.
    #[error("validation cancelled")]
    Cancelled,

    /// Storage, transaction, arithmetic or deadline failure outside the
    /// item checks.
    #[error("internal error: {message}")]
    Internal { message: String, retryable: bool },
}

impl CouponError {
    pub fn internal(message: impl Into<String>) -> Self {
        CouponError::Internal {
            message: message.into(),
            retryable: false,
        }
    }

    /// Safe, non-business message to return alongside the error.
    pub fn message(&self) -> &'static str {
        match self {
            CouponError::Timeout => "timeout_during_item_checks",
            CouponError::Cancelled => "cancelled",
            CouponError::Internal { .. } => "internal_error",
        }
    }

    /// Whether the caller may retry the same request.
    pub fn is_retryable(&self) -> bool {
        match self {
            CouponError::Timeout => true,
            CouponError::Cancelled => false,
            CouponError::Internal { retryable, .. } => *retryable,
        }
    }
}

impl From<DomainError> for CouponError {
    fn from(err: DomainError) -> Self {
        CouponError::Internal {
            retryable: err.is_retryable(),
            message: err.to_string(),
        }
    }
}

impl From<DiscountOverflow> for CouponError {
    fn from(err: DiscountOverflow) -> Self {
        CouponError::internal(err.to_string())
    }
}

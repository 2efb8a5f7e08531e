//! Application layer - Commands, Queries, and Handlers.
//!
//! This layer orchestrates domain operations and coordinates between ports.
//! Request-scoped concerns (deadline, cancellation, bounded fan-out) live
//! here rather than in the domain.

pub mod context;
pub mod discount_evaluator;
pub mod handlers;

pub use context::{CancellationHandle, ContextError, RequestContext};
pub use discount_evaluator::{DiscountEvaluator, EvaluationError, DEFAULT_MAX_WORKERS};
pub use handlers::{
    ListApplicableCouponsHandler, ListApplicableCouponsQuery, ListApplicableCouponsResult,
    ValidateCouponCommand, ValidateCouponHandler, DEFAULT_DEADLINE,
};

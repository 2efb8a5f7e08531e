//! ValidateCouponHandler - Validates a coupon against a cart and consumes one use.
//!
//! The whole attempt runs under one request deadline. Phases:
//!
//! 1. Resolve the code to its metadata
//! 2. Static gates: expiry, minimum order value, validity window
//! 3. Per-item discount evaluation (bounded fan-out)
//! 4. Aggregate the discount
//! 5. Ledger transaction: lock the usage record, re-check limits, increment, commit
//!
//! A usage is consumed only when phase 5 commits. Every other exit rolls the
//! transaction back, including cancellation, where the transaction handle is
//! dropped mid-flight.

use std::sync::Arc;
use std::time::Duration;

use crate::application::context::{ContextError, RequestContext};
use crate::application::discount_evaluator::{DiscountEvaluator, EvaluationError};
use crate::domain::coupon::{
    aggregate_discount, check_static, check_usage, Coupon, CouponError, RejectionReason,
    ValidationRequest, ValidationResponse,
};
use crate::domain::foundation::UserId;
use crate::ports::{Clock, CouponMetadataProvider, LedgerTransaction, UsageLedger};

/// Default budget for one validation.
pub const DEFAULT_DEADLINE: Duration = Duration::from_secs(8);

/// Command to validate and consume a coupon.
#[derive(Debug, Clone)]
pub struct ValidateCouponCommand {
    pub request: ValidationRequest,
}

impl From<ValidationRequest> for ValidateCouponCommand {
    fn from(request: ValidationRequest) -> Self {
        Self { request }
    }
}

/// Handler for coupon validation.
pub struct ValidateCouponHandler {
    metadata: Arc<dyn CouponMetadataProvider>,
    ledger: Arc<dyn UsageLedger>,
    clock: Arc<dyn Clock>,
    evaluator: DiscountEvaluator,
    deadline: Duration,
}

/// Outcome of the locked part of the ledger transaction.
enum Staged {
    Ready(Box<dyn LedgerTransaction>),
    Rejected(RejectionReason),
}

impl ValidateCouponHandler {
    pub fn new(
        metadata: Arc<dyn CouponMetadataProvider>,
        ledger: Arc<dyn UsageLedger>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            metadata,
            ledger,
            clock,
            evaluator: DiscountEvaluator::default(),
            deadline: DEFAULT_DEADLINE,
        }
    }

    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = deadline;
        self
    }

    pub fn with_evaluator(mut self, evaluator: DiscountEvaluator) -> Self {
        self.evaluator = evaluator;
        self
    }

    pub fn evaluator(&self) -> &DiscountEvaluator {
        &self.evaluator
    }

    pub fn deadline(&self) -> Duration {
        self.deadline
    }

    /// Validates under a fresh context bounded by the configured deadline.
    pub async fn handle(
        &self,
        cmd: ValidateCouponCommand,
    ) -> Result<ValidationResponse, CouponError> {
        let (ctx, _cancel) = RequestContext::with_timeout(self.deadline);
        self.handle_with_context(cmd, &ctx).await
    }

    /// Validates under the caller's context. The configured deadline still
    /// applies if it is tighter than the caller's.
    pub async fn handle_with_context(
        &self,
        cmd: ValidateCouponCommand,
        parent: &RequestContext,
    ) -> Result<ValidationResponse, CouponError> {
        let mut ctx = parent.child_with_timeout(self.deadline);
        let request = cmd.request;

        // 1. Resolve metadata
        let meta = match ctx.run(self.metadata.lookup(&request.coupon_code)).await {
            Err(reason) => return Err(interrupted(reason, "metadata lookup")),
            Ok(Err(err)) => {
                tracing::warn!(coupon_code = %request.coupon_code, "Coupon lookup failed: {}", err);
                return Err(err.into());
            }
            Ok(Ok(None)) => return Ok(reject(&request, RejectionReason::CouponNotFound)),
            Ok(Ok(Some(meta))) => meta,
        };

        // 2. Static gates
        let now = self.clock.now();
        if let Err(reason) = check_static(&meta.coupon, request.order_total, now) {
            return Ok(reject(&request, reason));
        }

        // 3. Per-item evaluation
        let item_discount = self
            .evaluator
            .evaluate(&ctx, meta.clone(), &request.cart_items)
            .await
            .map_err(evaluation_failure)?;

        // 4. Aggregate
        let discount = aggregate_discount(&meta.coupon, item_discount, request.order_total)
            .map_err(|overflow| {
                tracing::warn!(coupon_code = %request.coupon_code, "Discount overflowed");
                CouponError::from(overflow)
            })?;

        // 5. Consume
        let staged = ctx
            .run(self.stage_consumption(&meta.coupon, &request.user_id))
            .await;
        let tx = match staged {
            Err(reason) => return Err(interrupted(reason, "usage consumption")),
            Ok(Err(err)) => return Err(err),
            Ok(Ok(Staged::Rejected(reason))) => return Ok(reject(&request, reason)),
            Ok(Ok(Staged::Ready(tx))) => tx,
        };

        // Commit is not raced against the context.
        if let Some(reason) = ctx.check() {
            rollback_quietly(tx).await;
            return Err(interrupted(reason, "usage consumption"));
        }
        if let Err(err) = tx.commit().await {
            tracing::warn!(
                coupon_code = %request.coupon_code,
                user_id = %request.user_id,
                retryable = err.is_retryable(),
                "Usage commit failed: {}",
                err
            );
            return Err(err.into());
        }

        tracing::info!(
            coupon_code = %request.coupon_code,
            user_id = %request.user_id,
            discount = %discount,
            "Coupon applied"
        );
        Ok(ValidationResponse::accepted(discount))
    }

    /// Locks the usage record, re-checks limits and stages the increment.
    ///
    /// Returns the still-open transaction on success; rolls back on every
    /// other path.
    async fn stage_consumption(
        &self,
        coupon: &Coupon,
        user_id: &UserId,
    ) -> Result<Staged, CouponError> {
        let mut tx = self.ledger.begin().await?;

        let count = match tx.get_and_lock(coupon.id, user_id).await {
            Ok(count) => count,
            Err(err) => {
                rollback_quietly(tx).await;
                return Err(err.into());
            }
        };

        if let Err(reason) = check_usage(coupon, count) {
            rollback_quietly(tx).await;
            return Ok(Staged::Rejected(reason));
        }

        if let Err(err) = tx.increment(coupon.id, user_id).await {
            rollback_quietly(tx).await;
            return Err(err.into());
        }

        Ok(Staged::Ready(tx))
    }
}

fn reject(request: &ValidationRequest, reason: RejectionReason) -> ValidationResponse {
    tracing::debug!(
        coupon_code = %request.coupon_code,
        user_id = %request.user_id,
        reason = reason.as_str(),
        "Coupon rejected"
    );
    ValidationResponse::rejected(reason)
}

async fn rollback_quietly(tx: Box<dyn LedgerTransaction>) {
    if let Err(err) = tx.rollback().await {
        tracing::warn!("Usage rollback failed: {}", err);
    }
}

/// Context failure outside the item checks.
fn interrupted(reason: ContextError, phase: &str) -> CouponError {
    match reason {
        ContextError::Cancelled => CouponError::Cancelled,
        ContextError::DeadlineExceeded => {
            tracing::warn!(phase, "Deadline exceeded");
            CouponError::internal(format!("deadline exceeded during {phase}"))
        }
    }
}

/// Failure during the item checks.
fn evaluation_failure(err: EvaluationError) -> CouponError {
    match err {
        EvaluationError::Interrupted(ContextError::Cancelled) => CouponError::Cancelled,
        EvaluationError::Interrupted(ContextError::DeadlineExceeded) => {
            tracing::warn!("Deadline exceeded during item checks");
            CouponError::Timeout
        }
        EvaluationError::Overflow(overflow) => {
            tracing::warn!("Item discount overflowed");
            overflow.into()
        }
        EvaluationError::WorkerFailed(message) => CouponError::internal(message),
    }
}

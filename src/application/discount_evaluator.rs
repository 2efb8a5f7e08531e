//! Bounded fan-out evaluation of per-item discounts.
//!
//! Pipeline: one producer feeds cart items into a bounded queue, up to
//! `max_workers` workers compute [`item_contribution`] for each item, and the
//! calling task is the single collector that sums the results. Every send
//! and receive on either queue races the request context, and `evaluate`
//! does not return until every task it spawned has finished.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use rust_decimal::Decimal;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinSet;
use tracing::debug;

use crate::domain::coupon::{item_contribution, CartItem, CouponMeta, DiscountOverflow};

use super::context::{ContextError, RequestContext};

/// Why an evaluation produced no total.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EvaluationError {
    #[error(transparent)]
    Interrupted(#[from] ContextError),

    #[error(transparent)]
    Overflow(#[from] DiscountOverflow),

    /// A worker stopped without the context asking it to.
    #[error("discount worker failed: {0}")]
    WorkerFailed(String),
}

/// Default worker cap.
pub const DEFAULT_MAX_WORKERS: usize = 4;

/// Computes the item-level discount of a cart with bounded parallelism.
#[derive(Debug, Clone)]
pub struct DiscountEvaluator {
    max_workers: usize,
    live_tasks: Arc<AtomicUsize>,
}

impl Default for DiscountEvaluator {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_WORKERS)
    }
}

impl DiscountEvaluator {
    /// Creates an evaluator with the given worker cap (at least 1).
    pub fn new(max_workers: usize) -> Self {
        Self {
            max_workers: max_workers.max(1),
            live_tasks: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn max_workers(&self) -> usize {
        self.max_workers
    }

    /// `min(max_workers, max(1, item_count))`.
    pub fn worker_count(&self, item_count: usize) -> usize {
        self.max_workers.min(item_count.max(1))
    }

    /// Number of producer/worker tasks currently alive across all
    /// evaluations run by this evaluator. Zero whenever no `evaluate` call
    /// is in flight.
    pub fn live_tasks(&self) -> usize {
        self.live_tasks.load(Ordering::SeqCst)
    }

    /// Sums the per-item contributions of `items`.
    ///
    /// # Errors
    ///
    /// - `Interrupted(DeadlineExceeded)` if the deadline passes first
    /// - `Interrupted(Cancelled)` if the caller cancels first
    /// - `Overflow` if a contribution or the running total leaves the
    ///   `Decimal` range
    /// - `WorkerFailed` if a worker panics
    pub async fn evaluate(
        &self,
        ctx: &RequestContext,
        meta: Arc<CouponMeta>,
        items: &[CartItem],
    ) -> Result<Decimal, EvaluationError> {
        if let Some(reason) = ctx.check() {
            return Err(reason.into());
        }

        let worker_count = self.worker_count(items.len());
        let (item_tx, item_rx) = mpsc::channel::<CartItem>(worker_count);
        let item_rx = Arc::new(Mutex::new(item_rx));
        let (out_tx, mut out_rx) =
            mpsc::channel::<Result<Decimal, DiscountOverflow>>(worker_count);
        let mut tasks = JoinSet::new();

        let producer_items = items.to_vec();
        let mut producer_ctx = ctx.clone();
        let guard = LiveTask::enter(&self.live_tasks);
        tasks.spawn(async move {
            let _guard = guard;
            for item in producer_items {
                tokio::select! {
                    biased;
                    _ = producer_ctx.done() => return,
                    sent = item_tx.send(item) => {
                        if sent.is_err() {
                            return;
                        }
                    }
                }
            }
        });

        for _ in 0..worker_count {
            let queue = item_rx.clone();
            let results = out_tx.clone();
            let meta = meta.clone();
            let mut worker_ctx = ctx.clone();
            let guard = LiveTask::enter(&self.live_tasks);
            tasks.spawn(async move {
                let _guard = guard;
                loop {
                    let next = tokio::select! {
                        biased;
                        _ = worker_ctx.done() => return,
                        item = async { queue.lock().await.recv().await } => item,
                    };
                    let Some(item) = next else { return };

                    let contribution = item_contribution(&meta, &item);
                    let overflowed = contribution.is_err();
                    tokio::select! {
                        biased;
                        _ = worker_ctx.done() => return,
                        sent = results.send(contribution) => {
                            if sent.is_err() || overflowed {
                                return;
                            }
                        }
                    }
                }
            });
        }
        drop(out_tx);

        let mut collector_ctx = ctx.clone();
        let mut total = Decimal::ZERO;
        let mut received = 0usize;
        let mut outcome = loop {
            if received == items.len() {
                break Ok(total);
            }
            tokio::select! {
                biased;
                reason = collector_ctx.done() => break Err(reason.into()),
                next = out_rx.recv() => match next {
                    Some(Ok(contribution)) => match total.checked_add(contribution) {
                        Some(sum) => {
                            total = sum;
                            received += 1;
                        }
                        None => break Err(DiscountOverflow.into()),
                    },
                    Some(Err(overflow)) => break Err(overflow.into()),
                    None => break Err(match collector_ctx.check() {
                        Some(reason) => reason.into(),
                        None => EvaluationError::WorkerFailed(
                            "workers stopped before every item was evaluated".to_string(),
                        ),
                    }),
                },
            }
        };
        drop(out_rx);

        if outcome.is_err() {
            tasks.abort_all();
        }
        while let Some(joined) = tasks.join_next().await {
            if let Err(err) = joined {
                if err.is_panic() {
                    tracing::error!("Discount worker panicked: {}", err);
                    outcome = Err(EvaluationError::WorkerFailed(err.to_string()));
                }
            }
        }

        debug!(
            items = items.len(),
            workers = worker_count,
            ok = outcome.is_ok(),
            "Discount evaluation finished"
        );
        outcome
    }
}

/// Counts a spawned task as alive until dropped.
struct LiveTask(Arc<AtomicUsize>);

impl LiveTask {
    fn enter(counter: &Arc<AtomicUsize>) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        Self(counter.clone())
    }
}

impl Drop for LiveTask {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

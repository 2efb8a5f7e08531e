//! PostgreSQL implementation of UsageLedger and UsageReader.
//!
//! Each ledger transaction runs at SERIALIZABLE isolation and takes a row
//! lock on the `coupon_usage` record it touches. Serialization failures and
//! deadlocks are surfaced as `ErrorCode::SerializationFailure` and never
//! retried here.
//!
//! Blocking differs from the in-memory ledger. Under SERIALIZABLE, a
//! transaction that waited on a row another transaction has just committed
//! gets SQLSTATE 40001 instead of reading the new count. With N concurrent
//! attempts against a limit, the in-memory ledger answers with exactly the
//! expected rejections; this ledger may answer some of them with a retryable
//! `internal_error` instead. The limit itself is never exceeded.

use async_trait::async_trait;
use sqlx::{PgPool, Postgres, Transaction};

use crate::domain::foundation::{CouponId, DomainError, ErrorCode, UserId};
use crate::ports::{LedgerTransaction, UsageLedger, UsageReader};

/// PostgreSQL-backed usage ledger.
pub struct PostgresUsageLedger {
    pool: PgPool,
}

impl PostgresUsageLedger {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Open ledger transaction. Dropping it without commit rolls back.
struct PostgresLedgerTransaction {
    tx: Transaction<'static, Postgres>,
}

/// Error code for a SQLSTATE, if the driver reported one.
fn classify_sqlstate(sqlstate: Option<&str>) -> ErrorCode {
    match sqlstate {
        // serialization_failure, deadlock_detected
        Some("40001") | Some("40P01") => ErrorCode::SerializationFailure,
        _ => ErrorCode::DatabaseError,
    }
}

fn map_sqlx_error(action: &str, e: sqlx::Error) -> DomainError {
    let code = match &e {
        sqlx::Error::Database(db_err) => classify_sqlstate(db_err.code().as_deref()),
        _ => ErrorCode::DatabaseError,
    };
    DomainError::new(code, format!("Failed to {}: {}", action, e))
}

fn to_count(raw: i32) -> Result<u32, DomainError> {
    u32::try_from(raw).map_err(|_| {
        DomainError::new(
            ErrorCode::DatabaseError,
            format!("Invalid usage_count in storage: {}", raw),
        )
    })
}

#[async_trait]
impl UsageLedger for PostgresUsageLedger {
    async fn begin(&self) -> Result<Box<dyn LedgerTransaction>, DomainError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin transaction", e))?;

        sqlx::query("SET TRANSACTION ISOLATION LEVEL SERIALIZABLE")
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("set isolation level", e))?;

        Ok(Box::new(PostgresLedgerTransaction { tx }))
    }
}

#[async_trait]
impl LedgerTransaction for PostgresLedgerTransaction {
    async fn get_and_lock(
        &mut self,
        coupon_id: CouponId,
        user_id: &UserId,
    ) -> Result<u32, DomainError> {
        sqlx::query(
            r#"
            INSERT INTO coupon_usage (coupon_id, user_id, usage_count, last_used)
            VALUES ($1, $2, 0, NOW())
            ON CONFLICT (coupon_id, user_id) DO NOTHING
            "#,
        )
        .bind(coupon_id.as_i64())
        .bind(user_id.as_str())
        .execute(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("create usage record", e))?;

        let count: i32 = sqlx::query_scalar(
            r#"
            SELECT usage_count
            FROM coupon_usage
            WHERE coupon_id = $1 AND user_id = $2
            FOR UPDATE
            "#,
        )
        .bind(coupon_id.as_i64())
        .bind(user_id.as_str())
        .fetch_one(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("lock usage record", e))?;

        to_count(count)
    }

    async fn increment(
        &mut self,
        coupon_id: CouponId,
        user_id: &UserId,
    ) -> Result<(), DomainError> {
        let result = sqlx::query(
            r#"
            UPDATE coupon_usage
            SET usage_count = usage_count + 1,
                last_used = NOW()
            WHERE coupon_id = $1 AND user_id = $2
            "#,
        )
        .bind(coupon_id.as_i64())
        .bind(user_id.as_str())
        .execute(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("increment usage", e))?;

        if result.rows_affected() == 0 {
            return Err(DomainError::new(
                ErrorCode::InternalError,
                "Usage record missing; get_and_lock must precede increment",
            ));
        }
        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<(), DomainError> {
        self.tx
            .commit()
            .await
            .map_err(|e| map_sqlx_error("commit usage", e))
    }

    async fn rollback(self: Box<Self>) -> Result<(), DomainError> {
        self.tx
            .rollback()
            .await
            .map_err(|e| map_sqlx_error("roll back usage", e))
    }
}

#[async_trait]
impl UsageReader for PostgresUsageLedger {
    async fn usage_count(&self, coupon_id: CouponId, user_id: &UserId) -> Result<u32, DomainError> {
        let count: Option<i32> = sqlx::query_scalar(
            "SELECT usage_count FROM coupon_usage WHERE coupon_id = $1 AND user_id = $2",
        )
        .bind(coupon_id.as_i64())
        .bind(user_id.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("read usage", e))?;

        count.map_or(Ok(0), to_count)
    }
}

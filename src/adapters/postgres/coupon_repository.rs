//! PostgreSQL implementation of CouponMetadataProvider and CouponCatalog.
//!
//! Reads the `coupons` table plus its two applicability tables. Read-only.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;

use crate::domain::coupon::{Coupon, CouponMeta};
use crate::domain::foundation::{CouponId, DomainError, ErrorCode, Timestamp};
use crate::ports::{CouponCatalog, CouponMetadataProvider};

const COUPON_COLUMNS: &str = r#"
    id, coupon_code, expiry_date, usage_type, min_order_value,
    valid_from, valid_to, discount_type, discount_value,
    max_usage_per_user, target_type, terms_and_conditions
"#;

/// PostgreSQL-backed coupon reads.
pub struct PostgresCouponRepository {
    pool: PgPool,
}

impl PostgresCouponRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn applicable_items(&self, coupon_id: CouponId) -> Result<Vec<String>, DomainError> {
        sqlx::query_scalar::<_, String>(
            "SELECT medicine_id FROM coupon_applicable_items WHERE coupon_id = $1",
        )
        .bind(coupon_id.as_i64())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            DomainError::new(
                ErrorCode::DatabaseError,
                format!("Failed to load applicable items: {}", e),
            )
        })
    }

    async fn applicable_categories(
        &self,
        coupon_id: CouponId,
    ) -> Result<Vec<String>, DomainError> {
        sqlx::query_scalar::<_, String>(
            "SELECT category_name FROM coupon_applicable_categories WHERE coupon_id = $1",
        )
        .bind(coupon_id.as_i64())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            DomainError::new(
                ErrorCode::DatabaseError,
                format!("Failed to load applicable categories: {}", e),
            )
        })
    }
}

/// Database row representation of a coupon.
#[derive(Debug, sqlx::FromRow)]
struct CouponRow {
    id: i64,
    coupon_code: String,
    expiry_date: DateTime<Utc>,
    usage_type: String,
    min_order_value: Decimal,
    valid_from: Option<DateTime<Utc>>,
    valid_to: Option<DateTime<Utc>>,
    discount_type: String,
    discount_value: Decimal,
    max_usage_per_user: i32,
    target_type: String,
    terms_and_conditions: Option<String>,
}

impl TryFrom<CouponRow> for Coupon {
    type Error = DomainError;

    fn try_from(row: CouponRow) -> Result<Self, Self::Error> {
        let corrupt = |field: &str, e: &dyn std::fmt::Display| {
            DomainError::new(
                ErrorCode::DatabaseError,
                format!("Invalid {} for coupon {}: {}", field, row.coupon_code, e),
            )
        };

        let max_usage_per_user = u32::try_from(row.max_usage_per_user)
            .map_err(|e| corrupt("max_usage_per_user", &e))?;

        let coupon = Coupon {
            id: CouponId::new(row.id),
            code: row.coupon_code.clone(),
            expiry_date: Timestamp::from_datetime(row.expiry_date),
            usage_type: row.usage_type.parse().map_err(|e| corrupt("usage_type", &e))?,
            min_order_value: row.min_order_value,
            valid_from: row.valid_from.map(Timestamp::from_datetime),
            valid_to: row.valid_to.map(Timestamp::from_datetime),
            discount_type: row
                .discount_type
                .parse()
                .map_err(|e| corrupt("discount_type", &e))?,
            discount_value: row.discount_value,
            max_usage_per_user,
            target_type: row.target_type.parse().map_err(|e| corrupt("target_type", &e))?,
            terms_and_conditions: row.terms_and_conditions.clone(),
        };
        coupon.validate().map_err(|e| corrupt("coupon", &e))?;
        Ok(coupon)
    }
}

#[async_trait]
impl CouponMetadataProvider for PostgresCouponRepository {
    async fn lookup(&self, code: &str) -> Result<Option<Arc<CouponMeta>>, DomainError> {
        let row: Option<CouponRow> = sqlx::query_as(&format!(
            "SELECT {} FROM coupons WHERE coupon_code = $1",
            COUPON_COLUMNS
        ))
        .bind(code)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            DomainError::new(ErrorCode::DatabaseError, format!("Failed to find coupon: {}", e))
        })?;

        let Some(row) = row else {
            return Ok(None);
        };
        let coupon = Coupon::try_from(row)?;
        let items = self.applicable_items(coupon.id).await?;
        let categories = self.applicable_categories(coupon.id).await?;

        Ok(Some(Arc::new(CouponMeta::new(coupon, items, categories))))
    }
}

#[async_trait]
impl CouponCatalog for PostgresCouponRepository {
    async fn list_coupons(&self) -> Result<Vec<Coupon>, DomainError> {
        let rows: Vec<CouponRow> = sqlx::query_as(&format!(
            "SELECT {} FROM coupons ORDER BY id",
            COUPON_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            DomainError::new(ErrorCode::DatabaseError, format!("Failed to list coupons: {}", e))
        })?;

        // A single malformed row must not hide the rest of the catalog.
        Ok(rows
            .into_iter()
            .filter_map(|row| match Coupon::try_from(row) {
                Ok(coupon) => Some(coupon),
                Err(e) => {
                    tracing::warn!("Skipping unreadable coupon row: {}", e);
                    None
                }
            })
            .collect())
    }
}

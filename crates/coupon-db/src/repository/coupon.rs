//! # Coupon Repository
//!
//! Database operations for coupons.
//!
//! ## Key Operations
//! - Lookup by code (case-insensitive) or id
//! - Insert / rule edits / activation toggle
//! - Cap-guarded usage increment (used inside the order transaction)
//!
//! ## The Conditional Increment
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Two checkouts race for the last use of "ONCE" (max_uses = 1)           │
//! │                                                                         │
//! │  Tx A: UPDATE coupons SET used_count = used_count + 1                   │
//! │        WHERE id = ? AND is_active = 1                                   │
//! │          AND (max_uses IS NULL OR used_count < max_uses)   → 1 row ✅   │
//! │                                                                         │
//! │  Tx B: same statement, waits on the write lock, then sees               │
//! │        used_count = 1                                      → 0 rows ❌  │
//! │                                                                         │
//! │  Never read-then-write: the guard and the increment are one statement. │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};
use coupon_core::{Coupon, Discount, Money};

const COUPON_COLUMNS: &str = r#"
    id,
    code,
    discount_type,
    discount_value,
    min_order_cents,
    max_uses,
    used_count,
    expires_at,
    is_active,
    created_at,
    updated_at
"#;

/// Raw `coupons` row.
#[derive(Debug, sqlx::FromRow)]
struct CouponRow {
    id: String,
    code: String,
    discount_type: String,
    discount_value: i64,
    min_order_cents: i64,
    max_uses: Option<i64>,
    used_count: i64,
    expires_at: Option<DateTime<Utc>>,
    is_active: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<CouponRow> for Coupon {
    type Error = DbError;

    fn try_from(row: CouponRow) -> Result<Self, Self::Error> {
        let corrupt = |reason: String| DbError::CorruptRow {
            entity: "Coupon".to_string(),
            reason,
        };

        let discount = Discount::from_parts(&row.discount_type, row.discount_value)
            .map_err(|e| DbError::corrupt("Coupon", e))?;
        let max_uses = row
            .max_uses
            .map(u32::try_from)
            .transpose()
            .map_err(|_| corrupt(format!("max_uses out of range for {}", row.id)))?;
        let used_count = u32::try_from(row.used_count)
            .map_err(|_| corrupt(format!("used_count out of range for {}", row.id)))?;

        Ok(Coupon {
            id: row.id,
            code: row.code,
            discount,
            min_order_value: Money::from_cents(row.min_order_cents),
            max_uses,
            used_count,
            expires_at: row.expires_at,
            is_active: row.is_active,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// Repository for coupon database operations.
///
/// ## Usage
/// ```rust,ignore
/// let repo = db.coupons();
/// let coupon = repo.find_by_code("SUMMER10").await?;
/// repo.set_active(&coupon.id, false, Utc::now()).await?;
/// ```
#[derive(Debug, Clone)]
pub struct CouponRepository {
    pool: SqlitePool,
}

impl CouponRepository {
    /// Creates a new CouponRepository.
    pub fn new(pool: SqlitePool) -> Self {
        CouponRepository { pool }
    }

    /// Finds a coupon by code. The `code` column is `COLLATE NOCASE`, so
    /// `"summer10"` finds `"SUMMER10"`.
    pub async fn find_by_code(&self, code: &str) -> DbResult<Option<Coupon>> {
        debug!(code = %code, "Looking up coupon by code");

        let sql = format!("SELECT {COUPON_COLUMNS} FROM coupons WHERE code = ?1");
        let row: Option<CouponRow> = sqlx::query_as(&sql)
            .bind(code.trim())
            .fetch_optional(&self.pool)
            .await?;

        row.map(Coupon::try_from).transpose()
    }

    /// Gets a coupon by its ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Coupon>> {
        let mut conn = self.pool.acquire().await?;
        Self::fetch_in(&mut conn, id).await
    }

    /// Lists coupons, newest first.
    ///
    /// ## Arguments
    /// * `include_inactive` - Also return deactivated coupons (admin views)
    pub async fn list(&self, include_inactive: bool) -> DbResult<Vec<Coupon>> {
        let sql = format!(
            "SELECT {COUPON_COLUMNS} FROM coupons WHERE is_active = 1 OR ?1 ORDER BY created_at DESC, code"
        );
        let rows: Vec<CouponRow> = sqlx::query_as(&sql)
            .bind(include_inactive)
            .fetch_all(&self.pool)
            .await?;

        debug!(count = rows.len(), include_inactive, "Listed coupons");
        rows.into_iter().map(Coupon::try_from).collect()
    }

    /// Inserts a new coupon.
    ///
    /// ## Errors
    /// * `DbError::UniqueViolation` - the code is taken (case-insensitively)
    pub async fn insert(&self, coupon: &Coupon) -> DbResult<()> {
        debug!(id = %coupon.id, code = %coupon.code, "Inserting coupon");

        sqlx::query(
            r#"
            INSERT INTO coupons (
                id, code, discount_type, discount_value,
                min_order_cents, max_uses, used_count, expires_at,
                is_active, created_at, updated_at
            ) VALUES (
                ?1, ?2, ?3, ?4,
                ?5, ?6, ?7, ?8,
                ?9, ?10, ?11
            )
            "#,
        )
        .bind(&coupon.id)
        .bind(&coupon.code)
        .bind(coupon.discount.kind())
        .bind(coupon.discount.raw_value())
        .bind(coupon.min_order_value.cents())
        .bind(coupon.max_uses.map(i64::from))
        .bind(i64::from(coupon.used_count))
        .bind(coupon.expires_at)
        .bind(coupon.is_active)
        .bind(coupon.created_at)
        .bind(coupon.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| match DbError::from(e) {
            DbError::UniqueViolation { .. } => DbError::duplicate("code", &coupon.code),
            other => other,
        })?;

        Ok(())
    }

    /// Writes the rule fields of an edited coupon.
    ///
    /// `code`, `used_count` and `is_active` are not touched: the first is
    /// immutable, the second belongs to redemptions, the third to
    /// [`set_active`](Self::set_active).
    pub async fn update_rules(&self, coupon: &Coupon) -> DbResult<()> {
        debug!(id = %coupon.id, "Updating coupon rules");

        let result = sqlx::query(
            r#"
            UPDATE coupons SET
                discount_type = ?2,
                discount_value = ?3,
                min_order_cents = ?4,
                max_uses = ?5,
                expires_at = ?6,
                updated_at = ?7
            WHERE id = ?1
            "#,
        )
        .bind(&coupon.id)
        .bind(coupon.discount.kind())
        .bind(coupon.discount.raw_value())
        .bind(coupon.min_order_value.cents())
        .bind(coupon.max_uses.map(i64::from))
        .bind(coupon.expires_at)
        .bind(coupon.updated_at)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Coupon", &coupon.id));
        }

        Ok(())
    }

    /// Activates or deactivates a coupon (soft delete).
    pub async fn set_active(&self, id: &str, active: bool, now: DateTime<Utc>) -> DbResult<()> {
        debug!(id = %id, active, "Setting coupon active flag");

        let result = sqlx::query("UPDATE coupons SET is_active = ?2, updated_at = ?3 WHERE id = ?1")
            .bind(id)
            .bind(active)
            .bind(now)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Coupon", id));
        }

        Ok(())
    }

    // -------------------------------------------------------------------------
    // Connection-level helpers (shared with OrderRepository transactions)
    // -------------------------------------------------------------------------

    /// Reads a coupon on an existing connection or transaction.
    pub(crate) async fn fetch_in(conn: &mut SqliteConnection, id: &str) -> DbResult<Option<Coupon>> {
        let sql = format!("SELECT {COUPON_COLUMNS} FROM coupons WHERE id = ?1");
        let row: Option<CouponRow> = sqlx::query_as(&sql)
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?;

        row.map(Coupon::try_from).transpose()
    }

    /// Adds one use if the coupon is active and under its cap.
    ///
    /// ## Returns
    /// * `true` - the use was recorded
    /// * `false` - missing, inactive, or the cap is already reached
    pub(crate) async fn increment_usage_in(
        conn: &mut SqliteConnection,
        id: &str,
        now: DateTime<Utc>,
    ) -> DbResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE coupons SET
                used_count = used_count + 1,
                updated_at = ?2
            WHERE id = ?1
              AND is_active = 1
              AND (max_uses IS NULL OR used_count < max_uses)
            "#,
        )
        .bind(id)
        .bind(now)
        .execute(&mut *conn)
        .await?;

        Ok(result.rows_affected() == 1)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

//! # Order Repository
//!
//! Orders and coupon redemptions.
//!
//! ## Redemption Transaction
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  BEGIN                                                                  │
//! │    1. UPDATE coupons SET used_count = used_count + 1   (cap-guarded)    │
//! │         0 rows → already redeemed for this order? → AlreadyRedeemed    │
//! │                  coupon row exists?               → Refused(coupon)     │
//! │                  otherwise                        → CouponMissing       │
//! │    2. INSERT INTO orders                                                │
//! │    3. INSERT INTO coupon_redemptions  (order_id UNIQUE)                 │
//! │  COMMIT                                                                 │
//! │                                                                         │
//! │  Any failure after step 1 rolls the increment back: a use is counted    │
//! │  if and only if its order exists.                                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The increment runs first so the transaction takes SQLite's write lock on
//! its first statement. Starting with a read and upgrading later can fail
//! with `SQLITE_BUSY` under contention.

use chrono::{DateTime, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info, warn};

use crate::error::{DbError, DbResult};
use crate::repository::coupon::CouponRepository;
use coupon_core::{Coupon, Money, Order, Redemption};

/// What happened to a redemption attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RedemptionOutcome {
    /// The order, the redemption and the increment were committed together.
    Committed(Redemption),

    /// This order already redeemed a coupon; nothing was written.
    AlreadyRedeemed(Redemption),

    /// The conditional increment matched no row: the coupon is inactive or
    /// at its cap. Carries the coupon as it is now so callers can say which.
    Refused(Coupon),

    /// No coupon with that id.
    CouponMissing,
}

#[derive(Debug, sqlx::FromRow)]
struct OrderRow {
    id: String,
    subtotal_cents: i64,
    discount_cents: i64,
    total_cents: i64,
    coupon_id: Option<String>,
    created_at: DateTime<Utc>,
}

impl From<OrderRow> for Order {
    fn from(row: OrderRow) -> Self {
        Order {
            id: row.id,
            subtotal: Money::from_cents(row.subtotal_cents),
            discount: Money::from_cents(row.discount_cents),
            total: Money::from_cents(row.total_cents),
            coupon_id: row.coupon_id,
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct RedemptionRow {
    id: String,
    coupon_id: String,
    order_id: String,
    discount_cents: i64,
    redeemed_at: DateTime<Utc>,
}

impl From<RedemptionRow> for Redemption {
    fn from(row: RedemptionRow) -> Self {
        Redemption {
            id: row.id,
            coupon_id: row.coupon_id,
            order_id: row.order_id,
            discount: Money::from_cents(row.discount_cents),
            redeemed_at: row.redeemed_at,
        }
    }
}

/// Repository for orders and redemptions.
#[derive(Debug, Clone)]
pub struct OrderRepository {
    pool: SqlitePool,
}

impl OrderRepository {
    /// Creates a new OrderRepository.
    pub fn new(pool: SqlitePool) -> Self {
        OrderRepository { pool }
    }

    /// Places an order that uses no coupon.
    pub async fn place_order(&self, order: &Order) -> DbResult<()> {
        let mut conn = self.pool.acquire().await?;
        insert_order(&mut conn, order).await
    }

    /// Places `order` and consumes one use of `redemption.coupon_id`,
    /// atomically.
    ///
    /// ## Errors
    /// * `DbError::UniqueViolation` - an order with this id exists but has
    ///   no redemption (it was placed without a coupon)
    /// * anything from the pool or SQLite; the transaction is rolled back
    pub async fn place_order_with_redemption(
        &self,
        order: &Order,
        redemption: &Redemption,
    ) -> DbResult<RedemptionOutcome> {
        debug!(
            order_id = %order.id,
            coupon_id = %redemption.coupon_id,
            "Starting redemption transaction"
        );

        let mut tx = self.pool.begin().await?;

        let counted = CouponRepository::increment_usage_in(
            &mut tx,
            &redemption.coupon_id,
            redemption.redeemed_at,
        )
        .await?;

        if !counted {
            let outcome = if let Some(existing) = fetch_redemption_in(&mut tx, &order.id).await? {
                RedemptionOutcome::AlreadyRedeemed(existing)
            } else {
                match CouponRepository::fetch_in(&mut tx, &redemption.coupon_id).await? {
                    Some(coupon) => RedemptionOutcome::Refused(coupon),
                    None => RedemptionOutcome::CouponMissing,
                }
            };
            tx.rollback().await?;
            debug!(order_id = %order.id, ?outcome, "Redemption not counted");
            return Ok(outcome);
        }

        if let Err(err) = insert_order(&mut tx, order).await {
            tx.rollback().await?;

            if matches!(err, DbError::UniqueViolation { .. }) {
                // Retried checkout: the order exists, report its redemption.
                if let Some(existing) = self.get_redemption_for_order(&order.id).await? {
                    return Ok(RedemptionOutcome::AlreadyRedeemed(existing));
                }
                return Err(DbError::duplicate("orders.id", &order.id));
            }
            warn!(order_id = %order.id, error = %err, "Order insert failed, redemption rolled back");
            return Err(err);
        }

        sqlx::query(
            r#"
            INSERT INTO coupon_redemptions (id, coupon_id, order_id, discount_cents, redeemed_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
        )
        .bind(&redemption.id)
        .bind(&redemption.coupon_id)
        .bind(&redemption.order_id)
        .bind(redemption.discount.cents())
        .bind(redemption.redeemed_at)
        .execute(&mut *tx)
        .await?;

        tx.commit()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;

        info!(
            order_id = %order.id,
            coupon_id = %redemption.coupon_id,
            discount = %redemption.discount,
            "Coupon redeemed"
        );

        Ok(RedemptionOutcome::Committed(redemption.clone()))
    }

    /// Gets an order by its ID.
    pub async fn get_order(&self, id: &str) -> DbResult<Option<Order>> {
        let row: Option<OrderRow> = sqlx::query_as(
            r#"
            SELECT id, subtotal_cents, discount_cents, total_cents, coupon_id, created_at
            FROM orders
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Order::from))
    }

    /// Gets the redemption recorded for an order, if any.
    pub async fn get_redemption_for_order(&self, order_id: &str) -> DbResult<Option<Redemption>> {
        let mut conn = self.pool.acquire().await?;
        fetch_redemption_in(&mut conn, order_id).await
    }

    /// Counts redemptions recorded against a coupon.
    ///
    /// Always equals the coupon's `used_count`; exposed for audits.
    pub async fn count_redemptions(&self, coupon_id: &str) -> DbResult<u32> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM coupon_redemptions WHERE coupon_id = ?1")
            .bind(coupon_id)
            .fetch_one(&self.pool)
            .await?;

        u32::try_from(count).map_err(|_| DbError::Internal(format!("redemption count overflow: {count}")))
    }
}

async fn insert_order(conn: &mut SqliteConnection, order: &Order) -> DbResult<()> {
    sqlx::query(
        r#"
        INSERT INTO orders (id, subtotal_cents, discount_cents, total_cents, coupon_id, created_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6)
        "#,
    )
    .bind(&order.id)
    .bind(order.subtotal.cents())
    .bind(order.discount.cents())
    .bind(order.total.cents())
    .bind(&order.coupon_id)
    .bind(order.created_at)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

async fn fetch_redemption_in(conn: &mut SqliteConnection, order_id: &str) -> DbResult<Option<Redemption>> {
    let row: Option<RedemptionRow> = sqlx::query_as(
        r#"
        SELECT id, coupon_id, order_id, discount_cents, redeemed_at
        FROM coupon_redemptions
        WHERE order_id = ?1
        "#,
    )
    .bind(order_id)
    .fetch_optional(&mut *conn)
    .await?;

    Ok(row.map(Redemption::from))
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use assert_matches::assert_matches;
    use coupon_core::{rules, Discount, Percentage};

    async fn test_db() -> Database {
        Database::new(DbConfig::in_memory()).await.unwrap()
    }

    async fn seed(db: &Database, code: &str, max_uses: Option<u32>) -> Coupon {
        let mut coupon = Coupon::new(code, Discount::Percent(Percentage::from_bps(1000)), Utc::now());
        coupon.max_uses = max_uses;
        db.coupons().insert(&coupon).await.unwrap();
        coupon
    }

    fn order_for(coupon: &Coupon, order_id: &str) -> (Order, Redemption) {
        let now = Utc::now();
        let applied = rules::evaluate(coupon, Money::from_cents(20_000), now).unwrap();
        let order = Order::new(order_id, applied.subtotal, Some(&applied), now);
        let redemption = Redemption::new(&coupon.id, &order, now);
        (order, redemption)
    }

    #[tokio::test]
    async fn test_redemption_commits_order_and_count() {
        let db = test_db().await;
        let coupon = seed(&db, "TENOFF", Some(3)).await;
        let (order, redemption) = order_for(&coupon, "order-1");

        let outcome = db.orders().place_order_with_redemption(&order, &redemption).await.unwrap();
        assert_matches!(outcome, RedemptionOutcome::Committed(r) if r.order_id == "order-1");

        let stored = db.orders().get_order("order-1").await.unwrap().unwrap();
        assert_eq!(stored.discount.cents(), 2_000);
        assert_eq!(stored.total.cents(), 18_000);
        assert_eq!(stored.coupon_id.as_deref(), Some(coupon.id.as_str()));

        let coupon_now = db.coupons().get_by_id(&coupon.id).await.unwrap().unwrap();
        assert_eq!(coupon_now.used_count, 1);
        assert_eq!(db.orders().count_redemptions(&coupon.id).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_cap_is_enforced() {
        let db = test_db().await;
        let coupon = seed(&db, "ONCE", Some(1)).await;

        let (first, r1) = order_for(&coupon, "order-a");
        let (second, r2) = order_for(&coupon, "order-b");

        assert_matches!(
            db.orders().place_order_with_redemption(&first, &r1).await.unwrap(),
            RedemptionOutcome::Committed(_)
        );
        assert_matches!(
            db.orders().place_order_with_redemption(&second, &r2).await.unwrap(),
            RedemptionOutcome::Refused(c) if c.used_count == 1
        );

        // The refused order was not written.
        assert!(db.orders().get_order("order-b").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_retry_same_order_counts_once() {
        let db = test_db().await;
        let coupon = seed(&db, "RETRY", None).await;
        let (order, redemption) = order_for(&coupon, "order-r");

        let first = db.orders().place_order_with_redemption(&order, &redemption).await.unwrap();
        let original = match first {
            RedemptionOutcome::Committed(r) => r,
            other => panic!("expected commit, got {other:?}"),
        };

        let retry = Redemption::new(&coupon.id, &order, Utc::now());
        let again = db.orders().place_order_with_redemption(&order, &retry).await.unwrap();
        assert_eq!(again, RedemptionOutcome::AlreadyRedeemed(original));

        let coupon_now = db.coupons().get_by_id(&coupon.id).await.unwrap().unwrap();
        assert_eq!(coupon_now.used_count, 1);
    }

    #[tokio::test]
    async fn test_retry_after_cap_reports_existing_redemption() {
        let db = test_db().await;
        let coupon = seed(&db, "LASTONE", Some(1)).await;
        let (order, redemption) = order_for(&coupon, "order-x");

        db.orders().place_order_with_redemption(&order, &redemption).await.unwrap();
        let again = db.orders().place_order_with_redemption(&order, &redemption).await.unwrap();
        assert_matches!(again, RedemptionOutcome::AlreadyRedeemed(_));
    }

    #[tokio::test]
    async fn test_failed_order_insert_rolls_back_increment() {
        let db = test_db().await;
        let coupon = seed(&db, "ROLLBACK", Some(5)).await;

        // An order placed earlier without a coupon occupies the id.
        let plain = Order::new("taken", Money::from_cents(20_000), None, Utc::now());
        db.orders().place_order(&plain).await.unwrap();

        let (order, redemption) = order_for(&coupon, "taken");
        let err = db.orders().place_order_with_redemption(&order, &redemption).await.unwrap_err();
        assert_matches!(err, DbError::UniqueViolation { .. });

        let coupon_now = db.coupons().get_by_id(&coupon.id).await.unwrap().unwrap();
        assert_eq!(coupon_now.used_count, 0);
        assert_eq!(db.orders().count_redemptions(&coupon.id).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_missing_and_inactive_coupons() {
        let db = test_db().await;
        let coupon = seed(&db, "GONE", None).await;
        let (order, mut redemption) = order_for(&coupon, "order-m");

        redemption.coupon_id = "no-such-coupon".to_string();
        assert_eq!(
            db.orders().place_order_with_redemption(&order, &redemption).await.unwrap(),
            RedemptionOutcome::CouponMissing
        );

        db.coupons().set_active(&coupon.id, false, Utc::now()).await.unwrap();
        let (order, redemption) = order_for(&coupon, "order-n");
        assert_matches!(
            db.orders().place_order_with_redemption(&order, &redemption).await.unwrap(),
            RedemptionOutcome::Refused(c) if !c.is_active
        );
    }
}

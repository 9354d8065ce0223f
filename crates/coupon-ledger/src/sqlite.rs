//! SQLite-backed [`CouponStore`].

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use coupon_core::{Coupon, Order, Redemption};
use coupon_db::{Database, RedemptionOutcome};

use crate::store::{CommitOutcome, CouponStore, StoreResult};

/// [`CouponStore`] over a shared [`Database`] pool.
///
/// ## Usage
/// ```rust,ignore
/// let db = Database::new(DbConfig::new("./data/coupons.db")).await?;
/// let ledger = CouponLedger::new(SqliteCouponStore::new(db));
/// ```
#[derive(Debug, Clone)]
pub struct SqliteCouponStore {
    db: Database,
}

impl SqliteCouponStore {
    pub fn new(db: Database) -> Self {
        SqliteCouponStore { db }
    }

    pub fn database(&self) -> &Database {
        &self.db
    }
}

#[async_trait]
impl CouponStore for SqliteCouponStore {
    async fn find_by_code(&self, code: &str) -> StoreResult<Option<Coupon>> {
        Ok(self.db.coupons().find_by_code(code).await?)
    }

    async fn find_by_id(&self, id: &str) -> StoreResult<Option<Coupon>> {
        Ok(self.db.coupons().get_by_id(id).await?)
    }

    async fn list(&self, include_inactive: bool) -> StoreResult<Vec<Coupon>> {
        Ok(self.db.coupons().list(include_inactive).await?)
    }

    async fn insert(&self, coupon: &Coupon) -> StoreResult<()> {
        Ok(self.db.coupons().insert(coupon).await?)
    }

    async fn update(&self, coupon: &Coupon) -> StoreResult<()> {
        Ok(self.db.coupons().update_rules(coupon).await?)
    }

    async fn set_active(&self, id: &str, active: bool, now: DateTime<Utc>) -> StoreResult<()> {
        Ok(self.db.coupons().set_active(id, active, now).await?)
    }

    async fn commit_redemption(
        &self,
        coupon_id: &str,
        order: &Order,
        redeemed_at: DateTime<Utc>,
    ) -> StoreResult<CommitOutcome> {
        let redemption = Redemption::new(coupon_id, order, redeemed_at);

        let outcome = match self.db.orders().place_order_with_redemption(order, &redemption).await? {
            RedemptionOutcome::Committed(r) => CommitOutcome::Committed(r),
            RedemptionOutcome::AlreadyRedeemed(r) => CommitOutcome::AlreadyRedeemed(r),
            RedemptionOutcome::Refused(coupon) => CommitOutcome::Refused(coupon),
            RedemptionOutcome::CouponMissing => CommitOutcome::Missing,
        };

        Ok(outcome)
    }

    async fn find_order(&self, order_id: &str) -> StoreResult<Option<Order>> {
        Ok(self.db.orders().get_order(order_id).await?)
    }

    async fn find_redemption(&self, order_id: &str) -> StoreResult<Option<Redemption>> {
        Ok(self.db.orders().get_redemption_for_order(order_id).await?)
    }
}

//! # Coupon Ledger Service
//!
//! Validation, redemption and the admin operations, over any [`CouponStore`].
//!
//! ## Checkout Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Shopper types "summer10" on a $200.00 cart                             │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  validate("summer10", $200.00)      read only                           │
//! │       │  NOT_FOUND / EXPIRED / INACTIVE / USAGE_EXCEEDED / BELOW_MINIMUM│
//! │       ▼                                                                 │
//! │  AppliedCoupon { discount: $20.00, total: $180.00 }                     │
//! │       │                                                                 │
//! │       ▼  shopper pays                                                   │
//! │  redeem(coupon_id, order)           re-checks, then one transaction:    │
//! │       │                             order + redemption + used_count+1   │
//! │       ▼                                                                 │
//! │  Redemption                                                             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Validation is advisory: state can change between `validate` and
//! `redeem`, so `redeem` checks again and the store enforces the cap.

use chrono::Utc;
use tracing::{debug, info, warn};

use coupon_core::validation::{normalize_code, validate_order_id, validate_subtotal};
use coupon_core::{
    rules, AppliedCoupon, Coupon, CouponPatch, Money, NewCoupon, Order, Redemption, Rejection,
    ValidationError,
};

use crate::error::LedgerResult;
use crate::store::{CommitOutcome, CouponStore};

/// The coupon ledger.
///
/// Takes its store by value; construct once at startup and share (e.g. in
/// an `Arc`) across request handlers.
///
/// ```rust,ignore
/// let db = Database::new(config.db_config()).await?;
/// let ledger = CouponLedger::new(SqliteCouponStore::new(db));
/// let applied = ledger.validate("SUMMER10", Money::from_cents(20_000)).await?;
/// ```
#[derive(Debug)]
pub struct CouponLedger<S> {
    store: S,
}

impl<S: CouponStore> CouponLedger<S> {
    pub fn new(store: S) -> Self {
        CouponLedger { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    // =========================================================================
    // Checkout
    // =========================================================================

    /// Checks whether `code` applies to an order of `subtotal` and computes
    /// the discount. Never changes stored state.
    ///
    /// ## Errors
    /// * `InvalidInput` - empty code or negative subtotal
    /// * `Rejected(..)` - the coupon doesn't apply; see [`Rejection`]
    /// * `Unavailable` - storage unreachable
    pub async fn validate(&self, code: &str, subtotal: Money) -> LedgerResult<AppliedCoupon> {
        let code = normalize_code(code)?;
        validate_subtotal(subtotal)?;

        let coupon = self
            .store
            .find_by_code(&code)
            .await?
            .ok_or_else(|| Rejection::not_found(&code))
            .inspect_err(|rejection| debug!(code = %code, %rejection, "Coupon lookup missed"))?;

        match rules::evaluate(&coupon, subtotal, Utc::now()) {
            Ok(applied) => {
                debug!(
                    code = %applied.code,
                    subtotal = %subtotal,
                    discount = %applied.discount,
                    "Coupon validated"
                );
                Ok(applied)
            }
            Err(rejection) => {
                debug!(code = %coupon.code, reason = rejection.code(), "Coupon rejected");
                Err(rejection.into())
            }
        }
    }

    /// Consumes one use of a coupon for `order`.
    ///
    /// Re-reads the coupon and re-checks expiry, the active flag and the
    /// cap, then stores the order, the redemption and the increment
    /// together. Calling again for the same order id returns the original
    /// redemption without counting another use.
    ///
    /// ## Errors
    /// * `Rejected(NotFound)` - unknown coupon id
    /// * `Rejected(Expired | Inactive | UsageExceeded)` - no longer redeemable;
    ///   `UsageExceeded` also when a concurrent checkout took the last use
    /// * `InvalidInput` - bad order id, an order not priced with this
    ///   coupon, or an order id already redeemed with a different coupon
    pub async fn redeem(&self, coupon_id: &str, order: &Order) -> LedgerResult<Redemption> {
        validate_order_id(&order.id)?;
        if order.coupon_id.as_deref() != Some(coupon_id) {
            return Err(ValidationError::InvalidFormat {
                field: "order.coupon_id".to_string(),
                reason: format!("order {} was not priced with coupon {coupon_id}", order.id),
            }
            .into());
        }

        let now = Utc::now();
        let coupon = self
            .store
            .find_by_id(coupon_id)
            .await?
            .ok_or_else(|| Rejection::not_found(coupon_id))?;

        if let Err(rejection) = rules::check_redeemable(&coupon, now) {
            // A retry of an order that already went through still succeeds.
            if let Some(existing) = self.store.find_redemption(&order.id).await? {
                return same_coupon(existing, coupon_id);
            }
            info!(code = %coupon.code, order_id = %order.id, reason = rejection.code(), "Redemption refused");
            return Err(rejection.into());
        }

        match self.store.commit_redemption(coupon_id, order, now).await? {
            CommitOutcome::Committed(redemption) => {
                info!(
                    code = %coupon.code,
                    order_id = %order.id,
                    discount = %redemption.discount,
                    "Coupon redeemed"
                );
                Ok(redemption)
            }
            CommitOutcome::AlreadyRedeemed(redemption) => {
                info!(code = %coupon.code, order_id = %order.id, "Order already redeemed, not counting again");
                same_coupon(redemption, coupon_id)
            }
            CommitOutcome::Refused(latest) => {
                let rejection = rules::check_redeemable(&latest, now)
                    .err()
                    .unwrap_or_else(|| Rejection::UsageExceeded {
                        code: latest.code.clone(),
                        max_uses: latest.max_uses.unwrap_or(latest.used_count),
                    });
                info!(code = %latest.code, order_id = %order.id, reason = rejection.code(), "Redemption lost the race");
                Err(rejection.into())
            }
            CommitOutcome::Missing => {
                warn!(coupon_id = %coupon_id, "Coupon vanished during redemption");
                Err(Rejection::not_found(coupon_id).into())
            }
        }
    }

    /// Validates `code`, prices the order and redeems, returning the order
    /// as stored.
    pub async fn checkout(&self, code: &str, subtotal: Money, order_id: &str) -> LedgerResult<Order> {
        validate_order_id(order_id)?;
        let applied = self.validate(code, subtotal).await?;

        let order = Order::new(order_id.trim(), subtotal, Some(&applied), Utc::now());
        self.redeem(&applied.coupon_id, &order).await?;

        // On a retried checkout the stored order is the original one.
        Ok(self.store.find_order(&order.id).await?.unwrap_or(order))
    }

    // =========================================================================
    // Administration
    // =========================================================================

    /// Creates a coupon.
    ///
    /// ## Errors
    /// * `InvalidInput` - code format, discount range, minimum, cap or expiry
    /// * `DuplicateCode` - the code exists (case-insensitively)
    pub async fn create_coupon(&self, new: NewCoupon) -> LedgerResult<Coupon> {
        let coupon = new.into_coupon(Utc::now())?;
        self.store.insert(&coupon).await?;

        info!(
            id = %coupon.id,
            code = %coupon.code,
            kind = coupon.discount.kind(),
            value = coupon.discount.raw_value(),
            "Coupon created"
        );
        Ok(coupon)
    }

    /// Edits a coupon's rule fields. The code and usage count never change.
    pub async fn update_coupon(&self, id: &str, patch: &CouponPatch) -> LedgerResult<Coupon> {
        let mut coupon = self.find_by_id(id).await?;
        coupon.apply_patch(patch, Utc::now())?;
        self.store.update(&coupon).await?;

        info!(id = %coupon.id, code = %coupon.code, "Coupon rules updated");
        Ok(coupon)
    }

    /// Activates or deactivates a coupon.
    pub async fn set_active(&self, id: &str, active: bool) -> LedgerResult<Coupon> {
        self.store.set_active(id, active, Utc::now()).await?;
        let coupon = self.find_by_id(id).await?;

        info!(id = %coupon.id, code = %coupon.code, active, "Coupon activation changed");
        Ok(coupon)
    }

    /// Looks a coupon up by code, whatever its state.
    pub async fn get_coupon(&self, code: &str) -> LedgerResult<Coupon> {
        let code = normalize_code(code)?;
        self.store
            .find_by_code(&code)
            .await?
            .ok_or_else(|| Rejection::not_found(code).into())
    }

    pub async fn list_coupons(&self, include_inactive: bool) -> LedgerResult<Vec<Coupon>> {
        Ok(self.store.list(include_inactive).await?)
    }

    async fn find_by_id(&self, id: &str) -> LedgerResult<Coupon> {
        self.store
            .find_by_id(id)
            .await?
            .ok_or_else(|| Rejection::not_found(id).into())
    }
}

/// A replayed order id only counts as the same redemption when it was made
/// with the same coupon.
fn same_coupon(existing: Redemption, coupon_id: &str) -> LedgerResult<Redemption> {
    if existing.coupon_id == coupon_id {
        return Ok(existing);
    }

    warn!(
        order_id = %existing.order_id,
        redeemed_with = %existing.coupon_id,
        requested = %coupon_id,
        "Order already redeemed with another coupon"
    );
    Err(ValidationError::InvalidFormat {
        field: "order.id".to_string(),
        reason: format!("order {} already redeemed a different coupon", existing.order_id),
    }
    .into())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ErrorCode, LedgerError};
    use crate::memory::MemoryCouponStore;
    use crate::sqlite::SqliteCouponStore;
    use assert_matches::assert_matches;
    use chrono::Duration;
    use coupon_core::{Discount, Percentage};
    use coupon_db::{Database, DbConfig};
    use std::sync::Arc;

    fn ledger() -> CouponLedger<MemoryCouponStore> {
        CouponLedger::new(MemoryCouponStore::new())
    }

    async fn sqlite_ledger() -> CouponLedger<SqliteCouponStore> {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        CouponLedger::new(SqliteCouponStore::new(db))
    }

    fn percent(code: &str, pct: u32) -> NewCoupon {
        NewCoupon {
            code: code.to_string(),
            discount: Discount::Percent(Percentage::from_bps(pct * 100)),
            min_order_value: Money::zero(),
            max_uses: None,
            expires_at: None,
        }
    }

    fn fixed(code: &str, cents: i64) -> NewCoupon {
        NewCoupon {
            discount: Discount::Fixed(Money::from_cents(cents)),
            ..percent(code, 1)
        }
    }

    fn cents(c: i64) -> Money {
        Money::from_cents(c)
    }

    fn order_for(applied: &AppliedCoupon, order_id: &str) -> Order {
        Order::new(order_id, applied.subtotal, Some(applied), Utc::now())
    }

    // -------------------------------------------------------------------------
    // validate
    // -------------------------------------------------------------------------

    #[tokio::test]
    async fn test_percent_discount() {
        let ledger = ledger();
        ledger.create_coupon(percent("TEN", 10)).await.unwrap();

        let applied = ledger.validate("ten", cents(20_000)).await.unwrap();
        assert_eq!(applied.code, "TEN");
        assert_eq!(applied.discount, cents(2_000));
        assert_eq!(applied.total, cents(18_000));
    }

    #[tokio::test]
    async fn test_fixed_discount_capped_at_subtotal() {
        let ledger = ledger();
        ledger.create_coupon(fixed("FIFTY", 5_000)).await.unwrap();

        let applied = ledger.validate("FIFTY", cents(3_000)).await.unwrap();
        assert_eq!(applied.discount, cents(3_000));
        assert_eq!(applied.total, Money::zero());
    }

    #[tokio::test]
    async fn test_minimum_order_boundary() {
        let ledger = ledger();
        let mut new = fixed("MIN100", 1_000);
        new.min_order_value = cents(10_000);
        ledger.create_coupon(new).await.unwrap();

        let err = ledger.validate("MIN100", cents(9_999)).await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::BelowMinimum);

        assert!(ledger.validate("MIN100", cents(10_000)).await.is_ok());
    }

    #[tokio::test]
    async fn test_unknown_code_and_bad_input() {
        let ledger = ledger();

        assert_eq!(
            ledger.validate("NOPE", cents(100)).await.unwrap_err().code(),
            ErrorCode::NotFound
        );
        assert_eq!(
            ledger.validate("   ", cents(100)).await.unwrap_err().code(),
            ErrorCode::InvalidInput
        );

        ledger.create_coupon(percent("TEN", 10)).await.unwrap();
        assert_eq!(
            ledger.validate("TEN", cents(-1)).await.unwrap_err().code(),
            ErrorCode::InvalidInput
        );
    }

    #[tokio::test]
    async fn test_expired_wins_over_inactive_and_usage() {
        let ledger = ledger();
        let now = Utc::now();

        // Stored directly: the admin path refuses past expiries.
        let mut coupon = Coupon::new("OLD", Discount::Fixed(cents(500)), now - Duration::days(30))
            .with_max_uses(1)
            .with_expiry(now - Duration::days(1));
        coupon.is_active = false;
        coupon.used_count = 1;
        ledger.store().insert(&coupon).await.unwrap();

        let err = ledger.validate("OLD", cents(10_000)).await.unwrap_err();
        assert_matches!(err, LedgerError::Rejected(Rejection::Expired { .. }));
    }

    #[tokio::test]
    async fn test_inactive_and_exhausted() {
        let ledger = ledger();
        let paused = ledger.create_coupon(percent("PAUSED", 10)).await.unwrap();
        ledger.set_active(&paused.id, false).await.unwrap();
        assert_eq!(
            ledger.validate("PAUSED", cents(1_000)).await.unwrap_err().code(),
            ErrorCode::Inactive
        );

        let mut once = percent("ONCE", 10);
        once.max_uses = Some(1);
        ledger.create_coupon(once).await.unwrap();
        ledger.checkout("ONCE", cents(1_000), "order-1").await.unwrap();
        assert_eq!(
            ledger.validate("ONCE", cents(1_000)).await.unwrap_err().code(),
            ErrorCode::UsageExceeded
        );
    }

    #[tokio::test]
    async fn test_validate_never_mutates() {
        let ledger = ledger();
        let mut new = percent("LOOK", 10);
        new.max_uses = Some(2);
        let coupon = ledger.create_coupon(new).await.unwrap();

        for _ in 0..5 {
            ledger.validate("LOOK", cents(5_000)).await.unwrap();
        }

        let stored = ledger.get_coupon("look").await.unwrap();
        assert_eq!(stored.used_count, 0);
        assert_eq!(stored.updated_at, coupon.updated_at);
    }

    #[tokio::test]
    async fn test_unavailable_is_not_a_rejection() {
        let ledger = ledger();
        ledger.create_coupon(percent("TEN", 10)).await.unwrap();
        ledger.store().set_offline(true);

        let err = ledger.validate("TEN", cents(1_000)).await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::Unavailable);
        assert!(!err.is_rejection());
    }

    // -------------------------------------------------------------------------
    // redeem / checkout
    // -------------------------------------------------------------------------

    #[tokio::test]
    async fn test_redeem_same_order_twice_counts_once() {
        let ledger = ledger();
        let coupon = ledger.create_coupon(percent("TWICE", 10)).await.unwrap();

        let applied = ledger.validate("TWICE", cents(10_000)).await.unwrap();
        let order = order_for(&applied, "order-7");

        let first = ledger.redeem(&coupon.id, &order).await.unwrap();
        let second = ledger.redeem(&coupon.id, &order).await.unwrap();
        assert_eq!(first, second);

        assert_eq!(ledger.get_coupon("TWICE").await.unwrap().used_count, 1);
    }

    #[tokio::test]
    async fn test_retry_after_last_use_still_succeeds() {
        let ledger = ledger();
        let mut once = percent("LAST", 10);
        once.max_uses = Some(1);
        ledger.create_coupon(once).await.unwrap();

        let first = ledger.checkout("LAST", cents(2_000), "order-9").await.unwrap();

        // The coupon is exhausted now, but replaying the same order is fine.
        let coupon = ledger.get_coupon("LAST").await.unwrap();
        let redemption = ledger.redeem(&coupon.id, &first).await.unwrap();
        assert_eq!(redemption.order_id, "order-9");
        assert_eq!(coupon.used_count, 1);
    }

    #[tokio::test]
    async fn test_redeem_unknown_and_mismatched() {
        let ledger = ledger();
        let coupon = ledger.create_coupon(percent("TEN", 10)).await.unwrap();
        let applied = ledger.validate("TEN", cents(1_000)).await.unwrap();
        let order = order_for(&applied, "order-1");

        let mut missing = Order::new("order-2", cents(1_000), None, Utc::now());
        missing.coupon_id = Some("missing-id".to_string());
        assert_eq!(
            ledger.redeem("missing-id", &missing).await.unwrap_err().code(),
            ErrorCode::NotFound
        );

        let other = ledger.create_coupon(percent("OTHER", 5)).await.unwrap();
        assert_eq!(
            ledger.redeem(&other.id, &order).await.unwrap_err().code(),
            ErrorCode::InvalidInput
        );
        assert!(ledger.redeem(&coupon.id, &order).await.is_ok());
    }

    #[tokio::test]
    async fn test_redeem_requires_order_priced_with_coupon() {
        let ledger = ledger();
        let mut once = fixed("PLAIN", 500);
        once.max_uses = Some(1);
        let coupon = ledger.create_coupon(once).await.unwrap();

        let plain = Order::new("o-plain", cents(5_000), None, Utc::now());
        let err = ledger.redeem(&coupon.id, &plain).await.unwrap_err();
        assert_matches!(err, LedgerError::InvalidInput(_));

        assert_eq!(ledger.get_coupon("PLAIN").await.unwrap().used_count, 0);
        assert_eq!(ledger.store().find_order("o-plain").await.unwrap(), None);
    }

    async fn redeem_other_coupon_for_same_order<S: CouponStore>(ledger: &CouponLedger<S>) {
        ledger.create_coupon(percent("AAAA", 10)).await.unwrap();
        let b = ledger.create_coupon(percent("BBBB", 20)).await.unwrap();

        let first = ledger.checkout("AAAA", cents(5_000), "order-x").await.unwrap();

        let applied_b = ledger.validate("BBBB", cents(5_000)).await.unwrap();
        let err = ledger
            .redeem(&b.id, &order_for(&applied_b, "order-x"))
            .await
            .unwrap_err();
        assert_matches!(err, LedgerError::InvalidInput(_));

        assert_eq!(ledger.get_coupon("BBBB").await.unwrap().used_count, 0);
        assert_eq!(ledger.get_coupon("AAAA").await.unwrap().used_count, 1);
        assert_eq!(ledger.store().find_order("order-x").await.unwrap(), Some(first));
    }

    #[tokio::test]
    async fn test_order_redeemed_with_other_coupon_is_refused_in_memory() {
        redeem_other_coupon_for_same_order(&ledger()).await;
    }

    #[tokio::test]
    async fn test_order_redeemed_with_other_coupon_is_refused_in_sqlite() {
        redeem_other_coupon_for_same_order(&sqlite_ledger().await).await;
    }

    #[tokio::test]
    async fn test_order_redeemed_with_other_coupon_is_refused_when_paused() {
        let ledger = ledger();
        ledger.create_coupon(percent("AAAA", 10)).await.unwrap();
        let b = ledger.create_coupon(percent("BBBB", 20)).await.unwrap();
        ledger.checkout("AAAA", cents(5_000), "order-y").await.unwrap();

        // B is paused, so the replay is decided before the commit.
        let applied_b = ledger.validate("BBBB", cents(5_000)).await.unwrap();
        ledger.set_active(&b.id, false).await.unwrap();

        let err = ledger
            .redeem(&b.id, &order_for(&applied_b, "order-y"))
            .await
            .unwrap_err();
        assert_matches!(err, LedgerError::InvalidInput(_));
        assert_eq!(ledger.get_coupon("BBBB").await.unwrap().used_count, 0);
    }

    #[tokio::test]
    async fn test_checkout_persists_order() {
        let ledger = sqlite_ledger().await;
        let coupon = ledger.create_coupon(percent("SAVE15", 15)).await.unwrap();

        let order = ledger.checkout("save15", cents(8_000), "web-1001").await.unwrap();
        assert_eq!(order.discount, cents(1_200));
        assert_eq!(order.total, cents(6_800));
        assert_eq!(order.coupon_id.as_deref(), Some(coupon.id.as_str()));

        let stored = ledger.store().database().orders().get_order("web-1001").await.unwrap();
        assert_eq!(stored, Some(order));
        assert_eq!(ledger.get_coupon("SAVE15").await.unwrap().used_count, 1);
    }

    #[tokio::test]
    async fn test_failed_order_write_leaves_count_unchanged() {
        let ledger = sqlite_ledger().await;
        let coupon = ledger.create_coupon(fixed("KEEP", 500)).await.unwrap();

        // The order id is already used by a coupon-less order.
        let plain = Order::new("dup-1", cents(3_000), None, Utc::now());
        ledger.store().database().orders().place_order(&plain).await.unwrap();

        let applied = ledger.validate("KEEP", cents(3_000)).await.unwrap();
        let err = ledger.redeem(&coupon.id, &order_for(&applied, "dup-1")).await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::InvalidInput);

        assert_eq!(ledger.get_coupon("KEEP").await.unwrap().used_count, 0);
    }

    async fn race<S: CouponStore + 'static>(ledger: Arc<CouponLedger<S>>, attempts: usize) -> (usize, usize) {
        let mut handles = Vec::new();
        for i in 0..attempts {
            let ledger = Arc::clone(&ledger);
            handles.push(tokio::spawn(async move {
                ledger.checkout("RACE", Money::from_cents(5_000), &format!("order-{i}")).await
            }));
        }

        let (mut ok, mut exceeded) = (0, 0);
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => ok += 1,
                Err(e) if e.code() == ErrorCode::UsageExceeded => exceeded += 1,
                Err(e) => panic!("unexpected error: {e}"),
            }
        }
        (ok, exceeded)
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_redemptions_respect_cap_in_memory() {
        let ledger = Arc::new(ledger());
        let mut new = percent("RACE", 10);
        new.max_uses = Some(3);
        ledger.create_coupon(new).await.unwrap();

        let (ok, exceeded) = race(Arc::clone(&ledger), 20).await;
        assert_eq!(ok, 3);
        assert_eq!(exceeded, 17);

        let coupon = ledger.get_coupon("RACE").await.unwrap();
        assert_eq!(coupon.used_count, 3);
        assert_eq!(ledger.store().redemption_count(&coupon.id).await, 3);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_redemptions_respect_cap_in_sqlite() {
        let ledger = Arc::new(sqlite_ledger().await);
        let mut new = fixed("RACE", 1_000);
        new.max_uses = Some(5);
        ledger.create_coupon(new).await.unwrap();

        let (ok, exceeded) = race(Arc::clone(&ledger), 12).await;
        assert_eq!(ok, 5);
        assert_eq!(exceeded, 7);

        let coupon = ledger.get_coupon("RACE").await.unwrap();
        assert_eq!(coupon.used_count, 5);
        let counted = ledger.store().database().orders().count_redemptions(&coupon.id).await.unwrap();
        assert_eq!(counted, 5);
    }

    /// A file database with its WAL siblings, removed on drop.
    struct ScratchDb(std::path::PathBuf);

    impl ScratchDb {
        fn new(name: &str) -> Self {
            let nanos = std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .unwrap()
                .as_nanos();
            ScratchDb(std::env::temp_dir().join(format!("{name}-{}-{nanos}.db", std::process::id())))
        }
    }

    impl Drop for ScratchDb {
        fn drop(&mut self) {
            for suffix in ["", "-wal", "-shm"] {
                let mut path = self.0.clone().into_os_string();
                path.push(suffix);
                let _ = std::fs::remove_file(path);
            }
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 8)]
    async fn test_concurrent_redemptions_respect_cap_in_sqlite_file() {
        let scratch = ScratchDb::new("coupon-race");
        let db = Database::new(DbConfig::new(&scratch.0).max_connections(8)).await.unwrap();
        let ledger = Arc::new(CouponLedger::new(SqliteCouponStore::new(db.clone())));

        let mut new = fixed("RACE", 1_000);
        new.max_uses = Some(5);
        ledger.create_coupon(new).await.unwrap();

        let (ok, exceeded) = race(Arc::clone(&ledger), 40).await;
        assert_eq!(ok, 5);
        assert_eq!(exceeded, 35);

        let coupon = ledger.get_coupon("RACE").await.unwrap();
        assert_eq!(coupon.used_count, 5);
        assert_eq!(db.orders().count_redemptions(&coupon.id).await.unwrap(), 5);

        db.close().await;
    }

    // -------------------------------------------------------------------------
    // administration
    // -------------------------------------------------------------------------

    #[tokio::test]
    async fn test_create_rejects_duplicates_and_bad_fields() {
        let ledger = sqlite_ledger().await;
        let created = ledger.create_coupon(percent(" summer10 ", 10)).await.unwrap();
        assert_eq!(created.code, "SUMMER10");

        assert_eq!(
            ledger.create_coupon(percent("Summer10", 20)).await.unwrap_err().code(),
            ErrorCode::DuplicateCode
        );
        assert_eq!(
            ledger.create_coupon(percent("X", 10)).await.unwrap_err().code(),
            ErrorCode::InvalidInput
        );
        assert_eq!(
            ledger.create_coupon(percent("TOOMUCH", 101)).await.unwrap_err().code(),
            ErrorCode::InvalidInput
        );
    }

    #[tokio::test]
    async fn test_update_cannot_drop_cap_below_usage() {
        let ledger = ledger();
        let mut new = percent("EDIT", 10);
        new.max_uses = Some(5);
        let coupon = ledger.create_coupon(new).await.unwrap();
        ledger.checkout("EDIT", cents(1_000), "o-1").await.unwrap();
        ledger.checkout("EDIT", cents(1_000), "o-2").await.unwrap();

        let lower = CouponPatch {
            max_uses: Some(Some(1)),
            ..Default::default()
        };
        assert_eq!(
            ledger.update_coupon(&coupon.id, &lower).await.unwrap_err().code(),
            ErrorCode::InvalidInput
        );

        let uncapped = CouponPatch {
            max_uses: Some(None),
            discount: Some(Discount::Fixed(cents(250))),
            ..Default::default()
        };
        let updated = ledger.update_coupon(&coupon.id, &uncapped).await.unwrap();
        assert_eq!(updated.max_uses, None);
        assert_eq!(updated.used_count, 2);

        let applied = ledger.validate("EDIT", cents(1_000)).await.unwrap();
        assert_eq!(applied.discount, cents(250));
    }

    #[tokio::test]
    async fn test_set_active_round_trip_and_listing() {
        let ledger = sqlite_ledger().await;
        let coupon = ledger.create_coupon(percent("TOGGLE", 10)).await.unwrap();
        ledger.create_coupon(percent("STAYS", 10)).await.unwrap();

        let off = ledger.set_active(&coupon.id, false).await.unwrap();
        assert!(!off.is_active);
        assert_eq!(ledger.list_coupons(false).await.unwrap().len(), 1);
        assert_eq!(ledger.list_coupons(true).await.unwrap().len(), 2);

        let on = ledger.set_active(&coupon.id, true).await.unwrap();
        assert!(on.is_active);
        assert!(ledger.validate("TOGGLE", cents(1_000)).await.is_ok());

        assert_eq!(
            ledger.set_active("missing", true).await.unwrap_err().code(),
            ErrorCode::NotFound
        );
    }
}

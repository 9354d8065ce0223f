//! In-memory [`CouponStore`] for tests and previews.
//!
//! One `tokio::sync::Mutex` guards all state, so a redemption's check and
//! increment are a single critical section, the same guarantee the SQLite
//! store gets from its conditional `UPDATE`.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use coupon_core::{Coupon, Order, Redemption};
use tokio::sync::Mutex;

use crate::store::{CommitOutcome, CouponStore, StoreError, StoreResult};

#[derive(Debug, Default)]
struct State {
    coupons: HashMap<String, Coupon>,
    orders: HashMap<String, Order>,
    /// Keyed by order id.
    redemptions: HashMap<String, Redemption>,
}

impl State {
    fn code_taken(&self, code: &str) -> bool {
        self.coupons.values().any(|c| c.code.eq_ignore_ascii_case(code))
    }
}

#[derive(Debug, Default)]
pub struct MemoryCouponStore {
    state: Mutex<State>,
    offline: AtomicBool,
}

impl MemoryCouponStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every call fail with [`StoreError::Unavailable`] until reset.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    fn check_online(&self) -> StoreResult<()> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("memory store is offline".to_string()));
        }
        Ok(())
    }

    /// Number of redemptions recorded for a coupon.
    pub async fn redemption_count(&self, coupon_id: &str) -> usize {
        let state = self.state.lock().await;
        state
            .redemptions
            .values()
            .filter(|r| r.coupon_id == coupon_id)
            .count()
    }
}

#[async_trait]
impl CouponStore for MemoryCouponStore {
    async fn find_by_code(&self, code: &str) -> StoreResult<Option<Coupon>> {
        self.check_online()?;
        let state = self.state.lock().await;
        let code = code.trim();
        Ok(state
            .coupons
            .values()
            .find(|c| c.code.eq_ignore_ascii_case(code))
            .cloned())
    }

    async fn find_by_id(&self, id: &str) -> StoreResult<Option<Coupon>> {
        self.check_online()?;
        Ok(self.state.lock().await.coupons.get(id).cloned())
    }

    async fn list(&self, include_inactive: bool) -> StoreResult<Vec<Coupon>> {
        self.check_online()?;
        let state = self.state.lock().await;
        let mut coupons: Vec<Coupon> = state
            .coupons
            .values()
            .filter(|c| include_inactive || c.is_active)
            .cloned()
            .collect();
        coupons.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| a.code.cmp(&b.code)));
        Ok(coupons)
    }

    async fn insert(&self, coupon: &Coupon) -> StoreResult<()> {
        self.check_online()?;
        let mut state = self.state.lock().await;
        if state.code_taken(&coupon.code) {
            return Err(StoreError::Duplicate {
                field: "code".to_string(),
                value: coupon.code.clone(),
            });
        }
        state.coupons.insert(coupon.id.clone(), coupon.clone());
        Ok(())
    }

    async fn update(&self, coupon: &Coupon) -> StoreResult<()> {
        self.check_online()?;
        let mut state = self.state.lock().await;
        let stored = state.coupons.get_mut(&coupon.id).ok_or_else(|| StoreError::NotFound {
            entity: "Coupon".to_string(),
            id: coupon.id.clone(),
        })?;

        if coupon.max_uses.is_some_and(|max| stored.used_count > max) {
            return Err(StoreError::Constraint(format!(
                "max_uses below used_count for {}",
                coupon.code
            )));
        }

        stored.discount = coupon.discount;
        stored.min_order_value = coupon.min_order_value;
        stored.max_uses = coupon.max_uses;
        stored.expires_at = coupon.expires_at;
        stored.updated_at = coupon.updated_at;
        Ok(())
    }

    async fn set_active(&self, id: &str, active: bool, now: DateTime<Utc>) -> StoreResult<()> {
        self.check_online()?;
        let mut state = self.state.lock().await;
        let stored = state.coupons.get_mut(id).ok_or_else(|| StoreError::NotFound {
            entity: "Coupon".to_string(),
            id: id.to_string(),
        })?;
        stored.is_active = active;
        stored.updated_at = now;
        Ok(())
    }

    async fn commit_redemption(
        &self,
        coupon_id: &str,
        order: &Order,
        redeemed_at: DateTime<Utc>,
    ) -> StoreResult<CommitOutcome> {
        self.check_online()?;
        let mut state = self.state.lock().await;

        if let Some(existing) = state.redemptions.get(&order.id) {
            return Ok(CommitOutcome::AlreadyRedeemed(existing.clone()));
        }
        if state.orders.contains_key(&order.id) {
            return Err(StoreError::Duplicate {
                field: "orders.id".to_string(),
                value: order.id.clone(),
            });
        }

        let Some(coupon) = state.coupons.get_mut(coupon_id) else {
            return Ok(CommitOutcome::Missing);
        };
        if !coupon.is_active || coupon.is_exhausted() {
            return Ok(CommitOutcome::Refused(coupon.clone()));
        }

        coupon.used_count += 1;
        coupon.updated_at = redeemed_at;

        let redemption = Redemption::new(coupon_id, order, redeemed_at);
        state.orders.insert(order.id.clone(), order.clone());
        state.redemptions.insert(order.id.clone(), redemption.clone());

        Ok(CommitOutcome::Committed(redemption))
    }

    async fn find_order(&self, order_id: &str) -> StoreResult<Option<Order>> {
        self.check_online()?;
        Ok(self.state.lock().await.orders.get(order_id).cloned())
    }

    async fn find_redemption(&self, order_id: &str) -> StoreResult<Option<Redemption>> {
        self.check_online()?;
        Ok(self.state.lock().await.redemptions.get(order_id).cloned())
    }
}

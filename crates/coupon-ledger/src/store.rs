//! # Coupon Store
//!
//! The storage contract the ledger talks to.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  CouponLedger<S: CouponStore>                                           │
//! │        │                                                                │
//! │        ├──► SqliteCouponStore   (coupon_db::Database, production)       │
//! │        └──► MemoryCouponStore   (tests, previews)                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Implementations must make [`CouponStore::commit_redemption`] atomic:
//! the order, the redemption record and the usage increment land together
//! or not at all, and the increment never takes `used_count` past
//! `max_uses`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use coupon_core::{Coupon, Order, Redemption};
use coupon_db::DbError;
use thiserror::Error;

/// Result of [`CouponStore::commit_redemption`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommitOutcome {
    /// Order, redemption and increment were stored.
    Committed(Redemption),

    /// The order already carries a redemption; nothing changed.
    AlreadyRedeemed(Redemption),

    /// The coupon was inactive or at its cap when the increment ran.
    /// Holds the coupon as stored at that moment.
    Refused(Coupon),

    /// The coupon id does not exist.
    Missing,
}

/// Storage failures, split by what the caller should do about them.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Storage can't be reached right now (connection, pool, lock timeout).
    #[error("Storage unavailable: {0}")]
    Unavailable(String),

    /// A unique key is taken.
    #[error("Duplicate {field}: '{value}'")]
    Duplicate { field: String, value: String },

    /// The row to change does not exist.
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// A stored invariant refused the write (e.g. `used_count <= max_uses`).
    #[error("Constraint violated: {0}")]
    Constraint(String),

    /// Anything else.
    #[error("Storage error: {0}")]
    Internal(String),
}

impl From<DbError> for StoreError {
    fn from(err: DbError) -> Self {
        if err.is_unavailable() {
            return StoreError::Unavailable(err.to_string());
        }

        match err {
            DbError::UniqueViolation { field, value } => StoreError::Duplicate { field, value },
            DbError::NotFound { entity, id } => StoreError::NotFound { entity, id },
            DbError::CheckViolation { message } => StoreError::Constraint(message),
            other => StoreError::Internal(other.to_string()),
        }
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Coupon persistence.
///
/// Codes are matched case-insensitively. Lookups return `Ok(None)` for
/// missing rows; only failures to reach storage are errors.
#[async_trait]
pub trait CouponStore: Send + Sync {
    async fn find_by_code(&self, code: &str) -> StoreResult<Option<Coupon>>;

    async fn find_by_id(&self, id: &str) -> StoreResult<Option<Coupon>>;

    /// Newest first. Inactive coupons only when `include_inactive`.
    async fn list(&self, include_inactive: bool) -> StoreResult<Vec<Coupon>>;

    /// Fails with [`StoreError::Duplicate`] when the code is taken.
    async fn insert(&self, coupon: &Coupon) -> StoreResult<()>;

    /// Writes the rule fields (discount, minimum, cap, expiry).
    async fn update(&self, coupon: &Coupon) -> StoreResult<()>;

    async fn set_active(&self, id: &str, active: bool, now: DateTime<Utc>) -> StoreResult<()>;

    /// Places `order` and consumes one use of `coupon_id`, atomically.
    async fn commit_redemption(
        &self,
        coupon_id: &str,
        order: &Order,
        redeemed_at: DateTime<Utc>,
    ) -> StoreResult<CommitOutcome>;

    async fn find_order(&self, order_id: &str) -> StoreResult<Option<Order>>;

    async fn find_redemption(&self, order_id: &str) -> StoreResult<Option<Redemption>>;
}

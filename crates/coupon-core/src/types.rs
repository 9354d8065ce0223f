//! # Domain Types
//!
//! Core domain types used throughout the coupon workspace.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │     Coupon      │   │     Order       │   │   Redemption    │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  id (UUID)      │   │  id             │   │  coupon_id (FK) │       │
//! │  │  code (business)│   │  subtotal       │   │  order_id (uniq)│       │
//! │  │  discount       │   │  discount       │   │  discount       │       │
//! │  │  used_count     │   │  coupon_id      │   │  redeemed_at    │       │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────┘       │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │    Discount     │   │  CouponStatus   │   │  AppliedCoupon  │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  Percent(bps)   │   │  Active         │   │  validate()     │       │
//! │  │  Fixed(Money)   │   │  Inactive       │   │  result         │       │
//! │  └─────────────────┘   │  Expired        │   └─────────────────┘       │
//! │                        │  Exhausted      │                              │
//! │                        └─────────────────┘                              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Dual-Key Identity Pattern
//! - `id`: UUID v4, immutable, used for relations (orders, redemptions)
//! - `code`: what the shopper types; unique, stored upper-cased

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use ts_rs::TS;
use uuid::Uuid;

use crate::error::ValidationError;
use crate::money::{Money, Percentage};
use crate::validation;

// =============================================================================
// Discount
// =============================================================================

/// How much a coupon takes off.
///
/// Closed set: a coupon is either a percentage of the subtotal or a fixed
/// amount. Persisted as `discount_type` + `discount_value`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Discount {
    /// Percentage of the subtotal, `(0%, 100%]`.
    Percent(Percentage),
    /// Fixed amount off, never more than the subtotal.
    Fixed(Money),
}

impl Discount {
    /// Column value for `discount_type`.
    pub const fn kind(&self) -> &'static str {
        match self {
            Discount::Percent(_) => "percent",
            Discount::Fixed(_) => "fixed",
        }
    }

    /// Column value for `discount_value`: basis points or cents.
    pub const fn raw_value(&self) -> i64 {
        match self {
            Discount::Percent(rate) => rate.bps() as i64,
            Discount::Fixed(amount) => amount.cents(),
        }
    }

    /// Rebuilds a discount from its stored columns.
    pub fn from_parts(kind: &str, value: i64) -> Result<Self, ValidationError> {
        match kind {
            "percent" => {
                let bps = u32::try_from(value).map_err(|_| ValidationError::OutOfRange {
                    field: "discount_value".to_string(),
                    min: 1,
                    max: crate::FULL_PERCENT_BPS as i64,
                })?;
                Ok(Discount::Percent(Percentage::from_bps(bps)))
            }
            "fixed" => Ok(Discount::Fixed(Money::from_cents(value))),
            _ => Err(ValidationError::NotAllowed {
                field: "discount_type".to_string(),
                allowed: vec!["percent".to_string(), "fixed".to_string()],
            }),
        }
    }

    /// Discount for a given subtotal. Never exceeds the subtotal and never
    /// goes negative.
    ///
    /// ## Example
    /// ```rust
    /// use coupon_core::{Discount, Money};
    ///
    /// let fifty_off = Discount::Fixed(Money::from_cents(5_000));
    /// assert_eq!(fifty_off.amount_for(Money::from_cents(3_000)).cents(), 3_000);
    /// ```
    pub fn amount_for(&self, subtotal: Money) -> Money {
        if !subtotal.is_positive() {
            return Money::zero();
        }

        let raw = match self {
            Discount::Percent(rate) => subtotal.percent_of(*rate),
            Discount::Fixed(amount) => *amount,
        };

        raw.clamp(Money::zero(), subtotal)
    }
}

// =============================================================================
// Coupon Status
// =============================================================================

/// Conceptual lifecycle state of a coupon.
///
/// ```text
/// Active ──deactivate──► Inactive ──reactivate──► Active
/// Active ──time passes──► Expired      (irreversible)
/// Active ──last use─────► Exhausted    (until max_uses is raised)
/// ```
///
/// Only `Active` accepts redemptions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum CouponStatus {
    Active,
    Inactive,
    Expired,
    Exhausted,
}

// =============================================================================
// Coupon
// =============================================================================

/// A discount rule applicable to an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Coupon {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// Normalized (trimmed, upper-case) code.
    pub code: String,

    pub discount: Discount,

    /// Subtotal must be at least this for the coupon to apply.
    pub min_order_value: Money,

    /// Total redemptions allowed; `None` means unlimited.
    pub max_uses: Option<u32>,

    /// Successful redemptions so far.
    pub used_count: u32,

    /// Invalid strictly after this instant; `None` means no expiry.
    #[ts(as = "Option<String>")]
    pub expires_at: Option<DateTime<Utc>>,

    /// Soft on/off switch for administrators.
    pub is_active: bool,

    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,

    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Coupon {
    /// Creates an active, unlimited, never-expiring coupon with no minimum.
    ///
    /// The code is normalized the same way lookups are.
    pub fn new(code: &str, discount: Discount, now: DateTime<Utc>) -> Self {
        Coupon {
            id: Uuid::new_v4().to_string(),
            code: validation::normalize_code_lossy(code),
            discount,
            min_order_value: Money::zero(),
            max_uses: None,
            used_count: 0,
            expires_at: None,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_min_order_value(mut self, min: Money) -> Self {
        self.min_order_value = min;
        self
    }

    pub fn with_max_uses(mut self, max_uses: u32) -> Self {
        self.max_uses = Some(max_uses);
        self
    }

    pub fn with_expiry(mut self, expires_at: DateTime<Utc>) -> Self {
        self.expires_at = Some(expires_at);
        self
    }

    /// True strictly after `expires_at`.
    #[inline]
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|expires_at| now > expires_at)
    }

    /// True when the usage cap has been reached.
    #[inline]
    pub fn is_exhausted(&self) -> bool {
        self.max_uses
            .is_some_and(|max_uses| self.used_count >= max_uses)
    }

    /// Uses left before the cap; `None` when unlimited.
    pub fn remaining_uses(&self) -> Option<u32> {
        self.max_uses
            .map(|max_uses| max_uses.saturating_sub(self.used_count))
    }

    /// Current lifecycle state. Expiry wins over everything else.
    pub fn status(&self, now: DateTime<Utc>) -> CouponStatus {
        if self.is_expired_at(now) {
            CouponStatus::Expired
        } else if !self.is_active {
            CouponStatus::Inactive
        } else if self.is_exhausted() {
            CouponStatus::Exhausted
        } else {
            CouponStatus::Active
        }
    }

    /// Applies an administrative edit to the rule fields.
    ///
    /// ## Rules
    /// - Every provided field is validated before anything changes
    /// - `max_uses` can't drop below `used_count`
    /// - `code`, `id`, `used_count` are never touched here
    pub fn apply_patch(&mut self, patch: &CouponPatch, now: DateTime<Utc>) -> Result<(), ValidationError> {
        validation::validate_patch(self, patch)?;

        if let Some(discount) = patch.discount {
            self.discount = discount;
        }
        if let Some(min) = patch.min_order_value {
            self.min_order_value = min;
        }
        if let Some(max_uses) = patch.max_uses {
            self.max_uses = max_uses;
        }
        if let Some(expires_at) = patch.expires_at {
            self.expires_at = expires_at;
        }
        self.updated_at = now;

        Ok(())
    }
}

// =============================================================================
// Admin Payloads
// =============================================================================

/// Payload for creating a coupon.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct NewCoupon {
    pub code: String,
    pub discount: Discount,
    #[serde(default)]
    pub min_order_value: Money,
    #[serde(default)]
    pub max_uses: Option<u32>,
    #[serde(default)]
    #[ts(as = "Option<String>")]
    pub expires_at: Option<DateTime<Utc>>,
}

impl NewCoupon {
    /// Validates the payload and builds the coupon record.
    pub fn into_coupon(self, now: DateTime<Utc>) -> Result<Coupon, ValidationError> {
        validation::validate_new_coupon(&self, now)?;

        let mut coupon = Coupon::new(&self.code, self.discount, now)
            .with_min_order_value(self.min_order_value);
        coupon.max_uses = self.max_uses;
        coupon.expires_at = self.expires_at;
        Ok(coupon)
    }
}

/// Payload for editing a coupon's rule fields.
///
/// For the nullable fields, an absent key leaves the value alone while an
/// explicit `null` clears it (`"max_uses": null` removes the cap).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CouponPatch {
    #[serde(default)]
    pub discount: Option<Discount>,
    #[serde(default)]
    pub min_order_value: Option<Money>,
    #[serde(default, deserialize_with = "present")]
    pub max_uses: Option<Option<u32>>,
    #[serde(default, deserialize_with = "present")]
    pub expires_at: Option<Option<DateTime<Utc>>>,
}

/// Marks a key as present even when its value is `null`.
fn present<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

// =============================================================================
// Validation Result
// =============================================================================

/// A coupon that applies to a given subtotal, with the computed discount.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct AppliedCoupon {
    pub coupon_id: String,
    pub code: String,
    pub subtotal: Money,
    pub discount: Money,
    /// `subtotal - discount`, never negative.
    pub total: Money,
}

// =============================================================================
// Order
// =============================================================================

/// The order write that accompanies a redemption.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Order {
    pub id: String,
    pub subtotal: Money,
    pub discount: Money,
    pub total: Money,
    pub coupon_id: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

impl Order {
    /// Builds an order for `subtotal`, discounted by `applied` if present.
    pub fn new(
        id: impl Into<String>,
        subtotal: Money,
        applied: Option<&AppliedCoupon>,
        now: DateTime<Utc>,
    ) -> Self {
        let discount = applied.map_or(Money::zero(), |a| a.discount);
        Order {
            id: id.into(),
            subtotal,
            discount,
            total: subtotal.saturating_sub(discount),
            coupon_id: applied.map(|a| a.coupon_id.clone()),
            created_at: now,
        }
    }
}

// =============================================================================
// Redemption
// =============================================================================

/// One consumed use of a coupon against a placed order.
///
/// `order_id` is unique: a retried checkout for the same order finds the
/// existing redemption instead of counting twice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Redemption {
    pub id: String,
    pub coupon_id: String,
    pub order_id: String,
    pub discount: Money,
    #[ts(as = "String")]
    pub redeemed_at: DateTime<Utc>,
}

impl Redemption {
    pub fn new(coupon_id: &str, order: &Order, now: DateTime<Utc>) -> Self {
        Redemption {
            id: Uuid::new_v4().to_string(),
            coupon_id: coupon_id.to_string(),
            order_id: order.id.clone(),
            discount: order.discount,
            redeemed_at: now,
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn percent(bps: u32) -> Discount {
        Discount::Percent(Percentage::from_bps(bps))
    }

    #[test]
    fn test_discount_amounts() {
        let subtotal = Money::from_cents(20_000);
        assert_eq!(percent(1000).amount_for(subtotal).cents(), 2_000);

        let fixed = Discount::Fixed(Money::from_cents(5_000));
        assert_eq!(fixed.amount_for(Money::from_cents(3_000)).cents(), 3_000);
        assert_eq!(fixed.amount_for(Money::from_cents(8_000)).cents(), 5_000);
        assert_eq!(fixed.amount_for(Money::zero()), Money::zero());
    }

    #[test]
    fn test_discount_parts() {
        let d = percent(1250);
        assert_eq!((d.kind(), d.raw_value()), ("percent", 1250));
        assert_eq!(Discount::from_parts("percent", 1250).unwrap(), d);

        let d = Discount::Fixed(Money::from_cents(500));
        assert_eq!(Discount::from_parts(d.kind(), d.raw_value()).unwrap(), d);

        assert!(Discount::from_parts("bogo", 1).is_err());
        assert!(Discount::from_parts("percent", -1).is_err());
    }

    #[test]
    fn test_discount_serde_shape() {
        let json = serde_json::to_value(percent(1000)).unwrap();
        assert_eq!(json, serde_json::json!({ "type": "percent", "value": 1000 }));
    }

    #[test]
    fn test_new_coupon_normalizes_code() {
        let coupon = Coupon::new("  summer-10 ", percent(1000), Utc::now());
        assert_eq!(coupon.code, "SUMMER-10");
        assert!(coupon.is_active);
        assert_eq!(coupon.used_count, 0);
        assert_eq!(coupon.remaining_uses(), None);
    }

    #[test]
    fn test_expiry_is_strictly_after() {
        let now = Utc::now();
        let coupon = Coupon::new("X1X", percent(1000), now).with_expiry(now);

        assert!(!coupon.is_expired_at(now));
        assert!(coupon.is_expired_at(now + Duration::milliseconds(1)));
    }

    #[test]
    fn test_status_precedence() {
        let now = Utc::now();
        let mut coupon = Coupon::new("ONCE", percent(1000), now).with_max_uses(1);
        assert_eq!(coupon.status(now), CouponStatus::Active);

        coupon.used_count = 1;
        assert_eq!(coupon.status(now), CouponStatus::Exhausted);
        assert_eq!(coupon.remaining_uses(), Some(0));

        coupon.is_active = false;
        assert_eq!(coupon.status(now), CouponStatus::Inactive);

        coupon.expires_at = Some(now - Duration::days(1));
        assert_eq!(coupon.status(now), CouponStatus::Expired);
    }

    #[test]
    fn test_apply_patch() {
        let now = Utc::now();
        let mut coupon = Coupon::new("EDIT", percent(1000), now).with_max_uses(10);
        coupon.used_count = 4;

        let patch = CouponPatch {
            discount: Some(Discount::Fixed(Money::from_cents(700))),
            max_uses: Some(None),
            ..Default::default()
        };
        coupon.apply_patch(&patch, now).unwrap();

        assert_eq!(coupon.discount, Discount::Fixed(Money::from_cents(700)));
        assert_eq!(coupon.max_uses, None);
        assert_eq!(coupon.used_count, 4);
    }

    #[test]
    fn test_apply_patch_rejects_cap_below_usage() {
        let now = Utc::now();
        let mut coupon = Coupon::new("EDIT", percent(1000), now).with_max_uses(10);
        coupon.used_count = 4;

        let patch = CouponPatch {
            max_uses: Some(Some(3)),
            min_order_value: Some(Money::from_cents(100)),
            ..Default::default()
        };
        assert!(coupon.apply_patch(&patch, now).is_err());
        // Nothing changed
        assert_eq!(coupon.max_uses, Some(10));
        assert_eq!(coupon.min_order_value, Money::zero());
    }

    #[test]
    fn test_patch_null_vs_absent() {
        let patch: CouponPatch = serde_json::from_str(r#"{ "max_uses": null }"#).unwrap();
        assert_eq!(patch.max_uses, Some(None));
        assert_eq!(patch.expires_at, None);

        let patch: CouponPatch = serde_json::from_str(r#"{ "max_uses": 5 }"#).unwrap();
        assert_eq!(patch.max_uses, Some(Some(5)));
    }

    #[test]
    fn test_order_totals() {
        let now = Utc::now();
        let applied = AppliedCoupon {
            coupon_id: "c1".into(),
            code: "SAVE".into(),
            subtotal: Money::from_cents(3_000),
            discount: Money::from_cents(3_000),
            total: Money::zero(),
        };

        let order = Order::new("o1", Money::from_cents(3_000), Some(&applied), now);
        assert_eq!(order.total, Money::zero());
        assert_eq!(order.coupon_id.as_deref(), Some("c1"));

        let plain = Order::new("o2", Money::from_cents(3_000), None, now);
        assert_eq!(plain.discount, Money::zero());
        assert_eq!(plain.total.cents(), 3_000);
    }
}

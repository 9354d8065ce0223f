//! # Coupon Rules
//!
//! The rule set behind `validate` and `redeem`.
//!
//! ## Evaluation Order
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  evaluate(coupon, subtotal, now)                                        │
//! │       │                                                                 │
//! │       ├── now > expires_at?          → Expired                          │
//! │       ├── !is_active?                → Inactive                         │
//! │       ├── used_count >= max_uses?    → UsageExceeded                    │
//! │       │   (check_redeemable stops here: redeem re-runs only these)     │
//! │       ├── subtotal < min_order_value → BelowMinimum                     │
//! │       │                                                                 │
//! │       └── OK → discount = Percent: subtotal × bps / 10000 (≤ subtotal) │
//! │                           Fixed:   min(value, subtotal)                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Expiry is checked first so an expired coupon always reports `Expired`,
//! whatever its active flag or usage.

use chrono::{DateTime, Utc};

use crate::error::Rejection;
use crate::money::Money;
use crate::types::{AppliedCoupon, Coupon};

/// State checks shared by preview and commit: expiry, active flag, cap.
pub fn check_redeemable(coupon: &Coupon, now: DateTime<Utc>) -> Result<(), Rejection> {
    if let Some(expired_at) = coupon.expires_at.filter(|_| coupon.is_expired_at(now)) {
        return Err(Rejection::Expired {
            code: coupon.code.clone(),
            expired_at,
        });
    }

    if !coupon.is_active {
        return Err(Rejection::Inactive {
            code: coupon.code.clone(),
        });
    }

    if let Some(max_uses) = coupon.max_uses.filter(|_| coupon.is_exhausted()) {
        return Err(Rejection::UsageExceeded {
            code: coupon.code.clone(),
            max_uses,
        });
    }

    Ok(())
}

/// Decides whether `coupon` applies to `subtotal` and computes the discount.
///
/// Pure: same inputs, same answer. Never touches `used_count`.
///
/// ## Example
/// ```rust
/// use chrono::Utc;
/// use coupon_core::{rules, Coupon, Discount, Money, Rejection};
///
/// let now = Utc::now();
/// let coupon = Coupon::new("BIG", Discount::Fixed(Money::from_cents(500)), now)
///     .with_min_order_value(Money::from_cents(10_000));
///
/// let err = rules::evaluate(&coupon, Money::from_cents(9_999), now).unwrap_err();
/// assert_eq!(err.code(), "BELOW_MINIMUM");
///
/// let ok = rules::evaluate(&coupon, Money::from_cents(10_000), now).unwrap();
/// assert_eq!(ok.total.cents(), 9_500);
/// ```
pub fn evaluate(coupon: &Coupon, subtotal: Money, now: DateTime<Utc>) -> Result<AppliedCoupon, Rejection> {
    check_redeemable(coupon, now)?;

    if subtotal < coupon.min_order_value {
        return Err(Rejection::BelowMinimum {
            code: coupon.code.clone(),
            minimum: coupon.min_order_value,
            subtotal,
        });
    }

    let discount = coupon.discount.amount_for(subtotal);

    Ok(AppliedCoupon {
        coupon_id: coupon.id.clone(),
        code: coupon.code.clone(),
        subtotal,
        discount,
        total: subtotal.saturating_sub(discount),
    })
}

// =============================================================================
// Unit Tests
// =============================================================================

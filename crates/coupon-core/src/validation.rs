//! # Validation Module
//!
//! Input validation for checkout and admin operations.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Storefront form (TypeScript)                                 │
//! │  ├── Basic format checks (empty, length)                               │
//! │  └── Immediate shopper feedback                                        │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: CouponLedger (Rust)                                          │
//! │  └── THIS MODULE: code normalization, ranges, cap invariant            │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Database (SQLite)                                            │
//! │  ├── UNIQUE(code), CHECK constraints                                   │
//! │  └── UNIQUE(order_id) on redemptions                                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use coupon_core::validation::{normalize_code, validate_code_format};
//!
//! assert_eq!(normalize_code(" save10 ").unwrap(), "SAVE10");
//! assert!(validate_code_format("SAVE10").is_ok());
//! assert!(validate_code_format("no spaces").is_err());
//! ```

use chrono::{DateTime, Utc};

use crate::error::ValidationError;
use crate::money::Money;
use crate::types::{Coupon, CouponPatch, Discount, NewCoupon};
use crate::{FULL_PERCENT_BPS, MAX_CODE_LEN, MIN_CODE_LEN};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// Coupon Codes
// =============================================================================

/// Normalizes a code typed by a shopper for lookup.
///
/// ## Rules
/// - Surrounding whitespace is ignored
/// - Must not be empty
/// - Case-insensitive: stored and compared upper-cased
///
/// No character rules here: a shopper typing garbage should get
/// "not found", not a validation error.
pub fn normalize_code(raw: &str) -> ValidationResult<String> {
    let code = raw.trim();

    if code.is_empty() {
        return Err(ValidationError::Required {
            field: "code".to_string(),
        });
    }

    Ok(code.to_uppercase())
}

/// Same normalization as [`normalize_code`], without the emptiness check.
pub(crate) fn normalize_code_lossy(raw: &str) -> String {
    raw.trim().to_uppercase()
}

/// Validates the format of a code an administrator is creating.
///
/// ## Rules
/// - Between 3 and 32 characters after trimming
/// - Letters, digits, hyphens and underscores only
pub fn validate_code_format(code: &str) -> ValidationResult<()> {
    let code = code.trim();

    if code.is_empty() {
        return Err(ValidationError::Required {
            field: "code".to_string(),
        });
    }

    let len = code.chars().count();
    if len < MIN_CODE_LEN {
        return Err(ValidationError::TooShort {
            field: "code".to_string(),
            min: MIN_CODE_LEN,
        });
    }
    if len > MAX_CODE_LEN {
        return Err(ValidationError::TooLong {
            field: "code".to_string(),
            max: MAX_CODE_LEN,
        });
    }

    if !code
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        return Err(ValidationError::InvalidFormat {
            field: "code".to_string(),
            reason: "must contain only letters, numbers, hyphens, and underscores".to_string(),
        });
    }

    Ok(())
}

// =============================================================================
// Amounts
// =============================================================================

/// Validates an order subtotal. Zero is allowed (free carts).
pub fn validate_subtotal(subtotal: Money) -> ValidationResult<()> {
    if subtotal.is_negative() {
        return Err(ValidationError::OutOfRange {
            field: "subtotal".to_string(),
            min: 0,
            max: i64::MAX,
        });
    }

    Ok(())
}

/// Validates a discount rule.
///
/// ## Rules
/// - Percent: 0.01% to 100% (1 to 10000 bps)
/// - Fixed: strictly positive
pub fn validate_discount(discount: &Discount) -> ValidationResult<()> {
    match discount {
        Discount::Percent(rate) if !rate.is_valid_discount() => Err(ValidationError::OutOfRange {
            field: "discount_value".to_string(),
            min: 1,
            max: FULL_PERCENT_BPS as i64,
        }),
        Discount::Fixed(amount) if !amount.is_positive() => Err(ValidationError::MustBePositive {
            field: "discount_value".to_string(),
        }),
        _ => Ok(()),
    }
}

/// Validates the minimum order value. Zero means "no minimum".
pub fn validate_min_order_value(min: Money) -> ValidationResult<()> {
    if min.is_negative() {
        return Err(ValidationError::OutOfRange {
            field: "min_order_value".to_string(),
            min: 0,
            max: i64::MAX,
        });
    }

    Ok(())
}

/// Validates a usage cap against the uses already consumed.
///
/// ## Rules
/// - `None` (unlimited) is always fine
/// - A cap must be positive
/// - A cap can't be lowered below `used_count`
pub fn validate_max_uses(max_uses: Option<u32>, used_count: u32) -> ValidationResult<()> {
    match max_uses {
        Some(0) => Err(ValidationError::MustBePositive {
            field: "max_uses".to_string(),
        }),
        Some(cap) if cap < used_count => Err(ValidationError::OutOfRange {
            field: "max_uses".to_string(),
            min: used_count as i64,
            max: u32::MAX as i64,
        }),
        _ => Ok(()),
    }
}

/// New coupons can't start life already expired.
pub fn validate_expiry(expires_at: Option<DateTime<Utc>>, now: DateTime<Utc>) -> ValidationResult<()> {
    match expires_at {
        Some(at) if at <= now => Err(ValidationError::InvalidFormat {
            field: "expires_at".to_string(),
            reason: "must be in the future".to_string(),
        }),
        _ => Ok(()),
    }
}

// =============================================================================
// Payloads
// =============================================================================

/// Validates a create-coupon payload.
pub fn validate_new_coupon(new: &NewCoupon, now: DateTime<Utc>) -> ValidationResult<()> {
    validate_code_format(&new.code)?;
    validate_discount(&new.discount)?;
    validate_min_order_value(new.min_order_value)?;
    validate_max_uses(new.max_uses, 0)?;
    validate_expiry(new.expires_at, now)?;
    Ok(())
}

/// Validates an edit against the coupon it applies to.
///
/// Expiry edits are not checked against the clock: moving an expiry into the
/// past is how an administrator ends a promotion early.
pub fn validate_patch(coupon: &Coupon, patch: &CouponPatch) -> ValidationResult<()> {
    if let Some(discount) = &patch.discount {
        validate_discount(discount)?;
    }
    if let Some(min) = patch.min_order_value {
        validate_min_order_value(min)?;
    }
    if let Some(max_uses) = patch.max_uses {
        validate_max_uses(max_uses, coupon.used_count)?;
    }
    Ok(())
}

// =============================================================================
// Identifiers
// =============================================================================

/// Validates a UUID string (coupon ids).
///
/// ## Example
/// ```rust
/// use coupon_core::validation::validate_uuid;
///
/// assert!(validate_uuid("550e8400-e29b-41d4-a716-446655440000").is_ok());
/// assert!(validate_uuid("not-a-uuid").is_err());
/// ```
pub fn validate_uuid(id: &str) -> ValidationResult<()> {
    if id.trim().is_empty() {
        return Err(ValidationError::Required {
            field: "id".to_string(),
        });
    }

    uuid::Uuid::parse_str(id).map_err(|_| ValidationError::InvalidFormat {
        field: "id".to_string(),
        reason: "must be a valid UUID".to_string(),
    })?;

    Ok(())
}

/// Validates an order reference supplied by checkout.
pub fn validate_order_id(id: &str) -> ValidationResult<()> {
    let id = id.trim();

    if id.is_empty() {
        return Err(ValidationError::Required {
            field: "order_id".to_string(),
        });
    }
    if id.len() > 64 {
        return Err(ValidationError::TooLong {
            field: "order_id".to_string(),
            max: 64,
        });
    }

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

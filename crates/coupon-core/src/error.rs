//! # Error Types
//!
//! Domain-specific error types for coupon-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  coupon-core errors (this file)                                        │
//! │  ├── Rejection        - Expected "coupon does not apply" outcomes      │
//! │  ├── ValidationError  - Malformed input                                │
//! │  └── CoreError        - Either of the above                            │
//! │                                                                         │
//! │  coupon-db errors (separate crate)                                     │
//! │  └── DbError          - Database operation failures                    │
//! │                                                                         │
//! │  coupon-ledger errors                                                  │
//! │  └── LedgerError      - What the storefront sees (code + message)      │
//! │                                                                         │
//! │  Flow: Rejection / ValidationError → LedgerError → ErrorResponse       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Rejections Are Not Failures
//! A shopper typing an expired code is normal traffic. Every [`Rejection`]
//! has a stable identifier ([`Rejection::code`]) the UI switches on to pick
//! its message.

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;

use crate::money::Money;

// =============================================================================
// Rejection
// =============================================================================

/// Why a coupon cannot be applied to an order.
///
/// ## User Workflow
/// ```text
/// Shopper enters "SUMMER" on a $99.99 cart
///      │
///      ▼
/// rules::evaluate → BelowMinimum { minimum: $100.00, subtotal: $99.99 }
///      │
///      ▼
/// UI shows: "Spend $100.00 to use this coupon"
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Rejection {
    /// No coupon matches the code (or id).
    #[error("Coupon not found: {key}")]
    NotFound { key: String },

    /// An administrator deactivated the coupon.
    #[error("Coupon {code} is not active")]
    Inactive { code: String },

    /// The expiry instant has passed.
    #[error("Coupon {code} expired at {expired_at}")]
    Expired {
        code: String,
        expired_at: DateTime<Utc>,
    },

    /// `used_count` has reached `max_uses`.
    #[error("Coupon {code} has reached its usage limit of {max_uses}")]
    UsageExceeded { code: String, max_uses: u32 },

    /// Order subtotal is under the coupon's floor.
    #[error("Coupon {code} requires a minimum order of {minimum}, order is {subtotal}")]
    BelowMinimum {
        code: String,
        minimum: Money,
        subtotal: Money,
    },
}

impl Rejection {
    /// Stable identifier for the calling UI.
    ///
    /// These strings are part of the storefront contract: never rename them.
    pub const fn code(&self) -> &'static str {
        match self {
            Rejection::NotFound { .. } => "NOT_FOUND",
            Rejection::Inactive { .. } => "INACTIVE",
            Rejection::Expired { .. } => "EXPIRED",
            Rejection::UsageExceeded { .. } => "USAGE_EXCEEDED",
            Rejection::BelowMinimum { .. } => "BELOW_MINIMUM",
        }
    }

    pub fn not_found(key: impl Into<String>) -> Self {
        Rejection::NotFound { key: key.into() }
    }
}

// =============================================================================
// Core Error
// =============================================================================

/// Core business logic errors.
#[derive(Debug, Error)]
pub enum CoreError {
    /// The coupon does not apply.
    #[error(transparent)]
    Rejected(#[from] Rejection),

    /// Input did not pass validation.
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// These errors occur when admin or checkout input doesn't meet requirements.
/// Used for early validation before business logic runs.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too short.
    #[error("{field} must be at least {min} characters")]
    TooShort { field: String, min: usize },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Invalid format (e.g., invalid UUID, malformed amount).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// Value is not in allowed set.
    #[error("{field} must be one of: {allowed:?}")]
    NotAllowed { field: String, allowed: Vec<String> },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================

//! # Ledger Errors
//!
//! What the storefront sees when a coupon call fails.
//!
//! ## Error Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Rejection (coupon-core) ────────┐                                      │
//! │  ValidationError (coupon-core) ──┤                                      │
//! │  StoreError (store.rs) ──────────┼──► LedgerError ──► ErrorResponse     │
//! │                                  │        .code()      { code, message }│
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Serialization
//! ```json
//! {
//!   "code": "BELOW_MINIMUM",
//!   "message": "Coupon SAVE5 requires a minimum order of $25.00, order is $19.99"
//! }
//! ```
//!
//! `UNAVAILABLE` means "try again". The UI must never present it as an
//! invalid coupon.

use coupon_core::{CoreError, Rejection, ValidationError};
use serde::Serialize;
use thiserror::Error;
use ts_rs::TS;

use crate::store::StoreError;

/// Stable identifiers for every failure the ledger reports.
///
/// ## Usage in Frontend
/// ```typescript
/// switch (e.code) {
///   case 'EXPIRED':
///   case 'INACTIVE':
///     showCouponError('This coupon is no longer valid');
///     break;
///   case 'BELOW_MINIMUM':
///     showCouponError(e.message);
///     break;
///   case 'UNAVAILABLE':
///     showRetry();
///     break;
/// }
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, TS)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[ts(export)]
pub enum ErrorCode {
    NotFound,
    Inactive,
    Expired,
    UsageExceeded,
    BelowMinimum,
    /// Storage unreachable; retry later.
    Unavailable,
    /// Malformed input (code, subtotal, order id, admin fields).
    InvalidInput,
    /// Admin tried to create a code that exists.
    DuplicateCode,
    Internal,
}

impl ErrorCode {
    pub const fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::NotFound => "NOT_FOUND",
            ErrorCode::Inactive => "INACTIVE",
            ErrorCode::Expired => "EXPIRED",
            ErrorCode::UsageExceeded => "USAGE_EXCEEDED",
            ErrorCode::BelowMinimum => "BELOW_MINIMUM",
            ErrorCode::Unavailable => "UNAVAILABLE",
            ErrorCode::InvalidInput => "INVALID_INPUT",
            ErrorCode::DuplicateCode => "DUPLICATE_CODE",
            ErrorCode::Internal => "INTERNAL",
        }
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Serializable error body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, TS)]
#[ts(export)]
pub struct ErrorResponse {
    /// Machine-readable error code for programmatic handling
    pub code: ErrorCode,

    /// Human-readable error message for display
    pub message: String,
}

/// Ledger operation errors.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// The coupon does not apply (expected business outcome).
    #[error(transparent)]
    Rejected(#[from] Rejection),

    #[error("Invalid input: {0}")]
    InvalidInput(#[from] ValidationError),

    #[error("Coupon code already exists: {0}")]
    DuplicateCode(String),

    #[error("Coupon service unavailable: {0}")]
    Unavailable(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl LedgerError {
    /// Stable identifier for this failure.
    pub fn code(&self) -> ErrorCode {
        match self {
            LedgerError::Rejected(rejection) => match rejection {
                Rejection::NotFound { .. } => ErrorCode::NotFound,
                Rejection::Inactive { .. } => ErrorCode::Inactive,
                Rejection::Expired { .. } => ErrorCode::Expired,
                Rejection::UsageExceeded { .. } => ErrorCode::UsageExceeded,
                Rejection::BelowMinimum { .. } => ErrorCode::BelowMinimum,
            },
            LedgerError::InvalidInput(_) => ErrorCode::InvalidInput,
            LedgerError::DuplicateCode(_) => ErrorCode::DuplicateCode,
            LedgerError::Unavailable(_) => ErrorCode::Unavailable,
            LedgerError::Internal(_) => ErrorCode::Internal,
        }
    }

    /// Whether the coupon itself was refused (as opposed to a system failure).
    pub fn is_rejection(&self) -> bool {
        matches!(self, LedgerError::Rejected(_))
    }

    /// Body for the calling UI. Storage details stay in the logs.
    pub fn to_response(&self) -> ErrorResponse {
        let message = match self {
            LedgerError::Unavailable(_) => {
                "Coupons are temporarily unavailable, please try again".to_string()
            }
            LedgerError::Internal(_) => "Something went wrong applying the coupon".to_string(),
            other => other.to_string(),
        };

        ErrorResponse {
            code: self.code(),
            message,
        }
    }
}

impl From<StoreError> for LedgerError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Unavailable(reason) => {
                tracing::warn!(%reason, "Coupon storage unavailable");
                LedgerError::Unavailable(reason)
            }
            StoreError::Duplicate { field, value } if field.ends_with("code") => {
                LedgerError::DuplicateCode(value)
            }
            StoreError::Duplicate { field, value } => LedgerError::InvalidInput(ValidationError::InvalidFormat {
                field,
                reason: format!("'{value}' already exists"),
            }),
            StoreError::NotFound { id, .. } => LedgerError::Rejected(Rejection::not_found(id)),
            StoreError::Constraint(message) => LedgerError::InvalidInput(ValidationError::InvalidFormat {
                field: "coupon".to_string(),
                reason: message,
            }),
            StoreError::Internal(reason) => {
                tracing::error!(%reason, "Coupon storage failed");
                LedgerError::Internal(reason)
            }
        }
    }
}

impl From<CoreError> for LedgerError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::Rejected(r) => LedgerError::Rejected(r),
            CoreError::Validation(v) => LedgerError::InvalidInput(v),
        }
    }
}

pub type LedgerResult<T> = Result<T, LedgerError>;

#[cfg(test)]
mod tests {
    use super::*;
    use coupon_core::Money;

    #[test]
    fn test_codes_match_rejection_identifiers() {
        let rejections = [
            Rejection::not_found("X"),
            Rejection::Inactive { code: "X".into() },
            Rejection::Expired {
                code: "X".into(),
                expired_at: chrono::Utc::now(),
            },
            Rejection::UsageExceeded {
                code: "X".into(),
                max_uses: 1,
            },
            Rejection::BelowMinimum {
                code: "X".into(),
                minimum: Money::from_cents(100),
                subtotal: Money::from_cents(99),
            },
        ];

        for rejection in rejections {
            let expected = rejection.code();
            assert_eq!(LedgerError::from(rejection).code().as_str(), expected);
        }
    }

    #[test]
    fn test_response_serialization() {
        let err = LedgerError::Rejected(Rejection::UsageExceeded {
            code: "ONCE".into(),
            max_uses: 1,
        });
        let json = serde_json::to_value(err.to_response()).unwrap();
        assert_eq!(json["code"], "USAGE_EXCEEDED");
        assert!(json["message"].as_str().unwrap().contains("ONCE"));
    }

    #[test]
    fn test_unavailable_hides_details() {
        let err = LedgerError::from(StoreError::Unavailable("pool timed out at 10.0.0.3".into()));
        let response = err.to_response();
        assert_eq!(response.code, ErrorCode::Unavailable);
        assert!(!response.message.contains("10.0.0.3"));
        assert!(!err.is_rejection());
    }

    #[test]
    fn test_duplicate_maps_to_duplicate_code() {
        let err = LedgerError::from(StoreError::Duplicate {
            field: "code".into(),
            value: "SAVE10".into(),
        });
        assert_eq!(err.code(), ErrorCode::DuplicateCode);

        let err = LedgerError::from(StoreError::Duplicate {
            field: "orders.id".into(),
            value: "web-1".into(),
        });
        assert_eq!(err.code(), ErrorCode::InvalidInput);
    }
}

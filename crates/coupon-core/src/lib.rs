//! # coupon-core: Pure Coupon Rules
//!
//! Everything the storefront needs to decide whether a coupon applies to an
//! order, and by how much, without touching storage or the clock.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                     Storefront Coupon Architecture                      │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │          Checkout / Cart UI (outside this workspace)            │   │
//! │  │    enter code ──► live preview ──► place order                  │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │              coupon-ledger (CouponLedger service)               │   │
//! │  │    validate, redeem, checkout, create/update/deactivate         │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ coupon-core (THIS CRATE) ★                      │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌───────────┐  │   │
//! │  │   │   types   │  │   money   │  │   rules   │  │ validation│  │   │
//! │  │   │  Coupon   │  │   Money   │  │ evaluate  │  │  codes    │  │   │
//! │  │   │ Discount  │  │Percentage │  │ redeemable│  │  ranges   │  │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘  └───────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO CLOCK • PURE FUNCTIONS             │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                    coupon-db (Database Layer)                   │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (Coupon, Discount, Order, Redemption)
//! - [`money`] - Integer-cent money and basis-point percentages
//! - [`rules`] - Coupon evaluation (the validate/redeem rule set)
//! - [`error`] - Rejection and validation error types
//! - [`validation`] - Input validation for admin and checkout input
//! - [`format`] - Phone number masking for storefront forms
//!
//! ## Example Usage
//!
//! ```rust
//! use chrono::Utc;
//! use coupon_core::{rules, Coupon, Discount, Money, Percentage};
//!
//! let coupon = Coupon::new("save10", Discount::Percent(Percentage::from_bps(1000)), Utc::now());
//! let applied = rules::evaluate(&coupon, Money::from_cents(20_000), Utc::now()).unwrap();
//!
//! assert_eq!(applied.discount.cents(), 2_000);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod format;
pub mod money;
pub mod rules;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use error::{CoreError, Rejection, ValidationError};
pub use money::{Money, Percentage};
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Shortest coupon code an administrator may create.
pub const MIN_CODE_LEN: usize = 3;

/// Longest coupon code an administrator may create.
///
/// ## Business Reason
/// Codes are typed by shoppers; anything longer is a data entry mistake.
pub const MAX_CODE_LEN: usize = 32;

/// 100% expressed in basis points.
pub const FULL_PERCENT_BPS: u32 = 10_000;

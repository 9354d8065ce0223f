//! # coupon-db: Database Layer for Storefront Coupons
//!
//! SQLite persistence for coupons, orders and redemptions, using sqlx.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Coupon Data Flow                                 │
//! │                                                                         │
//! │  CouponLedger (coupon-ledger) via SqliteCouponStore                     │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     coupon-db (THIS CRATE)                      │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌─────────────────┐  ┌──────────────┐   │   │
//! │  │   │   Database    │    │  Repositories   │  │  Migrations  │   │   │
//! │  │   │   (pool.rs)   │    │                 │  │  (embedded)  │   │   │
//! │  │   │               │    │ CouponRepository│  │ 001_coupons  │   │   │
//! │  │   │ SqlitePool    │◄───│ OrderRepository │  │ 002_orders_  │   │   │
//! │  │   │               │    │                 │  │ redemptions  │   │   │
//! │  │   └───────────────┘    └─────────────────┘  └──────────────┘   │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SQLite database file (COUPON_DB_PATH)                                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation and configuration
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Database error types
//! - [`repository`] - Coupon and order repositories
//!
//! ## Usage
//!
//! ```rust,ignore
//! use coupon_db::{Database, DbConfig};
//!
//! let db = Database::new(DbConfig::new("./data/coupons.db")).await?;
//! let coupon = db.coupons().find_by_code("SUMMER10").await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};

pub use repository::coupon::CouponRepository;
pub use repository::order::{OrderRepository, RedemptionOutcome};

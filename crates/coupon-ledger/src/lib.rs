//! # coupon-ledger: Coupon Validation & Redemption
//!
//! The service a storefront calls to price and consume coupon codes.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Storefront checkout / coupon-admin CLI                                 │
//! │       │  validate / redeem / checkout / create / update / set_active    │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                  coupon-ledger (THIS CRATE)                     │   │
//! │  │                                                                 │   │
//! │  │   CouponLedger<S> ──► CouponStore ──┬── SqliteCouponStore       │   │
//! │  │        │                            └── MemoryCouponStore       │   │
//! │  │        ▼                                                        │   │
//! │  │   coupon_core::rules (expiry, activity, cap, minimum, math)    │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  coupon-db (SQLite)                                                     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Wiring
//! ```rust,ignore
//! let config = LedgerConfig::load()?;
//! telemetry::init(&config.log_filter);
//!
//! let db = Database::new(config.db_config()).await?;
//! let ledger = CouponLedger::new(SqliteCouponStore::new(db));
//! ```

pub mod config;
pub mod error;
pub mod memory;
pub mod service;
pub mod sqlite;
pub mod store;
pub mod telemetry;

pub use config::{ConfigError, LedgerConfig};
pub use error::{ErrorCode, ErrorResponse, LedgerError, LedgerResult};
pub use memory::MemoryCouponStore;
pub use service::CouponLedger;
pub use sqlite::SqliteCouponStore;
pub use store::{CommitOutcome, CouponStore, StoreError, StoreResult};

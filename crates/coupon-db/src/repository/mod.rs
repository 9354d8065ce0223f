//! # Repository Module
//!
//! Database repositories for the coupon ledger.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  SqliteCouponStore (coupon-ledger)                                      │
//! │       │                                                                 │
//! │       │  db.coupons().find_by_code("SUMMER10")                          │
//! │       ▼                                                                 │
//! │  CouponRepository                                                       │
//! │  ├── find_by_code / get_by_id / list                                    │
//! │  ├── insert / update_rules / set_active                                 │
//! │       │                                                                 │
//! │  OrderRepository                                                        │
//! │  ├── place_order_with_redemption  (one transaction)                     │
//! │  └── get_order / get_redemption_for_order / count_redemptions           │
//! │       │                                                                 │
//! │       ▼  SQL                                                            │
//! │  SQLite Database                                                        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

pub mod coupon;
pub mod order;

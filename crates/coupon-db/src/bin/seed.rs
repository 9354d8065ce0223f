//! # Seed Data Generator
//!
//! Populates the database with coupons for development.
//!
//! ## Usage
//! ```bash
//! # Sample coupons plus 50 generated promo codes (default)
//! cargo run -p coupon-db --bin seed
//!
//! # Generate custom amount
//! cargo run -p coupon-db --bin seed -- --count 500
//!
//! # Specify database path
//! cargo run -p coupon-db --bin seed -- --db ./data/coupons.db
//! ```
//!
//! ## Generated Coupons
//! A fixed set covering every rejection path:
//! - `WELCOME10` 10% off, no limits
//! - `SAVE5` $5.00 off orders of $25.00 or more
//! - `ONCE50` 50% off, a single use
//! - `PAUSED` deactivated
//! - `LASTYEAR` already expired
//!
//! Then `PROMO0001`..`PROMONNNN` with rotating discounts, minimums and caps.

use chrono::{Duration, Utc};
use coupon_core::{Coupon, Discount, Money, Percentage};
use coupon_db::{Database, DbConfig};
use std::env;

/// Percent discounts in basis points
const PERCENT_BPS: &[u32] = &[500, 1000, 1500, 2000, 2500];

/// Fixed discounts in cents
const FIXED_CENTS: &[i64] = &[300, 500, 1000, 2000];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Parse command line arguments
    let args: Vec<String> = env::args().collect();

    let mut count: usize = 50;
    let mut db_path = String::from("./coupons_dev.db");

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--count" | "-c" => {
                if i + 1 < args.len() {
                    count = args[i + 1].parse().unwrap_or(50);
                    i += 1;
                }
            }
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = args[i + 1].clone();
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Coupon Ledger Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -c, --count <N>    Number of promo coupons to generate (default: 50)");
                println!("  -d, --db <PATH>    Database file path (default: ./coupons_dev.db)");
                println!("  -h, --help         Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    println!("🌱 Coupon Ledger Seed Data Generator");
    println!("====================================");
    println!("Database: {}", db_path);
    println!("Promo coupons: {}", count);
    println!();

    let db = Database::new(DbConfig::new(&db_path)).await?;

    println!("✓ Connected to database");
    println!("✓ Migrations applied");

    let existing = db.coupons().list(true).await?.len();
    if existing > 0 {
        println!("⚠ Database already has {} coupons", existing);
        println!("  Skipping seed to avoid duplicates.");
        println!("  Delete the database file to regenerate.");
        return Ok(());
    }

    println!();
    println!("Inserting sample coupons...");

    for coupon in sample_coupons() {
        db.coupons().insert(&coupon).await?;
        println!("  {:<10} {}", coupon.code, describe(&coupon));
    }

    println!();
    println!("Generating promo coupons...");

    let start = std::time::Instant::now();
    let mut generated = 0;

    for seed in 1..=count {
        let coupon = generate_coupon(seed);
        if let Err(e) = db.coupons().insert(&coupon).await {
            eprintln!("Failed to insert {}: {}", coupon.code, e);
            continue;
        }
        generated += 1;
    }

    println!("✓ Generated {} coupons in {:?}", generated, start.elapsed());
    println!();
    println!("✓ Seed complete!");

    Ok(())
}

fn sample_coupons() -> Vec<Coupon> {
    let now = Utc::now();

    let mut paused = Coupon::new("PAUSED", Discount::Percent(Percentage::from_bps(2000)), now);
    paused.is_active = false;

    let mut last_year = Coupon::new("LASTYEAR", Discount::Fixed(Money::from_cents(1000)), now);
    last_year.expires_at = Some(now - Duration::days(365));

    vec![
        Coupon::new("WELCOME10", Discount::Percent(Percentage::from_bps(1000)), now),
        Coupon::new("SAVE5", Discount::Fixed(Money::from_cents(500)), now)
            .with_min_order_value(Money::from_cents(2500)),
        Coupon::new("ONCE50", Discount::Percent(Percentage::from_bps(5000)), now).with_max_uses(1),
        paused,
        last_year,
    ]
}

/// Generates a single promo coupon from a sequence number.
fn generate_coupon(seed: usize) -> Coupon {
    let now = Utc::now();

    let discount = if seed % 2 == 0 {
        Discount::Percent(Percentage::from_bps(PERCENT_BPS[seed % PERCENT_BPS.len()]))
    } else {
        Discount::Fixed(Money::from_cents(FIXED_CENTS[seed % FIXED_CENTS.len()]))
    };

    let mut coupon = Coupon::new(&format!("PROMO{:04}", seed), discount, now)
        .with_min_order_value(Money::from_cents(((seed % 4) * 1000) as i64))
        .with_expiry(now + Duration::days(7 + (seed % 60) as i64));

    if seed % 3 == 0 {
        coupon = coupon.with_max_uses(10 * (1 + (seed % 5) as u32));
    }

    coupon
}

fn describe(coupon: &Coupon) -> String {
    let discount = match coupon.discount {
        Discount::Percent(p) => format!("{} off", p),
        Discount::Fixed(m) => format!("{} off", m),
    };
    let status = format!("{:?}", coupon.status(Utc::now())).to_lowercase();
    format!("{discount} [{status}]")
}

//! # Coupon Admin
//!
//! Command-line access to the coupon ledger.
//!
//! ## Usage
//! ```bash
//! # Check a code against a cart
//! cargo run -p coupon-ledger --bin coupon-admin -- validate SUMMER10 200.00
//!
//! # Create coupons
//! cargo run -p coupon-ledger --bin coupon-admin -- create SUMMER10 percent 10
//! cargo run -p coupon-ledger --bin coupon-admin -- create SAVE5 fixed 5.00 --min 25.00 --max-uses 100
//!
//! # Toggle and inspect
//! cargo run -p coupon-ledger --bin coupon-admin -- deactivate SUMMER10
//! cargo run -p coupon-ledger --bin coupon-admin -- list --all
//! ```
//!
//! Settings come from `COUPON_*` environment variables (a `.env` file is
//! read first). Failures print the JSON error body and exit non-zero.

use std::env;
use std::process::ExitCode;

use anyhow::{bail, Context};
use chrono::{DateTime, Utc};
use coupon_core::{Discount, Money, NewCoupon, Percentage};
use coupon_db::Database;
use coupon_ledger::{telemetry, CouponLedger, LedgerConfig, LedgerError, SqliteCouponStore};
use tracing::info;

const USAGE: &str = "\
Coupon Ledger Admin

Usage: coupon-admin <COMMAND> [ARGS]

Commands:
  validate <CODE> <SUBTOTAL>                 Price a code against a subtotal
  create <CODE> <percent|fixed> <VALUE>      Create a coupon
      [--min <AMOUNT>] [--max-uses <N>] [--expires <RFC3339>]
  activate <CODE>                            Re-enable a coupon
  deactivate <CODE>                          Disable a coupon
  list [--all]                               List coupons (--all includes inactive)
  help                                       Show this help message";

#[tokio::main]
async fn main() -> ExitCode {
    let _ = dotenvy::dotenv();

    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            match err.downcast_ref::<LedgerError>() {
                Some(ledger_err) => match serde_json::to_string_pretty(&ledger_err.to_response()) {
                    Ok(body) => eprintln!("{body}"),
                    Err(_) => eprintln!("{ledger_err}"),
                },
                None => eprintln!("error: {err:#}"),
            }
            ExitCode::FAILURE
        }
    }
}

async fn run() -> anyhow::Result<()> {
    let args: Vec<String> = env::args().skip(1).collect();
    let Some(command) = args.first().map(String::as_str) else {
        println!("{USAGE}");
        return Ok(());
    };
    if matches!(command, "help" | "--help" | "-h") {
        println!("{USAGE}");
        return Ok(());
    }

    let config = LedgerConfig::load().context("loading configuration")?;
    telemetry::init(&config.log_filter);
    info!(db = %config.db_path.display(), "Opening coupon database");

    let db = Database::new(config.db_config())
        .await
        .context("opening coupon database")?;
    let ledger = CouponLedger::new(SqliteCouponStore::new(db));

    let rest = &args[1..];
    match command {
        "validate" => {
            let [code, subtotal] = rest else {
                bail!("usage: coupon-admin validate <CODE> <SUBTOTAL>");
            };
            let subtotal: Money = subtotal.parse().context("parsing subtotal")?;
            let applied = ledger.validate(code, subtotal).await?;
            println!("{}", serde_json::to_string_pretty(&applied)?);
        }

        "create" => {
            let new = parse_new_coupon(rest)?;
            let coupon = ledger.create_coupon(new).await?;
            println!("{}", serde_json::to_string_pretty(&coupon)?);
        }

        "activate" | "deactivate" => {
            let [code] = rest else {
                bail!("usage: coupon-admin {command} <CODE>");
            };
            let coupon = ledger.get_coupon(code).await?;
            let coupon = ledger.set_active(&coupon.id, command == "activate").await?;
            println!("{} is now {}", coupon.code, if coupon.is_active { "active" } else { "inactive" });
        }

        "list" => {
            let include_inactive = rest.iter().any(|a| a == "--all");
            let now = Utc::now();
            for coupon in ledger.list_coupons(include_inactive).await? {
                let discount = match coupon.discount {
                    Discount::Percent(p) => format!("{p} off"),
                    Discount::Fixed(m) => format!("{m} off"),
                };
                let uses = match coupon.max_uses {
                    Some(max) => format!("{}/{}", coupon.used_count, max),
                    None => format!("{}/∞", coupon.used_count),
                };
                println!(
                    "{:<32} {:<14} min {:<10} uses {:<10} {:?}",
                    coupon.code,
                    discount,
                    coupon.min_order_value.to_string(),
                    uses,
                    coupon.status(now)
                );
            }
        }

        other => bail!("unknown command '{other}'\n\n{USAGE}"),
    }

    Ok(())
}

fn parse_new_coupon(args: &[String]) -> anyhow::Result<NewCoupon> {
    let [code, kind, value, options @ ..] = args else {
        bail!("usage: coupon-admin create <CODE> <percent|fixed> <VALUE> [OPTIONS]");
    };

    let discount = match kind.as_str() {
        "percent" => {
            let pct: f64 = value.parse().context("parsing percent value")?;
            Discount::Percent(Percentage::from_percent(pct))
        }
        "fixed" => Discount::Fixed(value.parse().context("parsing fixed amount")?),
        other => bail!("discount type must be 'percent' or 'fixed', got '{other}'"),
    };

    let mut new = NewCoupon {
        code: code.clone(),
        discount,
        min_order_value: Money::zero(),
        max_uses: None,
        expires_at: None,
    };

    let mut i = 0;
    while i < options.len() {
        let flag = options[i].as_str();
        let Some(arg) = options.get(i + 1) else {
            bail!("{flag} needs a value");
        };
        match flag {
            "--min" => new.min_order_value = arg.parse().context("parsing --min")?,
            "--max-uses" => new.max_uses = Some(arg.parse().context("parsing --max-uses")?),
            "--expires" => {
                let at: DateTime<Utc> = arg.parse().context("parsing --expires (RFC 3339)")?;
                new.expires_at = Some(at);
            }
            other => bail!("unknown option '{other}'"),
        }
        i += 2;
    }

    Ok(new)
}

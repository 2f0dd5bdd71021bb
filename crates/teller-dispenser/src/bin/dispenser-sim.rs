//! # Dispenser Simulator
//!
//! Drives a `SimulatedDevice` through init, feasibility and payouts, for
//! trying out inventories and amounts without hardware.
//!
//! ## Usage
//! ```bash
//! # Demo inventory, pay out 100.00
//! cargo run -p teller-dispenser --bin dispenser-sim -- --amount 10000
//!
//! # Inventory from a config file, several payouts
//! cargo run -p teller-dispenser --bin dispenser-sim -- --config ./teller.toml -a 2500 -a 4000
//!
//! # Feasibility for a 200.00 limit with 20.00 already committed
//! cargo run -p teller-dispenser --bin dispenser-sim -- --limit 20000 --credit 2000
//! ```
//!
//! All amounts are in minor units. `RUST_LOG=debug` shows session and
//! device diagnostics.

use std::env;
use std::path::PathBuf;
use std::sync::Arc;

use teller_core::{Cartridge, Money, SetupData};
use teller_dispenser::{DispenserConfig, DispenserController, SimulatedDevice};
use tracing::warn;
use tracing_subscriber::EnvFilter;

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt().with_env_filter(filter).init();
}

/// Inventory used when no usable config file is found.
fn demo_config() -> DispenserConfig {
    DispenserConfig {
        setup: SetupData {
            cartridges: vec![
                Cartridge::new(Money::from_major(5), 10),
                Cartridge::new(Money::from_major(20), 5),
            ],
            virtual_cartridges: vec![Money::from_major(25)],
            currency: "EUR".to_string(),
        },
        ..DispenserConfig::default()
    }
}

fn print_help() {
    println!("Teller Dispenser Simulator");
    println!();
    println!("Usage: dispenser-sim [OPTIONS]");
    println!();
    println!("Options:");
    println!("  -c, --config <PATH>    Config file (default: platform config dir)");
    println!("  -a, --amount <MINOR>   Dispense this amount; may be repeated");
    println!("  -l, --limit <MINOR>    Transaction limit for feasibility (default: 10000)");
    println!("      --credit <MINOR>   Credit already committed (default: 0)");
    println!("  -h, --help             Show this help message");
}

fn parse_minor(flag: &str, value: Option<&String>) -> Result<Money, String> {
    value
        .ok_or_else(|| format!("{} needs a value", flag))?
        .parse::<i64>()
        .map(Money::from_minor)
        .map_err(|e| format!("{}: {}", flag, e))
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();

    let args: Vec<String> = env::args().collect();

    let mut config_path: Option<PathBuf> = None;
    let mut amounts: Vec<Money> = Vec::new();
    let mut limit = Money::from_minor(10_000);
    let mut credit = Money::zero();

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--config" | "-c" => {
                config_path = args.get(i + 1).map(PathBuf::from);
                i += 1;
            }
            "--amount" | "-a" => {
                amounts.push(parse_minor("--amount", args.get(i + 1))?);
                i += 1;
            }
            "--limit" | "-l" => {
                limit = parse_minor("--limit", args.get(i + 1))?;
                i += 1;
            }
            "--credit" => {
                credit = parse_minor("--credit", args.get(i + 1))?;
                i += 1;
            }
            "--help" | "-h" => {
                print_help();
                return Ok(());
            }
            other => {
                eprintln!("Unknown option: {}", other);
                print_help();
                return Ok(());
            }
        }
        i += 1;
    }

    let config = DispenserConfig::load(config_path).unwrap_or_else(|e| {
        warn!("No usable dispenser config ({}); using demo inventory", e);
        demo_config()
    });

    let device = Arc::new(SimulatedDevice::new(config.device.name.clone()));
    let controller = DispenserController::from_settings(device, &config.device);
    let _diagnostics = controller.watch_diagnostics();

    let outcome = controller.init(config.setup.clone()).await?;
    println!("Init: {}", serde_json::to_string(&outcome)?);

    match controller.active_denominations(limit, credit) {
        Some(active) => println!(
            "Active denominations (limit {}, credit {}): {}",
            limit,
            credit,
            serde_json::to_string(&active)?
        ),
        None => println!("Credit {} cannot be paid out from this inventory", credit),
    }

    for amount in amounts {
        match controller.dispense(amount).await {
            Ok(receipt) => println!(
                "Dispensed {}: {}",
                amount,
                serde_json::to_string(&receipt.report.dispensed)?
            ),
            Err(e) => println!("Dispense {} failed: {}", amount, e),
        }
    }

    println!("Status: {}", serde_json::to_string_pretty(&controller.status())?);
    Ok(())
}

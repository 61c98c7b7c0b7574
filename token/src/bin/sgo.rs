// Copyright (c) 2024 The Botho Foundation

//! SGO ledger tooling.
//!
//! Inspect release schedules and produce or check forward authorizations
//! without deploying anything.

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use sgo_token::{
    forward_digest, verify_forward_authorization, Address, Amount, LedgerConfig, MintScheduler,
    RecoverableSignature,
};
use tracing::debug;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "sgo")]
#[command(about = "SGO ledger tooling: mint schedules and forward authorizations")]
#[command(version)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the supply release curve of a ledger
    Schedule {
        /// Ledger config file (TOML)
        #[arg(short, long, conflicts_with = "preset")]
        config: Option<PathBuf>,

        /// Built-in ledger parameters
        #[arg(short, long, value_enum, default_value = "sgo")]
        preset: Preset,

        /// Number of half periods to cover
        #[arg(long, default_value = "4")]
        periods: u32,

        /// Samples per half period
        #[arg(long, default_value = "2")]
        samples: u32,

        /// Emit JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Print the digest an account signs to set up forwarding
    ForwardDigest {
        /// Ledger address
        #[arg(short, long)]
        ledger: Address,

        /// Explicit forward target (omit for auto-forward)
        #[arg(short, long)]
        to: Option<Address>,
    },

    /// Check a forward authorization signature
    VerifyForward {
        /// Ledger address
        #[arg(short, long)]
        ledger: Address,

        /// Account that should have signed
        #[arg(short, long)]
        from: Address,

        /// Explicit forward target (omit for auto-forward)
        #[arg(short, long)]
        to: Option<Address>,

        /// 65-byte signature as hex, `r || s || v`
        #[arg(short, long)]
        signature: String,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum Preset {
    Sgo,
    Cgo,
}

#[derive(Serialize)]
struct SchedulePoint {
    elapsed_secs: u64,
    released: Amount,
    released_coins: String,
    percent_of_cap: f64,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    match cli.command {
        Commands::Schedule {
            config,
            preset,
            periods,
            samples,
            json,
        } => schedule(config, preset, periods, samples, json),
        Commands::ForwardDigest { ledger, to } => {
            println!("0x{}", hex::encode(forward_digest(&ledger, to.as_ref())));
            Ok(())
        }
        Commands::VerifyForward {
            ledger,
            from,
            to,
            signature,
        } => {
            let signature = RecoverableSignature::from_hex(&signature)
                .context("Invalid signature encoding")?;
            if verify_forward_authorization(&ledger, &from, to.as_ref(), &signature).is_err() {
                bail!("Signature does not authorize forwarding {from} on {ledger}");
            }
            println!("valid");
            Ok(())
        }
    }
}

fn schedule(
    config: Option<PathBuf>,
    preset: Preset,
    periods: u32,
    samples: u32,
    json: bool,
) -> Result<()> {
    let config = match config {
        Some(path) => LedgerConfig::from_file(&path)
            .with_context(|| format!("Failed to load {}", path.display()))?,
        None => match preset {
            Preset::Sgo => LedgerConfig::sgo(),
            Preset::Cgo => LedgerConfig::cgo(),
        },
    };
    let cap = config.mint_cap_units()?;
    if cap == 0 {
        bail!("{} has no mint cap", config.symbol);
    }
    let samples = samples.max(1);
    let scheduler = MintScheduler::new(cap, config.half_mint_period_secs, 0);
    debug!(symbol = %config.symbol, cap, half = config.half_mint_period_secs, "Computing schedule");

    let step = config.half_mint_period_secs / u64::from(samples);
    let mut points = Vec::new();
    for i in 0..=u64::from(periods) * u64::from(samples) {
        let elapsed = step.saturating_mul(i);
        let released = scheduler.released(elapsed)?;
        points.push(SchedulePoint {
            elapsed_secs: elapsed,
            released,
            released_coins: format_units(released, config.decimals),
            percent_of_cap: released as f64 * 100.0 / cap as f64,
        });
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&points)?);
        return Ok(());
    }

    println!("{} release schedule (cap {} coins)", config.symbol, config.mint_cap);
    println!("{:>12}  {:>32}  {:>8}", "days", "released", "% cap");
    for point in &points {
        println!(
            "{:>12.1}  {:>32}  {:>7.2}%",
            point.elapsed_secs as f64 / 86_400.0,
            point.released_coins,
            point.percent_of_cap
        );
    }
    Ok(())
}

/// Render base units as a decimal coin amount.
fn format_units(amount: Amount, decimals: u8) -> String {
    let Some(coin) = 10u128.checked_pow(u32::from(decimals)) else {
        return amount.to_string();
    };
    let whole = amount / coin;
    let frac = amount % coin;
    if frac == 0 {
        return whole.to_string();
    }
    let frac = format!("{frac:0width$}", width = usize::from(decimals));
    format!("{whole}.{}", frac.trim_end_matches('0'))
}

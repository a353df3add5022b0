//! GTAB CLI
//!
//! Usage:
//!   gtab encode --start 2025-08-01T00:00:00Z --end 2025-11-01T00:00:00Z
//!   gtab validate --table ephem/gtab_60s.bin --out metrics.json
//!   gtab inspect --table ephem/gtab_1s.bin [--json]
//!   gtab lookup --table ephem/gtab_1s.bin --at 2025-08-02T12:00:00Z
//!
//! Exit codes: 0 when the run completes (a failing verdict included),
//! 2 on usage or setup errors.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Utc};
use clap::{Parser, Subcommand};
use colored::Colorize;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use gtab::core::{
    load_thresholds, resolve_dataset_id, save_report, EncodeConfig, Encoder, LowPrecisionEphemeris,
    Table, ValidationConfig, Validator,
};
use gtab::types::{Field, FieldMask, MetricsReport};
use gtab::{DEFAULT_VALIDATION_CADENCE_SECS, DEFAULT_VALIDATION_LOOKBACK_DAYS, VERSION};

#[derive(Parser, Debug)]
#[command(
    name = "gtab",
    version = VERSION,
    about = "GTAB - encode, inspect and validate Sun/Moon tidal proxy tables",
    long_about = "GTAB stores a normalized Sun+Moon tidal proxy (mu/r^3) at fixed\n\
                  cadence in a compact binary table with O(1) random access.\n\n\
                  Commands:\n  \
                  encode    Write gtab_1s.bin, gtab_60s.bin and gtab.meta.json\n  \
                  validate  Compare a table against freshly computed values\n  \
                  inspect   Print header, record layout and coverage\n  \
                  lookup    Interpolated values at one instant"
)]
struct Cli {
    /// Disable colors in output
    #[arg(long, global = true)]
    no_color: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Encode 1s and 60s tables over a window
    Encode {
        /// Window start (RFC 3339)
        #[arg(long)]
        start: DateTime<Utc>,

        /// Window end, inclusive (RFC 3339)
        #[arg(long)]
        end: DateTime<Utc>,

        /// Output directory
        #[arg(long, default_value = "ephem")]
        out_dir: PathBuf,

        /// Field mask, hex (0x03) or decimal
        #[arg(long, default_value = "0x03", value_parser = parse_mask)]
        fields: FieldMask,
    },

    /// Validate a table's accuracy and write a metrics document
    Validate {
        /// Table to validate
        #[arg(long)]
        table: PathBuf,

        /// Report label (default: sibling gtab.meta.json, else file name)
        #[arg(long)]
        dataset_id: Option<String>,

        /// Window start (default: now - 7 days)
        #[arg(long)]
        start: Option<DateTime<Utc>>,

        /// Window end (default: now)
        #[arg(long)]
        end: Option<DateTime<Utc>>,

        /// Sampling cadence in seconds
        #[arg(long, default_value_t = DEFAULT_VALIDATION_CADENCE_SECS)]
        cadence: u32,

        /// JSON file overriding thresholds
        #[arg(long)]
        thresholds: Option<PathBuf>,

        /// Output metrics JSON path
        #[arg(long)]
        out: PathBuf,

        /// Also print the metrics document
        #[arg(long)]
        verbose: bool,
    },

    /// Print header, layout and coverage
    Inspect {
        #[arg(long)]
        table: PathBuf,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Interpolated field values at one instant
    Lookup {
        #[arg(long)]
        table: PathBuf,

        /// Timestamp (RFC 3339)
        #[arg(long)]
        at: DateTime<Utc>,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing();

    if cli.no_color {
        colored::control::set_override(false);
    }

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {:#}", "error:".red().bold(), e);
            ExitCode::from(2)
        }
    }
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "gtab=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Encode {
            start,
            end,
            out_dir,
            fields,
        } => run_encode(start, end, out_dir, fields),
        Command::Validate {
            table,
            dataset_id,
            start,
            end,
            cadence,
            thresholds,
            out,
            verbose,
        } => {
            let now = Utc::now();
            let start = start.unwrap_or(now - Duration::days(DEFAULT_VALIDATION_LOOKBACK_DAYS));
            let end = end.unwrap_or(now);
            let thresholds = load_thresholds(thresholds.as_deref())?;
            let config = ValidationConfig::new(resolve_dataset_id(dataset_id.as_deref(), &table), start, end)
                .with_cadence(cadence)
                .with_thresholds(thresholds);
            run_validate(&table, &config, &out, verbose)
        }
        Command::Inspect { table, json } => run_inspect(&table, json),
        Command::Lookup { table, at } => run_lookup(&table, at),
    }
}

/// Encode both tables with the built-in ephemeris
fn run_encode(start: DateTime<Utc>, end: DateTime<Utc>, out_dir: PathBuf, fields: FieldMask) -> Result<()> {
    let config = EncodeConfig::new(start, end, out_dir).with_field_mask(fields);
    let output = Encoder::new(LowPrecisionEphemeris::new())
        .encode(&config)
        .context("encode failed")?;

    for table in &output.tables {
        println!(
            "{} {} ({} records @ {}s)",
            "wrote".green(),
            table.path.display(),
            table.header.count,
            table.cadence_secs
        );
    }
    println!(
        "{} {} (dataset_id {})",
        "wrote".green(),
        output.meta_path.display(),
        output.meta.dataset_id.bold()
    );
    Ok(())
}

/// Validate, persist the report, print the verdict
fn run_validate(table: &Path, config: &ValidationConfig, out: &Path, verbose: bool) -> Result<()> {
    let report = Validator::new(LowPrecisionEphemeris::new())
        .validate(table, config)
        .with_context(|| format!("validation of {} failed", table.display()))?;
    save_report(&report, out)?;

    print_verdict(&report);
    if verbose {
        println!("{}", serde_json::to_string_pretty(&report)?);
    }
    Ok(())
}

fn print_verdict(report: &MetricsReport) {
    let verdict = if report.passes {
        "PASS".green().bold()
    } else {
        "FAIL".red().bold()
    };
    println!("{} {} ({} records)", verdict, report.dataset_id, report.records_compared);

    if let Some(reason) = &report.reason {
        println!("  {} {}", "reason:".yellow(), reason);
        println!("  {}", reason.description().dimmed());
    }
    if let Some(stats) = &report.statistics {
        println!(
            "  rel_error median {:.3e} p99 {:.3e} (limits {:.1e} / {:.1e})",
            stats.rel_error.median,
            stats.rel_error.p99,
            report.thresholds.rel_error_median,
            report.thresholds.rel_error_p99
        );
        println!(
            "  peaks {} matched {} timing p99 {:.1}s value p99 {:.3e}",
            stats.peak_count,
            stats.matched_peaks,
            stats.peak_timing_drift_seconds.p99,
            stats.peak_value_rel_drift.p99
        );
    }
}

fn run_inspect(path: &Path, json: bool) -> Result<()> {
    let table = Table::open(path).with_context(|| format!("cannot open {}", path.display()))?;
    let header = table.header();
    let (start, end) = table.coverage();
    let fields: Vec<&str> = table.layout().slots().iter().map(|s| s.field.name()).collect();

    if json {
        let view = serde_json::json!({
            "path": path.display().to_string(),
            "header": header,
            "record_width": table.layout().width(),
            "fields": fields,
            "start": start,
            "end": end,
        });
        println!("{}", serde_json::to_string_pretty(&view)?);
        return Ok(());
    }

    println!("{}", path.display().to_string().bold());
    println!("  version      {}", header.version);
    println!("  epoch        {} ({})", header.epoch_secs, start.to_rfc3339());
    println!("  interval     {} ns", header.interval_ns);
    println!("  count        {}", header.count);
    println!("  field_mask   {}", header.field_mask);
    println!("  record       {} bytes [{}]", table.layout().width(), fields.join(", "));
    println!("  coverage     {} .. {}", start.to_rfc3339(), end.to_rfc3339());
    Ok(())
}

fn run_lookup(path: &Path, at: DateTime<Utc>) -> Result<()> {
    let table = Table::open(path).with_context(|| format!("cannot open {}", path.display()))?;
    let (index, frac) = table.index_for(at)?;
    println!(
        "{:<12} {} at {} (+{:.3})",
        "record".cyan(),
        index,
        table.sample_time(index)?.to_rfc3339(),
        frac
    );

    for slot in table.layout().slots() {
        match slot.field {
            Field::TideBps => {
                let bps = table.lookup_bps(at)?;
                println!("{:<12} {}", slot.field.name().cyan(), bps);
            }
            field => {
                let value = table.lookup_field(field, at)?;
                println!("{:<12} {:.6e}", field.name().cyan(), value);
            }
        }
    }
    Ok(())
}

/// Accept `0x..` hex or decimal masks that map to a valid layout
fn parse_mask(s: &str) -> Result<FieldMask, String> {
    let bits = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => u32::from_str_radix(hex, 16),
        None => s.parse::<u32>(),
    }
    .map_err(|e| format!("invalid field mask {s:?}: {e}"))?;

    let mask = FieldMask(bits);
    mask.layout().map_err(|e| e.to_string())?;
    Ok(mask)
}

//! # payslip CLI
//!
//! ```bash
//! # Print a breakdown as JSON
//! payslip calculate --base-salary 3000000 --overtime-hours 10 --overtime-rate 10000 --dependents 1
//!
//! # Render a batch and archive it
//! payslip render --input employees.json --period 2025-01 --design template_sample1 --format both --out ./out
//!
//! # List design identifiers
//! payslip designs
//! ```

use std::error::Error;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use rust_decimal::Decimal;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use payslip_engine::calculation::calculate;
use payslip_engine::config::ConfigLoader;
use payslip_engine::design::DEFAULT_DESIGN;
use payslip_engine::error::EngineError;
use payslip_engine::models::{CompensationInput, OutputFormat, PayPeriod};
use payslip_engine::service::{JsonLinesActivity, PayslipService, read_batch_file};

/// Payroll deduction calculator and payslip renderer
#[derive(Parser, Debug)]
#[command(name = "payslip")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Configuration directory holding statutory.yaml and renderer.yaml
    #[arg(long, global = true, value_name = "DIR")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Calculate one breakdown and print it as JSON
    Calculate {
        /// Monthly base salary in won
        #[arg(long)]
        base_salary: i64,

        /// Overtime hours (fractional allowed)
        #[arg(long, default_value = "0")]
        overtime_hours: Decimal,

        /// Overtime pay per hour in won
        #[arg(long, default_value = "0")]
        overtime_rate: i64,

        /// Bonus in won
        #[arg(long, default_value = "0")]
        bonus: i64,

        /// Number of dependents
        #[arg(long, default_value = "0")]
        dependents: u32,
    },

    /// Render payslips for every employee in a JSON file
    Render {
        /// JSON array of employee compensation records
        #[arg(long, value_name = "FILE")]
        input: PathBuf,

        /// Pay period label, e.g. 2025-01
        #[arg(long, default_value = "")]
        period: String,

        /// Design identifier
        #[arg(long, default_value = DEFAULT_DESIGN)]
        design: String,

        /// Output format: excel, pdf or both
        #[arg(long, default_value = "excel")]
        format: OutputFormat,

        /// Output directory
        #[arg(long, default_value = "./out")]
        out: PathBuf,

        /// Append activity events to this JSON lines file
        #[arg(long, value_name = "FILE")]
        activity_log: Option<PathBuf>,
    },

    /// List available design identifiers
    Designs,
}

fn main() -> ExitCode {
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .with_writer(std::io::stderr)
        .finish();
    if tracing::subscriber::set_global_default(subscriber).is_err() {
        eprintln!("warning: tracing subscriber already installed");
    }

    match run(Cli::parse()) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn load_config(dir: Option<&Path>) -> Result<ConfigLoader, EngineError> {
    match dir {
        Some(dir) => ConfigLoader::load(dir),
        None => Ok(ConfigLoader::default()),
    }
}

fn run(cli: Cli) -> Result<ExitCode, Box<dyn Error>> {
    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Calculate {
            base_salary,
            overtime_hours,
            overtime_rate,
            bonus,
            dependents,
        } => {
            let input = CompensationInput {
                overtime_hours,
                overtime_rate,
                bonus,
                dependents,
                ..CompensationInput::new("cli", base_salary)
            };
            input.validate()?;
            let breakdown = calculate(&input, config.statutory());
            println!("{}", serde_json::to_string_pretty(&breakdown)?);
            Ok(ExitCode::SUCCESS)
        }
        Commands::Render {
            input,
            period,
            design,
            format,
            out,
            activity_log,
        } => {
            let entries = read_batch_file(&input)?;
            let mut service = PayslipService::new(config);
            if let Some(path) = activity_log {
                service = service.with_activity(Arc::new(JsonLinesActivity::new(path)));
            }

            let report = service.render_batch_entries(
                &entries,
                &PayPeriod::new(period),
                Some(design.as_str()),
                format,
                &out,
            )?;

            println!("attempted: {}", report.attempted);
            println!("succeeded: {}", report.succeeded);
            println!("failed:    {}", report.failed.len());
            for failure in &report.failed {
                println!("  {} ({:?}): {}", failure.name, failure.category, failure.message);
            }
            if let Some(archive) = &report.archive {
                println!("archive:   {}", archive.display());
            }
            Ok(if report.is_complete() {
                ExitCode::SUCCESS
            } else {
                ExitCode::from(2)
            })
        }
        Commands::Designs => {
            let service = PayslipService::new(config);
            println!("{DEFAULT_DESIGN}");
            for id in service.registry().list_available() {
                println!("{id}");
            }
            Ok(ExitCode::SUCCESS)
        }
    }
}

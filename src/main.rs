use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use rust_decimal::Decimal;

use alicuota::log::init_logging;

#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to optional configuration file
    #[arg(short, long, global = true)]
    config_path: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Create default configuration
    Setup,
    /// Show the applicable exchange rate for a date
    Rate {
        /// Date to resolve (defaults to today)
        #[arg(long)]
        date: Option<chrono::NaiveDate>,
    },
    /// Fetch the official rate from the configured feed and store it
    FetchRate,
    /// Import a bank statement file for a tower and period
    ImportBank {
        #[arg(long)]
        tower: String,
        #[arg(long)]
        period: String,
        #[arg(long)]
        file: std::path::PathBuf,
    },
    /// Save a draft period from a period file
    Save {
        #[arg(long)]
        tower: String,
        #[arg(long)]
        period: String,
        #[arg(long)]
        file: std::path::PathBuf,
    },
    /// Publish a period (from a file, or as last saved)
    Publish {
        #[arg(long)]
        tower: String,
        #[arg(long)]
        period: String,
        #[arg(long)]
        file: Option<std::path::PathBuf>,
    },
    /// Reopen a published period for editing
    Reopen {
        #[arg(long)]
        tower: String,
        #[arg(long)]
        period: String,
    },
    /// Display the reconciled statement and aliquot breakdown
    Statement {
        #[arg(long)]
        tower: String,
        #[arg(long)]
        period: String,
    },
    /// Record a payment against an expense line
    RecordPayment {
        #[arg(long)]
        expense_id: uuid::Uuid,
        #[arg(long)]
        date: chrono::NaiveDate,
        /// Amount paid in bolívars (defaults to 0)
        #[arg(long)]
        amount_bs: Option<Decimal>,
        /// Rate at payment time (defaults to the stored rate for the date)
        #[arg(long)]
        rate: Option<Decimal>,
        #[arg(long)]
        amount_usd: Decimal,
        #[arg(long)]
        reference: String,
    },
    /// Void a recorded payment (destructive)
    VoidPayment {
        #[arg(long)]
        expense_id: uuid::Uuid,
        #[arg(long)]
        confirm: bool,
    },
}

impl From<Commands> for alicuota::AppCommand {
    fn from(cmd: Commands) -> alicuota::AppCommand {
        match cmd {
            Commands::Rate { date } => alicuota::AppCommand::Rate { date },
            Commands::FetchRate => alicuota::AppCommand::FetchRate,
            Commands::ImportBank {
                tower,
                period,
                file,
            } => alicuota::AppCommand::ImportBank {
                tower,
                period,
                file,
            },
            Commands::Save {
                tower,
                period,
                file,
            } => alicuota::AppCommand::Save {
                tower,
                period,
                file,
            },
            Commands::Publish {
                tower,
                period,
                file,
            } => alicuota::AppCommand::Publish {
                tower,
                period,
                file,
            },
            Commands::Reopen { tower, period } => alicuota::AppCommand::Reopen { tower, period },
            Commands::Statement { tower, period } => {
                alicuota::AppCommand::Statement { tower, period }
            }
            Commands::RecordPayment {
                expense_id,
                date,
                amount_bs,
                rate,
                amount_usd,
                reference,
            } => alicuota::AppCommand::RecordPayment {
                expense_id,
                date,
                amount_bs,
                rate,
                amount_usd,
                reference,
            },
            Commands::VoidPayment {
                expense_id,
                confirm,
            } => alicuota::AppCommand::VoidPayment {
                expense_id,
                confirm,
            },
            Commands::Setup => unreachable!("Setup command should be handled separately"),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    let result = match cli.command {
        Some(Commands::Setup) => setup(),
        Some(cmd) => alicuota::run_command(cmd.into(), cli.config_path.as_deref()).await,
        None => {
            Cli::command().print_help()?;
            Ok(())
        }
    };

    if let Err(e) = &result {
        tracing::error!(error = %e, "Application failed");
    }
    result
}

fn setup() -> anyhow::Result<()> {
    use anyhow::Context;

    let path = alicuota::config::AppConfig::default_config_path()?;

    if path.exists() {
        anyhow::bail!("Configuration file already exists at {}", path.display());
    }

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }

    let default_config = r#"---
towers:
  - id: "torre-a"
    name: "Torre A"
    unit_count: 16

providers:
  bcv:
    base_url: "https://pydolarve.org"
"#;

    std::fs::write(&path, default_config)
        .with_context(|| format!("Failed to write config file to {}", path.display()))?;

    tracing::info!("Created default configuration at {}", path.display());
    Ok(())
}

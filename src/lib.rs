pub mod aliquot;
pub mod cache;
pub mod cli;
pub mod commission;
pub mod config;
pub mod error;
pub mod lifecycle;
pub mod log;
pub mod model;
pub mod payments;
pub mod providers;
pub mod rates;
pub mod reconcile;
pub mod store;

use anyhow::Result;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

use providers::bcv::BcvRateProvider;
use providers::RateSource;
use store::disk::FjallStore;

pub enum AppCommand {
    Rate {
        date: Option<NaiveDate>,
    },
    FetchRate,
    ImportBank {
        tower: String,
        period: String,
        file: PathBuf,
    },
    Save {
        tower: String,
        period: String,
        file: PathBuf,
    },
    Publish {
        tower: String,
        period: String,
        file: Option<PathBuf>,
    },
    Reopen {
        tower: String,
        period: String,
    },
    Statement {
        tower: String,
        period: String,
    },
    RecordPayment {
        expense_id: Uuid,
        date: NaiveDate,
        amount_bs: Option<Decimal>,
        rate: Option<Decimal>,
        amount_usd: Decimal,
        reference: String,
    },
    VoidPayment {
        expense_id: Uuid,
        confirm: bool,
    },
}

pub async fn run_command(command: AppCommand, config_path: Option<&str>) -> Result<()> {
    info!("Condominium period manager starting...");

    let config = match config_path {
        Some(path) => config::AppConfig::load_from_path(path)?,
        None => config::AppConfig::load()?,
    };
    debug!("Loaded config: {config:#?}");

    let store = FjallStore::open(&config.data_path()?.join("store"))?;

    let rate_cache = Arc::new(cache::Cache::new());
    let provider = config
        .providers
        .bcv
        .as_ref()
        .map(|p| BcvRateProvider::new(&p.base_url, Arc::clone(&rate_cache)));
    let rate_source = provider.as_ref().map(|p| p as &dyn RateSource);

    match command {
        AppCommand::Rate { date } => cli::rates::show(&store, date).await,
        AppCommand::FetchRate => cli::rates::fetch(&store, rate_source).await,
        AppCommand::ImportBank {
            tower,
            period,
            file,
        } => cli::bank::import(&config, &store, &tower, &period, &file).await,
        AppCommand::Save {
            tower,
            period,
            file,
        } => cli::periods::save(&config, &store, &tower, &period, &file).await,
        AppCommand::Publish {
            tower,
            period,
            file,
        } => cli::periods::publish(&config, &store, &tower, &period, file.as_deref()).await,
        AppCommand::Reopen { tower, period } => {
            cli::periods::reopen(&config, &store, &tower, &period).await
        }
        AppCommand::Statement { tower, period } => {
            cli::statement::run(&config, &store, rate_source, &tower, &period).await
        }
        AppCommand::RecordPayment {
            expense_id,
            date,
            amount_bs,
            rate,
            amount_usd,
            reference,
        } => {
            cli::payments::record(
                &store, expense_id, date, amount_bs, rate, amount_usd, reference,
            )
            .await
        }
        AppCommand::VoidPayment {
            expense_id,
            confirm,
        } => cli::payments::void(&store, expense_id, confirm).await,
    }
}

//! Save / publish / reopen command handlers.

use anyhow::{Context, Result};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::path::Path;
use tracing::debug;

use super::ui;
use crate::config::AppConfig;
use crate::error::EngineError;
use crate::lifecycle::PeriodLifecycle;
use crate::model::{ExpenseInput, PeriodDraft};
use crate::rates::RateResolver;
use crate::store::DataStore;

/// On-disk shape of a period file passed to `save`/`publish`.
#[derive(Debug, Deserialize)]
pub struct PeriodFile {
    #[serde(default)]
    pub bcv_rate: Option<Decimal>,
    #[serde(default)]
    pub reserve_fund: Option<Decimal>,
    pub expenses: Vec<ExpenseInput>,
}

pub fn load_period_file(path: &Path) -> Result<PeriodFile> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read period file: {}", path.display()))?;
    serde_yaml::from_str(&content)
        .with_context(|| format!("Failed to parse period file: {}", path.display()))
}

/// Header rate precedence: explicit file value, then the stored rate at the
/// period's first day, then 1.
async fn header_rate(
    resolver: &RateResolver<'_>,
    period_name: &str,
    from_file: Option<Decimal>,
) -> Result<Decimal> {
    if let Some(rate) = from_file {
        return Ok(rate);
    }
    match resolver.resolve_period_start(period_name).await {
        Ok(lookup) => Ok(lookup.value),
        Err(EngineError::RateNotFound { date }) => {
            debug!(%date, "no stored rate for period start, defaulting header rate to 1");
            Ok(Decimal::ONE)
        }
        Err(e) => Err(e.into()),
    }
}

pub async fn save(
    config: &AppConfig,
    store: &dyn DataStore,
    tower_id: &str,
    period_name: &str,
    file: &Path,
) -> Result<()> {
    config.tower(tower_id)?;
    let period_file = load_period_file(file)?;

    let resolver = RateResolver::new(store);
    let draft = PeriodDraft {
        tower_id: tower_id.to_string(),
        period_name: period_name.to_string(),
        bcv_rate: header_rate(&resolver, period_name, period_file.bcv_rate).await?,
        reserve_fund: period_file.reserve_fund.unwrap_or(Decimal::ZERO),
    };

    let lifecycle = PeriodLifecycle::new(store);
    let (period, expenses) = lifecycle.save(&draft, period_file.expenses).await?;

    println!(
        "Saved {} {} as {} with {} expense(s).",
        tower_id,
        period_name,
        ui::style_text(period.status.as_str(), ui::StyleType::TotalLabel),
        expenses.len()
    );
    Ok(())
}

pub async fn publish(
    config: &AppConfig,
    store: &dyn DataStore,
    tower_id: &str,
    period_name: &str,
    file: Option<&Path>,
) -> Result<()> {
    config.tower(tower_id)?;

    let resolver = RateResolver::new(store);
    let (bcv_rate, reserve_fund, expenses) = match file {
        Some(path) => {
            let period_file = load_period_file(path)?;
            (
                header_rate(&resolver, period_name, period_file.bcv_rate).await?,
                period_file.reserve_fund.unwrap_or(Decimal::ZERO),
                period_file.expenses,
            )
        }
        None => {
            // Publish the period as last saved.
            let period = store
                .find_period(tower_id, period_name)
                .await?
                .with_context(|| {
                    format!("Period {period_name} of tower {tower_id} has not been saved")
                })?;
            let expenses = store
                .expenses_for_period(period.id)
                .await?
                .into_iter()
                .map(ExpenseInput::from)
                .collect();
            (period.bcv_rate, period.reserve_fund, expenses)
        }
    };

    let draft = PeriodDraft {
        tower_id: tower_id.to_string(),
        period_name: period_name.to_string(),
        bcv_rate,
        reserve_fund,
    };

    let lifecycle = PeriodLifecycle::new(store);
    let (period, expenses) = lifecycle.publish(&draft, expenses).await?;

    println!(
        "Published {} {} ({} expense(s)).",
        period.tower_id,
        period.period_name,
        expenses.len()
    );
    Ok(())
}

pub async fn reopen(
    config: &AppConfig,
    store: &dyn DataStore,
    tower_id: &str,
    period_name: &str,
) -> Result<()> {
    config.tower(tower_id)?;

    let lifecycle = PeriodLifecycle::new(store);
    let period = lifecycle.reopen(tower_id, period_name).await?;

    println!(
        "Reopened {} {} — status is now {}.",
        period.tower_id,
        period.period_name,
        ui::style_text(period.status.as_str(), ui::StyleType::TotalLabel)
    );
    Ok(())
}

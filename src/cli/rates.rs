//! Exchange-rate display and refresh handlers.

use anyhow::{Context, Result};
use chrono::{NaiveDate, Utc};

use super::ui;
use crate::providers::RateSource;
use crate::rates::RateResolver;
use crate::store::DataStore;

/// Shows the applicable rate for a date (today by default), flagging
/// weekend/holiday fallback to a prior business day.
pub async fn show(store: &dyn DataStore, date: Option<NaiveDate>) -> Result<()> {
    let query = date.unwrap_or_else(|| Utc::now().date_naive());
    let resolver = RateResolver::new(store);
    let lookup = resolver.resolve(query).await?;

    if lookup.is_fallback_for(query) {
        println!(
            "Rate for {query}: {} Bs/USD {}",
            ui::style_text(&format!("{:.4}", lookup.value), ui::StyleType::TotalValue),
            ui::style_text(&format!("(from {})", lookup.date), ui::StyleType::Subtle)
        );
    } else {
        println!(
            "Rate for {query}: {} Bs/USD",
            ui::style_text(&format!("{:.4}", lookup.value), ui::StyleType::TotalValue)
        );
    }
    Ok(())
}

/// Pulls the official rate from the feed and stores it.
pub async fn fetch(store: &dyn DataStore, source: Option<&dyn RateSource>) -> Result<()> {
    let source = source.context("No rate provider configured")?;

    let spinner = ui::new_spinner("Fetching official rate...");
    let resolver = RateResolver::new(store);
    let result = resolver.refresh(source).await;
    spinner.finish_and_clear();

    let rate = result?;
    println!(
        "Stored {} rate for {}: {} Bs/USD",
        rate.provider,
        rate.date,
        ui::style_text(&format!("{:.4}", rate.value), ui::StyleType::TotalValue)
    );
    Ok(())
}

//! Renders the consolidated period statement: declared expenses merged with
//! bank commissions, plus the aliquot breakdown.

use anyhow::{Context, Result};
use comfy_table::Cell;
use rust_decimal::Decimal;
use tracing::debug;

use super::ui;
use crate::aliquot::AliquotCalculator;
use crate::config::AppConfig;
use crate::error::EngineError;
use crate::model::{Expense, PaymentStatus, Period};
use crate::providers::RateSource;
use crate::rates::RateResolver;
use crate::reconcile;
use crate::store::DataStore;

pub async fn run(
    config: &AppConfig,
    store: &dyn DataStore,
    rate_source: Option<&dyn RateSource>,
    tower_id: &str,
    period_name: &str,
) -> Result<()> {
    let tower = config.tower(tower_id)?;
    let resolver = RateResolver::new(store);

    if let Some(source) = rate_source {
        resolver.refresh_opportunistic(source).await;
    }

    let period = store
        .find_period(tower_id, period_name)
        .await?
        .with_context(|| format!("Period {period_name} of tower {tower_id} has not been saved"))?;

    let declared = store.expenses_for_period(period.id).await?;
    let transactions = store.bank_transactions(tower_id, period_name).await?;

    // Last-known period rate stands in when the table has nothing at or
    // before the period start.
    let rate_at_start = match resolver.resolve_period_start(period_name).await {
        Ok(lookup) => lookup.value,
        Err(EngineError::RateNotFound { date }) => {
            debug!(%date, fallback = %period.bcv_rate, "no stored rate, using period header rate");
            period.bcv_rate
        }
        Err(e) => return Err(e.into()),
    };
    let rate = reconcile::effective_rate(Some(rate_at_start));

    let merged = reconcile::reconcile(period.id, declared, &transactions, rate);

    let calculator = AliquotCalculator::new(tower.unit_count)?;
    let breakdown = calculator.compute(&merged, period.reserve_fund);

    println!(
        "{} — {} [{}]\n",
        ui::style_text(&tower.name, ui::StyleType::Title),
        period_name,
        status_label(&period)
    );
    println!(
        "Rate at period start: {} Bs/USD\n",
        ui::style_text(&format!("{rate:.4}"), ui::StyleType::TotalLabel)
    );

    println!("{}", expenses_table(&merged));

    println!(
        "\nTotal expenses (USD):    {}",
        ui::style_text(
            &format!("{:.2}", breakdown.total_expenses),
            ui::StyleType::TotalLabel
        )
    );
    println!("Reserve fund (USD):      {:.2}", breakdown.reserve_fund);
    println!(
        "Total to distribute:     {}",
        ui::style_text(
            &format!("{:.2}", breakdown.final_total),
            ui::StyleType::TotalValue
        )
    );
    println!(
        "Aliquot per unit ({:>2}):   {}",
        calculator.unit_count(),
        ui::style_text(
            &format!("{:.2}", breakdown.aliquot_per_unit),
            ui::StyleType::TotalValue
        )
    );

    Ok(())
}

fn status_label(period: &Period) -> String {
    if period.is_published() {
        ui::style_text("PUBLISHED", ui::StyleType::TotalValue)
    } else {
        ui::style_text("DRAFT", ui::StyleType::Subtle)
    }
}

fn expenses_table(expenses: &[Expense]) -> String {
    let mut table = ui::new_styled_table();
    table.set_header(vec![
        ui::header_cell("Expense"),
        ui::header_cell("USD"),
        ui::header_cell("Paid (Bs)"),
        ui::header_cell("Rate"),
        ui::header_cell("Paid (USD)"),
        ui::header_cell("Status"),
        ui::header_cell("Reference"),
    ]);

    for expense in expenses {
        let description = if expense.is_virtual {
            ui::style_text(&expense.description, ui::StyleType::Subtle)
        } else {
            expense.description.clone()
        };
        table.add_row(vec![
            Cell::new(description),
            Cell::new(format!("{:.2}", expense.amount))
                .set_alignment(comfy_table::CellAlignment::Right),
            ui::format_optional_cell(expense.amount_bs, |v: Decimal| format!("{v:.2}")),
            ui::format_optional_cell(expense.bcv_rate_at_payment, |v: Decimal| format!("{v:.4}")),
            ui::format_optional_cell(expense.amount_usd_at_payment, |v: Decimal| {
                format!("{v:.2}")
            }),
            ui::status_cell(
                expense.payment_status.as_str(),
                expense.payment_status == PaymentStatus::Pagado,
            ),
            ui::format_optional_cell(expense.bank_reference.clone(), |r| r),
        ]);
    }

    table.to_string()
}

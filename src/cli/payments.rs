//! Record and void payment command handlers.

use anyhow::{bail, Result};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use uuid::Uuid;

use super::ui;
use crate::payments::{PaymentDetails, PaymentRecorder};
use crate::rates::RateResolver;
use crate::store::DataStore;

/// Records a payment against one expense line. When no rate is given the
/// stored rate applicable on the payment date is snapshotted.
#[allow(clippy::too_many_arguments)]
pub async fn record(
    store: &dyn DataStore,
    expense_id: Uuid,
    payment_date: NaiveDate,
    amount_bs: Option<Decimal>,
    rate: Option<Decimal>,
    amount_usd: Decimal,
    reference: String,
) -> Result<()> {
    let bcv_rate = match rate {
        Some(r) => r,
        None => {
            let resolver = RateResolver::new(store);
            let lookup = resolver.resolve(payment_date).await?;
            if lookup.is_fallback_for(payment_date) {
                println!(
                    "{}",
                    ui::style_text(
                        &format!("Using rate of {} (latest before payment date)", lookup.date),
                        ui::StyleType::Subtle
                    )
                );
            }
            lookup.value
        }
    };

    let recorder = PaymentRecorder::new(store);
    let expense = recorder
        .record_payment(
            expense_id,
            PaymentDetails {
                payment_date,
                amount_bs,
                bcv_rate,
                amount_usd,
                reference,
            },
        )
        .await?;

    println!(
        "Recorded payment for '{}': {:.2} USD at {:.4} Bs/USD (ref {}).",
        expense.description,
        amount_usd,
        bcv_rate,
        expense.bank_reference.as_deref().unwrap_or("-")
    );
    Ok(())
}

/// Voids a payment. Destructive: refuses to run without `--confirm`.
pub async fn void(store: &dyn DataStore, expense_id: Uuid, confirm: bool) -> Result<()> {
    if !confirm {
        bail!("Voiding a payment erases its snapshot. Re-run with --confirm to proceed.");
    }

    let recorder = PaymentRecorder::new(store);
    let expense = recorder.void_payment(expense_id).await?;

    println!(
        "Voided payment for '{}' — status is back to {}.",
        expense.description,
        expense.payment_status.as_str()
    );
    Ok(())
}

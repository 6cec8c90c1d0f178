//! Payment snapshot recording and voiding against single expense lines.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use tracing::info;
use uuid::Uuid;

use crate::error::EngineError;
use crate::model::{Expense, PaymentStatus};
use crate::store::DataStore;

/// Evidence of a payment at recording time. The snapshot is stored verbatim
/// and never recomputed from the live rate afterwards.
#[derive(Debug, Clone)]
pub struct PaymentDetails {
    pub payment_date: NaiveDate,
    /// Defaults to 0 when the payment was made directly in USD.
    pub amount_bs: Option<Decimal>,
    pub bcv_rate: Decimal,
    pub amount_usd: Decimal,
    pub reference: String,
}

pub struct PaymentRecorder<'a> {
    store: &'a dyn DataStore,
}

impl<'a> PaymentRecorder<'a> {
    pub fn new(store: &'a dyn DataStore) -> Self {
        PaymentRecorder { store }
    }

    /// Marks an expense as paid. Validation happens before any write;
    /// legal regardless of the period's status.
    pub async fn record_payment(
        &self,
        expense_id: Uuid,
        details: PaymentDetails,
    ) -> Result<Expense, EngineError> {
        if details.reference.trim().is_empty() {
            return Err(EngineError::validation("payment reference is required"));
        }
        if details.amount_usd <= Decimal::ZERO {
            return Err(EngineError::validation(
                "payment amount in USD must be positive",
            ));
        }
        if details.bcv_rate <= Decimal::ZERO {
            return Err(EngineError::validation(
                "exchange rate at payment must be positive",
            ));
        }

        let mut expense = self
            .store
            .get_expense(expense_id)
            .await?
            .ok_or_else(|| EngineError::validation(format!("expense {expense_id} not found")))?;

        expense.payment_date = Some(details.payment_date);
        expense.amount_bs = Some(details.amount_bs.unwrap_or(Decimal::ZERO));
        expense.bcv_rate_at_payment = Some(details.bcv_rate);
        expense.amount_usd_at_payment = Some(details.amount_usd);
        expense.bank_reference = Some(details.reference.trim().to_uppercase());
        expense.payment_status = PaymentStatus::Pagado;

        self.store.update_expense(&expense).await?;
        info!(%expense_id, reference = ?expense.bank_reference, "payment recorded");
        Ok(expense)
    }

    /// Clears the four snapshot fields and resets the line to pending.
    /// Destructive; the caller boundary asks for explicit confirmation.
    pub async fn void_payment(&self, expense_id: Uuid) -> Result<Expense, EngineError> {
        let mut expense = self
            .store
            .get_expense(expense_id)
            .await?
            .ok_or_else(|| EngineError::validation(format!("expense {expense_id} not found")))?;

        expense.payment_date = None;
        expense.amount_bs = None;
        expense.bcv_rate_at_payment = None;
        expense.amount_usd_at_payment = None;
        expense.bank_reference = None;
        expense.payment_status = PaymentStatus::Pendiente;

        self.store.update_expense(&expense).await?;
        info!(%expense_id, "payment voided");
        Ok(expense)
    }
}

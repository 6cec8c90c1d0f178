//! Draft/published state machine for a period.
//!
//! Published periods are immutable except through the payment recorder;
//! `save` and `publish` share one persist path so the preserve-payments
//! behavior cannot diverge. Callers treat the returned state as the
//! persisted reality and re-fetch rather than trusting local edits.

use tracing::info;

use crate::error::EngineError;
use crate::model::{Expense, ExpenseInput, Period, PeriodDraft, PeriodStatus};
use crate::reconcile;
use crate::store::DataStore;

pub struct PeriodLifecycle<'a> {
    store: &'a dyn DataStore,
}

impl<'a> PeriodLifecycle<'a> {
    pub fn new(store: &'a dyn DataStore) -> Self {
        PeriodLifecycle { store }
    }

    /// Persists the period header and replaces its expense set. Legal only
    /// while the period is a draft (or does not exist yet).
    pub async fn save(
        &self,
        draft: &PeriodDraft,
        incoming: Vec<ExpenseInput>,
    ) -> Result<(Period, Vec<Expense>), EngineError> {
        if let Some(existing) = self
            .store
            .find_period(&draft.tower_id, &draft.period_name)
            .await?
        {
            if existing.is_published() {
                return Err(EngineError::PeriodImmutable {
                    tower_id: draft.tower_id.clone(),
                    period_name: draft.period_name.clone(),
                });
            }
        }

        let period = self.store.upsert_period(draft).await?;
        let prior = self.store.expenses_for_period(period.id).await?;

        let mut merged = reconcile::merge_payment_fields(period.id, incoming, &prior);
        merged.retain(|e| !e.is_virtual);
        let expected = merged.len();

        self.store.replace_expenses(period.id, merged).await?;

        let persisted = self.store.expenses_for_period(period.id).await?;
        if persisted.len() != expected {
            return Err(EngineError::InconsistentReplace {
                period_id: period.id,
                expected,
                found: persisted.len(),
            });
        }

        info!(
            tower = %period.tower_id,
            period = %period.period_name,
            expenses = persisted.len(),
            "period saved"
        );
        Ok((period, persisted))
    }

    /// Same persist as [`save`](Self::save), then flips the status to
    /// published.
    pub async fn publish(
        &self,
        draft: &PeriodDraft,
        incoming: Vec<ExpenseInput>,
    ) -> Result<(Period, Vec<Expense>), EngineError> {
        let (period, expenses) = self.save(draft, incoming).await?;
        self.store
            .update_period_status(period.id, PeriodStatus::Published)
            .await?;

        let period = self
            .store
            .get_period(period.id)
            .await?
            .ok_or_else(|| EngineError::persistence("period vanished after publish"))?;
        info!(tower = %period.tower_id, period = %period.period_name, "period published");
        Ok((period, expenses))
    }

    /// Published -> draft, status only; expenses are untouched.
    pub async fn reopen(
        &self,
        tower_id: &str,
        period_name: &str,
    ) -> Result<Period, EngineError> {
        let period = self
            .store
            .find_period(tower_id, period_name)
            .await?
            .ok_or_else(|| {
                EngineError::validation(format!(
                    "period {period_name} of tower {tower_id} does not exist"
                ))
            })?;

        self.store
            .update_period_status(period.id, PeriodStatus::Draft)
            .await?;

        let period = self
            .store
            .get_period(period.id)
            .await?
            .ok_or_else(|| EngineError::persistence("period vanished after reopen"))?;
        info!(tower = %tower_id, period = %period_name, "period reopened");
        Ok(period)
    }
}

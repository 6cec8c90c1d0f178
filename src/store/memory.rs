use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use std::collections::{BTreeMap, HashMap};
use tokio::sync::Mutex;
use tracing::debug;
use uuid::Uuid;

use super::{DataStore, StoreResult};
use crate::model::{BankTransaction, ExchangeRate, Expense, Period, PeriodDraft, PeriodStatus};

#[derive(Default)]
struct Inner {
    /// Keyed by `(date, provider)`; BTreeMap keeps rates date-ordered.
    rates: BTreeMap<(NaiveDate, String), ExchangeRate>,
    /// Keyed by `(tower_id, period_name)`.
    periods: HashMap<(String, String), Period>,
    /// Per-period expense lists in insertion order.
    expenses: HashMap<Uuid, Vec<Expense>>,
    /// Keyed by `(tower_id, period_name)`.
    bank_txns: HashMap<(String, String), Vec<BankTransaction>>,
}

/// In-memory store used by unit tests and ephemeral runs.
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        MemoryStore {
            inner: Mutex::new(Inner::default()),
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DataStore for MemoryStore {
    async fn upsert_rate(&self, rate: ExchangeRate) -> StoreResult<()> {
        let mut inner = self.inner.lock().await;
        debug!(date = %rate.date, provider = %rate.provider, "rate upsert");
        inner
            .rates
            .insert((rate.date, rate.provider.clone()), rate);
        Ok(())
    }

    async fn latest_rate_on_or_before(
        &self,
        date: NaiveDate,
    ) -> StoreResult<Option<ExchangeRate>> {
        let inner = self.inner.lock().await;
        let rate = inner
            .rates
            .range(..=(date, String::from("\u{10FFFF}")))
            .next_back()
            .map(|(_, rate)| rate.clone());
        Ok(rate)
    }

    async fn find_period(
        &self,
        tower_id: &str,
        period_name: &str,
    ) -> StoreResult<Option<Period>> {
        let inner = self.inner.lock().await;
        Ok(inner
            .periods
            .get(&(tower_id.to_string(), period_name.to_string()))
            .cloned())
    }

    async fn get_period(&self, id: Uuid) -> StoreResult<Option<Period>> {
        let inner = self.inner.lock().await;
        Ok(inner.periods.values().find(|p| p.id == id).cloned())
    }

    async fn upsert_period(&self, draft: &PeriodDraft) -> StoreResult<Period> {
        let mut inner = self.inner.lock().await;
        let key = (draft.tower_id.clone(), draft.period_name.clone());
        let now = Utc::now();

        let period = match inner.periods.get(&key) {
            Some(existing) => Period {
                bcv_rate: draft.bcv_rate,
                reserve_fund: draft.reserve_fund,
                updated_at: now,
                ..existing.clone()
            },
            None => Period {
                id: Uuid::new_v4(),
                tower_id: draft.tower_id.clone(),
                period_name: draft.period_name.clone(),
                bcv_rate: draft.bcv_rate,
                reserve_fund: draft.reserve_fund,
                status: PeriodStatus::Draft,
                created_at: now,
                updated_at: now,
            },
        };
        inner.periods.insert(key, period.clone());
        Ok(period)
    }

    async fn update_period_status(&self, id: Uuid, status: PeriodStatus) -> StoreResult<()> {
        let mut inner = self.inner.lock().await;
        for period in inner.periods.values_mut() {
            if period.id == id {
                period.status = status;
                period.updated_at = Utc::now();
            }
        }
        Ok(())
    }

    async fn expenses_for_period(&self, period_id: Uuid) -> StoreResult<Vec<Expense>> {
        let inner = self.inner.lock().await;
        Ok(inner.expenses.get(&period_id).cloned().unwrap_or_default())
    }

    async fn get_expense(&self, id: Uuid) -> StoreResult<Option<Expense>> {
        let inner = self.inner.lock().await;
        Ok(inner
            .expenses
            .values()
            .flatten()
            .find(|e| e.id == id)
            .cloned())
    }

    async fn update_expense(&self, expense: &Expense) -> StoreResult<()> {
        let mut inner = self.inner.lock().await;
        if let Some(list) = inner.expenses.get_mut(&expense.period_id) {
            for slot in list.iter_mut() {
                if slot.id == expense.id {
                    *slot = expense.clone();
                    return Ok(());
                }
            }
        }
        Err(crate::error::EngineError::validation(format!(
            "expense {} not found",
            expense.id
        )))
    }

    async fn replace_expenses(&self, period_id: Uuid, expenses: Vec<Expense>) -> StoreResult<()> {
        let mut inner = self.inner.lock().await;
        debug!(%period_id, count = expenses.len(), "expense set replace");
        inner.expenses.insert(period_id, expenses);
        Ok(())
    }

    async fn bank_transactions(
        &self,
        tower_id: &str,
        period_name: &str,
    ) -> StoreResult<Vec<BankTransaction>> {
        let inner = self.inner.lock().await;
        Ok(inner
            .bank_txns
            .get(&(tower_id.to_string(), period_name.to_string()))
            .cloned()
            .unwrap_or_default())
    }

    async fn append_bank_transactions(
        &self,
        tower_id: &str,
        period_name: &str,
        transactions: Vec<BankTransaction>,
    ) -> StoreResult<()> {
        let mut inner = self.inner.lock().await;
        inner
            .bank_txns
            .entry((tower_id.to_string(), period_name.to_string()))
            .or_default()
            .extend(transactions);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn rate(y: i32, m: u32, d: u32, value: rust_decimal::Decimal) -> ExchangeRate {
        ExchangeRate {
            date: NaiveDate::from_ymd_opt(y, m, d).unwrap(),
            value,
            provider: "BCV".to_string(),
        }
    }

    #[tokio::test]
    async fn test_rate_upsert_deduplicates_by_date_and_provider() {
        let store = MemoryStore::new();
        store.upsert_rate(rate(2026, 2, 10, dec!(40))).await.unwrap();
        store
            .upsert_rate(rate(2026, 2, 10, dec!(40.5)))
            .await
            .unwrap();

        let found = store
            .latest_rate_on_or_before(NaiveDate::from_ymd_opt(2026, 2, 10).unwrap())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.value, dec!(40.5));
    }

    #[tokio::test]
    async fn test_latest_rate_on_or_before_picks_maximum_prior_date() {
        let store = MemoryStore::new();
        store.upsert_rate(rate(2026, 2, 1, dec!(39.5))).await.unwrap();
        store.upsert_rate(rate(2026, 2, 10, dec!(40))).await.unwrap();
        store.upsert_rate(rate(2026, 3, 1, dec!(41))).await.unwrap();

        let found = store
            .latest_rate_on_or_before(NaiveDate::from_ymd_opt(2026, 2, 15).unwrap())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.date, NaiveDate::from_ymd_opt(2026, 2, 10).unwrap());

        let none = store
            .latest_rate_on_or_before(NaiveDate::from_ymd_opt(2026, 1, 31).unwrap())
            .await
            .unwrap();
        assert!(none.is_none());
    }

    #[tokio::test]
    async fn test_upsert_period_assigns_surrogate_id_once() {
        let store = MemoryStore::new();
        let draft = PeriodDraft {
            tower_id: "torre-a".to_string(),
            period_name: "2026-02".to_string(),
            bcv_rate: dec!(40),
            reserve_fund: dec!(16),
        };

        let first = store.upsert_period(&draft).await.unwrap();
        assert_eq!(first.status, PeriodStatus::Draft);

        let again = store
            .upsert_period(&PeriodDraft {
                bcv_rate: dec!(41),
                ..draft.clone()
            })
            .await
            .unwrap();
        assert_eq!(again.id, first.id);
        assert_eq!(again.bcv_rate, dec!(41));
        assert_eq!(again.created_at, first.created_at);
    }

    #[tokio::test]
    async fn test_replace_expenses_swaps_whole_set() {
        let store = MemoryStore::new();
        let period_id = Uuid::new_v4();

        store
            .replace_expenses(
                period_id,
                vec![
                    Expense::new(period_id, "VIGILANCIA", dec!(100)),
                    Expense::new(period_id, "ASEO", dec!(50)),
                ],
            )
            .await
            .unwrap();
        store
            .replace_expenses(period_id, vec![Expense::new(period_id, "ASEO", dec!(55))])
            .await
            .unwrap();

        let expenses = store.expenses_for_period(period_id).await.unwrap();
        assert_eq!(expenses.len(), 1);
        assert_eq!(expenses[0].description, "ASEO");
    }
}

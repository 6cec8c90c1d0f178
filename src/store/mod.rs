//! Data-access layer: four collections (exchange rates, periods, period
//! expenses, bank transactions) behind one async trait, with an in-memory
//! implementation for tests and a fjall-backed one for real runs.

pub mod disk;
pub mod memory;

use async_trait::async_trait;
use chrono::NaiveDate;
use uuid::Uuid;

use crate::error::EngineError;
use crate::model::{BankTransaction, ExchangeRate, Expense, Period, PeriodDraft, PeriodStatus};

pub type StoreResult<T> = Result<T, EngineError>;

/// Row-level access to the engine's collections. All failures surface as
/// [`EngineError::PersistenceFailed`]; callers do not retry.
#[async_trait]
pub trait DataStore: Send + Sync {
    /// Upserts keyed by `(date, provider)` so duplicate-date rows cannot
    /// accumulate.
    async fn upsert_rate(&self, rate: ExchangeRate) -> StoreResult<()>;

    /// Latest rate with `date <= query`, or `None`.
    async fn latest_rate_on_or_before(&self, date: NaiveDate)
        -> StoreResult<Option<ExchangeRate>>;

    async fn find_period(&self, tower_id: &str, period_name: &str)
        -> StoreResult<Option<Period>>;

    async fn get_period(&self, id: Uuid) -> StoreResult<Option<Period>>;

    /// Upserts the period header by natural key. A new period gets a fresh
    /// surrogate id and `Draft` status; an existing one keeps its id, status
    /// and creation timestamp.
    async fn upsert_period(&self, draft: &PeriodDraft) -> StoreResult<Period>;

    async fn update_period_status(&self, id: Uuid, status: PeriodStatus) -> StoreResult<()>;

    /// Expenses in insertion order.
    async fn expenses_for_period(&self, period_id: Uuid) -> StoreResult<Vec<Expense>>;

    async fn get_expense(&self, id: Uuid) -> StoreResult<Option<Expense>>;

    async fn update_expense(&self, expense: &Expense) -> StoreResult<()>;

    /// Replaces the whole expense set of a period as one logical write.
    async fn replace_expenses(&self, period_id: Uuid, expenses: Vec<Expense>) -> StoreResult<()>;

    async fn bank_transactions(
        &self,
        tower_id: &str,
        period_name: &str,
    ) -> StoreResult<Vec<BankTransaction>>;

    async fn append_bank_transactions(
        &self,
        tower_id: &str,
        period_name: &str,
        transactions: Vec<BankTransaction>,
    ) -> StoreResult<()>;
}

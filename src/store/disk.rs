use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use fjall::{Keyspace, PartitionCreateOptions, PartitionHandle};
use std::path::Path;
use tracing::debug;
use uuid::Uuid;

use super::{DataStore, StoreResult};
use crate::error::EngineError;
use crate::model::{BankTransaction, ExchangeRate, Expense, Period, PeriodDraft, PeriodStatus};

const RATE_PARTITION: &str = "rates";
const PERIOD_PARTITION: &str = "periods";
const EXPENSE_PARTITION: &str = "expenses";
const BANK_PARTITION: &str = "bank_txns";

/// Persistent store backed by a fjall keyspace, one partition per
/// collection. Keys are prefixed so range scans come back in natural order:
/// rates by `date|provider`, expenses by `period_id|seq`.
pub struct FjallStore {
    keyspace: Keyspace,
    rates: PartitionHandle,
    periods: PartitionHandle,
    expenses: PartitionHandle,
    bank_txns: PartitionHandle,
}

impl FjallStore {
    pub fn open(path: &Path) -> StoreResult<Self> {
        std::fs::create_dir_all(path).map_err(EngineError::persistence)?;
        let keyspace = fjall::Config::new(path)
            .open()
            .map_err(EngineError::persistence)?;

        let open = |name: &str| {
            keyspace
                .open_partition(name, PartitionCreateOptions::default())
                .map_err(EngineError::persistence)
        };

        Ok(FjallStore {
            rates: open(RATE_PARTITION)?,
            periods: open(PERIOD_PARTITION)?,
            expenses: open(EXPENSE_PARTITION)?,
            bank_txns: open(BANK_PARTITION)?,
            keyspace,
        })
    }

    fn rate_key(date: NaiveDate, provider: &str) -> String {
        format!("{date}|{provider}")
    }

    fn period_key(tower_id: &str, period_name: &str) -> String {
        format!("{tower_id}|{period_name}")
    }

    fn decode<T: serde::de::DeserializeOwned>(bytes: &[u8]) -> StoreResult<T> {
        serde_json::from_slice(bytes).map_err(EngineError::persistence)
    }

    fn encode<T: serde::Serialize>(value: &T) -> StoreResult<Vec<u8>> {
        serde_json::to_vec(value).map_err(EngineError::persistence)
    }

    fn scan_period_rows(&self, period_id: Uuid) -> StoreResult<Vec<(Vec<u8>, Expense)>> {
        let prefix = format!("{period_id}|");
        let mut rows = Vec::new();
        for item in self.expenses.prefix(prefix) {
            let (key, value) = item.map_err(EngineError::persistence)?;
            rows.push((key.to_vec(), Self::decode(&value)?));
        }
        Ok(rows)
    }
}

#[async_trait]
impl DataStore for FjallStore {
    async fn upsert_rate(&self, rate: ExchangeRate) -> StoreResult<()> {
        let key = Self::rate_key(rate.date, &rate.provider);
        debug!(%key, "rate upsert");
        self.rates
            .insert(key, Self::encode(&rate)?)
            .map_err(EngineError::persistence)
    }

    async fn latest_rate_on_or_before(
        &self,
        date: NaiveDate,
    ) -> StoreResult<Option<ExchangeRate>> {
        // '~' sorts after the '|' separator, so this bound covers every
        // provider on the query date.
        let upper = format!("{date}~");
        match self.rates.range(..=upper).next_back() {
            Some(item) => {
                let (_, value) = item.map_err(EngineError::persistence)?;
                Ok(Some(Self::decode(&value)?))
            }
            None => Ok(None),
        }
    }

    async fn find_period(
        &self,
        tower_id: &str,
        period_name: &str,
    ) -> StoreResult<Option<Period>> {
        let key = Self::period_key(tower_id, period_name);
        match self.periods.get(key).map_err(EngineError::persistence)? {
            Some(value) => Ok(Some(Self::decode(&value)?)),
            None => Ok(None),
        }
    }

    async fn get_period(&self, id: Uuid) -> StoreResult<Option<Period>> {
        for item in self.periods.iter() {
            let (_, value) = item.map_err(EngineError::persistence)?;
            let period: Period = Self::decode(&value)?;
            if period.id == id {
                return Ok(Some(period));
            }
        }
        Ok(None)
    }

    async fn upsert_period(&self, draft: &PeriodDraft) -> StoreResult<Period> {
        let key = Self::period_key(&draft.tower_id, &draft.period_name);
        let now = Utc::now();

        let period = match self.periods.get(&key).map_err(EngineError::persistence)? {
            Some(value) => {
                let existing: Period = Self::decode(&value)?;
                Period {
                    bcv_rate: draft.bcv_rate,
                    reserve_fund: draft.reserve_fund,
                    updated_at: now,
                    ..existing
                }
            }
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

        self.periods
            .insert(key, Self::encode(&period)?)
            .map_err(EngineError::persistence)?;
        Ok(period)
    }

    async fn update_period_status(&self, id: Uuid, status: PeriodStatus) -> StoreResult<()> {
        for item in self.periods.iter() {
            let (key, value) = item.map_err(EngineError::persistence)?;
            let mut period: Period = Self::decode(&value)?;
            if period.id == id {
                period.status = status;
                period.updated_at = Utc::now();
                self.periods
                    .insert(key, Self::encode(&period)?)
                    .map_err(EngineError::persistence)?;
                return Ok(());
            }
        }
        Ok(())
    }

    async fn expenses_for_period(&self, period_id: Uuid) -> StoreResult<Vec<Expense>> {
        Ok(self
            .scan_period_rows(period_id)?
            .into_iter()
            .map(|(_, expense)| expense)
            .collect())
    }

    async fn get_expense(&self, id: Uuid) -> StoreResult<Option<Expense>> {
        for item in self.expenses.iter() {
            let (_, value) = item.map_err(EngineError::persistence)?;
            let expense: Expense = Self::decode(&value)?;
            if expense.id == id {
                return Ok(Some(expense));
            }
        }
        Ok(None)
    }

    async fn update_expense(&self, expense: &Expense) -> StoreResult<()> {
        for (key, row) in self.scan_period_rows(expense.period_id)? {
            if row.id == expense.id {
                self.expenses
                    .insert(key, Self::encode(expense)?)
                    .map_err(EngineError::persistence)?;
                return Ok(());
            }
        }
        Err(EngineError::validation(format!(
            "expense {} not found",
            expense.id
        )))
    }

    async fn replace_expenses(&self, period_id: Uuid, expenses: Vec<Expense>) -> StoreResult<()> {
        // Deletes and inserts commit as one batch, so an interrupted replace
        // cannot leave the period half-written.
        let mut batch = self.keyspace.batch();
        for (key, _) in self.scan_period_rows(period_id)? {
            batch.remove(&self.expenses, key);
        }
        for (seq, expense) in expenses.iter().enumerate() {
            let key = format!("{period_id}|{seq:06}");
            batch.insert(&self.expenses, key, Self::encode(expense)?);
        }
        debug!(%period_id, count = expenses.len(), "expense set replace");
        batch.commit().map_err(EngineError::persistence)
    }

    async fn bank_transactions(
        &self,
        tower_id: &str,
        period_name: &str,
    ) -> StoreResult<Vec<BankTransaction>> {
        let prefix = format!("{tower_id}|{period_name}|");
        let mut transactions = Vec::new();
        for item in self.bank_txns.prefix(prefix) {
            let (_, value) = item.map_err(EngineError::persistence)?;
            transactions.push(Self::decode(&value)?);
        }
        Ok(transactions)
    }

    async fn append_bank_transactions(
        &self,
        tower_id: &str,
        period_name: &str,
        transactions: Vec<BankTransaction>,
    ) -> StoreResult<()> {
        let prefix = format!("{tower_id}|{period_name}|");
        let existing = self.bank_txns.prefix(&prefix).count();
        for (offset, txn) in transactions.iter().enumerate() {
            let key = format!("{prefix}{:06}", existing + offset);
            self.bank_txns
                .insert(key, Self::encode(txn)?)
                .map_err(EngineError::persistence)?;
        }
        Ok(())
    }
}

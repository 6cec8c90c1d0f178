//! Bank statement import. Transactions are read-only once imported; they
//! only ever feed reconciliation.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

use crate::config::AppConfig;
use crate::model::BankTransaction;
use crate::store::DataStore;

#[derive(Debug, Deserialize)]
struct StatementFile {
    transactions: Vec<BankTransaction>,
}

pub async fn import(
    config: &AppConfig,
    store: &dyn DataStore,
    tower_id: &str,
    period_name: &str,
    file: &Path,
) -> Result<()> {
    config.tower(tower_id)?;

    let content = std::fs::read_to_string(file)
        .with_context(|| format!("Failed to read statement file: {}", file.display()))?;
    let statement: StatementFile = serde_yaml::from_str(&content)
        .with_context(|| format!("Failed to parse statement file: {}", file.display()))?;

    let count = statement.transactions.len();
    store
        .append_bank_transactions(tower_id, period_name, statement.transactions)
        .await?;

    println!("Imported {count} bank transaction(s) for {tower_id} {period_name}.");
    Ok(())
}

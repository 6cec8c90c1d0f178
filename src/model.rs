//! Domain types shared by the engine, the store and the CLI.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One official exchange rate row (local-currency units per USD).
///
/// At most one row exists per `(date, provider)`; the store upserts on that
/// pair. Rate values carry up to 4 decimal digits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExchangeRate {
    pub date: NaiveDate,
    pub value: Decimal,
    pub provider: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PeriodStatus {
    Draft,
    Published,
}

impl PeriodStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PeriodStatus::Draft => "draft",
            PeriodStatus::Published => "published",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Pendiente,
    Pagado,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pendiente => "PENDIENTE",
            PaymentStatus::Pagado => "PAGADO",
        }
    }
}

/// One tower's one-month billing cycle. Natural key is
/// `(tower_id, period_name)`; the surrogate `id` is assigned by the store on
/// first persistence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Period {
    pub id: Uuid,
    pub tower_id: String,
    pub period_name: String,
    pub bcv_rate: Decimal,
    pub reserve_fund: Decimal,
    pub status: PeriodStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Period {
    pub fn is_published(&self) -> bool {
        self.status == PeriodStatus::Published
    }

    /// First calendar day of the period's month, parsed from the
    /// `YYYY-MM` period name.
    pub fn start_date(&self) -> Option<NaiveDate> {
        period_start_date(&self.period_name)
    }
}

pub fn period_start_date(period_name: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(&format!("{period_name}-01"), "%Y-%m-%d").ok()
}

/// Header fields of a period as provided by the caller; the store fills in
/// the surrogate id, status and timestamps.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PeriodDraft {
    pub tower_id: String,
    pub period_name: String,
    pub bcv_rate: Decimal,
    pub reserve_fund: Decimal,
}

/// A declared expense owned by exactly one period.
///
/// The four payment snapshot fields (`payment_date`, `amount_bs`,
/// `bcv_rate_at_payment`, `amount_usd_at_payment`) are set together by a
/// payment recording and cleared together by a void; `payment_status` is
/// `Pagado` iff all four are present.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Expense {
    pub id: Uuid,
    pub period_id: Uuid,
    pub description: String,
    /// Declared amount in USD.
    pub amount: Decimal,
    pub payment_status: PaymentStatus,
    pub bank_reference: Option<String>,
    pub payment_date: Option<NaiveDate>,
    pub amount_bs: Option<Decimal>,
    pub bcv_rate_at_payment: Option<Decimal>,
    pub amount_usd_at_payment: Option<Decimal>,
    /// Synthesized at reconciliation time, never persisted.
    #[serde(default)]
    pub is_virtual: bool,
}

impl Expense {
    pub fn new(period_id: Uuid, description: impl Into<String>, amount: Decimal) -> Self {
        Expense {
            id: Uuid::new_v4(),
            period_id,
            description: description.into(),
            amount,
            payment_status: PaymentStatus::Pendiente,
            bank_reference: None,
            payment_date: None,
            amount_bs: None,
            bcv_rate_at_payment: None,
            amount_usd_at_payment: None,
            is_virtual: false,
        }
    }

    pub fn has_payment_snapshot(&self) -> bool {
        self.payment_date.is_some()
            && self.amount_bs.is_some()
            && self.bcv_rate_at_payment.is_some()
            && self.amount_usd_at_payment.is_some()
    }
}

/// Expense row as supplied by a caller (CLI file or UI form). Ids and
/// payment fields are optional; missing payment fields are recovered from
/// the persisted set during save, see `reconcile::merge_payment_fields`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExpenseInput {
    #[serde(default)]
    pub id: Option<Uuid>,
    pub description: String,
    pub amount: Decimal,
    #[serde(default)]
    pub payment_status: Option<PaymentStatus>,
    #[serde(default)]
    pub bank_reference: Option<String>,
    #[serde(default)]
    pub payment_date: Option<NaiveDate>,
    #[serde(default)]
    pub amount_bs: Option<Decimal>,
    #[serde(default)]
    pub bcv_rate_at_payment: Option<Decimal>,
    #[serde(default)]
    pub amount_usd_at_payment: Option<Decimal>,
}

impl ExpenseInput {
    pub fn has_payment_snapshot(&self) -> bool {
        self.payment_date.is_some()
            && self.amount_bs.is_some()
            && self.bcv_rate_at_payment.is_some()
            && self.amount_usd_at_payment.is_some()
    }
}

impl From<Expense> for ExpenseInput {
    fn from(e: Expense) -> Self {
        ExpenseInput {
            id: Some(e.id),
            description: e.description,
            amount: e.amount,
            payment_status: Some(e.payment_status),
            bank_reference: e.bank_reference,
            payment_date: e.payment_date,
            amount_bs: e.amount_bs,
            bcv_rate_at_payment: e.bcv_rate_at_payment,
            amount_usd_at_payment: e.amount_usd_at_payment,
        }
    }
}

/// One row of a bank statement. Negative amounts are debits. Read-only
/// input to reconciliation; imported, never edited.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BankTransaction {
    pub date: NaiveDate,
    pub description: String,
    /// Signed amount in bolívars; negative = debit.
    pub amount: Decimal,
}

//! External rate sources.

pub mod bcv;
pub mod util;

use anyhow::Result;
use async_trait::async_trait;
use chrono::NaiveDate;
use rust_decimal::Decimal;

/// A quote from the official feed: the rate value and the date it became
/// effective (the feed publishes business days only).
#[derive(Debug, Clone, PartialEq)]
pub struct OfficialRate {
    pub value: Decimal,
    pub effective_date: NaiveDate,
}

#[async_trait]
pub trait RateSource: Send + Sync {
    /// Provider tag stored alongside the rate, e.g. `"BCV"`.
    fn provider_name(&self) -> &str;

    async fn fetch_official_rate(&self) -> Result<OfficialRate>;
}

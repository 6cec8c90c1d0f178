use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, instrument};

use super::util::with_retry;
use super::{OfficialRate, RateSource};
use crate::cache::Cache;

const PROVIDER_NAME: &str = "BCV";

/// Fetches the official BCV reference rate from a JSON gateway. Responses
/// are cached for the lifetime of the process; the gateway publishes at
/// most one quote per business day.
pub struct BcvRateProvider {
    base_url: String,
    cache: Arc<Cache<String, OfficialRate>>,
}

impl BcvRateProvider {
    pub fn new(base_url: &str, cache: Arc<Cache<String, OfficialRate>>) -> Self {
        BcvRateProvider {
            base_url: base_url.to_string(),
            cache,
        }
    }
}

#[derive(Deserialize, Debug)]
struct BcvQuoteResponse {
    price: Decimal,
    #[serde(alias = "last_update")]
    effective_date: NaiveDate,
}

#[async_trait]
impl RateSource for BcvRateProvider {
    fn provider_name(&self) -> &str {
        PROVIDER_NAME
    }

    #[instrument(name = "BcvRateFetch", skip(self))]
    async fn fetch_official_rate(&self) -> Result<OfficialRate> {
        let key = PROVIDER_NAME.to_string();
        if let Some(cached) = self.cache.get(&key).await {
            return Ok(cached);
        }

        let url = format!("{}/api/v1/dollar/bcv", self.base_url);
        debug!("Requesting official rate from {}", url);

        let client = reqwest::Client::builder()
            .user_agent("alicuota/0.2")
            .build()?;

        let response = with_retry(
            || async { client.get(&url).send().await?.error_for_status() },
            2,
            500,
        )
        .await
        .map_err(|e| anyhow!("Request error: {} for URL: {}", e, url))?;

        let quote = response.json::<BcvQuoteResponse>().await?;
        if quote.price <= Decimal::ZERO {
            return Err(anyhow!("Feed returned a non-positive rate: {}", quote.price));
        }

        let result = OfficialRate {
            value: quote.price,
            effective_date: quote.effective_date,
        };
        self.cache.put(key, result.clone()).await;

        Ok(result)
    }
}

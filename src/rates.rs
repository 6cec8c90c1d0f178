//! Exchange-rate resolution with most-recent-prior fallback.

use chrono::NaiveDate;
use rust_decimal::{Decimal, RoundingStrategy};
use tracing::{debug, warn};

use crate::error::EngineError;
use crate::model::{period_start_date, ExchangeRate};
use crate::providers::RateSource;
use crate::store::DataStore;

/// The applicable rate for a query date. When no rate exists on the exact
/// date (weekends, holidays) the most recent prior one is returned; compare
/// dates via [`RateLookup::is_fallback_for`] when the distinction matters.
#[derive(Debug, Clone, PartialEq)]
pub struct RateLookup {
    pub value: Decimal,
    pub date: NaiveDate,
}

impl RateLookup {
    pub fn is_fallback_for(&self, query: NaiveDate) -> bool {
        self.date != query
    }
}

pub struct RateResolver<'a> {
    store: &'a dyn DataStore,
}

impl<'a> RateResolver<'a> {
    pub fn new(store: &'a dyn DataStore) -> Self {
        RateResolver { store }
    }

    /// Latest rate dated on or before `date`. Never fabricates a value: if
    /// no record qualifies the caller gets [`EngineError::RateNotFound`] and
    /// decides its own fallback display.
    pub async fn resolve(&self, date: NaiveDate) -> Result<RateLookup, EngineError> {
        match self.store.latest_rate_on_or_before(date).await? {
            Some(rate) => {
                if rate.date != date {
                    debug!(query = %date, found = %rate.date, "rate fallback to prior date");
                }
                Ok(RateLookup {
                    value: rate.value,
                    date: rate.date,
                })
            }
            None => Err(EngineError::RateNotFound { date }),
        }
    }

    /// Rate applicable at the first calendar day of a `YYYY-MM` period.
    pub async fn resolve_period_start(
        &self,
        period_name: &str,
    ) -> Result<RateLookup, EngineError> {
        let start = period_start_date(period_name).ok_or_else(|| {
            EngineError::validation(format!(
                "period name '{period_name}' is not in YYYY-MM format"
            ))
        })?;
        self.resolve(start).await
    }

    /// Pulls the official rate from the external source and upserts it keyed
    /// by `(date, provider)`. Values are kept to 4 decimal digits.
    pub async fn refresh(&self, source: &dyn RateSource) -> Result<ExchangeRate, EngineError> {
        let official = source
            .fetch_official_rate()
            .await
            .map_err(EngineError::persistence)?;

        let rate = ExchangeRate {
            date: official.effective_date,
            value: official
                .value
                .round_dp_with_strategy(4, RoundingStrategy::MidpointAwayFromZero),
            provider: source.provider_name().to_string(),
        };
        self.store.upsert_rate(rate.clone()).await?;
        Ok(rate)
    }

    /// Best-effort refresh before a display operation. Failures are logged
    /// and stale data keeps flowing.
    pub async fn refresh_opportunistic(&self, source: &dyn RateSource) {
        if let Err(e) = self.refresh(source).await {
            warn!(error = %e, "opportunistic rate refresh failed, using stored rates");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::OfficialRate;
    use crate::store::memory::MemoryStore;
    use rust_decimal_macros::dec;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    async fn seeded_store() -> MemoryStore {
        let store = MemoryStore::new();
        for (d, v) in [
            (date(2026, 2, 1), dec!(39.5011)),
            (date(2026, 2, 10), dec!(40.0000)),
        ] {
            store
                .upsert_rate(ExchangeRate {
                    date: d,
                    value: v,
                    provider: "BCV".to_string(),
                })
                .await
                .unwrap();
        }
        store
    }

    #[tokio::test]
    async fn test_exact_date_resolution() {
        let store = seeded_store().await;
        let resolver = RateResolver::new(&store);

        let lookup = resolver.resolve(date(2026, 2, 10)).await.unwrap();
        assert_eq!(lookup.value, dec!(40.0000));
        assert!(!lookup.is_fallback_for(date(2026, 2, 10)));
    }

    #[tokio::test]
    async fn test_fallback_to_most_recent_prior_rate() {
        let store = seeded_store().await;
        let resolver = RateResolver::new(&store);

        // 2026-02-15 has no rate of its own; 02-10 is the latest prior.
        let lookup = resolver.resolve(date(2026, 2, 15)).await.unwrap();
        assert_eq!(lookup.date, date(2026, 2, 10));
        assert_eq!(lookup.value, dec!(40.0000));
        assert!(lookup.is_fallback_for(date(2026, 2, 15)));
    }

    #[tokio::test]
    async fn test_no_prior_rate_is_not_found() {
        let store = seeded_store().await;
        let resolver = RateResolver::new(&store);

        let err = resolver.resolve(date(2026, 1, 15)).await.unwrap_err();
        assert!(matches!(err, EngineError::RateNotFound { .. }));
    }

    struct StubSource(OfficialRate);

    #[async_trait::async_trait]
    impl RateSource for StubSource {
        fn provider_name(&self) -> &str {
            "BCV"
        }

        async fn fetch_official_rate(&self) -> anyhow::Result<OfficialRate> {
            Ok(self.0.clone())
        }
    }

    #[tokio::test]
    async fn test_refresh_rounds_and_upserts_by_date_and_provider() {
        let store = MemoryStore::new();
        let resolver = RateResolver::new(&store);
        let source = StubSource(OfficialRate {
            value: dec!(40.12345),
            effective_date: date(2026, 2, 11),
        });

        let stored = resolver.refresh(&source).await.unwrap();
        assert_eq!(stored.value, dec!(40.1235));
        assert_eq!(stored.provider, "BCV");

        // A second refresh on the same date replaces, never duplicates.
        let source = StubSource(OfficialRate {
            value: dec!(40.2),
            effective_date: date(2026, 2, 11),
        });
        resolver.refresh(&source).await.unwrap();

        let lookup = resolver.resolve(date(2026, 2, 11)).await.unwrap();
        assert_eq!(lookup.value, dec!(40.2));
    }

    #[tokio::test]
    async fn test_period_start_resolution() {
        let store = seeded_store().await;
        let resolver = RateResolver::new(&store);

        let lookup = resolver.resolve_period_start("2026-02").await.unwrap();
        assert_eq!(lookup.date, date(2026, 2, 1));

        let err = resolver.resolve_period_start("febrero").await.unwrap_err();
        assert!(matches!(err, EngineError::ValidationFailed { .. }));
    }
}

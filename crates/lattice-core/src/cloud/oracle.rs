//! PriceOracle - on-demand / spot 価格の取得とキャッシュ
//!
//! # 設計原則
//! - キャッシュはプロセスグローバルではなく、注入されるオブジェクトが持つ
//! - on-demand は長い TTL（めったに変わらない）、spot は短い TTL
//! - 同じキーへの同時ミスは 1 回の外部呼び出しにまとめる（TtlCache）
//! - 外部呼び出しはリトライ + 試行ごとのタイムアウト付き

use std::sync::Arc;

use chrono::Duration;
use serde::Serialize;
use thiserror::Error;
use tracing::debug;

use super::billing::{os_billing_name, region_full_name};
use super::cache::TtlCache;
use super::spot::SpotPriceSeries;
use crate::domain::{ConfigError, OsFamily};
use crate::ports::{Clock, PricingSource};
use crate::retry::{RetryExhausted, RetryPolicy, retry_with_backoff};

/// On-demand cache key, in pricing-API vocabulary.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct OnDemandKey {
    pub os: &'static str,
    pub instance_type: String,
    pub region: &'static str,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SpotKey {
    pub instance_type: String,
    pub zone: String,
    pub os: &'static str,
}

/// Cheapest current spot price found across the eligible zones.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SpotOffer {
    /// Empty string means "region-wide".
    pub zone: String,
    pub price: f64,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum PricingError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Fetch(#[from] RetryExhausted),

    #[error("no spot price samples for {instance_type} in zones {zones:?}")]
    NoSpotData {
        instance_type: String,
        zones: Vec<String>,
    },
}

pub struct PriceOracle {
    source: Arc<dyn PricingSource>,
    on_demand: TtlCache<OnDemandKey, f64>,
    spot: TtlCache<SpotKey, SpotPriceSeries>,
    retry: RetryPolicy,
}

impl PriceOracle {
    /// One-day on-demand TTL, five-minute spot TTL.
    pub fn new(source: Arc<dyn PricingSource>, clock: Arc<dyn Clock>, retry: RetryPolicy) -> Self {
        Self::with_ttls(source, clock, retry, Duration::days(1), Duration::minutes(5))
    }

    pub fn with_ttls(
        source: Arc<dyn PricingSource>,
        clock: Arc<dyn Clock>,
        retry: RetryPolicy,
        on_demand_ttl: Duration,
        spot_ttl: Duration,
    ) -> Self {
        Self {
            source,
            on_demand: TtlCache::new(on_demand_ttl, clock.clone()),
            spot: TtlCache::new(spot_ttl, clock),
            retry,
        }
    }

    pub fn on_demand_key(
        os: OsFamily,
        instance_type: &str,
        region: &str,
    ) -> Result<OnDemandKey, ConfigError> {
        Ok(OnDemandKey {
            os: os_billing_name(os),
            instance_type: instance_type.to_string(),
            region: region_full_name(region)?,
        })
    }

    /// Seed a known on-demand price.
    pub fn prime_on_demand(
        &self,
        os: OsFamily,
        instance_type: &str,
        region: &str,
        price: f64,
    ) -> Result<(), ConfigError> {
        self.on_demand
            .prime(Self::on_demand_key(os, instance_type, region)?, price);
        Ok(())
    }

    /// Hourly on-demand price for (os, instance type, region code).
    pub async fn on_demand_price(
        &self,
        os: OsFamily,
        instance_type: &str,
        region: &str,
    ) -> Result<f64, PricingError> {
        let key = Self::on_demand_key(os, instance_type, region)?;
        let (os_name, region_name) = (key.os, key.region);
        let source = &self.source;
        let retry = &self.retry;

        let price = self
            .on_demand
            .get_or_try_fetch(key, move || async move {
                debug!(os = os_name, instance_type, region = region_name, "fetching on-demand price");
                retry_with_backoff(retry, "on-demand price", move || {
                    source.on_demand_price(os_name, instance_type, region_name)
                })
                .await
            })
            .await?;
        Ok(price)
    }

    /// Spot history for one zone (cached with the short TTL).
    pub async fn spot_series(
        &self,
        os: OsFamily,
        instance_type: &str,
        zone: &str,
    ) -> Result<SpotPriceSeries, PricingError> {
        let os_name = os_billing_name(os);
        let key = SpotKey {
            instance_type: instance_type.to_string(),
            zone: zone.to_string(),
            os: os_name,
        };
        let source = &self.source;
        let retry = &self.retry;

        let series = self
            .spot
            .get_or_try_fetch(key, move || async move {
                debug!(os = os_name, instance_type, zone, "fetching spot price history");
                let samples = retry_with_backoff(retry, "spot price history", move || {
                    source.spot_price_history(instance_type, zone, os_name)
                })
                .await?;
                Ok::<_, RetryExhausted>(SpotPriceSeries::new(samples))
            })
            .await?;
        Ok(series)
    }

    /// Lowest latest spot price across `zones` (empty = region-wide).
    ///
    /// Zones that fail or have no samples are skipped; ties keep the earlier zone.
    pub async fn cheapest_spot(
        &self,
        os: OsFamily,
        instance_type: &str,
        zones: &[String],
    ) -> Result<SpotOffer, PricingError> {
        let region_wide = [String::new()];
        let zones = if zones.is_empty() { &region_wide[..] } else { zones };

        let mut best: Option<SpotOffer> = None;
        let mut last_error = None;
        for zone in zones {
            match self.spot_series(os, instance_type, zone).await {
                Ok(series) => {
                    let Some(latest) = series.latest() else {
                        continue;
                    };
                    if best.as_ref().is_none_or(|b| latest.price < b.price) {
                        best = Some(SpotOffer {
                            zone: zone.clone(),
                            price: latest.price,
                        });
                    }
                }
                Err(e) => {
                    debug!(zone = %zone, instance_type, error = %e, "spot price unavailable for zone");
                    last_error = Some(e);
                }
            }
        }

        match (best, last_error) {
            (Some(offer), _) => Ok(offer),
            (None, Some(e)) => Err(e),
            (None, None) => Err(PricingError::NoSpotData {
                instance_type: instance_type.to_string(),
                zones: zones.to_vec(),
            }),
        }
    }
}

//! ProviderSelector - spot か on-demand かの選択
//!
//! # 判定ルール
//! - `ProviderMode::OnDemand` / `ProviderMode::Spot`: 価格を見ずにそのまま返す
//! - `ProviderMode::Auto`: spot が on-demand より厳密に安いときだけ spot
//! - 価格が取れない場合は on-demand にフォールバック（ホスト作成を止めない）

use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, warn};

use super::oracle::PriceOracle;
use crate::domain::{Distro, Provider, ProviderMode};

/// Outcome of one provider decision.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProviderChoice {
    pub provider: Provider,
    pub zone: Option<String>,
    pub on_demand_price: Option<f64>,
    pub spot_price: Option<f64>,
    pub reason: String,
}

impl ProviderChoice {
    fn fixed(provider: Provider) -> Self {
        Self {
            provider,
            zone: None,
            on_demand_price: None,
            spot_price: None,
            reason: format!("distro pins provider {}", provider.as_str()),
        }
    }
}

/// Strict-inequality rule: a tie goes to on-demand.
pub fn cheaper_provider(on_demand: f64, spot: f64) -> Provider {
    if spot < on_demand {
        Provider::Spot
    } else {
        Provider::OnDemand
    }
}

pub struct ProviderSelector {
    oracle: Arc<PriceOracle>,
    zones: Vec<String>,
}

impl ProviderSelector {
    /// `zones` are the availability zones eligible for spot; empty means region-wide.
    pub fn new(oracle: Arc<PriceOracle>, zones: Vec<String>) -> Self {
        Self { oracle, zones }
    }

    pub fn oracle(&self) -> &Arc<PriceOracle> {
        &self.oracle
    }

    pub async fn select(&self, distro: &Distro) -> ProviderChoice {
        match distro.provider {
            ProviderMode::OnDemand => ProviderChoice::fixed(Provider::OnDemand),
            ProviderMode::Spot => ProviderChoice::fixed(Provider::Spot),
            ProviderMode::Auto => self.select_auto(distro).await,
        }
    }

    async fn select_auto(&self, distro: &Distro) -> ProviderChoice {
        let os = distro.os();
        let (on_demand, spot) = tokio::join!(
            self.oracle
                .on_demand_price(os, &distro.instance_type, &distro.region),
            self.oracle
                .cheapest_spot(os, &distro.instance_type, &self.zones),
        );

        match (on_demand, spot) {
            (Ok(on_demand), Ok(offer)) => {
                let provider = cheaper_provider(on_demand, offer.price);
                debug!(
                    distro = %distro.id,
                    on_demand,
                    spot = offer.price,
                    zone = %offer.zone,
                    provider = provider.as_str(),
                    "provider chosen by price"
                );
                ProviderChoice {
                    provider,
                    zone: (provider == Provider::Spot && !offer.zone.is_empty())
                        .then(|| offer.zone.clone()),
                    on_demand_price: Some(on_demand),
                    spot_price: Some(offer.price),
                    reason: format!(
                        "spot {:.4} vs on-demand {:.4} in {}",
                        offer.price,
                        on_demand,
                        if offer.zone.is_empty() { &distro.region } else { &offer.zone }
                    ),
                }
            }
            (on_demand, spot) => {
                let error = match (&on_demand, &spot) {
                    (Err(e), _) | (_, Err(e)) => e.to_string(),
                    _ => String::new(),
                };
                warn!(
                    distro = %distro.id,
                    instance_type = %distro.instance_type,
                    error = %error,
                    "pricing unavailable, falling back to on-demand"
                );
                ProviderChoice {
                    provider: Provider::OnDemand,
                    zone: None,
                    on_demand_price: on_demand.ok(),
                    spot_price: spot.ok().map(|o| o.price),
                    reason: format!("pricing unavailable ({error}), using on-demand"),
                }
            }
        }
    }

}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::OsFamily;
    use crate::impls::StaticPricingSource;
    use crate::ports::{FixedClock, SpotPriceSample};
    use crate::retry::RetryPolicy;
    use chrono::{DateTime, TimeZone, Utc};
    use rstest::rstest;

    const VIRGINIA: &str = "US East (N. Virginia)";

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
    }

    fn retry() -> RetryPolicy {
        RetryPolicy {
            base_delay: std::time::Duration::from_millis(1),
            max_attempts: 1,
            ..RetryPolicy::default()
        }
    }

    fn selector(source: StaticPricingSource, zones: &[&str]) -> ProviderSelector {
        let oracle = PriceOracle::new(
            Arc::new(source),
            Arc::new(FixedClock::new(t0())),
            retry(),
        );
        ProviderSelector::new(
            Arc::new(oracle),
            zones.iter().map(|z| z.to_string()).collect(),
        )
    }

    fn auto_distro() -> Distro {
        let mut distro = Distro::new("ubuntu");
        distro.provider = ProviderMode::Auto;
        distro.instance_type = "m4.large".to_string();
        distro.region = "us-east-1".to_string();
        distro
    }

    fn priced(on_demand: f64, spot: f64) -> StaticPricingSource {
        StaticPricingSource::new()
            .with_on_demand("Linux", "m4.large", VIRGINIA, on_demand)
            .with_spot(
                "m4.large",
                "us-east-1a",
                "Linux",
                vec![SpotPriceSample { at: t0(), price: spot }],
            )
    }

    #[rstest]
    #[case::spot_cheaper(0.1, 0.05, Provider::Spot)]
    #[case::tie_goes_on_demand(0.1, 0.1, Provider::OnDemand)]
    #[case::spot_pricier(0.1, 0.2, Provider::OnDemand)]
    fn strict_inequality_rule(#[case] on_demand: f64, #[case] spot: f64, #[case] expected: Provider) {
        assert_eq!(cheaper_provider(on_demand, spot), expected);
    }

    #[tokio::test]
    async fn auto_picks_spot_when_strictly_cheaper() {
        let selector = selector(priced(0.1, 0.05), &["us-east-1a"]);
        let choice = selector.select(&auto_distro()).await;

        assert_eq!(choice.provider, Provider::Spot);
        assert_eq!(choice.zone.as_deref(), Some("us-east-1a"));
        assert_eq!(choice.on_demand_price, Some(0.1));
        assert_eq!(choice.spot_price, Some(0.05));
    }

    #[tokio::test]
    async fn auto_keeps_on_demand_on_a_tie() {
        let selector = selector(priced(0.1, 0.1), &["us-east-1a"]);
        let choice = selector.select(&auto_distro()).await;
        assert_eq!(choice.provider, Provider::OnDemand);
        assert_eq!(choice.zone, None);
    }

    #[rstest]
    #[case::on_demand(ProviderMode::OnDemand, Provider::OnDemand)]
    #[case::spot(ProviderMode::Spot, Provider::Spot)]
    #[tokio::test]
    async fn static_modes_skip_pricing(#[case] mode: ProviderMode, #[case] expected: Provider) {
        let source = Arc::new(StaticPricingSource::new());
        let oracle = PriceOracle::new(source.clone(), Arc::new(FixedClock::new(t0())), retry());
        let selector = ProviderSelector::new(Arc::new(oracle), vec![]);

        let mut distro = auto_distro();
        distro.provider = mode;
        assert_eq!(selector.select(&distro).await.provider, expected);
        assert_eq!(source.on_demand_calls(), 0);
        assert_eq!(source.spot_calls(), 0);
    }

    #[tokio::test]
    async fn pricing_outage_falls_back_to_on_demand() {
        let selector = selector(StaticPricingSource::new().unavailable(), &["us-east-1a"]);
        let choice = selector.select(&auto_distro()).await;

        assert_eq!(choice.provider, Provider::OnDemand);
        assert!(choice.reason.contains("pricing unavailable"));
    }

    #[tokio::test]
    async fn windows_prices_are_looked_up_under_windows() {
        let source = StaticPricingSource::new()
            .with_on_demand("Windows", "m4.large", VIRGINIA, 0.2)
            .with_spot(
                "m4.large",
                "",
                "Windows",
                vec![SpotPriceSample { at: t0(), price: 0.15 }],
            );
        let selector = selector(source, &[]);
        let mut distro = auto_distro();
        distro.arch = "windows_amd64".to_string();
        assert_eq!(distro.os(), OsFamily::Windows);

        let choice = selector.select(&distro).await;
        assert_eq!(choice.provider, Provider::Spot);
        // region-wide なので zone は記録しない
        assert_eq!(choice.zone, None);
    }
}

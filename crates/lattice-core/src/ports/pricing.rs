//! PricingSource port - クラウド価格データの取得

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::errors::ExternalError;

/// One observed spot price.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpotPriceSample {
    pub at: DateTime<Utc>,
    pub price: f64,
}

/// PricingSource は外部の価格 API を表す
///
/// # 引数の表記
/// - `os`: 課金上の OS 名（"Linux", "SUSE", "Windows"）
/// - `region`: リージョンの正式名（"US East (N. Virginia)" など）
///
/// キャッシュは持たない（PriceOracle が担当）。
#[async_trait]
pub trait PricingSource: Send + Sync {
    async fn on_demand_price(
        &self,
        os: &str,
        instance_type: &str,
        region: &str,
    ) -> Result<f64, ExternalError>;

    /// Recent spot history for one availability zone, in any order.
    async fn spot_price_history(
        &self,
        instance_type: &str,
        zone: &str,
        os: &str,
    ) -> Result<Vec<SpotPriceSample>, ExternalError>;
}

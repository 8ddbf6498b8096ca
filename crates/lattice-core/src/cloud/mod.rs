//! Cloud cost model: billing names, price caching, provider choice, billing boundaries.

pub mod billing;
pub mod cache;
pub mod oracle;
pub mod provider;
pub mod spot;

pub use billing::{next_payment, os_billing_name, region_full_name, time_til_next_payment};
pub use cache::TtlCache;
pub use oracle::{OnDemandKey, PriceOracle, PricingError, SpotKey, SpotOffer};
pub use provider::{ProviderChoice, ProviderSelector, cheaper_provider};
pub use spot::SpotPriceSeries;

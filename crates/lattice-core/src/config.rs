//! SchedulerConfig - スケジューラ全体の設定
//!
//! JSON ファイル + 環境変数で上書き。欠けたフィールドはデフォルト値で埋める。
//!
//! # 設計原則
//! - 読み込みと検証を分ける（`from_json_file` → `apply_env_overrides` → `validate`）
//! - 検証に失敗した設定ではスケジューラを起動しない

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::allocator::HostAllocator;
use crate::cloud::billing;
use crate::domain::ConfigError;
use crate::retry::{self, RetryPolicy};

pub const ENV_CYCLE_INTERVAL: &str = "LATTICE_CYCLE_INTERVAL_SECS";
pub const ENV_CYCLE_DEADLINE: &str = "LATTICE_CYCLE_DEADLINE_SECS";
pub const ENV_REGION: &str = "LATTICE_REGION";

pub const MAX_RETRY_ATTEMPTS: u32 = 10;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchedulerConfig {
    #[serde(default = "default_cycle_interval_secs")]
    pub cycle_interval_secs: u64,

    /// Upper bound on one distro's cycle.
    #[serde(default = "default_cycle_deadline_secs")]
    pub cycle_deadline_secs: u64,

    /// Upper bound on a single external call attempt.
    #[serde(default = "default_external_call_timeout_secs")]
    pub external_call_timeout_secs: u64,

    #[serde(default)]
    pub retry: RetrySettings,

    #[serde(default)]
    pub pricing: PricingSettings,

    #[serde(default)]
    pub allocator: AllocatorSettings,
}

fn default_cycle_interval_secs() -> u64 {
    20
}

fn default_cycle_deadline_secs() -> u64 {
    60
}

fn default_external_call_timeout_secs() -> u64 {
    10
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            cycle_interval_secs: default_cycle_interval_secs(),
            cycle_deadline_secs: default_cycle_deadline_secs(),
            external_call_timeout_secs: default_external_call_timeout_secs(),
            retry: RetrySettings::default(),
            pricing: PricingSettings::default(),
            allocator: AllocatorSettings::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrySettings {
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,

    #[serde(default = "default_multiplier")]
    pub multiplier: f64,

    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
}

fn default_base_delay_ms() -> u64 {
    200
}

fn default_multiplier() -> f64 {
    2.0
}

fn default_max_attempts() -> u32 {
    3
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            base_delay_ms: default_base_delay_ms(),
            multiplier: default_multiplier(),
            max_attempts: default_max_attempts(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PricingSettings {
    #[serde(default = "default_on_demand_ttl_secs")]
    pub on_demand_ttl_secs: u64,

    #[serde(default = "default_spot_ttl_secs")]
    pub spot_ttl_secs: u64,

    /// Zones eligible for spot. Empty means the region-wide price.
    #[serde(default)]
    pub availability_zones: Vec<String>,

    /// Region for distros that do not name one.
    #[serde(default = "default_region")]
    pub region: String,
}

fn default_on_demand_ttl_secs() -> u64 {
    24 * 60 * 60
}

fn default_spot_ttl_secs() -> u64 {
    5 * 60
}

fn default_region() -> String {
    "us-east-1".to_string()
}

impl Default for PricingSettings {
    fn default() -> Self {
        Self {
            on_demand_ttl_secs: default_on_demand_ttl_secs(),
            spot_ttl_secs: default_spot_ttl_secs(),
            availability_zones: Vec::new(),
            region: default_region(),
        }
    }
}

impl PricingSettings {
    pub fn on_demand_ttl(&self) -> chrono::Duration {
        chrono::Duration::seconds(clamp_secs(self.on_demand_ttl_secs))
    }

    pub fn spot_ttl(&self) -> chrono::Duration {
        chrono::Duration::seconds(clamp_secs(self.spot_ttl_secs))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AllocatorSettings {
    /// A running task ending within this window counts its host as free.
    #[serde(default = "default_soon_free_window_secs")]
    pub soon_free_window_secs: u64,

    /// Minimum time to the next billing boundary for terminating an hourly host.
    #[serde(default = "default_termination_margin_secs")]
    pub termination_margin_secs: u64,
}

fn default_soon_free_window_secs() -> u64 {
    120
}

fn default_termination_margin_secs() -> u64 {
    300
}

impl Default for AllocatorSettings {
    fn default() -> Self {
        Self {
            soon_free_window_secs: default_soon_free_window_secs(),
            termination_margin_secs: default_termination_margin_secs(),
        }
    }
}

impl AllocatorSettings {
    pub fn allocator(&self) -> HostAllocator {
        HostAllocator::new(
            chrono::Duration::seconds(clamp_secs(self.soon_free_window_secs)),
            chrono::Duration::seconds(clamp_secs(self.termination_margin_secs)),
        )
    }
}

fn clamp_secs(secs: u64) -> i64 {
    i64::try_from(secs).unwrap_or(i64::MAX / 1_000)
}

impl SchedulerConfig {
    pub fn from_json_str(raw: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(raw).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Io(format!("{}: {e}", path.display())))?;
        Self::from_json_str(&raw)
    }

    /// Apply `LATTICE_*` overrides from the process environment.
    pub fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        self.apply_overrides(|name| std::env::var(name).ok())
    }

    /// Same as [`Self::apply_env_overrides`] with an injectable lookup.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(raw) = lookup(ENV_CYCLE_INTERVAL) {
            self.cycle_interval_secs = parse_secs(ENV_CYCLE_INTERVAL, &raw)?;
        }
        if let Some(raw) = lookup(ENV_CYCLE_DEADLINE) {
            self.cycle_deadline_secs = parse_secs(ENV_CYCLE_DEADLINE, &raw)?;
        }
        if let Some(region) = lookup(ENV_REGION) {
            self.pricing.region = region.trim().to_string();
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let non_zero = [
            ("cycle_interval_secs", self.cycle_interval_secs),
            ("cycle_deadline_secs", self.cycle_deadline_secs),
            ("external_call_timeout_secs", self.external_call_timeout_secs),
        ];
        for (name, value) in non_zero {
            if value == 0 {
                return Err(ConfigError::InvalidSetting {
                    name,
                    reason: "must be greater than zero".to_string(),
                });
            }
        }

        if !self.retry.multiplier.is_finite() || self.retry.multiplier < 1.0 {
            return Err(ConfigError::InvalidSetting {
                name: "retry.multiplier",
                reason: format!("must be finite and >= 1, got {}", self.retry.multiplier),
            });
        }
        if Duration::from_millis(self.retry.base_delay_ms) > retry::MAX_DELAY {
            return Err(ConfigError::InvalidSetting {
                name: "retry.base_delay_ms",
                reason: format!("must be at most {}ms", retry::MAX_DELAY.as_millis()),
            });
        }
        if !(1..=MAX_RETRY_ATTEMPTS).contains(&self.retry.max_attempts) {
            return Err(ConfigError::InvalidSetting {
                name: "retry.max_attempts",
                reason: format!(
                    "must be between 1 and {MAX_RETRY_ATTEMPTS}, got {}",
                    self.retry.max_attempts
                ),
            });
        }

        billing::region_full_name(&self.pricing.region)?;
        Ok(())
    }

    pub fn cycle_interval(&self) -> Duration {
        Duration::from_secs(self.cycle_interval_secs)
    }

    pub fn cycle_deadline(&self) -> Duration {
        Duration::from_secs(self.cycle_deadline_secs)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            base_delay: Duration::from_millis(self.retry.base_delay_ms),
            multiplier: self.retry.multiplier,
            max_attempts: self.retry.max_attempts,
            attempt_timeout: Duration::from_secs(self.external_call_timeout_secs),
        }
    }
}

fn parse_secs(name: &'static str, raw: &str) -> Result<u64, ConfigError> {
    raw.trim().parse().map_err(|_| ConfigError::InvalidSetting {
        name,
        reason: format!("expected whole seconds, got '{raw}'"),
    })
}

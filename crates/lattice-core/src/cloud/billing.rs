//! Billing vocabulary of the pricing API and billing-boundary arithmetic.

use chrono::{DateTime, Duration, Utc};

use crate::domain::{BillingGranularity, ConfigError, Host, OsFamily};

/// OS name as the pricing API spells it.
pub fn os_billing_name(os: OsFamily) -> &'static str {
    match os {
        OsFamily::Linux => "Linux",
        OsFamily::Suse => "SUSE",
        OsFamily::Windows => "Windows",
    }
}

/// Region code -> the "location" name the pricing API indexes on-demand prices by.
pub fn region_full_name(region: &str) -> Result<&'static str, ConfigError> {
    let name = match region {
        "us-east-1" => "US East (N. Virginia)",
        "us-east-2" => "US East (Ohio)",
        "us-west-1" => "US West (N. California)",
        "us-west-2" => "US West (Oregon)",
        "eu-west-1" => "EU (Ireland)",
        "eu-central-1" => "EU (Frankfurt)",
        "ap-southeast-1" => "Asia Pacific (Singapore)",
        "ap-southeast-2" => "Asia Pacific (Sydney)",
        "ap-northeast-1" => "Asia Pacific (Tokyo)",
        other => return Err(ConfigError::UnknownRegion(other.to_string())),
    };
    Ok(name)
}

/// Billing interval that applies to `host` right now.
///
/// Without a start time we cannot know when billing began, so the host is
/// treated as hourly from its creation time.
pub fn effective_billing(host: &Host) -> (BillingGranularity, DateTime<Utc>) {
    match host.started_at {
        Some(started) => (host.billing(), started),
        None => (BillingGranularity::Hourly, host.created_at),
    }
}

/// Next instant at which keeping `host` alive starts a new billable interval.
///
/// Hourly: `anchor + N hours` for the smallest `N >= 1` that lies after `now`.
/// Per-second: `now + 1s`.
pub fn next_payment(host: &Host, now: DateTime<Utc>) -> DateTime<Utc> {
    match effective_billing(host) {
        (BillingGranularity::PerSecond, _) => now + Duration::seconds(1),
        (BillingGranularity::Hourly, anchor) => {
            let elapsed = now - anchor;
            let hours = if elapsed < Duration::zero() {
                1
            } else {
                elapsed.num_hours() + 1
            };
            anchor + Duration::hours(hours)
        }
    }
}

pub fn time_til_next_payment(host: &Host, now: DateTime<Utc>) -> Duration {
    next_payment(host, now) - now
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Distro, Provider};
    use chrono::TimeZone;
    use rstest::rstest;

    fn host(arch: &str, created: DateTime<Utc>, started: Option<DateTime<Utc>>) -> Host {
        let mut distro = Distro::new("d");
        distro.arch = arch.to_string();
        let mut host = Host::new("h", distro, Provider::OnDemand, created);
        host.started_at = started;
        host
    }

    fn at(h: u32, m: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2017, 1, 1, h, m, s).unwrap()
    }

    #[test]
    fn billing_names_match_pricing_api() {
        assert_eq!(os_billing_name(OsFamily::Linux), "Linux");
        assert_eq!(os_billing_name(OsFamily::Suse), "SUSE");
        assert_eq!(os_billing_name(OsFamily::Windows), "Windows");
    }

    #[rstest]
    #[case("us-east-1", "US East (N. Virginia)")]
    #[case("us-west-1", "US West (N. California)")]
    #[case("us-west-2", "US West (Oregon)")]
    fn region_names_translate(#[case] code: &str, #[case] full: &str) {
        assert_eq!(region_full_name(code).unwrap(), full);
    }

    #[test]
    fn unknown_region_is_an_error() {
        assert_eq!(
            region_full_name("amazing"),
            Err(ConfigError::UnknownRegion("amazing".to_string()))
        );
    }

    #[test]
    fn hourly_host_pays_on_the_hour_from_start_time() {
        // 作成 0:30、起動 1:00 → 境界は起動時刻基準
        let h = host("windows_amd64", at(0, 30, 0), Some(at(1, 0, 0)));
        let now = at(3, 17, 42);
        assert_eq!(next_payment(&h, now), at(4, 0, 0));
        assert_eq!(time_til_next_payment(&h, now), Duration::seconds(42 * 60 + 18));
    }

    #[test]
    fn exactly_on_a_boundary_waits_for_the_next_one() {
        let h = host("windows_amd64", at(0, 0, 0), Some(at(1, 0, 0)));
        assert_eq!(next_payment(&h, at(2, 0, 0)), at(3, 0, 0));
    }

    #[test]
    fn per_second_host_is_one_second_away() {
        let h = host("linux_amd64", at(0, 0, 0), Some(at(0, 30, 0)));
        let now = at(5, 5, 5);
        assert_eq!(time_til_next_payment(&h, now), Duration::seconds(1));
    }

    #[rstest]
    #[case::windows("windows_amd64")]
    #[case::linux("linux_amd64")]
    fn no_start_time_is_hourly_from_creation(#[case] arch: &str) {
        let h = host(arch, at(0, 0, 0), None);
        assert_eq!(next_payment(&h, at(2, 59, 0)), at(3, 0, 0));
    }

    #[test]
    fn start_in_the_future_pays_one_hour_after_start() {
        let h = host("windows_amd64", at(0, 0, 0), Some(at(6, 0, 0)));
        assert_eq!(next_payment(&h, at(5, 0, 0)), at(7, 0, 0));
    }
}

//! Host allocator: queue depth + host inventory -> signed host delta.
//!
//! Design:
//! - `free` counts capacity that will take work without a new host: hosts still
//!   booting, idle running hosts, and running hosts whose task ends within the
//!   soon-free window.
//! - Alias (secondary) depth only adds demand when the distro also has primary
//!   work; on its own it only keeps idle hosts from being terminated.
//! - Termination candidates pass the billing-boundary check first.
//! - The allocator never calls a provider; it returns a plan.

use chrono::{DateTime, Duration, Utc};

use crate::cloud::{ProviderChoice, billing};
use crate::domain::{
    AllocationDecision, BillingGranularity, CreationIntent, Distro, Generation, Host, HostStatus,
    TerminationIntent,
};

/// What one distro's queue and hosts look like this cycle.
#[derive(Debug, Clone, Copy)]
pub struct AllocationInput<'a> {
    pub distro: &'a Distro,
    pub primary_depth: usize,
    pub secondary_depth: usize,
    pub hosts: &'a [Host],
    pub now: DateTime<Utc>,
}

/// Allocator output before a provider has been chosen.
#[derive(Debug, Clone, PartialEq)]
pub struct AllocationPlan {
    pub create: u32,
    pub terminate: Vec<TerminationIntent>,
    pub active_hosts: u32,
    pub free_hosts: u32,
    pub desired_hosts: u32,
    pub capacity_saturated: bool,
    pub reasoning: String,
}

impl AllocationPlan {
    pub fn delta(&self) -> i64 {
        if self.create > 0 {
            i64::from(self.create)
        } else {
            -(self.terminate.len() as i64)
        }
    }

    /// Attach the persisted generation and, when hosts are created, the provider.
    pub fn into_decision(
        self,
        input: &AllocationInput<'_>,
        generation: Generation,
        provider: Option<ProviderChoice>,
    ) -> AllocationDecision {
        let delta = self.delta();
        let mut reasoning = self.reasoning;

        let create = match (self.create, provider) {
            (0, _) | (_, None) => None,
            (count, Some(choice)) => {
                reasoning.push_str(&format!("; provider {}: {}", choice.provider.as_str(), choice.reason));
                Some(CreationIntent {
                    distro: input.distro.id.clone(),
                    provider: choice.provider,
                    instance_type: input.distro.instance_type.clone(),
                    count,
                    zone: choice.zone,
                    on_demand_price: choice.on_demand_price,
                    spot_price: choice.spot_price,
                })
            }
        };

        AllocationDecision {
            distro: input.distro.id.clone(),
            generation,
            decided_at: input.now,
            delta,
            primary_depth: input.primary_depth,
            secondary_depth: input.secondary_depth,
            active_hosts: self.active_hosts,
            free_hosts: self.free_hosts,
            capacity_saturated: self.capacity_saturated,
            create,
            terminate: self.terminate,
            reasoning,
        }
    }
}

#[derive(Debug, Clone)]
pub struct HostAllocator {
    soon_free_window: Duration,
    termination_margin: Duration,
}

impl Default for HostAllocator {
    fn default() -> Self {
        Self::new(Duration::minutes(2), Duration::minutes(5))
    }
}

impl HostAllocator {
    pub fn new(soon_free_window: Duration, termination_margin: Duration) -> Self {
        Self {
            soon_free_window,
            termination_margin,
        }
    }

    pub fn allocate(&self, input: &AllocationInput<'_>) -> AllocationPlan {
        let settings = &input.distro.host_allocator;
        let active: Vec<&Host> = input.hosts.iter().filter(|h| h.status.is_active()).collect();
        let active_hosts = active.len() as u32;
        let free_hosts = active.iter().filter(|h| self.is_free(h, input.now)).count() as u32;

        let alias_demand = settings.alias_depth_fraction * input.secondary_depth as f64;
        let needed = if input.primary_depth == 0 {
            0
        } else {
            let shortfall = input.primary_depth as f64 + alias_demand - f64::from(free_hosts);
            shortfall.max(0.0).ceil() as u32
        };

        let wanted = active_hosts.saturating_add(needed);
        let capacity_saturated = needed > 0 && wanted > settings.maximum_hosts;
        // 上限が優先（min > max の設定でも panic しない）
        let desired_hosts = wanted.max(settings.minimum_hosts).min(settings.maximum_hosts);

        let mut create = desired_hosts.saturating_sub(active_hosts);
        if input.distro.disabled {
            create = 0;
        }

        // 需要がなければ alias 分と minimum だけ残す。需要があっても maximum を超えた分は削る。
        let floor = if input.primary_depth == 0 {
            settings.minimum_hosts.max(alias_demand.ceil() as u32)
        } else {
            settings.maximum_hosts
        };
        let surplus = active_hosts.saturating_sub(floor.min(settings.maximum_hosts)) as usize;
        let terminate = if create == 0 && surplus > 0 {
            self.termination_candidates(&active, input.now, surplus)
        } else {
            Vec::new()
        };

        let mut reasoning = format!(
            "primary={} alias={}x{:.2} free={} active={} desired={} (min={} max={})",
            input.primary_depth,
            input.secondary_depth,
            settings.alias_depth_fraction,
            free_hosts,
            active_hosts,
            desired_hosts,
            settings.minimum_hosts,
            settings.maximum_hosts,
        );
        if capacity_saturated {
            reasoning.push_str(&format!("; capacity saturated, {wanted} hosts wanted"));
        }
        if input.distro.disabled && desired_hosts > active_hosts {
            reasoning.push_str("; distro disabled, not creating");
        }
        if create > 0 {
            reasoning.push_str(&format!("; create {create}"));
        } else if surplus > 0 {
            reasoning.push_str(&format!(
                "; {surplus} surplus, {} safe to terminate",
                terminate.len()
            ));
        }

        AllocationPlan {
            create,
            terminate,
            active_hosts,
            free_hosts,
            desired_hosts,
            capacity_saturated,
            reasoning,
        }
    }

    fn is_free(&self, host: &Host, now: DateTime<Utc>) -> bool {
        if host.status.is_coming_up() || host.is_idle() {
            return true;
        }
        host.status == HostStatus::Running
            && host
                .running_task_expected_end
                .is_some_and(|end| end - now <= self.soon_free_window)
    }

    /// Idle hosts that can stop now without wasting a paid interval, soonest
    /// billing boundary first.
    fn termination_candidates(
        &self,
        active: &[&Host],
        now: DateTime<Utc>,
        limit: usize,
    ) -> Vec<TerminationIntent> {
        let mut candidates: Vec<(&Host, DateTime<Utc>)> = active
            .iter()
            .filter(|h| h.is_idle())
            .filter(|h| self.safe_to_terminate(h, now))
            .map(|h| (*h, billing::next_payment(h, now)))
            .collect();
        candidates.sort_by(|(a, a_next), (b, b_next)| a_next.cmp(b_next).then_with(|| a.id.cmp(&b.id)));

        candidates
            .into_iter()
            .take(limit)
            .map(|(host, next)| TerminationIntent {
                host: host.id.clone(),
                next_billing_boundary: next,
            })
            .collect()
    }

    /// Per-second hosts are always safe. Hourly hosts need at least the
    /// configured margin before their next boundary.
    fn safe_to_terminate(&self, host: &Host, now: DateTime<Utc>) -> bool {
        match billing::effective_billing(host).0 {
            BillingGranularity::PerSecond => true,
            BillingGranularity::Hourly => {
                billing::time_til_next_payment(host, now) >= self.termination_margin
            }
        }
    }
}

//! Pricing Lookups
//!
//! Selects the pricing entry currently in effect for an Actor and exposes
//! the static table of platform subscription plans.

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::source::PricingEntry;

/// Pricing model reported when an Actor has no pricing history
pub const PLATFORM_USAGE_MODEL: &str = "PAY_PER_PLATFORM_USAGE";

/// The entry with the latest `startedAt` that is not in the future
pub fn current_pricing(entries: &[PricingEntry], now: DateTime<Utc>) -> Option<&PricingEntry> {
    entries
        .iter()
        .filter(|e| e.started_at <= now)
        .max_by_key(|e| e.started_at)
}

/// Platform subscription plan
#[derive(Debug, Clone, Serialize)]
pub struct PlatformPlan {
    pub name: &'static str,
    pub monthly_cost: &'static str,
    pub prepaid_usage: &'static str,
    pub compute_unit_price: &'static str,
    pub actor_ram: &'static str,
    pub max_concurrent_runs: &'static str,
    pub support: &'static str,
    pub residential_proxies: &'static str,
    pub datacenter_proxies: &'static str,
    pub serp_proxy: &'static str,
}

/// Subscription plans for pay-per-platform-usage pricing
pub fn platform_plans() -> Vec<PlatformPlan> {
    vec![
        PlatformPlan {
            name: "Free",
            monthly_cost: "$0",
            prepaid_usage: "$5",
            compute_unit_price: "$0.4 per CU",
            actor_ram: "8 GB",
            max_concurrent_runs: "25",
            support: "Community support",
            residential_proxies: "$8 per GB",
            datacenter_proxies: "5 IPs included",
            serp_proxy: "$2.5 per 1,000 SERPs",
        },
        PlatformPlan {
            name: "Starter",
            monthly_cost: "$49",
            prepaid_usage: "$49",
            compute_unit_price: "$0.4 per CU",
            actor_ram: "32 GB",
            max_concurrent_runs: "32",
            support: "Chat support",
            residential_proxies: "$8 per GB",
            datacenter_proxies: "30 IPs included; additional IPs at $1 per IP",
            serp_proxy: "$2.5 per 1,000 SERPs",
        },
        PlatformPlan {
            name: "Scale",
            monthly_cost: "$199",
            prepaid_usage: "$199",
            compute_unit_price: "$0.3 per CU",
            actor_ram: "128 GB",
            max_concurrent_runs: "128",
            support: "Priority chat support",
            residential_proxies: "$7.5 per GB",
            datacenter_proxies: "200 IPs included; additional IPs at $0.8 per IP",
            serp_proxy: "$2 per 1,000 SERPs",
        },
        PlatformPlan {
            name: "Business",
            monthly_cost: "$999",
            prepaid_usage: "$999",
            compute_unit_price: "$0.25 per CU",
            actor_ram: "256 GB",
            max_concurrent_runs: "256",
            support: "Dedicated account manager",
            residential_proxies: "$7 per GB",
            datacenter_proxies: "500 IPs included; additional IPs at $0.6 per IP",
            serp_proxy: "$1.7 per 1,000 SERPs",
        },
        PlatformPlan {
            name: "Enterprise",
            monthly_cost: "Custom",
            prepaid_usage: "Custom",
            compute_unit_price: "Custom",
            actor_ram: "Custom",
            max_concurrent_runs: "Custom",
            support: "SLA with custom contract",
            residential_proxies: "Custom",
            datacenter_proxies: "Custom",
            serp_proxy: "Custom",
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::collections::BTreeMap;

    fn entry(model: &str, year: i32) -> PricingEntry {
        PricingEntry {
            pricing_model: model.to_string(),
            started_at: Utc.with_ymd_and_hms(year, 1, 1, 0, 0, 0).unwrap(),
            terms: BTreeMap::new(),
        }
    }

    #[test]
    fn test_current_pricing_skips_future_entries() {
        let now = Utc.with_ymd_and_hms(2025, 6, 1, 0, 0, 0).unwrap();
        let entries = vec![
            entry("FLAT_PRICE_PER_MONTH", 2023),
            entry("PRICE_PER_DATASET_ITEM", 2024),
            entry("PAY_PER_EVENT", 2026),
        ];
        let current = current_pricing(&entries, now).unwrap();
        assert_eq!(current.pricing_model, "PRICE_PER_DATASET_ITEM");
    }

    #[test]
    fn test_current_pricing_ignores_order() {
        let now = Utc.with_ymd_and_hms(2025, 6, 1, 0, 0, 0).unwrap();
        let entries = vec![entry("B", 2024), entry("A", 2022)];
        assert_eq!(current_pricing(&entries, now).unwrap().pricing_model, "B");
    }

    #[test]
    fn test_current_pricing_all_future() {
        let now = Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap();
        assert!(current_pricing(&[entry("A", 2024)], now).is_none());
        assert!(current_pricing(&[], now).is_none());
    }

    #[test]
    fn test_platform_plans() {
        let plans = platform_plans();
        assert_eq!(plans.len(), 5);
        assert_eq!(plans[0].name, "Free");
        assert_eq!(plans[2].compute_unit_price, "$0.3 per CU");
    }
}

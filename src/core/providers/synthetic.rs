//! Stand-in figures for dashboards running without live credentials.
//!
//! Nothing here is derived from a real platform; callers reach this module
//! only when the configured data source resolves to `synthetic`.

use chrono::{Duration, NaiveDate, Utc};
use rand::Rng;

use crate::core::cost::aggregator::project_monthly;
use crate::core::cost::pricing::MeteringRates;
use crate::core::models::quota::{QuotaSummary, Resource, ResourceUsage};
use crate::core::models::usage::{DailyCostEntry, UsageSummary, Window};

/// Illustrative share of each free-tier limit, in percent.
const ILLUSTRATIVE_PERCENTAGES: [(Resource, f64); 5] = [
    (Resource::Database, 15.3),
    (Resource::Bandwidth, 8.7),
    (Resource::Storage, 23.4),
    (Resource::AuthUsers, 2.1),
    (Resource::ApiRequests, 12.5),
];

/// Typical daily request volume per window.
fn base_requests(window: Window) -> f64 {
    match window {
        Window::Day => 120.0,
        Window::Week => 150.0,
        Window::Month => 180.0,
    }
}

fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}

/// Randomized usage for one window, one entry per day ending at `today`.
pub fn usage_summary<R: Rng + ?Sized>(
    window: Window,
    budget_limit: f64,
    rates: &MeteringRates,
    today: NaiveDate,
    rng: &mut R,
) -> UsageSummary {
    let days = window.days();
    let mut daily_costs = Vec::with_capacity(days as usize);
    let mut total_cost = 0.0;
    let mut total_requests = 0u64;
    let mut total_tokens = 0u64;

    for offset in (0..days).rev() {
        let date = today - Duration::days(i64::from(offset));
        let variation: f64 = rng.gen_range(0.5..1.5);
        let requests = (base_requests(window) * variation).round();
        let tokens = rates.tokens_for(requests);
        let cost = rates.cost_for(tokens);

        total_cost += cost;
        total_requests += requests as u64;
        total_tokens += tokens.round() as u64;

        daily_costs.push(DailyCostEntry {
            date,
            cost: round_to(cost, 6),
            tokens: tokens.round() as u64,
            requests: requests as u64,
        });
    }

    // The flag compares the figure that is reported, not the unrounded one.
    let monthly_projection = round_to(project_monthly(total_cost, days), 2);

    UsageSummary {
        total_cost: round_to(total_cost, 4),
        total_requests,
        total_tokens,
        monthly_projection,
        daily_costs,
        is_over_budget: monthly_projection > budget_limit,
        budget_limit,
    }
}

/// Randomized usage using the thread RNG and today's UTC date.
pub fn generate_usage_summary(window: Window, budget_limit: f64, rates: &MeteringRates) -> UsageSummary {
    usage_summary(
        window,
        budget_limit,
        rates,
        Utc::now().date_naive(),
        &mut rand::thread_rng(),
    )
}

/// Fixed illustrative quota figures.
pub fn quota_summary() -> QuotaSummary {
    let mut summary = QuotaSummary::zeroed();
    for (resource, percentage) in ILLUSTRATIVE_PERCENTAGES {
        let limit = resource.free_tier_limit();
        let used = (limit as f64 * percentage / 100.0).round() as u64;
        let usage = ResourceUsage::with_percentage(used, limit, percentage);
        match resource {
            Resource::Database => summary.database = usage,
            Resource::Bandwidth => summary.bandwidth = usage,
            Resource::Storage => summary.storage = usage,
            Resource::AuthUsers => summary.auth_users = usage,
            Resource::ApiRequests => summary.api_requests = usage,
        }
    }
    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 15).unwrap()
    }

    #[test]
    fn one_entry_per_window_day() {
        let mut rng = StdRng::seed_from_u64(7);
        let rates = MeteringRates::default();
        for window in Window::all() {
            let summary = usage_summary(*window, 100.0, &rates, today(), &mut rng);
            assert_eq!(summary.daily_costs.len(), window.days() as usize);
            assert_eq!(summary.daily_costs.last().unwrap().date, today());
        }
    }

    #[test]
    fn entries_ascend_to_today() {
        let mut rng = StdRng::seed_from_u64(1);
        let summary = usage_summary(Window::Week, 100.0, &MeteringRates::default(), today(), &mut rng);
        let first = summary.daily_costs.first().unwrap().date;
        assert_eq!(first, NaiveDate::from_ymd_opt(2024, 3, 9).unwrap());
        assert!(summary.daily_costs.windows(2).all(|w| w[0].date < w[1].date));
    }

    #[test]
    fn requests_within_variation_band() {
        let mut rng = StdRng::seed_from_u64(42);
        let summary = usage_summary(Window::Month, 100.0, &MeteringRates::default(), today(), &mut rng);
        for entry in &summary.daily_costs {
            assert!((90..=270).contains(&entry.requests), "requests {}", entry.requests);
            assert_eq!(entry.tokens, entry.requests * 1500);
        }
    }

    #[test]
    fn totals_match_entries() {
        let mut rng = StdRng::seed_from_u64(3);
        let summary = usage_summary(Window::Week, 100.0, &MeteringRates::default(), today(), &mut rng);
        let requests: u64 = summary.daily_costs.iter().map(|d| d.requests).sum();
        let tokens: u64 = summary.daily_costs.iter().map(|d| d.tokens).sum();
        let cost: f64 = summary.daily_costs.iter().map(|d| d.cost).sum();
        assert_eq!(summary.total_requests, requests);
        assert_eq!(summary.total_tokens, tokens);
        assert!((summary.total_cost - cost).abs() < 1e-3);
    }

    #[test]
    fn same_seed_same_figures() {
        let rates = MeteringRates::default();
        let a = usage_summary(Window::Week, 100.0, &rates, today(), &mut StdRng::seed_from_u64(9));
        let b = usage_summary(Window::Week, 100.0, &rates, today(), &mut StdRng::seed_from_u64(9));
        assert_eq!(a, b);
    }

    #[test]
    fn budget_flag_uses_configured_limit() {
        let rates = MeteringRates::default();
        let mut rng = StdRng::seed_from_u64(5);
        let tight = usage_summary(Window::Week, 0.01, &rates, today(), &mut rng);
        assert!(tight.is_over_budget);
        assert_eq!(tight.budget_limit, 0.01);

        let roomy = usage_summary(Window::Week, 1_000.0, &rates, today(), &mut rng);
        assert!(!roomy.is_over_budget);
    }

    #[test]
    fn budget_equal_to_reported_projection_is_not_over() {
        let rates = MeteringRates::default();
        for seed in 0..32 {
            for window in Window::all() {
                let reported =
                    usage_summary(*window, 100.0, &rates, today(), &mut StdRng::seed_from_u64(seed))
                        .monthly_projection;
                let at_limit =
                    usage_summary(*window, reported, &rates, today(), &mut StdRng::seed_from_u64(seed));
                assert_eq!(at_limit.monthly_projection, reported);
                assert!(!at_limit.is_over_budget, "seed {} window {}", seed, window);

                let below =
                    usage_summary(*window, reported - 0.01, &rates, today(), &mut StdRng::seed_from_u64(seed));
                assert!(below.is_over_budget, "seed {} window {}", seed, window);
            }
        }
    }

    #[test]
    fn generate_uses_today() {
        let summary = generate_usage_summary(Window::Day, 100.0, &MeteringRates::default());
        assert_eq!(summary.daily_costs.len(), 1);
        assert_eq!(summary.daily_costs[0].date, Utc::now().date_naive());
    }

    #[test]
    fn quota_figures_are_fixed() {
        let summary = quota_summary();
        assert_eq!(summary.database.percentage, 15.3);
        assert_eq!(summary.bandwidth.percentage, 8.7);
        assert_eq!(summary.storage.percentage, 23.4);
        assert_eq!(summary.auth_users.percentage, 2.1);
        assert_eq!(summary.api_requests.percentage, 12.5);
        assert_eq!(summary.auth_users.used, 1050);
        assert_eq!(summary.api_requests.used, 62_500);
        assert_eq!(summary, quota_summary());
    }
}

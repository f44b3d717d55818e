use chrono::{DateTime, Datelike, NaiveDate, Utc};
use std::collections::BTreeMap;

use crate::core::cost::pricing::{MeteringRates, DAYS_PER_MONTH};
use crate::core::models::usage::{DailyCostEntry, Sample, UsageSummary, Window};

/// Roll raw request-rate samples up into a [`UsageSummary`] using today's UTC
/// date as the projection reference.
pub fn compute_usage_summary(
    window: Window,
    samples: &[Sample],
    budget_limit: f64,
    rates: &MeteringRates,
) -> UsageSummary {
    compute_usage_summary_with(window, samples, budget_limit, rates, Utc::now().date_naive())
}

/// Same as [`compute_usage_summary`] with an explicit reference date.
///
/// Samples without a value or an interval start are skipped. Each day's
/// request rate is rounded once; that day's tokens and cost derive from the
/// rounded count, and the totals are sums of the emitted days.
pub fn compute_usage_summary_with(
    window: Window,
    samples: &[Sample],
    budget_limit: f64,
    rates: &MeteringRates,
    today: NaiveDate,
) -> UsageSummary {
    let mut by_day: BTreeMap<NaiveDate, f64> = BTreeMap::new();
    for sample in samples {
        let Some((requests, date)) = counted(sample) else {
            continue;
        };
        *by_day.entry(date).or_default() += requests;
    }

    let daily_costs: Vec<DailyCostEntry> = by_day
        .into_iter()
        .map(|(date, rate)| day_entry(date, rate, rates))
        .collect();

    let total_cost = daily_costs.iter().fold(0.0, |acc, d| acc + d.cost);
    let total_requests: u64 = daily_costs.iter().map(|d| d.requests).sum();
    let total_tokens: u64 = daily_costs.iter().map(|d| d.tokens).sum();

    let monthly_projection = project_monthly(total_cost, projection_days(window, today));

    UsageSummary {
        total_cost,
        total_requests,
        total_tokens,
        monthly_projection,
        daily_costs,
        is_over_budget: monthly_projection > budget_limit,
        budget_limit,
    }
}

fn day_entry(date: NaiveDate, rate: f64, rates: &MeteringRates) -> DailyCostEntry {
    let requests = rate.round() as u64;
    let tokens = rates.tokens_for(requests as f64).round();
    DailyCostEntry {
        date,
        cost: rates.cost_for(tokens),
        tokens: tokens as u64,
        requests,
    }
}

/// Number of days the window's total is spread over when projecting.
///
/// Days elapsed in the current month, capped at the month length and at the
/// window's own day count.
pub fn projection_days(window: Window, today: NaiveDate) -> u32 {
    let elapsed = today.day().min(DAYS_PER_MONTH);
    match window {
        Window::Month => elapsed,
        Window::Day | Window::Week => elapsed.min(window.days()),
    }
}

/// Extrapolate a month of spend from `total_cost` observed over `days`.
pub fn project_monthly(total_cost: f64, days: u32) -> f64 {
    if days == 0 {
        return 0.0;
    }
    total_cost / days as f64 * DAYS_PER_MONTH as f64
}

fn counted(sample: &Sample) -> Option<(f64, NaiveDate)> {
    let requests = sample.value.filter(|v| v.is_finite() && *v >= 0.0)?;
    let start = sample.interval_start?;
    let date = DateTime::<Utc>::from_timestamp(start, 0)?.date_naive();
    Some((requests, date))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn ts(date: NaiveDate, hour: u32) -> i64 {
        date.and_hms_opt(hour, 0, 0).unwrap().and_utc().timestamp()
    }

    fn summarize(window: Window, samples: &[Sample], budget: f64, today: NaiveDate) -> UsageSummary {
        compute_usage_summary_with(window, samples, budget, &MeteringRates::default(), today)
    }

    #[test]
    fn same_day_samples_share_one_bucket() {
        let jan1 = day(2024, 1, 1);
        let samples = [Sample::new(10.0, ts(jan1, 3)), Sample::new(5.0, ts(jan1, 17))];
        let summary = summarize(Window::Week, &samples, 100.0, day(2024, 1, 7));

        assert_eq!(summary.daily_costs.len(), 1);
        let entry = &summary.daily_costs[0];
        assert_eq!(entry.date, jan1);
        assert_eq!(entry.requests, 15);
        assert_eq!(entry.tokens, 22_500);
        assert!((entry.cost - 22_500.0 / 1000.0 * 0.00025).abs() < 1e-12);
    }

    #[test]
    fn totals_equal_sum_of_daily_buckets() {
        let samples = [
            Sample::new(3.0, ts(day(2024, 3, 2), 1)),
            Sample::new(7.0, ts(day(2024, 3, 1), 23)),
            Sample::new(11.0, ts(day(2024, 3, 3), 0)),
            Sample::new(2.0, ts(day(2024, 3, 1), 5)),
        ];
        let summary = summarize(Window::Week, &samples, 100.0, day(2024, 3, 3));

        let cost: f64 = summary.daily_costs.iter().map(|d| d.cost).sum();
        let tokens: u64 = summary.daily_costs.iter().map(|d| d.tokens).sum();
        let requests: u64 = summary.daily_costs.iter().map(|d| d.requests).sum();
        assert!((summary.total_cost - cost).abs() < 1e-12);
        assert_eq!(summary.total_tokens, tokens);
        assert_eq!(summary.total_requests, requests);
        assert_eq!(summary.total_requests, 23);
    }

    #[test]
    fn daily_entries_sorted_ascending() {
        let samples = [
            Sample::new(1.0, ts(day(2024, 2, 29), 0)),
            Sample::new(1.0, ts(day(2024, 2, 27), 0)),
            Sample::new(1.0, ts(day(2024, 2, 28), 0)),
        ];
        let summary = summarize(Window::Week, &samples, 100.0, day(2024, 2, 29));
        let dates: Vec<NaiveDate> = summary.daily_costs.iter().map(|d| d.date).collect();
        assert_eq!(dates, [day(2024, 2, 27), day(2024, 2, 28), day(2024, 2, 29)]);
    }

    #[test]
    fn derivation_is_exact_per_entry() {
        let samples = [Sample::new(4.0, ts(day(2024, 5, 1), 0)), Sample::new(9.0, ts(day(2024, 5, 2), 0))];
        let summary = summarize(Window::Week, &samples, 100.0, day(2024, 5, 2));
        for entry in &summary.daily_costs {
            assert_eq!(entry.tokens, entry.requests * 1500);
            let expected = entry.tokens as f64 / 1000.0 * 0.00025;
            assert!((entry.cost - expected).abs() < 1e-12);
        }
    }

    #[test]
    fn incomplete_samples_are_skipped() {
        let jan1 = day(2024, 1, 1);
        let samples = [
            Sample { value: None, interval_start: Some(ts(jan1, 0)) },
            Sample { value: Some(8.0), interval_start: None },
            Sample { value: Some(f64::NAN), interval_start: Some(ts(jan1, 1)) },
            Sample::new(2.0, ts(jan1, 2)),
        ];
        let summary = summarize(Window::Day, &samples, 100.0, jan1);
        assert_eq!(summary.total_requests, 2);
        assert_eq!(summary.daily_costs.len(), 1);
    }

    #[test]
    fn empty_samples_yield_zero_summary() {
        let summary = summarize(Window::Month, &[], 100.0, day(2024, 6, 15));
        assert_eq!(summary, UsageSummary::zeroed(100.0));
        assert!(!summary.monthly_projection.is_nan());
    }

    #[test]
    fn projection_days_per_window() {
        assert_eq!(projection_days(Window::Day, day(2024, 1, 1)), 1);
        assert_eq!(projection_days(Window::Day, day(2024, 1, 20)), 1);
        assert_eq!(projection_days(Window::Week, day(2024, 1, 3)), 3);
        assert_eq!(projection_days(Window::Week, day(2024, 1, 20)), 7);
        assert_eq!(projection_days(Window::Month, day(2024, 1, 12)), 12);
        assert_eq!(projection_days(Window::Month, day(2024, 1, 31)), 30);
    }

    #[test]
    fn project_monthly_guards_zero_days() {
        assert_eq!(project_monthly(12.0, 0), 0.0);
        assert!((project_monthly(12.0, 6) - 60.0).abs() < 1e-12);
    }

    #[test]
    fn projection_scales_daily_average() {
        // 1000 requests/day for 7 days at 1.5M tokens -> $0.375/day
        let start = day(2024, 4, 10);
        let samples: Vec<Sample> = (0..7)
            .map(|i| Sample::new(1000.0, ts(start + chrono::Duration::days(i), 12)))
            .collect();
        let summary = summarize(Window::Week, &samples, 100.0, day(2024, 4, 16));
        assert!((summary.total_cost - 7.0 * 0.375).abs() < 1e-9);
        assert!((summary.monthly_projection - 30.0 * 0.375).abs() < 1e-9);
        assert!(!summary.is_over_budget);
    }

    #[test]
    fn over_budget_is_strict() {
        let samples = [Sample::new(2000.0, ts(day(2024, 8, 1), 0))];
        let today = day(2024, 8, 1);
        let projection = summarize(Window::Day, &samples, 0.0, today).monthly_projection;
        assert!(projection > 0.0);

        let at_limit = summarize(Window::Day, &samples, projection, today);
        assert!(!at_limit.is_over_budget);

        let below_limit = summarize(Window::Day, &samples, projection - 0.01, today);
        assert!(below_limit.is_over_budget);
    }

    #[test]
    fn custom_rates_flow_through() {
        let rates = MeteringRates {
            avg_tokens_per_request: 100.0,
            cost_per_thousand_tokens: 1.0,
        };
        let samples = [Sample::new(10.0, ts(day(2024, 1, 1), 0))];
        let summary = compute_usage_summary_with(Window::Day, &samples, 100.0, &rates, day(2024, 1, 1));
        assert_eq!(summary.total_tokens, 1000);
        assert!((summary.total_cost - 1.0).abs() < 1e-12);
    }

    #[test]
    fn entry_point_buckets_by_today() {
        let now = Utc::now().timestamp();
        let rates = MeteringRates::default();
        let summary = compute_usage_summary(Window::Day, &[Sample::new(1.0, now)], 100.0, &rates);
        assert_eq!(summary.total_tokens, 1500);
        assert_eq!(summary.daily_costs.len(), 1);
        assert_eq!(summary.daily_costs[0].date, Utc::now().date_naive());
    }

    #[test]
    fn fractional_rates_keep_entries_consistent() {
        // ALIGN_RATE yields fractional per-hour rates
        let samples = [
            Sample::new(0.4, ts(day(2024, 1, 1), 0)),
            Sample::new(0.4, ts(day(2024, 1, 2), 0)),
            Sample::new(0.4, ts(day(2024, 1, 3), 0)),
            Sample::new(2.3, ts(day(2024, 1, 4), 1)),
            Sample::new(1.35, ts(day(2024, 1, 4), 2)),
        ];
        let summary = summarize(Window::Week, &samples, 100.0, day(2024, 1, 7));

        let requests: u64 = summary.daily_costs.iter().map(|d| d.requests).sum();
        let tokens: u64 = summary.daily_costs.iter().map(|d| d.tokens).sum();
        let cost = summary.daily_costs.iter().fold(0.0, |acc, d| acc + d.cost);
        assert_eq!(summary.total_requests, requests);
        assert_eq!(summary.total_tokens, tokens);
        assert!((summary.total_cost - cost).abs() < 1e-12);

        for entry in &summary.daily_costs {
            assert_eq!(entry.tokens, entry.requests * 1500);
            assert!((entry.cost - entry.tokens as f64 / 1000.0 * 0.00025).abs() < 1e-12);
        }
        let requests_per_day: Vec<u64> = summary.daily_costs.iter().map(|d| d.requests).collect();
        assert_eq!(requests_per_day, [0, 0, 0, 4]);
        assert_eq!(summary.total_requests, 4);
    }

    #[test]
    fn empty_total_cost_is_positive_zero() {
        let summary = summarize(Window::Week, &[], 100.0, day(2024, 1, 7));
        assert!(summary.total_cost.is_sign_positive());
        assert!(summary.monthly_projection.is_sign_positive());
    }
}

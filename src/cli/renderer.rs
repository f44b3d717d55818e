use colored::{control, ColoredString, Colorize};

use crate::core::formatter::{
    format_bytes, format_count, format_currency, format_percent, format_usage_bar,
};
use crate::core::models::quota::{QuotaSummary, ResourceUsage, Unit};
use crate::core::models::usage::{UsageSummary, Window};
use crate::core::providers::fetch::Origin;
use crate::core::providers::Platform;

const BAR_WIDTH: usize = 12;
const RECENT_DAYS: usize = 7;

fn header(platform: Platform, detail: &str, origin: Origin) -> String {
    let title = format!(" {} ({})", platform.display_name(), detail).bold();
    let tag = format!("[{}]", origin.label());
    let tag = match origin {
        Origin::Live => tag.green(),
        Origin::Synthetic => tag.yellow(),
        Origin::Fallback => tag.red(),
    };
    format!("{} {}", title, tag)
}

/// Render the Gemini cost card.
///
/// Layout:
/// ```text
///  Gemini API (7d) [live]
///   Cost       $0.56
///   Requests   1.5K
///   Tokens     2.2M
///   Projected  $2.41 / $100.00 budget
///   Recent Days:
///     Jan 07       $0.0563  (225 req)
/// ```
pub fn render_usage(summary: &UsageSummary, window: Window, origin: Origin, use_color: bool) -> String {
    control::set_override(use_color);

    let mut lines = vec![header(Platform::Gemini, window.as_str(), origin)];

    lines.push(format!("  {}       {}", "Cost".cyan(), format_currency(summary.total_cost)));
    lines.push(format!("  {}   {}", "Requests".cyan(), format_count(summary.total_requests)));
    lines.push(format!("  {}     {}", "Tokens".cyan(), format_count(summary.total_tokens)));

    let projection = format_currency(summary.monthly_projection);
    let projection: ColoredString = if summary.is_over_budget {
        format!("{} over budget", projection).red()
    } else {
        projection.green()
    };
    lines.push(format!(
        "  {}  {} / {} budget",
        "Projected".cyan(),
        projection,
        format_currency(summary.budget_limit)
    ));

    if !summary.daily_costs.is_empty() {
        lines.push(format!("  {}:", "Recent Days".cyan()));
        let skip = summary.daily_costs.len().saturating_sub(RECENT_DAYS);
        for day in summary.daily_costs.iter().skip(skip).rev() {
            lines.push(format!(
                "    {:<12} {:<9} {}",
                day.date.format("%b %d"),
                format_currency(day.cost),
                format!("({} req)", format_count(day.requests)).dimmed()
            ));
        }
    }

    lines.join("\n")
}

/// Render the Supabase free-tier card, one row per metered resource.
pub fn render_quota(summary: &QuotaSummary, origin: Origin, use_color: bool) -> String {
    control::set_override(use_color);

    let mut lines = vec![header(Platform::Supabase, "free tier", origin)];
    for (resource, usage) in summary.iter() {
        let amounts = match resource.unit() {
            Unit::Bytes => format!("{} / {}", format_bytes(usage.used), format_bytes(usage.limit)),
            Unit::Count => format!("{} / {}", format_count(usage.used), format_count(usage.limit)),
        };
        lines.push(format!(
            "  {}  {:<22} {:>6} {}",
            format!("{:<12}", resource.display_name()).cyan(),
            amounts,
            color_by_usage(usage, &format_percent(usage.percentage)),
            format_usage_bar(usage.percentage, BAR_WIDTH).magenta()
        ));
    }

    lines.join("\n")
}

fn color_by_usage(usage: &ResourceUsage, text: &str) -> ColoredString {
    if usage.percentage >= 90.0 {
        text.red()
    } else if usage.percentage >= 75.0 {
        text.yellow()
    } else {
        text.green()
    }
}

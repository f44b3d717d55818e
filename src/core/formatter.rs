const BYTE_UNITS: [&str; 5] = ["Bytes", "KB", "MB", "GB", "TB"];

/// Human-readable byte size on a 1024 base, e.g. "30 MB" or "1.5 KB".
/// Values carry at most two decimals with trailing zeros dropped.
pub fn format_bytes(bytes: u64) -> String {
    if bytes == 0 {
        return "0 Bytes".to_string();
    }

    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < BYTE_UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }

    format!("{} {}", trim_decimals(value), BYTE_UNITS[unit])
}

fn trim_decimals(value: f64) -> String {
    let fixed = format!("{:.2}", value);
    fixed.trim_end_matches('0').trim_end_matches('.').to_string()
}

/// Compact count, e.g. "22.5K" or "1.2M".
pub fn format_count(count: u64) -> String {
    if count >= 1_000_000 {
        format!("{:.1}M", count as f64 / 1_000_000.0)
    } else if count >= 1_000 {
        format!("{:.1}K", count as f64 / 1_000.0)
    } else {
        format!("{}", count)
    }
}

/// Returns "[███░░░░░░░░░]" where █ = consumed portion, ░ = headroom.
/// Width is the number of block characters inside the brackets.
pub fn format_usage_bar(used_percent: f64, width: usize) -> String {
    let used_percent = if used_percent.is_finite() {
        used_percent.clamp(0.0, 100.0)
    } else {
        0.0
    };
    let used_blocks = ((used_percent / 100.0) * width as f64).round() as usize;
    let free_blocks = width.saturating_sub(used_blocks);

    format!("[{}{}]", "█".repeat(used_blocks), "░".repeat(free_blocks))
}

/// Returns "$1.23"; sub-cent amounts keep four decimals so they don't read as zero.
pub fn format_currency(amount: f64) -> String {
    if amount != 0.0 && amount.abs() < 0.01 {
        format!("${:.4}", amount)
    } else {
        format!("${:.2}", amount)
    }
}

pub fn format_percent(percent: f64) -> String {
    format!("{:.1}%", percent)
}

//! Display formatting helpers
//!
//! Pure functions turning raw amounts, rates and timestamps into strings for
//! the dashboard. Non-numeric input renders as `"0"`, unparseable dates as `""`.

use chrono::{DateTime, Utc};

// ============================================
// NUMBERS
// ============================================

/// Currency style for `format_number`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Currency {
    Usd,
}

/// Options for `format_number`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NumberFormat {
    pub min_decimals: usize,
    pub max_decimals: usize,
    pub currency: Option<Currency>,
    /// Abbreviate with K/M/B/T suffixes
    pub compact: bool,
}

impl NumberFormat {
    pub fn fixed(decimals: usize) -> Self {
        Self {
            min_decimals: decimals,
            max_decimals: decimals,
            currency: None,
            compact: false,
        }
    }
}

const COMPACT_UNITS: [(f64, &str); 4] = [(1e12, "T"), (1e9, "B"), (1e6, "M"), (1e3, "K")];

/// Insert thousands separators into an unsigned integer string
fn group_thousands(digits: &str) -> String {
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

/// Round to `max` fraction digits, then drop trailing zeros down to `min`
fn fixed_fraction(value: f64, min: usize, max: usize) -> String {
    let max = max.max(min);
    let rendered = format!("{:.*}", max, value);
    let (int_part, frac_part) = match rendered.split_once('.') {
        Some((i, f)) => (i.to_string(), f.to_string()),
        None => (rendered, String::new()),
    };

    let mut frac = frac_part;
    while frac.len() > min && frac.ends_with('0') {
        frac.pop();
    }

    let grouped = group_thousands(&int_part);
    if frac.is_empty() {
        grouped
    } else {
        format!("{}.{}", grouped, frac)
    }
}

/// Format a number with grouping, fraction limits and optional currency/compact style
pub fn format_number(value: f64, opts: &NumberFormat) -> String {
    if !value.is_finite() {
        return "0".to_string();
    }

    let negative = value < 0.0;
    let abs = value.abs();

    let body = if opts.compact {
        let mut body = None;
        for (idx, (threshold, suffix)) in COMPACT_UNITS.iter().enumerate() {
            if abs >= *threshold {
                let scaled = abs / threshold;
                let rounded: f64 = format!("{:.*}", opts.max_decimals, scaled)
                    .parse()
                    .unwrap_or(scaled);
                // 999.96K rounds up into the next unit
                if rounded >= 1000.0 && idx > 0 {
                    let (next_threshold, next_suffix) = COMPACT_UNITS[idx - 1];
                    body = Some(format!(
                        "{}{}",
                        fixed_fraction(abs / next_threshold, opts.min_decimals, opts.max_decimals),
                        next_suffix
                    ));
                } else {
                    body = Some(format!(
                        "{}{}",
                        fixed_fraction(scaled, opts.min_decimals, opts.max_decimals),
                        suffix
                    ));
                }
                break;
            }
        }
        body.unwrap_or_else(|| fixed_fraction(abs, opts.min_decimals, opts.max_decimals))
    } else {
        fixed_fraction(abs, opts.min_decimals, opts.max_decimals)
    };

    // "-0.00" is not a useful display value
    let is_zero = body.chars().all(|c| matches!(c, '0' | '.' | ','));
    let sign = if negative && !is_zero { "-" } else { "" };

    match opts.currency {
        Some(Currency::Usd) => format!("{}${}", sign, body),
        None => format!("{}{}", sign, body),
    }
}

/// Parse a decimal string, `None` when empty or not numeric
pub fn parse_decimal(value: &str) -> Option<f64> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return None;
    }
    trimmed.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Format a numeric string with a fixed number of decimals
pub fn format_decimal_str(value: &str, decimals: usize) -> String {
    match parse_decimal(value) {
        Some(v) => format_number(v, &NumberFormat::fixed(decimals)),
        None => "0".to_string(),
    }
}

/// Format a raw smallest-unit token amount
pub fn format_token_amount(amount: &str, token_decimals: u32, display_decimals: usize) -> String {
    let Some(raw) = parse_decimal(amount) else {
        return "0".to_string();
    };
    let value = raw / 10f64.powi(token_decimals as i32);
    format_number(value, &NumberFormat::fixed(display_decimals))
}

/// Format a percentage value (0-100)
pub fn format_percentage(value: f64, decimals: usize) -> String {
    if !value.is_finite() {
        return "0%".to_string();
    }
    format!("{}%", format_number(value, &NumberFormat::fixed(decimals)))
}

/// Format a large number with K/M/B/T suffixes
pub fn format_compact_number(value: f64, decimals: usize) -> String {
    format_number(
        value,
        &NumberFormat {
            compact: true,
            ..NumberFormat::fixed(decimals)
        },
    )
}

pub fn format_usd(value: f64, decimals: usize) -> String {
    format_number(
        value,
        &NumberFormat {
            currency: Some(Currency::Usd),
            ..NumberFormat::fixed(decimals)
        },
    )
}

pub fn format_apr(value: f64, decimals: usize) -> String {
    format_percentage(value, decimals)
}

/// Share of capacity in use, as a percentage. Zero capacity yields 0.
pub fn calculate_utilization_rate(current_exposure: f64, max_exposure: f64) -> f64 {
    if !max_exposure.is_finite() || max_exposure <= 0.0 || !current_exposure.is_finite() {
        return 0.0;
    }
    current_exposure / max_exposure * 100.0
}

// ============================================
// ADDRESSES & TEXT
// ============================================

/// Shorten an address to `start…end` characters
pub fn format_address(address: &str, start_chars: usize, end_chars: usize) -> String {
    let chars: Vec<char> = address.chars().collect();
    if chars.len() <= start_chars + end_chars {
        return address.to_string();
    }
    let head: String = chars[..start_chars].iter().collect();
    let tail: String = chars[chars.len() - end_chars..].iter().collect();
    format!("{}...{}", head, tail)
}

pub fn format_tx_hash(hash: &str) -> String {
    format_address(hash, 8, 6)
}

pub fn truncate_text(text: &str, max_length: usize) -> String {
    if text.chars().count() <= max_length {
        return text.to_string();
    }
    let head: String = text.chars().take(max_length).collect();
    format!("{}...", head)
}

pub fn format_file_size(bytes: u64, decimals: usize) -> String {
    const SIZES: [&str; 5] = ["Bytes", "KB", "MB", "GB", "TB"];
    if bytes == 0 {
        return "0 Bytes".to_string();
    }

    let mut value = bytes as f64;
    let mut i = 0;
    while value >= 1024.0 && i < SIZES.len() - 1 {
        value /= 1024.0;
        i += 1;
    }

    // toFixed then drop trailing zeros
    let fixed = format!("{:.*}", decimals, value);
    let trimmed = if fixed.contains('.') {
        fixed.trim_end_matches('0').trim_end_matches('.').to_string()
    } else {
        fixed
    };
    format!("{} {}", trimmed, SIZES[i])
}

// ============================================
// DATES & DURATIONS
// ============================================

pub fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value.trim())
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// e.g. `Dec 1, 2024, 10:30 AM` (UTC)
pub fn format_datetime(date: &DateTime<Utc>, show_time: bool) -> String {
    if show_time {
        date.format("%b %-d, %Y, %-I:%M %p").to_string()
    } else {
        date.format("%b %-d, %Y").to_string()
    }
}

pub fn format_date(date: &str, show_time: bool) -> String {
    parse_timestamp(date)
        .map(|dt| format_datetime(&dt, show_time))
        .unwrap_or_default()
}

fn plural(n: i64, unit: &str) -> String {
    format!("{} {}{} ago", n, unit, if n == 1 { "" } else { "s" })
}

/// Relative time against an explicit `now`
pub fn format_time_ago_at(date: &DateTime<Utc>, now: DateTime<Utc>) -> String {
    let diff_mins = (now - *date).num_minutes();
    let diff_hours = diff_mins.div_euclid(60);
    let diff_days = diff_hours.div_euclid(24);

    if diff_mins < 1 {
        "Just now".to_string()
    } else if diff_mins < 60 {
        plural(diff_mins, "minute")
    } else if diff_hours < 24 {
        plural(diff_hours, "hour")
    } else if diff_days < 30 {
        plural(diff_days, "day")
    } else {
        format_datetime(date, false)
    }
}

pub fn format_time_ago(date: &str) -> String {
    parse_timestamp(date)
        .map(|dt| format_time_ago_at(&dt, Utc::now()))
        .unwrap_or_default()
}

/// Two largest non-zero units, e.g. `1d 2h`
pub fn format_duration(seconds: i64) -> String {
    if seconds <= 0 {
        return "0s".to_string();
    }

    let days = seconds / 86_400;
    let hours = (seconds % 86_400) / 3_600;
    let minutes = (seconds % 3_600) / 60;
    let secs = seconds % 60;

    let mut parts = Vec::new();
    if days > 0 {
        parts.push(format!("{}d", days));
    }
    if hours > 0 {
        parts.push(format!("{}h", hours));
    }
    if minutes > 0 {
        parts.push(format!("{}m", minutes));
    }
    if secs > 0 || parts.is_empty() {
        parts.push(format!("{}s", secs));
    }

    parts.into_iter().take(2).collect::<Vec<_>>().join(" ")
}

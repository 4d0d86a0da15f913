/// Display formatting shared by dashboard responses
///
/// Amounts are Indonesian Rupiah without minor units. Compact forms use the
/// `Rp 5.5M` style shown on the dashboards; small amounts fall back to the
/// id-ID currency layout.
use chrono::{DateTime, Datelike, NaiveDate, Utc};

const NBSP: char = '\u{a0}';

const MONTHS_ID: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "Mei", "Jun", "Jul", "Agu", "Sep", "Okt", "Nov", "Des",
];

/// Compact currency: `Rp 2.9B`, `Rp 5.5M`, `Rp 45K`, `Rp 500`
pub fn format_currency(amount: i64) -> String {
    let value = amount as f64;
    if amount >= 1_000_000_000 {
        format!("Rp {}B", to_fixed(value / 1_000_000_000.0, 1))
    } else if amount >= 1_000_000 {
        format!("Rp {}M", to_fixed(value / 1_000_000.0, 1))
    } else if amount >= 1_000 {
        format!("Rp {}K", to_fixed(value / 1_000.0, 0))
    } else {
        format_idr(amount)
    }
}

/// Full id-ID currency layout: `Rp 5.500.000` (non-breaking space after `Rp`)
pub fn format_idr(amount: i64) -> String {
    let digits = amount.unsigned_abs().to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(ch);
    }

    let sign = if amount < 0 { "-" } else { "" };
    format!("{}Rp{}{}", sign, NBSP, grouped)
}

/// Fixed-point rendering of the exact binary value, with exact ties rounded
/// upward (`1.25` gives `1.3`, `1.15` is stored below the tie and gives `1.1`)
fn to_fixed(value: f64, digits: usize) -> String {
    if is_exact_tie(value, digits) {
        let factor = 10f64.powi(digits as i32);
        return format!("{:.*}", digits, (value * factor).ceil() / factor);
    }
    format!("{:.*}", digits, value)
}

/// Whether the exact decimal expansion ends in a single `5` right after the
/// last kept digit
fn is_exact_tie(value: f64, digits: usize) -> bool {
    // Values of at least 1 expand to at most 52 fractional digits
    let expanded = format!("{:.*}", digits + 64, value);
    let Some(point) = expanded.find('.') else {
        return false;
    };
    let tail = &expanded[point + 1 + digits..];
    tail.starts_with('5') && tail[1..].bytes().all(|b| b == b'0')
}

/// Hours as a plain number: `2.5`, `3`, `62.5`
pub fn format_hours(hours: f64) -> String {
    if hours.fract() == 0.0 {
        format!("{}", hours as i64)
    } else {
        let text = format!("{:.2}", hours);
        text.trim_end_matches('0').trim_end_matches('.').to_string()
    }
}

/// id-ID short date: `15 Jan 2024`
pub fn format_date(date: NaiveDate) -> String {
    format!(
        "{:02} {} {}",
        date.day(),
        MONTHS_ID[date.month0() as usize],
        date.year()
    )
}

/// Relative registration time: `Baru saja`, `3 jam lalu`, `2 hari lalu`
pub fn format_time_ago(then: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let hours = (now - then).num_hours();
    if hours < 1 {
        return "Baru saja".to_string();
    }
    if hours < 24 {
        return format!("{} jam lalu", hours);
    }
    format!("{} hari lalu", hours / 24)
}

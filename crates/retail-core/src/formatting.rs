/// Currency symbol used by every report.
pub const CURRENCY_SYMBOL: &str = "£";

/// Format a floating-point number with thousands separators and a fixed number
/// of decimal places.
///
/// # Examples
///
/// ```
/// use retail_core::formatting::format_number;
///
/// assert_eq!(format_number(1234.5,  1), "1,234.5");
/// assert_eq!(format_number(1234567.0, 0), "1,234,567");
/// assert_eq!(format_number(0.0, 2), "0.00");
/// assert_eq!(format_number(-9876.5, 1), "-9,876.5");
/// ```
pub fn format_number(value: f64, decimals: u32) -> String {
    let negative = value < 0.0;
    let abs_value = value.abs();

    // Nudge by a relative epsilon so exact binary midpoints round away from zero.
    let factor = 10_f64.powi(decimals as i32);
    let epsilon = f64::EPSILON * abs_value * factor;
    let rounded = ((abs_value * factor) + epsilon).round() / factor;

    let integer_part = rounded.trunc() as u64;
    let frac_part = rounded - rounded.trunc();

    let grouped = group_thousands(&integer_part.to_string());

    let result = if decimals == 0 {
        grouped
    } else {
        let frac_str = format!("{:.prec$}", frac_part, prec = decimals as usize);
        // `frac_str` is "0.xx"; keep ".xx".
        format!("{}{}", grouped, &frac_str[1..])
    };

    if negative && rounded != 0.0 {
        format!("-{}", result)
    } else {
        result
    }
}

/// Format an integer count with thousands separators.
///
/// ```
/// use retail_core::formatting::format_count;
///
/// assert_eq!(format_count(397_924), "397,924");
/// ```
pub fn format_count(value: u64) -> String {
    group_thousands(&value.to_string())
}

/// Format a monetary amount in pounds with two decimal places and thousands
/// separators.
///
/// # Examples
///
/// ```
/// use retail_core::formatting::format_currency;
///
/// assert_eq!(format_currency(1234.56),  "£1,234.56");
/// assert_eq!(format_currency(0.0),      "£0.00");
/// assert_eq!(format_currency(-9.99),    "£-9.99");
/// ```
pub fn format_currency(amount: f64) -> String {
    format_currency_with(amount, 2)
}

/// Format a monetary amount rounded to whole pounds.
///
/// ```
/// use retail_core::formatting::format_currency_whole;
///
/// assert_eq!(format_currency_whole(8_911_407.9), "£8,911,408");
/// ```
pub fn format_currency_whole(amount: f64) -> String {
    format_currency_with(amount, 0)
}

fn format_currency_with(amount: f64, decimals: u32) -> String {
    if amount < 0.0 {
        format!("{}-{}", CURRENCY_SYMBOL, format_number(amount.abs(), decimals))
    } else {
        format!("{}{}", CURRENCY_SYMBOL, format_number(amount, decimals))
    }
}

/// Compact currency label for chart axes: millions as `£1.2M`, thousands as
/// `£350K`, smaller amounts in whole pounds.
///
/// ```
/// use retail_core::formatting::format_currency_compact;
///
/// assert_eq!(format_currency_compact(1_234_567.0), "£1.2M");
/// assert_eq!(format_currency_compact(279_489.0),   "£279K");
/// assert_eq!(format_currency_compact(512.4),       "£512");
/// ```
pub fn format_currency_compact(amount: f64) -> String {
    let abs = amount.abs();
    if abs >= 1e6 {
        format!("{}{:.1}M", CURRENCY_SYMBOL, amount / 1e6)
    } else if abs >= 1e3 {
        format!("{}{:.0}K", CURRENCY_SYMBOL, amount / 1e3)
    } else {
        format!("{}{:.0}", CURRENCY_SYMBOL, amount)
    }
}

/// Render an already-computed percentage to one decimal place.
///
/// ```
/// use retail_core::formatting::format_percent;
///
/// assert_eq!(format_percent(25.0),   "25.0%");
/// assert_eq!(format_percent(16.666), "16.7%");
/// ```
pub fn format_percent(value: f64) -> String {
    format!("{:.1}%", value)
}

/// Calculate `(part / whole) * 100`, rounded to `decimal_places`.
///
/// Returns `0.0` if `whole` is zero to avoid division by zero.
///
/// # Examples
///
/// ```
/// use retail_core::formatting::percentage;
///
/// assert!((percentage(50.0, 200.0, 1) - 25.0).abs() < 1e-9);
/// assert_eq!(percentage(0.0, 0.0, 2), 0.0);
/// ```
pub fn percentage(part: f64, whole: f64, decimal_places: u32) -> f64 {
    if whole == 0.0 {
        return 0.0;
    }
    let raw = (part / whole) * 100.0;
    let factor = 10_f64.powi(decimal_places as i32);
    (raw * factor).round() / factor
}

// ── Internal helpers ──────────────────────────────────────────────────────────

/// Insert commas every three digits from the right of an integer string.
fn group_thousands(s: &str) -> String {
    if s.len() <= 3 {
        return s.to_string();
    }
    let chars: Vec<char> = s.chars().collect();
    let mut result = String::with_capacity(s.len() + s.len() / 3);
    let remainder = chars.len() % 3;
    for (i, &c) in chars.iter().enumerate() {
        if i != 0 && (i % 3 == remainder) {
            result.push(',');
        }
        result.push(c);
    }
    result
}

// ── Tests ──────────────────────────────────────────────────────────────────────

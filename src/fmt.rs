//! Display helpers for CLI output.

/// Dollar amount with thousands separators, e.g. `$1,234.56` or `-$5.00`.
/// Values that cannot be a stored amount (NaN, infinities) print as `n/a`.
pub fn money(amount: f64) -> String {
    if !amount.is_finite() {
        return "n/a".to_string();
    }
    let cents = format!("{:.2}", amount.abs());
    let (whole, frac) = cents.split_once('.').unwrap_or((cents.as_str(), "00"));
    let sign = if amount < 0.0 && cents != "0.00" { "-" } else { "" };
    format!("{sign}${}.{frac}", group_thousands(whole))
}

fn group_thousands(digits: &str) -> String {
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

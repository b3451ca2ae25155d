//! Display formatting for amounts, shared by chat replies and the CLI.

/// Currency symbol for an ISO code; unknown codes fall back to Rupiah.
pub fn currency_symbol(code: &str) -> &'static str {
    match code.trim().to_uppercase().as_str() {
        "USD" => "$",
        "EUR" => "€",
        "SGD" => "S$",
        _ => "Rp",
    }
}

/// Compact Indonesian-style amount: `Rp 1.5jt`, `Rp 5rb`, `Rp 150.000`.
///
/// Billions use `M`, millions `jt`. Values from 1 000 up to 9 999 become
/// `rb`; everything else is grouped with `.` as thousands separator.
pub fn format_currency(amount: f64, symbol: &str) -> String {
    if !amount.is_finite() {
        return format!("{symbol} 0");
    }
    let sign = if amount < 0.0 { "-" } else { "" };
    let abs = amount.abs();
    let body = if abs >= 1_000_000_000.0 {
        format!("{:.1}M", abs / 1_000_000_000.0)
    } else if abs >= 1_000_000.0 {
        format!("{:.1}jt", abs / 1_000_000.0)
    } else if (1_000.0..10_000.0).contains(&abs) {
        format!("{:.0}rb", abs / 1_000.0)
    } else {
        group_thousands(abs.round() as u64)
    };
    format!("{symbol} {sign}{body}")
}

/// Full amount with `.` grouping and no abbreviation: `Rp 8.500.000`.
pub fn format_exact(amount: f64, symbol: &str) -> String {
    let sign = if amount < 0.0 { "-" } else { "" };
    format!("{symbol} {sign}{}", group_thousands(amount.abs().round() as u64))
}

fn group_thousands(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push('.');
        }
        out.push(c);
    }
    out
}

/// Share of `part` in `whole` as a percentage, 0 when `whole` is zero.
pub fn percent(part: f64, whole: f64) -> f64 {
    if whole == 0.0 { 0.0 } else { part / whole * 100.0 }
}

/// Description as shown to the user: first letter capitalized, a
/// placeholder when the message carried nothing but the amount.
pub fn display_description(description: &str) -> String {
    let mut chars = description.trim().chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => "Transaksi".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compact_ranges() {
        assert_eq!(format_currency(2_500_000_000.0, "Rp"), "Rp 2.5M");
        assert_eq!(format_currency(8_500_000.0, "Rp"), "Rp 8.5jt");
        assert_eq!(format_currency(5_000.0, "Rp"), "Rp 5rb");
        assert_eq!(format_currency(150_000.0, "Rp"), "Rp 150.000");
        assert_eq!(format_currency(750.0, "Rp"), "Rp 750");
        assert_eq!(format_currency(0.0, "$"), "$ 0");
    }

    #[test]
    fn test_negative_and_non_finite() {
        assert_eq!(format_currency(-25_000.0, "Rp"), "Rp -25.000");
        assert_eq!(format_currency(f64::NAN, "Rp"), "Rp 0");
    }

    #[test]
    fn test_exact_grouping() {
        assert_eq!(format_exact(8_500_000.0, "Rp"), "Rp 8.500.000");
        assert_eq!(format_exact(999.0, "Rp"), "Rp 999");
        assert_eq!(format_exact(-1_000.0, "€"), "€ -1.000");
    }

    #[test]
    fn test_symbols() {
        assert_eq!(currency_symbol("idr"), "Rp");
        assert_eq!(currency_symbol("SGD"), "S$");
        assert_eq!(currency_symbol("XYZ"), "Rp");
    }

    #[test]
    fn test_display_description() {
        assert_eq!(display_description("beli groceries"), "Beli groceries");
        assert_eq!(display_description(""), "Transaksi");
        assert_eq!(percent(25.0, 200.0), 12.5);
        assert_eq!(percent(1.0, 0.0), 0.0);
    }
}

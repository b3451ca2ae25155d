//! Amount extraction from free text and spreadsheet cells.
//!
//! Accepted shapes: `150000`, `150.000`, `150,000`, `1.000.000,50`,
//! `12.50`, `1.5jt`, `1,5 juta`, `150rb`, `25k`, `Rp 25.000`, `$12`.

use regex::Regex;
use std::sync::LazyLock;

static AMOUNT_RE: LazyLock<Regex> = LazyLock::new(|| {
    // literal pattern, cannot fail
    Regex::new(concat!(
        r"(?P<cur>\brp\.?\s?|\bs\$\s?|\$\s?|€\s?)?",
        r"(?P<num>\d+(?:[.,]\d+)*)",
        r"(?:\s?(?P<mult>juta|jt|ribu|rb|thousand|million|k|m)\b)?"
    ))
    .expect("amount regex")
});

/// A numeric run located in a piece of text
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AmountMatch {
    pub value: f64,
    /// Byte span of the whole match (currency marker and multiplier included)
    pub start: usize,
    pub end: usize,
    /// Length of the digits-and-separators part, used to pick the longest run
    pub run_len: usize,
}

fn scan(text: &str) -> impl Iterator<Item = AmountMatch> + '_ {
    AMOUNT_RE.captures_iter(text).filter_map(|caps| {
        let whole = caps.get(0)?;
        let num = caps.name("num")?;
        let mult = caps.name("mult").map(|m| m.as_str());
        let base = parse_number(num.as_str(), mult.is_some())?;
        let value = round2(base * mult.map(multiplier).unwrap_or(1.0));
        // overlong digit runs parse to infinity
        if !value.is_finite() {
            return None;
        }
        Some(AmountMatch {
            value,
            start: whole.start(),
            end: whole.end(),
            run_len: num.as_str().len(),
        })
    })
}

/// Pick the transaction amount out of normalized (lowercase) text.
///
/// The longest numeric run wins, the earliest on ties. Runs worth zero are
/// skipped.
pub fn extract_amount(text: &str) -> Option<AmountMatch> {
    let mut best: Option<AmountMatch> = None;
    for m in scan(text).filter(|m| m.value > 0.0) {
        match best {
            Some(b) if b.run_len >= m.run_len => {}
            _ => best = Some(m),
        }
    }
    best
}

/// Parse a single value such as a spreadsheet cell or a command argument.
///
/// Unlike [`extract_amount`] this keeps zero and honours a leading minus
/// sign (balances can go negative).
pub fn parse_amount(s: &str) -> Option<f64> {
    let s = s.trim().to_lowercase();
    if s.is_empty() {
        return None;
    }
    let (negative, rest) = match s.strip_prefix('-') {
        Some(rest) => (true, rest.trim_start()),
        None => (false, s.as_str()),
    };
    let first = scan(rest).next()?;
    Some(if negative { -first.value } else { first.value })
}

fn multiplier(suffix: &str) -> f64 {
    match suffix {
        "k" | "rb" | "ribu" | "thousand" => 1_000.0,
        "jt" | "juta" | "m" | "million" => 1_000_000.0,
        _ => 1.0,
    }
}

/// Interpret `.` and `,` inside a digit run.
///
/// - both present: the last one is decimal if 1-2 digits follow it
/// - one separator followed by 1-2 digits (or any single separator when a
///   multiplier follows): decimal
/// - otherwise separators group thousands and are dropped
fn parse_number(raw: &str, scaled: bool) -> Option<f64> {
    let has_dot = raw.contains('.');
    let has_comma = raw.contains(',');

    let normalized = if has_dot && has_comma {
        let last = raw.rfind(['.', ','])?;
        let tail = &raw[last + 1..];
        if (1..=2).contains(&tail.len()) {
            format!("{}.{}", strip_separators(&raw[..last]), tail)
        } else {
            strip_separators(raw)
        }
    } else if has_dot || has_comma {
        let groups: Vec<&str> = raw.split(['.', ',']).collect();
        if groups.len() == 2 && (scaled || groups[1].len() <= 2) {
            format!("{}.{}", groups[0], groups[1])
        } else {
            groups.concat()
        }
    } else {
        raw.to_string()
    };

    normalized.parse().ok()
}

fn strip_separators(s: &str) -> String {
    s.chars().filter(|c| c.is_ascii_digit()).collect()
}

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn value(text: &str) -> Option<f64> {
        extract_amount(text).map(|m| m.value)
    }

    #[test]
    fn test_plain_and_grouped() {
        assert_eq!(value("beli groceries 150000"), Some(150000.0));
        assert_eq!(value("beli groceries 150.000"), Some(150000.0));
        assert_eq!(value("beli groceries 150,000"), Some(150000.0));
        assert_eq!(value("tv 1.000.000"), Some(1000000.0));
    }

    #[test]
    fn test_decimal_conventions() {
        assert_eq!(value("kopi 12.50"), Some(12.5));
        assert_eq!(value("laptop 1.000.000,50"), Some(1000000.5));
        assert_eq!(value("laptop 1,000.50"), Some(1000.5));
        // ambiguous grouping: digits read as one integer
        assert_eq!(value("kode 1.2345"), Some(12345.0));
    }

    #[test]
    fn test_multipliers() {
        assert_eq!(value("gaji 1.5jt"), Some(1500000.0));
        assert_eq!(value("gaji 1,5 juta"), Some(1500000.0));
        assert_eq!(value("bayar listrik 150rb"), Some(150000.0));
        assert_eq!(value("parkir 5 ribu"), Some(5000.0));
        assert_eq!(value("snack 25k"), Some(25000.0));
        assert_eq!(value("gaji bulan ini 5 juta"), Some(5000000.0));
    }

    #[test]
    fn test_multiplier_needs_word_end() {
        // "5 kopi" must not read the k of "kopi" as thousands
        let m = extract_amount("beli 5 kopi").unwrap();
        assert_eq!(m.value, 5.0);
        assert_eq!(&"beli 5 kopi"[m.start..m.end], "5");
    }

    #[test]
    fn test_currency_marker_is_part_of_span() {
        let text = "makan siang rp 25.000 enak";
        let m = extract_amount(text).unwrap();
        assert_eq!(m.value, 25000.0);
        assert_eq!(&text[m.start..m.end], "rp 25.000");
    }

    #[test]
    fn test_longest_run_wins() {
        // "2" (qty) vs "150000" (price)
        let m = extract_amount("beli 2 buku 150000").unwrap();
        assert_eq!(m.value, 150000.0);
        // equal length: earliest wins
        let m = extract_amount("bayar 100 lalu 200").unwrap();
        assert_eq!(m.value, 100.0);
    }

    #[test]
    fn test_zero_runs_are_skipped() {
        assert_eq!(value("0 dan 5000"), Some(5000.0));
        assert_eq!(value("0"), None);
        assert_eq!(value("halo bot"), None);
    }

    #[test]
    fn test_overlong_digit_runs_are_rejected() {
        let huge = "9".repeat(400);
        assert_eq!(value(&format!("beli sesuatu {huge}")), None);
        assert_eq!(value(&format!("beli sesuatu {huge}jt")), None);
        // a finite run elsewhere in the text still counts
        assert_eq!(value(&format!("kode {huge} bayar 5000")), Some(5000.0));
        assert_eq!(parse_amount(&huge), None);
    }

    #[test]
    fn test_parse_amount_cells() {
        assert_eq!(parse_amount("150000"), Some(150000.0));
        assert_eq!(parse_amount("Rp 150.000"), Some(150000.0));
        assert_eq!(parse_amount("-25000"), Some(-25000.0));
        assert_eq!(parse_amount("0"), Some(0.0));
        assert_eq!(parse_amount("1,500,000.00"), Some(1500000.0));
        assert_eq!(parse_amount("  "), None);
        assert_eq!(parse_amount("n/a"), None);
    }
}

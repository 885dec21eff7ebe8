use std::sync::OnceLock;

use regex::Regex;

/// Leading numeric prefix after normalization, so trailing unit garbage
/// ("12,5 pts") degrades the way a lenient form parser does.
fn prefix_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^-?(\d+(\.\d*)?|\.\d+)").expect("static regex"))
}

/// Normalize a user-entered numeric string into a canonical value.
///
/// Decimal separator handling:
/// - both `,` and `.` present: whichever appears last is the decimal
///   point, the other is stripped everywhere as a thousands separator
///   ("1.234,56" and "1,234.56" are both 1234.56);
/// - only `,` present: treated as the decimal point ("12,5" is 12.5);
/// - only `.` or neither: parsed directly.
///
/// Returns NaN for anything that fails to parse. Callers must treat NaN
/// as a validation failure, never as a silent zero.
pub fn parse_number(text: &str) -> f64 {
    let s = text.trim();
    if s.is_empty() {
        return f64::NAN;
    }

    let comma = s.rfind(',');
    let dot = s.rfind('.');

    let normalized = match (comma, dot) {
        (Some(c), Some(d)) => {
            if c > d {
                s.replace('.', "").replace(',', ".")
            } else {
                s.replace(',', "")
            }
        }
        (Some(_), None) => s.replace(',', "."),
        _ => s.to_string(),
    };

    match prefix_re().find(&normalized) {
        Some(m) => m.as_str().parse::<f64>().unwrap_or(f64::NAN),
        None => f64::NAN,
    }
}

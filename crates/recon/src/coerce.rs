//! Best-effort value coercion.
//!
//! Every function here is total: an unparsable input yields `None` and the
//! caller substitutes its default (0 for quantities and prices). Nothing in
//! this module produces an error.

use crate::table::Value;

// ---------------------------------------------------------------------------
// Join keys
// ---------------------------------------------------------------------------

/// Canonical string form of a join key.
///
/// Trims surrounding whitespace and, for a plain decimal, drops trailing
/// fraction zeros (`"1024.0"` → `"1024"`, `"1024.50"` → `"1024.5"`), so a code
/// stored as a float in one source matches the same code stored as text in the
/// other. Leading zeros are kept.
pub fn normalize_key(raw: &str) -> String {
    let trimmed = raw.trim();
    if let Some((int_part, frac)) = trimmed.split_once('.') {
        let digits = int_part.strip_prefix('-').unwrap_or(int_part);
        if !digits.is_empty()
            && digits.chars().all(|c| c.is_ascii_digit())
            && !frac.is_empty()
            && frac.chars().all(|c| c.is_ascii_digit())
        {
            return match frac.trim_end_matches('0') {
                "" => int_part.to_string(),
                kept => format!("{int_part}.{kept}"),
            };
        }
    }
    trimmed.to_string()
}

// ---------------------------------------------------------------------------
// Numbers
// ---------------------------------------------------------------------------

/// Parse a loosely formatted number:
/// - Strip currency symbols and whitespace
/// - Handle `(12.50)` → `-12.50`
/// - Accept `,` or `.` as decimal separator (`2,50` and `2.50` are equal);
///   when both appear, the last one is the decimal separator
/// - Returns None if anything non-numeric remains
pub fn parse_decimal(s: &str) -> Option<f64> {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        return None;
    }

    let (is_negative, inner) = if trimmed.starts_with('(') && trimmed.ends_with(')') {
        (true, &trimmed[1..trimmed.len() - 1])
    } else {
        (false, trimmed)
    };

    let cleaned: String = inner
        .chars()
        .filter(|c| !matches!(c, '$' | '€' | '£') && !c.is_whitespace())
        .collect();
    if cleaned.is_empty() {
        return None;
    }

    let normalized = normalize_separators(&cleaned)?;

    for (i, c) in normalized.chars().enumerate() {
        match c {
            '0'..='9' | '.' => {}
            '-' | '+' if i == 0 && !is_negative => {}
            _ => return None,
        }
    }

    let value: f64 = normalized.parse().ok()?;
    if !value.is_finite() {
        return None;
    }
    Some(if is_negative { -value } else { value })
}

/// Rewrite thousands/decimal separators so the result uses a single `.`.
fn normalize_separators(s: &str) -> Option<String> {
    let commas = s.matches(',').count();
    let dots = s.matches('.').count();

    let out = match (commas, dots) {
        (0, 0) | (0, 1) => s.to_string(),
        // 2,50 → 2.50
        (1, 0) => s.replace(',', "."),
        // 1.234.567 or 1,234,567 → thousands only
        (0, _) => s.replace('.', ""),
        (_, 0) => s.replace(',', ""),
        _ => {
            let last_comma = s.rfind(',')?;
            let last_dot = s.rfind('.')?;
            if last_comma > last_dot {
                // 1.234,50
                s.replace('.', "").replace(',', ".")
            } else {
                // 1,234.50
                s.replace(',', "")
            }
        }
    };
    Some(out)
}

/// Non-negative whole quantity, truncated toward zero. Negative, non-finite
/// and unparsable values yield None.
pub fn quantity(value: &Value) -> Option<i64> {
    let n = match value {
        Value::Empty => return None,
        Value::Integer(n) => return (*n >= 0).then_some(*n),
        Value::Number(n) => *n,
        Value::Text(s) => parse_decimal(s)?,
    };
    if !n.is_finite() || n < 0.0 || n >= i64::MAX as f64 {
        return None;
    }
    Some(n.trunc() as i64)
}

/// Decimal amount (prices). Unparsable values yield None.
pub fn decimal(value: &Value) -> Option<f64> {
    match value {
        Value::Empty => None,
        Value::Integer(n) => Some(*n as f64),
        Value::Number(n) => n.is_finite().then_some(*n),
        Value::Text(s) => parse_decimal(s),
    }
}

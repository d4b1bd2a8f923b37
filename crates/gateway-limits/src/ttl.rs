//! Key TTL parsing.
//!
//! TTLs are stored as Go duration strings such as `"720h"`, `"1h30m"`,
//! `"1.5h"` or `"-10s"`: an optional sign followed by one or more
//! `<number><unit>` components, units `ns`, `us`, `µs`, `ms`, `s`, `m`, `h`.
//! Anything else (day units, spaces, a bare number other than `0`) is not a
//! duration, and the key never expires.

const NANOS_PER_SEC: i64 = 1_000_000_000;

/// Whole seconds of a TTL, truncated toward zero.
///
/// Zero means no expiry. Negative values are kept, so a key with a negative
/// TTL is already expired.
#[must_use]
pub fn ttl_seconds(ttl: &str) -> i64 {
    parse_duration_nanos(ttl).map_or(0, |nanos| nanos / NANOS_PER_SEC)
}

/// Parse a Go duration string into signed nanoseconds.
///
/// Returns `None` for malformed input and for values outside the `i64`
/// nanosecond range.
#[must_use]
pub fn parse_duration_nanos(input: &str) -> Option<i64> {
    let (negative, body) = match input.as_bytes().first() {
        Some(b'-') => (true, &input[1..]),
        Some(b'+') => (false, &input[1..]),
        _ => (false, input),
    };
    if body == "0" {
        return Some(0);
    }
    if body.is_empty() {
        return None;
    }

    let mut rest = body;
    let mut total: u64 = 0;
    while !rest.is_empty() {
        let int_len = leading_digits(rest);
        let int_part = &rest[..int_len];
        rest = &rest[int_len..];

        let mut frac_part = "";
        if let Some(after_dot) = rest.strip_prefix('.') {
            let frac_len = leading_digits(after_dot);
            frac_part = &after_dot[..frac_len];
            rest = &after_dot[frac_len..];
        }
        if int_part.is_empty() && frac_part.is_empty() {
            return None;
        }

        let unit_len = rest
            .find(|c: char| c == '.' || c.is_ascii_digit())
            .unwrap_or(rest.len());
        let unit = unit_nanos(&rest[..unit_len])?;
        rest = &rest[unit_len..];

        let whole: u64 = if int_part.is_empty() {
            0
        } else {
            int_part.parse().ok()?
        };
        let mut value = whole.checked_mul(unit)?;
        if !frac_part.is_empty() {
            let fraction: f64 = format!("0.{frac_part}").parse().ok()?;
            value = value.checked_add((fraction * unit as f64) as u64)?;
        }
        total = total.checked_add(value)?;
    }

    let total = i64::try_from(total).ok()?;
    Some(if negative { -total } else { total })
}

fn leading_digits(s: &str) -> usize {
    s.bytes().take_while(u8::is_ascii_digit).count()
}

fn unit_nanos(unit: &str) -> Option<u64> {
    match unit {
        "ns" => Some(1),
        // U+00B5 micro sign and U+03BC Greek mu
        "us" | "\u{b5}s" | "\u{3bc}s" => Some(1_000),
        "ms" => Some(1_000_000),
        "s" => Some(1_000_000_000),
        "m" => Some(60 * 1_000_000_000),
        "h" => Some(3_600 * 1_000_000_000),
        _ => None,
    }
}

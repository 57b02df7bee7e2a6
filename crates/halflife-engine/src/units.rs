//! Human-readable durations.
//!
//! Durations below one second get an SI-prefixed `s` unit (`ms`, `µs`, ...);
//! longer ones are expressed in the largest of `s`, `min`, `h`, `d` and `yr`
//! that fits. The returned [`FormattedDuration`] carries the multiplier that
//! was applied so plot axes can reuse the same unit for every tick label.

use std::fmt;

/// Seconds per Julian year.
pub const SECONDS_PER_YEAR: f64 = 60.0 * 60.0 * 24.0 * 365.25;

/// Significant digits used when the caller has no preference.
pub const DEFAULT_DIGITS: i32 = 2;

/// SI prefixes at or below one, by decimal exponent.
const SI_PREFIXES: [(i32, &str); 11] = [
    (0, ""),
    (-3, "m"),
    (-6, "µ"),
    (-9, "n"),
    (-12, "p"),
    (-15, "f"),
    (-18, "a"),
    (-21, "z"),
    (-24, "y"),
    (-27, "r"),
    (-30, "q"),
];

/// Calendar units at or above one second.
const CALENDAR_UNITS: [(f64, &str); 4] = [
    (60.0, "min"),
    (60.0 * 60.0, "h"),
    (60.0 * 60.0 * 24.0, "d"),
    (SECONDS_PER_YEAR, "yr"),
];

/// A duration rendered for display.
#[derive(Debug, Clone, PartialEq)]
pub struct FormattedDuration {
    /// `seconds * multiplier`, the number shown next to `unit`.
    pub value: f64,
    /// Factor converting seconds into `unit`.
    pub multiplier: f64,
    pub unit: String,
    /// `value` rounded for display, followed by the unit.
    pub text: String,
}

impl fmt::Display for FormattedDuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

/// Format `seconds` with [`DEFAULT_DIGITS`].
pub fn format_seconds(seconds: f64) -> FormattedDuration {
    format_seconds_with(seconds, DEFAULT_DIGITS)
}

/// Format `seconds`, keeping roughly `digits` digits after the leading one.
pub fn format_seconds_with(seconds: f64, digits: i32) -> FormattedDuration {
    if seconds < 1.0 {
        return format_si(seconds, "s", digits);
    }

    let (divisor, unit) = CALENDAR_UNITS
        .iter()
        .take_while(|(divisor, _)| seconds >= *divisor)
        .last()
        .copied()
        .unwrap_or((1.0, "s"));
    finish(seconds, 1.0 / divisor, unit.to_string(), digits)
}

/// Format `value` with an SI prefix on `unit`. Only prefixes at or below
/// one are used, so this is meant for quantities under 1000.
pub fn format_si(value: f64, unit: &str, digits: i32) -> FormattedDuration {
    let exponent = if value > 0.0 && value.is_finite() {
        value.log10().floor() as i32
    } else {
        0
    };
    let (power, prefix) = SI_PREFIXES
        .iter()
        .find(|(power, _)| *power <= exponent)
        .copied()
        .unwrap_or(SI_PREFIXES[SI_PREFIXES.len() - 1]);
    finish(value, 10f64.powi(-power), format!("{prefix}{unit}"), digits)
}

fn finish(seconds: f64, multiplier: f64, unit: String, digits: i32) -> FormattedDuration {
    let value = seconds * multiplier;
    let text = format!("{} {unit}", format_number(value, digits));
    FormattedDuration {
        value,
        multiplier,
        unit,
        text,
    }
}

/// Unit for a time axis spanning `lifetime` seconds.
///
/// Same as [`format_seconds`], except that spans of a thousand years or more
/// fold the power of ten into the unit (`"1e9 yr"`) so tick labels stay short.
pub fn axis_unit(lifetime: f64) -> (f64, String) {
    let FormattedDuration {
        mut multiplier,
        mut unit,
        ..
    } = format_seconds(lifetime);
    let scaled = lifetime * multiplier;
    if unit == "yr" && scaled >= 1e3 {
        let log10 = scaled.log10().trunc() as i32;
        unit = format!("1e{log10} yr");
        multiplier *= 10f64.powi(-log10);
    }
    (multiplier, unit)
}

/// Render `value` with about `digits` decimals, switching to scientific
/// notation when the magnitude is far from one.
pub fn format_number(value: f64, digits: i32) -> String {
    if value == 0.0 || !value.is_finite() {
        return format!("{value:.prec$}", prec = digits.max(0) as usize);
    }
    // Truncated toward zero, not floored.
    let log10 = value.abs().log10().trunc() as i32;

    let scientific = if log10 > 0 {
        log10 > digits + 1
    } else {
        log10 < -digits
    };
    if scientific {
        return format!("{:.2} × 10^{log10}", value / 10f64.powi(log10));
    }
    if log10 > digits {
        return format!("{value:.0}");
    }
    format!("{value:.prec$}", prec = (digits - log10).max(0) as usize)
}

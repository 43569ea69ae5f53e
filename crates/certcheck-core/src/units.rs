//! Unit canonicalisation, value parsing and unit conversion.
//!
//! Conversion fails closed: a pair of units without a table entry is an error,
//! never a silently unconverted number.

use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

use crate::error::UnitError;
use crate::tables::Tables;

/// How a raw value string relates to its number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Qualifier {
    /// Plain number.
    None,
    LessThan,
    GreaterThan,
    Approximately,
    /// "ND", "BDL", "not detected"; numeric is an advisory 0.0.
    NotDetected,
    /// Free text with no leading number.
    Qualitative,
    /// "N/A", "-", blank.
    NotApplicable,
}

/// A raw value string normalised into a comparable form.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ParsedValue {
    pub numeric: Option<f64>,
    pub qualifier: Qualifier,
}

impl ParsedValue {
    fn new(numeric: Option<f64>, qualifier: Qualifier) -> Self {
        Self { numeric, qualifier }
    }

    /// Number usable for a limit comparison (excludes advisory values).
    pub fn measured(&self) -> Option<f64> {
        match self.qualifier {
            Qualifier::None
            | Qualifier::LessThan
            | Qualifier::GreaterThan
            | Qualifier::Approximately => self.numeric,
            Qualifier::NotDetected | Qualifier::Qualitative | Qualifier::NotApplicable => None,
        }
    }
}

static LEADING_NUMBER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(?P<q><=|>=|[<>~≤≥≈])?\s*(?P<num>[-+]?(?:\d[\d,]*(?:\.\d+)?|\.\d+)(?:[eE][-+]?\d+)?)",
    )
    .expect("valid regex")
});

// "1.2 x 10-3", "1.2×10^-3", "3·10⁻⁴": a power of ten the number pattern does not read.
static TRAILING_POWER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(?:[x×*·]\s*\d|\^|[⁰¹²³⁴⁵⁶⁷⁸⁹⁻])").expect("valid regex")
});

// "ND (<0.01)", "BDL [LOD 0.05]": a marker followed by a bracketed annotation.
static ANNOTATED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?P<head>[^(\[]+?)\s*(?:\([^)]*\)|\[[^\]]*\])\s*$").expect("valid regex")
});

static RANGE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^\s*(\d[\d,]*(?:\.\d+)?)\s*(?:-|–|—|to)\s*(\d[\d,]*(?:\.\d+)?)\s*(?:[^\d.]|$)")
        .expect("valid regex")
});

// "20/4", "20/4°C": measured at 20, referenced to water at 4.
static TEMP_RATIO: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(\d+(?:\.\d+)?)\s*/\s*\d+(?:\.\d+)?\s*(?:°\s*c\b)?").expect("valid regex")
});

static TEMP_DEGREES: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(-?\d+(?:\.\d+)?)\s*(?:°|º|deg\.?\s*)\s*c\b").expect("valid regex")
});

static TEMP_AT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"@\s*(-?\d+(?:\.\d+)?)").expect("valid regex"));

/// Map a unit spelling to its canonical token (`% w/w` → `%`, `mg/L` → `ppm`).
///
/// Unknown units come back trimmed but otherwise unchanged.
pub fn normalize_unit(raw: &str, tables: &Tables) -> String {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return String::new();
    }
    let lowered = trimmed
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ");
    tables
        .canonical_unit(&lowered)
        .map(str::to_string)
        .unwrap_or_else(|| trimmed.to_string())
}

/// Parse a raw value string into a number and qualifier.
///
/// | input          | numeric | qualifier      |
/// |----------------|---------|----------------|
/// | `"5.2"`        | 5.2     | none           |
/// | `"<0.5"`       | 0.5     | less_than      |
/// | `">10"`        | 10      | greater_than   |
/// | `"~3.0"`       | 3.0     | approximately  |
/// | `"5E-3"`       | 0.005   | none           |
/// | `"ND"`         | 0.0     | not_detected   |
/// | `"ND (<0.01)"` | 0.0     | not_detected   |
/// | `"N/A"`        | —       | not_applicable |
/// | `"Conforms"`   | —       | qualitative    |
///
/// A number followed by power-of-ten notation the parser cannot read
/// (`"1.2 x 10-3"`) is qualitative, never a truncated mantissa.
pub fn parse_value(raw: &str, tables: &Tables) -> ParsedValue {
    let s = raw.trim();
    let lowered = s.to_lowercase();

    let marker = ANNOTATED
        .captures(&lowered)
        .map_or(lowered.as_str(), |caps| caps.name("head").map_or("", |m| m.as_str()));
    if tables.not_detected.contains(&lowered) || tables.not_detected.contains(marker) {
        return ParsedValue::new(Some(0.0), Qualifier::NotDetected);
    }
    if s.is_empty() || tables.not_applicable.contains(&lowered) {
        return ParsedValue::new(None, Qualifier::NotApplicable);
    }
    if !s.chars().any(|c| c.is_ascii_digit()) {
        return ParsedValue::new(None, Qualifier::Qualitative);
    }

    let Some(caps) = LEADING_NUMBER.captures(s) else {
        // Digits present but not leading: "Complies with BP 2020".
        return ParsedValue::new(None, Qualifier::Qualitative);
    };
    let rest = &s[caps.get(0).map_or(0, |m| m.end())..];
    if TRAILING_POWER.is_match(rest) {
        return ParsedValue::new(None, Qualifier::Qualitative);
    }
    let Ok(number) = caps["num"].replace(',', "").parse::<f64>() else {
        return ParsedValue::new(None, Qualifier::Qualitative);
    };
    let qualifier = match caps.name("q").map(|m| m.as_str()) {
        Some("<" | "<=" | "≤") => Qualifier::LessThan,
        Some(">" | ">=" | "≥") => Qualifier::GreaterThan,
        Some("~" | "≈") => Qualifier::Approximately,
        _ => Qualifier::None,
    };
    ParsedValue::new(Some(number), qualifier)
}

/// Parse a value written as a range (`"7.90 - 8.20"`, `"10 to 12"`).
///
/// Bounds come back ordered low to high.
pub fn parse_range(raw: &str) -> Option<(f64, f64)> {
    let caps = RANGE.captures(raw)?;
    let a: f64 = caps[1].replace(',', "").parse().ok()?;
    let b: f64 = caps[2].replace(',', "").parse().ok()?;
    Some((a.min(b), a.max(b)))
}

/// Whether two units are equal after canonicalisation or have a conversion factor.
pub fn are_units_compatible(u1: &str, u2: &str, tables: &Tables) -> bool {
    let n1 = normalize_unit(u1, tables);
    let n2 = normalize_unit(u2, tables);
    tables.conversion_factor(&n1, &n2).is_some()
}

/// Convert `value` from one unit to another using the conversion table.
pub fn convert(value: f64, from: &str, to: &str, tables: &Tables) -> Result<f64, UnitError> {
    let n_from = normalize_unit(from, tables);
    let n_to = normalize_unit(to, tables);
    tables
        .conversion_factor(&n_from, &n_to)
        .map(|factor| value * factor)
        .ok_or(UnitError::Incompatible {
            from: from.trim().to_string(),
            to: to.trim().to_string(),
        })
}

/// Normalise a parameter name for matching: lower-case, ASCII alphanumerics and
/// single spaces only.
pub fn normalize_name(name: &str) -> String {
    name.to_lowercase()
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || c.is_whitespace())
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Measurement temperature (°C) embedded in a parameter name or unit.
///
/// Recognises `SG (20/4)`, `SG @25°C`, `Density at 15 °C`, `SG 20/4°C`.
pub fn measurement_temperature(text: &str) -> Option<f64> {
    let lowered = text.to_lowercase();
    [&*TEMP_RATIO, &*TEMP_DEGREES, &*TEMP_AT]
        .iter()
        .find_map(|re| re.captures(&lowered))
        .and_then(|caps| caps[1].parse().ok())
}

//! Per-parameter verdict rule.
//!
//! Strict on FAIL, generous on PASS: a parameter fails only when a number is
//! proven outside the limits, either directly or after a successful unit
//! conversion. Anything short of proof is REVIEW.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;

use crate::config::EngineConfig;
use crate::error::UnitError;
use crate::model::{Parameter, Status};
use crate::tables::Tables;
use crate::units::{
    Qualifier, convert, measurement_temperature, normalize_name, normalize_unit, parse_range,
    parse_value,
};

static MAX_WORDS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)^\s*(?:max(?:imum)?\.?|nmt|not more than)\s*:?\s*(\d[\d,]*(?:\.\d+)?(?:e[-+]?\d+)?)|^\s*(\d[\d,]*(?:\.\d+)?(?:e[-+]?\d+)?)\s*[^\d\s]*\s*max(?:imum)?\b",
    )
    .expect("valid regex")
});

static MIN_WORDS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)^\s*(?:min(?:imum)?\.?|nlt|not less than)\s*:?\s*(\d[\d,]*(?:\.\d+)?(?:e[-+]?\d+)?)|^\s*(\d[\d,]*(?:\.\d+)?(?:e[-+]?\d+)?)\s*[^\d\s]*\s*min(?:imum)?\b",
    )
    .expect("valid regex")
});

/// Closed numeric limits; an absent side is unbounded.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Limits {
    pub min: Option<f64>,
    pub max: Option<f64>,
}

impl Limits {
    /// Limits of a specification parameter.
    ///
    /// Uses `min_limit`/`max_limit` when either parses; otherwise reads the
    /// expected value for a range (`"7.9 - 8.2"`), a bound (`"<0.5"`, `"≥ 99"`) or a
    /// worded bound (`"Max 0.5"`, `"99.0 % min"`, `"NMT 10"`).
    pub fn from_parameter(spec: &Parameter, tables: &Tables) -> Self {
        let limits = Self {
            min: spec.min().and_then(|s| parse_value(s, tables).measured()),
            max: spec.max().and_then(|s| parse_value(s, tables).measured()),
        };
        if !limits.is_empty() {
            return limits;
        }
        Self::from_text(&spec.value, tables)
    }

    fn from_text(text: &str, tables: &Tables) -> Self {
        if let Some((lo, hi)) = parse_range(text) {
            return Self {
                min: Some(lo),
                max: Some(hi),
            };
        }
        if let Some(max) = worded_bound(&MAX_WORDS, text) {
            return Self {
                min: None,
                max: Some(max),
            };
        }
        if let Some(min) = worded_bound(&MIN_WORDS, text) {
            return Self {
                min: Some(min),
                max: None,
            };
        }
        let parsed = parse_value(text, tables);
        match parsed.qualifier {
            Qualifier::LessThan => Self {
                min: None,
                max: parsed.numeric,
            },
            Qualifier::GreaterThan => Self {
                min: parsed.numeric,
                max: None,
            },
            _ => Self::default(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.min.is_none() && self.max.is_none()
    }

    pub fn contains(&self, value: f64) -> bool {
        self.min.is_none_or(|min| value >= min) && self.max.is_none_or(|max| value <= max)
    }

    /// Where an interval of possible true values sits relative to these limits.
    ///
    /// `open_lo`/`open_hi` mark bounds the true value cannot equal (`<x`, `>x`).
    fn place(&self, lo: f64, hi: f64, open_lo: bool, open_hi: bool) -> Placement {
        if let Some(min) = self.min
            && (hi < min || (open_hi && hi <= min))
        {
            return Placement::BelowMin(min);
        }
        if let Some(max) = self.max
            && (lo > max || (open_lo && lo >= max))
        {
            return Placement::AboveMax(max);
        }
        if self.min.is_none_or(|min| lo >= min) && self.max.is_none_or(|max| hi <= max) {
            Placement::Inside
        } else {
            Placement::Straddles
        }
    }
}

impl fmt::Display for Limits {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.min, self.max) {
            (Some(min), Some(max)) => write!(f, "{min} – {max}"),
            (Some(min), None) => write!(f, "≥ {min}"),
            (None, Some(max)) => write!(f, "≤ {max}"),
            (None, None) => f.write_str("unbounded"),
        }
    }
}

fn worded_bound(re: &Regex, text: &str) -> Option<f64> {
    let caps = re.captures(text)?;
    caps.get(1)
        .or_else(|| caps.get(2))
        .and_then(|m| m.as_str().replace(',', "").parse().ok())
}

enum Placement {
    Inside,
    BelowMin(f64),
    AboveMax(f64),
    Straddles,
}

/// Status plus the human-readable explanation shown to reviewers.
#[derive(Debug, Clone, PartialEq)]
pub struct Verdict {
    pub status: Status,
    pub reason: String,
}

impl Verdict {
    fn pass(reason: impl Into<String>) -> Self {
        Self {
            status: Status::Pass,
            reason: reason.into(),
        }
    }

    fn fail(reason: impl Into<String>) -> Self {
        Self {
            status: Status::Fail,
            reason: reason.into(),
        }
    }

    fn review(reason: impl Into<String>) -> Self {
        Self {
            status: Status::Review,
            reason: reason.into(),
        }
    }
}

/// Judge one certificate parameter against its specification counterpart.
pub fn evaluate(
    spec: &Parameter,
    cert: &Parameter,
    tables: &Tables,
    config: &EngineConfig,
) -> Verdict {
    let name = spec.name.trim();

    let spec_temp = measurement_temperature(&format!("{} {}", spec.name, spec.unit));
    let cert_temp = measurement_temperature(&format!("{} {}", cert.name, cert.unit));
    if let (Some(a), Some(b)) = (spec_temp, cert_temp)
        && (a - b).abs() > config.temperature_tolerance_c
    {
        return Verdict::review(format!(
            "Measurement conditions differ: specification at {a}°C, certificate at {b}°C"
        ));
    }

    let limits = Limits::from_parameter(spec, tables);

    if let Some((lo, hi)) = parse_range(&cert.value) {
        return evaluate_range(name, lo, hi, spec, cert, &limits, tables);
    }

    let parsed = parse_value(&cert.value, tables);
    match parsed.qualifier {
        Qualifier::NotApplicable => Verdict::review("No certificate value reported"),
        Qualifier::Qualitative => evaluate_qualitative(spec, cert, &limits, tables),
        Qualifier::NotDetected => match limits.max {
            Some(max) => Verdict::pass(format!("Not detected, within maximum {max}")),
            None => Verdict::review("Not detected, no maximum limit to validate against"),
        },
        Qualifier::None
        | Qualifier::LessThan
        | Qualifier::GreaterThan
        | Qualifier::Approximately => {
            let Some(raw) = parsed.numeric else {
                return Verdict::review(format!(
                    "Cannot parse certificate value: '{}'",
                    cert.value.trim()
                ));
            };
            if limits.is_empty() {
                return Verdict::review("No numeric specification limits to compare against");
            }
            let value = match to_spec_unit(raw, spec, cert, tables) {
                Ok(v) => v,
                Err(e) => return Verdict::review(unit_reason(&e)),
            };
            let shown = shown_value(raw, value, parsed.qualifier, spec, cert, tables);
            evaluate_number(name, value, parsed.qualifier, &shown, &limits)
        }
    }
}

fn evaluate_number(
    name: &str,
    value: f64,
    qualifier: Qualifier,
    shown: &str,
    limits: &Limits,
) -> Verdict {
    let placement = match qualifier {
        Qualifier::LessThan => limits.place(f64::NEG_INFINITY, value, false, true),
        Qualifier::GreaterThan => limits.place(value, f64::INFINITY, true, false),
        _ => limits.place(value, value, false, false),
    };
    match (placement, qualifier) {
        (Placement::Inside, _) => Verdict::pass(format!("{name}: {shown} within {limits}")),
        (Placement::BelowMin(_) | Placement::AboveMax(_), Qualifier::Approximately) => {
            Verdict::review(format!(
                "{name}: approximate value {shown} outside {limits}, not conclusive"
            ))
        }
        (Placement::BelowMin(min), _) => {
            Verdict::fail(format!("{name}: {shown} below minimum {min}"))
        }
        (Placement::AboveMax(max), _) => {
            Verdict::fail(format!("{name}: {shown} exceeds maximum {max}"))
        }
        (Placement::Straddles, _) => Verdict::review(format!(
            "{name}: {shown} cannot be confirmed within {limits}"
        )),
    }
}

fn evaluate_range(
    name: &str,
    lo: f64,
    hi: f64,
    spec: &Parameter,
    cert: &Parameter,
    limits: &Limits,
    tables: &Tables,
) -> Verdict {
    if limits.is_empty() {
        return Verdict::review("Certificate gives a range but the specification has no limits");
    }
    let converted = to_spec_unit(lo, spec, cert, tables)
        .and_then(|lo| to_spec_unit(hi, spec, cert, tables).map(|hi| (lo, hi)));
    let (lo, hi) = match converted {
        Ok(bounds) => bounds,
        Err(e) => return Verdict::review(unit_reason(&e)),
    };
    match limits.place(lo, hi, false, false) {
        Placement::Inside => Verdict::pass(format!("{name}: range {lo} – {hi} within {limits}")),
        Placement::BelowMin(min) => Verdict::fail(format!(
            "{name}: range {lo} – {hi} entirely below minimum {min}"
        )),
        Placement::AboveMax(max) => Verdict::fail(format!(
            "{name}: range {lo} – {hi} entirely above maximum {max}"
        )),
        Placement::Straddles => Verdict::review(format!(
            "{name}: range {lo} – {hi} extends beyond {limits}"
        )),
    }
}

fn evaluate_qualitative(
    spec: &Parameter,
    cert: &Parameter,
    limits: &Limits,
    tables: &Tables,
) -> Verdict {
    let value = cert.value.trim();
    if !limits.is_empty() {
        return Verdict::review(format!(
            "Qualitative certificate value '{value}' against numeric limits {limits}"
        ));
    }

    let cert_text = normalize_name(value);
    let spec_text = normalize_name(&spec.value);
    if !spec_text.is_empty() && spec_text == cert_text {
        return Verdict::pass(format!("'{value}' matches the specification requirement"));
    }
    if contains_any(&cert_text, &tables.negation_terms) {
        return Verdict::review(format!("Ambiguous or negative statement: '{value}'"));
    }
    if is_conformance_statement(&cert_text, tables) {
        return Verdict::pass(format!("Conforms: '{value}'"));
    }
    Verdict::review(format!(
        "Cannot confirm '{value}' against requirement '{}'",
        spec.value.trim()
    ))
}

/// Whole-word (or whole-phrase) match of any term in normalised text.
fn contains_any(text: &str, terms: &[String]) -> bool {
    let padded = format!(" {text} ");
    terms.iter().any(|term| {
        let term = normalize_name(term);
        !term.is_empty() && padded.contains(&format!(" {term} "))
    })
}

/// Whether normalised text is itself a conformance statement: a conformance
/// term, optionally followed only by what it conforms to ("complies with bp 2020").
///
/// Descriptive text that merely contains a term ("clear yellow liquid") is not.
fn is_conformance_statement(text: &str, tables: &Tables) -> bool {
    tables.conformance_terms.iter().any(|term| {
        let term = normalize_name(term);
        if term.is_empty() {
            return false;
        }
        let rest = if text == term {
            Some("")
        } else {
            text.strip_prefix(term.as_str())
                .and_then(|r| r.strip_prefix(' '))
        };
        rest.is_some_and(|rest| {
            rest.split_whitespace().all(|word| {
                word.chars().all(|c| c.is_ascii_digit())
                    || tables.conformance_references.contains(word)
            })
        })
    })
}

/// Express a certificate number in the specification's unit.
///
/// A blank unit on either side is read as "same unit".
fn to_spec_unit(
    value: f64,
    spec: &Parameter,
    cert: &Parameter,
    tables: &Tables,
) -> Result<f64, UnitError> {
    if spec.unit.trim().is_empty() || cert.unit.trim().is_empty() {
        return Ok(value);
    }
    convert(value, &cert.unit, &spec.unit, tables)
}

fn unit_reason(e: &UnitError) -> String {
    match e {
        UnitError::Incompatible { from, to } => {
            format!("Incompatible units: certificate {from}, specification {to}")
        }
    }
}

fn shown_value(
    raw: f64,
    converted: f64,
    qualifier: Qualifier,
    spec: &Parameter,
    cert: &Parameter,
    tables: &Tables,
) -> String {
    let prefix = match qualifier {
        Qualifier::LessThan => "<",
        Qualifier::GreaterThan => ">",
        Qualifier::Approximately => "~",
        _ => "",
    };
    let from = normalize_unit(&cert.unit, tables);
    let to = normalize_unit(&spec.unit, tables);
    if from != to && !from.is_empty() && !to.is_empty() {
        format!("{prefix}{raw} {} ({prefix}{converted} {})", cert.unit.trim(), spec.unit.trim())
    } else {
        format!("{prefix}{raw}")
    }
}

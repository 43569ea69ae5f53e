//! Vertical card display for comparison results.
//!
//! Renders a [`ComparisonResult`] as grouped, human-readable sections, one line
//! per parameter, with long reasons shortened to fit a terminal row.

use std::fmt::Write;

use certcheck_core::{Alignment, ComparisonResult, ParameterComparison, ProductMatch, Status};

const REASON_WIDTH: usize = 60;
const NAME_WIDTH: usize = 28;

// ── Public API ──

/// Render a comparison result as a card.
pub fn render_result(result: &ComparisonResult) -> String {
    let mut out = String::new();

    let _ = writeln!(
        out,
        "=== {} === {} {}",
        result.overall_status, result.cert_type, result.product_name
    );
    let _ = writeln!(out, "{}", result.reason);
    let _ = writeln!(out);

    section(
        &mut out,
        "Documents",
        &[
            ("specification", result.product_name.as_str()),
            ("certificate", result.cert_product_name.as_str()),
            ("batch", result.batch_number.as_str()),
            ("product match", if result.product_match { "yes" } else { "NO" }),
            ("alignment", alignment_label(result.alignment)),
            (
                "compliance statement",
                result.compliance_statement.as_deref().unwrap_or(""),
            ),
        ],
    );

    let c = result.counts;
    let _ = writeln!(out, "Summary");
    let _ = writeln!(
        out,
        "  {:<NAME_WIDTH$} {} checked, {} passed, {} failed, {} review, {} not in cert",
        "parameters", c.checked, c.passed, c.failed, c.review, c.not_in_cert
    );
    let _ = writeln!(out);

    if !result.details.is_empty() {
        let _ = writeln!(out, "Parameters ({})", result.details.len());
        for d in &result.details {
            render_detail(&mut out, d);
        }
        let _ = writeln!(out);
    }

    out
}

/// Render a pre-check verdict.
pub fn render_precheck(verdict: &ProductMatch) -> String {
    let mut out = String::new();
    let headline = match (verdict.mismatch, verdict.rule) {
        (true, _) => "MISMATCH".to_string(),
        (false, Some(rule)) => format!("MATCH ({rule})"),
        (false, None) => "UNVERIFIED".to_string(),
    };
    let _ = writeln!(out, "{headline}");
    let _ = writeln!(out, "  {}", verdict.reason);
    out
}

// ── Rows ──

fn section(out: &mut String, header: &str, rows: &[(&str, &str)]) {
    if rows.iter().all(|(_, v)| v.trim().is_empty()) {
        return;
    }
    let _ = writeln!(out, "{header}");
    for (label, value) in rows {
        if value.trim().is_empty() {
            continue;
        }
        let _ = writeln!(out, "  {label:<NAME_WIDTH$} {}", value.trim());
    }
    let _ = writeln!(out);
}

fn render_detail(out: &mut String, d: &ParameterComparison) {
    let _ = write!(
        out,
        "  {} {:<NAME_WIDTH$}",
        status_mark(d.status),
        shorten(&d.spec_parameter, NAME_WIDTH)
    );
    let limits = limits_text(d);
    if !limits.is_empty() {
        let _ = write!(out, "  spec: {limits}");
    }
    if !d.cert_value.trim().is_empty() {
        let _ = write!(out, "  cert: {}", join_unit(&d.cert_value, &d.cert_unit));
    }
    let _ = writeln!(out);

    if !d.cert_parameter.is_empty() && d.cert_parameter != d.spec_parameter {
        let _ = writeln!(out, "      as: {}", d.cert_parameter);
    }
    if !d.reason.is_empty() {
        let _ = writeln!(out, "      {}", shorten(&d.reason, REASON_WIDTH));
    }
}

// ── Helpers ──

fn status_mark(status: Status) -> &'static str {
    match status {
        Status::Pass => "[PASS]  ",
        Status::Fail => "[FAIL]  ",
        Status::Review => "[REVIEW]",
        Status::NotInCert => "[ -- ]  ",
    }
}

fn alignment_label(alignment: Alignment) -> &'static str {
    match alignment {
        Alignment::Oracle => "semantic oracle",
        Alignment::Fallback => "name matcher (oracle unavailable)",
        Alignment::None => "",
    }
}

fn limits_text(d: &ParameterComparison) -> String {
    let range = match (d.spec_min.trim(), d.spec_max.trim()) {
        ("", "") => d.spec_value.trim().to_string(),
        (min, "") => format!("≥ {min}"),
        ("", max) => format!("≤ {max}"),
        (min, max) => format!("{min} – {max}"),
    };
    if range.is_empty() {
        range
    } else {
        join_unit(&range, &d.spec_unit)
    }
}

fn join_unit(value: &str, unit: &str) -> String {
    let unit = unit.trim();
    if unit.is_empty() {
        value.trim().to_string()
    } else {
        format!("{} {unit}", value.trim())
    }
}

/// Truncate to `max` characters, marking the cut with "...".
fn shorten(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let kept: String = text.chars().take(max.saturating_sub(3)).collect();
    format!("{kept}...")
}

#[cfg(test)]
mod tests {
    use super::*;
    use certcheck_core::{CertificateType, Counts, OverallStatus, Parameter};

    fn sample() -> ComparisonResult {
        let assay = Parameter::new("Assay", "", "%").with_limits(Some("19.5"), Some("20.5"));
        let iron = Parameter::new("Iron", "", "ppm").with_limits(None, Some("5"));
        let details = vec![
            ParameterComparison::for_spec(&assay, Status::Fail, "Assay: 21 exceeds maximum 20.5")
                .with_cert(&Parameter::new("Acid Strength", "21", "% w/w")),
            ParameterComparison::not_in_cert(&iron),
        ];
        ComparisonResult {
            overall_status: OverallStatus::Fail,
            reason: "Assay: 21 exceeds maximum 20.5; Not in cert: Iron".into(),
            cert_type: CertificateType::Coa,
            product_name: "Acetic Acid 20%".into(),
            cert_product_name: "ACETIC ACID 20% 15L".into(),
            batch_number: "B2291".into(),
            product_match: true,
            alignment: Alignment::Fallback,
            compliance_statement: None,
            counts: Counts::tally(&details),
            details,
        }
    }

    #[test]
    fn card_has_headline_and_rows() {
        let card = render_result(&sample());
        assert!(card.starts_with("=== FAIL === COA Acetic Acid 20%"));
        assert!(card.contains("[FAIL]"));
        assert!(card.contains("spec: 19.5 – 20.5 %"));
        assert!(card.contains("cert: 21 % w/w"));
        assert!(card.contains("as: Acid Strength"));
        assert!(card.contains("[ -- ]"));
        assert!(card.contains("2 checked, 0 passed, 1 failed, 0 review, 1 not in cert"));
        assert!(!card.contains("compliance statement"));
    }

    #[test]
    fn shorten_is_char_safe() {
        assert_eq!(shorten("short", 10), "short");
        assert_eq!(shorten("Température élevée", 8), "Tempé...");
    }

    #[test]
    fn limits_text_variants() {
        let p = Parameter::new("Iron", "", "ppm").with_limits(None, Some("5"));
        let d = ParameterComparison::for_spec(&p, Status::Pass, "");
        assert_eq!(limits_text(&d), "≤ 5 ppm");
        let q = Parameter::new("Appearance", "Clear liquid", "");
        let d = ParameterComparison::for_spec(&q, Status::Pass, "");
        assert_eq!(limits_text(&d), "Clear liquid");
    }

    #[test]
    fn precheck_rendering() {
        let v = ProductMatch {
            mismatch: true,
            certain: true,
            rule: None,
            reason: "PRODUCT MISMATCH".into(),
        };
        assert!(render_precheck(&v).starts_with("MISMATCH"));
    }
}

//! Documents handed to the engine by the extraction step, and the records it returns.

use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// One measurable or observable property, as extracted.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Parameter {
    pub name: String,
    /// Raw value text ("99.8", "<0.5", "Conforms"). On a specification this is the
    /// expected value for qualitative requirements.
    #[serde(default)]
    pub value: String,
    #[serde(default)]
    pub unit: String,
    #[serde(default)]
    pub min_limit: Option<String>,
    #[serde(default)]
    pub max_limit: Option<String>,
}

impl Parameter {
    pub fn new(name: impl Into<String>, value: impl Into<String>, unit: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            unit: unit.into(),
            min_limit: None,
            max_limit: None,
        }
    }

    pub fn with_limits(mut self, min: Option<&str>, max: Option<&str>) -> Self {
        self.min_limit = min.map(str::to_string);
        self.max_limit = max.map(str::to_string);
        self
    }

    /// Minimum limit text, treating blank strings as absent.
    pub fn min(&self) -> Option<&str> {
        non_blank(self.min_limit.as_deref())
    }

    /// Maximum limit text, treating blank strings as absent.
    pub fn max(&self) -> Option<&str> {
        non_blank(self.max_limit.as_deref())
    }
}

fn non_blank(s: Option<&str>) -> Option<&str> {
    s.map(str::trim).filter(|s| !s.is_empty())
}

/// Internal product specification: acceptable ranges per parameter.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Specification {
    #[serde(default)]
    pub product_name: String,
    #[serde(default)]
    pub material_number: String,
    #[serde(default)]
    pub parameters: Vec<Parameter>,
}

/// Supplier certificate (COA, COCA or COC).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Certificate {
    #[serde(default)]
    pub product_name: String,
    #[serde(default)]
    pub batch_number: String,
    #[serde(default)]
    pub compliance_statement: Option<String>,
    #[serde(default)]
    pub parameters: Vec<Parameter>,
}

impl Certificate {
    /// Compliance statement text, treating blank strings as absent.
    pub fn compliance(&self) -> Option<&str> {
        non_blank(self.compliance_statement.as_deref())
    }
}

/// Check the invariants the engine relies on before any comparison runs.
///
/// Parameter names must be non-blank in both documents and unique
/// (case-insensitively) within the specification.
pub fn validate(spec: &Specification, cert: &Certificate) -> Result<(), ValidationError> {
    let mut seen = HashSet::new();
    for (index, p) in spec.parameters.iter().enumerate() {
        let name = p.name.trim();
        if name.is_empty() {
            return Err(ValidationError::EmptyParameterName {
                document: "specification",
                index,
            });
        }
        if !seen.insert(name.to_lowercase()) {
            return Err(ValidationError::DuplicateParameter(name.to_string()));
        }
    }
    for (index, p) in cert.parameters.iter().enumerate() {
        if p.name.trim().is_empty() {
            return Err(ValidationError::EmptyParameterName {
                document: "certificate",
                index,
            });
        }
    }
    Ok(())
}

/// Certificate variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CertificateType {
    /// Certificate of Analysis: measured values only.
    #[serde(rename = "COA")]
    Coa,
    /// Certificate of Compliance with Analysis: statement plus test data.
    #[serde(rename = "COCA")]
    Coca,
    /// Certificate of Conformance: statement, sometimes ranges instead of results.
    #[serde(rename = "COC")]
    Coc,
}

impl CertificateType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Coa => "COA",
            Self::Coca => "COCA",
            Self::Coc => "COC",
        }
    }

    /// Whether this variant carries a compliance statement.
    pub fn has_compliance_statement(&self) -> bool {
        matches!(self, Self::Coca | Self::Coc)
    }
}

impl fmt::Display for CertificateType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CertificateType {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "COA" => Ok(Self::Coa),
            "COCA" => Ok(Self::Coca),
            "COC" => Ok(Self::Coc),
            _ => Err(ValidationError::UnknownCertificateType(s.to_string())),
        }
    }
}

/// Verdict for one specification parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Status {
    Pass,
    Fail,
    Review,
    NotInCert,
}

impl Status {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pass => "PASS",
            Self::Fail => "FAIL",
            Self::Review => "REVIEW",
            Self::NotInCert => "NOT_IN_CERT",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Verdict for a whole certificate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OverallStatus {
    Pass,
    Fail,
    Review,
}

impl OverallStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pass => "PASS",
            Self::Fail => "FAIL",
            Self::Review => "REVIEW",
        }
    }
}

impl fmt::Display for OverallStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which path produced the parameter verdicts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Alignment {
    /// External semantic alignment oracle.
    Oracle,
    /// Deterministic name matcher.
    Fallback,
    /// No parameter-level comparison was performed.
    None,
}

/// Comparison of one specification parameter against its certificate counterpart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterComparison {
    #[serde(rename = "parameter")]
    pub spec_parameter: String,
    /// Aligned certificate parameter name; empty when `NOT_IN_CERT`.
    pub cert_parameter: String,
    pub spec_value: String,
    pub spec_min: String,
    pub spec_max: String,
    pub spec_unit: String,
    pub cert_value: String,
    pub cert_unit: String,
    pub status: Status,
    pub reason: String,
}

impl ParameterComparison {
    /// A row carrying the specification side only, with the given verdict.
    pub fn for_spec(spec: &Parameter, status: Status, reason: impl Into<String>) -> Self {
        Self {
            spec_parameter: spec.name.trim().to_string(),
            cert_parameter: String::new(),
            spec_value: spec.value.clone(),
            spec_min: spec.min().unwrap_or_default().to_string(),
            spec_max: spec.max().unwrap_or_default().to_string(),
            spec_unit: spec.unit.clone(),
            cert_value: String::new(),
            cert_unit: String::new(),
            status,
            reason: reason.into(),
        }
    }

    /// `NOT_IN_CERT` row for a specification parameter with no counterpart.
    pub fn not_in_cert(spec: &Parameter) -> Self {
        Self::for_spec(
            spec,
            Status::NotInCert,
            format!("Not found in certificate: {}", spec.name.trim()),
        )
    }

    /// Attach the certificate side of the pair.
    pub fn with_cert(mut self, cert: &Parameter) -> Self {
        self.cert_parameter = cert.name.trim().to_string();
        self.cert_value = cert.value.clone();
        self.cert_unit = cert.unit.clone();
        self
    }
}

/// Per-status tallies over a result's details.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Counts {
    #[serde(rename = "parameters_checked")]
    pub checked: usize,
    #[serde(rename = "parameters_passed")]
    pub passed: usize,
    #[serde(rename = "parameters_failed")]
    pub failed: usize,
    #[serde(rename = "parameters_review")]
    pub review: usize,
    #[serde(rename = "parameters_not_in_cert")]
    pub not_in_cert: usize,
}

impl Counts {
    pub fn tally(details: &[ParameterComparison]) -> Self {
        let mut counts = Self {
            checked: details.len(),
            ..Self::default()
        };
        for d in details {
            match d.status {
                Status::Pass => counts.passed += 1,
                Status::Fail => counts.failed += 1,
                Status::Review => counts.review += 1,
                Status::NotInCert => counts.not_in_cert += 1,
            }
        }
        counts
    }
}

/// Outcome of one specification/certificate comparison.
///
/// Built once per call and never mutated afterwards; serialises to the stable
/// record consumed by audit logging and the dashboard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonResult {
    #[serde(rename = "status")]
    pub overall_status: OverallStatus,
    pub reason: String,
    pub cert_type: CertificateType,
    pub product_name: String,
    pub cert_product_name: String,
    pub batch_number: String,
    pub product_match: bool,
    pub alignment: Alignment,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compliance_statement: Option<String>,
    #[serde(flatten)]
    pub counts: Counts,
    pub details: Vec<ParameterComparison>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec_with(names: &[&str]) -> Specification {
        Specification {
            product_name: "Acetic Acid 20%".into(),
            material_number: "100234".into(),
            parameters: names.iter().map(|n| Parameter::new(*n, "", "")).collect(),
        }
    }

    #[test]
    fn parameter_json_with_blank_limits() {
        let json = r#"{ "name": "Assay", "value": "", "unit": "%", "min_limit": "19.5", "max_limit": "" }"#;
        let p: Parameter = serde_json::from_str(json).unwrap();
        assert_eq!(p.min(), Some("19.5"));
        assert_eq!(p.max(), None);
    }

    #[test]
    fn parameter_json_minimal() {
        let p: Parameter = serde_json::from_str(r#"{ "name": "Appearance" }"#).unwrap();
        assert_eq!(p.value, "");
        assert!(p.min_limit.is_none());
    }

    #[test]
    fn validate_accepts_unique_names() {
        let spec = spec_with(&["Assay", "Colour", "Iron"]);
        assert!(validate(&spec, &Certificate::default()).is_ok());
    }

    #[test]
    fn validate_rejects_duplicates_case_insensitively() {
        let spec = spec_with(&["Assay", "Colour", "ASSAY "]);
        assert_eq!(
            validate(&spec, &Certificate::default()),
            Err(ValidationError::DuplicateParameter("ASSAY".into()))
        );
    }

    #[test]
    fn validate_rejects_blank_names() {
        let spec = spec_with(&["Assay", "  "]);
        assert_eq!(
            validate(&spec, &Certificate::default()),
            Err(ValidationError::EmptyParameterName {
                document: "specification",
                index: 1
            })
        );

        let cert = Certificate {
            parameters: vec![Parameter::new("", "1", "")],
            ..Certificate::default()
        };
        assert!(matches!(
            validate(&spec_with(&["Assay"]), &cert),
            Err(ValidationError::EmptyParameterName {
                document: "certificate",
                ..
            })
        ));
    }

    #[test]
    fn certificate_duplicates_allowed() {
        let cert = Certificate {
            parameters: vec![Parameter::new("Iron", "1", ""), Parameter::new("Iron", "2", "")],
            ..Certificate::default()
        };
        assert!(validate(&spec_with(&["Iron"]), &cert).is_ok());
    }

    #[test]
    fn certificate_type_parse() {
        assert_eq!("coa".parse::<CertificateType>(), Ok(CertificateType::Coa));
        assert_eq!(" COCA ".parse::<CertificateType>(), Ok(CertificateType::Coca));
        assert_eq!("COC".parse::<CertificateType>(), Ok(CertificateType::Coc));
        assert!(matches!(
            "invoice".parse::<CertificateType>(),
            Err(ValidationError::UnknownCertificateType(_))
        ));
    }

    #[test]
    fn status_serialises_screaming_snake() {
        assert_eq!(serde_json::to_string(&Status::NotInCert).unwrap(), "\"NOT_IN_CERT\"");
        let s: Status = serde_json::from_str("\"REVIEW\"").unwrap();
        assert_eq!(s, Status::Review);
        assert!(serde_json::from_str::<Status>("\"MISSING\"").is_err());
    }

    #[test]
    fn counts_tally_sums_to_checked() {
        let p = Parameter::new("Assay", "", "");
        let details = vec![
            ParameterComparison::for_spec(&p, Status::Pass, ""),
            ParameterComparison::for_spec(&p, Status::Fail, ""),
            ParameterComparison::for_spec(&p, Status::Review, ""),
            ParameterComparison::not_in_cert(&p),
            ParameterComparison::for_spec(&p, Status::Pass, ""),
        ];
        let c = Counts::tally(&details);
        assert_eq!(c.checked, 5);
        assert_eq!(c.passed, 2);
        assert_eq!(c.checked, c.passed + c.failed + c.review + c.not_in_cert);
    }

    #[test]
    fn result_json_has_stable_field_names() {
        let p = Parameter::new("Assay", "", "%").with_limits(Some("19.5"), Some("20.5"));
        let details = vec![
            ParameterComparison::for_spec(&p, Status::Pass, "within limits")
                .with_cert(&Parameter::new("Acid Strength", "20.1", "% w/w")),
        ];
        let result = ComparisonResult {
            overall_status: OverallStatus::Pass,
            reason: "All parameters within specification".into(),
            cert_type: CertificateType::Coa,
            product_name: "Acetic Acid 20%".into(),
            cert_product_name: "ACETIC ACID 20%".into(),
            batch_number: "B123".into(),
            product_match: true,
            alignment: Alignment::Oracle,
            compliance_statement: None,
            counts: Counts::tally(&details),
            details,
        };
        let v = serde_json::to_value(&result).unwrap();
        for key in [
            "status",
            "reason",
            "cert_type",
            "product_name",
            "batch_number",
            "parameters_checked",
            "parameters_passed",
            "parameters_failed",
            "parameters_review",
            "parameters_not_in_cert",
            "details",
        ] {
            assert!(v.get(key).is_some(), "missing {key}");
        }
        assert!(v.get("compliance_statement").is_none());
        assert_eq!(v["cert_type"], "COA");
        let d = &v["details"][0];
        for key in [
            "parameter",
            "cert_parameter",
            "spec_min",
            "spec_max",
            "cert_value",
            "status",
            "reason",
        ] {
            assert!(d.get(key).is_some(), "missing detail {key}");
        }
        assert_eq!(d["parameter"], "Assay");
        assert_eq!(d["cert_parameter"], "Acid Strength");
    }
}

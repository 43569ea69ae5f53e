//! Contract with the external semantic alignment oracle.
//!
//! The engine never aligns renamed chemical parameters itself. It hands both
//! documents to an [`AlignmentOracle`], checks the shape of what comes back, and
//! falls back to [`fallback_align`](crate::fallback::fallback_align) on any
//! [`OracleError`].

use std::collections::HashMap;

use async_trait::async_trait;
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::OracleError;
use crate::model::{Certificate, CertificateType, ParameterComparison, Specification, Status};
use crate::units::normalize_name;

/// Pluggable semantic alignment capability.
///
/// Implementations own their transport, retries and timeouts; the engine only
/// distinguishes an answer from an error.
#[async_trait]
pub trait AlignmentOracle: Send + Sync {
    async fn align(
        &self,
        specification: &Specification,
        certificate: &Certificate,
        certificate_type: CertificateType,
    ) -> Result<OracleResponse, OracleError>;
}

/// Oracle answer. `product_match`, `parameters` and every row's
/// `spec_parameter`/`status` are required; everything else defaults to empty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OracleResponse {
    pub product_match: bool,
    #[serde(default, deserialize_with = "lenient_text")]
    pub product_match_reason: String,
    #[serde(default)]
    pub compliance_statement_present: bool,
    #[serde(default, deserialize_with = "lenient_text")]
    pub compliance_statement: String,
    pub parameters: Vec<OracleParameter>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OracleParameter {
    pub spec_parameter: String,
    #[serde(default, deserialize_with = "lenient_text")]
    pub cert_parameter: String,
    #[serde(default, deserialize_with = "lenient_text")]
    pub cert_value: String,
    #[serde(default, deserialize_with = "lenient_text")]
    pub cert_unit: String,
    pub status: Status,
    #[serde(default, deserialize_with = "lenient_text")]
    pub reason: String,
}

/// Accept a string, a bare number or null where text is expected.
///
/// Models routinely emit `"cert_value": 20.1` or `null`.
fn lenient_text<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Text {
        Str(String),
        Num(f64),
        Bool(bool),
    }

    Ok(match Option::<Text>::deserialize(d)? {
        None => String::new(),
        Some(Text::Str(s)) => s,
        Some(Text::Num(n)) => n.to_string(),
        Some(Text::Bool(b)) => b.to_string(),
    })
}

impl OracleResponse {
    /// Parse a raw oracle reply, tolerating a surrounding markdown code fence.
    pub fn from_json(text: &str) -> Result<Self, OracleError> {
        let body = strip_fence(text.trim());
        serde_json::from_str(body).map_err(|e| OracleError::Malformed(e.to_string()))
    }

    /// Map the oracle's rows onto the specification.
    ///
    /// Rows are matched to specification parameters by exact name, then by
    /// normalised name, and returned in specification order. Rows naming
    /// nothing in the specification are dropped. A specification parameter
    /// with no row makes the whole response unusable.
    pub fn reconcile(
        &self,
        spec: &Specification,
    ) -> Result<Vec<ParameterComparison>, OracleError> {
        let mut exact = HashMap::new();
        let mut normalized = HashMap::new();
        for row in &self.parameters {
            exact.entry(row.spec_parameter.trim()).or_insert(row);
            normalized
                .entry(normalize_name(&row.spec_parameter))
                .or_insert(row);
        }

        spec.parameters
            .iter()
            .map(|sp| {
                let row = exact
                    .get(sp.name.trim())
                    .or_else(|| normalized.get(&normalize_name(&sp.name)))
                    .ok_or_else(|| OracleError::Incomplete(sp.name.trim().to_string()))?;

                if row.status == Status::NotInCert {
                    let mut missing = ParameterComparison::not_in_cert(sp);
                    if !row.reason.trim().is_empty() {
                        missing.reason = row.reason.clone();
                    }
                    return Ok(missing);
                }

                let reason = if row.reason.trim().is_empty() {
                    format!("{} reported by alignment", row.status)
                } else {
                    row.reason.clone()
                };
                let mut cmp = ParameterComparison::for_spec(sp, row.status, reason);
                cmp.cert_parameter = row.cert_parameter.trim().to_string();
                cmp.cert_value = row.cert_value.clone();
                cmp.cert_unit = row.cert_unit.clone();
                Ok(cmp)
            })
            .collect()
    }
}

fn strip_fence(text: &str) -> &str {
    let Some(rest) = text.strip_prefix("```") else {
        return text;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    rest.strip_suffix("```").unwrap_or(rest).trim()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Parameter;

    fn spec() -> Specification {
        Specification {
            product_name: "Acetic Acid 20%".into(),
            material_number: "100234".into(),
            parameters: vec![
                Parameter::new("Strength (as Acetic Acid)", "", "%")
                    .with_limits(Some("19.5"), Some("20.5")),
                Parameter::new("Appearance", "Clear liquid", ""),
                Parameter::new("Foreign Matter", "Nil", ""),
            ],
        }
    }

    const REPLY: &str = r#"{
        "product_match": true,
        "product_match_reason": "Same chemical and concentration",
        "compliance_statement_present": false,
        "compliance_statement": null,
        "parameters": [
            { "spec_parameter": "Foreign Matter", "cert_parameter": "", "status": "NOT_IN_CERT", "reason": "" },
            { "spec_parameter": "appearance", "cert_parameter": "Appearance & Odour",
              "cert_value": "Conforms", "status": "PASS", "reason": "Conforms" },
            { "spec_parameter": "Strength (as Acetic Acid)", "cert_parameter": "Acid Strength",
              "cert_value": 20.1, "cert_unit": "% w/w", "status": "PASS", "reason": "20.1 within 19.5-20.5" },
            { "spec_parameter": "Odour", "cert_parameter": "Odour", "cert_value": "Pungent", "status": "PASS" }
        ]
    }"#;

    #[test]
    fn parses_lenient_fields() {
        let r = OracleResponse::from_json(REPLY).unwrap();
        assert!(r.product_match);
        assert_eq!(r.compliance_statement, "");
        assert_eq!(r.parameters[2].cert_value, "20.1");
        assert_eq!(r.parameters[3].reason, "");
    }

    #[test]
    fn strips_code_fence() {
        let fenced = format!("```json\n{REPLY}\n```");
        assert!(OracleResponse::from_json(&fenced).is_ok());
    }

    #[test]
    fn rejects_unknown_status() {
        let bad = r#"{ "product_match": true, "parameters": [
            { "spec_parameter": "pH", "status": "MAYBE" } ] }"#;
        assert!(matches!(
            OracleResponse::from_json(bad),
            Err(OracleError::Malformed(_))
        ));
    }

    #[test]
    fn rejects_missing_required_fields() {
        for bad in [
            r#"{ "parameters": [] }"#,
            r#"{ "product_match": true }"#,
            r#"{ "product_match": true, "parameters": [ { "status": "PASS" } ] }"#,
            "I could not compare these documents.",
        ] {
            assert!(
                matches!(OracleResponse::from_json(bad), Err(OracleError::Malformed(_))),
                "{bad}"
            );
        }
    }

    #[test]
    fn reconcile_follows_spec_order_and_drops_extras() {
        let rows = OracleResponse::from_json(REPLY).unwrap().reconcile(&spec()).unwrap();
        let names: Vec<_> = rows.iter().map(|r| r.spec_parameter.as_str()).collect();
        assert_eq!(names, ["Strength (as Acetic Acid)", "Appearance", "Foreign Matter"]);
        assert_eq!(rows[0].cert_parameter, "Acid Strength");
        assert_eq!(rows[0].spec_min, "19.5");
        assert_eq!(rows[1].status, Status::Pass);
        assert_eq!(rows[2].status, Status::NotInCert);
        assert_eq!(rows[2].reason, "Not found in certificate: Foreign Matter");
    }

    #[test]
    fn reconcile_rejects_omitted_parameter() {
        let partial = r#"{ "product_match": true, "parameters": [
            { "spec_parameter": "Appearance", "status": "PASS" } ] }"#;
        let err = OracleResponse::from_json(partial)
            .unwrap()
            .reconcile(&spec())
            .unwrap_err();
        assert!(matches!(err, OracleError::Incomplete(name) if name == "Strength (as Acetic Acid)"));
    }

    #[test]
    fn reconcile_rejects_empty_rows() {
        let empty = OracleResponse::from_json(r#"{ "product_match": true, "parameters": [] }"#)
            .unwrap();
        assert!(empty.reconcile(&spec()).is_err());
        assert!(empty.reconcile(&Specification::default()).unwrap().is_empty());
    }
}

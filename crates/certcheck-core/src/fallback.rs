//! Deterministic name-based alignment, used whenever the oracle is unavailable.

use std::collections::HashMap;

use tracing::debug;

use crate::config::EngineConfig;
use crate::model::{Certificate, ParameterComparison, Specification};
use crate::rule::evaluate;
use crate::tables::Tables;
use crate::units::normalize_name;

/// Pair parameters by exact name, then by normalised name, and judge each pair.
///
/// Output has one row per specification parameter in specification order. When
/// several certificate parameters share a normalised name the first one wins;
/// unmatched specification parameters are `NOT_IN_CERT`.
pub fn fallback_align(
    spec: &Specification,
    cert: &Certificate,
    tables: &Tables,
    config: &EngineConfig,
) -> Vec<ParameterComparison> {
    let mut exact = HashMap::new();
    let mut normalized = HashMap::new();
    for p in &cert.parameters {
        exact.entry(p.name.trim()).or_insert(p);
        normalized.entry(normalize_name(&p.name)).or_insert(p);
    }

    spec.parameters
        .iter()
        .map(|sp| {
            let found = exact
                .get(sp.name.trim())
                .or_else(|| normalized.get(&normalize_name(&sp.name)));
            match found {
                Some(cp) => {
                    let verdict = evaluate(sp, cp, tables, config);
                    debug!(
                        parameter = %sp.name.trim(),
                        status = %verdict.status,
                        "fallback match"
                    );
                    ParameterComparison::for_spec(sp, verdict.status, verdict.reason).with_cert(cp)
                }
                None => ParameterComparison::not_in_cert(sp),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Parameter, Status};

    fn align(spec: &Specification, cert: &Certificate) -> Vec<ParameterComparison> {
        fallback_align(spec, cert, &Tables::builtin(), &EngineConfig::default())
    }

    #[test]
    fn matches_by_normalised_name_in_spec_order() {
        let spec = Specification {
            product_name: "Acetic Acid 20%".into(),
            parameters: vec![
                Parameter::new("Assay", "", "%").with_limits(Some("19.5"), Some("20.5")),
                Parameter::new("Iron (Fe)", "", "ppm").with_limits(None, Some("5")),
                Parameter::new("Colour", "", "Hazen").with_limits(None, Some("10")),
            ],
            ..Specification::default()
        };
        let cert = Certificate {
            parameters: vec![
                Parameter::new("IRON FE", "2", "mg/kg"),
                Parameter::new("Assay", "21.0", "%"),
                Parameter::new("Odour", "Pungent", ""),
            ],
            ..Certificate::default()
        };

        let rows = align(&spec, &cert);
        let names: Vec<_> = rows.iter().map(|r| r.spec_parameter.as_str()).collect();
        assert_eq!(names, ["Assay", "Iron (Fe)", "Colour"]);
        assert_eq!(rows[0].status, Status::Fail);
        assert_eq!(rows[1].status, Status::Pass);
        assert_eq!(rows[1].cert_parameter, "IRON FE");
        assert_eq!(rows[2].status, Status::NotInCert);
        assert_eq!(rows[2].cert_parameter, "");
    }

    #[test]
    fn first_normalised_duplicate_wins() {
        let spec = Specification {
            parameters: vec![Parameter::new("pH", "", "").with_limits(Some("6"), Some("8"))],
            ..Specification::default()
        };
        let cert = Certificate {
            parameters: vec![Parameter::new("P.H.", "7", ""), Parameter::new("ph", "12", "")],
            ..Certificate::default()
        };
        let rows = align(&spec, &cert);
        assert_eq!(rows[0].cert_value, "7");
        assert_eq!(rows[0].status, Status::Pass);
    }

    #[test]
    fn exact_name_beats_normalised() {
        let spec = Specification {
            parameters: vec![Parameter::new("pH", "", "").with_limits(Some("6"), Some("8"))],
            ..Specification::default()
        };
        let cert = Certificate {
            parameters: vec![Parameter::new("P.H.", "12", ""), Parameter::new("pH", "7", "")],
            ..Certificate::default()
        };
        assert_eq!(align(&spec, &cert)[0].cert_value, "7");
    }

    #[test]
    fn empty_certificate_gives_all_missing() {
        let spec = Specification {
            parameters: vec![Parameter::new("Assay", "", ""), Parameter::new("pH", "", "")],
            ..Specification::default()
        };
        let rows = align(&spec, &Certificate::default());
        assert!(rows.iter().all(|r| r.status == Status::NotInCert));
    }
}

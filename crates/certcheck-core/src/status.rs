//! Overall status aggregation.
//!
//! `NOT_IN_CERT` rows never influence the overall status; they only show up in
//! the reason text.

use crate::model::{OverallStatus, ParameterComparison, Status};

/// Reason used when every matched parameter passed.
pub const ALL_WITHIN: &str = "All parameters within specification";

/// Reduce per-parameter verdicts to one status.
///
/// Precedence FAIL > REVIEW > PASS over matched rows; nothing matched is REVIEW.
pub fn aggregate(details: &[ParameterComparison]) -> OverallStatus {
    let matched = || details.iter().filter(|d| d.status != Status::NotInCert);
    if matched().any(|d| d.status == Status::Fail) {
        OverallStatus::Fail
    } else if matched().any(|d| d.status == Status::Review) {
        OverallStatus::Review
    } else if matched().any(|d| d.status == Status::Pass) {
        OverallStatus::Pass
    } else {
        OverallStatus::Review
    }
}

/// Human-readable summary: failure reasons, then review reasons, then the
/// parameters missing from the certificate.
pub fn overall_reason(details: &[ParameterComparison]) -> String {
    let reasons = |status: Status| {
        details
            .iter()
            .filter(move |d| d.status == status)
            .map(|d| d.reason.clone())
    };

    let mut parts: Vec<String> = reasons(Status::Fail).chain(reasons(Status::Review)).collect();
    let missing: Vec<&str> = details
        .iter()
        .filter(|d| d.status == Status::NotInCert)
        .map(|d| d.spec_parameter.as_str())
        .collect();
    if !missing.is_empty() {
        parts.push(format!("Not in cert: {}", missing.join(", ")));
    }

    if parts.is_empty() {
        if details.is_empty() {
            "No parameters to compare".to_string()
        } else {
            ALL_WITHIN.to_string()
        }
    } else {
        parts.join("; ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Parameter;

    fn rows(statuses: &[Status]) -> Vec<ParameterComparison> {
        statuses
            .iter()
            .enumerate()
            .map(|(i, s)| {
                let p = Parameter::new(format!("P{i}"), "", "");
                if *s == Status::NotInCert {
                    ParameterComparison::not_in_cert(&p)
                } else {
                    ParameterComparison::for_spec(&p, *s, format!("P{i} {s}"))
                }
            })
            .collect()
    }

    #[test]
    fn precedence() {
        use Status::*;
        assert_eq!(aggregate(&rows(&[Pass, Fail, Review])), OverallStatus::Fail);
        assert_eq!(aggregate(&rows(&[Pass, Review, Pass])), OverallStatus::Review);
        assert_eq!(aggregate(&rows(&[Pass, Pass])), OverallStatus::Pass);
    }

    #[test]
    fn missing_parameters_do_not_fail() {
        use Status::*;
        assert_eq!(aggregate(&rows(&[Pass, NotInCert, NotInCert])), OverallStatus::Pass);
        assert_eq!(aggregate(&rows(&[NotInCert, NotInCert])), OverallStatus::Review);
        assert_eq!(aggregate(&[]), OverallStatus::Review);
    }

    #[test]
    fn reason_orders_fail_review_missing() {
        use Status::*;
        let reason = overall_reason(&rows(&[Review, NotInCert, Fail, Pass]));
        assert_eq!(reason, "P2 FAIL; P0 REVIEW; Not in cert: P1");
    }

    #[test]
    fn reason_when_everything_passes() {
        assert_eq!(overall_reason(&rows(&[Status::Pass])), ALL_WITHIN);
        assert_eq!(overall_reason(&[]), "No parameters to compare");
    }
}

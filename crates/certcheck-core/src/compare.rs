//! The comparison orchestrator.
//!
//! One call runs one specification/certificate pair start to finish:
//! validation, product pre-check, oracle alignment (or the fallback matcher),
//! then aggregation. The only await point is the oracle call.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::config::EngineConfig;
use crate::error::{OracleError, ValidationError};
use crate::fallback::fallback_align;
use crate::model::{
    Alignment, Certificate, CertificateType, ComparisonResult, Counts, OverallStatus,
    ParameterComparison, Specification, validate,
};
use crate::oracle::{AlignmentOracle, OracleResponse};
use crate::product_match::check_product_match;
use crate::status::{aggregate, overall_reason};
use crate::tables::Tables;

/// Compares certificates against specifications.
///
/// Holds only read-only state, so one instance may serve concurrent calls.
#[derive(Clone)]
pub struct Comparator {
    tables: Arc<Tables>,
    config: EngineConfig,
    oracle: Option<Arc<dyn AlignmentOracle>>,
}

impl Default for Comparator {
    fn default() -> Self {
        Self::new()
    }
}

impl Comparator {
    /// Built-in tables, default thresholds, no oracle (fallback matcher only).
    pub fn new() -> Self {
        Self {
            tables: Tables::builtin(),
            config: EngineConfig::default(),
            oracle: None,
        }
    }

    pub fn with_tables(mut self, tables: Arc<Tables>) -> Self {
        self.tables = tables;
        self
    }

    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_oracle(mut self, oracle: Arc<dyn AlignmentOracle>) -> Self {
        self.oracle = Some(oracle);
        self
    }

    pub fn tables(&self) -> &Tables {
        &self.tables
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Compare one certificate against one specification.
    ///
    /// Returns a complete result or a [`ValidationError`]; oracle problems are
    /// absorbed by the fallback matcher and never surface here.
    pub async fn compare(
        &self,
        spec: &Specification,
        cert: &Certificate,
        cert_type: CertificateType,
    ) -> Result<ComparisonResult, ValidationError> {
        validate(spec, cert)?;
        info!(
            product = %spec.product_name,
            cert_product = %cert.product_name,
            cert_type = %cert_type,
            spec_parameters = spec.parameters.len(),
            cert_parameters = cert.parameters.len(),
            "comparing certificate"
        );

        let outcome = Outcome::new(spec, cert, cert_type);

        let pre = check_product_match(
            &spec.product_name,
            &cert.product_name,
            &self.tables,
            &self.config,
        );
        if pre.mismatch && pre.certain {
            warn!(reason = %pre.reason, "product pre-check mismatch");
            return Ok(outcome.mismatch(pre.reason));
        }
        debug!(rule = ?pre.rule, reason = %pre.reason, "product pre-check passed");

        if spec.parameters.is_empty() {
            return Ok(outcome.finish(
                OverallStatus::Review,
                "No parameters found in specification".to_string(),
                Alignment::None,
                Vec::new(),
            ));
        }

        if cert.parameters.is_empty() {
            let details: Vec<_> = spec
                .parameters
                .iter()
                .map(ParameterComparison::not_in_cert)
                .collect();
            let (status, reason) = if outcome.compliance.is_some() {
                (
                    OverallStatus::Pass,
                    "Compliance statement present (no test data to compare)",
                )
            } else {
                (OverallStatus::Review, "No parameters found in certificate")
            };
            return Ok(outcome.finish(status, reason.to_string(), Alignment::None, details));
        }

        let (details, alignment, outcome) = match self.consult(spec, cert, cert_type).await {
            Ok(response) if !response.product_match => {
                let reason = if response.product_match_reason.trim().is_empty() {
                    format!(
                        "PRODUCT MISMATCH: specification is for '{}' but certificate is for '{}'",
                        spec.product_name.trim(),
                        cert.product_name.trim()
                    )
                } else {
                    response.product_match_reason
                };
                warn!(reason = %reason, "oracle reports product mismatch");
                return Ok(outcome.mismatch(reason));
            }
            Ok(response) => match response.reconcile(spec) {
                Ok(details) => {
                    info!(rows = details.len(), "oracle alignment accepted");
                    let outcome = outcome.with_oracle_statement(&response);
                    (details, Alignment::Oracle, outcome)
                }
                Err(e) => {
                    warn!(error = %e, "oracle response unusable, using fallback matcher");
                    (self.fallback(spec, cert), Alignment::Fallback, outcome)
                }
            },
            Err(e) => {
                warn!(error = %e, "oracle unavailable, using fallback matcher");
                (self.fallback(spec, cert), Alignment::Fallback, outcome)
            }
        };

        let status = aggregate(&details);
        let reason = overall_reason(&details);
        Ok(outcome.finish(status, reason, alignment, details))
    }

    async fn consult(
        &self,
        spec: &Specification,
        cert: &Certificate,
        cert_type: CertificateType,
    ) -> Result<OracleResponse, OracleError> {
        let Some(oracle) = &self.oracle else {
            return Err(OracleError::Transport("no oracle configured".to_string()));
        };
        let limit = self.config.oracle_timeout();
        tokio::time::timeout(limit, oracle.align(spec, cert, cert_type))
            .await
            .map_err(|_| OracleError::Timeout(limit))?
    }

    fn fallback(&self, spec: &Specification, cert: &Certificate) -> Vec<ParameterComparison> {
        fallback_align(spec, cert, &self.tables, &self.config)
    }
}

/// Document-level fields shared by every exit path of `compare`.
struct Outcome {
    cert_type: CertificateType,
    product_name: String,
    cert_product_name: String,
    batch_number: String,
    compliance: Option<String>,
}

impl Outcome {
    fn new(spec: &Specification, cert: &Certificate, cert_type: CertificateType) -> Self {
        Self {
            cert_type,
            product_name: spec.product_name.clone(),
            cert_product_name: cert.product_name.clone(),
            batch_number: cert.batch_number.clone(),
            compliance: cert_type
                .has_compliance_statement()
                .then(|| cert.compliance().map(str::to_string))
                .flatten(),
        }
    }

    /// Prefer the statement the oracle found over the extracted one.
    fn with_oracle_statement(mut self, response: &OracleResponse) -> Self {
        let found = response.compliance_statement.trim();
        if self.cert_type.has_compliance_statement() && !found.is_empty() {
            self.compliance = Some(found.to_string());
        }
        self
    }

    fn mismatch(self, reason: String) -> ComparisonResult {
        let mut result = self.finish(OverallStatus::Fail, reason, Alignment::None, Vec::new());
        result.product_match = false;
        result
    }

    fn finish(
        self,
        status: OverallStatus,
        reason: String,
        alignment: Alignment,
        details: Vec<ParameterComparison>,
    ) -> ComparisonResult {
        info!(
            status = %status,
            alignment = ?alignment,
            parameters = details.len(),
            "comparison complete"
        );
        ComparisonResult {
            overall_status: status,
            reason,
            cert_type: self.cert_type,
            product_name: self.product_name,
            cert_product_name: self.cert_product_name,
            batch_number: self.batch_number,
            product_match: true,
            alignment,
            compliance_statement: self.compliance,
            counts: Counts::tally(&details),
            details,
        }
    }
}

//! Prompt templates for certificate alignment.

use certcheck_core::{Certificate, CertificateType, Specification};
use serde_json::json;

pub const SYSTEM_PROMPT: &str = "\
You are a chemical quality-assurance analyst. You compare a supplier certificate against an \
internal product specification.

Steps:
1. Decide whether both documents describe the same product.
2. For every specification parameter, find the certificate parameter that measures the same \
property. Names differ between documents; use chemistry knowledge to align them.
3. Judge each certificate value against the specification limits.

Product identity: be generous. Suppliers abbreviate, reorder words and append pack sizes, \
codes and grades. \"Aluminium Sulphate Liquid\" and \"LIQUID ALUM NON RETURNABLE IBC\" are the \
same product, as are \"Sodium Hydroxide 46%\" and \"CAUSTIC SODA 46% LIQ\". Set product_match \
to false only for fundamentally different chemicals.

Parameter names: \"Strength (as Acetic Acid)\", \"Acid Strength (%w/w Acetic)\" and \"Assay\" \
are the same property. So are \"Specific Gravity (20/4)\", \"SG (20°C)\" and \"Density\". \
\"Aluminium content as Al2O3\" and \"Al2O3\" are the same property.

Units: %w/w, % and wt% are equal. mg/kg, ppm and mg/L (aqueous) are equal. Specific gravity \
is numerically equal to density in g/cm³. Convert before comparing.

Temperatures: \"SG (20/4)\" means measured at 20°C against water at 4°C, the same as SG at \
20°C. Only a gap of more than 2°C between measurement temperatures is a different condition.

Statuses:
- PASS: value inside the limits, a qualitative result equal to the requirement, a bare \
conformance statement (\"Conforms\", \"Complies with spec\", \"Pass\"), or ND/BDL for a \
parameter with a maximum limit. A description that differs from the requirement is REVIEW.
- FAIL: value numerically outside the limits. Use only when arithmetic proves it.
- REVIEW: incompatible units, different measurement conditions, a range instead of a result, \
or an ambiguous statement.
- NOT_IN_CERT: no certificate parameter measures this property.

Every specification parameter must appear exactly once in the output, using its \
specification name in spec_parameter.

Respond ONLY with a JSON object, no markdown fences:
{
  \"product_match\": true,
  \"product_match_reason\": \"why the products do or do not match\",
  \"compliance_statement_present\": false,
  \"compliance_statement\": \"declaration text, or empty\",
  \"parameters\": [
    {
      \"spec_parameter\": \"name from the specification\",
      \"cert_parameter\": \"matched certificate name, or empty\",
      \"cert_value\": \"certificate value, or empty\",
      \"cert_unit\": \"certificate unit, or empty\",
      \"status\": \"PASS | FAIL | REVIEW | NOT_IN_CERT\",
      \"reason\": \"short explanation\"
    }
  ]
}";

/// Certificate-type specific instructions appended to the user prompt.
pub fn guidance(cert_type: CertificateType) -> &'static str {
    match cert_type {
        CertificateType::Coa => {
            "This is a Certificate of Analysis (COA) with measured lab results. \
             Compare every specification parameter against the measured value."
        }
        CertificateType::Coca => {
            "This is a Certificate of Compliance with Analysis (COCA). It carries a compliance \
             declaration and test results. Treat the results like COA values and compare each \
             against the limits. Report whether a compliance statement is present and quote it."
        }
        CertificateType::Coc => {
            "This is a Certificate of Conformance (COC). It carries a compliance declaration and \
             may list specification ranges instead of results. For a range such as \
             \"7.90 - 8.20\": wholly inside the specification limits is PASS, partly outside is \
             REVIEW, wholly outside is FAIL. Report whether a compliance statement is present \
             and quote it."
        }
    }
}

/// Render both documents and the type guidance as the user message.
pub fn build_user_prompt(
    spec: &Specification,
    cert: &Certificate,
    cert_type: CertificateType,
) -> Result<String, serde_json::Error> {
    let spec_json = serde_json::to_string_pretty(&json!({
        "product_name": spec.product_name,
        "material_number": spec.material_number,
        "parameters": spec.parameters,
    }))?;

    let mut cert_doc = json!({
        "product_name": cert.product_name,
        "batch_number": cert.batch_number,
        "parameters": cert.parameters,
    });
    if cert_type.has_compliance_statement() {
        cert_doc["compliance_statement"] = json!(cert.compliance().unwrap_or_default());
    }
    let cert_json = serde_json::to_string_pretty(&cert_doc)?;

    Ok(format!(
        "SPECIFICATION:\n\
         {spec_json}\n\
         \n\
         CERTIFICATE ({cert_type}):\n\
         {cert_json}\n\
         \n\
         {guidance}",
        guidance = guidance(cert_type),
    ))
}

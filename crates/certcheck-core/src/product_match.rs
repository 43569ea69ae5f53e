//! Deterministic product-identity screen run before any oracle call.
//!
//! Four checks run in order and stop at the first overlap. Only when all four
//! find nothing is the pair declared a certain mismatch; any overlap passes the
//! pair on to semantic alignment, where identity is confirmed again. The screen
//! is lenient on purpose and only catches plainly different chemicals
//! ("Acetic Acid 20%" vs "Zinc Gluconate").

use std::collections::BTreeSet;
use std::fmt;

use serde::Serialize;

use crate::config::EngineConfig;
use crate::tables::Tables;
use crate::tokenize::{ProductTokens, expand, expand_closure};

/// Which check found the overlap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchRule {
    /// Alias-expanded word sets intersect.
    DirectOverlap,
    /// One word is a prefix of another ("alum" / "aluminium").
    PrefixOverlap,
    /// Concentration numbers agree and enough plain tokens are shared.
    ConcentrationOverlap,
    /// Word sets intersect after following alias chains to a fixed point.
    ClosureOverlap,
}

impl fmt::Display for MatchRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::DirectOverlap => "direct token overlap",
            Self::PrefixOverlap => "prefix overlap",
            Self::ConcentrationOverlap => "concentration overlap",
            Self::ClosureOverlap => "alias closure overlap",
        })
    }
}

/// Pre-check verdict.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProductMatch {
    pub mismatch: bool,
    /// True only for a mismatch established by all four checks.
    pub certain: bool,
    pub rule: Option<MatchRule>,
    pub reason: String,
}

impl ProductMatch {
    fn matched(rule: MatchRule, reason: String) -> Self {
        Self {
            mismatch: false,
            certain: false,
            rule: Some(rule),
            reason,
        }
    }

    fn unverifiable(reason: &str) -> Self {
        Self {
            mismatch: false,
            certain: false,
            rule: None,
            reason: reason.to_string(),
        }
    }
}

/// Decide whether specification and certificate name the same product.
pub fn check_product_match(
    spec_name: &str,
    cert_name: &str,
    tables: &Tables,
    config: &EngineConfig,
) -> ProductMatch {
    if spec_name.trim().is_empty() || cert_name.trim().is_empty() {
        return ProductMatch::unverifiable("Cannot verify: product name missing");
    }

    let spec = ProductTokens::parse(spec_name, tables);
    let cert = ProductTokens::parse(cert_name, tables);
    if spec.is_empty() || cert.is_empty() {
        return ProductMatch::unverifiable("Cannot verify: insufficient product information");
    }

    // 1. Direct overlap of alias-expanded words.
    let spec_expanded = expand(&spec.words, tables);
    let cert_expanded = expand(&cert.words, tables);
    let common = intersection(&spec_expanded, &cert_expanded);
    if !common.is_empty() {
        return ProductMatch::matched(
            MatchRule::DirectOverlap,
            format!("Token match: {}", preview(&common)),
        );
    }

    // 2. Truncated or abbreviated words.
    if let Some((a, b)) = prefix_pair(&spec.words, &cert.words, config.min_prefix_len) {
        return ProductMatch::matched(
            MatchRule::PrefixOverlap,
            format!("Prefix match: '{a}' ~ '{b}'"),
        );
    }

    // 3. Shared concentration with enough shared plain tokens.
    let numbers = intersection(&spec.numbers, &cert.numbers);
    if !numbers.is_empty() {
        let spec_plain = spec.plain();
        let cert_plain = cert.plain();
        let shared = intersection(&spec_plain, &cert_plain).len();
        let smaller = spec_plain.len().min(cert_plain.len()).max(1);
        let ratio = shared as f64 / smaller as f64;
        if ratio > config.concentration_overlap_ratio {
            return ProductMatch::matched(
                MatchRule::ConcentrationOverlap,
                format!("Concentration match: {} (overlap {ratio:.2})", preview(&numbers)),
            );
        }
    }

    // 4. Multi-hop alias expansion.
    let spec_closure = expand_closure(&spec.words, tables);
    let cert_closure = expand_closure(&cert.words, tables);
    let common = intersection(&spec_closure, &cert_closure);
    if !common.is_empty() {
        return ProductMatch::matched(
            MatchRule::ClosureOverlap,
            format!("Expanded word match: {}", preview(&common)),
        );
    }

    ProductMatch {
        mismatch: true,
        certain: true,
        rule: None,
        reason: format!(
            "PRODUCT MISMATCH: specification is for '{}' but certificate is for '{}'",
            spec_name.trim(),
            cert_name.trim()
        ),
    }
}

fn intersection(a: &BTreeSet<String>, b: &BTreeSet<String>) -> BTreeSet<String> {
    a.intersection(b).cloned().collect()
}

fn prefix_pair<'a>(
    a: &'a BTreeSet<String>,
    b: &'a BTreeSet<String>,
    min_len: usize,
) -> Option<(&'a str, &'a str)> {
    for x in a {
        for y in b {
            let (short, long) = if x.len() <= y.len() { (x, y) } else { (y, x) };
            if short.chars().count() >= min_len && long.starts_with(short.as_str()) {
                return Some((x, y));
            }
        }
    }
    None
}

fn preview(tokens: &BTreeSet<String>) -> String {
    tokens.iter().take(5).cloned().collect::<Vec<_>>().join(", ")
}

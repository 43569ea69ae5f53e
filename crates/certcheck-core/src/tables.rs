//! Static lookup tables: stop words, chemical aliases, unit spellings, conversion
//! factors and the vocabulary used to read qualitative certificate values.
//!
//! Tables are declarative data. The built-in set is compiled into the binary from
//! `tables/default.json` and parsed once on first use; an alternative file can be
//! loaded at startup with [`Tables::from_path`]. Nothing mutates a table after load.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use std::sync::{Arc, LazyLock};

use serde::Deserialize;
use tracing::info;

use crate::error::TableError;

const DEFAULT_TABLES: &str = include_str!("../tables/default.json");

static BUILTIN: LazyLock<Arc<Tables>> = LazyLock::new(|| {
    Arc::new(Tables::from_json(DEFAULT_TABLES).expect("built-in tables/default.json is valid"))
});

/// One directed conversion factor between two canonical units.
///
/// The inverse direction is derived, so each pair appears once.
#[derive(Debug, Clone, Deserialize)]
pub struct Conversion {
    pub from: String,
    pub to: String,
    pub factor: f64,
}

/// Read-only lookup tables shared by every comparison.
#[derive(Debug, Clone, Deserialize)]
pub struct Tables {
    /// Words dropped from product names before matching (packaging, grades, filler).
    #[serde(default)]
    pub stop_words: BTreeSet<String>,
    /// Many-to-one alias map: abbreviation or variant spelling → target token.
    #[serde(default)]
    pub aliases: BTreeMap<String, String>,
    /// Units that mark a number in a product name as a pack size ("15L", "190 kg").
    #[serde(default)]
    pub pack_units: BTreeSet<String>,
    /// Lower-cased unit spelling → canonical unit token.
    #[serde(default)]
    pub units: BTreeMap<String, String>,
    #[serde(default)]
    pub conversions: Vec<Conversion>,
    /// Lower-cased markers meaning "measured, nothing found".
    #[serde(default)]
    pub not_detected: BTreeSet<String>,
    /// Lower-cased markers meaning "no value applies".
    #[serde(default)]
    pub not_applicable: BTreeSet<String>,
    /// Words or phrases in a qualitative value that indicate conformance.
    #[serde(default)]
    pub conformance_terms: Vec<String>,
    /// Words allowed after a conformance term in a bare statement
    /// ("complies with spec", "conforms to bp").
    #[serde(default)]
    pub conformance_references: BTreeSet<String>,
    /// Words or phrases that turn a qualitative value ambiguous or negative.
    #[serde(default)]
    pub negation_terms: Vec<String>,
}

impl Tables {
    /// The built-in tables, parsed once per process.
    pub fn builtin() -> Arc<Tables> {
        Arc::clone(&BUILTIN)
    }

    /// Parse tables from a JSON document.
    pub fn from_json(json: &str) -> Result<Self, TableError> {
        let tables: Tables = serde_json::from_str(json)?;
        tables.check()?;
        Ok(tables)
    }

    /// Load tables from a JSON file on disk.
    pub fn from_path(path: &Path) -> Result<Self, TableError> {
        let json = std::fs::read_to_string(path).map_err(|source| TableError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let tables = Self::from_json(&json)?;
        info!(
            path = %path.display(),
            aliases = tables.aliases.len(),
            units = tables.units.len(),
            conversions = tables.conversions.len(),
            "loaded lookup tables"
        );
        Ok(tables)
    }

    /// Canonical token for a unit spelling, if the table knows it.
    pub fn canonical_unit(&self, lowered: &str) -> Option<&str> {
        self.units.get(lowered).map(String::as_str)
    }

    /// Multiplier converting a value in canonical unit `from` to canonical unit `to`.
    ///
    /// Looks for a direct entry first, then inverts a reverse entry.
    pub fn conversion_factor(&self, from: &str, to: &str) -> Option<f64> {
        if from == to {
            return Some(1.0);
        }
        self.conversions.iter().find_map(|c| {
            if c.from == from && c.to == to {
                Some(c.factor)
            } else if c.from == to && c.to == from {
                Some(1.0 / c.factor)
            } else {
                None
            }
        })
    }

    /// Every token that aliases *to* `target` (reverse lookup).
    pub fn aliases_of<'a>(&'a self, target: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.aliases
            .iter()
            .filter(move |(_, t)| t.as_str() == target)
            .map(|(alias, _)| alias.as_str())
    }

    fn check(&self) -> Result<(), TableError> {
        for c in &self.conversions {
            if !c.factor.is_finite() || c.factor == 0.0 {
                return Err(TableError::InvalidFactor {
                    from: c.from.clone(),
                    to: c.to.clone(),
                    factor: c.factor,
                });
            }
        }
        Ok(())
    }
}

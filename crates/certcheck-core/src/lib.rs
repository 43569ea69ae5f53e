//! Compliance comparison engine: checks a supplier certificate (COA, COCA or
//! COC) against an internal product specification.

pub mod compare;
pub mod config;
pub mod error;
pub mod fallback;
pub mod model;
pub mod oracle;
pub mod product_match;
pub mod rule;
pub mod status;
pub mod tables;
pub mod tokenize;
pub mod units;

pub use compare::Comparator;
pub use config::EngineConfig;
pub use error::{OracleError, TableError, UnitError, ValidationError};
pub use model::{
    Alignment, Certificate, CertificateType, ComparisonResult, Counts, OverallStatus, Parameter,
    ParameterComparison, Specification, Status,
};
pub use oracle::{AlignmentOracle, OracleParameter, OracleResponse};
pub use product_match::{MatchRule, ProductMatch, check_product_match};
pub use tables::Tables;
pub use units::{ParsedValue, Qualifier, convert, normalize_unit, parse_value};

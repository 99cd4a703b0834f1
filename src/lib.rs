//! # gaql
//!
//! Parse, validate, format and repair Google Ads Query Language queries.
//!
//! ## Quick Example
//!
//! ```
//! use gaql::prelude::*;
//!
//! let query = gaql::parse("SELECT campaign.id FROM campaign LIMIT 10").unwrap();
//! assert_eq!(query.resource, "campaign");
//! assert_eq!(query.limit, Some(10));
//!
//! let report = gaql::validate("SELECT campaign.id FROM campaing", false).unwrap();
//! assert!(!report.valid);
//!
//! let (fixed, changes) = gaql::fix_query("SELECT campaign.id FROM campaing");
//! assert_eq!(fixed, "SELECT campaign.id\nFROM campaign");
//! assert!(!changes.is_empty());
//! ```
//!
//! ## Pipeline
//!
//! | Stage      | Module        | Output                         |
//! |------------|---------------|--------------------------------|
//! | Parse      | [`parser`]    | [`ast::Query`] or syntax error |
//! | Validate   | [`validator`] | [`ValidationReport`]           |
//! | Repair     | [`fixer`]     | fixed text + change log        |
//! | Serialize  | [`builder`]   | single-line GAQL               |
//! | Layout     | [`fmt`]       | one clause per line            |

use std::sync::LazyLock;

pub mod ast;
pub mod builder;
pub mod clause;
pub mod config;
pub mod error;
pub mod fixer;
pub mod fmt;
pub mod matcher;
pub mod parser;
pub mod rules;
pub mod validator;

pub use error::{ErrorKind, GaqlError, GaqlResult};
pub use fmt::format_query;
pub use validator::ValidationReport;

pub mod prelude {
    pub use crate::ast::*;
    pub use crate::builder::QueryBuilder;
    pub use crate::config::Config;
    pub use crate::error::*;
    pub use crate::fixer::Fixer;
    pub use crate::fmt::{Formatter, format_query};
    pub use crate::rules::Rules;
    pub use crate::validator::{Issue, ValidationReport, Validator};
}

static FIXER: LazyLock<fixer::Fixer> = LazyLock::new(fixer::Fixer::new);

/// Parse GAQL text into a [`ast::Query`].
///
/// # Example
///
/// ```
/// use gaql::ast::Operator;
///
/// let query = gaql::parse("SELECT ad_group.id FROM ad_group WHERE ad_group.status = 'ENABLED'").unwrap();
/// assert_eq!(query.conditions[0].operator, Operator::Eq);
/// ```
pub fn parse(input: &str) -> GaqlResult<ast::Query> {
    parser::parse(input)
}

/// Validate GAQL text.
///
/// With `strict` the first problem is returned as a typed error instead of
/// being collected in the report.
pub fn validate(text: &str, strict: bool) -> GaqlResult<ValidationReport> {
    let validator = validator::Validator::new();
    if strict {
        validator.validate_strict(text)
    } else {
        Ok(validator.validate(text))
    }
}

/// Best-effort repair; see [`fixer::Fixer::fix_query`].
pub fn fix_query(text: &str) -> (String, Vec<String>) {
    FIXER.fix_query(text)
}

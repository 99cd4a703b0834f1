//! Semantic validator.
//!
//! Every check runs regardless of earlier failures and the issues are
//! accumulated. Each issue carries its [`ErrorKind`] from the point of
//! detection, so strict mode can raise the right error without inspecting
//! message text.

use std::fmt;

use serde::Serialize;

use crate::ast::{Operator, Query};
use crate::clause;
use crate::error::{ErrorKind, GaqlError, GaqlResult};
use crate::matcher::suggestion;
use crate::parser;
use crate::parser::transform::{missing_clauses, missing_clauses_message};
use crate::rules::{Rules, field_prefix};

/// A single validation problem.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Issue {
    pub kind: ErrorKind,
    pub message: String,
    pub position: Option<usize>,
}

impl Issue {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            position: None,
        }
    }

    pub fn into_error(self) -> GaqlError {
        GaqlError::of_kind(self.kind, self.message, self.position)
    }
}

impl From<GaqlError> for Issue {
    fn from(err: GaqlError) -> Self {
        Self {
            kind: err.kind(),
            position: err.position(),
            message: err.to_string(),
        }
    }
}

impl fmt::Display for Issue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

/// Outcome of validating one query.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidationReport {
    pub valid: bool,
    pub errors: Vec<String>,
    #[serde(skip)]
    pub issues: Vec<Issue>,
}

impl ValidationReport {
    fn from_issues(issues: Vec<Issue>) -> Self {
        let mut unique: Vec<Issue> = Vec::with_capacity(issues.len());
        for issue in issues {
            if !unique.iter().any(|u| u.message == issue.message) {
                unique.push(issue);
            }
        }
        Self {
            valid: unique.is_empty(),
            errors: unique.iter().map(|i| i.message.clone()).collect(),
            issues: unique,
        }
    }
}

/// Validates GAQL text or ASTs against a set of [`Rules`].
#[derive(Debug, Clone, Copy, Default)]
pub struct Validator {
    rules: Rules,
}

impl Validator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_rules(rules: Rules) -> Self {
        Self { rules }
    }

    pub fn rules(&self) -> &Rules {
        &self.rules
    }

    /// Validate query text, collecting every problem.
    pub fn validate(&self, text: &str) -> ValidationReport {
        let mut issues = Vec::new();

        let parsed = match parser::parse(text) {
            Ok(query) => Some(query),
            Err(err) => {
                issues.push(Issue::from(err));
                None
            }
        };

        let normalized = clause::normalize(text);
        issues.extend(
            clause::layout_problems(&normalized)
                .into_iter()
                .map(|p| Issue::new(ErrorKind::Syntax, p.to_string())),
        );

        if let Some(query) = &parsed {
            self.check_query(query, &mut issues);
        }

        tracing::debug!(issues = issues.len(), parsed = parsed.is_some(), "validated query text");
        ValidationReport::from_issues(issues)
    }

    /// Validate query text, failing with the first problem as a typed error.
    pub fn validate_strict(&self, text: &str) -> GaqlResult<ValidationReport> {
        let report = self.validate(text);
        match report.issues.first() {
            Some(issue) => Err(issue.clone().into_error()),
            None => Ok(report),
        }
    }

    /// Validate an AST supplied directly, re-checking required clauses.
    pub fn validate_query(&self, query: &Query) -> ValidationReport {
        let mut issues = Vec::new();
        self.check_query(query, &mut issues);
        ValidationReport::from_issues(issues)
    }

    fn check_query(&self, query: &Query, issues: &mut Vec<Issue>) {
        self.check_required(query, issues);
        self.check_resource(query, issues);
        for field in query.referenced_fields() {
            self.check_field(field, issues);
        }
        self.check_operators(query, issues);
        self.check_parameters(query, issues);
        self.check_limit(query, issues);
    }

    fn check_required(&self, query: &Query, issues: &mut Vec<Issue>) {
        if let Some(message) = missing_clauses_message(&missing_clauses(query)) {
            issues.push(Issue::new(ErrorKind::Syntax, message));
        }
    }

    fn check_resource(&self, query: &Query, issues: &mut Vec<Issue>) {
        let resource = query.resource.trim();
        if resource.is_empty() || self.rules.is_resource(resource) {
            return;
        }
        issues.push(Issue::new(
            ErrorKind::Resource,
            format!(
                "Invalid resource: '{}'.{}",
                resource,
                suggestion(resource, self.rules.resources)
            ),
        ));
    }

    fn check_field(&self, field: &str, issues: &mut Vec<Issue>) {
        let Some(prefix) = field_prefix(field) else {
            issues.push(Issue::new(
                ErrorKind::Field,
                format!(
                    "Invalid field: '{}'. Fields must be written as resource.field",
                    field
                ),
            ));
            return;
        };

        if field.split('.').any(str::is_empty) {
            issues.push(Issue::new(
                ErrorKind::Field,
                format!("Invalid field: '{}'. Empty path segment", field),
            ));
        } else if !self.rules.is_field_prefix(prefix) {
            issues.push(Issue::new(
                ErrorKind::Field,
                format!(
                    "Invalid field: '{}'. Unknown prefix '{}'.{}",
                    field,
                    prefix,
                    suggestion(prefix, self.rules.field_prefixes)
                ),
            ));
        }
    }

    fn check_operators(&self, query: &Query, issues: &mut Vec<Issue>) {
        for cond in &query.conditions {
            let field = cond.field.as_str();
            if cond.operator == Operator::During && !self.rules.is_date_field(field) {
                issues.push(Issue::new(
                    ErrorKind::Syntax,
                    format!(
                        "Operator 'DURING' cannot be used with non-date field '{}'",
                        field
                    ),
                ));
            } else if let Some(allowed) = self.rules.allowed_operators(field) {
                if !allowed.contains(&cond.operator) {
                    let allowed: Vec<&str> = allowed.iter().map(|op| op.as_str()).collect();
                    issues.push(Issue::new(
                        ErrorKind::Syntax,
                        format!(
                            "Operator '{}' cannot be used with field '{}' (allowed: {})",
                            cond.operator,
                            field,
                            allowed.join(", ")
                        ),
                    ));
                }
            }

            match (cond.operator.takes_value(), cond.value.is_some()) {
                (true, false) => issues.push(Issue::new(
                    ErrorKind::Syntax,
                    format!("Operator '{}' on field '{}' requires a value", cond.operator, field),
                )),
                (false, true) => issues.push(Issue::new(
                    ErrorKind::Syntax,
                    format!("Operator '{}' on field '{}' does not take a value", cond.operator, field),
                )),
                _ => {}
            }
        }
    }

    fn check_parameters(&self, query: &Query, issues: &mut Vec<Issue>) {
        for param in &query.parameters {
            if !self.rules.is_parameter(&param.name) {
                issues.push(Issue::new(
                    ErrorKind::Validation,
                    format!(
                        "Invalid parameter: '{}'.{}",
                        param.name,
                        suggestion(&param.name, self.rules.parameters)
                    ),
                ));
            }
            if param.value != "true" && param.value != "false" {
                issues.push(Issue::new(
                    ErrorKind::Validation,
                    format!(
                        "Invalid value for parameter '{}': '{}'. Must be true or false",
                        param.name, param.value
                    ),
                ));
            }
        }
    }

    fn check_limit(&self, query: &Query, issues: &mut Vec<Issue>) {
        if let Some(limit) = query.limit.filter(|n| *n <= 0) {
            issues.push(Issue::new(
                ErrorKind::Validation,
                format!("LIMIT must be a positive integer, got {}", limit),
            ));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{Condition, DateRange};

    fn errors(text: &str) -> Vec<String> {
        Validator::new().validate(text).errors
    }

    #[test]
    fn test_valid_query() {
        let report = Validator::new().validate("SELECT campaign.id FROM campaign LIMIT 10");
        assert!(report.valid);
        assert!(report.errors.is_empty());
    }

    #[test]
    fn test_invalid_resource() {
        let report = Validator::new().validate("SELECT campaign.id FROM invalid_resource LIMIT 10");
        assert!(!report.valid);
        assert!(
            report
                .errors
                .iter()
                .any(|e| e.to_lowercase().contains("invalid resource"))
        );
        assert_eq!(report.issues[0].kind, ErrorKind::Resource);
    }

    #[test]
    fn test_resource_suggestion() {
        let errs = errors("SELECT campaign.id FROM campaing");
        assert_eq!(errs, vec!["Invalid resource: 'campaing'. Did you mean 'campaign'?"]);
    }

    #[test]
    fn test_during_on_non_date_field() {
        let errs = errors("SELECT campaign.id FROM campaign WHERE campaign.id DURING LAST_7_DAYS");
        assert!(errs.iter().any(|e| e.contains("cannot be used with")), "{:?}", errs);
    }

    #[test]
    fn test_restricted_operator() {
        let errs = errors("SELECT campaign.id FROM campaign WHERE campaign.status LIKE 'EN%'");
        assert_eq!(
            errs,
            vec!["Operator 'LIKE' cannot be used with field 'campaign.status' (allowed: =, !=, IN, NOT IN)"]
        );
    }

    #[test]
    fn test_equals_on_date_field_is_invalid() {
        let errs = errors("SELECT campaign.id FROM campaign WHERE segments.date = '2023-01-01'");
        assert!(errs[0].contains("cannot be used with field 'segments.date'"));
    }

    #[test]
    fn test_invalid_fields() {
        let errs = errors("SELECT id, foo.bar FROM campaign ORDER BY metrics.clicks");
        assert_eq!(errs.len(), 2);
        assert!(errs.iter().all(|e| e.starts_with("Invalid field")));
    }

    #[test]
    fn test_clause_order() {
        let errs = errors("FROM campaign SELECT campaign.id");
        assert!(errs.iter().any(|e| e.contains("clause order")), "{:?}", errs);
    }

    #[test]
    fn test_invalid_operator_reported() {
        let errs = errors("SELECT campaign.id FROM campaign WHERE campaign.name ~ 'x'");
        assert!(
            errs.iter()
                .any(|e| e.to_lowercase().contains("invalid operator")),
            "{:?}",
            errs
        );
    }

    #[test]
    fn test_parameters() {
        let errs = errors("SELECT campaign.id FROM campaign PARAMETERS include_draft=yes");
        assert_eq!(
            errs,
            vec![
                "Invalid parameter: 'include_draft'. Did you mean 'include_drafts'?",
                "Invalid value for parameter 'include_draft': 'yes'. Must be true or false",
            ]
        );
    }

    #[test]
    fn test_non_positive_limit() {
        let errs = errors("SELECT campaign.id FROM campaign LIMIT 0");
        assert_eq!(errs, vec!["LIMIT must be a positive integer, got 0"]);
    }

    #[test]
    fn test_strict_mode_raises_typed_error() {
        let validator = Validator::new();
        let err = validator
            .validate_strict("SELECT campaign.id FROM nowhere")
            .unwrap_err();
        assert!(matches!(err, GaqlError::Resource(_)));

        let err = validator.validate_strict("SELECT campaign.id").unwrap_err();
        assert!(matches!(err, GaqlError::Syntax { .. }));

        let err = validator
            .validate_strict("SELECT bogus.id FROM campaign")
            .unwrap_err();
        assert!(matches!(err, GaqlError::Field(_)));

        assert!(validator.validate_strict("SELECT campaign.id FROM campaign").is_ok());
    }

    #[test]
    fn test_validate_query_rechecks_required_clauses() {
        let query = Query::default();
        let report = Validator::new().validate_query(&query);
        assert_eq!(
            report.errors,
            vec!["SELECT clause is required; FROM clause is required"]
        );

        let mut query = Query::new("campaign", ["segments.date"]);
        query.conditions.push(Condition::new(
            "segments.date",
            Operator::During,
            DateRange::Yesterday,
        ));
        assert!(Validator::new().validate_query(&query).valid);
    }

    #[test]
    fn test_duplicate_messages_are_reported_once() {
        let errs = errors("SELECT foo.a, foo.a FROM campaign");
        assert_eq!(errs.len(), 1);
    }

    #[test]
    fn test_report_serializes_without_issues() {
        let report = Validator::new().validate("SELECT campaign.id FROM campaign");
        let json = serde_json::to_string(&report).unwrap();
        assert_eq!(json, r#"{"valid":true,"errors":[]}"#);
    }
}

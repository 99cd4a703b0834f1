//! Repair engine.
//!
//! `fix_query` never fails. Queries that parse are repaired on the AST and
//! re-serialized through the builder; queries that do not parse go through
//! [`PatternRepair`] first, and if the result parses but is still invalid the
//! AST repair runs on it as a second tier. Every fix is recorded in the
//! change log, which ends with the remaining errors when the result is still
//! invalid.

mod patterns;


pub use patterns::PatternRepair;

use crate::ast::{DateRange, Operator, Query, Value};
use crate::fmt::Formatter;
use crate::matcher::closest_match;
use crate::parser;
use crate::rules::{Rules, field_prefix};
use crate::validator::Validator;

/// Field used when a query selects nothing.
pub const DEFAULT_FIELD: &str = "campaign.id";
/// Resource used when a query has no FROM clause.
pub const DEFAULT_RESOURCE: &str = "campaign";

pub const ALREADY_VALID: &str = "Query is already valid, no changes needed.";
pub const NOT_ALL_FIXED: &str = "Not all issues could be fixed";

const TRUTHY: &[&str] = &["true", "1", "yes", "on"];

pub struct Fixer {
    validator: Validator,
    patterns: PatternRepair,
    formatter: Formatter,
}

impl Default for Fixer {
    fn default() -> Self {
        Self::new()
    }
}

impl Fixer {
    pub fn new() -> Self {
        Self::with_formatter(Formatter::default())
    }

    pub fn with_formatter(formatter: Formatter) -> Self {
        let validator = Validator::new();
        Self {
            patterns: PatternRepair::new(*validator.rules(), formatter),
            validator,
            formatter,
        }
    }

    fn rules(&self) -> &Rules {
        self.validator.rules()
    }

    /// Best-effort repair. Returns the fixed text and a non-empty change log.
    pub fn fix_query(&self, text: &str) -> (String, Vec<String>) {
        if self.validator.validate(text).valid {
            return (text.to_string(), vec![ALREADY_VALID.to_string()]);
        }

        let mut changes = Vec::new();
        let repaired = match parser::parse(text) {
            Ok(query) => {
                tracing::debug!("repairing parsed query");
                self.rebuild(text, query, &mut changes)
            }
            Err(err) => {
                tracing::debug!(error = %err, "query does not parse, using pattern repair");
                let (patched, log) = self.patterns.repair(text);
                changes.extend(log);
                match parser::parse(&patched) {
                    Ok(query) if !self.validator.validate_query(&query).valid => {
                        tracing::debug!("pattern-repaired query still invalid, repairing AST");
                        self.rebuild(&patched, query, &mut changes)
                    }
                    _ => patched,
                }
            }
        };

        let formatted = self.formatter.format(&repaired);
        if formatted != repaired {
            changes.push("Applied formatting for better readability.".to_string());
        }

        let report = self.validator.validate(&formatted);
        if !report.valid {
            changes.push(NOT_ALL_FIXED.to_string());
            changes.push("Remaining errors:".to_string());
            changes.extend(report.errors.iter().map(|e| format!("  - {}", e)));
        }
        (formatted, changes)
    }

    /// Repair the AST and serialize it, keeping `original` if that fails.
    fn rebuild(&self, original: &str, query: Query, changes: &mut Vec<String>) -> String {
        let (query, log) = self.repair_query(query);
        changes.extend(log);
        match query.to_gaql() {
            Ok(text) => {
                changes.push("Rebuilt query with fixed components.".to_string());
                text
            }
            Err(err) => {
                changes.push(format!("Could not rebuild query: {}", err));
                original.to_string()
            }
        }
    }

    /// Field-by-field repair of a parsed query.
    pub fn repair_query(&self, mut query: Query) -> (Query, Vec<String>) {
        let mut changes = Vec::new();
        let rules = self.rules();

        let resource = query.resource.trim().to_string();
        if !resource.is_empty() && !rules.is_resource(&resource) {
            if let Some(best) = closest_match(&resource, rules.resources).first() {
                changes.push(format!("Fixed invalid resource: '{}' -> '{}'", resource, best));
                query.resource = best.to_string();
            }
        }

        for field in query.select.iter_mut() {
            self.fix_field_prefix(field, &mut changes);
        }

        let mut conditions = Vec::with_capacity(query.conditions.len());
        for mut cond in std::mem::take(&mut query.conditions) {
            self.fix_field_prefix(&mut cond.field, &mut changes);
            let old = cond.operator;

            if rules.is_date_field(&cond.field) {
                cond.operator = Operator::During;
                if !matches!(
                    cond.value,
                    Some(
                        Value::DateRange(_)
                            | Value::String(_)
                            | Value::Enum(_)
                            | Value::Integer(_)
                            | Value::Float(_)
                    )
                ) {
                    cond.value = Some(Value::DateRange(DateRange::Last30Days));
                    changes.push(format!(
                        "Replaced value of {} with {}",
                        cond.field,
                        DateRange::Last30Days
                    ));
                }
            } else if let Some(allowed) = rules.allowed_operators(&cond.field) {
                if !allowed.contains(&old) {
                    // The replacement must take a value exactly when the condition has one.
                    let wants_value = cond.value.is_some();
                    match allowed.iter().find(|op| op.takes_value() == wants_value) {
                        Some(first) => cond.operator = *first,
                        None => {
                            changes.push(format!(
                                "Removed condition with incompatible operator: {}",
                                cond
                            ));
                            continue;
                        }
                    }
                }
            } else if old == Operator::During {
                cond.operator = Operator::Eq;
            }

            if cond.operator != old {
                changes.push(format!(
                    "Fixed incompatible operator for {}: '{}' -> '{}'",
                    cond.field, old, cond.operator
                ));
            }
            conditions.push(cond);
        }
        query.conditions = conditions;

        let mut kept = Vec::with_capacity(query.order_by.len());
        for mut ordering in std::mem::take(&mut query.order_by) {
            self.fix_field_prefix(&mut ordering.field, &mut changes);
            if self.field_is_valid(&ordering.field) {
                kept.push(ordering);
            } else {
                changes.push(format!(
                    "Removed invalid field from ORDER BY clause: '{}'",
                    ordering.field
                ));
            }
        }
        query.order_by = kept;

        if let Some(limit) = query.limit.filter(|n| *n <= 0) {
            changes.push(format!("Removed invalid LIMIT: {}", limit));
            query.limit = None;
        }

        for param in query.parameters.iter_mut() {
            let old_name = param.name.clone();
            if !rules.is_parameter(&param.name) {
                if let Some(best) = closest_match(&param.name, rules.parameters).first() {
                    changes.push(format!(
                        "Fixed invalid parameter name: '{}' -> '{}'",
                        param.name, best
                    ));
                    param.name = best.to_string();
                }
            }
            if param.value != "true" && param.value != "false" {
                let value = TRUTHY.contains(&param.value.to_lowercase().as_str());
                changes.push(format!(
                    "Fixed invalid parameter value: '{}={}' -> '{}={}'",
                    old_name, param.value, param.name, value
                ));
                param.value = value.to_string();
            }
        }

        if query.select.is_empty() {
            query.select.push(DEFAULT_FIELD.to_string());
            changes.push(format!("Added missing SELECT fields: {}", DEFAULT_FIELD));
        }
        if query.resource.trim().is_empty() {
            query.resource = DEFAULT_RESOURCE.to_string();
            changes.push(format!("Added missing FROM resource: {}", DEFAULT_RESOURCE));
        }

        for change in &changes {
            tracing::debug!(change = %change, "ast repair");
        }
        (query, changes)
    }

    /// Replace an unknown field prefix with its closest match.
    fn fix_field_prefix(&self, field: &mut String, changes: &mut Vec<String>) {
        let rules = self.rules();
        let Some(prefix) = field_prefix(field.as_str()) else {
            return;
        };
        if rules.is_field_prefix(prefix) {
            return;
        }
        if let Some(best) = closest_match(prefix, rules.field_prefixes).first() {
            let fixed = format!("{}{}", best, &field[prefix.len()..]);
            changes.push(format!("Fixed invalid field prefix: '{}' -> '{}'", field, fixed));
            *field = fixed;
        }
    }

    fn field_is_valid(&self, field: &str) -> bool {
        field_prefix(field).is_some_and(|prefix| self.rules().is_field_prefix(prefix))
            && !field.split('.').any(str::is_empty)
    }
}

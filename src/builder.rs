//! Query builder: assembles canonical single-line GAQL from components.
//!
//! # Example
//! ```
//! use gaql::ast::{Condition, DateRange, Direction, Operator};
//! use gaql::builder::QueryBuilder;
//!
//! let gaql = QueryBuilder::new("campaign")
//!     .select(["campaign.id", "metrics.clicks"])
//!     .filter(Condition::new("segments.date", Operator::During, DateRange::Last7Days))
//!     .order_by("metrics.clicks", Direction::Desc)
//!     .limit(10)
//!     .build()
//!     .unwrap();
//!
//! assert_eq!(
//!     gaql,
//!     "SELECT campaign.id, metrics.clicks FROM campaign \
//!      WHERE segments.date DURING LAST_7_DAYS ORDER BY metrics.clicks DESC LIMIT 10"
//! );
//! ```

use crate::ast::{Condition, Direction, Ordering, Query};
use crate::error::{GaqlError, GaqlResult};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryBuilder {
    fields: Vec<String>,
    resource: String,
    conditions: Vec<Condition>,
    order_by: Vec<Ordering>,
    limit: Option<i64>,
    parameters: Vec<(String, String)>,
}

impl QueryBuilder {
    pub fn new(resource: impl Into<String>) -> Self {
        Self {
            resource: resource.into(),
            ..Self::default()
        }
    }

    /// Append fields to the SELECT list.
    pub fn select<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.fields.extend(fields.into_iter().map(Into::into));
        self
    }

    /// Add a WHERE condition (AND-combined).
    pub fn filter(mut self, condition: Condition) -> Self {
        self.conditions.push(condition);
        self
    }

    pub fn order_by(mut self, field: impl Into<String>, direction: Direction) -> Self {
        self.order_by.push(Ordering::new(field, direction));
        self
    }

    pub fn limit(mut self, limit: i64) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn parameter(mut self, name: impl Into<String>, value: bool) -> Self {
        self.parameters.push((name.into(), value.to_string()));
        self
    }

    /// Render the query, clauses in canonical order.
    pub fn build(&self) -> GaqlResult<String> {
        if self.fields.is_empty() {
            return Err(GaqlError::Validation(
                "At least one field must be selected".to_string(),
            ));
        }
        if self.resource.trim().is_empty() {
            return Err(GaqlError::Validation("Resource is required".to_string()));
        }

        let mut parts = vec![
            format!("SELECT {}", self.fields.join(", ")),
            format!("FROM {}", self.resource.trim()),
        ];

        if !self.conditions.is_empty() {
            let conditions: Vec<String> = self.conditions.iter().map(|c| c.to_string()).collect();
            parts.push(format!("WHERE {}", conditions.join(" AND ")));
        }

        if !self.order_by.is_empty() {
            let items: Vec<String> = self
                .order_by
                .iter()
                .map(|o| format!("{} {}", o.field, o.direction))
                .collect();
            parts.push(format!("ORDER BY {}", items.join(", ")));
        }

        if let Some(limit) = self.limit {
            parts.push(format!("LIMIT {}", limit));
        }

        if !self.parameters.is_empty() {
            let items: Vec<String> = self
                .parameters
                .iter()
                .map(|(name, value)| format!("{}={}", name, value))
                .collect();
            parts.push(format!("PARAMETERS {}", items.join(", ")));
        }

        Ok(parts.join(" "))
    }
}

impl From<&Query> for QueryBuilder {
    fn from(query: &Query) -> Self {
        Self {
            fields: query.select.clone(),
            resource: query.resource.clone(),
            conditions: query.conditions.clone(),
            order_by: query.order_by.clone(),
            limit: query.limit,
            parameters: query
                .parameters
                .iter()
                .map(|p| (p.name.clone(), p.value.clone()))
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{Operator, Value};
    use crate::parser::parse;

    #[test]
    fn test_minimal_query() {
        let gaql = QueryBuilder::new("campaign")
            .select(["campaign.id"])
            .build()
            .unwrap();
        assert_eq!(gaql, "SELECT campaign.id FROM campaign");
    }

    #[test]
    fn test_all_clauses() {
        let gaql = QueryBuilder::new("ad_group")
            .select(["ad_group.id", "ad_group.name"])
            .filter(Condition::new("ad_group.status", Operator::Eq, "ENABLED"))
            .filter(Condition::new(
                "ad_group.id",
                Operator::In,
                Value::List(vec![Value::Integer(1), Value::Integer(2)]),
            ))
            .order_by("ad_group.name", Direction::Asc)
            .limit(25)
            .parameter("include_drafts", true)
            .build()
            .unwrap();
        assert_eq!(
            gaql,
            "SELECT ad_group.id, ad_group.name FROM ad_group \
             WHERE ad_group.status = 'ENABLED' AND ad_group.id IN (1, 2) \
             ORDER BY ad_group.name ASC LIMIT 25 PARAMETERS include_drafts=true"
        );
    }

    #[test]
    fn test_required_components() {
        let err = QueryBuilder::new("campaign").build().unwrap_err();
        assert_eq!(err.to_string(), "At least one field must be selected");

        let err = QueryBuilder::new("  ").select(["campaign.id"]).build().unwrap_err();
        assert_eq!(err.to_string(), "Resource is required");
    }

    #[test]
    fn test_build_then_parse_recovers_components() {
        let conditions = vec![
            Condition::new("campaign.name", Operator::Like, "%brand%"),
            Condition::new("metrics.clicks", Operator::GtEq, 100),
            Condition::unary("campaign.end_date", Operator::IsNull),
            Condition::new(
                "segments.date",
                Operator::Between,
                Value::Range(
                    Box::new(Value::from("2024-01-01")),
                    Box::new(Value::from("2024-01-31")),
                ),
            ),
        ];
        let mut builder = QueryBuilder::new("campaign").select(["campaign.name", "campaign.id"]);
        for cond in &conditions {
            builder = builder.filter(cond.clone());
        }

        let query = parse(&builder.build().unwrap()).unwrap();
        assert_eq!(query.select, vec!["campaign.name", "campaign.id"]);
        assert_eq!(query.resource, "campaign");
        assert_eq!(query.conditions, conditions);
    }

    #[test]
    fn test_float_literals_stay_parseable() {
        for (value, text) in [
            (0.00001, "0.00001"),
            (1e16, "10000000000000000.0"),
            (2.5e20, "250000000000000000000.0"),
            (-0.75, "-0.75"),
        ] {
            let gaql = QueryBuilder::new("campaign")
                .select(["campaign.id"])
                .filter(Condition::new("metrics.ctr", Operator::Gt, value))
                .build()
                .unwrap();
            assert_eq!(
                gaql,
                format!("SELECT campaign.id FROM campaign WHERE metrics.ctr > {}", text)
            );

            let query = parse(&gaql).unwrap();
            assert_eq!(query.conditions[0].value, Some(Value::Float(value)));
        }
    }
}

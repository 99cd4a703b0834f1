//! Abstract Syntax Tree for GAQL queries.
//!
//! A parsed query is a fixed-shape record with one field per clause.
//! Optional clauses are represented by empty collections or `None`.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::builder::QueryBuilder;
use crate::error::GaqlResult;

/// A parsed GAQL query.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Query {
    /// SELECT field paths, in written order.
    pub select: Vec<String>,
    /// FROM resource.
    pub resource: String,
    /// WHERE conditions, implicitly AND-combined.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conditions: Vec<Condition>,
    /// ORDER BY items.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub order_by: Vec<Ordering>,
    /// LIMIT value as written; only positive values are valid.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<i64>,
    /// PARAMETERS entries with their values kept verbatim.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub parameters: Vec<Parameter>,
}

impl Query {
    /// Create a query selecting `fields` from `resource`.
    pub fn new<I, S>(resource: impl Into<String>, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            select: fields.into_iter().map(Into::into).collect(),
            resource: resource.into(),
            ..Self::default()
        }
    }

    /// Every field path referenced anywhere in the query.
    pub fn referenced_fields(&self) -> impl Iterator<Item = &str> {
        self.select
            .iter()
            .map(String::as_str)
            .chain(self.conditions.iter().map(|c| c.field.as_str()))
            .chain(self.order_by.iter().map(|o| o.field.as_str()))
    }

    /// Serialize back into a single-line GAQL string.
    pub fn to_gaql(&self) -> GaqlResult<String> {
        QueryBuilder::from(self).build()
    }
}

/// A single WHERE condition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    pub field: String,
    pub operator: Operator,
    /// Absent only for `IS NULL` / `IS NOT NULL`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
}

impl Condition {
    pub fn new(field: impl Into<String>, operator: Operator, value: impl Into<Value>) -> Self {
        Self {
            field: field.into(),
            operator,
            value: Some(value.into()),
        }
    }

    /// A condition whose operator takes no value.
    pub fn unary(field: impl Into<String>, operator: Operator) -> Self {
        Self {
            field: field.into(),
            operator,
            value: None,
        }
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.field, self.operator)?;
        if let Some(value) = &self.value {
            write!(f, " {}", value)?;
        }
        Ok(())
    }
}

/// Comparison, membership, pattern and range operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub enum Operator {
    Eq,
    NotEq,
    Gt,
    GtEq,
    Lt,
    LtEq,
    In,
    NotIn,
    Like,
    NotLike,
    ContainsAny,
    ContainsAll,
    ContainsNone,
    IsNull,
    IsNotNull,
    During,
    Between,
    RegexpMatch,
    NotRegexpMatch,
}

impl Operator {
    /// Every recognized operator, in grammar order.
    pub const ALL: [Operator; 19] = [
        Operator::Eq,
        Operator::NotEq,
        Operator::Gt,
        Operator::GtEq,
        Operator::Lt,
        Operator::LtEq,
        Operator::In,
        Operator::NotIn,
        Operator::Like,
        Operator::NotLike,
        Operator::ContainsAny,
        Operator::ContainsAll,
        Operator::ContainsNone,
        Operator::IsNull,
        Operator::IsNotNull,
        Operator::During,
        Operator::Between,
        Operator::RegexpMatch,
        Operator::NotRegexpMatch,
    ];

    /// Canonical textual form.
    pub fn as_str(&self) -> &'static str {
        match self {
            Operator::Eq => "=",
            Operator::NotEq => "!=",
            Operator::Gt => ">",
            Operator::GtEq => ">=",
            Operator::Lt => "<",
            Operator::LtEq => "<=",
            Operator::In => "IN",
            Operator::NotIn => "NOT IN",
            Operator::Like => "LIKE",
            Operator::NotLike => "NOT LIKE",
            Operator::ContainsAny => "CONTAINS ANY",
            Operator::ContainsAll => "CONTAINS ALL",
            Operator::ContainsNone => "CONTAINS NONE",
            Operator::IsNull => "IS NULL",
            Operator::IsNotNull => "IS NOT NULL",
            Operator::During => "DURING",
            Operator::Between => "BETWEEN",
            Operator::RegexpMatch => "REGEXP_MATCH",
            Operator::NotRegexpMatch => "NOT REGEXP_MATCH",
        }
    }

    /// Whether the operator is followed by a value.
    pub fn takes_value(&self) -> bool {
        !matches!(self, Operator::IsNull | Operator::IsNotNull)
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Operator {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.split_whitespace().collect::<Vec<_>>().join(" ");
        Operator::ALL
            .into_iter()
            .find(|op| op.as_str() == wanted)
            .ok_or_else(|| format!("Invalid operator: '{}'", s))
    }
}

impl From<Operator> for String {
    fn from(op: Operator) -> Self {
        op.as_str().to_string()
    }
}

impl TryFrom<String> for Operator {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

/// Condition value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Value {
    /// Quoted string literal (contents without the quotes).
    String(String),
    /// Unquoted enum-like constant such as `ENABLED`.
    Enum(String),
    Integer(i64),
    Float(f64),
    Bool(bool),
    DateRange(DateRange),
    /// Parenthesized list for IN / CONTAINS operators.
    List(Vec<Value>),
    /// `low AND high` for BETWEEN.
    Range(Box<Value>, Box<Value>),
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::String(s) if s.contains('\'') && !s.contains('"') => write!(f, "\"{}\"", s),
            Value::String(s) => write!(f, "'{}'", s),
            Value::Enum(s) => f.write_str(s),
            Value::Integer(n) => write!(f, "{}", n),
            Value::Float(n) => write_float(f, *n),
            Value::Bool(true) => f.write_str("TRUE"),
            Value::Bool(false) => f.write_str("FALSE"),
            Value::DateRange(range) => write!(f, "{}", range),
            Value::List(items) => {
                let items: Vec<String> = items.iter().map(|v| v.to_string()).collect();
                write!(f, "({})", items.join(", "))
            }
            Value::Range(low, high) => write!(f, "{} AND {}", low, high),
        }
    }
}

/// Plain decimal notation with a fractional part, so the literal reads back
/// as a float (`1e-5` and `1e16` are not GAQL numbers).
fn write_float(f: &mut fmt::Formatter<'_>, n: f64) -> fmt::Result {
    let text = n.to_string();
    if text.contains('.') || !n.is_finite() {
        f.write_str(&text)
    } else {
        write!(f, "{}.0", text)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Integer(n)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Float(n)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<DateRange> for Value {
    fn from(range: DateRange) -> Self {
        Value::DateRange(range)
    }
}

/// Predefined date-range keywords.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub enum DateRange {
    Today,
    Yesterday,
    Last7Days,
    Last14Days,
    Last30Days,
    Last90Days,
    LastBusinessWeek,
    LastWeekMonSun,
    LastWeekSunSat,
    ThisWeekMonToday,
    ThisWeekSunToday,
    ThisMonth,
    LastMonth,
    ThisQuarter,
    LastQuarter,
    ThisYear,
    LastYear,
}

impl DateRange {
    pub const ALL: [DateRange; 17] = [
        DateRange::Today,
        DateRange::Yesterday,
        DateRange::Last7Days,
        DateRange::Last14Days,
        DateRange::Last30Days,
        DateRange::Last90Days,
        DateRange::LastBusinessWeek,
        DateRange::LastWeekMonSun,
        DateRange::LastWeekSunSat,
        DateRange::ThisWeekMonToday,
        DateRange::ThisWeekSunToday,
        DateRange::ThisMonth,
        DateRange::LastMonth,
        DateRange::ThisQuarter,
        DateRange::LastQuarter,
        DateRange::ThisYear,
        DateRange::LastYear,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DateRange::Today => "TODAY",
            DateRange::Yesterday => "YESTERDAY",
            DateRange::Last7Days => "LAST_7_DAYS",
            DateRange::Last14Days => "LAST_14_DAYS",
            DateRange::Last30Days => "LAST_30_DAYS",
            DateRange::Last90Days => "LAST_90_DAYS",
            DateRange::LastBusinessWeek => "LAST_BUSINESS_WEEK",
            DateRange::LastWeekMonSun => "LAST_WEEK_MON_SUN",
            DateRange::LastWeekSunSat => "LAST_WEEK_SUN_SAT",
            DateRange::ThisWeekMonToday => "THIS_WEEK_MON_TODAY",
            DateRange::ThisWeekSunToday => "THIS_WEEK_SUN_TODAY",
            DateRange::ThisMonth => "THIS_MONTH",
            DateRange::LastMonth => "LAST_MONTH",
            DateRange::ThisQuarter => "THIS_QUARTER",
            DateRange::LastQuarter => "LAST_QUARTER",
            DateRange::ThisYear => "THIS_YEAR",
            DateRange::LastYear => "LAST_YEAR",
        }
    }
}

impl fmt::Display for DateRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DateRange {
    type Err = String;

    /// Case-insensitive lookup.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        DateRange::ALL
            .into_iter()
            .find(|range| range.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("Unknown date range: '{}'", s))
    }
}

impl From<DateRange> for String {
    fn from(range: DateRange) -> Self {
        range.as_str().to_string()
    }
}

impl TryFrom<String> for DateRange {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

/// One ORDER BY item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ordering {
    pub field: String,
    pub direction: Direction,
}

impl Ordering {
    pub fn new(field: impl Into<String>, direction: Direction) -> Self {
        Self {
            field: field.into(),
            direction,
        }
    }
}

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Direction {
    #[default]
    Asc,
    Desc,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Asc => f.write_str("ASC"),
            Direction::Desc => f.write_str("DESC"),
        }
    }
}

/// A `name=value` entry of the PARAMETERS clause.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Parameter {
    pub name: String,
    pub value: String,
}

impl Parameter {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

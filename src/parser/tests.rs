use pretty_assertions::assert_eq;

use super::parse;
use crate::ast::*;
use crate::error::ErrorKind;

#[test]
fn test_simple_query() {
    let query = parse("SELECT campaign.id, campaign.name FROM campaign").unwrap();
    assert_eq!(query.select, vec!["campaign.id", "campaign.name"]);
    assert_eq!(query.resource, "campaign");
    assert!(query.conditions.is_empty());
    assert_eq!(query.limit, None);
}

#[test]
fn test_full_query() {
    let query = parse(
        "SELECT campaign.id, metrics.clicks FROM campaign \
         WHERE segments.date DURING LAST_7_DAYS AND metrics.clicks > 10 \
         ORDER BY metrics.clicks DESC, campaign.id \
         LIMIT 50 \
         PARAMETERS include_drafts=true",
    )
    .unwrap();

    assert_eq!(
        query.conditions,
        vec![
            Condition::new("segments.date", Operator::During, DateRange::Last7Days),
            Condition::new("metrics.clicks", Operator::Gt, 10),
        ]
    );
    assert_eq!(
        query.order_by,
        vec![
            Ordering::new("metrics.clicks", Direction::Desc),
            Ordering::new("campaign.id", Direction::Asc),
        ]
    );
    assert_eq!(query.limit, Some(50));
    assert_eq!(query.parameters, vec![Parameter::new("include_drafts", "true")]);
}

#[test]
fn test_comments_and_newlines() {
    let query = parse(
        "-- top campaigns\nSELECT campaign.id -- id only\n  FROM campaign\n  LIMIT 5\n",
    )
    .unwrap();
    assert_eq!(query.select, vec!["campaign.id"]);
    assert_eq!(query.limit, Some(5));
}

#[test]
fn test_compound_operators() {
    let query = parse(
        "SELECT campaign.id FROM campaign WHERE campaign.status NOT IN ('REMOVED', 'PAUSED') \
         AND campaign.name NOT LIKE '%test%' \
         AND campaign.labels CONTAINS ANY ('customers/1/labels/2') \
         AND campaign.end_date IS NOT NULL \
         AND campaign.name NOT REGEXP_MATCH '^x'",
    )
    .unwrap();
    let ops: Vec<Operator> = query.conditions.iter().map(|c| c.operator).collect();
    assert_eq!(
        ops,
        vec![
            Operator::NotIn,
            Operator::NotLike,
            Operator::ContainsAny,
            Operator::IsNotNull,
            Operator::NotRegexpMatch,
        ]
    );
    assert_eq!(
        query.conditions[0].value,
        Some(Value::List(vec![
            Value::from("REMOVED"),
            Value::from("PAUSED"),
        ]))
    );
    assert_eq!(query.conditions[3].value, None);
}

#[test]
fn test_literal_types() {
    let query = parse(
        "SELECT campaign.id FROM campaign WHERE campaign.status = ENABLED \
         AND metrics.ctr > 0.5 AND campaign.experiment = FALSE \
         AND campaign.name = \"'Quirky' Interiors\"",
    )
    .unwrap();
    let values: Vec<Value> = query
        .conditions
        .iter()
        .filter_map(|c| c.value.clone())
        .collect();
    assert_eq!(
        values,
        vec![
            Value::Enum("ENABLED".to_string()),
            Value::Float(0.5),
            Value::Bool(false),
            Value::String("'Quirky' Interiors".to_string()),
        ]
    );
}

#[test]
fn test_between_range() {
    let query = parse(
        "SELECT campaign.id FROM campaign \
         WHERE segments.date BETWEEN '2024-01-01' AND '2024-01-31' AND metrics.clicks > 1",
    )
    .unwrap();
    assert_eq!(query.conditions.len(), 2);
    assert_eq!(
        query.conditions[0].value,
        Some(Value::Range(
            Box::new(Value::from("2024-01-01")),
            Box::new(Value::from("2024-01-31")),
        ))
    );
}

#[test]
fn test_missing_from() {
    for text in [
        "SELECT campaign.id",
        "SELECT campaign.id WHERE campaign.id = 1",
        "SELECT campaign.id LIMIT",
        "SELECT campaign.id,",
    ] {
        let err = parse(text).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Syntax);
        assert!(
            err.to_string().contains("FROM clause is required"),
            "{}: {}",
            text,
            err
        );
    }
}

#[test]
fn test_missing_from_without_select() {
    for text in ["LIMIT 10", "", "WHERE metrics.clicks > 1", "GET campaigns"] {
        let err = parse(text).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Syntax);
        assert_eq!(
            err.to_string(),
            "SELECT clause is required; FROM clause is required",
            "{:?}",
            text
        );
    }
}

#[test]
fn test_missing_select() {
    let err = parse("FROM campaign").unwrap_err();
    assert_eq!(err.to_string(), "SELECT clause is required");
}

#[test]
fn test_unexpected_token_reports_position_and_expected() {
    let err = parse("SELECT campaign.id FROM campaign LIMIT 10 WHERE campaign.id = 1").unwrap_err();
    let msg = err.to_string();
    assert!(msg.starts_with("Unexpected token 'WHERE' at position 42"), "{}", msg);
    assert!(msg.contains("PARAMETERS"), "{}", msg);
    assert_eq!(err.position(), Some(42));
}

#[test]
fn test_expected_clauses_use_full_keywords() {
    let err = parse("SELECT campaign.id FROM campaign foo").unwrap_err();
    assert_eq!(
        err.to_string(),
        "Unexpected token 'foo' at position 33. \
         Expected one of: WHERE, ORDER BY, LIMIT, PARAMETERS, end of input"
    );
}

#[test]
fn test_expected_lists_merge_alternatives() {
    let err = parse("SELECT campaign.id FROM campaign WHERE campaign.id IN ,").unwrap_err();
    let msg = err.to_string();
    assert!(msg.starts_with("Unexpected token ',' at position 54"), "{}", msg);
    assert!(msg.ends_with("Expected one of: (, literal"), "{}", msg);
}

#[test]
fn test_invalid_operator() {
    let err = parse("SELECT campaign.id FROM campaign WHERE campaign.name EQUALS 'x'").unwrap_err();
    assert!(err.to_string().starts_with("Invalid operator 'EQUALS'"), "{}", err);
    assert!(err.to_string().contains("REGEXP_MATCH"));
}

#[test]
fn test_or_is_rejected() {
    let err = parse(
        "SELECT campaign.id FROM campaign WHERE campaign.id = 1 OR campaign.id = 2",
    )
    .unwrap_err();
    assert!(err.to_string().contains("OR is not supported"));
}

#[test]
fn test_parenthesized_group_is_rejected() {
    let err = parse("SELECT campaign.id FROM campaign WHERE (campaign.id = 1)").unwrap_err();
    assert!(err.to_string().contains("Parenthesized condition groups"));
}

#[test]
fn test_bare_lowercase_value_is_rejected() {
    let err = parse("SELECT campaign.id FROM campaign WHERE campaign.name = test").unwrap_err();
    assert!(err.to_string().contains("Unexpected token 'test'"), "{}", err);
}

#[test]
fn test_unterminated_string() {
    let err = parse("SELECT campaign.id FROM campaign WHERE campaign.name = 'abc").unwrap_err();
    assert!(err.to_string().contains("Unterminated string literal"));
}

#[test]
fn test_float_limit_is_rejected() {
    let err = parse("SELECT campaign.id FROM campaign LIMIT 1.5").unwrap_err();
    assert!(err.to_string().contains("LIMIT must be an integer"));
}

#[test]
fn test_parameter_values_are_verbatim() {
    let query = parse("SELECT campaign.id FROM campaign PARAMETERS include_drafts=TRUE").unwrap();
    assert_eq!(query.parameters, vec![Parameter::new("include_drafts", "TRUE")]);
}

#[test]
fn test_lowercase_keywords_are_identifiers() {
    assert!(parse("select campaign.id from campaign").is_err());
}

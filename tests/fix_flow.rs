use gaql::ast::*;
use gaql::builder::QueryBuilder;
use gaql::fixer::{ALREADY_VALID, NOT_ALL_FIXED};
use gaql::{ErrorKind, fix_query, validate};
use pretty_assertions::assert_eq;

#[test]
fn test_valid_query() {
    let report = validate("SELECT campaign.id FROM campaign LIMIT 10", false).unwrap();
    assert!(report.valid);
    assert!(report.errors.is_empty());
}

#[test]
fn test_invalid_resource_is_reported() {
    let report = validate("SELECT campaign.id FROM invalid_resource LIMIT 10", false).unwrap();
    assert!(!report.valid);
    assert!(
        report
            .errors
            .iter()
            .any(|e| e.to_lowercase().contains("invalid resource")),
        "{:?}",
        report.errors
    );
}

#[test]
fn test_during_on_non_date_field() {
    let report = validate(
        "SELECT campaign.id FROM campaign WHERE campaign.id DURING LAST_7_DAYS",
        false,
    )
    .unwrap();
    assert!(!report.valid);
    assert!(report.errors.iter().any(|e| e.contains("cannot be used with")));
}

#[test]
fn test_strict_mode_raises_typed_errors() {
    let cases = [
        ("SELECT campaign.id FROM invalid_resource", ErrorKind::Resource),
        ("SELECT foo.bar FROM campaign", ErrorKind::Field),
        ("SELECT campaign.id LIMIT 10", ErrorKind::Syntax),
        (
            "SELECT campaign.id FROM campaign WHERE campaign.id DURING LAST_7_DAYS",
            ErrorKind::Syntax,
        ),
        (
            "SELECT campaign.id FROM campaign PARAMETERS include_drafts=TRUE",
            ErrorKind::Validation,
        ),
    ];
    for (query, kind) in cases {
        let err = validate(query, true).unwrap_err();
        assert_eq!(err.kind(), kind, "{}", query);
    }
    assert!(validate("SELECT campaign.id FROM campaign", true).is_ok());
}

#[test]
fn test_complex_query_flow() {
    let (fixed, changes) = fix_query(
        "SELECT campaign.id, campaign.name FROM campaing \
         WHERE segments.date = LAST_7_DAYS AND campaign.status LIKE 'ENABLED' \
         ORDER BY metrics.clicks DESC LIMIT 10",
    );

    assert_eq!(
        fixed,
        "SELECT campaign.id, campaign.name\n\
         FROM campaign\n\
         WHERE\n  segments.date DURING LAST_7_DAYS AND campaign.status = 'ENABLED'\n\
         ORDER BY metrics.clicks DESC\n\
         LIMIT 10"
    );
    assert!(validate(&fixed, false).unwrap().valid);
    assert!(changes.contains(&"Fixed invalid resource: 'campaing' -> 'campaign'".to_string()));
    assert!(changes.contains(
        &"Fixed incompatible operator for segments.date: '=' -> 'DURING'".to_string()
    ));
    assert!(changes.contains(
        &"Fixed incompatible operator for campaign.status: 'LIKE' -> '='".to_string()
    ));
    assert!(!changes.contains(&NOT_ALL_FIXED.to_string()));

    let (again, changes) = fix_query(&fixed);
    assert_eq!(again, fixed);
    assert_eq!(changes, vec![ALREADY_VALID.to_string()]);
}

#[test]
fn test_unparseable_input_gets_clauses() {
    let (fixed, changes) = fix_query("GET campaigns WHERE status=active LIMIT=10");
    assert!(fixed.starts_with("SELECT"), "{}", fixed);
    assert!(fixed.contains("FROM"), "{}", fixed);
    assert!(!changes.is_empty());
}

#[test]
fn test_fixer_converges_or_reports() {
    let queries = [
        "SELECT campaign.id FROM campaign",
        "SELECT campaign.id FROM campaing",
        "select campaign.id from campaigns limit 5",
        "campaign.id, campaign.name FROM campaign",
        "SELECT campaign.id FROM campaign WHERE campaign.name = test",
        "SELECT campaign.id FROM campaign WHERE segments.date > 100",
        "SELECT foo.bar FROM campaign ORDER BY foo.bar",
        "SELECT campaign.id FROM campaign WHERE campaign.id = 1 OR campaign.id = 2",
        "SELECT campaign.id FROM campaign PARAMETERS include_drafts=TRUE",
        "GET campaigns WHERE status=active LIMIT=10",
        "WHERE metrics.clicks > 1 FROM ad_group",
        "",
    ];
    for query in queries {
        let (fixed, changes) = fix_query(query);
        assert!(!changes.is_empty(), "{}", query);
        let valid = validate(&fixed, false).unwrap().valid;
        assert!(
            valid || changes.contains(&NOT_ALL_FIXED.to_string()),
            "{} -> {}: {:?}",
            query,
            fixed,
            changes
        );
    }
}

#[test]
fn test_built_query_validates() {
    let gaql = QueryBuilder::new("ad_group")
        .select(["ad_group.id", "metrics.impressions"])
        .filter(Condition::new("segments.date", Operator::During, DateRange::LastMonth))
        .filter(Condition::new("ad_group.status", Operator::NotEq, "REMOVED"))
        .order_by("metrics.impressions", Direction::Desc)
        .limit(100)
        .parameter("include_drafts", false)
        .build()
        .unwrap();

    let report = validate(&gaql, false).unwrap();
    assert!(report.valid, "{:?}", report.errors);
    assert_eq!(fix_query(&gaql).1, vec![ALREADY_VALID.to_string()]);
}

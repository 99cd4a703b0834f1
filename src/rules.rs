//! Static rule tables.
//!
//! All tables are `&'static` slices so iteration order is fixed: the first
//! allowed operator of a restricted field and the tie order of closest-match
//! suggestions both follow the order written here.

use crate::ast::Operator;

use Operator::*;

const RESOURCES: &[&str] = &[
    "campaign",
    "ad_group",
    "ad_group_ad",
    "ad_group_criterion",
    "ad_group_asset",
    "ad_group_label",
    "ad_group_ad_asset_view",
    "campaign_budget",
    "campaign_criterion",
    "campaign_asset",
    "campaign_label",
    "customer",
    "customer_client",
    "keyword_view",
    "search_term_view",
    "landing_page_view",
    "geographic_view",
    "gender_view",
    "age_range_view",
    "click_view",
    "shopping_performance_view",
    "asset",
    "asset_group",
    "bidding_strategy",
    "conversion_action",
    "label",
    "user_list",
    "change_event",
    "change_status",
    "video",
];

const FIELD_PREFIXES: &[&str] = &[
    "campaign",
    "ad_group",
    "ad_group_ad",
    "ad_group_criterion",
    "ad_group_asset",
    "ad_group_label",
    "ad_group_ad_asset_view",
    "campaign_budget",
    "campaign_criterion",
    "campaign_asset",
    "campaign_label",
    "customer",
    "customer_client",
    "keyword_view",
    "search_term_view",
    "landing_page_view",
    "geographic_view",
    "gender_view",
    "age_range_view",
    "click_view",
    "shopping_performance_view",
    "asset",
    "asset_group",
    "bidding_strategy",
    "conversion_action",
    "label",
    "user_list",
    "change_event",
    "change_status",
    "video",
    "metrics",
    "segments",
];

const DATE_FIELDS: &[&str] = &[
    "segments.date",
    "segments.week",
    "segments.month",
    "segments.quarter",
];

const DATE_OPERATORS: &[Operator] = &[During, Between];
const ENUM_OPERATORS: &[Operator] = &[Eq, NotEq, In, NotIn];
const ID_OPERATORS: &[Operator] = &[Eq, NotEq, Gt, GtEq, Lt, LtEq, In, NotIn];
const NAME_OPERATORS: &[Operator] = &[
    Eq,
    NotEq,
    Like,
    NotLike,
    In,
    NotIn,
    RegexpMatch,
    NotRegexpMatch,
];
const LABEL_OPERATORS: &[Operator] = &[ContainsAny, ContainsAll, ContainsNone];
const METRIC_OPERATORS: &[Operator] = &[Eq, NotEq, Gt, GtEq, Lt, LtEq, Between];

const OPERATOR_RESTRICTIONS: &[(&str, &[Operator])] = &[
    ("segments.date", DATE_OPERATORS),
    ("segments.week", DATE_OPERATORS),
    ("segments.month", DATE_OPERATORS),
    ("segments.quarter", DATE_OPERATORS),
    ("segments.day_of_week", ENUM_OPERATORS),
    ("campaign.status", ENUM_OPERATORS),
    ("ad_group.status", ENUM_OPERATORS),
    ("ad_group_ad.status", ENUM_OPERATORS),
    ("ad_group_criterion.status", ENUM_OPERATORS),
    ("campaign.advertising_channel_type", ENUM_OPERATORS),
    ("campaign.id", ID_OPERATORS),
    ("ad_group.id", ID_OPERATORS),
    ("customer.id", ID_OPERATORS),
    ("campaign.name", NAME_OPERATORS),
    ("ad_group.name", NAME_OPERATORS),
    ("campaign.labels", LABEL_OPERATORS),
    ("ad_group.labels", LABEL_OPERATORS),
    ("metrics.impressions", METRIC_OPERATORS),
    ("metrics.clicks", METRIC_OPERATORS),
    ("metrics.cost_micros", METRIC_OPERATORS),
    ("metrics.conversions", METRIC_OPERATORS),
    ("metrics.ctr", METRIC_OPERATORS),
];

const PARAMETERS: &[&str] = &["include_drafts", "omit_unselected_resource_names"];

/// Read-only validation tables shared by the validator and the fixer.
#[derive(Debug, Clone, Copy)]
pub struct Rules {
    pub resources: &'static [&'static str],
    pub field_prefixes: &'static [&'static str],
    pub date_fields: &'static [&'static str],
    pub operator_restrictions: &'static [(&'static str, &'static [Operator])],
    pub parameters: &'static [&'static str],
}

impl Rules {
    /// The built-in GAQL tables.
    pub const GAQL: Rules = Rules {
        resources: RESOURCES,
        field_prefixes: FIELD_PREFIXES,
        date_fields: DATE_FIELDS,
        operator_restrictions: OPERATOR_RESTRICTIONS,
        parameters: PARAMETERS,
    };

    pub fn is_resource(&self, name: &str) -> bool {
        self.resources.contains(&name)
    }

    pub fn is_field_prefix(&self, prefix: &str) -> bool {
        self.field_prefixes.contains(&prefix)
    }

    pub fn is_date_field(&self, field: &str) -> bool {
        self.date_fields.contains(&field)
    }

    pub fn is_parameter(&self, name: &str) -> bool {
        self.parameters.contains(&name)
    }

    /// Allowed operators for `field`, or `None` when unrestricted.
    pub fn allowed_operators(&self, field: &str) -> Option<&'static [Operator]> {
        self.operator_restrictions
            .iter()
            .find(|(name, _)| *name == field)
            .map(|(_, ops)| *ops)
    }

    pub fn operator_allowed(&self, field: &str, op: Operator) -> bool {
        self.allowed_operators(field)
            .is_none_or(|allowed| allowed.contains(&op))
    }
}

impl Default for Rules {
    fn default() -> Self {
        Self::GAQL
    }
}

/// The part of a field path before the first dot.
pub fn field_prefix(field: &str) -> Option<&str> {
    field.split_once('.').map(|(prefix, _)| prefix)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_resource_is_a_field_prefix() {
        let rules = Rules::GAQL;
        for resource in rules.resources {
            assert!(rules.is_field_prefix(resource), "{}", resource);
        }
        assert!(rules.is_field_prefix("metrics"));
        assert!(rules.is_field_prefix("segments"));
    }

    #[test]
    fn test_date_fields_are_restricted_to_date_operators() {
        let rules = Rules::GAQL;
        for field in rules.date_fields {
            assert_eq!(rules.allowed_operators(field), Some(DATE_OPERATORS));
        }
        assert!(!rules.operator_allowed("segments.date", Eq));
    }

    #[test]
    fn test_unrestricted_field_allows_anything() {
        let rules = Rules::GAQL;
        assert_eq!(rules.allowed_operators("campaign.bidding_strategy"), None);
        assert!(rules.operator_allowed("campaign.bidding_strategy", Like));
    }

    #[test]
    fn test_field_prefix() {
        assert_eq!(field_prefix("campaign.id"), Some("campaign"));
        assert_eq!(field_prefix("segments.date.x"), Some("segments"));
        assert_eq!(field_prefix("campaign"), None);
    }
}

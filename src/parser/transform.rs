//! Parse tree to AST.

use crate::ast::{Condition, Direction, Operator, Ordering, Parameter, Query};
use crate::clause::Clause;
use crate::error::{GaqlError, GaqlResult};

use super::grammar::{ParseTree, RawCondition, RawLimit, RawOrdering};
use super::tokens::{Keyword, TokenKind};

/// Build a [`Query`] from a parse tree. Missing SELECT/FROM become empty.
pub fn transform(tree: ParseTree) -> GaqlResult<Query> {
    let conditions = tree
        .conditions
        .into_iter()
        .map(condition)
        .collect::<GaqlResult<Vec<_>>>()?;

    let limit = tree.limit.map(limit).transpose()?;

    Ok(Query {
        select: tree.select.unwrap_or_default(),
        resource: tree.from.unwrap_or_default(),
        conditions,
        order_by: tree.order_by.into_iter().map(ordering).collect(),
        limit,
        parameters: tree
            .parameters
            .into_iter()
            .map(|p| Parameter::new(p.name, p.value))
            .collect(),
    })
}

/// Fail unless both required clauses are present, naming every missing one.
pub fn check_required_clauses(query: &Query) -> GaqlResult<()> {
    match missing_clauses_message(&missing_clauses(query)) {
        Some(message) => Err(GaqlError::syntax(message)),
        None => Ok(()),
    }
}

/// Required clauses absent from `query`, in canonical order.
pub fn missing_clauses(query: &Query) -> Vec<Clause> {
    let mut missing = Vec::new();
    if query.select.is_empty() {
        missing.push(Clause::Select);
    }
    if query.resource.trim().is_empty() {
        missing.push(Clause::From);
    }
    missing
}

/// `SELECT clause is required; FROM clause is required`
pub fn missing_clauses_message(missing: &[Clause]) -> Option<String> {
    if missing.is_empty() {
        return None;
    }
    let parts: Vec<String> = missing
        .iter()
        .map(|clause| format!("{} clause is required", clause.keyword()))
        .collect();
    Some(parts.join("; "))
}

fn condition(raw: RawCondition) -> GaqlResult<Condition> {
    let operator = operator_from_tokens(&raw.operator).ok_or_else(|| {
        let text: Vec<String> = raw.operator.iter().map(|t| t.to_string()).collect();
        GaqlError::syntax_at(
            raw.position,
            format!("Invalid operator '{}' at position {}", text.join(" "), raw.position),
        )
    })?;
    Ok(Condition {
        field: raw.field,
        operator,
        value: raw.value,
    })
}

/// Reassemble an operator from its constituent tokens.
pub fn operator_from_tokens(tokens: &[TokenKind]) -> Option<Operator> {
    use Keyword as K;
    use TokenKind as T;

    let op = match tokens {
        [T::Eq] => Operator::Eq,
        [T::NotEq] => Operator::NotEq,
        [T::Gt] => Operator::Gt,
        [T::GtEq] => Operator::GtEq,
        [T::Lt] => Operator::Lt,
        [T::LtEq] => Operator::LtEq,
        [T::Keyword(K::In)] => Operator::In,
        [T::Keyword(K::Not), T::Keyword(K::In)] => Operator::NotIn,
        [T::Keyword(K::Like)] => Operator::Like,
        [T::Keyword(K::Not), T::Keyword(K::Like)] => Operator::NotLike,
        [T::Keyword(K::Contains), T::Keyword(K::Any)] => Operator::ContainsAny,
        [T::Keyword(K::Contains), T::Keyword(K::All)] => Operator::ContainsAll,
        [T::Keyword(K::Contains), T::Keyword(K::None)] => Operator::ContainsNone,
        [T::Keyword(K::Is), T::Keyword(K::Null)] => Operator::IsNull,
        [T::Keyword(K::Is), T::Keyword(K::Not), T::Keyword(K::Null)] => Operator::IsNotNull,
        [T::Keyword(K::During)] => Operator::During,
        [T::Keyword(K::Between)] => Operator::Between,
        [T::Keyword(K::RegexpMatch)] => Operator::RegexpMatch,
        [T::Keyword(K::Not), T::Keyword(K::RegexpMatch)] => Operator::NotRegexpMatch,
        _ => return None,
    };
    Some(op)
}

fn ordering(raw: RawOrdering) -> Ordering {
    let direction = match raw.direction {
        Some(Keyword::Desc) => Direction::Desc,
        _ => Direction::Asc,
    };
    Ordering::new(raw.field, direction)
}

fn limit(raw: RawLimit) -> GaqlResult<i64> {
    if raw.text.contains('.') {
        return Err(GaqlError::syntax_at(
            raw.position,
            format!("LIMIT must be an integer, got {}", raw.text),
        ));
    }
    raw.text.parse::<i64>().map_err(|_| {
        GaqlError::syntax_at(
            raw.position,
            format!("LIMIT value out of range: {}", raw.text),
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compound_operators_reassemble() {
        let tokens = [
            TokenKind::Keyword(Keyword::Is),
            TokenKind::Keyword(Keyword::Not),
            TokenKind::Keyword(Keyword::Null),
        ];
        assert_eq!(operator_from_tokens(&tokens), Some(Operator::IsNotNull));

        let tokens = [
            TokenKind::Keyword(Keyword::Contains),
            TokenKind::Keyword(Keyword::None),
        ];
        assert_eq!(operator_from_tokens(&tokens), Some(Operator::ContainsNone));

        assert_eq!(operator_from_tokens(&[TokenKind::GtEq]), Some(Operator::GtEq));
        assert_eq!(operator_from_tokens(&[TokenKind::Comma]), None);
    }

    #[test]
    fn test_required_clause_check_names_every_missing_clause() {
        let err = check_required_clauses(&Query::default()).unwrap_err();
        assert_eq!(
            err.to_string(),
            "SELECT clause is required; FROM clause is required"
        );

        let err = check_required_clauses(&Query::new("", ["campaign.id"])).unwrap_err();
        assert_eq!(err.to_string(), "FROM clause is required");

        assert!(check_required_clauses(&Query::new("campaign", ["campaign.id"])).is_ok());
    }
}

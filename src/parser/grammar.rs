//! Token-stream grammar.
//!
//! ```text
//! query      := [SELECT fields] [FROM ident] [WHERE conditions]
//!               [ORDER BY orderings] [LIMIT number] [PARAMETERS params]
//! conditions := condition (AND condition)*
//! condition  := ident operator [value]
//! value      := literal | '(' literal (',' literal)* ')' | literal AND literal
//! ordering   := ident [ASC | DESC]
//! param      := ident '=' word
//! ```
//!
//! The productions are nom parsers over `&[Token]` rather than `&str`.
//! [`GrammarError`] records which tokens would have been accepted, so a
//! failed `alt` reports the union of its branches as "Expected one of".
//!
//! Every clause is optional at this level; required clauses are enforced
//! after the transform so the error names the missing clause.

use nom::{
    IResult,
    branch::alt,
    combinator::{cut, map, opt, value},
    error::{ErrorKind as NomErrorKind, ParseError},
    multi::many0,
    sequence::{pair, preceded, terminated, tuple},
};

use crate::ast::{DateRange, Operator, Value};
use crate::error::{GaqlError, GaqlResult};

use super::tokens::{Keyword, Token, TokenKind};

type Input<'a> = &'a [Token];
type PResult<'a, O> = IResult<Input<'a>, O, GrammarError<'a>>;

/// Clause names in the order the grammar accepts them.
const CLAUSES: [&str; 6] = ["SELECT", "FROM", "WHERE", "ORDER BY", "LIMIT", "PARAMETERS"];

/// Raw derivation produced by the grammar.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParseTree {
    pub select: Option<Vec<String>>,
    pub from: Option<String>,
    pub conditions: Vec<RawCondition>,
    pub order_by: Vec<RawOrdering>,
    pub limit: Option<RawLimit>,
    pub parameters: Vec<RawParameter>,
}

/// Condition whose operator is still a token sequence.
#[derive(Debug, Clone, PartialEq)]
pub struct RawCondition {
    pub field: String,
    pub operator: Vec<TokenKind>,
    pub value: Option<Value>,
    pub position: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RawOrdering {
    pub field: String,
    pub direction: Option<Keyword>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RawLimit {
    pub text: String,
    pub position: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RawParameter {
    pub name: String,
    pub value: String,
}

/// Derive a parse tree from tokens. `eof` is the length of the source text.
pub fn parse_tokens(tokens: &[Token], eof: usize) -> GaqlResult<ParseTree> {
    match query(tokens) {
        Ok((_, tree)) => Ok(tree),
        Err(nom::Err::Error(e) | nom::Err::Failure(e)) => Err(e.into_syntax_error(eof)),
        Err(nom::Err::Incomplete(_)) => Err(GaqlError::syntax_at(
            eof,
            format!("Unexpected end of input at position {}", eof),
        )),
    }
}

/// Parse failure over the token stream.
#[derive(Debug, Clone)]
pub struct GrammarError<'a> {
    /// Tokens left at the failure point.
    input: Input<'a>,
    expected: Vec<&'static str>,
    /// Replaces the "Expected one of" text when set.
    message: Option<String>,
}

impl<'a> GrammarError<'a> {
    fn expected(input: Input<'a>, name: &'static str) -> Self {
        Self {
            input,
            expected: vec![name],
            message: None,
        }
    }

    fn message(input: Input<'a>, message: impl Into<String>) -> Self {
        Self {
            input,
            expected: Vec::new(),
            message: Some(message.into()),
        }
    }

    fn into_syntax_error(self, eof: usize) -> GaqlError {
        let position = self.input.first().map_or(eof, |t| t.position);
        if let Some(message) = self.message {
            return GaqlError::syntax_at(position, message);
        }

        let mut expected: Vec<&str> = Vec::new();
        for name in self.expected {
            if !expected.contains(&name) {
                expected.push(name);
            }
        }
        let expected = expected.join(", ");
        let message = match self.input.first() {
            Some(token) => format!(
                "Unexpected token '{}' at position {}. Expected one of: {}",
                token.kind, position, expected
            ),
            None => format!(
                "Unexpected end of input at position {}. Expected one of: {}",
                position, expected
            ),
        };
        GaqlError::syntax_at(position, message)
    }
}

impl<'a> ParseError<Input<'a>> for GrammarError<'a> {
    fn from_error_kind(input: Input<'a>, _kind: NomErrorKind) -> Self {
        Self {
            input,
            expected: Vec::new(),
            message: None,
        }
    }

    fn append(_input: Input<'a>, _kind: NomErrorKind, other: Self) -> Self {
        other
    }

    /// Keep the branch that got further; on a tie, merge what both wanted.
    fn or(mut self, other: Self) -> Self {
        match self.input.len().cmp(&other.input.len()) {
            std::cmp::Ordering::Less => self,
            std::cmp::Ordering::Greater => other,
            std::cmp::Ordering::Equal => {
                self.expected.extend(other.expected);
                self.message = self.message.or(other.message);
                self
            }
        }
    }
}

// ---- primitives ----

/// Match one token, naming it `name` in errors.
fn token<'a, O>(
    name: &'static str,
    mut accept: impl FnMut(&'a TokenKind) -> Option<O>,
) -> impl FnMut(Input<'a>) -> PResult<'a, O> {
    move |input: Input<'a>| match input.split_first() {
        Some((first, rest)) => match accept(&first.kind) {
            Some(out) => Ok((rest, out)),
            None => Err(nom::Err::Error(GrammarError::expected(input, name))),
        },
        None => Err(nom::Err::Error(GrammarError::expected(input, name))),
    }
}

fn keyword<'a>(kw: Keyword) -> impl FnMut(Input<'a>) -> PResult<'a, ()> {
    token(kw.as_str(), move |kind| {
        (*kind == TokenKind::Keyword(kw)).then_some(())
    })
}

fn symbol<'a>(expected: TokenKind, name: &'static str) -> impl FnMut(Input<'a>) -> PResult<'a, ()> {
    token(name, move |kind| (*kind == expected).then_some(()))
}

fn identifier(input: Input<'_>) -> PResult<'_, String> {
    token("identifier", |kind| match kind {
        TokenKind::Ident(name) => Some(name.clone()),
        _ => None,
    })(input)
}

fn literal(input: Input<'_>) -> PResult<'_, Value> {
    let Some((first, rest)) = input.split_first() else {
        return Err(nom::Err::Error(GrammarError::expected(input, "literal")));
    };
    match literal_value(&first.kind) {
        Some(Ok(value)) => Ok((rest, value)),
        Some(Err(message)) => Err(nom::Err::Failure(GrammarError::message(input, message))),
        None => Err(nom::Err::Error(GrammarError::expected(input, "literal"))),
    }
}

/// `item (',' item)*`
fn comma_list<'a, O, F>(mut item: F) -> impl FnMut(Input<'a>) -> PResult<'a, Vec<O>>
where
    F: FnMut(Input<'a>) -> PResult<'a, O>,
{
    move |input: Input<'a>| {
        let (input, first) = item(input)?;
        let (input, rest) =
            many0(preceded(symbol(TokenKind::Comma, ","), cut(&mut item)))(input)?;
        let mut items = Vec::with_capacity(rest.len() + 1);
        items.push(first);
        items.extend(rest);
        Ok((input, items))
    }
}

// ---- clauses ----

fn query(input: Input<'_>) -> PResult<'_, ParseTree> {
    let (input, (select, from, conditions, order_by, limit, parameters)) = tuple((
        opt(select_clause),
        opt(from_clause),
        opt(where_clause),
        opt(order_by_clause),
        opt(limit_clause),
        opt(parameters_clause),
    ))(input)?;

    let tree = ParseTree {
        select,
        from,
        conditions: conditions.unwrap_or_default(),
        order_by: order_by.unwrap_or_default(),
        limit,
        parameters: parameters.unwrap_or_default(),
    };

    if !input.is_empty() {
        return Err(nom::Err::Failure(GrammarError {
            input,
            expected: trailing_expected(&tree),
            message: None,
        }));
    }
    Ok((input, tree))
}

/// What could have followed the last clause that was parsed.
fn trailing_expected(tree: &ParseTree) -> Vec<&'static str> {
    let present = [
        tree.select.is_some(),
        tree.from.is_some(),
        !tree.conditions.is_empty(),
        !tree.order_by.is_empty(),
        tree.limit.is_some(),
        !tree.parameters.is_empty(),
    ];
    let last = present.iter().rposition(|p| *p);

    let mut expected = Vec::new();
    match last {
        Some(2) => expected.push("AND"),
        Some(3) => {
            if tree.order_by.last().is_some_and(|o| o.direction.is_none()) {
                expected.extend(["ASC", "DESC"]);
            }
            expected.push(",");
        }
        Some(0 | 5) => expected.push(","),
        _ => {}
    }
    expected.extend(&CLAUSES[last.map_or(0, |i| i + 1)..]);
    expected.push("end of input");
    expected
}

fn select_clause(input: Input<'_>) -> PResult<'_, Vec<String>> {
    preceded(keyword(Keyword::Select), cut(comma_list(identifier)))(input)
}

fn from_clause(input: Input<'_>) -> PResult<'_, String> {
    preceded(keyword(Keyword::From), cut(identifier))(input)
}

fn where_clause(input: Input<'_>) -> PResult<'_, Vec<RawCondition>> {
    preceded(keyword(Keyword::Where), cut(conditions))(input)
}

fn order_by_clause(input: Input<'_>) -> PResult<'_, Vec<RawOrdering>> {
    let order = token("ORDER BY", |kind| {
        (*kind == TokenKind::Keyword(Keyword::Order)).then_some(())
    });
    preceded(
        pair(order, cut(keyword(Keyword::By))),
        cut(comma_list(ordering)),
    )(input)
}

fn limit_clause(input: Input<'_>) -> PResult<'_, RawLimit> {
    preceded(keyword(Keyword::Limit), cut(limit))(input)
}

fn parameters_clause(input: Input<'_>) -> PResult<'_, Vec<RawParameter>> {
    preceded(keyword(Keyword::Parameters), cut(comma_list(parameter)))(input)
}

// ---- productions ----

fn conditions(input: Input<'_>) -> PResult<'_, Vec<RawCondition>> {
    let (input, first) = condition(input)?;
    let (input, rest) = many0(preceded(keyword(Keyword::And), cut(condition)))(input)?;

    if input.first().is_some_and(|t| t.kind == TokenKind::Keyword(Keyword::Or)) {
        return Err(nom::Err::Failure(GrammarError::message(
            input,
            "OR is not supported; conditions may only be combined with AND",
        )));
    }

    let mut conditions = Vec::with_capacity(rest.len() + 1);
    conditions.push(first);
    conditions.extend(rest);
    Ok((input, conditions))
}

fn condition(input: Input<'_>) -> PResult<'_, RawCondition> {
    if let Some(paren) = input.first().filter(|t| t.kind == TokenKind::LParen) {
        return Err(nom::Err::Failure(GrammarError::message(
            input,
            format!(
                "Parenthesized condition groups are not supported (position {})",
                paren.position
            ),
        )));
    }

    let position = input.first().map_or(0, |t| t.position);
    let (input, field) = identifier(input)?;
    let (input, operator) = operator(input)?;
    let (input, value) = match operator.as_slice() {
        [TokenKind::Keyword(Keyword::Is), ..] => (input, None),
        [TokenKind::Keyword(Keyword::In | Keyword::Contains), ..]
        | [TokenKind::Keyword(Keyword::Not), TokenKind::Keyword(Keyword::In)] => {
            map(cut(list_or_literal), Some)(input)?
        }
        [TokenKind::Keyword(Keyword::Between), ..] => map(cut(range), Some)(input)?,
        _ => map(cut(literal), Some)(input)?,
    };

    Ok((
        input,
        RawCondition {
            field,
            operator,
            value,
            position,
        },
    ))
}

/// The tokens forming one operator, e.g. `[IS, NOT, NULL]`.
fn operator(input: Input<'_>) -> PResult<'_, Vec<TokenKind>> {
    let matched = alt((
        token("operator", |kind| {
            matches!(
                kind,
                TokenKind::Eq
                    | TokenKind::NotEq
                    | TokenKind::Gt
                    | TokenKind::GtEq
                    | TokenKind::Lt
                    | TokenKind::LtEq
            )
            .then_some(())
        }),
        token("operator", |kind| {
            matches!(
                kind,
                TokenKind::Keyword(
                    Keyword::In
                        | Keyword::Like
                        | Keyword::During
                        | Keyword::Between
                        | Keyword::RegexpMatch
                )
            )
            .then_some(())
        }),
        value(
            (),
            pair(
                keyword(Keyword::Not),
                alt((
                    keyword(Keyword::In),
                    keyword(Keyword::Like),
                    keyword(Keyword::RegexpMatch),
                )),
            ),
        ),
        value(
            (),
            pair(
                keyword(Keyword::Contains),
                alt((
                    keyword(Keyword::Any),
                    keyword(Keyword::All),
                    keyword(Keyword::None),
                )),
            ),
        ),
        value(
            (),
            tuple((
                keyword(Keyword::Is),
                opt(keyword(Keyword::Not)),
                keyword(Keyword::Null),
            )),
        ),
    ))(input);

    match matched {
        Ok((rest, ())) => {
            let consumed = input.len() - rest.len();
            let tokens = input[..consumed].iter().map(|t| t.kind.clone()).collect();
            Ok((rest, tokens))
        }
        Err(nom::Err::Error(_)) if input.is_empty() => Err(nom::Err::Failure(GrammarError {
            input,
            expected: Operator::ALL.iter().map(|op| op.as_str()).collect(),
            message: None,
        })),
        Err(nom::Err::Error(_)) => Err(nom::Err::Failure(invalid_operator(input))),
        Err(e) => Err(e),
    }
}

fn invalid_operator(input: Input<'_>) -> GrammarError<'_> {
    let position = input.first().map_or(0, |t| t.position);
    let mut found = input
        .first()
        .map(|t| t.kind.to_string())
        .unwrap_or_default();
    if is_operator_word(&found) {
        if let Some(next) = input.get(1) {
            found = format!("{} {}", found, next.kind);
        }
    }
    let allowed: Vec<&str> = Operator::ALL.iter().map(|op| op.as_str()).collect();
    GrammarError::message(
        input,
        format!(
            "Invalid operator '{}' at position {}. Expected one of: {}",
            found,
            position,
            allowed.join(", ")
        ),
    )
}

/// `'(' literal (',' literal)* ')'` or a single literal.
fn list_or_literal(input: Input<'_>) -> PResult<'_, Value> {
    alt((
        map(
            preceded(
                symbol(TokenKind::LParen, "("),
                cut(terminated(
                    comma_list(literal),
                    symbol(TokenKind::RParen, ")"),
                )),
            ),
            Value::List,
        ),
        literal,
    ))(input)
}

/// `low [AND high]`; the AND is left for the next condition unless a
/// literal follows it.
fn range(input: Input<'_>) -> PResult<'_, Value> {
    let (input, low) = literal(input)?;
    let (input, high) = opt(preceded(keyword(Keyword::And), literal))(input)?;
    let value = match high {
        Some(high) => Value::Range(Box::new(low), Box::new(high)),
        None => low,
    };
    Ok((input, value))
}

fn ordering(input: Input<'_>) -> PResult<'_, RawOrdering> {
    let (input, field) = identifier(input)?;
    let (input, direction) = opt(alt((
        value(Keyword::Asc, keyword(Keyword::Asc)),
        value(Keyword::Desc, keyword(Keyword::Desc)),
    )))(input)?;
    Ok((input, RawOrdering { field, direction }))
}

fn limit(input: Input<'_>) -> PResult<'_, RawLimit> {
    let position = input.first().map_or(0, |t| t.position);
    let (input, text) = token("number", |kind| match kind {
        TokenKind::Number(text) => Some(text.clone()),
        _ => None,
    })(input)?;
    Ok((input, RawLimit { text, position }))
}

/// `name = value`; quoted values keep their contents only.
fn parameter(input: Input<'_>) -> PResult<'_, RawParameter> {
    let (input, name) = identifier(input)?;
    let (input, _) = cut(symbol(TokenKind::Eq, "="))(input)?;
    let (input, value) = cut(token("identifier", |kind| match kind {
        TokenKind::Str(s) => Some(s.clone()),
        TokenKind::Ident(_) | TokenKind::Number(_) => Some(kind.to_string()),
        _ => None,
    }))(input)?;
    Ok((input, RawParameter { name, value }))
}

fn is_operator_word(word: &str) -> bool {
    matches!(word, "NOT" | "IS" | "CONTAINS")
}

/// Classify a token as a literal value.
///
/// `None` means the token cannot start a literal; `Some(Err)` means it looks
/// like one but is malformed.
fn literal_value(kind: &TokenKind) -> Option<Result<Value, String>> {
    match kind {
        TokenKind::Str(s) => Some(Ok(Value::String(s.clone()))),
        TokenKind::Number(text) if text.contains('.') => Some(
            text.parse::<f64>()
                .map(Value::Float)
                .map_err(|_| format!("Invalid number '{}'", text)),
        ),
        TokenKind::Number(text) => Some(
            text.parse::<i64>()
                .map(Value::Integer)
                .map_err(|_| format!("Integer out of range '{}'", text)),
        ),
        TokenKind::Ident(word) if word.eq_ignore_ascii_case("true") => Some(Ok(Value::Bool(true))),
        TokenKind::Ident(word) if word.eq_ignore_ascii_case("false") => {
            Some(Ok(Value::Bool(false)))
        }
        TokenKind::Ident(word) if is_enum_like(word) => Some(Ok(word
            .parse::<DateRange>()
            .map(Value::DateRange)
            .unwrap_or_else(|_| Value::Enum(word.clone())))),
        _ => None,
    }
}

/// Upper-case letters, digits and underscores, starting with a letter.
pub(crate) fn is_enum_like(word: &str) -> bool {
    word.starts_with(|c: char| c.is_ascii_uppercase())
        && word
            .chars()
            .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '_')
}

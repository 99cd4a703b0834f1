//! Lexer: turns normalized query text into a positioned token stream.

use std::fmt;

use nom::{
    IResult,
    branch::alt,
    bytes::complete::{tag, take_till, take_while1},
    character::complete::{char, digit1, multispace0},
    combinator::{map, opt, recognize, value},
    sequence::{delimited, pair, tuple},
};

use crate::error::{GaqlError, GaqlResult};

/// Reserved upper-case words.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Keyword {
    Select,
    From,
    Where,
    Order,
    By,
    Limit,
    Parameters,
    And,
    Or,
    Not,
    In,
    Like,
    Contains,
    Any,
    All,
    None,
    Is,
    Null,
    During,
    Between,
    RegexpMatch,
    Asc,
    Desc,
}

impl Keyword {
    const WORDS: [(&'static str, Keyword); 23] = [
        ("SELECT", Keyword::Select),
        ("FROM", Keyword::From),
        ("WHERE", Keyword::Where),
        ("ORDER", Keyword::Order),
        ("BY", Keyword::By),
        ("LIMIT", Keyword::Limit),
        ("PARAMETERS", Keyword::Parameters),
        ("AND", Keyword::And),
        ("OR", Keyword::Or),
        ("NOT", Keyword::Not),
        ("IN", Keyword::In),
        ("LIKE", Keyword::Like),
        ("CONTAINS", Keyword::Contains),
        ("ANY", Keyword::Any),
        ("ALL", Keyword::All),
        ("NONE", Keyword::None),
        ("IS", Keyword::Is),
        ("NULL", Keyword::Null),
        ("DURING", Keyword::During),
        ("BETWEEN", Keyword::Between),
        ("REGEXP_MATCH", Keyword::RegexpMatch),
        ("ASC", Keyword::Asc),
        ("DESC", Keyword::Desc),
    ];

    /// Keywords are matched exactly; lower-case spellings are identifiers.
    pub fn lookup(word: &str) -> Option<Keyword> {
        Self::WORDS
            .iter()
            .find(|(text, _)| *text == word)
            .map(|(_, kw)| *kw)
    }

    pub fn as_str(&self) -> &'static str {
        Self::WORDS
            .iter()
            .find(|(_, kw)| kw == self)
            .map_or("", |(text, _)| text)
    }
}

/// Token payloads.
#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    Keyword(Keyword),
    /// Bare word, possibly dotted (`campaign.id`, `ENABLED`, `true`).
    Ident(String),
    /// Quoted string contents.
    Str(String),
    /// Numeric literal text, optionally signed and fractional.
    Number(String),
    Comma,
    LParen,
    RParen,
    Eq,
    NotEq,
    Gt,
    GtEq,
    Lt,
    LtEq,
    /// Anything the lexer does not recognize.
    Unknown(String),
}

impl TokenKind {
    /// Short description used in "expected one of" lists.
    pub fn describe(&self) -> String {
        match self {
            TokenKind::Keyword(kw) => kw.as_str().to_string(),
            TokenKind::Ident(_) => "identifier".to_string(),
            TokenKind::Str(_) => "string".to_string(),
            TokenKind::Number(_) => "number".to_string(),
            other => other.to_string(),
        }
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenKind::Keyword(kw) => f.write_str(kw.as_str()),
            TokenKind::Ident(s) | TokenKind::Number(s) | TokenKind::Unknown(s) => f.write_str(s),
            TokenKind::Str(s) => write!(f, "'{}'", s),
            TokenKind::Comma => f.write_str(","),
            TokenKind::LParen => f.write_str("("),
            TokenKind::RParen => f.write_str(")"),
            TokenKind::Eq => f.write_str("="),
            TokenKind::NotEq => f.write_str("!="),
            TokenKind::Gt => f.write_str(">"),
            TokenKind::GtEq => f.write_str(">="),
            TokenKind::Lt => f.write_str("<"),
            TokenKind::LtEq => f.write_str("<="),
        }
    }
}

/// A token and its byte offset in the normalized text.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub position: usize,
}

/// Tokenize normalized query text.
pub fn tokenize(input: &str) -> GaqlResult<Vec<Token>> {
    let mut tokens = Vec::new();
    let mut rest = input;

    loop {
        let (after_ws, _) = skip_ws(rest)?;
        rest = after_ws;
        if rest.is_empty() {
            break;
        }
        let position = input.len() - rest.len();

        if let Some(quote) = rest.chars().next().filter(|c| *c == '\'' || *c == '"') {
            if !rest[1..].contains(quote) {
                return Err(GaqlError::syntax_at(
                    position,
                    format!("Unterminated string literal at position {}", position),
                ));
            }
        }

        let (remaining, kind) = match parse_token(rest) {
            Ok(ok) => ok,
            Err(_) => {
                return Err(GaqlError::syntax_at(
                    position,
                    format!("Unexpected character at position {}", position),
                ));
            }
        };
        tokens.push(Token { kind, position });
        rest = remaining;
    }

    Ok(tokens)
}

fn skip_ws(input: &str) -> GaqlResult<(&str, &str)> {
    multispace0::<_, nom::error::Error<&str>>(input)
        .map_err(|_| GaqlError::syntax("Failed to skip whitespace"))
}

fn parse_token(input: &str) -> IResult<&str, TokenKind> {
    alt((parse_string, parse_number, parse_word, parse_symbol, parse_unknown))(input)
}

/// Single- or double-quoted string without escapes.
fn parse_string(input: &str) -> IResult<&str, TokenKind> {
    map(
        alt((
            delimited(char('\''), take_till(|c| c == '\''), char('\'')),
            delimited(char('"'), take_till(|c| c == '"'), char('"')),
        )),
        |s: &str| TokenKind::Str(s.to_string()),
    )(input)
}

fn parse_number(input: &str) -> IResult<&str, TokenKind> {
    let (rest, text) = recognize(tuple((
        opt(char('-')),
        digit1,
        opt(pair(char('.'), digit1)),
    )))(input)?;
    // `10abc` is not a number followed by a word.
    if rest.starts_with(|c: char| c.is_alphanumeric() || c == '_') {
        return Err(nom::Err::Error(nom::error::Error::new(
            input,
            nom::error::ErrorKind::Digit,
        )));
    }
    Ok((rest, TokenKind::Number(text.to_string())))
}

fn parse_word(input: &str) -> IResult<&str, TokenKind> {
    map(
        take_while1(|c: char| c.is_alphanumeric() || c == '_' || c == '.'),
        |word: &str| match Keyword::lookup(word) {
            Some(kw) => TokenKind::Keyword(kw),
            None => TokenKind::Ident(word.to_string()),
        },
    )(input)
}

fn parse_symbol(input: &str) -> IResult<&str, TokenKind> {
    alt((
        value(TokenKind::GtEq, tag(">=")),
        value(TokenKind::LtEq, tag("<=")),
        value(TokenKind::NotEq, tag("!=")),
        value(TokenKind::NotEq, tag("<>")),
        value(TokenKind::Eq, char('=')),
        value(TokenKind::Gt, char('>')),
        value(TokenKind::Lt, char('<')),
        value(TokenKind::Comma, char(',')),
        value(TokenKind::LParen, char('(')),
        value(TokenKind::RParen, char(')')),
    ))(input)
}

/// A run of characters that start no other token.
fn parse_unknown(input: &str) -> IResult<&str, TokenKind> {
    map(
        take_while1(|c: char| {
            !(c.is_whitespace()
                || c.is_alphanumeric()
                || "_.'\",()=!<>".contains(c))
        }),
        |s: &str| TokenKind::Unknown(s.to_string()),
    )(input)
}

//! GAQL parser.
//!
//! Parses GAQL text into a [`Query`] in four steps: normalization (comments
//! and whitespace), tokenizing with nom, a token-stream grammar, and a
//! transform that reassembles compound operators and fills defaults.
//!
//! ```text
//! SELECT campaign.id, metrics.clicks
//! FROM campaign
//! WHERE segments.date DURING LAST_7_DAYS AND metrics.clicks > 10
//! ORDER BY metrics.clicks DESC
//! LIMIT 10
//! ```

pub mod grammar;
pub mod tokens;
pub mod transform;

#[cfg(test)]
mod tests;

use crate::ast::Query;
use crate::clause::{self, Clause};
use crate::error::{GaqlError, GaqlResult};

pub use tokens::{Keyword, Token, TokenKind};
pub use transform::{check_required_clauses, missing_clauses_message};

/// Parse a complete GAQL query string.
pub fn parse(input: &str) -> GaqlResult<Query> {
    let text = clause::normalize(input);

    let result = parse_normalized(&text);
    if let Err(err) = &result {
        tracing::debug!(error = %err, "parse failed");
        let missing = missing_clauses(&text);
        if missing.contains(&Clause::From) {
            if let Some(message) = missing_clauses_message(&missing) {
                return Err(GaqlError::syntax_at(text.len(), message));
            }
        }
    }
    result
}

fn parse_normalized(text: &str) -> GaqlResult<Query> {
    let tokens = tokens::tokenize(text)?;
    let tree = grammar::parse_tokens(&tokens, text.len())?;
    let query = transform::transform(tree)?;
    check_required_clauses(&query)?;
    Ok(query)
}

/// Required clause keywords that do not appear in the text.
fn missing_clauses(text: &str) -> Vec<Clause> {
    let written: Vec<Clause> = clause::clause_positions(text)
        .iter()
        .map(|m| m.clause)
        .collect();
    [Clause::Select, Clause::From]
        .into_iter()
        .filter(|clause| !written.contains(clause))
        .collect()
}

//! Query formatter.
//!
//! Puts every clause on its own line and the WHERE conditions on an indented
//! continuation line:
//!
//! ```text
//! SELECT campaign.id, metrics.clicks
//! FROM campaign
//! WHERE
//!   segments.date DURING LAST_7_DAYS AND metrics.clicks > 10
//! ORDER BY metrics.clicks DESC
//! LIMIT 10
//! ```
//!
//! Works on text, so it also lays out queries that do not parse.

use crate::clause::{self, Clause};

pub const DEFAULT_INDENT: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Formatter {
    indent: usize,
}

impl Default for Formatter {
    fn default() -> Self {
        Self::new()
    }
}

impl Formatter {
    pub fn new() -> Self {
        Self {
            indent: DEFAULT_INDENT,
        }
    }

    pub fn with_indent(indent: usize) -> Self {
        Self { indent }
    }

    pub fn format(&self, text: &str) -> String {
        let normalized = clause::normalize(text);
        let (prefix, segments) = clause::segments(&normalized);
        if segments.is_empty() {
            return normalized;
        }

        let mut lines = Vec::with_capacity(segments.len() + 1);
        if !prefix.is_empty() {
            lines.push(prefix.to_string());
        }

        for seg in segments {
            let line = match seg.clause {
                Clause::Select => format!("SELECT {}", join_items(seg.body, |item| item.to_string())),
                Clause::Where if !seg.body.is_empty() => {
                    format!("WHERE\n{}{}", " ".repeat(self.indent), seg.body)
                }
                Clause::OrderBy => format!("ORDER BY {}", join_items(seg.body, ordering_item)),
                Clause::Parameters => {
                    format!("PARAMETERS {}", join_items(seg.body, parameter_item))
                }
                other => format!("{} {}", other.keyword(), seg.body),
            };
            lines.push(line.trim_end().to_string());
        }

        lines.join("\n")
    }
}

/// Format with the default indentation.
pub fn format_query(text: &str) -> String {
    Formatter::default().format(text)
}

fn join_items(body: &str, item: impl Fn(&str) -> String) -> String {
    split_top_level(body, ',')
        .into_iter()
        .map(|part| item(part.trim()))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Canonical `field DIR`; a missing direction becomes ASC.
fn ordering_item(item: &str) -> String {
    if item.is_empty() {
        return String::new();
    }
    let mut words: Vec<&str> = item.split_whitespace().collect();
    let direction = match words.last().map(|w| w.to_ascii_uppercase()) {
        Some(w) if words.len() > 1 && (w == "ASC" || w == "ASCENDING") => "ASC",
        Some(w) if words.len() > 1 && (w == "DESC" || w == "DESCENDING") => "DESC",
        _ => {
            words.push("ASC");
            return words.join(" ");
        }
    };
    words.pop();
    words.push(direction);
    words.join(" ")
}

/// `name = value` becomes `name=value`.
fn parameter_item(item: &str) -> String {
    match item.split_once('=') {
        Some((name, value)) => format!("{}={}", name.trim(), value.trim()),
        None => item.to_string(),
    }
}

/// Split on `sep` outside quotes and parentheses.
pub(crate) fn split_top_level(text: &str, sep: char) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut quote: Option<char> = None;
    let mut depth = 0usize;
    let mut start = 0;

    for (i, c) in text.char_indices() {
        match (quote, c) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '\'' | '"') => quote = Some(c),
            (None, '(') => depth += 1,
            (None, ')') => depth = depth.saturating_sub(1),
            (None, c) if c == sep && depth == 0 => {
                parts.push(&text[start..i]);
                start = i + c.len_utf8();
            }
            _ => {}
        }
    }
    parts.push(&text[start..]);
    parts
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout() {
        let text = "SELECT campaign.id,campaign.name FROM campaign WHERE campaign.status = 'ENABLED' \
                    AND metrics.clicks > 10 ORDER BY metrics.clicks DESCENDING LIMIT 10";
        assert_eq!(
            format_query(text),
            "SELECT campaign.id, campaign.name\n\
             FROM campaign\n\
             WHERE\n  campaign.status = 'ENABLED' AND metrics.clicks > 10\n\
             ORDER BY metrics.clicks DESC\n\
             LIMIT 10"
        );
    }

    #[test]
    fn test_default_direction_is_added() {
        assert_eq!(
            format_query("SELECT a.b FROM c ORDER BY a.b, a.c desc"),
            "SELECT a.b\nFROM c\nORDER BY a.b ASC, a.c DESC"
        );
    }

    #[test]
    fn test_custom_indent() {
        let formatted = Formatter::with_indent(4).format("SELECT a.b FROM c WHERE a.b = 1");
        assert_eq!(formatted, "SELECT a.b\nFROM c\nWHERE\n    a.b = 1");
    }

    #[test]
    fn test_parameters() {
        assert_eq!(
            format_query("SELECT a.b FROM c PARAMETERS include_drafts = true"),
            "SELECT a.b\nFROM c\nPARAMETERS include_drafts=true"
        );
    }

    #[test]
    fn test_idempotent() {
        for text in [
            "SELECT a.b FROM c WHERE a.b IN ('x', 'y') AND a.c = 'd,e' ORDER BY a.b LIMIT 1",
            "junk SELECT a.b, FROM c",
            "FROM c SELECT a.b",
            "no clauses here",
            "SELECT a.b FROM c WHERE",
        ] {
            let once = format_query(text);
            assert_eq!(format_query(&once), once, "{}", text);
        }
    }

    #[test]
    fn test_split_top_level() {
        assert_eq!(split_top_level("a, (b, c), 'd,e'", ','), vec!["a", " (b, c)", " 'd,e'"]);
    }
}

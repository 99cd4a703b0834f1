//! Text-pattern repair for queries that do not parse.
//!
//! A fixed sequence of regex rewrites, each logging what it changed.
//! Matches inside quoted strings are never touched.

use std::ops::Range;

use regex::{Captures, Regex};

use crate::ast::DateRange;
use crate::clause::{self, Clause};
use crate::fmt::Formatter;
use crate::parser::Keyword;
use crate::rules::Rules;

use super::{DEFAULT_FIELD, DEFAULT_RESOURCE};

/// Misspellings the resource rewrite knows about, keyed lower-case.
const RESOURCE_TYPOS: &[(&str, &str)] = &[
    ("campaing", "campaign"),
    ("campain", "campaign"),
    ("campagin", "campaign"),
    ("compaign", "campaign"),
    ("adgroup", "ad_group"),
    ("adgroups", "ad_group"),
    ("ad_groups", "ad_group"),
    ("adgroupad", "ad_group_ad"),
    ("ads", "ad_group_ad"),
    ("keywords", "keyword_view"),
    ("search_terms", "search_term_view"),
];

const PARAMETER_TYPOS: &[(&str, &str)] = &[
    ("include_draft", "include_drafts"),
    ("includedrafts", "include_drafts"),
    ("include_drafs", "include_drafts"),
    ("omit_unselected_resource_name", "omit_unselected_resource_names"),
    ("omit_unselected_resources", "omit_unselected_resource_names"),
    ("omit_unselected", "omit_unselected_resource_names"),
];

pub struct PatternRepair {
    rules: Rules,
    formatter: Formatter,
    limit_equals: Regex,
    glued_keyword: Regex,
    lower_keyword: Regex,
    bare_field_list: Regex,
    select_list: Regex,
    date_comparison: Regex,
    equals_word: Regex,
    from_resource: Regex,
    bare_symbolic: Regex,
    bare_word_operator: Regex,
    parameter_name: Regex,
    long_direction: Regex,
}

impl PatternRepair {
    pub fn new(rules: Rules, formatter: Formatter) -> Self {
        let date_fields: Vec<String> = rules.date_fields.iter().map(|f| regex::escape(f)).collect();
        Self {
            rules,
            formatter,
            limit_equals: Regex::new(r"(?i)\bLIMIT\s*=\s*(\d+)").unwrap(),
            glued_keyword: Regex::new(
                r#"\b(SELECT|FROM|WHERE|ORDER BY|LIMIT|PARAMETERS)([a-z0-9('"*])"#,
            )
            .unwrap(),
            lower_keyword: Regex::new(r"(?i)\b(select|from|where|order\s+by|limit|parameters)\b")
                .unwrap(),
            bare_field_list: Regex::new(r"^[\w.]+(?:\s*,\s*[\w.]+)*\s+FROM\b").unwrap(),
            select_list: Regex::new(r"^\s*SELECT\s+[\w.]+(?:\s*,\s*[\w.]+)*").unwrap(),
            date_comparison: Regex::new(&format!(
                r"(?i)\b({})\s*(>=|<=|!=|=|>|<|\bEQUALS\b|\bEQUAL\b)\s*([A-Za-z_][A-Za-z0-9_]*|\d+)",
                date_fields.join("|")
            ))
            .unwrap(),
            equals_word: Regex::new(r"(?i)\s+(EQUALS?)\s+").unwrap(),
            from_resource: Regex::new(r"\bFROM\s+([A-Za-z_]\w*)").unwrap(),
            bare_symbolic: Regex::new(r"([A-Za-z_]\w*\.[\w.]*\w)\s*(!=|=)\s*([A-Za-z_][\w-]*)")
                .unwrap(),
            bare_word_operator: Regex::new(
                r"([A-Za-z_]\w*\.[\w.]*\w)\s+(NOT\s+LIKE|LIKE|NOT\s+IN|IN|NOT\s+REGEXP_MATCH|REGEXP_MATCH|CONTAINS\s+ANY|CONTAINS\s+ALL|CONTAINS\s+NONE)\s+([A-Za-z_][\w-]*)",
            )
            .unwrap(),
            parameter_name: Regex::new(r"\b([A-Za-z_]\w*)\s*=").unwrap(),
            long_direction: Regex::new(r"(?i)\b(ASCENDING|DESCENDING)\b").unwrap(),
        }
    }

    /// Apply every rewrite in order and finish with formatting.
    pub fn repair(&self, text: &str) -> (String, Vec<String>) {
        let mut changes = Vec::new();
        let mut text = clause::normalize(text);

        text = self.fix_keyword_spacing(&text, &mut changes);
        text = self.fix_keyword_case(&text, &mut changes);
        text = self.fix_missing_select(&text, &mut changes);
        text = self.fix_missing_from(&text, &mut changes);
        text = self.fix_clause_order(&text, &mut changes);
        text = self.fix_date_operators(&text, &mut changes);
        text = self.fix_equals_word(&text, &mut changes);
        text = self.fix_resource_typos(&text, &mut changes);
        text = self.fix_missing_quotes(&text, &mut changes);
        text = self.fix_parameter_names(&text, &mut changes);
        text = self.fix_directions(&text, &mut changes);

        for change in &changes {
            tracing::debug!(change = %change, "pattern repair");
        }
        (self.formatter.format(&text), changes)
    }

    fn fix_keyword_spacing(&self, text: &str, changes: &mut Vec<String>) -> String {
        let text = rewrite(&self.limit_equals, text, |caps, _, _| {
            changes.push(format!("Fixed LIMIT syntax: '{}' -> 'LIMIT {}'", &caps[0], &caps[1]));
            Some(format!("LIMIT {}", &caps[1]))
        });
        let mut glued = false;
        let text = rewrite(&self.glued_keyword, &text, |caps, _, _| {
            glued = true;
            Some(format!("{} {}", &caps[1], &caps[2]))
        });
        if glued {
            changes.push("Added missing whitespace after clause keyword.".to_string());
        }
        text
    }

    fn fix_keyword_case(&self, text: &str, changes: &mut Vec<String>) -> String {
        let mut converted: Vec<String> = Vec::new();
        let text = rewrite(&self.lower_keyword, text, |caps, before, after| {
            let word = &caps[1];
            if before == Some('.') || after == Some('.') {
                return None;
            }
            let upper = word
                .split_whitespace()
                .map(str::to_uppercase)
                .collect::<Vec<_>>()
                .join(" ");
            if upper == word {
                return None;
            }
            converted.push(word.to_string());
            Some(upper)
        });
        if !converted.is_empty() {
            changes.push(format!(
                "Converted clause keywords to upper case: {}",
                converted.join(", ")
            ));
        }
        text
    }

    fn fix_missing_select(&self, text: &str, changes: &mut Vec<String>) -> String {
        if has_clause(text, Clause::Select) {
            return text.to_string();
        }
        if self.bare_field_list.is_match(text) {
            changes.push("Added missing SELECT keyword.".to_string());
            return format!("SELECT {}", text);
        }
        changes.push("Added missing SELECT clause.".to_string());
        format!("SELECT {} {}", DEFAULT_FIELD, text).trim_end().to_string()
    }

    fn fix_missing_from(&self, text: &str, changes: &mut Vec<String>) -> String {
        if !has_clause(text, Clause::Select) || has_clause(text, Clause::From) {
            return text.to_string();
        }
        changes.push(format!(
            "Added missing FROM clause with default resource '{}'.",
            DEFAULT_RESOURCE
        ));
        match self.select_list.find(text) {
            Some(m) => format!(
                "{} FROM {}{}",
                &text[..m.end()],
                DEFAULT_RESOURCE,
                &text[m.end()..]
            ),
            None => format!("{} FROM {}", text.trim_end(), DEFAULT_RESOURCE),
        }
    }

    /// Rebuild the query with clauses in canonical order, merging repeated
    /// WHERE clauses and dropping other repeats.
    fn fix_clause_order(&self, text: &str, changes: &mut Vec<String>) -> String {
        let problems = clause::layout_problems(text);
        if problems.is_empty() {
            return text.to_string();
        }

        let (prefix, mut segments) = clause::segments(text);
        segments.sort_by_key(|s| s.clause);

        let mut parts: Vec<String> = Vec::new();
        if !prefix.is_empty() {
            parts.push(prefix.to_string());
        }
        let mut last: Option<Clause> = None;
        for seg in segments {
            if last == Some(seg.clause) {
                if seg.clause == Clause::Where {
                    if let Some(prev) = parts.last_mut() {
                        prev.push_str(" AND ");
                        prev.push_str(seg.body);
                    }
                    changes.push("Merged duplicate WHERE clauses with AND.".to_string());
                } else {
                    changes.push(format!(
                        "Removed duplicate {} clause: '{}'",
                        seg.clause, seg.body
                    ));
                }
                continue;
            }
            parts.push(format!("{} {}", seg.clause.keyword(), seg.body).trim_end().to_string());
            last = Some(seg.clause);
        }

        if problems
            .iter()
            .any(|p| matches!(p, clause::LayoutProblem::OutOfOrder { .. }))
        {
            changes.push("Fixed clause ordering.".to_string());
        }
        parts.join(" ")
    }

    fn fix_date_operators(&self, text: &str, changes: &mut Vec<String>) -> String {
        rewrite(&self.date_comparison, text, |caps, _, after| {
            let (field, op, value) = (&caps[1], &caps[2], &caps[3]);
            let (new_op, value) = if let Ok(range) = value.parse::<DateRange>() {
                ("DURING", range.to_string())
            } else if value.bytes().all(|b| b.is_ascii_digit()) {
                // Unquoted dates such as 2024-01-01 are left alone.
                if matches!(after, Some('-' | '.' | '/')) {
                    return None;
                }
                ("BETWEEN", value.to_string())
            } else {
                return None;
            };
            changes.push(format!(
                "Fixed incompatible operator for {}: '{}' -> '{}'",
                field, op, new_op
            ));
            Some(format!("{} {} {}", field, new_op, value))
        })
    }

    fn fix_equals_word(&self, text: &str, changes: &mut Vec<String>) -> String {
        rewrite(&self.equals_word, text, |caps, _, _| {
            changes.push(format!("Fixed operator: '{}' -> '='", &caps[1]));
            Some(" = ".to_string())
        })
    }

    fn fix_resource_typos(&self, text: &str, changes: &mut Vec<String>) -> String {
        rewrite(&self.from_resource, text, |caps, _, _| {
            let name = &caps[1];
            if self.rules.is_resource(name) {
                return None;
            }
            let lower = name.to_lowercase();
            let fixed = RESOURCE_TYPOS
                .iter()
                .find(|(typo, _)| *typo == lower)
                .map(|(_, fixed)| *fixed)
                .or_else(|| self.rules.resources.iter().copied().find(|r| *r == lower))
                .or_else(|| {
                    let singular = lower.strip_suffix('s')?;
                    self.rules.resources.iter().copied().find(|r| *r == singular)
                })?;
            changes.push(format!("Fixed misspelled resource: '{}' -> '{}'", name, fixed));
            Some(format!("FROM {}", fixed))
        })
    }

    fn fix_missing_quotes(&self, text: &str, changes: &mut Vec<String>) -> String {
        let text = rewrite(&self.bare_symbolic, text, |caps, _, after| {
            quote_bare_value(caps, after, changes)
        });
        rewrite(&self.bare_word_operator, &text, |caps, _, after| {
            quote_bare_value(caps, after, changes)
        })
    }

    fn fix_parameter_names(&self, text: &str, changes: &mut Vec<String>) -> String {
        let Some(params) = clause::clause_positions(text)
            .into_iter()
            .find(|m| m.clause == Clause::Parameters)
        else {
            return text.to_string();
        };

        let (head, tail) = text.split_at(params.end);
        let tail = rewrite(&self.parameter_name, tail, |caps, _, _| {
            let name = &caps[1];
            let (_, fixed) = PARAMETER_TYPOS
                .iter()
                .find(|(typo, _)| typo.eq_ignore_ascii_case(name))?;
            changes.push(format!("Fixed parameter name: '{}' -> '{}'", name, fixed));
            Some(format!("{}{}", fixed, &caps[0][name.len()..]))
        });
        format!("{}{}", head, tail)
    }

    fn fix_directions(&self, text: &str, changes: &mut Vec<String>) -> String {
        rewrite(&self.long_direction, text, |caps, _, _| {
            let word = &caps[1];
            let short = if word.eq_ignore_ascii_case("ASCENDING") {
                "ASC"
            } else {
                "DESC"
            };
            changes.push(format!("Fixed sort direction: '{}' -> '{}'", word, short));
            Some(short.to_string())
        })
    }
}

/// `field op value` with the value wrapped in single quotes, when it is a
/// bare word rather than a literal.
fn quote_bare_value(
    caps: &Captures<'_>,
    after: Option<char>,
    changes: &mut Vec<String>,
) -> Option<String> {
    let (field, op, value) = (&caps[1], &caps[2], &caps[3]);
    if matches!(after, Some('.' | '(')) || !needs_quotes(value) {
        return None;
    }
    changes.push(format!(
        "Added missing quotes around string value: {} -> '{}'",
        value, value
    ));
    let op = op.split_whitespace().collect::<Vec<_>>().join(" ");
    Some(format!("{} {} '{}'", field, op, value))
}

fn has_clause(text: &str, clause: Clause) -> bool {
    clause::clause_positions(text)
        .iter()
        .any(|m| m.clause == clause)
}

/// Bare words that are not already valid literals.
fn needs_quotes(value: &str) -> bool {
    !(value.parse::<DateRange>().is_ok()
        || value.eq_ignore_ascii_case("true")
        || value.eq_ignore_ascii_case("false")
        || Keyword::lookup(value).is_some())
}

/// Byte ranges of quoted strings, quotes included.
fn quoted_ranges(text: &str) -> Vec<Range<usize>> {
    let mut ranges = Vec::new();
    let mut open: Option<(char, usize)> = None;
    for (i, c) in text.char_indices() {
        match open {
            Some((q, start)) if c == q => {
                ranges.push(start..i + 1);
                open = None;
            }
            Some(_) => {}
            None if c == '\'' || c == '"' => open = Some((c, i)),
            None => {}
        }
    }
    if let Some((_, start)) = open {
        ranges.push(start..text.len());
    }
    ranges
}

/// Replace matches of `re` that start outside quoted strings.
///
/// `replace` receives the captures and the characters just before and after
/// the match; returning `None` keeps the match as written.
fn rewrite<F>(re: &Regex, text: &str, mut replace: F) -> String
where
    F: FnMut(&Captures<'_>, Option<char>, Option<char>) -> Option<String>,
{
    let quoted = quoted_ranges(text);
    let mut out = String::with_capacity(text.len());
    let mut last = 0;

    for caps in re.captures_iter(text) {
        let Some(m) = caps.get(0) else {
            continue;
        };
        if quoted.iter().any(|r| r.contains(&m.start())) {
            continue;
        }
        let before = text[..m.start()].chars().next_back();
        let after = text[m.end()..].chars().next();
        if let Some(replacement) = replace(&caps, before, after) {
            out.push_str(&text[last..m.start()]);
            out.push_str(&replacement);
            last = m.end();
        }
    }
    out.push_str(&text[last..]);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn repair(text: &str) -> (String, Vec<String>) {
        PatternRepair::new(Rules::GAQL, Formatter::with_indent(0)).repair(text)
    }

    #[test]
    fn test_rewrite_skips_quoted_text() {
        let re = Regex::new(r"foo").unwrap();
        let out = rewrite(&re, "foo 'foo' foo", |_, _, _| Some("bar".to_string()));
        assert_eq!(out, "bar 'foo' bar");
    }

    #[test]
    fn test_quoted_ranges() {
        assert_eq!(quoted_ranges("a 'b' \"c"), vec![2..5, 6..8]);
    }

    #[test]
    fn test_needs_quotes() {
        assert!(needs_quotes("test"));
        assert!(needs_quotes("ENABLED"));
        assert!(!needs_quotes("LAST_7_DAYS"));
        assert!(!needs_quotes("true"));
        assert!(!needs_quotes("NULL"));
    }

    #[test]
    fn test_keyword_case_skips_field_segments() {
        let (fixed, _) = repair("select campaign.from from campaign");
        assert_eq!(fixed, "SELECT campaign.from\nFROM campaign");
    }
}

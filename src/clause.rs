//! Clause keywords, text normalization and a quote-aware clause scanner.
//!
//! The scanner works on raw text rather than tokens so that the validator,
//! formatter and repair engine can reason about clause layout even when the
//! query does not parse.

use std::fmt;

/// Top-level clauses in canonical order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Clause {
    Select,
    From,
    Where,
    OrderBy,
    Limit,
    Parameters,
}

impl Clause {
    /// All clauses in the order they must appear.
    pub const ALL: [Clause; 6] = [
        Clause::Select,
        Clause::From,
        Clause::Where,
        Clause::OrderBy,
        Clause::Limit,
        Clause::Parameters,
    ];

    pub fn keyword(&self) -> &'static str {
        match self {
            Clause::Select => "SELECT",
            Clause::From => "FROM",
            Clause::Where => "WHERE",
            Clause::OrderBy => "ORDER BY",
            Clause::Limit => "LIMIT",
            Clause::Parameters => "PARAMETERS",
        }
    }

    fn from_word(word: &str) -> Option<Clause> {
        match word {
            "SELECT" => Some(Clause::Select),
            "FROM" => Some(Clause::From),
            "WHERE" => Some(Clause::Where),
            "LIMIT" => Some(Clause::Limit),
            "PARAMETERS" => Some(Clause::Parameters),
            _ => None,
        }
    }
}

impl fmt::Display for Clause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.keyword())
    }
}

/// A clause keyword found in query text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClauseMatch {
    pub clause: Clause,
    /// Byte offset of the keyword.
    pub start: usize,
    /// Byte offset just past the keyword.
    pub end: usize,
}

/// A clause keyword together with the text that follows it up to the next
/// clause keyword.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Segment<'a> {
    pub clause: Clause,
    pub body: &'a str,
}

/// Strip `--` line comments and collapse whitespace runs outside quotes.
pub fn normalize(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut quote: Option<char> = None;
    let mut pending_space = false;
    let mut chars = input.chars().peekable();

    while let Some(c) = chars.next() {
        if let Some(q) = quote {
            out.push(c);
            if c == q {
                quote = None;
            }
            continue;
        }
        match c {
            '-' if chars.peek() == Some(&'-') => {
                // Comment runs to end of line.
                for skipped in chars.by_ref() {
                    if skipped == '\n' {
                        break;
                    }
                }
                pending_space = true;
            }
            c if c.is_whitespace() => pending_space = true,
            c => {
                if pending_space && !out.is_empty() {
                    out.push(' ');
                }
                pending_space = false;
                if c == '\'' || c == '"' {
                    quote = Some(c);
                }
                out.push(c);
            }
        }
    }
    out
}

fn is_word_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_' || b == b'.'
}

/// Locate upper-case clause keywords outside quoted strings.
///
/// `ORDER` only counts when followed by whitespace and `BY`.
pub fn clause_positions(text: &str) -> Vec<ClauseMatch> {
    let bytes = text.as_bytes();
    let mut found = Vec::new();
    let mut quote: Option<u8> = None;
    let mut i = 0;

    while i < bytes.len() {
        let b = bytes[i];
        if let Some(q) = quote {
            if b == q {
                quote = None;
            }
            i += 1;
            continue;
        }
        if b == b'\'' || b == b'"' {
            quote = Some(b);
            i += 1;
            continue;
        }
        if !is_word_byte(b) {
            i += 1;
            continue;
        }

        let start = i;
        while i < bytes.len() && is_word_byte(bytes[i]) {
            i += 1;
        }
        let word = &text[start..i];

        if let Some(clause) = Clause::from_word(word) {
            found.push(ClauseMatch {
                clause,
                start,
                end: i,
            });
        } else if word == "ORDER" {
            let mut j = i;
            while j < bytes.len() && bytes[j].is_ascii_whitespace() {
                j += 1;
            }
            let by_end = j + 2;
            if j > i
                && text.get(j..by_end) == Some("BY")
                && bytes.get(by_end).is_none_or(|b| !is_word_byte(*b))
            {
                found.push(ClauseMatch {
                    clause: Clause::OrderBy,
                    start,
                    end: by_end,
                });
                i = by_end;
            }
        }
    }
    found
}

/// Split text into the part before the first clause keyword and the clause
/// segments that follow, in written order.
pub fn segments(text: &str) -> (&str, Vec<Segment<'_>>) {
    let positions = clause_positions(text);
    let prefix = match positions.first() {
        Some(first) => text[..first.start].trim(),
        None => text.trim(),
    };
    let segments = positions
        .iter()
        .enumerate()
        .map(|(idx, m)| {
            let stop = positions.get(idx + 1).map_or(text.len(), |next| next.start);
            Segment {
                clause: m.clause,
                body: text[m.end..stop].trim(),
            }
        })
        .collect();
    (prefix, segments)
}

/// Clause layout problems: out-of-order adjacent pairs and repeats.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LayoutProblem {
    /// `earlier` must come before `later` but was written after it.
    OutOfOrder { earlier: Clause, later: Clause },
    Duplicate(Clause),
}

impl fmt::Display for LayoutProblem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LayoutProblem::OutOfOrder { earlier, later } => write!(
                f,
                "Invalid clause order: {} must come before {}",
                earlier, later
            ),
            LayoutProblem::Duplicate(clause) => write!(f, "Duplicate {} clause", clause),
        }
    }
}

/// Check written clause order against the canonical sequence.
pub fn layout_problems(text: &str) -> Vec<LayoutProblem> {
    let positions = clause_positions(text);
    let mut problems = Vec::new();
    let mut seen: Vec<Clause> = Vec::new();

    for m in &positions {
        if seen.contains(&m.clause) {
            let dup = LayoutProblem::Duplicate(m.clause);
            if !problems.contains(&dup) {
                problems.push(dup);
            }
        }
        seen.push(m.clause);
    }

    for pair in positions.windows(2) {
        let (prev, next) = (pair[0].clause, pair[1].clause);
        if next < prev {
            problems.push(LayoutProblem::OutOfOrder {
                earlier: next,
                later: prev,
            });
        }
    }
    problems
}

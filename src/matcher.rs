//! Approximate string matching for "did you mean" suggestions.

/// Candidates must score strictly above this to be suggested.
pub const MATCH_THRESHOLD: f64 = 0.7;

/// Similarity in `[0, 1]`: Levenshtein-based with prefix and first-letter boosts.
pub fn string_similarity(a: &str, b: &str) -> f64 {
    if a.is_empty() && b.is_empty() {
        return 1.0;
    }
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    if a == b {
        return 1.0;
    }

    let a_lower = a.to_lowercase();
    let b_lower = b.to_lowercase();
    if a_lower == b_lower {
        return 0.9;
    }

    let a_chars: Vec<char> = a_lower.chars().collect();
    let b_chars: Vec<char> = b_lower.chars().collect();
    let max_len = a_chars.len().max(b_chars.len()) as f64;

    let a_head: String = a_chars.iter().take(3).collect();
    let b_head: String = b_chars.iter().take(3).collect();
    if a_lower.starts_with(&b_head) || b_lower.starts_with(&a_head) {
        let common = a_chars
            .iter()
            .zip(&b_chars)
            .take_while(|(x, y)| x == y)
            .count();
        if common >= 3 {
            return (common as f64 / max_len + 0.5).min(0.85);
        }
    }

    let distance = strsim::levenshtein(&a_lower, &b_lower) as f64;
    let base = 1.0 - distance / max_len;

    if a_chars[0] == b_chars[0] {
        return (base + 0.1).min(0.95);
    }
    base
}

/// Candidates similar to `value`, best first.
///
/// A case-insensitive exact match is returned alone. Otherwise every
/// candidate scoring above [`MATCH_THRESHOLD`] is returned; equal scores keep
/// the order of `candidates`.
pub fn closest_match<'a>(value: &str, candidates: &[&'a str]) -> Vec<&'a str> {
    if let Some(exact) = candidates.iter().find(|c| c.eq_ignore_ascii_case(value)) {
        return vec![*exact];
    }

    let value = value.to_lowercase();
    let mut scored: Vec<(&'a str, f64)> = candidates
        .iter()
        .map(|c| (*c, string_similarity(&value, &c.to_lowercase())))
        .filter(|(_, score)| *score > MATCH_THRESHOLD)
        .collect();

    // Stable sort keeps slice order for ties.
    scored.sort_by(|x, y| y.1.total_cmp(&x.1));
    scored.into_iter().map(|(c, _)| c).collect()
}

/// Format a "Did you mean" hint for the best suggestion, if any.
pub fn suggestion(value: &str, candidates: &[&str]) -> String {
    match closest_match(value, candidates).first() {
        Some(best) => format!(" Did you mean '{}'?", best),
        None => String::new(),
    }
}

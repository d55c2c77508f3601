//! Action completeness scoring and fuzzy merge similarity

use std::collections::HashSet;

/// Completeness score for an action item.
///
/// 0.4 for a description of at least 10 characters, 0.3 for an owner, 0.3
/// for a deadline; rounded to 2 decimals. Monotonically non-decreasing as
/// fields are filled, since fields are only ever added during merges.
pub fn completeness_score(description: &str, owner: Option<&str>, deadline: Option<&str>) -> f64 {
    let mut score: f64 = 0.0;
    if description.trim().len() >= 10 {
        score += 0.4;
    }
    if owner.is_some_and(|o| !o.trim().is_empty()) {
        score += 0.3;
    }
    if deadline.is_some_and(|d| !d.trim().is_empty()) {
        score += 0.3;
    }
    (score * 100.0).round() / 100.0
}

/// Token-set Jaccard similarity between two descriptions.
///
/// Tokens are lower-cased whitespace-split words; the score is
/// `|intersection| / |union|`. An empty union scores 0.0.
pub fn token_set_jaccard(a: &str, b: &str) -> f64 {
    let tokens_a: HashSet<String> = a.to_lowercase().split_whitespace().map(String::from).collect();
    let tokens_b: HashSet<String> = b.to_lowercase().split_whitespace().map(String::from).collect();

    let union = tokens_a.union(&tokens_b).count();
    if union == 0 {
        return 0.0;
    }
    let intersection = tokens_a.intersection(&tokens_b).count();
    intersection as f64 / union as f64
}

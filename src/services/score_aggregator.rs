//! Score aggregation over persona results.
//!
//! Only completed results contribute. Both functions are pure and cheap enough
//! to rerun after every persona completion.

use crate::domain::models::{CategoryScore, PersonaCategory, PersonaResult};

/// Rounded mean score of completed results, `0` when none completed.
pub fn overall_score(results: &[PersonaResult]) -> u8 {
    let scores: Vec<u8> = results
        .iter()
        .filter(|r| r.is_completed())
        .map(|r| r.score)
        .collect();
    rounded_mean(&scores)
}

/// Per-category rounded mean, in first-seen category order.
///
/// Categories without a completed result produce no entry.
pub fn category_scores(results: &[PersonaResult]) -> Vec<CategoryScore> {
    let mut groups: Vec<(PersonaCategory, Vec<u8>)> = Vec::new();
    for result in results.iter().filter(|r| r.is_completed()) {
        match groups.iter_mut().find(|(c, _)| *c == result.persona_category) {
            Some((_, scores)) => scores.push(result.score),
            None => groups.push((result.persona_category, vec![result.score])),
        }
    }

    groups
        .into_iter()
        .map(|(category, scores)| CategoryScore::new(category, rounded_mean(&scores)))
        .collect()
}

fn rounded_mean(scores: &[u8]) -> u8 {
    if scores.is_empty() {
        return 0;
    }
    let sum: u32 = scores.iter().map(|&s| u32::from(s)).sum();
    (f64::from(sum) / scores.len() as f64).round() as u8
}

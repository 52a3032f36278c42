//! Term-frequency cosine similarity over Unicode words.

use std::collections::HashMap;

use unicode_segmentation::UnicodeSegmentation;

/// Term counts of a text.
pub type TermVector = HashMap<String, f64>;

/// Splits `text` into lowercase Unicode words and counts them.
#[must_use]
pub fn term_vector(text: &str) -> TermVector {
    let mut terms = TermVector::new();
    for word in text.unicode_words() {
        *terms.entry(word.to_lowercase()).or_insert(0.0) += 1.0;
    }
    terms
}

fn norm(v: &TermVector) -> f64 {
    v.values().map(|x| x * x).sum::<f64>().sqrt()
}

/// Cosine distance (`1 - cos`) between two term vectors.
///
/// Returns `1.0` when either vector is empty or they share no term.
#[must_use]
pub fn cosine_distance(a: &TermVector, b: &TermVector) -> f64 {
    let (small, large) = if a.len() <= b.len() { (a, b) } else { (b, a) };
    let dot: f64 = small
        .iter()
        .filter_map(|(term, x)| large.get(term).map(|y| x * y))
        .sum();
    let denom = norm(a) * norm(b);
    if dot <= 0.0 || denom <= 0.0 {
        return 1.0;
    }
    (1.0 - dot / denom).clamp(0.0, 1.0)
}

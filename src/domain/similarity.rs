//! Trigram similarity compatible with Postgres `pg_trgm`.
//!
//! Text is lowercased and split into words on non-alphanumeric characters.
//! Each word is padded with two leading blanks and one trailing blank before
//! its trigrams are taken, and the similarity of two strings is the number of
//! shared distinct trigrams divided by the size of their union.

use std::collections::BTreeSet;

/// Default similarity floor for related-post matching (`pg_trgm` default).
pub const DEFAULT_SIMILARITY_THRESHOLD: f64 = 0.6;

pub type Trigram = [char; 3];

pub fn trigrams(text: &str) -> BTreeSet<Trigram> {
    let mut set = BTreeSet::new();
    let lowered = text.to_lowercase();

    for word in lowered
        .split(|c: char| !c.is_alphanumeric())
        .filter(|word| !word.is_empty())
    {
        let padded: Vec<char> = "  "
            .chars()
            .chain(word.chars())
            .chain(std::iter::once(' '))
            .collect();
        for window in padded.windows(3) {
            set.insert([window[0], window[1], window[2]]);
        }
    }

    set
}

pub fn similarity(left: &str, right: &str) -> f64 {
    let left = trigrams(left);
    let right = trigrams(right);
    if left.is_empty() || right.is_empty() {
        return 0.0;
    }

    let shared = left.intersection(&right).count();
    let union = left.len() + right.len() - shared;
    shared as f64 / union as f64
}

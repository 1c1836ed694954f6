//! Term-frequency ranking for free-text post search.
//!
//! Query and documents are tokenized into lowercase alphanumeric terms. A
//! document matches only when it contains every distinct query term, and
//! matches are scored with BM25 so frequent, rare terms in short documents
//! rank first.

use std::cmp::Ordering;
use std::collections::{BTreeSet, HashMap};

const BM25_K1: f64 = 1.2;
const BM25_B: f64 = 0.75;

pub fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|token| !token.is_empty())
        .map(str::to_lowercase)
        .collect()
}

/// Distinct query terms in first-seen order.
pub fn query_terms(query: &str) -> Vec<String> {
    let mut seen = BTreeSet::new();
    tokenize(query)
        .into_iter()
        .filter(|term| seen.insert(term.clone()))
        .collect()
}

struct IndexedDocument {
    term_freq: HashMap<String, u32>,
    len: usize,
}

impl IndexedDocument {
    fn new(text: &str) -> Self {
        let tokens = tokenize(text);
        let len = tokens.len();
        let mut term_freq = HashMap::new();
        for token in tokens {
            *term_freq.entry(token).or_insert(0) += 1;
        }
        Self { term_freq, len }
    }

    fn contains_all(&self, terms: &[String]) -> bool {
        terms.iter().all(|term| self.term_freq.contains_key(term))
    }
}

/// Rank `documents` against `query`.
///
/// Returns `(index, score)` for every matching document, highest score first.
/// Equal scores keep the input order, so callers control tie-breaking by the
/// order they pass documents in.
pub fn rank<S: AsRef<str>>(query: &str, documents: &[S]) -> Vec<(usize, f64)> {
    let terms = query_terms(query);
    if terms.is_empty() || documents.is_empty() {
        return Vec::new();
    }

    let indexed: Vec<IndexedDocument> = documents
        .iter()
        .map(|doc| IndexedDocument::new(doc.as_ref()))
        .collect();

    let total_docs = indexed.len() as f64;
    let avg_len = indexed.iter().map(|doc| doc.len).sum::<usize>() as f64 / total_docs;

    let doc_freq: HashMap<&str, usize> = terms
        .iter()
        .map(|term| {
            let count = indexed
                .iter()
                .filter(|doc| doc.term_freq.contains_key(term))
                .count();
            (term.as_str(), count)
        })
        .collect();

    let mut scored: Vec<(usize, f64)> = indexed
        .iter()
        .enumerate()
        .filter(|(_, doc)| doc.contains_all(&terms))
        .map(|(index, doc)| (index, bm25(&terms, doc, &doc_freq, total_docs, avg_len)))
        .collect();

    scored.sort_by(|(_, left), (_, right)| right.partial_cmp(left).unwrap_or(Ordering::Equal));
    scored
}

fn bm25(
    terms: &[String],
    doc: &IndexedDocument,
    doc_freq: &HashMap<&str, usize>,
    total_docs: f64,
    avg_len: f64,
) -> f64 {
    let length_norm = 1.0 - BM25_B + BM25_B * (doc.len as f64 / avg_len.max(1.0));

    terms
        .iter()
        .filter_map(|term| {
            let tf = f64::from(*doc.term_freq.get(term)?);
            let df = *doc_freq.get(term.as_str()).unwrap_or(&0) as f64;
            let idf = ((total_docs - df + 0.5) / (df + 0.5)).ln_1p();
            Some(idf * (tf * (BM25_K1 + 1.0)) / (tf + BM25_K1 * length_norm))
        })
        .sum()
}

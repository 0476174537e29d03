//! TF-IDF vectorization of free-text descriptions.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use super::stopwords::ENGLISH_STOP_WORDS;

/// A sparse row: `(term index, weight)` pairs sorted by term index.
pub type SparseRow = Vec<(usize, f64)>;

/// The vectorized corpus.
#[derive(Debug, Clone)]
pub struct TfidfMatrix {
    pub rows: Vec<SparseRow>,
    pub vocabulary: Vec<String>,
}

impl TfidfMatrix {
    pub fn n_terms(&self) -> usize {
        self.vocabulary.len()
    }
}

/// Splits `text` into lowercase tokens of at least two word characters.
pub fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| !(c.is_alphanumeric() || c == '_'))
        .filter(|t| t.chars().count() >= 2)
        .map(str::to_lowercase)
        .collect()
}

/// Builds smoothed, L2-normalized TF-IDF rows over the vocabulary of `documents`.
///
/// Weights are `count * (ln((1 + n) / (1 + df)) + 1)`. Stop-words are dropped
/// before counting. A document with no remaining terms becomes an empty row.
pub fn vectorize<S: AsRef<str>>(documents: &[S]) -> TfidfMatrix {
    let stop: HashSet<&str> = ENGLISH_STOP_WORDS.iter().copied().collect();

    let counts: Vec<HashMap<String, usize>> = documents
        .iter()
        .map(|doc| {
            let mut tf = HashMap::new();
            for token in tokenize(doc.as_ref()) {
                if stop.contains(token.as_str()) {
                    continue;
                }
                *tf.entry(token).or_insert(0) += 1;
            }
            tf
        })
        .collect();

    let vocabulary: Vec<String> = counts
        .iter()
        .flat_map(|tf| tf.keys().cloned())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();
    let index: HashMap<&str, usize> = vocabulary
        .iter()
        .enumerate()
        .map(|(i, t)| (t.as_str(), i))
        .collect();

    let mut df = vec![0usize; vocabulary.len()];
    for tf in &counts {
        for term in tf.keys() {
            df[index[term.as_str()]] += 1;
        }
    }

    let n = documents.len() as f64;
    let idf: Vec<f64> = df
        .iter()
        .map(|&d| ((1.0 + n) / (1.0 + d as f64)).ln() + 1.0)
        .collect();

    let rows = counts
        .iter()
        .map(|tf| {
            let weighted: BTreeMap<usize, f64> = tf
                .iter()
                .map(|(term, &c)| {
                    let i = index[term.as_str()];
                    (i, c as f64 * idf[i])
                })
                .collect();
            let norm = weighted.values().map(|w| w * w).sum::<f64>().sqrt();
            weighted
                .into_iter()
                .map(|(i, w)| (i, if norm > 0.0 { w / norm } else { w }))
                .collect::<SparseRow>()
        })
        .collect();

    TfidfMatrix { rows, vocabulary }
}

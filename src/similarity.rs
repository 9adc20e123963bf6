// 🔍 N-gram Similarity Index - TF-IDF cosine over character n-grams
// Builds one sparse vector per vocabulary value and reports the top-N most
// similar neighbors per value above a threshold.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Characters removed before n-gram extraction. Commas, hyphens, periods and
/// slashes vary freely between renditions of the same name or address.
const STRIPPED_PUNCTUATION: [char; 4] = [',', '-', '.', '/'];

/// Default sliding-window width in characters.
pub const DEFAULT_NGRAM_WINDOW: usize = 5;

// ============================================================================
// SIMILARITY EDGE
// ============================================================================

/// One pairwise similarity above threshold. `left` and `right` are indices
/// into the vocabulary the index was built from; `score` is cosine
/// similarity in [0, 1]. Both directions of a pair are emitted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimilarityEdge {
    pub left: usize,
    pub right: usize,
    pub score: f64,
}

// ============================================================================
// N-GRAM EXTRACTION
// ============================================================================

/// Overlapping character n-grams of `window` width. Strings shorter than
/// the window produce no n-grams; such values simply get no similarity
/// edges, which is not an error.
pub fn ngrams(text: &str, window: usize) -> Vec<String> {
    let chars: Vec<char> = text
        .chars()
        .filter(|c| !STRIPPED_PUNCTUATION.contains(c))
        .collect();
    if window == 0 || chars.len() < window {
        return Vec::new();
    }
    chars
        .windows(window)
        .map(|w| w.iter().collect())
        .collect()
}

// ============================================================================
// TF-IDF INDEX
// ============================================================================

/// Sparse TF-IDF vectors over a fixed vocabulary of strings.
///
/// Term ids are assigned in first-encounter order and every sparse vector
/// keeps its terms sorted, so scoring never depends on hash iteration
/// order: identical input produces identical edges.
pub struct NgramIndex {
    /// One sparse L2-normalized vector per vocabulary value,
    /// sorted by term id
    vectors: Vec<Vec<(usize, f64)>>,
}

impl NgramIndex {
    /// Weight n-grams with smoothed inverse document frequency
    /// (idf = ln((1 + n) / (1 + df)) + 1) and L2-normalize each vector.
    pub fn build(vocabulary: &[String], window: usize) -> Self {
        let mut term_ids: HashMap<String, usize> = HashMap::new();
        let mut doc_terms: Vec<Vec<(usize, usize)>> = Vec::with_capacity(vocabulary.len());

        for value in vocabulary {
            let mut counts: HashMap<usize, usize> = HashMap::new();
            for gram in ngrams(value, window) {
                let next_id = term_ids.len();
                let id = *term_ids.entry(gram).or_insert(next_id);
                *counts.entry(id).or_insert(0) += 1;
            }
            let mut terms: Vec<(usize, usize)> = counts.into_iter().collect();
            terms.sort_by_key(|&(id, _)| id);
            doc_terms.push(terms);
        }

        let mut document_frequency = vec![0usize; term_ids.len()];
        for terms in &doc_terms {
            for &(id, _) in terms {
                document_frequency[id] += 1;
            }
        }

        let doc_count = vocabulary.len() as f64;
        let vectors = doc_terms
            .into_iter()
            .map(|terms| {
                let mut vector: Vec<(usize, f64)> = terms
                    .into_iter()
                    .map(|(id, tf)| {
                        let idf = ((1.0 + doc_count) / (1.0 + document_frequency[id] as f64)).ln()
                            + 1.0;
                        (id, tf as f64 * idf)
                    })
                    .collect();
                let norm = vector.iter().map(|(_, w)| w * w).sum::<f64>().sqrt();
                if norm > 0.0 {
                    for (_, w) in &mut vector {
                        *w /= norm;
                    }
                }
                vector
            })
            .collect();

        NgramIndex { vectors }
    }

    pub fn len(&self) -> usize {
        self.vectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vectors.is_empty()
    }

    /// The sparse set of (left, right, score) pairs with left != right,
    /// score >= threshold, and at most `top_n` neighbors per row.
    ///
    /// Neighbors of a row are ordered by descending score with ties broken
    /// by vocabulary order before the cut, so output is reproducible.
    pub fn top_n_pairs(&self, top_n: usize, threshold: f64) -> Vec<SimilarityEdge> {
        let mut edges = Vec::new();
        if self.vectors.is_empty() {
            return edges;
        }

        // Inverted index: term id -> (document, weight)
        let mut postings: HashMap<usize, Vec<(usize, f64)>> = HashMap::new();
        for (doc, vector) in self.vectors.iter().enumerate() {
            for &(term, weight) in vector {
                postings.entry(term).or_default().push((doc, weight));
            }
        }

        for (left, vector) in self.vectors.iter().enumerate() {
            let mut scores: HashMap<usize, f64> = HashMap::new();
            for &(term, weight) in vector {
                if let Some(entries) = postings.get(&term) {
                    for &(right, other_weight) in entries {
                        if right != left {
                            *scores.entry(right).or_insert(0.0) += weight * other_weight;
                        }
                    }
                }
            }

            let mut neighbors: Vec<(usize, f64)> = scores
                .into_iter()
                .filter(|&(_, score)| score >= threshold)
                .collect();
            neighbors.sort_by(|a, b| {
                b.1.partial_cmp(&a.1)
                    .unwrap_or(std::cmp::Ordering::Equal)
                    .then(a.0.cmp(&b.0))
            });
            neighbors.truncate(top_n);

            for (right, score) in neighbors {
                edges.push(SimilarityEdge {
                    left,
                    right,
                    score: score.min(1.0),
                });
            }
        }

        edges
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn vocab(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_ngrams_strip_punctuation_and_slide() {
        let grams = ngrams("A.B-C,DE/F", 3);
        assert_eq!(grams, vec!["ABC", "BCD", "CDE", "DEF"]);
    }

    #[test]
    fn test_short_string_yields_no_ngrams() {
        assert!(ngrams("AB", 5).is_empty());
        assert!(ngrams("", 5).is_empty());
    }

    #[test]
    fn test_empty_vocabulary_yields_empty_edge_set() {
        let index = NgramIndex::build(&[], DEFAULT_NGRAM_WINDOW);
        assert!(index.top_n_pairs(10, 0.5).is_empty());
    }

    #[test]
    fn test_identical_strings_score_one() {
        let index = NgramIndex::build(
            &vocab(&["123 MAIN STREET", "123 MAIN STREET X", "UNRELATED VALUE"]),
            5,
        );
        let edges = index.top_n_pairs(10, 0.5);
        let best = edges
            .iter()
            .find(|e| e.left == 0 && e.right == 1)
            .expect("near-identical pair should produce an edge");
        assert!(best.score > 0.8);
    }

    #[test]
    fn test_similar_addresses_match_dissimilar_do_not() {
        let index = NgramIndex::build(
            &vocab(&["123 MAIN ST", "123 MAIN STREET", "456 OAK AVE"]),
            5,
        );
        let edges = index.top_n_pairs(10, 0.5);

        assert!(edges.iter().any(|e| e.left == 0 && e.right == 1));
        assert!(edges.iter().any(|e| e.left == 1 && e.right == 0));
        assert!(!edges.iter().any(|e| e.left == 2 || e.right == 2));
    }

    #[test]
    fn test_no_self_pairs() {
        let index = NgramIndex::build(&vocab(&["123 MAIN ST", "123 MAIN ST"]), 5);
        let edges = index.top_n_pairs(10, 0.1);
        assert!(edges.iter().all(|e| e.left != e.right));
    }

    #[test]
    fn test_deterministic_output() {
        let values = vocab(&["ACME CORPORATION", "ACME CORP", "ACME CO", "OTHER NAME"]);
        let a = NgramIndex::build(&values, 5).top_n_pairs(10, 0.3);
        let b = NgramIndex::build(&values, 5).top_n_pairs(10, 0.3);
        assert_eq!(a, b);
    }

    #[test]
    fn test_top_n_limits_neighbors_per_row() {
        let values = vocab(&[
            "ACME SUPPLY COMPANY",
            "ACME SUPPLY COMPANY A",
            "ACME SUPPLY COMPANY B",
            "ACME SUPPLY COMPANY C",
        ]);
        let index = NgramIndex::build(&values, 5);
        let edges = index.top_n_pairs(1, 0.1);
        for left in 0..values.len() {
            assert!(edges.iter().filter(|e| e.left == left).count() <= 1);
        }
    }
}

// 🔗 Fuzzy Deduplication - n-gram similarity + grouping over a key column
// Near-duplicate values collapse to one representative ("Group") value,
// which then feeds the exact dedupe engine like any other key column.

use crate::deduplication::{DedupeEngine, DedupeOptions};
use crate::error::LinkageError;
use crate::grouping::GroupAssignment;
use crate::normalize::clean_text;
use crate::similarity::{NgramIndex, DEFAULT_NGRAM_WINDOW};
use crate::table::{Table, Value};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Column holding the representative value of each fuzzy group.
pub const GROUP_COLUMN: &str = "Group";

// ============================================================================
// OPTIONS
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FuzzyOptions {
    /// Cosine similarity threshold in (0, 1]
    pub threshold: f64,

    /// Character n-gram window width
    pub window: usize,

    /// Neighbors considered per value; vocabulary size when None
    pub top_n: Option<usize>,
}

impl FuzzyOptions {
    pub fn new() -> Self {
        FuzzyOptions {
            threshold: 0.9,
            window: DEFAULT_NGRAM_WINDOW,
            top_n: None,
        }
    }

    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.threshold = threshold;
        self
    }

    pub fn with_window(mut self, window: usize) -> Self {
        self.window = window;
        self
    }

    pub fn with_top_n(mut self, top_n: usize) -> Self {
        self.top_n = Some(top_n);
        self
    }
}

impl Default for FuzzyOptions {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// TARGET PREPARATION
// ============================================================================

/// One match target per record: the designated columns joined with a space
/// and cleaned. This is the string the similarity index sees.
pub fn prepare_target(table: &Table, columns: &[String]) -> Result<Vec<String>, LinkageError> {
    let idx: Vec<usize> = columns
        .iter()
        .map(|c| table.column_index(c))
        .collect::<Result<_, _>>()?;
    Ok(table
        .rows()
        .iter()
        .map(|row| {
            let parts: Vec<String> = idx.iter().map(|&c| row[c].to_string()).collect();
            clean_text(&parts.join(" "))
        })
        .collect())
}

// ============================================================================
// FUZZY GROUPING
// ============================================================================

/// Map every target value to its group representative.
///
/// The distinct values form the vocabulary (first-seen order); similarity
/// edges above threshold are merged through union-find; each value maps to
/// the representative value of its group. Values with no edges map to
/// themselves.
pub fn fuzzy_group(values: &[String], options: &FuzzyOptions) -> Vec<String> {
    let mut vocabulary: Vec<String> = Vec::new();
    let mut position: HashMap<&str, usize> = HashMap::new();
    for value in values {
        if !position.contains_key(value.as_str()) {
            position.insert(value.as_str(), vocabulary.len());
            vocabulary.push(value.clone());
        }
    }

    let index = NgramIndex::build(&vocabulary, options.window);
    let top_n = options.top_n.unwrap_or(vocabulary.len());
    let edges = index.top_n_pairs(top_n, options.threshold);

    let mut groups = GroupAssignment::new(vocabulary.len());
    groups.add_edges(&edges);
    let representatives = groups.resolve();

    values
        .iter()
        .map(|value| {
            let idx = position[value.as_str()];
            vocabulary[representatives[idx]].clone()
        })
        .collect()
}

// ============================================================================
// FUZZY DEDUPE PIPELINE
// ============================================================================

/// Full fuzzy dedupe: derive targets, group near-duplicates, then run the
/// exact engine keyed on the `Group` column with ids, counts, and rank.
/// Every input row survives, annotated.
pub fn fuzzy_dedupe(
    table: &Table,
    columns: &[String],
    options: &FuzzyOptions,
) -> Result<Table, LinkageError> {
    let targets = prepare_target(table, columns)?;
    let groups = fuzzy_group(&targets, options);

    let mut data = table.clone();
    data.set_column(GROUP_COLUMN, groups.into_iter().map(Value::Text).collect())?;

    let engine = DedupeEngine::new(
        DedupeOptions::new([GROUP_COLUMN])
            .keep_all_rows()
            .keep_dedupe_id()
            .with_rank(),
    );
    engine.dedupe(&data)
}

// ============================================================================
// TESTS
// ============================================================================

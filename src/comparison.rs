// ⚖️ Cross-Dataset Comparator - match records between two tables
// Joins on a derived composite key (exact) or on fuzzy group co-membership,
// reporting match counts and transferring attributes from the other side.

use crate::deduplication::{
    DedupeEngine, DedupeOptions, BLANK_GROUP_ID, DEDUPE_ID_COLUMN,
};
use crate::error::LinkageError;
use crate::fuzzy::{fuzzy_group, prepare_target, FuzzyOptions, GROUP_COLUMN};
use crate::normalize::{normalize_table, simplify_text};
use crate::table::{concat_tagged, Table, Value};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// Match-count column added to the annotated output.
pub const MATCH_COUNT_COLUMN: &str = "Matches_From_Other";

/// Source tag column used by the fuzzy comparator.
pub const SOURCE_TAG_COLUMN: &str = "Source_Tag";

const LEFT_TAG: &str = "LEFT";
const RIGHT_TAG: &str = "RIGHT";

// ============================================================================
// KEY PAIRS
// ============================================================================

/// One key column per side. The two sides may name the column differently.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeyPair {
    pub left: String,
    pub right: String,
}

impl KeyPair {
    pub fn new(left: &str, right: &str) -> Self {
        KeyPair {
            left: left.to_string(),
            right: right.to_string(),
        }
    }

    /// Same column name on both sides.
    pub fn same(name: &str) -> Self {
        Self::new(name, name)
    }
}

// ============================================================================
// OPTIONS
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompareOptions {
    /// Strip the composite key to alphanumerics before matching
    pub simplify_keys: bool,

    /// Columns copied from the right table onto matching left rows,
    /// keyed by first occurrence per key; blank when absent
    pub bring_over: Vec<String>,

    /// Optional new names for the transferred columns, one per entry
    pub rename_to: Vec<String>,
}

impl CompareOptions {
    pub fn new() -> Self {
        CompareOptions {
            simplify_keys: false,
            bring_over: Vec::new(),
            rename_to: Vec::new(),
        }
    }

    pub fn simplify_keys(mut self) -> Self {
        self.simplify_keys = true;
        self
    }

    pub fn bring_over<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.bring_over = columns.into_iter().map(Into::into).collect();
        self
    }

    pub fn rename_to<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.rename_to = names.into_iter().map(Into::into).collect();
        self
    }
}

impl Default for CompareOptions {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// EXACT COMPARATOR
// ============================================================================

/// Annotate `left` with how many `right` records share each composite key
/// (0 = no match; a key present on both sides counts every occurrence, so
/// comparing a table against itself reports the key's multiplicity), plus
/// any transferred columns.
pub fn compare_tables(
    left: &Table,
    right: &Table,
    keys: &[KeyPair],
    options: &CompareOptions,
) -> Result<Table, LinkageError> {
    if !options.rename_to.is_empty() && options.rename_to.len() != options.bring_over.len() {
        return Err(LinkageError::RenameMismatch {
            expected: options.bring_over.len(),
            got: options.rename_to.len(),
        });
    }
    for pair in keys {
        left.column_index(&pair.left)?;
        right.column_index(&pair.right)?;
    }
    for column in &options.bring_over {
        right.column_index(column)?;
    }

    let left_norm = normalize_table(left);
    let right_norm = normalize_table(right);

    let left_cols: Vec<String> = keys.iter().map(|p| p.left.clone()).collect();
    let right_cols: Vec<String> = keys.iter().map(|p| p.right.clone()).collect();
    let left_keys = composite_keys(&left_norm, &left_cols, options.simplify_keys)?;
    let right_keys = composite_keys(&right_norm, &right_cols, options.simplify_keys)?;

    let mut right_key_counts: HashMap<&str, usize> = HashMap::new();
    for key in &right_keys {
        *right_key_counts.entry(key.as_str()).or_insert(0) += 1;
    }

    let mut annotated = left_norm.clone();
    annotated.set_column(
        MATCH_COUNT_COLUMN,
        left_keys
            .iter()
            .map(|key| {
                Value::Number(right_key_counts.get(key.as_str()).copied().unwrap_or(0) as f64)
            })
            .collect(),
    )?;

    if !options.bring_over.is_empty() {
        // First right-side row per key supplies the transferred values
        let mut first_per_key: HashMap<&str, usize> = HashMap::new();
        for (row, key) in right_keys.iter().enumerate() {
            first_per_key.entry(key.as_str()).or_insert(row);
        }

        for (pos, column) in options.bring_over.iter().enumerate() {
            let src_idx = right_norm.column_index(column)?;
            let name = if options.rename_to.is_empty() {
                column.clone()
            } else {
                options.rename_to[pos].clone()
            };
            let values = left_keys
                .iter()
                .map(|key| match first_per_key.get(key.as_str()) {
                    Some(&row) => right_norm.value(row, src_idx).clone(),
                    None => Value::Blank,
                })
                .collect();
            annotated.set_column(&name, values)?;
        }
    }

    Ok(annotated)
}

fn composite_keys(
    table: &Table,
    columns: &[String],
    simplify: bool,
) -> Result<Vec<String>, LinkageError> {
    let idx: Vec<usize> = columns
        .iter()
        .map(|c| table.column_index(c))
        .collect::<Result<_, _>>()?;
    Ok(table
        .rows()
        .iter()
        .map(|row| {
            let parts: Vec<String> = idx.iter().map(|&c| row[c].to_string()).collect();
            let key = parts.join("_");
            if simplify {
                simplify_text(&key)
            } else {
                key
            }
        })
        .collect())
}

// ============================================================================
// FUZZY COMPARATOR
// ============================================================================

/// Result of a fuzzy cross-dataset match.
#[derive(Debug, Clone)]
pub struct FuzzyComparison {
    /// Left rows whose fuzzy group also contains a right row, annotated
    /// with Group / Dedupe_ID / Dedupe_Count / Rank
    pub matched_left: Table,

    /// Every right row, annotated the same way, for inspection
    pub right_rows: Table,
}

impl FuzzyComparison {
    pub fn summary(&self) -> String {
        format!(
            "{} left record(s) matched against {} right record(s)",
            self.matched_left.len(),
            self.right_rows.len()
        )
    }
}

/// Concatenate both tables with a source tag, fuzzy-group the combined
/// targets, run the exact engine on the group column, and report left rows
/// that share a group id with at least one right row. Blank-key singletons
/// (id -1) never count as matches: only affirmatively grouped records do.
pub fn fuzzy_compare_tables(
    left: &Table,
    right: &Table,
    left_keys: &[String],
    right_keys: &[String],
    options: &FuzzyOptions,
) -> Result<FuzzyComparison, LinkageError> {
    let left_targets = prepare_target(&normalize_table(left), left_keys)?;
    let right_targets = prepare_target(&normalize_table(right), right_keys)?;

    let mut combined = concat_tagged(left, right, SOURCE_TAG_COLUMN, LEFT_TAG, RIGHT_TAG);
    let mut targets = left_targets;
    targets.extend(right_targets);
    let groups = fuzzy_group(&targets, options);
    combined.set_column(GROUP_COLUMN, groups.into_iter().map(Value::Text).collect())?;

    let engine = DedupeEngine::new(
        DedupeOptions::new([GROUP_COLUMN])
            .keep_all_rows()
            .keep_dedupe_id()
            .with_rank(),
    );
    let deduped = engine.dedupe(&combined)?;

    let id_idx = deduped.column_index(DEDUPE_ID_COLUMN)?;
    let tag_idx = deduped.column_index(SOURCE_TAG_COLUMN)?;

    let right_ids: HashSet<i64> = deduped
        .rows()
        .iter()
        .filter(|row| row[tag_idx].as_text() == RIGHT_TAG)
        .filter_map(|row| row[id_idx].as_number().map(|n| n as i64))
        .filter(|&id| id != BLANK_GROUP_ID)
        .collect();

    let mut matched_left_rows = Vec::new();
    let mut right_rows = Vec::new();
    for (row_i, row) in deduped.rows().iter().enumerate() {
        let id = row[id_idx].as_number().map(|n| n as i64).unwrap_or(BLANK_GROUP_ID);
        match row[tag_idx].as_text() {
            LEFT_TAG if right_ids.contains(&id) => matched_left_rows.push((id, row_i)),
            RIGHT_TAG => right_rows.push((id, row_i)),
            _ => {}
        }
    }
    // Report in group id order so matching rows from both sides line up
    matched_left_rows.sort();
    right_rows.sort();

    let matched_left =
        deduped.select_rows(&matched_left_rows.into_iter().map(|(_, r)| r).collect::<Vec<_>>());
    let right_rows =
        deduped.select_rows(&right_rows.into_iter().map(|(_, r)| r).collect::<Vec<_>>());

    Ok(FuzzyComparison {
        matched_left,
        right_rows,
    })
}

// ============================================================================
// TESTS
// ============================================================================

// 🔍 Deduplication Engine - exact dedupe ids, aggregation, expansion, rank
// Partitions records into groups by a normalized composite key, then
// annotates, aggregates, pivots, ranks, and optionally collapses the groups.

use crate::error::LinkageError;
use crate::normalize::{normalize_table, simplify_text};
use crate::table::{Table, Value};
use std::collections::{HashMap, HashSet};

/// Group id column added to every deduped table.
pub const DEDUPE_ID_COLUMN: &str = "Dedupe_ID";

/// Group size column added to every deduped table.
pub const DEDUPE_COUNT_COLUMN: &str = "Dedupe_Count";

/// Default name of the per-group rank column.
pub const DEFAULT_RANK_COLUMN: &str = "Rank";

/// Reserved id for records whose dedupe key is blank: forced singleton,
/// never merged with anything.
pub const BLANK_GROUP_ID: i64 = -1;

/// Default ceiling on projected expansion output cells.
pub const DEFAULT_EXPAND_CELL_LIMIT: usize = 100_000_000;

// Internal column used when simplify columns are combined into one key
const SIMPLIFIED_KEY_COLUMN: &str = "__simplified_key";

// ============================================================================
// AGGREGATION DIRECTIVES
// ============================================================================

/// Caller-supplied aggregation over one group's coerced values, in row
/// order.
pub type CustomAgg = fn(&[Value]) -> Value;

/// Aggregation function applied over all members of a dedupe group.
#[derive(Debug, Clone, PartialEq)]
pub enum AggOp {
    /// Sum of numeric cells; non-numeric cells contribute nothing
    Sum,
    Min,
    Max,
    /// First member's value in row order
    First,
    /// Group size
    Count,
    /// Display values of all members joined with a separator
    Join(String),
    Custom(CustomAgg),
}

/// Optional type coercion applied to the source column before aggregating.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Coercion {
    Float,
    Int,
}

/// One per-group aggregation: read `source`, apply `op` over each group,
/// broadcast the result to every member as column `target`. A coercion
/// failure becomes `fill`, never an abort.
#[derive(Debug, Clone, PartialEq)]
pub struct AggregationDirective {
    pub target: String,
    pub source: String,
    pub op: AggOp,
    pub coerce: Option<Coercion>,
    pub fill: Value,
}

impl AggregationDirective {
    pub fn new(target: &str, source: &str, op: AggOp) -> Self {
        AggregationDirective {
            target: target.to_string(),
            source: source.to_string(),
            op,
            coerce: None,
            fill: Value::Blank,
        }
    }

    pub fn with_coercion(mut self, coerce: Coercion) -> Self {
        self.coerce = Some(coerce);
        self
    }

    pub fn with_fill(mut self, fill: Value) -> Self {
        self.fill = fill;
        self
    }
}

// ============================================================================
// OPTIONS
// ============================================================================

/// Configuration for one dedupe pass. Defaults mirror a plain
/// "collapse duplicates by key" run; builder methods opt into the rest.
#[derive(Debug, Clone, PartialEq)]
pub struct DedupeOptions {
    /// Columns whose normalized concatenation forms the dedupe key
    pub key_columns: Vec<String>,

    /// Sort column for rank and collapse; first table column when None
    pub sort_column: Option<String>,
    pub sort_ascending: bool,

    pub aggregations: Vec<AggregationDirective>,

    /// Columns pivoted to `<name>_1..K` wide format per group
    pub columns_to_expand: Vec<String>,
    pub expand_cell_limit: usize,
    /// Explicit per-group width cap; bypasses the cell-limit error
    pub expand_column_cap: Option<usize>,

    /// Keep only the first row of every group
    pub collapse_to_first: bool,

    /// Rename `Dedupe_Count` in the output
    pub count_column_name: Option<String>,
    pub keep_dedupe_id: bool,

    pub add_rank_column: bool,
    pub rank_column_name: Option<String>,

    /// Key columns to strip to alphanumerics and combine before keying
    pub columns_to_simplify: Vec<String>,

    /// Blank keys become id -1 / count 1 / rank 1 instead of grouping
    pub treat_blank_as_singleton: bool,
}

impl DedupeOptions {
    pub fn new<I, S>(key_columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        DedupeOptions {
            key_columns: key_columns.into_iter().map(Into::into).collect(),
            sort_column: None,
            sort_ascending: true,
            aggregations: Vec::new(),
            columns_to_expand: Vec::new(),
            expand_cell_limit: DEFAULT_EXPAND_CELL_LIMIT,
            expand_column_cap: None,
            collapse_to_first: true,
            count_column_name: None,
            keep_dedupe_id: false,
            add_rank_column: false,
            rank_column_name: None,
            columns_to_simplify: Vec::new(),
            treat_blank_as_singleton: true,
        }
    }

    pub fn with_sort(mut self, column: &str, ascending: bool) -> Self {
        self.sort_column = Some(column.to_string());
        self.sort_ascending = ascending;
        self
    }

    pub fn with_aggregation(mut self, directive: AggregationDirective) -> Self {
        self.aggregations.push(directive);
        self
    }

    pub fn with_expand<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.columns_to_expand = columns.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_simplify<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.columns_to_simplify = columns.into_iter().map(Into::into).collect();
        self
    }

    pub fn keep_all_rows(mut self) -> Self {
        self.collapse_to_first = false;
        self
    }

    pub fn keep_dedupe_id(mut self) -> Self {
        self.keep_dedupe_id = true;
        self
    }

    pub fn with_rank(mut self) -> Self {
        self.add_rank_column = true;
        self
    }

    pub fn rename_count(mut self, name: &str) -> Self {
        self.count_column_name = Some(name.to_string());
        self
    }

    pub fn allow_blank_groups(mut self) -> Self {
        self.treat_blank_as_singleton = false;
        self
    }
}

// ============================================================================
// GROUP IDS
// ============================================================================

/// Per-row group assignment produced by `assign_dedupe_ids`.
#[derive(Debug, Clone, PartialEq)]
pub struct GroupIds {
    /// Group id per row, `BLANK_GROUP_ID` for blank keys
    pub ids: Vec<i64>,
    /// Group size per row, forced to 1 for blank keys
    pub counts: Vec<usize>,
    /// Number of distinct non-blank groups
    pub group_count: usize,
}

/// Compute the dedupe key per record (whitespace-stripped, upper-folded
/// concatenation of the key columns) and assign group ids in
/// first-occurrence order.
pub fn assign_dedupe_ids(
    table: &Table,
    key_columns: &[String],
    treat_blank_as_singleton: bool,
) -> Result<GroupIds, LinkageError> {
    let key_idx: Vec<usize> = key_columns
        .iter()
        .map(|c| table.column_index(c))
        .collect::<Result<_, _>>()?;

    let mut assigned: HashMap<String, i64> = HashMap::new();
    let mut next_id: i64 = 0;
    let mut ids = Vec::with_capacity(table.len());

    for row in table.rows() {
        let mut key = String::new();
        for &idx in &key_idx {
            for c in row[idx].to_string().chars() {
                if !c.is_whitespace() {
                    key.extend(c.to_uppercase());
                }
            }
        }
        if treat_blank_as_singleton && key.is_empty() {
            ids.push(BLANK_GROUP_ID);
        } else {
            let id = *assigned.entry(key).or_insert_with(|| {
                let id = next_id;
                next_id += 1;
                id
            });
            ids.push(id);
        }
    }

    let mut sizes: HashMap<i64, usize> = HashMap::new();
    for &id in &ids {
        *sizes.entry(id).or_insert(0) += 1;
    }
    let counts = ids
        .iter()
        .map(|&id| if id == BLANK_GROUP_ID { 1 } else { sizes[&id] })
        .collect();

    Ok(GroupIds {
        ids,
        counts,
        group_count: next_id as usize,
    })
}

// ============================================================================
// AGGREGATION
// ============================================================================

/// Apply one directive: coerce the source column, aggregate per group, and
/// broadcast the group result back to every member row.
pub fn aggregate_column(
    table: &Table,
    ids: &[i64],
    directive: &AggregationDirective,
) -> Result<Vec<Value>, LinkageError> {
    let src_idx = table.column_index(&directive.source)?;

    let coerced: Vec<Value> = table
        .rows()
        .iter()
        .map(|row| coerce_value(&row[src_idx], directive))
        .collect();

    let mut grouped: HashMap<i64, Value> = HashMap::new();
    let mut group_sizes: HashMap<i64, usize> = HashMap::new();
    let mut joined: HashMap<i64, Vec<String>> = HashMap::new();
    let mut members: HashMap<i64, Vec<Value>> = HashMap::new();

    for (row, value) in coerced.iter().enumerate() {
        let id = ids[row];
        *group_sizes.entry(id).or_insert(0) += 1;
        match &directive.op {
            AggOp::Sum => {
                if let Some(n) = numeric(value) {
                    let entry = grouped.entry(id).or_insert(Value::Number(0.0));
                    if let Value::Number(total) = entry {
                        *total += n;
                    }
                }
            }
            AggOp::Min => {
                merge_extreme(&mut grouped, id, value, true);
            }
            AggOp::Max => {
                merge_extreme(&mut grouped, id, value, false);
            }
            AggOp::First => {
                grouped.entry(id).or_insert_with(|| value.clone());
            }
            AggOp::Count => {}
            AggOp::Join(_) => {
                if !value.is_blank() {
                    joined.entry(id).or_default().push(value.to_string());
                }
            }
            AggOp::Custom(_) => {
                members.entry(id).or_default().push(value.clone());
            }
        }
    }

    let result = ids
        .iter()
        .map(|id| match &directive.op {
            AggOp::Count => Value::Number(group_sizes[id] as f64),
            AggOp::Join(sep) => match joined.get(id) {
                Some(parts) => Value::Text(parts.join(sep)),
                None => Value::Blank,
            },
            AggOp::Custom(f) => f(&members[id]),
            _ => grouped.get(id).cloned().unwrap_or(Value::Blank),
        })
        .collect();

    Ok(result)
}

fn coerce_value(value: &Value, directive: &AggregationDirective) -> Value {
    match directive.coerce {
        None => value.clone(),
        Some(kind) => match value.as_number() {
            Some(n) => Value::Number(match kind {
                Coercion::Float => n,
                Coercion::Int => n.trunc(),
            }),
            // Degrade to the configured fill value, never abort the batch
            None => directive.fill.clone(),
        },
    }
}

fn numeric(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => Some(*n),
        _ => None,
    }
}

fn merge_extreme(grouped: &mut HashMap<i64, Value>, id: i64, value: &Value, want_min: bool) {
    if value.is_blank() {
        return;
    }
    match grouped.get(&id) {
        None => {
            grouped.insert(id, value.clone());
        }
        Some(current) => {
            let ordering = value.compare(current);
            let better = if want_min {
                ordering == std::cmp::Ordering::Less
            } else {
                ordering == std::cmp::Ordering::Greater
            };
            if better {
                grouped.insert(id, value.clone());
            }
        }
    }
}

// ============================================================================
// WIDE-FORMAT EXPANSION
// ============================================================================

/// Pivot the distinct expand-tuples of every group into indexed columns
/// `<name>_1..K`, padded to a common width with blanks.
///
/// Without an explicit `column_cap`, a projected output above `cell_limit`
/// is a structured `ExpansionTooLarge` error carrying the safe per-group
/// maximum. A `column_cap` is an informed override: widths truncate to the
/// cap and the limit check is skipped.
pub fn expand_columns(
    table: &Table,
    ids: &[i64],
    columns: &[String],
    cell_limit: usize,
    column_cap: Option<usize>,
) -> Result<Vec<(String, Vec<Value>)>, LinkageError> {
    let col_idx: Vec<usize> = columns
        .iter()
        .map(|c| table.column_index(c))
        .collect::<Result<_, _>>()?;

    // Distinct tuples per group, in first-seen row order
    let mut tuples: HashMap<i64, Vec<Vec<String>>> = HashMap::new();
    let mut seen: HashSet<(i64, Vec<String>)> = HashSet::new();
    for (row_i, row) in table.rows().iter().enumerate() {
        let tuple: Vec<String> = col_idx.iter().map(|&c| row[c].to_string()).collect();
        // A single-column expansion has no use for blank entries
        if columns.len() == 1 && tuple[0].is_empty() {
            continue;
        }
        let id = ids[row_i];
        if seen.insert((id, tuple.clone())) {
            tuples.entry(id).or_default().push(tuple);
        }
    }

    let group_count = tuples.len();
    let max_width = tuples.values().map(Vec::len).max().unwrap_or(0);
    let width = match column_cap {
        Some(cap) => max_width.min(cap),
        None => {
            let projected = group_count * max_width * columns.len();
            if projected > cell_limit {
                let per_width_cells = group_count * columns.len();
                return Err(LinkageError::ExpansionTooLarge {
                    projected,
                    limit: cell_limit,
                    max_columns: if per_width_cells == 0 {
                        0
                    } else {
                        cell_limit / per_width_cells
                    },
                });
            }
            max_width
        }
    };

    let mut out = Vec::with_capacity(width * columns.len());
    for slot in 0..width {
        for (pos, name) in columns.iter().enumerate() {
            let values = ids
                .iter()
                .map(|id| {
                    tuples
                        .get(id)
                        .and_then(|t| t.get(slot))
                        .map(|tuple| Value::text(tuple[pos].clone()))
                        .unwrap_or(Value::Blank)
                })
                .collect();
            out.push((format!("{}_{}", name, slot + 1), values));
        }
    }

    Ok(out)
}

// ============================================================================
// RANK AND COLLAPSE
// ============================================================================

/// Dense 1..N rank within each group by the sort column; stable, so equal
/// sort cells rank in input order. Blank-key records always rank 1.
pub fn rank_rows(
    table: &Table,
    ids: &[i64],
    sort_column: &str,
    ascending: bool,
) -> Result<Vec<usize>, LinkageError> {
    let order = table.sorted_row_order(sort_column, ascending)?;
    let mut counters: HashMap<i64, usize> = HashMap::new();
    let mut ranks = vec![0usize; ids.len()];
    for &row in &order {
        let counter = counters.entry(ids[row]).or_insert(0);
        *counter += 1;
        ranks[row] = *counter;
    }
    for (row, &id) in ids.iter().enumerate() {
        if id == BLANK_GROUP_ID {
            ranks[row] = 1;
        }
    }
    Ok(ranks)
}

/// Keep the first row per group under the sort order. Aggregations are
/// broadcast beforehand, so any member is representative. Blank-key rows
/// are each their own group and all survive. Output rows are ordered by
/// group id, blank-key rows first.
pub fn collapse_first(
    table: &Table,
    ids: &[i64],
    sort_column: &str,
    ascending: bool,
) -> Result<Table, LinkageError> {
    let order = table.sorted_row_order(sort_column, ascending)?;
    let mut kept: Vec<(i64, usize)> = Vec::new();
    let mut seen: HashSet<i64> = HashSet::new();
    for &row in &order {
        let id = ids[row];
        if id == BLANK_GROUP_ID || seen.insert(id) {
            kept.push((id, row));
        }
    }
    kept.sort_by_key(|&(id, row)| (id, row));
    let rows: Vec<usize> = kept.into_iter().map(|(_, row)| row).collect();
    Ok(table.select_rows(&rows))
}

// ============================================================================
// DEDUPE ENGINE
// ============================================================================

/// Orchestrates one full dedupe pass: normalize, key, annotate, aggregate,
/// expand, rank, collapse.
pub struct DedupeEngine {
    pub options: DedupeOptions,
}

impl DedupeEngine {
    pub fn new(options: DedupeOptions) -> Self {
        DedupeEngine { options }
    }

    /// Validate every precondition before touching a single row, so a bad
    /// configuration can never partially apply.
    fn check_preconditions(&self, table: &Table) -> Result<(), LinkageError> {
        let o = &self.options;

        for column in &o.columns_to_simplify {
            if !o.key_columns.contains(column) {
                return Err(LinkageError::SimplifyColumnNotKey {
                    column: column.clone(),
                });
            }
        }
        if !o.columns_to_simplify.is_empty() {
            for directive in &o.aggregations {
                if o.columns_to_simplify.contains(&directive.source) {
                    return Err(LinkageError::KeyColumnOverlap {
                        column: directive.source.clone(),
                    });
                }
            }
            for column in &o.columns_to_expand {
                if o.columns_to_simplify.contains(column) {
                    return Err(LinkageError::KeyColumnOverlap {
                        column: column.clone(),
                    });
                }
            }
        }

        for column in o
            .key_columns
            .iter()
            .chain(o.sort_column.iter())
            .chain(o.columns_to_expand.iter())
        {
            table.column_index(column)?;
        }
        for directive in &o.aggregations {
            table.column_index(&directive.source)?;
        }

        Ok(())
    }

    pub fn dedupe(&self, table: &Table) -> Result<Table, LinkageError> {
        let o = &self.options;
        self.check_preconditions(table)?;

        let mut data = normalize_table(table);

        let groups = if o.columns_to_simplify.is_empty() {
            assign_dedupe_ids(&data, &o.key_columns, o.treat_blank_as_singleton)?
        } else {
            // Combine the simplified columns into one key column so that
            // "123 MAIN APT 3" keys the same as "123 MAIN" + "APT 3"
            let mut keyed = data.clone();
            keyed.set_column(SIMPLIFIED_KEY_COLUMN, self.simplified_keys(&data)?)?;
            let mut key_columns: Vec<String> = o
                .key_columns
                .iter()
                .filter(|c| !o.columns_to_simplify.contains(c))
                .cloned()
                .collect();
            key_columns.push(SIMPLIFIED_KEY_COLUMN.to_string());
            assign_dedupe_ids(&keyed, &key_columns, o.treat_blank_as_singleton)?
        };

        data.set_column(
            DEDUPE_ID_COLUMN,
            groups
                .ids
                .iter()
                .map(|&id| Value::Number(id as f64))
                .collect(),
        )?;
        data.set_column(
            DEDUPE_COUNT_COLUMN,
            groups
                .counts
                .iter()
                .map(|&c| Value::Number(c as f64))
                .collect(),
        )?;

        let sort_column = match &o.sort_column {
            Some(column) => column.clone(),
            None => data.columns()[0].clone(),
        };

        for directive in &o.aggregations {
            let values = aggregate_column(&data, &groups.ids, directive)?;
            data.set_column(&directive.target, values)?;
        }

        if !o.columns_to_expand.is_empty() {
            let expanded = expand_columns(
                &data,
                &groups.ids,
                &o.columns_to_expand,
                o.expand_cell_limit,
                o.expand_column_cap,
            )?;
            for (name, values) in expanded {
                data.set_column(&name, values)?;
            }
            for column in &o.columns_to_expand {
                data.drop_column(column)?;
            }
        }

        if o.add_rank_column {
            let ranks = rank_rows(&data, &groups.ids, &sort_column, o.sort_ascending)?;
            let name = o
                .rank_column_name
                .clone()
                .unwrap_or_else(|| DEFAULT_RANK_COLUMN.to_string());
            data.set_column(
                &name,
                ranks.into_iter().map(|r| Value::Number(r as f64)).collect(),
            )?;
        }

        if o.collapse_to_first {
            data = collapse_first(&data, &groups.ids, &sort_column, o.sort_ascending)?;
        }

        if let Some(name) = &o.count_column_name {
            data.rename_column(DEDUPE_COUNT_COLUMN, name)?;
        }
        if !o.keep_dedupe_id {
            data.drop_column(DEDUPE_ID_COLUMN)?;
        }

        Ok(data)
    }

    fn simplified_keys(&self, data: &Table) -> Result<Vec<Value>, LinkageError> {
        let idx: Vec<usize> = self
            .options
            .columns_to_simplify
            .iter()
            .map(|c| data.column_index(c))
            .collect::<Result<_, _>>()?;
        Ok(data
            .rows()
            .iter()
            .map(|row| {
                let parts: Vec<String> = idx
                    .iter()
                    .map(|&c| simplify_text(&row[c].to_string()))
                    .collect();
                Value::Text(parts.join(" "))
            })
            .collect())
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn address_table() -> Table {
        let mut t = Table::new(vec!["Address".to_string(), "Amount".to_string()]);
        for (addr, amount) in [
            ("123 Main St", "10"),
            ("123   main st ", "5"),
            ("456 Oak Ave", "7"),
            ("", "3"),
            ("", "4"),
        ] {
            t.push_row(vec![Value::text(addr), Value::text(amount)])
                .unwrap();
        }
        t
    }

    #[test]
    fn test_identical_keys_share_id_blank_is_minus_one() {
        let groups = assign_dedupe_ids(
            &normalize_table(&address_table()),
            &["Address".to_string()],
            true,
        )
        .unwrap();
        assert_eq!(groups.ids, vec![0, 0, 1, -1, -1]);
        assert_eq!(groups.counts, vec![2, 2, 1, 1, 1]);
        assert_eq!(groups.group_count, 2);
    }

    #[test]
    fn test_blank_keys_group_together_when_allowed() {
        let groups = assign_dedupe_ids(
            &normalize_table(&address_table()),
            &["Address".to_string()],
            false,
        )
        .unwrap();
        assert_eq!(groups.ids[3], groups.ids[4]);
        assert_eq!(groups.counts[3], 2);
    }

    #[test]
    fn test_key_ignores_internal_whitespace() {
        // "123 Main Apt 3" must key the same as "123 Main" + "Apt 3"
        let mut t = Table::new(vec!["A".to_string(), "B".to_string()]);
        t.push_row(vec![Value::text("123 Main Apt 3"), Value::text("")])
            .unwrap();
        t.push_row(vec![Value::text("123 Main"), Value::text("Apt 3")])
            .unwrap();
        let groups = assign_dedupe_ids(&t, &["A".to_string(), "B".to_string()], true).unwrap();
        assert_eq!(groups.ids[0], groups.ids[1]);
    }

    #[test]
    fn test_sum_aggregation_with_coercion() {
        let table = normalize_table(&address_table());
        let ids = vec![0, 0, 1, -1, -1];
        let directive =
            AggregationDirective::new("Total", "Amount", AggOp::Sum).with_coercion(Coercion::Float);
        let totals = aggregate_column(&table, &ids, &directive).unwrap();
        assert_eq!(totals[0], Value::Number(15.0));
        assert_eq!(totals[1], Value::Number(15.0));
        assert_eq!(totals[2], Value::Number(7.0));
    }

    #[test]
    fn test_coercion_failure_degrades_to_fill() {
        let mut t = Table::new(vec!["N".to_string()]);
        t.push_row(vec![Value::text("12")]).unwrap();
        t.push_row(vec![Value::text("not a number")]).unwrap();
        let directive = AggregationDirective::new("N2", "N", AggOp::First)
            .with_coercion(Coercion::Float)
            .with_fill(Value::Number(0.0));
        let values = aggregate_column(&t, &[0, 1], &directive).unwrap();
        assert_eq!(values[0], Value::Number(12.0));
        assert_eq!(values[1], Value::Number(0.0));
    }

    #[test]
    fn test_join_aggregation() {
        let mut t = Table::new(vec!["Phone".to_string()]);
        for p in ["111", "222", "333"] {
            t.push_row(vec![Value::text(p)]).unwrap();
        }
        let directive = AggregationDirective::new("Phones", "Phone", AggOp::Join("; ".into()));
        let values = aggregate_column(&t, &[0, 0, 1], &directive).unwrap();
        assert_eq!(values[0].as_text(), "111; 222");
        assert_eq!(values[2].as_text(), "333");
    }

    #[test]
    fn test_custom_aggregation() {
        fn longest(values: &[Value]) -> Value {
            values
                .iter()
                .max_by_key(|v| v.as_text().len())
                .cloned()
                .unwrap_or(Value::Blank)
        }

        let mut t = Table::new(vec!["Name".to_string()]);
        for name in ["ACME", "ACME CORPORATION", "OTHER"] {
            t.push_row(vec![Value::text(name)]).unwrap();
        }
        let directive =
            AggregationDirective::new("Longest", "Name", AggOp::Custom(longest));
        let values = aggregate_column(&t, &[0, 0, 1], &directive).unwrap();
        assert_eq!(values[0].as_text(), "ACME CORPORATION");
        assert_eq!(values[1].as_text(), "ACME CORPORATION");
        assert_eq!(values[2].as_text(), "OTHER");
    }

    #[test]
    fn test_expand_two_distinct_tuples() {
        let mut t = Table::new(vec!["Phone".to_string()]);
        for p in ["A", "B"] {
            t.push_row(vec![Value::text(p)]).unwrap();
        }
        let expanded = expand_columns(
            &t,
            &[0, 0],
            &["Phone".to_string()],
            DEFAULT_EXPAND_CELL_LIMIT,
            None,
        )
        .unwrap();
        assert_eq!(expanded.len(), 2);
        assert_eq!(expanded[0].0, "Phone_1");
        assert_eq!(expanded[1].0, "Phone_2");
        // both rows of the group carry both values, no data loss
        assert_eq!(expanded[0].1[0].as_text(), "A");
        assert_eq!(expanded[1].1[0].as_text(), "B");
        assert_eq!(expanded[0].1[1].as_text(), "A");
        assert_eq!(expanded[1].1[1].as_text(), "B");
    }

    #[test]
    fn test_expand_collapses_duplicate_tuples_and_skips_blanks() {
        let mut t = Table::new(vec!["Phone".to_string()]);
        for p in ["A", "A", ""] {
            t.push_row(vec![Value::text(p)]).unwrap();
        }
        let expanded = expand_columns(
            &t,
            &[0, 0, 0],
            &["Phone".to_string()],
            DEFAULT_EXPAND_CELL_LIMIT,
            None,
        )
        .unwrap();
        assert_eq!(expanded.len(), 1);
        assert_eq!(expanded[0].1[2].as_text(), "A");
    }

    #[test]
    fn test_expand_over_limit_reports_safe_maximum() {
        let mut t = Table::new(vec!["Phone".to_string()]);
        for p in ["A", "B", "C", "D"] {
            t.push_row(vec![Value::text(p)]).unwrap();
        }
        // One group, width 4, limit 2 -> projected 4 cells, 2 columns fit
        let err = expand_columns(&t, &[0, 0, 0, 0], &["Phone".to_string()], 2, None).unwrap_err();
        match err {
            LinkageError::ExpansionTooLarge {
                projected,
                limit,
                max_columns,
            } => {
                assert_eq!(projected, 4);
                assert_eq!(limit, 2);
                assert_eq!(max_columns, 2);
            }
            other => panic!("expected ExpansionTooLarge, got {:?}", other),
        }
    }

    #[test]
    fn test_expand_cap_truncates_instead_of_erroring() {
        let mut t = Table::new(vec!["Phone".to_string()]);
        for p in ["A", "B", "C", "D"] {
            t.push_row(vec![Value::text(p)]).unwrap();
        }
        let expanded =
            expand_columns(&t, &[0, 0, 0, 0], &["Phone".to_string()], 2, Some(2)).unwrap();
        assert_eq!(expanded.len(), 2);
    }

    #[test]
    fn test_rank_is_dense_and_blank_ranks_one() {
        let table = normalize_table(&address_table());
        let ids = vec![0, 0, 1, -1, -1];
        let ranks = rank_rows(&table, &ids, "Amount", true).unwrap();
        // Group 0 sorted by amount text: "10" < "5", so row 0 ranks first
        assert_eq!(ranks[0], 1);
        assert_eq!(ranks[1], 2);
        assert_eq!(ranks[2], 1);
        assert_eq!(ranks[3], 1);
        assert_eq!(ranks[4], 1);
    }

    #[test]
    fn test_collapse_keeps_first_per_group_and_all_blanks() {
        let table = normalize_table(&address_table());
        let ids = vec![0, 0, 1, -1, -1];
        let collapsed = collapse_first(&table, &ids, "Amount", true).unwrap();
        // 2 blank-key singletons + 2 real groups
        assert_eq!(collapsed.len(), 4);
    }

    #[test]
    fn test_engine_end_to_end_marks_duplicates() {
        let options = DedupeOptions::new(["Address"])
            .keep_all_rows()
            .keep_dedupe_id()
            .with_rank()
            .with_sort("Amount", true);
        let result = DedupeEngine::new(options).dedupe(&address_table()).unwrap();

        let ids = result.column_values(DEDUPE_ID_COLUMN).unwrap();
        let counts = result.column_values(DEDUPE_COUNT_COLUMN).unwrap();
        let ranks = result.column_values(DEFAULT_RANK_COLUMN).unwrap();

        assert_eq!(ids[0], ids[1]);
        assert_eq!(counts[0], Value::Number(2.0));
        assert_eq!(ids[3], Value::Number(-1.0));
        assert_eq!(counts[3], Value::Number(1.0));
        assert_eq!(ranks[3], Value::Number(1.0));
    }

    #[test]
    fn test_engine_collapse_returns_one_row_per_group() {
        let options = DedupeOptions::new(["Address"]).keep_dedupe_id();
        let result = DedupeEngine::new(options).dedupe(&address_table()).unwrap();
        // 2 groups + 2 blank singletons
        assert_eq!(result.len(), 4);
    }

    #[test]
    fn test_precondition_simplify_outside_keys() {
        let options = DedupeOptions::new(["Address"]).with_simplify(["Amount"]);
        let err = DedupeEngine::new(options)
            .dedupe(&address_table())
            .unwrap_err();
        assert!(matches!(err, LinkageError::SimplifyColumnNotKey { .. }));
    }

    #[test]
    fn test_precondition_agg_overlaps_simplified_key() {
        let options = DedupeOptions::new(["Address"])
            .with_simplify(["Address"])
            .with_aggregation(AggregationDirective::new("X", "Address", AggOp::First));
        let err = DedupeEngine::new(options)
            .dedupe(&address_table())
            .unwrap_err();
        assert!(matches!(err, LinkageError::KeyColumnOverlap { .. }));
    }

    #[test]
    fn test_simplified_keys_merge_punctuation_variants() {
        let mut t = Table::new(vec!["Address".to_string()]);
        t.push_row(vec![Value::text("123 Main St. #4")]).unwrap();
        t.push_row(vec![Value::text("123 Main St 4")]).unwrap();
        let options = DedupeOptions::new(["Address"])
            .with_simplify(["Address"])
            .keep_all_rows()
            .keep_dedupe_id();
        let result = DedupeEngine::new(options).dedupe(&t).unwrap();
        let ids = result.column_values(DEDUPE_ID_COLUMN).unwrap();
        assert_eq!(ids[0], ids[1]);
    }

    #[test]
    fn test_count_column_rename() {
        let options = DedupeOptions::new(["Address"])
            .keep_all_rows()
            .rename_count("Locations");
        let result = DedupeEngine::new(options).dedupe(&address_table()).unwrap();
        assert!(result.has_column("Locations"));
        assert!(!result.has_column(DEDUPE_COUNT_COLUMN));
        assert!(!result.has_column(DEDUPE_ID_COLUMN));
    }
}

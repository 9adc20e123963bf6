// 📋 Record container - in-memory table of typed cells
// One Table per input file; every transformation returns new columns or a
// new Table, the input rows are never mutated in place.

use crate::error::LinkageError;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::HashMap;
use std::fmt;
use std::path::Path;

// ============================================================================
// CELL VALUE
// ============================================================================

/// A single cell. CSV input always loads as `Text`; `Number` cells appear
/// through coercion or engine-generated columns (ids, counts, ranks).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    Text(String),
    Number(f64),
    Blank,
}

impl Value {
    pub fn text(s: impl Into<String>) -> Self {
        Value::Text(s.into())
    }

    pub fn is_blank(&self) -> bool {
        match self {
            Value::Blank => true,
            Value::Text(s) => s.is_empty(),
            Value::Number(_) => false,
        }
    }

    /// Text content, empty for anything that is not `Text`.
    pub fn as_text(&self) -> &str {
        match self {
            Value::Text(s) => s,
            _ => "",
        }
    }

    /// Numeric view: `Number` directly, `Text` by parsing. `None` when the
    /// cell holds no usable number.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            Value::Text(s) => s.trim().parse::<f64>().ok(),
            Value::Blank => None,
        }
    }

    /// Total ordering used for sorts and min/max aggregation:
    /// blanks first, then numbers, then text.
    pub fn compare(&self, other: &Value) -> Ordering {
        fn class(v: &Value) -> u8 {
            match v {
                Value::Blank => 0,
                Value::Number(_) => 1,
                Value::Text(_) => 2,
            }
        }
        match (self, other) {
            (Value::Number(a), Value::Number(b)) => a.partial_cmp(b).unwrap_or(Ordering::Equal),
            (Value::Text(a), Value::Text(b)) => a.cmp(b),
            (a, b) => class(a).cmp(&class(b)),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Text(s) => write!(f, "{}", s),
            Value::Number(n) => {
                // Engine-generated ids and counts are whole numbers; keep
                // them free of a trailing ".0" in CSV output
                if n.fract() == 0.0 && n.abs() < 1e15 {
                    write!(f, "{}", *n as i64)
                } else {
                    write!(f, "{}", n)
                }
            }
            Value::Blank => Ok(()),
        }
    }
}

// ============================================================================
// TABLE
// ============================================================================

/// Ordered columns and rows of cells. All engine operations address columns
/// by name and fail with `LinkageError::MissingColumn` when absent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Table {
    columns: Vec<String>,
    rows: Vec<Vec<Value>>,
}

impl Table {
    pub fn new(columns: Vec<String>) -> Self {
        Table {
            columns,
            rows: Vec::new(),
        }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<Value>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn push_row(&mut self, row: Vec<Value>) -> Result<(), LinkageError> {
        if row.len() != self.columns.len() {
            return Err(LinkageError::RaggedRow {
                row: self.rows.len(),
                got: row.len(),
                expected: self.columns.len(),
            });
        }
        self.rows.push(row);
        Ok(())
    }

    pub fn column_index(&self, name: &str) -> Result<usize, LinkageError> {
        self.columns
            .iter()
            .position(|c| c == name)
            .ok_or_else(|| LinkageError::MissingColumn(name.to_string()))
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c == name)
    }

    pub fn value(&self, row: usize, column: usize) -> &Value {
        &self.rows[row][column]
    }

    /// All values of one column, in row order.
    pub fn column_values(&self, name: &str) -> Result<Vec<Value>, LinkageError> {
        let idx = self.column_index(name)?;
        Ok(self.rows.iter().map(|r| r[idx].clone()).collect())
    }

    /// Append a column; replaces the values in place when the name already
    /// exists (aggregation targets may overwrite their source).
    pub fn set_column(&mut self, name: &str, values: Vec<Value>) -> Result<(), LinkageError> {
        if values.len() != self.rows.len() {
            return Err(LinkageError::ColumnLengthMismatch {
                column: name.to_string(),
                got: values.len(),
                expected: self.rows.len(),
            });
        }
        if let Ok(idx) = self.column_index(name) {
            for (row, value) in self.rows.iter_mut().zip(values) {
                row[idx] = value;
            }
        } else {
            self.columns.push(name.to_string());
            for (row, value) in self.rows.iter_mut().zip(values) {
                row.push(value);
            }
        }
        Ok(())
    }

    pub fn drop_column(&mut self, name: &str) -> Result<(), LinkageError> {
        let idx = self.column_index(name)?;
        self.columns.remove(idx);
        for row in &mut self.rows {
            row.remove(idx);
        }
        Ok(())
    }

    pub fn rename_column(&mut self, from: &str, to: &str) -> Result<(), LinkageError> {
        let idx = self.column_index(from)?;
        self.columns[idx] = to.to_string();
        Ok(())
    }

    /// Row indices in stable sort order by one column. Equal cells keep
    /// their input order, which is what makes first-per-group selection
    /// deterministic downstream.
    pub fn sorted_row_order(
        &self,
        sort_column: &str,
        ascending: bool,
    ) -> Result<Vec<usize>, LinkageError> {
        let idx = self.column_index(sort_column)?;
        let mut order: Vec<usize> = (0..self.rows.len()).collect();
        order.sort_by(|&a, &b| {
            let cmp = self.rows[a][idx].compare(&self.rows[b][idx]);
            if ascending {
                cmp
            } else {
                cmp.reverse()
            }
        });
        Ok(order)
    }

    /// New table holding the given rows, in the given order.
    pub fn select_rows(&self, order: &[usize]) -> Table {
        Table {
            columns: self.columns.clone(),
            rows: order.iter().map(|&i| self.rows[i].clone()).collect(),
        }
    }
}

// ============================================================================
// TAGGED CONCATENATION (for cross-dataset matching)
// ============================================================================

/// Stack two tables on top of each other with a source tag column. Columns
/// missing on either side are blank-filled; the left table's column order
/// wins, right-only columns append after it.
pub fn concat_tagged(
    left: &Table,
    right: &Table,
    tag_column: &str,
    left_tag: &str,
    right_tag: &str,
) -> Table {
    let mut columns: Vec<String> = left.columns.to_vec();
    for col in &right.columns {
        if !columns.contains(col) {
            columns.push(col.clone());
        }
    }
    columns.push(tag_column.to_string());

    let mut out = Table::new(columns.clone());
    for (table, tag) in [(left, left_tag), (right, right_tag)] {
        let source_idx: HashMap<&str, usize> = table
            .columns
            .iter()
            .enumerate()
            .map(|(i, c)| (c.as_str(), i))
            .collect();
        for row in &table.rows {
            let mut new_row: Vec<Value> = Vec::with_capacity(columns.len());
            for col in columns.iter().take(columns.len() - 1) {
                match source_idx.get(col.as_str()) {
                    Some(&i) => new_row.push(row[i].clone()),
                    None => new_row.push(Value::Blank),
                }
            }
            new_row.push(Value::text(tag));
            // Widths are constructed to match, push_row cannot fail here
            out.push_row(new_row).expect("constructed row width");
        }
    }
    out
}

// ============================================================================
// CSV I/O
// ============================================================================

/// Load a CSV file into a table. Every cell loads as `Text`; coercion is an
/// explicit, per-column decision made later by aggregation directives.
pub fn load_csv(path: &Path) -> Result<Table> {
    let mut reader = csv::Reader::from_path(path)
        .with_context(|| format!("Failed to open CSV file: {:?}", path))?;

    let headers = reader
        .headers()
        .with_context(|| format!("Failed to read CSV headers: {:?}", path))?
        .iter()
        .map(|h| h.to_string())
        .collect::<Vec<_>>();

    let mut table = Table::new(headers);
    for (line, record) in reader.records().enumerate() {
        let record = record.with_context(|| format!("Failed to read CSV row {}", line + 2))?;
        let row: Vec<Value> = record.iter().map(Value::text).collect();
        table
            .push_row(row)
            .with_context(|| format!("Malformed CSV row {}", line + 2))?;
    }

    Ok(table)
}

pub fn write_csv(table: &Table, path: &Path) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("Failed to create CSV file: {:?}", path))?;

    writer.write_record(table.columns())?;
    for row in table.rows() {
        writer.write_record(row.iter().map(|v| v.to_string()))?;
    }
    writer.flush().context("Failed to flush CSV output")?;

    Ok(())
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_table() -> Table {
        let mut t = Table::new(vec!["Name".to_string(), "Amount".to_string()]);
        t.push_row(vec![Value::text("Acme"), Value::Number(3.0)])
            .unwrap();
        t.push_row(vec![Value::text("Globex"), Value::Number(1.0)])
            .unwrap();
        t.push_row(vec![Value::text("Initech"), Value::Number(2.0)])
            .unwrap();
        t
    }

    #[test]
    fn test_ragged_row_rejected() {
        let mut t = Table::new(vec!["A".to_string(), "B".to_string()]);
        let err = t.push_row(vec![Value::text("only one")]).unwrap_err();
        assert!(matches!(err, LinkageError::RaggedRow { got: 1, expected: 2, .. }));
    }

    #[test]
    fn test_missing_column_is_error() {
        let t = sample_table();
        assert!(matches!(
            t.column_index("Nope"),
            Err(LinkageError::MissingColumn(_))
        ));
    }

    #[test]
    fn test_set_column_overwrites_existing() {
        let mut t = sample_table();
        t.set_column("Amount", vec![Value::Number(9.0); 3]).unwrap();
        assert_eq!(t.columns().len(), 2);
        assert_eq!(t.value(0, 1), &Value::Number(9.0));
    }

    #[test]
    fn test_sorted_order_is_stable() {
        let mut t = Table::new(vec!["K".to_string()]);
        for v in ["b", "a", "b", "a"] {
            t.push_row(vec![Value::text(v)]).unwrap();
        }
        let order = t.sorted_row_order("K", true).unwrap();
        assert_eq!(order, vec![1, 3, 0, 2]);
    }

    #[test]
    fn test_value_display_trims_integer_numbers() {
        assert_eq!(Value::Number(7.0).to_string(), "7");
        assert_eq!(Value::Number(-1.0).to_string(), "-1");
        assert_eq!(Value::Number(2.5).to_string(), "2.5");
        assert_eq!(Value::Blank.to_string(), "");
    }

    #[test]
    fn test_concat_tagged_blank_fills_missing_columns() {
        let mut left = Table::new(vec!["Name".to_string(), "City".to_string()]);
        left.push_row(vec![Value::text("Acme"), Value::text("Austin")])
            .unwrap();
        let mut right = Table::new(vec!["Name".to_string(), "Phone".to_string()]);
        right
            .push_row(vec![Value::text("Globex"), Value::text("555-0100")])
            .unwrap();

        let combined = concat_tagged(&left, &right, "Source_Tag", "LEFT", "RIGHT");
        assert_eq!(
            combined.columns(),
            &["Name", "City", "Phone", "Source_Tag"]
        );
        assert_eq!(combined.len(), 2);
        assert!(combined.value(0, 2).is_blank());
        assert!(combined.value(1, 1).is_blank());
        assert_eq!(combined.value(1, 3).as_text(), "RIGHT");
    }
}

// Error kinds shared across the toolkit
// Expected, handleable conditions are values here, never panics

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum LinkageError {
    /// A referenced column does not exist in the table.
    #[error("column not found: {0}")]
    MissingColumn(String),

    /// A CSV row had a different field count than the header.
    #[error("row {row} has {got} fields, expected {expected}")]
    RaggedRow {
        row: usize,
        got: usize,
        expected: usize,
    },

    /// An aggregation source or expansion column overlaps the simplified
    /// dedupe key. Rejected before any row is processed.
    #[error("column '{column}' cannot be aggregated or expanded: it is part of the simplified dedupe key")]
    KeyColumnOverlap { column: String },

    /// A column marked for simplification is not one of the dedupe keys.
    #[error("simplify column '{column}' is not one of the dedupe key columns")]
    SimplifyColumnNotKey { column: String },

    /// The projected expansion would exceed the configured cell limit.
    /// `max_columns` is the largest per-group column count that stays under
    /// the limit, so a caller can retry with an explicit cap.
    #[error("expansion would produce {projected} cells (limit {limit}); at most {max_columns} column(s) per group fit under the limit")]
    ExpansionTooLarge {
        projected: usize,
        limit: usize,
        max_columns: usize,
    },

    /// Replacement names for transferred columns must match one-for-one.
    #[error("expected {expected} replacement column name(s), got {got}")]
    RenameMismatch { expected: usize, got: usize },

    /// A new column's values did not cover every row.
    #[error("column '{column}' has {got} values for a table of {expected} rows")]
    ColumnLengthMismatch {
        column: String,
        got: usize,
        expected: usize,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expansion_error_carries_safe_maximum() {
        let err = LinkageError::ExpansionTooLarge {
            projected: 250,
            limit: 100,
            max_columns: 2,
        };
        let msg = err.to_string();
        assert!(msg.contains("250"));
        assert!(msg.contains("at most 2 column(s)"));
    }

    #[test]
    fn test_missing_column_message() {
        let err = LinkageError::MissingColumn("Phone".to_string());
        assert_eq!(err.to_string(), "column not found: Phone");
    }
}

// 🧹 Text Normalizer - whitespace, casing, and character cleanup
// Runs before key derivation or similarity so that formatting differences
// never cause spurious matches or spurious non-matches.

use crate::table::{Table, Value};

/// Trim, collapse internal whitespace runs to one space, and upper-fold.
/// Idempotent: cleaning a cleaned string returns it unchanged.
pub fn clean_text(text: &str) -> String {
    text.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_uppercase()
}

/// Strip everything but letters, digits, hyphens, and spaces. The extended
/// set additionally keeps `. , # /` for address lines where those carry
/// meaning (unit markers, fractional street numbers).
pub fn simplify_text(text: &str) -> String {
    simplify_with(text, false)
}

pub fn simplify_text_extended(text: &str) -> String {
    simplify_with(text, true)
}

fn simplify_with(text: &str, extended: bool) -> String {
    text.chars()
        .filter(|c| {
            c.is_ascii_alphanumeric()
                || *c == '-'
                || *c == ' '
                || (extended && matches!(c, '.' | ',' | '#' | '/'))
        })
        .collect()
}

/// Collapse runs of spaces and trim, without touching case.
pub fn clean_spaces(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Copy of a record with every text field cleaned. Numbers and blanks pass
/// through unchanged.
pub fn normalize_row(row: &[Value]) -> Vec<Value> {
    row.iter()
        .map(|v| match v {
            Value::Text(s) => Value::Text(clean_text(s)),
            other => other.clone(),
        })
        .collect()
}

/// Cleaned copy of a whole table. Pure: the input is untouched.
pub fn normalize_table(table: &Table) -> Table {
    let mut out = Table::new(table.columns().to_vec());
    for row in table.rows() {
        out.push_row(normalize_row(row)).expect("same row width");
    }
    out
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LinkageError;

    #[test]
    fn test_clean_text_collapses_and_uppercases() {
        assert_eq!(clean_text("  123   main st "), "123 MAIN ST");
        assert_eq!(clean_text("already CLEAN"), "ALREADY CLEAN");
    }

    #[test]
    fn test_clean_text_is_idempotent() {
        let once = clean_text("  mIxEd \t case\nhere ");
        assert_eq!(clean_text(&once), once);
    }

    #[test]
    fn test_simplify_strips_punctuation() {
        assert_eq!(simplify_text("123 Main St. #4"), "123 Main St 4");
        assert_eq!(simplify_text_extended("123 Main St. #4"), "123 Main St. #4");
        assert_eq!(simplify_text("O'Brien & Sons!"), "OBrien  Sons");
    }

    #[test]
    fn test_normalize_table_leaves_numbers_alone() -> Result<(), LinkageError> {
        let mut t = Table::new(vec!["Name".to_string(), "Amount".to_string()]);
        t.push_row(vec![Value::text("  acme  corp "), Value::Number(4.5)])?;

        let cleaned = normalize_table(&t);
        assert_eq!(cleaned.value(0, 0).as_text(), "ACME CORP");
        assert_eq!(cleaned.value(0, 1), &Value::Number(4.5));
        // input untouched
        assert_eq!(t.value(0, 0).as_text(), "  acme  corp ");
        Ok(())
    }

    #[test]
    fn test_normalize_is_idempotent_over_records() {
        let row = vec![Value::text(" a  b "), Value::Blank, Value::Number(1.0)];
        let once = normalize_row(&row);
        let twice = normalize_row(&once);
        assert_eq!(once, twice);
    }
}

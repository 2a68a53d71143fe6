//! Leading-keyword classification of statements.
//!
//! Decides whether a statement may return rows, matching the keyword at the
//! start of any line, case-insensitively. This is a heuristic, not a parser;
//! it mirrors how common SQL dialects begin row-returning commands.

use lazy_static::lazy_static;
use regex::Regex;

/// Commands that may return rows.
pub const ROW_RETURNING_COMMANDS: [&str; 9] = [
    "SELECT", "SHOW", "HANDLER", "ANALYZE", "CHECK", "DESCRIBE", "DESC", "EXPLAIN", "HELP",
];

lazy_static! {
    static ref ROW_RETURNING_RE: Regex = Regex::new(&format!(
        "(?mi)^(?:{})",
        ROW_RETURNING_COMMANDS.join("|")
    ))
    .expect("row-returning keyword regex");
    static ref SELECT_RE: Regex = Regex::new("(?mi)^SELECT").expect("select regex");
    static ref SELECT_COUNT_RE: Regex =
        Regex::new("(?mi)^SELECT COUNT").expect("select count regex");
}

/// True when the statement belongs to the row-returning command set.
pub fn returns_rows(query: &str) -> bool {
    ROW_RETURNING_RE.is_match(query)
}

/// True when the statement begins with SELECT.
pub fn is_select(query: &str) -> bool {
    SELECT_RE.is_match(query)
}

/// True when the statement begins with SELECT COUNT.
pub fn is_select_count(query: &str) -> bool {
    SELECT_COUNT_RE.is_match(query)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matches_row_returning_keywords() {
        assert!(returns_rows("SELECT * FROM t"));
        assert!(returns_rows("select 1"));
        assert!(returns_rows("SHOW TABLES"));
        assert!(returns_rows("EXPLAIN SELECT 1"));
        assert!(returns_rows("describe t"));
        assert!(!returns_rows("INSERT INTO t VALUES (1)"));
        assert!(!returns_rows("UPDATE t SET a = 1"));
        assert!(!returns_rows("DELETE FROM t"));
    }

    #[test]
    fn matches_at_start_of_any_line() {
        assert!(returns_rows("-- comment\nSELECT 1"));
        assert!(!returns_rows("INSERT INTO t -- SELECT inside a comment"));
    }

    #[test]
    fn select_and_select_count() {
        assert!(is_select("SELECT a FROM t"));
        assert!(!is_select("UPDATE t SET a = 1"));
        assert!(is_select_count("SELECT COUNT(*) FROM t"));
        assert!(is_select_count("select count(*) from t"));
        assert!(!is_select_count("SELECT a FROM t"));
    }
}

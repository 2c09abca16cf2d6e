//! Lightweight SQL validation
//!
//! Structural checks only, no full parse. Issues mark a statement invalid;
//! warnings flag style problems but never block a result.

use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// Outcome of validating a single SQL statement
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationReport {
    /// False when any issue was found
    pub syntax_valid: bool,
    /// Problems that make the statement unusable
    pub issues: Vec<String>,
    /// Style problems worth surfacing but not failing over
    pub warnings: Vec<String>,
}

impl Default for ValidationReport {
    fn default() -> Self {
        Self {
            syntax_valid: true,
            issues: Vec::new(),
            warnings: Vec::new(),
        }
    }
}

impl ValidationReport {
    fn issue(&mut self, msg: impl Into<String>) {
        self.syntax_valid = false;
        self.issues.push(msg.into());
    }

    fn warn(&mut self, msg: impl Into<String>) {
        self.warnings.push(msg.into());
    }
}

fn empty_select_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\bSELECT\s+FROM\b").expect("valid empty-select regex"))
}

fn dangling_from_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\bFROM\s*(?:;|$)").expect("valid dangling-from regex"))
}

/// Validate a SQL statement
///
/// Pure function of its input: validating the same statement twice yields
/// the same report, and nothing about agent or runner state feeds into it.
pub fn validate_sql(sql: &str) -> ValidationReport {
    let mut report = ValidationReport::default();
    let trimmed = sql.trim();

    if trimmed.is_empty() {
        report.issue("Empty SQL statement");
        return report;
    }

    let upper = trimmed.to_uppercase();

    // The first semicolon terminates the statement; anything after it is
    // either a stray second statement or model chatter
    match trimmed.find(';') {
        None => report.warn("Query missing semicolon"),
        Some(pos) => {
            if !trimmed[pos + 1..].trim().is_empty() {
                report.issue("Trailing content after the terminating semicolon");
            }
        }
    }

    const STATEMENT_KEYWORDS: [&str; 4] = ["SELECT", "INSERT", "UPDATE", "DELETE"];
    if !STATEMENT_KEYWORDS.iter().any(|kw| upper.contains(kw)) {
        report.issue("No valid SQL statement found");
        return report;
    }

    if empty_select_re().is_match(&upper) {
        report.issue("SELECT clause lists no columns");
    }

    if dangling_from_re().is_match(&upper) {
        report.issue("FROM clause names no table");
    }

    let opens = trimmed.matches('(').count();
    let closes = trimmed.matches(')').count();
    if opens != closes {
        report.issue(format!(
            "Unbalanced parentheses: {} opening, {} closing",
            opens, closes
        ));
    }

    if upper.matches("SELECT").count() != upper.matches("FROM").count() {
        report.warn("Mismatched SELECT and FROM clauses");
    }

    if upper.contains("SELECT *") {
        report.warn("SELECT * retrieves all columns; consider listing the ones you need");
    }

    report
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_statement() {
        let report = validate_sql("SELECT id, name FROM customers;");
        assert!(report.syntax_valid);
        assert!(report.issues.is_empty());
        assert!(report.warnings.is_empty());
    }

    #[test]
    fn test_select_star_warns_but_passes() {
        let report = validate_sql("SELECT * FROM customers");
        assert!(report.syntax_valid);
        assert!(report.issues.is_empty());
        assert_eq!(report.warnings.len(), 2);
        assert!(report.warnings.iter().any(|w| w.contains("semicolon")));
        assert!(report.warnings.iter().any(|w| w.contains("SELECT *")));
    }

    #[test]
    fn test_empty_select_clause_fails() {
        let report = validate_sql("SELECT FROM customers;");
        assert!(!report.syntax_valid);
        assert!(report.issues.iter().any(|i| i.contains("no columns")));
    }

    #[test]
    fn test_dangling_from_fails() {
        let report = validate_sql("SELECT id FROM;");
        assert!(!report.syntax_valid);
        assert!(report.issues.iter().any(|i| i.contains("no table")));
    }

    #[test]
    fn test_no_statement_keyword() {
        let report = validate_sql("DROP TABLE customers;");
        assert!(!report.syntax_valid);
        assert!(report.issues.iter().any(|i| i.contains("No valid SQL")));
    }

    #[test]
    fn test_empty_input() {
        let report = validate_sql("   ");
        assert!(!report.syntax_valid);
        assert!(!report.issues.is_empty());
    }

    #[test]
    fn test_select_without_from_warns() {
        let report = validate_sql("SELECT 1;");
        assert!(report.syntax_valid);
        assert!(report.warnings.iter().any(|w| w.contains("Mismatched")));
    }

    #[test]
    fn test_unbalanced_parentheses_fail() {
        let report = validate_sql("SELECT SUM(total FROM orders;");
        assert!(!report.syntax_valid);
        assert!(report.issues.iter().any(|i| i.contains("parentheses")));
    }

    #[test]
    fn test_balanced_subquery_passes() {
        let report = validate_sql("SELECT id FROM (SELECT id FROM orders) sub;");
        assert!(report.syntax_valid);
        assert!(report.issues.is_empty());
    }

    #[test]
    fn test_trailing_content_after_semicolon_fails() {
        let report = validate_sql("SELECT id FROM orders; DROP TABLE orders");
        assert!(!report.syntax_valid);
        assert!(report.issues.iter().any(|i| i.contains("Trailing content")));
    }

    #[test]
    fn test_validation_is_idempotent() {
        let sql = "SELECT * FROM orders";
        assert_eq!(validate_sql(sql), validate_sql(sql));
    }
}

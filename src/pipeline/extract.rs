//! Response extraction
//!
//! Models routinely wrap the requested JSON in markdown fences, prose, or
//! single quotes, or skip it entirely and answer with raw SQL. These helpers
//! recover the payload with a ladder of progressively looser parses.

use std::sync::OnceLock;

use regex::Regex;
use serde_json::Value;
use tracing::debug;

/// JSON key carrying the generated SQL statement
pub const SQL_KEY: &str = "sql";

/// JSON key carrying the selected table list
pub const TABLES_KEY: &str = "tables";

fn embedded_object_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"\{[^{}]*(?:\{[^{}]*\}[^{}]*)*\}").expect("valid embedded object regex")
    })
}

fn select_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?is)\b(SELECT\b.*?)(?:;|\z)").expect("valid select regex"))
}

fn from_join_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)\b(?:FROM|JOIN)\s+([A-Za-z_][\w.]*)").expect("valid from/join regex")
    })
}

/// Strip markdown fences and surrounding whitespace
fn strip_artifacts(text: &str) -> String {
    text.replace("```json", "")
        .replace("```sql", "")
        .replace("```", "")
        .trim()
        .to_string()
}

/// Recover a JSON value from model output
///
/// Tries, in order: a direct parse, a parse after replacing single quotes,
/// and a scan over objects embedded in prose (from the end, since trailing
/// objects tend to be the actual answer).
pub fn extract_json(text: &str) -> Option<Value> {
    let cleaned = strip_artifacts(text);
    if cleaned.is_empty() {
        return None;
    }

    if let Ok(value) = serde_json::from_str::<Value>(&cleaned) {
        debug!("parsed response as direct JSON");
        return Some(value);
    }

    let requoted = cleaned.replace('\'', "\"");
    if let Ok(value) = serde_json::from_str::<Value>(&requoted) {
        debug!("parsed response after quote repair");
        return Some(value);
    }

    let candidates: Vec<&str> = embedded_object_re()
        .find_iter(&cleaned)
        .map(|m| m.as_str())
        .collect();
    for candidate in candidates.iter().rev() {
        if let Ok(value) = serde_json::from_str::<Value>(candidate) {
            if value.get(SQL_KEY).is_some() || value.get(TABLES_KEY).is_some() {
                debug!("parsed JSON object embedded in prose");
                return Some(value);
            }
        }
    }

    None
}

/// Recover a SQL statement from model output
pub fn extract_sql(text: &str) -> Option<String> {
    let cleaned = strip_artifacts(text);
    if cleaned.is_empty() {
        return None;
    }

    if let Some(value) = extract_json(&cleaned) {
        match value {
            Value::Object(map) => {
                if let Some(Value::String(sql)) = map.get(SQL_KEY) {
                    let sql = sql.trim();
                    if !sql.is_empty() {
                        return Some(sql.to_string());
                    }
                }
            }
            Value::String(s) => {
                let sql = s.trim();
                if !sql.is_empty() {
                    return Some(sql.to_string());
                }
            }
            _ => {}
        }
    }

    // Last resort: lift a bare SELECT statement out of the text
    if let Some(caps) = select_re().captures(&cleaned) {
        if let Some(m) = caps.get(1) {
            let sql = m.as_str().trim();
            if !sql.is_empty() {
                debug!("extracted raw SQL from response");
                return Some(sql.to_string());
            }
        }
    }

    None
}

/// Recover a table-name list from model output
pub fn extract_tables(text: &str) -> Vec<String> {
    let cleaned = strip_artifacts(text);
    if cleaned.is_empty() {
        return Vec::new();
    }

    if let Some(value) = extract_json(&cleaned) {
        let listed = match value {
            Value::Object(ref map) => map.get(TABLES_KEY).cloned(),
            other => Some(other),
        };
        if let Some(listed) = listed {
            let names = table_list_from_value(&listed);
            if !names.is_empty() {
                return names;
            }
        }
    }

    // A model sometimes answers with just the table name
    let upper = cleaned.to_uppercase();
    if !cleaned.contains('{') && !cleaned.contains('[') && !upper.contains("SELECT") {
        let bare = cleaned.trim().trim_matches('"').trim_matches('\'');
        if !bare.is_empty()
            && bare
                .chars()
                .all(|c| c.is_alphanumeric() || c == '_' || c == '.')
        {
            debug!(table = bare, "detected raw table name");
            return vec![bare.to_string()];
        }
    }

    // Or with SQL instead of a table list
    if upper.contains("SELECT") {
        return table_names_in_sql(&cleaned);
    }

    Vec::new()
}

fn table_list_from_value(value: &Value) -> Vec<String> {
    match value {
        Value::Array(items) => items
            .iter()
            .filter_map(|v| v.as_str())
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect(),
        Value::String(s) if !s.trim().is_empty() => vec![s.trim().to_string()],
        _ => Vec::new(),
    }
}

/// Extract table names referenced by FROM and JOIN clauses
///
/// Schema prefixes are stripped and names are uppercased, matching how the
/// catalog resolves them case-insensitively.
pub fn table_names_in_sql(sql: &str) -> Vec<String> {
    const STOPWORDS: [&str; 5] = ["WHERE", "GROUP", "ORDER", "LIMIT", "SELECT"];

    let mut tables = Vec::new();
    for caps in from_join_re().captures_iter(sql) {
        if let Some(m) = caps.get(1) {
            let raw = m.as_str();
            let bare = raw.rsplit('.').next().unwrap_or(raw);
            let name = bare.to_uppercase();
            if !name.is_empty() && !STOPWORDS.contains(&name.as_str()) && !tables.contains(&name) {
                tables.push(name);
            }
        }
    }
    tables
}

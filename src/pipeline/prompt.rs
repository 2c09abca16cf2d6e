//! Prompt templates for the SQL generation pipeline
//!
//! Every template that expects structured output spells out the exact JSON
//! shape, since smaller local models drift without it.

/// Prompt asking the model to pick relevant tables from catalog context
///
/// Expected response: `{"tables": ["customers", "orders"]}`
pub fn table_selection_prompt(context: &str, question: &str) -> String {
    format!(
        r#"You are an assistant in understanding business requests and table metadata.

The metadata is provided in the following format for each entry:

table_name: table_description

Based on the metadata above, identify all tables that are relevant to the request.

Output format must be EXACTLY:
{{"tables": ["table_a", "table_b"]}}

Rules:
- The JSON element "tables" must contain a list of table names, always under the key "tables"
- Only list table names that are explicitly mentioned or clearly implied by the request
- Output JSON ONLY, if multiple tables, list them all in a JSON array
- No explanation
- No markdown
- Do not hallucinate table names

Metadata:
{context}

Question:
{question}
"#
    )
}

/// Prompt asking the model to generate SQL against the given metadata
///
/// Expected response: `{"sql": "SELECT ..."}`
pub fn sql_prompt(metadata: &str, question: &str, dialect: &str, analysis: Option<&str>) -> String {
    let analysis_section = match analysis {
        Some(text) => format!(
            "====================\nQUERY ANALYSIS\n====================\n{}\n\n",
            text
        ),
        None => String::new(),
    };

    format!(
        r#"You are a senior SQL engineer. Your task is to generate SQL queries based on business requirements. You MUST ALWAYS return your answer as valid JSON, nothing else.

====================
TABLE METADATA
====================
{metadata}

{analysis_section}====================
BUSINESS QUESTION
====================
{question}

====================
DATABASE TYPE
====================
{dialect}

====================
CRITICAL REQUIREMENTS
====================
1. You MUST return ONLY valid JSON format
2. Use ONLY the tables and columns from the metadata provided above
3. When a table lists a schema, always prefix the table name with it (e.g., DATA.PRIM_PARTY)
4. Write SQL that is executable on the specified database
5. Do NOT provide any explanation, only the JSON response

====================
RESPONSE FORMAT (STRICT JSON)
====================
Return ONLY this JSON format:

{{"sql": "SELECT * FROM customers WHERE id = 1;"}}

Important: Your ENTIRE response must be ONLY the JSON above, starting with {{ and ending with }}.
Do not include any text before or after the JSON.
Do not include markdown code blocks.
"#
    )
}

/// Stripped-down retry prompt for models that ignore the structured one
pub fn simplified_sql_prompt(metadata: &str, question: &str) -> String {
    format!(
        r#"Generate SQL query.

Tables:
{metadata}

Query: {question}

Output JSON:
{{"sql": "SELECT * FROM some_table"}}

Your response:
"#
    )
}

/// Analysis prompt used by the agent's thinking phase
pub fn thinking_prompt(question: &str) -> String {
    format!(
        r#"Analyze this database query request and break it down:
- What tables might be involved?
- What is the user trying to accomplish?
- Are there any constraints or conditions?

User Query: {question}

Provide your analysis:
"#
    )
}

/// Prompt asking the model to explain a SQL statement in business terms
pub fn explain_prompt(sql: &str) -> String {
    format!(
        r#"Explain this SQL query in simple business terms:

{sql}

Provide a clear explanation of:
1. What data is being retrieved
2. Which tables are involved
3. What conditions are applied
4. How results are organized
"#
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sql_prompt_includes_sections() {
        let prompt = sql_prompt("Table: orders", "total per customer", "sqlite", None);
        assert!(prompt.contains("TABLE METADATA"));
        assert!(prompt.contains("sqlite"));
        assert!(prompt.contains(r#"{"sql":"#));
        assert!(!prompt.contains("QUERY ANALYSIS"));
    }

    #[test]
    fn test_sql_prompt_with_analysis() {
        let prompt = sql_prompt("Table: orders", "q", "sqlite", Some("joins orders to customers"));
        assert!(prompt.contains("QUERY ANALYSIS"));
        assert!(prompt.contains("joins orders to customers"));
    }

    #[test]
    fn test_table_selection_prompt_names_key() {
        let prompt = table_selection_prompt("orders: placed orders", "how many orders");
        assert!(prompt.contains(r#""tables""#));
        assert!(prompt.contains("how many orders"));
    }
}

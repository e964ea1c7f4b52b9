//! Prompt Assembler
//!
//! Builds the instruction text for both model calls. The translation prompt
//! is rebuilt for every request so the timestamp and the role's scoped schema
//! are always current.

use std::fmt::Write as _;

use chrono::{DateTime, Utc};

use crate::action::DisplayHint;
use crate::executor::Record;
use crate::schema::ScopedSchema;

/// Translation prompt: role, clock, scoped schema, output contract and rules
pub fn build_prompt(scoped: &ScopedSchema, role: &str, now: DateTime<Utc>) -> String {
    let mut prompt = String::new();
    let _ = writeln!(
        prompt,
        "You are an ERP assistant that answers questions about live business records."
    );
    let _ = writeln!(prompt, "Current time: {}", now.format("%Y-%m-%d %H:%M UTC (%A)"));
    let _ = writeln!(prompt, "User role: {}", role);
    prompt.push('\n');

    prompt.push_str("ACCESSIBLE SCHEMA (the only tables and fields you may use):\n");
    prompt.push_str(&scoped.describe());
    prompt.push_str("\n\n");

    prompt.push_str(OUTPUT_CONTRACT);
    prompt.push('\n');
    prompt.push_str(RULES);

    if scoped.is_empty() {
        let _ = write!(
            prompt,
            "\nThe role '{}' cannot read any table. Do not emit JSON. Politely explain \
             that this role has no data access.\n",
            role
        );
    }
    prompt
}

const OUTPUT_CONTRACT: &str = r#"OUTPUT FORMAT:
When the question needs data, reply with exactly one JSON object and nothing else:
{
  "type": "count" | "query",
  "table": "<table name copied exactly from the schema>",
  "filters": [{"column": "<field>", "operator": "eq|ilike|gt|lt|gte|lte", "value": <string|number|boolean>}],
  "fields": ["<field>", ...],
  "limit": <number, default 10, at most 100>,
  "order": "<field> asc|desc",
  "display": "table" | "stat" | "chart" | "trend"
}
- Use "count" when the user only asks how many records exist. Count takes no fields, limit, order or display.
- Use "query" to list, search or rank records. Omit "fields" to return every field.
- Use "display": "chart" for comparisons, "trend" for changes over time, "stat" for a single figure, otherwise "table".
"#;

const RULES: &str = r#"RULES:
- Never invent table or field names. Copy them exactly from the schema above.
- For names, emails and other free text prefer "ilike" (case-insensitive contains) over "eq".
- When the user mentions a status word, map it to the listed field value (for example a keyword listed under state 'sale' becomes {"column": "state", "operator": "eq", "value": "sale"}).
- Dates are compared as "YYYY-MM-DD" strings with gt/lt/gte/lte.
- "Top", "most" or "highest" questions sort the relevant numeric field descending.
- Only simple filters and ordering are possible. Never use SQL or aggregate functions.
- If no accessible table can answer the question, do not emit JSON. Reply in natural language that none of the available tables can answer it.
- Greetings and small talk get a short natural-language reply without JSON.
- Reply in the user's language.
"#;

/// Summarization instruction for a retrieved result
pub fn build_summary_prompt(display: DisplayHint, is_fallback: bool) -> String {
    let mut prompt = String::from(
        "You are a helpful ERP assistant. Answer the user's question using only the \
         supplied records. Stay strictly faithful to the data.\n",
    );

    prompt.push_str("- Use the supplied row count for any \"how many\" question. Never invent numbers.\n");

    match display {
        DisplayHint::Table | DisplayHint::Chart => {
            prompt.push_str(
                "- The records are already rendered for the user as a table or chart. Do not \
                 repeat every row; give a short overview and point out what stands out.\n",
            );
        }
        DisplayHint::Trend => {
            prompt.push_str(
                "- The records are already rendered as a trend chart. Do not repeat every \
                 row; describe the direction of change.\n\
                 - You may add one short forward-looking remark, clearly worded as an \
                 estimate and never stated as fact.\n",
            );
        }
        DisplayHint::Stat => {
            prompt.push_str("- Lead with the key figure in a single sentence.\n");
        }
    }

    if is_fallback {
        prompt.push_str(
            "- IMPORTANT: nothing matched the user's exact criteria. These are \
             unfiltered sample records shown as an alternative. Say so clearly at the start \
             of the answer and do not describe them as the latest or newest records.\n",
        );
    }

    prompt.push_str("- Reply in the user's language.\n");
    prompt
}

/// Payload for the summarization call: row count, rows as JSON, and the question.
///
/// Rows are serialized whole until `max_chars` is spent; the count always
/// reflects every supplied row.
pub fn build_summary_message(
    rows: &[Record],
    is_fallback: bool,
    question: &str,
    max_chars: usize,
) -> String {
    let (json, included) = rows_json(rows, max_chars);

    let mut message = String::new();
    let _ = writeln!(message, "RETRIEVED DATA:");
    let _ = writeln!(message, "- Total row count: {}", rows.len());
    if is_fallback {
        let _ = writeln!(
            message,
            "- Approximate: no record matched the filters; these are unfiltered results."
        );
    }
    if included < rows.len() {
        let _ = writeln!(
            message,
            "- Only the first {} rows are shown below to save space.",
            included
        );
    }
    let _ = writeln!(message, "- Rows (JSON): {}", json);
    message.push('\n');
    let _ = write!(
        message,
        "Answer using the total row count above ({}) whenever a count is needed.\n\n",
        rows.len()
    );
    let _ = write!(message, "User question: {}", question);
    message
}

/// JSON array of as many whole rows as fit in `max_chars`
fn rows_json(rows: &[Record], max_chars: usize) -> (String, usize) {
    let mut json = String::from("[");
    let mut included = 0;
    for row in rows {
        let encoded = serde_json::Value::Object(row.clone()).to_string();
        let needed = encoded.len() + usize::from(included > 0) + 1;
        if json.len() + needed > max_chars && included > 0 {
            break;
        }
        if included > 0 {
            json.push(',');
        }
        json.push_str(&encoded);
        included += 1;
    }
    json.push(']');
    (json, included)
}

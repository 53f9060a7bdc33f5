//! Repair of LLM-emitted MongoDB aggregation queries
//!
//! The model answers with shell syntax such as
//! `db.titanic.aggregate([{ $group: { _id: "$parch" } }])`. That is not JSON:
//! keys are unquoted and field names may be cased differently from the
//! collection. The functions here extract the pipeline argument, restore the
//! real field casing, quote the keys and parse the result.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use serde_json::Value as JsonValue;

use crate::error::QueryError;

const AGGREGATE_CALL: &str = ".aggregate(";

static FENCE_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)```[\w-]*[ \t]*\r?\n?(.*?)```").unwrap());

static UNQUOTED_KEY_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"([{,]\s*)(\$?\w+)\s*:"#).unwrap());

/// A pipeline recovered from model output, ready to run
#[derive(Debug, Clone, PartialEq)]
pub struct RepairedQuery {
    /// Collection named in `db.<collection>.aggregate(`
    pub collection: Option<String>,
    /// Raw argument of `.aggregate(...)` as the model wrote it
    pub pipeline_source: String,
    /// The argument after case fixing and key quoting
    pub cleaned: String,
    pub pipeline: Vec<JsonValue>,
}

/// Return the body of a markdown code fence, or the trimmed text when there is none.
pub fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    match FENCE_REGEX.captures(trimmed).and_then(|c| c.get(1)) {
        Some(body) => body.as_str().trim(),
        None => trimmed,
    }
}

/// Extract the argument of `db.<collection>.aggregate(...)`.
///
/// Returns the text between the first `.aggregate(` and the last `)`, or
/// `None` when the query is not an aggregate call.
pub fn extract_pipeline(query: &str) -> Option<&str> {
    if !query.starts_with("db.") {
        return None;
    }
    let start = query.find(AGGREGATE_CALL)? + AGGREGATE_CALL.len();
    let end = query.rfind(')')?;
    if end < start {
        return None;
    }
    Some(&query[start..end])
}

/// Collection name in `db.<collection>.aggregate(`
pub fn collection_name(query: &str) -> Option<&str> {
    let rest = query.strip_prefix("db.")?;
    let name = &rest[..rest.find(AGGREGATE_CALL)?];
    let valid = !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_alphanumeric() || c == '_' || c == '-');
    valid.then_some(name)
}

/// Convert shell-style query text to JSON by quoting every unquoted key,
/// `$operators` included. Newlines are dropped first.
pub fn clean_mongo_syntax(js_like_query: &str) -> String {
    let single_line = js_like_query.replace('\n', "");
    UNQUOTED_KEY_REGEX
        .replace_all(single_line.trim(), r#"${1}"${2}":"#)
        .into_owned()
}

/// Restore the collection's field casing in references such as `"$age"` or
/// `_id: $parch`.
pub fn fix_field_case<S: AsRef<str>>(pipeline: &str, actual_fields: &[S]) -> String {
    let mut fixed = pipeline.to_string();
    for field in actual_fields {
        let field = field.as_ref();
        if field.is_empty() {
            continue;
        }
        let pattern = format!(
            r#"(?i)(\$|["\s]){}(["\s]|[^\w])"#,
            regex::escape(&field.to_lowercase())
        );
        let Ok(re) = Regex::new(&pattern) else {
            continue;
        };
        fixed = re
            .replace_all(&fixed, |caps: &Captures| {
                format!("{}{}{}", &caps[1], field, &caps[2])
            })
            .into_owned();
    }
    fixed
}

/// Run the full repair: unfence, extract, fix casing, quote keys, parse.
pub fn repair<S: AsRef<str>>(raw: &str, actual_fields: &[S]) -> Result<RepairedQuery, QueryError> {
    let text = strip_code_fence(raw);
    if text.is_empty() {
        return Err(QueryError::EmptyResponse);
    }

    let source =
        extract_pipeline(text).ok_or_else(|| QueryError::NotAnAggregation(text.to_string()))?;
    let cased = fix_field_case(source, actual_fields);
    let cleaned = clean_mongo_syntax(&cased);

    let parsed: JsonValue =
        serde_json::from_str(&cleaned).map_err(|source| QueryError::InvalidPipeline {
            cleaned: cleaned.clone(),
            source,
        })?;

    let pipeline = match parsed {
        JsonValue::Array(stages) => stages,
        other => return Err(QueryError::NotAnArray(other.to_string())),
    };

    Ok(RepairedQuery {
        collection: collection_name(text).map(str::to_string),
        pipeline_source: source.to_string(),
        cleaned,
        pipeline,
    })
}

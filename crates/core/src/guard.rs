//! Read-only checks on repaired aggregation pipelines

use serde_json::Value as JsonValue;

use crate::error::QueryError;
use crate::records::is_login_collection;

/// Stages that write their input somewhere
const WRITE_STAGES: [&str; 2] = ["$out", "$merge"];

/// Reject pipelines that write, or that read a collection `may_read` refuses.
///
/// Nested pipelines (`$facet`, `$lookup.pipeline`, `$unionWith.pipeline`) are
/// walked too. Login collections are refused whatever `may_read` says.
pub fn check_pipeline<F>(pipeline: &[JsonValue], may_read: F) -> Result<(), QueryError>
where
    F: Fn(&str) -> bool,
{
    pipeline.iter().try_for_each(|stage| check_value(stage, &may_read))
}

fn check_value<F>(value: &JsonValue, may_read: &F) -> Result<(), QueryError>
where
    F: Fn(&str) -> bool,
{
    match value {
        JsonValue::Array(items) => items.iter().try_for_each(|v| check_value(v, may_read)),
        JsonValue::Object(map) => {
            for (key, inner) in map {
                if WRITE_STAGES.contains(&key.as_str()) {
                    return Err(QueryError::WriteStage(key.clone()));
                }
                let source = match key.as_str() {
                    "$lookup" | "$graphLookup" => inner.get("from"),
                    "$unionWith" => match inner {
                        JsonValue::Object(spec) => spec.get("coll"),
                        other => Some(other),
                    },
                    _ => None,
                };
                if let Some(source) = source {
                    check_source(source, may_read)?;
                }
                check_value(inner, may_read)?;
            }
            Ok(())
        }
        _ => Ok(()),
    }
}

fn check_source<F>(source: &JsonValue, may_read: &F) -> Result<(), QueryError>
where
    F: Fn(&str) -> bool,
{
    match source.as_str() {
        Some(name) if !is_login_collection(name) && may_read(name) => Ok(()),
        Some(name) => Err(QueryError::RestrictedCollection(name.to_string())),
        // `{db, coll}` sources reach outside this database
        None => Err(QueryError::RestrictedCollection(source.to_string())),
    }
}

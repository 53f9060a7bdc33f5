//! Repair and execution of model-generated aggregation queries

use futures::TryStreamExt;
use mediquest_core::records::{PATIENT_RECORDS, is_login_collection};
use mediquest_core::{QueryError, check_pipeline, repair};
use mongodb::{
    Collection,
    bson::{self, Bson, Document, doc},
};
use serde::Serialize;
use serde_json::{Map, Value as JsonValue};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExecutionError {
    #[error(transparent)]
    Query(#[from] QueryError),

    #[error("Pipeline stage is not a valid BSON document: {0}")]
    Encode(#[from] bson::ser::Error),

    #[error("Database error: {0}")]
    Database(#[from] mongodb::error::Error),
}

/// A repaired pipeline and the documents it produced
#[derive(Debug, Clone, Serialize)]
pub struct QueryExecution {
    pub collection: String,
    pub pipeline: Vec<JsonValue>,
    pub results: Vec<JsonValue>,
}

/// What a query may touch beyond its own collection
#[derive(Debug, Clone, Default)]
pub struct QueryScope {
    /// Collections `$lookup`, `$graphLookup` and `$unionWith` may read
    pub readable: Vec<String>,
    /// When set, queries on `patient_records` only see these patients
    pub patient_ids: Option<Vec<String>>,
}

impl QueryScope {
    /// Lookups limited to `readable`, every patient visible
    pub fn readable(readable: Vec<String>) -> Self {
        Self {
            readable,
            patient_ids: None,
        }
    }

    /// No lookups, and only the given patients
    pub fn patients(patient_ids: Vec<String>) -> Self {
        Self {
            readable: Vec::new(),
            patient_ids: Some(patient_ids),
        }
    }

    fn may_read(&self, name: &str) -> bool {
        self.readable.iter().any(|r| r == name)
    }

    /// Check `pipeline` and prepend the patient filter when it applies
    pub fn apply(
        &self,
        collection: &str,
        pipeline: Vec<JsonValue>,
    ) -> Result<Vec<JsonValue>, QueryError> {
        if is_login_collection(collection) {
            return Err(QueryError::RestrictedCollection(collection.to_string()));
        }
        check_pipeline(&pipeline, |name| self.may_read(name))?;

        match &self.patient_ids {
            Some(ids) if collection == PATIENT_RECORDS => {
                let mut scoped = Vec::with_capacity(pipeline.len() + 1);
                scoped.push(serde_json::json!({ "$match": { "patient_id": { "$in": ids } } }));
                scoped.extend(pipeline);
                Ok(scoped)
            }
            _ => Ok(pipeline),
        }
    }
}

/// Field names of one sample document; empty for an empty collection
pub async fn collection_fields(
    collection: &Collection<Document>,
) -> Result<Vec<String>, mongodb::error::Error> {
    let sample = collection.find_one(doc! {}).await?;
    Ok(sample
        .map(|d| d.keys().cloned().collect())
        .unwrap_or_default())
}

/// Describe a collection as `{name: {field: type}}` from one sample document
pub async fn infer_schema(
    collection: &Collection<Document>,
) -> Result<JsonValue, mongodb::error::Error> {
    let sample = collection.find_one(doc! {}).await?.unwrap_or_default();
    Ok(schema_from_sample(collection.name(), &sample))
}

pub fn schema_from_sample(collection: &str, sample: &Document) -> JsonValue {
    let mut schema = Map::new();
    schema.insert(collection.to_string(), describe_document(sample));
    JsonValue::Object(schema)
}

fn describe_document(document: &Document) -> JsonValue {
    JsonValue::Object(
        document
            .iter()
            .map(|(key, value)| (key.clone(), describe(value)))
            .collect(),
    )
}

fn describe(value: &Bson) -> JsonValue {
    let name = match value {
        Bson::Document(inner) => return describe_document(inner),
        Bson::Array(items) => return JsonValue::Array(items.first().map(describe).into_iter().collect()),
        Bson::ObjectId(_) => "ObjectId",
        Bson::String(_) => "string",
        Bson::Int32(_) => "int",
        Bson::Int64(_) => "long",
        Bson::Double(_) => "double",
        Bson::Decimal128(_) => "decimal",
        Bson::Boolean(_) => "bool",
        Bson::DateTime(_) => "date",
        Bson::Timestamp(_) => "timestamp",
        Bson::Null => "null",
        _ => "other",
    };
    JsonValue::String(name.to_string())
}

/// Repair a model-emitted `db.<c>.aggregate([...])` string and run it.
///
/// Field casing is restored from a sample document of `collection`. Write
/// stages and reads outside `scope` are refused before anything runs. An
/// empty result set is not an error.
pub async fn run_mongo_query(
    collection: &Collection<Document>,
    raw_query: &str,
    scope: &QueryScope,
) -> Result<QueryExecution, ExecutionError> {
    if is_login_collection(collection.name()) {
        return Err(QueryError::RestrictedCollection(collection.name().to_string()).into());
    }
    let fields = collection_fields(collection).await?;
    let repaired = match repair(raw_query, &fields) {
        Ok(repaired) => repaired,
        Err(e) => {
            metrics::counter!("query_repairs_total", "outcome" => "failed").increment(1);
            return Err(e.into());
        }
    };
    metrics::counter!("query_repairs_total", "outcome" => "repaired").increment(1);

    if let Some(named) = repaired
        .collection
        .as_deref()
        .filter(|named| *named != collection.name())
    {
        tracing::warn!(
            named = named,
            running_on = collection.name(),
            "Query names a different collection"
        );
    }

    let pipeline = match scope.apply(collection.name(), repaired.pipeline) {
        Ok(pipeline) => pipeline,
        Err(e) => {
            tracing::warn!(error = %e, "Refused aggregation pipeline");
            metrics::counter!("query_repairs_total", "outcome" => "refused").increment(1);
            return Err(e.into());
        }
    };

    let stages = pipeline
        .iter()
        .map(bson::to_document)
        .collect::<Result<Vec<Document>, _>>()?;
    tracing::info!(pipeline = %repaired.cleaned, "Parsed aggregation pipeline");

    let documents: Vec<Document> = collection.aggregate(stages).await?.try_collect().await?;
    if documents.is_empty() {
        tracing::info!("No matching documents found");
    }

    Ok(QueryExecution {
        collection: collection.name().to_string(),
        pipeline,
        results: documents
            .into_iter()
            .map(|d| Bson::Document(d).into_relaxed_extjson())
            .collect(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use mongodb::bson::oid::ObjectId;
    use serde_json::json;

    #[test]
    fn test_schema_from_sample() {
        let sample = doc! {
            "_id": ObjectId::new(),
            "patient_id": "PAT1000",
            "age": 44,
            "weight": 71.5,
            "visits": [{ "date": "2024-01-01", "cost": 12_i64 }],
            "address": { "city": "Springfield" },
            "tags": [],
        };
        assert_eq!(
            schema_from_sample("patient_records", &sample),
            json!({
                "patient_records": {
                    "_id": "ObjectId",
                    "patient_id": "string",
                    "age": "int",
                    "weight": "double",
                    "visits": [{"date": "string", "cost": "long"}],
                    "address": {"city": "string"},
                    "tags": []
                }
            })
        );
    }

    #[test]
    fn test_scope_prepends_patient_filter() {
        let scope = QueryScope::patients(vec!["PAT1000".to_string()]);
        let pipeline = scope
            .apply("patient_records", vec![json!({"$count": "n"})])
            .unwrap();
        assert_eq!(
            pipeline,
            vec![
                json!({"$match": {"patient_id": {"$in": ["PAT1000"]}}}),
                json!({"$count": "n"})
            ]
        );

        // Other collections are left alone
        let pipeline = scope.apply("titanic", vec![json!({"$count": "n"})]).unwrap();
        assert_eq!(pipeline.len(), 1);
    }

    #[test]
    fn test_patient_scope_forbids_lookups() {
        let scope = QueryScope::patients(vec!["PAT1000".to_string()]);
        let lookup = vec![json!({"$lookup": {"from": "patient_records", "as": "all"}})];
        assert!(matches!(
            scope.apply("patient_records", lookup),
            Err(QueryError::RestrictedCollection(_))
        ));
    }

    #[test]
    fn test_scope_refuses_login_collections_and_writes() {
        let scope = QueryScope::readable(vec!["doctor_login".to_string()]);
        assert!(matches!(
            scope.apply("doctor_login", vec![json!({"$match": {}})]),
            Err(QueryError::RestrictedCollection(_))
        ));
        let lookup = vec![json!({"$lookup": {"from": "doctor_login", "as": "l"}})];
        assert!(scope.apply("patient_records", lookup).is_err());
        assert!(matches!(
            scope.apply("patient_records", vec![json!({"$out": "patient_records"})]),
            Err(QueryError::WriteStage(_))
        ));
    }

    #[test]
    fn test_schema_flattens_for_prompt() {
        let sample = doc! { "_id": ObjectId::new(), "asthma": "no" };
        let schema = schema_from_sample("patient_records", &sample);
        assert_eq!(
            mediquest_core::flatten_schema(&schema),
            vec!["patient_records._id: ObjectId", "patient_records.asthma: string"]
        );
    }
}

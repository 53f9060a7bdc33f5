//! Shared application state

use mediquest_core::VectorIndex;
use mongodb::{Collection, Database, bson::Document};
use serde_json::Value as JsonValue;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::ai::Embedder;
use crate::config::Config;
use crate::db::EhrRepository;
use crate::error::AppError;

/// Patient record index, swapped whole on rebuild.
///
/// Readers take an `Arc` snapshot and release the lock at once.
#[derive(Clone, Default)]
pub struct SharedIndex(Arc<RwLock<Option<Arc<VectorIndex>>>>);

impl SharedIndex {
    pub fn new(index: Option<VectorIndex>) -> Self {
        Self(Arc::new(RwLock::new(index.map(Arc::new))))
    }

    pub async fn snapshot(&self) -> Option<Arc<VectorIndex>> {
        self.0.read().await.clone()
    }

    pub async fn replace(&self, index: VectorIndex) {
        *self.0.write().await = Some(Arc::new(index));
    }
}

#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub default_collection: String,
    /// Collections requests may query
    pub queryable: Vec<String>,
    /// Schema description from `SCHEMA_PATH`; sampled from the collection when absent
    pub schema: Option<Arc<JsonValue>>,
    pub embedder: Embedder,
    /// Patient record index for chat
    pub patient_index: SharedIndex,
    pub index_path: PathBuf,
}

impl AppState {
    pub fn new(db: Database, config: &Config) -> Self {
        let embedder = Embedder::from_settings(
            config.embedding_url.as_deref(),
            &config.embedding_model,
            config.embedding_api_key.as_deref(),
        );
        tracing::info!(embedder = %embedder.describe(), "Embeddings configured");

        Self {
            db,
            default_collection: config.collection.clone(),
            queryable: config.queryable_collections(),
            schema: config.schema_path.as_deref().and_then(load_schema).map(Arc::new),
            embedder,
            patient_index: SharedIndex::new(load_index(&config.index_path)),
            index_path: config.index_path.clone(),
        }
    }

    pub fn repository(&self) -> EhrRepository {
        EhrRepository::new(self.db.clone())
    }

    /// Named collection, or the configured default; 403 unless it is queryable
    pub fn query_collection(&self, name: Option<&str>) -> Result<Collection<Document>, AppError> {
        let name = name
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .unwrap_or(&self.default_collection);
        if !self.queryable.iter().any(|q| q == name) {
            tracing::warn!(collection = name, "Query on a collection outside the allow-list");
            return Err(AppError::Forbidden(format!(
                "Collection `{name}` cannot be queried."
            )));
        }
        Ok(self.db.collection(name))
    }
}

fn load_schema(path: &Path) -> Option<JsonValue> {
    let parsed = std::fs::read_to_string(path)
        .map_err(|e| e.to_string())
        .and_then(|text| serde_json::from_str(&text).map_err(|e| e.to_string()));
    match parsed {
        Ok(schema) => {
            tracing::info!(path = %path.display(), "Loaded query schema");
            Some(schema)
        }
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "Could not load query schema, sampling collections instead");
            None
        }
    }
}

fn load_index(path: &Path) -> Option<VectorIndex> {
    match VectorIndex::load(path) {
        Ok(index) => {
            tracing::info!(path = %path.display(), documents = index.len(), "Loaded patient record index");
            Some(index)
        }
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "Patient record index not loaded, chat disabled until rebuilt");
            None
        }
    }
}

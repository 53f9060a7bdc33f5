//! Server configuration

use std::path::PathBuf;

/// Configuration loaded from environment variables (and `.env` when present)
#[derive(Debug, Clone)]
pub struct Config {
    pub mongo_uri: String,
    pub db_name: String,
    /// Collection natural-language queries run against unless the request names one
    pub collection: String,
    /// Extra collections requests may name; login collections are always refused
    pub query_collections: Vec<String>,
    pub bind_address: String,
    pub cors_origins: Vec<String>,
    pub rate_limit_rps: u32,
    /// Login attempts allowed per minute from one client
    pub login_rate_limit_per_minute: u32,
    /// Sessions older than this are dropped
    pub session_ttl_secs: u64,
    pub groq_api_key: Option<String>,
    pub llm_base_url: String,
    pub llm_model: String,
    pub llm_timeout_secs: u64,
    /// OpenAI-compatible embeddings endpoint; the local hashing embedder is used when unset
    pub embedding_url: Option<String>,
    pub embedding_model: String,
    pub embedding_api_key: Option<String>,
    pub index_path: PathBuf,
    /// JSON schema description used for query generation instead of sampling the collection
    pub schema_path: Option<PathBuf>,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        dotenv::dotenv().ok();

        Self {
            mongo_uri: env_or("MONGO_URI", "mongodb://localhost:27017"),
            db_name: env_or("DB_NAME", "synthetic_ehr"),
            collection: env_or("COLLECTION_NAME", "patient_records"),
            query_collections: list_env("QUERY_COLLECTIONS", ""),
            bind_address: env_or("BIND_ADDRESS", "0.0.0.0:5000"),
            cors_origins: list_env("CORS_ORIGINS", "*"),
            rate_limit_rps: parsed_env("RATE_LIMIT_RPS", 50),
            login_rate_limit_per_minute: parsed_env("LOGIN_RATE_LIMIT_PER_MINUTE", 10),
            session_ttl_secs: parsed_env("SESSION_TTL_SECS", 12 * 60 * 60),
            groq_api_key: non_empty_env("GROQ_API_KEY"),
            llm_base_url: env_or("LLM_BASE_URL", crate::ai::client::DEFAULT_BASE_URL),
            llm_model: env_or("LLM_MODEL", crate::ai::client::DEFAULT_MODEL),
            llm_timeout_secs: parsed_env("LLM_TIMEOUT_SECS", 60),
            embedding_url: non_empty_env("EMBEDDING_URL"),
            embedding_model: env_or("EMBEDDING_MODEL", "all-MiniLM-L6-v2"),
            embedding_api_key: non_empty_env("EMBEDDING_API_KEY"),
            index_path: env_or("INDEX_PATH", "patient_index.json").into(),
            schema_path: non_empty_env("SCHEMA_PATH").map(PathBuf::from),
        }
    }

    /// Collections a request may name: the default plus `QUERY_COLLECTIONS`
    pub fn queryable_collections(&self) -> Vec<String> {
        let mut names = vec![self.collection.clone()];
        for name in &self.query_collections {
            if !names.contains(name) {
                names.push(name.clone());
            }
        }
        names.retain(|n| !mediquest_core::records::is_login_collection(n));
        names
    }
}

fn list_env(key: &str, default: &str) -> Vec<String> {
    env_or(key, default)
        .split(',')
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .collect()
}

fn parsed_env<T: std::str::FromStr>(key: &str, default: T) -> T {
    non_empty_env(key)
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn env_or(key: &str, default: &str) -> String {
    non_empty_env(key).unwrap_or_else(|| default.to_string())
}

fn non_empty_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_queryable_collections_drop_login_collections() {
        let mut config = Config::from_env();
        config.collection = "patient_records".to_string();
        config.query_collections = vec![
            "titanic".to_string(),
            "doctor_login".to_string(),
            "patient_records".to_string(),
        ];
        assert_eq!(config.queryable_collections(), vec!["patient_records", "titanic"]);
    }
}

//! Query, chat and summary endpoints

use axum::{Extension, Json, extract::State, response::IntoResponse};
use mediquest_core::{Role, TextualQuery};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::ai::{LlmClient, chat as record_chat, nl_query, retriever, summarize as summarizer};
use crate::db::{QueryExecution, QueryScope, executor, run_mongo_query};
use crate::error::AppError;
use crate::session::Session;
use crate::state::AppState;

/// Roles allowed to query the database directly
const QUERY_ROLES: [Role; 2] = [Role::Doctor, Role::Admin];

/// Request body for natural language queries
#[derive(Deserialize)]
pub struct NlQueryRequest {
    /// Plain question, or `mongo: <question> | <collection> : <fields>`
    question: String,
    #[serde(default)]
    collection: Option<String>,
}

/// Request body for executing a query string as-is
#[derive(Deserialize)]
pub struct ExecuteRequest {
    query: String,
    #[serde(default)]
    collection: Option<String>,
}

/// Generated (or submitted) query with its repaired pipeline and results
#[derive(Serialize)]
pub struct QueryResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    question: Option<String>,
    raw_query: String,
    count: usize,
    #[serde(flatten)]
    execution: QueryExecution,
}

impl QueryResponse {
    fn new(question: Option<String>, raw_query: String, execution: QueryExecution) -> Self {
        Self {
            question,
            raw_query,
            count: execution.results.len(),
            execution,
        }
    }
}

#[derive(Deserialize)]
pub struct ChatRequest {
    message: String,
}

#[derive(Serialize)]
pub struct ChatResponse {
    response: String,
}

#[derive(Deserialize)]
pub struct SummarizeRequest {
    document: JsonValue,
}

#[derive(Serialize)]
pub struct SummarizeResponse {
    summary: String,
}

#[derive(Serialize)]
pub struct IndexResponse {
    documents: usize,
    path: String,
}

/// Admins may look up across queryable collections; doctors see only their
/// connected patients and cannot join other collections.
async fn query_scope(state: &AppState, session: &Session) -> Result<QueryScope, AppError> {
    match session.role {
        Role::Doctor => {
            let ids = state
                .repository()
                .connected_patient_ids(&session.username)
                .await?;
            Ok(QueryScope::patients(ids))
        }
        _ => Ok(QueryScope::readable(state.queryable.clone())),
    }
}

fn require_llm(client: Option<LlmClient>) -> Result<LlmClient, AppError> {
    client.ok_or_else(|| AppError::Unavailable("GROQ_API_KEY not configured".to_string()))
}

/// POST /query - Natural language question to aggregation results
///
/// Retrieves the schema lines closest to the question, asks the model for a
/// `db.<collection>.aggregate(...)` query, repairs it and runs it.
pub async fn nl_query(
    State(state): State<AppState>,
    Extension(client): Extension<Option<LlmClient>>,
    Extension(session): Extension<Session>,
    Json(body): Json<NlQueryRequest>,
) -> Result<impl IntoResponse, AppError> {
    session.require(&QUERY_ROLES)?;
    let client = require_llm(client)?;

    let textual = TextualQuery::parse(&body.question);
    if textual.question.is_empty() {
        return Err(AppError::BadRequest("Question must not be empty.".to_string()));
    }

    let collection = state.query_collection(
        body.collection
            .as_deref()
            .or(textual.collection.as_deref()),
    )?;
    let scope = query_scope(&state, &session).await?;
    let schema = match &state.schema {
        Some(schema) => schema.as_ref().clone(),
        None => executor::infer_schema(&collection).await?,
    };

    tracing::info!(question = %textual.question, collection = collection.name(), "Natural language query");

    let raw_query =
        nl_query::schema_to_mongo(&client, &state.embedder, &textual.question, &schema).await?;
    tracing::info!(raw_query = %raw_query, "Generated Mongo query");

    let execution = run_mongo_query(&collection, &raw_query, &scope).await?;
    Ok(Json(QueryResponse::new(
        Some(textual.question),
        raw_query,
        execution,
    )))
}

/// POST /query/execute - Repair and run a query string without the model
pub async fn execute(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Json(body): Json<ExecuteRequest>,
) -> Result<impl IntoResponse, AppError> {
    session.require(&QUERY_ROLES)?;

    let collection = state.query_collection(body.collection.as_deref())?;
    let scope = query_scope(&state, &session).await?;
    let execution = run_mongo_query(&collection, &body.query, &scope).await?;
    Ok(Json(QueryResponse::new(None, body.query, execution)))
}

/// POST /chat - Answer a question from the indexed patient records
pub async fn chat(
    State(state): State<AppState>,
    Extension(client): Extension<Option<LlmClient>>,
    Extension(session): Extension<Session>,
    Json(body): Json<ChatRequest>,
) -> Result<impl IntoResponse, AppError> {
    session.require(&QUERY_ROLES)?;
    let client = require_llm(client)?;

    tracing::info!(message = %body.message, "Chat request");

    let index = state.patient_index.snapshot().await.ok_or_else(|| {
        AppError::Unavailable(
            "Patient record index not built. Run `mediquest build-index` or POST /admin/index."
                .to_string(),
        )
    })?;

    let scope = query_scope(&state, &session).await?;
    let response = record_chat::answer(
        &client,
        &state.embedder,
        &index,
        &body.message,
        scope.patient_ids.as_deref(),
    )
    .await?;
    Ok(Json(ChatResponse { response }))
}

/// POST /summarize - Natural-language profile of a JSON document
pub async fn summarize(
    State(state): State<AppState>,
    Extension(client): Extension<Option<LlmClient>>,
    Json(body): Json<SummarizeRequest>,
) -> Result<impl IntoResponse, AppError> {
    let client = require_llm(client)?;
    let summary = summarizer::json_to_text(&client, &state.embedder, &body.document).await?;
    Ok(Json(SummarizeResponse { summary }))
}

/// POST /admin/index - Rebuild the patient record index from the database
pub async fn rebuild_index(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
) -> Result<impl IntoResponse, AppError> {
    session.require(&[Role::Admin])?;

    let records = state.repository().all_patient_documents().await?;
    let index = retriever::build_patient_index(&state.embedder, &records).await?;
    index
        .save(&state.index_path)
        .map_err(|e| AppError::Internal(format!("Failed to save index: {}", e)))?;

    let documents = index.len();
    state.patient_index.replace(index).await;

    Ok(Json(IndexResponse {
        documents,
        path: state.index_path.display().to_string(),
    }))
}

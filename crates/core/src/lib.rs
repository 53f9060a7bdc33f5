//! mediquest-core: Shared EHR types and the query repair pipeline
//!
//! This crate holds everything that does not touch the network or the
//! database: the record types stored in MongoDB, the regex-based repair of
//! LLM-emitted aggregation queries, schema/record flattening, the in-memory
//! vector index used for retrieval, and the prompt templates.

pub mod error;
pub mod flatten;
pub mod guard;
pub mod outcome;
pub mod prompt;
pub mod query;
pub mod records;
pub mod retrieval;
pub mod textual;

pub use error::{QueryError, RecordError, RetrievalError};
pub use flatten::{flatten_json, flatten_schema, record_to_text};
pub use guard::check_pipeline;
pub use outcome::Outcome;
pub use query::{RepairedQuery, clean_mongo_syntax, extract_pipeline, fix_field_case, repair};
pub use records::{
    AdminLogin, Connection, DoctorLogin, Flag, Gender, NewPatient, PatientLogin, PatientRecord,
    Role,
};
pub use retrieval::{HashingEmbedder, IndexedDocument, ScoredDocument, VectorIndex};
pub use textual::TextualQuery;

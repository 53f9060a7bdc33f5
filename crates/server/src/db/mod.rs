//! MongoDB access: connection, EHR repository, query execution and seeding

pub mod executor;
mod repository;
pub mod seed;

pub use executor::{ExecutionError, QueryExecution, QueryScope, run_mongo_query};
pub use repository::{EhrRepository, InsertOutcome};

use mongodb::{Client, Database, bson::doc};

/// Connect to MongoDB and select the EHR database
pub async fn connect(uri: &str, db_name: &str) -> Result<Database, mongodb::error::Error> {
    let client = Client::with_uri_str(uri).await?;
    Ok(client.database(db_name))
}

/// Round-trip a `ping` command
pub async fn ping(db: &Database) -> Result<(), mongodb::error::Error> {
    db.run_command(doc! { "ping": 1 }).await?;
    Ok(())
}

//! mediquest: command-line front end for the EHR query pipeline

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use mediquest_core::{AdminLogin, TextualQuery, repair};
use mediquest_server::ai::{Embedder, LlmClient, nl_query, retriever};
use mediquest_server::config::Config;
use mediquest_server::db::{self, EhrRepository, InsertOutcome, executor};
use serde_json::Value as JsonValue;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Parser)]
#[command(name = "mediquest")]
#[command(about = "Ask an EHR database questions in plain language", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Turn a question into an aggregation query and run it
    Ask {
        /// Question, or `mongo: <question> | <collection> : <fields>`
        question: String,
        /// Collection to query (defaults to COLLECTION_NAME)
        #[arg(short, long)]
        collection: Option<String>,
        /// Print the generated query and repaired pipeline without running it
        #[arg(long)]
        dry_run: bool,
    },
    /// Repair and run a `db.<collection>.aggregate([...])` string
    Execute {
        /// Query text; read from --file when omitted
        query: Option<String>,
        #[arg(short, long)]
        file: Option<PathBuf>,
        #[arg(short, long)]
        collection: Option<String>,
    },
    /// Replace the demo collections with synthetic patients and doctors
    Populate {
        #[arg(long, default_value_t = 50)]
        patients: usize,
        #[arg(long, default_value_t = 10)]
        doctors: usize,
        /// RNG seed for reproducible data
        #[arg(long)]
        seed: Option<u64>,
    },
    /// Embed every patient record and save the chat index
    BuildIndex {
        /// Output path (defaults to INDEX_PATH)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Create an admin account
    AddAdmin { username: String, password: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .compact()
        .init();

    let cli = Cli::parse();
    let config = Config::from_env();

    match cli.command {
        Commands::Ask {
            question,
            collection,
            dry_run,
        } => ask(&config, &question, collection, dry_run).await,
        Commands::Execute {
            query,
            file,
            collection,
        } => {
            let query = match (query, file) {
                (Some(query), _) => query,
                (None, Some(path)) => std::fs::read_to_string(&path)
                    .with_context(|| format!("reading {}", path.display()))?,
                (None, None) => bail!("pass a query or --file"),
            };
            execute(&config, &query, collection).await
        }
        Commands::Populate {
            patients,
            doctors,
            seed,
        } => populate(&config, db::seed::SeedOptions { patients, doctors, seed }).await,
        Commands::BuildIndex { output } => build_index(&config, output).await,
        Commands::AddAdmin { username, password } => {
            add_admin(&config, username, password).await
        }
    }
}

async fn ask(
    config: &Config,
    input: &str,
    collection: Option<String>,
    dry_run: bool,
) -> Result<()> {
    let api_key = config
        .groq_api_key
        .clone()
        .context("GROQ_API_KEY is not set")?;
    let llm = LlmClient::new(api_key)
        .with_base_url(&config.llm_base_url)
        .with_model(&config.llm_model)
        .with_timeout(Duration::from_secs(config.llm_timeout_secs));
    let embedder = embedder(config);

    let textual = TextualQuery::parse(input);
    if textual.question.is_empty() {
        bail!("question is empty");
    }

    let database = db::connect(&config.mongo_uri, &config.db_name).await?;
    let name = collection
        .or(textual.collection.clone())
        .unwrap_or_else(|| config.collection.clone());
    let collection = database.collection(&name);

    let schema = match &config.schema_path {
        Some(path) => serde_json::from_str::<JsonValue>(
            &std::fs::read_to_string(path)
                .with_context(|| format!("reading schema {}", path.display()))?,
        )?,
        None => executor::infer_schema(&collection).await?,
    };

    let raw_query = nl_query::schema_to_mongo(&llm, &embedder, &textual.question, &schema).await?;
    println!("Generated Mongo query:\n{raw_query}\n");

    if dry_run {
        let fields = executor::collection_fields(&collection).await?;
        let repaired = repair(&raw_query, &fields)?;
        println!(
            "Parsed aggregation pipeline:\n{}",
            serde_json::to_string_pretty(&repaired.pipeline)?
        );
        return Ok(());
    }

    let scope = operator_scope(config, &name);
    print_execution(db::run_mongo_query(&collection, &raw_query, &scope).await?)
}

async fn execute(config: &Config, query: &str, collection: Option<String>) -> Result<()> {
    let database = db::connect(&config.mongo_uri, &config.db_name).await?;
    let name = collection.unwrap_or_else(|| config.collection.clone());
    let scope = operator_scope(config, &name);
    print_execution(db::run_mongo_query(&database.collection(&name), query, &scope).await?)
}

/// Lookups may read the configured collections plus the one being queried
fn operator_scope(config: &Config, collection: &str) -> db::QueryScope {
    let mut readable = config.queryable_collections();
    if !readable.iter().any(|c| c == collection) {
        readable.push(collection.to_string());
    }
    db::QueryScope::readable(readable)
}

fn print_execution(execution: db::QueryExecution) -> Result<()> {
    println!(
        "Parsed aggregation pipeline:\n{}\n",
        serde_json::to_string_pretty(&execution.pipeline)?
    );
    println!("Results from `{}`:", execution.collection);
    if execution.results.is_empty() {
        println!("No matching documents found.");
    }
    for document in &execution.results {
        println!("{}", serde_json::to_string_pretty(document)?);
    }
    Ok(())
}

async fn populate(config: &Config, options: db::seed::SeedOptions) -> Result<()> {
    let database = db::connect(&config.mongo_uri, &config.db_name).await?;
    let ehr = db::seed::generate(&options);
    db::seed::populate(&database, &ehr).await?;
    println!(
        "Synthetic EHR database populated: {} doctors, {} patients.",
        ehr.doctors.len(),
        ehr.records.len()
    );
    Ok(())
}

async fn build_index(config: &Config, output: Option<PathBuf>) -> Result<()> {
    let database = db::connect(&config.mongo_uri, &config.db_name).await?;
    let records = EhrRepository::new(database).all_patient_documents().await?;
    println!("Loaded {} patient records.", records.len());

    let index = retriever::build_patient_index(&embedder(config), &records).await?;
    let path = output.unwrap_or_else(|| config.index_path.clone());
    index.save(&path)?;
    println!("Index saved to {}", path.display());
    Ok(())
}

async fn add_admin(config: &Config, username: String, password: String) -> Result<()> {
    if username.trim().is_empty() || password.is_empty() {
        bail!("username and password are required");
    }
    let database = db::connect(&config.mongo_uri, &config.db_name).await?;
    let repo = EhrRepository::new(database);
    let username = username.trim().to_string();
    match repo
        .add_admin(AdminLogin {
            username: username.clone(),
            password,
        })
        .await?
    {
        InsertOutcome::Inserted => println!("Admin `{username}` added."),
        InsertOutcome::AlreadyExists => bail!("admin `{username}` already exists"),
    }
    Ok(())
}

fn embedder(config: &Config) -> Embedder {
    Embedder::from_settings(
        config.embedding_url.as_deref(),
        &config.embedding_model,
        config.embedding_api_key.as_deref(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_ask() {
        let cli = Cli::parse_from(["mediquest", "ask", "how many patients?", "--dry-run"]);
        match cli.command {
            Commands::Ask {
                question, dry_run, ..
            } => {
                assert_eq!(question, "how many patients?");
                assert!(dry_run);
            }
            _ => panic!("expected ask"),
        }
    }

    #[test]
    fn test_parse_populate_defaults() {
        let cli = Cli::parse_from(["mediquest", "populate"]);
        match cli.command {
            Commands::Populate {
                patients,
                doctors,
                seed,
            } => {
                assert_eq!((patients, doctors, seed), (50, 10, None));
            }
            _ => panic!("expected populate"),
        }
    }
}

//! Prompt templates for the retrieval-augmented LLM calls

/// Fixed question used when summarizing a document
pub const SUMMARY_QUESTION: &str =
    "Summarize the data in a clean, structured paragraph using natural language.";

/// Join retrieved texts into one context block
pub fn join_context<S: AsRef<str>>(texts: &[S]) -> String {
    texts
        .iter()
        .map(|t| t.as_ref().trim())
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Prompt asking for a MongoDB query answering `question` over the schema context
pub fn mongo_query_prompt(context: &str, question: &str) -> String {
    format!(
        r#"You are a MongoDB expert. Based on the schema provided and the user's natural language question, generate the most accurate MongoDB query.

Make sure the query follows the MongoDB syntax, uses correct fields, and handles filtering, projection, and conditions correctly. Write it as a single db.<collection>.aggregate([...]) call. Just give the query, nothing else.

Schema Context:
{context}

Natural Language Question: {question}

MongoDB Query:
"#
    )
}

/// Prompt turning flattened document lines into a readable profile
pub fn summary_prompt(context: &str) -> String {
    format!(
        r#"You are an intelligent assistant. Given the context below, produce a concise, structured, and meaningful summary in natural language.

Avoid restating the structure of the input. Instead, focus on interpreting the data like a profile or a description. Keep it formal and clear.

Context:
{context}

Question: {SUMMARY_QUESTION}

Answer:
"#
    )
}

/// Prompt answering a question from retrieved patient records
pub fn records_prompt(context: &str, question: &str) -> String {
    format!(
        r#"Use the following patient records to answer the question at the end. If the records do not contain the answer, say that you don't know instead of making one up.

{context}

Question: {question}
Helpful Answer:"#
    )
}

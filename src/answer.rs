//! Answer generation on top of the remote store or local context.
//!
//! Besides a free-form question, a store query can be built from a class
//! name, a class and method pair, or a task description:
//!
//! | Query | Text sent to the store |
//! |-------|------------------------|
//! | [`Query::Class`] | `<Class> class constructors methods properties usage` |
//! | [`Query::Method`] | `<Class>.<Method> method parameters return type example` |
//! | [`Query::Example`] | `<task> code example` |

use serde::Serialize;
use store_harness_core::error::Result;
use store_harness_core::models::{Answer, Citation, GenerationOptions};
use store_harness_core::store::RemoteStore;

/// What a store question is about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Query {
    Question(String),
    Class(String),
    Method { class: String, method: String },
    Example(String),
}

impl Query {
    /// The query text handed to [`grounded_prompt`].
    pub fn text(&self) -> String {
        match self {
            Query::Question(q) => q.clone(),
            Query::Class(class) => class_query(class),
            Query::Method { class, method } => method_query(class, method),
            Query::Example(task) => example_query(task),
        }
    }
}

pub fn class_query(class: &str) -> String {
    format!("{class} class constructors methods properties usage")
}

pub fn method_query(class: &str, method: &str) -> String {
    format!("{class}.{method} method parameters return type example")
}

pub fn example_query(task: &str) -> String {
    format!("{task} code example")
}

/// Prompt for a question answered with the store attached as a file-search tool.
pub fn grounded_prompt(question: &str) -> String {
    format!(
        "{question}\n\n\
         Answer using only the attached documents. Include:\n\
         1. What the relevant classes or methods do and how to use them\n\
         2. A complete code example where one applies\n\
         3. Which documents the answer is based on\n\
         4. Caveats worth knowing when using them\n\
         If the documents do not cover the question, say so instead of guessing."
    )
}

/// Prompt that embeds a locally composed context instead of a store.
pub fn context_prompt(context: &str, question: &str) -> String {
    format!(
        "The following excerpts were taken from the reference document.\n\n\
         <document>\n{context}\n</document>\n\n\
         Question: {question}\n\n\
         Answer from the excerpts above. Include:\n\
         1. What the relevant classes or methods do and how to use them\n\
         2. A complete code example where one applies\n\
         3. The line numbers the answer is based on\n\
         4. Caveats worth knowing when using them\n\
         Do not guess beyond the excerpts."
    )
}

/// Ask a question grounded in a remote store.
pub fn ask_store(
    remote: &dyn RemoteStore,
    identifier: &str,
    question: &str,
    options: &GenerationOptions,
) -> Result<Answer> {
    tracing::info!(store = %identifier, model = ?options.model, "asking store");
    remote.generate_answer(Some(identifier), &grounded_prompt(question), options)
}

/// Ask a question grounded in a local context string.
pub fn ask_with_context(
    remote: &dyn RemoteStore,
    context: &str,
    question: &str,
    options: &GenerationOptions,
) -> Result<Answer> {
    remote.generate_answer(None, &context_prompt(context, question), options)
}

/// Machine-readable result of a store question, printed by `ask --raw`.
///
/// A failed call keeps `success == false` with `error` set and leaves the
/// answer fields out.
#[derive(Debug, Serialize)]
pub struct RawAnswer<'a> {
    pub success: bool,
    pub query: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub answer: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub citations: Option<&'a [Citation]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub store: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<'a> RawAnswer<'a> {
    pub fn answered(query: &'a str, answer: &'a Answer, model: &'a str, store: &'a str) -> Self {
        Self {
            success: true,
            query,
            answer: Some(&answer.text),
            citations: Some(&answer.citations),
            model: Some(model),
            store: Some(store),
            error: None,
        }
    }

    pub fn failed(query: &'a str, error: String) -> Self {
        Self {
            success: false,
            query,
            answer: None,
            citations: None,
            model: None,
            store: None,
            error: Some(error),
        }
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Render an answer and its citations for the terminal.
pub fn render_answer(answer: &Answer) -> String {
    let rule = "=".repeat(60);
    let mut out = format!("{rule}\n{}\n{rule}\n", answer.text.trim_end());
    if !answer.citations.is_empty() {
        out.push_str("\nsources:\n");
        for (i, c) in answer.citations.iter().enumerate() {
            out.push_str(&format!("  [{}] {}\n", i + 1, c.source));
            if !c.content.is_empty() {
                out.push_str(&format!("      {}\n", c.content.replace('\n', " ")));
            }
        }
    }
    out
}

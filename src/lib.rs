//! # lte-extract
//!
//! Metadata extraction from publications about agricultural long-term experiments (LTEs).
//!
//! ## Modules
//!
//! - [`normalizer`] - PDF text extraction and line cleanup
//! - [`prompts`] - Extraction instruction sent to the model
//! - [`completion`] - OpenAI-compatible chat completion client
//! - [`parser`] - Locating the JSON object in a completion
//! - [`schema`] - Declarative schema and validator
//! - [`models`] - Typed extraction records
//! - [`pipeline`] - Completion → parsing → validation with stage reporting
//! - [`server`] - HTTP service
//! - [`export`] - JSON-LD and CSV output
//! - [`enrichment`] - Scopus field map for citation gaps
//! - [`debug_log`] - Raw completion log and JSON snapshots
//! - [`config`] - Environment configuration
//! - [`error`] - Custom error types
//!
//! ## Usage
//!
//! ```rust,no_run
//! use lte_extract::{completion::ChatCompletionClient, config::Config, debug_log::DebugSink};
//! use lte_extract::{normalizer, pipeline::ExtractionPipeline};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::from_env()?;
//!     let client = ChatCompletionClient::new(config.llm)?;
//!     let pipeline = ExtractionPipeline::new(Arc::new(client), DebugSink::new(config.debug_dir));
//!
//!     let text = normalizer::normalize_pdf("article.pdf".as_ref())?;
//!     let record = pipeline.run(&text).await?;
//!     println!("{}", record.citation.title);
//!     Ok(())
//! }
//! ```

pub mod completion;
pub mod config;
pub mod debug_log;
pub mod enrichment;
pub mod error;
pub mod export;
pub mod models;
pub mod normalizer;
pub mod parser;
pub mod pipeline;
pub mod prompts;
pub mod schema;
pub mod server;

pub use error::{ExtractError, Result};
pub use models::ExtractionResponse;

//! Prompt module for LLM-based operations.
//!
//! Prompts are configuration data: constant strings sent verbatim as the
//! system message of a completion request.

pub mod lte_extraction;

pub use lte_extraction::*;

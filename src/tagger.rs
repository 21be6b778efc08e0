//! Tag text processing: normalization, prefix application, and the prompt
//! used for LLM tag extraction.
//!
//! Normalization is the last line of defense against inconsistent LLM output:
//! whatever the model returns, tags written to documents are lowercase
//! kebab-case with a stable, idempotent shape.

pub mod prompt;

mod normalizer;

pub use normalizer::TagNormalizer;

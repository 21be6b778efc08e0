/// LLM provider client module.
///
/// This module provides blocking HTTP clients for the supported tag-generation
/// backends (Anthropic Claude and OpenAI chat completions), along with the
/// error types, the provider-kind enum, and builder patterns for configuration.
mod client;

pub use client::{
    ClaudeClient, ClaudeClientBuilder, LlmClient, LlmError, OpenAiClient, OpenAiClientBuilder,
    ProviderKind,
};

//! Per-document tag generation pipeline.
//!
//! For one document the pipeline classifies its metadata shape, requests
//! tags from the primary provider (falling back exactly once to the other
//! provider on failure), normalizes and reconciles the result against the
//! vocabulary, and rewrites the document preserving everything except the
//! tags field. Documents whose metadata block opens but never closes are
//! rejected rather than rewritten.

use thiserror::Error;

use crate::consistency::TagConsistencyEnhancer;
use crate::frontmatter::{self, DocumentShape};
use crate::llm::ProviderKind;
use crate::pool::{HandleId, PoolError, ProviderPool};
use crate::tagger::TagNormalizer;
use crate::vault::{Document, VaultError, VaultStore};

/// Errors surfaced while processing one document.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Unavailable(#[from] PoolError),

    #[error("provider request failed: {0}")]
    Provider(#[from] crate::llm::LlmError),

    /// The provider answered but produced no usable tags.
    #[error("provider returned no tags")]
    EmptyResponse,

    /// Metadata block opens but never closes; rewriting would destroy data.
    #[error("malformed metadata block: opening delimiter without a close")]
    MalformedDocument,

    #[error(transparent)]
    Write(#[from] VaultError),
}

/// Drives tag generation for individual documents. Borrows the pool so the
/// engine keeps its handles and cooldowns across runs.
pub struct TagGenerationPipeline<'a> {
    pool: &'a mut ProviderPool,
    enhancer: TagConsistencyEnhancer,
    provider: ProviderKind,
    prefix: Option<String>,
    dry_run: bool,
}

impl<'a> TagGenerationPipeline<'a> {
    #[must_use]
    pub fn new(
        pool: &'a mut ProviderPool,
        enhancer: TagConsistencyEnhancer,
        provider: ProviderKind,
        prefix: Option<String>,
        dry_run: bool,
    ) -> Self {
        TagGenerationPipeline {
            pool,
            enhancer,
            provider,
            prefix,
            dry_run,
        }
    }

    /// Generates tags for one document and writes it back (unless dry run).
    ///
    /// Returns the final tag list as written.
    pub fn process(
        &mut self,
        store: &dyn VaultStore,
        doc: &Document,
    ) -> Result<Vec<String>, PipelineError> {
        let shape =
            frontmatter::classify(&doc.text).ok_or(PipelineError::MalformedDocument)?;
        let body = frontmatter::body(&doc.text);

        let raw = self.request_tags(body)?;
        let normalized = TagNormalizer::normalize_tags(raw);
        if normalized.is_empty() {
            return Err(PipelineError::EmptyResponse);
        }
        let reconciled = self.enhancer.reconcile(&normalized);
        let final_tags = TagNormalizer::format_tags(reconciled, self.prefix.as_deref());

        let rewritten = match shape {
            DocumentShape::NoMetadata => frontmatter::synthesize(&final_tags, &doc.text),
            DocumentShape::MetadataNoTags | DocumentShape::MetadataWithTags => {
                // classify already proved the block parses.
                let block = frontmatter::parse(&doc.text)
                    .ok_or(PipelineError::MalformedDocument)?;
                block.with_tags(&final_tags).render(body)
            }
        };

        if !self.dry_run {
            store.write_document(&doc.id, &rewritten)?;
        }
        Ok(final_tags)
    }

    /// Requests tags from the primary provider, falling back exactly once to
    /// the other provider when the primary is unavailable or its request
    /// fails. An empty response is final; it does not trigger fallback.
    fn request_tags(&mut self, body: &str) -> Result<Vec<String>, PipelineError> {
        let primary = self.provider;
        let first = match self.pool.acquire(primary) {
            Ok(id) => self.call_with(id, body),
            Err(e) => Err(PipelineError::Unavailable(e)),
        };

        match first {
            Ok(tags) => Ok(tags),
            Err(PipelineError::EmptyResponse) => Err(PipelineError::EmptyResponse),
            Err(_) => {
                let id = self.pool.select_fallback(primary)?;
                self.call_with(id, body)
            }
        }
    }

    /// Runs one request against a held handle, releasing it on every path and
    /// reporting the outcome to the pool.
    fn call_with(&mut self, id: HandleId, body: &str) -> Result<Vec<String>, PipelineError> {
        let result = match self.pool.client(id) {
            Some(client) => client.generate_tags(body, self.enhancer.vocabulary()),
            None => {
                return Err(PipelineError::Unavailable(PoolError::Unavailable {
                    kind: self.provider,
                    reason: "handle vanished from pool".to_string(),
                }));
            }
        };

        match result {
            Ok(tags) if tags.is_empty() => {
                self.pool.report_success(id);
                Err(PipelineError::EmptyResponse)
            }
            Ok(tags) => {
                self.pool.report_success(id);
                Ok(tags)
            }
            Err(e) => {
                self.pool.report_failure(id);
                Err(PipelineError::Provider(e))
            }
        }
    }

    /// Drops idle provider handles that have outlived their lifetime.
    pub fn sweep_idle(&mut self) {
        self.pool.sweep_idle();
    }

    /// Releases every provider handle.
    pub fn shutdown(&mut self) {
        self.pool.shutdown();
    }
}

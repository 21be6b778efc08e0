//! Engine facade.
//!
//! [`TagEngine`] ties configuration, the provider pool, vocabulary
//! collection, and the pipeline together behind a small surface the CLI can
//! drive. Construction is the only fatal point: an engine without any
//! provider credentials cannot do useful work, so that fails immediately.
//! Everything after construction degrades per document instead of aborting.

use thiserror::Error;

use crate::batch::{BatchController, BatchProgress};
use crate::config::EngineConfig;
use crate::consistency::TagConsistencyEnhancer;
use crate::llm::ProviderKind;
use crate::pipeline::{PipelineError, TagGenerationPipeline};
use crate::pool::{ClientFactory, HttpClientFactory, ProviderPool};
use crate::progress::ProgressReporter;
use crate::vault::{Document, VaultError, VaultStore};
use crate::vocab::VocabularyIndex;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error(
        "no provider credentials configured; set ANTHROPIC_API_KEY or OPENAI_API_KEY"
    )]
    NoProviders,

    #[error(transparent)]
    Vault(#[from] VaultError),

    #[error(transparent)]
    Pipeline(#[from] PipelineError),
}

/// Per-run overrides layered on top of the engine configuration.
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    pub provider: Option<ProviderKind>,
    pub prefix: Option<String>,
    pub dry_run: bool,
}

/// Orchestrates tag generation over a document store.
pub struct TagEngine {
    config: EngineConfig,
    pool: ProviderPool,
}

impl TagEngine {
    /// Builds an engine with real HTTP clients.
    pub fn new(config: EngineConfig) -> Result<Self, EngineError> {
        Self::with_factory(config, Box::new(HttpClientFactory))
    }

    /// Builds an engine with a custom client factory.
    pub fn with_factory(
        config: EngineConfig,
        factory: Box<dyn ClientFactory>,
    ) -> Result<Self, EngineError> {
        if !config.any_provider_configured() {
            return Err(EngineError::NoProviders);
        }
        let pool = ProviderPool::with_factory(config.clone(), factory);
        Ok(TagEngine { config, pool })
    }

    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Collects the current tag vocabulary from the whole corpus.
    pub fn vocabulary(&self, store: &dyn VaultStore) -> Result<Vec<String>, EngineError> {
        let documents = store.list_documents()?;
        let index = VocabularyIndex::new(self.config.tag_prefix.clone());
        Ok(index.snapshot(&documents))
    }

    /// Tags a document list as one batch run.
    ///
    /// The vocabulary is snapshotted once from the full corpus before the
    /// run; documents tagged during the run do not feed back into it.
    pub fn run_batch(
        &mut self,
        store: &dyn VaultStore,
        documents: &[Document],
        reporter: &dyn ProgressReporter,
        options: &RunOptions,
    ) -> Result<BatchProgress, EngineError> {
        let prefix = self.effective_prefix(options);
        let provider = options.provider.unwrap_or(self.config.default_provider);

        let corpus = store.list_documents()?;
        let vocabulary = VocabularyIndex::new(prefix.clone()).snapshot(&corpus);

        let mut pipeline = TagGenerationPipeline::new(
            &mut self.pool,
            TagConsistencyEnhancer::new(vocabulary),
            provider,
            prefix,
            options.dry_run,
        );
        let controller = BatchController::new(
            self.config.batch.group_size,
            self.config.batch.group_delay,
        );
        Ok(controller.run(&mut pipeline, store, documents, reporter))
    }

    /// Tags a single document by id, returning the tags written.
    pub fn run_document(
        &mut self,
        store: &dyn VaultStore,
        id: &str,
        options: &RunOptions,
    ) -> Result<Vec<String>, EngineError> {
        let doc = store.read_document(id)?;
        let prefix = self.effective_prefix(options);
        let provider = options.provider.unwrap_or(self.config.default_provider);

        let corpus = store.list_documents()?;
        let vocabulary = VocabularyIndex::new(prefix.clone()).snapshot(&corpus);

        let mut pipeline = TagGenerationPipeline::new(
            &mut self.pool,
            TagConsistencyEnhancer::new(vocabulary),
            provider,
            prefix,
            options.dry_run,
        );
        Ok(pipeline.process(store, &doc)?)
    }

    /// Releases every provider handle.
    pub fn shutdown(&mut self) {
        self.pool.shutdown();
    }

    fn effective_prefix(&self, options: &RunOptions) -> Option<String> {
        options
            .prefix
            .clone()
            .or_else(|| self.config.tag_prefix.clone())
    }
}

//! Provider handle pool.
//!
//! The pool owns at most a small fixed number of live provider clients and
//! hands them out as opaque [`HandleId`] tokens. Handles are reused while a
//! provider stays healthy; a reported failure puts the provider into a
//! cooldown window during which [`ProviderPool::acquire`] refuses it.
//! Cooldown expiry is checked lazily at acquisition time, so no background
//! timer is needed. Releasing a handle never destroys it; idle handles are
//! only dropped by LRU eviction when the pool is full, or by
//! [`ProviderPool::sweep_idle`] once they outlive the idle lifetime.

use std::collections::HashMap;
use std::time::Instant;

use thiserror::Error;

use crate::config::{EngineConfig, ProviderSettings};
use crate::llm::{
    ClaudeClientBuilder, LlmClient, LlmError, OpenAiClientBuilder, ProviderKind,
};

/// Errors surfaced by pool operations.
#[derive(Debug, Error)]
pub enum PoolError {
    /// The requested provider cannot serve right now.
    #[error("provider {kind} unavailable: {reason}")]
    Unavailable {
        kind: ProviderKind,
        reason: String,
    },
}

/// Opaque token identifying a pooled handle.
pub type HandleId = u64;

/// Builds concrete clients for the pool. Swappable so tests can inject mock
/// clients without touching the pool's bookkeeping.
pub trait ClientFactory: Send + Sync {
    fn build(
        &self,
        kind: ProviderKind,
        settings: &ProviderSettings,
    ) -> Result<Box<dyn LlmClient>, LlmError>;
}

/// Default factory producing real HTTP-backed clients.
pub struct HttpClientFactory;

impl ClientFactory for HttpClientFactory {
    fn build(
        &self,
        kind: ProviderKind,
        settings: &ProviderSettings,
    ) -> Result<Box<dyn LlmClient>, LlmError> {
        let api_key = settings
            .api_key
            .clone()
            .ok_or_else(|| LlmError::InvalidConfig(format!("no API key for {kind}")))?;
        match kind {
            ProviderKind::Claude => Ok(Box::new(
                ClaudeClientBuilder::new()
                    .api_key(api_key)
                    .model(&settings.model)
                    .build()?,
            )),
            ProviderKind::OpenAi => Ok(Box::new(
                OpenAiClientBuilder::new()
                    .api_key(api_key)
                    .model(&settings.model)
                    .build()?,
            )),
        }
    }
}

struct PooledHandle {
    id: HandleId,
    kind: ProviderKind,
    model: String,
    client: Box<dyn LlmClient>,
    last_used: Instant,
    in_use: bool,
}

/// Bounded pool of provider handles with per-provider cooldowns.
pub struct ProviderPool {
    config: EngineConfig,
    factory: Box<dyn ClientFactory>,
    handles: Vec<PooledHandle>,
    /// Cooldown expiry instants, keyed by provider. An entry in the past is
    /// treated as absent.
    cooldowns: HashMap<ProviderKind, Instant>,
    next_id: HandleId,
}

impl ProviderPool {
    pub fn new(config: EngineConfig) -> Self {
        Self::with_factory(config, Box::new(HttpClientFactory))
    }

    pub fn with_factory(config: EngineConfig, factory: Box<dyn ClientFactory>) -> Self {
        ProviderPool {
            config,
            factory,
            handles: Vec::new(),
            cooldowns: HashMap::new(),
            next_id: 1,
        }
    }

    /// Acquires a handle for the given provider, reusing an idle handle with
    /// the same provider and model when one exists.
    ///
    /// Fails when the provider has no credentials, is inside its cooldown
    /// window, or when the pool is full of busy handles.
    pub fn acquire(&mut self, kind: ProviderKind) -> Result<HandleId, PoolError> {
        if !self.config.has_credentials(kind) {
            return Err(PoolError::Unavailable {
                kind,
                reason: "no credentials configured".to_string(),
            });
        }
        if self.in_cooldown(kind) {
            return Err(PoolError::Unavailable {
                kind,
                reason: "cooling down after failure".to_string(),
            });
        }

        let model = self.config.settings(kind).model.clone();

        if let Some(handle) = self
            .handles
            .iter_mut()
            .find(|h| !h.in_use && h.kind == kind && h.model == model)
        {
            handle.in_use = true;
            handle.last_used = Instant::now();
            return Ok(handle.id);
        }

        if self.handles.len() >= self.config.pool.max_handles {
            self.evict_lru_idle(kind)?;
        }

        let client = self
            .factory
            .build(kind, self.config.settings(kind))
            .map_err(|e| PoolError::Unavailable {
                kind,
                reason: e.to_string(),
            })?;

        let id = self.next_id;
        self.next_id += 1;
        self.handles.push(PooledHandle {
            id,
            kind,
            model,
            client,
            last_used: Instant::now(),
            in_use: true,
        });
        Ok(id)
    }

    /// Acquires a handle for the provider's designated fallback.
    pub fn select_fallback(&mut self, kind: ProviderKind) -> Result<HandleId, PoolError> {
        self.acquire(kind.fallback())
    }

    /// Returns the client behind a handle. `None` for unknown ids.
    #[must_use]
    pub fn client(&self, id: HandleId) -> Option<&dyn LlmClient> {
        self.handles
            .iter()
            .find(|h| h.id == id)
            .map(|h| h.client.as_ref())
    }

    /// Returns a handle to the pool without destroying it.
    pub fn release(&mut self, id: HandleId) {
        if let Some(handle) = self.handles.iter_mut().find(|h| h.id == id) {
            handle.in_use = false;
            handle.last_used = Instant::now();
        }
    }

    /// Records a failed request: the handle is released and its provider
    /// enters cooldown.
    pub fn report_failure(&mut self, id: HandleId) {
        let kind = self.handles.iter().find(|h| h.id == id).map(|h| h.kind);
        self.release(id);
        if let Some(kind) = kind {
            self.cooldowns
                .insert(kind, Instant::now() + self.config.pool.cooldown);
        }
    }

    /// Records a successful request: the handle is released and any lingering
    /// cooldown for its provider is cleared.
    pub fn report_success(&mut self, id: HandleId) {
        let kind = self.handles.iter().find(|h| h.id == id).map(|h| h.kind);
        self.release(id);
        if let Some(kind) = kind {
            self.cooldowns.remove(&kind);
        }
    }

    /// Drops idle handles whose last use is older than the idle lifetime.
    pub fn sweep_idle(&mut self) {
        let lifetime = self.config.pool.idle_lifetime;
        let now = Instant::now();
        self.handles
            .retain(|h| h.in_use || now.duration_since(h.last_used) < lifetime);
    }

    /// Drops every handle regardless of state.
    pub fn shutdown(&mut self) {
        self.handles.clear();
        self.cooldowns.clear();
    }

    /// Number of live handles, busy or idle.
    #[must_use]
    pub fn len(&self) -> usize {
        self.handles.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    fn in_cooldown(&self, kind: ProviderKind) -> bool {
        self.cooldowns
            .get(&kind)
            .is_some_and(|expiry| Instant::now() < *expiry)
    }

    fn evict_lru_idle(&mut self, wanted: ProviderKind) -> Result<(), PoolError> {
        let victim = self
            .handles
            .iter()
            .filter(|h| !h.in_use)
            .min_by_key(|h| h.last_used)
            .map(|h| h.id);
        match victim {
            Some(id) => {
                self.handles.retain(|h| h.id != id);
                Ok(())
            }
            None => Err(PoolError::Unavailable {
                kind: wanted,
                reason: "pool is full of busy handles".to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{BatchConfig, PoolConfig};
    use std::thread::sleep;
    use std::time::Duration;

    struct StubClient {
        kind: ProviderKind,
        model: String,
    }

    impl LlmClient for StubClient {
        fn kind(&self) -> ProviderKind {
            self.kind
        }

        fn model(&self) -> &str {
            &self.model
        }

        fn generate_tags(
            &self,
            _body: &str,
            _vocabulary: &[String],
        ) -> Result<Vec<String>, LlmError> {
            Ok(vec!["stub".to_string()])
        }
    }

    struct StubFactory;

    impl ClientFactory for StubFactory {
        fn build(
            &self,
            kind: ProviderKind,
            settings: &ProviderSettings,
        ) -> Result<Box<dyn LlmClient>, LlmError> {
            Ok(Box::new(StubClient {
                kind,
                model: settings.model.clone(),
            }))
        }
    }

    fn test_config(cooldown: Duration) -> EngineConfig {
        EngineConfig {
            default_provider: ProviderKind::Claude,
            claude: ProviderSettings {
                api_key: Some("k1".to_string()),
                model: "claude-test".to_string(),
            },
            openai: ProviderSettings {
                api_key: Some("k2".to_string()),
                model: "gpt-test".to_string(),
            },
            tag_prefix: None,
            pool: PoolConfig {
                max_handles: 2,
                cooldown,
                idle_lifetime: Duration::from_millis(40),
            },
            batch: BatchConfig::default(),
        }
    }

    fn test_pool(cooldown: Duration) -> ProviderPool {
        ProviderPool::with_factory(test_config(cooldown), Box::new(StubFactory))
    }

    #[test]
    fn acquire_creates_then_reuses_handle() {
        let mut pool = test_pool(Duration::from_secs(60));
        let first = pool.acquire(ProviderKind::Claude).unwrap();
        pool.release(first);
        let second = pool.acquire(ProviderKind::Claude).unwrap();
        assert_eq!(first, second);
        assert_eq!(pool.len(), 1);
    }

    #[test]
    fn acquire_fails_without_credentials() {
        let mut config = test_config(Duration::from_secs(60));
        config.claude.api_key = None;
        let mut pool = ProviderPool::with_factory(config, Box::new(StubFactory));
        let err = pool.acquire(ProviderKind::Claude).unwrap_err();
        let PoolError::Unavailable { kind, reason } = err;
        assert_eq!(kind, ProviderKind::Claude);
        assert!(reason.contains("credentials"));
    }

    #[test]
    fn failure_starts_cooldown_and_acquire_refuses() {
        let mut pool = test_pool(Duration::from_millis(30));
        let id = pool.acquire(ProviderKind::Claude).unwrap();
        pool.report_failure(id);

        assert!(pool.acquire(ProviderKind::Claude).is_err());
        // The other provider is unaffected.
        assert!(pool.acquire(ProviderKind::OpenAi).is_ok());
    }

    #[test]
    fn cooldown_expires_lazily() {
        let mut pool = test_pool(Duration::from_millis(20));
        let id = pool.acquire(ProviderKind::Claude).unwrap();
        pool.report_failure(id);
        assert!(pool.acquire(ProviderKind::Claude).is_err());

        sleep(Duration::from_millis(30));
        assert!(pool.acquire(ProviderKind::Claude).is_ok());
    }

    #[test]
    fn success_clears_cooldown() {
        let mut pool = test_pool(Duration::from_secs(60));
        let id = pool.acquire(ProviderKind::OpenAi).unwrap();
        pool.report_failure(id);
        assert!(pool.acquire(ProviderKind::OpenAi).is_err());

        // A success on the fallback provider leaves the cooldown in place.
        let other = pool.acquire(ProviderKind::Claude).unwrap();
        pool.report_success(other);
        assert!(pool.acquire(ProviderKind::OpenAi).is_err());
    }

    #[test]
    fn release_never_destroys() {
        let mut pool = test_pool(Duration::from_secs(60));
        let id = pool.acquire(ProviderKind::Claude).unwrap();
        pool.release(id);
        assert_eq!(pool.len(), 1);
        pool.release(id);
        assert_eq!(pool.len(), 1);
    }

    #[test]
    fn full_pool_evicts_least_recently_used_idle_handle() {
        let mut pool = test_pool(Duration::from_secs(60));
        let a = pool.acquire(ProviderKind::Claude).unwrap();
        let b = pool.acquire(ProviderKind::OpenAi).unwrap();
        pool.release(a);
        sleep(Duration::from_millis(5));
        pool.release(b);

        // Force a model mismatch so reuse cannot satisfy the request.
        pool.config.claude.model = "claude-other".to_string();
        let c = pool.acquire(ProviderKind::Claude).unwrap();
        assert_ne!(c, a);
        assert_eq!(pool.len(), 2);
        // The older idle handle (a) was evicted; b survives.
        assert!(pool.client(a).is_none());
        assert!(pool.client(b).is_some());
    }

    #[test]
    fn full_pool_of_busy_handles_refuses() {
        let mut pool = test_pool(Duration::from_secs(60));
        let _a = pool.acquire(ProviderKind::Claude).unwrap();
        let _b = pool.acquire(ProviderKind::OpenAi).unwrap();

        pool.config.claude.model = "claude-other".to_string();
        assert!(pool.acquire(ProviderKind::Claude).is_err());
    }

    #[test]
    fn select_fallback_acquires_other_provider() {
        let mut pool = test_pool(Duration::from_secs(60));
        let id = pool.select_fallback(ProviderKind::Claude).unwrap();
        assert_eq!(
            pool.client(id).map(|c| c.kind()),
            Some(ProviderKind::OpenAi)
        );
    }

    #[test]
    fn sweep_drops_only_expired_idle_handles() {
        let mut pool = test_pool(Duration::from_secs(60));
        let idle = pool.acquire(ProviderKind::Claude).unwrap();
        let busy = pool.acquire(ProviderKind::OpenAi).unwrap();
        pool.release(idle);

        sleep(Duration::from_millis(50));
        pool.sweep_idle();

        assert!(pool.client(idle).is_none());
        assert!(pool.client(busy).is_some());
        assert_eq!(pool.len(), 1);
    }

    #[test]
    fn shutdown_clears_everything() {
        let mut pool = test_pool(Duration::from_secs(60));
        let id = pool.acquire(ProviderKind::Claude).unwrap();
        pool.report_failure(id);
        pool.shutdown();
        assert!(pool.is_empty());
        // Cooldowns cleared too.
        assert!(pool.acquire(ProviderKind::Claude).is_ok());
    }
}

pub mod batch;
pub mod config;
pub mod consistency;
pub mod engine;
pub mod frontmatter;
pub mod llm;
pub mod pipeline;
pub mod pool;
pub mod progress;
pub mod tagger;
pub mod vault;
pub mod vocab;

pub use config::EngineConfig;
pub use engine::{RunOptions, TagEngine};
pub use llm::ProviderKind;
pub use vault::{Document, FsVault, VaultStore};

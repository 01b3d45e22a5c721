//! Configuration file loading for model-council
//!
//! This module handles file I/O and merging of configuration from multiple sources.
//! The priority order (highest to lowest):
//!
//! 1. Environment variables prefixed `MODEL_COUNCIL_` (nested with `__`)
//! 2. `--config <path>` specified file
//! 3. Project root: `./council.toml` or `./.council.toml`
//! 4. XDG config: `$XDG_CONFIG_HOME/model-council/config.toml`
//! 5. Default values

mod file_config;
mod loader;

pub use file_config::{
    ConfigValidationError, FileChannelConfig, FileConfig, FileConsensusConfig,
    FileCouncilConfig, FileDispatchConfig, FileEmbeddingConfig, FileEscalationConfig,
    FileHealthConfig, FileLoggingConfig, FileMemberConfig, FileOutputConfig, FileOutputFormat,
    FileProviderConfig,
};
pub use loader::ConfigLoader;

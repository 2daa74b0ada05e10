//! Shared types, error model, and configuration for dbbuilder.
//!
//! This crate is the foundation depended on by all other dbbuilder crates.
//! It provides:
//! - [`DbBuilderError`]: the unified error type and its [`FailureClass`]
//! - Domain types ([`SearchResultItem`], [`CandidateEntity`], [`TargetKey`], [`ParameterRecord`])
//! - Configuration ([`AppConfig`] and its sections, config loading)
//! - [`Invoker`]: retry middleware wrapped around every external call
//! - [`strip_base_url`]: the deduplication key for candidate entities

pub mod config;
pub mod error;
pub mod retry;
pub mod types;
pub mod urls;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, LlmConfig, PathsConfig, PipelineConfig, RetryConfig, SearchConfig,
    UnitFailurePolicy, config_dir, config_file_path, init_config, load_config, load_config_from,
    resolve_secret,
};
pub use error::{DbBuilderError, FailureClass, Result};
pub use retry::{Invoker, Pause, TokioPause};
pub use types::{CandidateEntity, ParameterRecord, SearchResultItem, TargetKey};
pub use urls::strip_base_url;

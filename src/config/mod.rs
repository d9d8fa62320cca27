//! Configuration module for sqlmend.
//!
//! Handles the TOML settings file and environment variable expansion.

mod settings;

pub use settings::{
    expand_env_vars, GeneratorSettings, PipelineSettings, ServerSettings, Settings, SettingsError,
    SAMPLE_SCHEMA,
};

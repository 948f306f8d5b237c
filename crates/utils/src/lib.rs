//! Shared utilities for the orchestration engine.
//!
//! This crate provides common plumbing used across the workspace: HTTP
//! client helpers for calling out to LLM providers and external context
//! sources, environment/config-file loading, and the secret-redaction
//! primitives shared by the checkpoint store, audit log, and provider
//! error sanitization.
//!
//! # Modules
//!
//! ## Client (`client`)
//!
//! HTTP client utilities with retry logic and authentication helpers:
//!
//! ```rust,ignore
//! use utils::client::{ClientConfig, HttpClient};
//! use std::time::Duration;
//!
//! let config = ClientConfig::new()
//!     .with_timeout(Duration::from_secs(30))
//!     .with_max_retries(3)
//!     .with_user_agent("my-app");
//!
//! let client = HttpClient::new(config)?;
//! let response = client.get("https://api.example.com").await?;
//! ```
//!
//! ## Config (`config`)
//!
//! Configuration management utilities for environment variables and file loading:
//!
//! ```rust,ignore
//! use utils::config::{get_env, get_env_parse, load_config_file};
//! use serde::Deserialize;
//!
//! #[derive(Deserialize)]
//! struct AppConfig {
//!     api_key: String,
//!     port: u16,
//! }
//!
//! let api_key = get_env("API_KEY")?;
//! let port = get_env_parse::<u16>("PORT")?;
//! let config: AppConfig = load_config_file("config.yaml")?;
//! ```
//!
//! ## Redact (`redact`)
//!
//! A single pure-function implementation of secret redaction, reused by
//! the checkpoint store, the audit log, and provider error sanitization
//! at the LLM boundary.
//!
//! # Features
//!
//! - `client` - Client utilities (enabled by default)
//! - `config` - Configuration utilities (enabled by default)

pub mod error;
pub mod redact;

#[cfg(feature = "client")]
pub mod client;

#[cfg(feature = "config")]
pub mod config;

// Re-export commonly used types
pub use error::{Result, UtilsError};

#[cfg(feature = "client")]
pub use client::{ClientConfig, HttpClient};

#[cfg(feature = "config")]
pub use config::{
    get_env, get_env_bool, get_env_bool_or, get_env_or, get_env_parse, get_env_parse_or,
    load_config_file, load_json_config, load_yaml_config, ConfigBuilder, FromEnv, ValidateConfig,
};

pub use redact::{redact_str, redact_value};

//! Runtime posture from the environment: API port, API URL, API token
//! (never logged), default execution mode, output format, debug flag.
//!
//! Unknown variables are ignored. A malformed value falls back to its
//! default and contributes one line to the startup warning, rather than
//! failing the whole process.

use serde::{Deserialize, Serialize};
use std::fmt;

const ENV_API_PORT: &str = "ORCA_API_PORT";
const ENV_API_URL: &str = "ORCA_API_URL";
const ENV_API_TOKEN: &str = "ORCA_API_TOKEN";
const ENV_EXECUTION_MODE: &str = "ORCA_EXECUTION_MODE";
const ENV_OUTPUT_FORMAT: &str = "ORCA_OUTPUT_FORMAT";
const ENV_DEBUG: &str = "ORCA_DEBUG";

pub const DEFAULT_API_PORT: u16 = 8080;
pub const DEFAULT_API_URL: &str = "http://localhost:8080";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionMode {
    Sequential,
    Parallel,
}

impl fmt::Display for ExecutionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExecutionMode::Sequential => write!(f, "sequential"),
            ExecutionMode::Parallel => write!(f, "parallel"),
        }
    }
}

impl std::str::FromStr for ExecutionMode {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "sequential" => Ok(ExecutionMode::Sequential),
            "parallel" => Ok(ExecutionMode::Parallel),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputFormat {
    Text,
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "text" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            _ => Err(()),
        }
    }
}

/// Loaded runtime configuration plus the warnings collected while loading
/// it. `api_token` is intentionally excluded from `Debug`/`Display` output.
#[derive(Clone)]
pub struct RuntimeConfig {
    pub api_port: u16,
    pub api_url: String,
    pub api_token: Option<String>,
    pub execution_mode: ExecutionMode,
    pub output_format: OutputFormat,
    pub debug: bool,
}

impl fmt::Debug for RuntimeConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RuntimeConfig")
            .field("api_port", &self.api_port)
            .field("api_url", &self.api_url)
            .field("api_token", &self.api_token.as_ref().map(|_| "<redacted>"))
            .field("execution_mode", &self.execution_mode)
            .field("output_format", &self.output_format)
            .field("debug", &self.debug)
            .finish()
    }
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            api_port: DEFAULT_API_PORT,
            api_url: DEFAULT_API_URL.to_string(),
            api_token: None,
            execution_mode: ExecutionMode::Sequential,
            output_format: OutputFormat::Text,
            debug: false,
        }
    }
}

impl RuntimeConfig {
    /// Reads the recognized environment variables, falling back to defaults
    /// for anything absent or malformed. Returns the config plus a list of
    /// human-readable warnings (one per malformed value) for the caller to
    /// log once at startup.
    pub fn from_env() -> (Self, Vec<String>) {
        let mut config = Self::default();
        let mut warnings = Vec::new();

        if let Ok(raw) = utils::get_env(ENV_API_PORT) {
            match raw.parse::<u16>() {
                Ok(port) => config.api_port = port,
                Err(_) => warnings.push(format!(
                    "{ENV_API_PORT}={raw:?} is not a valid port; using default {}",
                    DEFAULT_API_PORT
                )),
            }
        }

        config.api_url = utils::get_env_or(ENV_API_URL, DEFAULT_API_URL);

        if let Ok(token) = utils::get_env(ENV_API_TOKEN) {
            if !token.is_empty() {
                config.api_token = Some(token);
            }
        }

        if let Ok(raw) = utils::get_env(ENV_EXECUTION_MODE) {
            match raw.parse::<ExecutionMode>() {
                Ok(mode) => config.execution_mode = mode,
                Err(_) => warnings.push(format!(
                    "{ENV_EXECUTION_MODE}={raw:?} is not one of sequential|parallel; using default {}",
                    config.execution_mode
                )),
            }
        }

        if let Ok(raw) = utils::get_env(ENV_OUTPUT_FORMAT) {
            match raw.parse::<OutputFormat>() {
                Ok(format) => config.output_format = format,
                Err(_) => warnings.push(format!(
                    "{ENV_OUTPUT_FORMAT}={raw:?} is not one of text|json; using default"
                )),
            }
        }

        match utils::get_env(ENV_DEBUG) {
            Ok(raw) => match utils::get_env_bool(ENV_DEBUG) {
                Ok(debug) => config.debug = debug,
                Err(_) => warnings.push(format!(
                    "{ENV_DEBUG}={raw:?} is not a valid boolean; using default false"
                )),
            },
            Err(_) => {}
        }

        (config, warnings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    static ENV_LOCK: Mutex<()> = Mutex::new(());

    fn clear_env() {
        for key in [
            ENV_API_PORT,
            ENV_API_URL,
            ENV_API_TOKEN,
            ENV_EXECUTION_MODE,
            ENV_OUTPUT_FORMAT,
            ENV_DEBUG,
        ] {
            std::env::remove_var(key);
        }
    }

    #[test]
    fn defaults_apply_with_no_environment_set() {
        let _guard = ENV_LOCK.lock().unwrap();
        clear_env();
        let (config, warnings) = RuntimeConfig::from_env();
        assert_eq!(config.api_port, DEFAULT_API_PORT);
        assert_eq!(config.execution_mode, ExecutionMode::Sequential);
        assert!(warnings.is_empty());
    }

    #[test]
    fn malformed_port_falls_back_and_warns() {
        let _guard = ENV_LOCK.lock().unwrap();
        clear_env();
        std::env::set_var(ENV_API_PORT, "not-a-port");
        let (config, warnings) = RuntimeConfig::from_env();
        assert_eq!(config.api_port, DEFAULT_API_PORT);
        assert_eq!(warnings.len(), 1);
        clear_env();
    }

    #[test]
    fn token_is_never_exposed_through_debug() {
        let _guard = ENV_LOCK.lock().unwrap();
        clear_env();
        std::env::set_var(ENV_API_TOKEN, "sk-secret-value");
        let (config, _) = RuntimeConfig::from_env();
        let rendered = format!("{config:?}");
        assert!(!rendered.contains("sk-secret-value"));
        assert!(rendered.contains("<redacted>"));
        clear_env();
    }

    #[test]
    fn unknown_variables_are_ignored() {
        let _guard = ENV_LOCK.lock().unwrap();
        clear_env();
        std::env::set_var("ORCA_SOME_UNRECOGNIZED_KNOB", "whatever");
        let (_, warnings) = RuntimeConfig::from_env();
        assert!(warnings.is_empty());
        std::env::remove_var("ORCA_SOME_UNRECOGNIZED_KNOB");
    }
}

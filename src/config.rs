//! # Application Configuration
//!
//! [`AppConfig`] is read from YAML and then overridden from the environment:
//!
//! ```yaml
//! mode: development          # or production (default)
//! gate:
//!   not_found_message_override: false
//! docs:
//!   inference: source_text   # off | source_text | sample_invocation
//! shutdown:
//!   grace_ms: 10000
//! server:
//!   stack_size: 0x4000
//! ```
//!
//! | Variable                      | Overrides           |
//! |-------------------------------|---------------------|
//! | `ROUTEGATE_ENV`               | `mode`              |
//! | `ROUTEGATE_SHUTDOWN_GRACE_MS` | `shutdown.grace_ms` |
//! | `ROUTEGATE_STACK_SIZE`        | `server.stack_size` |
//!
//! Stack sizes accept decimal (`16384`) or hex (`0x4000`). Each coroutine gets one
//! stack, so total memory is roughly stack size times concurrent connections.

use std::env;
use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Deserializer, Serialize};
use tracing::warn;

use crate::gate::{ExecutionMode, GateConfig};
use crate::infer::InferenceMode;
use crate::lifecycle::ShutdownConfig;

pub const DEFAULT_STACK_SIZE: usize = 0x4000;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GateSettings {
    /// Map declared errors mentioning "not found" to 404. Defaults to `false`;
    /// enabling it is an explicit opt-in.
    pub not_found_message_override: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DocsSettings {
    pub inference: InferenceMode,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    /// Coroutine stack size in bytes.
    #[serde(deserialize_with = "deserialize_stack_size")]
    pub stack_size: usize,
}

impl Default for ServerSettings {
    fn default() -> Self {
        ServerSettings {
            stack_size: DEFAULT_STACK_SIZE,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub mode: ExecutionMode,
    pub gate: GateSettings,
    pub docs: DocsSettings,
    pub shutdown: ShutdownConfig,
    pub server: ServerSettings,
}

/// Parse `16384` or `0x4000`.
#[must_use]
pub fn parse_stack_size(raw: &str) -> Option<usize> {
    let raw = raw.trim();
    match raw.strip_prefix("0x").or_else(|| raw.strip_prefix("0X")) {
        Some(hex) => usize::from_str_radix(hex, 16).ok(),
        None => raw.parse().ok(),
    }
}

fn deserialize_stack_size<'de, D: Deserializer<'de>>(deserializer: D) -> Result<usize, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Number(usize),
        Text(String),
    }
    match Raw::deserialize(deserializer)? {
        Raw::Number(n) => Ok(n),
        Raw::Text(s) => parse_stack_size(&s)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid stack size {s:?}"))),
    }
}

impl AppConfig {
    /// Read a YAML file. Missing sections take their defaults.
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        Self::from_yaml(&text).with_context(|| format!("invalid config {}", path.display()))
    }

    pub fn from_yaml(text: &str) -> anyhow::Result<Self> {
        if text.trim().is_empty() {
            return Ok(AppConfig::default());
        }
        Ok(serde_yaml::from_str(text)?)
    }

    /// Apply `ROUTEGATE_*` overrides from the process environment.
    #[must_use]
    pub fn apply_env(self) -> Self {
        self.apply_vars(|name| env::var(name).ok())
    }

    /// Apply overrides from any variable source. Invalid values are logged and ignored.
    #[must_use]
    pub fn apply_vars(mut self, var: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(raw) = var("ROUTEGATE_ENV") {
            match raw.trim().to_ascii_lowercase().as_str() {
                "development" | "dev" => self.mode = ExecutionMode::Development,
                "production" | "prod" => self.mode = ExecutionMode::Production,
                other => warn!(value = %other, "Ignoring unknown ROUTEGATE_ENV"),
            }
        }
        if let Some(raw) = var("ROUTEGATE_SHUTDOWN_GRACE_MS") {
            match raw.trim().parse() {
                Ok(ms) => self.shutdown.grace_ms = ms,
                Err(_) => warn!(value = %raw, "Ignoring invalid ROUTEGATE_SHUTDOWN_GRACE_MS"),
            }
        }
        if let Some(raw) = var("ROUTEGATE_STACK_SIZE") {
            match parse_stack_size(&raw) {
                Some(size) => self.server.stack_size = size,
                None => warn!(value = %raw, "Ignoring invalid ROUTEGATE_STACK_SIZE"),
            }
        }
        self
    }

    #[must_use]
    pub fn gate_config(&self) -> GateConfig {
        GateConfig {
            mode: self.mode,
            not_found_message_override: self.gate.not_found_message_override,
        }
    }
}

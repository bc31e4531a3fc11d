// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Client configuration (from the host's `initialize` call) and bridge
// settings (from the host application's settings file).

use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{BridgeError, Result};
use crate::types::scalar_text;

/// Largest flush setting both vendor SDKs accept (a Java/C `int`).
pub const MAX_FLUSH_SETTING: u32 = i32::MAX as u32;

/// Amplitude data residency zone.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ServerZone {
    #[default]
    #[serde(rename = "US")]
    Us,
    #[serde(rename = "EU")]
    Eu,
}

impl ServerZone {
    pub fn as_str(self) -> &'static str {
        match self {
            ServerZone::Us => "US",
            ServerZone::Eu => "EU",
        }
    }
}

/// Configuration object passed as the first argument of `initialize`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientConfig {
    /// Amplitude project API key. Required, non-empty.
    #[serde(default)]
    pub api_key: String,
    /// Enable or disable automatic session start/end events.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tracking_session_events: Option<bool>,
    /// Idle time after which a new session starts.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_time_between_sessions_millis: Option<i64>,
    /// User id applied to the fresh client. Empty strings are ignored.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub server_zone: Option<ServerZone>,
    /// Number of queued events that triggers an upload.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flush_queue_size: Option<u32>,
    /// Upload interval for queued events.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flush_interval_millis: Option<u32>,
}

impl ClientConfig {
    /// Build a minimal configuration for `api_key`.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            ..Default::default()
        }
    }

    /// Parse and validate the host's configuration object.
    ///
    /// A missing, null, or empty `apiKey` is rejected before any vendor
    /// object is built. A numeric or boolean `apiKey` is read as text, like
    /// the positional string arguments. Wrong-typed optional fields are
    /// rejected.
    pub fn from_json(object: &Map<String, Value>) -> Result<Self> {
        let mut object = object.clone();
        let api_key = match object.get("apiKey") {
            None | Some(Value::Null) => {
                return Err(BridgeError::InvalidConfiguration(
                    "API key is required".into(),
                ));
            }
            Some(value) => scalar_text(value).ok_or_else(|| {
                BridgeError::InvalidConfiguration(format!(
                    "invalid configuration: apiKey must be a string, got {value}"
                ))
            })?,
        };
        object.insert("apiKey".into(), Value::String(api_key));

        let config: ClientConfig = serde_json::from_value(Value::Object(object))
            .map_err(|e| BridgeError::InvalidConfiguration(format!("invalid configuration: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Check the invariants the vendor constructor relies on.
    pub fn validate(&self) -> Result<()> {
        if self.api_key.trim().is_empty() {
            return Err(BridgeError::InvalidConfiguration(
                "API key is required".into(),
            ));
        }
        if let Some(millis) = self.min_time_between_sessions_millis {
            if millis < 0 {
                return Err(BridgeError::InvalidConfiguration(format!(
                    "minTimeBetweenSessionsMillis must not be negative (got {millis})"
                )));
            }
        }
        for (field, value) in [
            ("flushQueueSize", self.flush_queue_size),
            ("flushIntervalMillis", self.flush_interval_millis),
        ] {
            if let Some(value) = value.filter(|v| *v > MAX_FLUSH_SETTING) {
                return Err(BridgeError::InvalidConfiguration(format!(
                    "{field} is out of range ({value})"
                )));
            }
        }
        Ok(())
    }

    /// The user id to apply after construction, if any.
    pub fn initial_user_id(&self) -> Option<&str> {
        self.user_id.as_deref().filter(|id| !id.is_empty())
    }
}

/// Settings for the bridge itself, read by the host application at startup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeSettings {
    /// Threads available to the worker pool for vendor calls.
    pub worker_threads: usize,
    /// Name prefix for worker threads (shows up in crash reports).
    pub thread_name: String,
    /// `tracing` filter used when `RUST_LOG` is not set.
    pub log_filter: String,
}

impl Default for BridgeSettings {
    fn default() -> Self {
        Self {
            worker_threads: 4,
            thread_name: "amplibridge-worker".into(),
            log_filter: "info".into(),
        }
    }
}

impl BridgeSettings {
    /// Read settings from a JSON file. Missing keys take their defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let data = std::fs::read_to_string(path.as_ref())?;
        let settings: BridgeSettings = serde_json::from_str(&data)?;
        Ok(settings.normalized())
    }

    /// Write settings as pretty-printed JSON.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path.as_ref(), json)?;
        Ok(())
    }

    /// Clamp values that would make the worker pool unusable.
    fn normalized(mut self) -> Self {
        if self.worker_threads == 0 {
            self.worker_threads = 1;
        }
        if self.thread_name.is_empty() {
            self.thread_name = BridgeSettings::default().thread_name;
        }
        self
    }
}

// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Host side of the plugin channel.
//
// Owns the dispatcher (and through it the worker pool) for the lifetime of
// the process. Requests from the page are dispatched and answered with the
// completion; names the dispatcher refuses are answered with
// `invalid_action`.

use std::path::{Path, PathBuf};

use amplibridge_core::config::BridgeSettings;
use amplibridge_core::error::Result;
use amplibridge_dispatch::Dispatcher;
use amplibridge_native::platform_client_factory;
use tracing::{debug, info, warn};

use super::data_dir::settings_path;
use super::protocol::{ExecRequest, ExecResponse};

pub struct BridgeHost {
    dispatcher: Dispatcher,
    settings: BridgeSettings,
    data_dir: PathBuf,
}

impl BridgeHost {
    /// Start the dispatcher for this platform. Call once at startup.
    ///
    /// Writes a default settings file if none exists yet.
    pub fn init(data_dir: PathBuf, settings: BridgeSettings) -> Result<Self> {
        let factory = platform_client_factory();
        info!(platform = factory.platform_name(), path = %data_dir.display(), "starting bridge host");

        let dispatcher = Dispatcher::with_settings(factory, &settings)?;

        if !settings_path(&data_dir).exists() {
            if let Err(e) = persist_settings(&data_dir, &settings) {
                warn!(error = %e, "could not write default settings");
            }
        }

        Ok(Self::with_dispatcher(dispatcher, settings, data_dir))
    }

    pub fn with_dispatcher(dispatcher: Dispatcher, settings: BridgeSettings, data_dir: PathBuf) -> Self {
        Self {
            dispatcher,
            settings,
            data_dir,
        }
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    pub fn settings(&self) -> &BridgeSettings {
        &self.settings
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Dispatch one page request and build its reply.
    pub async fn handle(&self, request: ExecRequest) -> ExecResponse {
        debug!(call_id = %request.call_id, action = %request.action, "exec request");
        match self.dispatcher.call(&request.action, request.args).await {
            Some(outcome) => ExecResponse::completed(request.call_id, outcome),
            None => ExecResponse::invalid_action(request.call_id),
        }
    }
}

/// Load settings from the data directory, falling back to defaults.
pub fn load_settings(data_dir: &Path) -> BridgeSettings {
    let path = settings_path(data_dir);
    if !path.exists() {
        return BridgeSettings::default();
    }
    match BridgeSettings::load(&path) {
        Ok(settings) => settings,
        Err(e) => {
            // Logging is not up yet when this runs at startup.
            eprintln!("amplibridge: ignoring unreadable {}: {e}", path.display());
            BridgeSettings::default()
        }
    }
}

pub fn persist_settings(data_dir: &Path, settings: &BridgeSettings) -> Result<()> {
    settings.save(settings_path(data_dir))
}

// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// amplibridge: webview host for the Amplitude plugin.
//
// Entry point. Loads settings, initialises logging and the bridge host, and
// launches the Dioxus UI whose page carries the plugin shim.

mod pages;
mod services;
mod state;

use std::sync::OnceLock;

use dioxus::prelude::*;

use pages::console::Console;
use services::bridge_host::{self, BridgeHost};
use services::data_dir;

/// Process-wide host. Never dropped, so its worker runtime is never torn
/// down from inside the UI's async context.
static HOST: OnceLock<BridgeHost> = OnceLock::new();

pub(crate) fn host() -> Option<&'static BridgeHost> {
    HOST.get()
}

fn main() {
    let dir = data_dir::data_dir();
    let settings = bridge_host::load_settings(&dir);

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&settings.log_filter)),
        )
        .init();

    tracing::info!("amplibridge starting");

    match BridgeHost::init(dir, settings) {
        Ok(host) => {
            tracing::info!(
                threads = host.settings().worker_threads,
                data_dir = %host.data_dir().display(),
                "bridge host ready"
            );
            let _ = HOST.set(host);
        }
        Err(e) => {
            tracing::error!(error = %e, "bridge host failed to start");
            std::process::exit(1);
        }
    }

    dioxus::launch(app);
}

/// Root component.
fn app() -> Element {
    use_context_provider(|| {
        let platform = host()
            .map(|h| h.dispatcher().platform_name().to_owned())
            .unwrap_or_default();
        Signal::new(state::AppState::new(platform))
    });

    rsx! {
        div { class: "app-container",
            style: "display: flex; flex-direction: column; height: 100vh; font-family: system-ui, -apple-system, sans-serif;",
            div { class: "page-content",
                style: "flex: 1; overflow-y: auto; padding: 16px;",
                Console {}
            }
        }
    }
}

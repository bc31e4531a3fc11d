// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Console page: installs the plugin shim in the webview, pumps its requests
// through the bridge host, and shows a log of answered calls.

use dioxus::prelude::*;
use tokio::sync::mpsc;
use tracing::warn;

use crate::services::protocol::{ExecRequest, ExecResponse};
use crate::state::{AppState, CallRecord};

const SHIM: &str = include_str!("../../assets/amplitude.js");

/// Plugin calls offered as buttons: (label, JavaScript call on the plugin).
const SAMPLE_CALLS: &[(&str, &str)] = &[
    ("Track", "track('Console Button', { source: 'console' })"),
    (
        "Identify",
        "identify('demo-user', { plan: 'pro', seats: 3, beta: true })",
    ),
    ("Set user id", "setUserId('demo-user')"),
    ("Revenue", "logRevenue('sku-1', 1, 4.99, 'purchase')"),
    ("Device id", "getDeviceId()"),
    ("Session id", "getSessionId()"),
    ("Flush", "flush()"),
    ("Reset", "reset()"),
];

/// Run a plugin call from the page. Results are logged on the host side.
fn call_plugin(call: &str) {
    let script = format!("window.AmplitudePlugin.{call}.catch(() => {{}});");
    let _ = document::eval(&script);
}

#[component]
pub fn Console() -> Element {
    let mut state = use_context::<Signal<AppState>>();
    let mut api_key = use_signal(String::new);

    use_future(move || async move {
        let Some(host) = crate::host() else {
            warn!("bridge host unavailable; plugin shim not installed");
            return;
        };

        let mut shim = document::eval(SHIM);
        state.write().shim_ready = true;
        let (tx, mut rx) = mpsc::unbounded_channel::<(String, ExecResponse)>();

        loop {
            tokio::select! {
                request = shim.recv::<ExecRequest>() => match request {
                    Ok(request) => {
                        let tx = tx.clone();
                        spawn(async move {
                            let action = request.action.clone();
                            let response = host.handle(request).await;
                            let _ = tx.send((action, response));
                        });
                    }
                    Err(e) => {
                        warn!(error = ?e, "plugin shim channel closed");
                        break;
                    }
                },
                Some((action, response)) = rx.recv() => {
                    if let Err(e) = shim.send(&response) {
                        warn!(error = ?e, call_id = %response.call_id, "response not delivered");
                    }
                    let mut state = state.write();
                    state.initialized = host.dispatcher().is_initialized();
                    state.record(&action, &response);
                }
            }
        }

        state.write().shim_ready = false;
    });

    let initialized = state.read().initialized;
    let shim_ready = state.read().shim_ready;

    rsx! {
        div {
            h1 { "Amplitude Bridge" }
            p { style: "color: #666;",
                "Platform: {state.read().platform}"
            }
            div { style: "display: flex; gap: 12px; margin: 8px 0 16px 0; font-size: 14px;",
                StatusBadge { label: "Shim", ok: shim_ready }
                StatusBadge { label: "Client", ok: initialized }
            }

            section { style: "margin: 16px 0;",
                h3 { "Initialize" }
                div { style: "display: flex; gap: 8px;",
                    input {
                        r#type: "text",
                        placeholder: "API key",
                        style: "flex: 1; padding: 8px; border: 1px solid #ccc; border-radius: 6px;",
                        value: "{api_key}",
                        oninput: move |evt| api_key.set(evt.value()),
                    }
                    button {
                        style: "padding: 8px 16px; border-radius: 6px; border: none; background: #007aff; color: white;",
                        disabled: !shim_ready,
                        onclick: move |_| {
                            // JSON string literal is also a valid JS literal.
                            let key = serde_json::to_string(&*api_key.read())
                                .unwrap_or_else(|_| "\"\"".into());
                            call_plugin(&format!(
                                "initialize({{ apiKey: {key}, trackingSessionEvents: true }})"
                            ));
                        },
                        "Initialize"
                    }
                }
            }

            section { style: "margin: 16px 0;",
                h3 { "Calls" }
                div { style: "display: grid; grid-template-columns: 1fr 1fr; gap: 8px;",
                    for (label, call) in SAMPLE_CALLS.iter().copied() {
                        button {
                            key: "{label}",
                            style: "padding: 10px; border-radius: 8px; border: 1px solid #ccc; background: white;",
                            disabled: !shim_ready,
                            onclick: move |_| call_plugin(call),
                            "{label}"
                        }
                    }
                }
            }

            section { style: "margin: 16px 0;",
                h3 { "Log" }
                if state.read().log.is_empty() {
                    p { style: "color: #888;", "No calls yet." }
                }
                for record in state.read().log.iter() {
                    LogRow { key: "{record.call_id}", record: record.clone() }
                }
            }
        }
    }
}

#[component]
fn StatusBadge(label: &'static str, ok: bool) -> Element {
    let (text, colour) = if ok { ("ready", "#2e7d32") } else { ("not ready", "#c62828") };
    rsx! {
        span { style: "padding: 4px 8px; border-radius: 12px; background: #f5f5f5; color: {colour};",
            "{label}: {text}"
        }
    }
}

#[component]
fn LogRow(record: CallRecord) -> Element {
    let colour = if record.status == "ok" { "#2e7d32" } else { "#c62828" };
    let time = record.at.format("%H:%M:%S").to_string();
    let detail = record.detail.clone().unwrap_or_default();
    rsx! {
        div { style: "display: flex; gap: 8px; padding: 6px 0; border-bottom: 1px solid #f0f0f0; font-size: 13px; font-family: ui-monospace, monospace;",
            span { style: "color: #888;", "{time}" }
            span { style: "min-width: 140px;", "{record.action}" }
            span { style: "color: {colour};", "{record.status}" }
            span { style: "color: #444;", "{detail}" }
        }
    }
}

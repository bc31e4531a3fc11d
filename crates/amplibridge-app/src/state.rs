// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Reactive state for the console page.

use std::collections::VecDeque;

use chrono::{DateTime, Local};

use crate::services::protocol::ExecResponse;

/// Calls kept in the on-screen log.
const LOG_CAPACITY: usize = 200;

/// One answered plugin call.
#[derive(Debug, Clone, PartialEq)]
pub struct CallRecord {
    pub at: DateTime<Local>,
    pub call_id: String,
    pub action: String,
    pub status: &'static str,
    pub detail: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct AppState {
    /// Platform name reported by the client factory.
    pub platform: String,
    /// Whether the dispatcher holds a live client.
    pub initialized: bool,
    /// Whether the page-side shim is running.
    pub shim_ready: bool,
    /// Most recent calls, newest first.
    pub log: VecDeque<CallRecord>,
}

impl AppState {
    pub fn new(platform: impl Into<String>) -> Self {
        Self {
            platform: platform.into(),
            ..Default::default()
        }
    }

    /// Record an answered call, dropping the oldest beyond capacity.
    pub fn record(&mut self, action: &str, response: &ExecResponse) {
        self.log.push_front(CallRecord {
            at: Local::now(),
            call_id: response.call_id.clone(),
            action: action.to_owned(),
            status: response.status(),
            detail: response.detail().map(str::to_owned),
        });
        self.log.truncate(LOG_CAPACITY);
    }
}

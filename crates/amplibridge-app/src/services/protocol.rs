// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Messages exchanged with the page-side plugin shim.

use amplibridge_dispatch::ActionOutcome;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One `exec` call posted by the page.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecRequest {
    pub call_id: String,
    pub action: String,
    #[serde(default)]
    pub args: Vec<Value>,
}

/// Reply matched to a request by `callId`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecResponse {
    pub call_id: String,
    #[serde(flatten)]
    pub reply: Reply,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Reply {
    /// The dispatcher accepted the action and it completed.
    Completed(ActionOutcome),
    /// The action name was not recognised.
    Refused { status: RefusedStatus },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RefusedStatus {
    InvalidAction,
}

impl ExecResponse {
    pub fn completed(call_id: String, outcome: ActionOutcome) -> Self {
        Self {
            call_id,
            reply: Reply::Completed(outcome),
        }
    }

    pub fn invalid_action(call_id: String) -> Self {
        Self {
            call_id,
            reply: Reply::Refused {
                status: RefusedStatus::InvalidAction,
            },
        }
    }

    /// Short status label for the call log.
    pub fn status(&self) -> &'static str {
        match &self.reply {
            Reply::Completed(outcome) if outcome.is_success() => "ok",
            Reply::Completed(_) => "error",
            Reply::Refused { .. } => "invalid_action",
        }
    }

    /// Payload or error message, for the call log.
    pub fn detail(&self) -> Option<&str> {
        match &self.reply {
            Reply::Completed(outcome) => outcome.payload().or(outcome.message()),
            Reply::Refused { .. } => None,
        }
    }
}

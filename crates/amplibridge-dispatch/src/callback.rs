// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Completion callbacks.
//
// A `CallbackContext` is consumed by completing it, so a handler cannot
// report twice. Dropping it without completing is how an unrecognised
// action is refused.

use amplibridge_core::error::ErrorKind;
use serde::Serialize;
use tokio::sync::oneshot;

/// The single result of a dispatched action.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ActionOutcome {
    /// `payload` is the confirmation message or the requested value.
    #[serde(rename = "ok")]
    Success { payload: Option<String> },
    Error { kind: ErrorKind, message: String },
}

impl ActionOutcome {
    pub fn success(payload: Option<String>) -> Self {
        Self::Success { payload }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    /// Success payload, if this is a success.
    pub fn payload(&self) -> Option<&str> {
        match self {
            Self::Success { payload } => payload.as_deref(),
            Self::Error { .. } => None,
        }
    }

    /// Error message, if this is an error.
    pub fn message(&self) -> Option<&str> {
        match self {
            Self::Success { .. } => None,
            Self::Error { message, .. } => Some(message),
        }
    }
}

type Completion = Box<dyn FnOnce(ActionOutcome) + Send + 'static>;

/// One-shot completion handle handed to the dispatcher with each request.
pub struct CallbackContext {
    complete: Completion,
}

impl CallbackContext {
    pub fn new(complete: impl FnOnce(ActionOutcome) + Send + 'static) -> Self {
        Self {
            complete: Box::new(complete),
        }
    }

    /// A context paired with a receiver that resolves on completion.
    ///
    /// The receiver errors if the context is dropped without completing.
    pub fn channel() -> (Self, oneshot::Receiver<ActionOutcome>) {
        let (tx, rx) = oneshot::channel();
        let context = Self::new(move |outcome| {
            // The caller may have stopped waiting.
            let _ = tx.send(outcome);
        });
        (context, rx)
    }

    pub fn complete(self, outcome: ActionOutcome) {
        (self.complete)(outcome)
    }

    pub fn success(self, payload: Option<String>) {
        self.complete(ActionOutcome::success(payload))
    }

    pub fn error(self, kind: ErrorKind, message: impl Into<String>) {
        self.complete(ActionOutcome::Error {
            kind,
            message: message.into(),
        })
    }
}

impl std::fmt::Debug for CallbackContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CallbackContext").finish_non_exhaustive()
    }
}

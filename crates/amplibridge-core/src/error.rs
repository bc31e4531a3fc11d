// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Unified error types for the bridge.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Top-level error type for every bridge operation.
#[derive(Debug, Error)]
pub enum BridgeError {
    // -- Client lifecycle --
    #[error("Amplitude not initialized")]
    NotInitialized,

    #[error("{0}")]
    InvalidConfiguration(String),

    // -- Host arguments --
    #[error("invalid argument at position {index}: {reason}")]
    InvalidArgument { index: usize, reason: String },

    // -- Vendor SDK --
    #[error("{0}")]
    Vendor(String),

    /// The vendor SDK is not linked into (or not loadable by) the host app.
    #[error("Amplitude SDK not available: {0}")]
    PlatformUnavailable(String),

    // -- Host-side plumbing --
    #[error("file I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl BridgeError {
    /// Shorthand for an [`BridgeError::InvalidArgument`] at `index`.
    pub fn invalid_argument(index: usize, reason: impl Into<String>) -> Self {
        Self::InvalidArgument {
            index,
            reason: reason.into(),
        }
    }

    /// Coarse classification surfaced to the host next to the message.
    pub fn kind(&self) -> ErrorKind {
        match self {
            BridgeError::NotInitialized => ErrorKind::Uninitialized,
            BridgeError::InvalidConfiguration(_) => ErrorKind::InvalidConfiguration,
            BridgeError::InvalidArgument { .. } => ErrorKind::InvalidArgument,
            BridgeError::PlatformUnavailable(_) => ErrorKind::Platform,
            BridgeError::Vendor(_) | BridgeError::Io(_) | BridgeError::Serialization(_) => {
                ErrorKind::Vendor
            }
        }
    }
}

/// Structured error kind attached to every error completion.
///
/// The host only needs the message; the kind lets callers branch without
/// parsing text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// An action other than `initialize` ran before a client existed.
    Uninitialized,
    /// `initialize` received an unusable configuration object.
    InvalidConfiguration,
    /// A positional argument was missing or had the wrong type.
    InvalidArgument,
    /// The vendor SDK reported a failure (or panicked).
    Vendor,
    /// The vendor SDK could not be found by the platform binding.
    Platform,
}

/// Alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, BridgeError>;

// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// amplibridge: Core types, configuration, and error definitions shared
// across all crates.

pub mod config;
pub mod error;
pub mod messages;
pub mod types;

pub use config::{BridgeSettings, ClientConfig, ServerZone};
pub use error::{BridgeError, ErrorKind};
pub use types::*;

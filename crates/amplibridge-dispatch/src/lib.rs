// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// amplibridge: Action dispatcher.
//
// The host hands over an action name, positional JSON arguments and a
// completion callback. Recognised actions run on the worker pool against the
// shared client and complete exactly once; unrecognised names are refused
// synchronously.

pub mod args;
pub mod callback;
pub mod dispatcher;
pub mod executor;
mod handlers;
pub mod marshal;
pub mod slot;

pub use callback::{ActionOutcome, CallbackContext};
pub use dispatcher::Dispatcher;
pub use executor::{Task, TaskExecutor, WorkerPool};
pub use slot::ClientSlot;

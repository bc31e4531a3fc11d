// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Service layer: connects the page's plugin shim to the dispatcher.

pub mod bridge_host;
pub mod data_dir;
pub mod protocol;

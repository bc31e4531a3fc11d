// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Completion messages delivered to the host runtime.
//
// Success messages are fixed per action. Error messages keep lifecycle and
// configuration failures verbatim and prefix everything else with what the
// action was trying to do.

use crate::error::BridgeError;
use crate::types::Action;

/// Confirmation string for actions whose success carries no value.
///
/// `None` for the getters, which complete with the value itself.
pub fn success_message(action: Action) -> Option<&'static str> {
    let message = match action {
        Action::Initialize => "Amplitude initialized successfully",
        Action::Track => "Event tracked successfully",
        Action::Identify => "User identified successfully",
        Action::SetUserId => "User ID set successfully",
        Action::SetUserProperties => "User properties set successfully",
        Action::LogRevenue => "Revenue logged successfully",
        Action::Reset => "User reset successfully",
        Action::SetDeviceId => "Device ID set successfully",
        Action::Flush => "Events flushed successfully",
        Action::GetDeviceId | Action::GetSessionId => return None,
    };
    Some(message)
}

/// Prefix describing the failed operation.
pub fn failure_prefix(action: Action) -> &'static str {
    match action {
        Action::Initialize => "Error initializing Amplitude",
        Action::Track => "Error tracking event",
        Action::Identify => "Error identifying user",
        Action::SetUserId => "Error setting user ID",
        Action::SetUserProperties => "Error setting user properties",
        Action::LogRevenue => "Error logging revenue",
        Action::Reset => "Error resetting user",
        Action::SetDeviceId => "Error setting device ID",
        Action::GetDeviceId => "Error getting device ID",
        Action::GetSessionId => "Error getting session ID",
        Action::Flush => "Error flushing events",
    }
}

/// Render the message for an error completion of `action`.
pub fn error_message(action: Action, err: &BridgeError) -> String {
    match err {
        BridgeError::NotInitialized | BridgeError::InvalidConfiguration(_) => err.to_string(),
        other => format!("{}: {other}", failure_prefix(action)),
    }
}

// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Platform-agnostic view of the vendor analytics client.
//
// The dispatcher only ever talks to these traits. Each platform module wraps
// the real SDK object; the in-memory module stands in on desktop and CI.

use std::sync::Arc;

use amplibridge_core::config::ClientConfig;
use amplibridge_core::error::Result;
use amplibridge_core::types::{RevenueRecord, TraitSet};
use serde_json::{Map, Value};

/// A live vendor analytics client.
///
/// Every method may fail: the native SDKs throw, and the binding layer can
/// fail on its own (JNI attach, missing classes). Implementations must be
/// callable from any worker thread.
pub trait AnalyticsClient: Send + Sync {
    /// Set or clear (`None`) the current user id.
    fn set_user_id(&self, user_id: Option<&str>) -> Result<()>;

    /// Track an event without properties.
    fn track(&self, event_type: &str) -> Result<()>;

    /// Track an event with raw JSON properties. Callers only use this
    /// overload for non-empty maps.
    fn track_with_properties(&self, event_type: &str, properties: &Map<String, Value>)
        -> Result<()>;

    /// Submit a set of user properties as one identify operation.
    fn identify(&self, traits: &TraitSet) -> Result<()>;

    /// Log a revenue event.
    fn revenue(&self, record: &RevenueRecord) -> Result<()>;

    /// Forget the current user: clears the user id and regenerates the
    /// device id.
    fn reset(&self) -> Result<()>;

    fn set_device_id(&self, device_id: &str) -> Result<()>;

    /// Current device id, if the SDK has assigned one yet.
    fn device_id(&self) -> Result<Option<String>>;

    /// Current session id (epoch milliseconds of session start, or -1 when
    /// no session is active).
    fn session_id(&self) -> Result<i64>;

    /// Upload queued events now.
    fn flush(&self) -> Result<()>;
}

/// Builds vendor clients from host configuration.
///
/// `create` must apply every configuration field it understands; it does
/// not apply `user_id` (the dispatcher does that on the returned client).
pub trait ClientFactory: Send + Sync {
    /// Human-readable platform name (e.g. "Android", "iOS").
    fn platform_name(&self) -> &str;

    fn create(&self, config: &ClientConfig) -> Result<Arc<dyn AnalyticsClient>>;
}

// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// In-memory client for desktop/CI builds where the native SDKs are absent.
//
// Nothing is uploaded. Every call is recorded (and logged at debug level) so
// the host app can be exercised end to end and tests can assert on exactly
// what reached the "vendor".

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use amplibridge_core::config::ClientConfig;
use amplibridge_core::error::{BridgeError, Result};
use amplibridge_core::types::{RevenueRecord, TraitSet};
use chrono::Utc;
use serde_json::{Map, Value};
use tracing::{debug, info};
use uuid::Uuid;

use crate::traits::{AnalyticsClient, ClientFactory};

/// One call that reached the client, in arrival order.
#[derive(Debug, Clone, PartialEq)]
pub enum RecordedCall {
    SetUserId(Option<String>),
    Track {
        event_type: String,
        /// `None` when the property-less overload was used.
        properties: Option<Map<String, Value>>,
    },
    Identify(TraitSet),
    Revenue(RevenueRecord),
    Reset,
    SetDeviceId(String),
    Flush,
}

#[derive(Debug)]
struct MemoryState {
    user_id: Option<String>,
    device_id: Option<String>,
    session_id: i64,
    calls: Vec<RecordedCall>,
    /// Events tracked since the last flush.
    queued: usize,
    /// Failure injected for the next recorded call.
    fail_next: Option<String>,
}

/// Recording stand-in for the vendor client.
#[derive(Debug)]
pub struct MemoryClient {
    api_key: String,
    config: ClientConfig,
    state: Mutex<MemoryState>,
}

impl MemoryClient {
    pub fn new(config: &ClientConfig) -> Self {
        let session_id = if config.tracking_session_events == Some(false) {
            -1
        } else {
            Utc::now().timestamp_millis()
        };
        Self {
            api_key: config.api_key.clone(),
            config: config.clone(),
            state: Mutex::new(MemoryState {
                user_id: None,
                device_id: Some(generate_device_id()),
                session_id,
                calls: Vec::new(),
                queued: 0,
                fail_next: None,
            }),
        }
    }

    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    /// The configuration this client was built from.
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Snapshot of every recorded call.
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.lock().calls.clone()
    }

    pub fn user_id(&self) -> Option<String> {
        self.lock().user_id.clone()
    }

    /// Make the next mutating call fail with `message`, the way a throwing
    /// SDK method would.
    pub fn fail_next(&self, message: impl Into<String>) {
        self.lock().fail_next = Some(message.into());
    }

    /// Override the session id (e.g. to simulate a long-running session).
    pub fn set_session_id(&self, session_id: i64) {
        self.lock().session_id = session_id;
    }

    fn lock(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Record `call` unless a failure was injected, then apply `effect`.
    fn record(&self, call: RecordedCall, effect: impl FnOnce(&mut MemoryState)) -> Result<()> {
        let mut state = self.lock();
        if let Some(message) = state.fail_next.take() {
            return Err(BridgeError::Vendor(message));
        }
        debug!(?call, "memory client: recorded call");
        effect(&mut state);
        state.calls.push(call);
        Ok(())
    }
}

/// Device ids follow the SDK convention of a random UUID with an `R` suffix.
fn generate_device_id() -> String {
    format!("{}R", Uuid::new_v4())
}

impl AnalyticsClient for MemoryClient {
    fn set_user_id(&self, user_id: Option<&str>) -> Result<()> {
        let owned = user_id.map(str::to_owned);
        self.record(RecordedCall::SetUserId(owned.clone()), |state| {
            state.user_id = owned;
        })
    }

    fn track(&self, event_type: &str) -> Result<()> {
        let call = RecordedCall::Track {
            event_type: event_type.to_owned(),
            properties: None,
        };
        self.record(call, |state| state.queued += 1)
    }

    fn track_with_properties(
        &self,
        event_type: &str,
        properties: &Map<String, Value>,
    ) -> Result<()> {
        let call = RecordedCall::Track {
            event_type: event_type.to_owned(),
            properties: Some(properties.clone()),
        };
        self.record(call, |state| state.queued += 1)
    }

    fn identify(&self, traits: &TraitSet) -> Result<()> {
        self.record(RecordedCall::Identify(traits.clone()), |state| {
            state.queued += 1
        })
    }

    fn revenue(&self, record: &RevenueRecord) -> Result<()> {
        self.record(RecordedCall::Revenue(record.clone()), |state| {
            state.queued += 1
        })
    }

    fn reset(&self) -> Result<()> {
        self.record(RecordedCall::Reset, |state| {
            state.user_id = None;
            state.device_id = Some(generate_device_id());
        })
    }

    fn set_device_id(&self, device_id: &str) -> Result<()> {
        let owned = device_id.to_owned();
        self.record(RecordedCall::SetDeviceId(owned.clone()), |state| {
            state.device_id = Some(owned);
        })
    }

    fn device_id(&self) -> Result<Option<String>> {
        Ok(self.lock().device_id.clone())
    }

    fn session_id(&self) -> Result<i64> {
        Ok(self.lock().session_id)
    }

    fn flush(&self) -> Result<()> {
        self.record(RecordedCall::Flush, |state| {
            info!(events = state.queued, "memory client: flush (nothing uploaded)");
            state.queued = 0;
        })
    }
}

/// Factory producing [`MemoryClient`]s and remembering each one it built.
#[derive(Debug, Default)]
pub struct MemoryClientFactory {
    created: Mutex<Vec<Arc<MemoryClient>>>,
    /// When set, `create` fails with this message.
    fail_with: Option<String>,
    /// When set, each new client fails its first mutating call.
    first_call_failure: Option<String>,
}

impl MemoryClientFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// A factory whose constructor always throws.
    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            fail_with: Some(message.into()),
            ..Self::default()
        }
    }

    /// A factory whose clients are built fine but throw on their first
    /// mutating call.
    pub fn first_call_failing(message: impl Into<String>) -> Self {
        Self {
            first_call_failure: Some(message.into()),
            ..Self::default()
        }
    }

    /// Every client built so far, oldest first.
    pub fn clients(&self) -> Vec<Arc<MemoryClient>> {
        self.created
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn last_client(&self) -> Option<Arc<MemoryClient>> {
        self.clients().pop()
    }

    pub fn created_count(&self) -> usize {
        self.created
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

impl ClientFactory for MemoryClientFactory {
    fn platform_name(&self) -> &str {
        "Desktop (in-memory)"
    }

    fn create(&self, config: &ClientConfig) -> Result<Arc<dyn AnalyticsClient>> {
        if let Some(message) = &self.fail_with {
            return Err(BridgeError::Vendor(message.clone()));
        }
        let client = Arc::new(MemoryClient::new(config));
        if let Some(message) = &self.first_call_failure {
            client.fail_next(message.clone());
        }
        info!(
            server_zone = config.server_zone.unwrap_or_default().as_str(),
            "memory client created"
        );
        self.created
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Arc::clone(&client));
        Ok(client)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use amplibridge_core::types::TraitValue;
    use serde_json::json;

    fn client() -> MemoryClient {
        MemoryClient::new(&ClientConfig::new("test-key"))
    }

    #[test]
    fn records_calls_in_order() {
        let client = client();
        client.set_user_id(Some("u1")).unwrap();
        client.track("Opened").unwrap();
        client.flush().unwrap();

        assert_eq!(
            client.calls(),
            vec![
                RecordedCall::SetUserId(Some("u1".into())),
                RecordedCall::Track {
                    event_type: "Opened".into(),
                    properties: None
                },
                RecordedCall::Flush,
            ]
        );
    }

    #[test]
    fn track_with_properties_keeps_map() {
        let client = client();
        let props = json!({ "k": 1 }).as_object().cloned().unwrap();
        client.track_with_properties("Event", &props).unwrap();

        match &client.calls()[0] {
            RecordedCall::Track { properties, .. } => {
                assert_eq!(properties.as_ref(), Some(&props));
            }
            other => panic!("unexpected call {other:?}"),
        }
    }

    #[test]
    fn device_id_is_generated_with_suffix() {
        let id = client().device_id().unwrap().unwrap();
        assert!(id.ends_with('R'));
        assert_eq!(id.len(), 37);
    }

    #[test]
    fn reset_clears_user_and_rotates_device() {
        let client = client();
        client.set_user_id(Some("u1")).unwrap();
        let before = client.device_id().unwrap();

        client.reset().unwrap();

        assert_eq!(client.user_id(), None);
        assert_ne!(client.device_id().unwrap(), before);
    }

    #[test]
    fn session_id_is_epoch_millis() {
        // Millisecond timestamps are far beyond 32-bit range.
        assert!(client().session_id().unwrap() > i64::from(i32::MAX));
    }

    #[test]
    fn disabled_session_tracking_reports_no_session() {
        let mut config = ClientConfig::new("k");
        config.tracking_session_events = Some(false);
        assert_eq!(MemoryClient::new(&config).session_id().unwrap(), -1);
    }

    #[test]
    fn injected_failure_hits_next_call_only() {
        let client = client();
        client.fail_next("disk full");

        let mut traits = TraitSet::new();
        traits.set("a", TraitValue::Int(1));
        let err = client.identify(&traits).unwrap_err();
        assert_eq!(err.to_string(), "disk full");
        assert!(client.calls().is_empty());

        client.identify(&traits).unwrap();
        assert_eq!(client.calls().len(), 1);
    }

    #[test]
    fn factory_tracks_created_clients() {
        let factory = MemoryClientFactory::new();
        factory.create(&ClientConfig::new("a")).unwrap();
        factory.create(&ClientConfig::new("b")).unwrap();

        assert_eq!(factory.created_count(), 2);
        assert_eq!(factory.last_client().unwrap().api_key(), "b");
    }

    #[test]
    fn first_call_failure_applies_to_each_client() {
        let factory = MemoryClientFactory::first_call_failing("not ready");
        for key in ["a", "b"] {
            let client = factory.create(&ClientConfig::new(key)).unwrap();
            assert_eq!(client.flush().unwrap_err().to_string(), "not ready");
            client.flush().unwrap();
        }
        assert_eq!(factory.created_count(), 2);
    }

    #[test]
    fn failing_factory_builds_nothing() {
        let factory = MemoryClientFactory::failing("bad key format");
        assert!(factory.create(&ClientConfig::new("a")).is_err());
        assert_eq!(factory.created_count(), 0);
    }
}

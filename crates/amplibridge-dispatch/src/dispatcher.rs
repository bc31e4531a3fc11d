// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Action dispatcher: the host-facing entry point.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;

use amplibridge_core::config::BridgeSettings;
use amplibridge_core::error::{BridgeError, ErrorKind, Result};
use amplibridge_core::messages::error_message;
use amplibridge_core::types::{Action, CallId};
use amplibridge_native::ClientFactory;
use serde_json::Value;
use tracing::{Instrument as _, debug, error, info_span, warn};

use crate::args::Args;
use crate::callback::{ActionOutcome, CallbackContext};
use crate::executor::{TaskExecutor, WorkerPool};
use crate::handlers;
use crate::slot::ClientSlot;

struct Shared {
    slot: ClientSlot,
    factory: Arc<dyn ClientFactory>,
}

/// Routes host actions to their handlers on the worker pool.
///
/// Cheap to clone; clones share the client slot and executor.
#[derive(Clone)]
pub struct Dispatcher {
    shared: Arc<Shared>,
    executor: Arc<dyn TaskExecutor>,
}

impl Dispatcher {
    pub fn new(factory: Arc<dyn ClientFactory>, executor: Arc<dyn TaskExecutor>) -> Self {
        Self {
            shared: Arc::new(Shared {
                slot: ClientSlot::new(),
                factory,
            }),
            executor,
        }
    }

    /// Dispatcher with its own worker pool sized from `settings`.
    pub fn with_settings(factory: Arc<dyn ClientFactory>, settings: &BridgeSettings) -> Result<Self> {
        let pool = WorkerPool::new(settings)?;
        Ok(Self::new(factory, Arc::new(pool)))
    }

    /// Accept `action` for asynchronous execution.
    ///
    /// Returns `false` for an unrecognised name; `callback` is then dropped
    /// without being called. Otherwise returns `true` and `callback`
    /// completes exactly once from a worker thread.
    pub fn dispatch(&self, action: &str, args: Vec<Value>, callback: CallbackContext) -> bool {
        let Some(action) = Action::from_name(action) else {
            warn!(action, "unrecognised action");
            return false;
        };

        let call_id = CallId::new();
        let span = info_span!("action", %action, %call_id);
        debug!(parent: &span, args = args.len(), "dispatching");

        let shared = Arc::clone(&self.shared);
        self.executor.execute(Box::new(move || {
            let _entered = span.enter();
            let outcome = execute(action, &shared, &args);
            callback.complete(outcome);
        }));
        true
    }

    /// Dispatch and wait for the completion.
    ///
    /// Returns `None` for an unrecognised name.
    pub async fn call(&self, action: &str, args: Vec<Value>) -> Option<ActionOutcome> {
        let (callback, completion) = CallbackContext::channel();
        if !self.dispatch(action, args, callback) {
            return None;
        }
        let outcome = completion
            .instrument(info_span!("await_completion", action))
            .await;
        // A worker that died before completing counts as a vendor failure.
        Some(outcome.unwrap_or_else(|_| ActionOutcome::Error {
            kind: ErrorKind::Vendor,
            message: "action was dropped before completing".into(),
        }))
    }

    pub fn is_initialized(&self) -> bool {
        self.shared.slot.is_initialized()
    }

    pub fn platform_name(&self) -> &str {
        self.shared.factory.platform_name()
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("platform", &self.platform_name())
            .field("slot", &self.shared.slot)
            .finish_non_exhaustive()
    }
}

/// Run one action to its outcome. Panics in the handler or the vendor
/// binding become vendor errors.
fn execute(action: Action, shared: &Shared, raw_args: &[Value]) -> ActionOutcome {
    let args = Args::new(raw_args);
    let result = catch_unwind(AssertUnwindSafe(|| {
        handlers::run(action, &shared.slot, shared.factory.as_ref(), &args)
    }))
    .unwrap_or_else(|panic| {
        let panic_msg = if let Some(s) = panic.downcast_ref::<&str>() {
            s.to_string()
        } else if let Some(s) = panic.downcast_ref::<String>() {
            s.clone()
        } else {
            "unknown panic".to_string()
        };
        error!(panic_msg = %panic_msg, "handler panicked");
        Err(BridgeError::Vendor(format!("panicked: {panic_msg}")))
    });

    match result {
        Ok(payload) => {
            debug!("completed");
            ActionOutcome::success(payload)
        }
        Err(e) => {
            let kind = e.kind();
            error!(error = %e, ?kind, "action failed");
            ActionOutcome::Error {
                kind,
                message: error_message(action, &e),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};

    use amplibridge_core::types::{RevenueRecord, TraitSet, TraitValue};
    use amplibridge_core::ClientConfig;
    use amplibridge_native::AnalyticsClient;
    use amplibridge_native::memory::{MemoryClientFactory, RecordedCall};
    use serde_json::json;
    use tokio::runtime::Handle;

    fn setup() -> (Dispatcher, Arc<MemoryClientFactory>) {
        setup_with(MemoryClientFactory::new())
    }

    fn setup_with(factory: MemoryClientFactory) -> (Dispatcher, Arc<MemoryClientFactory>) {
        let factory = Arc::new(factory);
        let executor = Arc::new(WorkerPool::from_handle(Handle::current()));
        (Dispatcher::new(factory.clone(), executor), factory)
    }

    async fn call(dispatcher: &Dispatcher, action: &str, args: Value) -> ActionOutcome {
        let args = args.as_array().cloned().unwrap();
        dispatcher
            .call(action, args)
            .await
            .expect("action should be recognised")
    }

    async fn initialized() -> (Dispatcher, Arc<MemoryClientFactory>) {
        let (dispatcher, factory) = setup();
        let outcome = call(&dispatcher, "initialize", json!([{ "apiKey": "key" }])).await;
        assert!(outcome.is_success());
        (dispatcher, factory)
    }

    fn ok(message: &str) -> ActionOutcome {
        ActionOutcome::success(Some(message.to_owned()))
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn unrecognised_action_returns_false_without_completion() {
        let (dispatcher, factory) = setup();
        let called = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&called);

        let accepted = dispatcher.dispatch(
            "logEvent",
            vec![json!("x")],
            CallbackContext::new(move |_| flag.store(true, Ordering::SeqCst)),
        );

        assert!(!accepted);
        tokio::task::yield_now().await;
        assert!(!called.load(Ordering::SeqCst));
        assert_eq!(factory.created_count(), 0);
        assert!(dispatcher.call("Track", vec![]).await.is_none());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn every_action_fails_before_initialize() {
        let (dispatcher, factory) = setup();
        let cases = [
            ("track", json!(["Event"])),
            ("identify", json!(["u1", { "a": 1 }])),
            ("setUserId", json!(["u1"])),
            ("setUserProperties", json!([{ "a": 1 }])),
            ("logRevenue", json!(["sku1", 1, 1.0])),
            ("reset", json!([])),
            ("setDeviceId", json!(["d1"])),
            ("getDeviceId", json!([])),
            ("getSessionId", json!([])),
            ("flush", json!([])),
        ];

        for (action, args) in cases {
            let outcome = call(&dispatcher, action, args).await;
            assert_eq!(
                outcome,
                ActionOutcome::Error {
                    kind: ErrorKind::Uninitialized,
                    message: "Amplitude not initialized".into(),
                },
                "{action}"
            );
        }
        assert_eq!(factory.created_count(), 0);
        assert!(!dispatcher.is_initialized());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn initialize_requires_api_key() {
        let (dispatcher, factory) = setup();
        for config in [json!({}), json!({ "apiKey": "" }), json!({ "apiKey": null })] {
            let outcome = call(&dispatcher, "initialize", json!([config])).await;
            assert_eq!(
                outcome,
                ActionOutcome::Error {
                    kind: ErrorKind::InvalidConfiguration,
                    message: "API key is required".into(),
                }
            );
        }
        assert_eq!(factory.created_count(), 0);
        assert!(!dispatcher.is_initialized());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn failed_initialize_keeps_existing_client() {
        let (dispatcher, factory) = initialized().await;
        let outcome = call(&dispatcher, "initialize", json!([{ "apiKey": " " }])).await;
        assert!(!outcome.is_success());
        assert_eq!(factory.created_count(), 1);

        assert!(call(&dispatcher, "flush", json!([])).await.is_success());
        assert_eq!(factory.last_client().unwrap().calls(), vec![RecordedCall::Flush]);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn initialize_then_actions_succeed() {
        let (dispatcher, factory) = setup();
        let outcome = call(
            &dispatcher,
            "initialize",
            json!([{ "apiKey": "key", "userId": "u1", "serverZone": "EU", "trackingSessionEvents": true }]),
        )
        .await;
        assert_eq!(outcome, ok("Amplitude initialized successfully"));
        assert!(dispatcher.is_initialized());

        let client = factory.last_client().unwrap();
        assert_eq!(client.api_key(), "key");
        assert_eq!(client.user_id().as_deref(), Some("u1"));
        assert_eq!(
            client.config().server_zone,
            Some(amplibridge_core::ServerZone::Eu)
        );

        assert_eq!(call(&dispatcher, "reset", json!([])).await, ok("User reset successfully"));
        assert_eq!(
            call(&dispatcher, "setDeviceId", json!(["d1"])).await,
            ok("Device ID set successfully")
        );
        assert_eq!(
            call(&dispatcher, "flush", json!([])).await,
            ok("Events flushed successfully")
        );
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn reinitialize_replaces_client() {
        let (dispatcher, factory) = initialized().await;
        let first = factory.last_client().unwrap();

        call(&dispatcher, "initialize", json!([{ "apiKey": "second" }])).await;
        call(&dispatcher, "track", json!(["Event"])).await;

        assert_eq!(factory.created_count(), 2);
        assert!(first.calls().is_empty());
        assert_eq!(factory.last_client().unwrap().calls().len(), 1);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn track_with_properties_uses_map_overload() {
        let (dispatcher, factory) = initialized().await;
        let outcome = call(&dispatcher, "track", json!(["Event", { "k": 1 }])).await;
        assert_eq!(outcome, ok("Event tracked successfully"));

        assert_eq!(
            factory.last_client().unwrap().calls(),
            vec![RecordedCall::Track {
                event_type: "Event".into(),
                properties: json!({ "k": 1 }).as_object().cloned(),
            }]
        );
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn track_without_properties_uses_plain_overload() {
        let (dispatcher, factory) = initialized().await;
        call(&dispatcher, "track", json!(["A"])).await;
        call(&dispatcher, "track", json!(["B", {}])).await;
        call(&dispatcher, "track", json!(["C", null])).await;

        let calls = factory.last_client().unwrap().calls();
        assert_eq!(calls.len(), 3);
        for call in calls {
            assert!(matches!(call, RecordedCall::Track { properties: None, .. }));
        }
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn identify_types_each_property() {
        let (dispatcher, factory) = initialized().await;
        let outcome = call(
            &dispatcher,
            "identify",
            json!([null, { "a": "x", "b": 5, "c": true }]),
        )
        .await;
        assert_eq!(outcome, ok("User identified successfully"));

        let calls = factory.last_client().unwrap().calls();
        let [RecordedCall::Identify(traits)] = calls.as_slice() else {
            panic!("expected one identify, got {calls:?}");
        };
        assert_eq!(traits.len(), 3);
        assert_eq!(traits.get("a"), Some(&TraitValue::String("x".into())));
        assert_eq!(traits.get("b"), Some(&TraitValue::Int(5)));
        assert_eq!(traits.get("c"), Some(&TraitValue::Bool(true)));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn set_user_properties_submits_one_identify() {
        let (dispatcher, factory) = initialized().await;
        let outcome = call(
            &dispatcher,
            "setUserProperties",
            json!([{ "big": 5_000_000_000_i64, "tags": ["a"] }]),
        )
        .await;
        assert_eq!(outcome, ok("User properties set successfully"));

        let mut expected = TraitSet::new();
        expected
            .set("big", TraitValue::Long(5_000_000_000))
            .set("tags", TraitValue::Coerced("[\"a\"]".into()));
        assert_eq!(
            factory.last_client().unwrap().calls(),
            vec![RecordedCall::Identify(expected)]
        );
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn log_revenue_drops_event_properties() {
        let (dispatcher, factory) = initialized().await;
        let outcome = call(
            &dispatcher,
            "logRevenue",
            json!(["sku1", 2, 9.99, "type", { "ignored": 1 }]),
        )
        .await;
        assert_eq!(outcome, ok("Revenue logged successfully"));

        let expected = RevenueRecord::new("sku1", 2, 9.99).with_revenue_type(Some("type".into()));
        assert_eq!(
            factory.last_client().unwrap().calls(),
            vec![RecordedCall::Revenue(expected)]
        );
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn session_id_beyond_32_bits() {
        let (dispatcher, factory) = initialized().await;
        factory.last_client().unwrap().set_session_id(1_700_000_000_123);

        let outcome = call(&dispatcher, "getSessionId", json!([])).await;
        assert_eq!(outcome, ok("1700000000123"));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn device_id_payload_is_the_id() {
        let (dispatcher, factory) = initialized().await;
        let expected = factory.last_client().unwrap().device_id().unwrap();

        let outcome = call(&dispatcher, "getDeviceId", json!([])).await;
        assert_eq!(outcome, ActionOutcome::success(expected));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn argument_errors_complete_with_error() {
        let (dispatcher, _factory) = initialized().await;
        let (callback, completion) = CallbackContext::channel();

        assert!(dispatcher.dispatch("track", vec![], callback));
        let outcome = completion.await.unwrap();
        match outcome {
            ActionOutcome::Error { kind, message } => {
                assert_eq!(kind, ErrorKind::InvalidArgument);
                assert!(message.starts_with("Error tracking event: "), "{message}");
            }
            other => panic!("expected error, got {other:?}"),
        }
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn vendor_failures_are_prefixed() {
        let (dispatcher, factory) = initialized().await;
        factory.last_client().unwrap().fail_next("network unreachable");

        let outcome = call(&dispatcher, "flush", json!([])).await;
        assert_eq!(
            outcome,
            ActionOutcome::Error {
                kind: ErrorKind::Vendor,
                message: "Error flushing events: network unreachable".into(),
            }
        );
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn constructor_failure_leaves_slot_empty() {
        let (dispatcher, _factory) = setup_with(MemoryClientFactory::failing("bad key format"));
        let outcome = call(&dispatcher, "initialize", json!([{ "apiKey": "k" }])).await;
        assert_eq!(
            outcome.message(),
            Some("Error initializing Amplitude: bad key format")
        );
        assert!(!dispatcher.is_initialized());
    }

    struct PanickingFactory;

    impl ClientFactory for PanickingFactory {
        fn platform_name(&self) -> &str {
            "panicking"
        }

        fn create(&self, _config: &ClientConfig) -> Result<Arc<dyn AnalyticsClient>> {
            panic!("binding exploded")
        }
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn panics_become_error_completions() {
        let executor = Arc::new(WorkerPool::from_handle(Handle::current()));
        let dispatcher = Dispatcher::new(Arc::new(PanickingFactory), executor);

        let outcome = call(&dispatcher, "initialize", json!([{ "apiKey": "k" }])).await;
        assert_eq!(
            outcome,
            ActionOutcome::Error {
                kind: ErrorKind::Vendor,
                message: "Error initializing Amplitude: panicked: binding exploded".into(),
            }
        );
    }

    /// A platform binding whose SDK is not linked into the app.
    struct SdkMissingFactory;

    impl ClientFactory for SdkMissingFactory {
        fn platform_name(&self) -> &str {
            "sdk-missing"
        }

        fn create(&self, _config: &ClientConfig) -> Result<Arc<dyn AnalyticsClient>> {
            Err(BridgeError::PlatformUnavailable("Amplitude class not found".into()))
        }
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn missing_sdk_reports_platform_error() {
        let executor = Arc::new(WorkerPool::from_handle(Handle::current()));
        let dispatcher = Dispatcher::new(Arc::new(SdkMissingFactory), executor);

        let outcome = call(&dispatcher, "initialize", json!([{ "apiKey": "k" }])).await;
        assert_eq!(
            outcome,
            ActionOutcome::Error {
                kind: ErrorKind::Platform,
                message: "Error initializing Amplitude: Amplitude SDK not available: \
                          Amplitude class not found"
                    .into(),
            }
        );
        assert!(!dispatcher.is_initialized());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn numeric_api_key_initializes() {
        let (dispatcher, factory) = setup();
        let outcome = call(&dispatcher, "initialize", json!([{ "apiKey": 12345 }])).await;
        assert_eq!(outcome, ok("Amplitude initialized successfully"));
        assert_eq!(factory.last_client().unwrap().api_key(), "12345");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn concurrent_actions_each_complete_once() {
        let (dispatcher, factory) = initialized().await;
        let mut waits = Vec::new();
        for i in 0..32 {
            let (callback, completion) = CallbackContext::channel();
            assert!(dispatcher.dispatch("track", vec![json!(format!("E{i}"))], callback));
            waits.push(completion);
        }
        for completion in waits {
            assert!(completion.await.unwrap().is_success());
        }
        assert_eq!(factory.last_client().unwrap().calls().len(), 32);
    }
}

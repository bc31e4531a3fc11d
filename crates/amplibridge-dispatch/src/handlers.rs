// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Per-action bodies. Each one parses its arguments, acquires the client and
// returns the success payload; the dispatcher turns errors into completions.

use std::sync::Arc;

use amplibridge_core::config::ClientConfig;
use amplibridge_core::error::{BridgeError, Result};
use amplibridge_core::messages::success_message;
use amplibridge_core::types::{Action, RevenueRecord};
use amplibridge_native::ClientFactory;
use tracing::{debug, info, instrument, warn};

use crate::args::Args;
use crate::marshal::trait_set;
use crate::slot::ClientSlot;

/// Success payload of one action.
pub type Payload = Option<String>;

fn confirmed(action: Action) -> Result<Payload> {
    Ok(success_message(action).map(str::to_owned))
}

/// Run the body of `action`.
pub fn run(
    action: Action,
    slot: &ClientSlot,
    factory: &dyn ClientFactory,
    args: &Args<'_>,
) -> Result<Payload> {
    match action {
        Action::Initialize => initialize(slot, factory, args),
        Action::Track => track(slot, args),
        Action::Identify => identify(slot, args),
        Action::SetUserId => set_user_id(slot, args),
        Action::SetUserProperties => set_user_properties(slot, args),
        Action::LogRevenue => log_revenue(slot, args),
        Action::Reset => reset(slot),
        Action::SetDeviceId => set_device_id(slot, args),
        Action::GetDeviceId => get_device_id(slot),
        Action::GetSessionId => get_session_id(slot),
        Action::Flush => flush(slot),
    }
}

#[instrument(skip_all, fields(platform = factory.platform_name()))]
fn initialize(slot: &ClientSlot, factory: &dyn ClientFactory, args: &Args<'_>) -> Result<Payload> {
    let config = ClientConfig::from_json(args.object(0)?)?;
    let client = factory.create(&config)?;

    if slot.install(Arc::clone(&client)).is_some() {
        info!("replaced existing Amplitude client");
    }
    if let Some(user_id) = config.initial_user_id() {
        client.set_user_id(Some(user_id))?;
    }

    info!(
        server_zone = config.server_zone.unwrap_or_default().as_str(),
        "Amplitude initialized"
    );
    confirmed(Action::Initialize)
}

#[instrument(skip_all)]
fn track(slot: &ClientSlot, args: &Args<'_>) -> Result<Payload> {
    let event_type = args.string(0)?;
    if event_type.is_empty() {
        return Err(BridgeError::invalid_argument(0, "event name must not be empty"));
    }
    let properties = args.opt_object(1).filter(|props| !props.is_empty());

    let client = slot.acquire()?;
    match properties {
        Some(props) => client.track_with_properties(&event_type, props)?,
        None => client.track(&event_type)?,
    }
    debug!(event_type = %event_type, "event tracked");
    confirmed(Action::Track)
}

#[instrument(skip_all)]
fn identify(slot: &ClientSlot, args: &Args<'_>) -> Result<Payload> {
    let user_id = args.opt_string(0)?.filter(|id| !id.is_empty());
    let properties = args.opt_object(1).filter(|props| !props.is_empty());

    let client = slot.acquire()?;
    if let Some(user_id) = user_id.as_deref() {
        client.set_user_id(Some(user_id))?;
    }
    if let Some(props) = properties {
        client.identify(&trait_set(props))?;
    }
    confirmed(Action::Identify)
}

#[instrument(skip_all)]
fn set_user_id(slot: &ClientSlot, args: &Args<'_>) -> Result<Payload> {
    // Null, missing and empty all clear the user id.
    let user_id = args.opt_string(0)?.filter(|id| !id.is_empty());
    slot.acquire()?.set_user_id(user_id.as_deref())?;
    confirmed(Action::SetUserId)
}

#[instrument(skip_all)]
fn set_user_properties(slot: &ClientSlot, args: &Args<'_>) -> Result<Payload> {
    let properties = args.object(0)?;
    let client = slot.acquire()?;
    if !properties.is_empty() {
        client.identify(&trait_set(properties))?;
    }
    confirmed(Action::SetUserProperties)
}

#[instrument(skip_all)]
fn log_revenue(slot: &ClientSlot, args: &Args<'_>) -> Result<Payload> {
    let record = RevenueRecord::new(args.string(0)?, args.int(1)?, args.double(2)?)
        .with_revenue_type(args.opt_string(3)?);
    if let Some(props) = args.opt_object(4).filter(|props| !props.is_empty()) {
        warn!(
            dropped = props.len(),
            "revenue event properties are not forwarded to the SDK"
        );
    }

    slot.acquire()?.revenue(&record)?;
    debug!(product_id = %record.product_id, quantity = record.quantity, "revenue logged");
    confirmed(Action::LogRevenue)
}

#[instrument(skip_all)]
fn reset(slot: &ClientSlot) -> Result<Payload> {
    slot.acquire()?.reset()?;
    confirmed(Action::Reset)
}

#[instrument(skip_all)]
fn set_device_id(slot: &ClientSlot, args: &Args<'_>) -> Result<Payload> {
    let device_id = args.string(0)?;
    slot.acquire()?.set_device_id(&device_id)?;
    confirmed(Action::SetDeviceId)
}

fn get_device_id(slot: &ClientSlot) -> Result<Payload> {
    slot.acquire()?.device_id()
}

fn get_session_id(slot: &ClientSlot) -> Result<Payload> {
    let session_id = slot.acquire()?.session_id()?;
    Ok(Some(session_id.to_string()))
}

#[instrument(skip_all)]
fn flush(slot: &ClientSlot) -> Result<Payload> {
    slot.acquire()?.flush()?;
    confirmed(Action::Flush)
}

#[cfg(test)]
mod tests {
    use super::*;
    use amplibridge_core::types::TraitValue;
    use amplibridge_core::ErrorKind;
    use amplibridge_native::memory::{MemoryClientFactory, RecordedCall};
    use serde_json::{Value, json};

    fn ready() -> (ClientSlot, MemoryClientFactory) {
        let slot = ClientSlot::new();
        let factory = MemoryClientFactory::new();
        let raw = vec![json!({ "apiKey": "key" })];
        run(Action::Initialize, &slot, &factory, &Args::new(&raw)).unwrap();
        (slot, factory)
    }

    fn call(slot: &ClientSlot, factory: &MemoryClientFactory, action: Action, raw: Value) -> Result<Payload> {
        let values = raw.as_array().cloned().unwrap();
        run(action, slot, factory, &Args::new(&values))
    }

    #[test]
    fn initialize_applies_non_empty_user_id() {
        let slot = ClientSlot::new();
        let factory = MemoryClientFactory::new();
        call(&slot, &factory, Action::Initialize, json!([{ "apiKey": "k", "userId": "u1" }])).unwrap();
        assert_eq!(factory.last_client().unwrap().user_id().as_deref(), Some("u1"));

        call(&slot, &factory, Action::Initialize, json!([{ "apiKey": "k", "userId": "" }])).unwrap();
        assert!(factory.last_client().unwrap().calls().is_empty());
    }

    #[test]
    fn failing_initial_user_id_keeps_new_client() {
        let slot = ClientSlot::new();
        let factory = MemoryClientFactory::first_call_failing("user store locked");
        let err = call(&slot, &factory, Action::Initialize, json!([{ "apiKey": "k", "userId": "u1" }]))
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Vendor);
        assert!(slot.is_initialized());
        let client = factory.last_client().unwrap();
        assert_eq!(client.user_id(), None);

        // The installed client serves later calls.
        call(&slot, &factory, Action::Flush, json!([])).unwrap();
        assert_eq!(client.calls(), vec![RecordedCall::Flush]);
    }

    #[test]
    fn getters_complete_with_value() {
        let (slot, factory) = ready();
        let payload = call(&slot, &factory, Action::GetSessionId, json!([])).unwrap();
        assert!(payload.unwrap().parse::<i64>().is_ok());
    }

    #[test]
    fn initialize_rejects_non_object_config() {
        let slot = ClientSlot::new();
        let factory = MemoryClientFactory::new();
        let err = call(&slot, &factory, Action::Initialize, json!(["key"])).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
        assert!(!slot.is_initialized());
    }

    #[test]
    fn empty_event_name_is_rejected() {
        let (slot, factory) = ready();
        let err = call(&slot, &factory, Action::Track, json!([""])).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
        assert!(factory.last_client().unwrap().calls().is_empty());
    }

    #[test]
    fn identify_without_properties_only_sets_user() {
        let (slot, factory) = ready();
        call(&slot, &factory, Action::Identify, json!(["u9", {}])).unwrap();
        assert_eq!(
            factory.last_client().unwrap().calls(),
            vec![RecordedCall::SetUserId(Some("u9".into()))]
        );
    }

    #[test]
    fn identify_with_empty_user_keeps_current_user() {
        let (slot, factory) = ready();
        call(&slot, &factory, Action::SetUserId, json!(["u1"])).unwrap();
        call(&slot, &factory, Action::Identify, json!(["", { "plan": "pro" }])).unwrap();

        let client = factory.last_client().unwrap();
        assert_eq!(client.user_id().as_deref(), Some("u1"));
        let mut expected = amplibridge_core::TraitSet::new();
        expected.set("plan", TraitValue::String("pro".into()));
        assert_eq!(client.calls().last(), Some(&RecordedCall::Identify(expected)));
    }

    #[test]
    fn set_user_id_null_clears() {
        let (slot, factory) = ready();
        call(&slot, &factory, Action::SetUserId, json!(["u1"])).unwrap();
        call(&slot, &factory, Action::SetUserId, json!([null])).unwrap();
        assert_eq!(factory.last_client().unwrap().user_id(), None);
    }

    #[test]
    fn empty_user_properties_submit_nothing() {
        let (slot, factory) = ready();
        let payload = call(&slot, &factory, Action::SetUserProperties, json!([{}])).unwrap();
        assert_eq!(payload.as_deref(), Some("User properties set successfully"));
        assert!(factory.last_client().unwrap().calls().is_empty());
    }

    #[test]
    fn set_user_properties_requires_object() {
        let (slot, factory) = ready();
        let err = call(&slot, &factory, Action::SetUserProperties, json!([])).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
    }

    #[test]
    fn revenue_without_type() {
        let (slot, factory) = ready();
        call(&slot, &factory, Action::LogRevenue, json!(["sku", "3", 1.5])).unwrap();
        assert_eq!(
            factory.last_client().unwrap().calls(),
            vec![RecordedCall::Revenue(RevenueRecord::new("sku", 3, 1.5))]
        );
    }

    #[test]
    fn revenue_rejects_non_numeric_price() {
        let (slot, factory) = ready();
        let err = call(&slot, &factory, Action::LogRevenue, json!(["sku", 1, "free"])).unwrap_err();
        assert!(err.to_string().contains("position 2"));
    }

    #[test]
    fn get_device_id_returns_current_id() {
        let (slot, factory) = ready();
        call(&slot, &factory, Action::SetDeviceId, json!(["device-1"])).unwrap();
        let payload = call(&slot, &factory, Action::GetDeviceId, json!([])).unwrap();
        assert_eq!(payload.as_deref(), Some("device-1"));
    }
}

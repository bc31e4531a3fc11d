// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// iOS client via objc2.
//
// Wraps the Objective-C Amplitude SDK (`Amplitude`, `AMPIdentify`,
// `AMPRevenue`). The classes are looked up at runtime so a host that forgot
// to link the SDK gets an error completion instead of a crash at launch.
//
// Every message send runs inside `objc2::exception::catch`: the SDK raises
// `NSException` for misuse, and an exception must never unwind through Rust.

#![cfg(target_os = "ios")]

use std::ffi::{c_int, c_long, c_longlong};
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use objc2::rc::Retained;
use objc2::runtime::{AnyClass, Bool};
use objc2::{class, msg_send};
use objc2_foundation::{NSNull, NSNumber, NSObject, NSString};
use serde_json::{Map, Value};
use tracing::{debug, info};
use uuid::Uuid;

use amplibridge_core::config::{ClientConfig, ServerZone};
use amplibridge_core::error::{BridgeError, Result};
use amplibridge_core::types::{RevenueRecord, TraitSet, TraitValue};

use crate::traits::{AnalyticsClient, ClientFactory};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Look up an SDK class, failing cleanly when the SDK is not linked.
fn sdk_class(name: &'static std::ffi::CStr) -> Result<&'static AnyClass> {
    AnyClass::get(name).ok_or_else(|| {
        BridgeError::PlatformUnavailable(format!(
            "{} class not found (is the Amplitude SDK linked?)",
            name.to_string_lossy()
        ))
    })
}

fn to_c_int(field: &str, value: u32) -> Result<c_int> {
    c_int::try_from(value).map_err(|_| {
        BridgeError::InvalidConfiguration(format!("{field} is out of range ({value})"))
    })
}

/// Run message sends, converting a raised `NSException` into a vendor error.
fn guarded<R>(what: &str, f: impl FnOnce() -> R) -> Result<R> {
    // SAFETY: the closures passed here only send messages to SDK and
    // Foundation objects owned by this module.
    unsafe { objc2::exception::catch(AssertUnwindSafe(f)) }.map_err(|exception| {
        let detail = exception
            .map(|e| format!("{e:?}"))
            .unwrap_or_else(|| "Objective-C exception".into());
        BridgeError::Vendor(format!("{what}: {detail}"))
    })
}

fn ns_string(s: &str) -> Retained<NSString> {
    NSString::from_str(s)
}

fn string_object(s: &str) -> Retained<NSObject> {
    Retained::into_super(ns_string(s))
}

fn number_object(n: Retained<NSNumber>) -> Retained<NSObject> {
    Retained::into_super(Retained::into_super(n))
}

/// Convert a JSON value into the Foundation object the SDK expects in
/// property dictionaries.
fn to_foundation(value: &Value) -> Retained<NSObject> {
    match value {
        Value::Null => Retained::into_super(NSNull::null()),
        Value::Bool(b) => number_object(NSNumber::new_bool(*b)),
        Value::Number(n) => match n.as_i64() {
            Some(i) => number_object(NSNumber::new_i64(i)),
            None => number_object(NSNumber::new_f64(n.as_f64().unwrap_or(f64::NAN))),
        },
        Value::String(s) => string_object(s),
        Value::Array(items) => {
            // SAFETY: NSMutableArray `new` / `addObject:` with non-nil objects.
            unsafe {
                let array: Retained<NSObject> = msg_send![class!(NSMutableArray), new];
                for item in items {
                    let element = to_foundation(item);
                    let _: () = msg_send![&*array, addObject: &*element];
                }
                array
            }
        }
        Value::Object(map) => to_dictionary(map),
    }
}

fn to_dictionary(map: &Map<String, Value>) -> Retained<NSObject> {
    // SAFETY: NSMutableDictionary `new` / `setObject:forKey:` with non-nil
    // keys and values (JSON null becomes NSNull).
    unsafe {
        let dict: Retained<NSObject> = msg_send![class!(NSMutableDictionary), new];
        for (key, value) in map {
            let ns_key = ns_string(key);
            let ns_value = to_foundation(value);
            let _: () = msg_send![&*dict, setObject: &*ns_value, forKey: &*ns_key];
        }
        dict
    }
}

/// The value `AMPIdentify set:value:` receives for a trait.
fn trait_object(value: &TraitValue) -> Retained<NSObject> {
    match value {
        TraitValue::String(s) | TraitValue::Coerced(s) => string_object(s),
        TraitValue::Int(i) => number_object(NSNumber::new_i32(*i)),
        TraitValue::Long(l) => number_object(NSNumber::new_i64(*l)),
        TraitValue::Double(d) => number_object(NSNumber::new_f64(*d)),
        TraitValue::Bool(b) => number_object(NSNumber::new_bool(*b)),
    }
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// A named `Amplitude` instance.
pub struct IosClient {
    instance: Retained<NSObject>,
}

// SAFETY: the Amplitude SDK serialises all work onto its own background
// queue and documents its public API as callable from any thread. The
// retained pointer itself is never mutated after construction.
unsafe impl Send for IosClient {}
unsafe impl Sync for IosClient {}

impl AnalyticsClient for IosClient {
    fn set_user_id(&self, user_id: Option<&str>) -> Result<()> {
        let ns_user = user_id.map(ns_string);
        guarded("Amplitude.setUserId", || unsafe {
            let _: () = msg_send![&*self.instance, setUserId: ns_user.as_deref()];
        })
    }

    fn track(&self, event_type: &str) -> Result<()> {
        let ns_event = ns_string(event_type);
        guarded("Amplitude.logEvent", || unsafe {
            let _: () = msg_send![&*self.instance, logEvent: &*ns_event];
        })
    }

    fn track_with_properties(
        &self,
        event_type: &str,
        properties: &Map<String, Value>,
    ) -> Result<()> {
        let ns_event = ns_string(event_type);
        let dict = to_dictionary(properties);
        guarded("Amplitude.logEvent", || unsafe {
            let _: () = msg_send![
                &*self.instance,
                logEvent: &*ns_event,
                withEventProperties: &*dict
            ];
        })
    }

    fn identify(&self, traits: &TraitSet) -> Result<()> {
        let identify_class = sdk_class(c"AMPIdentify")?;
        guarded("Amplitude.identify", || unsafe {
            let identify: Retained<NSObject> = msg_send![identify_class, identify];
            for (key, value) in traits.iter() {
                let ns_key = ns_string(key);
                let object = trait_object(value);
                let _: Option<Retained<NSObject>> =
                    msg_send![&*identify, set: &*ns_key, value: &*object];
            }
            let _: () = msg_send![&*self.instance, identify: &*identify];
        })?;
        debug!(properties = traits.len(), "iOS: identify submitted");
        Ok(())
    }

    fn revenue(&self, record: &RevenueRecord) -> Result<()> {
        let revenue_class = sdk_class(c"AMPRevenue")?;
        let ns_product = ns_string(&record.product_id);
        let price = NSNumber::new_f64(record.price);
        let ns_type = record.revenue_type.as_deref().map(ns_string);
        guarded("Amplitude.logRevenueV2", || unsafe {
            let revenue: Retained<NSObject> = msg_send![revenue_class, revenue];
            let _: Option<Retained<NSObject>> =
                msg_send![&*revenue, setProductIdentifier: &*ns_product];
            let _: Option<Retained<NSObject>> =
                msg_send![&*revenue, setQuantity: record.quantity as isize];
            let _: Option<Retained<NSObject>> = msg_send![&*revenue, setPrice: &*price];
            if let Some(ns_type) = &ns_type {
                let _: Option<Retained<NSObject>> =
                    msg_send![&*revenue, setRevenueType: &**ns_type];
            }
            let _: () = msg_send![&*self.instance, logRevenueV2: &*revenue];
        })
    }

    fn reset(&self) -> Result<()> {
        // The iOS SDK has no single reset call: clear the user, then rotate
        // the device id.
        guarded("Amplitude.reset", || unsafe {
            let none: Option<&NSString> = None;
            let _: () = msg_send![&*self.instance, setUserId: none];
            let _: () = msg_send![&*self.instance, regenerateDeviceId];
        })
    }

    fn set_device_id(&self, device_id: &str) -> Result<()> {
        let ns_device = ns_string(device_id);
        guarded("Amplitude.setDeviceId", || unsafe {
            let _: () = msg_send![&*self.instance, setDeviceId: &*ns_device];
        })
    }

    fn device_id(&self) -> Result<Option<String>> {
        let id: Option<Retained<NSString>> = guarded("Amplitude.getDeviceId", || unsafe {
            msg_send![&*self.instance, getDeviceId]
        })?;
        Ok(id.map(|s| s.to_string()))
    }

    fn session_id(&self) -> Result<i64> {
        let id: c_longlong = guarded("Amplitude.getSessionId", || unsafe {
            msg_send![&*self.instance, getSessionId]
        })?;
        Ok(id)
    }

    fn flush(&self) -> Result<()> {
        guarded("Amplitude.uploadEvents", || unsafe {
            let _: () = msg_send![&*self.instance, uploadEvents];
        })
    }
}

// ---------------------------------------------------------------------------
// Factory
// ---------------------------------------------------------------------------

/// Builds `IosClient`s.
///
/// The SDK ignores a second `initializeApiKey:` on an instance, so every
/// `create` uses a fresh instance name. Replaced instances stay registered
/// inside the SDK but receive no further calls.
pub struct IosClientFactory;

impl IosClientFactory {
    pub fn new() -> Self {
        Self
    }
}

impl Default for IosClientFactory {
    fn default() -> Self {
        Self::new()
    }
}

impl ClientFactory for IosClientFactory {
    fn platform_name(&self) -> &str {
        "iOS"
    }

    fn create(&self, config: &ClientConfig) -> Result<Arc<dyn AnalyticsClient>> {
        let amplitude_class = sdk_class(c"Amplitude")?;
        let instance_name = ns_string(&format!("amplibridge-{}", Uuid::new_v4().simple()));
        let api_key = ns_string(&config.api_key);
        let upload_threshold = config
            .flush_queue_size
            .map(|size| to_c_int("flushQueueSize", size))
            .transpose()?;
        // The iOS SDK schedules uploads in whole seconds.
        let upload_period = config
            .flush_interval_millis
            .map(|millis| to_c_int("flushIntervalMillis", millis).map(|m| (m / 1000).max(1)))
            .transpose()?;

        let instance: Option<Retained<NSObject>> =
            guarded("Amplitude.instanceWithName", || unsafe {
                msg_send![amplitude_class, instanceWithName: &*instance_name]
            })?;
        let instance = instance
            .ok_or_else(|| BridgeError::Vendor("Amplitude.instanceWithName returned nil".into()))?;

        // Options must be set before initializeApiKey: to take effect for
        // the first session.
        guarded("Amplitude.configure", || unsafe {
            if let Some(sessions) = config.tracking_session_events {
                let _: () = msg_send![&*instance, setTrackingSessionEvents: Bool::new(sessions)];
            }
            if let Some(millis) = config.min_time_between_sessions_millis {
                let _: () =
                    msg_send![&*instance, setMinTimeBetweenSessionsMillis: millis as c_long];
            }
            if let Some(size) = upload_threshold {
                let _: () = msg_send![&*instance, setEventUploadThreshold: size];
            }
            if let Some(seconds) = upload_period {
                let _: () = msg_send![&*instance, setEventUploadPeriodSeconds: seconds];
            }
            if let Some(zone) = config.server_zone {
                let raw: isize = match zone {
                    ServerZone::Us => 0,
                    ServerZone::Eu => 1,
                };
                let _: () = msg_send![&*instance, setServerZone: raw];
            }
            let _: () = msg_send![&*instance, initializeApiKey: &*api_key];
        })?;

        info!("iOS: Amplitude instance initialised");
        Ok(Arc::new(IosClient { instance }))
    }
}

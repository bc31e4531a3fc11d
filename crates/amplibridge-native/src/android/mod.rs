// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Android client via JNI.
//
// Wraps `com.amplitude.android.Amplitude` (Amplitude-Kotlin). The host app
// must ship the SDK on its classpath; this module only drives it. Requires
// the Android NDK and targets `aarch64-linux-android` or
// `armv7-linux-androideabi`.
//
// ## Threading
//
// Every trait method attaches the calling worker thread to the JVM for the
// duration of the call. The attach guard detaches on drop, which also
// releases the local references created during the call.
//
// ## Exceptions
//
// The Kotlin SDK throws for misuse (e.g. bad API key format). A pending Java
// exception is cleared and its `toString()` becomes the message of a
// `BridgeError::Vendor`, so nothing is left pending when control returns to
// the JVM.

#![cfg(target_os = "android")]

use std::sync::Arc;

use jni::objects::{GlobalRef, JObject, JString, JValue};
use jni::{AttachGuard, JNIEnv, JavaVM};
use serde_json::{Map, Value};
use tracing::{debug, info};

use amplibridge_core::config::{ClientConfig, ServerZone};
use amplibridge_core::error::{BridgeError, Result};
use amplibridge_core::types::{RevenueRecord, TraitSet, TraitValue};

use crate::traits::{AnalyticsClient, ClientFactory};

// ---------------------------------------------------------------------------
// Class names and signatures
// ---------------------------------------------------------------------------

const AMPLITUDE_CLASS: &str = "com/amplitude/android/Amplitude";
const CONFIGURATION_CLASS: &str = "com/amplitude/android/Configuration";
const IDENTIFY_CLASS: &str = "com/amplitude/android/events/Identify";
const REVENUE_CLASS: &str = "com/amplitude/android/events/Revenue";
const SERVER_ZONE_CLASS: &str = "com/amplitude/core/ServerZone";

/// Kotlin setters on `com.amplitude.core.Amplitude` return `this`.
const SIG_STRING_FLUENT: &str = "(Ljava/lang/String;)Lcom/amplitude/core/Amplitude;";
const SIG_NOARG_FLUENT: &str = "()Lcom/amplitude/core/Amplitude;";

// ---------------------------------------------------------------------------
// JNI helpers
// ---------------------------------------------------------------------------

/// Obtain the process-wide `JavaVM` registered by the NDK glue.
fn java_vm() -> Result<JavaVM> {
    let ctx = ndk_context::android_context();
    // SAFETY: `ctx.vm()` is the `JavaVM*` set by `ANativeActivity_onCreate`
    // (or the host's `JNI_OnLoad`) and stays valid for the process lifetime.
    unsafe { JavaVM::from_raw(ctx.vm().cast()) }
        .map_err(|e| BridgeError::Vendor(format!("failed to obtain JavaVM: {e}")))
}

fn attach(vm: &JavaVM) -> Result<AttachGuard<'_>> {
    vm.attach_current_thread()
        .map_err(|e| BridgeError::Vendor(format!("failed to attach JNI thread: {e}")))
}

/// Run one JNI operation, turning a thrown Java exception into a vendor
/// error carrying the exception text.
fn jni_call<'local, T>(
    env: &mut JNIEnv<'local>,
    what: &str,
    op: impl FnOnce(&mut JNIEnv<'local>) -> jni::errors::Result<T>,
) -> Result<T> {
    match op(env) {
        Ok(value) => Ok(value),
        Err(jni::errors::Error::JavaException) => Err(BridgeError::Vendor(format!(
            "{what}: {}",
            take_exception(env)
        ))),
        Err(e) => Err(BridgeError::Vendor(format!("{what}: {e}"))),
    }
}

/// Clear the pending exception and describe it.
fn take_exception(env: &mut JNIEnv<'_>) -> String {
    let throwable = match env.exception_occurred() {
        Ok(throwable) => throwable,
        Err(_) => return "Java exception".into(),
    };
    // Must clear before calling back into Java.
    let _ = env.exception_clear();

    let described = env
        .call_method(&throwable, "toString", "()Ljava/lang/String;", &[])
        .and_then(|value| value.l());
    let text = match described {
        Ok(obj) => env
            .get_string(&JString::from(obj))
            .map(String::from)
            .ok(),
        Err(_) => None,
    };
    // A failure while describing leaves a second exception pending.
    let _ = env.exception_clear();
    text.unwrap_or_else(|| "Java exception".into())
}

/// Drop a per-item local reference. Property loops create a few per key,
/// and the attach guard only frees them when the call returns.
fn release<'local>(env: &JNIEnv<'local>, obj: impl Into<JObject<'local>>) {
    let obj = obj.into();
    if !obj.is_null() {
        let _ = env.delete_local_ref(obj);
    }
}

/// Fail with `PlatformUnavailable` when the SDK is not on the classpath.
fn require_sdk(env: &mut JNIEnv<'_>) -> Result<()> {
    match env.find_class(AMPLITUDE_CLASS) {
        Ok(class) => {
            release(env, class);
            Ok(())
        }
        Err(jni::errors::Error::JavaException) => Err(BridgeError::PlatformUnavailable(format!(
            "{AMPLITUDE_CLASS}: {}",
            take_exception(env)
        ))),
        Err(e) => Err(BridgeError::Vendor(format!("FindClass({AMPLITUDE_CLASS}): {e}"))),
    }
}

/// The application `Context` (what the SDK expects, not the Activity).
fn application_context<'local>(env: &mut JNIEnv<'local>) -> Result<JObject<'local>> {
    let ptr = ndk_context::android_context().context();
    if ptr.is_null() {
        return Err(BridgeError::Vendor(
            "Android context is null: native activity not initialised".into(),
        ));
    }
    // SAFETY: the NDK guarantees this pointer is a valid global jobject for
    // the hosting Activity.
    let activity = unsafe { JObject::from_raw(ptr.cast()) };
    jni_call(env, "Context.getApplicationContext", |env| {
        env.call_method(
            &activity,
            "getApplicationContext",
            "()Landroid/content/Context;",
            &[],
        )?
        .l()
    })
}

/// Convert a JSON value into the Java object the SDK's property maps hold.
fn to_java<'local>(env: &mut JNIEnv<'local>, value: &Value) -> Result<JObject<'local>> {
    match value {
        Value::Null => Ok(JObject::null()),
        Value::Bool(b) => jni_call(env, "Boolean.valueOf", |env| {
            env.call_static_method(
                "java/lang/Boolean",
                "valueOf",
                "(Z)Ljava/lang/Boolean;",
                &[JValue::Bool(u8::from(*b))],
            )?
            .l()
        }),
        Value::Number(n) => match n.as_i64() {
            Some(i) => match i32::try_from(i) {
                Ok(small) => jni_call(env, "Integer.valueOf", |env| {
                    env.call_static_method(
                        "java/lang/Integer",
                        "valueOf",
                        "(I)Ljava/lang/Integer;",
                        &[JValue::Int(small)],
                    )?
                    .l()
                }),
                Err(_) => jni_call(env, "Long.valueOf", |env| {
                    env.call_static_method(
                        "java/lang/Long",
                        "valueOf",
                        "(J)Ljava/lang/Long;",
                        &[JValue::Long(i)],
                    )?
                    .l()
                }),
            },
            None => {
                let d = n.as_f64().unwrap_or(f64::NAN);
                jni_call(env, "Double.valueOf", |env| {
                    env.call_static_method(
                        "java/lang/Double",
                        "valueOf",
                        "(D)Ljava/lang/Double;",
                        &[JValue::Double(d)],
                    )?
                    .l()
                })
            }
        },
        Value::String(s) => {
            let j = jni_call(env, "new_string", |env| env.new_string(s))?;
            Ok(j.into())
        }
        Value::Array(items) => {
            let list = jni_call(env, "new ArrayList", |env| {
                env.new_object("java/util/ArrayList", "()V", &[])
            })?;
            for item in items {
                let element = to_java(env, item)?;
                jni_call(env, "ArrayList.add", |env| {
                    env.call_method(
                        &list,
                        "add",
                        "(Ljava/lang/Object;)Z",
                        &[JValue::Object(&element)],
                    )
                })?;
                release(env, element);
            }
            Ok(list)
        }
        Value::Object(map) => to_java_map(env, map),
    }
}

fn to_java_map<'local>(
    env: &mut JNIEnv<'local>,
    map: &Map<String, Value>,
) -> Result<JObject<'local>> {
    let hash_map = jni_call(env, "new HashMap", |env| {
        env.new_object("java/util/HashMap", "()V", &[])
    })?;
    for (key, value) in map {
        let j_key = jni_call(env, "new_string(key)", |env| env.new_string(key))?;
        let j_value = to_java(env, value)?;
        let previous = jni_call(env, "HashMap.put", |env| {
            env.call_method(
                &hash_map,
                "put",
                "(Ljava/lang/Object;Ljava/lang/Object;)Ljava/lang/Object;",
                &[JValue::Object(&j_key), JValue::Object(&j_value)],
            )?
            .l()
        })?;
        release(env, previous);
        release(env, j_value);
        release(env, j_key);
    }
    Ok(hash_map)
}

/// Apply the optional configuration fields to a `Configuration` object.
fn apply_configuration<'local>(
    env: &mut JNIEnv<'local>,
    configuration: &JObject<'local>,
    config: &ClientConfig,
) -> Result<()> {
    if let Some(sessions) = config.tracking_session_events {
        let tracking = jni_call(env, "Configuration.getDefaultTracking", |env| {
            env.call_method(
                configuration,
                "getDefaultTracking",
                "()Lcom/amplitude/android/DefaultTrackingOptions;",
                &[],
            )?
            .l()
        })?;
        jni_call(env, "DefaultTrackingOptions.setSessions", |env| {
            env.call_method(&tracking, "setSessions", "(Z)V", &[JValue::Bool(u8::from(sessions))])
        })?;
    }

    if let Some(millis) = config.min_time_between_sessions_millis {
        jni_call(env, "Configuration.setMinTimeBetweenSessionsMillis", |env| {
            env.call_method(
                configuration,
                "setMinTimeBetweenSessionsMillis",
                "(J)V",
                &[JValue::Long(millis)],
            )
        })?;
    }

    if let Some(size) = config.flush_queue_size {
        let size = to_jint("flushQueueSize", size)?;
        jni_call(env, "Configuration.setFlushQueueSize", |env| {
            env.call_method(configuration, "setFlushQueueSize", "(I)V", &[JValue::Int(size)])
        })?;
    }

    if let Some(millis) = config.flush_interval_millis {
        let millis = to_jint("flushIntervalMillis", millis)?;
        jni_call(env, "Configuration.setFlushIntervalMillis", |env| {
            env.call_method(
                configuration,
                "setFlushIntervalMillis",
                "(I)V",
                &[JValue::Int(millis)],
            )
        })?;
    }

    if let Some(zone) = config.server_zone {
        let field = match zone {
            ServerZone::Us => "US",
            ServerZone::Eu => "EU",
        };
        let j_zone = jni_call(env, "ServerZone field", |env| {
            env.get_static_field(SERVER_ZONE_CLASS, field, "Lcom/amplitude/core/ServerZone;")?
                .l()
        })?;
        jni_call(env, "Configuration.setServerZone", |env| {
            env.call_method(
                configuration,
                "setServerZone",
                "(Lcom/amplitude/core/ServerZone;)V",
                &[JValue::Object(&j_zone)],
            )
        })?;
    }

    Ok(())
}

fn to_jint(field: &str, value: u32) -> Result<i32> {
    i32::try_from(value).map_err(|_| {
        BridgeError::InvalidConfiguration(format!("{field} is out of range ({value})"))
    })
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// A live `com.amplitude.android.Amplitude` instance.
pub struct AndroidClient {
    vm: JavaVM,
    amplitude: GlobalRef,
}

impl AndroidClient {
    /// Call a Kotlin setter that takes one nullable string and returns `this`.
    fn call_string_setter(&self, method: &str, value: Option<&str>) -> Result<()> {
        let mut guard = attach(&self.vm)?;
        let env = &mut *guard;
        let j_value: JObject = match value {
            Some(v) => jni_call(env, "new_string", |env| env.new_string(v))?.into(),
            None => JObject::null(),
        };
        jni_call(env, method, |env| {
            env.call_method(
                &self.amplitude,
                method,
                SIG_STRING_FLUENT,
                &[JValue::Object(&j_value)],
            )
        })?;
        Ok(())
    }
}

impl AnalyticsClient for AndroidClient {
    fn set_user_id(&self, user_id: Option<&str>) -> Result<()> {
        self.call_string_setter("setUserId", user_id)
    }

    fn track(&self, event_type: &str) -> Result<()> {
        self.call_string_setter("track", Some(event_type))
    }

    fn track_with_properties(
        &self,
        event_type: &str,
        properties: &Map<String, Value>,
    ) -> Result<()> {
        let mut guard = attach(&self.vm)?;
        let env = &mut *guard;
        let j_event = jni_call(env, "new_string(eventType)", |env| env.new_string(event_type))?;
        let j_props = to_java_map(env, properties)?;
        jni_call(env, "Amplitude.track", |env| {
            env.call_method(
                &self.amplitude,
                "track",
                "(Ljava/lang/String;Ljava/util/Map;)Lcom/amplitude/core/Amplitude;",
                &[JValue::Object(&j_event), JValue::Object(&j_props)],
            )
        })?;
        Ok(())
    }

    fn identify(&self, traits: &TraitSet) -> Result<()> {
        let mut guard = attach(&self.vm)?;
        let env = &mut *guard;
        let identify = jni_call(env, "new Identify", |env| {
            env.new_object(IDENTIFY_CLASS, "()V", &[])
        })?;

        for (key, value) in traits.iter() {
            let j_key = jni_call(env, "new_string(key)", |env| env.new_string(key))?;
            let mut text: JObject<'_> = JObject::null();
            let (sig, arg) = match value {
                TraitValue::String(s) | TraitValue::Coerced(s) => {
                    text = JObject::from(jni_call(env, "new_string(value)", |env| {
                        env.new_string(s)
                    })?);
                    (
                        "(Ljava/lang/String;Ljava/lang/String;)Lcom/amplitude/core/events/Identify;",
                        JValue::Object(&text),
                    )
                }
                TraitValue::Int(i) => (
                    "(Ljava/lang/String;I)Lcom/amplitude/core/events/Identify;",
                    JValue::Int(*i),
                ),
                TraitValue::Long(l) => (
                    "(Ljava/lang/String;J)Lcom/amplitude/core/events/Identify;",
                    JValue::Long(*l),
                ),
                TraitValue::Double(d) => (
                    "(Ljava/lang/String;D)Lcom/amplitude/core/events/Identify;",
                    JValue::Double(*d),
                ),
                TraitValue::Bool(b) => (
                    "(Ljava/lang/String;Z)Lcom/amplitude/core/events/Identify;",
                    JValue::Bool(u8::from(*b)),
                ),
            };
            let returned = jni_call(env, "Identify.set", |env| {
                env.call_method(&identify, "set", sig, &[JValue::Object(&j_key), arg])?
                    .l()
            })?;
            release(env, returned);
            release(env, text);
            release(env, j_key);
        }

        jni_call(env, "Amplitude.identify", |env| {
            env.call_method(
                &self.amplitude,
                "identify",
                "(Lcom/amplitude/core/events/Identify;)Lcom/amplitude/core/Amplitude;",
                &[JValue::Object(&identify)],
            )
        })?;
        debug!(properties = traits.len(), "Android: identify submitted");
        Ok(())
    }

    fn revenue(&self, record: &RevenueRecord) -> Result<()> {
        let mut guard = attach(&self.vm)?;
        let env = &mut *guard;
        let revenue = jni_call(env, "new Revenue", |env| {
            env.new_object(REVENUE_CLASS, "()V", &[])
        })?;

        let j_product = jni_call(env, "new_string(productId)", |env| {
            env.new_string(&record.product_id)
        })?;
        jni_call(env, "Revenue.setProductId", |env| {
            env.call_method(
                &revenue,
                "setProductId",
                "(Ljava/lang/String;)V",
                &[JValue::Object(&j_product)],
            )
        })?;
        jni_call(env, "Revenue.setQuantity", |env| {
            env.call_method(&revenue, "setQuantity", "(I)V", &[JValue::Int(record.quantity)])
        })?;

        // `price` is a nullable Kotlin Double, so it takes a boxed value.
        let j_price = jni_call(env, "Double.valueOf", |env| {
            env.call_static_method(
                "java/lang/Double",
                "valueOf",
                "(D)Ljava/lang/Double;",
                &[JValue::Double(record.price)],
            )?
            .l()
        })?;
        jni_call(env, "Revenue.setPrice", |env| {
            env.call_method(
                &revenue,
                "setPrice",
                "(Ljava/lang/Double;)V",
                &[JValue::Object(&j_price)],
            )
        })?;

        if let Some(revenue_type) = &record.revenue_type {
            let j_type = jni_call(env, "new_string(revenueType)", |env| {
                env.new_string(revenue_type)
            })?;
            jni_call(env, "Revenue.setRevenueType", |env| {
                env.call_method(
                    &revenue,
                    "setRevenueType",
                    "(Ljava/lang/String;)V",
                    &[JValue::Object(&j_type)],
                )
            })?;
        }

        jni_call(env, "Amplitude.revenue", |env| {
            env.call_method(
                &self.amplitude,
                "revenue",
                "(Lcom/amplitude/core/events/Revenue;)Lcom/amplitude/core/Amplitude;",
                &[JValue::Object(&revenue)],
            )
        })?;
        Ok(())
    }

    fn reset(&self) -> Result<()> {
        let mut guard = attach(&self.vm)?;
        let env = &mut *guard;
        jni_call(env, "Amplitude.reset", |env| {
            env.call_method(&self.amplitude, "reset", SIG_NOARG_FLUENT, &[])
        })?;
        Ok(())
    }

    fn set_device_id(&self, device_id: &str) -> Result<()> {
        self.call_string_setter("setDeviceId", Some(device_id))
    }

    fn device_id(&self) -> Result<Option<String>> {
        let mut guard = attach(&self.vm)?;
        let env = &mut *guard;
        let obj = jni_call(env, "Amplitude.getDeviceId", |env| {
            env.call_method(&self.amplitude, "getDeviceId", "()Ljava/lang/String;", &[])?
                .l()
        })?;
        if obj.is_null() {
            return Ok(None);
        }
        let j_string = JString::from(obj);
        let device_id = jni_call(env, "get_string(deviceId)", |env| {
            env.get_string(&j_string).map(String::from)
        })?;
        Ok(Some(device_id))
    }

    fn session_id(&self) -> Result<i64> {
        let mut guard = attach(&self.vm)?;
        let env = &mut *guard;
        jni_call(env, "Amplitude.getSessionId", |env| {
            env.call_method(&self.amplitude, "getSessionId", "()J", &[])?
                .j()
        })
    }

    fn flush(&self) -> Result<()> {
        let mut guard = attach(&self.vm)?;
        let env = &mut *guard;
        jni_call(env, "Amplitude.flush", |env| {
            env.call_method(&self.amplitude, "flush", "()V", &[])
        })?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Factory
// ---------------------------------------------------------------------------

/// Builds `AndroidClient`s against the application context.
///
/// Zero-sized; the first JNI call happens in `create`.
pub struct AndroidClientFactory;

impl AndroidClientFactory {
    pub fn new() -> Self {
        Self
    }
}

impl Default for AndroidClientFactory {
    fn default() -> Self {
        Self::new()
    }
}

impl ClientFactory for AndroidClientFactory {
    fn platform_name(&self) -> &str {
        "Android"
    }

    fn create(&self, config: &ClientConfig) -> Result<Arc<dyn AnalyticsClient>> {
        let vm = java_vm()?;
        let amplitude = {
            let mut guard = attach(&vm)?;
            let env = &mut *guard;
            require_sdk(env)?;
            let context = application_context(env)?;

            let j_key = jni_call(env, "new_string(apiKey)", |env| {
                env.new_string(&config.api_key)
            })?;
            let configuration = jni_call(env, "new Configuration", |env| {
                env.new_object(
                    CONFIGURATION_CLASS,
                    "(Ljava/lang/String;Landroid/content/Context;)V",
                    &[JValue::Object(&j_key), JValue::Object(&context)],
                )
            })?;
            apply_configuration(env, &configuration, config)?;

            let amplitude = jni_call(env, "new Amplitude", |env| {
                env.new_object(
                    AMPLITUDE_CLASS,
                    "(Lcom/amplitude/android/Configuration;)V",
                    &[JValue::Object(&configuration)],
                )
            })?;
            jni_call(env, "new_global_ref(Amplitude)", |env| {
                env.new_global_ref(&amplitude)
            })?
        };

        info!("Android: Amplitude client constructed");
        Ok(Arc::new(AndroidClient { vm, amplitude }))
    }
}

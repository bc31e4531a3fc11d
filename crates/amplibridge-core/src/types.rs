// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Core domain types for the Amplitude bridge.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Correlation id attached to every dispatched action (logs only).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CallId(pub Uuid);

impl CallId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for CallId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for CallId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Every action name the host runtime may invoke.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Action {
    #[serde(rename = "initialize")]
    Initialize,
    #[serde(rename = "track")]
    Track,
    #[serde(rename = "identify")]
    Identify,
    #[serde(rename = "setUserId")]
    SetUserId,
    #[serde(rename = "setUserProperties")]
    SetUserProperties,
    #[serde(rename = "logRevenue")]
    LogRevenue,
    #[serde(rename = "reset")]
    Reset,
    #[serde(rename = "setDeviceId")]
    SetDeviceId,
    #[serde(rename = "getDeviceId")]
    GetDeviceId,
    #[serde(rename = "getSessionId")]
    GetSessionId,
    #[serde(rename = "flush")]
    Flush,
}

impl Action {
    /// All recognised actions, in host API order.
    pub const ALL: [Action; 11] = [
        Action::Initialize,
        Action::Track,
        Action::Identify,
        Action::SetUserId,
        Action::SetUserProperties,
        Action::LogRevenue,
        Action::Reset,
        Action::SetDeviceId,
        Action::GetDeviceId,
        Action::GetSessionId,
        Action::Flush,
    ];

    /// Resolve a host action name. Matching is exact and case-sensitive.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|action| action.as_str() == name)
    }

    /// The wire name the host uses for this action.
    pub fn as_str(self) -> &'static str {
        match self {
            Action::Initialize => "initialize",
            Action::Track => "track",
            Action::Identify => "identify",
            Action::SetUserId => "setUserId",
            Action::SetUserProperties => "setUserProperties",
            Action::LogRevenue => "logRevenue",
            Action::Reset => "reset",
            Action::SetDeviceId => "setDeviceId",
            Action::GetDeviceId => "getDeviceId",
            Action::GetSessionId => "getSessionId",
            Action::Flush => "flush",
        }
    }
}

/// Text form of a JSON scalar where the host expects a string. Numbers and
/// booleans are accepted the way Java's `JSONObject.getString` accepts them.
pub fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single user-property value, narrowed to the setter the vendor SDK
/// exposes for it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TraitValue {
    String(String),
    Int(i32),
    Long(i64),
    Double(f64),
    Bool(bool),
    /// Any other value, already rendered to text. Submitted through the
    /// string setter.
    Coerced(String),
}

impl TraitValue {
    /// Name of the typed setter this value routes to (used in logs).
    pub fn setter(&self) -> &'static str {
        match self {
            TraitValue::String(_) | TraitValue::Coerced(_) => "string",
            TraitValue::Int(_) => "int",
            TraitValue::Long(_) => "long",
            TraitValue::Double(_) => "double",
            TraitValue::Bool(_) => "bool",
        }
    }
}

/// Ordered user properties submitted as one identify operation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TraitSet {
    entries: Vec<(String, TraitValue)>,
}

impl TraitSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set `key` to `value`. A repeated key overwrites the earlier value in
    /// place so the set never carries two operations for one property.
    pub fn set(&mut self, key: impl Into<String>, value: TraitValue) -> &mut Self {
        let key = key.into();
        match self.entries.iter_mut().find(|(existing, _)| *existing == key) {
            Some((_, slot)) => *slot = value,
            None => self.entries.push((key, value)),
        }
        self
    }

    pub fn get(&self, key: &str) -> Option<&TraitValue> {
        self.entries
            .iter()
            .find(|(existing, _)| existing == key)
            .map(|(_, value)| value)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &TraitValue)> {
        self.entries.iter().map(|(key, value)| (key.as_str(), value))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// A single monetised event.
///
/// Event-level custom properties are deliberately absent: the native SDKs
/// this bridge targets do not accept them on revenue objects.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RevenueRecord {
    pub product_id: String,
    pub quantity: i32,
    pub price: f64,
    pub revenue_type: Option<String>,
}

impl RevenueRecord {
    pub fn new(product_id: impl Into<String>, quantity: i32, price: f64) -> Self {
        Self {
            product_id: product_id.into(),
            quantity,
            price,
            revenue_type: None,
        }
    }

    /// Attach a revenue type. Empty strings are treated as absent.
    pub fn with_revenue_type(mut self, revenue_type: Option<String>) -> Self {
        self.revenue_type = revenue_type.filter(|t| !t.is_empty());
        self
    }
}

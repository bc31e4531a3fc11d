// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// JSON to user-property marshaling.

use amplibridge_core::types::{TraitSet, TraitValue};
use serde_json::{Map, Value};
use tracing::trace;

/// Route a JSON value to the narrowest typed setter.
///
/// Integers pick `Int` when they fit 32 bits and `Long` when they fit 64.
/// Floats are `Double`. Everything else (null, arrays, objects, integers
/// beyond `i64`) is rendered to its JSON text.
pub fn trait_value(value: &Value) -> TraitValue {
    match value {
        Value::String(s) => TraitValue::String(s.clone()),
        Value::Bool(b) => TraitValue::Bool(*b),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                match i32::try_from(i) {
                    Ok(small) => TraitValue::Int(small),
                    Err(_) => TraitValue::Long(i),
                }
            } else if n.is_f64() {
                TraitValue::Double(n.as_f64().unwrap_or(f64::NAN))
            } else {
                TraitValue::Coerced(n.to_string())
            }
        }
        Value::Null | Value::Array(_) | Value::Object(_) => TraitValue::Coerced(value.to_string()),
    }
}

/// Build one identify operation from a properties object, in the object's
/// iteration order.
pub fn trait_set(object: &Map<String, Value>) -> TraitSet {
    let mut traits = TraitSet::new();
    for (key, value) in object {
        let typed = trait_value(value);
        trace!(key = %key, setter = typed.setter(), "user property");
        traits.set(key.as_str(), typed);
    }
    traits
}

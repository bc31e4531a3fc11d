// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Positional argument extraction.
//
// The host sends a JSON array whose element types are only loosely
// controlled by the page. Each accessor narrows one position to the type a
// handler needs and reports the position on failure.

use amplibridge_core::error::{BridgeError, Result};
use amplibridge_core::types::scalar_text;
use serde_json::{Map, Value};

/// Borrowed view over one request's argument list.
#[derive(Debug, Clone, Copy)]
pub struct Args<'a> {
    values: &'a [Value],
}

impl<'a> Args<'a> {
    pub fn new(values: &'a [Value]) -> Self {
        Self { values }
    }

    /// The value at `index`, with JSON `null` treated as missing.
    fn present(&self, index: usize) -> Option<&'a Value> {
        self.values.get(index).filter(|value| !value.is_null())
    }

    /// Required string. Numbers and booleans are accepted in textual form.
    pub fn string(&self, index: usize) -> Result<String> {
        match self.present(index) {
            Some(value) => scalar_text(value)
                .ok_or_else(|| BridgeError::invalid_argument(index, "expected a string")),
            None => Err(BridgeError::invalid_argument(index, "missing string")),
        }
    }

    /// Optional string: missing or `null` is `None`.
    pub fn opt_string(&self, index: usize) -> Result<Option<String>> {
        match self.present(index) {
            Some(_) => self.string(index).map(Some),
            None => Ok(None),
        }
    }

    pub fn object(&self, index: usize) -> Result<&'a Map<String, Value>> {
        match self.present(index) {
            Some(Value::Object(map)) => Ok(map),
            Some(_) => Err(BridgeError::invalid_argument(index, "expected an object")),
            None => Err(BridgeError::invalid_argument(index, "missing object")),
        }
    }

    /// Optional object: anything that is not a JSON object is `None`.
    pub fn opt_object(&self, index: usize) -> Option<&'a Map<String, Value>> {
        self.present(index).and_then(Value::as_object)
    }

    /// 32-bit integer. Fractions truncate toward zero; numeric strings parse.
    pub fn int(&self, index: usize) -> Result<i32> {
        let value = self
            .present(index)
            .ok_or_else(|| BridgeError::invalid_argument(index, "missing integer"))?;

        let wide = match value {
            Value::Number(n) => match n.as_i64() {
                Some(i) => Some(i as f64),
                None => n.as_f64(),
            },
            Value::String(s) => s.trim().parse::<f64>().ok(),
            _ => None,
        }
        .filter(|f| f.is_finite())
        .ok_or_else(|| BridgeError::invalid_argument(index, "expected an integer"))?;

        let truncated = wide.trunc();
        if truncated < f64::from(i32::MIN) || truncated > f64::from(i32::MAX) {
            return Err(BridgeError::invalid_argument(
                index,
                format!("integer out of range: {value}"),
            ));
        }
        Ok(truncated as i32)
    }

    pub fn double(&self, index: usize) -> Result<f64> {
        match self.present(index) {
            Some(Value::Number(n)) => n
                .as_f64()
                .ok_or_else(|| BridgeError::invalid_argument(index, "expected a number")),
            Some(Value::String(s)) => s
                .trim()
                .parse::<f64>()
                .map_err(|_| BridgeError::invalid_argument(index, "expected a number")),
            Some(_) => Err(BridgeError::invalid_argument(index, "expected a number")),
            None => Err(BridgeError::invalid_argument(index, "missing number")),
        }
    }
}

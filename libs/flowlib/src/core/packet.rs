// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! Information packets and the semantic type categories ports advertise.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A single unit of data in transit on a connection, or delivered as an
/// initial packet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Packet {
    pub value: Value,
}

impl Packet {
    pub fn new(value: impl Into<Value>) -> Self {
        Self {
            value: value.into(),
        }
    }

    /// Semantic category of the payload.
    pub fn port_type(&self) -> PortType {
        PortType::of(&self.value)
    }
}

impl std::fmt::Display for Packet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Packet({})", self.value)
    }
}

/// Closed enumeration of semantic port types.
///
/// Types are advisory metadata for tooling; nothing in the scheduler
/// enforces them at connect time or delivery time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PortType {
    String,
    Boolean,
    Integer,
    Number,
    Object,
    Array,
    #[default]
    Any,
}

impl PortType {
    /// Map a JSON value onto its semantic category. Pure function, no
    /// side effects.
    pub fn of(value: &Value) -> Self {
        match value {
            Value::String(_) => PortType::String,
            Value::Bool(_) => PortType::Boolean,
            Value::Number(n) if n.is_i64() || n.is_u64() => PortType::Integer,
            Value::Number(_) => PortType::Number,
            Value::Object(_) => PortType::Object,
            Value::Array(_) => PortType::Array,
            Value::Null => PortType::Any,
        }
    }

    /// Advisory compatibility check.
    pub fn accepts(&self, value: &Value) -> bool {
        match self {
            PortType::Any => true,
            // Integers are numbers too
            PortType::Number => matches!(PortType::of(value), PortType::Integer | PortType::Number),
            other => PortType::of(value) == *other,
        }
    }
}

impl std::fmt::Display for PortType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            PortType::String => "string",
            PortType::Boolean => "boolean",
            PortType::Integer => "integer",
            PortType::Number => "number",
            PortType::Object => "object",
            PortType::Array => "array",
            PortType::Any => "any",
        };
        write!(f, "{}", name)
    }
}

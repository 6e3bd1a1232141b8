// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! Component and port descriptor types for introspection.
//!
//! Descriptors are display metadata for the remote-control layer; the
//! scheduler never consumes them.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::packet::PortType;
use super::ports::Port;

/// Describes an input or output port.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PortDescriptor {
    pub id: String,
    #[serde(rename = "type")]
    pub port_type: PortType,
    pub description: String,
    /// Whether this is an array (addressable) port.
    pub addressable: bool,
    pub required: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
}

impl PortDescriptor {
    pub fn from_port(port: &Port) -> Self {
        Self {
            id: port.name().to_string(),
            port_type: port.protocol_type(),
            description: port.description().to_string(),
            addressable: port.is_array(),
            required: port.is_required(),
            default: port.default().cloned(),
        }
    }
}

/// Describes a registered component type with its port metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentDescriptor {
    pub name: String,
    pub description: String,
    pub in_ports: Vec<PortDescriptor>,
    pub out_ports: Vec<PortDescriptor>,
}

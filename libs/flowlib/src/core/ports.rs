// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! Port metadata for component inputs/outputs.
//!
//! Ports here are pure declarations: name, direction, array/optional
//! flags, advisory types, and an input default. Attachment state
//! (connections, IIPs) lives on the [`Graph`](crate::core::graph::Graph)
//! and is mutated only through graph operations.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::error::{FlowError, Result};
use super::packet::PortType;

/// Direction of a port on its owning component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PortDirection {
    /// Input port (receives packets)
    Input,
    /// Output port (sends packets)
    Output,
}

/// A named, typed attachment point on a component.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Port {
    name: String,
    direction: PortDirection,
    array: bool,
    optional: bool,
    /// Advisory semantic types. Empty means "any"; more than one is
    /// permitted but loses typed-protocol fidelity.
    allowed_types: Vec<PortType>,
    description: String,
    /// Default value, inputs only. Used when an optional input has no
    /// packet available at invocation time.
    default: Option<Value>,
}

impl Port {
    /// Declare an input port.
    pub fn input(name: impl Into<String>) -> Self {
        Self::new(name, PortDirection::Input)
    }

    /// Declare an output port.
    pub fn output(name: impl Into<String>) -> Self {
        Self::new(name, PortDirection::Output)
    }

    fn new(name: impl Into<String>, direction: PortDirection) -> Self {
        Self {
            name: name.into(),
            direction,
            array: false,
            optional: false,
            allowed_types: Vec::new(),
            description: String::new(),
            default: None,
        }
    }

    /// Mark this port as an array (addressable, multi-connection) port.
    pub fn array(mut self) -> Self {
        self.array = true;
        self
    }

    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    pub fn with_type(mut self, port_type: PortType) -> Self {
        self.allowed_types.push(port_type);
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Set the default value. Meaningful on input ports only.
    pub fn with_default(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn direction(&self) -> PortDirection {
        self.direction
    }

    pub fn is_array(&self) -> bool {
        self.array
    }

    pub fn is_optional(&self) -> bool {
        self.optional
    }

    pub fn is_required(&self) -> bool {
        !self.optional
    }

    pub fn allowed_types(&self) -> &[PortType] {
        &self.allowed_types
    }

    /// Single advisory type for protocol display. `Any` when zero or
    /// more than one type is declared.
    pub fn protocol_type(&self) -> PortType {
        match self.allowed_types.as_slice() {
            [single] => *single,
            _ => PortType::Any,
        }
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn default(&self) -> Option<&Value> {
        self.default.as_ref()
    }
}

impl std::fmt::Display for Port {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}{}{}",
            self.name,
            if self.array { "[]" } else { "" },
            if self.optional { "*" } else { "" }
        )
    }
}

/// Order-preserving, name-unique collection of ports for one direction
/// of a component.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Ports {
    ports: Vec<Port>,
}

impl Ports {
    pub fn new() -> Self {
        Self { ports: Vec::new() }
    }

    pub fn add(&mut self, port: Port) -> Result<()> {
        if self.contains(port.name()) {
            return Err(FlowError::Port(format!(
                "port '{}' already exists",
                port.name()
            )));
        }
        self.ports.push(port);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&Port> {
        self.ports.iter().find(|p| p.name() == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Port> {
        self.ports.iter()
    }

    pub fn names(&self) -> Vec<String> {
        self.ports.iter().map(|p| p.name().to_string()).collect()
    }

    pub fn len(&self) -> usize {
        self.ports.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ports.is_empty()
    }
}

impl<'a> IntoIterator for &'a Ports {
    type Item = &'a Port;
    type IntoIter = std::slice::Iter<'a, Port>;

    fn into_iter(self) -> Self::IntoIter {
        self.ports.iter()
    }
}

/// Address of one port (or one slot of an array port) on a named node.
///
/// This is the `{node, port[, index]}` addressing the remote-control
/// layer speaks.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PortRef {
    pub node: String,
    pub port: String,
    /// Slot index for array ports. `None` addresses a non-array port,
    /// or every slot of an array port in disconnect queries.
    pub index: Option<usize>,
}

impl PortRef {
    pub fn new(node: impl Into<String>, port: impl Into<String>) -> Self {
        Self {
            node: node.into(),
            port: port.into(),
            index: None,
        }
    }

    pub fn indexed(node: impl Into<String>, port: impl Into<String>, index: usize) -> Self {
        Self {
            node: node.into(),
            port: port.into(),
            index: Some(index),
        }
    }

    /// Same node and port, ignoring the slot index.
    pub fn same_port(&self, other: &PortRef) -> bool {
        self.node == other.node && self.port == other.port
    }

    /// Whether this reference addresses `other`: equal slot, or either
    /// side addressing the whole port.
    pub fn addresses(&self, other: &PortRef) -> bool {
        self.same_port(other)
            && match (self.index, other.index) {
                (Some(a), Some(b)) => a == b,
                _ => true,
            }
    }
}

impl std::fmt::Display for PortRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.index {
            Some(i) => write!(f, "{}.{}[{}]", self.node, self.port, i),
            None => write!(f, "{}.{}", self.node, self.port),
        }
    }
}

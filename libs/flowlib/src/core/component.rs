// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! Component abstraction: named ports around a processing behavior.

use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use super::descriptors::{ComponentDescriptor, PortDescriptor};
use super::error::Result;
use super::packet::Packet;
use super::ports::{Port, Ports};

/// What a component wants after one invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Stay schedulable; run again when inputs/capacity allow.
    Continue,
    /// Done producing; never rescheduled by this executor.
    Finished,
}

/// Processing behavior invoked by the executor whenever the component
/// is runnable. One call consumes the inputs staged in the context and
/// may stage output packets.
pub trait Process: Send + 'static {
    fn process(&mut self, ctx: &mut ProcessContext) -> Result<Outcome>;
}

impl<F> Process for F
where
    F: FnMut(&mut ProcessContext) -> Result<Outcome> + Send + 'static,
{
    fn process(&mut self, ctx: &mut ProcessContext) -> Result<Outcome> {
        self(ctx)
    }
}

type SlotKey = (String, Option<usize>);

/// Per-invocation view handed to [`Process::process`].
///
/// Inputs were already dequeued by the scheduler; outputs staged here
/// are routed onto downstream connections after the invocation returns.
#[derive(Debug, Default)]
pub struct ProcessContext {
    inputs: HashMap<SlotKey, Packet>,
    outputs: Vec<(SlotKey, Packet)>,
}

impl ProcessContext {
    pub(crate) fn new(inputs: HashMap<SlotKey, Packet>) -> Self {
        Self {
            inputs,
            outputs: Vec::new(),
        }
    }

    /// Packet consumed from a non-array input port, if one was available.
    pub fn input(&self, port: &str) -> Option<&Packet> {
        self.inputs.get(&(port.to_string(), None))
    }

    /// Take ownership of a non-array input packet.
    pub fn take(&mut self, port: &str) -> Option<Packet> {
        self.inputs.remove(&(port.to_string(), None))
    }

    /// Convenience accessor for the payload of a non-array input.
    pub fn value(&self, port: &str) -> Option<&Value> {
        self.input(port).map(|p| &p.value)
    }

    /// Packet consumed from one slot of an array input port.
    pub fn slot(&self, port: &str, index: usize) -> Option<&Packet> {
        self.inputs.get(&(port.to_string(), Some(index)))
    }

    /// All consumed slots of an array input port, ordered by index.
    pub fn slots(&self, port: &str) -> Vec<(usize, &Packet)> {
        let mut slots: Vec<(usize, &Packet)> = self
            .inputs
            .iter()
            .filter(|((name, index), _)| name == port && index.is_some())
            .map(|((_, index), packet)| (index.unwrap_or(0), packet))
            .collect();
        slots.sort_by_key(|(index, _)| *index);
        slots
    }

    /// Stage a packet on an output port. On an array port this lands
    /// on slot 0; use [`send_indexed`](Self::send_indexed) for other
    /// slots.
    pub fn send(&mut self, port: &str, packet: Packet) {
        self.outputs.push(((port.to_string(), None), packet));
    }

    /// Stage a value on an output port, as [`send`](Self::send).
    pub fn send_value(&mut self, port: &str, value: impl Into<Value>) {
        self.send(port, Packet::new(value));
    }

    /// Stage a packet on one slot of an array output port.
    pub fn send_indexed(&mut self, port: &str, index: usize, packet: Packet) {
        self.outputs.push(((port.to_string(), Some(index)), packet));
    }

    pub(crate) fn drain_outputs(&mut self) -> Vec<(SlotKey, Packet)> {
        std::mem::take(&mut self.outputs)
    }
}

/// Identity of one component instance. Two components added under the
/// same graph name at different times are distinct instances.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ComponentId(u64);

impl ComponentId {
    pub fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

impl Default for ComponentId {
    fn default() -> Self {
        Self::new()
    }
}

/// A named processing unit: ordered input/output port declarations plus
/// the behavior the executor invokes.
pub struct Component {
    id: ComponentId,
    name: String,
    type_name: String,
    description: String,
    inputs: Ports,
    outputs: Ports,
    behavior: Box<dyn Process>,
}

impl Component {
    pub fn new(name: impl Into<String>, behavior: impl Process) -> Self {
        Self {
            id: ComponentId::new(),
            name: name.into(),
            type_name: String::new(),
            description: String::new(),
            inputs: Ports::new(),
            outputs: Ports::new(),
            behavior: Box::new(behavior),
        }
    }

    /// Registered component type this instance was created from.
    pub fn with_type_name(mut self, type_name: impl Into<String>) -> Self {
        self.type_name = type_name.into();
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Declare an input port. Fails on a duplicate port name.
    pub fn with_input(mut self, port: Port) -> Result<Self> {
        self.inputs.add(port)?;
        Ok(self)
    }

    /// Declare an output port. Fails on a duplicate port name.
    pub fn with_output(mut self, port: Port) -> Result<Self> {
        self.outputs.add(port)?;
        Ok(self)
    }

    pub fn instance_id(&self) -> ComponentId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn inputs(&self) -> &Ports {
        &self.inputs
    }

    pub fn outputs(&self) -> &Ports {
        &self.outputs
    }

    pub(crate) fn invoke(&mut self, ctx: &mut ProcessContext) -> Result<Outcome> {
        self.behavior.process(ctx)
    }

    /// Introspection payload for the remote-control layer.
    pub fn descriptor(&self) -> ComponentDescriptor {
        ComponentDescriptor {
            name: if self.type_name.is_empty() {
                self.name.clone()
            } else {
                self.type_name.clone()
            },
            description: self.description.clone(),
            in_ports: self.inputs.iter().map(PortDescriptor::from_port).collect(),
            out_ports: self.outputs.iter().map(PortDescriptor::from_port).collect(),
        }
    }
}

impl std::fmt::Debug for Component {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Component")
            .field("name", &self.name)
            .field("type_name", &self.type_name)
            .field("inputs", &self.inputs.names())
            .field("outputs", &self.outputs.names())
            .finish()
    }
}

// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! Mutable network topology: components plus the connections and IIPs
//! between their ports.
//!
//! Every mutation is one acquisition of the graph mutex, so a running
//! executor never observes a half-mutated connection set. Mutations
//! notify the registered change listener (the executor's wakeup
//! channel) so a quiesced scheduler picks up new topology immediately.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use crossbeam_channel::Sender;
use parking_lot::{Mutex, MutexGuard};
use serde_json::Value;

use super::component::Component;
use super::error::{FlowError, Result};
use super::ports::{Port, PortRef};

/// Default bounded capacity for a connection's packet queue.
pub const DEFAULT_CONNECTION_CAPACITY: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(u64);

impl ConnectionId {
    pub fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct IipId(u64);

impl IipId {
    pub fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

impl Default for IipId {
    fn default() -> Self {
        Self::new()
    }
}

/// A directed edge from one output port to one input port (or slot),
/// carrying a bounded packet queue at execution time.
#[derive(Debug, Clone)]
pub struct Connection {
    pub id: ConnectionId,
    pub source: PortRef,
    pub target: PortRef,
    pub capacity: usize,
}

/// A constant value bound to an input port instead of a live
/// connection. A fresh [`IipId`] per set means an IIP re-set while the
/// network runs is redelivered exactly once.
#[derive(Debug, Clone)]
pub struct Iip {
    pub id: IipId,
    pub target: PortRef,
    pub value: Value,
}

/// Event sent to the executor's wakeup channel on every mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GraphEvent {
    TopologyChanged,
}

pub(crate) struct GraphInner {
    components: Vec<Component>,
    index: HashMap<String, usize>,
    connections: Vec<Connection>,
    iips: Vec<Iip>,
    listener: Option<Sender<GraphEvent>>,
    revision: u64,
}

/// What occupies one input slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum AttachmentKind {
    Connection(ConnectionId),
    Iip(IipId),
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct InputAttachment {
    pub index: Option<usize>,
    pub kind: AttachmentKind,
}

impl GraphInner {
    pub(crate) fn revision(&self) -> u64 {
        self.revision
    }

    pub(crate) fn component(&self, name: &str) -> Option<&Component> {
        self.index.get(name).map(|i| &self.components[*i])
    }

    pub(crate) fn component_mut(&mut self, name: &str) -> Option<&mut Component> {
        let i = *self.index.get(name)?;
        Some(&mut self.components[i])
    }

    pub(crate) fn components(&self) -> impl Iterator<Item = &Component> {
        self.components.iter()
    }

    pub(crate) fn connections(&self) -> &[Connection] {
        &self.connections
    }

    pub(crate) fn iips(&self) -> &[Iip] {
        &self.iips
    }

    /// Everything occupying slots of one input port.
    pub(crate) fn input_attachments(&self, node: &str, port: &str) -> Vec<InputAttachment> {
        let at = PortRef::new(node, port);
        let mut attachments: Vec<InputAttachment> = self
            .connections
            .iter()
            .filter(|c| at.same_port(&c.target))
            .map(|c| InputAttachment {
                index: c.target.index,
                kind: AttachmentKind::Connection(c.id),
            })
            .collect();
        attachments.extend(
            self.iips
                .iter()
                .filter(|iip| at.same_port(&iip.target))
                .map(|iip| InputAttachment {
                    index: iip.target.index,
                    kind: AttachmentKind::Iip(iip.id),
                }),
        );
        attachments
    }

    /// Connections leaving one output port.
    pub(crate) fn output_connections(&self, node: &str, port: &str) -> Vec<&Connection> {
        let at = PortRef::new(node, port);
        self.connections
            .iter()
            .filter(|c| at.same_port(&c.source))
            .collect()
    }

    /// A component with no inputs, or only unattached optional inputs,
    /// starts itself: it is runnable without any upstream packet.
    pub(crate) fn is_self_starter(&self, component: &Component) -> bool {
        component.inputs().iter().all(|port| {
            port.is_optional() && self.input_attachments(component.name(), port.name()).is_empty()
        })
    }

    fn touch(&mut self) {
        self.revision = self.revision.wrapping_add(1);
        if let Some(listener) = &self.listener {
            // A dropped executor leaves a dead channel; ignore it.
            let _ = listener.send(GraphEvent::TopologyChanged);
        }
    }

    fn resolve_output(&self, source: &PortRef) -> Result<(PortRef, &Port)> {
        let component = self
            .component(&source.node)
            .ok_or_else(|| FlowError::NotFound(format!("component '{}'", source.node)))?;
        let port = component.outputs().get(&source.port).ok_or_else(|| {
            FlowError::NotFound(format!("output port '{}.{}'", source.node, source.port))
        })?;

        let index = self.resolve_slot(source, port, true)?;
        Ok((
            PortRef {
                node: source.node.clone(),
                port: source.port.clone(),
                index,
            },
            port,
        ))
    }

    fn resolve_input(&self, target: &PortRef) -> Result<(PortRef, &Port)> {
        let component = self
            .component(&target.node)
            .ok_or_else(|| FlowError::NotFound(format!("component '{}'", target.node)))?;
        let port = component.inputs().get(&target.port).ok_or_else(|| {
            FlowError::NotFound(format!("input port '{}.{}'", target.node, target.port))
        })?;

        let index = self.resolve_slot(target, port, false)?;
        Ok((
            PortRef {
                node: target.node.clone(),
                port: target.port.clone(),
                index,
            },
            port,
        ))
    }

    /// Resolve the slot a new attachment lands on, enforcing the
    /// one-attachment-per-slot invariant.
    fn resolve_slot(&self, at: &PortRef, port: &Port, output: bool) -> Result<Option<usize>> {
        let occupied = |index: Option<usize>| -> bool {
            let slot = PortRef {
                node: at.node.clone(),
                port: at.port.clone(),
                index,
            };
            if output {
                self.connections.iter().any(|c| c.source == slot)
            } else {
                self.connections.iter().any(|c| c.target == slot)
                    || self.iips.iter().any(|iip| iip.target == slot)
            }
        };

        if !port.is_array() {
            if at.index.is_some() {
                return Err(FlowError::Port(format!("{} is not an array port", at)));
            }
            if occupied(None) {
                return Err(FlowError::Conflict(format!("{} is already attached", at)));
            }
            return Ok(None);
        }

        match at.index {
            Some(index) => {
                if occupied(Some(index)) {
                    return Err(FlowError::Conflict(format!(
                        "{}[{}] is already attached",
                        PortRef::new(&at.node, &at.port),
                        index
                    )));
                }
                Ok(Some(index))
            }
            None => {
                // First free slot
                let mut index = 0;
                while occupied(Some(index)) {
                    index += 1;
                }
                Ok(Some(index))
            }
        }
    }
}

/// The topology: a named set of components plus the connections and
/// IIPs between their ports. Mutable at any time, including while an
/// executor is running against it.
pub struct Graph {
    id: String,
    inner: Mutex<GraphInner>,
}

impl Graph {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            inner: Mutex::new(GraphInner {
                components: Vec::new(),
                index: HashMap::new(),
                connections: Vec::new(),
                iips: Vec::new(),
                listener: None,
                revision: 0,
            }),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub(crate) fn lock(&self) -> MutexGuard<'_, GraphInner> {
        self.inner.lock()
    }

    /// Install the executor wakeup channel. At most one executor may
    /// run against a graph; a second listener is refused until the
    /// first executor stops.
    pub(crate) fn set_change_listener(&self, listener: Sender<GraphEvent>) -> Result<()> {
        let mut inner = self.inner.lock();
        if inner.listener.is_some() {
            return Err(FlowError::InvalidState(format!(
                "graph '{}' already has a running executor",
                self.id
            )));
        }
        inner.listener = Some(listener);
        Ok(())
    }

    pub(crate) fn clear_change_listener(&self) {
        self.inner.lock().listener = None;
    }

    /// Add a component instance. Fails on a name collision.
    pub fn add_component(&self, component: Component) -> Result<()> {
        let mut inner = self.inner.lock();
        let name = component.name().to_string();
        if inner.index.contains_key(&name) {
            return Err(FlowError::DuplicateName(format!(
                "component '{}' already exists in graph '{}'",
                name, self.id
            )));
        }

        tracing::debug!("[{}] Adding component '{}'", self.id, name);
        let inner = &mut *inner;
        inner.index.insert(name, inner.components.len());
        inner.components.push(component);
        inner.touch();
        Ok(())
    }

    /// Remove a component and cascade removal of every connection and
    /// IIP that referenced one of its ports.
    pub fn remove_component(&self, name: &str) -> Result<()> {
        let mut inner = self.inner.lock();
        let position = *inner
            .index
            .get(name)
            .ok_or_else(|| FlowError::NotFound(format!("component '{}'", name)))?;

        tracing::debug!("[{}] Removing component '{}'", self.id, name);
        inner.components.remove(position);
        inner.index.remove(name);
        for slot in inner.index.values_mut() {
            if *slot > position {
                *slot -= 1;
            }
        }

        inner
            .connections
            .retain(|c| c.source.node != name && c.target.node != name);
        inner.iips.retain(|iip| iip.target.node != name);
        inner.touch();
        Ok(())
    }

    /// Connect an output port to an input port with the default queue
    /// capacity.
    pub fn connect(&self, source: PortRef, target: PortRef) -> Result<ConnectionId> {
        self.connect_with_capacity(source, target, DEFAULT_CONNECTION_CAPACITY)
    }

    /// Connect with an explicit bounded queue capacity.
    ///
    /// Array ports take an explicit slot index or the first free one.
    /// An occupied non-array port or slot is a conflict; type metadata
    /// is never checked here.
    pub fn connect_with_capacity(
        &self,
        source: PortRef,
        target: PortRef,
        capacity: usize,
    ) -> Result<ConnectionId> {
        if capacity == 0 {
            return Err(FlowError::Configuration(
                "connection capacity must be at least 1".to_string(),
            ));
        }

        let mut inner = self.inner.lock();
        let (source, _) = inner.resolve_output(&source)?;
        let (target, _) = inner.resolve_input(&target)?;

        let connection = Connection {
            id: ConnectionId::new(),
            source,
            target,
            capacity,
        };
        tracing::debug!(
            "[{}] Connected {} -> {}",
            self.id,
            connection.source,
            connection.target
        );
        let id = connection.id;
        inner.connections.push(connection);
        inner.touch();
        Ok(id)
    }

    /// Detach everything at a port reference: the addressed slot, or
    /// every slot when no index is given. In-flight packets buffered on
    /// a removed connection are discarded by the executor.
    pub fn disconnect(&self, port: &PortRef) -> Result<()> {
        let mut inner = self.inner.lock();
        let before = inner.connections.len() + inner.iips.len();

        inner
            .connections
            .retain(|c| !port.addresses(&c.source) && !port.addresses(&c.target));
        inner.iips.retain(|iip| !port.addresses(&iip.target));

        if inner.connections.len() + inner.iips.len() == before {
            return Err(FlowError::NotFound(format!("{} has no attachment", port)));
        }

        tracing::debug!("[{}] Disconnected {}", self.id, port);
        inner.touch();
        Ok(())
    }

    /// Bind a constant value to an input port. A live connection on the
    /// same slot is disconnected first; an existing IIP is replaced.
    pub fn set_initial_packet(&self, target: PortRef, value: Value) -> Result<()> {
        let mut inner = self.inner.lock();

        // Validate the port exists before mutating anything.
        let component = inner
            .component(&target.node)
            .ok_or_else(|| FlowError::NotFound(format!("component '{}'", target.node)))?;
        let port = component.inputs().get(&target.port).ok_or_else(|| {
            FlowError::NotFound(format!("input port '{}.{}'", target.node, target.port))
        })?;
        if !port.is_array() && target.index.is_some() {
            return Err(FlowError::Port(format!("{} is not an array port", target)));
        }
        let array = port.is_array();

        // Mutual exclusion: clear the slot, then resolve it as free.
        inner.connections.retain(|c| !target.addresses(&c.target));
        inner.iips.retain(|iip| !target.addresses(&iip.target));

        let index = if array {
            match target.index {
                Some(index) => Some(index),
                None => Some(0),
            }
        } else {
            None
        };

        let iip = Iip {
            id: IipId::new(),
            target: PortRef {
                node: target.node,
                port: target.port,
                index,
            },
            value,
        };
        tracing::debug!("[{}] Set IIP on {}", self.id, iip.target);
        inner.iips.push(iip);
        inner.touch();
        Ok(())
    }

    /// Remove the IIP(s) bound at a port reference.
    pub fn unset_initial_packet(&self, target: &PortRef) -> Result<()> {
        let mut inner = self.inner.lock();
        let before = inner.iips.len();
        inner.iips.retain(|iip| !target.addresses(&iip.target));
        if inner.iips.len() == before {
            return Err(FlowError::NotFound(format!("{} has no initial packet", target)));
        }

        tracing::debug!("[{}] Unset IIP on {}", self.id, target);
        inner.touch();
        Ok(())
    }

    /// Whether a live connection touches this port reference.
    pub fn is_connected(&self, port: &PortRef) -> bool {
        let inner = self.inner.lock();
        inner
            .connections
            .iter()
            .any(|c| port.addresses(&c.source) || port.addresses(&c.target))
    }

    /// Whether anything (connection or IIP) is attached at this port
    /// reference. Callers check this before `disconnect` to avoid
    /// spurious lookup errors.
    pub fn is_attached(&self, port: &PortRef) -> bool {
        let inner = self.inner.lock();
        inner
            .connections
            .iter()
            .any(|c| port.addresses(&c.source) || port.addresses(&c.target))
            || inner.iips.iter().any(|iip| port.addresses(&iip.target))
    }

    /// Component names in insertion order.
    pub fn component_names(&self) -> Vec<String> {
        self.inner
            .lock()
            .components
            .iter()
            .map(|c| c.name().to_string())
            .collect()
    }

    pub fn contains_component(&self, name: &str) -> bool {
        self.inner.lock().index.contains_key(name)
    }

    pub fn component_count(&self) -> usize {
        self.inner.lock().components.len()
    }

    /// Snapshot of the live connections.
    pub fn connections(&self) -> Vec<Connection> {
        self.inner.lock().connections.clone()
    }

    /// Snapshot of the live IIPs.
    pub fn iips(&self) -> Vec<Iip> {
        self.inner.lock().iips.clone()
    }

    /// Names of components that run without upstream packets: no
    /// inputs, or only disconnected optional inputs.
    pub fn self_starters(&self) -> Vec<String> {
        let inner = self.inner.lock();
        inner
            .components
            .iter()
            .filter(|c| inner.is_self_starter(c))
            .map(|c| c.name().to_string())
            .collect()
    }

    /// Distinct names of components feeding packets into `name`.
    pub fn upstream(&self, name: &str) -> Vec<String> {
        let inner = self.inner.lock();
        let mut seen = Vec::new();
        for connection in &inner.connections {
            if connection.target.node == name && !seen.contains(&connection.source.node) {
                seen.push(connection.source.node.clone());
            }
        }
        seen
    }

    /// Distinct names of components consuming packets from `name`.
    pub fn downstream(&self, name: &str) -> Vec<String> {
        let inner = self.inner.lock();
        let mut seen = Vec::new();
        for connection in &inner.connections {
            if connection.source.node == name && !seen.contains(&connection.target.node) {
                seen.push(connection.target.node.clone());
            }
        }
        seen
    }

    /// DOT export for debugging network configurations that are hard to
    /// visualize purely with code.
    pub fn to_graphviz(&self) -> String {
        let inner = self.inner.lock();
        let mut dot = String::from("digraph FlowGraph {\n");
        dot.push_str("  rankdir=LR;\n");
        dot.push_str("  node [shape=box];\n\n");

        for component in &inner.components {
            dot.push_str(&format!(
                "  \"{}\" [label=\"{}\\n({})\"];\n",
                component.name(),
                component.name(),
                component.type_name()
            ));
        }

        dot.push('\n');

        for connection in &inner.connections {
            dot.push_str(&format!(
                "  \"{}\" -> \"{}\" [label=\"{}→{}\"];\n",
                connection.source.node,
                connection.target.node,
                connection.source.port,
                connection.target.port
            ));
        }

        for (n, iip) in inner.iips.iter().enumerate() {
            dot.push_str(&format!(
                "  \"__iip_{}\" [shape=plaintext, label=\"{}\"];\n",
                n, iip.value
            ));
            dot.push_str(&format!(
                "  \"__iip_{}\" -> \"{}\" [label=\"{}\"];\n",
                n, iip.target.node, iip.target.port
            ));
        }

        dot.push_str("}\n");
        dot
    }
}

impl std::fmt::Debug for Graph {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.lock();
        f.debug_struct("Graph")
            .field("id", &self.id)
            .field("components", &inner.components.len())
            .field("connections", &inner.connections.len())
            .field("iips", &inner.iips.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::component::{Outcome, ProcessContext};
    use serde_json::json;

    fn noop() -> impl crate::core::component::Process {
        |_ctx: &mut ProcessContext| Ok(Outcome::Continue)
    }

    fn source(name: &str) -> Component {
        Component::new(name, noop())
            .with_output(Port::output("out"))
            .unwrap()
    }

    fn sink(name: &str) -> Component {
        Component::new(name, noop())
            .with_input(Port::input("in"))
            .unwrap()
    }

    fn array_sink(name: &str) -> Component {
        Component::new(name, noop())
            .with_input(Port::input("in").array())
            .unwrap()
    }

    #[test]
    fn test_add_duplicate_component() {
        let graph = Graph::new("g");
        graph.add_component(source("a")).unwrap();
        let err = graph.add_component(source("a")).unwrap_err();
        assert!(matches!(err, FlowError::DuplicateName(_)));
        assert_eq!(graph.component_count(), 1);
    }

    #[test]
    fn test_connect_and_conflict() {
        let graph = Graph::new("g");
        graph.add_component(source("a")).unwrap();
        graph.add_component(source("a2")).unwrap();
        graph.add_component(sink("b")).unwrap();

        graph
            .connect(PortRef::new("a", "out"), PortRef::new("b", "in"))
            .unwrap();

        // Occupied non-array target
        let err = graph
            .connect(PortRef::new("a2", "out"), PortRef::new("b", "in"))
            .unwrap_err();
        assert!(matches!(err, FlowError::Conflict(_)));

        // Occupied non-array source
        graph.add_component(sink("b2")).unwrap();
        let err = graph
            .connect(PortRef::new("a", "out"), PortRef::new("b2", "in"))
            .unwrap_err();
        assert!(matches!(err, FlowError::Conflict(_)));
    }

    #[test]
    fn test_connect_missing_endpoints() {
        let graph = Graph::new("g");
        graph.add_component(source("a")).unwrap();

        let err = graph
            .connect(PortRef::new("a", "out"), PortRef::new("ghost", "in"))
            .unwrap_err();
        assert!(matches!(err, FlowError::NotFound(_)));

        graph.add_component(sink("b")).unwrap();
        let err = graph
            .connect(PortRef::new("a", "nope"), PortRef::new("b", "in"))
            .unwrap_err();
        assert!(matches!(err, FlowError::NotFound(_)));
    }

    #[test]
    fn test_array_port_slot_allocation() {
        let graph = Graph::new("g");
        graph.add_component(source("a")).unwrap();
        graph.add_component(source("b")).unwrap();
        graph.add_component(array_sink("merge")).unwrap();

        // Auto-assigned slots fill from zero
        graph
            .connect(PortRef::new("a", "out"), PortRef::new("merge", "in"))
            .unwrap();
        graph
            .connect(PortRef::new("b", "out"), PortRef::new("merge", "in"))
            .unwrap();

        let connections = graph.connections();
        assert_eq!(connections[0].target.index, Some(0));
        assert_eq!(connections[1].target.index, Some(1));

        // Explicit occupied slot is a conflict
        graph.add_component(source("c")).unwrap();
        let err = graph
            .connect(PortRef::new("c", "out"), PortRef::indexed("merge", "in", 0))
            .unwrap_err();
        assert!(matches!(err, FlowError::Conflict(_)));
    }

    #[test]
    fn test_index_on_non_array_port_rejected() {
        let graph = Graph::new("g");
        graph.add_component(source("a")).unwrap();
        graph.add_component(sink("b")).unwrap();

        let err = graph
            .connect(PortRef::new("a", "out"), PortRef::indexed("b", "in", 0))
            .unwrap_err();
        assert!(matches!(err, FlowError::Port(_)));
    }

    #[test]
    fn test_iip_connection_mutual_exclusion() {
        let graph = Graph::new("g");
        graph.add_component(source("a")).unwrap();
        graph.add_component(sink("b")).unwrap();

        graph
            .connect(PortRef::new("a", "out"), PortRef::new("b", "in"))
            .unwrap();
        assert!(graph.is_connected(&PortRef::new("b", "in")));

        // Setting an IIP disconnects the live connection first
        graph
            .set_initial_packet(PortRef::new("b", "in"), json!("seed"))
            .unwrap();
        assert!(!graph.is_connected(&PortRef::new("b", "in")));
        assert_eq!(graph.iips().len(), 1);

        // Connecting over an IIP is a conflict
        let err = graph
            .connect(PortRef::new("a", "out"), PortRef::new("b", "in"))
            .unwrap_err();
        assert!(matches!(err, FlowError::Conflict(_)));

        // Re-setting replaces, never stacks
        graph
            .set_initial_packet(PortRef::new("b", "in"), json!("seed2"))
            .unwrap();
        let iips = graph.iips();
        assert_eq!(iips.len(), 1);
        assert_eq!(iips[0].value, json!("seed2"));

        graph.unset_initial_packet(&PortRef::new("b", "in")).unwrap();
        let err = graph
            .unset_initial_packet(&PortRef::new("b", "in"))
            .unwrap_err();
        assert!(matches!(err, FlowError::NotFound(_)));
    }

    #[test]
    fn test_remove_component_cascades() {
        let graph = Graph::new("g");
        graph.add_component(source("a")).unwrap();
        graph.add_component(sink("b")).unwrap();
        graph.add_component(array_sink("merge")).unwrap();

        graph
            .connect(PortRef::new("a", "out"), PortRef::new("b", "in"))
            .unwrap();
        graph
            .set_initial_packet(PortRef::indexed("merge", "in", 0), json!(1))
            .unwrap();

        graph.remove_component("b").unwrap();
        assert!(graph.connections().is_empty());
        assert!(!graph.contains_component("b"));

        graph.remove_component("merge").unwrap();
        assert!(graph.iips().is_empty());

        // Lookup on stable insertion order after removals
        assert_eq!(graph.component_names(), vec!["a"]);
        let err = graph.remove_component("b").unwrap_err();
        assert!(matches!(err, FlowError::NotFound(_)));
    }

    #[test]
    fn test_disconnect() {
        let graph = Graph::new("g");
        graph.add_component(source("a")).unwrap();
        graph.add_component(sink("b")).unwrap();

        let err = graph.disconnect(&PortRef::new("b", "in")).unwrap_err();
        assert!(matches!(err, FlowError::NotFound(_)));

        graph
            .connect(PortRef::new("a", "out"), PortRef::new("b", "in"))
            .unwrap();
        assert!(graph.is_attached(&PortRef::new("b", "in")));

        // Either endpoint detaches the edge
        graph.disconnect(&PortRef::new("a", "out")).unwrap();
        assert!(graph.connections().is_empty());
        assert!(!graph.is_attached(&PortRef::new("b", "in")));
    }

    #[test]
    fn test_self_starters() {
        let graph = Graph::new("g");
        graph.add_component(source("gen")).unwrap();
        graph.add_component(sink("strict")).unwrap();

        let lenient = Component::new("lenient", noop())
            .with_input(Port::input("cfg").optional())
            .unwrap()
            .with_output(Port::output("out"))
            .unwrap();
        graph.add_component(lenient).unwrap();

        assert_eq!(graph.self_starters(), vec!["gen", "lenient"]);

        // Attaching the optional input demotes the self-starter
        graph
            .connect(PortRef::new("gen", "out"), PortRef::new("lenient", "cfg"))
            .unwrap();
        assert_eq!(graph.self_starters(), vec!["gen"]);
    }

    #[test]
    fn test_upstream_downstream() {
        let graph = Graph::new("g");
        graph.add_component(source("a")).unwrap();
        graph.add_component(array_sink("m")).unwrap();
        graph.add_component(source("b")).unwrap();

        graph
            .connect(PortRef::new("a", "out"), PortRef::new("m", "in"))
            .unwrap();
        graph
            .connect(PortRef::new("b", "out"), PortRef::new("m", "in"))
            .unwrap();

        assert_eq!(graph.upstream("m"), vec!["a", "b"]);
        assert_eq!(graph.downstream("a"), vec!["m"]);
        assert!(graph.downstream("m").is_empty());
    }

    #[test]
    fn test_to_graphviz() {
        let graph = Graph::new("g");
        graph.add_component(source("a")).unwrap();
        graph.add_component(sink("b")).unwrap();
        graph
            .connect(PortRef::new("a", "out"), PortRef::new("b", "in"))
            .unwrap();

        let dot = graph.to_graphviz();
        assert!(dot.contains("digraph FlowGraph"));
        assert!(dot.contains("\"a\" -> \"b\""));
    }

    #[test]
    fn test_zero_capacity_rejected() {
        let graph = Graph::new("g");
        graph.add_component(source("a")).unwrap();
        graph.add_component(sink("b")).unwrap();

        let err = graph
            .connect_with_capacity(PortRef::new("a", "out"), PortRef::new("b", "in"), 0)
            .unwrap_err();
        assert!(matches!(err, FlowError::Configuration(_)));
    }
}

// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! Runtime facade: named graphs, a shared component registry, and one
//! executor per started graph.
//!
//! Graph-level operations (`add_node`, `add_edge`, `add_iip`, ...) are
//! thin wrappers over [`Graph`] that resolve the graph by id and, for
//! nodes, instantiate components through the registry. All of them
//! work on a running graph; the scheduler picks up the change on its
//! next pass.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;

use super::component::Component;
use super::descriptors::ComponentDescriptor;
use super::error::{FlowError, Result};
use super::executor::{GraphExecutor, NetworkStatus};
use super::graph::{ConnectionId, Graph};
use super::ports::PortRef;
use super::registry::{ComponentFactory, ComponentRegistry};

pub struct FlowRuntime {
    registry: ComponentRegistry,
    graphs: HashMap<String, Arc<Graph>>,
    executors: HashMap<String, GraphExecutor>,
}

impl FlowRuntime {
    pub fn new() -> Self {
        Self {
            registry: ComponentRegistry::new(),
            graphs: HashMap::new(),
            executors: HashMap::new(),
        }
    }

    // ---- registry ----

    pub fn register_component_type(
        &mut self,
        type_name: impl Into<String>,
        factory: ComponentFactory,
    ) -> Result<()> {
        self.registry.register(type_name, factory)
    }

    pub fn unregister_component_type(&mut self, type_name: &str) -> bool {
        self.registry.unregister(type_name)
    }

    /// Descriptors for every registered component type, in
    /// registration order.
    pub fn component_specs(&self) -> Vec<ComponentDescriptor> {
        self.registry.list()
    }

    // ---- graph management ----

    pub fn new_graph(&mut self, id: impl Into<String>) -> Result<Arc<Graph>> {
        let id = id.into();
        if self.graphs.contains_key(&id) {
            return Err(FlowError::DuplicateName(format!("graph '{id}'")));
        }
        let graph = Arc::new(Graph::new(id.clone()));
        self.graphs.insert(id, Arc::clone(&graph));
        Ok(graph)
    }

    pub fn graph(&self, id: &str) -> Result<Arc<Graph>> {
        self.graphs
            .get(id)
            .cloned()
            .ok_or_else(|| FlowError::NotFound(format!("graph '{id}'")))
    }

    pub fn graph_ids(&self) -> Vec<String> {
        self.graphs.keys().cloned().collect()
    }

    /// Remove a graph, stopping it first if it is running.
    pub fn remove_graph(&mut self, id: &str) -> Result<()> {
        if !self.graphs.contains_key(id) {
            return Err(FlowError::NotFound(format!("graph '{id}'")));
        }
        if let Some(mut executor) = self.executors.remove(id) {
            if executor.is_running() {
                executor.stop()?;
            }
        }
        self.graphs.remove(id);
        Ok(())
    }

    // ---- topology ----

    /// Instantiate a registered component type as a node in the graph.
    pub fn add_node(&mut self, graph_id: &str, node_name: &str, type_name: &str) -> Result<()> {
        let graph = self.graph(graph_id)?;
        let component = self.registry.instantiate(type_name, node_name)?;
        graph.add_component(component)
    }

    /// Add a node from an already-built component, bypassing the
    /// registry. Useful for one-off closures in tests and scripts.
    pub fn add_component(&mut self, graph_id: &str, component: Component) -> Result<()> {
        self.graph(graph_id)?.add_component(component)
    }

    pub fn remove_node(&mut self, graph_id: &str, node_name: &str) -> Result<()> {
        self.graph(graph_id)?.remove_component(node_name)
    }

    pub fn add_edge(
        &mut self,
        graph_id: &str,
        source: PortRef,
        target: PortRef,
    ) -> Result<ConnectionId> {
        self.graph(graph_id)?.connect(source, target)
    }

    /// Remove the connection feeding `target`. A target with nothing
    /// attached is not an error; removing an edge twice is a no-op.
    pub fn remove_edge(&mut self, graph_id: &str, target: &PortRef) -> Result<()> {
        let graph = self.graph(graph_id)?;
        if !graph.is_connected(target) {
            return Ok(());
        }
        graph.disconnect(target)
    }

    pub fn add_iip(&mut self, graph_id: &str, target: PortRef, value: Value) -> Result<()> {
        self.graph(graph_id)?.set_initial_packet(target, value)
    }

    pub fn remove_iip(&mut self, graph_id: &str, target: &PortRef) -> Result<()> {
        self.graph(graph_id)?.unset_initial_packet(target)
    }

    // ---- execution ----

    /// Start a graph. A stopped graph restarts on a fresh executor
    /// with empty queues; IIPs are delivered again.
    pub fn start(&mut self, graph_id: &str) -> Result<()> {
        let graph = self.graph(graph_id)?;
        if let Some(executor) = self.executors.get(graph_id) {
            if executor.is_running() {
                return Err(FlowError::InvalidState(format!(
                    "graph '{graph_id}' is already running"
                )));
            }
        }
        let mut executor = GraphExecutor::new(graph);
        executor.execute()?;
        self.executors.insert(graph_id.to_string(), executor);
        Ok(())
    }

    pub fn stop(&mut self, graph_id: &str) -> Result<()> {
        // Resolve the graph first so an unknown id reports NotFound
        // rather than InvalidState.
        self.graph(graph_id)?;
        match self.executors.remove(graph_id) {
            Some(mut executor) => executor.stop(),
            None => Err(FlowError::InvalidState(format!(
                "graph '{graph_id}' is not running"
            ))),
        }
    }

    pub fn is_started(&self, graph_id: &str) -> bool {
        self.executors
            .get(graph_id)
            .is_some_and(GraphExecutor::is_running)
    }

    pub fn network_status(&self, graph_id: &str) -> Result<NetworkStatus> {
        if let Some(executor) = self.executors.get(graph_id) {
            return Ok(executor.status());
        }
        let graph = self.graph(graph_id)?;
        Ok(NetworkStatus {
            running: false,
            component_count: graph.component_count(),
            connection_count: graph.connections().len(),
            component_statuses: HashMap::new(),
        })
    }
}

impl Default for FlowRuntime {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for FlowRuntime {
    fn drop(&mut self) {
        for (id, executor) in self.executors.iter_mut() {
            if executor.is_running() {
                if let Err(e) = executor.stop() {
                    tracing::warn!("[{id}] Failed to stop on shutdown: {e}");
                }
            }
        }
    }
}

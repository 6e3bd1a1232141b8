// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! Registry mapping stable component type names to factories.
//!
//! Populated by explicit registration calls; the registry is owned by
//! the [`FlowRuntime`](crate::core::runtime::FlowRuntime) rather than
//! living in process-wide state.

use std::collections::HashMap;

use super::component::Component;
use super::descriptors::ComponentDescriptor;
use super::error::{FlowError, Result};

/// Creates one component instance for the given node name.
pub type ComponentFactory = Box<dyn Fn(&str) -> Result<Component> + Send + Sync>;

struct Registration {
    type_name: String,
    descriptor: ComponentDescriptor,
    factory: ComponentFactory,
}

/// Ordered registry of component types.
#[derive(Default)]
pub struct ComponentRegistry {
    entries: Vec<Registration>,
    index: HashMap<String, usize>,
}

impl ComponentRegistry {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            index: HashMap::new(),
        }
    }

    /// Register a component type. The factory is invoked once with a
    /// throwaway node name to capture the type's port descriptor.
    pub fn register(&mut self, type_name: impl Into<String>, factory: ComponentFactory) -> Result<()> {
        let type_name = type_name.into();
        if self.index.contains_key(&type_name) {
            return Err(FlowError::DuplicateName(format!(
                "component type '{}' is already registered",
                type_name
            )));
        }

        let probe = factory("__descriptor_probe")?;
        let mut descriptor = probe.descriptor();
        descriptor.name = type_name.clone();

        tracing::debug!("[registry] Registered component type '{}'", type_name);

        self.index.insert(type_name.clone(), self.entries.len());
        self.entries.push(Registration {
            type_name,
            descriptor,
            factory,
        });
        Ok(())
    }

    /// Instantiate a registered type under a node name.
    pub fn instantiate(&self, type_name: &str, node_name: &str) -> Result<Component> {
        let entry = self
            .index
            .get(type_name)
            .map(|i| &self.entries[*i])
            .ok_or_else(|| {
                FlowError::NotFound(format!("component type '{}' is not registered", type_name))
            })?;

        Ok((entry.factory)(node_name)?.with_type_name(&entry.type_name))
    }

    pub fn contains(&self, type_name: &str) -> bool {
        self.index.contains_key(type_name)
    }

    /// Descriptors of every registered type, in registration order.
    pub fn list(&self) -> Vec<ComponentDescriptor> {
        self.entries.iter().map(|e| e.descriptor.clone()).collect()
    }

    pub fn unregister(&mut self, type_name: &str) -> bool {
        match self.index.remove(type_name) {
            Some(position) => {
                self.entries.remove(position);
                for entry in &self.entries[position..] {
                    if let Some(slot) = self.index.get_mut(&entry.type_name) {
                        *slot -= 1;
                    }
                }
                true
            }
            None => false,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

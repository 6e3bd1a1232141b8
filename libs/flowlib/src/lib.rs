// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

#![allow(clippy::type_complexity)] // Boxed factory closures are clear in context

// Re-export serde_json: packet payloads and IIP values are `Value`s
pub use serde_json;

pub mod core;
pub mod prelude {
    pub use crate::core::prelude::*;
}

pub use crate::core::{
    component::{Component, ComponentId, Outcome, Process, ProcessContext},
    descriptors::{ComponentDescriptor, PortDescriptor},
    error::{FlowError, Result},
    executor::{ComponentStatus, ExecutorState, GraphExecutor, NetworkStatus},
    graph::{Connection, ConnectionId, Graph, Iip, IipId, DEFAULT_CONNECTION_CAPACITY},
    packet::{Packet, PortType},
    ports::{Port, PortDirection, PortRef, Ports},
    registry::{ComponentFactory, ComponentRegistry},
    runtime::FlowRuntime,
};

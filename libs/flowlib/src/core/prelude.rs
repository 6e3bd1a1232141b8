// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! Commonly used types for `use flowlib::prelude::*`.

pub use crate::core::{
    // Errors
    error::{FlowError, Result},

    // Components
    component::{Component, ComponentId, Outcome, Process, ProcessContext},
    registry::{ComponentFactory, ComponentRegistry},

    // Graph
    graph::{Connection, ConnectionId, Graph, Iip, IipId},
    packet::{Packet, PortType},
    ports::{Port, PortRef},

    // Execution
    executor::{ComponentStatus, ExecutorState, GraphExecutor, NetworkStatus},
    runtime::FlowRuntime,
};

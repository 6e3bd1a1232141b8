// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Lifecycle of one executor instance. `Stopped` is terminal: a fresh
/// executor is required to restart the same graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutorState {
    /// Constructed, not yet started
    Idle,
    /// Scheduler thread actively dispatching components
    Running,
    /// Stopped, queues discarded
    Stopped,
}

/// Scheduling status of one component inside a running network.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComponentStatus {
    /// Waiting for required inputs or output capacity
    Suspended,
    /// Mid-invocation
    Running,
    /// Signalled completion; never rescheduled
    Finished,
    /// Processing behavior raised an unhandled fault; never rescheduled
    Faulted,
}

/// Point-in-time snapshot of a network's execution state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkStatus {
    pub running: bool,
    pub component_count: usize,
    pub connection_count: usize,
    pub component_statuses: HashMap<String, ComponentStatus>,
}

impl std::fmt::Display for ComponentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Suspended => write!(f, "suspended"),
            Self::Running => write!(f, "running"),
            Self::Finished => write!(f, "finished"),
            Self::Faulted => write!(f, "faulted"),
        }
    }
}

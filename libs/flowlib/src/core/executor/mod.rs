// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! Executor: turns a [`Graph`] into a running network.
//!
//! One executor instance drives one graph, once. `execute()` spawns the
//! scheduler thread; `stop()` joins it (a component mid-invocation
//! completes its current invocation first) and discards every queue.
//! Restarting a stopped graph requires a fresh executor.
//!
//! Component behaviors run on the scheduler thread while the graph
//! lock is held; a behavior must not call mutation operations on its
//! own graph.

mod scheduler;
mod state;

use std::collections::HashMap;
use std::sync::Arc;
use std::thread::JoinHandle;

use crossbeam_channel::Sender;
use parking_lot::Mutex;

use super::error::{FlowError, Result};
use super::graph::Graph;

pub use state::{ComponentStatus, ExecutorState, NetworkStatus};

use scheduler::SharedStatus;

/// Schedules component activity and routes packets between ports for
/// one graph.
pub struct GraphExecutor {
    graph: Arc<Graph>,
    state: ExecutorState,
    shared: Arc<SharedStatus>,
    shutdown_tx: Option<Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl GraphExecutor {
    pub fn new(graph: Arc<Graph>) -> Self {
        Self {
            graph,
            state: ExecutorState::Idle,
            shared: Arc::new(SharedStatus {
                statuses: Mutex::new(HashMap::new()),
            }),
            shutdown_tx: None,
            handle: None,
        }
    }

    pub fn state(&self) -> ExecutorState {
        self.state
    }

    /// False before the first `execute()` and after `stop()`.
    pub fn is_running(&self) -> bool {
        self.state == ExecutorState::Running
    }

    /// Start the network: deliver IIPs, then schedule components until
    /// stopped. Quiescence (nothing runnable) keeps the network alive.
    pub fn execute(&mut self) -> Result<()> {
        match self.state {
            ExecutorState::Idle => {}
            ExecutorState::Running => {
                return Err(FlowError::InvalidState(format!(
                    "graph '{}' is already running",
                    self.graph.id()
                )));
            }
            ExecutorState::Stopped => {
                return Err(FlowError::InvalidState(format!(
                    "executor for graph '{}' is stopped; create a new one",
                    self.graph.id()
                )));
            }
        }

        let (shutdown_tx, shutdown_rx) = crossbeam_channel::bounded(1);
        let (events_tx, events_rx) = crossbeam_channel::unbounded();
        // One executor per graph: claiming the listener slot fails if
        // another executor is already running against this graph.
        self.graph.set_change_listener(events_tx)?;

        let graph = Arc::clone(&self.graph);
        let shared = Arc::clone(&self.shared);
        let spawned = std::thread::Builder::new()
            .name(format!("flow-scheduler-{}", self.graph.id()))
            .spawn(move || scheduler::run(graph, shared, shutdown_rx, events_rx));
        let handle = match spawned {
            Ok(handle) => handle,
            Err(e) => {
                self.graph.clear_change_listener();
                return Err(e.into());
            }
        };

        self.shutdown_tx = Some(shutdown_tx);
        self.handle = Some(handle);
        self.state = ExecutorState::Running;
        tracing::info!("[{}] Execution started", self.graph.id());
        Ok(())
    }

    /// Cooperative shutdown: the scheduler finishes its current pass,
    /// then the thread exits and all queues are discarded.
    pub fn stop(&mut self) -> Result<()> {
        if self.state != ExecutorState::Running {
            return Err(FlowError::InvalidState(format!(
                "graph '{}' is not running",
                self.graph.id()
            )));
        }

        if let Some(shutdown_tx) = self.shutdown_tx.take() {
            // The scheduler may already have exited; a dead channel is fine.
            let _ = shutdown_tx.send(());
        }
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                tracing::error!("[{}] Scheduler thread panicked", self.graph.id());
            }
        }
        self.graph.clear_change_listener();
        self.state = ExecutorState::Stopped;
        tracing::info!("[{}] Execution stopped", self.graph.id());
        Ok(())
    }

    /// Snapshot of per-component statuses and queue topology counts.
    pub fn status(&self) -> NetworkStatus {
        NetworkStatus {
            running: self.is_running(),
            component_count: self.graph.component_count(),
            connection_count: self.graph.connections().len(),
            component_statuses: self.shared.statuses.lock().clone(),
        }
    }
}

impl Drop for GraphExecutor {
    fn drop(&mut self) {
        if self.state == ExecutorState::Running {
            let _ = self.stop();
        }
    }
}

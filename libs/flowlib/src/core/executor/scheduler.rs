// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! The scan-and-dispatch loop at the heart of the executor.
//!
//! One pass takes the graph lock, reconciles run state against the
//! current topology, and dispatches every runnable component once in
//! rotating order. The whole pass is one lock hold, so graph mutations
//! interleave between passes and never observe a half-dispatched scan.
//! When nothing is runnable the loop blocks on the shutdown and
//! graph-change channels: quiescence is a steady state, not termination.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use crossbeam_channel::{select, Receiver};
use parking_lot::Mutex;

use crate::core::component::{Component, ComponentId, Outcome, ProcessContext};
use crate::core::graph::{
    AttachmentKind, ConnectionId, Graph, GraphEvent, GraphInner, IipId,
};
use crate::core::packet::Packet;
use crate::core::ports::{Port, PortRef};

use super::state::ComponentStatus;

/// Status map shared with [`GraphExecutor`](super::GraphExecutor) for
/// snapshots. The scheduler thread is the only writer.
pub(super) struct SharedStatus {
    pub statuses: Mutex<HashMap<String, ComponentStatus>>,
}

struct BoundedQueue {
    packets: VecDeque<Packet>,
    capacity: usize,
}

struct IipSlot {
    target: PortRef,
    /// Taken by the first consuming invocation; delivered exactly once.
    packet: Option<Packet>,
}

/// Executor-side run state, reconciled against the graph each time the
/// topology revision moves.
struct NetworkState {
    revision: Option<u64>,
    queues: HashMap<ConnectionId, BoundedQueue>,
    iip_slots: HashMap<IipId, IipSlot>,
    /// Which instance each status entry belongs to. A component removed
    /// and re-added under the same name is a new instance and must not
    /// inherit the old one's terminal status.
    instances: HashMap<String, ComponentId>,
    rotation: usize,
}

impl NetworkState {
    fn new() -> Self {
        Self {
            revision: None,
            queues: HashMap::new(),
            iip_slots: HashMap::new(),
            instances: HashMap::new(),
            rotation: 0,
        }
    }

    fn slot_has_packet(&self, kind: &AttachmentKind) -> bool {
        match kind {
            AttachmentKind::Connection(id) => self
                .queues
                .get(id)
                .is_some_and(|q| !q.packets.is_empty()),
            AttachmentKind::Iip(id) => self
                .iip_slots
                .get(id)
                .is_some_and(|slot| slot.packet.is_some()),
        }
    }

    fn take_packet(&mut self, kind: &AttachmentKind) -> Option<Packet> {
        match kind {
            AttachmentKind::Connection(id) => {
                self.queues.get_mut(id).and_then(|q| q.packets.pop_front())
            }
            AttachmentKind::Iip(id) => self.iip_slots.get_mut(id).and_then(|slot| slot.packet.take()),
        }
    }
}

pub(super) fn run(
    graph: Arc<Graph>,
    shared: Arc<SharedStatus>,
    shutdown_rx: Receiver<()>,
    events_rx: Receiver<GraphEvent>,
) {
    tracing::info!("[{}] Scheduler started", graph.id());

    let mut network = NetworkState::new();

    loop {
        if shutdown_rx.try_recv().is_ok() {
            break;
        }
        // Coalesce queued change notifications; reconcile works off the
        // revision counter, not the event count.
        while events_rx.try_recv().is_ok() {}

        let progressed = pass(&graph, &shared, &mut network);
        if progressed {
            continue;
        }

        // Quiesced. Stay alive: the graph may be mutated into a
        // runnable shape at any time.
        select! {
            recv(shutdown_rx) -> _ => break,
            recv(events_rx) -> _ => {}
            default(Duration::from_millis(100)) => {}
        }
    }

    let buffered: usize = network.queues.values().map(|q| q.packets.len()).sum();
    tracing::info!(
        "[{}] Scheduler stopped, discarding {} buffered packets",
        graph.id(),
        buffered
    );
}

/// One scan-and-dispatch pass. Returns whether any component ran.
fn pass(graph: &Arc<Graph>, shared: &Arc<SharedStatus>, network: &mut NetworkState) -> bool {
    let mut guard = graph.lock();
    let inner = &mut *guard;
    let mut statuses = shared.statuses.lock();

    reconcile(graph.id(), inner, network, &mut statuses);

    let names: Vec<String> = inner.components().map(|c| c.name().to_string()).collect();
    if names.is_empty() {
        return false;
    }

    // Fair but unordered: rotate the scan origin so no component is
    // structurally favored over simultaneously-runnable peers.
    let start = network.rotation % names.len();
    network.rotation = network.rotation.wrapping_add(1);

    let mut progressed = false;
    for offset in 0..names.len() {
        let name = &names[(start + offset) % names.len()];

        if statuses.get(name) != Some(&ComponentStatus::Suspended) {
            continue;
        }
        let Some(component) = inner.component(name) else {
            continue;
        };
        if !is_runnable(inner, network, component) {
            continue;
        }

        let consumed = consume_inputs(inner, network, name);
        let mut ctx = ProcessContext::new(consumed);

        statuses.insert(name.clone(), ComponentStatus::Running);
        let Some(component) = inner.component_mut(name) else {
            continue;
        };
        match component.invoke(&mut ctx) {
            Ok(Outcome::Continue) => {
                statuses.insert(name.clone(), ComponentStatus::Suspended);
            }
            Ok(Outcome::Finished) => {
                tracing::debug!("[{}] Component '{}' finished", graph.id(), name);
                statuses.insert(name.clone(), ComponentStatus::Finished);
            }
            Err(e) => {
                // Fatal to this component only; siblings keep running.
                tracing::error!("[{}] Component '{}' faulted: {}", graph.id(), name, e);
                statuses.insert(name.clone(), ComponentStatus::Faulted);
            }
        }

        route_outputs(graph.id(), inner, network, name, &mut ctx);
        progressed = true;
    }

    progressed
}

/// Sync queues, IIP slots, and status entries with the current
/// topology. Packets buffered on removed connections are discarded;
/// new connections and components become schedulable on this pass.
fn reconcile(
    graph_id: &str,
    inner: &GraphInner,
    network: &mut NetworkState,
    statuses: &mut HashMap<String, ComponentStatus>,
) {
    if network.revision == Some(inner.revision()) {
        return;
    }
    network.revision = Some(inner.revision());

    let mut discarded = 0usize;
    let live: HashMap<ConnectionId, usize> = inner
        .connections()
        .iter()
        .map(|c| (c.id, c.capacity))
        .collect();
    network.queues.retain(|id, queue| {
        let keep = live.contains_key(id);
        if !keep {
            discarded += queue.packets.len();
        }
        keep
    });
    for (id, capacity) in live {
        network.queues.entry(id).or_insert_with(|| BoundedQueue {
            packets: VecDeque::new(),
            capacity,
        });
    }
    if discarded > 0 {
        tracing::debug!(
            "[{}] Discarded {} packets from removed connections",
            graph_id,
            discarded
        );
    }

    // An unset IIP whose packet was never consumed is discarded like a
    // removed connection's queue.
    network
        .iip_slots
        .retain(|id, _| inner.iips().iter().any(|iip| iip.id == *id));
    for iip in inner.iips() {
        if !network.iip_slots.contains_key(&iip.id) {
            tracing::debug!("[{}] Delivering IIP to {}", graph_id, iip.target);
            network.iip_slots.insert(
                iip.id,
                IipSlot {
                    target: iip.target.clone(),
                    packet: Some(Packet::new(iip.value.clone())),
                },
            );
        }
    }

    statuses.retain(|name, _| inner.component(name).is_some());
    network
        .instances
        .retain(|name, _| inner.component(name).is_some());
    for component in inner.components() {
        let name = component.name();
        match network.instances.get(name) {
            Some(id) if *id == component.instance_id() => {
                statuses
                    .entry(name.to_string())
                    .or_insert(ComponentStatus::Suspended);
            }
            _ => {
                // New instance, possibly replacing a terminal one under
                // the same name: schedulable from scratch.
                network
                    .instances
                    .insert(name.to_string(), component.instance_id());
                statuses.insert(name.to_string(), ComponentStatus::Suspended);
            }
        }
    }
}

/// Runnable: every required input slot satisfiable, every attached
/// output connection under capacity. Self-starters (no attached
/// inputs at all) are runnable unconditionally.
fn is_runnable(inner: &GraphInner, network: &NetworkState, component: &Component) -> bool {
    let name = component.name();

    // Backpressure: a component that would block on a full output
    // queue is not scheduled until capacity frees.
    for port in component.outputs() {
        for connection in inner.output_connections(name, port.name()) {
            if let Some(queue) = network.queues.get(&connection.id) {
                if queue.packets.len() >= queue.capacity {
                    return false;
                }
            }
        }
    }

    if inner.is_self_starter(component) {
        return true;
    }

    let mut has_required = false;
    let mut any_available = false;
    for port in component.inputs() {
        let attachments = inner.input_attachments(name, port.name());
        if port.is_required() {
            has_required = true;
            // A required port with nothing attached can never be
            // satisfied; the component stays suspended.
            if attachments.is_empty() {
                return false;
            }
            for attachment in &attachments {
                if !network.slot_has_packet(&attachment.kind) {
                    return false;
                }
            }
            any_available = true;
        } else {
            for attachment in &attachments {
                if network.slot_has_packet(&attachment.kind) {
                    any_available = true;
                }
            }
        }
    }

    // Only optional attached inputs: wait for at least one packet.
    has_required || any_available
}

fn consume_inputs(
    inner: &GraphInner,
    network: &mut NetworkState,
    name: &str,
) -> HashMap<(String, Option<usize>), Packet> {
    let mut consumed = HashMap::new();
    let Some(component) = inner.component(name) else {
        return consumed;
    };

    for port in component.inputs() {
        let mut took_any = false;
        for attachment in inner.input_attachments(name, port.name()) {
            if let Some(packet) = network.take_packet(&attachment.kind) {
                consumed.insert((port.name().to_string(), attachment.index), packet);
                took_any = true;
            }
        }
        // Optional non-array input with no packet available falls back
        // to its declared default.
        if !took_any && port.is_optional() && !port.is_array() {
            if let Some(default) = port.default() {
                consumed.insert(
                    (port.name().to_string(), None),
                    Packet::new(default.clone()),
                );
            }
        }
    }

    consumed
}

/// Route staged outputs onto downstream queues, FIFO per connection.
/// A single invocation may burst a queue past its capacity; the queue
/// then gates the producer until it drains back under the limit.
fn route_outputs(
    graph_id: &str,
    inner: &GraphInner,
    network: &mut NetworkState,
    name: &str,
    ctx: &mut ProcessContext,
) {
    for ((port, mut index), packet) in ctx.drain_outputs() {
        // An unindexed send on an array output lands on slot 0, where
        // connections to that port resolve when no index is given.
        if index.is_none() {
            let is_array = inner
                .component(name)
                .and_then(|c| c.outputs().get(&port))
                .is_some_and(Port::is_array);
            if is_array {
                index = Some(0);
            }
        }
        let source = PortRef {
            node: name.to_string(),
            port,
            index,
        };
        let connection = inner.connections().iter().find(|c| c.source == source);
        match connection {
            Some(connection) => {
                if let Some(queue) = network.queues.get_mut(&connection.id) {
                    queue.packets.push_back(packet);
                }
            }
            None => {
                tracing::trace!("[{}] Dropping packet on unattached output {}", graph_id, source);
            }
        }
    }
}

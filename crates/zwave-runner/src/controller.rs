//! The controller driver.
//!
//! Owns every node and the network, and is the single thread of control for
//! both: each cycle ticks all nodes, then routes whatever the network
//! delivered to the node it belongs to.

use std::collections::BTreeMap;
use std::sync::Arc;

use crossbeam_channel::{Receiver, Sender};
use tracing::{debug, info, trace, warn};
use zwave_frame::{DataFrame, NodeId, NodeProtocolInfo};
use zwave_metrics::metric_defs;
use zwave_node::{
    profile_for_generic_class, CommandClassFactory, NodeListener, NodeState,
    StandardCommandClasses, ZWaveNode,
};

use crate::device::{InboundFrame, Network};
use crate::summary::NetworkSummary;
use crate::RunnerError;

/// Forwards started nodes to the controller over a channel.
struct ChannelListener {
    tx: Sender<NodeId>,
}

impl NodeListener for ChannelListener {
    fn on_node_started(&self, node_id: NodeId) {
        if self.tx.send(node_id).is_err() {
            warn!("Controller gone, node {} start not recorded", node_id);
        }
    }
}

pub struct Controller<N: Network> {
    network: N,
    nodes: BTreeMap<u8, ZWaveNode>,
    factory: Arc<dyn CommandClassFactory>,
    listener: Arc<ChannelListener>,
    started_rx: Receiver<NodeId>,
    started: Vec<NodeId>,
    cycles: u64,
}

impl<N: Network> Controller<N> {
    /// Controller using the command classes this workspace implements.
    pub fn new(network: N) -> Self {
        Self::with_factory(network, Arc::new(StandardCommandClasses))
    }

    pub fn with_factory(network: N, factory: Arc<dyn CommandClassFactory>) -> Self {
        let (tx, started_rx) = crossbeam_channel::unbounded();
        Controller {
            network,
            nodes: BTreeMap::new(),
            factory,
            listener: Arc::new(ChannelListener { tx }),
            started_rx,
            started: Vec::new(),
            cycles: 0,
        }
    }

    /// Add a node discovered at network join time. The device profile is
    /// picked from its generic device class.
    pub fn add_node(&mut self, node_id: NodeId, info: NodeProtocolInfo) -> Result<(), RunnerError> {
        if self.nodes.contains_key(&node_id.as_u8()) {
            return Err(RunnerError::DuplicateNode(node_id.as_u8()));
        }
        let profile = profile_for_generic_class(info.generic_device_class);
        debug!(
            "Adding node {} (profile={}, listening={})",
            node_id,
            profile.name(),
            info.listening
        );
        let node = ZWaveNode::new(node_id, info, self.factory.clone())
            .with_profile(profile)
            .with_listener(self.listener.clone());
        self.nodes.insert(node_id.as_u8(), node);
        Ok(())
    }

    pub fn node(&self, node_id: NodeId) -> Option<&ZWaveNode> {
        self.nodes.get(&node_id.as_u8())
    }

    pub fn node_mut(&mut self, node_id: NodeId) -> Option<&mut ZWaveNode> {
        self.nodes.get_mut(&node_id.as_u8())
    }

    pub fn nodes(&self) -> impl Iterator<Item = &ZWaveNode> {
        self.nodes.values()
    }

    pub fn network(&self) -> &N {
        &self.network
    }

    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    /// Nodes that reached [`NodeState::Started`], in the order they did.
    pub fn started(&self) -> &[NodeId] {
        &self.started
    }

    pub fn all_started(&self) -> bool {
        self.nodes
            .values()
            .all(|node| node.state() == NodeState::Started)
    }

    /// Run one driver cycle.
    pub fn run_cycle(&mut self) {
        self.cycles += 1;
        metrics::counter!(metric_defs::DRIVER_CYCLES.name).increment(1);

        // A failed node-info update does not name its node, so only one
        // request may be outstanding network-wide.
        let mut node_info_in_flight = self.awaiting_node_info();
        for (id, node) in self.nodes.iter_mut() {
            if node_info_in_flight.is_some_and(|busy| busy != *id) && next_is_node_info(node) {
                trace!("Node {} holding node info request", node.node_id());
                continue;
            }
            node.tick(&mut self.network);
            if is_node_info(node.pending_transaction()) {
                node_info_in_flight = Some(*id);
            }
        }
        for inbound in self.network.poll() {
            self.route(inbound);
        }
        for node_id in self.started_rx.try_iter() {
            info!("Node {} started after {} cycles", node_id, self.cycles);
            self.started.push(node_id);
        }
    }

    /// Run until every node is started or `max_cycles` have passed. Returns
    /// the number of cycles run.
    pub fn run(&mut self, max_cycles: u64) -> u64 {
        let first = self.cycles;
        while self.cycles - first < max_cycles {
            self.run_cycle();
            if self.all_started() {
                break;
            }
        }
        self.cycles - first
    }

    /// Run exactly `cycles` cycles.
    pub fn run_for(&mut self, cycles: u64) {
        for _ in 0..cycles {
            self.run_cycle();
        }
    }

    fn route(&mut self, inbound: InboundFrame) {
        let target = match inbound.frame.node_id() {
            Some(node_id) if node_id.as_u8() != 0 => Some(node_id.as_u8()),
            // A failed node-info request does not name the node; it answers
            // whichever node is waiting on one.
            _ => self.awaiting_node_info(),
        };

        match target.and_then(|id| self.nodes.get_mut(&id)) {
            Some(node) => {
                trace!("Routing {} to node {}", inbound.frame, node.node_id());
                node.on_frame_received(&inbound.frame, inbound.unsolicited);
            }
            None => {
                warn!("No node for inbound frame {}", inbound.frame);
                metrics::counter!(metric_defs::DRIVER_UNROUTED.name).increment(1);
            }
        }
    }

    fn awaiting_node_info(&self) -> Option<u8> {
        self.nodes
            .iter()
            .find(|(_, node)| is_node_info(node.pending_transaction()))
            .map(|(id, _)| *id)
    }

    /// Snapshot of every node.
    pub fn summary(&self) -> NetworkSummary {
        NetworkSummary::new(self.cycles, self.nodes.values())
    }
}

fn is_node_info(frame: Option<&DataFrame>) -> bool {
    matches!(frame, Some(DataFrame::RequestNodeInfo(_)))
}

/// True when the node's next send would be a node-info request.
fn next_is_node_info(node: &ZWaveNode) -> bool {
    !node.has_pending_transaction() && is_node_info(node.write_queue().next())
}

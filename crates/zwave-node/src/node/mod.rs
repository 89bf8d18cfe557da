//! Per-node protocol state.
//!
//! A [`ZWaveNode`] owns the command class handlers of one device, its write and
//! wakeup queues, the single outstanding transaction and the bring-up
//! lifecycle. The driver calls [`ZWaveNode::tick`] once per cycle and hands
//! every frame addressed to the node to [`ZWaveNode::on_frame_received`].

mod context;
mod lifecycle;
mod profile;
mod queue;

use std::fmt;
use std::sync::Arc;

use tracing::{debug, error, info, trace, warn};
use zwave_frame::{
    hex_byte, ApplicationCommand, ApplicationUpdate, DataFrame, NodeId, NodeProtocolInfo,
    RequestNodeInfo, COMMAND_CLASS_BASIC, COMMAND_CLASS_VERSION,
};
use zwave_metrics::{metric_defs, MetricLabels};

use crate::command_class::{CommandClass, CommandClassFactory, CommandClassSet};

pub use context::NodeContext;
pub use lifecycle::{
    Effect, Lifecycle, LifecycleEvent, NodeState, Transition, MAX_NODE_INFO_RETRIES,
};
pub use profile::{
    profile_for_generic_class, BinarySwitchProfile, DeviceProfile, GenericProfile,
    MultilevelSwitchProfile,
};
pub use queue::{FrameQueues, Queued};

use context::{enqueue, NodeScope};

// ============================================================================
// Collaborators
// ============================================================================

/// Hands frames to the physical link. Sending is fire-and-forget.
pub trait Transport {
    fn send(&mut self, frame: &DataFrame);
}

/// Collects sent frames; handy for tests and dry runs.
impl Transport for Vec<DataFrame> {
    fn send(&mut self, frame: &DataFrame) {
        self.push(frame.clone());
    }
}

/// Told when a node finishes bring-up.
pub trait NodeListener: Send + Sync {
    /// Called once per node, when it enters [`NodeState::Started`].
    fn on_node_started(&self, node_id: NodeId);
}

// ============================================================================
// Node
// ============================================================================

pub struct ZWaveNode {
    node_id: NodeId,
    basic_device_class: u8,
    generic_device_class: u8,
    specific_device_class: u8,

    classes: CommandClassSet,
    queues: FrameQueues,
    pending: Option<DataFrame>,

    lifecycle: Lifecycle,
    version_startup_sent: bool,

    factory: Arc<dyn CommandClassFactory>,
    profile: Box<dyn DeviceProfile>,
    listener: Option<Arc<dyn NodeListener>>,
    labels: MetricLabels,
}

impl fmt::Debug for ZWaveNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ZWaveNode")
            .field("node_id", &self.node_id)
            .field("state", &self.lifecycle.state())
            .field("profile", &self.profile.name())
            .field("command_classes", &self.classes.ids())
            .field("write_queue", &self.queues.write_len())
            .field("wakeup_queue", &self.queues.wakeup_len())
            .field("pending", &self.pending)
            .finish_non_exhaustive()
    }
}

impl ZWaveNode {
    /// Create a node in [`NodeState::NodeInfo`]. A listening node queues a
    /// node-info request straight away; a sleeping one waits for the device
    /// to announce itself.
    pub fn new(
        node_id: NodeId,
        info: NodeProtocolInfo,
        factory: Arc<dyn CommandClassFactory>,
    ) -> Self {
        let profile: Box<dyn DeviceProfile> = Box::new(GenericProfile);
        let labels = MetricLabels::new(node_id, profile.name());
        let mut node = ZWaveNode {
            node_id,
            basic_device_class: info.basic_device_class,
            generic_device_class: info.generic_device_class,
            specific_device_class: info.specific_device_class,
            classes: CommandClassSet::new(),
            queues: FrameQueues::new(info.listening),
            pending: None,
            lifecycle: Lifecycle::new(),
            version_startup_sent: false,
            factory,
            profile,
            listener: None,
            labels,
        };
        if info.listening {
            node.queue_frame(RequestNodeInfo::new(node_id).into());
        }
        node
    }

    /// Use a device-specific profile.
    pub fn with_profile(mut self, profile: Box<dyn DeviceProfile>) -> Self {
        self.labels = MetricLabels::new(self.node_id, profile.name());
        self.profile = profile;
        self
    }

    /// Register the listener told when the node is started.
    pub fn with_listener(mut self, listener: Arc<dyn NodeListener>) -> Self {
        self.listener = Some(listener);
        self
    }

    pub fn node_id(&self) -> NodeId {
        self.node_id
    }

    pub fn basic_device_class(&self) -> u8 {
        self.basic_device_class
    }

    pub fn generic_device_class(&self) -> u8 {
        self.generic_device_class
    }

    pub fn specific_device_class(&self) -> u8 {
        self.specific_device_class
    }

    pub fn profile_name(&self) -> &'static str {
        self.profile.name()
    }

    pub fn state(&self) -> NodeState {
        self.lifecycle.state()
    }

    /// Failed node-info requests retried in the current state.
    pub fn node_info_retries(&self) -> u8 {
        self.lifecycle.retries()
    }

    pub fn is_listening(&self) -> bool {
        self.queues.is_listening()
    }

    /// Update the listening flag; a node that starts listening gets its
    /// deferred frames moved to the write queue.
    pub fn set_listening(&mut self, listening: bool) {
        let moved = self.queues.set_listening(listening);
        if moved > 0 {
            debug!("Node {} listening, released {} deferred frames", self.node_id, moved);
        }
    }

    // ------------------------------------------------------------------------
    // Command classes
    // ------------------------------------------------------------------------

    /// Register a handler. An id that is already registered keeps its
    /// existing handler and `false` is returned.
    pub fn add_command_class(&mut self, command_class: Box<dyn CommandClass>) -> bool {
        self.classes.register(command_class)
    }

    pub fn command_class(&self, id: u8) -> Option<&dyn CommandClass> {
        self.classes.get(id)
    }

    pub fn command_classes(&self) -> impl Iterator<Item = &(dyn CommandClass + 'static)> {
        self.classes.iter()
    }

    /// The registered handler of concrete type `T`, if any.
    pub fn command_class_as<T: CommandClass + 'static>(&self) -> Option<&T> {
        self.classes
            .iter()
            .find_map(|cc| cc.as_any().downcast_ref::<T>())
    }

    // ------------------------------------------------------------------------
    // Queues
    // ------------------------------------------------------------------------

    /// Queue a frame for the node, deferring it while the node sleeps.
    pub fn queue_frame(&mut self, frame: DataFrame) {
        self.queue_frame_with(frame, true);
    }

    /// Queue a frame; `defer` selects whether a sleeping node holds it back.
    pub fn queue_frame_with(&mut self, frame: DataFrame, defer: bool) {
        enqueue(&mut self.queues, &self.labels, frame, defer);
    }

    /// Move every deferred frame to the front of the write queue.
    pub fn flush_wakeup_queue(&mut self) -> usize {
        let moved = self.queues.flush_wakeup();
        if moved > 0 {
            debug!("Node {} awake, released {} deferred frames", self.node_id, moved);
        }
        moved
    }

    pub fn write_queue_len(&self) -> usize {
        self.queues.write_len()
    }

    pub fn wakeup_queue_len(&self) -> usize {
        self.queues.wakeup_len()
    }

    pub fn write_queue(&self) -> impl Iterator<Item = &DataFrame> {
        self.queues.write_queue()
    }

    pub fn wakeup_queue(&self) -> impl Iterator<Item = &DataFrame> {
        self.queues.wakeup_queue()
    }

    /// The frame sent and not yet answered.
    pub fn pending_transaction(&self) -> Option<&DataFrame> {
        self.pending.as_ref()
    }

    pub fn has_pending_transaction(&self) -> bool {
        self.pending.is_some()
    }

    // ------------------------------------------------------------------------
    // Driver entry points
    // ------------------------------------------------------------------------

    /// Advance the node by one driver cycle.
    ///
    /// Pending states queue their startup frames. Then, with no transaction
    /// outstanding, the next queued frame is sent; if there is none, a
    /// completed state moves on.
    pub fn tick(&mut self, transport: &mut dyn Transport) {
        self.handle_event(LifecycleEvent::Tick);

        if self.pending.is_some() {
            return;
        }
        match self.queues.pop_front() {
            Some(frame) => {
                trace!("Node {} sending {}", self.node_id, frame);
                transport.send(&frame);
                metrics::counter!(metric_defs::FRAMES_SENT.name, &self.labels.to_labels())
                    .increment(1);
                metrics::gauge!(
                    metric_defs::WRITE_QUEUE_DEPTH.name,
                    &self.labels.to_labels()
                )
                .set(self.queues.write_len() as f64);
                self.pending = Some(frame);
            }
            None => self.handle_event(LifecycleEvent::QueueDrained),
        }
    }

    /// Handle a frame the driver routed to this node. `unsolicited` is set
    /// when the frame is not a reply to the pending transaction.
    pub fn on_frame_received(&mut self, frame: &DataFrame, unsolicited: bool) {
        match frame {
            DataFrame::ApplicationCommand(command) => {
                self.count_received("application_command");
                self.dispatch_command(command);
                self.pending = None;
            }
            DataFrame::ApplicationUpdate(update) => {
                self.count_received("application_update");
                self.process_update(update, unsolicited);
                self.pending = None;
            }
            other => trace!("Node {} ignoring {}", self.node_id, other),
        }
    }

    fn count_received(&self, kind: &'static str) {
        metrics::counter!(
            metric_defs::FRAMES_RECEIVED.name,
            &self.labels.with(&[("kind", kind.to_string())])
        )
        .increment(1);
    }

    fn count_dropped(&self, reason: &'static str) {
        metrics::counter!(
            metric_defs::FRAMES_DROPPED.name,
            &self.labels.with(&[("reason", reason.to_string())])
        )
        .increment(1);
    }

    fn dispatch_command(&mut self, command: &ApplicationCommand) {
        let received_id = command.command_class_id();
        if !self.classes.contains(received_id) {
            error!(
                "Node {} received frame for unknown command class {}",
                self.node_id,
                hex_byte(received_id)
            );
            self.count_dropped("unknown_command_class");
            return;
        }

        let mut class_id = received_id;
        if class_id == COMMAND_CLASS_BASIC {
            let mapped = self.profile.map_basic_handler(class_id);
            if mapped != class_id && self.classes.contains(mapped) {
                trace!(
                    "Node {} mapping basic command class to {}",
                    self.node_id,
                    hex_byte(mapped)
                );
                class_id = mapped;
            }
        }

        let result = self.with_command_class(class_id, |cc, ctx| cc.on_data_frame(command, ctx));
        if let Some(Err(e)) = result {
            warn!(
                "Node {} could not handle {} frame: {}",
                self.node_id,
                hex_byte(class_id),
                e
            );
            self.count_dropped("malformed");
        }
    }

    fn process_update(&mut self, update: &ApplicationUpdate, unsolicited: bool) {
        let state = self.lifecycle.state();
        let event = if update.did_info_request_fail() {
            if state == NodeState::NodeInfo {
                warn!("Node {} info request failed", self.node_id);
            } else {
                debug!(
                    "Node {} sent {} failed update in state {}",
                    self.node_id,
                    if unsolicited { "unsolicited" } else { "solicited" },
                    state
                );
            }
            LifecycleEvent::NodeInfoFailed
        } else {
            if state == NodeState::NodeInfo {
                self.register_reported_classes(update.command_classes());
            } else {
                debug!(
                    "Node {} sent {} node info in state {}",
                    self.node_id,
                    if unsolicited { "unsolicited" } else { "solicited" },
                    state
                );
            }
            LifecycleEvent::NodeInfoReceived {
                has_version_class: self.classes.contains(COMMAND_CLASS_VERSION),
            }
        };
        self.handle_event(event);
    }

    fn register_reported_classes(&mut self, ids: &[u8]) {
        for &id in ids {
            if self.classes.contains(id) {
                continue;
            }
            match self.factory.create(id) {
                Some(cc) => {
                    self.classes.register(cc);
                }
                None => debug!(
                    "Node {} ignoring unsupported command class {}",
                    self.node_id,
                    hex_byte(id)
                ),
            }
        }
    }

    // ------------------------------------------------------------------------
    // Lifecycle
    // ------------------------------------------------------------------------

    fn handle_event(&mut self, event: LifecycleEvent) {
        let transition = self.lifecycle.step(event);
        self.lifecycle.apply(&transition);

        if let Some(next) = transition.next {
            info!("Node {} changing to state: {}", self.node_id, next);
            metrics::counter!(
                metric_defs::STATE_TRANSITIONS.name,
                &self.labels.with(&[("state", next.as_label().to_string())])
            )
            .increment(1);
        }
        if transition.retried {
            debug!(
                "Node {} retrying node info request ({}/{})",
                self.node_id,
                self.lifecycle.retries(),
                MAX_NODE_INFO_RETRIES
            );
            metrics::counter!(metric_defs::NODE_INFO_RETRIES.name, &self.labels.to_labels())
                .increment(1);
        }

        for effect in transition.effects {
            self.apply_effect(effect);
        }
    }

    fn apply_effect(&mut self, effect: Effect) {
        match effect {
            Effect::RequestNodeInfo => {
                self.queue_frame(RequestNodeInfo::new(self.node_id).into());
            }
            Effect::QueueVersionStartup => self.queue_version_startup(),
            Effect::QueueAllStartup => self.queue_all_startup(),
            Effect::FlushWakeupQueue => {
                self.flush_wakeup_queue();
            }
            Effect::Refresh => {
                for frame in self.profile.refresh(self.node_id) {
                    self.queue_frame_with(frame, false);
                }
            }
            Effect::NotifyStarted => {
                metrics::counter!(metric_defs::NODES_STARTED.name, &self.labels.to_labels())
                    .increment(1);
                if let Some(listener) = &self.listener {
                    listener.on_node_started(self.node_id);
                }
            }
        }
    }

    fn queue_version_startup(&mut self) {
        if self.version_startup_sent {
            return;
        }
        self.version_startup_sent = true;
        let node_id = self.node_id;
        self.with_command_class(COMMAND_CLASS_VERSION, |cc, ctx| {
            cc.queue_startup_messages(node_id, ctx)
        });
    }

    fn queue_all_startup(&mut self) {
        let node_id = self.node_id;
        for id in self.classes.ids() {
            if id == COMMAND_CLASS_VERSION && self.version_startup_sent {
                continue;
            }
            self.with_command_class(id, |cc, ctx| cc.queue_startup_messages(node_id, ctx));
        }
    }

    /// Run `f` against a detached handler so it can reach the rest of the
    /// node through a context. Returns `None` if `id` is not registered.
    fn with_command_class<R>(
        &mut self,
        id: u8,
        f: impl FnOnce(&mut dyn CommandClass, &mut dyn NodeContext) -> R,
    ) -> Option<R> {
        let mut cc = self.classes.take(id)?;
        let mut scope = NodeScope {
            node_id: self.node_id,
            queues: &mut self.queues,
            classes: &mut self.classes,
            labels: &self.labels,
        };
        let result = f(cc.as_mut(), &mut scope);
        self.classes.restore(cc);
        Some(result)
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;

    /// A context that records queued frames instead of queueing them.
    #[derive(Debug)]
    pub struct RecordingContext {
        pub node_id: NodeId,
        pub queued: Vec<DataFrame>,
        pub classes: CommandClassSet,
    }

    impl RecordingContext {
        pub fn new(node_id: NodeId) -> Self {
            Self::with_classes(node_id, CommandClassSet::new())
        }

        pub fn with_classes(node_id: NodeId, classes: CommandClassSet) -> Self {
            RecordingContext {
                node_id,
                queued: Vec::new(),
                classes,
            }
        }
    }

    impl NodeContext for RecordingContext {
        fn node_id(&self) -> NodeId {
            self.node_id
        }

        fn queue_frame(&mut self, frame: DataFrame) {
            self.queued.push(frame);
        }

        fn command_class(&self, id: u8) -> Option<&dyn CommandClass> {
            self.classes.get(id)
        }

        fn command_class_mut(&mut self, id: u8) -> Option<&mut dyn CommandClass> {
            self.classes.get_mut(id)
        }

        fn command_classes(&self) -> Vec<&dyn CommandClass> {
            self.classes.iter().collect()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command_class::{StandardCommandClasses, VersionCommandClass};
    use zwave_frame::NodeInfo;

    fn listening_node(id: u8) -> ZWaveNode {
        ZWaveNode::new(
            NodeId(id),
            NodeProtocolInfo::new(0x04, 0x10, 0x01, true),
            Arc::new(StandardCommandClasses),
        )
    }

    fn node_info(id: u8, classes: &[u8]) -> DataFrame {
        ApplicationUpdate::node_info_received(
            NodeId(id),
            NodeInfo {
                command_classes: classes.to_vec(),
                ..Default::default()
            },
        )
        .into()
    }

    #[test]
    fn test_version_startup_is_latched() {
        let mut node = listening_node(2);
        let mut sent = Vec::new();
        node.tick(&mut sent);
        node.on_frame_received(&node_info(2, &[COMMAND_CLASS_VERSION]), false);
        assert_eq!(node.write_queue_len(), 0);

        node.apply_effect(Effect::QueueVersionStartup);
        let after_first = node.write_queue_len();
        node.apply_effect(Effect::QueueVersionStartup);

        assert_eq!(after_first, 1);
        assert_eq!(node.write_queue_len(), after_first);
        assert_eq!(
            node.write_queue().next(),
            Some(&VersionCommandClass::create_get(NodeId(2)))
        );
    }

    #[test]
    fn test_handler_is_restored_after_dispatch() {
        let mut node = listening_node(2);
        node.add_command_class(Box::new(VersionCommandClass::new()));
        let report = ApplicationCommand::new(NodeId(2), vec![0x86, 0x12, 3, 4, 0, 2, 5]).unwrap();
        node.on_frame_received(&report.into(), true);

        let version = node
            .command_class_as::<VersionCommandClass>()
            .expect("still registered");
        assert_eq!(version.library(), Some("3"));
    }

    #[test]
    fn test_other_frames_leave_pending_alone() {
        let mut node = listening_node(2);
        let mut sent = Vec::new();
        node.tick(&mut sent);
        assert!(node.has_pending_transaction());

        node.on_frame_received(&RequestNodeInfo::new(NodeId(2)).into(), true);
        assert!(node.has_pending_transaction());
    }
}

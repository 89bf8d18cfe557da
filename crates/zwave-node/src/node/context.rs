use tracing::trace;
use zwave_frame::{DataFrame, NodeId};
use zwave_metrics::{metric_defs, MetricLabels};

use super::queue::{FrameQueues, Queued};
use crate::command_class::{CommandClass, CommandClassSet};

/// What a command class may do to the node that owns it.
pub trait NodeContext {
    /// Address of the owning node.
    fn node_id(&self) -> NodeId;

    /// Queue a frame, deferring it while the node sleeps.
    fn queue_frame(&mut self, frame: DataFrame);

    /// Look up a sibling command class.
    fn command_class(&self, id: u8) -> Option<&dyn CommandClass>;

    /// Look up a sibling command class for mutation.
    fn command_class_mut(&mut self, id: u8) -> Option<&mut dyn CommandClass>;

    /// Every registered command class, the caller excluded while it runs.
    fn command_classes(&self) -> Vec<&dyn CommandClass>;
}

/// Queue `frame` on a node and account for it.
pub(crate) fn enqueue(
    queues: &mut FrameQueues,
    labels: &MetricLabels,
    frame: DataFrame,
    defer: bool,
) {
    trace!("Queueing {} (defer={})", frame, defer);
    if queues.push(frame, defer) == Queued::Wakeup {
        metrics::counter!(metric_defs::FRAMES_DEFERRED.name, &labels.to_labels()).increment(1);
    }
}

/// The view of a node handed to a running command class.
pub(crate) struct NodeScope<'a> {
    pub node_id: NodeId,
    pub queues: &'a mut FrameQueues,
    pub classes: &'a mut CommandClassSet,
    pub labels: &'a MetricLabels,
}

impl NodeContext for NodeScope<'_> {
    fn node_id(&self) -> NodeId {
        self.node_id
    }

    fn queue_frame(&mut self, frame: DataFrame) {
        enqueue(self.queues, self.labels, frame, true);
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

//! Node bring-up state machine.
//!
//! [`Lifecycle::step`] is a pure function from the current state and an event
//! to a [`Transition`]: the next state, if any, and the effects the node must
//! carry out. The node applies both; nothing here touches queues or handlers.

use std::fmt;

use serde::Serialize;

/// Node-info requests allowed to fail before discovery gives up on them.
pub const MAX_NODE_INFO_RETRIES: u8 = 1;

/// Bring-up states, in the only order a node moves through them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NodeState {
    /// Waiting for the node's supported command classes.
    NodeInfo,
    /// Version command class present; version startup frames not queued yet.
    RetrieveVersionPending,
    /// Version startup frames queued; waiting for them to go out.
    RetrieveVersionCompleted,
    /// Startup frames of the remaining classes not queued yet.
    RetrieveStatePending,
    /// All startup frames queued; waiting for them to go out.
    RetrieveStateCompleted,
    /// Ready for normal operation.
    Started,
}

impl NodeState {
    /// Label for metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            NodeState::NodeInfo => "node_info",
            NodeState::RetrieveVersionPending => "retrieve_version_pending",
            NodeState::RetrieveVersionCompleted => "retrieve_version_completed",
            NodeState::RetrieveStatePending => "retrieve_state_pending",
            NodeState::RetrieveStateCompleted => "retrieve_state_completed",
            NodeState::Started => "started",
        }
    }
}

impl fmt::Display for NodeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            NodeState::NodeInfo => "NODEINFO",
            NodeState::RetrieveVersionPending => "RETRIEVE_VERSION_PENDING",
            NodeState::RetrieveVersionCompleted => "RETRIEVE_VERSION_COMPLETED",
            NodeState::RetrieveStatePending => "RETRIEVE_STATE_PENDING",
            NodeState::RetrieveStateCompleted => "RETRIEVE_STATE_COMPLETED",
            NodeState::Started => "STARTED",
        };
        f.write_str(name)
    }
}

/// Something that happened to a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleEvent {
    /// Start of a driver cycle.
    Tick,
    /// No transaction outstanding and nothing left in the write queue.
    QueueDrained,
    /// The controller could not get node info from the device.
    NodeInfoFailed,
    /// The device reported its node info.
    NodeInfoReceived {
        /// Whether the version command class is now registered.
        has_version_class: bool,
    },
}

/// Work the node must do as part of a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Effect {
    /// Queue another node-info request.
    RequestNodeInfo,
    /// Have the version command class queue its startup frames.
    QueueVersionStartup,
    /// Have every command class queue its startup frames.
    QueueAllStartup,
    /// Move deferred frames into the write queue.
    FlushWakeupQueue,
    /// Queue the device profile's refresh frames.
    Refresh,
    /// Tell the node listener the node is ready.
    NotifyStarted,
}

/// Outcome of one [`Lifecycle::step`].
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Transition {
    /// State to enter, if the state changes.
    pub next: Option<NodeState>,
    /// Whether this is a retry within the current state.
    pub retried: bool,
    /// Effects to apply, in order.
    pub effects: Vec<Effect>,
}

impl Transition {
    fn stay() -> Self {
        Transition::default()
    }

    fn to(next: NodeState, effects: Vec<Effect>) -> Self {
        Transition {
            next: Some(next),
            retried: false,
            effects,
        }
    }

    fn effects(effects: Vec<Effect>) -> Self {
        Transition {
            effects,
            ..Transition::default()
        }
    }
}

/// Current state plus the retry counter for that state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lifecycle {
    state: NodeState,
    retries: u8,
}

impl Default for Lifecycle {
    fn default() -> Self {
        Self::new()
    }
}

impl Lifecycle {
    pub fn new() -> Self {
        Lifecycle {
            state: NodeState::NodeInfo,
            retries: 0,
        }
    }

    pub fn state(&self) -> NodeState {
        self.state
    }

    pub fn retries(&self) -> u8 {
        self.retries
    }

    /// Compute the transition for `event` without applying it.
    pub fn step(&self, event: LifecycleEvent) -> Transition {
        use LifecycleEvent::*;
        use NodeState::*;

        match (self.state, event) {
            (RetrieveVersionPending, Tick) => {
                Transition::to(RetrieveVersionCompleted, vec![Effect::QueueVersionStartup])
            }
            (RetrieveStatePending, Tick) => {
                Transition::to(RetrieveStateCompleted, vec![Effect::QueueAllStartup])
            }
            (RetrieveVersionCompleted, QueueDrained) => Transition::to(RetrieveStatePending, vec![]),
            (RetrieveStateCompleted, QueueDrained) => {
                Transition::to(Started, vec![Effect::NotifyStarted])
            }

            (NodeInfo, NodeInfoFailed) if self.retries < MAX_NODE_INFO_RETRIES => Transition {
                next: None,
                retried: true,
                effects: vec![Effect::RequestNodeInfo],
            },
            (NodeInfo, NodeInfoFailed) => Transition::to(RetrieveStatePending, vec![]),
            (NodeInfo, NodeInfoReceived { has_version_class: true }) => {
                Transition::to(RetrieveVersionPending, vec![])
            }
            (NodeInfo, NodeInfoReceived { has_version_class: false }) => {
                Transition::to(RetrieveStatePending, vec![])
            }

            // Past discovery, any node info update just proves the device is awake.
            (_, NodeInfoReceived { .. }) | (_, NodeInfoFailed) => {
                Transition::effects(vec![Effect::FlushWakeupQueue, Effect::Refresh])
            }

            _ => Transition::stay(),
        }
    }

    /// Apply a transition computed by [`Lifecycle::step`].
    pub fn apply(&mut self, transition: &Transition) {
        if let Some(next) = transition.next {
            self.state = next;
            self.retries = 0;
        } else if transition.retried {
            self.retries = self.retries.saturating_add(1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(state: NodeState) -> Lifecycle {
        Lifecycle { state, retries: 0 }
    }

    #[test]
    fn test_initial_state() {
        let lifecycle = Lifecycle::new();
        assert_eq!(lifecycle.state(), NodeState::NodeInfo);
        assert_eq!(lifecycle.retries(), 0);
    }

    #[test]
    fn test_node_info_retry_then_degrade() {
        let mut lifecycle = Lifecycle::new();

        let first = lifecycle.step(LifecycleEvent::NodeInfoFailed);
        assert_eq!(first.next, None);
        assert!(first.retried);
        assert_eq!(first.effects, vec![Effect::RequestNodeInfo]);
        lifecycle.apply(&first);
        assert_eq!(lifecycle.retries(), 1);

        let second = lifecycle.step(LifecycleEvent::NodeInfoFailed);
        assert_eq!(second.next, Some(NodeState::RetrieveStatePending));
        assert!(second.effects.is_empty());
        lifecycle.apply(&second);
        assert_eq!(lifecycle.retries(), 0);
    }

    #[test]
    fn test_node_info_branches_on_version_class() {
        let lifecycle = Lifecycle::new();
        assert_eq!(
            lifecycle
                .step(LifecycleEvent::NodeInfoReceived { has_version_class: true })
                .next,
            Some(NodeState::RetrieveVersionPending)
        );
        assert_eq!(
            lifecycle
                .step(LifecycleEvent::NodeInfoReceived { has_version_class: false })
                .next,
            Some(NodeState::RetrieveStatePending)
        );
    }

    #[test]
    fn test_pending_states_advance_on_tick() {
        let version = at(NodeState::RetrieveVersionPending).step(LifecycleEvent::Tick);
        assert_eq!(version.next, Some(NodeState::RetrieveVersionCompleted));
        assert_eq!(version.effects, vec![Effect::QueueVersionStartup]);

        let state = at(NodeState::RetrieveStatePending).step(LifecycleEvent::Tick);
        assert_eq!(state.next, Some(NodeState::RetrieveStateCompleted));
        assert_eq!(state.effects, vec![Effect::QueueAllStartup]);
    }

    #[test]
    fn test_completed_states_wait_for_drain() {
        assert_eq!(at(NodeState::RetrieveVersionCompleted).step(LifecycleEvent::Tick), Transition::stay());
        assert_eq!(
            at(NodeState::RetrieveVersionCompleted)
                .step(LifecycleEvent::QueueDrained)
                .next,
            Some(NodeState::RetrieveStatePending)
        );

        let started = at(NodeState::RetrieveStateCompleted).step(LifecycleEvent::QueueDrained);
        assert_eq!(started.next, Some(NodeState::Started));
        assert_eq!(started.effects, vec![Effect::NotifyStarted]);
    }

    #[test]
    fn test_update_after_discovery_refreshes() {
        for state in [
            NodeState::RetrieveVersionPending,
            NodeState::RetrieveStateCompleted,
            NodeState::Started,
        ] {
            let transition =
                at(state).step(LifecycleEvent::NodeInfoReceived { has_version_class: true });
            assert_eq!(transition.next, None);
            assert_eq!(
                transition.effects,
                vec![Effect::FlushWakeupQueue, Effect::Refresh]
            );
        }
    }

    #[test]
    fn test_failed_update_after_discovery_refreshes() {
        for state in [NodeState::RetrieveStatePending, NodeState::Started] {
            let transition = at(state).step(LifecycleEvent::NodeInfoFailed);
            assert_eq!(transition.next, None);
            assert!(!transition.retried);
            assert_eq!(
                transition.effects,
                vec![Effect::FlushWakeupQueue, Effect::Refresh]
            );
        }
    }

    #[test]
    fn test_started_is_terminal() {
        let started = at(NodeState::Started);
        for event in [LifecycleEvent::Tick, LifecycleEvent::QueueDrained] {
            assert_eq!(started.step(event), Transition::stay());
        }
    }

    #[test]
    fn test_states_are_ordered() {
        assert!(NodeState::NodeInfo < NodeState::RetrieveVersionPending);
        assert!(NodeState::RetrieveStateCompleted < NodeState::Started);
        assert_eq!(NodeState::RetrieveVersionPending.to_string(), "RETRIEVE_VERSION_PENDING");
    }
}

//! Z-Wave Node Stack
//!
//! Controller-side representation of Z-Wave devices. Each [`ZWaveNode`] walks a
//! device through capability discovery, keeps at most one transaction in
//! flight, defers frames for sleeping devices and routes inbound payloads to
//! its [`CommandClass`] handlers.
//!
//! # Bring-up
//!
//! ```text
//! NODEINFO ──► RETRIEVE_VERSION_PENDING ──► RETRIEVE_VERSION_COMPLETED
//!    │                                                  │
//!    └────────────────► RETRIEVE_STATE_PENDING ◄────────┘
//!                               │
//!                               ▼
//!                   RETRIEVE_STATE_COMPLETED ──► STARTED
//! ```
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use zwave_frame::{DataFrame, NodeId, NodeProtocolInfo};
//! use zwave_node::{NodeState, StandardCommandClasses, ZWaveNode};
//!
//! let info = NodeProtocolInfo::new(0x04, 0x10, 0x01, true);
//! let mut node = ZWaveNode::new(NodeId(5), info, Arc::new(StandardCommandClasses));
//!
//! let mut sent: Vec<DataFrame> = Vec::new();
//! node.tick(&mut sent);
//! assert_eq!(sent.len(), 1);
//! assert_eq!(node.state(), NodeState::NodeInfo);
//! ```

pub mod command_class;
pub mod node;

pub use command_class::{
    BasicCommandClass, BinarySwitchCommandClass, CommandClass, CommandClassFactory,
    CommandClassSet, ManufacturerSpecificCommandClass, MultilevelSwitchCommandClass,
    ProductIdentity, StandardCommandClasses, VersionCommandClass, DEFAULT_VERSION,
};
pub use node::{
    profile_for_generic_class, BinarySwitchProfile, DeviceProfile, Effect, GenericProfile,
    Lifecycle, LifecycleEvent, MultilevelSwitchProfile, NodeContext, NodeListener, NodeState,
    Transition, Transport, ZWaveNode, MAX_NODE_INFO_RETRIES,
};

//! Z-Wave Network Runner
//!
//! Drives the node stack against a simulated network described by a YAML
//! model: a [`Controller`] owns the nodes and ticks them, a
//! [`SimulatedNetwork`] plays the devices.

pub mod controller;
pub mod device;
pub mod model;
pub mod summary;

use thiserror::Error;

pub use controller::Controller;
pub use device::{InboundFrame, Network, SimulatedDevice, SimulatedNetwork};
pub use model::{load_model, load_model_from_str, DeviceModel, ModelError, NetworkModel};
pub use summary::{NetworkSummary, NodeSummary};

use zwave_frame::NodeId;

/// Errors that can occur while setting up or reporting a run.
#[derive(Debug, Error)]
pub enum RunnerError {
    #[error("Model error: {0}")]
    Model(#[from] ModelError),

    #[error("Node {0} added twice")]
    DuplicateNode(u8),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Build a controller with one node per device of `model`.
pub fn build_controller(model: &NetworkModel) -> Result<Controller<SimulatedNetwork>, RunnerError> {
    let mut controller = Controller::new(SimulatedNetwork::from_model(model));
    for device in &model.nodes {
        controller.add_node(NodeId(device.id), device.protocol_info())?;
    }
    Ok(controller)
}

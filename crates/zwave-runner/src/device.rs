//! Simulated devices and the network that connects them to the controller.
//!
//! Devices answer the frames the node stack sends with the replies a real
//! device would give. Sleeping devices are only reachable for a few cycles
//! after each wake-up, which they announce with an unsolicited node info
//! update.

use std::collections::BTreeMap;

use tracing::{debug, trace, warn};
use zwave_frame::{
    ApplicationCommand, ApplicationUpdate, DataFrame, NodeId, NodeInfo, SendData,
    COMMAND_CLASS_BASIC, COMMAND_CLASS_MANUFACTURER_SPECIFIC, COMMAND_CLASS_SWITCH_BINARY,
    COMMAND_CLASS_SWITCH_MULTILEVEL, COMMAND_CLASS_VERSION,
};
use zwave_node::Transport;

use crate::model::{DeviceModel, NetworkModel};

const CMD_SET: u8 = 0x01;
const CMD_GET: u8 = 0x02;
const CMD_REPORT: u8 = 0x03;
const MANUFACTURER_SPECIFIC_GET: u8 = 0x04;
const MANUFACTURER_SPECIFIC_REPORT: u8 = 0x05;
const VERSION_GET: u8 = 0x11;
const VERSION_REPORT: u8 = 0x12;
const VERSION_COMMAND_CLASS_GET: u8 = 0x13;
const VERSION_COMMAND_CLASS_REPORT: u8 = 0x14;

const MAX_LEVEL: u8 = 99;
const RESTORE_LEVEL: u8 = 0xFF;

/// A frame delivered to the controller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundFrame {
    pub frame: DataFrame,
    /// Not a reply to the frame the controller last sent.
    pub unsolicited: bool,
}

/// The controller's side of the radio: sends frames and, once per cycle,
/// collects what came back.
pub trait Network: Transport {
    /// Advance by one cycle and return the frames received since the last poll.
    fn poll(&mut self) -> Vec<InboundFrame>;
}

// ============================================================================
// Device
// ============================================================================

#[derive(Debug)]
pub struct SimulatedDevice {
    model: DeviceModel,
    node_id: NodeId,
    failures_left: u32,
    level: u8,
    awake_for: u32,
    asleep_for: u32,
}

impl SimulatedDevice {
    pub fn new(model: DeviceModel) -> Self {
        SimulatedDevice {
            node_id: NodeId(model.id),
            failures_left: model.fail_node_info,
            level: model.level,
            awake_for: 0,
            asleep_for: model.wake_interval.unwrap_or(0),
            model,
        }
    }

    pub fn node_id(&self) -> NodeId {
        self.node_id
    }

    pub fn model(&self) -> &DeviceModel {
        &self.model
    }

    pub fn level(&self) -> u8 {
        self.level
    }

    /// Whether a frame sent now would reach the device.
    pub fn is_reachable(&self) -> bool {
        self.model.listening || self.awake_for > 0
    }

    /// Advance one cycle. A sleeping device that wakes up returns its
    /// announcement.
    pub fn advance(&mut self) -> Option<DataFrame> {
        if self.model.listening {
            return None;
        }
        if self.awake_for > 0 {
            self.awake_for -= 1;
            if self.awake_for == 0 {
                debug!("Device {} going back to sleep", self.node_id);
                self.asleep_for = self.model.wake_interval.unwrap_or(0);
            }
            return None;
        }
        self.asleep_for = self.asleep_for.saturating_sub(1);
        if self.asleep_for > 0 {
            return None;
        }
        debug!("Device {} woke up", self.node_id);
        self.awake_for = self.model.awake_cycles.max(1);
        Some(self.node_info())
    }

    /// Answer a frame from the controller, if the device answers it at all.
    pub fn handle(&mut self, frame: &DataFrame) -> Option<DataFrame> {
        match frame {
            DataFrame::RequestNodeInfo(_) => {
                if !self.is_reachable() {
                    return Some(ApplicationUpdate::request_failed().into());
                }
                if self.failures_left > 0 {
                    self.failures_left -= 1;
                    debug!(
                        "Device {} failing node info request ({} more)",
                        self.node_id, self.failures_left
                    );
                    return Some(ApplicationUpdate::request_failed().into());
                }
                Some(self.node_info())
            }
            DataFrame::SendData(send) => {
                if !self.is_reachable() {
                    trace!("Device {} asleep, {} lost", self.node_id, send.label);
                    return None;
                }
                let payload = self.answer(send)?;
                ApplicationCommand::new(self.node_id, payload)
                    .ok()
                    .map(DataFrame::from)
            }
            _ => None,
        }
    }

    fn node_info(&self) -> DataFrame {
        let info = self.model.protocol_info();
        ApplicationUpdate::node_info_received(
            self.node_id,
            NodeInfo {
                basic_device_class: info.basic_device_class,
                generic_device_class: info.generic_device_class,
                specific_device_class: info.specific_device_class,
                command_classes: self.model.command_class_ids(),
            },
        )
        .into()
    }

    fn supports(&self, class_id: u8) -> bool {
        self.model.class_version(class_id) > 0
    }

    fn answer(&mut self, send: &SendData) -> Option<Vec<u8>> {
        let class_id = send.command_class_id()?;
        let command = send.command()?;
        if !self.supports(class_id) {
            trace!("Device {} ignoring {}", self.node_id, send.label);
            return None;
        }
        let argument = send.payload.get(2).copied();

        match (class_id, command) {
            (COMMAND_CLASS_BASIC, CMD_GET) => Some(vec![class_id, CMD_REPORT, self.level]),
            (COMMAND_CLASS_BASIC, CMD_SET) => {
                self.level = argument?;
                Some(vec![class_id, CMD_REPORT, self.level])
            }
            (COMMAND_CLASS_SWITCH_BINARY, CMD_GET) => {
                Some(vec![class_id, CMD_REPORT, self.switch_value()])
            }
            (COMMAND_CLASS_SWITCH_BINARY, CMD_SET) => {
                self.level = argument?;
                Some(vec![class_id, CMD_REPORT, self.switch_value()])
            }
            (COMMAND_CLASS_SWITCH_MULTILEVEL, CMD_GET) => {
                Some(vec![class_id, CMD_REPORT, self.level])
            }
            (COMMAND_CLASS_SWITCH_MULTILEVEL, CMD_SET) => {
                self.level = match argument? {
                    RESTORE_LEVEL if self.level == 0 => MAX_LEVEL,
                    RESTORE_LEVEL => self.level,
                    level => level.min(MAX_LEVEL),
                };
                Some(vec![class_id, CMD_REPORT, self.level])
            }
            (COMMAND_CLASS_MANUFACTURER_SPECIFIC, MANUFACTURER_SPECIFIC_GET) => {
                let identity = self.model.manufacturer.unwrap_or_default();
                let mut report = vec![class_id, MANUFACTURER_SPECIFIC_REPORT];
                report.extend_from_slice(&identity.manufacturer_id.to_be_bytes());
                report.extend_from_slice(&identity.product_type_id.to_be_bytes());
                report.extend_from_slice(&identity.product_id.to_be_bytes());
                Some(report)
            }
            (COMMAND_CLASS_VERSION, VERSION_GET) => {
                let firmware = self.model.firmware;
                Some(vec![
                    class_id,
                    VERSION_REPORT,
                    firmware.library,
                    firmware.protocol.0,
                    firmware.protocol.1,
                    firmware.application.0,
                    firmware.application.1,
                ])
            }
            (COMMAND_CLASS_VERSION, VERSION_COMMAND_CLASS_GET) => {
                let queried = argument?;
                Some(vec![
                    class_id,
                    VERSION_COMMAND_CLASS_REPORT,
                    queried,
                    self.model.class_version(queried),
                ])
            }
            _ => {
                trace!("Device {} has no answer to {}", self.node_id, send.label);
                None
            }
        }
    }

    fn switch_value(&self) -> u8 {
        if self.level > 0 {
            0xFF
        } else {
            0x00
        }
    }
}

// ============================================================================
// Network
// ============================================================================

/// All simulated devices, reachable by node id.
#[derive(Debug, Default)]
pub struct SimulatedNetwork {
    devices: BTreeMap<u8, SimulatedDevice>,
    inbound: Vec<InboundFrame>,
    frames_sent: u64,
}

impl SimulatedNetwork {
    pub fn new() -> Self {
        SimulatedNetwork::default()
    }

    pub fn from_model(model: &NetworkModel) -> Self {
        let mut network = SimulatedNetwork::new();
        for device in &model.nodes {
            network.add_device(SimulatedDevice::new(device.clone()));
        }
        network
    }

    pub fn add_device(&mut self, device: SimulatedDevice) {
        self.devices.insert(device.node_id().as_u8(), device);
    }

    pub fn device(&self, node_id: NodeId) -> Option<&SimulatedDevice> {
        self.devices.get(&node_id.as_u8())
    }

    pub fn devices(&self) -> impl Iterator<Item = &SimulatedDevice> {
        self.devices.values()
    }

    /// Frames handed to the network so far.
    pub fn frames_sent(&self) -> u64 {
        self.frames_sent
    }
}

/// Hex dump of a frame body for trace logs.
fn frame_dump(frame: &DataFrame) -> String {
    match frame.encode() {
        Ok(body) => hex::encode(body),
        Err(e) => format!("unencodable: {}", e),
    }
}

impl Transport for SimulatedNetwork {
    fn send(&mut self, frame: &DataFrame) {
        self.frames_sent += 1;
        trace!("-> {} [{}]", frame, frame_dump(frame));

        let Some(node_id) = frame.node_id() else {
            warn!("Frame without destination: {}", frame);
            return;
        };
        let Some(device) = self.devices.get_mut(&node_id.as_u8()) else {
            warn!("No device at node {}, dropping {}", node_id, frame);
            return;
        };
        if let Some(reply) = device.handle(frame) {
            trace!("<- {} [{}]", reply, frame_dump(&reply));
            self.inbound.push(InboundFrame {
                frame: reply,
                unsolicited: false,
            });
        }
    }
}

impl Network for SimulatedNetwork {
    fn poll(&mut self) -> Vec<InboundFrame> {
        for device in self.devices.values_mut() {
            if let Some(announcement) = device.advance() {
                self.inbound.push(InboundFrame {
                    frame: announcement,
                    unsolicited: true,
                });
            }
        }
        std::mem::take(&mut self.inbound)
    }
}

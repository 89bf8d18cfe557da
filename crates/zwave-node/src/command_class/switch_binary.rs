//! Binary switch command class.

use std::any::Any;

use tracing::{debug, warn};
use zwave_frame::{
    ApplicationCommand, DataFrame, FrameResult, NodeId, SendData, COMMAND_CLASS_BASIC,
    COMMAND_CLASS_SWITCH_BINARY,
};

use super::{command_byte, expect_class, require_payload, CommandClass, DEFAULT_VERSION};
use crate::node::NodeContext;

const SWITCH_BINARY_SET: u8 = 0x01;
const SWITCH_BINARY_GET: u8 = 0x02;
const SWITCH_BINARY_REPORT: u8 = 0x03;

/// Binary switch command class handler.
///
/// Basic payloads are accepted too: binary switch profiles map Basic onto this
/// class, and the two share command codes.
#[derive(Debug, Clone)]
pub struct BinarySwitchCommandClass {
    version: u8,
    is_on: Option<bool>,
}

impl Default for BinarySwitchCommandClass {
    fn default() -> Self {
        Self::new()
    }
}

impl BinarySwitchCommandClass {
    /// Command class id.
    pub const ID: u8 = COMMAND_CLASS_SWITCH_BINARY;

    /// Create a handler with unknown switch state.
    pub fn new() -> Self {
        BinarySwitchCommandClass {
            version: DEFAULT_VERSION,
            is_on: None,
        }
    }

    /// Last reported state.
    pub fn is_on(&self) -> Option<bool> {
        self.is_on
    }

    /// SWITCH_BINARY_GET.
    pub fn create_get(node_id: NodeId) -> DataFrame {
        SendData::new(
            "SWITCH_BINARY_GET",
            node_id,
            vec![Self::ID, SWITCH_BINARY_GET],
            true,
        )
        .into()
    }

    /// SWITCH_BINARY_SET.
    pub fn create_set(node_id: NodeId, on: bool) -> DataFrame {
        let value = if on { 0xFF } else { 0x00 };
        SendData::new(
            "SWITCH_BINARY_SET",
            node_id,
            vec![Self::ID, SWITCH_BINARY_SET, value],
            false,
        )
        .into()
    }
}

impl CommandClass for BinarySwitchCommandClass {
    fn id(&self) -> u8 {
        Self::ID
    }

    fn name(&self) -> &'static str {
        "COMMAND_CLASS_SWITCH_BINARY"
    }

    fn version(&self) -> u8 {
        self.version
    }

    fn set_version(&mut self, version: u8) {
        self.version = version;
    }

    fn on_data_frame(
        &mut self,
        frame: &ApplicationCommand,
        _ctx: &mut dyn NodeContext,
    ) -> FrameResult<()> {
        let ccb = expect_class(frame, &[Self::ID, COMMAND_CLASS_BASIC])?;
        match command_byte(ccb)? {
            SWITCH_BINARY_SET | SWITCH_BINARY_REPORT => {
                require_payload(ccb, 3)?;
                let on = ccb[2] != 0x00;
                debug!("Switch state from node {}: {}", frame.node_id, on);
                self.is_on = Some(on);
            }
            other => warn!("Ignoring unsupported binary switch command 0x{:02X}", other),
        }
        Ok(())
    }

    fn queue_startup_messages(&self, node_id: NodeId, ctx: &mut dyn NodeContext) {
        ctx.queue_frame(Self::create_get(node_id));
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

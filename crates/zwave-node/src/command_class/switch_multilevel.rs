//! Multilevel switch command class.
//!
//! Version 2 adds a dimming duration byte to `SWITCH_MULTILEVEL_SET`, so the
//! encoding of a set depends on the version negotiated with the device.

use std::any::Any;

use tracing::{debug, warn};
use zwave_frame::{
    ApplicationCommand, DataFrame, FrameResult, NodeId, SendData, COMMAND_CLASS_BASIC,
    COMMAND_CLASS_SWITCH_MULTILEVEL,
};

use super::{command_byte, expect_class, require_payload, CommandClass, DEFAULT_VERSION};
use crate::node::NodeContext;

const SWITCH_MULTILEVEL_SET: u8 = 0x01;
const SWITCH_MULTILEVEL_GET: u8 = 0x02;
const SWITCH_MULTILEVEL_REPORT: u8 = 0x03;

/// Highest dimming level a SET may carry.
pub const MAX_LEVEL: u8 = 99;
/// Level value asking the device to restore its previous level.
pub const RESTORE_LEVEL: u8 = 0xFF;
/// Duration byte meaning "use the device's default dimming rate".
pub const DEFAULT_DURATION: u8 = 0xFF;

/// Multilevel switch command class handler.
#[derive(Debug, Clone)]
pub struct MultilevelSwitchCommandClass {
    version: u8,
    level: Option<u8>,
}

impl Default for MultilevelSwitchCommandClass {
    fn default() -> Self {
        Self::new()
    }
}

impl MultilevelSwitchCommandClass {
    /// Command class id.
    pub const ID: u8 = COMMAND_CLASS_SWITCH_MULTILEVEL;

    /// Create a handler with unknown level.
    pub fn new() -> Self {
        MultilevelSwitchCommandClass {
            version: DEFAULT_VERSION,
            level: None,
        }
    }

    /// Last reported level.
    pub fn level(&self) -> Option<u8> {
        self.level
    }

    /// SWITCH_MULTILEVEL_GET.
    pub fn create_get(node_id: NodeId) -> DataFrame {
        SendData::new(
            "SWITCH_MULTILEVEL_GET",
            node_id,
            vec![Self::ID, SWITCH_MULTILEVEL_GET],
            true,
        )
        .into()
    }

    /// SWITCH_MULTILEVEL_SET in the encoding of the negotiated version.
    pub fn create_set(&self, node_id: NodeId, level: u8) -> DataFrame {
        let level = if level == RESTORE_LEVEL {
            level
        } else {
            level.min(MAX_LEVEL)
        };
        let mut payload = vec![Self::ID, SWITCH_MULTILEVEL_SET, level];
        if self.version >= 2 {
            payload.push(DEFAULT_DURATION);
        }
        SendData::new("SWITCH_MULTILEVEL_SET", node_id, payload, false).into()
    }
}

impl CommandClass for MultilevelSwitchCommandClass {
    fn id(&self) -> u8 {
        Self::ID
    }

    fn name(&self) -> &'static str {
        "COMMAND_CLASS_SWITCH_MULTILEVEL"
    }

    fn version(&self) -> u8 {
        self.version
    }

    fn set_version(&mut self, version: u8) {
        self.version = version;
    }

    fn max_supported_version(&self) -> u8 {
        2
    }

    fn on_data_frame(
        &mut self,
        frame: &ApplicationCommand,
        _ctx: &mut dyn NodeContext,
    ) -> FrameResult<()> {
        let ccb = expect_class(frame, &[Self::ID, COMMAND_CLASS_BASIC])?;
        match command_byte(ccb)? {
            SWITCH_MULTILEVEL_SET | SWITCH_MULTILEVEL_REPORT => {
                require_payload(ccb, 3)?;
                debug!("Level from node {}: {}", frame.node_id, ccb[2]);
                self.level = Some(ccb[2]);
            }
            other => warn!(
                "Ignoring unsupported multilevel switch command 0x{:02X}",
                other
            ),
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

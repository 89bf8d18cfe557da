//! Basic command class.

use std::any::Any;

use tracing::{debug, warn};
use zwave_frame::{ApplicationCommand, DataFrame, FrameResult, NodeId, SendData, COMMAND_CLASS_BASIC};

use super::{command_byte, expect_class, require_payload, CommandClass, DEFAULT_VERSION};
use crate::node::NodeContext;

const BASIC_SET: u8 = 0x01;
const BASIC_GET: u8 = 0x02;
const BASIC_REPORT: u8 = 0x03;

/// Basic command class handler.
///
/// Devices send `BASIC_SET` to the controller as well as `BASIC_REPORT`;
/// both update the recorded value.
#[derive(Debug, Clone)]
pub struct BasicCommandClass {
    version: u8,
    value: Option<u8>,
}

impl Default for BasicCommandClass {
    fn default() -> Self {
        Self::new()
    }
}

impl BasicCommandClass {
    /// Command class id.
    pub const ID: u8 = COMMAND_CLASS_BASIC;

    /// Create a handler with no known value.
    pub fn new() -> Self {
        BasicCommandClass {
            version: DEFAULT_VERSION,
            value: None,
        }
    }

    /// Last value the device reported.
    pub fn value(&self) -> Option<u8> {
        self.value
    }

    /// BASIC_GET.
    pub fn create_get(node_id: NodeId) -> DataFrame {
        SendData::new("BASIC_GET", node_id, vec![Self::ID, BASIC_GET], true).into()
    }

    /// BASIC_SET.
    pub fn create_set(node_id: NodeId, value: u8) -> DataFrame {
        SendData::new("BASIC_SET", node_id, vec![Self::ID, BASIC_SET, value], false).into()
    }
}

impl CommandClass for BasicCommandClass {
    fn id(&self) -> u8 {
        Self::ID
    }

    fn name(&self) -> &'static str {
        "COMMAND_CLASS_BASIC"
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
        let ccb = expect_class(frame, &[Self::ID])?;
        match command_byte(ccb)? {
            BASIC_SET | BASIC_REPORT => {
                require_payload(ccb, 3)?;
                debug!("Basic value from node {}: {}", frame.node_id, ccb[2]);
                self.value = Some(ccb[2]);
            }
            other => warn!("Ignoring unsupported basic command 0x{:02X}", other),
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::testing::RecordingContext;

    #[test]
    fn test_report_and_set_update_value() {
        let mut cc = BasicCommandClass::new();
        let mut ctx = RecordingContext::new(NodeId(3));

        let report = ApplicationCommand::new(NodeId(3), vec![0x20, 0x03, 0x63]).unwrap();
        cc.on_data_frame(&report, &mut ctx).unwrap();
        assert_eq!(cc.value(), Some(0x63));

        let set = ApplicationCommand::new(NodeId(3), vec![0x20, 0x01, 0x00]).unwrap();
        cc.on_data_frame(&set, &mut ctx).unwrap();
        assert_eq!(cc.value(), Some(0x00));
    }

    #[test]
    fn test_startup_queues_get() {
        let mut ctx = RecordingContext::new(NodeId(3));
        BasicCommandClass::new().queue_startup_messages(NodeId(3), &mut ctx);
        assert_eq!(ctx.queued, vec![BasicCommandClass::create_get(NodeId(3))]);
    }
}

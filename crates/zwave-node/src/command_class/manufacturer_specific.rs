//! Manufacturer specific command class.

use std::any::Any;

use tracing::{debug, warn};
use zwave_frame::{
    ApplicationCommand, DataFrame, FrameResult, NodeId, SendData,
    COMMAND_CLASS_MANUFACTURER_SPECIFIC,
};

use super::{command_byte, expect_class, require_payload, CommandClass, DEFAULT_VERSION};
use crate::node::NodeContext;

const MANUFACTURER_SPECIFIC_GET: u8 = 0x04;
const MANUFACTURER_SPECIFIC_REPORT: u8 = 0x05;

/// Identity reported by a device: manufacturer, product type and product id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProductIdentity {
    /// Manufacturer id.
    pub manufacturer_id: u16,
    /// Product type id.
    pub product_type_id: u16,
    /// Product id.
    pub product_id: u16,
}

/// Manufacturer specific command class handler.
#[derive(Debug, Clone)]
pub struct ManufacturerSpecificCommandClass {
    version: u8,
    identity: Option<ProductIdentity>,
}

impl Default for ManufacturerSpecificCommandClass {
    fn default() -> Self {
        Self::new()
    }
}

impl ManufacturerSpecificCommandClass {
    /// Command class id.
    pub const ID: u8 = COMMAND_CLASS_MANUFACTURER_SPECIFIC;

    /// Create a handler with no identity learned yet.
    pub fn new() -> Self {
        ManufacturerSpecificCommandClass {
            version: DEFAULT_VERSION,
            identity: None,
        }
    }

    /// Identity from the last report.
    pub fn identity(&self) -> Option<ProductIdentity> {
        self.identity
    }

    /// MANUFACTURER_SPECIFIC_GET.
    pub fn create_get(node_id: NodeId) -> DataFrame {
        SendData::new(
            "MANUFACTURER_SPECIFIC_GET",
            node_id,
            vec![Self::ID, MANUFACTURER_SPECIFIC_GET],
            true,
        )
        .into()
    }
}

impl CommandClass for ManufacturerSpecificCommandClass {
    fn id(&self) -> u8 {
        Self::ID
    }

    fn name(&self) -> &'static str {
        "COMMAND_CLASS_MANUFACTURER_SPECIFIC"
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
            MANUFACTURER_SPECIFIC_REPORT => {
                require_payload(ccb, 8)?;
                let identity = ProductIdentity {
                    manufacturer_id: u16::from_be_bytes([ccb[2], ccb[3]]),
                    product_type_id: u16::from_be_bytes([ccb[4], ccb[5]]),
                    product_id: u16::from_be_bytes([ccb[6], ccb[7]]),
                };
                debug!("Node {} identity: {:?}", frame.node_id, identity);
                self.identity = Some(identity);
            }
            other => warn!(
                "Ignoring unsupported manufacturer specific command 0x{:02X}",
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

//! Version command class.
//!
//! Learns the device's library/protocol/application versions and the version
//! of every other command class the node supports.
//!
//! ```text
//! VERSION_REPORT               : 0x86 | 0x12 | library | proto_major | proto_minor | app_major | app_minor
//! VERSION_COMMAND_CLASS_REPORT : 0x86 | 0x14 | class_id | version
//! ```

use std::any::Any;

use tracing::{debug, error, warn};
use zwave_frame::{
    hex_byte, ApplicationCommand, DataFrame, FrameResult, NodeId, SendData, COMMAND_CLASS_VERSION,
};

use super::{command_byte, expect_class, require_payload, CommandClass, DEFAULT_VERSION};
use crate::node::NodeContext;

const VERSION_GET: u8 = 0x11;
const VERSION_REPORT: u8 = 0x12;
const VERSION_COMMAND_CLASS_GET: u8 = 0x13;
const VERSION_COMMAND_CLASS_REPORT: u8 = 0x14;

/// Offset of the first report field, past the class id and command bytes.
const REPORT_START: usize = 2;

/// Version command class handler.
#[derive(Debug, Clone)]
pub struct VersionCommandClass {
    version: u8,
    library: Option<String>,
    protocol: Option<String>,
    application: Option<String>,
}

impl Default for VersionCommandClass {
    fn default() -> Self {
        Self::new()
    }
}

impl VersionCommandClass {
    /// Command class id.
    pub const ID: u8 = COMMAND_CLASS_VERSION;

    /// Create a handler with nothing learned yet.
    pub fn new() -> Self {
        VersionCommandClass {
            version: DEFAULT_VERSION,
            library: None,
            protocol: None,
            application: None,
        }
    }

    /// Z-Wave library type, e.g. `"3"`.
    pub fn library(&self) -> Option<&str> {
        self.library.as_deref()
    }

    /// Z-Wave protocol version, e.g. `"4.5"`.
    pub fn protocol(&self) -> Option<&str> {
        self.protocol.as_deref()
    }

    /// Application firmware version, e.g. `"2.5"`.
    pub fn application(&self) -> Option<&str> {
        self.application.as_deref()
    }

    /// VERSION_GET for the device as a whole.
    pub fn create_get(node_id: NodeId) -> DataFrame {
        SendData::new("VERSION_GET", node_id, vec![Self::ID, VERSION_GET], true).into()
    }

    /// VERSION_COMMAND_CLASS_GET for one command class.
    pub fn create_command_class_get(node_id: NodeId, command_class: u8) -> DataFrame {
        SendData::new(
            "VERSION_COMMAND_CLASS_GET",
            node_id,
            vec![Self::ID, VERSION_COMMAND_CLASS_GET, command_class],
            true,
        )
        .into()
    }

    fn on_version_report(&mut self, ccb: &[u8]) -> FrameResult<()> {
        require_payload(ccb, REPORT_START + 5)?;
        let fields = &ccb[REPORT_START..];
        self.library = Some(format!("{}", fields[0]));
        self.protocol = Some(format!("{}.{}", fields[1], fields[2]));
        self.application = Some(format!("{}.{}", fields[3], fields[4]));
        debug!(
            "Device version: library={}, protocol={}, application={}",
            fields[0],
            self.protocol.as_deref().unwrap_or_default(),
            self.application.as_deref().unwrap_or_default()
        );
        Ok(())
    }

    fn on_command_class_report(&mut self, ccb: &[u8], ctx: &mut dyn NodeContext) -> FrameResult<()> {
        require_payload(ccb, REPORT_START + 2)?;
        let class_id = ccb[REPORT_START];
        let version = ccb[REPORT_START + 1];

        // This handler is detached from the node while it runs.
        if class_id == Self::ID {
            debug!("Setting command class {} to version {}", self.name(), version);
            self.version = version;
            return Ok(());
        }

        match ctx.command_class_mut(class_id) {
            Some(cc) => {
                debug!("Setting command class {} to version {}", cc.name(), version);
                cc.set_version(version);
            }
            None => {
                error!(
                    "Received version for unknown command class: {}",
                    hex_byte(class_id)
                );
            }
        }
        Ok(())
    }
}

impl CommandClass for VersionCommandClass {
    fn id(&self) -> u8 {
        Self::ID
    }

    fn name(&self) -> &'static str {
        "COMMAND_CLASS_VERSION"
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
        ctx: &mut dyn NodeContext,
    ) -> FrameResult<()> {
        let ccb = expect_class(frame, &[Self::ID])?;
        match command_byte(ccb)? {
            VERSION_REPORT => self.on_version_report(ccb),
            VERSION_COMMAND_CLASS_REPORT => self.on_command_class_report(ccb, ctx),
            other => {
                warn!("Ignoring unsupported version command 0x{:02X}", other);
                Ok(())
            }
        }
    }

    fn queue_startup_messages(&self, node_id: NodeId, ctx: &mut dyn NodeContext) {
        ctx.queue_frame(Self::create_get(node_id));

        // Version 1 is assumed already, so only ask about classes that can be newer.
        let queried: Vec<u8> = ctx
            .command_classes()
            .into_iter()
            .filter(|cc| cc.max_supported_version() > DEFAULT_VERSION)
            .map(|cc| cc.id())
            .collect();
        for class_id in queried {
            ctx.queue_frame(Self::create_command_class_get(node_id, class_id));
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command_class::{BasicCommandClass, CommandClassSet, MultilevelSwitchCommandClass};
    use crate::node::testing::RecordingContext;
    use zwave_frame::{FrameError, COMMAND_CLASS_SWITCH_MULTILEVEL};

    fn command(payload: Vec<u8>) -> ApplicationCommand {
        ApplicationCommand::new(NodeId(2), payload).expect("non-empty payload")
    }

    #[test]
    fn test_version_report_fixed_fields() {
        let mut cc = VersionCommandClass::new();
        let mut ctx = RecordingContext::new(NodeId(2));
        cc.on_data_frame(&command(vec![0x86, 0x12, 3, 4, 0, 2, 5]), &mut ctx)
            .expect("valid report");

        assert_eq!(cc.library(), Some("3"));
        assert_eq!(cc.protocol(), Some("4.0"));
        assert_eq!(cc.application(), Some("2.5"));
        assert!(ctx.queued.is_empty());
    }

    #[test]
    fn test_version_report_minor_not_padded() {
        let mut cc = VersionCommandClass::new();
        let mut ctx = RecordingContext::new(NodeId(2));
        cc.on_data_frame(&command(vec![0x86, 0x12, 6, 3, 7, 1, 12]), &mut ctx)
            .expect("valid report");

        assert_eq!(cc.protocol(), Some("3.7"));
        assert_eq!(cc.application(), Some("1.12"));
    }

    #[test]
    fn test_version_report_too_short() {
        let mut cc = VersionCommandClass::new();
        let mut ctx = RecordingContext::new(NodeId(2));
        let result = cc.on_data_frame(&command(vec![0x86, 0x12, 3, 4]), &mut ctx);

        assert_eq!(
            result,
            Err(FrameError::PayloadTooShort {
                command: 0x12,
                expected: 7,
                actual: 4
            })
        );
        assert_eq!(cc.library(), None);
    }

    #[test]
    fn test_command_class_report_sets_sibling_version() {
        let mut set = CommandClassSet::new();
        set.register(Box::new(MultilevelSwitchCommandClass::new()));
        let mut ctx = RecordingContext::with_classes(NodeId(2), set);

        let mut cc = VersionCommandClass::new();
        cc.on_data_frame(&command(vec![0x86, 0x14, COMMAND_CLASS_SWITCH_MULTILEVEL, 2]), &mut ctx)
            .expect("valid report");

        assert_eq!(
            ctx.classes
                .get(COMMAND_CLASS_SWITCH_MULTILEVEL)
                .map(|cc| cc.version()),
            Some(2)
        );
    }

    #[test]
    fn test_command_class_report_for_itself() {
        let mut cc = VersionCommandClass::new();
        let mut ctx = RecordingContext::new(NodeId(2));
        cc.on_data_frame(&command(vec![0x86, 0x14, 0x86, 2]), &mut ctx)
            .expect("valid report");
        assert_eq!(cc.version(), 2);
    }

    #[test]
    fn test_command_class_report_unknown_class_is_not_fatal() {
        let mut cc = VersionCommandClass::new();
        let mut ctx = RecordingContext::new(NodeId(2));
        let result = cc.on_data_frame(&command(vec![0x86, 0x14, 0x31, 5]), &mut ctx);
        assert!(result.is_ok());
    }

    #[test]
    fn test_unsupported_command_is_ignored() {
        let mut cc = VersionCommandClass::new();
        let mut ctx = RecordingContext::new(NodeId(2));
        assert!(cc.on_data_frame(&command(vec![0x86, 0x7F]), &mut ctx).is_ok());
    }

    #[test]
    fn test_wrong_class_rejected() {
        let mut cc = VersionCommandClass::new();
        let mut ctx = RecordingContext::new(NodeId(2));
        let result = cc.on_data_frame(&command(vec![0x20, 0x03, 0xFF]), &mut ctx);
        assert_eq!(
            result,
            Err(FrameError::UnexpectedCommandClass {
                expected: 0x86,
                actual: 0x20
            })
        );
    }

    #[test]
    fn test_startup_skips_version_one_classes() {
        let mut set = CommandClassSet::new();
        set.register(Box::new(BasicCommandClass::new()));
        set.register(Box::new(MultilevelSwitchCommandClass::new()));
        let mut ctx = RecordingContext::with_classes(NodeId(4), set);

        VersionCommandClass::new().queue_startup_messages(NodeId(4), &mut ctx);

        assert_eq!(
            ctx.queued,
            vec![
                VersionCommandClass::create_get(NodeId(4)),
                VersionCommandClass::create_command_class_get(
                    NodeId(4),
                    COMMAND_CLASS_SWITCH_MULTILEVEL
                ),
            ]
        );
    }
}

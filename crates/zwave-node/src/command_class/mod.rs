//! Command class framework.
//!
//! A command class is one capability of a device (switching, version
//! reporting, ...), identified by a one-byte id. Each node owns one handler
//! per supported class; handlers decode inbound payloads and queue whatever
//! frames they need through a [`NodeContext`].

use std::any::Any;
use std::collections::BTreeMap;
use std::fmt;

use tracing::debug;
use zwave_frame::{ApplicationCommand, FrameError, FrameResult, NodeId};

use crate::node::NodeContext;

mod basic;
mod manufacturer_specific;
mod switch_binary;
mod switch_multilevel;
mod version;

pub use basic::BasicCommandClass;
pub use manufacturer_specific::{ManufacturerSpecificCommandClass, ProductIdentity};
pub use switch_binary::BinarySwitchCommandClass;
pub use switch_multilevel::MultilevelSwitchCommandClass;
pub use version::VersionCommandClass;

/// Version every command class is assumed to speak until told otherwise.
pub const DEFAULT_VERSION: u8 = 1;

// ============================================================================
// Contract
// ============================================================================

/// The contract every command class handler satisfies.
pub trait CommandClass: fmt::Debug + Send {
    /// Command class id.
    fn id(&self) -> u8;

    /// Human-readable name, e.g. `COMMAND_CLASS_VERSION`.
    fn name(&self) -> &'static str;

    /// Version negotiated with the device.
    fn version(&self) -> u8;

    /// Record the version the device reported for this class.
    fn set_version(&mut self, version: u8);

    /// Highest version this implementation understands.
    ///
    /// Only classes returning more than 1 are worth a version query.
    fn max_supported_version(&self) -> u8 {
        DEFAULT_VERSION
    }

    /// Decode an inbound payload addressed to this class.
    ///
    /// The frame may be an unsolicited report. An error means the payload
    /// could not be interpreted; the node logs it and carries on.
    fn on_data_frame(
        &mut self,
        frame: &ApplicationCommand,
        ctx: &mut dyn NodeContext,
    ) -> FrameResult<()>;

    /// Queue the frames this class needs sent once at node bring-up.
    fn queue_startup_messages(&self, node_id: NodeId, ctx: &mut dyn NodeContext);

    /// Access to the concrete handler, for reading decoded state.
    fn as_any(&self) -> &dyn Any;
}

/// Checks that `frame` carries one of `accepted` classes and returns its payload.
pub(crate) fn expect_class<'a>(
    frame: &'a ApplicationCommand,
    accepted: &[u8],
) -> FrameResult<&'a [u8]> {
    let actual = frame.command_class_id();
    if !accepted.contains(&actual) {
        return Err(FrameError::UnexpectedCommandClass {
            expected: accepted[0],
            actual,
        });
    }
    Ok(frame.command_class_bytes())
}

/// Checks that a payload holds at least `expected` bytes.
pub(crate) fn require_payload(ccb: &[u8], expected: usize) -> FrameResult<()> {
    if ccb.len() < expected {
        return Err(FrameError::PayloadTooShort {
            command: ccb.get(1).copied().unwrap_or(0),
            expected,
            actual: ccb.len(),
        });
    }
    Ok(())
}

/// Command byte of a payload, failing when the payload stops at the class id.
pub(crate) fn command_byte(ccb: &[u8]) -> FrameResult<u8> {
    require_payload(ccb, 2)?;
    Ok(ccb[1])
}

// ============================================================================
// Factory
// ============================================================================

/// Resolves a command class id to a freshly constructed handler.
pub trait CommandClassFactory: Send + Sync {
    /// Returns `None` for ids this factory does not implement.
    fn create(&self, id: u8) -> Option<Box<dyn CommandClass>>;
}

/// The command classes implemented by this crate.
#[derive(Debug, Default, Clone, Copy)]
pub struct StandardCommandClasses;

impl CommandClassFactory for StandardCommandClasses {
    fn create(&self, id: u8) -> Option<Box<dyn CommandClass>> {
        match id {
            BasicCommandClass::ID => Some(Box::new(BasicCommandClass::new())),
            BinarySwitchCommandClass::ID => Some(Box::new(BinarySwitchCommandClass::new())),
            MultilevelSwitchCommandClass::ID => {
                Some(Box::new(MultilevelSwitchCommandClass::new()))
            }
            ManufacturerSpecificCommandClass::ID => {
                Some(Box::new(ManufacturerSpecificCommandClass::new()))
            }
            VersionCommandClass::ID => Some(Box::new(VersionCommandClass::new())),
            _ => None,
        }
    }
}

// ============================================================================
// Per-node set
// ============================================================================

/// The handlers registered on one node, keyed by class id.
///
/// Entries are never replaced or removed. A handler can be detached while it
/// runs (see [`CommandClassSet::take`]) so that it can reach its siblings
/// through a context without aliasing itself.
#[derive(Debug, Default)]
pub struct CommandClassSet {
    classes: BTreeMap<u8, Box<dyn CommandClass>>,
}

impl CommandClassSet {
    /// Create an empty set.
    pub fn new() -> Self {
        CommandClassSet::default()
    }

    /// Register a handler. Returns `false`, leaving the existing handler
    /// untouched, if its id is already present.
    pub fn register(&mut self, command_class: Box<dyn CommandClass>) -> bool {
        let id = command_class.id();
        if self.classes.contains_key(&id) {
            return false;
        }
        debug!("Registering command class: {}", command_class.name());
        self.classes.insert(id, command_class);
        true
    }

    /// Whether a handler for `id` is registered.
    pub fn contains(&self, id: u8) -> bool {
        self.classes.contains_key(&id)
    }

    /// Look up a handler.
    pub fn get(&self, id: u8) -> Option<&dyn CommandClass> {
        self.classes.get(&id).map(|cc| cc.as_ref())
    }

    /// Look up a handler for mutation.
    pub fn get_mut(&mut self, id: u8) -> Option<&mut dyn CommandClass> {
        let cc: &mut dyn CommandClass = self.classes.get_mut(&id)?.as_mut();
        Some(cc)
    }

    /// All handlers, ordered by id.
    pub fn iter(&self) -> impl Iterator<Item = &(dyn CommandClass + 'static)> {
        self.classes.values().map(|cc| cc.as_ref())
    }

    /// All registered ids, ordered.
    pub fn ids(&self) -> Vec<u8> {
        self.classes.keys().copied().collect()
    }

    /// Number of registered handlers.
    pub fn len(&self) -> usize {
        self.classes.len()
    }

    /// Whether no handler is registered.
    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    /// Detach a handler so it can run against the rest of the set.
    pub(crate) fn take(&mut self, id: u8) -> Option<Box<dyn CommandClass>> {
        self.classes.remove(&id)
    }

    /// Re-attach a handler detached with [`CommandClassSet::take`].
    pub(crate) fn restore(&mut self, command_class: Box<dyn CommandClass>) {
        self.classes.insert(command_class.id(), command_class);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use zwave_frame::{COMMAND_CLASS_BASIC, COMMAND_CLASS_VERSION, COMMAND_CLASS_WAKE_UP};

    #[test]
    fn test_factory_known_ids() {
        let factory = StandardCommandClasses;
        let cc = factory.create(COMMAND_CLASS_VERSION).expect("version is supported");
        assert_eq!(cc.id(), COMMAND_CLASS_VERSION);
        assert_eq!(cc.name(), "COMMAND_CLASS_VERSION");
        assert_eq!(cc.version(), DEFAULT_VERSION);
    }

    #[test]
    fn test_factory_unknown_id() {
        assert!(StandardCommandClasses.create(COMMAND_CLASS_WAKE_UP).is_none());
        assert!(StandardCommandClasses.create(0xEE).is_none());
    }

    #[test]
    fn test_register_is_first_wins() {
        let mut set = CommandClassSet::new();
        let mut first = BasicCommandClass::new();
        first.set_version(2);
        assert!(set.register(Box::new(first)));
        assert!(!set.register(Box::new(BasicCommandClass::new())));

        assert_eq!(set.len(), 1);
        assert_eq!(set.get(COMMAND_CLASS_BASIC).map(|cc| cc.version()), Some(2));
    }

    #[test]
    fn test_take_and_restore() {
        let mut set = CommandClassSet::new();
        set.register(Box::new(VersionCommandClass::new()));
        let taken = set.take(COMMAND_CLASS_VERSION).expect("registered");
        assert!(!set.contains(COMMAND_CLASS_VERSION));
        set.restore(taken);
        assert!(set.contains(COMMAND_CLASS_VERSION));
    }

    #[test]
    fn test_payload_checks() {
        assert_eq!(command_byte(&[0x20]), Err(FrameError::PayloadTooShort {
            command: 0,
            expected: 2,
            actual: 1
        }));
        assert_eq!(command_byte(&[0x20, 0x03]), Ok(0x03));
        assert!(require_payload(&[0x20, 0x03, 0x00], 3).is_ok());
    }

    #[test]
    fn test_expect_class_returns_frame_payload() {
        let frame = ApplicationCommand::new(NodeId(3), vec![0x25, 0x03, 0xFF]).expect("non-empty");
        let payload = expect_class(&frame, &[0x20, 0x25]).expect("accepted class");
        assert_eq!(payload, &[0x25, 0x03, 0xFF]);

        assert_eq!(
            expect_class(&frame, &[0x26, 0x20]),
            Err(FrameError::UnexpectedCommandClass {
                expected: 0x26,
                actual: 0x25
            })
        );
    }
}

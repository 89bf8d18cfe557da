//! Device profiles.
//!
//! A profile carries what depends on the kind of device rather than on the
//! command classes it reports: how to refresh its state once it is known to be
//! awake, and which handler should receive Basic command class frames.

use std::fmt;

use zwave_frame::{
    DataFrame, NodeId, COMMAND_CLASS_SWITCH_BINARY, COMMAND_CLASS_SWITCH_MULTILEVEL,
    GENERIC_TYPE_SWITCH_BINARY, GENERIC_TYPE_SWITCH_MULTILEVEL,
};

use crate::command_class::{
    BasicCommandClass, BinarySwitchCommandClass, MultilevelSwitchCommandClass,
};

pub trait DeviceProfile: fmt::Debug + Send {
    /// Short name, used in diagnostics and metric labels.
    fn name(&self) -> &'static str;

    /// Frames that bring the controller's view of the device up to date.
    fn refresh(&self, node_id: NodeId) -> Vec<DataFrame>;

    /// Class id that should handle a Basic command class frame.
    fn map_basic_handler(&self, default_id: u8) -> u8 {
        default_id
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct GenericProfile;

impl DeviceProfile for GenericProfile {
    fn name(&self) -> &'static str {
        "generic"
    }

    fn refresh(&self, node_id: NodeId) -> Vec<DataFrame> {
        vec![BasicCommandClass::create_get(node_id)]
    }
}

/// On/off switches; Basic frames are switch reports in disguise.
#[derive(Debug, Default, Clone, Copy)]
pub struct BinarySwitchProfile;

impl DeviceProfile for BinarySwitchProfile {
    fn name(&self) -> &'static str {
        "binary_switch"
    }

    fn refresh(&self, node_id: NodeId) -> Vec<DataFrame> {
        vec![BinarySwitchCommandClass::create_get(node_id)]
    }

    fn map_basic_handler(&self, _default_id: u8) -> u8 {
        COMMAND_CLASS_SWITCH_BINARY
    }
}

/// Dimmers and other level-controlled devices.
#[derive(Debug, Default, Clone, Copy)]
pub struct MultilevelSwitchProfile;

impl DeviceProfile for MultilevelSwitchProfile {
    fn name(&self) -> &'static str {
        "multilevel_switch"
    }

    fn refresh(&self, node_id: NodeId) -> Vec<DataFrame> {
        vec![MultilevelSwitchCommandClass::create_get(node_id)]
    }

    fn map_basic_handler(&self, _default_id: u8) -> u8 {
        COMMAND_CLASS_SWITCH_MULTILEVEL
    }
}

/// Pick a profile from a node's generic device class.
pub fn profile_for_generic_class(generic_device_class: u8) -> Box<dyn DeviceProfile> {
    match generic_device_class {
        GENERIC_TYPE_SWITCH_BINARY => Box::new(BinarySwitchProfile),
        GENERIC_TYPE_SWITCH_MULTILEVEL => Box::new(MultilevelSwitchProfile),
        _ => Box::new(GenericProfile),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use zwave_frame::{COMMAND_CLASS_BASIC, GENERIC_TYPE_SENSOR_BINARY};

    #[test]
    fn test_profile_selection() {
        assert_eq!(profile_for_generic_class(GENERIC_TYPE_SWITCH_BINARY).name(), "binary_switch");
        assert_eq!(
            profile_for_generic_class(GENERIC_TYPE_SWITCH_MULTILEVEL).name(),
            "multilevel_switch"
        );
        assert_eq!(profile_for_generic_class(GENERIC_TYPE_SENSOR_BINARY).name(), "generic");
    }

    #[test]
    fn test_basic_mapping() {
        assert_eq!(GenericProfile.map_basic_handler(COMMAND_CLASS_BASIC), COMMAND_CLASS_BASIC);
        assert_eq!(
            BinarySwitchProfile.map_basic_handler(COMMAND_CLASS_BASIC),
            COMMAND_CLASS_SWITCH_BINARY
        );
    }

    #[test]
    fn test_refresh_frames() {
        assert_eq!(
            MultilevelSwitchProfile.refresh(NodeId(4)),
            vec![MultilevelSwitchCommandClass::create_get(NodeId(4))]
        );
    }
}

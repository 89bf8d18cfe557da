//! Network model files.
//!
//! A model describes the devices of a simulated network in YAML:
//!
//! ```yaml
//! nodes:
//!   - id: 2
//!     name: Hall dimmer
//!     kind: multilevel_switch
//!     command_classes: [basic, switch_multilevel, version]
//!     class_versions:
//!       switch_multilevel: 2
//!   - id: 7
//!     kind: binary_sensor
//!     listening: false
//!     wake_interval: 20
//!     command_classes: [basic, wake_up]
//! ```

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use zwave_frame::{
    NodeProtocolInfo, BASIC_TYPE_ROUTING_SLAVE, BASIC_TYPE_SLAVE, COMMAND_CLASS_BASIC,
    COMMAND_CLASS_MANUFACTURER_SPECIFIC, COMMAND_CLASS_SWITCH_BINARY,
    COMMAND_CLASS_SWITCH_MULTILEVEL, COMMAND_CLASS_VERSION, COMMAND_CLASS_WAKE_UP,
    GENERIC_TYPE_SENSOR_BINARY, GENERIC_TYPE_SENSOR_MULTILEVEL, GENERIC_TYPE_SWITCH_BINARY,
    GENERIC_TYPE_SWITCH_MULTILEVEL, GENERIC_TYPE_THERMOSTAT,
};

/// Highest node id a Z-Wave network assigns.
pub const MAX_NODE_ID: u8 = 232;

/// Errors that can occur while loading a model.
#[derive(Debug, Error)]
pub enum ModelError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("YAML parsing error: {0}")]
    YamlError(#[from] serde_yaml::Error),

    #[error("Invalid node id {0}: must be between 1 and 232")]
    InvalidNodeId(u8),

    #[error("Duplicate node id {0}")]
    DuplicateNode(u8),

    #[error("Node {0} is not listening and has no wake_interval")]
    MissingWakeInterval(u8),
}

// ============================================================================
// Schema
// ============================================================================

/// Root of a model file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NetworkModel {
    #[serde(default)]
    pub nodes: Vec<DeviceModel>,
}

/// Device category, which decides the generic device class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceKind {
    BinarySwitch,
    MultilevelSwitch,
    BinarySensor,
    MultilevelSensor,
    Thermostat,
    #[default]
    Generic,
}

impl DeviceKind {
    pub fn generic_device_class(&self) -> u8 {
        match self {
            DeviceKind::BinarySwitch => GENERIC_TYPE_SWITCH_BINARY,
            DeviceKind::MultilevelSwitch => GENERIC_TYPE_SWITCH_MULTILEVEL,
            DeviceKind::BinarySensor => GENERIC_TYPE_SENSOR_BINARY,
            DeviceKind::MultilevelSensor => GENERIC_TYPE_SENSOR_MULTILEVEL,
            DeviceKind::Thermostat => GENERIC_TYPE_THERMOSTAT,
            DeviceKind::Generic => 0x00,
        }
    }
}

/// Command classes a model may list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommandClassKind {
    Basic,
    SwitchBinary,
    SwitchMultilevel,
    ManufacturerSpecific,
    WakeUp,
    Version,
}

impl CommandClassKind {
    pub fn id(&self) -> u8 {
        match self {
            CommandClassKind::Basic => COMMAND_CLASS_BASIC,
            CommandClassKind::SwitchBinary => COMMAND_CLASS_SWITCH_BINARY,
            CommandClassKind::SwitchMultilevel => COMMAND_CLASS_SWITCH_MULTILEVEL,
            CommandClassKind::ManufacturerSpecific => COMMAND_CLASS_MANUFACTURER_SPECIFIC,
            CommandClassKind::WakeUp => COMMAND_CLASS_WAKE_UP,
            CommandClassKind::Version => COMMAND_CLASS_VERSION,
        }
    }
}

/// Firmware versions reported in VERSION_REPORT.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FirmwareModel {
    pub library: u8,
    pub protocol: (u8, u8),
    pub application: (u8, u8),
}

impl Default for FirmwareModel {
    fn default() -> Self {
        FirmwareModel {
            library: 3,
            protocol: (4, 5),
            application: (1, 0),
        }
    }
}

/// Identity reported in MANUFACTURER_SPECIFIC_REPORT.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ManufacturerModel {
    pub manufacturer_id: u16,
    pub product_type_id: u16,
    pub product_id: u16,
}

/// One simulated device.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceModel {
    pub id: u8,

    #[serde(default)]
    pub name: Option<String>,

    #[serde(default)]
    pub kind: DeviceKind,

    /// Always-on device; sleeping devices need `wake_interval`.
    #[serde(default = "default_listening")]
    pub listening: bool,

    #[serde(default)]
    pub command_classes: Vec<CommandClassKind>,

    /// Per-class versions answered to VERSION_COMMAND_CLASS_GET; unlisted
    /// supported classes answer 1.
    #[serde(default)]
    pub class_versions: BTreeMap<CommandClassKind, u8>,

    #[serde(default)]
    pub firmware: FirmwareModel,

    #[serde(default)]
    pub manufacturer: Option<ManufacturerModel>,

    /// Node-info requests the device fails before it answers.
    #[serde(default)]
    pub fail_node_info: u32,

    /// Cycles a sleeping device spends asleep between wake-ups.
    #[serde(default)]
    pub wake_interval: Option<u32>,

    /// Cycles a sleeping device stays awake once woken.
    #[serde(default = "default_awake_cycles")]
    pub awake_cycles: u32,

    /// Initial Basic/switch level.
    #[serde(default)]
    pub level: u8,
}

fn default_listening() -> bool {
    true
}

fn default_awake_cycles() -> u32 {
    10
}

impl DeviceModel {
    /// Display name, defaulting to `node<id>`.
    pub fn display_name(&self) -> String {
        self.name.clone().unwrap_or_else(|| format!("node{}", self.id))
    }

    /// Protocol info as discovered at network join time.
    pub fn protocol_info(&self) -> NodeProtocolInfo {
        let basic = if self.listening {
            BASIC_TYPE_ROUTING_SLAVE
        } else {
            BASIC_TYPE_SLAVE
        };
        NodeProtocolInfo::new(basic, self.kind.generic_device_class(), 0x01, self.listening)
    }

    /// Supported command class ids, in model order.
    pub fn command_class_ids(&self) -> Vec<u8> {
        self.command_classes.iter().map(|cc| cc.id()).collect()
    }

    /// Version the device reports for a class id; 0 for unsupported classes.
    pub fn class_version(&self, id: u8) -> u8 {
        match self.command_classes.iter().find(|cc| cc.id() == id) {
            Some(kind) => self.class_versions.get(kind).copied().unwrap_or(1),
            None => 0,
        }
    }
}

// ============================================================================
// Loading
// ============================================================================

/// Load and validate a model file.
pub fn load_model(path: &Path) -> Result<NetworkModel, ModelError> {
    let contents = std::fs::read_to_string(path)?;
    load_model_from_str(&contents)
}

/// Parse and validate a model from YAML text.
pub fn load_model_from_str(yaml: &str) -> Result<NetworkModel, ModelError> {
    let model: NetworkModel = serde_yaml::from_str(yaml)?;
    model.validate()?;
    Ok(model)
}

impl NetworkModel {
    pub fn validate(&self) -> Result<(), ModelError> {
        let mut seen = BTreeSet::new();
        for device in &self.nodes {
            if device.id == 0 || device.id > MAX_NODE_ID {
                return Err(ModelError::InvalidNodeId(device.id));
            }
            if !seen.insert(device.id) {
                return Err(ModelError::DuplicateNode(device.id));
            }
            if !device.listening && device.wake_interval.is_none() {
                return Err(ModelError::MissingWakeInterval(device.id));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MODEL: &str = r#"
nodes:
  - id: 2
    name: Hall dimmer
    kind: multilevel_switch
    command_classes: [basic, switch_multilevel, version]
    class_versions:
      switch_multilevel: 2
    firmware:
      library: 3
      protocol: [4, 0]
      application: [2, 5]
  - id: 7
    kind: binary_sensor
    listening: false
    wake_interval: 20
    command_classes: [basic, wake_up]
"#;

    #[test]
    fn test_load_model_from_str() {
        let model = load_model_from_str(MODEL).expect("valid model");
        assert_eq!(model.nodes.len(), 2);

        let dimmer = &model.nodes[0];
        assert_eq!(dimmer.display_name(), "Hall dimmer");
        assert_eq!(dimmer.kind, DeviceKind::MultilevelSwitch);
        assert!(dimmer.listening);
        assert_eq!(dimmer.command_class_ids(), vec![0x20, 0x26, 0x86]);
        assert_eq!(dimmer.class_version(0x26), 2);
        assert_eq!(dimmer.class_version(0x20), 1);
        assert_eq!(dimmer.class_version(0x72), 0);
        assert_eq!(dimmer.firmware.application, (2, 5));

        let sensor = &model.nodes[1];
        assert_eq!(sensor.display_name(), "node7");
        assert!(!sensor.protocol_info().listening);
        assert_eq!(sensor.awake_cycles, 10);
    }

    #[test]
    fn test_rejects_duplicate_ids() {
        let yaml = "nodes:\n  - id: 3\n  - id: 3\n";
        assert!(matches!(
            load_model_from_str(yaml),
            Err(ModelError::DuplicateNode(3))
        ));
    }

    #[test]
    fn test_rejects_out_of_range_ids() {
        assert!(matches!(
            load_model_from_str("nodes:\n  - id: 0\n"),
            Err(ModelError::InvalidNodeId(0))
        ));
        assert!(matches!(
            load_model_from_str("nodes:\n  - id: 240\n"),
            Err(ModelError::InvalidNodeId(240))
        ));
    }

    #[test]
    fn test_sleeping_device_needs_wake_interval() {
        assert!(matches!(
            load_model_from_str("nodes:\n  - id: 4\n    listening: false\n"),
            Err(ModelError::MissingWakeInterval(4))
        ));
    }

    #[test]
    fn test_unknown_command_class_is_a_parse_error() {
        let yaml = "nodes:\n  - id: 4\n    command_classes: [teleport]\n";
        assert!(matches!(load_model_from_str(yaml), Err(ModelError::YamlError(_))));
    }
}

//! Protocol constants
//!
//! These constants define the serial API function ids, update states,
//! transmit options and the command class / device class identifiers used by
//! the node stack.

// ============================================================================
// Frame Types
// ============================================================================

/// Frame sent from host to module, or unsolicited from module to host.
pub const FRAME_TYPE_REQUEST: u8 = 0x00;
/// Module response to a host request.
pub const FRAME_TYPE_RESPONSE: u8 = 0x01;

// ============================================================================
// Function IDs
// ============================================================================

/// Inbound application command from a node.
pub const FUNC_ID_APPLICATION_COMMAND_HANDLER: u8 = 0x04;
/// Send a command class payload to a node.
pub const FUNC_ID_ZW_SEND_DATA: u8 = 0x13;
/// Application update (node info received / request failed).
pub const FUNC_ID_ZW_APPLICATION_UPDATE: u8 = 0x49;
/// Ask a node for its node information frame.
pub const FUNC_ID_ZW_REQUEST_NODE_INFO: u8 = 0x60;

// ============================================================================
// Application Update States
// ============================================================================

/// A node-info request could not be delivered.
pub const UPDATE_STATE_NODE_INFO_REQ_FAILED: u8 = 0x81;
/// A node-info request was delivered (but no info frame yet).
pub const UPDATE_STATE_NODE_INFO_REQ_DONE: u8 = 0x82;
/// A node information frame was received.
pub const UPDATE_STATE_NODE_INFO_RECEIVED: u8 = 0x84;

// ============================================================================
// Transmit Options
// ============================================================================

/// Request an acknowledgement from the destination.
pub const TRANSMIT_OPTION_ACK: u8 = 0x01;
/// Allow the module to route the frame.
pub const TRANSMIT_OPTION_AUTO_ROUTE: u8 = 0x04;
/// Allow explorer frames when routing fails.
pub const TRANSMIT_OPTION_EXPLORE: u8 = 0x20;
/// Options used for every node-bound command.
pub const TRANSMIT_OPTIONS_DEFAULT: u8 =
    TRANSMIT_OPTION_ACK | TRANSMIT_OPTION_AUTO_ROUTE | TRANSMIT_OPTION_EXPLORE;

// ============================================================================
// Command Class IDs
// ============================================================================

/// Basic command class.
pub const COMMAND_CLASS_BASIC: u8 = 0x20;
/// Binary switch command class.
pub const COMMAND_CLASS_SWITCH_BINARY: u8 = 0x25;
/// Multilevel switch command class.
pub const COMMAND_CLASS_SWITCH_MULTILEVEL: u8 = 0x26;
/// Manufacturer specific command class.
pub const COMMAND_CLASS_MANUFACTURER_SPECIFIC: u8 = 0x72;
/// Wake up command class (sleeping devices).
pub const COMMAND_CLASS_WAKE_UP: u8 = 0x84;
/// Version command class.
pub const COMMAND_CLASS_VERSION: u8 = 0x86;

// ============================================================================
// Basic Device Classes
// ============================================================================

/// Portable controller.
pub const BASIC_TYPE_CONTROLLER: u8 = 0x01;
/// Static controller.
pub const BASIC_TYPE_STATIC_CONTROLLER: u8 = 0x02;
/// Slave.
pub const BASIC_TYPE_SLAVE: u8 = 0x03;
/// Routing slave.
pub const BASIC_TYPE_ROUTING_SLAVE: u8 = 0x04;

// ============================================================================
// Generic Device Classes
// ============================================================================

/// Generic controller.
pub const GENERIC_TYPE_GENERIC_CONTROLLER: u8 = 0x01;
/// Static controller.
pub const GENERIC_TYPE_STATIC_CONTROLLER: u8 = 0x02;
/// Thermostat.
pub const GENERIC_TYPE_THERMOSTAT: u8 = 0x08;
/// Binary switch.
pub const GENERIC_TYPE_SWITCH_BINARY: u8 = 0x10;
/// Multilevel switch.
pub const GENERIC_TYPE_SWITCH_MULTILEVEL: u8 = 0x11;
/// Binary sensor.
pub const GENERIC_TYPE_SENSOR_BINARY: u8 = 0x20;
/// Multilevel sensor.
pub const GENERIC_TYPE_SENSOR_MULTILEVEL: u8 = 0x21;

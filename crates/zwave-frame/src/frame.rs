//! Frame types and body encoding/decoding.
//!
//! Bodies are laid out as the serial API defines them, without the envelope:
//!
//! ```text
//! SendData            : 0x13 | node | len | payload[len] | tx_options | callback_id
//! RequestNodeInfo     : 0x60 | node
//! ApplicationCommand  : 0x04 | rx_status | node | len | payload[len]
//! ApplicationUpdate   : 0x49 | status | node | len | basic | generic | specific | ccs[len-3]
//! ```

use bytes::BufMut;
use std::fmt;

use crate::constants::*;
use crate::error::{FrameError, FrameResult};
use crate::types::{NodeId, NodeInfo};

/// Any frame exchanged with the serial module.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DataFrame {
    /// Outbound command class payload for a node.
    SendData(SendData),
    /// Outbound node-info request.
    RequestNodeInfo(RequestNodeInfo),
    /// Inbound command class payload from a node.
    ApplicationCommand(ApplicationCommand),
    /// Inbound result of a node-info request (solicited or not).
    ApplicationUpdate(ApplicationUpdate),
    /// A function the node stack does not interpret.
    Other {
        /// Serial API function id.
        function_id: u8,
        /// Remaining body bytes.
        data: Vec<u8>,
    },
}

impl DataFrame {
    /// Serial API function id of this frame.
    pub fn function_id(&self) -> u8 {
        match self {
            DataFrame::SendData(_) => FUNC_ID_ZW_SEND_DATA,
            DataFrame::RequestNodeInfo(_) => FUNC_ID_ZW_REQUEST_NODE_INFO,
            DataFrame::ApplicationCommand(_) => FUNC_ID_APPLICATION_COMMAND_HANDLER,
            DataFrame::ApplicationUpdate(_) => FUNC_ID_ZW_APPLICATION_UPDATE,
            DataFrame::Other { function_id, .. } => *function_id,
        }
    }

    /// Node this frame is addressed to or originates from, if it names one.
    pub fn node_id(&self) -> Option<NodeId> {
        match self {
            DataFrame::SendData(f) => Some(f.node_id),
            DataFrame::RequestNodeInfo(f) => Some(f.node_id),
            DataFrame::ApplicationCommand(f) => Some(f.node_id),
            DataFrame::ApplicationUpdate(f) => Some(f.node_id),
            DataFrame::Other { .. } => None,
        }
    }

    /// Encode the frame body. Fails when a payload does not fit its length
    /// byte.
    pub fn encode(&self) -> FrameResult<Vec<u8>> {
        match self {
            DataFrame::SendData(f) => f.encode(),
            DataFrame::RequestNodeInfo(f) => Ok(f.encode()),
            DataFrame::ApplicationCommand(f) => f.encode(),
            DataFrame::ApplicationUpdate(f) => f.encode(),
            DataFrame::Other { function_id, data } => {
                let mut buf = Vec::with_capacity(1 + data.len());
                buf.put_u8(*function_id);
                buf.extend_from_slice(data);
                Ok(buf)
            }
        }
    }

    /// Decode a frame body, dispatching on the function id.
    pub fn decode(data: &[u8]) -> FrameResult<Self> {
        let (&function_id, rest) = data.split_first().ok_or(FrameError::Empty)?;
        match function_id {
            FUNC_ID_ZW_SEND_DATA => SendData::decode(data).map(DataFrame::SendData),
            FUNC_ID_ZW_REQUEST_NODE_INFO => {
                RequestNodeInfo::decode(data).map(DataFrame::RequestNodeInfo)
            }
            FUNC_ID_APPLICATION_COMMAND_HANDLER => {
                ApplicationCommand::decode(data).map(DataFrame::ApplicationCommand)
            }
            FUNC_ID_ZW_APPLICATION_UPDATE => {
                ApplicationUpdate::decode(data).map(DataFrame::ApplicationUpdate)
            }
            _ => {
                log::trace!("Passing through unhandled function 0x{:02X}", function_id);
                Ok(DataFrame::Other {
                    function_id,
                    data: rest.to_vec(),
                })
            }
        }
    }
}

impl fmt::Display for DataFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataFrame::SendData(d) => write!(
                f,
                "SendData[{}] node={} payload={}",
                d.label,
                d.node_id,
                hex_string(&d.payload)
            ),
            DataFrame::RequestNodeInfo(d) => write!(f, "RequestNodeInfo node={}", d.node_id),
            DataFrame::ApplicationCommand(d) => write!(
                f,
                "ApplicationCommand node={} payload={}",
                d.node_id,
                hex_string(&d.payload)
            ),
            DataFrame::ApplicationUpdate(d) => write!(
                f,
                "ApplicationUpdate node={} status=0x{:02X}",
                d.node_id, d.status
            ),
            DataFrame::Other { function_id, data } => {
                write!(f, "Frame[0x{:02X}] {}", function_id, hex_string(data))
            }
        }
    }
}

fn hex_string(data: &[u8]) -> String {
    data.iter()
        .map(|b| format!("{:02X}", b))
        .collect::<Vec<_>>()
        .join(" ")
}

fn require_len(data: &[u8], expected: usize) -> FrameResult<()> {
    if data.len() < expected {
        return Err(FrameError::FrameTooShort {
            expected,
            actual: data.len(),
        });
    }
    Ok(())
}

fn length_byte(len: usize) -> FrameResult<u8> {
    u8::try_from(len).map_err(|_| FrameError::TooLong { len })
}

fn length_prefixed(data: &[u8], len_index: usize) -> FrameResult<&[u8]> {
    require_len(data, len_index + 1)?;
    let declared = data[len_index] as usize;
    let body = &data[len_index + 1..];
    if body.len() < declared {
        return Err(FrameError::LengthMismatch {
            declared,
            remaining: body.len(),
        });
    }
    Ok(&body[..declared])
}

// ============================================================================
// SendData
// ============================================================================

/// A command class payload addressed to one node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SendData {
    /// Human-readable label used in diagnostics (e.g. `VERSION_GET`).
    pub label: String,
    /// Destination node.
    pub node_id: NodeId,
    /// Command class payload: class id, command, arguments.
    pub payload: Vec<u8>,
    /// Whether the node is expected to answer with an application command.
    pub response_expected: bool,
    /// Transmit option bits.
    pub transmit_options: u8,
    /// Callback id assigned by the controller (0 = none).
    pub callback_id: u8,
}

impl SendData {
    /// Create a send-data frame with the default transmit options.
    pub fn new(
        label: impl Into<String>,
        node_id: NodeId,
        payload: Vec<u8>,
        response_expected: bool,
    ) -> Self {
        SendData {
            label: label.into(),
            node_id,
            payload,
            response_expected,
            transmit_options: TRANSMIT_OPTIONS_DEFAULT,
            callback_id: 0,
        }
    }

    /// Command class id carried by the payload.
    pub fn command_class_id(&self) -> Option<u8> {
        self.payload.first().copied()
    }

    /// Command byte carried by the payload.
    pub fn command(&self) -> Option<u8> {
        self.payload.get(1).copied()
    }

    fn encode(&self) -> FrameResult<Vec<u8>> {
        let mut buf = Vec::with_capacity(5 + self.payload.len());
        buf.put_u8(FUNC_ID_ZW_SEND_DATA);
        buf.put_u8(self.node_id.as_u8());
        buf.put_u8(length_byte(self.payload.len())?);
        buf.extend_from_slice(&self.payload);
        buf.put_u8(self.transmit_options);
        buf.put_u8(self.callback_id);
        Ok(buf)
    }

    fn decode(data: &[u8]) -> FrameResult<Self> {
        require_len(data, 3)?;
        let payload = length_prefixed(data, 2)?.to_vec();
        let tail = 3 + payload.len();
        require_len(data, tail + 2)?;
        Ok(SendData {
            label: "SEND_DATA".to_string(),
            node_id: NodeId(data[1]),
            response_expected: false,
            payload,
            transmit_options: data[tail],
            callback_id: data[tail + 1],
        })
    }
}

impl From<SendData> for DataFrame {
    fn from(frame: SendData) -> Self {
        DataFrame::SendData(frame)
    }
}

// ============================================================================
// RequestNodeInfo
// ============================================================================

/// Request for a node's information frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestNodeInfo {
    /// Node being asked.
    pub node_id: NodeId,
}

impl RequestNodeInfo {
    /// Create a node-info request.
    pub fn new(node_id: NodeId) -> Self {
        RequestNodeInfo { node_id }
    }

    fn encode(&self) -> Vec<u8> {
        vec![FUNC_ID_ZW_REQUEST_NODE_INFO, self.node_id.as_u8()]
    }

    fn decode(data: &[u8]) -> FrameResult<Self> {
        require_len(data, 2)?;
        Ok(RequestNodeInfo {
            node_id: NodeId(data[1]),
        })
    }
}

impl From<RequestNodeInfo> for DataFrame {
    fn from(frame: RequestNodeInfo) -> Self {
        DataFrame::RequestNodeInfo(frame)
    }
}

// ============================================================================
// ApplicationCommand
// ============================================================================

/// Inbound command class payload from a node.
///
/// The payload always holds at least the command class id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApplicationCommand {
    /// Receive status bits reported by the module.
    pub rx_status: u8,
    /// Originating node.
    pub node_id: NodeId,
    payload: Vec<u8>,
}

impl ApplicationCommand {
    /// Create an application command. The payload must name a command class.
    pub fn new(node_id: NodeId, payload: Vec<u8>) -> FrameResult<Self> {
        if payload.is_empty() {
            return Err(FrameError::Empty);
        }
        Ok(ApplicationCommand {
            rx_status: 0,
            node_id,
            payload,
        })
    }

    /// Command class the payload belongs to.
    pub fn command_class_id(&self) -> u8 {
        self.payload[0]
    }

    /// The full command class payload: `[class_id, command, args..]`.
    pub fn command_class_bytes(&self) -> &[u8] {
        &self.payload
    }

    /// Command byte, if present.
    pub fn command(&self) -> Option<u8> {
        self.payload.get(1).copied()
    }

    fn encode(&self) -> FrameResult<Vec<u8>> {
        let mut buf = Vec::with_capacity(4 + self.payload.len());
        buf.put_u8(FUNC_ID_APPLICATION_COMMAND_HANDLER);
        buf.put_u8(self.rx_status);
        buf.put_u8(self.node_id.as_u8());
        buf.put_u8(length_byte(self.payload.len())?);
        buf.extend_from_slice(&self.payload);
        Ok(buf)
    }

    fn decode(data: &[u8]) -> FrameResult<Self> {
        require_len(data, 4)?;
        let payload = length_prefixed(data, 3)?;
        let mut cmd = ApplicationCommand::new(NodeId(data[2]), payload.to_vec())?;
        cmd.rx_status = data[1];
        Ok(cmd)
    }
}

impl From<ApplicationCommand> for DataFrame {
    fn from(frame: ApplicationCommand) -> Self {
        DataFrame::ApplicationCommand(frame)
    }
}

// ============================================================================
// ApplicationUpdate
// ============================================================================

/// Result of a node-info request, or a node announcing itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApplicationUpdate {
    /// Update state (`UPDATE_STATE_*`).
    pub status: u8,
    /// Reporting node; the module reports 0 when a request failed.
    pub node_id: NodeId,
    /// Node information, present when `status` says it was received.
    pub node_info: Option<NodeInfo>,
}

impl ApplicationUpdate {
    /// An update carrying a node information frame.
    pub fn node_info_received(node_id: NodeId, info: NodeInfo) -> Self {
        ApplicationUpdate {
            status: UPDATE_STATE_NODE_INFO_RECEIVED,
            node_id,
            node_info: Some(info),
        }
    }

    /// An update reporting that the last node-info request failed.
    pub fn request_failed() -> Self {
        ApplicationUpdate {
            status: UPDATE_STATE_NODE_INFO_REQ_FAILED,
            node_id: NodeId(0),
            node_info: None,
        }
    }

    /// Whether the node-info request this update answers failed.
    pub fn did_info_request_fail(&self) -> bool {
        self.status == UPDATE_STATE_NODE_INFO_REQ_FAILED
    }

    /// Command classes carried by the node information, if any.
    pub fn command_classes(&self) -> &[u8] {
        self.node_info
            .as_ref()
            .map(|info| info.command_classes.as_slice())
            .unwrap_or(&[])
    }

    fn encode(&self) -> FrameResult<Vec<u8>> {
        let mut buf = Vec::with_capacity(8);
        buf.put_u8(FUNC_ID_ZW_APPLICATION_UPDATE);
        buf.put_u8(self.status);
        buf.put_u8(self.node_id.as_u8());
        match &self.node_info {
            Some(info) => {
                buf.put_u8(length_byte(3 + info.command_classes.len())?);
                buf.put_u8(info.basic_device_class);
                buf.put_u8(info.generic_device_class);
                buf.put_u8(info.specific_device_class);
                buf.extend_from_slice(&info.command_classes);
            }
            None => buf.put_u8(0),
        }
        Ok(buf)
    }

    fn decode(data: &[u8]) -> FrameResult<Self> {
        require_len(data, 3)?;
        let status = data[1];
        let node_id = NodeId(data[2]);
        if data.len() == 3 {
            return Ok(ApplicationUpdate {
                status,
                node_id,
                node_info: None,
            });
        }

        let body = length_prefixed(data, 3)?;
        let node_info = if status == UPDATE_STATE_NODE_INFO_RECEIVED {
            if body.len() < 3 {
                return Err(FrameError::FrameTooShort {
                    expected: 7,
                    actual: 4 + body.len(),
                });
            }
            Some(NodeInfo {
                basic_device_class: body[0],
                generic_device_class: body[1],
                specific_device_class: body[2],
                command_classes: body[3..].to_vec(),
            })
        } else {
            None
        };

        Ok(ApplicationUpdate {
            status,
            node_id,
            node_info,
        })
    }
}

impl From<ApplicationUpdate> for DataFrame {
    fn from(frame: ApplicationUpdate) -> Self {
        DataFrame::ApplicationUpdate(frame)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_send_data_layout() {
        let frame = DataFrame::from(SendData::new(
            "VERSION_COMMAND_CLASS_GET",
            NodeId(5),
            vec![0x86, 0x13, 0x25],
            true,
        ));
        assert_eq!(
            frame.encode(),
            Ok(vec![0x13, 0x05, 0x03, 0x86, 0x13, 0x25, 0x25, 0x00])
        );
        assert_eq!(frame.node_id(), Some(NodeId(5)));
    }

    #[test]
    fn test_oversized_payload_rejected() {
        let frame = DataFrame::from(SendData::new("BIG", NodeId(5), vec![0x20; 256], false));
        assert_eq!(frame.encode(), Err(FrameError::TooLong { len: 256 }));

        let command = ApplicationCommand::new(NodeId(5), vec![0x20; 255]).expect("non-empty");
        let body = DataFrame::from(command).encode().expect("255 bytes fit");
        assert_eq!(body[3], 0xFF);
        assert_eq!(body.len(), 4 + 255);

        let update = ApplicationUpdate::node_info_received(
            NodeId(5),
            NodeInfo {
                command_classes: vec![0x20; 253],
                ..Default::default()
            },
        );
        assert_eq!(
            DataFrame::from(update).encode(),
            Err(FrameError::TooLong { len: 256 })
        );
    }

    #[test]
    fn test_decode_application_command() {
        let data = [0x04, 0x00, 0x02, 0x03, 0x25, 0x03, 0xFF];
        let frame = DataFrame::decode(&data).expect("should decode");
        match frame {
            DataFrame::ApplicationCommand(cmd) => {
                assert_eq!(cmd.node_id, NodeId(2));
                assert_eq!(cmd.command_class_id(), 0x25);
                assert_eq!(cmd.command(), Some(0x03));
                assert_eq!(cmd.command_class_bytes(), &[0x25, 0x03, 0xFF]);
            }
            other => panic!("unexpected frame: {other:?}"),
        }
    }

    #[test]
    fn test_decode_application_command_length_overrun() {
        let data = [0x04, 0x00, 0x02, 0x05, 0x25, 0x03];
        assert_eq!(
            DataFrame::decode(&data),
            Err(FrameError::LengthMismatch {
                declared: 5,
                remaining: 2
            })
        );
    }

    #[test]
    fn test_decode_application_command_requires_class() {
        let data = [0x04, 0x00, 0x02, 0x00];
        assert_eq!(DataFrame::decode(&data), Err(FrameError::Empty));
    }

    #[test]
    fn test_decode_node_info_update() {
        let data = [0x49, 0x84, 0x03, 0x05, 0x04, 0x10, 0x01, 0x25, 0x86];
        let frame = DataFrame::decode(&data).expect("should decode");
        let DataFrame::ApplicationUpdate(update) = frame else {
            panic!("expected application update");
        };
        assert!(!update.did_info_request_fail());
        assert_eq!(update.node_id, NodeId(3));
        assert_eq!(update.command_classes(), &[0x25, 0x86]);
        let info = update.node_info.expect("node info");
        assert_eq!(info.generic_device_class, GENERIC_TYPE_SWITCH_BINARY);
    }

    #[test]
    fn test_request_failed_update() {
        let update = ApplicationUpdate::request_failed();
        assert!(update.did_info_request_fail());
        assert!(update.command_classes().is_empty());

        let body = DataFrame::from(update.clone())
            .encode()
            .expect("should encode");
        assert_eq!(body, vec![0x49, 0x81, 0x00, 0x00]);
        assert_eq!(
            DataFrame::decode(&body),
            Ok(DataFrame::ApplicationUpdate(update))
        );
    }

    #[test]
    fn test_unknown_function_passes_through() {
        let frame = DataFrame::decode(&[0x15, 0x01, 0x02]).expect("should decode");
        assert_eq!(
            frame,
            DataFrame::Other {
                function_id: 0x15,
                data: vec![0x01, 0x02]
            }
        );
        assert_eq!(frame.node_id(), None);
    }

    #[test]
    fn test_empty_body() {
        assert_eq!(DataFrame::decode(&[]), Err(FrameError::Empty));
    }

    #[test]
    fn test_display_includes_label() {
        let frame = DataFrame::from(SendData::new("BASIC_GET", NodeId(9), vec![0x20, 0x02], true));
        assert_eq!(frame.to_string(), "SendData[BASIC_GET] node=9 payload=20 02");
    }
}

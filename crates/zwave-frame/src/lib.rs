//! Z-Wave Serial API Frames
//!
//! This crate provides the frame types exchanged between a host controller and
//! the Z-Wave serial module. Only the message bodies are modelled here: the
//! SOF/length/checksum envelope and the ACK/NAK handshake belong to the serial
//! transport and are not part of this crate.
//!
//! # Protocol Overview
//!
//! Every body starts with a one-byte function id:
//!
//! - **Requests** (host → module): `ZW_SEND_DATA`, `ZW_REQUEST_NODE_INFO`
//! - **Callbacks** (module → host): `APPLICATION_COMMAND_HANDLER`,
//!   `ZW_APPLICATION_UPDATE`
//!
//! Anything else decodes to [`DataFrame::Other`] so that callers can ignore it.
//!
//! # Example
//!
//! ```rust
//! use zwave_frame::{DataFrame, SendData, NodeId};
//!
//! let get = SendData::new("BASIC_GET", NodeId(5), vec![0x20, 0x02], true);
//! let body = DataFrame::from(get).encode()?;
//! assert_eq!(body[0], zwave_frame::FUNC_ID_ZW_SEND_DATA);
//! # Ok::<(), zwave_frame::FrameError>(())
//! ```

mod constants;
mod error;
mod frame;
mod types;

pub use constants::*;
pub use error::*;
pub use frame::*;
pub use types::*;

//! RESP2 wire protocol
//!
//! This module provides the command/reply codec used by every connection:
//! * Commands are arrays of binary-safe bulk strings
//! * Replies are decoded incrementally from a read buffer

pub mod constants;
pub mod decode;
pub mod encode;
pub mod message;

pub use decode::decode_frame;
pub use encode::{encode_command, encode_command_into};
pub use message::{Cmd, Frame};

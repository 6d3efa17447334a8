//! Wire-level pieces shared by the ingress servers and the remote controller:
//! protocol constants, the AES-CBC codec, the telemetry record format and the
//! fixed-size command block format.

pub mod codec;
pub mod command;
mod error;
pub mod telemetry;

pub use codec::{CipherMode, CipherSpec, Padding};
pub use command::Command;
pub use error::{DecodeError, EncodeError, FrameError, ParseError};
pub use telemetry::TelemetrySample;

/// AES block size, and the size of one command frame on the wire.
pub const BLOCK_SIZE: usize = 16;

pub const DEFAULT_TELEMETRY_PORT: u16 = 4211;
pub const DEFAULT_COMMAND_PORT: u16 = 6000;

// Key material is fixed and shared out of band with the controller. There is
// no rotation, authentication or replay protection on either link.
pub const TELEMETRY_KEY: [u8; 16] = [
    0x2B, 0x7E, 0x15, 0x16, 0x28, 0xAE, 0xD2, 0xA6, 0xAB, 0xF7, 0x15, 0x88, 0x09, 0xCF, 0x4F, 0x3C,
];
pub const TELEMETRY_IV: [u8; 16] = [
    0x00, 0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08, 0x09, 0x0A, 0x0B, 0x0C, 0x0D, 0x0E, 0x0F,
];
pub const COMMAND_KEY: [u8; 16] = *b"1234567890abcdef";
pub const COMMAND_IV: [u8; 16] = [0; 16];

//! Command blocks: the decimal command code, NUL-padded to one 16-byte block
//! and encrypted with the unpadded codec.

use crate::codec::{trim_nul_padding, CipherSpec};
use crate::error::{DecodeError, EncodeError, ParseError};
use crate::BLOCK_SIZE;
use std::fmt;

/// The controller's command vocabulary
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Command {
    /// Reserved idle/stop signal, sent continuously while nothing happens
    Stop,
    ComeHere,
    GoAway,
    TurnAround,
    Pet,
    Feed,
    ThrowBall,
    Unknown(i32),
}

impl Command {
    pub fn from_code(code: i32) -> Self {
        match code {
            0 => Command::Stop,
            1 => Command::ComeHere,
            2 => Command::GoAway,
            3 => Command::TurnAround,
            4 => Command::Pet,
            5 => Command::Feed,
            6 => Command::ThrowBall,
            other => Command::Unknown(other),
        }
    }

    pub fn code(&self) -> i32 {
        match self {
            Command::Stop => 0,
            Command::ComeHere => 1,
            Command::GoAway => 2,
            Command::TurnAround => 3,
            Command::Pet => 4,
            Command::Feed => 5,
            Command::ThrowBall => 6,
            Command::Unknown(code) => *code,
        }
    }

    /// Operator-facing name, `None` for stop and unknown codes
    pub fn label(&self) -> Option<&'static str> {
        match self {
            Command::Stop | Command::Unknown(_) => None,
            Command::ComeHere => Some("Come Here"),
            Command::GoAway => Some("Go Away"),
            Command::TurnAround => Some("Turn Around"),
            Command::Pet => Some("Pet"),
            Command::Feed => Some("Feed"),
            Command::ThrowBall => Some("Ball throw"),
        }
    }
}

impl From<i32> for Command {
    fn from(code: i32) -> Self {
        Command::from_code(code)
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.label() {
            Some(label) => write!(f, "{} ({})", label, self.code()),
            None => write!(f, "{}", self.code()),
        }
    }
}

/// Decrypts one block and returns its text with the NUL fill removed.
///
/// Invalid UTF-8 is replaced rather than rejected; the text is still checked
/// by [`parse_code`] before anything acts on it.
pub fn decode_block(spec: &CipherSpec, block: &[u8]) -> Result<String, DecodeError> {
    let plaintext = spec.decrypt(block)?;
    Ok(String::from_utf8_lossy(trim_nul_padding(&plaintext)).into_owned())
}

pub fn parse_code(text: &str) -> Result<i32, ParseError> {
    text.trim()
        .parse::<i32>()
        .map_err(|_| ParseError::Command(text.to_string()))
}

pub fn encode_block(spec: &CipherSpec, code: i32) -> Result<[u8; BLOCK_SIZE], EncodeError> {
    let text = code.to_string();
    if text.len() > BLOCK_SIZE {
        return Err(EncodeError::PayloadTooLong(text));
    }

    let mut plaintext = [0u8; BLOCK_SIZE];
    plaintext[..text.len()].copy_from_slice(text.as_bytes());

    let ciphertext = spec.encrypt(&plaintext)?;
    let mut block = [0u8; BLOCK_SIZE];
    block.copy_from_slice(&ciphertext);
    Ok(block)
}

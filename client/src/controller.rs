//! Protocol-aware senders.

use crate::network::Link;
use crate::ClientError;
use log::debug;
use shared::{command, telemetry, CipherSpec};

/// Sends command codes as encrypted 16-byte blocks
#[derive(Debug)]
pub struct CommandSender {
    link: Link,
    spec: CipherSpec,
}

impl CommandSender {
    pub fn new(link: Link) -> Self {
        Self::with_cipher(link, CipherSpec::command())
    }

    pub fn with_cipher(link: Link, spec: CipherSpec) -> Self {
        Self { link, spec }
    }

    pub async fn send(&mut self, code: i32) -> Result<(), ClientError> {
        let block = command::encode_block(&self.spec, code)?;
        self.link.send(&block).await?;
        debug!("sent command {}", shared::Command::from_code(code));
        Ok(())
    }

    pub async fn close(&mut self) {
        self.link.close().await;
    }
}

/// Sends battery readings as base64 lines
#[derive(Debug)]
pub struct TelemetrySender {
    link: Link,
    spec: CipherSpec,
}

impl TelemetrySender {
    pub fn new(link: Link) -> Self {
        Self::with_cipher(link, CipherSpec::telemetry())
    }

    pub fn with_cipher(link: Link, spec: CipherSpec) -> Self {
        Self { link, spec }
    }

    pub async fn send(&mut self, voltage: f32, percentage: f32) -> Result<(), ClientError> {
        let line = telemetry::encode_line(&self.spec, voltage, percentage)?;
        self.link.send(line.as_bytes()).await?;
        debug!("sent {}", telemetry::format_record(voltage, percentage));
        Ok(())
    }

    pub async fn close(&mut self) {
        self.link.close().await;
    }
}

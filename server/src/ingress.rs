//! The two ingress protocols.
//!
//! [`TelemetryIngress`] decodes newline-delimited base64 battery records and
//! publishes the latest percentage into an overwrite slot. [`CommandIngress`]
//! decodes fixed 16-byte blocks into command codes and queues them, along
//! with operator log lines, on FIFO channels.

use crate::config::ServerConfig;
use crate::framing::{BlockFramer, LineFramer};
use crate::handoff::{FifoSender, OverwriteSlot};
use crate::network::{IngressError, Protocol, ServerEvent};
use log::debug;
use shared::{command, telemetry, CipherSpec, DecodeError, FrameError, TelemetrySample, BLOCK_SIZE};
use std::sync::Arc;

pub struct TelemetryIngress {
    cipher: CipherSpec,
    slot: Arc<OverwriteSlot<TelemetrySample>>,
}

impl TelemetryIngress {
    pub fn new(config: &ServerConfig, slot: Arc<OverwriteSlot<TelemetrySample>>) -> Self {
        Self {
            cipher: config.cipher.clone(),
            slot,
        }
    }
}

impl Protocol for TelemetryIngress {
    type Framer = LineFramer;

    fn name(&self) -> &'static str {
        "telemetry"
    }

    fn framer(&self) -> LineFramer {
        LineFramer::new()
    }

    fn handle_frame(&self, frame: &[u8]) -> Result<(), FrameError> {
        let line = String::from_utf8(frame.to_vec()).map_err(DecodeError::from)?;
        let line = line.trim();
        if line.is_empty() {
            return Ok(());
        }

        let sample = telemetry::decode_line(&self.cipher, line)?;
        debug!("decrypted telemetry: {:.1}%", sample.percentage());
        self.slot.publish(sample);
        Ok(())
    }
}

pub struct CommandIngress {
    cipher: CipherSpec,
    commands: FifoSender<i32>,
    log_lines: FifoSender<String>,
}

impl CommandIngress {
    pub fn new(
        config: &ServerConfig,
        commands: FifoSender<i32>,
        log_lines: FifoSender<String>,
    ) -> Self {
        log_lines.push("Command server started".to_string());
        Self {
            cipher: config.cipher.clone(),
            commands,
            log_lines,
        }
    }

    fn log(&self, line: String) {
        self.log_lines.push(line);
    }
}

impl Protocol for CommandIngress {
    type Framer = BlockFramer;

    fn name(&self) -> &'static str {
        "command"
    }

    fn framer(&self) -> BlockFramer {
        BlockFramer::new(BLOCK_SIZE)
    }

    fn handle_frame(&self, frame: &[u8]) -> Result<(), FrameError> {
        let text = command::decode_block(&self.cipher, frame)?;
        // Every decrypted block is echoed, the idle code included.
        self.log(format!("Received from controller: {}", text));

        let code = command::parse_code(&text)?;
        self.commands.push(code);
        Ok(())
    }

    fn on_event(&self, event: &ServerEvent<'_>) {
        let line = match event {
            ServerEvent::Listening { addr } => {
                format!("Listening for controller on port {}...", addr.port())
            }
            ServerEvent::BindFailed { error } => format!("Server error: {}", error),
            ServerEvent::AcceptFailed { error } => format!("Server error: {}", error),
            ServerEvent::Connected { .. } => "Controller connected".to_string(),
            ServerEvent::Disconnected { .. } => "Controller disconnected.".to_string(),
            ServerEvent::ConnectionError { error, .. } => match error {
                IngressError::Io(e) => format!("Connection error: {}", e),
                other => other.to_string(),
            },
            ServerEvent::FrameDropped { error } => format!("Dropped command block: {}", error),
            ServerEvent::WaitingForReconnect => "Waiting for controller to reconnect...".to_string(),
            ServerEvent::Stopped => "Command server stopped".to_string(),
        };
        self.log(line);
    }
}

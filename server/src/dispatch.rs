//! Tick-time consumer.
//!
//! [`TickConsumer::tick`] runs once per frame on the presentation thread. It
//! drains everything the ingress tasks queued since the last tick and turns it
//! into calls on the [`Collaborators`] interface, which is the only way this
//! crate affects the rest of the program.

use crate::handoff::{FifoReceiver, OverwriteSlot};
use log::debug;
use shared::{Command, TelemetrySample};
use std::sync::Arc;

/// Externally-owned actions a command can trigger
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    StartRunning,
    PlayPet,
    Feed,
    ThrowBall,
}

impl Action {
    /// Stop and unknown codes have no action
    pub fn for_command(command: Command) -> Option<Action> {
        match command {
            Command::ComeHere | Command::GoAway | Command::TurnAround => Some(Action::StartRunning),
            Command::Pet => Some(Action::PlayPet),
            Command::Feed => Some(Action::Feed),
            Command::ThrowBall => Some(Action::ThrowBall),
            Command::Stop | Command::Unknown(_) => None,
        }
    }
}

/// The presentation layer as seen from the ingress core
pub trait Collaborators {
    fn apply_telemetry(&mut self, percentage: f32);
    fn dispatch_command(&mut self, action: Action);
    fn append_log_line(&mut self, text: &str);
}

/// What one tick applied
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct TickReport {
    pub telemetry: Option<f32>,
    pub commands: usize,
    pub log_lines: usize,
}

pub struct TickConsumer {
    telemetry: Arc<OverwriteSlot<TelemetrySample>>,
    commands: FifoReceiver<i32>,
    log_lines: FifoReceiver<String>,
}

impl TickConsumer {
    pub fn new(
        telemetry: Arc<OverwriteSlot<TelemetrySample>>,
        commands: FifoReceiver<i32>,
        log_lines: FifoReceiver<String>,
    ) -> Self {
        Self {
            telemetry,
            commands,
            log_lines,
        }
    }

    /// Applies all pending data: queued log lines first, then commands in
    /// arrival order, then the latest telemetry sample if one is waiting.
    ///
    /// Commands are taken before log lines. Ingress queues a block's echo
    /// before its code, so every command applied here has its echo applied
    /// first in the same tick.
    pub fn tick<C: Collaborators + ?Sized>(&mut self, stage: &mut C) -> TickReport {
        let mut report = TickReport::default();

        let commands: Vec<i32> = self.commands.drain().collect();

        for line in self.log_lines.drain() {
            stage.append_log_line(&line);
            report.log_lines += 1;
        }

        for code in commands {
            dispatch_code(code, stage);
            report.commands += 1;
        }

        if let Some(sample) = self.telemetry.take() {
            stage.apply_telemetry(sample.percentage());
            report.telemetry = Some(sample.percentage());
        }

        if report != TickReport::default() {
            debug!("tick applied {:?}", report);
        }
        report
    }
}

/// Maps one command code onto the collaborators
pub fn dispatch_code<C: Collaborators + ?Sized>(code: i32, stage: &mut C) {
    let command = Command::from_code(code);
    match (command.label(), Action::for_command(command)) {
        (Some(label), Some(action)) => {
            stage.append_log_line(&format!("{} command received!", label));
            stage.dispatch_command(action);
        }
        _ => {
            // Stop arrives continuously while idle and stays out of the log.
            if let Command::Unknown(value) = command {
                stage.append_log_line(&format!("Unknown command value: {}", value));
            }
        }
    }
}

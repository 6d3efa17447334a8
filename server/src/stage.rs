//! Console stand-in for the presentation layer.
//!
//! Rendering and animation live elsewhere; this implementation only records
//! what it was asked to do and reports it through the log.

use crate::dispatch::{Action, Collaborators};
use log::info;

#[derive(Debug, Default)]
pub struct ConsoleStage {
    battery_percentage: Option<f32>,
    last_log_line: Option<String>,
    actions_played: usize,
}

impl ConsoleStage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn battery_percentage(&self) -> Option<f32> {
        self.battery_percentage
    }

    /// What a battery label would show
    pub fn battery_text(&self) -> String {
        match self.battery_percentage {
            Some(percentage) => format!("{:.0}%", percentage),
            None => "Not Connected".to_string(),
        }
    }

    pub fn last_log_line(&self) -> Option<&str> {
        self.last_log_line.as_deref()
    }

    pub fn actions_played(&self) -> usize {
        self.actions_played
    }
}

impl Collaborators for ConsoleStage {
    fn apply_telemetry(&mut self, percentage: f32) {
        self.battery_percentage = Some(percentage);
        info!("Battery {:.1}%", percentage);
    }

    fn dispatch_command(&mut self, action: Action) {
        self.actions_played += 1;
        let description = match action {
            Action::StartRunning => "start running",
            Action::PlayPet => "play pet sequence",
            Action::Feed => "throw food",
            Action::ThrowBall => "throw ball",
        };
        info!("stage: {}", description);
    }

    fn append_log_line(&mut self, text: &str) {
        // The on-screen log shows only the newest line
        info!("{}", text);
        self.last_log_line = Some(text.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_battery_text() {
        let mut stage = ConsoleStage::new();
        assert_eq!(stage.battery_text(), "Not Connected");

        stage.apply_telemetry(85.4);
        assert_eq!(stage.battery_text(), "85%");
        assert_eq!(stage.battery_percentage(), Some(85.4));
    }

    #[test]
    fn test_log_keeps_latest_line() {
        let mut stage = ConsoleStage::new();
        stage.append_log_line("Controller connected");
        stage.append_log_line("Feed command received!");
        stage.dispatch_command(Action::Feed);

        assert_eq!(stage.last_log_line(), Some("Feed command received!"));
        assert_eq!(stage.actions_played(), 1);
    }
}

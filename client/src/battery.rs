//! Simulated battery for the `simulate` subcommand.

use rand::Rng;

const FULL_VOLTAGE: f32 = 4.2;
const EMPTY_VOLTAGE: f32 = 3.3;

/// Discharges by a random step per reading and recharges once empty
pub struct BatterySimulator<R: Rng> {
    rng: R,
    percentage: f32,
    max_step: f32,
}

impl<R: Rng> BatterySimulator<R> {
    pub fn new(rng: R, start_percentage: f32) -> Self {
        Self {
            rng,
            percentage: start_percentage.clamp(0.0, 100.0),
            max_step: 2.0,
        }
    }

    pub fn with_max_step(mut self, max_step: f32) -> Self {
        self.max_step = max_step.max(0.0);
        self
    }

    /// Returns the next `(voltage, percentage)` reading
    pub fn next_reading(&mut self) -> (f32, f32) {
        let step = if self.max_step > 0.0 {
            self.rng.gen_range(0.0..=self.max_step)
        } else {
            0.0
        };
        self.percentage -= step;
        if self.percentage <= 0.0 {
            self.percentage = 100.0;
        }

        let noise: f32 = self.rng.gen_range(-0.01..=0.01);
        let voltage = EMPTY_VOLTAGE + (FULL_VOLTAGE - EMPTY_VOLTAGE) * self.percentage / 100.0 + noise;
        (voltage, self.percentage)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_readings_stay_in_range() {
        let mut battery = BatterySimulator::new(StdRng::seed_from_u64(7), 10.0).with_max_step(5.0);
        for _ in 0..1000 {
            let (voltage, percentage) = battery.next_reading();
            assert!((0.0..=100.0).contains(&percentage));
            assert!(voltage > EMPTY_VOLTAGE - 0.02 && voltage < FULL_VOLTAGE + 0.02);
        }
    }

    #[test]
    fn test_discharges_monotonically_until_empty() {
        let mut battery = BatterySimulator::new(StdRng::seed_from_u64(1), 100.0).with_max_step(1.0);
        let mut last = 100.0;
        for _ in 0..50 {
            let (_, percentage) = battery.next_reading();
            assert!(percentage <= last);
            last = percentage;
        }
    }

    #[test]
    fn test_start_is_clamped() {
        let mut battery = BatterySimulator::new(StdRng::seed_from_u64(3), 250.0).with_max_step(0.0);
        assert_eq!(battery.next_reading().1, 100.0);
    }
}

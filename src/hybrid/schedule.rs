//! Cosine annealing learning-rate schedule, stepped once per epoch.

use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CosineAnnealingLr {
    pub base_lr: f64,
    pub eta_min: f64,
    /// Number of steps in a half cosine period
    pub t_max: usize,
    /// Steps taken so far
    pub last_step: usize,
}

impl CosineAnnealingLr {
    pub fn new(base_lr: f64, t_max: usize) -> Self {
        Self {
            base_lr,
            eta_min: 0.0,
            t_max,
            last_step: 0,
        }
    }

    /// Learning rate for the current step.
    pub fn lr(&self) -> f64 {
        if self.t_max == 0 {
            return self.base_lr;
        }
        let progress = self.last_step as f64 / self.t_max as f64;
        self.eta_min + (self.base_lr - self.eta_min) * (1.0 + (PI * progress).cos()) / 2.0
    }

    /// Advance one step and return the new learning rate.
    pub fn step(&mut self) -> f64 {
        self.last_step += 1;
        self.lr()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-12
    }

    #[test]
    fn test_starts_at_base_lr() {
        let schedule = CosineAnnealingLr::new(1e-5, 10);
        assert!(approx(schedule.lr(), 1e-5));
    }

    #[test]
    fn test_half_and_full_period() {
        let mut schedule = CosineAnnealingLr::new(1e-5, 10);
        for _ in 0..5 {
            schedule.step();
        }
        assert!(approx(schedule.lr(), 5e-6));
        for _ in 0..5 {
            schedule.step();
        }
        assert!(approx(schedule.lr(), 0.0));
    }

    #[test]
    fn test_monotone_decrease() {
        let mut schedule = CosineAnnealingLr::new(1.0, 4);
        let mut prev = schedule.lr();
        for _ in 0..4 {
            let lr = schedule.step();
            assert!(lr < prev);
            prev = lr;
        }
    }

    #[test]
    fn test_state_round_trip() {
        let mut schedule = CosineAnnealingLr::new(2e-5, 3);
        schedule.step();
        let json = serde_json::to_string(&schedule).unwrap();
        let restored: CosineAnnealingLr = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, schedule);
        assert!(approx(restored.lr(), schedule.lr()));
    }
}

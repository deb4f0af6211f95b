//! In-memory rest settings and input parsing at the dialog boundary.

use crate::config::RestDefaults;
use tracing::{debug, warn};

/// Two rest durations plus which one the timer should use. Lives only in
/// process memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RestSettings {
    between_sets: u32,
    between_workouts: u32,
    use_workout_timer: bool,
}

impl Default for RestSettings {
    fn default() -> Self {
        Self::from_defaults(&RestDefaults::default())
    }
}

impl RestSettings {
    pub fn from_defaults(defaults: &RestDefaults) -> Self {
        let fallback = Self {
            between_sets: 60,
            between_workouts: 120,
            use_workout_timer: defaults.use_workout_timer,
        };
        let mut settings = fallback;
        settings.set_between_sets(defaults.between_sets_secs);
        settings.set_between_workouts(defaults.between_workouts_secs);
        settings
    }

    pub const fn between_sets(&self) -> u32 {
        self.between_sets
    }

    pub const fn between_workouts(&self) -> u32 {
        self.between_workouts
    }

    pub const fn use_workout_timer(&self) -> bool {
        self.use_workout_timer
    }

    /// Zero is not a usable rest and keeps the previous value.
    pub fn set_between_sets(&mut self, seconds: u32) {
        if seconds == 0 {
            warn!("Ignoring zero rest between sets");
            return;
        }
        self.between_sets = seconds;
    }

    pub fn set_between_workouts(&mut self, seconds: u32) {
        if seconds == 0 {
            warn!("Ignoring zero rest between workouts");
            return;
        }
        self.between_workouts = seconds;
    }

    pub fn set_use_workout_timer(&mut self, use_workout: bool) {
        self.use_workout_timer = use_workout;
        debug!(
            choice = if use_workout { "workout" } else { "set" },
            "Timer choice changed"
        );
    }

    /// Applies a typed-in duration to whichever timer is active. Returns
    /// `false` when the text was unusable and the previous value was kept.
    pub fn apply_override(&mut self, input: &str) -> bool {
        let usable = is_positive_seconds(input);
        let seconds = parse_seconds(input, self.active_duration());
        if self.use_workout_timer {
            self.set_between_workouts(seconds);
        } else {
            self.set_between_sets(seconds);
        }
        usable
    }

    /// Duration the rest timer should start with.
    pub const fn active_duration(&self) -> u32 {
        if self.use_workout_timer {
            self.between_workouts
        } else {
            self.between_sets
        }
    }
}

fn is_positive_seconds(input: &str) -> bool {
    matches!(input.trim().parse::<u32>(), Ok(seconds) if seconds > 0)
}

/// Parses a seconds field, falling back to `previous` when the text is not a
/// positive whole number.
pub fn parse_seconds(input: &str, previous: u32) -> u32 {
    match input.trim().parse::<u32>() {
        Ok(seconds) if seconds > 0 => seconds,
        _ => {
            debug!(input, previous, "Unusable seconds input, keeping previous value");
            previous
        }
    }
}

/// Parses a weight field. `None` means the confirm action must not fire.
pub fn parse_weight(input: &str) -> Option<f64> {
    match input.trim().parse::<f64>() {
        Ok(weight) if weight.is_finite() && weight >= 0.0 => Some(weight),
        _ => {
            debug!(input, "Rejected weight input");
            None
        }
    }
}

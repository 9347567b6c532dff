use crate::{
    core::{Direction, schedule::entry::ScheduleEntry},
    quantity::{percentage::Percentage, time::Minutes},
};

/// Empirical cleanup boundaries applied to the solved schedule.
#[derive(Copy, Clone, Debug)]
pub struct CleanupThresholds {
    /// Short charging after discharging is kept only when it ends at or above this level.
    pub suppress_ceiling: Percentage,

    /// Short discharging after charging is kept only when it ends at or below this level.
    pub suppress_floor: Percentage,

    /// Partial charging ending at or above this level is stretched over the whole period.
    pub park_full: Percentage,

    /// Partial discharging ending at or below this level is stretched over the whole period.
    pub park_empty: Percentage,

    /// Shortest worthy activity is the interval divided by this.
    pub min_duration_divisor: f64,
}

impl Default for CleanupThresholds {
    fn default() -> Self {
        Self {
            suppress_ceiling: Percentage(95.0),
            suppress_floor: Percentage(5.0),
            park_full: Percentage(97.0),
            park_empty: Percentage(3.0),
            min_duration_divisor: 6.0,
        }
    }
}

impl CleanupThresholds {
    pub fn min_duration(&self, interval: Minutes) -> Minutes {
        Minutes((interval.0 / self.min_duration_divisor).round().max(1.0))
    }

    /// Whether the entry is a short flip of the previous direction that should be zeroed out.
    #[must_use]
    pub fn should_suppress(
        &self,
        entry: &ScheduleEntry,
        previous: Option<Direction>,
        min_duration: Minutes,
    ) -> bool {
        let Some(direction) = entry.direction() else {
            return false;
        };
        if previous != Some(direction.opposite()) || entry.active_time >= min_duration {
            return false;
        }
        match direction {
            Direction::Charge => entry.soc_after < self.suppress_ceiling,
            Direction::Discharge => entry.soc_after > self.suppress_floor,
        }
    }

    /// Whether the entry is a partial activity that has already reached its boundary.
    #[must_use]
    pub fn should_park(&self, entry: &ScheduleEntry) -> bool {
        if !entry.is_partial() {
            return false;
        }
        match entry.direction() {
            Some(Direction::Charge) => entry.soc_after >= self.park_full,
            Some(Direction::Discharge) => entry.soc_after <= self.park_empty,
            None => false,
        }
    }
}

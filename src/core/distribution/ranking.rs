use itertools::Itertools;

use crate::{
    core::{Direction, distribution::battery::BatteryState},
    quantity::{percentage::Percentage, power::Watts},
};

/// Lowest proportional weight, so that batteries at a state-of-charge extreme still get a share.
const MIN_WEIGHT: f64 = 0.1;

/// Empirical anti-flapping parameters.
#[derive(Copy, Clone, Debug)]
pub struct Hysteresis {
    /// Ranking bonus of a battery already active in the requested direction.
    pub soc_bonus: Percentage,

    /// Previous target magnitude above which a battery is considered active.
    pub active_threshold: Watts,

    /// Allowed excess over the efficient power for a battery that becomes active.
    pub efficiency_allowance: f64,
}

impl Default for Hysteresis {
    fn default() -> Self {
        Self {
            soc_bonus: Percentage(20.0),
            active_threshold: Watts(10.0),
            efficiency_allowance: 1.1,
        }
    }
}

/// State-of-charge room in the direction: stored energy for discharging, free space for charging.
fn room(battery: &BatteryState, direction: Direction) -> f64 {
    let soc = battery.soc.saturate();
    match direction {
        Direction::Charge => (Percentage::HUNDRED - soc).0,
        Direction::Discharge => soc.0,
    }
}

/// Proportional split weight.
pub fn weight(battery: &BatteryState, direction: Direction) -> f64 {
    room(battery, direction).max(MIN_WEIGHT)
}

/// Battery indices ordered from the most to the least suitable for the direction.
///
/// Ties keep the input order.
pub fn rank(
    batteries: &[BatteryState],
    direction: Direction,
    hysteresis: Option<&Hysteresis>,
) -> Vec<usize> {
    let score = |battery: &BatteryState| {
        let bonus = hysteresis
            .filter(|hysteresis| battery.was_active(direction, hysteresis.active_threshold))
            .map_or(0.0, |hysteresis| hysteresis.soc_bonus.0);
        room(battery, direction) + bonus
    };
    (0..batteries.len())
        .sorted_by(|lhs, rhs| score(&batteries[*rhs]).total_cmp(&score(&batteries[*lhs])))
        .collect()
}

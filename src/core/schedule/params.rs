use bon::Builder;
use chrono::{DateTime, Local};
use serde::Deserialize;

use crate::{
    core::{Direction, schedule::cleanup::CleanupThresholds},
    quantity::{
        energy::KilowattHours,
        percentage::Percentage,
        power::Watts,
        rate::KilowattHourRate,
        time::{Hours, Minutes},
    },
};

/// Maximum number of periods the optimizer looks ahead.
pub const MAX_PERIODS: usize = 120;

/// Maximum look-ahead time regardless of the interval length.
pub const MAX_HORIZON: Hours = Hours(48.0);

/// Single price forecast entry.
#[derive(Copy, Clone, Debug, Deserialize)]
pub struct PricePeriod {
    pub start: DateTime<Local>,

    /// Price per kilowatt-hour, normalized by the caller.
    pub price: KilowattHourRate,
}

/// Selectable charging or discharging operating point.
#[derive(Copy, Clone, Debug, Deserialize)]
pub struct PowerTier {
    pub power: Watts,

    /// Efficiency, `(0, 1]`.
    pub efficiency: f64,
}

impl PowerTier {
    /// Tiers are optional hardware configuration: degenerate ones are treated as absent.
    #[must_use]
    pub fn is_usable(&self) -> bool {
        self.power.is_finite()
            && self.power > Watts::ZERO
            && self.efficiency.is_finite()
            && self.efficiency > 0.0
            && self.efficiency <= 1.0
    }
}

#[derive(Clone, Debug, Builder, Deserialize)]
pub struct BatteryParams {
    /// Usable capacity.
    pub capacity: KilowattHours,

    #[serde(default)]
    #[builder(default)]
    pub charge_tiers: Vec<PowerTier>,

    #[serde(default)]
    #[builder(default)]
    pub discharge_tiers: Vec<PowerTier>,

    pub start_soc: Percentage,

    /// Per-kilowatt-hour margin added to every trade.
    ///
    /// Defaults to a half of the minimal price delta, see [`ScheduleOptions::fixed_cost`].
    #[serde(default)]
    pub fixed_cost: Option<KilowattHourRate>,
}

impl BatteryParams {
    pub fn usable_tiers(&self, direction: Direction) -> impl Iterator<Item = PowerTier> + '_ {
        match direction {
            Direction::Charge => &self.charge_tiers,
            Direction::Discharge => &self.discharge_tiers,
        }
        .iter()
        .copied()
        .filter(PowerTier::is_usable)
    }

    /// Highest usable tier power in the direction, zero if none.
    pub fn max_power(&self, direction: Direction) -> Watts {
        self.usable_tiers(direction).map(|tier| tier.power).max().unwrap_or(Watts::ZERO)
    }

    pub fn initial_residual_energy(&self) -> KilowattHours {
        self.capacity * self.start_soc.saturate().to_ratio()
    }
}

#[derive(Copy, Clone, Debug, Builder)]
pub struct ScheduleOptions {
    /// Price period length.
    pub interval: Minutes,

    /// Minimal price swing worth trading.
    pub min_price_delta: KilowattHourRate,

    /// Time already passed in the first period.
    #[builder(default)]
    pub elapsed_in_first_period: Minutes,

    #[builder(default)]
    pub cleanup: CleanupThresholds,

    /// Maximum number of periods to optimize.
    #[builder(default = MAX_PERIODS)]
    pub horizon_cap: usize,
}

impl ScheduleOptions {
    pub fn fixed_cost(&self, battery: &BatteryParams) -> KilowattHourRate {
        battery.fixed_cost.unwrap_or(self.min_price_delta * 0.5)
    }

    /// Number of periods to optimize out of the available ones.
    #[must_use]
    #[expect(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn n_periods(&self, n_available: usize) -> usize {
        let max_by_time = (MAX_HORIZON.0 / Hours::from(self.interval).0).floor().max(1.0) as usize;
        n_available.min(max_by_time).min(self.horizon_cap)
    }

    /// Usable share of the first period.
    #[must_use]
    pub fn first_period_availability(&self) -> f64 {
        (1.0 - self.elapsed_in_first_period / self.interval).clamp(0.0, 1.0)
    }
}

use crate::{
    core::{
        Direction,
        distribution::{
            battery::BatteryState,
            ranking::{Hysteresis, weight},
        },
    },
    prelude::trace,
    quantity::power::Watts,
};

/// Per-battery allocations indexed like the input batteries.
pub type Allocation = Vec<Watts>;

/// Split the aggregate across the subset in proportion to the weights, clamping to the battery limits.
pub fn split(
    batteries: &[BatteryState],
    subset: &[usize],
    direction: Direction,
    aggregate: Watts,
) -> Allocation {
    let total_weight: f64 = subset.iter().map(|index| weight(&batteries[*index], direction)).sum();
    let mut allocation = vec![Watts::ZERO; batteries.len()];
    for index in subset {
        let battery = &batteries[*index];
        let share = aggregate * (weight(battery, direction) / total_weight);
        allocation[*index] = battery.bounds().clamp(share);
    }
    allocation
}

/// Subset search over the ranked batteries.
pub struct Search<'a> {
    pub batteries: &'a [BatteryState],
    pub ranked: &'a [usize],
    pub direction: Direction,
    pub aggregate: Watts,
    pub tolerance: Watts,
    pub hysteresis: &'a Hysteresis,
}

impl Search<'_> {
    /// Allocation over the smallest leading subset that reaches the aggregate within the efficiency bound.
    ///
    /// Falls back to the smallest subset that merely reaches the aggregate,
    /// and then to the entire fleet when nothing does.
    pub fn run(&self) -> Allocation {
        let mut fallback = None;
        for n_batteries in 1..=self.ranked.len() {
            let allocation =
                split(self.batteries, &self.ranked[..n_batteries], self.direction, self.aggregate);
            if !self.is_feasible(&allocation) {
                continue;
            }
            if self.is_efficient(&allocation) {
                trace!(n_batteries, "found an efficient subset");
                return allocation;
            }
            if fallback.is_none() {
                trace!(n_batteries, "found a feasible subset");
                fallback = Some(allocation);
            }
        }
        fallback.unwrap_or_else(|| {
            trace!("no subset is feasible, splitting across the entire fleet");
            split(self.batteries, self.ranked, self.direction, self.aggregate)
        })
    }

    fn is_feasible(&self, allocation: &[Watts]) -> bool {
        let total: Watts = allocation.iter().copied().sum();
        (total - self.aggregate).abs() <= self.tolerance
    }

    fn is_efficient(&self, allocation: &[Watts]) -> bool {
        self.batteries.iter().zip(allocation).all(|(battery, allocation)| {
            let efficient_power = battery.efficient_power(self.direction);
            *allocation == Watts::ZERO
                || efficient_power <= Watts::ZERO
                || battery.was_active(self.direction, self.hysteresis.active_threshold)
                || allocation.abs() <= efficient_power * self.hysteresis.efficiency_allowance
        })
    }
}

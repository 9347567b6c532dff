use bon::bon;

use crate::{
    core::{
        Direction,
        lp::{LinearProgram, Row, VariableId},
        schedule::params::{PowerTier, PricePeriod},
    },
    quantity::{energy::KilowattHours, power::Watts, rate::KilowattHourRate, time::Hours},
};

/// Activations below this share of a period are solver noise.
const ACTIVATION_EPSILON: f64 = 1e-4;

#[derive(Copy, Clone, Debug)]
pub struct Tier {
    pub direction: Direction,
    pub power: Watts,
    pub efficiency: f64,
}

impl Tier {
    pub const fn new(direction: Direction, tier: PowerTier) -> Self {
        Self { direction, power: tier.power, efficiency: tier.efficiency }
    }

    /// Signed energy exchanged with the grid when active for the whole duration.
    pub fn grid_energy(self, duration: Hours) -> KilowattHours {
        self.power * duration * self.direction.sign()
    }

    /// Signed change of the residual energy when active for the whole duration.
    pub fn stored_energy(self, duration: Hours) -> KilowattHours {
        match self.direction {
            Direction::Charge => self.power * duration * self.efficiency,
            Direction::Discharge => -(self.power * duration / self.efficiency),
        }
    }
}

/// Tier active for a share of a period.
#[derive(Copy, Clone, Debug)]
pub struct Activation {
    pub tier: Tier,

    /// Share of the period duration, `0..=1`.
    pub fraction: f64,
}

/// Activations planned for one period.
#[derive(Clone, Debug)]
pub struct PeriodPlan {
    /// Usable share of the period.
    pub availability: f64,

    pub activations: Vec<Activation>,
}

/// Battery schedule expressed as a linear program.
///
/// Variables:
///
/// - one activation share per period and tier, bounded by the period availability;
/// - one residual energy per period, bounded by the capacity.
///
/// Rows:
///
/// - residual energy continuity between the consecutive periods;
/// - tiers share the period time, so their activations sum up to at most the availability.
pub struct Model {
    pub program: LinearProgram,
    periods: Vec<(f64, Vec<(Tier, VariableId)>)>,
}

#[bon]
impl Model {
    #[builder]
    pub fn new(
        prices: &[PricePeriod],
        tiers: &[Tier],
        interval: Hours,
        first_period_availability: f64,
        capacity: KilowattHours,
        initial_residual_energy: KilowattHours,
        fixed_cost: KilowattHourRate,
    ) -> Self {
        let mut program = LinearProgram::default();
        let mut periods = Vec::with_capacity(prices.len());
        let mut previous_residual_energy: Option<VariableId> = None;

        for (index, period) in prices.iter().enumerate() {
            let availability = if index == 0 { first_period_availability } else { 1.0 };

            let activations: Vec<(Tier, VariableId)> = tiers
                .iter()
                .map(|tier| {
                    let margin = match tier.direction {
                        Direction::Charge => fixed_cost + period.price,
                        Direction::Discharge => fixed_cost - period.price,
                    };
                    let cost = tier.power * interval * margin;
                    (*tier, program.add_variable((0.0..=availability).into(), cost.0))
                })
                .collect();
            let residual_energy = program.add_variable((0.0..=capacity.0).into(), 0.0);

            let mut terms = vec![(residual_energy, 1.0)];
            terms.extend(
                activations.iter().map(|(tier, id)| (*id, -tier.stored_energy(interval).0)),
            );
            let rhs = if let Some(previous) = previous_residual_energy {
                terms.push((previous, -1.0));
                0.0
            } else {
                initial_residual_energy.0
            };
            program.add_row(Row::equal(terms, rhs));

            if !activations.is_empty() {
                program.add_row(Row::less_or_equal(
                    activations.iter().map(|(_, id)| (*id, 1.0)).collect(),
                    availability,
                ));
            }

            previous_residual_energy = Some(residual_energy);
            periods.push((availability, activations));
        }

        Self { program, periods }
    }
}

impl Model {
    /// Extract the per-period activations from the solver output.
    pub fn plan(&self, values: &[f64]) -> Vec<PeriodPlan> {
        self.periods
            .iter()
            .map(|(availability, variables)| {
                let mut activations: Vec<Activation> = variables
                    .iter()
                    .filter_map(|(tier, id)| {
                        let fraction = values[id.index()].clamp(0.0, *availability);
                        (fraction >= ACTIVATION_EPSILON)
                            .then_some(Activation { tier: *tier, fraction })
                    })
                    .collect();

                // Solver tolerance may slightly overshoot the shared time:
                let total: f64 = activations.iter().map(|activation| activation.fraction).sum();
                if total > *availability {
                    for activation in &mut activations {
                        activation.fraction *= availability / total;
                    }
                }

                PeriodPlan { availability: *availability, activations }
            })
            .collect()
    }
}

use crate::{
    core::schedule::model::Activation,
    quantity::{energy::KilowattHours, time::Hours},
};

/// Replays planned activations against the battery, keeping the residual energy within capacity.
#[derive(Copy, Clone, Debug)]
pub struct Simulator {
    pub residual_energy: KilowattHours,
    pub capacity: KilowattHours,
}

impl Simulator {
    pub const fn new(residual_energy: KilowattHours, capacity: KilowattHours) -> Self {
        Self { residual_energy, capacity }
    }

    /// Apply the activations over the period, update the residual energy and return the actual flow.
    ///
    /// When the requested energy does not fit, all activations are shortened proportionally
    /// so that the battery stops right at the boundary.
    pub fn apply(&mut self, activations: &[Activation], period: Hours) -> Outcome {
        let requested_stored: KilowattHours = activations
            .iter()
            .map(|activation| activation.tier.stored_energy(period) * activation.fraction)
            .sum();
        let requested_grid: KilowattHours = activations
            .iter()
            .map(|activation| activation.tier.grid_energy(period) * activation.fraction)
            .sum();
        let requested_fraction: f64 =
            activations.iter().map(|activation| activation.fraction).sum();

        let target =
            (self.residual_energy + requested_stored).clamp(KilowattHours::ZERO, self.capacity);
        let actual_stored = target - self.residual_energy;
        let scale = if requested_stored == KilowattHours::ZERO {
            1.0
        } else {
            (actual_stored / requested_stored).clamp(0.0, 1.0)
        };

        self.residual_energy = target;
        Outcome {
            active_fraction: requested_fraction * scale,
            grid_energy: requested_grid * scale,
            stored_energy: actual_stored,
        }
    }
}

#[derive(Copy, Clone, Debug)]
pub struct Outcome {
    /// Share of the period the battery was actually active.
    pub active_fraction: f64,

    /// Signed energy exchanged with the grid, positive when importing.
    pub grid_energy: KilowattHours,

    /// Signed change of the residual energy.
    pub stored_energy: KilowattHours,
}

impl Outcome {
    pub const IDLE: Self = Self {
        active_fraction: 0.0,
        grid_energy: KilowattHours::ZERO,
        stored_energy: KilowattHours::ZERO,
    };
}

//! Real-time split of an aggregate power target across a battery fleet.

mod allocation;
mod battery;
mod ranking;
mod remainder;

use bon::Builder;

pub use self::{
    battery::{BatteryState, DistributionTarget, Fleet},
    ranking::Hysteresis,
};
use self::{allocation::Search, ranking::rank, remainder::Remainder};
use crate::{
    core::{Direction, Error},
    prelude::{debug, instrument},
    quantity::power::Watts,
};

/// Acceptable mismatch between the requested aggregate and the sum of the targets.
pub const TOLERANCE: Watts = Watts(10.0);

/// Distribute the aggregate target with the default tuning.
pub fn compute_distribution(
    batteries: &[BatteryState],
    aggregate: Watts,
    min_load: Watts,
) -> Result<Vec<DistributionTarget>, Error> {
    Controller::builder().build().distribute(batteries, aggregate, min_load)
}

#[must_use]
#[derive(Copy, Clone, Debug, Builder)]
pub struct Controller {
    #[builder(default)]
    hysteresis: Hysteresis,

    #[builder(default = TOLERANCE)]
    tolerance: Watts,
}

impl Controller {
    /// Compute the per-battery targets for a single tick.
    ///
    /// The output follows the input order. The controller is memoryless:
    /// hysteresis relies solely on [`BatteryState::last_target`] supplied by the caller.
    #[instrument(skip_all, fields(aggregate = %aggregate, min_load = %min_load))]
    pub fn distribute(
        &self,
        batteries: &[BatteryState],
        aggregate: Watts,
        min_load: Watts,
    ) -> Result<Vec<DistributionTarget>, Error> {
        Self::validate(batteries, aggregate, min_load)?;
        let min_load = min_load.max(Watts::ZERO);

        let Some(direction) = Direction::of(aggregate) else {
            return Ok(Self::targets(batteries, batteries.iter().map(|_| Watts::ZERO)));
        };
        if batteries.is_empty() {
            return Ok(Vec::new());
        }

        let ranked = rank(batteries, direction, Some(&self.hysteresis));
        let mut allocation = Search {
            batteries,
            ranked: &ranked,
            direction,
            aggregate,
            tolerance: self.tolerance,
            hysteresis: &self.hysteresis,
        }
        .run();

        // A small demand is served even if it is below the minimal load:
        if min_load > Watts::ZERO && aggregate.abs() >= min_load {
            for share in allocation.iter_mut().filter(|share| share.abs() < min_load) {
                *share = Watts::ZERO;
            }
        }

        Remainder { batteries, direction, aggregate, tolerance: self.tolerance, min_load }
            .distribute(&mut allocation);

        let shares: Vec<Watts> = batteries
            .iter()
            .zip(allocation)
            .map(|(battery, share)| {
                if Direction::of(share) == Some(direction.opposite()) {
                    Watts::ZERO
                } else {
                    battery.bounds().clamp(share)
                }
            })
            .collect();
        let targets = Self::targets(batteries, round_shares(batteries, &shares));
        debug!(
            n_active = targets.iter().filter(|target| target.target != Watts::ZERO).count(),
            total = %targets.iter().map(|target| target.target).sum::<Watts>(),
            "distributed",
        );
        Ok(targets)
    }

    fn validate(batteries: &[BatteryState], aggregate: Watts, min_load: Watts) -> Result<(), Error> {
        if !aggregate.is_finite() || !min_load.is_finite() {
            return Err(Error::invalid_input("the aggregate target and minimal load must be finite"));
        }
        for battery in batteries {
            if !battery.soc.is_finite() {
                return Err(Error::invalid_input(format!(
                    "state-of-charge of `{}` is not finite",
                    battery.id,
                )));
            }
            if !battery.max_charge.is_finite() || !battery.max_discharge.is_finite() {
                return Err(Error::invalid_input(format!(
                    "power limits of `{}` must be finite",
                    battery.id,
                )));
            }
        }
        Ok(())
    }

    fn targets(
        batteries: &[BatteryState],
        powers: impl IntoIterator<Item = Watts>,
    ) -> Vec<DistributionTarget> {
        batteries
            .iter()
            .zip(powers)
            .map(|(battery, target)| DistributionTarget { id: battery.id.clone(), target })
            .collect()
    }
}

/// Round the shares to whole watts, keeping their sum within a watt of the unrounded one.
///
/// The rounding residual is handed out one watt at a time to the active batteries
/// that lost the most to the rounding, as long as they stay within their bounds.
fn round_shares(batteries: &[BatteryState], shares: &[Watts]) -> Vec<Watts> {
    let mut rounded: Vec<Watts> = batteries
        .iter()
        .zip(shares)
        .map(|(battery, share)| battery.bounds().clamp(share.round()))
        .collect();
    let residual = (shares.iter().copied().sum::<Watts>() - rounded.iter().copied().sum::<Watts>())
        .round();
    let step = Watts(residual.signum());

    #[expect(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let n_steps = residual.abs().0 as usize;
    for _ in 0..n_steps {
        let candidate = (0..shares.len())
            .filter(|index| shares[*index] != Watts::ZERO)
            .filter(|index| Direction::of(shares[*index] - rounded[*index]) == Direction::of(step))
            .filter(|index| batteries[*index].bounds().contains(rounded[*index] + step))
            .min_by_key(|index| -(shares[*index] - rounded[*index]).abs());
        let Some(index) = candidate else {
            break;
        };
        rounded[index] += step;
    }
    rounded
}

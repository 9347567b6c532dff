use crate::{
    core::{
        Direction,
        distribution::{allocation::Allocation, battery::BatteryState, ranking::rank},
    },
    quantity::power::Watts,
};

/// Shortfall left after clamping and the minimal load cut.
pub struct Remainder<'a> {
    pub batteries: &'a [BatteryState],
    pub direction: Direction,
    pub aggregate: Watts,
    pub tolerance: Watts,
    pub min_load: Watts,
}

impl Remainder<'_> {
    pub fn distribute(&self, allocation: &mut Allocation) {
        self.spread(allocation);
        self.pick_up(allocation);
    }

    /// Unsigned power still missing towards the aggregate.
    fn shortfall(&self, allocation: &[Watts]) -> Watts {
        let total: Watts = allocation.iter().copied().sum();
        ((self.aggregate - total) * self.direction.sign()).max(Watts::ZERO)
    }

    /// Spread the shortfall across the already active batteries in proportion to their headroom.
    fn spread(&self, allocation: &mut Allocation) {
        let shortfall = self.shortfall(allocation);
        if shortfall < self.tolerance {
            return;
        }
        let headrooms: Vec<Watts> = self
            .batteries
            .iter()
            .zip(allocation.iter())
            .map(|(battery, share)| {
                if *share == Watts::ZERO {
                    Watts::ZERO
                } else {
                    battery.headroom(self.direction, *share)
                }
            })
            .collect();
        let total_headroom: Watts = headrooms.iter().copied().sum();
        if total_headroom <= Watts::ZERO {
            return;
        }
        let spread = shortfall.min(total_headroom);
        for ((share, headroom), battery) in
            allocation.iter_mut().zip(&headrooms).zip(self.batteries)
        {
            if *headroom > Watts::ZERO {
                let delta = spread * (*headroom / total_headroom) * self.direction.sign();
                *share = battery.bounds().clamp(*share + delta);
            }
        }
    }

    /// Assign what is still missing to the most suitable batteries one by one.
    fn pick_up(&self, allocation: &mut Allocation) {
        for index in rank(self.batteries, self.direction, None) {
            let shortfall = self.shortfall(allocation);
            if shortfall < self.tolerance {
                break;
            }
            let battery = &self.batteries[index];
            let amount = shortfall.min(battery.headroom(self.direction, allocation[index]));
            if amount <= Watts::ZERO {
                continue;
            }
            if allocation[index] == Watts::ZERO && amount < self.min_load {
                continue;
            }
            allocation[index] =
                battery.bounds().clamp(allocation[index] + amount * self.direction.sign());
        }
    }
}

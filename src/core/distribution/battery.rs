use serde::{Deserialize, Serialize};

use crate::{
    core::Direction,
    ops::RangeInclusive,
    quantity::{percentage::Percentage, power::Watts},
};

/// Live battery telemetry for a single tick.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct BatteryState {
    pub id: String,

    pub max_charge: Watts,
    pub max_discharge: Watts,

    /// Power the battery runs most efficiently at when charging, zero when unknown.
    #[serde(default)]
    pub efficient_charge: Watts,

    /// Power the battery runs most efficiently at when discharging, zero when unknown.
    #[serde(default)]
    pub efficient_discharge: Watts,

    pub soc: Percentage,

    /// Target commanded on the previous tick, owned and threaded by the caller.
    #[serde(default)]
    pub last_target: Watts,
}

impl BatteryState {
    /// Signed power limits, positive when charging.
    pub fn bounds(&self) -> RangeInclusive<Watts> {
        RangeInclusive {
            min: -self.max_discharge.max(Watts::ZERO),
            max: self.max_charge.max(Watts::ZERO),
        }
    }

    /// Power limit magnitude in the direction.
    pub fn limit(&self, direction: Direction) -> Watts {
        match direction {
            Direction::Charge => self.max_charge,
            Direction::Discharge => self.max_discharge,
        }
        .max(Watts::ZERO)
    }

    pub fn efficient_power(&self, direction: Direction) -> Watts {
        match direction {
            Direction::Charge => self.efficient_charge,
            Direction::Discharge => self.efficient_discharge,
        }
    }

    /// Remaining power magnitude in the direction on top of the current allocation.
    pub fn headroom(&self, direction: Direction, allocation: Watts) -> Watts {
        (self.limit(direction) - allocation * direction.sign()).max(Watts::ZERO)
    }

    /// Whether the previous target was a real activity in the direction.
    #[must_use]
    pub fn was_active(&self, direction: Direction, threshold: Watts) -> bool {
        Direction::of(self.last_target) == Some(direction) && self.last_target.abs() > threshold
    }
}

/// Power command for a single battery.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct DistributionTarget {
    pub id: String,
    pub target: Watts,
}

/// Battery group telemetry snapshot.
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct Fleet {
    #[serde(default)]
    pub batteries: Vec<BatteryState>,
}

impl Fleet {
    /// Telemetry for the next tick with the just computed targets remembered.
    ///
    /// Batteries without a target are considered idle.
    #[must_use]
    pub fn apply(&self, targets: &[DistributionTarget]) -> Self {
        let batteries = self
            .batteries
            .iter()
            .map(|battery| BatteryState {
                last_target: targets
                    .iter()
                    .find(|target| target.id == battery.id)
                    .map_or(Watts::ZERO, |target| target.target),
                ..battery.clone()
            })
            .collect();
        Self { batteries }
    }

    /// Total power the fleet is able to provide in the direction.
    pub fn capability(&self, direction: Direction) -> Watts {
        self.batteries.iter().map(|battery| battery.limit(direction)).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn battery(id: &str, last_target: f64) -> BatteryState {
        BatteryState {
            id: id.to_string(),
            max_charge: Watts(2000.0),
            max_discharge: Watts(1500.0),
            efficient_charge: Watts(600.0),
            efficient_discharge: Watts(400.0),
            soc: Percentage(50.0),
            last_target: Watts(last_target),
        }
    }

    #[test]
    fn headroom_ok() {
        let battery = battery("a", 0.0);
        assert_eq!(battery.headroom(Direction::Discharge, Watts(-500.0)), Watts(1000.0));
        assert_eq!(battery.headroom(Direction::Charge, Watts(500.0)), Watts(1500.0));
        assert_eq!(battery.headroom(Direction::Charge, Watts(2500.0)), Watts::ZERO);
        assert_eq!(battery.bounds(), RangeInclusive { min: Watts(-1500.0), max: Watts(2000.0) });
    }

    #[test]
    fn was_active_ok() {
        let threshold = Watts(10.0);
        assert!(battery("a", -300.0).was_active(Direction::Discharge, threshold));
        assert!(!battery("a", -300.0).was_active(Direction::Charge, threshold));
        assert!(!battery("a", -5.0).was_active(Direction::Discharge, threshold));
        assert!(!battery("a", 0.0).was_active(Direction::Discharge, threshold));
    }

    #[test]
    fn apply_threads_targets() {
        let fleet = Fleet { batteries: vec![battery("a", 100.0), battery("b", 100.0)] };
        let next =
            fleet.apply(&[DistributionTarget { id: "a".to_string(), target: Watts(-250.0) }]);
        assert_eq!(next.batteries[0].last_target, Watts(-250.0));
        assert_eq!(next.batteries[1].last_target, Watts::ZERO);
        assert_eq!(fleet.batteries[0].last_target, Watts(100.0));
    }

    #[test]
    fn capability_ok() {
        let fleet = Fleet { batteries: vec![battery("a", 0.0), battery("b", 0.0)] };
        assert_eq!(fleet.capability(Direction::Charge), Watts(4000.0));
        assert_eq!(fleet.capability(Direction::Discharge), Watts(3000.0));
    }

    #[test]
    fn deserialize_ok() {
        let fleet: Fleet = toml::from_str(
            r#"
            [[batteries]]
            id = "attic"
            max_charge = 2000.0
            max_discharge = 2000.0
            soc = 80.0
            "#,
        )
        .unwrap();
        assert_eq!(fleet.batteries.len(), 1);
        assert_eq!(fleet.batteries[0].efficient_charge, Watts::ZERO);
        assert_eq!(fleet.batteries[0].last_target, Watts::ZERO);
    }
}

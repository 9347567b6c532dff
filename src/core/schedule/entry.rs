use std::fmt::{Display, Formatter};

use chrono::{DateTime, Local};
use comfy_table::{Attribute, Cell, Color, Table, modifiers, presets};

use crate::{
    core::Direction,
    quantity::{
        cost::Cost,
        energy::KilowattHours,
        percentage::Percentage,
        power::Watts,
        rate::KilowattHourRate,
        time::Minutes,
    },
};

/// Planned battery activity within a single price period.
#[must_use]
#[derive(Copy, Clone, Debug)]
pub struct ScheduleEntry {
    pub start: DateTime<Local>,
    pub price: KilowattHourRate,

    /// Signed power while active, positive when charging.
    pub power: Watts,

    /// Time the battery is active within the period.
    pub active_time: Minutes,

    /// Time usable within the period, shorter than the interval for the ongoing period.
    pub available_time: Minutes,

    /// Signed energy exchanged with the grid.
    pub grid_energy: KilowattHours,

    /// Signed change of the residual energy.
    pub stored_energy: KilowattHours,

    pub residual_energy_after: KilowattHours,
    pub soc_after: Percentage,
}

impl ScheduleEntry {
    #[must_use]
    pub fn direction(&self) -> Option<Direction> {
        Direction::of(self.power)
    }

    /// Active for only a part of the usable time.
    #[must_use]
    pub fn is_partial(&self) -> bool {
        self.direction().is_some() && self.active_time < self.available_time
    }
}

#[must_use]
#[derive(Clone, Debug)]
pub struct Schedule {
    pub entries: Vec<ScheduleEntry>,

    /// Objective value of the solved program.
    pub objective: Cost,

    pub initial_residual_energy: KilowattHours,
    pub capacity: KilowattHours,
}

impl Schedule {
    /// Entry to apply right now.
    #[must_use]
    pub fn first(&self) -> Option<&ScheduleEntry> {
        self.entries.first()
    }

    pub fn final_residual_energy(&self) -> KilowattHours {
        self.entries.last().map_or(self.initial_residual_energy, |entry| entry.residual_energy_after)
    }

    pub fn summary(&self) -> Summary {
        let mut summary = Summary {
            charge: KilowattHours::ZERO,
            discharge: KilowattHours::ZERO,
            grid_cost: Cost::ZERO,
            objective: self.objective,
        };
        for entry in &self.entries {
            if entry.grid_energy > KilowattHours::ZERO {
                summary.charge += entry.grid_energy;
            } else {
                summary.discharge -= entry.grid_energy;
            }
            summary.grid_cost += entry.grid_energy * entry.price;
        }
        summary
    }
}

#[must_use]
#[derive(Copy, Clone, Debug)]
pub struct Summary {
    /// Total energy imported to charge the battery.
    pub charge: KilowattHours,

    /// Total energy exported from the battery.
    pub discharge: KilowattHours,

    /// Net cost of the grid exchange, negative when the schedule earns.
    pub grid_cost: Cost,

    pub objective: Cost,
}

impl Display for Summary {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let mut table = Table::new();
        table
            .load_preset(presets::UTF8_FULL_CONDENSED)
            .apply_modifier(modifiers::UTF8_ROUND_CORNERS)
            .enforce_styling()
            .set_header(vec![
                Cell::from("Charge"),
                Cell::from("Discharge"),
                Cell::from("Grid cost"),
                Cell::from("Objective"),
            ])
            .add_row(vec![
                Cell::from(self.charge).fg(Color::Green),
                Cell::from(self.discharge).fg(Color::Blue),
                Cell::from(self.grid_cost).add_attribute(Attribute::Bold).fg(
                    if self.grid_cost > Cost::ZERO { Color::Red } else { Color::Green },
                ),
                Cell::from(self.objective).add_attribute(Attribute::Dim),
            ]);
        write!(f, "{table}")
    }
}

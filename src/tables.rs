use comfy_table::{Attribute, Cell, CellAlignment, Color, Table, modifiers, presets};

use crate::{
    core::{
        Direction,
        distribution::{DistributionTarget, Fleet},
        schedule::Schedule,
    },
    quantity::{power::Watts, rate::KilowattHourRate},
};

fn new_table() -> Table {
    let mut table = Table::new();
    table
        .load_preset(presets::UTF8_FULL_CONDENSED)
        .apply_modifier(modifiers::UTF8_ROUND_CORNERS)
        .enforce_styling();
    table
}

fn power_cell(power: Watts) -> Cell {
    let cell = Cell::new(power).set_alignment(CellAlignment::Right);
    match Direction::of(power) {
        Some(direction) => cell.fg(direction.color()),
        None => cell.add_attribute(Attribute::Dim),
    }
}

pub fn build_schedule_table(schedule: &Schedule) -> Table {
    let mean_price = if schedule.entries.is_empty() {
        KilowattHourRate::ZERO
    } else {
        #[expect(clippy::cast_precision_loss)]
        let n_entries = schedule.entries.len() as f64;
        schedule.entries.iter().map(|entry| entry.price).sum::<KilowattHourRate>() / n_entries
    };

    let mut table = new_table();
    table.set_header(vec![
        "Date", "Start", "Price", "Power", "Active", "Grid", "Stored", "Residual", "SoC",
    ]);
    for entry in &schedule.entries {
        table.add_row(vec![
            Cell::new(entry.start.format("%b %d")).add_attribute(Attribute::Dim),
            Cell::new(entry.start.format("%H:%M")),
            Cell::new(entry.price).fg(if entry.price >= mean_price {
                Color::Red
            } else {
                Color::Green
            }),
            power_cell(entry.power),
            Cell::new(entry.active_time).set_alignment(CellAlignment::Right).add_attribute(
                if entry.is_partial() { Attribute::Italic } else { Attribute::NormalIntensity },
            ),
            Cell::new(entry.grid_energy).set_alignment(CellAlignment::Right),
            Cell::new(entry.stored_energy).set_alignment(CellAlignment::Right),
            Cell::new(entry.residual_energy_after)
                .set_alignment(CellAlignment::Right)
                .add_attribute(Attribute::Dim),
            Cell::new(entry.soc_after).set_alignment(CellAlignment::Right),
        ]);
    }
    table
}

pub fn build_distribution_table(fleet: &Fleet, targets: &[DistributionTarget]) -> Table {
    let mut table = new_table();
    table.set_header(vec!["Battery", "SoC", "Charge", "Discharge", "Previous", "Target"]);
    for (battery, target) in fleet.batteries.iter().zip(targets) {
        table.add_row(vec![
            Cell::new(&battery.id).add_attribute(Attribute::Bold),
            Cell::new(battery.soc).set_alignment(CellAlignment::Right),
            Cell::new(battery.max_charge)
                .set_alignment(CellAlignment::Right)
                .add_attribute(Attribute::Dim),
            Cell::new(battery.max_discharge)
                .set_alignment(CellAlignment::Right)
                .add_attribute(Attribute::Dim),
            power_cell(battery.last_target),
            power_cell(target.target),
        ]);
    }
    let total: Watts = targets.iter().map(|target| target.target).sum();
    table.add_row(vec![
        Cell::new("Total").add_attribute(Attribute::Bold),
        Cell::new(""),
        Cell::new(""),
        Cell::new(""),
        Cell::new(""),
        power_cell(total).add_attribute(Attribute::Bold),
    ]);
    table
}

/// One row per tick with the aggregate, the per-battery targets and their sum.
pub fn build_replay_table(fleet: &Fleet, ticks: &[(Watts, Vec<DistributionTarget>)]) -> Table {
    let mut table = new_table();
    let mut header = vec![Cell::new("Tick"), Cell::new("Aggregate")];
    header.extend(fleet.batteries.iter().map(|battery| Cell::new(&battery.id)));
    header.push(Cell::new("Total"));
    table.set_header(header);

    for (index, (aggregate, targets)) in ticks.iter().enumerate() {
        let mut row = vec![
            Cell::new(index + 1).add_attribute(Attribute::Dim),
            power_cell(*aggregate).add_attribute(Attribute::Bold),
        ];
        row.extend(targets.iter().map(|target| power_cell(target.target)));
        row.push(power_cell(targets.iter().map(|target| target.target).sum()));
        table.add_row(row);
    }
    table
}

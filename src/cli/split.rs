use std::path::PathBuf;

use clap::Parser;

use crate::{
    cli::input::read_fleet,
    core::{Direction, distribution::compute_distribution},
    prelude::*,
    quantity::power::Watts,
    tables::build_distribution_table,
};

#[derive(Parser)]
pub struct SplitArgs {
    #[clap(flatten)]
    pub fleet: FleetArgs,

    /// Aggregate power target, positive to charge and negative to discharge.
    #[clap(long = "target-watts", allow_hyphen_values = true, env = "TARGET_WATTS")]
    target: Watts,
}

#[derive(Parser)]
pub struct FleetArgs {
    /// TOML file with the `[[batteries]]` telemetry snapshot.
    #[clap(long = "fleet", env = "FLEET_PATH")]
    pub path: PathBuf,

    /// Minimal per-battery power worth activating an idle battery for.
    #[clap(long = "min-load-watts", default_value = "0", env = "MIN_LOAD_WATTS")]
    pub min_load: Watts,
}

impl SplitArgs {
    #[instrument(skip_all, fields(target = %self.target))]
    pub fn run(self) -> Result {
        let fleet = read_fleet(&self.fleet.path)?;
        if let Some(direction) = Direction::of(self.target)
            && self.target.abs() > fleet.capability(direction)
        {
            warn!(capability = %fleet.capability(direction), "the target exceeds the fleet capability");
        }
        let targets = compute_distribution(&fleet.batteries, self.target, self.fleet.min_load)
            .context("failed to distribute the target")?;
        println!("{}", build_distribution_table(&fleet, &targets));
        Ok(())
    }
}

use clap::{Parser, Subcommand};

use crate::{
    cli::{input::read_fleet, split::FleetArgs},
    core::distribution::compute_distribution,
    prelude::*,
    quantity::power::Watts,
    tables::build_replay_table,
};

#[derive(Parser)]
pub struct BurrowArgs {
    #[command(subcommand)]
    command: BurrowCommand,
}

impl BurrowArgs {
    pub fn run(self) -> Result {
        match self.command {
            BurrowCommand::Replay(args) => args.run(),
        }
    }
}

#[derive(Subcommand)]
enum BurrowCommand {
    /// Replay a sequence of aggregate targets, threading the previous targets between the ticks.
    Replay(BurrowReplayArgs),
}

#[derive(Parser)]
struct BurrowReplayArgs {
    #[clap(flatten)]
    fleet: FleetArgs,

    /// Comma-separated aggregate targets, one per tick.
    #[clap(
        long = "targets-watts",
        value_delimiter = ',',
        allow_hyphen_values = true,
        required = true,
        env = "TARGETS_WATTS"
    )]
    targets: Vec<Watts>,
}

impl BurrowReplayArgs {
    #[instrument(skip_all, fields(n_ticks = self.targets.len()))]
    fn run(self) -> Result {
        let mut fleet = read_fleet(&self.fleet.path)?;
        let initial = fleet.clone();
        let mut ticks = Vec::with_capacity(self.targets.len());
        for aggregate in self.targets {
            let targets = compute_distribution(&fleet.batteries, aggregate, self.fleet.min_load)
                .with_context(|| format!("failed to distribute {aggregate}"))?;
            fleet = fleet.apply(&targets);
            ticks.push((aggregate, targets));
        }
        println!("{}", build_replay_table(&initial, &ticks));
        Ok(())
    }
}

mod burrow;
mod hunt;
mod input;
mod split;

use clap::{Parser, Subcommand};

pub use self::{burrow::BurrowArgs, hunt::HuntArgs, split::SplitArgs};

#[derive(Parser)]
#[command(author, version, about, propagate_version = true)]
#[must_use]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Main command: optimize the battery schedule against the price forecast.
    #[clap(name = "hunt")]
    Hunt(Box<HuntArgs>),

    /// Split an aggregate power target across the battery fleet.
    #[clap(name = "split")]
    Split(Box<SplitArgs>),

    /// Development tools.
    #[clap(name = "burrow")]
    Burrow(Box<BurrowArgs>),
}

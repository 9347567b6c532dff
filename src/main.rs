#![allow(clippy::doc_markdown)]
#![doc = include_str!("../README.md")]

mod cli;
mod core;
mod ops;
mod prelude;
mod quantity;
mod tables;

use clap::{Parser, crate_version};
use tracing_subscriber::EnvFilter;

use crate::{
    cli::{Args, Command},
    prelude::*,
};

#[tokio::main]
async fn main() -> Result {
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt()
        .without_time()
        .compact()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();
    info!(version = crate_version!(), "starting…");

    match Args::parse().command {
        Command::Hunt(args) => args.run().await?,
        Command::Split(args) => args.run()?,
        Command::Burrow(args) => args.run()?,
    }

    info!("done!");
    Ok(())
}

//! Loaders for the inputs that are normally supplied by the external feeds.

use std::{fs, path::Path};

use serde::{Deserialize, de::DeserializeOwned};

use crate::{
    core::{
        distribution::Fleet,
        schedule::{BatteryParams, PricePeriod},
    },
    prelude::*,
};

#[derive(Deserialize)]
struct PriceForecast {
    #[serde(default)]
    periods: Vec<PricePeriod>,
}

pub fn read_prices(path: &Path) -> Result<Vec<PricePeriod>> {
    let forecast: PriceForecast = read_toml(path)?;
    info!(n_periods = forecast.periods.len(), "loaded the price forecast");
    Ok(forecast.periods)
}

pub fn read_battery(path: &Path) -> Result<BatteryParams> {
    read_toml(path)
}

pub fn read_fleet(path: &Path) -> Result<Fleet> {
    let fleet: Fleet = read_toml(path)?;
    info!(n_batteries = fleet.batteries.len(), "loaded the fleet");
    Ok(fleet)
}

#[instrument(skip_all, fields(path = %path.display()))]
fn read_toml<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("failed to read `{}`", path.display()))?;
    parse_toml(&text).with_context(|| format!("failed to parse `{}`", path.display()))
}

fn parse_toml<T: DeserializeOwned>(text: &str) -> Result<T> {
    Ok(toml::from_str(text)?)
}

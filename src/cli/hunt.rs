use std::path::PathBuf;

use chrono::{DateTime, Local};
use clap::Parser;

use crate::{
    cli::input::{read_battery, read_prices},
    core::schedule::{MAX_PERIODS, PricePeriod, ScheduleOptions, compute_schedule},
    prelude::*,
    quantity::{percentage::Percentage, rate::KilowattHourRate, time::Minutes},
    tables::build_schedule_table,
};

#[derive(Parser)]
pub struct HuntArgs {
    /// TOML file with the `[[periods]]` price forecast.
    #[clap(long = "prices", env = "PRICES_PATH")]
    prices_path: PathBuf,

    /// TOML file with the battery parameters.
    #[clap(long = "battery", env = "BATTERY_PATH")]
    battery_path: PathBuf,

    /// Override the starting state-of-charge from the battery file.
    #[clap(long = "start-soc-percent", env = "START_SOC_PERCENT")]
    start_soc: Option<Percentage>,

    #[clap(flatten)]
    schedule: ScheduleArgs,
}

#[derive(Copy, Clone, Parser)]
pub struct ScheduleArgs {
    /// Price period length.
    #[clap(long = "interval-minutes", default_value = "60", env = "INTERVAL_MINUTES")]
    interval: Minutes,

    /// Minimal price swing worth trading, per kilowatt-hour.
    #[clap(long = "min-price-delta", default_value = "0.1", env = "MIN_PRICE_DELTA")]
    min_price_delta: KilowattHourRate,

    /// Time already passed in the first period, derived from the current time when omitted.
    #[clap(long = "elapsed-minutes", env = "ELAPSED_MINUTES")]
    elapsed: Option<Minutes>,

    /// Maximum number of periods to optimize.
    #[clap(long = "horizon-cap", default_value_t = MAX_PERIODS, env = "HORIZON_CAP")]
    horizon_cap: usize,
}

impl ScheduleArgs {
    /// Drop the periods that have already ended, unless the elapsed time is explicitly set.
    fn upcoming(&self, mut prices: Vec<PricePeriod>, now: DateTime<Local>) -> Vec<PricePeriod> {
        if self.elapsed.is_none() {
            let interval = self.interval.to_time_delta();
            prices.retain(|period| period.start + interval > now);
        }
        prices
    }

    #[expect(clippy::cast_precision_loss)]
    fn options(&self, prices: &[PricePeriod], now: DateTime<Local>) -> ScheduleOptions {
        let elapsed = self.elapsed.unwrap_or_else(|| {
            prices.first().map_or(Minutes::ZERO, |period| {
                Minutes((now - period.start).num_seconds() as f64 / 60.0)
                    .clamp(Minutes::ZERO, self.interval)
            })
        });
        ScheduleOptions::builder()
            .interval(self.interval)
            .min_price_delta(self.min_price_delta)
            .elapsed_in_first_period(elapsed)
            .horizon_cap(self.horizon_cap)
            .build()
    }
}

impl HuntArgs {
    #[instrument(skip_all)]
    pub async fn run(self) -> Result {
        let now = Local::now();
        let prices = self.schedule.upcoming(read_prices(&self.prices_path)?, now);
        let mut battery = read_battery(&self.battery_path)?;
        if let Some(start_soc) = self.start_soc {
            battery.start_soc = start_soc;
        }
        let options = self.schedule.options(&prices, now);
        info!(
            n_periods = prices.len(),
            capacity = %battery.capacity,
            start_soc = %battery.start_soc,
            elapsed = %options.elapsed_in_first_period,
            "optimizing…",
        );

        let schedule =
            tokio::task::spawn_blocking(move || compute_schedule(&prices, &battery, options))
                .await?
                .context("failed to compute the schedule")?;
        println!("{}", build_schedule_table(&schedule));
        println!("{}", schedule.summary());
        info!(
            start = %schedule.initial_residual_energy,
            end = %schedule.final_residual_energy(),
            capacity = %schedule.capacity,
            "residual energy",
        );

        match schedule.first() {
            Some(entry) => {
                info!(
                    power = %entry.power,
                    active_time = %entry.active_time,
                    soc_after = %entry.soc_after,
                    "current command",
                );
            }
            None => warn!("nothing to schedule"),
        }
        Ok(())
    }
}

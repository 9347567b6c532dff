//! Price-driven charge and discharge planning.

mod cleanup;
mod entry;
mod model;
mod params;
mod simulator;

use bon::Builder;

pub use self::{
    cleanup::CleanupThresholds,
    entry::{Schedule, ScheduleEntry, Summary},
    params::{BatteryParams, MAX_HORIZON, MAX_PERIODS, PowerTier, PricePeriod, ScheduleOptions},
};
use self::{
    model::{Model, PeriodPlan, Tier},
    simulator::{Outcome, Simulator},
};
use crate::{
    core::{
        Direction,
        Error,
        lp::{Backend, MicroLp},
    },
    ops::RangeInclusive,
    prelude::{debug, instrument, trace},
    quantity::{
        cost::Cost,
        energy::KilowattHours,
        percentage::Percentage,
        power::{Kilowatts, Watts},
        time::{Hours, Minutes},
    },
};

/// Compute the optimal schedule with the default solver.
pub fn compute_schedule(
    prices: &[PricePeriod],
    battery: &BatteryParams,
    options: ScheduleOptions,
) -> Result<Schedule, Error> {
    Optimizer::builder().prices(prices).battery(battery).options(options).solve(&MicroLp)
}

#[derive(Builder)]
#[builder(finish_fn(vis = ""))]
pub struct Optimizer<'a> {
    prices: &'a [PricePeriod],
    battery: &'a BatteryParams,
    options: ScheduleOptions,
}

impl<S: optimizer_builder::IsComplete> OptimizerBuilder<'_, S> {
    pub fn solve(self, backend: &impl Backend) -> Result<Schedule, Error> {
        self.build().solve(backend)
    }
}

impl Optimizer<'_> {
    #[instrument(skip_all, fields(n_prices = self.prices.len(), start_soc = %self.battery.start_soc))]
    fn solve(&self, backend: &impl Backend) -> Result<Schedule, Error> {
        self.validate()?;

        let prices = &self.prices[..self.options.n_periods(self.prices.len())];
        debug!(n_periods = prices.len(), "truncated the horizon");

        let tiers: Vec<Tier> = [Direction::Charge, Direction::Discharge]
            .into_iter()
            .flat_map(|direction| {
                self.battery.usable_tiers(direction).map(move |tier| Tier::new(direction, tier))
            })
            .collect();
        debug!(n_tiers = tiers.len());

        let initial_residual_energy = self.battery.initial_residual_energy();
        let model = Model::builder()
            .prices(prices)
            .tiers(&tiers)
            .interval(Hours::from(self.options.interval))
            .first_period_availability(self.options.first_period_availability())
            .capacity(self.battery.capacity)
            .initial_residual_energy(initial_residual_energy)
            .fixed_cost(self.options.fixed_cost(self.battery))
            .build();
        let values = backend.solve(&model.program)?;
        let objective = Cost(model.program.objective(&values));
        debug!(%objective, "solved");

        Ok(Schedule {
            entries: self.replay(prices, &model.plan(&values), initial_residual_energy),
            objective,
            initial_residual_energy,
            capacity: self.battery.capacity,
        })
    }

    fn validate(&self) -> Result<(), Error> {
        let options = &self.options;
        if self.prices.is_empty() {
            return Err(Error::invalid_input("the price series is empty"));
        }
        if !self.battery.capacity.is_finite() || self.battery.capacity <= KilowattHours::ZERO {
            return Err(Error::invalid_input(format!(
                "capacity must be positive, got {}",
                self.battery.capacity,
            )));
        }
        if !self.battery.start_soc.is_finite() {
            return Err(Error::invalid_input("the starting state-of-charge is not finite"));
        }
        if !options.interval.is_finite() || options.interval <= Minutes::ZERO {
            return Err(Error::invalid_input(format!(
                "interval must be positive, got {}",
                options.interval,
            )));
        }
        if !options.elapsed_in_first_period.is_finite()
            || !RangeInclusive::from(Minutes::ZERO..=options.interval)
                .contains(options.elapsed_in_first_period)
        {
            return Err(Error::invalid_input(format!(
                "elapsed time must be within the interval, got {}",
                options.elapsed_in_first_period,
            )));
        }
        if options.horizon_cap == 0 {
            return Err(Error::invalid_input("the horizon cap must be positive"));
        }
        if !options.min_price_delta.is_finite() || !options.fixed_cost(self.battery).is_finite() {
            return Err(Error::invalid_input("the price delta and fixed cost must be finite"));
        }
        if let Some(period) = self.prices.iter().find(|period| !period.price.is_finite()) {
            return Err(Error::invalid_input(format!("non-finite price at {}", period.start)));
        }
        Ok(())
    }

    /// Re-simulate the solved plan and apply the cleanup rules in a single forward pass.
    ///
    /// A suppressed period rolls back its energy, so the following periods see the corrected residual energy.
    fn replay(
        &self,
        prices: &[PricePeriod],
        plans: &[PeriodPlan],
        initial_residual_energy: KilowattHours,
    ) -> Vec<ScheduleEntry> {
        let cleanup = &self.options.cleanup;
        let interval = Hours::from(self.options.interval);
        let min_duration = cleanup.min_duration(self.options.interval);

        let mut simulator = Simulator::new(initial_residual_energy, self.battery.capacity);
        let mut previous_direction = None;
        let mut entries = Vec::with_capacity(prices.len());

        for (period, plan) in prices.iter().zip(plans) {
            let checkpoint = simulator;
            let outcome = simulator.apply(&plan.activations, interval);
            let mut entry = self.entry(period, plan.availability, outcome, &simulator);

            if cleanup.should_suppress(&entry, previous_direction, min_duration) {
                trace!(start = %period.start, power = ?entry.power, "suppressed a short flip");
                simulator = checkpoint;
                entry = self.entry(period, plan.availability, Outcome::IDLE, &simulator);
            } else if cleanup.should_park(&entry) {
                trace!(start = %period.start, power = ?entry.power, "parked");
                entry.active_time = entry.available_time;
                entry.power = self.active_power(entry.grid_energy, entry.active_time);
            }

            previous_direction = entry.direction();
            entries.push(entry);
        }

        entries
    }

    fn entry(
        &self,
        period: &PricePeriod,
        availability: f64,
        outcome: Outcome,
        simulator: &Simulator,
    ) -> ScheduleEntry {
        let active_time = self.options.interval * outcome.active_fraction;
        ScheduleEntry {
            start: period.start,
            price: period.price,
            power: self.active_power(outcome.grid_energy, active_time),
            active_time,
            available_time: self.options.interval * availability,
            grid_energy: outcome.grid_energy,
            stored_energy: outcome.stored_energy,
            residual_energy_after: simulator.residual_energy,
            soc_after: Percentage::from_ratio(simulator.residual_energy / simulator.capacity)
                .round()
                .saturate(),
        }
    }

    /// Round the average power over the active time, staying within the tier limits.
    fn active_power(&self, grid_energy: KilowattHours, active_time: Minutes) -> Watts {
        if active_time <= Minutes::ZERO {
            return Watts::ZERO;
        }
        let power: Kilowatts = grid_energy / Hours::from(active_time);
        Watts::from(power).round().clamp(
            -self.battery.max_power(Direction::Discharge),
            self.battery.max_power(Direction::Charge),
        )
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;
    use chrono::{DateTime, Local, TimeDelta, TimeZone};

    use super::{model::Activation, *};
    use crate::quantity::rate::KilowattHourRate;

    const REFERENCE_PRICES: [f64; 24] = [
        0.27, 0.265, 0.26, 0.262, 0.268, 0.27, 0.29, 0.33, 0.36, 0.35, 0.33, 0.32, 0.31, 0.31, 0.32,
        0.34, 0.43, 0.46, 0.48, 0.51, 0.47, 0.45, 0.44, 0.36,
    ];

    fn midnight() -> DateTime<Local> {
        Local.with_ymd_and_hms(2025, 1, 15, 0, 0, 0).unwrap()
    }

    fn prices(values: &[f64], interval: Minutes) -> Vec<PricePeriod> {
        let mut start = midnight();
        values
            .iter()
            .map(|price| {
                let period = PricePeriod { start, price: KilowattHourRate(*price) };
                start += interval.to_time_delta();
                period
            })
            .collect()
    }

    fn reference_battery(start_soc: f64) -> BatteryParams {
        BatteryParams::builder()
            .capacity(KilowattHours(5.05))
            .charge_tiers(vec![
                PowerTier { power: Watts(1200.0), efficiency: 0.95 },
                PowerTier { power: Watts(600.0), efficiency: 0.97 },
            ])
            .discharge_tiers(vec![
                PowerTier { power: Watts(800.0), efficiency: 0.95 },
                PowerTier { power: Watts(400.0), efficiency: 0.97 },
            ])
            .start_soc(Percentage(start_soc))
            .build()
    }

    fn hourly_options(min_price_delta: f64) -> ScheduleOptions {
        ScheduleOptions::builder()
            .interval(Minutes(60.0))
            .min_price_delta(KilowattHourRate(min_price_delta))
            .build()
    }

    /// Simple battery for the hand-made plans.
    fn ideal_battery(start_soc: f64) -> BatteryParams {
        let tier = PowerTier { power: Watts(1000.0), efficiency: 1.0 };
        BatteryParams::builder()
            .capacity(KilowattHours(10.0))
            .charge_tiers(vec![tier])
            .discharge_tiers(vec![tier])
            .start_soc(Percentage(start_soc))
            .build()
    }

    fn plan(direction: Option<Direction>, fraction: f64) -> PeriodPlan {
        PeriodPlan {
            availability: 1.0,
            activations: direction
                .map(|direction| Activation {
                    tier: Tier { direction, power: Watts(1000.0), efficiency: 1.0 },
                    fraction,
                })
                .into_iter()
                .collect(),
        }
    }

    fn replay(battery: &BatteryParams, plans: &[PeriodPlan]) -> Vec<ScheduleEntry> {
        let prices = prices(&vec![0.3; plans.len()], Minutes(60.0));
        let optimizer =
            Optimizer::builder().prices(&prices).battery(battery).options(hourly_options(0.1)).build();
        optimizer.replay(&prices, plans, battery.initial_residual_energy())
    }

    fn assert_conserves_energy(schedule: &Schedule) {
        let stored: KilowattHours = schedule.entries.iter().map(|entry| entry.stored_energy).sum();
        assert_abs_diff_eq!(
            stored.0,
            (schedule.final_residual_energy() - schedule.initial_residual_energy).0,
            epsilon = 1e-9,
        );
        let last = schedule.entries.last().unwrap();
        assert_abs_diff_eq!(
            last.soc_after.to_ratio() * schedule.capacity.0,
            last.residual_energy_after.0,
            epsilon = 0.006 * schedule.capacity.0,
        );
    }

    #[test]
    fn reference_day() {
        let schedule = compute_schedule(
            &prices(&REFERENCE_PRICES, Minutes(60.0)),
            &reference_battery(50.0),
            hourly_options(0.1),
        )
        .unwrap();
        assert_eq!(schedule.entries.len(), 24);

        for entry in &schedule.entries {
            assert!((Percentage::ZERO..=Percentage::HUNDRED).contains(&entry.soc_after));
            assert!((Watts(-800.0)..=Watts(1200.0)).contains(&entry.power));
        }

        let overnight_max_soc =
            schedule.entries[..8].iter().map(|entry| entry.soc_after).max().unwrap();
        assert!(overnight_max_soc >= Percentage(99.0), "overnight max: {overnight_max_soc}");

        let evening = &schedule.entries[16..=22];
        assert!(evening.iter().all(|entry| entry.direction() != Some(Direction::Charge)));
        let evening_energy: KilowattHours = evening.iter().map(|entry| entry.grid_energy).sum();
        assert!(evening_energy < KilowattHours(-3.0), "evening: {evening_energy}");

        assert!(schedule.summary().grid_cost < Cost::ZERO);
        assert_conserves_energy(&schedule);
    }

    #[test]
    fn first_period_is_prorated() {
        let battery = reference_battery(0.0);
        let options = ScheduleOptions::builder()
            .interval(Minutes(60.0))
            .min_price_delta(KilowattHourRate(0.1))
            .elapsed_in_first_period(Minutes(45.0))
            .build();
        let schedule =
            compute_schedule(&prices(&[0.1, 0.6, 0.6, 0.6], Minutes(60.0)), &battery, options)
                .unwrap();
        let first = schedule.first().unwrap();
        assert_abs_diff_eq!(first.available_time.0, 15.0);
        assert!(first.active_time <= Minutes(15.0 + 1e-6), "active: {}", first.active_time);
        assert_eq!(first.direction(), Some(Direction::Charge));
        assert_conserves_energy(&schedule);
    }

    #[test]
    fn horizon_is_truncated() {
        let battery = reference_battery(50.0);
        let schedule = compute_schedule(
            &prices(&[0.3; 200], Minutes(60.0)),
            &battery,
            hourly_options(0.1),
        )
        .unwrap();
        assert_eq!(schedule.entries.len(), 48);

        let options = ScheduleOptions::builder()
            .interval(Minutes(15.0))
            .min_price_delta(KilowattHourRate(0.1))
            .build();
        let schedule =
            compute_schedule(&prices(&[0.3; 200], Minutes(15.0)), &battery, options).unwrap();
        assert_eq!(schedule.entries.len(), MAX_PERIODS);
        assert_eq!(schedule.entries[1].start - schedule.entries[0].start, TimeDelta::minutes(15));
    }

    #[test]
    fn lower_price_delta_never_costs_more() {
        let prices = prices(&REFERENCE_PRICES, Minutes(60.0));
        let battery = reference_battery(50.0);
        let mut previous = None;
        for min_price_delta in [0.2, 0.1, 0.05, 0.0] {
            let objective =
                compute_schedule(&prices, &battery, hourly_options(min_price_delta))
                    .unwrap()
                    .objective;
            if let Some(previous) = previous {
                assert!(objective.0 <= previous + 1e-4, "{objective} > {previous}");
            }
            previous = Some(objective.0);
        }
    }

    #[test]
    fn lower_price_delta_never_trades_less() {
        let prices = prices(&[0.20, 0.28, 0.20, 0.36, 0.20, 0.45], Minutes(60.0));
        let mut battery = ideal_battery(0.0);
        battery.capacity = KilowattHours(1.0);

        let mut previous = KilowattHours::ZERO;
        for (min_price_delta, expected) in [(0.2, 1.0), (0.1, 2.0), (0.05, 3.0), (0.0, 3.0)] {
            let summary = compute_schedule(&prices, &battery, hourly_options(min_price_delta))
                .unwrap()
                .summary();
            assert_abs_diff_eq!(summary.charge.0, expected, epsilon = 1e-6);
            assert_abs_diff_eq!(summary.discharge.0, expected, epsilon = 1e-6);
            assert!(summary.charge >= previous, "{min_price_delta}: {}", summary.charge);
            previous = summary.charge;
        }
    }

    #[test]
    fn equal_prices_fill_whole_periods() {
        let mut battery = ideal_battery(0.0);
        battery.capacity = KilowattHours(2.0);
        let schedule = compute_schedule(
            &prices(&[0.2, 0.2, 0.2, 0.2, 0.2, 0.2, 0.5, 0.5], Minutes(60.0)),
            &battery,
            hourly_options(0.1),
        )
        .unwrap();

        for entry in &schedule.entries {
            let idle = entry.active_time.0.abs() < 1e-6;
            let whole = (entry.active_time - entry.available_time).0.abs() < 1e-6;
            assert!(idle || whole, "{}: {}", entry.start, entry.active_time);
            assert!(entry.power.abs() == Watts::ZERO || entry.power.abs() == Watts(1000.0));
        }
        let n_charging = schedule
            .entries
            .iter()
            .filter(|entry| entry.direction() == Some(Direction::Charge))
            .count();
        assert_eq!(n_charging, 2);
        assert!(schedule.entries[6..].iter().all(|entry| entry.power == Watts(-1000.0)));
        assert_abs_diff_eq!(schedule.final_residual_energy().0, 0.0, epsilon = 1e-9);
    }

    #[test]
    fn grid_energy_follows_efficiency() {
        let tier = PowerTier { power: Watts(1000.0), efficiency: 0.9 };
        let battery = BatteryParams::builder()
            .capacity(KilowattHours(5.0))
            .charge_tiers(vec![tier])
            .discharge_tiers(vec![tier])
            .start_soc(Percentage(50.0))
            .build();
        let schedule = compute_schedule(
            &prices(&REFERENCE_PRICES, Minutes(60.0)),
            &battery,
            hourly_options(0.05),
        )
        .unwrap();
        let summary = schedule.summary();
        assert!(summary.charge > KilowattHours::ZERO);
        assert!(summary.discharge > KilowattHours::ZERO);

        for entry in &schedule.entries {
            let expected = if entry.grid_energy > KilowattHours::ZERO {
                entry.grid_energy * 0.9
            } else {
                entry.grid_energy / 0.9
            };
            assert_abs_diff_eq!(entry.stored_energy.0, expected.0, epsilon = 1e-9);
        }
        assert_abs_diff_eq!(
            summary.charge.0 * 0.9 - summary.discharge.0 / 0.9,
            (schedule.final_residual_energy() - schedule.initial_residual_energy).0,
            epsilon = 1e-9,
        );
    }

    #[test]
    fn tiny_swings_are_not_traded() {
        let schedule = compute_schedule(
            &prices(&[0.30, 0.34, 0.30, 0.34, 0.30, 0.34, 0.30, 0.34], Minutes(60.0)),
            &reference_battery(0.0),
            hourly_options(0.1),
        )
        .unwrap();
        assert!(schedule.entries.iter().all(|entry| entry.power == Watts::ZERO));
        assert_eq!(schedule.final_residual_energy(), KilowattHours::ZERO);
    }

    #[test]
    fn degenerate_tiers_produce_idle_schedule() {
        let battery = BatteryParams::builder()
            .capacity(KilowattHours(5.0))
            .charge_tiers(vec![PowerTier { power: Watts::ZERO, efficiency: 0.9 }])
            .discharge_tiers(vec![PowerTier { power: Watts(800.0), efficiency: f64::NAN }])
            .start_soc(Percentage(50.0))
            .build();
        let schedule = compute_schedule(
            &prices(&REFERENCE_PRICES, Minutes(60.0)),
            &battery,
            hourly_options(0.1),
        )
        .unwrap();
        assert_eq!(schedule.entries.len(), 24);
        for entry in &schedule.entries {
            assert_eq!(entry.power, Watts::ZERO);
            assert_eq!(entry.soc_after, Percentage(50.0));
        }
    }

    #[test]
    fn invalid_input() {
        let prices = prices(&REFERENCE_PRICES, Minutes(60.0));
        let battery = reference_battery(50.0);

        assert!(matches!(
            compute_schedule(&[], &battery, hourly_options(0.1)),
            Err(Error::InvalidInput(_)),
        ));

        let mut empty_battery = battery.clone();
        empty_battery.capacity = KilowattHours::ZERO;
        assert!(matches!(
            compute_schedule(&prices, &empty_battery, hourly_options(0.1)),
            Err(Error::InvalidInput(_)),
        ));

        let mut unknown_soc = battery.clone();
        unknown_soc.start_soc = Percentage(f64::NAN);
        assert!(matches!(
            compute_schedule(&prices, &unknown_soc, hourly_options(0.1)),
            Err(Error::InvalidInput(_)),
        ));

        let options = ScheduleOptions::builder()
            .interval(Minutes(60.0))
            .min_price_delta(KilowattHourRate(0.1))
            .elapsed_in_first_period(Minutes(90.0))
            .build();
        assert!(matches!(
            compute_schedule(&prices, &battery, options),
            Err(Error::InvalidInput(_)),
        ));
    }

    #[test]
    fn short_flip_is_suppressed() {
        let entries = replay(
            &ideal_battery(50.0),
            &[plan(Some(Direction::Discharge), 0.5), plan(Some(Direction::Charge), 0.1), plan(None, 0.0)],
        );
        assert_eq!(entries[0].power, Watts(-1000.0));
        assert_abs_diff_eq!(entries[0].active_time.0, 30.0);
        assert_eq!(entries[1].power, Watts::ZERO);
        assert_eq!(entries[1].active_time, Minutes::ZERO);
        assert_abs_diff_eq!(entries[1].residual_energy_after.0, 4.5);
        assert_eq!(entries[2].soc_after, Percentage(45.0));
    }

    #[test]
    fn short_flip_near_ceiling_is_kept() {
        let entries = replay(
            &ideal_battery(96.0),
            &[plan(Some(Direction::Discharge), 0.1), plan(Some(Direction::Charge), 0.06)],
        );
        assert_eq!(entries[1].direction(), Some(Direction::Charge));
        assert_abs_diff_eq!(entries[1].active_time.0, 3.6, epsilon = 1e-9);
    }

    #[test]
    fn short_action_after_idle_is_kept() {
        let entries =
            replay(&ideal_battery(50.0), &[plan(None, 0.0), plan(Some(Direction::Charge), 0.1)]);
        assert_eq!(entries[1].power, Watts(1000.0));
        assert_abs_diff_eq!(entries[1].active_time.0, 6.0, epsilon = 1e-9);
    }

    #[test]
    fn parked_period_is_stretched() {
        let entries = replay(&ideal_battery(95.0), &[plan(Some(Direction::Charge), 1.0)]);
        let entry = entries[0];
        assert_eq!(entry.soc_after, Percentage::HUNDRED);
        assert_eq!(entry.active_time, entry.available_time);
        assert_eq!(entry.power, Watts(500.0));
        assert_abs_diff_eq!(entry.stored_energy.0, 0.5, epsilon = 1e-12);
    }
}

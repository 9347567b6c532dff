use std::ops::{Div, Mul};

use crate::quantity::{cost::Cost, power::Kilowatts, rate::KilowattHourRate, time::Hours};

quantity!(KilowattHours, via: f64, suffix: "kWh", precision: 3);

impl Mul<KilowattHourRate> for KilowattHours {
    type Output = Cost;

    fn mul(self, rate: KilowattHourRate) -> Self::Output {
        Cost(self.0 * rate.0)
    }
}

impl Div<Hours> for KilowattHours {
    type Output = Kilowatts;

    fn div(self, hours: Hours) -> Self::Output {
        Kilowatts(self.0 / hours.0)
    }
}

use chrono::TimeDelta;

quantity!(Hours, via: f64, suffix: "h", precision: 2);
quantity!(Minutes, via: f64, suffix: "min", precision: 0);

impl From<Minutes> for Hours {
    fn from(minutes: Minutes) -> Self {
        Self(minutes.0 / 60.0)
    }
}

impl Minutes {
    #[expect(clippy::cast_possible_truncation)]
    pub fn to_time_delta(self) -> TimeDelta {
        TimeDelta::seconds((self.0 * 60.0).round() as i64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minutes_into_hours() {
        assert_eq!(Hours::from(Minutes(15.0)), Hours(0.25));
    }

    #[test]
    fn minutes_into_time_delta() {
        assert_eq!(Minutes(30.0).to_time_delta(), TimeDelta::minutes(30));
    }
}

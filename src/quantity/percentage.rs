quantity!(Percentage, via: f64, suffix: "%", precision: 0);

impl Percentage {
    pub const HUNDRED: Self = Self(100.0);

    /// Convert the percentage into `0.0..=1.0`.
    #[must_use]
    pub const fn to_ratio(self) -> f64 {
        0.01 * self.0
    }

    pub const fn from_ratio(ratio: f64) -> Self {
        Self(ratio * 100.0)
    }

    /// Round to the nearest whole percent.
    pub fn round(self) -> Self {
        Self(self.0.round())
    }

    /// Clamp into `0..=100`.
    pub fn saturate(self) -> Self {
        Self(self.0.clamp(0.0, 100.0))
    }
}

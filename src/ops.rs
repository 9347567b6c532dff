#[must_use]
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct RangeInclusive<T: Copy> {
    pub min: T,
    pub max: T,
}

impl<T: Copy> From<std::ops::RangeInclusive<T>> for RangeInclusive<T> {
    fn from(range: std::ops::RangeInclusive<T>) -> Self {
        Self::from_std(range)
    }
}

impl<T: Copy> RangeInclusive<T> {
    pub const fn from_std(range: std::ops::RangeInclusive<T>) -> Self {
        Self { min: *range.start(), max: *range.end() }
    }
}

impl<T: Copy + PartialOrd> RangeInclusive<T> {
    #[must_use]
    pub fn contains(self, other: T) -> bool {
        (self.min <= other) && (other <= self.max)
    }

    #[must_use]
    pub fn clamp(self, value: T) -> T {
        if value < self.min {
            self.min
        } else if value > self.max {
            self.max
        } else {
            value
        }
    }
}

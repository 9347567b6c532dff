use std::fmt::{Display, Formatter};

use comfy_table::Color;

use crate::quantity::power::Watts;

/// Power flow direction as seen from the battery: positive power charges.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum Direction {
    Charge,
    Discharge,
}

impl Direction {
    /// Direction of a signed power, [`None`] when idle.
    pub fn of(power: Watts) -> Option<Self> {
        if power > Watts::ZERO {
            Some(Self::Charge)
        } else if power < Watts::ZERO {
            Some(Self::Discharge)
        } else {
            None
        }
    }

    #[must_use]
    pub const fn opposite(self) -> Self {
        match self {
            Self::Charge => Self::Discharge,
            Self::Discharge => Self::Charge,
        }
    }

    /// `1.0` for charging and `-1.0` for discharging.
    #[must_use]
    pub const fn sign(self) -> f64 {
        match self {
            Self::Charge => 1.0,
            Self::Discharge => -1.0,
        }
    }

    pub const fn color(self) -> Color {
        match self {
            Self::Charge => Color::Green,
            Self::Discharge => Color::Blue,
        }
    }
}

impl Display for Direction {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Charge => write!(f, "Charge"),
            Self::Discharge => write!(f, "Discharge"),
        }
    }
}

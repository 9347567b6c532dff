#[macro_use]
mod macros;

pub mod cost;
pub mod energy;
pub mod percentage;
pub mod power;
pub mod rate;
pub mod time;

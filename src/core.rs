pub mod direction;
pub mod distribution;
pub mod error;
pub mod lp;
pub mod schedule;

pub use self::{direction::Direction, error::Error};

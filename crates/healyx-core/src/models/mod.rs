//! Domain models for the practice front-end.

mod appointment;
mod patient;
mod record;
pub mod wire;

pub use appointment::*;
pub use patient::*;
pub use record::*;

pub mod bus;

pub use bus::{BusError, BusResult};

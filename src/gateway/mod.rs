//! Gateway implementations

mod builder;
mod metered;

pub use builder::{Meter, MeterBuilder};
pub use metered::{MeteredGateway, MeteredStream};

//! Record delivery: sinks, detached dispatch and stream observation.

mod dispatch;
mod sink;
mod stream;
mod transport;

pub use dispatch::Dispatcher;
pub use sink::{MemorySink, MeteringSink};
pub use stream::{ObservedStream, StreamSummary};
pub use transport::{DEFAULT_BASE_URL, MeteringClient};

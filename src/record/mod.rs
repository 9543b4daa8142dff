//! Record synthesis: timing plus provider signals plus caller metadata.

mod builder;
mod clock;

pub use builder::{
    COST_TYPE, DEFAULT_CREDENTIAL_NAME, DEFAULT_CREDENTIAL_VALUE, DEFAULT_PRODUCT_ID, Operation,
    TelemetryRecordBuilder,
};
pub use clock::{OperationClock, millis_between};

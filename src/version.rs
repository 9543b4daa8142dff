//! Version information.

/// Package version from Cargo.toml.
pub const PKG_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Identifier sent as `middlewareSource` on every telemetry record.
pub const MIDDLEWARE_SOURCE: &str = concat!(env!("CARGO_PKG_NAME"), "-rust");

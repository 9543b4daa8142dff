//! Generative AI backends.

#[cfg(feature = "google")]
pub mod google;
pub mod traits;

#[cfg(feature = "google")]
pub use google::{GOOGLE_AI_BASE_URL, GoogleClient};
pub use traits::{ChunkStream, GenerativeProvider};

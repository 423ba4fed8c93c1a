//! Shared models, configuration and the directory-service port used by every
//! `adshard` crate.

pub mod config;
pub mod directory;
pub mod log;

#[doc(hidden)]
pub use tracing;

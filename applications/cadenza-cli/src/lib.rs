//! Cadenza command-line host
//!
//! Reference host for `cadenza-playback`: reads local files with lofty,
//! plays them through a simulated output and logs the coordinator's events.

pub mod config;
pub mod error;
pub mod host;
pub mod loader;
pub mod simulated;

pub use config::CliConfig;
pub use error::{CliError, Result};
pub use host::Host;

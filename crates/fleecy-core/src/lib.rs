//! fleecy-core: shared data contracts and configuration.
//!
//! Every other crate in the workspace speaks in these types:
//!
//! - **`types`**: participants, VM status, provider-native server
//!   listings, and the selection criteria a caller submits
//! - **`config`**: the `fleecy.toml` parser (provider mode, default
//!   criteria, participant clouds)

pub mod config;
pub mod error;
pub mod types;

pub use config::{FleecyConfig, ProviderConfig, ProviderMode, parse_duration};
pub use error::{ConfigError, ConfigResult};
pub use types::*;

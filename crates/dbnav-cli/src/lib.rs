//! dbnav command line
//!
//! Library half of the `dbnav` binary: configuration, logging, fixtures and
//! the subcommand implementations.

#![warn(missing_docs)]
#![warn(unreachable_pub)]

pub mod commands;
pub mod config;
pub mod fixture;
pub mod logging;

pub use commands::{browse, build_command, parse_command, LogHost};
pub use config::{ConfigError, DbnavConfig};
pub use fixture::{Fixture, FixtureAccount, FixtureExplorer};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

//! Command implementations.
//!
//! Each subcommand is implemented in its own module for clean separation.

pub(crate) mod bridge;
pub(crate) mod completions;
pub(crate) mod monitor;
pub(crate) mod ports;
pub(crate) mod query;
pub(crate) mod registry;
pub(crate) mod send;

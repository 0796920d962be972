//! CLI command implementations for arkabc.
//!
//! Each module corresponds to a subcommand (`arkabc <command>`).

pub mod aggregate;
pub mod calldata;
pub mod curves;
pub mod run;

//! End-to-end tests for the cpv binary
//!
//! Nothing here reaches a real service: runs either fail during argument
//! parsing or preview formats that need no network.

mod cli_basic;
mod config_cli;

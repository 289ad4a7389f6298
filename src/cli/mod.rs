//! CLI command handlers
//!
//! This module contains all the command handlers for the lyceum CLI.
//! Each subcommand is implemented in its own module.

pub mod config;
pub mod courses;
pub mod helpers;
pub mod init;
pub mod serve;
pub mod stats;
pub mod users;

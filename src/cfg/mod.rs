//! Command-line parsing, assembled scan configuration, and logger setup.

// SPDX-License-Identifier: MIT OR Apache-2.0

/// Command-line interface parsing.
pub mod cli;
/// Assembled, validated scan configuration.
pub mod config;
/// Enumerations shared by the CLI and configuration layers.
pub mod enums;
/// Logger initialization.
pub mod logger;

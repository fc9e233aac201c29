// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! # irdpc-observability
//!
//! Logging setup shared by the tools and host-side tests of the pipeline,
//! with per-crate debug flag support.
//!
//! ## Features
//! - `file-logging`: also write logs to a timestamped run folder

/// Crate version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod cli;
pub mod config;
pub mod init;

pub use cli::*;
pub use config::*;
pub use init::*;

/// Crates that accept `--debug-<name>`
pub const KNOWN_CRATES: &[&str] = &[
    "irdpc",
    "irdpc-hal",
    "irdpc-core",
    "irdpc-pipeline",
    "irdpc-config",
];

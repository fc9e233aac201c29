// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Subscriber installation; one process-wide subscriber, so one test file.

use irdpc_observability::{init_logging, CrateDebugFlags, LogFormat, LoggingConfig};

#[test]
fn test_second_init_is_rejected() {
    let flags = CrateDebugFlags::from_args(vec!["--debug-irdpc-core".to_string()]);
    let config = LoggingConfig {
        format: LogFormat::Json,
        ..LoggingConfig::default()
    };

    let guard = init_logging(&flags, &config).unwrap();
    assert!(guard.log_dir().is_none());
    tracing::debug!(target: "irdpc_core", "visible at debug");

    let err = init_logging(&flags, &config).err().unwrap();
    assert!(err.to_string().contains("already installed"));
}

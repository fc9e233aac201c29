// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Configuration validation
//!
//! Collects every problem in one pass so a bad file is fixed in one edit.

use irdpc_core::{AUTO_BUFFER_SIZE, MAX_ALL, MAX_AUTO, MAX_MANUAL};
use irdpc_pipeline::{K_THRESHOLD_MAX, K_THRESHOLD_MIN};

use crate::{ConfigError, ConfigResult, DpcConfig};

/// Packed coordinates are 10 bits wide
pub const MAX_FRAME_DIMENSION: u16 = 1 << 10;

/// Validation errors that can occur during config validation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigValidationError {
    OutOfRange { field: String, value: u64, min: u64, max: u64 },
    CapacityMismatch { larger: String, smaller: String },
    BuildMismatch { field: String, value: usize, compiled: usize },
    LineConflict { line: u16 },
    OffsetConflict { first: String, second: String, offset: u32 },
    Misaligned { field: String, value: u32 },
}

impl std::fmt::Display for ConfigValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::OutOfRange { field, value, min, max } => {
                write!(f, "{} = {} is outside {}..={}", field, value, min, max)
            }
            Self::CapacityMismatch { larger, smaller } => {
                write!(f, "{} must be at least {}", larger, smaller)
            }
            Self::BuildMismatch { field, value, compiled } => {
                write!(f, "{} = {} but the firmware is built with {}", field, value, compiled)
            }
            Self::LineConflict { line } => {
                write!(f, "interrupts.defect_line and interrupts.frame_done_line both use line {}", line)
            }
            Self::OffsetConflict { first, second, offset } => {
                write!(f, "{} and {} both use offset {:#x}", first, second, offset)
            }
            Self::Misaligned { field, value } => {
                write!(f, "{} = {:#x} is not word aligned", field, value)
            }
        }
    }
}

/// Validate the complete configuration
///
/// # Errors
///
/// Returns `ConfigError::ValidationError` listing every failed check
pub fn validate_config(config: &DpcConfig) -> ConfigResult<()> {
    let mut errors = Vec::new();

    validate_frame(config, &mut errors);
    validate_limits(config, &mut errors);
    validate_pipeline(config, &mut errors);
    validate_timing(config, &mut errors);
    validate_interrupts(config, &mut errors);
    validate_register_layout(config, &mut errors);

    if !errors.is_empty() {
        let error_messages = errors
            .iter()
            .map(|e| format!("  - {}", e))
            .collect::<Vec<_>>()
            .join("\n");

        return Err(ConfigError::ValidationError(format!(
            "Configuration validation failed:\n{}",
            error_messages
        )));
    }

    Ok(())
}

fn check_range(
    field: &str,
    value: u64,
    min: u64,
    max: u64,
    errors: &mut Vec<ConfigValidationError>,
) {
    if value < min || value > max {
        errors.push(ConfigValidationError::OutOfRange {
            field: field.to_string(),
            value,
            min,
            max,
        });
    }
}

fn validate_frame(config: &DpcConfig, errors: &mut Vec<ConfigValidationError>) {
    let max = u64::from(MAX_FRAME_DIMENSION);
    check_range("frame.width", config.frame.width.into(), 1, max, errors);
    check_range("frame.height", config.frame.height.into(), 1, max, errors);
}

fn validate_limits(config: &DpcConfig, errors: &mut Vec<ConfigValidationError>) {
    let limits = &config.limits;
    let compiled = [
        ("limits.max_manual", limits.max_manual, MAX_MANUAL),
        ("limits.max_auto", limits.max_auto, MAX_AUTO),
        ("limits.max_all", limits.max_all, MAX_ALL),
        ("limits.auto_buffer_size", limits.auto_buffer_size, AUTO_BUFFER_SIZE),
    ];
    for (field, value, capacity) in compiled {
        if value != capacity {
            errors.push(ConfigValidationError::BuildMismatch {
                field: field.to_string(),
                value,
                compiled: capacity,
            });
        }
    }

    if limits.max_all < limits.max_manual {
        errors.push(ConfigValidationError::CapacityMismatch {
            larger: "limits.max_all".to_string(),
            smaller: "limits.max_manual".to_string(),
        });
    }
    if limits.auto_buffer_size < limits.max_auto {
        errors.push(ConfigValidationError::CapacityMismatch {
            larger: "limits.auto_buffer_size".to_string(),
            smaller: "limits.max_auto".to_string(),
        });
    }
}

fn validate_pipeline(config: &DpcConfig, errors: &mut Vec<ConfigValidationError>) {
    check_range(
        "pipeline.k_threshold",
        config.pipeline.k_threshold.into(),
        K_THRESHOLD_MIN.into(),
        K_THRESHOLD_MAX.into(),
        errors,
    );
}

fn validate_timing(config: &DpcConfig, errors: &mut Vec<ConfigValidationError>) {
    let timing = &config.timing;
    let max = u64::from(u32::MAX);
    check_range("timing.tick_us", timing.tick_us.into(), 1, max, errors);
    check_range("timing.polling_timeout_ms", timing.polling_timeout_ms.into(), 1, max, errors);
    check_range("timing.frame_timeout_ms", timing.frame_timeout_ms.into(), 1, max, errors);
}

fn validate_interrupts(config: &DpcConfig, errors: &mut Vec<ConfigValidationError>) {
    if config.interrupts.defect_line == config.interrupts.frame_done_line {
        errors.push(ConfigValidationError::LineConflict {
            line: config.interrupts.defect_line,
        });
    }
}

/// Offsets must be word aligned and unique within their block
fn validate_register_layout(config: &DpcConfig, errors: &mut Vec<ConfigValidationError>) {
    let bases = [
        ("detector.base", config.detector.base),
        ("corrector.base", config.corrector.base),
        ("auto_channel.base", config.auto_channel.base),
    ];
    for (field, value) in bases {
        check_alignment(field, value, errors);
    }

    check_block(&config.detector.offsets(), errors);
    check_block(&config.corrector.offsets(), errors);
    check_block(&config.auto_channel.offsets(), errors);
}

fn check_alignment(field: &str, value: u32, errors: &mut Vec<ConfigValidationError>) {
    if value % 4 != 0 {
        errors.push(ConfigValidationError::Misaligned {
            field: field.to_string(),
            value,
        });
    }
}

fn check_block(offsets: &[(&'static str, u32)], errors: &mut Vec<ConfigValidationError>) {
    for (i, (field, offset)) in offsets.iter().enumerate() {
        check_alignment(field, *offset, errors);
        for (other, other_offset) in &offsets[i + 1..] {
            if offset == other_offset {
                errors.push(ConfigValidationError::OffsetConflict {
                    first: field.to_string(),
                    second: other.to_string(),
                    offset: *offset,
                });
            }
        }
    }
}

// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Configuration file loading with override support
//!
//! Three tiers, later ones win:
//! 1. TOML file (base values, missing keys take hardware defaults)
//! 2. Environment variables (`IRDPC_*`)
//! 3. CLI arguments

use crate::validation::validate_config;
use crate::{ChannelModeSetting, ConfigError, ConfigResult, DpcConfig};
use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

/// Default configuration file name
pub const CONFIG_FILE_NAME: &str = "dpc_configuration.toml";

/// Environment variable naming an explicit configuration file
pub const CONFIG_PATH_ENV: &str = "IRDPC_CONFIG_PATH";

/// Find the configuration file
///
/// Search order:
/// 1. `IRDPC_CONFIG_PATH` environment variable
/// 2. Current working directory
/// 3. Up to 5 parent directories
///
/// # Errors
///
/// Returns `ConfigError::FileNotFound` if no config file is found in any location
pub fn find_config_file() -> ConfigResult<PathBuf> {
    if let Ok(env_path) = env::var(CONFIG_PATH_ENV) {
        let path = PathBuf::from(env_path);
        if path.exists() {
            return Ok(path);
        }
        return Err(ConfigError::FileNotFound(format!(
            "Config file specified by {} not found: {}",
            CONFIG_PATH_ENV,
            path.display()
        )));
    }

    let mut search_paths = Vec::new();
    if let Ok(cwd) = env::current_dir() {
        search_paths.push(cwd.join(CONFIG_FILE_NAME));
        let mut current = cwd.as_path();
        for _ in 0..5 {
            match current.parent() {
                Some(parent) => {
                    search_paths.push(parent.join(CONFIG_FILE_NAME));
                    current = parent;
                }
                None => break,
            }
        }
    }

    if let Some(found) = search_paths.iter().find(|p| p.exists()) {
        return Ok(found.clone());
    }

    let search_list = search_paths
        .iter()
        .map(|p| format!("  - {}", p.display()))
        .collect::<Vec<_>>()
        .join("\n");

    Err(ConfigError::FileNotFound(format!(
        "'{}' not found in any of these locations:\n{}\n\nSet {} to specify a custom location.",
        CONFIG_FILE_NAME, search_list, CONFIG_PATH_ENV
    )))
}

/// Load, override and validate the configuration
///
/// * `config_path` - explicit file; `None` searches with [`find_config_file`]
/// * `cli_args` - CLI overrides keyed by field name (`k_threshold`, `channel_mode`, ...)
///
/// # Errors
///
/// Returns error if the file is missing, is not valid TOML, or fails validation
pub fn load_config(
    config_path: Option<&Path>,
    cli_args: Option<&HashMap<String, String>>,
) -> ConfigResult<DpcConfig> {
    let config_file = match config_path {
        Some(path) => path.to_path_buf(),
        None => find_config_file()?,
    };

    let content = fs::read_to_string(&config_file)?;
    let mut config: DpcConfig = toml::from_str(&content)?;

    apply_environment_overrides(&mut config)?;
    if let Some(cli) = cli_args {
        apply_cli_overrides(&mut config, cli)?;
    }

    validate_config(&config)?;
    Ok(config)
}

/// Apply environment variable overrides to configuration
///
/// Supported environment variables:
/// - `IRDPC_K_THRESHOLD` -> `pipeline.k_threshold`
/// - `IRDPC_CHANNEL_MODE` -> `pipeline.channel_mode`
/// - `IRDPC_AUTO_DETECT` -> `pipeline.auto_detect_enabled`
/// - `IRDPC_MANUAL_CORRECT` -> `pipeline.manual_correct_enabled`
/// - `IRDPC_PIPELINE_DEBUG` -> `pipeline.debug`
/// - `IRDPC_TICK_US` -> `timing.tick_us`
/// - `IRDPC_POLLING_TIMEOUT_MS` -> `timing.polling_timeout_ms`
/// - `IRDPC_FRAME_TIMEOUT_MS` -> `timing.frame_timeout_ms`
/// - `IRDPC_COLLAPSE_AUTO_DUPLICATES` -> `pipeline.collapse_auto_duplicates`
///
/// # Errors
///
/// Returns `ConfigError::InvalidValue` when a set variable does not parse
pub fn apply_environment_overrides(config: &mut DpcConfig) -> ConfigResult<()> {
    let name = |key: &str| format!("IRDPC_{}", key.to_ascii_uppercase());
    let lookup = |key: &str| env::var(name(key)).ok();
    apply_overrides(config, &lookup, &name)
}

/// Apply CLI argument overrides to configuration
///
/// Keys are the lowercase names of the environment variables without the
/// `IRDPC_` prefix (`k_threshold`, `channel_mode`, `tick_us`, ...).
///
/// # Errors
///
/// Returns `ConfigError::InvalidValue` when a value does not parse
pub fn apply_cli_overrides(
    config: &mut DpcConfig,
    cli_args: &HashMap<String, String>,
) -> ConfigResult<()> {
    let lookup = |key: &str| cli_args.get(key).cloned();
    apply_overrides(config, &lookup, &|key: &str| key.to_string())
}

fn apply_overrides(
    config: &mut DpcConfig,
    lookup: &dyn Fn(&str) -> Option<String>,
    name: &dyn Fn(&str) -> String,
) -> ConfigResult<()> {
    let invalid =
        |key: &str, value: &str| ConfigError::InvalidValue(format!("{} = {:?}", name(key), value));
    let number = |key: &str| -> ConfigResult<Option<u32>> {
        match lookup(key) {
            Some(value) => value
                .trim()
                .parse::<u32>()
                .map(Some)
                .map_err(|_| invalid(key, &value)),
            None => Ok(None),
        }
    };
    let flag = |key: &str| -> ConfigResult<Option<bool>> {
        match lookup(key) {
            Some(value) => parse_bool(&value).map(Some).ok_or_else(|| invalid(key, &value)),
            None => Ok(None),
        }
    };

    if let Some(value) = number("k_threshold")? {
        config.pipeline.k_threshold = value;
    }
    if let Some(value) = lookup("channel_mode") {
        config.pipeline.channel_mode =
            ChannelModeSetting::parse(&value).ok_or_else(|| invalid("channel_mode", &value))?;
    }
    if let Some(value) = flag("auto_detect")? {
        config.pipeline.auto_detect_enabled = value;
    }
    if let Some(value) = flag("manual_correct")? {
        config.pipeline.manual_correct_enabled = value;
    }
    if let Some(value) = flag("pipeline_debug")? {
        config.pipeline.debug = value;
    }
    if let Some(value) = flag("collapse_auto_duplicates")? {
        config.pipeline.collapse_auto_duplicates = value;
    }
    if let Some(value) = number("tick_us")? {
        config.timing.tick_us = value;
    }
    if let Some(value) = number("polling_timeout_ms")? {
        config.timing.polling_timeout_ms = value;
    }
    if let Some(value) = number("frame_timeout_ms")? {
        config.timing.frame_timeout_ms = value;
    }
    Ok(())
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

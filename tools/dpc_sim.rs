// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*!
DPC Simulation Tool

Runs frame cycles of the defective-pixel correction pipeline against the
register-level hardware simulator, using the settings of
`dpc_configuration.toml` (or built-in defaults when no file is found).

Example:
  cargo run --bin dpc_sim -- --mode interrupt --frames 3 --debug-irdpc-pipeline
*/

use std::collections::HashMap;
use std::env;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{CommandFactory, FromArgMatches, Parser, ValueEnum};
use tracing::{info, warn};

use irdpc::config::{
    apply_cli_overrides, apply_environment_overrides, find_config_file, load_config,
    validate_config, DpcConfig,
};
use irdpc::observability::{debug_flags_help, init_logging_default, parse_debug_flags};
use irdpc::prelude::*;

/// Run the defective-pixel correction pipeline on simulated hardware
#[derive(Parser, Debug)]
#[command(name = "dpc_sim", version, long_about = None)]
struct Args {
    /// Configuration file (default: search for dpc_configuration.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Detection delivery strategy, overriding the configuration
    #[arg(short, long, value_enum)]
    mode: Option<ModeArg>,

    /// Frame cycles to run
    #[arg(long, default_value_t = 2)]
    frames: u32,

    /// Synthetic detections scheduled per frame
    #[arg(long, default_value_t = 24)]
    detections: u32,

    /// Configuration override as key=value (repeatable)
    #[arg(long = "set", value_name = "KEY=VALUE", value_parser = parse_override)]
    overrides: Vec<(String, String)>,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum ModeArg {
    Polling,
    Interrupt,
}

impl From<ModeArg> for ChannelMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Polling => ChannelMode::Polling,
            ModeArg::Interrupt => ChannelMode::Interrupt,
        }
    }
}

fn parse_override(pair: &str) -> Result<(String, String), String> {
    let (key, value) = pair
        .split_once('=')
        .ok_or_else(|| format!("expected key=value, got {:?}", pair))?;
    Ok((key.trim().to_string(), value.trim().to_string()))
}

impl Args {
    /// Parse the command line; `--debug-*` flags are left to the
    /// observability layer.
    fn from_env() -> Result<Self> {
        let args = env::args().filter(|arg| !arg.starts_with("--debug-"));
        let matches = Self::command()
            .after_help(debug_flags_help())
            .get_matches_from(args);
        Ok(Self::from_arg_matches(&matches)?)
    }

    fn cli_overrides(&self) -> HashMap<String, String> {
        let mut overrides: HashMap<String, String> = self.overrides.iter().cloned().collect();
        if let Some(mode) = self.mode {
            overrides.insert(
                "channel_mode".to_string(),
                ChannelMode::from(mode).name().to_string(),
            );
        }
        overrides
    }
}

fn resolve_config(args: &Args) -> Result<DpcConfig> {
    let overrides = args.cli_overrides();
    let path = match &args.config {
        Some(path) => Some(path.clone()),
        None => find_config_file().ok(),
    };
    match path {
        Some(path) => {
            info!("Loading configuration from {}", path.display());
            load_config(Some(&path), Some(&overrides))
                .with_context(|| format!("Failed to load {}", path.display()))
        }
        None => {
            warn!("No configuration file found, using built-in defaults");
            let mut config = DpcConfig::default();
            apply_environment_overrides(&mut config)?;
            apply_cli_overrides(&mut config, &overrides)?;
            validate_config(&config)?;
            Ok(config)
        }
    }
}

/// Deterministic scatter of detections over the frame
fn synthetic_detections(geometry: FrameGeometry, frame: u32, count: u32) -> Vec<BadPixel> {
    let mut seed = 0x9E37_79B9u32 ^ frame.wrapping_mul(0x85EB_CA6B);
    (0..count)
        .map(|i| {
            seed = seed.wrapping_mul(1_664_525).wrapping_add(1_013_904_223);
            let x = (seed >> 8) % u32::from(geometry.width);
            let y = (seed >> 20) % u32::from(geometry.height);
            let category = if i % 3 == 0 {
                DefectCategory::Stuck
            } else {
                DefectCategory::Dead
            };
            BadPixel::new(x as u16, y as u16, category)
        })
        .collect()
}

/// `bad_pixel_ratio` is already a percentage of the frame
fn format_ratio(status: &SystemStatus) -> String {
    format!("{:.5}%", status.bad_pixel_ratio)
}

fn main() -> Result<()> {
    let args = Args::from_env()?;
    let debug_flags = parse_debug_flags();
    let _logging = init_logging_default(&debug_flags)?;

    let config = resolve_config(&args)?;
    let settings = irdpc::pipeline_settings(&config);
    let lines = irdpc::irq_lines(&config);
    let mode = settings.config.channel_mode;

    println!("IR defective-pixel correction simulator v{}", irdpc::VERSION);
    println!("  mode:        {}", mode);
    println!("  k threshold: {}", settings.config.k_threshold);
    println!("  frame:       {}x{}", settings.geometry.width, settings.geometry.height);
    println!();

    let sim = SimulatedDpc::new(settings.registers);
    let irq = MockInterruptController::new();
    let mailbox = DefectMailbox::new();
    let clock = MockClock::new();
    let handler = IrqHandler::new(
        &mailbox,
        &sim,
        &irq,
        settings.registers.auto_channel,
        lines,
        settings.geometry,
    );
    let pump = IrqPumpClock::new(&sim, handler, &clock);

    let channel = match mode {
        ChannelMode::Polling => ChannelSelector::Polling(PollingChannel::new(
            &sim,
            &pump,
            settings.registers.auto_channel,
            settings.geometry,
            settings.timing.tick_us,
            settings.timing.ack_pulse_us,
        )),
        ChannelMode::Interrupt => ChannelSelector::Interrupt(InterruptChannel::new(
            &mailbox,
            &sim,
            &irq,
            &pump,
            settings.registers.auto_channel,
            lines,
            settings.timing.tick_us,
        )),
    };

    let mut dpc = DpcPipeline::new(&sim, channel, MemoryStore::new(), &clock, settings)
        .context("Failed to build the pipeline")?;
    dpc.init();

    for (x, y) in [(50, 100), (320, 256), (639, 511)] {
        if settings.geometry.contains(x, y) {
            dpc.add_manual_defect(x, y, DefectCategory::Manual)
                .with_context(|| format!("Failed to add manual defect ({}, {})", x, y))?;
        }
    }

    for frame in 0..args.frames {
        sim.schedule_detections(&synthetic_detections(
            settings.geometry,
            frame,
            args.detections,
        ));
        match dpc.run_frame_cycle() {
            Ok(stats) => println!(
                "frame {:>3}: manual {:>3}  dead {:>3}  stuck {:>3}  uploaded {:>3}  ({} ticks)",
                stats.frame,
                stats.manual_applied,
                stats.auto_dead,
                stats.auto_stuck,
                stats.merged_total,
                stats.elapsed_ticks
            ),
            Err(err) => println!("frame {:>3}: failed: {}", frame, err),
        }
    }

    let status = dpc.get_status();
    let irq_stats = dpc.interrupt_stats();
    println!();
    println!("frames processed:  {}", status.frames_processed);
    println!("errors:            {}", status.error_count);
    println!("lost detections:   {}", status.lost_detections);
    println!("corrector entries: {}", sim.corrector_table().len());
    println!("bad-pixel ratio:   {}", format_ratio(&status));
    println!(
        "interrupts:        {} defect, {} frame-done, {} rejected",
        irq_stats.defect_irqs, irq_stats.frame_done_irqs, irq_stats.rejected
    );
    println!("manual list saves: {}", dpc.store().save_count());

    dpc.shutdown();
    Ok(())
}

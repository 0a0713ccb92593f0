use anyhow::{Context, Result};
use linebot_core::constants::MAX_FRAMES_DEFAULT;
use linebot_core::SimConfig;
use std::env;
use std::fs;
use std::path::Path;

pub const ENV_MAX_FRAMES: &str = "LINEBOT_MAX_FRAMES";
pub const ENV_MAX_LOST_FRAMES: &str = "LINEBOT_MAX_LOST_FRAMES";
pub const ENV_LINE_TOLERANCE: &str = "LINEBOT_LINE_TOLERANCE";
pub const ENV_CORRECTED_DIAGONALS: &str = "LINEBOT_CORRECTED_DIAGONALS";

#[derive(Clone, Debug, PartialEq)]
pub struct RunSettings {
    pub sim: SimConfig,
    pub max_frames: u32,
}

/// Loads the simulation config from an optional JSON file, then applies
/// `LINEBOT_*` environment overrides and validates the result.
pub fn load_settings(path: Option<&Path>) -> Result<RunSettings> {
    load_settings_with(path, |name| env::var(name).ok())
}

pub fn load_settings_with<F>(path: Option<&Path>, lookup: F) -> Result<RunSettings>
where
    F: Fn(&str) -> Option<String>,
{
    let mut sim = match path {
        Some(path) => read_config_file(path)?,
        None => SimConfig::default(),
    };

    let max_frames = read_u32(&lookup, ENV_MAX_FRAMES, MAX_FRAMES_DEFAULT);
    sim.control.max_lost_frames =
        read_u32(&lookup, ENV_MAX_LOST_FRAMES, sim.control.max_lost_frames);
    sim.line_tolerance = read_u8(&lookup, ENV_LINE_TOLERANCE, sim.line_tolerance);
    sim.sensors.corrected_forward_diagonals = read_bool(
        &lookup,
        ENV_CORRECTED_DIAGONALS,
        sim.sensors.corrected_forward_diagonals,
    );

    sim.validate().context("invalid simulation config")?;
    Ok(RunSettings { sim, max_frames })
}

pub fn read_config_file(path: &Path) -> Result<SimConfig> {
    let raw =
        fs::read(path).with_context(|| format!("failed reading config {}", path.display()))?;
    serde_json::from_slice(&raw).with_context(|| format!("invalid config json {}", path.display()))
}

fn read_u32<F>(lookup: &F, name: &str, default: u32) -> u32
where
    F: Fn(&str) -> Option<String>,
{
    let Some(raw) = lookup(name) else {
        return default;
    };
    match raw.trim().parse::<u32>() {
        Ok(value) if value > 0 => value,
        _ => {
            tracing::warn!("ignoring {name}={raw:?}: expected a positive integer, using {default}");
            default
        }
    }
}

fn read_u8<F>(lookup: &F, name: &str, default: u8) -> u8
where
    F: Fn(&str) -> Option<String>,
{
    let Some(raw) = lookup(name) else {
        return default;
    };
    match raw.trim().parse::<u8>() {
        Ok(value) if value > 0 => value,
        _ => {
            tracing::warn!("ignoring {name}={raw:?}: expected 1..=255, using {default}");
            default
        }
    }
}

fn read_bool<F>(lookup: &F, name: &str, default: bool) -> bool
where
    F: Fn(&str) -> Option<String>,
{
    let Some(raw) = lookup(name) else {
        return default;
    };
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => true,
        "0" | "false" | "no" | "off" => false,
        _ => {
            tracing::warn!("ignoring {name}={raw:?}: expected a boolean, using {default}");
            default
        }
    }
}

use serde::{Deserialize, Serialize};

use crate::color::{Rgb, BLACK, ROBOT_COLOR, SENSOR_ACTIVE, SENSOR_PASSIVE, WHITE};
use crate::constants::{
    FPS, LINE_TOLERANCE, ROBOT_RADIUS, SENSOR_DRAW_RADIUS, WORLD_HEIGHT, WORLD_WIDTH,
};
use crate::control::ControlParams;
use crate::error::ConfigError;
use crate::robot::Pose;
use crate::sensors::SensorLayout;
use crate::trace::crc32;
use crate::track::TrackShape;

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Palette {
    pub background: Rgb,
    pub line: Rgb,
    pub robot: Rgb,
    pub sensor_active: Rgb,
    pub sensor_passive: Rgb,
}

impl Default for Palette {
    fn default() -> Self {
        Self {
            background: WHITE,
            line: BLACK,
            robot: ROBOT_COLOR,
            sensor_active: SENSOR_ACTIVE,
            sensor_passive: SENSOR_PASSIVE,
        }
    }
}

/// Everything that determines a run besides the controller and the seed.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    pub width: u32,
    pub height: u32,
    pub fps: u32,
    pub track: TrackShape,
    pub palette: Palette,
    pub line_tolerance: u8,
    pub sensors: SensorLayout,
    pub control: ControlParams,
    pub robot_radius: f64,
    pub sensor_draw_radius: i32,
    /// Overrides the track's default start pose.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start: Option<Pose>,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            width: WORLD_WIDTH,
            height: WORLD_HEIGHT,
            fps: FPS,
            track: TrackShape::default(),
            palette: Palette::default(),
            line_tolerance: LINE_TOLERANCE,
            sensors: SensorLayout::default(),
            control: ControlParams::default(),
            robot_radius: ROBOT_RADIUS,
            sensor_draw_radius: SENSOR_DRAW_RADIUS,
            start: None,
        }
    }
}

impl SimConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.width == 0 || self.height == 0 {
            return Err(ConfigError::EmptyWorld {
                width: self.width,
                height: self.height,
            });
        }
        if self.fps == 0 {
            return Err(ConfigError::ZeroFps);
        }
        if self.line_tolerance == 0 {
            return Err(ConfigError::ZeroTolerance);
        }
        if !(self.control.base_speed > 0.0) {
            return Err(ConfigError::NonPositiveSpeed {
                speed: self.control.base_speed,
            });
        }
        if !(self.control.turn_rate_deg > 0.0) {
            return Err(ConfigError::NonPositiveTurnRate {
                turn_rate: self.control.turn_rate_deg,
            });
        }
        if self.control.max_lost_frames == 0 {
            return Err(ConfigError::ZeroMaxLostFrames);
        }
        self.control
            .damping
            .check()
            .map_err(|reason| ConfigError::InvalidDamping { reason })?;
        let layout = &self.sensors;
        if !(layout.forward_distance > 0.0
            && layout.lateral_offset > 0.0
            && layout.diagonal_scale > 0.0)
        {
            return Err(ConfigError::NonPositiveSensorGeometry);
        }
        self.track
            .is_valid()
            .map_err(|reason| ConfigError::InvalidTrack { reason })?;

        let (x, y, _) = self.start_xyh();
        let inside_x = (0.0..self.width as f64).contains(&x);
        let inside_y = (0.0..self.height as f64).contains(&y);
        if !(inside_x && inside_y) {
            return Err(ConfigError::StartOutsideWorld { x, y });
        }
        Ok(())
    }

    /// Start position and heading before any seed jitter.
    pub fn start_xyh(&self) -> (f64, f64, f64) {
        match self.start {
            Some(pose) => (pose.x, pose.y, pose.heading_deg),
            None => self.track.default_start(),
        }
    }

    /// CRC-32 of the canonical JSON form. Traces record it so replays run
    /// against the same world.
    pub fn digest(&self) -> Result<u32, ConfigError> {
        let bytes = serde_json::to_vec(self).map_err(|err| ConfigError::Unserializable {
            reason: err.to_string(),
        })?;
        Ok(crc32(&bytes))
    }
}

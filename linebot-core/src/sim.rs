use crate::config::SimConfig;
use crate::constants::{START_JITTER_DEG, START_JITTER_PX};
use crate::control::Action;
use crate::error::ConfigError;
use crate::jitter::start_offset;
use crate::raster::Canvas;
use crate::render::render_frame;
use crate::robot::Pose;
use crate::sensors::{sense, SensorPositions, SensorReadings};
use crate::track::Track;

/// Seed 0 starts on the configured pose; other seeds jitter position and heading.
pub fn start_pose(config: &SimConfig, seed: u32) -> Pose {
    let (x, y, heading) = config.start_xyh();
    let offset = start_offset(seed, START_JITTER_PX, START_JITTER_DEG);

    let max_x = (config.width.max(1) - 1) as f64;
    let max_y = (config.height.max(1) - 1) as f64;
    Pose::new(
        (x + offset.dx).clamp(0.0, max_x),
        (y + offset.dy).clamp(0.0, max_y),
        heading + offset.dheading,
    )
}

/// One robot on one track, advanced a frame at a time.
#[derive(Clone, Debug)]
pub struct LiveSim {
    config: SimConfig,
    track: Track,
    pose: Pose,
    frame_count: u32,
}

impl LiveSim {
    pub fn new(config: SimConfig, seed: u32) -> Result<Self, ConfigError> {
        config.validate()?;
        let track = Track::build(
            config.track,
            config.width,
            config.height,
            config.palette.line,
            config.palette.background,
        );
        let pose = start_pose(&config, seed);
        Ok(Self {
            config,
            track,
            pose,
            frame_count: 0,
        })
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    pub fn track(&self) -> &Track {
        &self.track
    }

    pub fn pose(&self) -> Pose {
        self.pose
    }

    pub fn frame_count(&self) -> u32 {
        self.frame_count
    }

    pub fn sensor_positions(&self) -> SensorPositions {
        self.config.sensors.positions(&self.pose)
    }

    pub fn sense(&self) -> SensorReadings {
        sense(
            &self.track,
            &self.sensor_positions(),
            self.config.palette.line,
            self.config.line_tolerance,
        )
    }

    pub fn step(&mut self, action: Action) {
        self.pose
            .advance(action, self.config.width, self.config.height);
        self.frame_count += 1;
    }

    pub fn render(&self, readings: &SensorReadings) -> Canvas {
        render_frame(
            &self.config,
            &self.track,
            &self.pose,
            &self.sensor_positions(),
            readings,
        )
    }
}

/// Replays recorded actions from the start pose, returning the readings seen
/// before each action and the final pose.
pub fn replay(
    config: &SimConfig,
    seed: u32,
    actions: &[Action],
) -> Result<(Vec<SensorReadings>, Pose), ConfigError> {
    let mut sim = LiveSim::new(config.clone(), seed)?;
    let mut seen = Vec::with_capacity(actions.len());
    for action in actions {
        seen.push(sim.sense());
        sim.step(*action);
    }
    Ok((seen, sim.pose()))
}

use crate::controllers::{controller_fingerprint, controller_tag, create_controller};
use anyhow::{anyhow, Context, Result};
use linebot_core::control::{Controller, Decision, Mode};
use linebot_core::raster::Canvas;
use linebot_core::robot::Pose;
use linebot_core::sensors::SensorId;
use linebot_core::sim::LiveSim;
use linebot_core::trace::{serialize_trace, TraceFrame};
use linebot_core::{verify_trace, SimConfig};
use serde::{Deserialize, Serialize};
use std::f64::consts::{PI, TAU};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunOutcome {
    /// Still driving when the frame budget ran out.
    MaxFrames,
    /// The search window expired and the controller gave up.
    LineLost,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RunMetrics {
    pub controller_id: String,
    pub controller_fingerprint: String,
    pub seed: u32,
    pub max_frames: u32,
    pub frame_count: u32,
    /// Simulated time at the configured frame rate.
    pub sim_seconds: f64,
    pub outcome: RunOutcome,
    pub final_pose: Pose,
    pub config_digest: u32,
    pub trace_checksum: u32,
    pub center_on_frames: u32,
    pub search_frames: u32,
    pub lost_events: u32,
    pub distance: f64,
    pub mean_abs_turn: f64,
    pub steering_reversals: u32,
    pub laps: f64,
}

impl RunMetrics {
    pub fn center_ratio(&self) -> f64 {
        if self.frame_count == 0 {
            0.0
        } else {
            self.center_on_frames as f64 / self.frame_count as f64
        }
    }
}

#[derive(Clone, Debug)]
pub struct FrameCapture {
    pub dir: PathBuf,
    /// Capture frames whose index is a multiple of this.
    pub every: u32,
}

#[derive(Clone, Debug)]
pub struct RunArtifact {
    pub metrics: RunMetrics,
    pub trace: Vec<u8>,
    pub captured_frames: Vec<PathBuf>,
}

/// Frame buffers grow past this on demand.
const PREALLOCATED_FRAMES: u32 = 1 << 16;

pub fn run_controller(
    controller_id: &str,
    config: &SimConfig,
    seed: u32,
    max_frames: u32,
) -> Result<RunArtifact> {
    run_controller_with_capture(controller_id, config, seed, max_frames, None)
}

pub fn run_controller_with_capture(
    controller_id: &str,
    config: &SimConfig,
    seed: u32,
    max_frames: u32,
    capture: Option<&FrameCapture>,
) -> Result<RunArtifact> {
    let mut controller = create_controller(controller_id, config.control)
        .ok_or_else(|| anyhow!("unknown controller '{controller_id}'"))?;
    run_controller_instance(controller.as_mut(), config, seed, max_frames, capture)
}

pub fn run_controller_instance(
    controller: &mut dyn Controller,
    config: &SimConfig,
    seed: u32,
    max_frames: u32,
    capture: Option<&FrameCapture>,
) -> Result<RunArtifact> {
    if max_frames == 0 {
        return Err(anyhow!("max_frames must be > 0"));
    }
    if let Some(capture) = capture {
        if capture.every == 0 {
            return Err(anyhow!("capture interval must be >= 1"));
        }
        fs::create_dir_all(&capture.dir)
            .with_context(|| format!("failed creating {}", capture.dir.display()))?;
    }

    let tag = controller_tag(controller.id())
        .ok_or_else(|| anyhow!("controller '{}' has no roster tag", controller.id()))?;
    controller.reset();

    let mut sim = LiveSim::new(config.clone(), seed).context("invalid simulation config")?;
    let mut frames = Vec::with_capacity(max_frames.min(PREALLOCATED_FRAMES) as usize);
    let mut captured_frames = Vec::new();
    let mut stats = RunStats::new(config.track.center(), sim.pose());
    let mut outcome = RunOutcome::MaxFrames;

    while sim.frame_count() < max_frames {
        let frame = sim.frame_count();
        let readings = sim.sense();

        if let Some(capture) = capture {
            if frame % capture.every == 0 {
                let path = capture.dir.join(format!("frame-{frame:06}.ppm"));
                write_artifact(&path, &sim.render(&readings).to_ppm())?;
                tracing::debug!(frame, path = %path.display(), "captured frame");
                captured_frames.push(path);
            }
        }

        let action = match controller.decide(&readings) {
            Decision::Drive(action) => action,
            Decision::GiveUp => {
                outcome = RunOutcome::LineLost;
                break;
            }
        };
        let mode = controller.mode();
        tracing::debug!(
            frame,
            mode = %mode,
            sensors = %readings,
            turn = action.turn_deg,
            speed = action.speed,
            "step"
        );

        frames.push(TraceFrame {
            readings,
            mode,
            action,
        });
        sim.step(action);
        stats.record(mode, readings.on(SensorId::Center), action.turn_deg, sim.pose());
    }

    let final_pose = sim.pose();
    let frame_count = frames.len() as u32;
    if frame_count == 0 {
        return Err(anyhow!("controller '{}' produced no frames", controller.id()));
    }

    let digest = config.digest().context("invalid simulation config")?;
    let trace = serialize_trace(tag, seed, digest, &frames, final_pose);
    let journal = verify_trace(&trace, config, max_frames)
        .map_err(|err| anyhow!("generated trace failed verification: {err}"))?;

    tracing::info!(
        "run finished: controller={} seed={:#010x} frames={} outcome={:?} laps={:.3}",
        controller.id(),
        seed,
        frame_count,
        outcome,
        stats.laps()
    );

    Ok(RunArtifact {
        metrics: RunMetrics {
            controller_id: controller.id().to_string(),
            controller_fingerprint: controller_fingerprint(controller.id(), &config.control)
                .unwrap_or_else(|| "unknown".to_string()),
            seed,
            max_frames,
            frame_count,
            sim_seconds: frame_count as f64 / config.fps as f64,
            outcome,
            final_pose,
            config_digest: journal.config_digest,
            trace_checksum: journal.trace_checksum,
            center_on_frames: stats.center_on_frames,
            search_frames: journal.search_frames,
            lost_events: stats.lost_events,
            distance: stats.distance,
            mean_abs_turn: stats.mean_abs_turn(),
            steering_reversals: stats.steering_reversals,
            laps: stats.laps(),
        },
        trace,
        captured_frames,
    })
}

/// Drives `frames` frames (or until the controller gives up) and renders the
/// world as it stands.
pub fn render_after(
    controller_id: &str,
    config: &SimConfig,
    seed: u32,
    frames: u32,
) -> Result<Canvas> {
    let mut controller = create_controller(controller_id, config.control)
        .ok_or_else(|| anyhow!("unknown controller '{controller_id}'"))?;
    let mut sim = LiveSim::new(config.clone(), seed).context("invalid simulation config")?;

    while sim.frame_count() < frames {
        match controller.decide(&sim.sense()) {
            Decision::Drive(action) => sim.step(action),
            Decision::GiveUp => break,
        }
    }
    Ok(sim.render(&sim.sense()))
}

pub fn write_artifact(path: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed creating directory {}", parent.display()))?;
    }
    fs::write(path, bytes).with_context(|| format!("failed writing {}", path.display()))
}

struct RunStats {
    center: (f64, f64),
    last_pose: Pose,
    last_angle: f64,
    swept_angle: f64,
    last_mode: Mode,
    last_turn_sign: Option<f64>,
    center_on_frames: u32,
    lost_events: u32,
    distance: f64,
    follow_frames: u32,
    abs_turn_sum: f64,
    steering_reversals: u32,
}

impl RunStats {
    fn new(center: (f64, f64), start: Pose) -> Self {
        Self {
            center,
            last_pose: start,
            last_angle: angle_around(center, &start),
            swept_angle: 0.0,
            last_mode: Mode::FollowLine,
            last_turn_sign: None,
            center_on_frames: 0,
            lost_events: 0,
            distance: 0.0,
            follow_frames: 0,
            abs_turn_sum: 0.0,
            steering_reversals: 0,
        }
    }

    fn record(&mut self, mode: Mode, center_on: bool, turn_deg: f64, pose: Pose) {
        if center_on {
            self.center_on_frames += 1;
        }
        if mode == Mode::LostLineSearch && self.last_mode == Mode::FollowLine {
            self.lost_events += 1;
        }

        if mode == Mode::FollowLine {
            self.follow_frames += 1;
            self.abs_turn_sum += turn_deg.abs();
            if turn_deg != 0.0 {
                let sign = turn_deg.signum();
                if self.last_turn_sign.is_some_and(|last| last != sign) {
                    self.steering_reversals += 1;
                }
                self.last_turn_sign = Some(sign);
            }
        } else {
            self.last_turn_sign = None;
        }
        self.last_mode = mode;

        self.distance += (pose.x - self.last_pose.x).hypot(pose.y - self.last_pose.y);
        let angle = angle_around(self.center, &pose);
        self.swept_angle += (angle - self.last_angle + PI).rem_euclid(TAU) - PI;
        self.last_angle = angle;
        self.last_pose = pose;
    }

    fn mean_abs_turn(&self) -> f64 {
        if self.follow_frames == 0 {
            0.0
        } else {
            self.abs_turn_sum / self.follow_frames as f64
        }
    }

    /// Signed laps; positive is clockwise on screen.
    fn laps(&self) -> f64 {
        self.swept_angle / TAU
    }
}

fn angle_around(center: (f64, f64), pose: &Pose) -> f64 {
    (pose.y - center.1).atan2(pose.x - center.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonical_top_segment_run() {
        let config = SimConfig::default();
        let artifact = run_controller("weighted", &config, 0, 100).expect("run");
        let metrics = &artifact.metrics;

        assert_eq!(metrics.frame_count, 100);
        assert!((metrics.sim_seconds - 100.0 / 60.0).abs() < 1e-12);
        assert_eq!(metrics.outcome, RunOutcome::MaxFrames);
        assert_eq!(metrics.center_on_frames, 100);
        assert_eq!(metrics.search_frames, 0);
        assert_eq!(metrics.lost_events, 0);
        assert_eq!(metrics.steering_reversals, 0);
        assert_eq!(metrics.mean_abs_turn, 0.0);
        assert!((metrics.distance - 200.0).abs() < 1e-9);
        assert_eq!(metrics.final_pose, Pose::new(312.5, 112.5, 0.0));
        assert!(metrics.laps > 0.0);
        assert_eq!(metrics.center_ratio(), 1.0);
    }

    #[test]
    fn interior_start_gives_up() {
        let config = SimConfig {
            start: Some(Pose::new(400.0, 300.0, 0.0)),
            ..SimConfig::default()
        };
        let artifact = run_controller("weighted", &config, 0, 1_000).expect("run");
        let metrics = &artifact.metrics;

        assert_eq!(metrics.outcome, RunOutcome::LineLost);
        assert_eq!(metrics.frame_count, 121);
        assert_eq!(metrics.search_frames, 121);
        assert_eq!(metrics.lost_events, 1);
        assert_eq!(metrics.center_on_frames, 0);
        assert_eq!(metrics.distance, 0.0);
        assert_eq!(metrics.final_pose.x, 400.0);
        assert_eq!(metrics.final_pose.y, 300.0);
    }

    #[test]
    fn huge_frame_budget_does_not_preallocate_it() {
        let config = SimConfig {
            start: Some(Pose::new(400.0, 300.0, 0.0)),
            ..SimConfig::default()
        };
        let artifact = run_controller("weighted", &config, 0, u32::MAX).expect("run");
        assert_eq!(artifact.metrics.max_frames, u32::MAX);
        assert_eq!(artifact.metrics.frame_count, 121);
    }

    #[test]
    fn sim_seconds_follow_the_frame_rate() {
        let config = SimConfig {
            fps: 30,
            ..SimConfig::default()
        };
        let artifact = run_controller("weighted", &config, 0, 90).expect("run");
        assert_eq!(artifact.metrics.sim_seconds, 3.0);
    }

    #[test]
    fn rejects_unknown_controller_and_zero_frames() {
        let config = SimConfig::default();
        assert!(run_controller("nope", &config, 0, 10).is_err());
        assert!(run_controller("weighted", &config, 0, 0).is_err());
    }

    #[test]
    fn reversals_count_sign_changes_while_following() {
        let mut stats = RunStats::new((0.0, 0.0), Pose::new(10.0, 0.0, 0.0));
        let pose = Pose::new(10.0, 0.0, 0.0);
        for turn in [2.0, 0.0, -2.0, -2.0, 2.0] {
            stats.record(Mode::FollowLine, true, turn, pose);
        }
        assert_eq!(stats.steering_reversals, 2);

        stats.record(Mode::LostLineSearch, false, 3.0, pose);
        stats.record(Mode::FollowLine, true, -2.0, pose);
        assert_eq!(stats.steering_reversals, 2);
        assert_eq!(stats.lost_events, 1);
        assert!((stats.mean_abs_turn() - 10.0 / 6.0).abs() < 1e-12);
    }

    #[test]
    fn laps_unwrap_across_the_seam() {
        let mut stats = RunStats::new((0.0, 0.0), Pose::new(10.0, 0.0, 0.0));
        for step in 1..=8 {
            let angle = step as f64 * TAU / 8.0;
            let pose = Pose::new(10.0 * angle.cos(), 10.0 * angle.sin(), 0.0);
            stats.record(Mode::FollowLine, true, 0.0, pose);
        }
        assert!((stats.laps() - 1.0).abs() < 1e-9);
    }
}

use serde::{Deserialize, Serialize};

use crate::config::SimConfig;
use crate::constants::MAX_FRAMES_DEFAULT;
use crate::control::Mode;
use crate::error::TraceError;
use crate::robot::Pose;
use crate::sim::replay;
use crate::trace::parse_trace;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TraceJournal {
    pub controller_tag: u8,
    pub seed: u32,
    pub frame_count: u32,
    pub config_digest: u32,
    pub search_frames: u32,
    pub final_pose: Pose,
    pub trace_checksum: u32,
}

/// Parses a trace and replays its actions against `config`, requiring every
/// recorded sensor reading and the final pose to match exactly.
pub fn verify_trace(
    bytes: &[u8],
    config: &SimConfig,
    max_frames: u32,
) -> Result<TraceJournal, TraceError> {
    let max_frames = if max_frames == 0 {
        MAX_FRAMES_DEFAULT
    } else {
        max_frames
    };
    let trace = parse_trace(bytes, max_frames)?;

    let expected = config
        .digest()
        .map_err(|error| TraceError::InvalidConfig { error })?;
    if trace.header.config_digest != expected {
        return Err(TraceError::ConfigDigestMismatch {
            recorded: trace.header.config_digest,
            expected,
        });
    }

    let actions: Vec<_> = trace.frames.iter().map(|entry| entry.action).collect();
    let (seen, final_pose) = replay(config, trace.header.seed, &actions)
        .map_err(|error| TraceError::InvalidConfig { error })?;

    for (frame, (entry, computed)) in trace.frames.iter().zip(&seen).enumerate() {
        let recorded = entry.readings.bits();
        if computed.bits() != recorded {
            return Err(TraceError::SensorMismatch {
                frame: frame as u32,
                recorded,
                computed: computed.bits(),
            });
        }
    }
    let search_frames = trace
        .frames
        .iter()
        .filter(|entry| entry.mode == Mode::LostLineSearch)
        .count() as u32;

    if !final_pose.same_bits(&trace.footer.final_pose) {
        return Err(TraceError::PoseMismatch);
    }

    Ok(TraceJournal {
        controller_tag: trace.header.controller_tag,
        seed: trace.header.seed,
        frame_count: trace.header.frame_count,
        config_digest: trace.header.config_digest,
        search_frames,
        final_pose: trace.footer.final_pose,
        trace_checksum: trace.footer.checksum,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::control::{Action, Controller, Decision, WeightedController};
    use crate::sensors::SensorReadings;
    use crate::sim::LiveSim;
    use crate::trace::{serialize_trace, TraceFrame};

    fn record(config: &SimConfig, seed: u32, frames: u32) -> (Vec<u8>, u32) {
        let mut sim = LiveSim::new(config.clone(), seed).expect("valid");
        let mut ctl = WeightedController::new(config.control);
        let mut recorded = Vec::new();
        for _ in 0..frames {
            let readings = sim.sense();
            let Decision::Drive(action) = ctl.decide(&readings) else {
                break;
            };
            recorded.push(TraceFrame {
                readings,
                mode: ctl.mode(),
                action,
            });
            sim.step(action);
        }
        let count = recorded.len() as u32;
        let digest = config.digest().expect("digest");
        (serialize_trace(0, seed, digest, &recorded, sim.pose()), count)
    }

    #[test]
    fn recorded_run_verifies() {
        let config = SimConfig::default();
        let (bytes, count) = record(&config, 0x55, 400);
        let journal = verify_trace(&bytes, &config, 1_000).expect("trace should verify");
        assert_eq!(journal.seed, 0x55);
        assert_eq!(journal.frame_count, count);
        assert_eq!(journal.config_digest, config.digest().expect("digest"));
    }

    #[test]
    fn rejects_other_config() {
        let config = SimConfig::default();
        let (bytes, _) = record(&config, 0, 10);
        let mut other = config.clone();
        other.line_tolerance = 40;
        assert!(matches!(
            verify_trace(&bytes, &other, 100),
            Err(TraceError::ConfigDigestMismatch { .. })
        ));
    }

    #[test]
    fn rejects_tampered_sensor_reading() {
        let config = SimConfig::default();
        let mut sim = LiveSim::new(config.clone(), 0).expect("valid");
        let readings = sim.sense();
        let action = Action {
            turn_deg: 0.0,
            speed: 2.0,
        };
        sim.step(action);
        let forged = TraceFrame {
            readings: SensorReadings::from_bits(readings.bits() | 0b00001),
            mode: Mode::FollowLine,
            action,
        };
        let digest = config.digest().expect("digest");
        let bytes = serialize_trace(0, 0, digest, &[forged], sim.pose());
        assert_eq!(
            verify_trace(&bytes, &config, 100),
            Err(TraceError::SensorMismatch {
                frame: 0,
                recorded: 0b00101,
                computed: 0b00100
            })
        );
    }

    #[test]
    fn rejects_wrong_final_pose() {
        let config = SimConfig::default();
        let sim = LiveSim::new(config.clone(), 0).expect("valid");
        let frame = TraceFrame {
            readings: sim.sense(),
            mode: Mode::FollowLine,
            action: Action {
                turn_deg: 0.0,
                speed: 2.0,
            },
        };
        let wrong = Pose::new(114.0, 112.5, 0.0);
        let digest = config.digest().expect("digest");
        let bytes = serialize_trace(0, 0, digest, &[frame], wrong);
        assert_eq!(
            verify_trace(&bytes, &config, 100),
            Err(TraceError::PoseMismatch)
        );
    }
}

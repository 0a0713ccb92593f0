//! Steering laws mapping sensor readings to a turn and a speed.

use core::fmt;

use serde::{Deserialize, Serialize};

use crate::constants::{BASE_SPEED, MAX_LOST_FRAMES, TURN_RATE_DEG};
use crate::sensors::{SensorId, SensorReadings, SensorWeights};

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Action {
    pub turn_deg: f64,
    pub speed: f64,
}

impl Action {
    pub const STOP: Action = Action {
        turn_deg: 0.0,
        speed: 0.0,
    };
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    #[default]
    FollowLine,
    LostLineSearch,
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::FollowLine => f.write_str("FOLLOW_LINE"),
            Self::LostLineSearch => f.write_str("LOST_LINE_SEARCH"),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Decision {
    Drive(Action),
    /// The search window expired without finding the line.
    GiveUp,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct DampingParams {
    pub kp: f64,
    pub kd: f64,
    pub slowdown: f64,
    pub min_speed_ratio: f64,
}

impl Default for DampingParams {
    fn default() -> Self {
        Self {
            kp: 1.0,
            kd: 0.8,
            slowdown: 0.5,
            min_speed_ratio: 0.4,
        }
    }
}

impl DampingParams {
    /// Gains must be finite and non-negative; the speed floor is a ratio.
    pub fn check(&self) -> Result<(), &'static str> {
        let gains = [self.kp, self.kd, self.slowdown];
        if gains.iter().any(|gain| !gain.is_finite() || *gain < 0.0) {
            return Err("kp, kd and slowdown must be finite and >= 0");
        }
        if !(0.0..=1.0).contains(&self.min_speed_ratio) {
            return Err("min_speed_ratio must lie in 0..=1");
        }
        Ok(())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ControlParams {
    pub base_speed: f64,
    pub turn_rate_deg: f64,
    pub max_lost_frames: u32,
    pub weights: SensorWeights,
    #[serde(default)]
    pub damping: DampingParams,
}

impl Default for ControlParams {
    fn default() -> Self {
        Self {
            base_speed: BASE_SPEED,
            turn_rate_deg: TURN_RATE_DEG,
            max_lost_frames: MAX_LOST_FRAMES,
            weights: SensorWeights::default(),
            damping: DampingParams::default(),
        }
    }
}

impl ControlParams {
    #[inline]
    fn max_turn(&self) -> f64 {
        self.turn_rate_deg * 3.0
    }

    #[inline]
    fn clamp_turn(&self, turn: f64) -> f64 {
        turn.clamp(-self.max_turn(), self.max_turn())
    }
}

pub trait Controller: Send + Sync {
    fn id(&self) -> &'static str;
    fn description(&self) -> &'static str;
    fn reset(&mut self);
    fn mode(&self) -> Mode;
    fn decide(&mut self, readings: &SensorReadings) -> Decision;
}

enum SearchStep {
    Sweep(f64),
    Found(f64),
    Expired,
}

/// In-place left/right sweep used by every controller once the line is lost.
#[derive(Clone, Copy, Debug, Default)]
struct LineSearch {
    counter: u32,
}

impl LineSearch {
    fn reset(&mut self) {
        self.counter = 0;
    }

    fn step(&mut self, readings: &SensorReadings, params: &ControlParams) -> SearchStep {
        self.counter += 1;

        let period = params.max_lost_frames as f64 / 2.0;
        let half = params.max_lost_frames as f64 / 4.0;
        let turn = if (self.counter as f64) % period < half {
            params.turn_rate_deg * 1.5
        } else {
            -params.turn_rate_deg * 1.5
        };

        if readings.any() {
            self.counter = 0;
            return SearchStep::Found(turn);
        }
        if self.counter > params.max_lost_frames {
            return SearchStep::Expired;
        }
        SearchStep::Sweep(turn)
    }
}

/// Weighted-sum steering with fixed corrections when the center sensor is off.
pub struct WeightedController {
    params: ControlParams,
    mode: Mode,
    search: LineSearch,
}

impl WeightedController {
    pub fn new(params: ControlParams) -> Self {
        Self {
            params,
            mode: Mode::FollowLine,
            search: LineSearch::default(),
        }
    }

    fn follow(&self, readings: &SensorReadings) -> Action {
        let p = &self.params;
        let on = |id| readings.on(id);

        let turn = if on(SensorId::Center) {
            p.clamp_turn(readings.weighted_error(&p.weights) * p.turn_rate_deg)
        } else if on(SensorId::Left) && !on(SensorId::Right) {
            -p.turn_rate_deg * 1.5
        } else if on(SensorId::Right) && !on(SensorId::Left) {
            p.turn_rate_deg * 1.5
        } else if on(SensorId::LeftForward) && !on(SensorId::RightForward) {
            -p.turn_rate_deg * 2.0
        } else if on(SensorId::RightForward) && !on(SensorId::LeftForward) {
            p.turn_rate_deg * 2.0
        } else {
            p.clamp_turn(readings.weighted_error(&p.weights) * p.turn_rate_deg)
        };

        Action {
            turn_deg: turn,
            speed: p.base_speed,
        }
    }
}

impl Controller for WeightedController {
    fn id(&self) -> &'static str {
        "weighted"
    }

    fn description(&self) -> &'static str {
        "weighted sensor sum with fixed side/diagonal corrections"
    }

    fn reset(&mut self) {
        self.mode = Mode::FollowLine;
        self.search.reset();
    }

    fn mode(&self) -> Mode {
        self.mode
    }

    fn decide(&mut self, readings: &SensorReadings) -> Decision {
        let id = self.id();
        match self.mode {
            Mode::FollowLine if !readings.any() => {
                lose_line(&mut self.mode, &mut self.search, id)
            }
            Mode::FollowLine => Decision::Drive(self.follow(readings)),
            Mode::LostLineSearch => {
                continue_search(&mut self.mode, &mut self.search, &self.params, readings, id)
            }
        }
    }
}

/// Proportional-derivative steering on the weighted error, slowing down
/// while the error is large.
pub struct DampedController {
    params: ControlParams,
    mode: Mode,
    search: LineSearch,
    prev_error: f64,
}

impl DampedController {
    pub fn new(params: ControlParams) -> Self {
        Self {
            params,
            mode: Mode::FollowLine,
            search: LineSearch::default(),
            prev_error: 0.0,
        }
    }

    fn follow(&mut self, readings: &SensorReadings) -> Action {
        let p = &self.params;
        let d = &p.damping;

        let error = readings.weighted_error(&p.weights);
        let delta = error - self.prev_error;
        self.prev_error = error;

        let turn = p.clamp_turn((d.kp * error + d.kd * delta) * p.turn_rate_deg);

        let max_error = p.weights.max_error();
        let ratio = if max_error > 0.0 {
            1.0 - d.slowdown * error.abs() / max_error
        } else {
            1.0
        };
        let speed = p.base_speed * ratio.max(d.min_speed_ratio).min(1.0);

        Action {
            turn_deg: turn,
            speed,
        }
    }
}

impl Controller for DampedController {
    fn id(&self) -> &'static str {
        "damped"
    }

    fn description(&self) -> &'static str {
        "PD steering on the weighted error with error-proportional slowdown"
    }

    fn reset(&mut self) {
        self.mode = Mode::FollowLine;
        self.search.reset();
        self.prev_error = 0.0;
    }

    fn mode(&self) -> Mode {
        self.mode
    }

    fn decide(&mut self, readings: &SensorReadings) -> Decision {
        let id = self.id();
        match self.mode {
            Mode::FollowLine if !readings.any() => {
                self.prev_error = 0.0;
                lose_line(&mut self.mode, &mut self.search, id)
            }
            Mode::FollowLine => Decision::Drive(self.follow(readings)),
            Mode::LostLineSearch => {
                let decision = continue_search(
                    &mut self.mode,
                    &mut self.search,
                    &self.params,
                    readings,
                    id,
                );
                if self.mode == Mode::FollowLine {
                    self.prev_error = readings.weighted_error(&self.params.weights);
                }
                decision
            }
        }
    }
}

fn lose_line(mode: &mut Mode, search: &mut LineSearch, controller: &str) -> Decision {
    *mode = Mode::LostLineSearch;
    search.reset();
    tracing::info!(controller, "lost line, entering search");
    Decision::Drive(Action::STOP)
}

fn continue_search(
    mode: &mut Mode,
    search: &mut LineSearch,
    params: &ControlParams,
    readings: &SensorReadings,
    controller: &str,
) -> Decision {
    match search.step(readings, params) {
        SearchStep::Sweep(turn) => Decision::Drive(Action {
            turn_deg: turn,
            speed: 0.0,
        }),
        SearchStep::Found(turn) => {
            *mode = Mode::FollowLine;
            tracing::info!(controller, "found line during search, resuming follow");
            Decision::Drive(Action {
                turn_deg: turn,
                speed: 0.0,
            })
        }
        SearchStep::Expired => {
            tracing::warn!(
                controller,
                max_lost_frames = params.max_lost_frames,
                "line lost for too long, giving up"
            );
            Decision::GiveUp
        }
    }
}

use core::fmt;

use serde::{Deserialize, Serialize};

use crate::color::{is_on_line, Rgb};
use crate::constants::{
    SENSOR_DIAGONAL_ANGLE_DEG, SENSOR_DIAGONAL_SCALE, SENSOR_FORWARD_DISTANCE,
    SENSOR_LATERAL_OFFSET, WEIGHT_CENTER, WEIGHT_LEFT, WEIGHT_LEFT_FORWARD, WEIGHT_RIGHT,
    WEIGHT_RIGHT_FORWARD,
};
use crate::robot::{direction, Pose};
use crate::track::Track;

pub const SENSOR_COUNT: usize = 5;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SensorId {
    LeftForward,
    Left,
    Center,
    Right,
    RightForward,
}

impl SensorId {
    pub const ALL: [SensorId; SENSOR_COUNT] = [
        SensorId::LeftForward,
        SensorId::Left,
        SensorId::Center,
        SensorId::Right,
        SensorId::RightForward,
    ];

    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::LeftForward => "left_forward",
            Self::Left => "left",
            Self::Center => "center",
            Self::Right => "right",
            Self::RightForward => "right_forward",
        }
    }
}

impl fmt::Display for SensorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Steering weight per sensor; negative steers left.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct SensorWeights {
    pub left_forward: f64,
    pub left: f64,
    pub center: f64,
    pub right: f64,
    pub right_forward: f64,
}

impl Default for SensorWeights {
    fn default() -> Self {
        Self {
            left_forward: WEIGHT_LEFT_FORWARD,
            left: WEIGHT_LEFT,
            center: WEIGHT_CENTER,
            right: WEIGHT_RIGHT,
            right_forward: WEIGHT_RIGHT_FORWARD,
        }
    }
}

impl SensorWeights {
    pub fn get(&self, id: SensorId) -> f64 {
        match id {
            SensorId::LeftForward => self.left_forward,
            SensorId::Left => self.left,
            SensorId::Center => self.center,
            SensorId::Right => self.right,
            SensorId::RightForward => self.right_forward,
        }
    }

    /// Largest possible magnitude of a weighted error.
    pub fn max_error(&self) -> f64 {
        let left: f64 = SensorId::ALL
            .iter()
            .map(|id| self.get(*id).min(0.0))
            .sum();
        let right: f64 = SensorId::ALL
            .iter()
            .map(|id| self.get(*id).max(0.0))
            .sum();
        left.abs().max(right)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct SensorLayout {
    pub forward_distance: f64,
    pub lateral_offset: f64,
    pub diagonal_scale: f64,
    /// Off by default: `left_forward` sits on the right-hand diagonal and
    /// `right_forward` on the left, as the reference robot was wired. When
    /// set, each diagonal sits on the side its name says.
    #[serde(default)]
    pub corrected_forward_diagonals: bool,
}

impl Default for SensorLayout {
    fn default() -> Self {
        Self {
            forward_distance: SENSOR_FORWARD_DISTANCE,
            lateral_offset: SENSOR_LATERAL_OFFSET,
            diagonal_scale: SENSOR_DIAGONAL_SCALE,
            corrected_forward_diagonals: false,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SensorPositions {
    points: [(f64, f64); SENSOR_COUNT],
}

impl SensorPositions {
    #[inline]
    pub fn get(&self, id: SensorId) -> (f64, f64) {
        self.points[id.index()]
    }

    pub fn iter(&self) -> impl Iterator<Item = (SensorId, (f64, f64))> + '_ {
        SensorId::ALL.iter().map(move |id| (*id, self.get(*id)))
    }
}

impl SensorLayout {
    pub fn positions(&self, pose: &Pose) -> SensorPositions {
        let heading = pose.heading_deg;

        let (fx, fy) = direction(heading);
        let center = (
            pose.x + fx * self.forward_distance,
            pose.y + fy * self.forward_distance,
        );

        let (lx, ly) = direction(heading - 90.0);
        let left = (
            center.0 + lx * self.lateral_offset,
            center.1 + ly * self.lateral_offset,
        );

        let (rx, ry) = direction(heading + 90.0);
        let right = (
            center.0 + rx * self.lateral_offset,
            center.1 + ry * self.lateral_offset,
        );

        let reach = self.forward_distance * self.diagonal_scale;
        let sign = if self.corrected_forward_diagonals { 1.0 } else { -1.0 };
        let (lfx, lfy) = direction(heading - sign * SENSOR_DIAGONAL_ANGLE_DEG);
        let (rfx, rfy) = direction(heading + sign * SENSOR_DIAGONAL_ANGLE_DEG);
        let left_forward = (pose.x + lfx * reach, pose.y + lfy * reach);
        let right_forward = (pose.x + rfx * reach, pose.y + rfy * reach);

        SensorPositions {
            points: [left_forward, left, center, right, right_forward],
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct SensorReadings {
    on_line: [bool; SENSOR_COUNT],
}

impl SensorReadings {
    pub fn from_states(states: [bool; SENSOR_COUNT]) -> Self {
        Self { on_line: states }
    }

    /// Bit `i` is sensor `i` in [`SensorId::ALL`] order; higher bits are ignored.
    pub fn from_bits(bits: u8) -> Self {
        let mut on_line = [false; SENSOR_COUNT];
        for (i, state) in on_line.iter_mut().enumerate() {
            *state = bits & (1 << i) != 0;
        }
        Self { on_line }
    }

    pub fn bits(&self) -> u8 {
        self.on_line
            .iter()
            .enumerate()
            .fold(0u8, |acc, (i, on)| if *on { acc | (1 << i) } else { acc })
    }

    #[inline]
    pub fn on(&self, id: SensorId) -> bool {
        self.on_line[id.index()]
    }

    pub fn any(&self) -> bool {
        self.on_line.iter().any(|on| *on)
    }

    pub fn weighted_error(&self, weights: &SensorWeights) -> f64 {
        SensorId::ALL
            .iter()
            .filter(|id| self.on(**id))
            .map(|id| weights.get(*id))
            .sum()
    }
}

impl fmt::Display for SensorReadings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, id) in SensorId::ALL.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{id}={}", if self.on(*id) { 'T' } else { 'F' })?;
        }
        Ok(())
    }
}

pub fn sense(
    track: &Track,
    positions: &SensorPositions,
    line_color: Rgb,
    tolerance: u8,
) -> SensorReadings {
    let mut on_line = [false; SENSOR_COUNT];
    for (id, (x, y)) in positions.iter() {
        on_line[id.index()] = is_on_line(track.sample(x, y), line_color, tolerance);
    }
    SensorReadings { on_line }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::{BLACK, WHITE};
    use crate::track::TrackShape;

    fn assert_close(actual: (f64, f64), expected: (f64, f64)) {
        assert!(
            (actual.0 - expected.0).abs() < 1e-9 && (actual.1 - expected.1).abs() < 1e-9,
            "expected {expected:?}, got {actual:?}"
        );
    }

    #[test]
    fn positions_facing_east() {
        let layout = SensorLayout::default();
        let positions = layout.positions(&Pose::new(100.0, 100.0, 0.0));
        let diag = 30.0 * std::f64::consts::FRAC_1_SQRT_2;

        assert_close(positions.get(SensorId::Center), (120.0, 100.0));
        assert_close(positions.get(SensorId::Left), (120.0, 85.0));
        assert_close(positions.get(SensorId::Right), (120.0, 115.0));
        // Wired crosswise: left_forward looks down-right on screen.
        assert_close(positions.get(SensorId::LeftForward), (100.0 + diag, 100.0 + diag));
        assert_close(positions.get(SensorId::RightForward), (100.0 + diag, 100.0 - diag));
    }

    #[test]
    fn corrected_layout_swaps_diagonals_only() {
        let pose = Pose::new(100.0, 100.0, 30.0);
        let wired = SensorLayout::default().positions(&pose);
        let corrected = SensorLayout {
            corrected_forward_diagonals: true,
            ..SensorLayout::default()
        }
        .positions(&pose);

        assert_close(
            corrected.get(SensorId::LeftForward),
            wired.get(SensorId::RightForward),
        );
        assert_close(
            corrected.get(SensorId::RightForward),
            wired.get(SensorId::LeftForward),
        );
        assert_eq!(corrected.get(SensorId::Center), wired.get(SensorId::Center));
    }

    #[test]
    fn bits_roundtrip_in_sensor_order() {
        let readings = SensorReadings::from_states([true, false, true, false, true]);
        assert_eq!(readings.bits(), 0b10101);
        assert_eq!(SensorReadings::from_bits(0b10101), readings);
        assert_eq!(SensorReadings::from_bits(0xE0), SensorReadings::default());
    }

    #[test]
    fn weighted_error_sums_active_weights() {
        let weights = SensorWeights::default();
        let readings = SensorReadings::from_states([false, false, true, true, true]);
        assert_eq!(readings.weighted_error(&weights), 5.0);
        assert_eq!(weights.max_error(), 5.0);
    }

    #[test]
    fn canonical_start_sees_only_center() {
        let track = Track::build(TrackShape::default(), 800, 600, BLACK, WHITE);
        let positions = SensorLayout::default().positions(&Pose::new(112.5, 112.5, 0.0));
        let readings = sense(&track, &positions, BLACK, 80);
        assert_eq!(readings, SensorReadings::from_states([false, false, true, false, false]));
    }

    #[test]
    fn display_lists_every_sensor() {
        let readings = SensorReadings::from_bits(0b00100);
        assert_eq!(
            readings.to_string(),
            "left_forward=F left=F center=T right=F right_forward=F"
        );
    }
}

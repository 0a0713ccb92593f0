use serde::{Deserialize, Serialize};

use crate::control::Action;

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Pose {
    pub x: f64,
    pub y: f64,
    /// Degrees in `[0, 360)`. 0 faces +x; positive turns are clockwise on screen.
    pub heading_deg: f64,
}

impl Pose {
    pub fn new(x: f64, y: f64, heading_deg: f64) -> Self {
        Self {
            x,
            y,
            heading_deg: normalize_deg(heading_deg),
        }
    }

    /// Turn first, then move along the new heading, then clamp to the world.
    pub fn advance(&mut self, action: Action, width: u32, height: u32) {
        self.heading_deg = normalize_deg(self.heading_deg + action.turn_deg);

        let rad = self.heading_deg.to_radians();
        self.x += rad.cos() * action.speed;
        self.y += rad.sin() * action.speed;

        self.x = self.x.clamp(0.0, (width.max(1) - 1) as f64);
        self.y = self.y.clamp(0.0, (height.max(1) - 1) as f64);
    }

    pub fn same_bits(&self, other: &Pose) -> bool {
        self.x.to_bits() == other.x.to_bits()
            && self.y.to_bits() == other.y.to_bits()
            && self.heading_deg.to_bits() == other.heading_deg.to_bits()
    }
}

#[inline]
pub fn normalize_deg(deg: f64) -> f64 {
    let wrapped = deg.rem_euclid(360.0);
    // rem_euclid can round up to exactly 360 for tiny negative inputs.
    if wrapped >= 360.0 {
        0.0
    } else {
        wrapped
    }
}

#[inline]
pub fn direction(deg: f64) -> (f64, f64) {
    let rad = deg.to_radians();
    (rad.cos(), rad.sin())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn heading_wraps_into_range() {
        assert_eq!(normalize_deg(365.0), 5.0);
        assert_eq!(normalize_deg(-6.0), 354.0);
        assert_eq!(normalize_deg(360.0), 0.0);
        assert!(normalize_deg(-1e-18) < 360.0);
    }

    #[test]
    fn advance_moves_along_heading() {
        let mut pose = Pose::new(10.0, 10.0, 0.0);
        pose.advance(
            Action {
                turn_deg: 0.0,
                speed: 2.0,
            },
            800,
            600,
        );
        assert_eq!(pose.x, 12.0);
        assert_eq!(pose.y, 10.0);
    }

    #[test]
    fn advance_turns_before_moving() {
        let mut pose = Pose::new(10.0, 10.0, 0.0);
        pose.advance(
            Action {
                turn_deg: 90.0,
                speed: 2.0,
            },
            800,
            600,
        );
        assert_eq!(pose.heading_deg, 90.0);
        assert!((pose.x - 10.0).abs() < 1e-9);
        assert!((pose.y - 12.0).abs() < 1e-9);
    }

    #[test]
    fn advance_clamps_to_world() {
        let step = Action {
            turn_deg: 0.0,
            speed: 5.0,
        };

        let mut pose = Pose::new(1.0, 300.0, 180.0);
        pose.advance(step, 800, 600);
        assert_eq!(pose.x, 0.0);

        let mut pose = Pose::new(400.0, 598.0, 90.0);
        pose.advance(step, 800, 600);
        assert_eq!(pose.y, 599.0);
    }
}

use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }
}

pub const WHITE: Rgb = Rgb::new(255, 255, 255);
pub const BLACK: Rgb = Rgb::new(0, 0, 0);
pub const ROBOT_COLOR: Rgb = Rgb::new(220, 20, 60);
pub const SENSOR_ACTIVE: Rgb = Rgb::new(0, 255, 0);
pub const SENSOR_PASSIVE: Rgb = Rgb::new(255, 0, 0);

/// Every channel must be strictly within `tolerance` of the line color.
#[inline]
pub fn is_on_line(color: Rgb, line_color: Rgb, tolerance: u8) -> bool {
    color.r.abs_diff(line_color.r) < tolerance
        && color.g.abs_diff(line_color.g) < tolerance
        && color.b.abs_diff(line_color.b) < tolerance
}

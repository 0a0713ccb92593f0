use serde::{Deserialize, Serialize};

use crate::color::Rgb;
use crate::constants::{
    TRACK_OUTER_HEIGHT, TRACK_OUTER_WIDTH, TRACK_OUTER_X, TRACK_OUTER_Y, TRACK_THICKNESS,
};
use crate::raster::Canvas;

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TrackShape {
    /// Outer rectangle filled with the line, inner rectangle inset by `thickness`.
    RectLoop {
        x: i32,
        y: i32,
        width: i32,
        height: i32,
        thickness: i32,
    },
    /// Elliptical band between the outer radii and the radii shrunk by `thickness`.
    RingLoop {
        cx: f64,
        cy: f64,
        rx: f64,
        ry: f64,
        thickness: f64,
    },
}

impl Default for TrackShape {
    fn default() -> Self {
        Self::RectLoop {
            x: TRACK_OUTER_X,
            y: TRACK_OUTER_Y,
            width: TRACK_OUTER_WIDTH,
            height: TRACK_OUTER_HEIGHT,
            thickness: TRACK_THICKNESS,
        }
    }
}

impl TrackShape {
    pub fn center(&self) -> (f64, f64) {
        match *self {
            Self::RectLoop {
                x,
                y,
                width,
                height,
                ..
            } => (x as f64 + width as f64 / 2.0, y as f64 + height as f64 / 2.0),
            Self::RingLoop { cx, cy, .. } => (cx, cy),
        }
    }

    /// Middle of the band at the loop's top-left, facing along the top segment.
    pub fn default_start(&self) -> (f64, f64, f64) {
        match *self {
            Self::RectLoop {
                x, y, thickness, ..
            } => {
                let half = thickness as f64 / 2.0;
                (x as f64 + half, y as f64 + half, 0.0)
            }
            Self::RingLoop {
                cx, cy, ry, thickness, ..
            } => (cx, cy - ry + thickness / 2.0, 0.0),
        }
    }

    pub fn is_valid(&self) -> Result<(), &'static str> {
        match *self {
            Self::RectLoop {
                width,
                height,
                thickness,
                ..
            } => {
                if width <= 0 || height <= 0 {
                    return Err("rect loop must have positive size");
                }
                if thickness <= 0 || 2 * thickness as i64 >= width.min(height) as i64 {
                    return Err("rect loop thickness must be positive and leave an interior");
                }
            }
            Self::RingLoop {
                rx, ry, thickness, ..
            } => {
                if !(rx > 0.0 && ry > 0.0) {
                    return Err("ring loop radii must be positive");
                }
                if !(thickness > 0.0 && thickness < rx.min(ry)) {
                    return Err("ring loop thickness must be positive and smaller than the radii");
                }
            }
        }
        Ok(())
    }
}

/// Static surface the sensors read from.
#[derive(Clone, Debug)]
pub struct Track {
    background: Rgb,
    canvas: Canvas,
}

impl Track {
    pub fn build(shape: TrackShape, width: u32, height: u32, line: Rgb, background: Rgb) -> Self {
        let mut canvas = Canvas::new(width, height, background);
        match shape {
            TrackShape::RectLoop {
                x,
                y,
                width,
                height,
                thickness,
            } => {
                canvas.fill_rect(x, y, width, height, line);
                let double = thickness.saturating_mul(2);
                canvas.fill_rect(
                    x.saturating_add(thickness),
                    y.saturating_add(thickness),
                    width.saturating_sub(double),
                    height.saturating_sub(double),
                    background,
                );
            }
            TrackShape::RingLoop {
                cx,
                cy,
                rx,
                ry,
                thickness,
            } => {
                let (irx, iry) = (rx - thickness, ry - thickness);
                for py in 0..height {
                    for px in 0..width {
                        let fx = px as f64 + 0.5 - cx;
                        let fy = py as f64 + 0.5 - cy;
                        let outer = (fx / rx).powi(2) + (fy / ry).powi(2);
                        let inner = (fx / irx).powi(2) + (fy / iry).powi(2);
                        if outer <= 1.0 && inner > 1.0 {
                            canvas.set(px as i64, py as i64, line);
                        }
                    }
                }
            }
        }

        Self { background, canvas }
    }

    pub fn canvas(&self) -> &Canvas {
        &self.canvas
    }

    /// Coordinates truncate toward zero; anything off the world reads as background.
    #[inline]
    pub fn sample(&self, x: f64, y: f64) -> Rgb {
        if !x.is_finite() || !y.is_finite() {
            return self.background;
        }
        self.canvas
            .get(x.trunc() as i64, y.trunc() as i64)
            .unwrap_or(self.background)
    }
}

//! Software frame buffer the simulation draws into and samples from.

use crate::color::Rgb;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Canvas {
    width: u32,
    height: u32,
    pixels: Vec<Rgb>,
}

impl Canvas {
    pub fn new(width: u32, height: u32, background: Rgb) -> Self {
        Self {
            width,
            height,
            pixels: vec![background; width as usize * height as usize],
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn pixels(&self) -> &[Rgb] {
        &self.pixels
    }

    #[inline]
    fn index(&self, x: i64, y: i64) -> Option<usize> {
        if x < 0 || y < 0 || x >= self.width as i64 || y >= self.height as i64 {
            return None;
        }
        Some(y as usize * self.width as usize + x as usize)
    }

    #[inline]
    pub fn get(&self, x: i64, y: i64) -> Option<Rgb> {
        self.index(x, y).map(|idx| self.pixels[idx])
    }

    #[inline]
    pub fn set(&mut self, x: i64, y: i64, color: Rgb) {
        if let Some(idx) = self.index(x, y) {
            self.pixels[idx] = color;
        }
    }

    pub fn fill_rect(&mut self, x: i32, y: i32, width: i32, height: i32, color: Rgb) {
        if width <= 0 || height <= 0 {
            return;
        }
        let x0 = (x as i64).max(0);
        let y0 = (y as i64).max(0);
        let x1 = (x as i64 + width as i64).min(self.width as i64);
        let y1 = (y as i64 + height as i64).min(self.height as i64);
        for py in y0..y1 {
            for px in x0..x1 {
                self.set(px, py, color);
            }
        }
    }

    pub fn fill_circle(&mut self, cx: i32, cy: i32, radius: i32, color: Rgb) {
        if radius < 0 {
            return;
        }
        let r_sq = radius as i64 * radius as i64;
        for dy in -(radius as i64)..=radius as i64 {
            for dx in -(radius as i64)..=radius as i64 {
                if dx * dx + dy * dy <= r_sq {
                    self.set(cx as i64 + dx, cy as i64 + dy, color);
                }
            }
        }
    }

    /// Fills every pixel whose center lies inside `points` (even-odd rule).
    pub fn fill_polygon(&mut self, points: &[(f64, f64)], color: Rgb) {
        if points.len() < 3 {
            return;
        }
        let (mut min_x, mut min_y) = (f64::INFINITY, f64::INFINITY);
        let (mut max_x, mut max_y) = (f64::NEG_INFINITY, f64::NEG_INFINITY);
        for &(x, y) in points {
            min_x = min_x.min(x);
            min_y = min_y.min(y);
            max_x = max_x.max(x);
            max_y = max_y.max(y);
        }

        let x0 = (min_x.floor() as i64).max(0);
        let y0 = (min_y.floor() as i64).max(0);
        let x1 = (max_x.ceil() as i64).min(self.width as i64 - 1);
        let y1 = (max_y.ceil() as i64).min(self.height as i64 - 1);

        for py in y0..=y1 {
            for px in x0..=x1 {
                if point_in_polygon(px as f64 + 0.5, py as f64 + 0.5, points) {
                    self.set(px, py, color);
                }
            }
        }
    }

    /// Binary PPM (`P6`).
    pub fn to_ppm(&self) -> Vec<u8> {
        let header = format!("P6\n{} {}\n255\n", self.width, self.height);
        let mut out = Vec::with_capacity(header.len() + self.pixels.len() * 3);
        out.extend_from_slice(header.as_bytes());
        for px in &self.pixels {
            out.extend_from_slice(&[px.r, px.g, px.b]);
        }
        out
    }
}

fn point_in_polygon(x: f64, y: f64, points: &[(f64, f64)]) -> bool {
    let mut inside = false;
    let mut j = points.len() - 1;
    for i in 0..points.len() {
        let (xi, yi) = points[i];
        let (xj, yj) = points[j];
        if (yi > y) != (yj > y) {
            let cross_x = xj + (y - yj) * (xi - xj) / (yi - yj);
            if x < cross_x {
                inside = !inside;
            }
        }
        j = i;
    }
    inside
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::{BLACK, WHITE};

    #[test]
    fn out_of_range_reads_are_none_and_writes_ignored() {
        let mut canvas = Canvas::new(4, 3, WHITE);
        canvas.set(-1, 0, BLACK);
        canvas.set(4, 0, BLACK);
        assert_eq!(canvas.get(4, 0), None);
        assert_eq!(canvas.get(0, -1), None);
        assert!(canvas.pixels().iter().all(|px| *px == WHITE));
    }

    #[test]
    fn rect_is_clipped() {
        let mut canvas = Canvas::new(10, 10, WHITE);
        canvas.fill_rect(-5, 8, 8, 10, BLACK);
        assert_eq!(canvas.get(0, 8), Some(BLACK));
        assert_eq!(canvas.get(2, 9), Some(BLACK));
        assert_eq!(canvas.get(3, 9), Some(WHITE));
        assert_eq!(canvas.get(0, 7), Some(WHITE));
    }

    #[test]
    fn circle_covers_radius_along_axes() {
        let mut canvas = Canvas::new(20, 20, WHITE);
        canvas.fill_circle(10, 10, 3, BLACK);
        assert_eq!(canvas.get(13, 10), Some(BLACK));
        assert_eq!(canvas.get(14, 10), Some(WHITE));
        assert_eq!(canvas.get(12, 12), Some(BLACK));
        assert_eq!(canvas.get(13, 13), Some(WHITE));
    }

    #[test]
    fn polygon_fills_pixel_centers_inside() {
        let mut canvas = Canvas::new(10, 10, WHITE);
        canvas.fill_polygon(&[(0.0, 0.0), (10.0, 0.0), (0.0, 10.0)], BLACK);
        assert_eq!(canvas.get(0, 0), Some(BLACK));
        assert_eq!(canvas.get(4, 4), Some(BLACK));
        assert_eq!(canvas.get(5, 5), Some(WHITE));
        assert_eq!(canvas.get(9, 9), Some(WHITE));
    }

    #[test]
    fn ppm_has_header_and_rgb_payload() {
        let canvas = Canvas::new(2, 1, BLACK);
        let ppm = canvas.to_ppm();
        assert!(ppm.starts_with(b"P6\n2 1\n255\n"));
        assert_eq!(ppm.len(), b"P6\n2 1\n255\n".len() + 6);
    }
}

use crate::config::SimConfig;
use crate::constants::ROBOT_REAR_CORNER_DEG;
use crate::raster::Canvas;
use crate::robot::{direction, Pose};
use crate::sensors::{SensorPositions, SensorReadings};
use crate::track::Track;

/// Triangle with its tip on the heading and rear corners at +-140 degrees.
pub fn robot_outline(pose: &Pose, radius: f64) -> [(f64, f64); 3] {
    let corner = |offset: f64| {
        let (dx, dy) = direction(pose.heading_deg + offset);
        (pose.x + dx * radius, pose.y + dy * radius)
    };
    [
        corner(0.0),
        corner(ROBOT_REAR_CORNER_DEG),
        corner(-ROBOT_REAR_CORNER_DEG),
    ]
}

/// Track, then robot, then sensor markers on top.
pub fn render_frame(
    config: &SimConfig,
    track: &Track,
    pose: &Pose,
    positions: &SensorPositions,
    readings: &SensorReadings,
) -> Canvas {
    let mut canvas = track.canvas().clone();

    canvas.fill_polygon(&robot_outline(pose, config.robot_radius), config.palette.robot);

    for (id, (x, y)) in positions.iter() {
        let color = if readings.on(id) {
            config.palette.sensor_active
        } else {
            config.palette.sensor_passive
        };
        canvas.fill_circle(x as i32, y as i32, config.sensor_draw_radius, color);
    }

    canvas
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::{BLACK, ROBOT_COLOR, SENSOR_ACTIVE, SENSOR_PASSIVE, WHITE};
    use crate::sim::LiveSim;

    #[test]
    fn canonical_frame_layers() {
        let sim = LiveSim::new(SimConfig::default(), 0).expect("valid");
        let readings = sim.sense();
        let frame = sim.render(&readings);

        assert_eq!(frame.width(), 800);
        assert_eq!(frame.height(), 600);
        assert_eq!(frame.get(112, 112), Some(ROBOT_COLOR));
        assert_eq!(frame.get(132, 112), Some(SENSOR_ACTIVE));
        assert_eq!(frame.get(132, 127), Some(SENSOR_PASSIVE));
        assert_eq!(frame.get(400, 112), Some(BLACK));
        assert_eq!(frame.get(400, 300), Some(WHITE));
    }

    #[test]
    fn rendering_does_not_touch_the_track() {
        let sim = LiveSim::new(SimConfig::default(), 0).expect("valid");
        let _ = sim.render(&sim.sense());
        assert_eq!(sim.track().sample(112.0, 112.0), BLACK);
    }

    #[test]
    fn outline_tip_points_along_heading() {
        let outline = robot_outline(&Pose::new(50.0, 50.0, 90.0), 15.0);
        assert!((outline[0].0 - 50.0).abs() < 1e-9);
        assert!((outline[0].1 - 65.0).abs() < 1e-9);
    }
}

//! Live window for one run.
//!
//! The track is uploaded once as a sprite image. The simulation steps on
//! bevy's fixed clock at the configured frame rate, and the robot and its
//! sensors are redrawn with gizmos every rendered frame.

#![allow(clippy::needless_pass_by_value)] // Bevy system parameters
#![allow(clippy::cast_possible_truncation)] // f64 -> f32 for drawing

use anyhow::{anyhow, Context, Result};
use bevy::asset::RenderAssetUsages;
use bevy::prelude::*;
use bevy::render::render_resource::{Extent3d, TextureDimension, TextureFormat};
use linebot_core::color::Rgb;
use linebot_core::control::{Controller, Decision};
use linebot_core::raster::Canvas;
use linebot_core::render::robot_outline;
use linebot_core::sensors::SensorReadings;
use linebot_core::sim::LiveSim;
use linebot_core::SimConfig;

use crate::controllers::create_controller;
use crate::runner::RunOutcome;

/// Everything one windowed run needs between frames.
#[derive(Resource)]
pub struct ViewerState {
    sim: LiveSim,
    controller: Box<dyn Controller>,
    readings: SensorReadings,
    max_frames: u32,
    outcome: Option<RunOutcome>,
}

impl ViewerState {
    pub fn new(
        controller_id: &str,
        config: &SimConfig,
        seed: u32,
        max_frames: u32,
    ) -> Result<Self> {
        if max_frames == 0 {
            return Err(anyhow!("max_frames must be > 0"));
        }
        let controller = create_controller(controller_id, config.control)
            .ok_or_else(|| anyhow!("unknown controller '{controller_id}'"))?;
        let sim = LiveSim::new(config.clone(), seed).context("invalid simulation config")?;
        let readings = sim.sense();
        Ok(Self {
            sim,
            controller,
            readings,
            max_frames,
            outcome: None,
        })
    }

    pub fn outcome(&self) -> Option<RunOutcome> {
        self.outcome
    }

    pub fn sim(&self) -> &LiveSim {
        &self.sim
    }

    /// One simulation frame; a finished run stays frozen.
    pub fn advance(&mut self) {
        if self.outcome.is_some() {
            return;
        }
        if self.sim.frame_count() >= self.max_frames {
            self.finish(RunOutcome::MaxFrames);
            return;
        }
        match self.controller.decide(&self.readings) {
            Decision::Drive(action) => {
                self.sim.step(action);
                self.readings = self.sim.sense();
            }
            Decision::GiveUp => self.finish(RunOutcome::LineLost),
        }
    }

    fn finish(&mut self, outcome: RunOutcome) {
        tracing::info!(
            controller = self.controller.id(),
            frames = self.sim.frame_count(),
            ?outcome,
            "viewer run finished"
        );
        self.outcome = Some(outcome);
    }
}

/// Steps the simulation at `fps` and draws it.
pub struct ViewerPlugin {
    pub fps: u32,
}

impl Plugin for ViewerPlugin {
    fn build(&self, app: &mut App) {
        app.insert_resource(Time::<Fixed>::from_hz(f64::from(self.fps)))
            .add_systems(Startup, spawn_scene)
            .add_systems(FixedUpdate, step_sim)
            .add_systems(PostUpdate, draw_robot);
    }
}

/// Opens a window and blocks until it is closed.
pub fn run(controller_id: &str, config: &SimConfig, seed: u32, max_frames: u32) -> Result<()> {
    let state = ViewerState::new(controller_id, config, seed, max_frames)?;
    let window = Window {
        title: format!("linebot - {controller_id}"),
        resolution: (config.width, config.height).into(),
        resizable: false,
        ..default()
    };

    let exit = App::new()
        .add_plugins(DefaultPlugins.set(WindowPlugin {
            primary_window: Some(window),
            ..default()
        }))
        .insert_resource(ClearColor(to_color(config.palette.background)))
        .insert_resource(state)
        .add_plugins(ViewerPlugin { fps: config.fps })
        .run();

    match exit {
        AppExit::Success => Ok(()),
        AppExit::Error(code) => Err(anyhow!("viewer exited with code {code}")),
    }
}

fn spawn_scene(
    mut commands: Commands,
    mut images: ResMut<Assets<Image>>,
    state: Res<ViewerState>,
) {
    commands.spawn(Camera2d);
    let track = state.sim.track().canvas();
    let image = Image::new(
        Extent3d {
            width: track.width(),
            height: track.height(),
            depth_or_array_layers: 1,
        },
        TextureDimension::D2,
        canvas_rgba(track),
        TextureFormat::Rgba8UnormSrgb,
        RenderAssetUsages::RENDER_WORLD,
    );
    commands.spawn(Sprite::from_image(images.add(image)));
}

fn step_sim(mut state: ResMut<ViewerState>) {
    state.advance();
}

fn draw_robot(mut gizmos: Gizmos, state: Res<ViewerState>) {
    let config = state.sim.config();
    let (width, height) = (config.width, config.height);

    let outline = robot_outline(&state.sim.pose(), config.robot_radius);
    let mut points: Vec<Vec2> = outline
        .iter()
        .map(|point| to_screen(width, height, *point))
        .collect();
    points.push(points[0]);
    gizmos.linestrip_2d(points, to_color(config.palette.robot));

    for (id, point) in state.sim.sensor_positions().iter() {
        let color = if state.readings.on(id) {
            config.palette.sensor_active
        } else {
            config.palette.sensor_passive
        };
        gizmos.circle_2d(
            Isometry2d::from_translation(to_screen(width, height, point)),
            config.sensor_draw_radius as f32,
            to_color(color),
        );
    }
}

/// World pixels (origin top-left, y down) to camera space (origin center, y up).
fn to_screen(width: u32, height: u32, (x, y): (f64, f64)) -> Vec2 {
    Vec2::new(
        (x - f64::from(width) / 2.0) as f32,
        (f64::from(height) / 2.0 - y) as f32,
    )
}

fn to_color(rgb: Rgb) -> Color {
    Color::srgb_u8(rgb.r, rgb.g, rgb.b)
}

fn canvas_rgba(canvas: &Canvas) -> Vec<u8> {
    canvas
        .pixels()
        .iter()
        .flat_map(|px| [px.r, px.g, px.b, u8::MAX])
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use linebot_core::color::{BLACK, WHITE};
    use linebot_core::robot::Pose;

    #[test]
    fn screen_space_is_centered_and_flipped() {
        assert_eq!(to_screen(800, 600, (400.0, 300.0)), Vec2::ZERO);
        assert_eq!(to_screen(800, 600, (0.0, 0.0)), Vec2::new(-400.0, 300.0));
        assert_eq!(to_screen(800, 600, (800.0, 600.0)), Vec2::new(400.0, -300.0));
    }

    #[test]
    fn track_upload_is_rgba() {
        let mut canvas = Canvas::new(2, 1, WHITE);
        canvas.set(1, 0, BLACK);
        assert_eq!(canvas_rgba(&canvas), vec![255, 255, 255, 255, 0, 0, 0, 255]);
    }

    #[test]
    fn advance_drives_then_stops_at_the_frame_budget() {
        let mut state =
            ViewerState::new("weighted", &SimConfig::default(), 0, 100).expect("viewer state");
        for _ in 0..100 {
            state.advance();
        }
        assert_eq!(state.outcome(), None);
        assert_eq!(state.sim().pose(), Pose::new(312.5, 112.5, 0.0));

        state.advance();
        assert_eq!(state.outcome(), Some(RunOutcome::MaxFrames));
        state.advance();
        assert_eq!(state.sim().frame_count(), 100);
    }

    #[test]
    fn advance_records_a_lost_line() {
        let config = SimConfig {
            start: Some(Pose::new(400.0, 300.0, 0.0)),
            ..SimConfig::default()
        };
        let mut state = ViewerState::new("damped", &config, 0, 1_000).expect("viewer state");
        while state.outcome().is_none() {
            state.advance();
        }
        assert_eq!(state.outcome(), Some(RunOutcome::LineLost));
        assert_eq!(state.sim().frame_count(), 121);
    }

    #[test]
    fn rejects_unknown_controller() {
        assert!(ViewerState::new("nope", &SimConfig::default(), 0, 10).is_err());
    }
}

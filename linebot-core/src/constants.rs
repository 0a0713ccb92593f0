pub const WORLD_WIDTH: u32 = 800;
pub const WORLD_HEIGHT: u32 = 600;
pub const FPS: u32 = 60;

// Track: 25px thick black band around a 600x400 rectangle.
pub const TRACK_OUTER_X: i32 = 100;
pub const TRACK_OUTER_Y: i32 = 100;
pub const TRACK_OUTER_WIDTH: i32 = 600;
pub const TRACK_OUTER_HEIGHT: i32 = 400;
pub const TRACK_THICKNESS: i32 = 25;

pub const ROBOT_RADIUS: f64 = 15.0;
pub const ROBOT_REAR_CORNER_DEG: f64 = 140.0;
pub const SENSOR_DRAW_RADIUS: i32 = 6;

pub const SENSOR_FORWARD_DISTANCE: f64 = 20.0;
pub const SENSOR_LATERAL_OFFSET: f64 = 15.0;
pub const SENSOR_DIAGONAL_SCALE: f64 = 1.5;
pub const SENSOR_DIAGONAL_ANGLE_DEG: f64 = 45.0;

pub const BASE_SPEED: f64 = 2.0;
pub const TURN_RATE_DEG: f64 = 2.0;
pub const MAX_LOST_FRAMES: u32 = 120;
pub const LINE_TOLERANCE: u8 = 80;

pub const WEIGHT_LEFT_FORWARD: f64 = -3.0;
pub const WEIGHT_LEFT: f64 = -2.0;
pub const WEIGHT_CENTER: f64 = 0.0;
pub const WEIGHT_RIGHT: f64 = 2.0;
pub const WEIGHT_RIGHT_FORWARD: f64 = 3.0;

// Start jitter applied for non-zero seeds.
pub const START_JITTER_PX: u32 = 4;
pub const START_JITTER_DEG: u32 = 10;

pub const MAX_FRAMES_DEFAULT: u32 = 3_600;

pub const TRACE_MAGIC: u32 = 0x5452_464C; // "LFRT"
pub const TRACE_VERSION: u8 = 1;
pub const TRACE_HEADER_SIZE: usize = 24;
pub const TRACE_FRAME_SIZE: usize = 17;
pub const TRACE_FOOTER_SIZE: usize = 28;
pub const TRACE_SENSOR_MASK: u8 = 0x1F;
pub const TRACE_SEARCH_BIT: u8 = 0x20;

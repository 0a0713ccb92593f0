pub mod color;
pub mod config;
pub mod constants;
pub mod control;
pub mod error;
pub mod jitter;
pub mod raster;
pub mod render;
pub mod robot;
pub mod sensors;
pub mod sim;
pub mod trace;
pub mod track;
pub mod verify;

pub use config::SimConfig;
pub use error::{ConfigError, TraceError};
pub use verify::{verify_trace, TraceJournal};

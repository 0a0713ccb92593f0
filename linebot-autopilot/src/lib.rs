pub mod benchmark;
pub mod controllers;
pub mod runner;
pub mod settings;
pub mod util;
#[cfg(feature = "view")]
pub mod viewer;

pub mod alerts;
pub mod audio;
pub mod config;
pub mod error;
pub mod model;
pub mod silence;

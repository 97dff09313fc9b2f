pub mod camera;
pub mod config;
pub mod error;
pub mod pose;
pub mod sequence;
pub mod session;
pub mod tracker;

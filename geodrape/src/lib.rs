pub mod error;
pub mod config;
pub mod geo;
pub mod viewport;
pub mod ring;
pub mod math;
pub mod overlay;
pub mod controller;
pub mod session;

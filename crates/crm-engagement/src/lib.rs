pub mod config;
pub mod engagement;
pub mod error;
pub mod report;
pub mod rollups;
pub mod service;
pub mod telemetry;

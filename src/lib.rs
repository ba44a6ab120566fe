//! Dragy timing extraction service
//!
//! This library provides the asynchronous job pipeline that turns uploaded
//! acceleration-test videos into a normalized performance measurement: an
//! external analysis engine reads the telemetry overlay, the result is
//! normalized to one speed range, and the detected vehicle is checked
//! against what the uploader declared.

pub mod app_state;
pub mod config;
pub mod error;
pub mod models;
pub mod routes;
pub mod services;

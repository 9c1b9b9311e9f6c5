//! Bitrate Scaler - derived kbit/s and Mbit/s sensors for bit/s sources
//!
//! This library crate exposes the adapter layer around
//! [`bitrate_core::convert`] for the binary and for integration testing.

pub mod config;
pub mod flow;
pub mod platform;
pub mod sensor;
pub mod state;

//! Nightbloom engine crate.
//!
//! This crate owns the platform + GPU runtime pieces the particle fields run on:
//! window and event loop, wgpu device and surface, input translation, frame
//! timing and logger setup.

pub mod device;
pub mod window;
pub mod input;
pub mod time;
pub mod core;

pub mod logging;
pub mod coords;
pub mod render;

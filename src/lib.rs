//! gameboy-camera library crate.
//!
//! A 4-color camera: frames are center-cropped to 128x112, quantized to a
//! fixed palette and saved as photos, which can be composed into vertical
//! photostrips. This module exposes the components for the `gbcam` binary
//! and for integration testing.

pub mod archive;
pub mod camera;
pub mod cli;
pub mod config;
pub mod palette;
pub mod store;
pub mod strip;

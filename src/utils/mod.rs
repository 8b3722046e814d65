//! Utility functions and helpers

pub mod geometry;

pub use geometry::{Bounds, Vec3};

//! Falling-sand world engine.
//!
//! This module implements the 2D grid world where particles fall and settle,
//! and the update scheduler that decides which particles re-simulate on
//! which tick.

pub mod grid;
pub mod particle;
pub mod world;

pub use grid::{Cell, Grid};
pub use particle::Particle;
pub use world::{RunSummary, StepStats, World};

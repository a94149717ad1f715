//! Error types for the simulation.

use crate::types::ParticleId;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("position ({x}, {y}) is outside the {width}x{height} world")]
    OutOfBounds {
        x: i32,
        y: i32,
        width: i32,
        height: i32,
    },

    #[error("cell ({x}, {y}) is already occupied")]
    CellOccupied { x: i32, y: i32 },

    #[error("particle {0} is not live")]
    DoubleRemoval(ParticleId),

    #[error("invariant violation: {0}")]
    InvariantViolation(String),

    #[error("validation error: {0}")]
    Validation(String),
}

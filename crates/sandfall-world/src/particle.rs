//! Particle state.

use sandfall_core::{Color, ParticleId, Position};
use serde::{Deserialize, Serialize};

/// A single grain in the world.
///
/// Pure data. Every spatial mutation goes through the owning
/// [`World`](crate::World), which keeps the grid and this recorded position
/// in sync; collaborators address a particle by its handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Particle {
    pub id: ParticleId,
    pub position: Position,
    pub color: Color,
}

impl Particle {
    pub fn new(position: Position, color: Color) -> Self {
        Self {
            id: ParticleId::new(),
            position,
            color,
        }
    }

    pub(crate) fn move_to(&mut self, new_position: Position) {
        self.position = new_position;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_particle_creation() {
        let particle = Particle::new(Position::new(5, 5), Color::new(194, 178, 128));
        assert_eq!(particle.position, Position::new(5, 5));
        assert_eq!(particle.color, Color::new(194, 178, 128));
    }

    #[test]
    fn test_move_to() {
        let mut particle = Particle::new(Position::new(5, 5), Color::new(0, 0, 0));
        particle.move_to(Position::new(4, 4));
        assert_eq!(particle.position, Position::new(4, 4));
    }
}

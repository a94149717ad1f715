//! World state and the per-tick update scheduler.

use crate::grid::{Cell, Grid};
use crate::particle::Particle;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use sandfall_core::{Color, Error, ParticleId, Position, Result, WorldConfig};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet, VecDeque};
use tracing::{debug, info, trace};

/// Counts for one completed tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepStats {
    /// Particles whose update rule ran this tick.
    pub simulated: usize,
    /// Particles that changed cell this tick.
    pub moved: usize,
}

/// Aggregate counts for a [`World::run`] call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    pub ticks: u64,
    pub moves: u64,
}

/// The simulation world: particle registry, occupancy grid, and the update
/// scheduler.
///
/// Each tick, every particle that might be affected by gravity gets exactly
/// one simulation attempt; a particle re-requested after it already
/// simulated is deferred to the following tick rather than re-run. All
/// access is `&self`/`&mut self`; a multi-threaded embedder must serialize
/// its calls itself.
#[derive(Debug)]
pub struct World {
    config: WorldConfig,
    grid: Grid,
    particles: HashMap<ParticleId, Particle>,
    /// Already simulated this tick.
    updated: HashSet<ParticleId>,
    /// Enqueued for this tick but not yet simulated; membership set of `queue`.
    updating: HashSet<ParticleId>,
    /// Deferred to the following tick; membership set of `next_queue`.
    next_update: HashSet<ParticleId>,
    /// This tick's worklist, drained front-to-back.
    queue: VecDeque<ParticleId>,
    /// The following tick's worklist, in deferral order.
    next_queue: VecDeque<ParticleId>,
    rng: ChaCha8Rng,
    tick: u64,
    last_step: StepStats,
}

impl World {
    /// Create an empty world from the given configuration.
    pub fn new(config: WorldConfig) -> Result<Self> {
        if config.width <= 0 || config.height <= 0 {
            return Err(Error::Validation(format!(
                "world dimensions must be positive, got {}x{}",
                config.width, config.height
            )));
        }

        let rng = ChaCha8Rng::seed_from_u64(config.seed);
        Ok(Self {
            grid: Grid::new(config.width, config.height),
            particles: HashMap::new(),
            updated: HashSet::new(),
            updating: HashSet::new(),
            next_update: HashSet::new(),
            queue: VecDeque::new(),
            next_queue: VecDeque::new(),
            rng,
            tick: 0,
            last_step: StepStats::default(),
            config,
        })
    }

    pub fn config(&self) -> &WorldConfig {
        &self.config
    }

    /// Read-only view of the occupancy grid.
    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    /// Completed ticks since creation.
    pub fn tick(&self) -> u64 {
        self.tick
    }

    /// Number of live particles.
    pub fn len(&self) -> usize {
        self.particles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.particles.is_empty()
    }

    /// Counts from the most recently completed tick.
    pub fn last_step(&self) -> StepStats {
        self.last_step
    }

    /// True when nothing is scheduled: stepping a settled world moves
    /// nothing until a collaborator spawns into it again.
    pub fn is_settled(&self) -> bool {
        self.queue.is_empty() && self.next_queue.is_empty()
    }

    /// Iterate over all live particles, in no particular order.
    pub fn particles(&self) -> impl Iterator<Item = &Particle> {
        self.particles.values()
    }

    /// Look up a live particle by handle.
    pub fn particle(&self, id: ParticleId) -> Option<&Particle> {
        self.particles.get(&id)
    }

    /// Spawn a particle at `(x, y)`.
    ///
    /// Placement is strict: the coordinate must lie inside
    /// `[0, width) x [0, height)` with no wrapping applied, and the cell
    /// must be empty. The new particle first simulates on the next tick.
    pub fn spawn_particle(&mut self, x: i32, y: i32, color: Color) -> Result<ParticleId> {
        if x < 0 || x >= self.config.width || y < 0 || y >= self.config.height {
            return Err(Error::OutOfBounds {
                x,
                y,
                width: self.config.width,
                height: self.config.height,
            });
        }
        if let Cell::Occupied(_) = self.grid.get(x, y) {
            return Err(Error::CellOccupied { x, y });
        }

        let particle = Particle::new(Position::new(x, y), color);
        let id = particle.id;
        self.grid.set(x, y, Some(id));
        self.particles.insert(id, particle);
        self.defer_update(id);

        debug!(particle_id = %id, x, y, "spawned particle");
        Ok(id)
    }

    /// Destroy a live particle and clear its cell.
    ///
    /// Destroying a handle that is not live (already destroyed, or never
    /// spawned here) fails with [`Error::DoubleRemoval`] and changes
    /// nothing.
    pub fn destroy_particle(&mut self, id: ParticleId) -> Result<()> {
        let particle = self.particles.remove(&id).ok_or(Error::DoubleRemoval(id))?;
        self.grid.set(particle.position.x, particle.position.y, None);
        self.updated.remove(&id);
        self.updating.remove(&id);
        self.next_update.remove(&id);
        // Stale worklist entries are skipped when popped.

        debug!(
            particle_id = %id,
            x = particle.position.x,
            y = particle.position.y,
            "destroyed particle"
        );
        Ok(())
    }

    /// Advance the simulation by one tick.
    ///
    /// Seeds the queue from the particles deferred last tick, then drains it
    /// front-to-back, simulating each due particle exactly once. A particle
    /// re-requested after it already simulated is deferred to the next tick,
    /// and one already pending is never enqueued twice, so the drain is
    /// bounded by the live-particle count.
    pub fn step(&mut self) -> Result<()> {
        debug_assert!(self.queue.is_empty() && self.updating.is_empty());
        self.updated.clear();
        std::mem::swap(&mut self.queue, &mut self.next_queue);
        std::mem::swap(&mut self.updating, &mut self.next_update);

        let mut stats = StepStats::default();
        while let Some(id) = self.queue.pop_front() {
            self.updating.remove(&id);
            if !self.particles.contains_key(&id) {
                continue; // destroyed since it was enqueued
            }
            // Recorded before simulating, so any same-tick re-request
            // (including the particle's own post-move enqueue) defers.
            self.updated.insert(id);
            if self.simulate(id)? {
                stats.moved += 1;
            }
            stats.simulated += 1;
        }

        self.tick += 1;
        self.last_step = stats;
        trace!(
            tick = self.tick,
            simulated = stats.simulated,
            moved = stats.moved,
            "tick complete"
        );
        Ok(())
    }

    /// Run `num_ticks` ticks, returning aggregate counts.
    pub fn run(&mut self, num_ticks: u64) -> Result<RunSummary> {
        info!(num_ticks, particles = self.particles.len(), "starting run");

        let mut summary = RunSummary::default();
        for _ in 0..num_ticks {
            self.step()?;
            summary.ticks += 1;
            summary.moves += self.last_step.moved as u64;

            if self.tick % 1000 == 0 {
                info!(
                    tick = self.tick,
                    particles = self.particles.len(),
                    moved = self.last_step.moved,
                    "run progress"
                );
            }
        }

        info!(
            ticks = summary.ticks,
            moves = summary.moves,
            particles = self.particles.len(),
            "run complete"
        );
        Ok(summary)
    }

    /// Apply the gravity rule to one particle; true if it changed cell.
    ///
    /// Falls straight down when the cell below is free; otherwise slides to
    /// an open diagonal, breaking a two-way tie with a fair coin. The bottom
    /// edge is a hard boundary: a particle resting there stays and is not
    /// re-queued.
    fn simulate(&mut self, id: ParticleId) -> Result<bool> {
        let pos = match self.particles.get(&id) {
            Some(particle) => particle.position,
            None => return Ok(false),
        };

        let dest = match self.grid.get(pos.x, pos.y - 1) {
            Cell::OutOfBounds => return Ok(false), // resting on the floor
            Cell::Empty => pos.offset(0, -1),
            Cell::Occupied(_) => {
                let left = self.grid.get(pos.x - 1, pos.y - 1).is_empty();
                let right = self.grid.get(pos.x + 1, pos.y - 1).is_empty();
                match (left, right) {
                    (false, false) => return Ok(false),
                    (true, false) => pos.offset(-1, -1),
                    (false, true) => pos.offset(1, -1),
                    (true, true) => {
                        if self.rng.gen::<bool>() {
                            pos.offset(-1, -1)
                        } else {
                            pos.offset(1, -1)
                        }
                    }
                }
            }
        };

        let new_pos = self.move_particle(id, dest)?;

        // Occupants above the new resting cell may have lost their support.
        self.enqueue_update(self.grid.get(new_pos.x - 1, new_pos.y + 1));
        self.enqueue_update(self.grid.get(new_pos.x, new_pos.y + 1));
        self.enqueue_update(self.grid.get(new_pos.x + 1, new_pos.y + 1));
        // The mover itself; already simulated this tick, so this defers it.
        self.enqueue_update(Cell::Occupied(id));

        Ok(true)
    }

    /// Request that the occupant of `cell` re-simulate.
    ///
    /// Empty and out-of-bounds cells are ignored. A particle that already
    /// simulated this tick is deferred to the next tick; one already pending
    /// this tick is left where it is: at most one enqueue per particle per
    /// tick.
    fn enqueue_update(&mut self, cell: Cell) {
        let id = match cell {
            Cell::Occupied(id) => id,
            Cell::Empty | Cell::OutOfBounds => return,
        };
        if self.updated.contains(&id) {
            self.defer_update(id);
        } else if self.updating.insert(id) {
            self.queue.push_back(id);
        }
    }

    /// Schedule `id` for the following tick.
    fn defer_update(&mut self, id: ParticleId) {
        if self.next_update.insert(id) {
            self.next_queue.push_back(id);
        }
    }

    /// Move a live particle to `dest`, whose `x` is wrapped; the destination
    /// must be empty and vertically in bounds. All-or-nothing: a failed move
    /// leaves the registry and grid untouched. Returns the wrapped
    /// destination.
    fn move_particle(&mut self, id: ParticleId, dest: Position) -> Result<Position> {
        let dest = dest.wrap_x(self.config.width);
        if dest.y < 0 || dest.y >= self.config.height {
            return Err(Error::InvariantViolation(format!(
                "move of {id} to ({}, {}) leaves the vertical bounds",
                dest.x, dest.y
            )));
        }
        if let Cell::Occupied(other) = self.grid.get(dest.x, dest.y) {
            return Err(Error::InvariantViolation(format!(
                "move of {id} into ({}, {}) held by {other}",
                dest.x, dest.y
            )));
        }
        let particle = self.particles.get_mut(&id).ok_or_else(|| {
            Error::InvariantViolation(format!("move of unknown particle {id}"))
        })?;

        let old = particle.position;
        particle.move_to(dest);
        self.grid.set(old.x, old.y, None);
        self.grid.set(dest.x, dest.y, Some(id));
        Ok(dest)
    }

    /// Audit the grid/registry invariant: every live particle occupies
    /// exactly its recorded cell, and every occupied cell points back at a
    /// live particle recording it. Cheap enough for tests and debugging,
    /// not called on the hot path.
    pub fn check_consistency(&self) -> Result<()> {
        for (id, particle) in &self.particles {
            let Position { x, y } = particle.position;
            match self.grid.get(x, y) {
                Cell::Occupied(found) if found == *id => {}
                other => {
                    return Err(Error::InvariantViolation(format!(
                        "particle {id} records ({x}, {y}) but the grid holds {other:?} there"
                    )));
                }
            }
        }
        for (pos, cell) in self.grid.iter() {
            if let Cell::Occupied(id) = cell {
                match self.particles.get(&id) {
                    Some(particle) if particle.position == pos => {}
                    _ => {
                        return Err(Error::InvariantViolation(format!(
                            "grid cell ({}, {}) holds {id}, which does not record it",
                            pos.x, pos.y
                        )));
                    }
                }
            }
        }
        Ok(())
    }
}

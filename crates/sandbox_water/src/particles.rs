//! Droplet population: spawning, culling, capping and terrain following.
//!
//! Keeping droplets on the sand costs one terrain query per droplet, so the
//! correction is amortized over `coll_mesh_delay` ticks:
//!
//! - Small populations (< `full_correction_limit`) are corrected in full, with
//!   zero tolerance, once per period on the boundary tick.
//! - Large populations are corrected one slice per tick with a resting buffer
//!   so stacked water can sit on itself.
//!
//! The exact/batched split is a cost-versus-quality trade-off: small scenes
//! get exact terrain following, large scenes get bounded per-tick work.

use glam::Vec3;

use crate::absorption::{Absorption, AbsorptionStep};
use crate::config::DropletParams;
use crate::constants::FULL_CORRECTION_RADIUS_SCALE;
use crate::droplet::Droplet;
use crate::terrain::{Footprint, PointOverlapQuery, TerrainQuery};

/// Result of a spawn request.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SpawnOutcome {
    Spawned,
    /// Another droplet already occupies the spawn probe.
    Rejected,
}

/// What one `maintain` call did.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MaintainReport {
    /// Removed for leaving the footprint.
    pub culled_outside: usize,
    /// Removed for exceeding the population cap.
    pub culled_over_cap: usize,
    /// Droplets whose z was pulled back onto the terrain.
    pub corrected: usize,
    /// True when this tick ran the exact full-population sweep.
    pub full_sweep: bool,
}

/// Owner of the live droplet set.
pub struct ParticleManager {
    droplets: Vec<Droplet>,
    params: DropletParams,
    show_particles: bool,
    subsection: usize,
    absorption: Absorption,
}

impl ParticleManager {
    pub fn new(params: DropletParams) -> Self {
        let absorption = Absorption::new(params.absorption_rate);
        let show_particles = params.show_particles;
        Self {
            droplets: Vec::with_capacity(params.max_droplets),
            params,
            show_particles,
            subsection: 0,
            absorption,
        }
    }

    pub fn len(&self) -> usize {
        self.droplets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.droplets.is_empty()
    }

    pub fn droplets(&self) -> &[Droplet] {
        &self.droplets
    }

    pub fn params(&self) -> &DropletParams {
        &self.params
    }

    pub fn show_particles(&self) -> bool {
        self.show_particles
    }

    /// Slice of the correction period the next `maintain` works on.
    pub fn subsection(&self) -> usize {
        self.subsection
    }

    fn spawn_probe(&self, position: Vec3) -> Vec3 {
        position + Vec3::new(0.0, 0.0, self.params.spawn_probe_z_offset)
    }

    /// Spawn a droplet unless one already sits in the probe sphere.
    pub fn spawn(&mut self, position: Vec3) -> SpawnOutcome {
        let probe = self.spawn_probe(position);
        if self
            .droplets
            .as_slice()
            .any_point_within(probe, self.params.spawn_probe_radius)
        {
            return SpawnOutcome::Rejected;
        }
        self.insert(position)
    }

    /// Spawn using an external broad-phase for the overlap check.
    pub fn spawn_with(&mut self, position: Vec3, overlap: &dyn PointOverlapQuery) -> SpawnOutcome {
        let probe = self.spawn_probe(position);
        if overlap.any_point_within(probe, self.params.spawn_probe_radius) {
            return SpawnOutcome::Rejected;
        }
        self.insert(position)
    }

    fn insert(&mut self, position: Vec3) -> SpawnOutcome {
        self.droplets.push(Droplet::new(position, self.show_particles));
        SpawnOutcome::Spawned
    }

    /// Per-tick upkeep: cull, then amortized terrain correction.
    pub fn maintain(&mut self, terrain: &dyn TerrainQuery) -> MaintainReport {
        let (culled_outside, culled_over_cap) = self.cull(terrain.footprint_bounds());
        let (corrected, full_sweep) = self.settle(terrain);
        MaintainReport {
            culled_outside,
            culled_over_cap,
            corrected,
            full_sweep,
        }
    }

    /// Remove droplets outside the expanded footprint, then enforce the cap.
    ///
    /// Equivalent to scanning from the newest droplet backwards and dropping
    /// every in-bounds droplet past the cap: the newest survive.
    pub fn cull(&mut self, footprint: Footprint) -> (usize, usize) {
        let bounds = footprint.expanded(self.params.cull_margin);
        let inside = self
            .droplets
            .iter()
            .filter(|d| bounds.contains(d.position.x, d.position.y))
            .count();
        let mut excess = inside.saturating_sub(self.params.max_droplets);
        let mut outside = 0;
        let mut over_cap = 0;

        self.droplets.retain(|d| {
            if !bounds.contains(d.position.x, d.position.y) {
                outside += 1;
                false
            } else if excess > 0 {
                excess -= 1;
                over_cap += 1;
                false
            } else {
                true
            }
        });

        if over_cap > 0 {
            log::debug!("Culled {} droplets over the cap of {}", over_cap, self.params.max_droplets);
        }
        (outside, over_cap)
    }

    /// Amortized terrain correction. Returns (corrected, full_sweep).
    fn settle(&mut self, terrain: &dyn TerrainQuery) -> (usize, bool) {
        let delay = self.params.coll_mesh_delay.max(1);
        let count = self.droplets.len();
        let large = count >= self.params.full_correction_limit;
        let boundary = self.subsection >= delay - 1;

        let corrected = if !large {
            if boundary {
                self.correct_all(terrain)
            } else {
                0
            }
        } else {
            let step = count / delay;
            let start = (self.subsection * step).min(count);
            // The last slice also takes the remainder of the division.
            let end = if boundary { count } else { ((self.subsection + 1) * step).min(count) };
            self.correct_range(terrain, start, end)
        };

        self.subsection = if boundary { 0 } else { self.subsection + 1 };
        (corrected, boundary && !large)
    }

    /// Exact correction: anything below the surface goes back above it.
    fn correct_all(&mut self, terrain: &dyn TerrainQuery) -> usize {
        let lift = self.params.droplet_radius * FULL_CORRECTION_RADIUS_SCALE;
        let mut corrected = 0;
        for droplet in &mut self.droplets {
            let depth = terrain.depth_at(droplet.position.x, droplet.position.y);
            if droplet.position.z > depth {
                droplet.set_z(depth - lift);
                corrected += 1;
            }
        }
        corrected
    }

    /// Batched correction with a resting buffer.
    fn correct_range(&mut self, terrain: &dyn TerrainQuery, start: usize, end: usize) -> usize {
        let radius = self.params.droplet_radius;
        let buffer = self.params.resting_buffer;
        let mut corrected = 0;
        for droplet in &mut self.droplets[start..end] {
            let depth = terrain.depth_at(droplet.position.x, droplet.position.y);
            if droplet.position.z > depth - radius + buffer {
                droplet.set_z(depth - radius);
                corrected += 1;
            }
        }
        corrected
    }

    /// Remove every droplet. Returns how many were removed.
    pub fn destroy_all(&mut self) -> usize {
        let removed = self.droplets.len();
        self.droplets.clear();
        removed
    }

    /// Set the global mesh visibility and apply it to every live droplet.
    pub fn set_visibility(&mut self, show: bool) {
        self.show_particles = show;
        for droplet in &mut self.droplets {
            droplet.set_show_mesh(show);
        }
    }

    pub fn absorption(&self) -> &Absorption {
        &self.absorption
    }

    pub fn set_absorption_rate(&mut self, rate: f32) -> bool {
        self.absorption.set_rate(rate)
    }

    /// Start (or stop) removing droplets over time.
    pub fn set_absorption_active(&mut self, active: bool) {
        if active {
            self.absorption.start();
        } else {
            self.absorption.stop();
        }
    }

    /// Set the rate and start removing the newest droplet every `1/rate` s.
    pub fn reduce_over_time(&mut self, rate_per_second: f32) {
        self.set_absorption_rate(rate_per_second);
        self.absorption.start();
    }

    /// Advance the absorption schedule by `dt`.
    pub fn tick_absorption(&mut self, dt: f32) -> AbsorptionStep {
        if !self.absorption.is_active() {
            return AbsorptionStep::Idle;
        }
        let due = if self.droplets.is_empty() {
            0
        } else {
            self.absorption.advance(dt)
        };
        let removed = due.min(self.droplets.len());
        let keep = self.droplets.len() - removed;
        self.droplets.truncate(keep);

        if self.droplets.is_empty() {
            self.absorption.stop();
            log::info!("Absorption finished, population empty");
            AbsorptionStep::Completed { removed }
        } else {
            AbsorptionStep::Running { removed }
        }
    }
}

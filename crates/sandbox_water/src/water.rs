//! Double-buffered water surface simulation.
//!
//! Two [`HeightField`]s alternate roles every step: the current buffer is the
//! source and the presentable state; the other holds the previous state and
//! receives the next one. Random disturbances keep the surface alive.

use glam::Vec2;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::config::WaterSurfaceParams;
use crate::constants::{
    DISTURB_MARGIN, DISTURB_RADII, DISTURB_SPAN, MAX_DISTURBANCES, WATER_GRID_SIZE,
};
use crate::heightfield::{BufferId, HeightField};
use crate::kernel::{ComputeKernel, CpuKernel, Disturbance, StepParams};

/// Ping-pong height-field solver driven at a fixed tick.
pub struct HeightFieldSimulator<K: ComputeKernel = CpuKernel> {
    kernel: K,
    buffers: [HeightField; 2],
    current: BufferId,
    params: WaterSurfaceParams,
    rng: ChaCha8Rng,
    /// Steps taken since creation.
    pub steps: u64,
    /// Disturbances fired since creation.
    pub disturbances_fired: u64,
}

impl<K: ComputeKernel> HeightFieldSimulator<K> {
    /// Create both buffers and fill them with the rest level.
    pub fn new(kernel: K, params: WaterSurfaceParams) -> Self {
        let buffers = [
            HeightField::new(params.grid_width, params.grid_height, params.rest_level),
            HeightField::new(params.grid_width, params.grid_height, params.rest_level),
        ];
        let rng = ChaCha8Rng::seed_from_u64(params.seed);
        let mut sim = Self {
            kernel,
            buffers,
            current: BufferId::A,
            params,
            rng,
            steps: 0,
            disturbances_fired: 0,
        };
        sim.fill(sim.params.rest_level);
        sim
    }

    /// Reset both buffers to `value`.
    pub fn fill(&mut self, value: f32) {
        let [a, b] = &mut self.buffers;
        self.kernel.fill(a, value);
        self.kernel.fill(b, value);
    }

    /// Re-seed the disturbance source.
    pub fn reseed(&mut self, seed: u64) {
        self.rng = ChaCha8Rng::seed_from_u64(seed);
    }

    /// Advance one step from the current buffer into the other, then swap.
    pub fn step(&mut self, dt: f32) {
        let step = StepParams {
            dt,
            iterations: self.params.relaxation_passes,
            damping: self.params.damping,
            wave_speed: self.params.wave_speed,
            wrap: self.params.wrap,
        };
        let (src, dst) = {
            let (first, second) = self.buffers.split_at_mut(1);
            match self.current {
                BufferId::A => (&first[0], &mut second[0]),
                BufferId::B => (&second[0], &mut first[0]),
            }
        };
        self.kernel.step(src, dst, &step);
        self.current = self.current.other();
        self.steps += 1;
        debug_assert!(self.current().is_finite(), "water surface diverged at step {}", self.steps);
    }

    /// Apply impulses to the non-current buffer; they show after the next step.
    ///
    /// That buffer holds the previous state, which the leapfrog step
    /// subtracts, so impulses are written negated: a positive magnitude
    /// raises the surface on the next step.
    pub fn disturb(&mut self, disturbances: &[Disturbance]) {
        let blur = self.params.disturb_blur_passes;
        if disturbances.len() > MAX_DISTURBANCES {
            log::debug!(
                "Dropping {} disturbances beyond the limit of {}",
                disturbances.len() - MAX_DISTURBANCES,
                MAX_DISTURBANCES
            );
        }
        let count = disturbances.len().min(MAX_DISTURBANCES);
        let mut negated = [Disturbance::default(); MAX_DISTURBANCES];
        for (out, d) in negated.iter_mut().zip(&disturbances[..count]) {
            *out = Disturbance {
                magnitude: -d.magnitude,
                ..*d
            };
        }
        let pending = &mut self.buffers[self.current.other().index()];
        self.kernel.disturb(pending, &negated[..count], blur);
        self.disturbances_fired += 1;
    }

    /// Draw the standard four-impulse pattern from the seeded source.
    ///
    /// Centres fall in the interior band of the reference 256-cell grid,
    /// scaled to this grid's size.
    pub fn random_disturbances(&mut self) -> [Disturbance; MAX_DISTURBANCES] {
        let scale = Vec2::new(self.params.grid_width as f32, self.params.grid_height as f32)
            / WATER_GRID_SIZE as f32;
        let rng = &mut self.rng;
        let mut centre = || {
            Vec2::new(
                DISTURB_MARGIN + rng.gen::<f32>() * DISTURB_SPAN,
                DISTURB_MARGIN + rng.gen::<f32>() * DISTURB_SPAN,
            ) * scale
        };
        let centres = [centre(), centre(), centre(), centre()];
        let magnitudes = [
            0.1 * self.rng.gen::<f32>(),
            -0.1 * self.rng.gen::<f32>(),
            0.25,
            -0.25,
        ];
        std::array::from_fn(|i| Disturbance {
            centre: centres[i],
            radius: DISTURB_RADII[i],
            magnitude: magnitudes[i],
        })
    }

    /// Fire a random disturbance with the configured per-tick probability.
    pub fn maybe_disturb(&mut self) -> bool {
        if self.rng.gen::<f32>() >= self.params.disturb_probability {
            return false;
        }
        let disturbances = self.random_disturbances();
        self.disturb(&disturbances);
        true
    }

    /// One fixed tick: step, then maybe disturb.
    pub fn tick(&mut self, dt: f32) -> bool {
        self.step(dt);
        self.maybe_disturb()
    }

    pub fn current_id(&self) -> BufferId {
        self.current
    }

    /// The presentable buffer.
    pub fn current(&self) -> &HeightField {
        &self.buffers[self.current.index()]
    }

    /// The buffer the next step writes into.
    pub fn pending(&self) -> &HeightField {
        &self.buffers[self.current.other().index()]
    }

    pub fn buffer(&self, id: BufferId) -> &HeightField {
        &self.buffers[id.index()]
    }

    /// Current buffer as bytes for texture upload.
    pub fn current_bytes(&self) -> &[u8] {
        self.current().as_bytes()
    }

    pub fn params(&self) -> &WaterSurfaceParams {
        &self.params
    }
}

impl HeightFieldSimulator<CpuKernel> {
    /// Simulator on the CPU reference kernel.
    pub fn with_cpu_kernel(params: WaterSurfaceParams) -> Self {
        Self::new(CpuKernel::new(), params)
    }
}

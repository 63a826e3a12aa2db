//! Compute kernels for the water surface.
//!
//! The simulator only issues `fill`/`step`/`disturb` requests; how they
//! execute is up to the kernel. [`CpuKernel`] is the reference
//! implementation, parallelised over rows with rayon.

use glam::Vec2;
use rayon::prelude::*;

use crate::constants::MAX_DISTURBANCES;
use crate::heightfield::HeightField;

/// Courant number cap for the wave update (2D leapfrog is stable up to 0.5).
const MAX_WAVE_COURANT: f32 = 0.45;

/// Total smoothing applied per step, split across the relaxation passes.
const RELAXATION_STRENGTH: f32 = 0.1;

/// Parameters for one surface step.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct StepParams {
    pub dt: f32,
    pub iterations: u32,
    pub damping: f32,
    pub wave_speed: f32,
    /// Periodic boundaries when true, clamped otherwise.
    pub wrap: bool,
}

/// A single localized impulse.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Disturbance {
    /// Centre in grid coordinates.
    pub centre: Vec2,
    /// Radius in cells.
    pub radius: f32,
    /// Signed height change at the centre; positive raises the surface.
    pub magnitude: f32,
}

/// Opaque compute surface used by [`crate::water::HeightFieldSimulator`].
pub trait ComputeKernel {
    /// Set every sample of `buffer` to `value`.
    fn fill(&mut self, buffer: &mut HeightField, value: f32);

    /// Advance the surface. `src` holds the current state and `dst` the
    /// previous one; `dst` is overwritten with the next state.
    fn step(&mut self, src: &HeightField, dst: &mut HeightField, params: &StepParams);

    /// Add up to [`MAX_DISTURBANCES`] impulses to `target`, smoothed by
    /// `blur_passes` passes of a 4-neighbour blur.
    fn disturb(&mut self, target: &mut HeightField, disturbances: &[Disturbance], blur_passes: u32);
}

/// CPU reference kernel.
#[derive(Debug, Default)]
pub struct CpuKernel {
    scratch: Vec<f32>,
    blur_scratch: Vec<f32>,
}

impl CpuKernel {
    pub fn new() -> Self {
        Self::default()
    }
}

#[inline]
fn neighbour_sum(buf: &[f32], width: usize, height: usize, x: usize, y: usize, wrap: bool) -> f32 {
    let (left, right, up, down) = if wrap {
        (
            (x + width - 1) % width,
            (x + 1) % width,
            (y + height - 1) % height,
            (y + 1) % height,
        )
    } else {
        (
            x.saturating_sub(1),
            (x + 1).min(width - 1),
            y.saturating_sub(1),
            (y + 1).min(height - 1),
        )
    };
    buf[y * width + left] + buf[y * width + right] + buf[up * width + x] + buf[down * width + x]
}

impl ComputeKernel for CpuKernel {
    fn fill(&mut self, buffer: &mut HeightField, value: f32) {
        buffer.fill(value);
    }

    fn step(&mut self, src: &HeightField, dst: &mut HeightField, params: &StepParams) {
        debug_assert!(src.same_dimensions(dst));
        let width = src.width;
        let height = src.height;
        if width == 0 || height == 0 {
            return;
        }

        let courant = (params.wave_speed * params.dt).powi(2).min(MAX_WAVE_COURANT);
        let damping = params.damping;
        let wrap = params.wrap;
        let current = &src.heights;

        // Leapfrog wave update; dst still holds the previous state.
        dst.heights
            .par_chunks_mut(width)
            .enumerate()
            .for_each(|(y, row)| {
                for (x, prev) in row.iter_mut().enumerate() {
                    let c = current[y * width + x];
                    let lap = neighbour_sum(current, width, height, x, y, wrap) - 4.0 * c;
                    *prev = c + (c - *prev) * damping + courant * lap;
                }
            });

        if params.iterations == 0 {
            return;
        }

        let alpha = RELAXATION_STRENGTH / params.iterations as f32;
        for _ in 0..params.iterations {
            self.scratch.clear();
            self.scratch.extend_from_slice(&dst.heights);
            let relaxed = &self.scratch;
            dst.heights
                .par_chunks_mut(width)
                .enumerate()
                .for_each(|(y, row)| {
                    for (x, h) in row.iter_mut().enumerate() {
                        let c = relaxed[y * width + x];
                        let lap = neighbour_sum(relaxed, width, height, x, y, wrap) - 4.0 * c;
                        *h = c + alpha * lap;
                    }
                });
        }
    }

    fn disturb(&mut self, target: &mut HeightField, disturbances: &[Disturbance], blur_passes: u32) {
        let width = target.width;
        let height = target.height;
        if width == 0 || height == 0 || disturbances.is_empty() {
            return;
        }

        self.scratch.clear();
        self.scratch.resize(width * height, 0.0);

        for d in disturbances.iter().take(MAX_DISTURBANCES) {
            let (cx, cy) = target.clamp_cell(d.centre.x, d.centre.y);
            let radius = d.radius.max(0.0);
            let reach = radius.ceil() as i64;
            for dy in -reach..=reach {
                for dx in -reach..=reach {
                    let x = cx as i64 + dx;
                    let y = cy as i64 + dy;
                    if x < 0 || y < 0 || x >= width as i64 || y >= height as i64 {
                        continue;
                    }
                    let dist = ((dx * dx + dy * dy) as f32).sqrt();
                    if dist > radius {
                        continue;
                    }
                    let falloff = if radius > 0.0 { 1.0 - dist / radius } else { 1.0 };
                    self.scratch[y as usize * width + x as usize] += d.magnitude * falloff * falloff;
                }
            }
        }

        // Cross-shaped blur spreads the impulse by at most one cell per pass.
        for _ in 0..blur_passes {
            self.blur_scratch.clear();
            self.blur_scratch.extend_from_slice(&self.scratch);
            let src = &self.blur_scratch;
            self.scratch
                .par_chunks_mut(width)
                .enumerate()
                .for_each(|(y, row)| {
                    for (x, out) in row.iter_mut().enumerate() {
                        let c = src[y * width + x];
                        let n = neighbour_sum(src, width, height, x, y, false);
                        *out = (4.0 * c + n) / 8.0;
                    }
                });
        }

        for (h, delta) in target.heights.iter_mut().zip(&self.scratch) {
            *h += *delta;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params() -> StepParams {
        StepParams {
            dt: 1.0 / 60.0,
            iterations: 20,
            damping: 0.999,
            wave_speed: 30.0,
            wrap: true,
        }
    }

    #[test]
    fn test_flat_surface_stays_flat() {
        let mut kernel = CpuKernel::new();
        let src = HeightField::new(16, 16, 0.5);
        let mut dst = HeightField::new(16, 16, 0.5);
        kernel.step(&src, &mut dst, &params());
        for h in &dst.heights {
            assert!((h - 0.5).abs() < 1e-6);
        }
    }

    #[test]
    fn test_ripple_spreads_and_stays_finite() {
        let mut kernel = CpuKernel::new();
        let mut a = HeightField::new(32, 32, 0.5);
        let mut b = HeightField::new(32, 32, 0.5);
        a.set(16, 16, 1.5);
        b.set(16, 16, 1.5);

        for i in 0..600 {
            if i % 2 == 0 {
                kernel.step(&a, &mut b, &params());
            } else {
                kernel.step(&b, &mut a, &params());
            }
        }

        assert!(a.is_finite() && b.is_finite());
        let mean = a.heights.iter().sum::<f32>() / a.heights.len() as f32;
        let peak = a.heights.iter().fold(0.0f32, |m, h| m.max((h - mean).abs()));
        assert!(peak < 1.0, "ripple should decay, peak deviation = {}", peak);
    }

    #[test]
    fn test_disturb_without_blur_hits_centre() {
        let mut kernel = CpuKernel::new();
        let mut field = HeightField::new(16, 16, 0.0);
        let d = Disturbance {
            centre: Vec2::new(8.0, 8.0),
            radius: 3.0,
            magnitude: 0.25,
        };
        kernel.disturb(&mut field, &[d], 0);
        assert!((field.get(8, 8) - 0.25).abs() < 1e-6);
        assert_eq!(field.get(8, 12), 0.0);
    }

    #[test]
    fn test_disturb_centre_outside_grid_is_clamped() {
        let mut kernel = CpuKernel::new();
        let mut field = HeightField::new(16, 16, 0.0);
        let d = Disturbance {
            centre: Vec2::new(400.0, -20.0),
            radius: 0.0,
            magnitude: -0.1,
        };
        kernel.disturb(&mut field, &[d], 0);
        assert!((field.get(15, 0) + 0.1).abs() < 1e-6);
    }
}

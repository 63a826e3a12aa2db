//! Terrain collaborators: depth lookup, footprint, and data/world mapping.
//!
//! The live sandbox supplies its own [`TerrainQuery`] backed by the scanned
//! mesh. [`DepthMapTerrain`] is a plain grid implementation used by tests and
//! the headless demo.

use glam::{Vec2, Vec3};
use serde::{Deserialize, Serialize};

use crate::serde_utils::{deserialize_vec2, serialize_vec2};

/// Axis-aligned x/y extent of the terrain mesh.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Footprint {
    #[serde(serialize_with = "serialize_vec2", deserialize_with = "deserialize_vec2")]
    pub min: Vec2,
    #[serde(serialize_with = "serialize_vec2", deserialize_with = "deserialize_vec2")]
    pub max: Vec2,
}

impl Footprint {
    pub fn new(min: Vec2, max: Vec2) -> Self {
        Self { min, max }
    }

    /// Inclusive containment test.
    pub fn contains(&self, x: f32, y: f32) -> bool {
        x >= self.min.x && x <= self.max.x && y >= self.min.y && y <= self.max.y
    }

    /// Grow by `margin` on every side.
    pub fn expanded(&self, margin: f32) -> Self {
        Self {
            min: self.min - Vec2::splat(margin),
            max: self.max + Vec2::splat(margin),
        }
    }

    pub fn size(&self) -> Vec2 {
        self.max - self.min
    }

    pub fn centre(&self) -> Vec2 {
        (self.min + self.max) * 0.5
    }
}

/// Terrain depth and extent, queried every fixed tick.
pub trait TerrainQuery {
    /// Terrain surface depth (world z) under (x, y).
    fn depth_at(&self, x: f32, y: f32) -> f32;

    /// Footprint bounds of the terrain mesh.
    fn footprint_bounds(&self) -> Footprint;

    /// Whether (x, y) lies on the terrain footprint.
    fn is_within_footprint(&self, x: f32, y: f32) -> bool {
        self.footprint_bounds().contains(x, y)
    }
}

/// Broad-phase check used to deduplicate droplet spawns.
pub trait PointOverlapQuery {
    fn any_point_within(&self, centre: Vec3, radius: f32) -> bool;
}

/// Linear mapping between depth-frame cells and world x/y.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct DataMapping {
    pub data_width: usize,
    pub data_height: usize,
    pub footprint: Footprint,
    /// World z units per unit of depth.
    pub mesh_z_scale: f32,
}

impl DataMapping {
    pub fn new(data_width: usize, data_height: usize, footprint: Footprint) -> Self {
        Self {
            data_width,
            data_height,
            footprint,
            mesh_z_scale: 1.0,
        }
    }

    pub fn with_mesh_z_scale(mut self, scale: f32) -> Self {
        self.mesh_z_scale = scale;
        self
    }

    fn cell_size(&self) -> Vec2 {
        let cols = self.data_width.saturating_sub(1).max(1) as f32;
        let rows = self.data_height.saturating_sub(1).max(1) as f32;
        self.footprint.size() / Vec2::new(cols, rows)
    }

    /// World x/y of a (possibly fractional) data cell.
    pub fn data_to_world(&self, col: f32, row: f32) -> Vec2 {
        self.footprint.min + Vec2::new(col, row) * self.cell_size()
    }

    /// Nearest data cell to a world x/y, clamped onto the frame.
    pub fn world_to_data(&self, world: Vec2) -> (usize, usize) {
        let cell = (world - self.footprint.min) / self.cell_size();
        let col = (cell.x.round() as i64).clamp(0, self.data_width.saturating_sub(1) as i64);
        let row = (cell.y.round() as i64).clamp(0, self.data_height.saturating_sub(1) as i64);
        (col as usize, row as usize)
    }
}

/// Terrain stored as one depth per data cell.
#[derive(Clone, Debug)]
pub struct DepthMapTerrain {
    pub mapping: DataMapping,
    pub depths: Vec<f32>,
}

impl DepthMapTerrain {
    /// Flat terrain at `depth` everywhere.
    pub fn flat(mapping: DataMapping, depth: f32) -> Self {
        Self {
            mapping,
            depths: vec![depth; mapping.data_width * mapping.data_height],
        }
    }

    /// Terrain whose depth at each cell comes from `f(col, row)`.
    pub fn from_fn(mapping: DataMapping, f: impl Fn(usize, usize) -> f32) -> Self {
        let mut depths = Vec::with_capacity(mapping.data_width * mapping.data_height);
        for row in 0..mapping.data_height {
            for col in 0..mapping.data_width {
                depths.push(f(col, row));
            }
        }
        Self { mapping, depths }
    }

    pub fn set_depth(&mut self, col: usize, row: usize, depth: f32) {
        if col < self.mapping.data_width && row < self.mapping.data_height {
            self.depths[row * self.mapping.data_width + col] = depth;
        }
    }
}

impl TerrainQuery for DepthMapTerrain {
    fn depth_at(&self, x: f32, y: f32) -> f32 {
        if self.depths.is_empty() {
            return 0.0;
        }
        let (col, row) = self.mapping.world_to_data(Vec2::new(x, y));
        self.depths[row * self.mapping.data_width + col]
    }

    fn footprint_bounds(&self) -> Footprint {
        self.mapping.footprint
    }
}

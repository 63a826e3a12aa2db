//! Water droplet resting on the terrain.

use glam::Vec3;

use crate::terrain::PointOverlapQuery;

/// A single droplet. Identity is its slot in the owning population.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Droplet {
    /// World position (z grows into the sand)
    pub position: Vec3,
    /// Whether the droplet's debug mesh is drawn
    pub show_mesh: bool,
}

impl Droplet {
    pub fn new(position: Vec3, show_mesh: bool) -> Self {
        Self {
            position,
            show_mesh,
        }
    }

    /// Create a hidden droplet at the given position.
    pub fn at(position: Vec3) -> Self {
        Self::new(position, false)
    }

    pub fn set_z(&mut self, z: f32) {
        self.position.z = z;
    }

    pub fn set_show_mesh(&mut self, show: bool) {
        self.show_mesh = show;
    }
}

/// Brute-force overlap over a droplet slice.
impl PointOverlapQuery for [Droplet] {
    fn any_point_within(&self, centre: Vec3, radius: f32) -> bool {
        let r2 = radius * radius;
        self.iter().any(|d| d.position.distance_squared(centre) <= r2)
    }
}

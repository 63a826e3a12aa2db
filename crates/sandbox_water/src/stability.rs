//! Hand stability detection.
//!
//! Each sample reduces the depth frame to the centroid of every pixel inside
//! the hand band. A hand that holds still (moves less than `min_movement`
//! between samples) counts the stability counter down; once it passes zero a
//! [`SettleEvent`] fires. Moving more than `max_movement` restarts the count.
//! Movement between the two thresholds does neither, which absorbs sensor
//! jitter without re-triggering.

use std::cell::Cell;
use std::rc::Rc;

use glam::{Vec2, Vec3};
use serde::{Deserialize, Serialize};

use crate::config::HandDetectionParams;
use crate::depth::DepthFrame;
use crate::serde_utils::{deserialize_vec3, serialize_vec3};
use crate::terrain::DataMapping;

/// A hand has settled at a location.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SettleEvent {
    pub id: u64,
    #[serde(serialize_with = "serialize_vec3", deserialize_with = "deserialize_vec3")]
    pub world_position: Vec3,
    /// World z divided by the mesh z scale.
    pub depth: f32,
    /// Depth-frame cell under the hand (column, row).
    pub data_position: (usize, usize),
    pub out_of_bounds: bool,
}

/// Shared, strictly increasing gesture ids.
///
/// Clones share the same counter, so every producer on the session thread
/// draws from one sequence.
#[derive(Clone, Debug)]
pub struct GestureIdAllocator {
    next: Rc<Cell<u64>>,
}

impl GestureIdAllocator {
    pub fn starting_at(first: u64) -> Self {
        Self {
            next: Rc::new(Cell::new(first)),
        }
    }

    pub fn next_id(&self) -> u64 {
        let id = self.next.get();
        self.next.set(id + 1);
        id
    }

    /// Id the next call to `next_id` will return.
    pub fn peek(&self) -> u64 {
        self.next.get()
    }
}

/// Turns noisy depth frames into discrete settle events.
pub struct StabilityDetector {
    params: HandDetectionParams,
    mapping: DataMapping,
    ids: GestureIdAllocator,
    counter: i32,
    last_centroid: Option<Vec3>,
    pub samples_taken: u64,
    pub events_emitted: u64,
}

impl StabilityDetector {
    pub fn new(params: HandDetectionParams, mapping: DataMapping, ids: GestureIdAllocator) -> Self {
        let counter = params.stability_threshold;
        Self {
            params,
            mapping,
            ids,
            counter,
            last_centroid: None,
            samples_taken: 0,
            events_emitted: 0,
        }
    }

    pub fn params(&self) -> &HandDetectionParams {
        &self.params
    }

    /// Remaining stable samples before an event (fires once this goes negative).
    pub fn counter(&self) -> i32 {
        self.counter
    }

    pub fn last_centroid(&self) -> Option<Vec3> {
        self.last_centroid
    }

    pub fn ids(&self) -> &GestureIdAllocator {
        &self.ids
    }

    /// Update the inclusive hand band.
    pub fn set_band(&mut self, min: u16, max: u16) {
        self.params.threshold_min = min.min(max);
        self.params.threshold_max = max.max(min);
    }

    pub fn set_mapping(&mut self, mapping: DataMapping) {
        self.mapping = mapping;
    }

    /// World-space centroid of the in-band pixels, if any.
    pub fn centroid(&self, frame: &DepthFrame) -> Option<Vec3> {
        let (col, row) = frame.band_centroid(self.params.threshold_min, self.params.threshold_max)?;
        let xy = self.mapping.data_to_world(col, row);
        Some(Vec3::new(xy.x, xy.y, self.params.threshold_min as f32))
    }

    /// Sample a frame.
    pub fn sample(&mut self, frame: &DepthFrame) -> Option<SettleEvent> {
        let centroid = self.centroid(frame);
        self.observe(centroid)
    }

    /// Feed one centroid (`None` = nothing in the band this sample).
    pub fn observe(&mut self, centroid: Option<Vec3>) -> Option<SettleEvent> {
        self.samples_taken += 1;
        // No hand: leave the counter and last position alone.
        let current = centroid?;

        let moved = self
            .last_centroid
            .map_or(0.0, |last| last.distance(current));
        self.last_centroid = Some(current);

        if moved > self.params.max_movement {
            if self.counter != self.params.stability_threshold {
                log::debug!("Hand moved {:.1}, stability reset", moved);
            }
            self.counter = self.params.stability_threshold;
            return None;
        }

        if moved < self.params.min_movement {
            self.counter -= 1;
            if self.counter < 0 {
                self.counter = self.params.stability_threshold;
                return Some(self.emit(current));
            }
        }
        None
    }

    fn emit(&mut self, position: Vec3) -> SettleEvent {
        let id = self.ids.next_id();
        let xy = Vec2::new(position.x, position.y);
        let within_footprint = self.mapping.footprint.contains(xy.x, xy.y);
        let within_depth = position.z >= 0.0 && position.z <= self.params.max_world_z;
        let scale = if self.mapping.mesh_z_scale != 0.0 {
            self.mapping.mesh_z_scale
        } else {
            1.0
        };
        self.events_emitted += 1;
        log::info!("Stable hand detected, gesture {} at {:?}", id, position);
        SettleEvent {
            id,
            world_position: position,
            depth: position.z / scale,
            data_position: self.mapping.world_to_data(xy),
            out_of_bounds: !(within_footprint && within_depth),
        }
    }
}

//! Session configuration.
//!
//! Every parameter block has a `Default` matching the tuned sandbox values,
//! so a config file only needs to name what it changes.

use serde::{Deserialize, Serialize};

use crate::constants::*;
use crate::error::{Result, SandboxError};

/// Water surface parameters.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WaterSurfaceParams {
    pub grid_width: usize,
    pub grid_height: usize,
    /// Level both buffers start at.
    pub rest_level: f32,
    /// Velocity damping per step (0-1, 1 = undamped).
    pub damping: f32,
    pub relaxation_passes: u32,
    /// Wave speed in cells per second.
    pub wave_speed: f32,
    /// Periodic boundaries (the surface texture repeats).
    pub wrap: bool,
    /// Chance per tick of a random disturbance.
    pub disturb_probability: f32,
    pub disturb_blur_passes: u32,
    /// Seed for disturbance placement.
    pub seed: u64,
}

impl Default for WaterSurfaceParams {
    fn default() -> Self {
        Self {
            grid_width: WATER_GRID_SIZE,
            grid_height: WATER_GRID_SIZE,
            rest_level: WATER_REST_LEVEL,
            damping: WATER_DAMPING,
            relaxation_passes: WATER_RELAXATION_PASSES,
            wave_speed: WATER_WAVE_SPEED,
            wrap: true,
            disturb_probability: DISTURB_PROBABILITY,
            disturb_blur_passes: DISTURB_BLUR_PASSES,
            seed: 0,
        }
    }
}

/// Droplet population parameters.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DropletParams {
    pub max_droplets: usize,
    pub full_correction_limit: usize,
    /// Ticks one correction sweep is spread over.
    pub coll_mesh_delay: usize,
    pub droplet_radius: f32,
    pub resting_buffer: f32,
    pub cull_margin: f32,
    pub spawn_probe_radius: f32,
    pub spawn_probe_z_offset: f32,
    /// Droplets removed per second while absorbing.
    pub absorption_rate: f32,
    /// Mesh visibility for new droplets.
    pub show_particles: bool,
}

impl Default for DropletParams {
    fn default() -> Self {
        Self {
            max_droplets: MAX_DROPLETS,
            full_correction_limit: FULL_CORRECTION_LIMIT,
            coll_mesh_delay: COLL_MESH_DELAY,
            droplet_radius: DROPLET_RADIUS,
            resting_buffer: RESTING_BUFFER,
            cull_margin: CULL_MARGIN,
            spawn_probe_radius: SPAWN_PROBE_RADIUS,
            spawn_probe_z_offset: SPAWN_PROBE_Z_OFFSET,
            absorption_rate: DEFAULT_ABSORPTION_RATE,
            show_particles: false,
        }
    }
}

/// Freeze-frame parameters.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FreezeParams {
    /// Ticks a gesture stored while frozen waits before replay.
    pub gesture_delay_frames: u32,
}

impl Default for FreezeParams {
    fn default() -> Self {
        Self {
            gesture_delay_frames: GESTURE_DELAY_FRAMES,
        }
    }
}

/// Hand detection parameters.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HandDetectionParams {
    /// Inclusive raw depth band.
    pub threshold_min: u16,
    pub threshold_max: u16,
    pub min_movement: f32,
    pub max_movement: f32,
    pub stability_threshold: i32,
    pub first_gesture_id: u64,
    /// Hands deeper than this (world z) are out of bounds.
    pub max_world_z: f32,
    pub foreground_max_distance_mm: f32,
}

impl Default for HandDetectionParams {
    fn default() -> Self {
        Self {
            threshold_min: HAND_THRESHOLD_MIN,
            threshold_max: HAND_THRESHOLD_MAX,
            min_movement: MIN_HAND_MOVEMENT,
            max_movement: MAX_HAND_MOVEMENT,
            stability_threshold: STABILITY_THRESHOLD,
            first_gesture_id: FIRST_DETECTED_GESTURE_ID,
            max_world_z: HAND_MAX_WORLD_Z,
            foreground_max_distance_mm: FOREGROUND_MAX_DISTANCE_MM,
        }
    }
}

/// Tick rates.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClockParams {
    /// Fixed simulation step (s).
    pub sim_dt: f32,
    /// Hand sampling interval (s).
    pub hand_sample_interval: f32,
    pub max_steps_per_tick: u32,
}

impl Default for ClockParams {
    fn default() -> Self {
        Self {
            sim_dt: SIM_DT,
            hand_sample_interval: HAND_SAMPLE_INTERVAL,
            max_steps_per_tick: MAX_STEPS_PER_TICK,
        }
    }
}

/// Full session configuration.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SandboxConfig {
    pub water: WaterSurfaceParams,
    pub droplets: DropletParams,
    pub freeze: FreezeParams,
    pub hand: HandDetectionParams,
    pub clock: ClockParams,
}

impl SandboxConfig {
    /// Reject values the simulation cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.water.grid_width == 0 || self.water.grid_height == 0 {
            return Err(SandboxError::invalid_config("water grid must be non-empty"));
        }
        if !(0.0..=1.0).contains(&self.water.damping) {
            return Err(SandboxError::invalid_config(format!(
                "water damping {} outside 0..=1",
                self.water.damping
            )));
        }
        if self.droplets.coll_mesh_delay == 0 {
            return Err(SandboxError::invalid_config("coll_mesh_delay must be at least 1"));
        }
        if self.droplets.absorption_rate <= 0.0 {
            return Err(SandboxError::invalid_config("absorption_rate must be positive"));
        }
        if self.hand.threshold_min > self.hand.threshold_max {
            return Err(SandboxError::invalid_config(format!(
                "hand band {}..={} is inverted",
                self.hand.threshold_min, self.hand.threshold_max
            )));
        }
        if self.hand.min_movement > self.hand.max_movement {
            return Err(SandboxError::invalid_config(
                "min_movement must not exceed max_movement",
            ));
        }
        if self.hand.foreground_max_distance_mm <= 0.0 {
            return Err(SandboxError::invalid_config(
                "foreground_max_distance_mm must be positive",
            ));
        }
        if self.clock.sim_dt <= 0.0 || self.clock.hand_sample_interval <= 0.0 {
            return Err(SandboxError::invalid_config("tick intervals must be positive"));
        }
        Ok(())
    }

    /// Save configuration to JSON file
    pub fn save_json(&self, path: &std::path::Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Load and validate configuration from JSON file
    pub fn load_json(path: &std::path::Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }
}

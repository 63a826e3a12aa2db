//! Fixed constants shared by the water surface, droplet population,
//! freeze buffer and hand detector.
//!
//! ## Units
//!
//! World positions are in sandbox mesh units: x/y span the terrain
//! footprint, z grows *into* the sand (larger z = deeper). Raw depth
//! samples are sensor units (0.1 mm).

// =============================================================================
// TIMING
// =============================================================================

/// Fixed simulation step (s). Water surface and droplet maintenance run at 60 Hz.
pub const SIM_DT: f32 = 1.0 / 60.0;

/// Interval between hand detector samples (s).
pub const HAND_SAMPLE_INTERVAL: f32 = 0.1;

/// Upper bound on fixed steps taken by one `tick`.
pub const MAX_STEPS_PER_TICK: u32 = 8;

// =============================================================================
// WATER SURFACE
// =============================================================================

/// Side length of the square water-surface grid.
pub const WATER_GRID_SIZE: usize = 256;

/// Level both buffers are filled with at initialization.
pub const WATER_REST_LEVEL: f32 = 0.5;

/// Velocity damping applied every step.
pub const WATER_DAMPING: f32 = 0.999;

/// Inner relaxation passes per step.
pub const WATER_RELAXATION_PASSES: u32 = 20;

/// Wave propagation speed in cells per second.
pub const WATER_WAVE_SPEED: f32 = 30.0;

/// Per-tick probability that a disturbance fires.
pub const DISTURB_PROBABILITY: f32 = 2.0 / 60.0;

/// Number of impulses in one disturbance.
pub const MAX_DISTURBANCES: usize = 4;

/// Disturbance centres are drawn from `[DISTURB_MARGIN, DISTURB_MARGIN + DISTURB_SPAN)`.
pub const DISTURB_MARGIN: f32 = 32.0;
pub const DISTURB_SPAN: f32 = 224.0;

/// Radius (cells) of each of the four impulses.
pub const DISTURB_RADII: [f32; MAX_DISTURBANCES] = [5.0, 5.0, 10.0, 10.0];

/// Blur passes smoothing a disturbance into the surface.
pub const DISTURB_BLUR_PASSES: u32 = 2;

// =============================================================================
// DROPLETS
// =============================================================================

/// Hard population cap.
pub const MAX_DROPLETS: usize = 2000;

/// Below this population the whole set is corrected exactly on the boundary tick.
pub const FULL_CORRECTION_LIMIT: usize = 200;

/// Number of ticks one full terrain-correction sweep is spread over.
pub const COLL_MESH_DELAY: usize = 4;

/// Droplet radius (world units).
pub const DROPLET_RADIUS: f32 = 5.0;

/// Slack allowing stacked droplets to rest on each other.
pub const RESTING_BUFFER: f32 = 10.0;

/// Radius multiplier used by the exact (small population) correction.
pub const FULL_CORRECTION_RADIUS_SCALE: f32 = 1.25;

/// Margin around the terrain footprint before a droplet is culled.
pub const CULL_MARGIN: f32 = 5.0;

/// Spawn overlap probe: radius and z offset from the spawn point.
pub const SPAWN_PROBE_RADIUS: f32 = 1.0;
pub const SPAWN_PROBE_Z_OFFSET: f32 = -5.0;

/// Default absorption rate (droplets removed per second).
pub const DEFAULT_ABSORPTION_RATE: f32 = 60.0;

// =============================================================================
// FREEZE / REPLAY
// =============================================================================

/// Ticks a gesture stored while frozen waits before replay.
pub const GESTURE_DELAY_FRAMES: u32 = 15;

// =============================================================================
// HAND DETECTION
// =============================================================================

/// Inclusive raw depth band considered "hand".
pub const HAND_THRESHOLD_MIN: u16 = 600;
pub const HAND_THRESHOLD_MAX: u16 = 1150;

/// Centroid movement below which a sample counts as stable.
pub const MIN_HAND_MOVEMENT: f32 = 5.0;

/// Centroid movement above which the stability counter restarts.
pub const MAX_HAND_MOVEMENT: f32 = 25.0;

/// Stable samples required before a settle event fires.
pub const STABILITY_THRESHOLD: i32 = 60;

/// First id handed to detected gestures; UI-assigned ids stay below it.
pub const FIRST_DETECTED_GESTURE_ID: u64 = 1000;

/// Depth range (world z) a hand may occupy and still be in bounds.
pub const HAND_MAX_WORLD_Z: f32 = 2000.0;

/// Foreground mask cut-off (mm from the sensor).
pub const FOREGROUND_MAX_DISTANCE_MM: f32 = 1000.0;

/// Millimetres per raw sample unit.
pub const RAW_DEPTH_TO_MM: f32 = 0.1;

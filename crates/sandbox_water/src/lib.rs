//! Augmented-reality sandbox water
//!
//! A ping-pong height-field water surface with random disturbances, a capped
//! population of terrain-following water droplets, hand stability detection
//! on raw depth frames, and a freeze mode that delays gestures made on a
//! frozen frame.
//!
//! # Example
//!
//! ```
//! use sandbox_water::{
//!     CpuKernel, DataMapping, DepthMapTerrain, Footprint, QueuedDepthSource, SandboxConfig,
//!     SessionBuilder, SettleEvent,
//! };
//! use glam::{Vec2, Vec3};
//!
//! let mapping = DataMapping::new(64, 48, Footprint::new(Vec2::ZERO, Vec2::new(640.0, 480.0)));
//! let mut session = SessionBuilder::new(SandboxConfig::default())
//!     .kernel(CpuKernel::new())
//!     .terrain(DepthMapTerrain::flat(mapping, 0.0))
//!     .depth_source(QueuedDepthSource::new())
//!     .mapping(mapping)
//!     .build()
//!     .unwrap();
//!
//! session.handle_settle(SettleEvent {
//!     id: 1000,
//!     world_position: Vec3::new(320.0, 240.0, 0.0),
//!     depth: 0.0,
//!     data_position: (32, 24),
//!     out_of_bounds: false,
//! });
//! session.tick(1.0 / 60.0);
//! assert_eq!(session.droplet_count(), 1);
//! ```

pub mod absorption;
pub mod clock;
pub mod config;
pub mod constants;
pub mod depth;
pub mod droplet;
pub mod error;
pub mod freeze;
pub mod heightfield;
pub mod kernel;
pub mod particles;
pub mod serde_utils;
pub mod session;
pub mod stability;
pub mod terrain;
pub mod water;

pub use absorption::{Absorption, AbsorptionStep};
pub use config::{
    ClockParams, DropletParams, FreezeParams, HandDetectionParams, SandboxConfig,
    WaterSurfaceParams,
};
pub use depth::{foreground_mask, DepthFrame, QueuedDepthSource, RawDepthSource};
pub use droplet::Droplet;
pub use error::{Result, SandboxError};
pub use freeze::{BufferedGesture, FreezeGestureBuffer, FreezeMode, FreezeSnapshot};
pub use glam::{Vec2, Vec3};
pub use heightfield::{BufferId, HeightField};
pub use kernel::{ComputeKernel, CpuKernel, Disturbance, StepParams};
pub use particles::{MaintainReport, ParticleManager, SpawnOutcome};
pub use session::{RouteOutcome, SandboxSession, SessionBuilder, SessionStats, TickReport};
pub use stability::{GestureIdAllocator, SettleEvent, StabilityDetector};
pub use terrain::{DataMapping, DepthMapTerrain, Footprint, PointOverlapQuery, TerrainQuery};
pub use water::HeightFieldSimulator;

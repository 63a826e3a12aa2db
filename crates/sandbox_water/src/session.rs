//! The sandbox session: wires the water surface, droplets, hand detection and
//! freeze replay together behind one `tick(dt)`.
//!
//! Per tick:
//! 1. For every fixed step due: droplet upkeep, water step and disturbance,
//!    then the frozen replay tick, whose released gestures spawn droplets.
//! 2. At the hand sample interval, poll the depth source. A new frame is kept
//!    for freezing and fed to the stability detector; a settle event is routed
//!    (LIVE: spawn, FROZEN: buffer).
//! 3. Absorption runs on the variable frame time.

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::absorption::AbsorptionStep;
use crate::clock::FixedStep;
use crate::config::SandboxConfig;
use crate::depth::{foreground_mask, DepthFrame, RawDepthSource};
use crate::error::{Result, SandboxError};
use crate::freeze::{FreezeGestureBuffer, FreezeMode, FreezeSnapshot};
use crate::kernel::{ComputeKernel, CpuKernel};
use crate::particles::{ParticleManager, SpawnOutcome};
use crate::stability::{GestureIdAllocator, SettleEvent, StabilityDetector};
use crate::terrain::{DataMapping, TerrainQuery};
use crate::water::HeightFieldSimulator;

/// Running totals since the session was built.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionStats {
    pub ticks: u64,
    pub fixed_steps: u64,
    pub droplets_spawned: u64,
    pub spawns_rejected: u64,
    pub droplets_culled: u64,
    pub droplets_absorbed: u64,
    pub settle_events: u64,
    pub out_of_bounds_events: u64,
    pub gestures_buffered: u64,
    pub gestures_released: u64,
    pub gestures_discarded: u64,
}

/// Where a settle event ended up.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RouteOutcome {
    Spawned,
    /// The spawn probe was occupied.
    Rejected,
    /// Held for replay while frozen.
    Buffered,
    /// Outside the footprint or depth range.
    OutOfBounds,
}

/// What one `tick` did.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TickReport {
    pub fixed_steps: u32,
    /// A new depth frame was sampled.
    pub sampled: bool,
    pub routed: Option<RouteOutcome>,
    pub released: usize,
    pub absorption: AbsorptionStep,
}

impl Default for TickReport {
    fn default() -> Self {
        Self {
            fixed_steps: 0,
            sampled: false,
            routed: None,
            released: 0,
            absorption: AbsorptionStep::Idle,
        }
    }
}

/// Collects the collaborators a session cannot run without.
pub struct SessionBuilder<K: ComputeKernel = CpuKernel> {
    config: SandboxConfig,
    kernel: Option<K>,
    terrain: Option<Box<dyn TerrainQuery>>,
    depth_source: Option<Box<dyn RawDepthSource>>,
    mapping: Option<DataMapping>,
    ids: Option<GestureIdAllocator>,
    ready: bool,
}

impl<K: ComputeKernel> SessionBuilder<K> {
    pub fn new(config: SandboxConfig) -> Self {
        Self {
            config,
            kernel: None,
            terrain: None,
            depth_source: None,
            mapping: None,
            ids: None,
            ready: true,
        }
    }

    pub fn kernel(mut self, kernel: K) -> Self {
        self.kernel = Some(kernel);
        self
    }

    pub fn terrain(mut self, terrain: impl TerrainQuery + 'static) -> Self {
        self.terrain = Some(Box::new(terrain));
        self
    }

    pub fn depth_source(mut self, source: impl RawDepthSource + 'static) -> Self {
        self.depth_source = Some(Box::new(source));
        self
    }

    /// Depth-frame to world mapping used by the hand detector.
    pub fn mapping(mut self, mapping: DataMapping) -> Self {
        self.mapping = Some(mapping);
        self
    }

    /// Share an id sequence with other gesture producers.
    pub fn gesture_ids(mut self, ids: GestureIdAllocator) -> Self {
        self.ids = Some(ids);
        self
    }

    /// Whether the sandbox starts ready to freeze.
    pub fn ready(mut self, ready: bool) -> Self {
        self.ready = ready;
        self
    }

    pub fn build(self) -> Result<SandboxSession<K>> {
        if let Err(e) = self.config.validate() {
            log::error!("Cannot start sandbox session: {}", e);
            return Err(e);
        }
        let kernel = self.kernel.ok_or_else(|| missing("compute kernel"))?;
        let terrain = self.terrain.ok_or_else(|| missing("terrain query"))?;
        let depth_source = self.depth_source.ok_or_else(|| missing("raw depth source"))?;
        let mapping = self.mapping.ok_or_else(|| missing("depth-to-world mapping"))?;
        let config = self.config;
        let ids = self
            .ids
            .unwrap_or_else(|| GestureIdAllocator::starting_at(config.hand.first_gesture_id));

        log::info!(
            "Sandbox session started: {}x{} water grid, {} droplet cap",
            config.water.grid_width,
            config.water.grid_height,
            config.droplets.max_droplets
        );

        Ok(SandboxSession {
            water: HeightFieldSimulator::new(kernel, config.water.clone()),
            particles: ParticleManager::new(config.droplets.clone()),
            freeze: FreezeGestureBuffer::new(config.freeze.clone()),
            detector: StabilityDetector::new(config.hand.clone(), mapping, ids),
            terrain,
            depth_source,
            sim_clock: FixedStep::new(config.clock.sim_dt, config.clock.max_steps_per_tick),
            // Only whether a sample is due matters, never how many.
            hand_clock: FixedStep::new(config.clock.hand_sample_interval, u32::MAX),
            latest_frame: None,
            processed: Vec::new(),
            ready: self.ready,
            running: true,
            time: 0.0,
            stats: SessionStats::default(),
            config,
        })
    }
}

fn missing(name: &'static str) -> SandboxError {
    log::error!("Cannot start sandbox session: no {} provided", name);
    SandboxError::MissingCollaborator(name)
}

/// A running sandbox.
pub struct SandboxSession<K: ComputeKernel = CpuKernel> {
    config: SandboxConfig,
    water: HeightFieldSimulator<K>,
    particles: ParticleManager,
    freeze: FreezeGestureBuffer,
    detector: StabilityDetector,
    terrain: Box<dyn TerrainQuery>,
    depth_source: Box<dyn RawDepthSource>,
    sim_clock: FixedStep,
    hand_clock: FixedStep,
    /// Last sampled frame and its millimetre conversion, kept for freezing.
    latest_frame: Option<DepthFrame>,
    processed: Vec<f32>,
    ready: bool,
    running: bool,
    time: f64,
    stats: SessionStats,
}

impl<K: ComputeKernel> SandboxSession<K> {
    pub fn config(&self) -> &SandboxConfig {
        &self.config
    }

    pub fn water(&self) -> &HeightFieldSimulator<K> {
        &self.water
    }

    pub fn particles(&self) -> &ParticleManager {
        &self.particles
    }

    pub fn freeze_buffer(&self) -> &FreezeGestureBuffer {
        &self.freeze
    }

    pub fn detector(&self) -> &StabilityDetector {
        &self.detector
    }

    pub fn stats(&self) -> &SessionStats {
        &self.stats
    }

    /// Session time in seconds.
    pub fn time(&self) -> f64 {
        self.time
    }

    pub fn mode(&self) -> FreezeMode {
        self.freeze.mode()
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn is_ready(&self) -> bool {
        self.ready
    }

    pub fn set_ready(&mut self, ready: bool) {
        self.ready = ready;
    }

    pub fn droplet_count(&self) -> usize {
        self.particles.len()
    }

    /// Current water surface as bytes for texture upload.
    pub fn current_bytes(&self) -> &[u8] {
        self.water.current_bytes()
    }

    pub fn tick(&mut self, dt: f32) -> TickReport {
        let mut report = TickReport::default();
        if !self.running {
            return report;
        }
        self.stats.ticks += 1;
        self.time += dt as f64;

        // Replay runs before sampling so a gesture buffered this tick waits
        // its full delay from the next tick on.
        report.fixed_steps = self.sim_clock.advance(dt);
        for _ in 0..report.fixed_steps {
            report.released += self.fixed_step();
        }

        if self.hand_clock.advance(dt) > 0 {
            if let Some(detected) = self.sample_hand() {
                report.sampled = true;
                if let Some(event) = detected {
                    report.routed = Some(self.route(event));
                }
            }
        }

        report.absorption = self.particles.tick_absorption(dt);
        match report.absorption {
            AbsorptionStep::Running { removed } | AbsorptionStep::Completed { removed } => {
                self.stats.droplets_absorbed += removed as u64;
            }
            AbsorptionStep::Idle => {}
        }
        report
    }

    /// Poll the depth source and run the detector on a new frame. `None`
    /// when no new frame was available.
    fn sample_hand(&mut self) -> Option<Option<SettleEvent>> {
        if !self.depth_source.new_data_ready() {
            return None;
        }
        let frame = self.depth_source.current_frame()?;
        let event = self.detector.sample(frame);

        let latest = self.latest_frame.get_or_insert_with(DepthFrame::default);
        latest.clone_from(frame);
        self.processed.clear();
        self.processed.extend(latest.to_millimetres());
        Some(event)
    }

    /// One 60 Hz step. Returns the number of gestures released from the
    /// freeze buffer.
    fn fixed_step(&mut self) -> usize {
        self.stats.fixed_steps += 1;
        let upkeep = self.particles.maintain(&*self.terrain);
        self.stats.droplets_culled += (upkeep.culled_outside + upkeep.culled_over_cap) as u64;

        self.water.tick(self.config.clock.sim_dt);

        let released = self.freeze.tick();
        for gesture in &released {
            log::debug!("Replaying gesture {}", gesture.source_gesture_id);
            self.spawn(gesture.world_position);
        }
        self.stats.gestures_released += released.len() as u64;
        released.len()
    }

    fn spawn(&mut self, position: Vec3) -> SpawnOutcome {
        let outcome = self.particles.spawn(position);
        match outcome {
            SpawnOutcome::Spawned => self.stats.droplets_spawned += 1,
            SpawnOutcome::Rejected => self.stats.spawns_rejected += 1,
        }
        outcome
    }

    fn route(&mut self, event: SettleEvent) -> RouteOutcome {
        self.stats.settle_events += 1;
        if event.out_of_bounds {
            self.stats.out_of_bounds_events += 1;
            log::debug!("Gesture {} out of bounds, ignored", event.id);
            return RouteOutcome::OutOfBounds;
        }
        match self.freeze.mode() {
            FreezeMode::Frozen => {
                self.freeze.store(&event, self.time);
                self.stats.gestures_buffered += 1;
                RouteOutcome::Buffered
            }
            FreezeMode::Live => match self.spawn(event.world_position) {
                SpawnOutcome::Spawned => RouteOutcome::Spawned,
                SpawnOutcome::Rejected => RouteOutcome::Rejected,
            },
        }
    }

    /// Route a settle event produced outside the session's own detector.
    pub fn handle_settle(&mut self, event: SettleEvent) -> RouteOutcome {
        self.route(event)
    }

    /// Freeze on the last sampled frame. False if already frozen, not ready,
    /// or no frame has been sampled yet.
    pub fn on_freeze(&mut self) -> bool {
        let Some(frame) = self.latest_frame.as_ref() else {
            log::debug!("Freeze requested before any depth frame arrived");
            return false;
        };
        self.freeze.freeze(frame, &self.processed, self.ready)
    }

    /// Back to LIVE, discarding buffered gestures. False if already LIVE.
    pub fn on_unfreeze(&mut self) -> bool {
        match self.freeze.unfreeze() {
            Some(discarded) => {
                self.stats.gestures_discarded += discarded as u64;
                true
            }
            None => false,
        }
    }

    /// Foreground pixels of the last sampled frame, using the configured
    /// distance cut-off. `None` before the first sample.
    pub fn foreground_mask(&self) -> Option<Vec<bool>> {
        let frame = self.latest_frame.as_ref()?;
        Some(foreground_mask(frame, self.config.hand.foreground_max_distance_mm))
    }

    pub fn frozen_depth_buffer(&self) -> Option<&FreezeSnapshot> {
        self.freeze.frozen_depth_buffer()
    }

    pub fn set_absorption_rate(&mut self, rate: f32) -> bool {
        self.particles.set_absorption_rate(rate)
    }

    pub fn set_absorption_active(&mut self, active: bool) {
        self.particles.set_absorption_active(active);
    }

    pub fn set_particle_visibility(&mut self, show: bool) {
        self.particles.set_visibility(show);
    }

    pub fn destroy_all_droplets(&mut self) -> usize {
        self.particles.destroy_all()
    }

    /// Calibration started: clear the droplets and stop ticking.
    pub fn suspend(&mut self) {
        if !self.running {
            return;
        }
        let removed = self.particles.destroy_all();
        self.running = false;
        self.ready = false;
        log::info!("Sandbox suspended, removed {} droplets", removed);
    }

    /// Sandbox ready again: reset the water surface and resume ticking.
    pub fn resume(&mut self) {
        if self.running {
            return;
        }
        self.water.fill(self.config.water.rest_level);
        self.sim_clock.reset();
        self.hand_clock.reset();
        self.running = true;
        self.ready = true;
        log::info!("Sandbox resumed");
    }

    /// Shut down, releasing every droplet. Returns the final statistics.
    pub fn teardown(mut self) -> SessionStats {
        let removed = self.particles.destroy_all();
        log::info!(
            "Sandbox session ended after {} ticks, removed {} droplets",
            self.stats.ticks,
            removed
        );
        self.stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::depth::QueuedDepthSource;
    use crate::terrain::{DepthMapTerrain, Footprint};
    use glam::Vec2;

    fn mapping() -> DataMapping {
        DataMapping::new(21, 21, Footprint::new(Vec2::ZERO, Vec2::new(200.0, 200.0)))
    }

    fn small_config() -> SandboxConfig {
        let mut config = SandboxConfig::default();
        config.water.grid_width = 16;
        config.water.grid_height = 16;
        config.water.disturb_probability = 0.0;
        config
    }

    fn builder() -> SessionBuilder<CpuKernel> {
        SessionBuilder::new(small_config())
            .kernel(CpuKernel::new())
            .terrain(DepthMapTerrain::flat(mapping(), 0.0))
            .depth_source(QueuedDepthSource::new())
            .mapping(mapping())
    }

    fn event(id: u64, position: Vec3) -> SettleEvent {
        SettleEvent {
            id,
            world_position: position,
            depth: position.z,
            data_position: (0, 0),
            out_of_bounds: false,
        }
    }

    #[test]
    fn test_missing_collaborators() {
        let err = SessionBuilder::<CpuKernel>::new(small_config())
            .terrain(DepthMapTerrain::flat(mapping(), 0.0))
            .depth_source(QueuedDepthSource::new())
            .mapping(mapping())
            .build()
            .err()
            .expect("kernel missing");
        assert!(matches!(err, SandboxError::MissingCollaborator("compute kernel")));

        let err = SessionBuilder::new(small_config())
            .kernel(CpuKernel::new())
            .depth_source(QueuedDepthSource::new())
            .mapping(mapping())
            .build()
            .err()
            .expect("terrain missing");
        assert!(matches!(err, SandboxError::MissingCollaborator("terrain query")));
    }

    #[test]
    fn test_invalid_config_rejected() {
        let mut config = small_config();
        config.hand.threshold_min = 2000;
        let result = SessionBuilder::new(config)
            .kernel(CpuKernel::new())
            .terrain(DepthMapTerrain::flat(mapping(), 0.0))
            .depth_source(QueuedDepthSource::new())
            .mapping(mapping())
            .build();
        assert!(matches!(result, Err(SandboxError::InvalidConfig(_))));
    }

    #[test]
    fn test_live_event_spawns_immediately() {
        let mut session = builder().build().unwrap();
        let outcome = session.handle_settle(event(1000, Vec3::new(50.0, 50.0, 0.0)));
        assert_eq!(outcome, RouteOutcome::Spawned);
        assert_eq!(session.droplet_count(), 1);
        assert_eq!(session.stats().droplets_spawned, 1);
    }

    #[test]
    fn test_out_of_bounds_event_dropped() {
        let mut session = builder().build().unwrap();
        let mut e = event(1000, Vec3::new(50.0, 50.0, 0.0));
        e.out_of_bounds = true;
        assert_eq!(session.handle_settle(e), RouteOutcome::OutOfBounds);
        assert_eq!(session.droplet_count(), 0);
    }

    #[test]
    fn test_freeze_needs_a_sampled_frame() {
        let mut session = builder().build().unwrap();
        assert!(!session.on_freeze());
        assert_eq!(session.mode(), FreezeMode::Live);
        assert!(!session.on_unfreeze());
    }

    #[test]
    fn test_foreground_mask_uses_configured_cutoff() {
        let mut config = small_config();
        config.hand.foreground_max_distance_mm = 500.0;
        let mut source = QueuedDepthSource::new();
        source.push(DepthFrame::new(4, 1, vec![0, 3000, 4990, 5010]));
        let mut session = SessionBuilder::new(config)
            .kernel(CpuKernel::new())
            .terrain(DepthMapTerrain::flat(mapping(), 0.0))
            .depth_source(source)
            .mapping(mapping())
            .build()
            .unwrap();

        assert!(session.foreground_mask().is_none());
        assert!(session.tick(0.1).sampled);
        assert_eq!(session.foreground_mask(), Some(vec![false, true, true, false]));
    }

    #[test]
    fn test_suspend_clears_and_stops() {
        let mut session = builder().build().unwrap();
        session.handle_settle(event(1, Vec3::new(50.0, 50.0, 0.0)));
        session.suspend();
        assert_eq!(session.droplet_count(), 0);
        assert_eq!(session.tick(1.0 / 60.0).fixed_steps, 0);
        session.resume();
        assert!(session.is_running());
        assert_eq!(session.tick(1.0 / 60.0).fixed_steps, 1);
    }

    #[test]
    fn test_absorption_drains_population() {
        let mut session = builder().build().unwrap();
        for i in 0..3 {
            session.handle_settle(event(i, Vec3::new(20.0 + 30.0 * i as f32, 50.0, 0.0)));
        }
        assert!(session.set_absorption_rate(4.0));
        session.set_absorption_active(true);
        let mut last = AbsorptionStep::Idle;
        for _ in 0..8 {
            last = session.tick(0.125).absorption;
        }
        assert_eq!(session.droplet_count(), 0);
        assert_eq!(last, AbsorptionStep::Idle);
        assert_eq!(session.stats().droplets_absorbed, 3);
    }
}

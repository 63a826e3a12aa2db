//! Depth frames in, droplets out: the full hand-to-water path with noisy,
//! seeded sensor data.

use glam::{Vec2, Vec3};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use sandbox_water::{
    CpuKernel, DataMapping, DepthFrame, DepthMapTerrain, Footprint, FreezeMode, GestureIdAllocator,
    QueuedDepthSource, RouteOutcome, SandboxConfig, SessionBuilder,
};

const SAMPLE_DT: f32 = 0.1;
const GRID: usize = 21;

fn mapping() -> DataMapping {
    DataMapping::new(GRID, GRID, Footprint::new(Vec2::ZERO, Vec2::new(200.0, 200.0)))
}

/// Background well below the hand band with a 3x3 hand centred on (10, 10).
fn hand_frame(rng: &mut ChaCha8Rng) -> DepthFrame {
    let mut frame = DepthFrame::filled(GRID, GRID, 0);
    for sample in frame.samples.iter_mut() {
        *sample = rng.gen_range(2000..4000);
    }
    for row in 9..=11 {
        for col in 9..=11 {
            frame.set(col, row, rng.gen_range(650..1100));
        }
    }
    frame
}

fn config() -> SandboxConfig {
    let mut config = SandboxConfig::default();
    config.water.grid_width = 32;
    config.water.grid_height = 32;
    config.clock.hand_sample_interval = SAMPLE_DT;
    config
}

#[test]
fn test_still_hand_spawns_then_buffers_while_frozen() {
    for seed in [1u64, 7, 42] {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let mut source = QueuedDepthSource::new();
        for _ in 0..200 {
            source.push(hand_frame(&mut rng));
        }

        let ids = GestureIdAllocator::starting_at(1000);
        let mut session = SessionBuilder::new(config())
            .kernel(CpuKernel::new())
            .terrain(DepthMapTerrain::flat(mapping(), 1000.0))
            .depth_source(source)
            .mapping(mapping())
            .gesture_ids(ids.clone())
            .build()
            .unwrap();

        let mut routed = Vec::new();
        for sample in 1..=61 {
            let report = session.tick(SAMPLE_DT);
            assert!(report.sampled);
            if let Some(outcome) = report.routed {
                routed.push((sample, outcome));
            }
        }
        assert_eq!(routed, vec![(61, RouteOutcome::Spawned)], "seed {}", seed);
        assert_eq!(session.droplet_count(), 1);
        assert_eq!(session.particles().droplets()[0].position, Vec3::new(100.0, 100.0, 600.0));
        assert_eq!(ids.peek(), 1001);

        // Same hand, now on a frozen frame: the next event waits for replay.
        assert!(session.on_freeze());
        let mut buffered_at = None;
        for sample in 62..=130 {
            let report = session.tick(SAMPLE_DT);
            if report.routed == Some(RouteOutcome::Buffered) {
                buffered_at = Some(sample);
            }
        }
        assert_eq!(buffered_at, Some(122));
        assert_eq!(session.mode(), FreezeMode::Frozen);
        assert_eq!(session.stats().gestures_released, 1);
        assert_eq!(session.droplet_count(), 2);
    }
}

#[test]
fn test_surface_stays_finite_under_disturbances() {
    let mut config = config();
    config.water.disturb_probability = 1.0;
    config.water.seed = 99;

    let mut session = SessionBuilder::new(config)
        .kernel(CpuKernel::new())
        .terrain(DepthMapTerrain::flat(mapping(), 0.0))
        .depth_source(QueuedDepthSource::new())
        .mapping(mapping())
        .build()
        .unwrap();

    for _ in 0..120 {
        session.tick(1.0 / 60.0);
    }
    let water = session.water();
    assert!(water.current().is_finite());
    assert!(water.disturbances_fired > 0);
    assert_eq!(session.current_bytes().len(), 32 * 32 * 4);
}

#[test]
fn test_disturbance_sequence_is_seeded() {
    let run = |seed: u64| {
        let mut config = config();
        config.water.disturb_probability = 0.5;
        config.water.seed = seed;
        let mut session = SessionBuilder::new(config)
            .kernel(CpuKernel::new())
            .terrain(DepthMapTerrain::flat(mapping(), 0.0))
            .depth_source(QueuedDepthSource::new())
            .mapping(mapping())
            .build()
            .unwrap();
        for _ in 0..30 {
            session.tick(1.0 / 60.0);
        }
        session.water().current().heights.clone()
    };
    assert_eq!(run(5), run(5));
}

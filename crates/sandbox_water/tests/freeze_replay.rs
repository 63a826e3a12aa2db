//! End-to-end freeze scenarios driven through the session tick.
//!
//! One `tick(DT)` runs exactly one fixed step: the hand sample interval is set
//! to the fixed step so the single queued frame is consumed on the first tick.

use glam::{Vec2, Vec3};
use sandbox_water::{
    CpuKernel, DataMapping, DepthFrame, DepthMapTerrain, Footprint, FreezeMode, QueuedDepthSource,
    RouteOutcome, SandboxConfig, SandboxSession, SessionBuilder, SettleEvent,
};

const DT: f32 = 1.0 / 60.0;

fn mapping() -> DataMapping {
    DataMapping::new(32, 24, Footprint::new(Vec2::ZERO, Vec2::new(320.0, 240.0)))
}

fn frozen_session() -> SandboxSession {
    let mut source = QueuedDepthSource::new();
    source.push(DepthFrame::filled(32, 24, 3000));
    frozen_session_with(source)
}

/// Session frozen right after its first depth sample.
fn frozen_session_with(source: QueuedDepthSource) -> SandboxSession {
    let mut config = SandboxConfig::default();
    config.water.grid_width = 32;
    config.water.grid_height = 32;
    config.water.disturb_probability = 0.0;
    config.clock.sim_dt = DT;
    config.clock.hand_sample_interval = DT;

    let mut session = SessionBuilder::new(config)
        .kernel(CpuKernel::new())
        .terrain(DepthMapTerrain::flat(mapping(), 0.0))
        .depth_source(source)
        .mapping(mapping())
        .build()
        .unwrap();

    let report = session.tick(DT);
    assert!(report.sampled);
    assert!(session.on_freeze());
    assert_eq!(session.mode(), FreezeMode::Frozen);
    session
}

fn settle(id: u64, position: Vec3) -> SettleEvent {
    SettleEvent {
        id,
        world_position: position,
        depth: position.z,
        data_position: (0, 0),
        out_of_bounds: false,
    }
}

#[test]
fn test_unfreeze_before_delay_spawns_nothing() {
    let mut session = frozen_session();

    for tick in 0..40 {
        match tick {
            2 | 5 => {
                let outcome = session.handle_settle(settle(1000 + tick, Vec3::new(100.0, 100.0, 0.0)));
                assert_eq!(outcome, RouteOutcome::Buffered);
            }
            10 => assert!(session.on_unfreeze()),
            _ => {}
        }
        session.tick(DT);
        assert_eq!(session.droplet_count(), 0, "droplet appeared on tick {}", tick);
    }

    assert_eq!(session.stats().gestures_buffered, 2);
    assert_eq!(session.stats().gestures_discarded, 2);
    assert_eq!(session.stats().gestures_released, 0);
    assert!(session.frozen_depth_buffer().is_none());
}

#[test]
fn test_buffered_gesture_spawns_after_fifteen_ticks() {
    let mut session = frozen_session();
    let position = Vec3::new(150.0, 80.0, 0.0);

    assert_eq!(session.handle_settle(settle(1000, position)), RouteOutcome::Buffered);

    for tick in 1..15 {
        session.tick(DT);
        assert_eq!(session.droplet_count(), 0, "released early on tick {}", tick);
    }

    let report = session.tick(DT);
    assert_eq!(report.released, 1);
    assert_eq!(session.droplet_count(), 1);
    assert_eq!(session.particles().droplets()[0].position, position);
    assert_eq!(session.mode(), FreezeMode::Frozen);
}

#[test]
fn test_frozen_snapshot_holds_the_sampled_frame() {
    let session = frozen_session();
    let snapshot = session.frozen_depth_buffer().expect("frozen");
    assert_eq!((snapshot.width, snapshot.height), (32, 24));
    assert!(snapshot.raw.iter().all(|&d| d == 3000));
    assert!(snapshot.processed.iter().all(|&mm| (mm - 300.0).abs() < 1e-3));
}

#[test]
fn test_freeze_while_not_ready_is_ignored() {
    let mut session = frozen_session();
    assert!(session.on_unfreeze());
    session.set_ready(false);
    assert!(!session.on_freeze());
    assert_eq!(session.mode(), FreezeMode::Live);
}

/// Background out of the hand band with a still 3x3 hand around (16, 12).
fn still_hand_frame() -> DepthFrame {
    let mut frame = DepthFrame::filled(32, 24, 3000);
    for row in 11..=13 {
        for col in 15..=17 {
            frame.set(col, row, 800);
        }
    }
    frame
}

#[test]
fn test_detected_gesture_waits_full_delay() {
    let mut source = QueuedDepthSource::new();
    for _ in 0..100 {
        source.push(still_hand_frame());
    }
    let mut session = frozen_session_with(source);

    let mut buffered_on = None;
    let mut released_on = None;
    for tick in 2..=100u32 {
        let report = session.tick(DT);
        if report.routed == Some(RouteOutcome::Buffered) {
            buffered_on = Some(tick);
        }
        if report.released > 0 {
            released_on = Some(tick);
            break;
        }
    }

    assert_eq!(buffered_on, Some(61));
    assert_eq!(released_on, Some(76));
    assert_eq!(session.droplet_count(), 1);
}

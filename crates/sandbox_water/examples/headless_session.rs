//! Headless sandbox run: a synthetic hand hovers over the sand, settles,
//! spawns water, then the frame is frozen and a second gesture is replayed.
//!
//! Run: RUST_LOG=info cargo run --example headless_session --release

use glam::Vec2;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use sandbox_water::{
    CpuKernel, DataMapping, DepthFrame, DepthMapTerrain, Footprint, QueuedDepthSource,
    SandboxConfig, SessionBuilder,
};

const DATA_WIDTH: usize = 64;
const DATA_HEIGHT: usize = 48;
const FRAME_DT: f32 = 0.1;

fn sensor_frame(rng: &mut ChaCha8Rng, hand: Option<(usize, usize)>) -> DepthFrame {
    let mut frame = DepthFrame::filled(DATA_WIDTH, DATA_HEIGHT, 0);
    for sample in frame.samples.iter_mut() {
        *sample = rng.gen_range(8000..9000);
    }
    if let Some((cx, cy)) = hand {
        for row in cy.saturating_sub(2)..=(cy + 2) {
            for col in cx.saturating_sub(2)..=(cx + 2) {
                frame.set(col, row, rng.gen_range(700..900));
            }
        }
    }
    frame
}

fn main() {
    env_logger::init();

    let config = match std::env::args().nth(1) {
        Some(path) => match SandboxConfig::load_json(std::path::Path::new(&path)) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("Failed to load {}: {}", path, e);
                std::process::exit(1);
            }
        },
        None => SandboxConfig::default(),
    };

    let footprint = Footprint::new(Vec2::ZERO, Vec2::new(640.0, 480.0));
    let mapping = DataMapping::new(DATA_WIDTH, DATA_HEIGHT, footprint);
    let terrain = DepthMapTerrain::from_fn(mapping, |col, row| {
        // Gentle bowl.
        let dx = col as f32 - DATA_WIDTH as f32 * 0.5;
        let dy = row as f32 - DATA_HEIGHT as f32 * 0.5;
        900.0 + 0.2 * (dx * dx + dy * dy)
    });

    let mut rng = ChaCha8Rng::seed_from_u64(2024);
    let mut source = QueuedDepthSource::new();
    for i in 0..260 {
        let hand = if i < 20 { None } else { Some((40, 20)) };
        source.push(sensor_frame(&mut rng, hand));
    }

    let mut session = match SessionBuilder::new(config)
        .kernel(CpuKernel::new())
        .terrain(terrain)
        .depth_source(source)
        .mapping(mapping)
        .build()
    {
        Ok(session) => session,
        Err(e) => {
            eprintln!("Failed to start session: {}", e);
            std::process::exit(1);
        }
    };

    for frame in 0..260 {
        if frame == 100 {
            session.on_freeze();
        }
        let report = session.tick(FRAME_DT);
        if let Some(outcome) = report.routed {
            println!("frame {:3}: settle event -> {:?}", frame, outcome);
        }
        if report.released > 0 {
            println!("frame {:3}: {} buffered gesture(s) replayed", frame, report.released);
        }
    }

    session.on_unfreeze();
    session.set_absorption_active(true);
    while session.droplet_count() > 0 {
        session.tick(FRAME_DT);
    }

    let stats = session.teardown();
    match serde_json::to_string_pretty(&stats) {
        Ok(json) => println!("{}", json),
        Err(e) => eprintln!("Failed to serialize stats: {}", e),
    }
}

//! Falling particles — lane-wise batch processing.
//!
//! Spawns a column of particles, applies gravity through the widened batch
//! path every frame, and retires particles once they hit the ground.
//! Structural changes are collected during the walk and applied after it,
//! since the batch callback may not touch the world.
//!
//! Run with: `RUST_LOG=info cargo run -p fafnir --example falling`

use fafnir::prelude::*;

const PARTICLE_COUNT: usize = 64;
const FRAMES: usize = 400;

// ── Components ───────────────────────────────────────────────────────────

/// Marks particles that glow on the way down; gives the world a second shape.
struct Ember;

fn main() {
    init_logger();

    let world = World::new();

    for i in 0..PARTICLE_COUNT {
        let entity = world.create_entity();
        let x = (i % 8) as f32 * 0.5;
        let y = 10.0 + (i / 8) as f32 * 2.0;
        world.add_component(entity, Vec3::new(x, y, 0.0));
        if i % 3 == 0 {
            world.add_component(entity, Ember);
        }
    }
    log::info!(
        "Spawned {} particles across {} shapes",
        world.entity_count(),
        world.archetype_count()
    );

    let gravity = SubtractConstant(Vec3::new(0.0, 0.1, 0.0));

    for frame in 0..FRAMES {
        // The callback only records; destroys happen once the walk is over.
        let mut grounded = Vec::new();
        world.for_each_batched::<Vec3, _>(&gravity, |entity, position| {
            if position.y <= 0.0 {
                grounded.push(entity);
            }
        });
        for entity in grounded {
            world.destroy_entity(entity);
        }

        if frame % 50 == 0 {
            log::info!(
                "frame {:3}: {} particles still falling",
                frame,
                world.entity_count()
            );
        }
        if world.entity_count() == 0 {
            log::info!("All particles grounded after {} frames", frame + 1);
            break;
        }
    }

    let stats = world.stats();
    println!(
        "{}",
        serde_json::to_string_pretty(&stats).expect("Failed to serialize world stats")
    );
}

//! Prefab stamping — capture an entity and replay it.
//!
//! Builds one fully equipped goblin, captures it as a prefab, then stamps
//! copies back into the world. The prefab also round-trips through a JSON
//! file on disk.
//!
//! Run with: `RUST_LOG=info cargo run -p fafnir --example prefab_stamp`

use fafnir::prelude::*;

const SAVE_PATH: &str = "/tmp/fafnir_goblin.json";

// ── Serializable components ──────────────────────────────────────────────

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
struct Health(u32);

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
struct Loadout {
    weapon: String,
    ammo: u32,
}

fn main() {
    init_logger();

    let world = World::new();
    let mut registry = make_registry();

    // Author the template entity by hand.
    let template = world.create_entity();
    world.add_component(template, Vec3::ZERO);
    world.add_component(template, Health(30));
    world.add_component(
        template,
        Loadout {
            weapon: "club".to_string(),
            ammo: 0,
        },
    );

    if !registry.save_prefab(&world, "goblin", template) {
        log::error!("Failed to capture the template entity");
        return;
    }
    world.destroy_entity(template);

    // Stamp a row of goblins from the in-memory prefab.
    for i in 0..5 {
        let entity = registry.load_prefab(&world, "goblin").unwrap();
        if let Some(mut position) = world.get_component_mut::<Vec3>(entity) {
            position.x = i as f32 * 2.0;
        }
    }
    log::info!("Stamped {} goblins from memory", world.entity_count());

    // Round-trip through disk: save, forget, reload, stamp once more.
    if registry.save_prefab_to_file("goblin", SAVE_PATH) {
        log::info!("Prefab saved to {}", SAVE_PATH);
    }
    registry.remove_prefab("goblin");
    let name = registry
        .load_prefab_from_file(SAVE_PATH)
        .expect("Failed to reload the prefab file");
    registry.load_prefab(&world, &name).unwrap();

    // Every stamp lands in the exact same shape.
    let goblins = world.query::<(Vec3, Health, Loadout)>();
    let healths: Vec<u32> = goblins
        .iter()
        .filter_map(|&e| world.get_component::<Health>(e).map(|h| h.0))
        .collect();
    let stats = world.stats();
    println!(
        "{} goblins in {} populated shape(s); healths: {:?}",
        goblins.len(),
        stats.archetypes.len(),
        healths
    );
}

fn make_registry() -> PrefabRegistry {
    let mut registry = PrefabRegistry::new();
    registry.register::<Vec3>();
    registry.register::<Health>();
    registry.register::<Loadout>();
    registry
}

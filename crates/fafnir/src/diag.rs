//! Diagnostics — logging setup and serializable world snapshots.
//!
//! The storage engine logs through the [`log`] facade (archetype creation at
//! debug, health and prefab anomalies at warn) and never configures output
//! itself. Hosts that want stderr output call [`init_logger`] once at
//! startup; everything is filtered through `RUST_LOG` as usual.
//!
//! [`WorldStats`] is the JSON-friendly counterpart of
//! [`World::stats`](crate::ecs::world::World::stats), for dashboards and
//! debug overlays that want the numbers off-process.

use serde::Serialize;

/// Counters and per-archetype breakdown captured by
/// [`World::stats`](crate::ecs::world::World::stats).
#[derive(Debug, Clone, Serialize)]
pub struct WorldStats {
    pub entity_count: usize,
    pub archetype_count: usize,
    pub component_count: usize,
    pub query_count: u64,
    /// Mean shared-lock hold time per query, in microseconds.
    pub avg_query_us: f64,
    /// Non-empty archetypes, largest first.
    pub archetypes: Vec<ArchetypeStats>,
}

/// One archetype's row in the breakdown.
#[derive(Debug, Clone, Serialize)]
pub struct ArchetypeStats {
    pub entity_count: usize,
    pub component_names: Vec<String>,
}

/// Install an `env_logger` backend for the `log` facade, reading the filter
/// from `RUST_LOG`. Safe to call more than once; if a logger is already
/// installed, it stays.
pub fn init_logger() {
    let _ = env_logger::Builder::new().parse_default_env().try_init();
}

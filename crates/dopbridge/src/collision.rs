//! Keep collision proxies in step with the colliders of an object.

use partsim::Container;

use crate::config::SolverConfig;
use crate::data::SolverData;
use crate::error::SolveError;
use crate::proxy_cache::ProxyEntry;
use crate::scene::{Collider, ObjectId};
use crate::trimesh;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CollisionReport {
    /// Proxies rebuilt this tick
    pub rebuilt: usize,
    /// Proxies removed because their collider is no longer related
    pub evicted: usize,
    /// Proxies bound for the tick
    pub bound: usize,
}

/// Rebuild stale proxies for `colliders` and bind the full set.
///
/// `object` itself and colliders without geometry are skipped. A proxy whose
/// collider position data id is unchanged is left as it is.
pub fn update_collision<C: Container>(
    data: &mut SolverData<C>,
    object: ObjectId,
    colliders: &[Collider],
    config: &SolverConfig,
) -> Result<CollisionReport, SolveError> {
    let mut report = CollisionReport::default();
    data.proxies.begin_pass();

    for collider in colliders {
        if collider.id == object {
            continue;
        }
        let Some(geometry) = collider.geometry.as_deref() else {
            continue;
        };
        data.proxies.mark(collider.id);

        let stamp = geometry.position_data_id();
        if !data.proxies.needs_rebuild(collider.id, stamp) {
            continue;
        }

        log::debug!("Rebuilding collision proxy for object {}", collider.id);
        let proxy = data.container.add_triangle_mesh(&collider.id.to_string());
        {
            let mut mesh = data.container.map_triangle_mesh(proxy)?;
            trimesh::write_proxy(geometry, &mut mesh);
        }
        data.proxies.insert(ProxyEntry {
            key: collider.id,
            stamp,
            proxy,
        });
        report.rebuilt += 1;
    }

    if config.evict_stale_proxies {
        for entry in data.proxies.sweep() {
            log::debug!("Evicting collision proxy for object {}", entry.key);
            data.container.remove_triangle_mesh(entry.proxy);
            report.evicted += 1;
        }
    }

    data.container.bind_collision();
    report.bound = data.proxies.len();
    Ok(report)
}

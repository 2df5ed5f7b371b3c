// src/cache.rs
// Height-indexed mesh cache. Meshes are expensive to generate and a camera
// bobbing around one height can reuse one mesh as long as the intersection
// count it delivers stays within tolerance.

use std::sync::{Arc, Mutex, PoisonError};

use log::debug;

use crate::error::MeshResult;
use crate::geometry::{Shape, ShapeSignature};
use crate::mesh::Mesh;
use crate::Scalar;

struct CacheEntry {
    signature: ShapeSignature,
    mesh: Arc<Mesh>,
}

/// Least-recently-used cache of generated meshes.
///
/// Entries are held by shared ownership: a caller that received a mesh keeps
/// it alive even after eviction. The most recently selected entry sits at the
/// front; eviction pops from the tail.
#[derive(Default)]
pub struct MeshCache {
    entries: Mutex<Vec<CacheEntry>>,
}

impl MeshCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fetch a mesh usable for `shape` at height `h`, generating one if no
    /// cached mesh delivers an intersection count within `tolerance` (as a
    /// fraction of the shape's configured count).
    ///
    /// Generation happens outside the lock; the cache is re-searched after
    /// re-acquiring it so two concurrent builders converge on one entry.
    pub fn get<S: Shape>(
        &self,
        shape: &S,
        h: Scalar,
        tolerance: Scalar,
        capacity: usize,
        max_distance: Scalar,
        min_angular_res: Scalar,
    ) -> MeshResult<Arc<Mesh>> {
        let signature = shape.signature();

        {
            let mut entries = self.lock();
            if let Some(mesh) = find(&mut entries, shape, &signature, h, tolerance, max_distance)
            {
                return Ok(mesh);
            }
        }

        let mesh = Arc::new(Mesh::generate(shape, h, max_distance, min_angular_res)?);

        let mut entries = self.lock();
        if let Some(existing) = find(&mut entries, shape, &signature, h, tolerance, max_distance)
        {
            return Ok(existing);
        }

        entries.insert(
            0,
            CacheEntry {
                signature,
                mesh: mesh.clone(),
            },
        );
        while entries.len() > capacity {
            if let Some(evicted) = entries.pop() {
                debug!("evicting mesh at h={}", evicted.mesh.h);
            }
        }
        Ok(mesh)
    }

    /// Number of cached meshes.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Heights currently cached, most recently used first.
    pub fn heights(&self) -> Vec<Scalar> {
        self.lock().iter().map(|e| e.mesh.h).collect()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<CacheEntry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Best matching entry within tolerance, promoted to the front.
///
/// The match error is the absolute intersection-count deviation the candidate
/// mesh would exhibit at the requested height.
fn find<S: Shape>(
    entries: &mut Vec<CacheEntry>,
    shape: &S,
    signature: &ShapeSignature,
    h: Scalar,
    tolerance: Scalar,
    max_distance: Scalar,
) -> Option<Arc<Mesh>> {
    let n = signature.intersections;
    let mut best: Option<(usize, Scalar)> = None;

    for (i, entry) in entries.iter().enumerate() {
        if entry.signature != *signature || entry.mesh.max_distance != max_distance {
            continue;
        }
        let error = (n - n * shape.k(entry.mesh.h, h)).abs();
        if best.map_or(true, |(_, b)| error < b) {
            best = Some((i, error));
        }
    }

    match best {
        Some((i, error)) if error <= tolerance * n => {
            let entry = entries.remove(i);
            let mesh = entry.mesh.clone();
            entries.insert(0, entry);
            debug!("mesh cache hit: h={} for request h={h} (error {error})", mesh.h);
            Some(mesh)
        }
        _ => None,
    }
}

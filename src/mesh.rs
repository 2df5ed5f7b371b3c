// src/mesh.rs
// Ray lattice generation: sweeps rings of unit rays between nadir and zenith and
// stitches them into a six-neighbour graph with constant object sample density.

use std::f64::consts::{FRAC_PI_2, PI, TAU};

use glam::DVec3;
use log::{debug, warn};

use crate::error::{MeshError, MeshResult};
use crate::geometry::Shape;
use crate::Scalar;

/// Hard cap on nodes per ring; reaching it truncates the sweep.
pub const MAX_RING_SIZE: usize = 1 << 20;

/// Neighbour slot order within [`Node::neighbours`].
pub mod slot {
    pub const TL: usize = 0;
    pub const TR: usize = 1;
    pub const L: usize = 2;
    pub const R: usize = 3;
    pub const BL: usize = 4;
    pub const BR: usize = 5;
}

/// One sampling direction and its links into the surrounding hex graph.
///
/// Neighbour entries are offsets relative to this node's own index in the node
/// table, ordered TL, TR, L, R, BL, BR. Adding an offset to the node's index
/// always lands inside the table.
#[derive(Debug, Clone, Copy)]
pub struct Node {
    /// Unit direction in the world frame, z up; below-horizon rays have negative z.
    pub ray: DVec3,
    pub neighbours: [i32; 6],
}

/// Directory entry for one ring of constant polar angle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Row {
    pub phi: Scalar,
    /// First node of the ring in the node table.
    pub begin: usize,
    /// One past the last node of the ring.
    pub end: usize,
}

impl Row {
    pub fn len(&self) -> usize {
        self.end - self.begin
    }

    pub fn is_empty(&self) -> bool {
        self.begin == self.end
    }
}

/// A generated visual mesh: rings of unit rays sorted by polar angle, each ring
/// swept in azimuth starting at theta = 0, with hex neighbour links.
#[derive(Debug, Clone)]
pub struct Mesh {
    pub nodes: Vec<Node>,
    pub rows: Vec<Row>,
    /// Camera height this mesh was generated for.
    pub h: Scalar,
    /// Ground distance beyond which rings were not generated.
    pub max_distance: Scalar,
}

impl Mesh {
    /// Generate a mesh for `shape` with the camera at height `h`.
    ///
    /// `max_distance` truncates the downward sweep once rays land that far out
    /// on the ground; `min_angular_res` floors both the ring spacing and the
    /// azimuthal node spacing so degenerate shapes cannot stall the sweep.
    pub fn generate<S: Shape>(
        shape: &S,
        h: Scalar,
        max_distance: Scalar,
        min_angular_res: Scalar,
    ) -> MeshResult<Self> {
        if !(h.is_finite() && h > 0.0) {
            return Err(MeshError::invalid_input("height must be finite and positive"));
        }
        if !(max_distance.is_finite() && max_distance > 0.0) {
            return Err(MeshError::invalid_input(
                "max distance must be finite and positive",
            ));
        }
        if !(min_angular_res.is_finite() && min_angular_res > 0.0) {
            return Err(MeshError::invalid_input(
                "minimum angular resolution must be finite and positive",
            ));
        }

        // Ring plan: (phi, node count) gathered from both sweeps.
        let mut rings: Vec<(Scalar, usize)> = Vec::new();

        // Downward sweep, from just off the nadir out to the horizon. Half a
        // step first so there is no degenerate point at the pole.
        let mut phi = shape.phi(0.0, h) * 0.5;
        while phi.is_finite() && phi < FRAC_PI_2 {
            if h * phi.tan() > max_distance {
                break;
            }
            if !push_ring(&mut rings, shape, phi, h, min_angular_res) {
                break;
            }
            let next = shape.phi(phi, h);
            if next.is_nan() {
                break;
            }
            phi = next.max(phi + min_angular_res);
        }

        // Upward sweep, from just off the zenith down to the horizon. Shapes
        // with no extent above the camera return NaN immediately.
        let mut phi = (PI + shape.phi(PI, h)) * 0.5;
        while phi.is_finite() && phi > FRAC_PI_2 {
            if !push_ring(&mut rings, shape, phi, h, min_angular_res) {
                break;
            }
            let next = shape.phi(phi, h);
            if next.is_nan() {
                break;
            }
            phi = next.min(phi - min_angular_res);
        }

        // The sweeps run in opposite directions; a single sort gives the
        // contiguous ascending ring order the rest of the crate relies on.
        rings.sort_by(|a, b| a.0.total_cmp(&b.0));

        let total: usize = rings.iter().map(|r| r.1).sum();
        let mut nodes: Vec<Node> = Vec::with_capacity(total);
        let mut rows: Vec<Row> = Vec::with_capacity(rings.len());

        for &(phi, steps) in &rings {
            let begin = nodes.len();
            rows.push(Row {
                phi,
                begin,
                end: begin + steps,
            });

            let (sin_phi, cos_phi) = phi.sin_cos();
            let dtheta = TAU / steps as Scalar;
            for i in 0..steps {
                let theta = i as Scalar * dtheta;
                let l = if i == 0 { steps - 1 } else { i - 1 };
                let r = if i == steps - 1 { 0 } else { i + 1 };
                let mut neighbours = [0i32; 6];
                neighbours[slot::L] = l as i32 - i as i32;
                neighbours[slot::R] = r as i32 - i as i32;
                nodes.push(Node {
                    ray: DVec3::new(theta.cos() * sin_phi, theta.sin() * sin_phi, -cos_phi),
                    neighbours,
                });
            }
        }

        link_rows(&mut nodes, &rows);

        debug!(
            "generated mesh: h={h} rows={} nodes={} max_distance={max_distance}",
            rows.len(),
            nodes.len()
        );

        Ok(Mesh {
            nodes,
            rows,
            h,
            max_distance,
        })
    }
}

/// Record one ring if the shape admits a spacing there. Returns false when the
/// sweep has to stop because the ring would exceed the size cap.
fn push_ring<S: Shape>(
    rings: &mut Vec<(Scalar, usize)>,
    shape: &S,
    phi: Scalar,
    h: Scalar,
    min_angular_res: Scalar,
) -> bool {
    let theta = shape.theta(phi, h);
    if !theta.is_finite() {
        // No valid spacing at this angle; skip the ring, keep sweeping.
        return true;
    }
    let steps = (TAU / theta.max(min_angular_res)).ceil() as usize;
    if steps > MAX_RING_SIZE {
        warn!("ring at phi={phi} wants {steps} nodes, over the cap; truncating sweep");
        return false;
    }
    rings.push((phi, steps.max(1)));
    true
}

/// Stitch the TL/TR and BL/BR links between adjacent rings, and close the two
/// boundary rings over their poles.
fn link_rows(nodes: &mut [Node], rows: &[Row]) {
    if rows.is_empty() {
        return;
    }

    for r in 1..rows.len().saturating_sub(1) {
        let (prev, current, next) = (rows[r - 1], rows[r], rows[r + 1]);
        for i in current.begin..current.end {
            let pos = (i - current.begin) as Scalar / current.len() as Scalar;
            link(nodes, i, pos, prev.begin, prev.len(), slot::TL);
            link(nodes, i, pos, next.begin, next.len(), slot::BL);
        }
    }

    // The first ring has nothing above it: its upper links jump the pole to
    // the diametrically opposite node of the same ring.
    let front = rows[0];
    for i in front.begin..front.end {
        let opposite = i - front.begin + front.len() / 2;
        nodes[i].neighbours[slot::TL] =
            offset(front.begin + opposite % front.len(), i);
        nodes[i].neighbours[slot::TR] =
            offset(front.begin + (opposite + 1) % front.len(), i);
        if rows.len() > 1 {
            let pos = (i - front.begin) as Scalar / front.len() as Scalar;
            link(nodes, i, pos, rows[1].begin, rows[1].len(), slot::BL);
        } else {
            nodes[i].neighbours[slot::BL] = nodes[i].neighbours[slot::TL];
            nodes[i].neighbours[slot::BR] = nodes[i].neighbours[slot::TR];
        }
    }

    if rows.len() > 1 {
        let back = rows[rows.len() - 1];
        for i in back.begin..back.end {
            let opposite = i - back.begin + back.len() / 2;
            nodes[i].neighbours[slot::BL] =
                offset(back.begin + opposite % back.len(), i);
            nodes[i].neighbours[slot::BR] =
                offset(back.begin + (opposite + 1) % back.len(), i);
            let pos = (i - back.begin) as Scalar / back.len() as Scalar;
            let prev = rows[rows.len() - 2];
            link(nodes, i, pos, prev.begin, prev.len(), slot::TL);
        }
    }
}

/// Link node `i` (at azimuthal position `pos` in its own ring) to the two
/// nearest nodes of the ring starting at `start` with `size` nodes, writing
/// the pair at `first_slot` and `first_slot + 1`.
///
/// Only the anchor index is computed directly; its partner is reached through
/// the anchor's stored L or R offset so the index arithmetic never wraps past
/// the end of the target ring.
fn link(nodes: &mut [Node], i: usize, pos: Scalar, start: usize, size: usize, first_slot: usize) {
    if size == 1 {
        nodes[i].neighbours[first_slot] = offset(start, i);
        nodes[i].neighbours[first_slot + 1] = offset(start, i);
        return;
    }

    // When pos is past the midpoint the anchor sits to the left of the exact
    // position, otherwise one to the right; both stay strictly inside the ring.
    let left = pos > 0.5;
    let bias = usize::from(!left);
    let o1 = start + ((pos * size as Scalar).floor() as usize + bias).min(size - 1);
    let along = if left { slot::R } else { slot::L };
    let o2 = (o1 as i64 + nodes[o1].neighbours[along] as i64) as usize;

    let (first, second) = if left { (o1, o2) } else { (o2, o1) };
    nodes[i].neighbours[first_slot] = offset(first, i);
    nodes[i].neighbours[first_slot + 1] = offset(second, i);
}

fn offset(target: usize, from: usize) -> i32 {
    (target as i64 - from as i64) as i32
}

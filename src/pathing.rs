//! Movement path constraint solver.
//!
//! Given the waypoints a mover asked for, [`constrain_path`] returns a path
//! that never enters a cell held by a blocking occupant. The host plugs in
//! through [`PathHost`]: it answers occupancy queries and runs its own
//! geometric pass (walls, movement cost) over candidate paths.
//!
//! The solver iterates to a fixed point, bounded at ten rounds:
//! 1. Expand the path to one waypoint per grid cell.
//! 2. Find the first cell that is blocked and cut the path one cell short of
//!    it, keeping only authored waypoints plus the last safe cell.
//! 3. On the first round, or after a cut, run the geometric pass. No change
//!    from it means the path is final.
//! 4. A round with no cut and no geometric pass is also final.
//!
//! If ten rounds do not settle, the last authored waypoint is dropped and the
//! shorter request is solved instead, so the mover may stop short of where
//! it asked to go.

use log::{debug, warn};
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::resources::gridgeometry::GridGeometry;

const MAX_ROUNDS: usize = 10;

/// One point of a movement path, in pixels (top-left of the footprint).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Waypoint {
    pub x: f32,
    pub y: f32,
    #[serde(default)]
    pub elevation: f32,
    /// Footprint in grid cells.
    pub width: f32,
    pub height: f32,
    /// Inserted by path expansion rather than requested by the mover.
    #[serde(default)]
    pub intermediate: bool,
}

impl Waypoint {
    pub fn new(x: f32, y: f32) -> Self {
        Self {
            x,
            y,
            elevation: 0.0,
            width: 1.0,
            height: 1.0,
            intermediate: false,
        }
    }

    pub fn with_elevation(mut self, elevation: f32) -> Self {
        self.elevation = elevation;
        self
    }

    pub fn with_size(mut self, width: f32, height: f32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    pub fn as_intermediate(mut self) -> Self {
        self.intermediate = true;
        self
    }
}

/// Grid cell on an elevation layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GridOffset {
    pub col: i32,
    pub row: i32,
    pub layer: i32,
}

impl GridOffset {
    pub fn new(col: i32, row: i32, layer: i32) -> Self {
        Self { col, row, layer }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConstrainOptions {
    /// The path is a drag preview; hidden occupants are not revealed by it.
    pub preview: bool,
    /// Skip occupant checks entirely (free movement).
    pub ignore_occupants: bool,
}

/// Host services the solver needs.
pub trait PathHost {
    fn grid(&self) -> GridGeometry;

    /// Whether occupants block movement at all.
    fn token_collision(&self) -> bool {
        true
    }

    /// Whether `cell` holds an occupant that blocks the mover.
    fn is_blocking(&self, cell: GridOffset, options: &ConstrainOptions) -> bool;

    /// Walls and movement-cost pass. Returns the adjusted path and whether it
    /// changed anything.
    fn geometric_constrain(
        &self,
        path: Vec<Waypoint>,
        _options: &ConstrainOptions,
    ) -> (Vec<Waypoint>, bool) {
        (path, false)
    }

    fn complete_path(&self, waypoints: &[Waypoint]) -> Vec<Waypoint> {
        complete_path(&self.grid(), waypoints)
    }

    fn occupied_offsets(&self, waypoint: &Waypoint) -> SmallVec<[GridOffset; 4]> {
        occupied_offsets(&self.grid(), waypoint)
    }
}

/// Expand a path so consecutive waypoints are at most one cell apart.
///
/// Inserted points are marked intermediate, keep the sub-cell offset of the
/// segment start, and interpolate elevation.
pub fn complete_path(grid: &GridGeometry, waypoints: &[Waypoint]) -> Vec<Waypoint> {
    let mut out = Vec::with_capacity(waypoints.len());
    let Some(first) = waypoints.first() else {
        return out;
    };
    out.push(*first);
    for pair in waypoints.windows(2) {
        let (a, b) = (pair[0], pair[1]);
        let (ac, ar) = grid.cell_of(a.x, a.y);
        let (bc, br) = grid.cell_of(b.x, b.y);
        let (dc, dr) = (bc - ac, br - ar);
        let steps = dc.abs().max(dr.abs());
        for s in 1..steps {
            let t = s as f32 / steps as f32;
            let c = (dc as f32 * t).round();
            let r = (dr as f32 * t).round();
            out.push(Waypoint {
                x: a.x + c * grid.cell_width,
                y: a.y + r * grid.cell_height,
                elevation: a.elevation + (b.elevation - a.elevation) * t,
                width: b.width,
                height: b.height,
                intermediate: true,
            });
        }
        out.push(b);
    }
    out
}

/// Cells covered by a waypoint's footprint on its elevation layer.
pub fn occupied_offsets(grid: &GridGeometry, waypoint: &Waypoint) -> SmallVec<[GridOffset; 4]> {
    let (col, row) = grid.cell_of(waypoint.x, waypoint.y);
    let layer = grid.layer(waypoint.elevation);
    let w = (waypoint.width.round() as i32).max(1);
    let h = (waypoint.height.round() as i32).max(1);
    let mut cells = SmallVec::new();
    for r in 0..h {
        for c in 0..w {
            cells.push(GridOffset::new(col + c, row + r, layer));
        }
    }
    cells
}

fn waypoint_blocked<H: PathHost + ?Sized>(
    host: &H,
    waypoint: &Waypoint,
    options: &ConstrainOptions,
) -> bool {
    host.occupied_offsets(waypoint)
        .into_iter()
        .any(|cell| host.is_blocking(cell, options))
}

/// Constrain `waypoints` against occupants and the host's geometric pass.
///
/// Returns the constrained path and whether it differs from the request.
/// Occupant checks are skipped when collisions are off, when the caller
/// asks to ignore occupants, or when the footprint changes along the path.
pub fn constrain_path<H: PathHost + ?Sized>(
    host: &H,
    waypoints: &[Waypoint],
    options: &ConstrainOptions,
) -> (Vec<Waypoint>, bool) {
    let resized = waypoints.first().is_some_and(|first| {
        waypoints
            .iter()
            .any(|w| w.width != first.width || w.height != first.height)
    });
    if options.ignore_occupants || !host.token_collision() || resized {
        return host.geometric_constrain(waypoints.to_vec(), options);
    }

    let mut path = waypoints.to_vec();
    let mut constrained = false;

    for round in 0..MAX_ROUNDS {
        let complete = host.complete_path(&path);
        let blocked_at =
            (1..complete.len()).find(|&i| waypoint_blocked(host, &complete[i], options));

        if let Some(i) = blocked_at {
            debug!("Path blocked at step {} of {}", i, complete.len());
            path = complete[..i - 1]
                .iter()
                .filter(|w| !w.intermediate)
                .copied()
                .collect();
            path.push(complete[i - 1]);
            constrained = true;
        }

        if round == 0 || blocked_at.is_some() {
            let (next, changed) = host.geometric_constrain(path, options);
            path = next;
            if !changed {
                return (path, constrained);
            }
            constrained = true;
        } else {
            return (path, constrained);
        }
    }

    if waypoints.len() <= 1 {
        warn!("Path did not settle; staying put");
        return (waypoints.to_vec(), true);
    }
    warn!(
        "Path did not settle after {} rounds; dropping the last waypoint",
        MAX_ROUNDS
    );
    let (path, _) = constrain_path(host, &waypoints[..waypoints.len() - 1], options);
    (path, true)
}

/// Pre-filter a requested path before it is constrained.
///
/// With collisions on, the path is expanded cell by cell and intermediate
/// points are dropped again, except the ones right before a blocked cell, so
/// that running into an occupant stops the mover next to it.
pub fn find_movement_path<H: PathHost + ?Sized>(host: &H, waypoints: &[Waypoint]) -> Vec<Waypoint> {
    if !host.token_collision() {
        return waypoints.to_vec();
    }
    let options = ConstrainOptions::default();
    let complete = host.complete_path(waypoints);
    complete
        .iter()
        .enumerate()
        .filter(|(i, w)| {
            !w.intermediate
                || complete
                    .get(i + 1)
                    .is_some_and(|next| waypoint_blocked(host, next, &options))
        })
        .map(|(_, w)| *w)
        .collect()
}

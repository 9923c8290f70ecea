//! Centerline graph, per-point radius field and the interior-neighbor walk.

use std::collections::HashMap;

use serde_derive::{Deserialize, Serialize};

use crate::error::CapError;
use crate::geo::{to_vec3, Vec3};

/// A polyline graph: point positions and two-point line cells.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Centerline {
    pub points: Vec<[f64; 3]>,
    pub cells: Vec<[usize; 2]>,
}

impl Centerline {
    pub fn new(points: Vec<[f64; 3]>, cells: Vec<[usize; 2]>) -> Self {
        Self { points, cells }
    }

    /// Chains `points` into consecutive cells `[i, i + 1]`.
    pub fn from_polyline(points: Vec<[f64; 3]>) -> Self {
        let cells = (1..points.len()).map(|i| [i - 1, i]).collect();
        Self { points, cells }
    }

    pub fn num_points(&self) -> usize {
        self.points.len()
    }

    pub fn point(&self, pid: usize) -> Result<Vec3, CapError> {
        self.points
            .get(pid)
            .map(to_vec3)
            .ok_or(CapError::UnknownPoint(pid))
    }

    pub fn cell(&self, cid: usize) -> Result<[usize; 2], CapError> {
        self.cells.get(cid).copied().ok_or(CapError::UnknownCell(cid))
    }
}

/// Maximal inscribed sphere radius per centerline point.
pub trait RadiusField: Sync {
    fn radius(&self, pid: usize) -> Option<f64>;
}

impl RadiusField for [f64] {
    fn radius(&self, pid: usize) -> Option<f64> {
        self.get(pid).copied()
    }
}

impl RadiusField for Vec<f64> {
    fn radius(&self, pid: usize) -> Option<f64> {
        self.as_slice().radius(pid)
    }
}

impl RadiusField for HashMap<usize, f64> {
    fn radius(&self, pid: usize) -> Option<f64> {
        self.get(&pid).copied()
    }
}

/// Looks up a radius that must exist and be positive.
pub fn required_radius(radii: &dyn RadiusField, pid: usize) -> Result<f64, CapError> {
    let radius = radii.radius(pid).ok_or(CapError::MissingRadius(pid))?;
    if !(radius.is_finite() && radius > 0.0) {
        return Err(CapError::NonPositiveRadius { pid, radius });
    }
    Ok(radius)
}

/// How to pick the interior neighbor when several candidate cells touch the
/// terminal point.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NeighborPolicy {
    /// Every matching cell must lead to the same neighbor.
    #[default]
    Unique,
    /// The first matching cell in candidate order wins.
    FirstMatch,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InteriorNeighbor {
    /// Centerline point adjacent to the terminal point.
    pub pid: usize,
    /// Cell joining the two.
    pub cid: usize,
    pub position: Vec3,
}

/// Finds the point one cell away from `end_pid` among `end_cell_ids`.
///
/// Connectivity comes from `centerlines`, the neighbor position from
/// `geometry` (the branch's own slice, which shares point ids).
pub fn find_interior_neighbor(
    centerlines: &Centerline,
    geometry: &Centerline,
    end_pid: usize,
    end_cell_ids: &[usize],
    policy: NeighborPolicy,
) -> Result<InteriorNeighbor, CapError> {
    let mut found: Option<(usize, usize)> = None;
    for &cid in end_cell_ids {
        let [pid1, pid2] = centerlines.cell(cid)?;
        let other = if pid1 == end_pid {
            pid2
        } else if pid2 == end_pid {
            pid1
        } else {
            continue;
        };
        match found {
            None => {
                found = Some((cid, other));
                if policy == NeighborPolicy::FirstMatch {
                    break;
                }
            }
            Some((first_cid, first_pid)) if first_pid != other => {
                return Err(CapError::AmbiguousNeighbor {
                    end_pid,
                    first_cid,
                    first_pid,
                    second_cid: cid,
                    second_pid: other,
                });
            }
            Some(_) => {}
        }
    }
    let (cid, pid) = found.ok_or(CapError::BranchTopology { end_pid })?;
    Ok(InteriorNeighbor {
        pid,
        cid,
        position: geometry.point(pid)?,
    })
}

//! Cutting a triangle mesh with an implicit function.

use std::collections::HashMap;

use serde_derive::{Deserialize, Serialize};

use crate::error::CapError;
use crate::geo::{ImplicitFunction, Vec3};
use crate::mesh::TriMesh;

/// Which side of the implicit function survives the cut.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Keep {
    /// Negative values.
    #[default]
    Inside,
    /// Positive values.
    Outside,
}

impl Keep {
    fn sign(self) -> f64 {
        match self {
            Keep::Inside => -1.0,
            Keep::Outside => 1.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Side {
    Kept,
    On,
    Removed,
}

/// Result of a cut. Vertices along the cut appear in both pieces.
#[derive(Debug, Clone, PartialEq)]
pub struct ClipOutput {
    pub kept: TriMesh,
    pub clipped: TriMesh,
}

#[derive(Debug, Clone, Copy)]
pub struct SurfaceClipper {
    pub keep: Keep,
    /// Vertices with `|f| <= tolerance` lie on the cut.
    pub tolerance: f64,
}

const MAX_BISECTION: usize = 64;

impl SurfaceClipper {
    pub fn new(keep: Keep, tolerance: f64) -> Self {
        Self { keep, tolerance }
    }

    /// Splits `surface` along `func = 0`.
    ///
    /// Triangles with no kept vertex go to `clipped`, triangles with no
    /// removed vertex go to `kept`, the rest are cut. Points on shared edges
    /// are created once so the two pieces meet without cracks.
    pub fn clip(&self, surface: &TriMesh, func: &dyn ImplicitFunction) -> ClipOutput {
        let sign = self.keep.sign();
        let vtx2val: Vec<f64> = (0..surface.num_vtx())
            .map(|i| sign * func.value(&surface.position(i)))
            .collect();
        let vtx2side: Vec<Side> = vtx2val.iter().map(|&v| self.side(v)).collect();

        let mut vtx2xyz = surface.vtx2xyz.clone();
        let mut edge2vtx = HashMap::<(usize, usize), usize>::new();
        let mut kept = Vec::<usize>::new();
        let mut clipped = Vec::<usize>::new();

        for tri in surface.tri2vtx.chunks_exact(3) {
            let sides = [vtx2side[tri[0]], vtx2side[tri[1]], vtx2side[tri[2]]];
            let has_kept = sides.contains(&Side::Kept);
            let has_removed = sides.contains(&Side::Removed);
            if !has_kept {
                clipped.extend_from_slice(tri);
                continue;
            }
            if !has_removed {
                kept.extend_from_slice(tri);
                continue;
            }
            let mut poly_kept = Vec::<usize>::with_capacity(4);
            let mut poly_clipped = Vec::<usize>::with_capacity(4);
            for k in 0..3 {
                let (a, b) = (tri[k], tri[(k + 1) % 3]);
                let (sa, sb) = (vtx2side[a], vtx2side[b]);
                if sa != Side::Removed {
                    poly_kept.push(a);
                }
                if sa != Side::Kept {
                    poly_clipped.push(a);
                }
                let crosses = matches!(
                    (sa, sb),
                    (Side::Kept, Side::Removed) | (Side::Removed, Side::Kept)
                );
                if crosses {
                    let key = (a.min(b), a.max(b));
                    let iv = *edge2vtx.entry(key).or_insert_with(|| {
                        let p = self.crossing(surface, func, sign, key, &vtx2val);
                        let iv = vtx2xyz.len() / 3;
                        vtx2xyz.extend_from_slice(p.as_slice());
                        iv
                    });
                    poly_kept.push(iv);
                    poly_clipped.push(iv);
                }
            }
            let strict = |i: usize, side: Side| i < vtx2side.len() && vtx2side[i] == side;
            fan(&poly_kept, |i| strict(i, Side::Kept), &mut kept);
            fan(&poly_clipped, |i| strict(i, Side::Removed), &mut clipped);
        }

        ClipOutput {
            kept: TriMesh::new(kept, vtx2xyz.clone()).remove_unreferenced_vertices(),
            clipped: TriMesh::new(clipped, vtx2xyz).remove_unreferenced_vertices(),
        }
    }

    /// Like [`Self::clip`] but keeps only the retained piece, failing when
    /// nothing is left.
    pub fn clip_kept(
        &self,
        surface: &TriMesh,
        func: &dyn ImplicitFunction,
    ) -> Result<TriMesh, CapError> {
        let out = self.clip(surface, func);
        if out.kept.is_empty() {
            return Err(CapError::EmptyClipResult);
        }
        Ok(out.kept)
    }

    fn side(&self, v: f64) -> Side {
        if v.abs() <= self.tolerance {
            Side::On
        } else if v > 0.0 {
            Side::Kept
        } else {
            Side::Removed
        }
    }

    /// Point where the edge `(i0, i1)` crosses zero: linear interpolation,
    /// refined by bisection when the function is not linear along the edge.
    fn crossing(
        &self,
        surface: &TriMesh,
        func: &dyn ImplicitFunction,
        sign: f64,
        (i0, i1): (usize, usize),
        vtx2val: &[f64],
    ) -> Vec3 {
        let p0 = surface.position(i0);
        let p1 = surface.position(i1);
        let (v0, v1) = (vtx2val[i0], vtx2val[i1]);
        let at = |t: f64| p0 + (p1 - p0).scale(t);
        let t = v0 / (v0 - v1);
        let p = at(t);
        if (sign * func.value(&p)).abs() <= self.tolerance {
            return p;
        }
        let (mut lo, mut hi) = (0.0, 1.0);
        let mut mid = t;
        for _ in 0..MAX_BISECTION {
            mid = 0.5 * (lo + hi);
            let v = sign * func.value(&at(mid));
            if v.abs() <= self.tolerance {
                break;
            }
            if (v > 0.0) == (v0 > 0.0) {
                lo = mid;
            } else {
                hi = mid;
            }
        }
        at(mid)
    }
}

/// Triangulates a convex polygon as a fan from its first vertex that
/// satisfies `is_anchor`, so every output triangle touches that side.
fn fan(poly: &[usize], is_anchor: impl Fn(usize) -> bool, tri2vtx: &mut Vec<usize>) {
    if poly.len() < 3 {
        return;
    }
    let start = poly.iter().position(|&i| is_anchor(i)).unwrap_or(0);
    let n = poly.len();
    for k in 1..n - 1 {
        tri2vtx.push(poly[start]);
        tri2vtx.push(poly[(start + k) % n]);
        tri2vtx.push(poly[(start + k + 1) % n]);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo::{Plane, Sphere};
    use crate::tube::tube_along;

    fn sorted_points(m: &TriMesh) -> Vec<[u64; 3]> {
        let mut pts: Vec<[u64; 3]> = m
            .vtx2xyz
            .chunks_exact(3)
            .map(|c| [c[0].to_bits(), c[1].to_bits(), c[2].to_bits()])
            .collect();
        pts.sort_unstable();
        pts
    }

    fn z_tube() -> TriMesh {
        let points: Vec<Vec3> = (0..=10).map(|i| Vec3::new(0.0, 0.0, i as f64)).collect();
        tube_along(&points, &[1.0; 11], 16, true).unwrap()
    }

    fn z_plane(z: f64) -> Plane {
        Plane {
            origin: Vec3::new(0.0, 0.0, z),
            normal: Vec3::z(),
        }
    }

    #[test]
    fn plane_cut_splits_area() {
        let tube = z_tube();
        let clipper = SurfaceClipper::new(Keep::Inside, 1.0e-9);
        let out = clipper.clip(&tube, &z_plane(4.5));
        assert!(out.kept.vtx2xyz.chunks_exact(3).all(|c| c[2] <= 4.5 + 1e-9));
        assert!(out.clipped.vtx2xyz.chunks_exact(3).all(|c| c[2] >= 4.5 - 1e-9));
        assert!((out.kept.area() + out.clipped.area() - tube.area()).abs() < 1e-9);
        // Both pieces share the cut vertices.
        let on_cut = |m: &TriMesh| {
            m.vtx2xyz
                .chunks_exact(3)
                .filter(|c| (c[2] - 4.5).abs() < 1e-9)
                .count()
        };
        let cut_kept = on_cut(&out.kept);
        let cut_clipped = on_cut(&out.clipped);
        assert_eq!(cut_kept, 32);
        assert_eq!(cut_clipped, 32);
    }

    #[test]
    fn keep_outside_flips_the_pieces() {
        let tube = z_tube();
        let inside = SurfaceClipper::new(Keep::Inside, 1.0e-9).clip(&tube, &z_plane(4.5));
        let outside = SurfaceClipper::new(Keep::Outside, 1.0e-9).clip(&tube, &z_plane(4.5));
        assert!((inside.kept.area() - outside.clipped.area()).abs() < 1e-9);
        assert!((inside.clipped.area() - outside.kept.area()).abs() < 1e-9);
    }

    #[test]
    fn cut_through_rings_keeps_them() {
        let tube = z_tube();
        let out = SurfaceClipper::new(Keep::Inside, 1.0e-9).clip(&tube, &z_plane(7.0));
        // Rings 0..=7, no new points.
        assert_eq!(out.kept.num_vtx(), 8 * 16);
        assert_eq!(out.kept.num_tri(), 7 * 32 + 14);
        assert!(out.kept.area() < tube.area());
    }

    #[test]
    fn reclip_is_a_no_op() {
        let tube = z_tube();
        let sphere = Sphere {
            center: Vec3::new(0.3, 0.0, 10.0),
            radius: 2.2,
        };
        let clipper = SurfaceClipper::new(Keep::Outside, 1.0e-9);
        let once = clipper.clip_kept(&tube, &sphere).unwrap();
        let twice = clipper.clip_kept(&once, &sphere).unwrap();
        assert_eq!(once.num_tri(), twice.num_tri());
        assert_eq!(sorted_points(&once), sorted_points(&twice));
        assert!((once.area() - twice.area()).abs() < 1e-12);
    }

    #[test]
    fn crossing_lands_on_curved_surface() {
        let tube = z_tube();
        let sphere = Sphere {
            center: Vec3::new(0.0, 0.0, 10.0),
            radius: 2.5,
        };
        let out = SurfaceClipper::new(Keep::Outside, 1.0e-9).clip(&tube, &sphere);
        let on_cut = out
            .kept
            .vtx2xyz
            .chunks_exact(3)
            .map(|c| sphere.value(&Vec3::new(c[0], c[1], c[2])))
            .filter(|v| v.abs() < 1e-6)
            .count();
        assert!(on_cut > 0);
        assert!(out
            .kept
            .vtx2xyz
            .chunks_exact(3)
            .all(|c| sphere.value(&Vec3::new(c[0], c[1], c[2])) >= -1e-9));
    }

    #[test]
    fn everything_removed_is_empty() {
        let tube = z_tube();
        let err = SurfaceClipper::new(Keep::Inside, 1.0e-9)
            .clip_kept(&tube, &z_plane(-1.0))
            .unwrap_err();
        assert_eq!(err, CapError::EmptyClipResult);
        let out = SurfaceClipper::new(Keep::Inside, 1.0e-9).clip(&tube, &z_plane(-1.0));
        assert_eq!(out.clipped.num_tri(), tube.num_tri());
    }
}

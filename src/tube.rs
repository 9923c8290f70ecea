//! Closed tube surfaces swept along a centerline polyline.
//!
//! Each centerline point gets a ring of `m` vertices; ring `i` occupies
//! vertices `i * m .. (i + 1) * m`. Used to build synthetic vessels.

use crate::centerline::Centerline;
use crate::error::CapError;
use crate::geo::{orthonormal_frame, try_normalize, Vec3};
use crate::mesh::TriMesh;

/// Triangles joining `num_ring` consecutive rings of `m` vertices, with a
/// triangle fan closing the first and last ring when `capped`.
pub fn tri2vtx_tube(num_ring: usize, m: usize, capped: bool) -> Vec<usize> {
    let mut tri2vtx = Vec::<usize>::new();
    if num_ring < 2 || m < 3 {
        return tri2vtx;
    }
    if capped {
        let ip1 = 0;
        for i in 0..m - 2 {
            tri2vtx.push(ip1 * m);
            tri2vtx.push(ip1 * m + (i + 2) % m);
            tri2vtx.push(ip1 * m + (i + 1) % m);
        }
    }
    for ip0 in 0..num_ring - 1 {
        let ip1 = ip0 + 1;
        for i in 0..m {
            tri2vtx.push(ip1 * m + i);
            tri2vtx.push(ip0 * m + i);
            tri2vtx.push(ip0 * m + (1 + i) % m);
            //
            tri2vtx.push(ip1 * m + i);
            tri2vtx.push(ip0 * m + (1 + i) % m);
            tri2vtx.push(ip1 * m + (1 + i) % m);
        }
    }
    if capped {
        let ip0 = num_ring - 1;
        for i in 0..m - 2 {
            tri2vtx.push(ip0 * m);
            tri2vtx.push(ip0 * m + (i + 1) % m);
            tri2vtx.push(ip0 * m + (i + 2) % m);
        }
    }
    tri2vtx
}

/// Ring frames `(x, y)` transported along the polyline so consecutive rings
/// do not twist.
fn ring_frames(points: &[Vec3]) -> Result<Vec<(Vec3, Vec3)>, CapError> {
    let n = points.len();
    let mut frames = Vec::with_capacity(n);
    let mut prev_x: Option<Vec3> = None;
    for i in 0..n {
        let a = points[i.saturating_sub(1)];
        let b = points[(i + 1).min(n - 1)];
        let (z, _) = try_normalize(&(b - a), "tube polyline has a zero-length segment")?;
        let x = match prev_x {
            None => orthonormal_frame(&z)?[1],
            Some(x0) => try_normalize(&(x0 - z.scale(x0.dot(&z))), "tube polyline folds back")?.0,
        };
        let y = z.cross(&x);
        prev_x = Some(x);
        frames.push((x, y));
    }
    Ok(frames)
}

/// Tube of radius `vtx2radius[i]` around point `i` of `points`, `m`
/// vertices per ring.
pub fn tube_along(
    points: &[Vec3],
    vtx2radius: &[f64],
    m: usize,
    capped: bool,
) -> Result<TriMesh, CapError> {
    if points.len() < 2 {
        return Err(CapError::DegenerateGeometry("tube needs at least two points"));
    }
    if m < 3 {
        return Err(CapError::DegenerateGeometry("tube needs at least three vertices per ring"));
    }
    let frames = ring_frames(points)?;
    let mut vtx2xyz = Vec::<f64>::with_capacity(points.len() * m * 3);
    for (ip, (p0, (x, y))) in points.iter().zip(frames.iter()).enumerate() {
        let r = match vtx2radius.get(ip) {
            Some(&r) if r > 0.0 => r,
            Some(&radius) => return Err(CapError::NonPositiveRadius { pid: ip, radius }),
            None => return Err(CapError::MissingRadius(ip)),
        };
        for i in 0..m {
            let theta = std::f64::consts::TAU * (i as f64) / (m as f64);
            let q = p0 + (x.scale(theta.cos()) + y.scale(theta.sin())).scale(r);
            q.iter().for_each(|&v| vtx2xyz.push(v));
        }
    }
    Ok(TriMesh::new(tri2vtx_tube(points.len(), m, capped), vtx2xyz))
}

/// Tube around a chained centerline (cells `[i, i + 1]`).
pub fn tube_around(
    centerline: &Centerline,
    vtx2radius: &[f64],
    m: usize,
    capped: bool,
) -> Result<TriMesh, CapError> {
    let points: Vec<Vec3> = (0..centerline.num_points())
        .map(|i| centerline.point(i))
        .collect::<Result<_, _>>()?;
    tube_along(&points, vtx2radius, m, capped)
}

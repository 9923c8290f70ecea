//! Vector helpers and the implicit functions used to cut surfaces.
//!
//! Implicit functions follow the usual sign convention: negative inside
//! (sphere, box) or behind the normal (plane), zero on the surface.

use nalgebra::{IsometryMatrix3, Point3, Rotation3, Translation3};

use crate::error::CapError;

pub type Vec3 = nalgebra::Vector3<f64>;

/// Below this length a vector is treated as zero.
pub const LENGTH_EPSILON: f64 = 1.0e-12;

/// Seeds whose cross product with the normal is shorter than this are
/// rejected as near-parallel.
const SEED_CROSS_EPSILON: f64 = 1.0e-6;

pub fn to_vec3(xyz: &[f64; 3]) -> Vec3 {
    Vec3::new(xyz[0], xyz[1], xyz[2])
}

pub fn distance(a: &Vec3, b: &Vec3) -> f64 {
    (a - b).norm()
}

/// Normalizes `v`, returning the unit vector and the original length.
pub fn try_normalize(v: &Vec3, what: &'static str) -> Result<(Vec3, f64), CapError> {
    let len = v.norm();
    if !len.is_finite() || len <= LENGTH_EPSILON {
        return Err(CapError::DegenerateGeometry(what));
    }
    Ok((v / len, len))
}

/// World axes ordered from least to most aligned with `n`.
pub fn seed_axes(n: &Vec3) -> [Vec3; 3] {
    let mut idx = [0usize, 1, 2];
    idx.sort_by(|&a, &b| n[a].abs().total_cmp(&n[b].abs()));
    idx.map(|i| {
        let mut e = Vec3::zeros();
        e[i] = 1.0;
        e
    })
}

/// Completes the unit vector `n` into a right-handed orthonormal frame
/// `[n, v1, v2]`.
///
/// The seed is the world axis least aligned with `n`; the remaining axes are
/// tried in turn if the cross product comes out too short.
pub fn orthonormal_frame(n: &Vec3) -> Result<[Vec3; 3], CapError> {
    let (n, _) = try_normalize(n, "frame normal has zero length")?;
    for seed in seed_axes(&n) {
        let v1 = n.cross(&seed);
        let len = v1.norm();
        if len < SEED_CROSS_EPSILON {
            continue;
        }
        let v1 = v1 / len;
        let v2 = n.cross(&v1);
        return Ok([n, v1, v2]);
    }
    Err(CapError::DegenerateGeometry("no frame seed is transverse to the normal"))
}

pub trait ImplicitFunction {
    fn value(&self, p: &Vec3) -> f64;
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sphere {
    pub center: Vec3,
    pub radius: f64,
}

impl Sphere {
    /// Axis-aligned bounds `[xmin, xmax, ymin, ymax, zmin, zmax]`.
    pub fn bounds(&self) -> [f64; 6] {
        let c = &self.center;
        let r = self.radius;
        [c.x - r, c.x + r, c.y - r, c.y + r, c.z - r, c.z + r]
    }
}

impl ImplicitFunction for Sphere {
    fn value(&self, p: &Vec3) -> f64 {
        distance(p, &self.center) - self.radius
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Plane {
    pub origin: Vec3,
    /// Unit normal; positive values lie on this side.
    pub normal: Vec3,
}

impl ImplicitFunction for Plane {
    fn value(&self, p: &Vec3) -> f64 {
        self.normal.dot(&(p - self.origin))
    }
}

/// A box given by bounds in its own frame and the rigid transform placing
/// that frame in world space.
#[derive(Debug, Clone, PartialEq)]
pub struct OrientedBox {
    /// `[xmin, xmax, ymin, ymax, zmin, zmax]` in the local frame.
    pub local_bounds: [f64; 6],
    /// Local to world.
    pub placement: IsometryMatrix3<f64>,
}

impl OrientedBox {
    /// Box centered at `center` with local axes `axes` (columns of the
    /// rotation) and the given local bounds relative to the center.
    pub fn new(center: &Vec3, axes: &[Vec3; 3], local_bounds: [f64; 6]) -> Self {
        let rotation = Rotation3::from_basis_unchecked(axes);
        let placement = IsometryMatrix3::from_parts(Translation3::from(*center), rotation);
        Self {
            local_bounds,
            placement,
        }
    }

    /// Cube bounding `sphere`, rotated about the sphere center onto `axes`.
    pub fn enclosing(sphere: &Sphere, axes: &[Vec3; 3]) -> Self {
        let local = Sphere {
            center: Vec3::zeros(),
            radius: sphere.radius,
        };
        Self::new(&sphere.center, axes, local.bounds())
    }

    pub fn center(&self) -> Vec3 {
        let b = &self.local_bounds;
        let c = Point3::new(
            0.5 * (b[0] + b[1]),
            0.5 * (b[2] + b[3]),
            0.5 * (b[4] + b[5]),
        );
        self.placement.transform_point(&c).coords
    }

    /// Local axes expressed in world coordinates.
    pub fn axes(&self) -> [Vec3; 3] {
        let m = self.placement.rotation.matrix();
        [
            m.column(0).into_owned(),
            m.column(1).into_owned(),
            m.column(2).into_owned(),
        ]
    }

    pub fn to_local(&self, p: &Vec3) -> Vec3 {
        self.placement
            .inverse_transform_point(&Point3::from(*p))
            .coords
    }

    /// The eight corners in world space, `x` varying fastest.
    pub fn corners(&self) -> [Vec3; 8] {
        let b = &self.local_bounds;
        std::array::from_fn(|i| {
            let q = Point3::new(
                b[i & 1],
                b[2 + ((i >> 1) & 1)],
                b[4 + ((i >> 2) & 1)],
            );
            self.placement.transform_point(&q).coords
        })
    }
}

impl ImplicitFunction for OrientedBox {
    /// Signed distance to the box surface.
    fn value(&self, p: &Vec3) -> f64 {
        let q = self.to_local(p);
        let b = &self.local_bounds;
        let mut outside = Vec3::zeros();
        let mut inside = f64::NEG_INFINITY;
        for i in 0..3 {
            let (lo, hi) = (b[2 * i], b[2 * i + 1]);
            let d = (lo - q[i]).max(q[i] - hi);
            outside[i] = d.max(0.0);
            inside = inside.max(d);
        }
        if inside > 0.0 {
            outside.norm()
        } else {
            inside
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{Rng, SeedableRng};

    fn random_unit(rng: &mut rand::rngs::StdRng) -> Vec3 {
        loop {
            let v = Vec3::new(
                rng.gen_range(-10.0..10.0),
                rng.gen_range(-10.0..10.0),
                rng.gen_range(-10.0..10.0),
            );
            if v.norm() > 1.0e-3 {
                return v.normalize();
            }
        }
    }

    #[test]
    fn normalize_rejects_zero_vector() {
        let err = try_normalize(&Vec3::zeros(), "zero").unwrap_err();
        assert_eq!(err, CapError::DegenerateGeometry("zero"));
        let (u, len) = try_normalize(&Vec3::new(0.0, 3.0, 4.0), "x").unwrap();
        assert!((len - 5.0).abs() < 1e-15);
        assert!((u.norm() - 1.0).abs() < 1e-15);
    }

    #[test]
    fn seed_is_least_aligned_axis() {
        let axes = seed_axes(&Vec3::new(0.1, -0.9, 0.4));
        assert_eq!(axes[0], Vec3::x());
        assert_eq!(axes[2], Vec3::y());
    }

    #[test]
    fn frame_is_orthonormal_for_random_normals() {
        let mut rng = rand::rngs::StdRng::seed_from_u64(7);
        let mut normals: Vec<Vec3> = (0..500).map(|_| random_unit(&mut rng)).collect();
        normals.extend([Vec3::x(), -Vec3::y(), Vec3::z()]);
        for n in normals {
            let [a, b, c] = orthonormal_frame(&n).unwrap();
            assert!((a - n).norm() < 1e-12);
            for v in [a, b, c] {
                assert!((v.norm() - 1.0).abs() < 1e-12);
            }
            assert!(a.dot(&b).abs() < 1e-12);
            assert!(a.dot(&c).abs() < 1e-12);
            assert!(b.dot(&c).abs() < 1e-12);
            assert!((a.cross(&b) - c).norm() < 1e-12);
        }
    }

    #[test]
    fn frame_rejects_zero_normal() {
        assert!(matches!(
            orthonormal_frame(&Vec3::zeros()),
            Err(CapError::DegenerateGeometry(_))
        ));
    }

    #[test]
    fn sphere_and_plane_signs() {
        let s = Sphere {
            center: Vec3::new(1.0, 0.0, 0.0),
            radius: 2.0,
        };
        assert!(s.value(&Vec3::new(1.0, 1.0, 0.0)) < 0.0);
        assert!((s.value(&Vec3::new(4.0, 0.0, 0.0)) - 1.0).abs() < 1e-15);
        assert_eq!(s.bounds(), [-1.0, 3.0, -2.0, 2.0, -2.0, 2.0]);

        let p = Plane {
            origin: Vec3::new(0.0, 0.0, 8.0),
            normal: Vec3::z(),
        };
        assert!((p.value(&Vec3::new(5.0, 5.0, 10.0)) - 2.0).abs() < 1e-15);
        assert!(p.value(&Vec3::new(0.0, 0.0, 0.0)) < 0.0);
    }

    #[test]
    fn oriented_box_distance() {
        // Axis-aligned unit-half cube, identity frame.
        let b = OrientedBox::new(
            &Vec3::new(0.0, 0.0, 5.0),
            &[Vec3::x(), Vec3::y(), Vec3::z()],
            [-1.0, 1.0, -1.0, 1.0, -1.0, 1.0],
        );
        assert!((b.value(&Vec3::new(0.0, 0.0, 5.0)) + 1.0).abs() < 1e-15);
        assert!((b.value(&Vec3::new(0.0, 0.0, 7.0)) - 1.0).abs() < 1e-15);
        assert!((b.value(&Vec3::new(2.0, 2.0, 5.0)) - 2f64.sqrt()).abs() < 1e-12);
        assert!(b.value(&Vec3::new(1.0, 0.0, 5.0)).abs() < 1e-15);
        assert!((b.center() - Vec3::new(0.0, 0.0, 5.0)).norm() < 1e-15);
    }

    #[test]
    fn oriented_box_follows_its_axes() {
        let n = Vec3::new(1.0, 1.0, 0.0).normalize();
        let axes = orthonormal_frame(&n).unwrap();
        let sphere = Sphere {
            center: Vec3::new(1.0, 2.0, 3.0),
            radius: 0.5,
        };
        let b = OrientedBox::enclosing(&sphere, &axes);
        // Along the first axis the face sits exactly one radius away.
        let on_face = sphere.center + n * 0.5;
        assert!(b.value(&on_face).abs() < 1e-12);
        let beyond = sphere.center + n * 0.75;
        assert!((b.value(&beyond) - 0.25).abs() < 1e-12);
        for (a, e) in b.axes().iter().zip(axes.iter()) {
            assert!((a - e).norm() < 1e-12);
        }
        for c in b.corners() {
            assert!(b.value(&c).abs() < 1e-12);
        }
    }
}

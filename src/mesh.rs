//! Triangle surface mesh stored the flat way: `tri2vtx` holds three vertex
//! indices per triangle, `vtx2xyz` three coordinates per vertex.

use std::collections::HashMap;
use std::path::Path;

use crate::error::MeshIoError;
use crate::geo::Vec3;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TriMesh {
    pub tri2vtx: Vec<usize>,
    pub vtx2xyz: Vec<f64>,
}

impl TriMesh {
    pub fn new(tri2vtx: Vec<usize>, vtx2xyz: Vec<f64>) -> Self {
        debug_assert_eq!(tri2vtx.len() % 3, 0);
        debug_assert_eq!(vtx2xyz.len() % 3, 0);
        Self { tri2vtx, vtx2xyz }
    }

    pub fn num_vtx(&self) -> usize {
        self.vtx2xyz.len() / 3
    }

    pub fn num_tri(&self) -> usize {
        self.tri2vtx.len() / 3
    }

    /// No triangles left. Stray vertices do not count as surface.
    pub fn is_empty(&self) -> bool {
        self.tri2vtx.is_empty()
    }

    pub fn position(&self, i_vtx: usize) -> Vec3 {
        del_geo::vec3::to_na(&self.vtx2xyz, i_vtx)
    }

    pub fn triangle(&self, i_tri: usize) -> [usize; 3] {
        let t = &self.tri2vtx[i_tri * 3..i_tri * 3 + 3];
        [t[0], t[1], t[2]]
    }

    pub fn triangle_area(&self, i_tri: usize) -> f64 {
        let [i0, i1, i2] = self.triangle(i_tri);
        let p0 = self.position(i0);
        let p1 = self.position(i1);
        let p2 = self.position(i2);
        0.5 * (p1 - p0).cross(&(p2 - p0)).norm()
    }

    pub fn area(&self) -> f64 {
        (0..self.num_tri()).map(|i| self.triangle_area(i)).sum()
    }

    /// Axis-aligned bounds `(min, max)` of the vertices, `None` if there are
    /// none.
    pub fn bounds(&self) -> Option<(Vec3, Vec3)> {
        let mut it = self.vtx2xyz.chunks_exact(3).map(|c| Vec3::new(c[0], c[1], c[2]));
        let first = it.next()?;
        Some(it.fold((first, first), |(lo, hi), p| (lo.inf(&p), hi.sup(&p))))
    }

    pub fn diagonal(&self) -> f64 {
        self.bounds().map_or(0.0, |(lo, hi)| (hi - lo).norm())
    }

    /// Drops vertices no triangle refers to and renumbers the rest.
    pub fn remove_unreferenced_vertices(self) -> Self {
        let num_vtx = self.num_vtx();
        let (vtx2vtxa, num_vtxa) =
            del_msh::map_idx::from_remove_unreferenced_vertices(&self.tri2vtx, num_vtx);
        if num_vtxa == num_vtx {
            return self;
        }
        let tri2vtx = del_msh::map_idx::map_elem_index(&self.tri2vtx, &vtx2vtxa);
        let vtx2xyz =
            del_msh::map_idx::map_vertex_attibute(&self.vtx2xyz, 3, &vtx2vtxa, num_vtxa);
        Self { tri2vtx, vtx2xyz }
    }

    /// Merges vertices closer than `tolerance`, drops triangles that collapse
    /// and vertices that end up unused. A zero or negative tolerance merges
    /// exactly coincident vertices only.
    pub fn clean(self, tolerance: f64) -> Self {
        let vtx2rep = if tolerance > 0.0 && tolerance.is_finite() {
            self.near_representatives(tolerance)
        } else {
            self.exact_representatives()
        };
        let tri2vtx: Vec<usize> = self
            .tri2vtx
            .chunks_exact(3)
            .map(|t| [vtx2rep[t[0]], vtx2rep[t[1]], vtx2rep[t[2]]])
            .filter(|t| t[0] != t[1] && t[1] != t[2] && t[2] != t[0])
            .flatten()
            .collect();
        Self {
            tri2vtx,
            vtx2xyz: self.vtx2xyz,
        }
        .remove_unreferenced_vertices()
    }

    /// First vertex with bit-identical coordinates, per vertex.
    fn exact_representatives(&self) -> Vec<usize> {
        let mut xyz2vtx: HashMap<[u64; 3], usize> = HashMap::new();
        self.vtx2xyz
            .chunks_exact(3)
            .enumerate()
            .map(|(i_vtx, c)| {
                let bits = [c[0].to_bits(), c[1].to_bits(), c[2].to_bits()];
                *xyz2vtx.entry(bits).or_insert(i_vtx)
            })
            .collect()
    }

    /// First earlier vertex within `tolerance`, per vertex, found through a
    /// grid of cell size `tolerance`.
    fn near_representatives(&self, tolerance: f64) -> Vec<usize> {
        let key = |p: &Vec3| {
            [
                (p.x / tolerance).floor() as i64,
                (p.y / tolerance).floor() as i64,
                (p.z / tolerance).floor() as i64,
            ]
        };
        let mut grid: HashMap<[i64; 3], Vec<usize>> = HashMap::new();
        let mut vtx2rep: Vec<usize> = Vec::with_capacity(self.num_vtx());
        for i_vtx in 0..self.num_vtx() {
            let p = self.position(i_vtx);
            let k = key(&p);
            let mut rep = None;
            'search: for dx in -1..=1 {
                for dy in -1..=1 {
                    for dz in -1..=1 {
                        let neighbor = [
                            k[0].saturating_add(dx),
                            k[1].saturating_add(dy),
                            k[2].saturating_add(dz),
                        ];
                        let Some(bucket) = grid.get(&neighbor) else {
                            continue;
                        };
                        if let Some(&j) = bucket
                            .iter()
                            .find(|&&j| (self.position(j) - p).norm() <= tolerance)
                        {
                            rep = Some(j);
                            break 'search;
                        }
                    }
                }
            }
            match rep {
                Some(j) => vtx2rep.push(j),
                None => {
                    grid.entry(k).or_default().push(i_vtx);
                    vtx2rep.push(i_vtx);
                }
            }
        }
        vtx2rep
    }

    /// Reads an OFF triangle mesh.
    pub fn load_off<P: AsRef<Path>>(path: P) -> Result<Self, MeshIoError> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(MeshIoError::Missing(path.to_path_buf()));
        }
        let (tri2vtx, vtx2xyz) = del_msh::io_off::load_as_tri_mesh::<&Path, f32>(path);
        let vtx2xyz = del_msh::vtx2xyz::cast::<f64, f32>(&vtx2xyz);
        let num_vtx = vtx2xyz.len() / 3;
        if let Some(&index) = tri2vtx.iter().find(|&&i| i >= num_vtx) {
            return Err(MeshIoError::BadIndex {
                path: path.to_path_buf(),
                num_vtx,
                index,
            });
        }
        Ok(Self { tri2vtx, vtx2xyz })
    }

    /// Reads an OFF mesh and cleans it with a tolerance relative to its size.
    pub fn load_off_cleaned<P: AsRef<Path>>(
        path: P,
        relative_tolerance: f64,
    ) -> Result<Self, MeshIoError> {
        let mesh = Self::load_off(path)?;
        let tolerance = mesh.diagonal() * relative_tolerance;
        let before = mesh.num_vtx();
        let mesh = mesh.clean(tolerance);
        log::debug!(
            "cleaned surface: {} -> {} vertices, {} triangles",
            before,
            mesh.num_vtx(),
            mesh.num_tri()
        );
        Ok(mesh)
    }

    pub fn save_off<P: AsRef<Path>>(&self, path: P) -> Result<(), MeshIoError> {
        let path = path.as_ref();
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            if !dir.is_dir() {
                return Err(MeshIoError::MissingDirectory(dir.to_path_buf()));
            }
        }
        del_msh::io_off::save_tri_mesh(path, &self.tri2vtx, &self.vtx2xyz);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quad() -> TriMesh {
        // Unit square in z = 0 plus one stray vertex.
        TriMesh::new(
            vec![0, 1, 2, 0, 2, 3],
            vec![
                0.0, 0.0, 0.0, //
                1.0, 0.0, 0.0, //
                1.0, 1.0, 0.0, //
                0.0, 1.0, 0.0, //
                5.0, 5.0, 5.0,
            ],
        )
    }

    #[test]
    fn area_and_bounds() {
        let m = quad();
        assert_eq!(m.num_tri(), 2);
        assert_eq!(m.num_vtx(), 5);
        assert!((m.area() - 1.0).abs() < 1e-15);
        let (lo, hi) = m.bounds().unwrap();
        assert_eq!(lo, Vec3::zeros());
        assert_eq!(hi, Vec3::new(5.0, 5.0, 5.0));
        assert!(TriMesh::default().bounds().is_none());
        assert!(TriMesh::default().is_empty());
    }

    #[test]
    fn unreferenced_vertex_is_dropped() {
        let m = quad().remove_unreferenced_vertices();
        assert_eq!(m.num_vtx(), 4);
        assert_eq!(m.num_tri(), 2);
        assert!((m.area() - 1.0).abs() < 1e-15);
        assert!(m.tri2vtx.iter().all(|&i| i < 4));
    }

    #[test]
    fn clean_merges_duplicated_corners() {
        // Two triangles that do not share vertex indices along the diagonal.
        let m = TriMesh::new(
            vec![0, 1, 2, 3, 4, 5, 0, 0, 1],
            vec![
                0.0, 0.0, 0.0, //
                1.0, 0.0, 0.0, //
                1.0, 1.0, 0.0, //
                0.0, 0.0, 1.0e-12, //
                1.0, 1.0, 0.0, //
                0.0, 1.0, 0.0,
            ],
        );
        let m = m.clean(1.0e-9);
        assert_eq!(m.num_tri(), 2);
        assert_eq!(m.num_vtx(), 4);
        assert!((m.area() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn zero_tolerance_merges_exact_duplicates_only() {
        let m = TriMesh::new(
            vec![0, 1, 2, 3, 4, 5],
            vec![
                0.0, 0.0, 0.0, //
                1.0, 0.0, 0.0, //
                0.0, 1.0, 0.0, //
                1.0, 0.0, 0.0, //
                1.0, 1.0, 0.0, //
                0.0, 1.0, 1.0e-12,
            ],
        );
        let cleaned = m.clone().clean(0.0);
        assert_eq!(cleaned.num_tri(), 2);
        assert_eq!(cleaned.num_vtx(), 5);
        assert!((cleaned.area() - m.area()).abs() < 1e-15);

        let single = TriMesh::new(vec![0, 1, 2], vec![0., 0., 0., 1., 0., 0., 0., 1., 0.]);
        assert_eq!(single.clone().clean(0.0), single);
        assert_eq!(single.clone().clean(-1.0), single);
        assert_eq!(single.clone().clean(f64::MIN_POSITIVE), single);
    }

    #[test]
    fn missing_file_is_an_error() {
        let err = TriMesh::load_off("/nonexistent/surface.off").unwrap_err();
        assert!(matches!(err, MeshIoError::Missing(_)));
        let err = quad().save_off("/nonexistent/dir/out.off").unwrap_err();
        assert!(matches!(err, MeshIoError::MissingDirectory(_)));
    }
}

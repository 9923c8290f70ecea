//! Optional visual output. Drawing never feeds back into the cut.

use serde_derive::Serialize;

use crate::centerline::Centerline;
use crate::geo::{OrientedBox, Vec3};
use crate::mesh::TriMesh;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Style {
    pub color: [f32; 3],
    pub wire: bool,
    pub line_width: f32,
}

impl Style {
    pub const fn solid(color: [f32; 3]) -> Self {
        Self {
            color,
            wire: false,
            line_width: 1.0,
        }
    }

    pub const fn wire(color: [f32; 3]) -> Self {
        Self {
            color,
            wire: true,
            line_width: 1.0,
        }
    }
}

/// Receiver for debug geometry. Every method defaults to doing nothing.
pub trait VisualSink {
    fn add_sphere(&mut self, _center: &Vec3, _radius: f64, _style: Style) {}
    fn add_plane(&mut self, _origin: &Vec3, _normal: &Vec3, _style: Style) {}
    fn add_box(&mut self, _clip_box: &OrientedBox, _style: Style) {}
    fn add_polyline(&mut self, _centerline: &Centerline, _style: Style) {}
    fn add_mesh(&mut self, _mesh: &TriMesh, _style: Style) {}
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NoopSink;

impl VisualSink for NoopSink {}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SceneItem {
    Sphere {
        center: [f64; 3],
        radius: f64,
        style: Style,
    },
    Plane {
        origin: [f64; 3],
        normal: [f64; 3],
        style: Style,
    },
    ClipBox {
        corners: Vec<[f64; 3]>,
        style: Style,
    },
    Polyline {
        points: Vec<[f64; 3]>,
        cells: Vec<[usize; 2]>,
        style: Style,
    },
    Mesh {
        num_vtx: usize,
        num_tri: usize,
        style: Style,
    },
}

/// Sink that keeps what was drawn, for dumping to JSON.
#[derive(Debug, Clone, Default)]
pub struct SceneRecorder {
    pub items: Vec<SceneItem>,
}

fn arr(v: &Vec3) -> [f64; 3] {
    [v.x, v.y, v.z]
}

impl SceneRecorder {
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(&self.items)
    }
}

impl VisualSink for SceneRecorder {
    fn add_sphere(&mut self, center: &Vec3, radius: f64, style: Style) {
        self.items.push(SceneItem::Sphere {
            center: arr(center),
            radius,
            style,
        });
    }

    fn add_plane(&mut self, origin: &Vec3, normal: &Vec3, style: Style) {
        self.items.push(SceneItem::Plane {
            origin: arr(origin),
            normal: arr(normal),
            style,
        });
    }

    fn add_box(&mut self, clip_box: &OrientedBox, style: Style) {
        self.items.push(SceneItem::ClipBox {
            corners: clip_box.corners().iter().map(arr).collect(),
            style,
        });
    }

    fn add_polyline(&mut self, centerline: &Centerline, style: Style) {
        self.items.push(SceneItem::Polyline {
            points: centerline.points.clone(),
            cells: centerline.cells.clone(),
            style,
        });
    }

    fn add_mesh(&mut self, mesh: &TriMesh, style: Style) {
        self.items.push(SceneItem::Mesh {
            num_vtx: mesh.num_vtx(),
            num_tri: mesh.num_tri(),
            style,
        });
    }
}

/// Closed triangle mesh of a box, for writing it out next to the surface.
pub fn box_mesh(clip_box: &OrientedBox) -> TriMesh {
    // Corner `i` has local x from bit 0, y from bit 1, z from bit 2.
    const TRI2VTX: [usize; 36] = [
        0, 2, 1, 1, 2, 3, // z min
        4, 5, 6, 5, 7, 6, // z max
        0, 1, 4, 1, 5, 4, // y min
        2, 6, 3, 3, 6, 7, // y max
        0, 4, 2, 2, 4, 6, // x min
        1, 3, 5, 3, 7, 5, // x max
    ];
    let vtx2xyz = clip_box.corners().iter().flat_map(arr).collect();
    TriMesh::new(TRI2VTX.to_vec(), vtx2xyz)
}

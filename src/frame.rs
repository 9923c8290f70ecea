//! Clip frames: where and how to cut the surface at one branch end.

use crate::centerline::{
    find_interior_neighbor, required_radius, Centerline, NeighborPolicy, RadiusField,
};
use crate::error::CapError;
use crate::geo::{orthonormal_frame, try_normalize, OrientedBox, Plane, Sphere, Vec3};

/// One branch end to build a frame for.
#[derive(Debug, Clone, Copy)]
pub struct EndSite<'a> {
    pub end_pid: usize,
    pub end_cell_ids: &'a [usize],
    /// Caller's outward normal, any orientation.
    pub end_normal: Vec3,
    /// Absolute cut offset from the terminal point; `0.0` means use the
    /// local radius.
    pub clip_distance: f64,
    pub clip_width_scale: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClipFrame {
    pub end_pid: usize,
    pub start_pid: usize,
    pub start_cid: usize,
    pub start_point: Vec3,
    pub end_point: Vec3,
    pub start_radius: f64,
    pub end_radius: f64,
    /// Unit vector from the interior neighbor to the terminal point.
    pub tangent: Vec3,
    /// Distance from the interior neighbor to the terminal point.
    pub span: f64,
    /// Offset of the cut back from the terminal point.
    pub clip_distance: f64,
    pub plane: Plane,
    /// End radius times the branch width scale.
    pub clip_radius: f64,
    pub clip_box: OrientedBox,
}

impl ClipFrame {
    pub fn origin(&self) -> Vec3 {
        self.plane.origin
    }

    pub fn normal(&self) -> Vec3 {
        self.plane.normal
    }
}

pub struct FrameBuilder<'a> {
    pub centerlines: &'a Centerline,
    pub geometry: &'a Centerline,
    pub radii: &'a dyn RadiusField,
    pub policy: NeighborPolicy,
    /// Box half-extent, and offset of its center past the plane, in clip
    /// radii.
    pub box_scale: f64,
}

impl FrameBuilder<'_> {
    pub fn build(&self, site: &EndSite) -> Result<ClipFrame, CapError> {
        if !site.clip_distance.is_finite() {
            return Err(CapError::InvalidClipDistance(site.clip_distance));
        }
        let neighbor = find_interior_neighbor(
            self.centerlines,
            self.geometry,
            site.end_pid,
            site.end_cell_ids,
            self.policy,
        )?;
        let start_point = neighbor.position;
        let end_point = self.geometry.point(site.end_pid)?;
        let (tangent, span) = try_normalize(
            &(end_point - start_point),
            "terminal point coincides with its interior neighbor",
        )?;

        let (mut normal, _) = try_normalize(&site.end_normal, "end normal has zero length")?;
        if tangent.dot(&normal) < 0.0 {
            normal = -normal;
        }

        let end_radius = required_radius(self.radii, site.end_pid)?;
        let start_radius = required_radius(self.radii, neighbor.pid)?;
        let clip_distance = if site.clip_distance == 0.0 {
            end_radius
        } else {
            site.clip_distance
        };
        let origin = start_point + normal.scale(span - clip_distance);
        let clip_radius = end_radius * site.clip_width_scale;
        if !(clip_radius.is_finite() && clip_radius > 0.0) {
            return Err(CapError::DegenerateGeometry(
                "clip width scale gives a non-positive clip radius",
            ));
        }

        let axes = orthonormal_frame(&normal)?;
        let half = self.box_scale * clip_radius;
        let clip_box = OrientedBox::enclosing(
            &Sphere {
                center: origin + normal.scale(half),
                radius: half,
            },
            &axes,
        );

        Ok(ClipFrame {
            end_pid: site.end_pid,
            start_pid: neighbor.pid,
            start_cid: neighbor.cid,
            start_point,
            end_point,
            start_radius,
            end_radius,
            tangent,
            span,
            clip_distance,
            plane: Plane { origin, normal },
            clip_radius,
            clip_box,
        })
    }
}

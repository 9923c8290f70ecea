//! Branches and the driver that cuts their ends open.
//!
//! Capping folds the surface through one clip per end, in declaration
//! order. Ends of the same branch must not overlap: a later clip only sees
//! what earlier clips left. Any failure aborts the branch and drops the
//! partial surface.

use serde_derive::{Deserialize, Serialize};

use crate::centerline::{Centerline, RadiusField};
use crate::clip::{Keep, SurfaceClipper};
use crate::config::{CapConfig, CutShape};
use crate::error::{BranchCapError, CapError};
use crate::frame::{ClipFrame, EndSite, FrameBuilder};
use crate::geo::{to_vec3, ImplicitFunction};
use crate::mesh::TriMesh;
use crate::visual::{NoopSink, Style, VisualSink};

const NEIGHBOR_COLOR: [f32; 3] = [0.5, 0.5, 0.5];
const PLANE_COLOR: [f32; 3] = [1.0, 0.0, 0.0];
const BOX_COLOR: [f32; 3] = [1.0, 0.0, 1.0];

fn default_clip_width_scale() -> f64 {
    1.0
}

/// One centerline branch and the ends to open on it.
///
/// `end_point_ids[i]` is cut with `end_normals[i]`; `end_cell_ids` is the
/// pool of cells searched for every end's interior neighbor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Branch {
    pub id: usize,
    /// This branch's slice of the centerlines, same point ids.
    pub geometry: Centerline,
    pub end_point_ids: Vec<usize>,
    pub end_cell_ids: Vec<usize>,
    pub end_normals: Vec<[f64; 3]>,
    /// Cut offset back from each end; `0.0` means the end radius.
    pub clip_distance: f64,
    #[serde(default = "default_clip_width_scale")]
    pub clip_width_scale: f64,
}

impl Branch {
    pub fn new(
        id: usize,
        geometry: Centerline,
        end_point_ids: Vec<usize>,
        end_cell_ids: Vec<usize>,
        end_normals: Vec<[f64; 3]>,
        clip_distance: f64,
    ) -> Self {
        Self {
            id,
            geometry,
            end_point_ids,
            end_cell_ids,
            end_normals,
            clip_distance,
            clip_width_scale: default_clip_width_scale(),
        }
    }

    pub fn with_clip_width_scale(mut self, clip_width_scale: f64) -> Self {
        self.clip_width_scale = clip_width_scale;
        self
    }

    pub fn num_ends(&self) -> usize {
        self.end_point_ids.len()
    }

    pub fn end_site(&self, end_index: usize) -> Option<EndSite<'_>> {
        let end_pid = *self.end_point_ids.get(end_index)?;
        let normal = self.end_normals.get(end_index)?;
        Some(EndSite {
            end_pid,
            end_cell_ids: &self.end_cell_ids,
            end_normal: to_vec3(normal),
            clip_distance: self.clip_distance,
            clip_width_scale: self.clip_width_scale,
        })
    }

    /// Draws the branch polyline and a wire sphere at each end point.
    pub fn show(&self, sink: &mut dyn VisualSink, color: [f32; 3], line_width: f32, radius: f64) {
        let style = Style {
            color,
            wire: false,
            line_width,
        };
        sink.add_polyline(&self.geometry, style);
        for &pid in &self.end_point_ids {
            if let Ok(p) = self.geometry.point(pid) {
                sink.add_sphere(&p, radius, Style { wire: true, ..style });
            }
        }
    }

    fn check_ends(&self) -> Result<(), CapError> {
        if self.end_point_ids.len() != self.end_normals.len() {
            return Err(CapError::EndCountMismatch {
                points: self.end_point_ids.len(),
                normals: self.end_normals.len(),
            });
        }
        Ok(())
    }
}

/// Cuts branch ends out of vessel surfaces.
///
/// The centerlines and radius field are shared read-only; the sink only
/// observes.
pub struct Capper<'a, S: VisualSink = NoopSink> {
    centerlines: &'a Centerline,
    radii: &'a dyn RadiusField,
    config: CapConfig,
    sink: S,
    /// Sphere radius for markers drawn at interior neighbors.
    marker_radius: f64,
}

impl<'a> Capper<'a, NoopSink> {
    pub fn new(centerlines: &'a Centerline, radii: &'a dyn RadiusField, config: CapConfig) -> Self {
        Self {
            centerlines,
            radii,
            config,
            sink: NoopSink,
            marker_radius: 1.0,
        }
    }
}

impl<'a, S: VisualSink> Capper<'a, S> {
    pub fn with_sink<T: VisualSink>(self, sink: T, marker_radius: f64) -> Capper<'a, T> {
        Capper {
            centerlines: self.centerlines,
            radii: self.radii,
            config: self.config,
            sink,
            marker_radius,
        }
    }

    pub fn config(&self) -> &CapConfig {
        &self.config
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }

    pub fn into_sink(self) -> S {
        self.sink
    }

    pub fn frame(&self, branch: &Branch, end_index: usize) -> Result<ClipFrame, CapError> {
        branch.check_ends()?;
        let site = branch.end_site(end_index).ok_or(CapError::EndCountMismatch {
            points: branch.end_point_ids.len(),
            normals: branch.end_normals.len(),
        })?;
        FrameBuilder {
            centerlines: self.centerlines,
            geometry: &branch.geometry,
            radii: self.radii,
            policy: self.config.neighbor_policy,
            box_scale: self.config.box_scale,
        }
        .build(&site)
    }

    /// Cuts one end out of `surface` with the given cut tolerance.
    pub fn cap_end(
        &mut self,
        branch: &Branch,
        end_index: usize,
        surface: &TriMesh,
        tolerance: f64,
    ) -> Result<TriMesh, CapError> {
        let frame = self.frame(branch, end_index)?;
        log::debug!(
            "branch {} end {}: pid {} neighbor {} (cell {}), origin {:?}, normal {:?}, clip distance {}, clip radius {}",
            branch.id,
            end_index,
            frame.end_pid,
            frame.start_pid,
            frame.start_cid,
            frame.origin().as_slice(),
            frame.normal().as_slice(),
            frame.clip_distance,
            frame.clip_radius,
        );
        self.sink
            .add_sphere(&frame.start_point, self.marker_radius, Style::wire(NEIGHBOR_COLOR));
        self.sink
            .add_plane(&frame.origin(), &frame.normal(), Style::solid(PLANE_COLOR));

        let (keep, func): (Keep, &dyn ImplicitFunction) = match self.config.cut {
            CutShape::Box => {
                self.sink.add_box(&frame.clip_box, Style::wire(BOX_COLOR));
                (Keep::Outside, &frame.clip_box as &dyn ImplicitFunction)
            }
            CutShape::Plane => (Keep::Inside, &frame.plane as &dyn ImplicitFunction),
        };
        let clipped = SurfaceClipper::new(keep, tolerance).clip_kept(surface, func)?;
        log::debug!(
            "branch {} end {}: {} -> {} triangles",
            branch.id,
            end_index,
            surface.num_tri(),
            clipped.num_tri()
        );
        Ok(clipped)
    }

    /// Opens every end of `branch`, consuming it.
    pub fn cap(&mut self, branch: Branch, surface: TriMesh) -> Result<TriMesh, BranchCapError> {
        let fail = |end_index, source| BranchCapError {
            branch_id: branch.id,
            end_index,
            source,
        };
        branch.check_ends().map_err(|e| fail(None, e))?;
        if surface.is_empty() {
            return Err(fail(None, CapError::EmptyClipResult));
        }
        let tolerance = surface.diagonal() * self.config.relative_tolerance;
        let num_tri = surface.num_tri();
        let capped = (0..branch.num_ends()).try_fold(surface, |working, end_index| {
            self.cap_end(&branch, end_index, &working, tolerance)
                .map_err(|e| fail(Some(end_index), e))
        });
        match &capped {
            Ok(mesh) => log::info!(
                "branch {}: capped {} ends, {} -> {} triangles",
                branch.id,
                branch.num_ends(),
                num_tri,
                mesh.num_tri()
            ),
            Err(e) => log::warn!("{}", e),
        }
        capped
    }
}

/// Caps independent branches, each with its own surface.
///
/// Results come back in input order. With the `parallel` feature the
/// branches run on the rayon pool.
pub fn cap_branches(
    centerlines: &Centerline,
    radii: &dyn RadiusField,
    config: CapConfig,
    jobs: Vec<(Branch, TriMesh)>,
) -> Vec<Result<TriMesh, BranchCapError>> {
    let run = |(branch, surface): (Branch, TriMesh)| {
        Capper::new(centerlines, radii, config).cap(branch, surface)
    };
    #[cfg(feature = "parallel")]
    {
        use rayon::prelude::*;
        jobs.into_par_iter().map(run).collect()
    }
    #[cfg(not(feature = "parallel"))]
    {
        jobs.into_iter().map(run).collect()
    }
}

//! Opening the ends of tubular vessel surfaces along their centerlines.
//!
//! For each end of a [`Branch`], an interior neighbor on the centerline gives
//! the local vessel direction, a clip frame is placed one end radius (or a
//! fixed distance) back from the terminal point, and the surface is cut
//! there with an oriented box or a plane. The resulting open surface is
//! ready for boundary-condition assignment.
//!
//! ```no_run
//! use vesselcap::{Branch, CapConfig, Capper, CaseFile, TriMesh};
//!
//! let case = CaseFile::load("case.json").unwrap();
//! let surface = TriMesh::load_off("vessel.off").unwrap();
//! let mut capper = Capper::new(&case.centerlines, &case.radius, case.config);
//! let branch: Branch = case.branches[0].clone();
//! let open = capper.cap(branch, surface).unwrap();
//! open.save_off("vessel_open.off").unwrap();
//! ```

pub mod branch;
pub mod centerline;
pub mod clip;
pub mod config;
pub mod error;
pub mod frame;
pub mod geo;
pub mod mesh;
pub mod tube;
pub mod visual;

pub use branch::{cap_branches, Branch, Capper};
pub use centerline::{Centerline, NeighborPolicy, RadiusField};
pub use clip::{ClipOutput, Keep, SurfaceClipper};
pub use config::{CapConfig, CaseFile, CutShape};
pub use error::{BranchCapError, CapError, CaseError, MeshIoError};
pub use frame::{ClipFrame, EndSite, FrameBuilder};
pub use mesh::TriMesh;
pub use visual::{NoopSink, SceneRecorder, Style, VisualSink};

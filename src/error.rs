use std::path::PathBuf;

/// Failure while capping one end of a branch.
///
/// None of these are transient: the same inputs fail the same way, so the
/// driver never retries.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CapError {
    #[error("terminal point {end_pid} is not an endpoint of any candidate cell")]
    BranchTopology { end_pid: usize },
    #[error(
        "terminal point {end_pid} has two interior neighbors ({first_pid} via cell {first_cid}, {second_pid} via cell {second_cid})"
    )]
    AmbiguousNeighbor {
        end_pid: usize,
        first_cid: usize,
        first_pid: usize,
        second_cid: usize,
        second_pid: usize,
    },
    #[error("centerline has no point {0}")]
    UnknownPoint(usize),
    #[error("centerline has no cell {0}")]
    UnknownCell(usize),
    #[error("degenerate geometry: {0}")]
    DegenerateGeometry(&'static str),
    #[error("clip removed the entire surface")]
    EmptyClipResult,
    #[error("no radius for centerline point {0}")]
    MissingRadius(usize),
    #[error("radius {radius} at centerline point {pid} is not positive")]
    NonPositiveRadius { pid: usize, radius: f64 },
    #[error("branch has {points} end points but {normals} end normals")]
    EndCountMismatch { points: usize, normals: usize },
    #[error("clip distance {0} is not finite")]
    InvalidClipDistance(f64),
}

/// A [`CapError`] tagged with the branch and end it happened at.
///
/// `end_index` is `None` when the branch was rejected before any end was
/// processed.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("branch {branch_id}, end {}: {source}", end_label(.end_index))]
pub struct BranchCapError {
    pub branch_id: usize,
    pub end_index: Option<usize>,
    pub source: CapError,
}

fn end_label(end_index: &Option<usize>) -> String {
    end_index.map_or_else(|| "-".to_string(), |i| i.to_string())
}

#[derive(Debug, thiserror::Error)]
pub enum MeshIoError {
    #[error("mesh file {0:?} does not exist")]
    Missing(PathBuf),
    #[error("mesh file {path:?} has {num_vtx} vertices but a triangle refers to vertex {index}")]
    BadIndex {
        path: PathBuf,
        num_vtx: usize,
        index: usize,
    },
    #[error("mesh output directory {0:?} does not exist")]
    MissingDirectory(PathBuf),
}

#[derive(Debug, thiserror::Error)]
pub enum CaseError {
    #[error("failed to read case file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse case file: {0}")]
    Json(#[from] serde_json::Error),
}

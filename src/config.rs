//! Capping parameters and JSON case files.

use std::path::Path;

use serde_derive::{Deserialize, Serialize};

use crate::branch::Branch;
use crate::centerline::{Centerline, NeighborPolicy};
use crate::error::CaseError;

/// Shape used to cut each end.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CutShape {
    /// Oriented box around the terminal cap; the rest of the surface is
    /// untouched.
    #[default]
    Box,
    /// The whole half-space beyond the clip plane.
    Plane,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CapConfig {
    /// Box half-extent, and offset of the box center past the clip plane,
    /// in clip radii.
    pub box_scale: f64,
    /// Cut tolerance as a fraction of the surface bounding-box diagonal.
    pub relative_tolerance: f64,
    pub neighbor_policy: NeighborPolicy,
    pub cut: CutShape,
}

impl Default for CapConfig {
    fn default() -> Self {
        Self {
            box_scale: 2.0,
            relative_tolerance: 1.0e-9,
            neighbor_policy: NeighborPolicy::Unique,
            cut: CutShape::Box,
        }
    }
}

/// Everything needed to cap a set of branches except the surface itself.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaseFile {
    pub centerlines: Centerline,
    /// Maximal inscribed radius per centerline point.
    pub radius: Vec<f64>,
    pub branches: Vec<Branch>,
    #[serde(default)]
    pub config: CapConfig,
}

impl CaseFile {
    pub fn from_json(text: &str) -> Result<Self, CaseError> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, CaseError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CASE: &str = r#"{
        "centerlines": {
            "points": [[0, 0, 0], [0, 0, 5], [0, 0, 10]],
            "cells": [[0, 1], [1, 2]]
        },
        "radius": [1.0, 1.0, 1.0],
        "branches": [{
            "id": 4,
            "geometry": {
                "points": [[0, 0, 0], [0, 0, 5], [0, 0, 10]],
                "cells": [[0, 1], [1, 2]]
            },
            "end_point_ids": [2],
            "end_cell_ids": [0, 1],
            "end_normals": [[0, 0, -1]],
            "clip_distance": 0.0
        }],
        "config": { "cut": "plane", "neighbor_policy": "first_match" }
    }"#;

    #[test]
    fn parses_case_with_defaults() {
        let case = CaseFile::from_json(CASE).unwrap();
        assert_eq!(case.branches.len(), 1);
        let b = &case.branches[0];
        assert_eq!(b.id, 4);
        assert_eq!(b.clip_width_scale, 1.0);
        assert_eq!(b.end_normals, vec![[0.0, 0.0, -1.0]]);
        assert_eq!(case.config.cut, CutShape::Plane);
        assert_eq!(case.config.neighbor_policy, NeighborPolicy::FirstMatch);
        assert_eq!(case.config.box_scale, 2.0);
    }

    #[test]
    fn config_defaults_when_missing() {
        let config: CapConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, CapConfig::default());
    }

    #[test]
    fn bad_json_is_reported() {
        assert!(matches!(CaseFile::from_json("{"), Err(CaseError::Json(_))));
        assert!(matches!(
            CaseFile::load("/nonexistent/case.json"),
            Err(CaseError::Io(_))
        ));
    }
}

//! Error types for uvrender.
//!
//! Loading failures for the three per-mesh inputs get their own variants so
//! the batch driver can tell a skipped mesh apart from a failed one.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using [`RenderError`].
pub type Result<T> = std::result::Result<T, RenderError>;

/// Errors that can occur while rendering a mesh.
#[derive(Error, Debug)]
pub enum RenderError {
    /// The base 3D mesh could not be loaded.
    #[error("could not load initial mesh at {path}: {message}")]
    MeshLoad {
        /// The file path.
        path: PathBuf,
        /// Error message.
        message: String,
    },

    /// The UV mesh could not be loaded.
    #[error("could not load uv coordinates at {path}: {message}")]
    UvLoad {
        /// The file path.
        path: PathBuf,
        /// Error message.
        message: String,
    },

    /// The camera bundle could not be loaded.
    #[error("could not load camera at {path}: {message}")]
    CameraLoad {
        /// The file path.
        path: PathBuf,
        /// Error message.
        message: String,
    },

    /// Malformed OBJ content.
    #[error("{path}:{line}: {message}")]
    Obj {
        /// The file path.
        path: PathBuf,
        /// 1-based line number.
        line: usize,
        /// Error message.
        message: String,
    },

    /// The mesh has no faces.
    #[error("mesh has no faces")]
    EmptyMesh,

    /// A face references an invalid vertex index.
    #[error("face {face} references invalid vertex index {vertex}")]
    InvalidVertexIndex {
        /// The face index.
        face: usize,
        /// The invalid vertex index.
        vertex: usize,
    },

    /// A face has duplicate vertex indices.
    #[error("face {face} is degenerate (has duplicate vertices)")]
    DegenerateFace {
        /// The face index.
        face: usize,
    },

    /// The same directed edge appears in two faces.
    #[error("directed edge ({v0}, {v1}) is used by more than one face")]
    NonManifoldEdge {
        /// First vertex of the edge.
        v0: usize,
        /// Second vertex of the edge.
        v1: usize,
    },

    /// UV faces do not line up with position faces.
    #[error("mesh has {faces} faces but {uv_faces} uv faces")]
    UvFaceMismatch {
        /// Number of position faces.
        faces: usize,
        /// Number of UV faces.
        uv_faces: usize,
    },

    /// File I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// PNG encoding error.
    #[error("image error: {0}")]
    Image(#[from] image::ImageError),

    /// Invalid parameter value.
    #[error("invalid parameter: {name} = {value} ({reason})")]
    InvalidParameter {
        /// Parameter name.
        name: &'static str,
        /// The invalid value (as string).
        value: String,
        /// Reason the value is invalid.
        reason: &'static str,
    },
}

impl RenderError {
    /// Create an invalid parameter error.
    pub fn invalid_param<T: std::fmt::Display>(
        name: &'static str,
        value: T,
        reason: &'static str,
    ) -> Self {
        RenderError::InvalidParameter {
            name,
            value: value.to_string(),
            reason,
        }
    }

    /// True for the input-loading failures that skip a mesh without
    /// counting as a batch failure.
    pub fn is_load_failure(&self) -> bool {
        matches!(
            self,
            RenderError::MeshLoad { .. } | RenderError::UvLoad { .. } | RenderError::CameraLoad { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_failures_are_recoverable() {
        let err = RenderError::CameraLoad {
            path: PathBuf::from("data/cameras/bunny_camera.json"),
            message: "not found".to_string(),
        };
        assert!(err.is_load_failure());
        assert!(err.to_string().contains("bunny_camera.json"));

        assert!(!RenderError::EmptyMesh.is_load_failure());
        assert!(!RenderError::invalid_param("width", 0, "must be positive").is_load_failure());
    }
}

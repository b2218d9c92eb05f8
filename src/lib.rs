//! # uvrender
//!
//! Batch renderer for UV-mapped triangle meshes.
//!
//! Given a base mesh, a UV-parameterized copy of it and a stored camera,
//! uvrender rasterizes the mesh in software, colors it by a per-vertex
//! distortion energy through the coolwarm colormap, draws the UV grid and
//! the parameterization cuts on top, shades the result and writes PNG
//! images.
//!
//! ## Features
//!
//! - **Software rasterizer**: z-buffered face-id and barycentric matrices
//! - **Half-edge connectivity**: derived from face lists, with boundary loops
//! - **Distortion energies**: scale factors, edge lengths, symmetric Dirichlet
//! - **Batch driver**: parallel over meshes, with a log file per mesh
//!
//! ## Quick Start
//!
//! ```no_run
//! use uvrender::prelude::*;
//!
//! let config = RenderConfig::default()
//!     .with_input_dir("data/meshes")
//!     .with_uv_dir("output/optimized")
//!     .with_output_dir("output/renders");
//!
//! let report = render_one(&config, "bunny.obj");
//! println!("{:?}", report.status);
//! ```
//!
//! ## Rendering Pieces Directly
//!
//! ```
//! use uvrender::prelude::*;
//! use nalgebra::{Point2, Point3};
//!
//! let mesh = TriMesh::new(
//!     vec![
//!         Point3::new(0.0, 0.0, 0.0),
//!         Point3::new(1.0, 0.0, 0.0),
//!         Point3::new(1.0, 1.0, 0.0),
//!         Point3::new(0.0, 1.0, 0.0),
//!     ],
//!     vec![[0, 1, 2], [0, 2, 3]],
//! );
//! let camera = Camera::fit_to_mesh(&mesh, 64, 48);
//! let pm = point_matrix(&camera, &mesh, &TriMesh::default(), 0, 0, 64, 48).unwrap();
//! assert!(pm.covered_pixels() > 0);
//!
//! let uv = mesh.positions.iter().map(|p| Point2::new(p.x, p.y)).collect();
//! let uv_mesh = UvMesh::new(mesh.clone(), uv, mesh.faces.clone()).unwrap();
//! let energy = vertex_energy(&uv_mesh, EnergyChoice::ScaleFactors);
//! assert!(energy.iter().all(|e| e.abs() < 1e-12));
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod camera;
pub mod colormap;
pub mod energy;
pub mod error;
pub mod io;
pub mod logging;
pub mod mesh;
pub mod pipeline;
pub mod progress;
pub mod raster;
pub mod render;

/// Prelude module for convenient imports.
///
/// ```
/// use uvrender::prelude::*;
/// ```
pub mod prelude {
    pub use crate::camera::{Camera, CameraBundle};
    pub use crate::colormap::{energy_norm, CenteredNorm, Colormap};
    pub use crate::energy::{vertex_energy, EnergyChoice};
    pub use crate::error::{RenderError, Result};
    pub use crate::mesh::{Connectivity, FaceId, HalfEdgeId, TriMesh, UvMesh, VertexId};
    pub use crate::pipeline::{render_many, render_one, MeshReport, MeshStatus, RenderConfig};
    pub use crate::raster::{cut_to_singularity_edges, mark_cut_pixels, point_matrix, PointMatrix};
    pub use crate::render::{add_shading, color_mesh_with_grid, corner_uv, ColorImage};
}

// Re-export nalgebra types for convenience
pub use nalgebra;

#[cfg(test)]
mod tests {
    use super::prelude::*;
    use nalgebra::Point3;

    #[test]
    fn test_tetrahedron_is_closed() {
        let mesh = TriMesh::new(
            vec![
                Point3::new(0.0, 0.0, 0.0),
                Point3::new(1.0, 0.0, 0.0),
                Point3::new(0.5, 1.0, 0.0),
                Point3::new(0.5, 0.5, 1.0),
            ],
            vec![
                [0, 2, 1], // bottom
                [0, 1, 3], // front
                [1, 2, 3], // right
                [2, 0, 3], // left
            ],
        );

        let conn = mesh.connectivity().unwrap();
        assert_eq!(conn.num_halfedges(), 12);
        assert!(conn.is_valid());
        assert!(!mesh.has_boundary());
    }
}

//! Mesh containers and connectivity.
//!
//! Two face-vertex containers are used by the renderer:
//! - [`TriMesh`] - positions and triangles, as read from a plain OBJ file
//! - [`UvMesh`] - a [`TriMesh`] plus UV coordinates with their own per-corner
//!   indexing, so a vertex can carry different UVs on either side of a seam
//!
//! [`Connectivity`] derives half-edge adjacency from a face list.
//!
//! ```
//! use uvrender::mesh::TriMesh;
//! use nalgebra::Point3;
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
//! assert!((mesh.bounding_box_diagonal() - 2.0_f64.sqrt()).abs() < 1e-12);
//! assert!(mesh.has_boundary());
//! ```

mod connectivity;
mod index;

use std::collections::HashMap;

use nalgebra::{Point2, Point3, Vector3};

use crate::error::{RenderError, Result};

pub use connectivity::Connectivity;
pub use index::{FaceId, HalfEdgeId, VertexId};

/// A triangle mesh in face-vertex form.
#[derive(Debug, Clone, Default)]
pub struct TriMesh {
    /// Vertex positions.
    pub positions: Vec<Point3<f64>>,
    /// Triangles as indices into `positions`.
    pub faces: Vec<[usize; 3]>,
}

impl TriMesh {
    /// Create a mesh from positions and faces.
    pub fn new(positions: Vec<Point3<f64>>, faces: Vec<[usize; 3]>) -> Self {
        Self { positions, faces }
    }

    /// Number of vertices.
    #[inline]
    pub fn num_vertices(&self) -> usize {
        self.positions.len()
    }

    /// Number of faces.
    #[inline]
    pub fn num_faces(&self) -> usize {
        self.faces.len()
    }

    /// Positions of the three corners of a face.
    #[inline]
    pub fn face_positions(&self, f: usize) -> [Point3<f64>; 3] {
        let [a, b, c] = self.faces[f];
        [self.positions[a], self.positions[b], self.positions[c]]
    }

    /// Non-normalized face normal (length is twice the area).
    pub fn face_normal_scaled(&self, f: usize) -> Vector3<f64> {
        let [p0, p1, p2] = self.face_positions(f);
        (p1 - p0).cross(&(p2 - p0))
    }

    /// Area of a face.
    pub fn face_area(&self, f: usize) -> f64 {
        0.5 * self.face_normal_scaled(f).norm()
    }

    /// Area-weighted vertex normals. Unreferenced vertices get a zero normal.
    pub fn vertex_normals(&self) -> Vec<Vector3<f64>> {
        let mut normals = vec![Vector3::zeros(); self.positions.len()];
        for (fi, face) in self.faces.iter().enumerate() {
            let n = self.face_normal_scaled(fi);
            for &v in face {
                normals[v] += n;
            }
        }
        for n in &mut normals {
            let len = n.norm();
            if len > 1e-300 {
                *n /= len;
            }
        }
        normals
    }

    /// Axis-aligned bounding box, or `None` for an empty mesh.
    pub fn bounding_box(&self) -> Option<(Point3<f64>, Point3<f64>)> {
        let first = *self.positions.first()?;
        let mut min = first;
        let mut max = first;
        for p in &self.positions {
            for i in 0..3 {
                min[i] = min[i].min(p[i]);
                max[i] = max[i].max(p[i]);
            }
        }
        Some((min, max))
    }

    /// Length of the bounding-box diagonal (zero for an empty mesh).
    pub fn bounding_box_diagonal(&self) -> f64 {
        self.bounding_box()
            .map(|(min, max)| (max - min).norm())
            .unwrap_or(0.0)
    }

    /// Build half-edge connectivity for this mesh.
    pub fn connectivity(&self) -> Result<Connectivity> {
        Connectivity::from_faces(self.num_vertices(), &self.faces)
    }

    /// Per-vertex boundary flags.
    ///
    /// An undirected edge used by exactly one face is a boundary edge and
    /// both its endpoints are boundary vertices. Face orientation is not
    /// looked at, and repeated corners of degenerate faces are ignored, so
    /// this works on meshes [`Connectivity`] rejects.
    pub fn boundary_vertices(&self) -> Vec<bool> {
        let mut uses: HashMap<(usize, usize), usize> = HashMap::new();
        for face in &self.faces {
            for k in 0..3 {
                let (a, b) = (face[k], face[(k + 1) % 3]);
                if a != b {
                    *uses.entry((a.min(b), a.max(b))).or_default() += 1;
                }
            }
        }

        let mut boundary = vec![false; self.positions.len()];
        for (&(a, b), _) in uses.iter().filter(|(_, &n)| n == 1) {
            for v in [a, b] {
                if let Some(flag) = boundary.get_mut(v) {
                    *flag = true;
                }
            }
        }
        boundary
    }

    /// True if any vertex lies on the mesh boundary.
    pub fn has_boundary(&self) -> bool {
        self.boundary_vertices().iter().any(|&b| b)
    }
}

/// A triangle mesh with per-corner UV coordinates.
///
/// `uv_faces[f][k]` indexes into `uv` for corner `k` of `mesh.faces[f]`.
#[derive(Debug, Clone, Default)]
pub struct UvMesh {
    /// The 3D geometry.
    pub mesh: TriMesh,
    /// UV coordinates.
    pub uv: Vec<Point2<f64>>,
    /// Per-corner UV indices, parallel to `mesh.faces`.
    pub uv_faces: Vec<[usize; 3]>,
}

impl UvMesh {
    /// Create a UV mesh, checking that the UV faces line up with the faces.
    pub fn new(mesh: TriMesh, uv: Vec<Point2<f64>>, uv_faces: Vec<[usize; 3]>) -> Result<Self> {
        if uv_faces.len() != mesh.faces.len() {
            return Err(RenderError::UvFaceMismatch {
                faces: mesh.faces.len(),
                uv_faces: uv_faces.len(),
            });
        }
        for (fi, face) in uv_faces.iter().enumerate() {
            if let Some(&bad) = face.iter().find(|&&i| i >= uv.len()) {
                return Err(RenderError::InvalidVertexIndex { face: fi, vertex: bad });
            }
        }
        Ok(Self { mesh, uv, uv_faces })
    }

    /// UV coordinates of the three corners of a face.
    #[inline]
    pub fn face_uv(&self, f: usize) -> [Point2<f64>; 3] {
        let [a, b, c] = self.uv_faces[f];
        [self.uv[a], self.uv[b], self.uv[c]]
    }

    /// Signed area of a face in UV space.
    pub fn face_uv_area(&self, f: usize) -> f64 {
        let [p0, p1, p2] = self.face_uv(f);
        0.5 * ((p1.x - p0.x) * (p2.y - p0.y) - (p2.x - p0.x) * (p1.y - p0.y))
    }
}

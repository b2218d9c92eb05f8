//! Half-edge connectivity built from a face list.
//!
//! Interior half-edges are laid out face by face: half-edge `3 * f + k` ends
//! at corner `k` of face `f`, so walking `next` from [`Connectivity::f2he`]
//! visits the corners in the face's own vertex order. Boundary half-edges
//! have no face and are appended after the interior ones, linked into loops.

use std::collections::HashMap;

use super::index::{FaceId, HalfEdgeId, VertexId};
use crate::error::{RenderError, Result};

/// Half-edge connectivity of a triangle mesh.
#[derive(Debug, Clone)]
pub struct Connectivity {
    next: Vec<HalfEdgeId>,
    prev: Vec<HalfEdgeId>,
    twin: Vec<HalfEdgeId>,
    to: Vec<VertexId>,
    face: Vec<FaceId>,
    f2he: Vec<HalfEdgeId>,
    boundary_vertex: Vec<bool>,
}

impl Connectivity {
    /// Build connectivity for `num_vertices` vertices and the given triangles.
    ///
    /// # Example
    /// ```
    /// use uvrender::mesh::{Connectivity, FaceId};
    ///
    /// let conn = Connectivity::from_faces(4, &[[0, 1, 2], [0, 2, 3]]).unwrap();
    /// assert_eq!(conn.num_faces(), 2);
    /// assert_eq!(conn.num_boundary_halfedges(), 4);
    ///
    /// // Corners come back in face order.
    /// let corners: Vec<usize> = conn
    ///     .face_halfedges(FaceId::new(1))
    ///     .map(|he| conn.to(he).index())
    ///     .collect();
    /// assert_eq!(corners, vec![0, 2, 3]);
    /// ```
    pub fn from_faces(num_vertices: usize, faces: &[[usize; 3]]) -> Result<Self> {
        if faces.is_empty() {
            return Err(RenderError::EmptyMesh);
        }

        for (fi, face) in faces.iter().enumerate() {
            for &vi in face {
                if vi >= num_vertices {
                    return Err(RenderError::InvalidVertexIndex { face: fi, vertex: vi });
                }
            }
            if face[0] == face[1] || face[1] == face[2] || face[0] == face[2] {
                return Err(RenderError::DegenerateFace { face: fi });
            }
        }

        let num_interior = 3 * faces.len();
        let mut next = Vec::with_capacity(num_interior);
        let mut prev = Vec::with_capacity(num_interior);
        let mut to = Vec::with_capacity(num_interior);
        let mut face = Vec::with_capacity(num_interior);
        let mut f2he = Vec::with_capacity(faces.len());

        // Directed edge (from, to) -> half-edge
        let mut edge_map: HashMap<(usize, usize), HalfEdgeId> = HashMap::with_capacity(num_interior);

        for (fi, tri) in faces.iter().enumerate() {
            let base = 3 * fi;
            f2he.push(HalfEdgeId::new(base));
            for k in 0..3 {
                next.push(HalfEdgeId::new(base + (k + 1) % 3));
                prev.push(HalfEdgeId::new(base + (k + 2) % 3));
                to.push(VertexId::new(tri[k]));
                face.push(FaceId::new(fi));

                let from = tri[(k + 2) % 3];
                if edge_map.insert((from, tri[k]), HalfEdgeId::new(base + k)).is_some() {
                    return Err(RenderError::NonManifoldEdge { v0: from, v1: tri[k] });
                }
            }
        }

        let mut twin = vec![HalfEdgeId::invalid(); num_interior];
        let mut boundary_vertex = vec![false; num_vertices];

        // Boundary half-edges by origin, for loop linking
        let mut boundary_out: HashMap<usize, HalfEdgeId> = HashMap::new();

        for h in 0..num_interior {
            let dest = to[h].index();
            let origin = to[prev[h].index()].index();
            match edge_map.get(&(dest, origin)) {
                Some(&opposite) => twin[h] = opposite,
                None => {
                    let b = HalfEdgeId::new(next.len());
                    next.push(HalfEdgeId::invalid());
                    prev.push(HalfEdgeId::invalid());
                    to.push(VertexId::new(origin));
                    face.push(FaceId::invalid());
                    twin[h] = b;
                    twin.push(HalfEdgeId::new(h));
                    boundary_out.insert(dest, b);
                    boundary_vertex[dest] = true;
                    boundary_vertex[origin] = true;
                }
            }
        }

        // Link boundary loops: a boundary half-edge continues from its tip
        for b in num_interior..next.len() {
            let tip = to[b].index();
            if let Some(&b_next) = boundary_out.get(&tip) {
                next[b] = b_next;
                prev[b_next.index()] = HalfEdgeId::new(b);
            }
        }

        Ok(Self {
            next,
            prev,
            twin,
            to,
            face,
            f2he,
            boundary_vertex,
        })
    }

    /// Total number of half-edges, interior and boundary.
    #[inline]
    pub fn num_halfedges(&self) -> usize {
        self.next.len()
    }

    /// Number of faces.
    #[inline]
    pub fn num_faces(&self) -> usize {
        self.f2he.len()
    }

    /// Number of vertices the connectivity was built for.
    #[inline]
    pub fn num_vertices(&self) -> usize {
        self.boundary_vertex.len()
    }

    /// Number of half-edges without a face.
    pub fn num_boundary_halfedges(&self) -> usize {
        self.num_halfedges() - 3 * self.num_faces()
    }

    /// Next half-edge around the face or boundary loop.
    #[inline]
    pub fn next(&self, he: HalfEdgeId) -> HalfEdgeId {
        self.next[he.index()]
    }

    /// Previous half-edge around the face or boundary loop.
    #[inline]
    pub fn prev(&self, he: HalfEdgeId) -> HalfEdgeId {
        self.prev[he.index()]
    }

    /// Opposite half-edge.
    #[inline]
    pub fn twin(&self, he: HalfEdgeId) -> HalfEdgeId {
        self.twin[he.index()]
    }

    /// Vertex at the tip of a half-edge.
    #[inline]
    pub fn to(&self, he: HalfEdgeId) -> VertexId {
        self.to[he.index()]
    }

    /// Vertex at the tail of a half-edge.
    #[inline]
    pub fn from(&self, he: HalfEdgeId) -> VertexId {
        self.to(self.twin(he))
    }

    /// Face of a half-edge; invalid for boundary half-edges.
    #[inline]
    pub fn face(&self, he: HalfEdgeId) -> FaceId {
        self.face[he.index()]
    }

    /// First half-edge of a face (ends at corner 0).
    #[inline]
    pub fn f2he(&self, f: FaceId) -> HalfEdgeId {
        self.f2he[f.index()]
    }

    /// True for half-edges without a face.
    #[inline]
    pub fn is_boundary(&self, he: HalfEdgeId) -> bool {
        !self.face(he).is_valid()
    }

    /// Vertices touching a boundary half-edge. Unreferenced vertices are not
    /// boundary vertices.
    #[inline]
    pub fn is_boundary_vertex(&self, v: VertexId) -> bool {
        self.boundary_vertex[v.index()]
    }

    /// True if any vertex lies on the boundary.
    pub fn has_boundary(&self) -> bool {
        self.boundary_vertex.iter().any(|&b| b)
    }

    /// Iterate over the boundary vertices.
    pub fn boundary_vertices(&self) -> impl Iterator<Item = VertexId> + '_ {
        self.boundary_vertex
            .iter()
            .enumerate()
            .filter(|(_, &b)| b)
            .map(|(i, _)| VertexId::new(i))
    }

    /// The three half-edges of a face, in corner order.
    pub fn face_halfedges(&self, f: FaceId) -> impl Iterator<Item = HalfEdgeId> + '_ {
        let he0 = self.f2he(f);
        let he1 = self.next(he0);
        let he2 = self.next(he1);
        [he0, he1, he2].into_iter()
    }

    /// Iterate over the boundary half-edges.
    pub fn boundary_halfedges(&self) -> impl Iterator<Item = HalfEdgeId> + '_ {
        (3 * self.num_faces()..self.num_halfedges()).map(HalfEdgeId::new)
    }

    /// Check that twin and next/prev links are mutually consistent.
    pub fn is_valid(&self) -> bool {
        (0..self.num_halfedges()).map(HalfEdgeId::new).all(|he| {
            let twin = self.twin(he);
            let next = self.next(he);
            twin.is_valid()
                && self.twin(twin) == he
                && self.from(twin) == self.to(he)
                && (!next.is_valid() || self.prev(next) == he)
        })
    }
}

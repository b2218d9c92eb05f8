//! Software rasterization into face-id and barycentric matrices.
//!
//! [`point_matrix`] z-buffers a mesh and a set of marker triangles into a
//! [`PointMatrix`]: per pixel, the id of the visible face and the
//! perspective-correct barycentric coordinates of the pixel center in it.
//! Pixels not covered by a mesh face hold one of the negative sentinels.
//!
//! Row 0 of a point matrix is the top of the image.

use std::collections::HashMap;

use nalgebra::{Point2, Point3, Vector3};
use rayon::prelude::*;

use crate::camera::Camera;
use crate::error::{RenderError, Result};
use crate::mesh::{TriMesh, UvMesh};

/// Nothing drawn.
pub const FID_BACKGROUND: i32 = -1;
/// Red cone marker.
pub const FID_RED_CONE: i32 = -2;
/// Blue cone marker.
pub const FID_BLUE_CONE: i32 = -3;
/// Marker geometry past the red and blue groups (cut ribbons, outlines).
pub const FID_OVERLAY: i32 = -4;
/// Mesh pixel lying on a cut-to-singularity edge.
pub const FID_CUT: i32 = -5;

/// Ribbon width per unit of line thickness, relative to the mesh diagonal.
const RIBBON_WIDTH_RATIO: f64 = 0.002;

/// Marker faces win the depth test against surfaces up to this fraction of
/// the eye distance in front of them.
const MARKER_DEPTH_BIAS: f64 = 1e-3;

/// Per-pixel face ids and barycentric coordinates.
#[derive(Debug, Clone)]
pub struct PointMatrix {
    width: usize,
    height: usize,
    fid: Vec<i32>,
    bc: Vec<[f64; 3]>,
}

impl PointMatrix {
    /// A matrix with every pixel set to background.
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            fid: vec![FID_BACKGROUND; width * height],
            bc: vec![[0.0; 3]; width * height],
        }
    }

    /// Image width in pixels.
    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    /// Image height in pixels.
    #[inline]
    pub fn height(&self) -> usize {
        self.height
    }

    /// Face id at `(row, col)`.
    #[inline]
    pub fn fid(&self, row: usize, col: usize) -> i32 {
        self.fid[row * self.width + col]
    }

    /// Barycentric coordinates at `(row, col)`.
    #[inline]
    pub fn bc(&self, row: usize, col: usize) -> [f64; 3] {
        self.bc[row * self.width + col]
    }

    /// Overwrite a pixel.
    #[inline]
    pub fn set(&mut self, row: usize, col: usize, fid: i32, bc: [f64; 3]) {
        let i = row * self.width + col;
        self.fid[i] = fid;
        self.bc[i] = bc;
    }

    /// Face ids in row-major order.
    pub fn fids(&self) -> &[i32] {
        &self.fid
    }

    /// Barycentric coordinates in row-major order.
    pub fn bcs(&self) -> &[[f64; 3]] {
        &self.bc
    }

    /// Number of pixels showing a mesh face.
    pub fn covered_pixels(&self) -> usize {
        self.fid.iter().filter(|&&f| f >= 0).count()
    }
}

/// A triangle projected to image space, with its clip `w` per corner.
struct ScreenTriangle {
    xy: [Point2<f64>; 3],
    depth: [f64; 3],
    inv_w: [f64; 3],
}

impl ScreenTriangle {
    fn project(camera: &Camera, corners: &[Point3<f64>; 3], height: usize) -> Option<Self> {
        let mut xy = [Point2::origin(); 3];
        let mut depth = [0.0; 3];
        let mut inv_w = [0.0; 3];
        for (k, p) in corners.iter().enumerate() {
            let window = camera.project(p)?;
            xy[k] = Point2::new(window.x, height as f64 - window.y);
            depth[k] = window.z;
            inv_w[k] = 1.0 / camera.clip_w(p);
        }
        Some(Self { xy, depth, inv_w })
    }
}

#[inline]
fn edge(a: &Point2<f64>, b: &Point2<f64>, p: &Point2<f64>) -> f64 {
    (b.x - a.x) * (p.y - a.y) - (b.y - a.y) * (p.x - a.x)
}

/// Depth-tested triangle fill shared by mesh faces and markers.
struct Rasterizer<'a> {
    camera: &'a Camera,
    depth: Vec<f64>,
    out: PointMatrix,
}

impl<'a> Rasterizer<'a> {
    fn new(camera: &'a Camera, width: usize, height: usize) -> Self {
        Self {
            camera,
            depth: vec![f64::INFINITY; width * height],
            out: PointMatrix::new(width, height),
        }
    }

    /// Fill one triangle. `bias` loosens the depth test by that fraction of
    /// the remaining depth range, so coplanar markers draw over the mesh.
    fn draw(&mut self, corners: &[Point3<f64>; 3], fid: i32, bias: f64) {
        let (width, height) = (self.out.width, self.out.height);
        let tri = match ScreenTriangle::project(self.camera, corners, height) {
            Some(t) => t,
            None => return,
        };
        let [a, b, c] = &tri.xy;
        let area = edge(a, b, c);
        if area.abs() < 1e-12 {
            return;
        }

        let min_x = a.x.min(b.x).min(c.x).floor().max(0.0) as usize;
        let min_y = a.y.min(b.y).min(c.y).floor().max(0.0) as usize;
        let max_x = (a.x.max(b.x).max(c.x).ceil().min(width as f64) as usize).min(width);
        let max_y = (a.y.max(b.y).max(c.y).ceil().min(height as f64) as usize).min(height);

        for row in min_y..max_y {
            for col in min_x..max_x {
                let p = Point2::new(col as f64 + 0.5, row as f64 + 0.5);
                let w = [edge(b, c, &p) / area, edge(c, a, &p) / area, edge(a, b, &p) / area];
                if w.iter().any(|&wi| wi < -1e-12) {
                    continue;
                }

                let z = w[0] * tri.depth[0] + w[1] * tri.depth[1] + w[2] * tri.depth[2];
                let i = row * width + col;
                let mut limit = self.depth[i];
                if bias > 0.0 && limit.is_finite() {
                    limit += bias * (1.0 - limit).abs();
                }
                if !(-1.0..=1.0).contains(&z) || z >= limit {
                    continue;
                }
                self.depth[i] = z;

                let pw = [w[0] * tri.inv_w[0], w[1] * tri.inv_w[1], w[2] * tri.inv_w[2]];
                let sum = pw[0] + pw[1] + pw[2];
                let bc = if sum.abs() > 1e-300 {
                    [pw[0] / sum, pw[1] / sum, pw[2] / sum]
                } else {
                    w
                };
                self.out.set(row, col, fid, bc);
            }
        }
    }
}

fn check_faces(mesh: &TriMesh) -> Result<()> {
    for (fi, face) in mesh.faces.iter().enumerate() {
        if let Some(&v) = face.iter().find(|&&v| v >= mesh.positions.len()) {
            return Err(RenderError::InvalidVertexIndex { face: fi, vertex: v });
        }
    }
    Ok(())
}

/// Rasterize a mesh together with marker geometry.
///
/// Mesh faces write their face index. Marker face `j` writes
/// [`FID_RED_CONE`] for `j < red_size`, [`FID_BLUE_CONE`] for
/// `j < red_size + blue_size` and [`FID_OVERLAY`] otherwise. Mesh and
/// markers share one depth buffer, with markers winning ties against
/// mesh faces at the same depth. There is no back-face culling.
pub fn point_matrix(
    camera: &Camera,
    mesh: &TriMesh,
    markers: &TriMesh,
    red_size: usize,
    blue_size: usize,
    width: usize,
    height: usize,
) -> Result<PointMatrix> {
    if width == 0 {
        return Err(RenderError::invalid_param("width", width, "must be positive"));
    }
    if height == 0 {
        return Err(RenderError::invalid_param("height", height, "must be positive"));
    }
    check_faces(mesh)?;
    check_faces(markers)?;

    let mut raster = Rasterizer::new(camera, width, height);
    for fi in 0..mesh.num_faces() {
        raster.draw(&mesh.face_positions(fi), fi as i32, 0.0);
    }
    for j in 0..markers.num_faces() {
        let fid = if j < red_size {
            FID_RED_CONE
        } else if j < red_size + blue_size {
            FID_BLUE_CONE
        } else {
            FID_OVERLAY
        };
        raster.draw(&markers.face_positions(j), fid, MARKER_DEPTH_BIAS);
    }

    Ok(raster.out)
}

/// Flag mesh pixels covered by the cut overlay.
///
/// Every pixel where `cut` shows [`FID_OVERLAY`] and `main` shows a mesh
/// face becomes [`FID_CUT`] in `main`. Returns the number of rewritten
/// pixels.
pub fn mark_cut_pixels(main: &mut PointMatrix, cut: &PointMatrix) -> Result<usize> {
    if main.width != cut.width || main.height != cut.height {
        return Err(RenderError::invalid_param(
            "cut raster size",
            format!("{}x{}", cut.width, cut.height),
            "must match the main raster",
        ));
    }

    let rewritten = main
        .fid
        .par_iter_mut()
        .zip(cut.fid.par_iter())
        .map(|(m, &c)| {
            if c == FID_OVERLAY && *m >= 0 {
                *m = FID_CUT;
                1
            } else {
                0
            }
        })
        .sum();
    Ok(rewritten)
}

/// Build ribbon geometry along the seam and boundary edges of a UV layout.
///
/// An edge is a cut when it has a single incident face or when its two
/// sides carry different UV coordinates. Each cut edge becomes a quad of
/// width `thickness * 0.002 * diagonal` centered on the edge and
/// perpendicular to the averaged face normal. The ribbons sit on the
/// surface; [`point_matrix`] draws markers over coplanar mesh faces.
pub fn cut_to_singularity_edges(uv_mesh: &UvMesh, thickness: f64) -> TriMesh {
    let mesh = &uv_mesh.mesh;
    let width = thickness * RIBBON_WIDTH_RATIO * mesh.bounding_box_diagonal();
    if width <= 0.0 {
        return TriMesh::default();
    }

    // Undirected edge -> (face, uv at min vertex, uv at max vertex)
    let mut sides: HashMap<(usize, usize), Vec<(usize, Point2<f64>, Point2<f64>)>> =
        HashMap::new();
    for (fi, face) in mesh.faces.iter().enumerate() {
        let uv = uv_mesh.face_uv(fi);
        for k in 0..3 {
            let (a, b) = (face[k], face[(k + 1) % 3]);
            let (ta, tb) = (uv[k], uv[(k + 1) % 3]);
            let entry = if a < b { ((a, b), (ta, tb)) } else { ((b, a), (tb, ta)) };
            sides
                .entry(entry.0)
                .or_default()
                .push((fi, entry.1 .0, entry.1 .1));
        }
    }

    let mut edges: Vec<_> = sides
        .into_iter()
        .filter(|(_, s)| s.len() != 2 || s[0].1 != s[1].1 || s[0].2 != s[1].2)
        .collect();
    edges.sort_by_key(|(key, _)| *key);

    let mut out = TriMesh::default();
    for ((a, b), s) in edges {
        let normal: Vector3<f64> = s.iter().map(|(fi, _, _)| mesh.face_normal_scaled(*fi)).sum();
        let (pa, pb) = (mesh.positions[a], mesh.positions[b]);
        let dir = pb - pa;
        let side = normal.cross(&dir);
        if normal.norm() < 1e-300 || side.norm() < 1e-300 {
            continue;
        }
        let side = side.normalize() * (0.5 * width);

        let base = out.positions.len();
        out.positions.extend([pa - side, pa + side, pb + side, pb - side]);
        out.faces.push([base, base + 1, base + 2]);
        out.faces.push([base, base + 2, base + 3]);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit_square() -> TriMesh {
        TriMesh::new(
            vec![
                Point3::new(0.0, 0.0, 0.0),
                Point3::new(1.0, 0.0, 0.0),
                Point3::new(1.0, 1.0, 0.0),
                Point3::new(0.0, 1.0, 0.0),
            ],
            vec![[0, 1, 2], [0, 2, 3]],
        )
    }

    fn square_uv(mesh: TriMesh) -> UvMesh {
        let uv = mesh.positions.iter().map(|p| Point2::new(p.x, p.y)).collect();
        let faces = mesh.faces.clone();
        UvMesh::new(mesh, uv, faces).unwrap()
    }

    fn front_camera(width: u32, height: u32) -> Camera {
        Camera::look_at(
            Point3::new(0.5, 0.5, 2.0),
            Point3::new(0.5, 0.5, 0.0),
            Vector3::y(),
            std::f64::consts::FRAC_PI_4,
            width,
            height,
        )
    }

    #[test]
    fn test_square_covers_center_not_corners() {
        let cam = front_camera(64, 48);
        let pm = point_matrix(&cam, &unit_square(), &TriMesh::default(), 0, 0, 64, 48).unwrap();
        assert!(pm.fid(24, 32) >= 0);
        assert_eq!(pm.fid(0, 0), FID_BACKGROUND);
        assert_eq!(pm.fid(47, 63), FID_BACKGROUND);

        let bc = pm.bc(24, 32);
        assert!((bc[0] + bc[1] + bc[2] - 1.0).abs() < 1e-9);
        assert!(bc.iter().all(|&w| w >= -1e-9));
    }

    #[test]
    fn test_top_row_is_top_of_image() {
        // Only the upper triangle of the square (y > x) is drawn.
        let mut mesh = unit_square();
        mesh.faces = vec![[0, 2, 3]];
        let cam = front_camera(64, 64);
        let pm = point_matrix(&cam, &mesh, &TriMesh::default(), 0, 0, 64, 64).unwrap();
        // Upper-left quadrant is inside, lower-right is not.
        assert_eq!(pm.fid(24, 24), 0);
        assert_eq!(pm.fid(40, 40), FID_BACKGROUND);
    }

    #[test]
    fn test_marker_groups_and_depth() {
        let cam = front_camera(64, 64);
        let mut markers = TriMesh::default();
        // Three small triangles in front of the square, left to right.
        for (i, x) in [0.2, 0.5, 0.8].iter().enumerate() {
            let base = 3 * i;
            markers.positions.extend([
                Point3::new(x - 0.05, 0.45, 0.1),
                Point3::new(x + 0.05, 0.45, 0.1),
                Point3::new(*x, 0.55, 0.1),
            ]);
            markers.faces.push([base, base + 1, base + 2]);
        }
        let pm = point_matrix(&cam, &unit_square(), &markers, 1, 1, 64, 64).unwrap();

        let center_of = |x: f64| {
            let w = cam.project(&Point3::new(x, 0.49, 0.1)).unwrap();
            pm.fid(64 - w.y as usize - 1, w.x as usize)
        };
        assert_eq!(center_of(0.2), FID_RED_CONE);
        assert_eq!(center_of(0.5), FID_BLUE_CONE);
        assert_eq!(center_of(0.8), FID_OVERLAY);
    }

    #[test]
    fn test_coplanar_marker_draws_over_mesh() {
        let cam = front_camera(32, 32);
        let square = unit_square();
        let markers = TriMesh::new(square.positions.clone(), vec![[0, 1, 2]]);
        let pm = point_matrix(&cam, &square, &markers, 0, 0, 32, 32).unwrap();

        let mut overlay = 0;
        for row in 0..32 {
            for col in 0..32 {
                match pm.fid(row, col) {
                    FID_OVERLAY => overlay += 1,
                    f => assert_ne!(f, 0, "face 0 visible at ({}, {})", row, col),
                }
            }
        }
        assert!(overlay > 0);
        assert!(pm.fids().contains(&1));
    }

    #[test]
    fn test_markers_behind_mesh_are_hidden() {
        let cam = front_camera(32, 32);
        let markers = TriMesh::new(
            vec![
                Point3::new(0.0, 0.0, -0.5),
                Point3::new(1.0, 0.0, -0.5),
                Point3::new(0.5, 1.0, -0.5),
            ],
            vec![[0, 1, 2]],
        );
        let pm = point_matrix(&cam, &unit_square(), &markers, 1, 0, 32, 32).unwrap();
        assert!(pm.fid(16, 16) >= 0);
    }

    #[test]
    fn test_rejects_zero_size_and_bad_faces() {
        let cam = front_camera(8, 8);
        assert!(point_matrix(&cam, &unit_square(), &TriMesh::default(), 0, 0, 0, 8).is_err());

        let mut bad = unit_square();
        bad.faces.push([0, 1, 9]);
        let err = point_matrix(&cam, &bad, &TriMesh::default(), 0, 0, 8, 8).unwrap_err();
        assert!(matches!(err, RenderError::InvalidVertexIndex { face: 2, vertex: 9 }));
    }

    #[test]
    fn test_mark_cut_pixels_only_touches_overlay_on_faces() {
        let mut main = PointMatrix::new(3, 1);
        main.set(0, 0, 4, [1.0, 0.0, 0.0]);
        main.set(0, 1, 5, [0.0, 1.0, 0.0]);
        main.set(0, 2, FID_RED_CONE, [0.0; 3]);

        let mut cut = PointMatrix::new(3, 1);
        cut.set(0, 0, FID_OVERLAY, [0.0; 3]);
        cut.set(0, 1, 7, [0.0; 3]);
        cut.set(0, 2, FID_OVERLAY, [0.0; 3]);

        assert_eq!(mark_cut_pixels(&mut main, &cut).unwrap(), 1);
        assert_eq!(main.fids(), &[FID_CUT, 5, FID_RED_CONE]);
        assert_eq!(main.bc(0, 1), [0.0, 1.0, 0.0]);

        let wrong = PointMatrix::new(2, 2);
        assert!(mark_cut_pixels(&mut main, &wrong).is_err());
    }

    #[test]
    fn test_cut_edges_of_square_are_its_boundary() {
        let ribbons = cut_to_singularity_edges(&square_uv(unit_square()), 1.0);
        // Four boundary edges, the diagonal is shared with matching UVs.
        assert_eq!(ribbons.num_faces(), 8);
        assert_eq!(ribbons.num_vertices(), 16);
        // Flat on the square
        assert!(ribbons.positions.iter().all(|p| p.z == 0.0));
    }

    #[test]
    fn test_uv_seam_is_a_cut() {
        let mesh = unit_square();
        let uv = vec![
            Point2::new(0.0, 0.0),
            Point2::new(1.0, 0.0),
            Point2::new(1.0, 1.0),
            Point2::new(0.0, 1.0),
            Point2::new(2.0, 2.0),
            Point2::new(3.0, 3.0),
        ];
        // Second face uses its own copies of the diagonal's UVs.
        let uv_mesh = UvMesh::new(mesh, uv, vec![[0, 1, 2], [4, 5, 3]]).unwrap();
        let ribbons = cut_to_singularity_edges(&uv_mesh, 1.0);
        assert_eq!(ribbons.num_faces(), 10);
    }

    #[test]
    fn test_cut_overlay_flags_square_border() {
        let cam = front_camera(64, 64);
        let square = unit_square();
        let ribbons = cut_to_singularity_edges(&square_uv(square.clone()), 25.0);

        let mut main = point_matrix(&cam, &square, &TriMesh::default(), 0, 0, 64, 64).unwrap();
        let cut = point_matrix(&cam, &square, &ribbons, 0, 0, 64, 64).unwrap();
        let before = main.covered_pixels();
        let rewritten = mark_cut_pixels(&mut main, &cut).unwrap();

        assert!(rewritten > 0);
        assert_eq!(main.covered_pixels(), before - rewritten);
        // Interior stays a face
        assert!(main.fid(32, 32) >= 0);
        // Left border column inside the square is cut
        let row = 32;
        let first = (0..64).find(|&col| main.fid(row, col) != FID_BACKGROUND).unwrap();
        assert_eq!(main.fid(row, first), FID_CUT);
    }
}

//! Compositing of rasterized meshes into color images.
//!
//! [`color_mesh_with_grid`] turns a [`PointMatrix`] into colors: energy
//! through a colormap with a UV grid drawn on top, fixed colors for the
//! sentinel pixels. [`add_shading`] then applies headlight shading.

use std::path::Path;

use image::{Rgb, RgbImage};
use rayon::prelude::*;

use crate::camera::Camera;
use crate::colormap::{CenteredNorm, Colormap};
use crate::error::{RenderError, Result};
use crate::mesh::{Connectivity, FaceId, TriMesh, UvMesh};
use crate::raster::{PointMatrix, FID_BACKGROUND, FID_BLUE_CONE, FID_RED_CONE};

const WHITE: [f64; 3] = [1.0, 1.0, 1.0];
const BLACK: [f64; 3] = [0.0, 0.0, 0.0];
const RED: [f64; 3] = [1.0, 0.0, 0.0];
const BLUE: [f64; 3] = [0.0, 0.0, 1.0];

/// Brightness of grid lines relative to the underlying color.
const GRID_DARKEN: f64 = 0.25;

/// An RGB image with channels in `[0, 1]`, row 0 at the top.
#[derive(Debug, Clone, PartialEq)]
pub struct ColorImage {
    width: usize,
    height: usize,
    pixels: Vec<[f64; 3]>,
}

impl ColorImage {
    /// A white image.
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            pixels: vec![WHITE; width * height],
        }
    }

    /// Image width in pixels.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Image height in pixels.
    pub fn height(&self) -> usize {
        self.height
    }

    /// Color at `(row, col)`.
    #[inline]
    pub fn get(&self, row: usize, col: usize) -> [f64; 3] {
        self.pixels[row * self.width + col]
    }

    /// Convert to an 8-bit image.
    pub fn to_rgb8(&self) -> Result<RgbImage> {
        let width = u32::try_from(self.width)
            .map_err(|_| RenderError::invalid_param("width", self.width, "too large"))?;
        let height = u32::try_from(self.height)
            .map_err(|_| RenderError::invalid_param("height", self.height, "too large"))?;
        Ok(RgbImage::from_fn(width, height, |x, y| {
            let c = self.get(y as usize, x as usize);
            Rgb(c.map(|v| (v.clamp(0.0, 1.0) * 255.0).round() as u8))
        }))
    }

    /// Write the image as PNG.
    pub fn save_png<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        self.to_rgb8()?.save(path.as_ref())?;
        Ok(())
    }
}

/// UV coordinates of the corner at the tip of every half-edge.
///
/// Returns `(u, v)` indexed by half-edge; boundary half-edges get zero.
pub fn corner_uv(conn: &Connectivity, uv_mesh: &UvMesh) -> Result<(Vec<f64>, Vec<f64>)> {
    if conn.num_faces() != uv_mesh.uv_faces.len() {
        return Err(RenderError::UvFaceMismatch {
            faces: conn.num_faces(),
            uv_faces: uv_mesh.uv_faces.len(),
        });
    }

    let mut u = vec![0.0; conn.num_halfedges()];
    let mut v = vec![0.0; conn.num_halfedges()];
    for (f, uv_face) in uv_mesh.uv_faces.iter().enumerate() {
        for (he, &t) in conn.face_halfedges(FaceId::new(f)).zip(uv_face) {
            let p = uv_mesh.uv[t];
            u[he.index()] = p.x;
            v[he.index()] = p.y;
        }
    }
    Ok((u, v))
}

/// Inputs of [`color_mesh_with_grid`] that describe the mesh surface.
#[derive(Debug, Clone, Copy)]
pub struct SurfaceField<'a> {
    /// Connectivity of the rendered faces.
    pub conn: &'a Connectivity,
    /// Per-half-edge `u` from [`corner_uv`].
    pub u: &'a [f64],
    /// Per-half-edge `v` from [`corner_uv`].
    pub v: &'a [f64],
    /// Per-vertex energy.
    pub energy: &'a [f64],
}

/// Grid line parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Grid {
    /// Number of grid cells per `uv_scale`.
    pub lines: f64,
    /// Fraction of each cell covered by the line.
    pub thickness: f64,
    /// UV length mapped onto `lines` cells. Negative values mirror the
    /// grid; zero draws no lines.
    pub uv_scale: f64,
}

impl Grid {
    /// The renderer's grid: 50 lines per `uv_scale`, 10% line width.
    pub fn new(uv_scale: f64) -> Self {
        Self {
            lines: 50.0,
            thickness: 0.1,
            uv_scale,
        }
    }

    #[inline]
    fn on_line(&self, u: f64, v: f64) -> bool {
        if self.uv_scale == 0.0 || !self.uv_scale.is_finite() {
            return false;
        }
        let su = u * self.lines / self.uv_scale;
        let sv = v * self.lines / self.uv_scale;
        (su - su.floor()) < self.thickness || (sv - sv.floor()) < self.thickness
    }
}

/// Color a rasterized mesh by energy and overlay the UV grid.
pub fn color_mesh_with_grid(
    pm: &PointMatrix,
    surface: &SurfaceField<'_>,
    colormap: Colormap,
    norm: &CenteredNorm,
    grid: &Grid,
) -> Result<ColorImage> {
    let conn = surface.conn;
    if let Some(&bad) = pm.fids().iter().find(|&&f| f >= 0 && f as usize >= conn.num_faces()) {
        return Err(RenderError::invalid_param(
            "face id",
            bad,
            "not a face of the colored mesh",
        ));
    }

    let mut image = ColorImage::new(pm.width(), pm.height());
    let width = pm.width();
    image
        .pixels
        .par_chunks_mut(width.max(1))
        .enumerate()
        .for_each(|(row, out)| {
            for (col, pixel) in out.iter_mut().enumerate() {
                *pixel = match pm.fid(row, col) {
                    f if f >= 0 => {
                        let bc = pm.bc(row, col);
                        let (mut u, mut v, mut r) = (0.0, 0.0, 0.0);
                        for (k, he) in conn.face_halfedges(FaceId::new(f as usize)).enumerate() {
                            u += bc[k] * surface.u[he.index()];
                            v += bc[k] * surface.v[he.index()];
                            r += bc[k] * surface.energy[conn.to(he).index()];
                        }
                        let color = colormap.rgb(norm.apply(r));
                        if grid.on_line(u, v) {
                            color.map(|c| c * GRID_DARKEN)
                        } else {
                            color
                        }
                    }
                    FID_BACKGROUND => WHITE,
                    FID_RED_CONE => RED,
                    FID_BLUE_CONE => BLUE,
                    _ => BLACK,
                };
            }
        });
    Ok(image)
}

/// Headlight shading of mesh pixels, in place.
///
/// Each face pixel is scaled by `0.3 + 0.7 |n_z|`, where `n` is the
/// interpolated vertex normal in eye space.
pub fn add_shading(
    image: &mut ColorImage,
    mesh: &TriMesh,
    pm: &PointMatrix,
    camera: &Camera,
) -> Result<()> {
    if image.width != pm.width() || image.height != pm.height() {
        return Err(RenderError::invalid_param(
            "image size",
            format!("{}x{}", image.width, image.height),
            "must match the point matrix",
        ));
    }
    if let Some(&bad) = pm.fids().iter().find(|&&f| f >= 0 && f as usize >= mesh.num_faces()) {
        return Err(RenderError::invalid_param(
            "face id",
            bad,
            "not a face of the shaded mesh",
        ));
    }

    let normals = mesh.vertex_normals();
    let rotation = camera.view_rotation();
    let width = image.width;
    image
        .pixels
        .par_chunks_mut(width.max(1))
        .enumerate()
        .for_each(|(row, out)| {
            for (col, pixel) in out.iter_mut().enumerate() {
                let f = pm.fid(row, col);
                if f < 0 {
                    continue;
                }
                let bc = pm.bc(row, col);
                let face = mesh.faces[f as usize];
                let n = normals[face[0]] * bc[0] + normals[face[1]] * bc[1] + normals[face[2]] * bc[2];
                let n = rotation * n;
                let len = n.norm();
                let nz = if len > 1e-300 { n.z / len } else { 0.0 };
                let light = 0.3 + 0.7 * nz.abs();
                *pixel = pixel.map(|c| c * light);
            }
        });
    Ok(())
}

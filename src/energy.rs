//! Per-vertex distortion energies of a UV layout.
//!
//! Each energy compares a face's UV triangle with its 3D triangle and
//! spreads the per-face (or per-edge) value to the vertices. Faces that are
//! degenerate in either space contribute nothing.
//!
//! # Example
//!
//! ```
//! use uvrender::energy::{vertex_energy, EnergyChoice};
//! use uvrender::mesh::{TriMesh, UvMesh};
//! use nalgebra::{Point2, Point3};
//!
//! let mesh = TriMesh::new(
//!     vec![Point3::new(0.0, 0.0, 0.0), Point3::new(1.0, 0.0, 0.0), Point3::new(0.0, 1.0, 0.0)],
//!     vec![[0, 1, 2]],
//! );
//! // UVs are the 3D layout scaled by two
//! let uv = vec![Point2::new(0.0, 0.0), Point2::new(2.0, 0.0), Point2::new(0.0, 2.0)];
//! let uv_mesh = UvMesh::new(mesh, uv, vec![[0, 1, 2]]).unwrap();
//!
//! let r = vertex_energy(&uv_mesh, EnergyChoice::ScaleFactors);
//! assert!((r[0] - 2.0_f64.ln()).abs() < 1e-12);
//! ```

use std::fmt;

use clap::ValueEnum;
use nalgebra::{Matrix2, Vector2};
use rayon::prelude::*;

use crate::mesh::UvMesh;

const DEGENERATE_AREA: f64 = 1e-14;

/// Which energy drives the colormap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum EnergyChoice {
    /// Log of the conformal scale factor, `0.5 ln(A_uv / A_3d)`
    #[default]
    #[value(name = "scale_factors")]
    ScaleFactors,
    /// Log edge-length ratio, `2 ln(l_uv / l_3d)`
    #[value(name = "log_length")]
    LogLength,
    /// Symmetric Dirichlet energy, zero for isometries
    #[value(name = "sym_dirichlet")]
    SymDirichlet,
    /// Ratio of singular values minus one, zero for conformal maps
    #[value(name = "quasi_conformal")]
    QuasiConformal,
    /// Constant zero field
    #[value(name = "none")]
    None,
}

impl fmt::Display for EnergyChoice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.to_possible_value() {
            Some(v) => f.write_str(v.get_name()),
            None => write!(f, "{:?}", self),
        }
    }
}

/// Compute one energy value per vertex of the UV mesh.
pub fn vertex_energy(uv_mesh: &UvMesh, choice: EnergyChoice) -> Vec<f64> {
    let n = uv_mesh.mesh.num_vertices();
    match choice {
        EnergyChoice::None => vec![0.0; n],
        EnergyChoice::LogLength => log_length_energy(uv_mesh),
        EnergyChoice::ScaleFactors => area_average(uv_mesh, |_, area_3d, area_uv| {
            0.5 * (area_uv / area_3d).ln()
        }),
        EnergyChoice::SymDirichlet => area_average(uv_mesh, |jac, _, _| {
            let (s1, s2) = singular_values(jac);
            s1 * s1 + s2 * s2 + 1.0 / (s1 * s1) + 1.0 / (s2 * s2) - 4.0
        }),
        EnergyChoice::QuasiConformal => area_average(uv_mesh, |jac, _, _| {
            let (s1, s2) = singular_values(jac);
            s1 / s2 - 1.0
        }),
    }
}

/// Jacobian of the map from a face's local 3D frame to UV space.
fn face_jacobian(uv_mesh: &UvMesh, f: usize) -> Option<Matrix2<f64>> {
    let [p0, p1, p2] = uv_mesh.mesh.face_positions(f);
    let [t0, t1, t2] = uv_mesh.face_uv(f);

    let e1 = p1 - p0;
    let e2 = p2 - p0;
    let len1 = e1.norm();
    let normal = e1.cross(&e2);
    if len1 < DEGENERATE_AREA || normal.norm() < DEGENERATE_AREA {
        return None;
    }
    let x_axis = e1 / len1;
    let y_axis = normal.cross(&x_axis).normalize();

    let local = Matrix2::from_columns(&[
        Vector2::new(len1, 0.0),
        Vector2::new(e2.dot(&x_axis), e2.dot(&y_axis)),
    ]);
    let uv = Matrix2::from_columns(&[t1 - t0, t2 - t0]);
    local.try_inverse().map(|inv| uv * inv)
}

/// Largest and smallest singular value.
fn singular_values(jac: &Matrix2<f64>) -> (f64, f64) {
    let s = jac.singular_values();
    (s[0].max(s[1]), s[0].min(s[1]))
}

/// Average a per-face quantity onto vertices, weighted by 3D face area.
fn area_average<F>(uv_mesh: &UvMesh, face_value: F) -> Vec<f64>
where
    F: Fn(&Matrix2<f64>, f64, f64) -> f64 + Sync,
{
    let mesh = &uv_mesh.mesh;
    let per_face: Vec<Option<(f64, f64)>> = (0..mesh.num_faces())
        .into_par_iter()
        .map(|f| {
            let area_3d = mesh.face_area(f);
            let area_uv = uv_mesh.face_uv_area(f).abs();
            if area_3d < DEGENERATE_AREA || area_uv < DEGENERATE_AREA {
                return None;
            }
            let jac = face_jacobian(uv_mesh, f)?;
            let value = face_value(&jac, area_3d, area_uv);
            value.is_finite().then_some((value, area_3d))
        })
        .collect();

    let mut sum = vec![0.0; mesh.num_vertices()];
    let mut weight = vec![0.0; mesh.num_vertices()];
    for (face, value) in mesh.faces.iter().zip(&per_face) {
        if let Some((value, area)) = value {
            for &v in face {
                sum[v] += value * area;
                weight[v] += area;
            }
        }
    }
    sum.iter()
        .zip(&weight)
        .map(|(&s, &w)| if w > 0.0 { s / w } else { 0.0 })
        .collect()
}

fn log_length_energy(uv_mesh: &UvMesh) -> Vec<f64> {
    let mesh = &uv_mesh.mesh;
    let mut sum = vec![0.0; mesh.num_vertices()];
    let mut count = vec![0usize; mesh.num_vertices()];

    for (f, face) in mesh.faces.iter().enumerate() {
        let positions = mesh.face_positions(f);
        let uv = uv_mesh.face_uv(f);
        for k in 0..3 {
            let j = (k + 1) % 3;
            let l_3d = (positions[j] - positions[k]).norm();
            let l_uv = (uv[j] - uv[k]).norm();
            if l_3d < DEGENERATE_AREA || l_uv < DEGENERATE_AREA {
                continue;
            }
            let value = 2.0 * (l_uv / l_3d).ln();
            for v in [face[k], face[j]] {
                sum[v] += value;
                count[v] += 1;
            }
        }
    }
    sum.iter()
        .zip(&count)
        .map(|(&s, &c)| if c > 0 { s / c as f64 } else { 0.0 })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::TriMesh;
    use nalgebra::{Point2, Point3};

    /// Unit square in the xy-plane with UVs `(sx * x, sy * y)`.
    fn stretched_square(sx: f64, sy: f64) -> UvMesh {
        let positions = vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(1.0, 1.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
        ];
        let uv = positions.iter().map(|p| Point2::new(sx * p.x, sy * p.y)).collect();
        let faces = vec![[0, 1, 2], [0, 2, 3]];
        UvMesh::new(TriMesh::new(positions, faces.clone()), uv, faces).unwrap()
    }

    #[test]
    fn test_isometry_has_zero_energy() {
        let uv_mesh = stretched_square(1.0, 1.0);
        for choice in [
            EnergyChoice::ScaleFactors,
            EnergyChoice::LogLength,
            EnergyChoice::SymDirichlet,
            EnergyChoice::QuasiConformal,
            EnergyChoice::None,
        ] {
            let r = vertex_energy(&uv_mesh, choice);
            assert_eq!(r.len(), 4);
            assert!(r.iter().all(|v| v.abs() < 1e-9), "{} not zero: {:?}", choice, r);
        }
    }

    #[test]
    fn test_uniform_scale() {
        let uv_mesh = stretched_square(3.0, 3.0);
        let scale = vertex_energy(&uv_mesh, EnergyChoice::ScaleFactors);
        assert!(scale.iter().all(|v| (v - 3.0_f64.ln()).abs() < 1e-9));

        let log_length = vertex_energy(&uv_mesh, EnergyChoice::LogLength);
        assert!(log_length.iter().all(|v| (v - 2.0 * 3.0_f64.ln()).abs() < 1e-9));

        // Conformal, so no anisotropy
        let qc = vertex_energy(&uv_mesh, EnergyChoice::QuasiConformal);
        assert!(qc.iter().all(|v| v.abs() < 1e-9));

        let sd = vertex_energy(&uv_mesh, EnergyChoice::SymDirichlet);
        let expected = 2.0 * 9.0 + 2.0 / 9.0 - 4.0;
        assert!(sd.iter().all(|v| (v - expected).abs() < 1e-9));
    }

    #[test]
    fn test_anisotropic_stretch() {
        let uv_mesh = stretched_square(2.0, 1.0);
        let qc = vertex_energy(&uv_mesh, EnergyChoice::QuasiConformal);
        assert!(qc.iter().all(|v| (v - 1.0).abs() < 1e-9));
    }

    #[test]
    fn test_degenerate_uv_face_is_ignored() {
        let mut uv_mesh = stretched_square(1.0, 1.0);
        // Collapse the second face in UV space only
        uv_mesh.uv.push(Point2::new(5.0, 5.0));
        uv_mesh.uv_faces[1] = [4, 4, 4];
        let r = vertex_energy(&uv_mesh, EnergyChoice::ScaleFactors);
        // Vertex 3 only touches the collapsed face
        assert_eq!(r[3], 0.0);
        assert!(r[1].abs() < 1e-9);
    }

    #[test]
    fn test_names() {
        assert_eq!(EnergyChoice::ScaleFactors.to_string(), "scale_factors");
        assert_eq!(
            EnergyChoice::from_str("sym_dirichlet", false).unwrap(),
            EnergyChoice::SymDirichlet
        );
        assert!(EnergyChoice::from_str("bogus", false).is_err());
    }
}

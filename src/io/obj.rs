//! Wavefront OBJ support.
//!
//! Only the records the renderer needs are read: `v`, `vt` and `f`. Other
//! records (`vn`, `o`, `g`, `usemtl`, ...) are skipped. Polygons are fan
//! triangulated.

use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;
use std::str::SplitWhitespace;

use nalgebra::{Point2, Point3};

use crate::error::{RenderError, Result};
use crate::mesh::{TriMesh, UvMesh};

/// Raw OBJ content with corner UV indices kept per face.
#[derive(Debug, Default)]
struct ObjData {
    positions: Vec<Point3<f64>>,
    uv: Vec<Point2<f64>>,
    faces: Vec<[usize; 3]>,
    uv_faces: Vec<Option<[usize; 3]>>,
}

/// Load positions and triangles from an OBJ file, ignoring UVs.
///
/// # Example
///
/// ```no_run
/// use uvrender::io::obj;
///
/// let mesh = obj::read_triangle_mesh("data/meshes/bunny.obj").unwrap();
/// println!("{} faces", mesh.num_faces());
/// ```
pub fn read_triangle_mesh<P: AsRef<Path>>(path: P) -> Result<TriMesh> {
    let data = parse(path.as_ref())?;
    Ok(TriMesh::new(data.positions, data.faces))
}

/// Load an OBJ file with per-corner UV coordinates.
///
/// Every face must reference texture coordinates (`f v/vt ...`).
pub fn read_uv_mesh<P: AsRef<Path>>(path: P) -> Result<UvMesh> {
    let path = path.as_ref();
    let data = parse(path)?;

    let uv_faces = data
        .uv_faces
        .iter()
        .enumerate()
        .map(|(fi, uvf)| {
            uvf.ok_or_else(|| RenderError::Obj {
                path: path.to_path_buf(),
                line: 0,
                message: format!("face {} has no texture coordinates", fi),
            })
        })
        .collect::<Result<Vec<_>>>()?;

    UvMesh::new(TriMesh::new(data.positions, data.faces), data.uv, uv_faces)
}

/// Write a UV mesh as `v`, `vt` and `f v/vt` records.
pub fn write_uv_mesh<P: AsRef<Path>>(mesh: &UvMesh, path: P) -> Result<()> {
    let file = File::create(path.as_ref())?;
    let mut writer = BufWriter::new(file);

    writeln!(writer, "# Generated by uvrender")?;
    for p in &mesh.mesh.positions {
        writeln!(writer, "v {} {} {}", p.x, p.y, p.z)?;
    }
    for t in &mesh.uv {
        writeln!(writer, "vt {} {}", t.x, t.y)?;
    }
    for (f, t) in mesh.mesh.faces.iter().zip(&mesh.uv_faces) {
        writeln!(
            writer,
            "f {}/{} {}/{} {}/{}",
            f[0] + 1,
            t[0] + 1,
            f[1] + 1,
            t[1] + 1,
            f[2] + 1,
            t[2] + 1
        )?;
    }
    writer.flush()?;
    Ok(())
}

fn parse(path: &Path) -> Result<ObjData> {
    let file = File::open(path)?;
    parse_reader(BufReader::new(file), path)
}

fn parse_reader<R: BufRead>(reader: R, path: &Path) -> Result<ObjData> {
    let mut data = ObjData::default();

    for (line_idx, line) in reader.lines().enumerate() {
        let line = line?;
        let line_no = line_idx + 1;
        let err = |message: String| RenderError::Obj {
            path: path.to_path_buf(),
            line: line_no,
            message,
        };

        let mut tokens = line.split_whitespace();
        match tokens.next() {
            Some("v") => {
                let [x, y, z] = parse_floats::<3>(&mut tokens).map_err(err)?;
                data.positions.push(Point3::new(x, y, z));
            }
            Some("vt") => {
                let [u, v] = parse_floats::<2>(&mut tokens).map_err(err)?;
                data.uv.push(Point2::new(u, v));
            }
            Some("f") => {
                let mut corners = Vec::with_capacity(4);
                for token in tokens {
                    corners.push(
                        parse_corner(token, data.positions.len(), data.uv.len()).map_err(&err)?,
                    );
                }
                if corners.len() < 3 {
                    return Err(err(format!("face has {} corners", corners.len())));
                }
                // Fan triangulation around the first corner
                for i in 1..corners.len() - 1 {
                    let (a, b, c) = (corners[0], corners[i], corners[i + 1]);
                    data.faces.push([a.0, b.0, c.0]);
                    data.uv_faces.push(match (a.1, b.1, c.1) {
                        (Some(ta), Some(tb), Some(tc)) => Some([ta, tb, tc]),
                        _ => None,
                    });
                }
            }
            _ => {}
        }
    }

    Ok(data)
}

fn parse_floats<const N: usize>(
    tokens: &mut SplitWhitespace<'_>,
) -> std::result::Result<[f64; N], String> {
    let mut out = [0.0; N];
    for slot in out.iter_mut() {
        let token = tokens
            .next()
            .ok_or_else(|| format!("expected {} coordinates", N))?;
        *slot = token
            .parse()
            .map_err(|_| format!("invalid number '{}'", token))?;
    }
    Ok(out)
}

/// Parse a `v`, `v/vt`, `v//vn` or `v/vt/vn` corner into 0-based indices.
fn parse_corner(
    token: &str,
    num_positions: usize,
    num_uv: usize,
) -> std::result::Result<(usize, Option<usize>), String> {
    let mut parts = token.split('/');
    let v = parts
        .next()
        .ok_or_else(|| format!("empty face corner '{}'", token))?;
    let v = resolve_index(v, num_positions)?;
    let vt = match parts.next() {
        Some(s) if !s.is_empty() => Some(resolve_index(s, num_uv)?),
        _ => None,
    };
    Ok((v, vt))
}

/// Resolve a 1-based or negative (relative) OBJ index.
fn resolve_index(token: &str, count: usize) -> std::result::Result<usize, String> {
    let raw: i64 = token
        .parse()
        .map_err(|_| format!("invalid index '{}'", token))?;
    let resolved = if raw > 0 {
        raw - 1
    } else if raw < 0 {
        count as i64 + raw
    } else {
        return Err("OBJ indices start at 1".to_string());
    };
    if resolved < 0 || resolved as usize >= count {
        return Err(format!("index {} out of range ({} defined)", raw, count));
    }
    Ok(resolved as usize)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn parse_str(s: &str) -> Result<ObjData> {
        parse_reader(Cursor::new(s), Path::new("test.obj"))
    }

    #[test]
    fn test_parse_quad_with_uvs() {
        let data = parse_str(
            "# square\n\
             v 0 0 0\nv 1 0 0\nv 1 1 0\nv 0 1 0\n\
             vt 0 0\nvt 1 0\nvt 1 1\nvt 0 1\n\
             vn 0 0 1\n\
             f 1/1/1 2/2/1 3/3/1 4/4/1\n",
        )
        .unwrap();
        assert_eq!(data.positions.len(), 4);
        assert_eq!(data.uv.len(), 4);
        assert_eq!(data.faces, vec![[0, 1, 2], [0, 2, 3]]);
        assert_eq!(data.uv_faces, vec![Some([0, 1, 2]), Some([0, 2, 3])]);
    }

    #[test]
    fn test_distinct_uv_indexing() {
        let data = parse_str(
            "v 0 0 0\nv 1 0 0\nv 0 1 0\nvt 0 0\nvt 0.5 0\nvt 0 0.5\nvt 9 9\nf 1/4 2/2 3/3\n",
        )
        .unwrap();
        assert_eq!(data.faces, vec![[0, 1, 2]]);
        assert_eq!(data.uv_faces, vec![Some([3, 1, 2])]);
    }

    #[test]
    fn test_negative_indices_and_normals_only() {
        let data = parse_str("v 0 0 0\nv 1 0 0\nv 0 1 0\nf -3//1 -2//1 -1//1\n").unwrap();
        assert_eq!(data.faces, vec![[0, 1, 2]]);
        assert_eq!(data.uv_faces, vec![None]);
    }

    #[test]
    fn test_errors_report_line() {
        let err = parse_str("v 0 0 0\nv 1 0\n").unwrap_err();
        match err {
            RenderError::Obj { line, .. } => assert_eq!(line, 2),
            other => panic!("unexpected error {:?}", other),
        }

        let err = parse_str("v 0 0 0\nv 1 0 0\nv 0 1 0\nf 1 2 7\n").unwrap_err();
        assert!(matches!(err, RenderError::Obj { line: 4, .. }));
    }

    #[test]
    fn test_write_then_read_uv_mesh() {
        let mesh = UvMesh::new(
            TriMesh::new(
                vec![
                    Point3::new(0.0, 0.0, 0.0),
                    Point3::new(1.0, 0.0, 0.0),
                    Point3::new(0.0, 1.0, 0.0),
                ],
                vec![[0, 1, 2]],
            ),
            vec![Point2::new(0.25, 0.0), Point2::new(1.0, 0.5), Point2::new(0.0, 0.75)],
            vec![[2, 0, 1]],
        )
        .unwrap();

        let path = std::env::temp_dir().join(format!("uvrender_obj_{}.obj", std::process::id()));
        write_uv_mesh(&mesh, &path).unwrap();
        let back = read_uv_mesh(&path).unwrap();
        let _ = std::fs::remove_file(&path);

        assert_eq!(back.mesh.faces, mesh.mesh.faces);
        assert_eq!(back.uv_faces, mesh.uv_faces);
        assert_eq!(back.uv, mesh.uv);
    }
}

//! Camera and camera bundles.
//!
//! A [`Camera`] is the classic view / projection / viewport triple. Points are
//! projected to window coordinates with `x` to the right and `y` up, measured
//! from the viewport corner, and keep their normalized device depth.
//!
//! A [`CameraBundle`] is what gets stored next to each mesh: the camera plus
//! the cone marker geometry. Cone faces are grouped: the first `red_size`
//! faces are red markers, the next `blue_size` are blue markers, and anything
//! after that is generic overlay geometry.

use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use nalgebra::{Matrix3, Matrix4, Perspective3, Point3, Vector3, Vector4};
use serde::{Deserialize, Serialize};

use crate::error::{RenderError, Result};
use crate::mesh::TriMesh;

/// View, projection and viewport.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Camera {
    /// World to eye transform.
    pub view: Matrix4<f64>,
    /// Eye to clip transform.
    pub projection: Matrix4<f64>,
    /// `[x, y, width, height]` in pixels.
    pub viewport: Vector4<f64>,
}

impl Camera {
    /// Perspective camera at `eye` looking at `target`, with a viewport
    /// covering a `width x height` image.
    pub fn look_at(
        eye: Point3<f64>,
        target: Point3<f64>,
        up: Vector3<f64>,
        fov_y: f64,
        width: u32,
        height: u32,
    ) -> Self {
        let distance = (target - eye).norm().max(1e-6);
        let aspect = width as f64 / height.max(1) as f64;
        Self {
            view: Matrix4::look_at_rh(&eye, &target, &up),
            projection: Perspective3::new(aspect, fov_y, distance * 1e-2, distance * 1e2)
                .to_homogeneous(),
            viewport: Vector4::new(0.0, 0.0, width as f64, height as f64),
        }
    }

    /// Camera looking down `-z` at the mesh's bounding-box center, backed off
    /// far enough that the whole box fits a 45 degree field of view.
    pub fn fit_to_mesh(mesh: &TriMesh, width: u32, height: u32) -> Self {
        let fov_y = std::f64::consts::FRAC_PI_4;
        let (center, radius) = match mesh.bounding_box() {
            Some((min, max)) => (nalgebra::center(&min, &max), 0.5 * (max - min).norm()),
            None => (Point3::origin(), 1.0),
        };
        let radius = radius.max(1e-6);
        let distance = radius / (0.5 * fov_y).sin();
        Self::look_at(
            center + Vector3::z() * distance,
            center,
            Vector3::y(),
            fov_y,
            width,
            height,
        )
    }

    /// Project a world-space point to window coordinates and NDC depth.
    ///
    /// Returns `None` for points at or behind the eye plane.
    pub fn project(&self, p: &Point3<f64>) -> Option<Point3<f64>> {
        let clip = self.projection * self.view * p.to_homogeneous();
        if clip.w <= 1e-12 {
            return None;
        }
        let ndc = clip.xyz() / clip.w;
        let vp = &self.viewport;
        Some(Point3::new(
            vp[0] + vp[2] * 0.5 * (ndc.x + 1.0),
            vp[1] + vp[3] * 0.5 * (ndc.y + 1.0),
            ndc.z,
        ))
    }

    /// Clip-space `w` of a point, used for perspective-correct interpolation.
    pub fn clip_w(&self, p: &Point3<f64>) -> f64 {
        (self.projection * self.view * p.to_homogeneous()).w
    }

    /// Rotation part of the view matrix, for taking normals to eye space.
    pub fn view_rotation(&self) -> Matrix3<f64> {
        self.view.fixed_view::<3, 3>(0, 0).into_owned()
    }
}

/// Camera plus cone marker geometry, as stored per mesh.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CameraBundle {
    /// The camera.
    pub camera: Camera,
    /// Cone marker vertices.
    #[serde(default)]
    pub cone_vertices: Vec<Point3<f64>>,
    /// Cone marker faces, indexing `cone_vertices`.
    #[serde(default)]
    pub cone_faces: Vec<[usize; 3]>,
    /// Number of leading faces that draw red cones.
    #[serde(default)]
    pub red_size: usize,
    /// Number of faces after the red group that draw blue cones.
    #[serde(default)]
    pub blue_size: usize,
}

impl CameraBundle {
    /// Bundle with no cone markers.
    pub fn new(camera: Camera) -> Self {
        Self {
            camera,
            cone_vertices: Vec::new(),
            cone_faces: Vec::new(),
            red_size: 0,
            blue_size: 0,
        }
    }

    /// Load a bundle from a JSON file.
    ///
    /// Any failure, including a missing file, is reported as
    /// [`RenderError::CameraLoad`].
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let load_err = |message: String| RenderError::CameraLoad {
            path: path.to_path_buf(),
            message,
        };

        let file = File::open(path).map_err(|e| load_err(e.to_string()))?;
        let bundle: CameraBundle =
            serde_json::from_reader(BufReader::new(file)).map_err(|e| load_err(e.to_string()))?;

        if let Some((fi, face)) = bundle
            .cone_faces
            .iter()
            .enumerate()
            .find(|(_, f)| f.iter().any(|&v| v >= bundle.cone_vertices.len()))
        {
            return Err(load_err(format!(
                "cone face {} {:?} references a missing vertex",
                fi, face
            )));
        }
        Ok(bundle)
    }

    /// Save the bundle as pretty-printed JSON.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let file = File::create(path.as_ref())?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, self).map_err(|e| RenderError::Io(e.into()))?;
        writer.flush()?;
        Ok(())
    }

    /// Keep only the first `count` cone faces.
    pub fn truncate_cones(&mut self, count: usize) {
        self.cone_faces.truncate(count);
    }

    /// Drop every cone marker.
    pub fn without_cones(mut self) -> Self {
        self.cone_vertices.clear();
        self.cone_faces.clear();
        self.red_size = 0;
        self.blue_size = 0;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn front_camera() -> Camera {
        Camera::look_at(
            Point3::new(0.0, 0.0, 5.0),
            Point3::origin(),
            Vector3::y(),
            std::f64::consts::FRAC_PI_4,
            200,
            100,
        )
    }

    #[test]
    fn test_target_projects_to_viewport_center() {
        let cam = front_camera();
        let p = cam.project(&Point3::origin()).unwrap();
        assert!((p.x - 100.0).abs() < 1e-9);
        assert!((p.y - 50.0).abs() < 1e-9);
        assert!(p.z > -1.0 && p.z < 1.0);
    }

    #[test]
    fn test_up_is_up_and_right_is_right() {
        let cam = front_camera();
        let up = cam.project(&Point3::new(0.0, 1.0, 0.0)).unwrap();
        let right = cam.project(&Point3::new(1.0, 0.0, 0.0)).unwrap();
        assert!(up.y > 50.0);
        assert!(right.x > 100.0);
    }

    #[test]
    fn test_points_behind_eye_are_rejected() {
        let cam = front_camera();
        assert!(cam.project(&Point3::new(0.0, 0.0, 10.0)).is_none());
    }

    #[test]
    fn test_nearer_points_have_smaller_depth() {
        let cam = front_camera();
        let near = cam.project(&Point3::new(0.0, 0.0, 1.0)).unwrap();
        let far = cam.project(&Point3::new(0.0, 0.0, -1.0)).unwrap();
        assert!(near.z < far.z);
    }

    #[test]
    fn test_without_cones_clears_everything() {
        let mut bundle = CameraBundle::new(front_camera());
        bundle.cone_vertices = vec![Point3::origin(); 3];
        bundle.cone_faces = vec![[0, 1, 2]; 4];
        bundle.red_size = 1;
        bundle.blue_size = 2;

        let bare = bundle.without_cones();
        assert!(bare.cone_vertices.is_empty());
        assert!(bare.cone_faces.is_empty());
        assert_eq!(bare.red_size, 0);
        assert_eq!(bare.blue_size, 0);
    }

    #[test]
    fn test_bundle_json_roundtrip_and_missing_file() {
        let dir = std::env::temp_dir().join(format!("uvrender_cam_{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("square_camera.json");

        let mut bundle = CameraBundle::new(front_camera());
        bundle.cone_vertices = vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(0.1, 0.0, 0.0),
            Point3::new(0.0, 0.1, 0.0),
        ];
        bundle.cone_faces = vec![[0, 1, 2], [0, 2, 1]];
        bundle.red_size = 1;
        bundle.blue_size = 1;
        bundle.save(&path).unwrap();

        let loaded = CameraBundle::load(&path).unwrap();
        assert_eq!(loaded.cone_faces, bundle.cone_faces);
        assert_eq!(loaded.red_size, 1);
        assert!((loaded.camera.view - bundle.camera.view).norm() < 1e-12);

        let missing = CameraBundle::load(dir.join("nope_camera.json")).unwrap_err();
        assert!(missing.is_load_failure());
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_save_is_complete_on_return() {
        let dir = std::env::temp_dir().join(format!("uvrender_savecam_{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("flush_camera.json");

        let mut bundle = CameraBundle::new(front_camera());
        bundle.cone_vertices = vec![Point3::new(0.25, 0.5, 0.75); 600];
        bundle.save(&path).unwrap();

        // Read back without going through the loader
        let text = std::fs::read_to_string(&path).unwrap();
        let parsed: CameraBundle = serde_json::from_str(&text).unwrap();
        assert_eq!(parsed.cone_vertices.len(), 600);

        assert!(bundle.save(dir.join("missing").join("x.json")).is_err());
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_bad_cone_face_is_a_load_error() {
        let dir = std::env::temp_dir().join(format!("uvrender_badcam_{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("bad_camera.json");

        let mut bundle = CameraBundle::new(front_camera());
        bundle.cone_faces = vec![[0, 1, 2]];
        bundle.save(&path).unwrap();

        let err = CameraBundle::load(&path).unwrap_err();
        assert!(matches!(err, RenderError::CameraLoad { .. }));
        let _ = std::fs::remove_dir_all(&dir);
    }
}

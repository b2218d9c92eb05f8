//! Mesh and image file I/O.
//!
//! | Format | Extension | Load | Save | Notes |
//! |--------|-----------|------|------|-------|
//! | Wavefront OBJ | `.obj` | ✓ | ✓ | positions, per-corner UVs |
//! | PNG | `.png` | ✗ | ✓ | see [`crate::render::ColorImage`] |
//!
//! Camera bundles are JSON and live in [`crate::camera`].

pub mod obj;

use std::path::{Path, PathBuf};

use crate::error::Result;

/// Input and output locations for one mesh.
///
/// `mesh_id` is the file name without extension; `name` is the mesh id with
/// the optional suffix appended and is used for the UV mesh and every
/// output file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MeshPaths {
    /// Mesh identifier (file stem).
    pub mesh_id: String,
    /// Render name (`<mesh_id>` or `<mesh_id>_<suffix>`).
    pub name: String,
    /// Base 3D mesh.
    pub mesh: PathBuf,
    /// UV mesh.
    pub uv_mesh: PathBuf,
    /// Camera bundle.
    pub camera: PathBuf,
    /// Per-mesh output directory.
    pub output_dir: PathBuf,
    /// Per-mesh log file.
    pub log: PathBuf,
    /// Unshaded image.
    pub plain_image: PathBuf,
    /// Shaded image in the per-mesh directory.
    pub shaded_image: PathBuf,
    /// Shaded image in the shared image directory.
    pub global_image: PathBuf,
}

impl MeshPaths {
    /// Resolve every path for the mesh file `fname`.
    ///
    /// ```
    /// use std::path::Path;
    /// use uvrender::io::MeshPaths;
    ///
    /// let paths = MeshPaths::resolve(
    ///     "bunny.obj",
    ///     "",
    ///     Path::new("meshes"),
    ///     Path::new("uv"),
    ///     Path::new("cameras"),
    ///     Path::new("out"),
    /// );
    /// assert_eq!(paths.uv_mesh, Path::new("uv/bunny_output/bunny.obj"));
    /// assert_eq!(paths.global_image, Path::new("out/images/bunny.png"));
    /// ```
    pub fn resolve(
        fname: &str,
        suffix: &str,
        input_dir: &Path,
        uv_dir: &Path,
        camera_dir: &Path,
        output_root: &Path,
    ) -> Self {
        let mesh_id = match fname.rfind('.') {
            Some(dot) => &fname[..dot],
            None => fname,
        }
        .to_string();
        let name = if suffix.is_empty() {
            mesh_id.clone()
        } else {
            format!("{}_{}", mesh_id, suffix)
        };

        let output_dir = mesh_output_directory(output_root, &mesh_id);
        Self {
            mesh: input_dir.join(format!("{}.obj", mesh_id)),
            uv_mesh: uv_dir
                .join(format!("{}_output", mesh_id))
                .join(format!("{}.obj", name)),
            camera: camera_dir.join(format!("{}_camera.json", mesh_id)),
            log: output_dir.join(format!("{}_render_uv.log", name)),
            plain_image: output_dir.join("images").join(format!("{}_plain.png", name)),
            shaded_image: output_dir.join("images").join(format!("{}.png", name)),
            global_image: output_root.join("images").join(format!("{}.png", name)),
            output_dir,
            mesh_id,
            name,
        }
    }

    /// Create the directories the image files go into.
    pub fn create_image_dirs(&self) -> Result<()> {
        for image in [&self.plain_image, &self.global_image] {
            if let Some(dir) = image.parent() {
                std::fs::create_dir_all(dir)?;
            }
        }
        Ok(())
    }
}

/// Per-mesh output directory under the output root.
pub fn mesh_output_directory(output_root: &Path, mesh_id: &str) -> PathBuf {
    output_root.join(mesh_id)
}

/// List the `.obj` files of a directory, sorted by name.
///
/// The extension must be lowercase, matching the `<id>.obj` name
/// [`MeshPaths::resolve`] loads.
pub fn list_meshes(input_dir: &Path) -> Result<Vec<String>> {
    let mut names = Vec::new();
    for entry in std::fs::read_dir(input_dir)? {
        let entry = entry?;
        let path = entry.path();
        let is_obj = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e == "obj")
            .unwrap_or(false);
        if is_obj && path.is_file() {
            if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
                names.push(name.to_string());
            }
        }
    }
    names.sort();
    Ok(names)
}

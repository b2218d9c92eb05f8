//! The per-mesh rendering driver and the batch runner.
//!
//! [`render_one`] runs the whole pipeline for one mesh file: load the base
//! mesh, the UV mesh and the camera bundle, rasterize, color by energy with
//! a UV grid, shade and write the images. [`render_many`] does that for a
//! list of meshes in parallel.
//!
//! Failing to load one of the three inputs skips the mesh; any later error
//! fails it. Neither stops the batch.
//!
//! # Example
//!
//! ```no_run
//! use uvrender::pipeline::{render_many, RenderConfig};
//!
//! let config = RenderConfig::default()
//!     .with_input_dir("data/meshes")
//!     .with_uv_dir("output/optimized")
//!     .with_output_dir("output/renders")
//!     .with_size(640, 400);
//!
//! for report in render_many(&config).unwrap() {
//!     println!("{}: {:?}", report.fname, report.status);
//! }
//! ```

use std::path::PathBuf;

use rayon::prelude::*;

use crate::camera::CameraBundle;
use crate::colormap::{energy_norm, Colormap};
use crate::energy::{vertex_energy, EnergyChoice};
use crate::error::{RenderError, Result};
use crate::io::{list_meshes, obj, MeshPaths};
use crate::logging::MeshLog;
use crate::mesh::TriMesh;
use crate::progress::Progress;
use crate::raster::{cut_to_singularity_edges, mark_cut_pixels, point_matrix};
use crate::render::{add_shading, color_mesh_with_grid, corner_uv, Grid, SurfaceField};

/// Number of stages reported through [`Progress`] per mesh.
const STAGES: usize = 7;

/// Options for a rendering run.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderConfig {
    /// Directory holding the base meshes.
    pub input_dir: PathBuf,
    /// Root of every output file.
    pub output_dir: PathBuf,
    /// Directory holding `<mesh>_output/<name>.obj` UV meshes.
    pub uv_dir: PathBuf,
    /// Directory holding `<mesh>_camera.json` bundles.
    pub camera_dir: PathBuf,
    /// Mesh file names to render. Empty means every `.obj` in `input_dir`.
    pub fnames: Vec<String>,
    /// Worker threads. `None` uses the rayon default.
    pub num_processes: Option<usize>,
    /// Grid spacing relative to the mesh bounding-box diagonal.
    pub uv_scale: f64,
    /// Energy shown by the colormap.
    pub energy: EnergyChoice,
    /// Energy value mapped to the top of the colormap range.
    pub colormap_scale: f64,
    /// Suffix of the UV mesh and output names.
    pub suffix: String,
    /// Image width in pixels.
    pub width: usize,
    /// Image height in pixels.
    pub height: usize,
    /// Width of the cut lines.
    pub bd_thick: f64,
    /// Hide the cone markers.
    pub no_cones: bool,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            input_dir: PathBuf::from("data/meshes"),
            output_dir: PathBuf::from("output"),
            uv_dir: PathBuf::from("output"),
            camera_dir: PathBuf::from("data/cameras"),
            fnames: Vec::new(),
            num_processes: None,
            uv_scale: 1.0,
            energy: EnergyChoice::default(),
            colormap_scale: 1.0,
            suffix: String::new(),
            width: 1280,
            height: 800,
            bd_thick: 1.0,
            no_cones: false,
        }
    }
}

impl RenderConfig {
    /// Set the base mesh directory.
    pub fn with_input_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.input_dir = dir.into();
        self
    }

    /// Set the output root.
    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = dir.into();
        self
    }

    /// Set the UV mesh directory.
    pub fn with_uv_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.uv_dir = dir.into();
        self
    }

    /// Set the camera directory.
    pub fn with_camera_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.camera_dir = dir.into();
        self
    }

    /// Render only these mesh files.
    pub fn with_fnames<I, S>(mut self, fnames: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.fnames = fnames.into_iter().map(Into::into).collect();
        self
    }

    /// Set the number of worker threads.
    pub fn with_num_processes(mut self, num_processes: Option<usize>) -> Self {
        self.num_processes = num_processes;
        self
    }

    /// Set the grid spacing ratio.
    pub fn with_uv_scale(mut self, uv_scale: f64) -> Self {
        self.uv_scale = uv_scale;
        self
    }

    /// Set the energy to display.
    pub fn with_energy(mut self, energy: EnergyChoice) -> Self {
        self.energy = energy;
        self
    }

    /// Set the colormap scale.
    pub fn with_colormap_scale(mut self, scale: f64) -> Self {
        self.colormap_scale = scale;
        self
    }

    /// Set the name suffix.
    pub fn with_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.suffix = suffix.into();
        self
    }

    /// Set the image size.
    pub fn with_size(mut self, width: usize, height: usize) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    /// Set the cut line width.
    pub fn with_bd_thick(mut self, bd_thick: f64) -> Self {
        self.bd_thick = bd_thick;
        self
    }

    /// Show or hide cone markers.
    pub fn with_no_cones(mut self, no_cones: bool) -> Self {
        self.no_cones = no_cones;
        self
    }

    /// Check the options that would make every mesh fail.
    pub fn validate(&self) -> Result<()> {
        if self.width == 0 {
            return Err(RenderError::invalid_param("width", self.width, "must be positive"));
        }
        if self.height == 0 {
            return Err(RenderError::invalid_param("height", self.height, "must be positive"));
        }
        if self.num_processes == Some(0) {
            return Err(RenderError::invalid_param("num_processes", 0, "must be positive"));
        }
        if !(self.bd_thick >= 0.0) {
            return Err(RenderError::invalid_param(
                "bd_thick",
                self.bd_thick,
                "must be non-negative",
            ));
        }
        Ok(())
    }

    /// Resolve the input and output paths of one mesh file.
    pub fn paths(&self, fname: &str) -> MeshPaths {
        MeshPaths::resolve(
            fname,
            &self.suffix,
            &self.input_dir,
            &self.uv_dir,
            &self.camera_dir,
            &self.output_dir,
        )
    }
}

/// Outcome of rendering one mesh.
#[derive(Debug, Clone, PartialEq)]
pub enum MeshStatus {
    /// Images were written.
    Rendered {
        /// Written image files.
        images: Vec<PathBuf>,
    },
    /// An input could not be loaded; nothing was written.
    Skipped {
        /// What could not be loaded.
        reason: String,
    },
    /// Rendering started but did not finish.
    Failed {
        /// The error.
        error: String,
    },
}

/// Result of rendering one mesh file.
#[derive(Debug, Clone, PartialEq)]
pub struct MeshReport {
    /// The mesh file name as given.
    pub fname: String,
    /// Render name (mesh id plus suffix).
    pub name: String,
    /// What happened.
    pub status: MeshStatus,
}

impl MeshReport {
    /// True if the images were written.
    pub fn is_rendered(&self) -> bool {
        matches!(self.status, MeshStatus::Rendered { .. })
    }

    /// True if the mesh was skipped for a missing or unreadable input.
    pub fn is_skipped(&self) -> bool {
        matches!(self.status, MeshStatus::Skipped { .. })
    }

    /// True if rendering failed.
    pub fn is_failed(&self) -> bool {
        matches!(self.status, MeshStatus::Failed { .. })
    }
}

/// Cone markers as they will be drawn.
///
/// A mesh without boundary keeps only its red and blue cone faces. With
/// `no_cones` every marker is dropped.
pub fn prepare_cones(mut bundle: CameraBundle, doubled: bool, no_cones: bool) -> CameraBundle {
    if !doubled {
        let count = bundle.red_size + bundle.blue_size;
        bundle.truncate_cones(count);
    }
    if no_cones {
        bundle = bundle.without_cones();
    }
    bundle
}

/// Render a single mesh file.
///
/// Never panics on bad input; every problem ends up in the report and in
/// the per-mesh log.
pub fn render_one(config: &RenderConfig, fname: &str) -> MeshReport {
    let paths = config.paths(fname);
    let progress = Progress::debug_log(paths.name.clone());

    let status = match open_log(&paths) {
        Ok(mut log) => match render_mesh(config, &paths, &mut log, &progress) {
            Ok(images) => MeshStatus::Rendered { images },
            Err(e) => {
                log.error(&e);
                if e.is_load_failure() {
                    MeshStatus::Skipped {
                        reason: e.to_string(),
                    }
                } else {
                    MeshStatus::Failed {
                        error: e.to_string(),
                    }
                }
            }
        },
        Err(e) => {
            log::error!(target: crate::logging::LOG_TARGET, "{}: {}", paths.name, e);
            MeshStatus::Failed {
                error: e.to_string(),
            }
        }
    };

    MeshReport {
        fname: fname.to_string(),
        name: paths.name,
        status,
    }
}

/// Render every configured mesh in parallel.
///
/// Fails only when the configuration is unusable or the input directory
/// cannot be listed; per-mesh problems are reported per mesh.
pub fn render_many(config: &RenderConfig) -> Result<Vec<MeshReport>> {
    config.validate()?;
    let fnames = if config.fnames.is_empty() {
        list_meshes(&config.input_dir)?
    } else {
        config.fnames.clone()
    };
    log::info!(
        target: crate::logging::LOG_TARGET,
        "Rendering {} meshes from {}",
        fnames.len(),
        config.input_dir.display()
    );

    let run = || {
        fnames
            .par_iter()
            .map(|fname| render_one(config, fname))
            .collect::<Vec<_>>()
    };

    match config.num_processes {
        Some(threads) => {
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(threads)
                .build()
                .map_err(|_| {
                    RenderError::invalid_param(
                        "num_processes",
                        threads,
                        "could not start worker threads",
                    )
                })?;
            Ok(pool.install(run))
        }
        None => Ok(run()),
    }
}

fn open_log(paths: &MeshPaths) -> Result<MeshLog> {
    std::fs::create_dir_all(&paths.output_dir)?;
    MeshLog::create(&paths.log, paths.name.clone())
}

fn load_error(e: RenderError) -> String {
    match e {
        RenderError::Io(io) => io.to_string(),
        other => other.to_string(),
    }
}

fn render_mesh(
    config: &RenderConfig,
    paths: &MeshPaths,
    log: &mut MeshLog,
    progress: &Progress,
) -> Result<Vec<PathBuf>> {
    let (width, height) = (config.width, config.height);
    log.info(format_args!("Rendering {}", paths.name));

    progress.report(0, STAGES, "Loading meshes");
    log.info(format_args!("Loading initial mesh at {}", paths.mesh.display()));
    let base = obj::read_triangle_mesh(&paths.mesh).map_err(|e| RenderError::MeshLoad {
        path: paths.mesh.clone(),
        message: load_error(e),
    })?;

    log.info(format_args!("Loading uv coordinates at {}", paths.uv_mesh.display()));
    let uv_mesh = obj::read_uv_mesh(&paths.uv_mesh).map_err(|e| RenderError::UvLoad {
        path: paths.uv_mesh.clone(),
        message: load_error(e),
    })?;

    // Meshes with boundary were doubled before optimization
    let doubled = base.has_boundary();
    log.info(format_args!("Is double: {}", doubled));

    progress.report(1, STAGES, "Loading camera");
    log.info(format_args!("Loading camera at {}", paths.camera.display()));
    let bundle = prepare_cones(CameraBundle::load(&paths.camera)?, doubled, config.no_cones);
    let camera = &bundle.camera;
    let cones = TriMesh::new(bundle.cone_vertices.clone(), bundle.cone_faces.clone());

    progress.report(2, STAGES, "Rasterizing");
    let cut = cut_to_singularity_edges(&uv_mesh, config.bd_thick);
    log.info("Getting point matrices");
    let mut pm = point_matrix(
        camera,
        &uv_mesh.mesh,
        &cones,
        bundle.red_size,
        bundle.blue_size,
        width,
        height,
    )?;
    let cut_pm = point_matrix(camera, &base, &cut, 0, 0, width, height)?;
    let cut_pixels = mark_cut_pixels(&mut pm, &cut_pm)?;
    log.info(format_args!("Marked {} cut pixels", cut_pixels));

    progress.report(3, STAGES, "Building connectivity");
    log.info("Getting connectivity");
    let conn = uv_mesh.mesh.connectivity()?;
    log.info("Getting per corner uv coordinates");
    let (u, v) = corner_uv(&conn, &uv_mesh)?;

    progress.report(4, STAGES, "Computing energy");
    log.info(format_args!("Getting {} colormap", config.energy));
    let mut energy = vertex_energy(&uv_mesh, config.energy);
    log.info(format_args!("Using colormap scale {}", config.colormap_scale));
    let norm = energy_norm(config.colormap_scale, &mut energy);

    progress.report(5, STAGES, "Coloring");
    log.info("Rendering image");
    let uv_scale = config.uv_scale * uv_mesh.mesh.bounding_box_diagonal();
    let surface = SurfaceField {
        conn: &conn,
        u: &u,
        v: &v,
        energy: &energy,
    };
    let mut image =
        color_mesh_with_grid(&pm, &surface, Colormap::CoolWarm, &norm, &Grid::new(uv_scale))?;

    progress.report(6, STAGES, "Saving images");
    paths.create_image_dirs()?;
    log.info(format_args!("Saving plain image at {}", paths.plain_image.display()));
    image.save_png(&paths.plain_image)?;

    log.info("Adding shading");
    add_shading(&mut image, &uv_mesh.mesh, &pm, camera)?;

    for path in [&paths.shaded_image, &paths.global_image] {
        log.info(format_args!("Saving final image at {}", path.display()));
        image.save_png(path)?;
    }

    Ok(vec![
        paths.plain_image.clone(),
        paths.shaded_image.clone(),
        paths.global_image.clone(),
    ])
}

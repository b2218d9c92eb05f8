//! render-uv - batch renderer for UV-mapped meshes.
//!
//! Usage: render-uv -i <INPUT_DIR> -o <OUTPUT_DIR> --uv_dir <UV_DIR> [OPTIONS]
//!
//! Run `render-uv --help` for all options.

use std::path::PathBuf;
use std::time::Instant;

use clap::Parser;

use uvrender::energy::EnergyChoice;
use uvrender::pipeline::{render_many, MeshStatus, RenderConfig};

#[derive(Parser)]
#[command(name = "render-uv")]
#[command(author, version, about = "Render mesh from uv coordinates", long_about = None)]
struct Cli {
    /// Directory with the base meshes
    #[arg(short = 'i', long = "input_dir", default_value = "data/meshes")]
    input_dir: PathBuf,

    /// Root directory for logs and images
    #[arg(short = 'o', long = "output_dir", default_value = "output")]
    output_dir: PathBuf,

    /// Directory with the <mesh>_output/<name>.obj uv meshes
    #[arg(long = "uv_dir", default_value = "output")]
    uv_dir: PathBuf,

    /// Directory with the <mesh>_camera.json camera bundles
    #[arg(long = "camera_dir", default_value = "data/cameras")]
    camera_dir: PathBuf,

    /// Mesh file to render (repeatable; default: every .obj in input_dir)
    #[arg(short = 'f', long = "fname")]
    fname: Vec<String>,

    /// Number of worker threads
    #[arg(long = "num_processes")]
    num_processes: Option<usize>,

    /// Grid spacing relative to the bounding-box diagonal
    #[arg(long = "uv_scale", default_value = "1")]
    uv_scale: f64,

    /// Energy to show with the colormap
    #[arg(long = "colormap", value_enum, default_value = "scale_factors")]
    colormap: EnergyChoice,

    /// Energy value at the top of the colormap range
    #[arg(long = "colormap_scale", default_value = "1")]
    colormap_scale: f64,

    /// Suffix of the uv mesh and output names
    #[arg(long = "suffix", default_value = "")]
    suffix: String,

    /// Image height in pixels
    #[arg(short = 'H', long = "height", default_value = "800")]
    height: usize,

    /// Image width in pixels
    #[arg(short = 'W', long = "width", default_value = "1280")]
    width: usize,

    /// Line thickness of the cuts
    #[arg(long = "bd_thick", default_value = "1.0")]
    bd_thick: f64,

    /// Do not draw cone markers
    #[arg(long = "no_cones")]
    no_cones: bool,
}

impl Cli {
    fn into_config(self) -> RenderConfig {
        RenderConfig::default()
            .with_input_dir(self.input_dir)
            .with_output_dir(self.output_dir)
            .with_uv_dir(self.uv_dir)
            .with_camera_dir(self.camera_dir)
            .with_fnames(self.fname)
            .with_num_processes(self.num_processes)
            .with_uv_scale(self.uv_scale)
            .with_energy(self.colormap)
            .with_colormap_scale(self.colormap_scale)
            .with_suffix(self.suffix)
            .with_size(self.width, self.height)
            .with_bd_thick(self.bd_thick)
            .with_no_cones(self.no_cones)
    }
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    match run(cli) {
        Ok(true) => {}
        Ok(false) => std::process::exit(1),
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    }
}

/// Render the batch and print a summary. Returns false if any mesh failed.
fn run(cli: Cli) -> Result<bool, Box<dyn std::error::Error>> {
    let config = cli.into_config();
    let start = Instant::now();
    let reports = render_many(&config)?;
    let elapsed = start.elapsed();

    let mut rendered = 0;
    let mut skipped = 0;
    let mut failed = 0;
    for report in &reports {
        match &report.status {
            MeshStatus::Rendered { images } => {
                rendered += 1;
                if let Some(image) = images.last() {
                    println!("{}: {}", report.name, image.display());
                }
            }
            MeshStatus::Skipped { reason } => {
                skipped += 1;
                println!("{}: skipped ({})", report.name, reason);
            }
            MeshStatus::Failed { error } => {
                failed += 1;
                eprintln!("{}: failed ({})", report.name, error);
            }
        }
    }

    println!(
        "Rendered {} of {} meshes ({} skipped, {} failed) in {:.2?}",
        rendered,
        reports.len(),
        skipped,
        failed,
        elapsed
    );
    Ok(failed == 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_defaults_match_config() {
        let cli = Cli::parse_from(["render-uv"]);
        assert_eq!(cli.into_config(), RenderConfig::default());
    }

    #[test]
    fn test_underscore_flags() {
        let cli = Cli::parse_from([
            "render-uv",
            "-i",
            "meshes",
            "--uv_dir",
            "uv",
            "-f",
            "a.obj",
            "--fname",
            "b.obj",
            "--colormap",
            "sym_dirichlet",
            "--colormap_scale",
            "0",
            "-H",
            "10",
            "-W",
            "20",
            "--no_cones",
        ]);
        let config = cli.into_config();
        assert_eq!(config.input_dir, PathBuf::from("meshes"));
        assert_eq!(config.fnames, vec!["a.obj".to_string(), "b.obj".to_string()]);
        assert_eq!(config.energy, EnergyChoice::SymDirichlet);
        assert_eq!((config.width, config.height), (20, 10));
        assert_eq!(config.colormap_scale, 0.0);
        assert!(config.no_cones);
    }

    #[test]
    fn test_unknown_energy_is_rejected() {
        assert!(Cli::try_parse_from(["render-uv", "--colormap", "bogus"]).is_err());
    }
}

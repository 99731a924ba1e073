use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use dicom_volume_viewer::{
    DatasetInfo, NormalsFilter, SortBy, SurfaceActor, ViewerConfig, VolumeLoader, app,
    build_scene, folder_size_bytes, iso_surface_property, marching_cubes, skull_volume_property,
};
use web_time::Instant;

/// Volume rendering, iso-surface and combined views of a DICOM series.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Cli {
    /// Directory holding the DICOM slices.
    #[arg(default_value = "Skull_Dataset")]
    dataset: PathBuf,

    /// Scalar value of the extracted iso-surface.
    #[arg(long, default_value_t = 310.0)]
    iso_value: f32,

    /// Render one frame to this PNG file instead of opening a window.
    #[arg(long)]
    screenshot: Option<PathBuf>,

    #[arg(long, default_value_t = 1800)]
    width: u32,

    #[arg(long, default_value_t = 800)]
    height: u32,
}

impl Cli {
    fn into_config(self) -> (ViewerConfig, Option<PathBuf>) {
        let config = ViewerConfig {
            dataset_dir: self.dataset,
            iso_value: self.iso_value,
            window_size: (self.width.max(1), self.height.max(1)),
            ..ViewerConfig::default()
        };
        (config, self.screenshot)
    }
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let (config, screenshot) = Cli::parse().into_config();

    VolumeLoader::ensure_directory(&config.dataset_dir)?;
    let folder_bytes = folder_size_bytes(&config.dataset_dir);
    let volume = VolumeLoader::load_from_directory(&config.dataset_dir, SortBy::default())
        .with_context(|| format!("failed to load '{}'", config.dataset_dir.display()))?;

    let info = DatasetInfo::from_volume(&volume, folder_bytes);
    println!("{info}");

    let start = Instant::now();
    let mesh = NormalsFilter::default().apply(marching_cubes(&volume, config.iso_value));
    log::info!(
        "Iso-surface at {} has {} points and {} triangles ({:?})",
        config.iso_value,
        mesh.num_points(),
        mesh.num_triangles(),
        start.elapsed()
    );
    let surface = SurfaceActor {
        mesh,
        property: iso_surface_property(),
    };
    let mut window = build_scene(
        Arc::new(volume),
        skull_volume_property(),
        surface,
        &info,
        &config,
    );

    match screenshot {
        Some(path) => {
            let start = Instant::now();
            let frame = window.render(1.0);
            frame
                .to_image()
                .save(&path)
                .with_context(|| format!("failed to write '{}'", path.display()))?;
            log::info!("Wrote {} in {:?}", path.display(), start.elapsed());
        }
        None => app::run(window, &config).context("viewer window failed")?,
    }
    Ok(())
}

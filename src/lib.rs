//! # DICOM volume viewer
//!
//! Loads a DICOM series from a directory into a scalar volume and shows it
//! three ways in one window that is split into side-by-side viewports:
//!  - direct volume rendering through opacity and color transfer functions
//!  - an iso-surface extracted with marching cubes
//!  - both of the above together with a dataset summary
//!
//! All viewports look through one shared camera that is driven with the
//! mouse, trackball style.
//!
//! DICOM decoding is left to the dicom-rs ecosystem. Slices are opened in
//! parallel using rayon and stacked into a volume sorted by their position.
//! Rendering happens on the CPU (ray casting for the volume, rasterization
//! for the surface) and the finished frame is handed to wgpu for display,
//! so the whole pipeline can also run headless to produce screenshots.
//! DICOM files are assumed to have the following attributes:
//!   - No multiframe (always the first frame is used)
//!   - Images from the same series (Series Instance UID) and acquisition
//!     (Acquisition Number)
//!
//! # Examples
//!
//! ## Rendering a DICOM series to an image
//!
//! ```no_run
//! # use dicom_volume_viewer::{
//! #     DatasetInfo, NormalsFilter, SortBy, SurfaceActor, ViewerConfig, VolumeLoader,
//! #     build_scene, folder_size_bytes, iso_surface_property, marching_cubes,
//! #     skull_volume_property,
//! # };
//! # use std::sync::Arc;
//! let config = ViewerConfig::default();
//! let volume = VolumeLoader::load_from_directory(&config.dataset_dir, SortBy::default())
//!     .expect("should have loaded files from directory");
//! let info = DatasetInfo::from_volume(&volume, folder_size_bytes(&config.dataset_dir));
//! println!("{info}");
//!
//! let mesh = NormalsFilter::default().apply(marching_cubes(&volume, config.iso_value));
//! let surface = SurfaceActor { mesh, property: iso_surface_property() };
//! let mut window = build_scene(Arc::new(volume), skull_volume_property(), surface, &info, &config);
//! window.render(1.0).to_image().save("views.png").expect("should have written the image");
//! ```

pub mod app;
pub mod camera;
pub mod config;
pub mod enums;
pub mod folder;
pub mod interaction;
mod interpolator;
pub mod marching_cubes;
pub mod normals;
pub mod poly_data;
pub mod presenter;
pub mod render;
pub mod report;
pub mod scene;
pub mod transfer_function;
pub mod volume;
pub mod volume_loader;

pub use camera::Camera;
pub use config::{ViewerConfig, ViewportConfig};
pub use enums::{Interpolation, SortBy, ViewKind};
pub use folder::{bytes_to_mb, folder_size_bytes};
pub use marching_cubes::marching_cubes;
pub use normals::NormalsFilter;
pub use poly_data::PolyData;
pub use render::Frame;
pub use report::DatasetInfo;
pub use scene::{
    RenderWindow, Renderer, SurfaceActor, TextLabel, Viewport, VolumeActor, build_scene,
    make_label,
};
pub use transfer_function::{
    ColorTransferFunction, PiecewiseFunction, SurfaceProperty, VolumeProperty,
    iso_surface_property, skull_color, skull_opacity, skull_volume_property,
};
pub use volume::Volume;
pub use volume_loader::{VolumeLoader, VolumeLoaderError};

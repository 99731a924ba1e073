use std::sync::Arc;

use dicom_volume_viewer::{
    DatasetInfo, NormalsFilter, SurfaceActor, ViewerConfig, Volume, build_scene,
    iso_surface_property, marching_cubes, skull_volume_property,
};
use glam::Vec3;
use ndarray::Array3;

/// Bone-like ball of 1500 in air, 20 voxels across.
fn phantom() -> Volume {
    let data = Array3::from_shape_fn((20, 20, 20), |(k, j, i)| {
        let d = Vec3::new(i as f32 - 9.5, j as f32 - 9.5, k as f32 - 9.5).length();
        if d < 6.0 { 1500.0 } else { -1000.0 }
    });
    Volume::new(data, (0.8, 0.8, 1.5), (-8.0, -8.0, 20.0))
}

#[test]
fn iso_surface_wraps_the_ball() {
    let volume = phantom();
    let mesh = NormalsFilter::default().apply(marching_cubes(&volume, 310.0));
    assert!(mesh.num_triangles() > 100);
    assert!(mesh.has_normals());

    let (min, max) = mesh.bounds().unwrap();
    let center = volume.center();
    assert!(((min + max) * 0.5 - center).length() < 0.5);
    assert!(min.cmpge(volume.bounds().0).all() && max.cmple(volume.bounds().1).all());
}

#[test]
fn screenshot_of_all_three_views() {
    let volume = phantom();
    let config = ViewerConfig {
        window_size: (300, 120),
        ..ViewerConfig::default()
    };
    let mesh = NormalsFilter::default().apply(marching_cubes(&volume, config.iso_value));
    let info = DatasetInfo::from_volume(&volume, 0);
    let surface = SurfaceActor {
        mesh,
        property: iso_surface_property(),
    };
    let mut window = build_scene(Arc::new(volume), skull_volume_property(), surface, &info, &config);

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("views.png");
    window.render(1.0).to_image().save(&path).unwrap();

    let image = image::open(&path).unwrap().to_rgba8();
    assert_eq!(image.dimensions(), (300, 120));
    for (pane, viewport) in config.viewports.iter().enumerate() {
        let x = 50 + 100 * pane as u32;
        let [r, g, b, _] = image.get_pixel(x, 60).0;
        let background = viewport.background.map(|c| (c * 255.0).round() as u8);
        assert_ne!([r, g, b], background, "pane {pane} is empty");
    }
}

#[test]
fn interactive_frames_are_smaller() {
    let volume = phantom();
    let config = ViewerConfig {
        window_size: (300, 120),
        ..ViewerConfig::default()
    };
    let info = DatasetInfo::from_volume(&volume, 0);
    let surface = SurfaceActor {
        mesh: marching_cubes(&volume, config.iso_value),
        property: iso_surface_property(),
    };
    let mut window = build_scene(Arc::new(volume), skull_volume_property(), surface, &info, &config);
    let frame = window.render(config.interactive_scale);
    assert_eq!((frame.width(), frame.height()), (105, 42));
}

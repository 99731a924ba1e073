use crate::{enums::SortBy, volume::Volume};

use dicom::{
    object::{FileDicomObject, InMemDicomObject, open_file},
    pixeldata::{ConvertOptions, ModalityLutOption, PixelDecoder, VoiLutOption},
};
use dicom_dictionary_std::tags;
use ndarray::{Array2, Array3, s};
use rayon::prelude::*;
use std::{
    fs,
    path::{Path, PathBuf},
};
use thiserror::Error;
use web_time::Instant;

#[derive(Debug, Error)]
pub enum VolumeLoaderError {
    #[error(
        "Cannot find DICOM directory: '{}'. Put your DICOM slices inside this folder or pass another directory.",
        .0.display()
    )]
    MissingDirectory(PathBuf),

    #[error("No valid DICOM images found")]
    NoValidImages,

    #[error("Inconsistent image dimensions")]
    InconsistentDimensions,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("DICOM error: {0}")]
    Dicom(#[from] dicom::object::ReadError),
}

/// One decoded slice with the attributes needed to place it in the volume.
struct Slice {
    order: Option<f64>,
    position: Option<[f64; 3]>,
    orientation: Option<[f64; 6]>,
    pixel_spacing: Option<(f64, f64)>,
    spacing_between: Option<f64>,
    thickness: Option<f64>,
    image: Array2<f32>,
}

pub struct VolumeLoader;

impl VolumeLoader {
    /// Load a volume from DICOM objects
    ///
    /// Objects without decodable pixel data are ignored. Pixel values go
    /// through the modality LUT (rescale slope and intercept) and no VOI
    /// LUT, so CT series come out in Hounsfield units.
    ///
    /// # Errors
    ///
    /// Returns error if no valid images found or dimensions are inconsistent
    pub fn load_from_dicom_objects(
        dicom_objects: &[FileDicomObject<InMemDicomObject>],
        sort_by: SortBy,
    ) -> Result<Volume, VolumeLoaderError> {
        let mut slices: Vec<_> = dicom_objects
            .par_iter()
            .filter_map(|dicom_object| Self::extract_slice(dicom_object, sort_by))
            .collect();

        if slices.is_empty() {
            return Err(VolumeLoaderError::NoValidImages);
        }

        Self::sort_slices(&mut slices, sort_by);
        Self::stack_along_normal(&mut slices);
        Self::validate_dimensions(&slices)?;

        let spacing = Self::get_spacing(&slices);
        let origin = slices[0]
            .position
            .map_or((0.0, 0.0, 0.0), |[x, y, z]| (x, y, z));
        let volume_array = Self::build_volume_array(&slices);

        Ok(Volume::new(volume_array, spacing, origin))
    }

    /// Load a volume from file paths, failing on the first unreadable file
    pub fn load_from_file_paths(
        paths: &[impl AsRef<Path> + Sync],
        sort_by: SortBy,
    ) -> Result<Volume, VolumeLoaderError> {
        let objects: Result<Vec<_>, _> = paths
            .par_iter()
            .map(|path| open_file(path.as_ref()))
            .collect();

        Self::load_from_dicom_objects(&objects?, sort_by)
    }

    /// Load a volume from a directory of DICOM slices
    ///
    /// Every regular file with a `.dcm` extension or without any extension
    /// is a candidate; candidates that do not parse as DICOM are skipped.
    ///
    /// # Errors
    ///
    /// [`VolumeLoaderError::MissingDirectory`] when `path` is not a
    /// directory, checked before any file is touched.
    pub fn load_from_directory(
        path: impl AsRef<Path>,
        sort_by: SortBy,
    ) -> Result<Volume, VolumeLoaderError> {
        let path = path.as_ref();
        Self::ensure_directory(path)?;
        let started = Instant::now();

        let mut paths: Vec<_> = fs::read_dir(path)?
            .filter_map(Result::ok)
            .map(|entry| entry.path())
            .filter(|path| Self::is_candidate(path))
            .collect();
        paths.sort();

        if paths.is_empty() {
            return Err(VolumeLoaderError::NoValidImages);
        }

        let objects: Vec<_> = paths
            .par_iter()
            .filter_map(|path| match open_file(path) {
                Ok(object) => Some(object),
                Err(err) => {
                    log::warn!("Skipping {}: {err}", path.display());
                    None
                }
            })
            .collect();

        let volume = Self::load_from_dicom_objects(&objects, sort_by)?;
        log::info!(
            "Loaded {} slices from {} in {:.2?}",
            volume.dim().0,
            path.display(),
            started.elapsed()
        );
        Ok(volume)
    }

    /// Fails with [`VolumeLoaderError::MissingDirectory`] unless `path` is a directory.
    pub fn ensure_directory(path: &Path) -> Result<(), VolumeLoaderError> {
        if path.is_dir() {
            Ok(())
        } else {
            Err(VolumeLoaderError::MissingDirectory(path.to_path_buf()))
        }
    }

    fn is_candidate(path: &Path) -> bool {
        let hidden = path
            .file_name()
            .and_then(|name| name.to_str())
            .is_some_and(|name| name.starts_with('.'));
        if hidden || !path.is_file() {
            return false;
        }
        match path.extension().and_then(|s| s.to_str()) {
            Some(ext) => ext.eq_ignore_ascii_case("dcm"),
            None => true,
        }
    }

    fn extract_slice(
        dicom_object: &FileDicomObject<InMemDicomObject>,
        sort_by: SortBy,
    ) -> Option<Slice> {
        let image = Self::decode_image(dicom_object)?;
        let position = Self::get_multi_float(dicom_object, tags::IMAGE_POSITION_PATIENT)
            .filter(|pos| pos.len() >= 3)
            .map(|pos| [pos[0], pos[1], pos[2]]);
        let pixel_spacing = Self::get_multi_float(dicom_object, tags::PIXEL_SPACING)
            .filter(|spacing| spacing.len() >= 2)
            .map(|spacing| (spacing[0], spacing[1]));
        let orientation = Self::get_multi_float(dicom_object, tags::IMAGE_ORIENTATION_PATIENT)
            .filter(|cosines| cosines.len() >= 6)
            .map(|c| [c[0], c[1], c[2], c[3], c[4], c[5]]);

        Some(Slice {
            order: Self::get_sort_order(dicom_object, position, sort_by),
            position,
            orientation,
            pixel_spacing,
            spacing_between: Self::get_float(dicom_object, tags::SPACING_BETWEEN_SLICES),
            thickness: Self::get_float(dicom_object, tags::SLICE_THICKNESS),
            image,
        })
    }

    fn get_float(
        dicom_object: &FileDicomObject<InMemDicomObject>,
        tag: dicom::core::Tag,
    ) -> Option<f64> {
        dicom_object.element(tag).ok()?.to_float64().ok()
    }

    fn get_multi_float(
        dicom_object: &FileDicomObject<InMemDicomObject>,
        tag: dicom::core::Tag,
    ) -> Option<Vec<f64>> {
        dicom_object.element(tag).ok()?.to_multi_float64().ok()
    }

    fn get_sort_order(
        dicom_object: &FileDicomObject<InMemDicomObject>,
        position: Option<[f64; 3]>,
        sort_by: SortBy,
    ) -> Option<f64> {
        match sort_by {
            SortBy::ImagePositionPatient => position.map(|pos| pos[2]),
            SortBy::TablePosition => Self::get_float(dicom_object, tags::TABLE_POSITION),
            SortBy::InstanceNumber => dicom_object
                .element(tags::INSTANCE_NUMBER)
                .ok()?
                .to_int::<i32>()
                .ok()
                .map(f64::from),
            SortBy::None => None,
        }
    }

    fn decode_image(dicom_object: &FileDicomObject<InMemDicomObject>) -> Option<Array2<f32>> {
        let pixel_data = match dicom_object.decode_pixel_data() {
            Ok(pixel_data) => pixel_data,
            Err(err) => {
                log::warn!("Skipping object without decodable pixel data: {err}");
                return None;
            }
        };
        let options = ConvertOptions::new()
            .with_modality_lut(ModalityLutOption::Default)
            .with_voi_lut(VoiLutOption::Identity);
        pixel_data
            .to_ndarray_with_options::<f32>(&options)
            .ok()
            .map(|arr| arr.slice_move(s![0, .., .., 0]))
    }

    fn sort_slices(slices: &mut [Slice], sort_by: SortBy) {
        if !matches!(sort_by, SortBy::None) {
            slices.sort_by(|a, b| {
                a.order
                    .partial_cmp(&b.order)
                    .unwrap_or(std::cmp::Ordering::Equal)
            });
        }
    }

    /// Signed distance from the first slice to the second along the slice
    /// normal (row cosines cross column cosines, +z without orientation).
    fn slice_offset(slices: &[Slice]) -> Option<f64> {
        let (first, second) = (slices.first()?, slices.get(1)?);
        let (p, q) = (first.position?, second.position?);
        let normal = match first.orientation {
            Some([rx, ry, rz, cx, cy, cz]) => [ry * cz - rz * cy, rz * cx - rx * cz, rx * cy - ry * cx],
            None => [0.0, 0.0, 1.0],
        };
        Some((0..3).map(|a| (q[a] - p[a]) * normal[a]).sum())
    }

    /// Reverses slices that run against the slice normal, so that slice `k`
    /// sits at `origin + k * sz` whatever order they were sorted in.
    fn stack_along_normal(slices: &mut [Slice]) {
        if Self::slice_offset(slices).is_some_and(|offset| offset < 0.0) {
            log::debug!("Slices run against the slice normal, reversing the stack");
            slices.reverse();
        }
    }

    fn validate_dimensions(slices: &[Slice]) -> Result<(), VolumeLoaderError> {
        let first_dim = slices[0].image.dim();
        if slices.iter().any(|slice| slice.image.dim() != first_dim) {
            return Err(VolumeLoaderError::InconsistentDimensions);
        }
        Ok(())
    }

    /// Stacks the slices into `[k, j, i]` order with rows flipped bottom-up,
    /// so that +y points up on screen.
    fn build_volume_array(slices: &[Slice]) -> Array3<f32> {
        let (height, width) = slices[0].image.dim();
        let depth = slices.len();
        let mut volume = Array3::<f32>::zeros((depth, height, width));

        for (i, slice) in slices.iter().enumerate() {
            volume
                .slice_mut(s![i, .., ..])
                .assign(&slice.image.slice(s![..;-1, ..]));
        }

        volume
    }

    fn get_spacing(slices: &[Slice]) -> (f64, f64, f64) {
        let (row_spacing, column_spacing) = slices
            .iter()
            .find_map(|slice| slice.pixel_spacing)
            .unwrap_or_else(|| {
                log::warn!("No Pixel Spacing found, assuming 1.0 mm");
                (1.0, 1.0)
            });

        let slice_spacing = Self::slice_offset(slices)
            .map(f64::abs)
            .filter(|d| *d > f64::EPSILON)
            .or_else(|| slices.iter().find_map(|slice| slice.spacing_between))
            .or_else(|| slices.iter().find_map(|slice| slice.thickness))
            .filter(|d| *d > 0.0)
            .unwrap_or(1.0);

        (column_spacing, row_spacing, slice_spacing)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn slice(order: Option<f64>, z: f64, fill: f32) -> Slice {
        Slice {
            order,
            position: Some([0.0, 0.0, z]),
            orientation: None,
            pixel_spacing: Some((0.7, 0.5)),
            spacing_between: None,
            thickness: Some(5.0),
            image: Array2::from_elem((2, 3), fill),
        }
    }

    #[test]
    fn sorts_by_order() {
        let mut slices = vec![slice(Some(3.0), 3.0, 3.0), slice(Some(1.0), 1.0, 1.0)];
        VolumeLoader::sort_slices(&mut slices, SortBy::ImagePositionPatient);
        assert_eq!(slices[0].image[[0, 0]], 1.0);

        let mut slices = vec![slice(Some(3.0), 3.0, 3.0), slice(Some(1.0), 1.0, 1.0)];
        VolumeLoader::sort_slices(&mut slices, SortBy::None);
        assert_eq!(slices[0].image[[0, 0]], 3.0);
    }

    #[test]
    fn spacing_prefers_slice_positions() {
        let slices = vec![slice(None, 1.0, 0.0), slice(None, 3.5, 0.0)];
        assert_eq!(VolumeLoader::get_spacing(&slices), (0.5, 0.7, 2.5));
    }

    #[test]
    fn descending_slices_are_reversed() {
        let mut slices = vec![
            slice(None, 5.0, 5.0),
            slice(None, 2.5, 2.5),
            slice(None, 0.0, 0.0),
        ];
        VolumeLoader::stack_along_normal(&mut slices);
        let fills: Vec<_> = slices.iter().map(|s| s.image[[0, 0]]).collect();
        assert_eq!(fills, [0.0, 2.5, 5.0]);
        assert_eq!(VolumeLoader::get_spacing(&slices).2, 2.5);
    }

    #[test]
    fn offset_follows_image_orientation() {
        // rows along +x, columns along -z: the slice normal is +y
        let mut slices = vec![slice(None, 0.0, 0.0), slice(None, 0.0, 1.0)];
        for (slice, y) in slices.iter_mut().zip([4.0, 1.0]) {
            slice.position = Some([0.0, y, 0.0]);
            slice.orientation = Some([1.0, 0.0, 0.0, 0.0, 0.0, -1.0]);
        }
        assert_eq!(VolumeLoader::slice_offset(&slices), Some(-3.0));

        VolumeLoader::stack_along_normal(&mut slices);
        assert_eq!(slices[0].image[[0, 0]], 1.0);
        assert_eq!(VolumeLoader::get_spacing(&slices).2, 3.0);
    }

    #[test]
    fn spacing_falls_back_to_thickness() {
        let slices = vec![slice(None, 1.0, 0.0)];
        assert_eq!(VolumeLoader::get_spacing(&slices), (0.5, 0.7, 5.0));
    }

    #[test]
    fn rejects_mismatched_slices() {
        let mut slices = vec![slice(None, 0.0, 0.0), slice(None, 1.0, 0.0)];
        slices[1].image = Array2::zeros((4, 4));
        assert!(matches!(
            VolumeLoader::validate_dimensions(&slices),
            Err(VolumeLoaderError::InconsistentDimensions)
        ));
    }

    #[test]
    fn rows_are_flipped_bottom_up() {
        let mut first = slice(None, 0.0, 0.0);
        first.image = Array2::from_shape_vec((2, 2), vec![1.0, 2.0, 3.0, 4.0]).unwrap();
        let volume = VolumeLoader::build_volume_array(&[first]);
        assert_eq!(volume[[0, 0, 0]], 3.0);
        assert_eq!(volume[[0, 1, 1]], 2.0);
    }

    #[test]
    fn missing_directory_names_the_path() {
        let err = VolumeLoader::load_from_directory("no/such/Skull_Dataset", SortBy::default())
            .unwrap_err();
        assert!(matches!(err, VolumeLoaderError::MissingDirectory(_)));
        assert!(err.to_string().contains("no/such/Skull_Dataset"));
    }

    #[test]
    fn directory_without_dicom_has_no_images() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("notes.txt"), b"not dicom").unwrap();
        fs::write(dir.path().join("broken.dcm"), b"not dicom either").unwrap();
        assert!(matches!(
            VolumeLoader::load_from_directory(dir.path(), SortBy::default()),
            Err(VolumeLoaderError::NoValidImages)
        ));
    }
}

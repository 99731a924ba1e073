use std::fmt;

use crate::folder::bytes_to_mb;
use crate::volume::Volume;

/// Version string printed in the report.
pub const TOOLKIT_VERSION: &str = concat!(env!("CARGO_PKG_NAME"), " ", env!("CARGO_PKG_VERSION"));

/// Summary of a loaded dataset, printed once at start-up.
#[derive(Debug, Clone, PartialEq)]
pub struct DatasetInfo {
    pub dimensions: (usize, usize, usize),
    pub spacing: (f64, f64, f64),
    pub origin: (f64, f64, f64),
    pub scalar_range: (f64, f64),
    pub folder_size_bytes: u64,
    pub version: String,
}

impl DatasetInfo {
    pub fn from_volume(volume: &Volume, folder_size_bytes: u64) -> Self {
        let (lo, hi) = volume.scalar_range();
        Self {
            dimensions: volume.dimensions(),
            spacing: volume.spacing,
            origin: volume.origin,
            scalar_range: (f64::from(lo), f64::from(hi)),
            folder_size_bytes,
            version: TOOLKIT_VERSION.to_string(),
        }
    }

    pub fn folder_size_mb(&self) -> f64 {
        bytes_to_mb(self.folder_size_bytes)
    }

    /// Three-line summary shown in the combined viewport.
    pub fn overlay_text(&self) -> String {
        let (nx, ny, nz) = self.dimensions;
        let (sx, sy, sz) = self.spacing;
        let (lo, hi) = self.scalar_range;
        format!("Dims: {nx}x{ny}x{nz}\nVoxel: {sx:.3}, {sy:.3}, {sz:.3}\nRange: {lo:.0} to {hi:.0}")
    }
}

impl fmt::Display for DatasetInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (lo, hi) = self.scalar_range;
        writeln!(f, "Dataset Info of Cancer Cell of Brain")?;
        writeln!(f, "Dimensions (Nx, Ny, Nz): {:?}", self.dimensions)?;
        writeln!(f, "Spacing / Voxel size (sx, sy, sz): {:?}", self.spacing)?;
        writeln!(f, "Origin: {:?}", self.origin)?;
        writeln!(f, "Scalar range (min, max): ({lo:?}, {hi:?})")?;
        writeln!(f, "DICOM folder size: {:.2} MB", self.folder_size_mb())?;
        write!(f, "Toolkit Version: {}", self.version)
    }
}

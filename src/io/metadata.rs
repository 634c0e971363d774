use crate::io::lut::{load_luts_from_dir, CalibrationLut};
use crate::types::{MatrixKind, PolError, PolResult, SampleUnit};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

/// Per-pixel incidence angles in degrees, shared with operators for tile-time lookup
pub trait IncidenceAngleGrid: Send + Sync + std::fmt::Debug {
    /// `(width, height)` covered by the grid
    fn size(&self) -> (usize, usize);

    /// Angle at a pixel inside `size()`
    fn angle(&self, x: usize, y: usize) -> f64;
}

/// Row-major incidence angle grid held in memory
#[derive(Debug, Clone, PartialEq)]
pub struct IncidenceAngles {
    width: usize,
    height: usize,
    values: Vec<f64>,
}

impl IncidenceAngles {
    /// Build from rows of equal length
    pub fn from_rows(rows: Vec<Vec<f64>>) -> PolResult<Self> {
        let width = rows.first().map_or(0, Vec::len);
        if rows.iter().any(|row| row.len() != width) {
            return Err(PolError::Metadata(
                "incidence angle rows have different lengths".to_string(),
            ));
        }
        Ok(Self {
            width,
            height: rows.len(),
            values: rows.into_iter().flatten().collect(),
        })
    }
}

impl IncidenceAngleGrid for IncidenceAngles {
    fn size(&self) -> (usize, usize) {
        (self.width, self.height)
    }

    fn angle(&self, x: usize, y: usize) -> f64 {
        self.values[y * self.width + x]
    }
}

/// Read-only product metadata queried by operators at initialization
pub trait ProductMetadata {
    /// `(width, height)` of the image grid
    fn image_size(&self) -> (usize, usize);

    fn group_count(&self) -> usize;

    /// Layout of a polarimetric band group
    fn matrix_kind(&self, group: usize) -> Option<MatrixKind>;

    /// Calibration table by name (`lutSigma`, `lutGamma`, `lutBeta`)
    fn calibration_lut(&self, name: &str) -> Option<&CalibrationLut>;

    /// Incidence angle grid, if the product carries one
    fn incidence_grid(&self) -> Option<Arc<dyn IncidenceAngleGrid>>;

    /// Incidence angle in degrees at an image pixel
    fn incidence_angle(&self, x: usize, y: usize) -> Option<f64> {
        let grid = self.incidence_grid()?;
        let (width, height) = grid.size();
        (x < width && y < height).then(|| grid.angle(x, y))
    }

    /// Whether absolute calibration has already been applied
    fn is_calibrated(&self) -> bool;

    fn is_slc(&self) -> bool;

    /// Column offset of this image within the full product
    fn subset_offset_x(&self) -> usize {
        0
    }

    /// Unit of a single-polarisation band group
    fn sample_unit(&self, group: usize) -> Option<SampleUnit>;

    /// Label used in target band names (e.g. the polarisation `HH`)
    fn band_label(&self, group: usize) -> String {
        format!("G{}", group + 1)
    }
}

/// Per-group description in `ProductInfo`
#[derive(Debug, Clone, PartialEq)]
pub struct BandGroupInfo {
    pub label: String,
    pub matrix_kind: Option<MatrixKind>,
    pub sample_unit: Option<SampleUnit>,
}

/// In-memory product metadata
#[derive(Debug, Clone, Default)]
pub struct ProductInfo {
    pub width: usize,
    pub height: usize,
    pub groups: Vec<BandGroupInfo>,
    pub luts: HashMap<String, CalibrationLut>,
    pub incidence_angles: Option<Arc<IncidenceAngles>>,
    pub calibrated: bool,
    pub slc: bool,
    pub subset_offset_x: usize,
}

impl ProductInfo {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            ..Default::default()
        }
    }

    /// Add a polarimetric band group
    pub fn with_matrix_group(mut self, label: &str, kind: MatrixKind) -> Self {
        self.groups.push(BandGroupInfo {
            label: label.to_string(),
            matrix_kind: Some(kind),
            sample_unit: None,
        });
        self
    }

    /// Add a single-polarisation band group
    pub fn with_sample_group(mut self, label: &str, unit: SampleUnit) -> Self {
        self.groups.push(BandGroupInfo {
            label: label.to_string(),
            matrix_kind: None,
            sample_unit: Some(unit),
        });
        self
    }

    /// Attach an incidence angle grid given as rows of degrees
    pub fn with_incidence_angles(mut self, rows: Vec<Vec<f64>>) -> PolResult<Self> {
        self.incidence_angles = Some(Arc::new(IncidenceAngles::from_rows(rows)?));
        Ok(self)
    }

    pub fn with_lut(mut self, name: &str, lut: CalibrationLut) -> Self {
        self.luts.insert(name.to_string(), lut);
        self
    }

    /// Attach every calibration table found next to the product
    pub fn with_luts_from_dir<P: AsRef<Path>>(mut self, dir: P) -> PolResult<Self> {
        for (name, lut) in load_luts_from_dir(dir, &["lutSigma", "lutGamma", "lutBeta"])? {
            self.luts.insert(name, lut);
        }
        Ok(self)
    }

    /// Matrix kinds of all groups; groups without one are skipped
    pub fn matrix_kinds(&self) -> Vec<MatrixKind> {
        self.groups.iter().filter_map(|g| g.matrix_kind).collect()
    }
}

impl ProductMetadata for ProductInfo {
    fn image_size(&self) -> (usize, usize) {
        (self.width, self.height)
    }

    fn group_count(&self) -> usize {
        self.groups.len()
    }

    fn matrix_kind(&self, group: usize) -> Option<MatrixKind> {
        self.groups.get(group).and_then(|g| g.matrix_kind)
    }

    fn calibration_lut(&self, name: &str) -> Option<&CalibrationLut> {
        self.luts.get(name)
    }

    fn incidence_grid(&self) -> Option<Arc<dyn IncidenceAngleGrid>> {
        self.incidence_angles
            .clone()
            .map(|grid| grid as Arc<dyn IncidenceAngleGrid>)
    }

    fn is_calibrated(&self) -> bool {
        self.calibrated
    }

    fn is_slc(&self) -> bool {
        self.slc
    }

    fn subset_offset_x(&self) -> usize {
        self.subset_offset_x
    }

    fn sample_unit(&self, group: usize) -> Option<SampleUnit> {
        self.groups.get(group).and_then(|g| g.sample_unit)
    }

    fn band_label(&self, group: usize) -> String {
        self.groups
            .get(group)
            .map(|g| g.label.clone())
            .unwrap_or_else(|| format!("G{}", group + 1))
    }
}

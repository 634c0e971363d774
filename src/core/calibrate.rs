use crate::core::tiling::{check_tile_request, Rect, SourceTile, TileOperator, TileSource};
use crate::io::lut::CalibrationLut;
use crate::io::metadata::{IncidenceAngleGrid, ProductMetadata};
use crate::types::{PolError, PolResult, SampleUnit, EPS};
use ndarray::{Array2, Zip};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Types of radiometric calibration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CalibrationType {
    Sigma0, // Radar cross section per unit ground area
    Gamma0, // Normalized by the incidence plane
    Beta0,  // Radar brightness
}

impl CalibrationType {
    /// Name of the LUT this calibration reads
    pub fn lut_name(&self) -> &'static str {
        match self {
            CalibrationType::Sigma0 => "lutSigma",
            CalibrationType::Gamma0 => "lutGamma",
            CalibrationType::Beta0 => "lutBeta",
        }
    }

    pub fn band_prefix(&self) -> &'static str {
        match self {
            CalibrationType::Sigma0 => "Sigma0",
            CalibrationType::Gamma0 => "Gamma0",
            CalibrationType::Beta0 => "Beta0",
        }
    }
}

impl std::str::FromStr for CalibrationType {
    type Err = PolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "sigma0" | "sigma" => Ok(CalibrationType::Sigma0),
            "gamma0" | "gamma" => Ok(CalibrationType::Gamma0),
            "beta0" | "beta" => Ok(CalibrationType::Beta0),
            other => Err(PolError::InvalidParameter(format!(
                "unknown calibration type: {}",
                other
            ))),
        }
    }
}

/// Where the incidence angle for the `sin(θ)` correction comes from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum IncidenceAngleSource {
    /// No per-pixel correction
    #[default]
    None,
    /// Per-pixel incidence angle grid carried by the product
    ProductGrid,
}

/// Radiometric calibration settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CalibrationParams {
    pub calibration_type: CalibrationType,
    /// Write `10·log10` of the calibrated value
    pub output_db: bool,
    /// Write calibrated I/Q pairs for SLC input
    pub output_complex: bool,
    pub incidence_angle: IncidenceAngleSource,
    pub output_no_data: f32,
}

impl Default for CalibrationParams {
    fn default() -> Self {
        Self {
            calibration_type: CalibrationType::Sigma0,
            output_db: false,
            output_complex: false,
            incidence_angle: IncidenceAngleSource::None,
            output_no_data: 0.0,
        }
    }
}

/// Initialization state of a calibrator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CalibratorState {
    Uninitialized,
    LutLoaded,
    Ready,
}

#[derive(Debug, Clone)]
struct CalibrationGroup {
    unit: SampleUnit,
    label: String,
}

/// LUT-based digital-number-to-backscatter calibrator
#[derive(Debug, Clone)]
pub struct RadiometricCalibrator {
    params: CalibrationParams,
    state: CalibratorState,
    lut: Option<CalibrationLut>,
    is_slc: bool,
    subset_offset_x: usize,
    image_size: (usize, usize),
    groups: Vec<CalibrationGroup>,
    incidence: Option<Arc<dyn IncidenceAngleGrid>>,
}

impl RadiometricCalibrator {
    /// Create an uninitialized calibrator
    pub fn new(params: CalibrationParams) -> PolResult<Self> {
        if params.output_db && params.output_complex {
            return Err(PolError::InvalidParameter(
                "decibel output and complex output are mutually exclusive".to_string(),
            ));
        }
        Ok(Self {
            params,
            state: CalibratorState::Uninitialized,
            lut: None,
            is_slc: false,
            subset_offset_x: 0,
            image_size: (0, 0),
            groups: Vec::new(),
            incidence: None,
        })
    }

    /// Run both initialization steps against a product
    pub fn initialize(params: CalibrationParams, metadata: &dyn ProductMetadata) -> PolResult<Self> {
        let mut calibrator = Self::new(params)?;
        calibrator.load_lut(metadata)?;
        Self::prepare(&mut calibrator, metadata)?;
        Ok(calibrator)
    }

    pub fn state(&self) -> CalibratorState {
        self.state
    }

    pub fn params(&self) -> &CalibrationParams {
        &self.params
    }

    /// `Uninitialized → LutLoaded`: locate and validate the gain table
    pub fn load_lut(&mut self, metadata: &dyn ProductMetadata) -> PolResult<()> {
        if metadata.is_calibrated() {
            return Err(PolError::Calibration(
                "Absolute radiometric calibration has already been applied to the product"
                    .to_string(),
            ));
        }

        let name = self.params.calibration_type.lut_name();
        let lut = metadata.calibration_lut(name).ok_or_else(|| {
            PolError::Calibration(format!(
                "{} not found. Please ensure the look up table {}.xml is in the same folder as the original product",
                name, name
            ))
        })?;

        let (width, height) = metadata.image_size();
        let offset_x = metadata.subset_offset_x();
        lut.check_coverage(width, offset_x)?;

        log::info!(
            "Loaded {} with {} gains, offset {}",
            name,
            lut.len(),
            lut.offset
        );

        self.lut = Some(lut.clone());
        self.is_slc = metadata.is_slc();
        self.subset_offset_x = offset_x;
        self.image_size = (width, height);
        self.state = CalibratorState::LutLoaded;
        Ok(())
    }

    /// `LutLoaded → Ready`: resolve band units and the incidence angle source
    pub fn prepare(&mut self, metadata: &dyn ProductMetadata) -> PolResult<()> {
        if self.state != CalibratorState::LutLoaded {
            return Err(PolError::Processing(format!(
                "calibrator must have a LUT loaded before preparing, state is {:?}",
                self.state
            )));
        }

        let mut groups = Vec::with_capacity(metadata.group_count());
        for g in 0..metadata.group_count() {
            let unit = metadata.sample_unit(g).ok_or_else(|| {
                PolError::Metadata(format!("band group {} has no sample unit", g))
            })?;
            if self.params.output_complex && (!self.is_slc || unit != SampleUnit::Complex) {
                return Err(PolError::InvalidParameter(format!(
                    "complex output requires SLC I/Q input, group {} is {:?}",
                    g, unit
                )));
            }
            groups.push(CalibrationGroup {
                unit,
                label: metadata.band_label(g),
            });
        }
        if groups.is_empty() {
            return Err(PolError::Metadata("product has no band groups".to_string()));
        }

        if self.params.incidence_angle == IncidenceAngleSource::ProductGrid {
            let grid = metadata.incidence_grid().ok_or_else(|| {
                PolError::Metadata("product carries no incidence angle grid".to_string())
            })?;
            let (grid_width, grid_height) = grid.size();
            let (width, height) = self.image_size;
            if grid_width < width || grid_height < height {
                return Err(PolError::Metadata(format!(
                    "incidence angle grid is {}x{}, image is {}x{}",
                    grid_width, grid_height, width, height
                )));
            }
            self.incidence = Some(grid);
        }

        log::debug!(
            "Calibrator ready: {} group(s), slc {}, subset offset {}",
            groups.len(),
            self.is_slc,
            self.subset_offset_x
        );
        self.groups = groups;
        self.state = CalibratorState::Ready;
        Ok(())
    }

    fn ready_lut(&self) -> PolResult<&CalibrationLut> {
        match (&self.lut, self.state) {
            (Some(lut), CalibratorState::Ready) => Ok(lut),
            _ => Err(PolError::Processing(format!(
                "calibrator is not ready, state is {:?}",
                self.state
            ))),
        }
    }

    /// Apply the gain (and offset for detected data) for an image column
    fn apply_gain(&self, lut: &CalibrationLut, intensity: f64, column: usize) -> f64 {
        let gain = lut.gains[column + self.subset_offset_x];
        if gain <= 0.0 {
            return 0.0;
        }
        if self.is_slc {
            intensity / (gain * gain)
        } else {
            (intensity + lut.offset) / gain
        }
    }

    fn incidence_factor(&self, x: usize, y: usize) -> f64 {
        match &self.incidence {
            Some(grid) => grid.angle(x, y).to_radians().sin(),
            None => 1.0,
        }
    }

    fn check_pixel(&self, x: usize, y: usize) -> PolResult<()> {
        let (width, height) = self.image_size;
        if x >= width || y >= height {
            return Err(PolError::InvalidParameter(format!(
                "pixel ({}, {}) lies outside the {}x{} image",
                x, y, width, height
            )));
        }
        Ok(())
    }

    /// Calibrated linear value of a linear intensity at pixel `(x, y)`
    pub fn calibrate_intensity(&self, intensity: f64, x: usize, y: usize) -> PolResult<f64> {
        let lut = self.ready_lut()?;
        self.check_pixel(x, y)?;
        Ok(self.apply_gain(lut, intensity, x) * self.incidence_factor(x, y))
    }

    /// Undo the `sin(θ)` correction of an already calibrated value
    pub fn remove_incidence_correction(&self, value: f64, x: usize, y: usize) -> PolResult<f64> {
        self.ready_lut()?;
        self.check_pixel(x, y)?;
        let factor = self.incidence_factor(x, y);
        if factor.abs() > EPS {
            Ok(value / factor)
        } else {
            Ok(value)
        }
    }

    /// Calibrate a full linear-intensity image
    pub fn calibrate_image(&self, intensity: &Array2<f32>) -> PolResult<Array2<f32>> {
        let lut = self.ready_lut()?;
        let (height, width) = intensity.dim();
        if (width, height) != self.image_size {
            return Err(PolError::InvalidParameter(format!(
                "image is {}x{}, calibrator was prepared for {}x{}",
                width, height, self.image_size.0, self.image_size.1
            )));
        }
        let f = |(y, x): (usize, usize), &v: &f32| {
            let sigma = self.apply_gain(lut, v as f64, x) * self.incidence_factor(x, y);
            self.to_output(sigma) as f32
        };

        #[cfg(feature = "parallel")]
        let calibrated = Zip::indexed(intensity).par_map_collect(f);
        #[cfg(not(feature = "parallel"))]
        let calibrated = Zip::indexed(intensity).map_collect(f);

        Ok(calibrated)
    }

    fn to_output(&self, sigma: f64) -> f64 {
        if self.params.output_db {
            to_db(sigma)
        } else {
            sigma
        }
    }

    fn group_band_names(&self, group: &CalibrationGroup) -> Vec<String> {
        if self.params.output_complex {
            vec![format!("i_{}", group.label), format!("q_{}", group.label)]
        } else if self.params.output_db {
            vec![format!(
                "{}_{}_db",
                self.params.calibration_type.band_prefix(),
                group.label
            )]
        } else {
            vec![format!(
                "{}_{}",
                self.params.calibration_type.band_prefix(),
                group.label
            )]
        }
    }

    fn calibrate_group_tile(
        &self,
        lut: &CalibrationLut,
        group: &CalibrationGroup,
        tile: &SourceTile,
        rect: Rect,
    ) -> Vec<Array2<f32>> {
        let shape = (rect.height, rect.width);
        let no_data_out = self.params.output_no_data;
        let sample = |r: usize, c: usize| {
            let (x, y) = (rect.x + c, rect.y + r);
            let first = tile.sample(0, x, y);
            let second = if group.unit.channel_count() > 1 {
                tile.sample(1, x, y)
            } else {
                0.0
            };
            let sigma = self.apply_gain(lut, group.unit.to_intensity(first, second), x)
                * self.incidence_factor(x, y);
            (first, second, sigma, tile.is_no_data(x, y))
        };

        if self.params.output_complex {
            let mut i_band = Array2::<f32>::zeros(shape);
            let mut q_band = Array2::<f32>::zeros(shape);
            for ((r, c), v) in i_band.indexed_iter_mut() {
                let (i, q, sigma, no_data) = sample(r, c);
                if no_data {
                    *v = no_data_out;
                    q_band[[r, c]] = no_data_out;
                    continue;
                }
                let magnitude = (i * i + q * q).sqrt();
                let (re, im) = if magnitude > 0.0 {
                    let scale = sigma.sqrt() / magnitude;
                    (i * scale, q * scale)
                } else {
                    (0.0, 0.0)
                };
                *v = re as f32;
                q_band[[r, c]] = im as f32;
            }
            vec![i_band, q_band]
        } else {
            vec![Array2::from_shape_fn(shape, |(r, c)| {
                let (_, _, sigma, no_data) = sample(r, c);
                if no_data {
                    no_data_out
                } else {
                    self.to_output(sigma) as f32
                }
            })]
        }
    }
}

impl TileOperator for RadiometricCalibrator {
    fn image_size(&self) -> (usize, usize) {
        self.image_size
    }

    fn target_band_names(&self) -> Vec<String> {
        self.groups
            .iter()
            .flat_map(|g| self.group_band_names(g))
            .collect()
    }

    fn compute_tile(&self, source: &dyn TileSource, rect: Rect) -> PolResult<Vec<Array2<f32>>> {
        let lut = self.ready_lut()?;
        check_tile_request(source, self.image_size, rect)?;
        let mut out = Vec::new();
        for (index, group) in self.groups.iter().enumerate() {
            let tile = source.fetch(index, rect)?;
            if tile.channel_count() != group.unit.channel_count() {
                return Err(PolError::Processing(format!(
                    "band group {} has {} channels, unit {:?} expects {}",
                    group.label,
                    tile.channel_count(),
                    group.unit,
                    group.unit.channel_count()
                )));
            }
            out.extend(self.calibrate_group_tile(lut, group, &tile, rect));
        }
        Ok(out)
    }
}

/// Convert a linear value to dB with the ε floor
pub fn to_db(linear: f64) -> f64 {
    10.0 * linear.max(EPS).log10()
}

use crate::core::estimator::TargetMatrix;
use crate::core::matrix_format::MatrixConverter;
use crate::core::tiling::{Rect, TileOperator, TileSource};
use crate::types::{MatrixKind, PixelWindow, PolResult};
use ndarray::Array2;
use serde::{Deserialize, Serialize};

/// Polarimetric speckle filtering parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpeckleFilterParams {
    /// Box-Car window size (must be odd)
    pub filter_size: usize,
    pub output_no_data: f32,
}

impl Default for SpeckleFilterParams {
    fn default() -> Self {
        Self {
            filter_size: 5,      // 5x5 window
            output_no_data: 0.0,
        }
    }
}

/// Matrix layout the filter writes for a source kind
pub fn filtered_matrix(source: MatrixKind) -> TargetMatrix {
    match source {
        MatrixKind::FullScattering | MatrixKind::T3 => TargetMatrix::T3,
        MatrixKind::DualPol(_) | MatrixKind::CompactPol(_) | MatrixKind::C2 => TargetMatrix::C2,
        MatrixKind::C3 => TargetMatrix::C3,
        MatrixKind::C4 => TargetMatrix::C4,
        MatrixKind::T4 => TargetMatrix::T4,
    }
}

/// Box-Car filter: windowed mean of the per-pixel polarimetric matrix
pub struct PolarimetricSpeckleFilter {
    params: SpeckleFilterParams,
    converter: MatrixConverter,
}

impl PolarimetricSpeckleFilter {
    pub fn new(
        params: SpeckleFilterParams,
        source_kinds: &[MatrixKind],
        image_size: (usize, usize),
    ) -> PolResult<Self> {
        let window = PixelWindow::from_size(params.filter_size)?;
        let target = match source_kinds.first() {
            Some(kind) => filtered_matrix(*kind),
            None => TargetMatrix::T3,
        };
        log::info!(
            "Box-Car speckle filter {}x{} writing {}",
            params.filter_size,
            params.filter_size,
            target
        );
        let converter = MatrixConverter::build(source_kinds, target, window, image_size)?
            .with_no_data_value(params.output_no_data);
        Ok(Self { params, converter })
    }

    pub fn params(&self) -> &SpeckleFilterParams {
        &self.params
    }

    pub fn target(&self) -> TargetMatrix {
        self.converter.target()
    }
}

impl TileOperator for PolarimetricSpeckleFilter {
    fn image_size(&self) -> (usize, usize) {
        self.converter.image_size()
    }

    fn target_band_names(&self) -> Vec<String> {
        self.converter.target_band_names()
    }

    fn compute_tile(&self, source: &dyn TileSource, rect: Rect) -> PolResult<Vec<Array2<f32>>> {
        self.converter.compute_tile(source, rect)
    }
}

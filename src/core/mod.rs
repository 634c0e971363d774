//! Core polarimetric processing modules

pub mod calibrate;
pub mod decomposition;
pub mod estimator;
pub mod matrix;
pub mod matrix_format;
pub mod speckle_filter;
pub mod tiling;

// Re-export main types
pub use calibrate::{
    CalibrationParams, CalibrationType, CalibratorState, IncidenceAngleSource,
    RadiometricCalibrator,
};
pub use decomposition::{
    Decomposition, DecompositionParams, DecompositionProcessor, HAlphaPartition, SpanStatistic,
};
pub use estimator::{CorrelationEstimator, MatrixEstimator, PolMatrix, TargetMatrix};
pub use matrix::{ComplexMatrix, Matrix2, Matrix3, Matrix4, ScatterMatrix};
pub use matrix_format::{band_names, parse_band_name, MatrixConverter, MatrixElement};
pub use speckle_filter::{PolarimetricSpeckleFilter, SpeckleFilterParams};
pub use tiling::{process_image, Rect, SourceTile, TileOperator, TileSink, TileSource};

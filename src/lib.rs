//! sarpol: polarimetric SAR matrix estimation, decomposition and calibration
//!
//! Builds windowed covariance/coherency matrices from quad-pol, dual-pol and
//! compact-pol band groups, converts between matrix formats, applies the Pauli,
//! Sinclair, Freeman-Durden, Yamaguchi and Cloude-Pottier decompositions, and
//! performs LUT-based radiometric calibration. Every operator works tile by tile
//! through the `TileSource` / `TileSink` contract.

pub mod config;
pub mod core;
pub mod io;
pub mod types;

// Re-export main types and functions for easier access
pub use crate::types::{
    CircularHandedness, DualPolPair, MatrixBasis, MatrixKind, PixelWindow, PolError, PolResult,
    SampleUnit, EPS,
};

pub use crate::config::ProcessingConfig;
pub use crate::core::{
    process_image, CalibrationParams, CalibrationType, Decomposition, DecompositionParams,
    DecompositionProcessor, MatrixConverter, MatrixEstimator, PolarimetricSpeckleFilter,
    RadiometricCalibrator, TargetMatrix,
};
pub use crate::io::{CalibrationLut, MemoryProduct, MemorySink, ProductInfo, ProductMetadata};

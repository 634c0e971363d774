//! Top-level processing configuration

use crate::core::calibrate::CalibrationParams;
use crate::core::decomposition::DecompositionParams;
use crate::core::speckle_filter::SpeckleFilterParams;
use crate::types::{PixelWindow, PolError, PolResult};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// All operator settings of a processing run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessingConfig {
    pub decomposition: DecompositionParams,
    pub calibration: CalibrationParams,
    pub speckle_filter: SpeckleFilterParams,
    /// Tile edge length used by the scheduler
    pub tile_size: usize,
}

impl Default for ProcessingConfig {
    fn default() -> Self {
        Self {
            decomposition: DecompositionParams::default(),
            calibration: CalibrationParams::default(),
            speckle_filter: SpeckleFilterParams::default(),
            tile_size: 256,
        }
    }
}

impl ProcessingConfig {
    /// Parse and validate a JSON configuration; missing fields take defaults
    pub fn from_json_str(json: &str) -> PolResult<Self> {
        let config: ProcessingConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_file<P: AsRef<Path>>(path: P) -> PolResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json_str(&content)
    }

    pub fn to_json_string(&self) -> PolResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Check window sizes and mutually exclusive options
    pub fn validate(&self) -> PolResult<()> {
        PixelWindow::from_size(self.decomposition.window_size)?;
        PixelWindow::from_size(self.speckle_filter.filter_size)?;
        if self.calibration.output_db && self.calibration.output_complex {
            return Err(PolError::InvalidParameter(
                "decibel output and complex output are mutually exclusive".to_string(),
            ));
        }
        if self.tile_size == 0 {
            return Err(PolError::InvalidParameter(
                "tile size must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

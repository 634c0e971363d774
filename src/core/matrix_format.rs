//! Channel layouts of formed matrices and the matrix conversion operator

use crate::core::estimator::{MatrixEstimator, PolMatrix, TargetMatrix};
use crate::core::tiling::{check_tile_request, Rect, SourceTile, TileOperator, TileSource};
use crate::types::{MatrixKind, PixelWindow, PolError, PolResult};
use ndarray::Array2;
use regex::Regex;

/// One real channel of a formed matrix
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MatrixElement {
    pub row: usize,
    pub col: usize,
    pub imaginary: bool,
}

/// Row-major channel order of an N×N formed matrix: diagonal, then upper
/// off-diagonal real/imaginary pairs
pub fn formed_layout(dimension: usize) -> Vec<MatrixElement> {
    let mut layout = Vec::with_capacity(dimension * dimension);
    for row in 0..dimension {
        layout.push(MatrixElement {
            row,
            col: row,
            imaginary: false,
        });
        for col in (row + 1)..dimension {
            layout.push(MatrixElement {
                row,
                col,
                imaginary: false,
            });
            layout.push(MatrixElement {
                row,
                col,
                imaginary: true,
            });
        }
    }
    layout
}

fn element_name(prefix: char, elem: &MatrixElement) -> String {
    let base = format!("{}{}{}", prefix, elem.row + 1, elem.col + 1);
    if elem.row == elem.col {
        base
    } else if elem.imaginary {
        format!("{}_imag", base)
    } else {
        format!("{}_real", base)
    }
}

/// Output band names for a target matrix, e.g. `T11, T12_real, T12_imag, ...`
pub fn band_names(target: TargetMatrix) -> Vec<String> {
    formed_layout(target.dimension())
        .iter()
        .map(|e| element_name(target.prefix(), e))
        .collect()
}

/// Parse a band name such as `C12_real` or `T33` into its matrix element
pub fn parse_band_name(name: &str) -> PolResult<MatrixElement> {
    let re = Regex::new(r"^[CT]([1-4])([1-4])(?:_(real|imag))?")
        .map_err(|e| PolError::Processing(format!("Regex error: {}", e)))?;
    let caps = re
        .captures(name)
        .ok_or_else(|| PolError::InvalidParameter(format!("not a matrix band name: {}", name)))?;

    let row = caps[1].parse::<usize>().unwrap_or(1) - 1;
    let col = caps[2].parse::<usize>().unwrap_or(1) - 1;
    let part = caps.get(3).map(|m| m.as_str());

    match (row == col, part) {
        (true, None) => Ok(MatrixElement {
            row,
            col,
            imaginary: false,
        }),
        (false, Some(p)) if row < col => Ok(MatrixElement {
            row,
            col,
            imaginary: p == "imag",
        }),
        _ => Err(PolError::InvalidParameter(format!(
            "not a matrix band name: {}",
            name
        ))),
    }
}

/// Fill one output buffer per element for every pixel of `rect`.
///
/// Pixels whose centre sample is no-data receive `no_data_out` in every band.
pub fn estimate_matrix_bands(
    estimator: &MatrixEstimator,
    tile: &SourceTile,
    rect: Rect,
    elements: &[MatrixElement],
    no_data_out: f32,
) -> Vec<Array2<f32>> {
    let mut bands = vec![Array2::<f32>::zeros((rect.height, rect.width)); elements.len()];
    for y in rect.y..rect.bottom() {
        for x in rect.x..rect.right() {
            let (r, c) = (y - rect.y, x - rect.x);
            if tile.is_no_data(x, y) {
                for band in bands.iter_mut() {
                    band[[r, c]] = no_data_out;
                }
                continue;
            }
            let m: PolMatrix = estimator.estimate(tile, x, y);
            for (band, e) in bands.iter_mut().zip(elements.iter()) {
                band[[r, c]] = m.value(e.row, e.col, e.imaginary) as f32;
            }
        }
    }
    bands
}

/// Converts every source band group to the requested covariance/coherency format
pub struct MatrixConverter {
    estimators: Vec<MatrixEstimator>,
    band_suffixes: Vec<String>,
    elements: Vec<MatrixElement>,
    window: PixelWindow,
    image_size: (usize, usize),
    no_data_out: f32,
}

impl MatrixConverter {
    /// One estimator per source group; identity conversions are rejected
    pub fn new(
        source_kinds: &[MatrixKind],
        target: TargetMatrix,
        window: PixelWindow,
        image_size: (usize, usize),
    ) -> PolResult<Self> {
        for kind in source_kinds {
            if *kind == target.kind() {
                return Err(PolError::UnsupportedMatrix(format!(
                    "the source product is already in {} format, no conversion is needed",
                    target
                )));
            }
        }
        Self::build(source_kinds, target, window, image_size)
    }

    /// Same as `new` but allows the target to equal the source layout
    pub(crate) fn build(
        source_kinds: &[MatrixKind],
        target: TargetMatrix,
        window: PixelWindow,
        image_size: (usize, usize),
    ) -> PolResult<Self> {
        if source_kinds.is_empty() {
            return Err(PolError::InvalidParameter(
                "no source band groups".to_string(),
            ));
        }
        let estimators = source_kinds
            .iter()
            .map(|kind| MatrixEstimator::new(*kind, target, window, image_size.0, image_size.1))
            .collect::<PolResult<Vec<_>>>()?;

        log::info!(
            "Matrix conversion to {} for {} band group(s)",
            target,
            estimators.len()
        );

        Ok(Self {
            band_suffixes: group_suffixes(source_kinds.len()),
            estimators,
            elements: formed_layout(target.dimension()),
            window,
            image_size,
            no_data_out: 0.0,
        })
    }

    pub fn with_no_data_value(mut self, no_data_out: f32) -> Self {
        self.no_data_out = no_data_out;
        self
    }

    pub fn target(&self) -> TargetMatrix {
        self.estimators[0].target()
    }
}

/// Band name suffixes distinguishing several source groups (`""` for a single group)
pub fn group_suffixes(group_count: usize) -> Vec<String> {
    if group_count <= 1 {
        vec![String::new()]
    } else {
        (1..=group_count).map(|g| format!("_G{}", g)).collect()
    }
}

impl TileOperator for MatrixConverter {
    fn image_size(&self) -> (usize, usize) {
        self.image_size
    }

    fn target_band_names(&self) -> Vec<String> {
        let names = band_names(self.target());
        self.band_suffixes
            .iter()
            .flat_map(|suffix| names.iter().map(move |n| format!("{}{}", n, suffix)))
            .collect()
    }

    fn compute_tile(&self, source: &dyn TileSource, rect: Rect) -> PolResult<Vec<Array2<f32>>> {
        check_tile_request(source, self.image_size, rect)?;
        let (width, height) = self.image_size;
        let source_rect = rect.expand(self.window.half_width, self.window.half_height, width, height);
        let mut out = Vec::with_capacity(self.estimators.len() * self.elements.len());
        for (group, estimator) in self.estimators.iter().enumerate() {
            let tile = source.fetch(group, source_rect)?;
            let expected = estimator.source().channel_count();
            if tile.channel_count() != expected {
                return Err(PolError::Processing(format!(
                    "group {} has {} channels, {} expects {}",
                    group,
                    tile.channel_count(),
                    estimator.source(),
                    expected
                )));
            }
            out.extend(estimate_matrix_bands(
                estimator,
                &tile,
                rect,
                &self.elements,
                self.no_data_out,
            ));
        }
        Ok(out)
    }
}

use crate::core::matrix::{
    c3_to_t3, c4_to_c3, c4_to_t4, correlation_from_vectors, covariance_from_vector, t3_to_c3,
    t4_to_c4, t4_to_t3, ComplexMatrix, Matrix2, Matrix3, Matrix4, ScatterMatrix,
};
use crate::core::matrix_format::formed_layout;
use crate::core::tiling::SourceTile;
use crate::types::{MatrixKind, PixelWindow, PolError, PolResult};
use num_complex::Complex64;
use serde::{Deserialize, Serialize};

/// Matrix an estimator produces
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TargetMatrix {
    C2,
    C3,
    C4,
    T3,
    T4,
}

impl TargetMatrix {
    pub fn dimension(&self) -> usize {
        match self {
            TargetMatrix::C2 => 2,
            TargetMatrix::C3 | TargetMatrix::T3 => 3,
            TargetMatrix::C4 | TargetMatrix::T4 => 4,
        }
    }

    /// Band name prefix ("C" or "T")
    pub fn prefix(&self) -> char {
        match self {
            TargetMatrix::C2 | TargetMatrix::C3 | TargetMatrix::C4 => 'C',
            TargetMatrix::T3 | TargetMatrix::T4 => 'T',
        }
    }

    pub fn kind(&self) -> MatrixKind {
        match self {
            TargetMatrix::C2 => MatrixKind::C2,
            TargetMatrix::C3 => MatrixKind::C3,
            TargetMatrix::C4 => MatrixKind::C4,
            TargetMatrix::T3 => MatrixKind::T3,
            TargetMatrix::T4 => MatrixKind::T4,
        }
    }

    /// The formed-matrix target matching a source kind, if it is one
    pub fn from_kind(kind: MatrixKind) -> Option<TargetMatrix> {
        match kind {
            MatrixKind::C2 => Some(TargetMatrix::C2),
            MatrixKind::C3 => Some(TargetMatrix::C3),
            MatrixKind::C4 => Some(TargetMatrix::C4),
            MatrixKind::T3 => Some(TargetMatrix::T3),
            MatrixKind::T4 => Some(TargetMatrix::T4),
            _ => None,
        }
    }
}

impl std::fmt::Display for TargetMatrix {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}{}", self.prefix(), self.dimension())
    }
}

impl std::str::FromStr for TargetMatrix {
    type Err = PolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "C2" => Ok(TargetMatrix::C2),
            "C3" => Ok(TargetMatrix::C3),
            "C4" => Ok(TargetMatrix::C4),
            "T3" => Ok(TargetMatrix::T3),
            "T4" => Ok(TargetMatrix::T4),
            other => Err(PolError::InvalidParameter(format!(
                "unknown matrix type: {}",
                other
            ))),
        }
    }
}

/// A windowed per-pixel matrix of any supported size
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PolMatrix {
    Two(Matrix2),
    Three(Matrix3),
    Four(Matrix4),
}

impl PolMatrix {
    pub fn dimension(&self) -> usize {
        match self {
            PolMatrix::Two(_) => 2,
            PolMatrix::Three(_) => 3,
            PolMatrix::Four(_) => 4,
        }
    }

    pub fn trace(&self) -> f64 {
        match self {
            PolMatrix::Two(m) => m.trace(),
            PolMatrix::Three(m) => m.trace(),
            PolMatrix::Four(m) => m.trace(),
        }
    }

    /// Real or imaginary part of element `(row, col)`
    pub fn value(&self, row: usize, col: usize, imaginary: bool) -> f64 {
        fn pick<const N: usize>(m: &ComplexMatrix<N>, r: usize, c: usize, imag: bool) -> f64 {
            if imag {
                m.im[r][c]
            } else {
                m.re[r][c]
            }
        }
        match self {
            PolMatrix::Two(m) => pick(m, row, col, imaginary),
            PolMatrix::Three(m) => pick(m, row, col, imaginary),
            PolMatrix::Four(m) => pick(m, row, col, imaginary),
        }
    }

    pub fn is_hermitian(&self) -> bool {
        match self {
            PolMatrix::Two(m) => m.is_hermitian(),
            PolMatrix::Three(m) => m.is_hermitian(),
            PolMatrix::Four(m) => m.is_hermitian(),
        }
    }
}

/// How a source kind turns into the requested target, fixed at construction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Plan {
    RawDualToC2,
    FormedC2,
    FullToC3,
    FullToT3,
    FullToC4,
    FullToT4,
    C3ToC3,
    C3ToT3,
    T3ToT3,
    T3ToC3,
    C4ToC3,
    C4ToT3,
    C4ToC4,
    C4ToT4,
    T4ToT3,
    T4ToC3,
    T4ToT4,
    T4ToC4,
}

fn plan_for(source: MatrixKind, target: TargetMatrix) -> PolResult<Plan> {
    use MatrixKind as K;
    use TargetMatrix as T;

    let plan = match (source, target) {
        (K::DualPol(_) | K::CompactPol(_), T::C2) => Plan::RawDualToC2,
        (K::C2, T::C2) => Plan::FormedC2,
        (K::FullScattering, T::C3) => Plan::FullToC3,
        (K::FullScattering, T::T3) => Plan::FullToT3,
        (K::FullScattering, T::C4) => Plan::FullToC4,
        (K::FullScattering, T::T4) => Plan::FullToT4,
        (K::C3, T::C3) => Plan::C3ToC3,
        (K::C3, T::T3) => Plan::C3ToT3,
        (K::T3, T::T3) => Plan::T3ToT3,
        (K::T3, T::C3) => Plan::T3ToC3,
        (K::C4, T::C3) => Plan::C4ToC3,
        (K::C4, T::T3) => Plan::C4ToT3,
        (K::C4, T::C4) => Plan::C4ToC4,
        (K::C4, T::T4) => Plan::C4ToT4,
        (K::T4, T::T3) => Plan::T4ToT3,
        (K::T4, T::C3) => Plan::T4ToC3,
        (K::T4, T::T4) => Plan::T4ToT4,
        (K::T4, T::C4) => Plan::T4ToC4,
        (source, T::C2) => {
            return Err(PolError::UnsupportedMatrix(format!(
                "a dual-pol or compact-pol product is expected for C2, got {}",
                source
            )))
        }
        (source, target) => {
            return Err(PolError::UnsupportedMatrix(format!(
                "cannot convert source product from {} format to {} format",
                source, target
            )))
        }
    };
    Ok(plan)
}

/// Inclusive window bounds around `(x, y)` clamped to the image and the tile
fn window_bounds(
    window: PixelWindow,
    tile: &SourceTile,
    image_width: usize,
    image_height: usize,
    x: usize,
    y: usize,
) -> (usize, usize, usize, usize) {
    let x_start = x.saturating_sub(window.half_width).max(tile.rect.x);
    let y_start = y.saturating_sub(window.half_height).max(tile.rect.y);
    let x_end = (x + window.half_width)
        .min(image_width.saturating_sub(1))
        .min(tile.rect.right().saturating_sub(1));
    let y_end = (y + window.half_height)
        .min(image_height.saturating_sub(1))
        .min(tile.rect.bottom().saturating_sub(1));
    (x_start, x_end, y_start, y_end)
}

fn windowed_mean<const N: usize>(
    bounds: (usize, usize, usize, usize),
    tile: &SourceTile,
    pixel: impl Fn(&SourceTile, usize, usize) -> ComplexMatrix<N>,
) -> ComplexMatrix<N> {
    let (x_start, x_end, y_start, y_end) = bounds;
    let mut acc = ComplexMatrix::<N>::zeros();
    let mut count = 0usize;
    for yy in y_start..=y_end {
        for xx in x_start..=x_end {
            acc.plus_equals(&pixel(tile, xx, yy));
            count += 1;
        }
    }
    if count > 0 {
        acc.times_equals(1.0 / count as f64);
    }
    acc.symmetrize_hermitian();
    acc
}

fn read_complex(tile: &SourceTile, channel: usize, x: usize, y: usize) -> Complex64 {
    Complex64::new(tile.sample(channel, x, y), tile.sample(channel + 1, x, y))
}

fn read_scatter(tile: &SourceTile, x: usize, y: usize) -> ScatterMatrix {
    ScatterMatrix {
        hh: read_complex(tile, 0, x, y),
        hv: read_complex(tile, 2, x, y),
        vh: read_complex(tile, 4, x, y),
        vv: read_complex(tile, 6, x, y),
    }
}

fn read_dual(tile: &SourceTile, x: usize, y: usize) -> [Complex64; 2] {
    [read_complex(tile, 0, x, y), read_complex(tile, 2, x, y)]
}

fn read_formed<const N: usize>(tile: &SourceTile, x: usize, y: usize) -> ComplexMatrix<N> {
    let mut m = ComplexMatrix::<N>::zeros();
    for (channel, elem) in formed_layout(N).into_iter().enumerate() {
        let v = tile.sample(channel, x, y);
        if elem.imaginary {
            m.im[elem.row][elem.col] = v;
        } else {
            m.re[elem.row][elem.col] = v;
        }
    }
    m.symmetrize_hermitian();
    m
}

/// Spatially averaged covariance/coherency matrix estimator for one source band group
#[derive(Debug, Clone)]
pub struct MatrixEstimator {
    source: MatrixKind,
    target: TargetMatrix,
    window: PixelWindow,
    image_width: usize,
    image_height: usize,
    plan: Plan,
}

impl MatrixEstimator {
    /// Validate the source/target combination and build an estimator
    pub fn new(
        source: MatrixKind,
        target: TargetMatrix,
        window: PixelWindow,
        image_width: usize,
        image_height: usize,
    ) -> PolResult<Self> {
        let plan = plan_for(source, target)?;
        log::debug!(
            "Matrix estimator {} -> {} with {}x{} window",
            source,
            target,
            2 * window.half_width + 1,
            2 * window.half_height + 1
        );
        Ok(Self {
            source,
            target,
            window,
            image_width,
            image_height,
            plan,
        })
    }

    pub fn source(&self) -> MatrixKind {
        self.source
    }

    pub fn target(&self) -> TargetMatrix {
        self.target
    }

    pub fn window(&self) -> PixelWindow {
        self.window
    }

    /// Number of pixels the window at `(x, y)` averages over
    pub fn window_pixel_count(&self, tile: &SourceTile, x: usize, y: usize) -> usize {
        let (x0, x1, y0, y1) =
            window_bounds(self.window, tile, self.image_width, self.image_height, x, y);
        (x1 - x0 + 1) * (y1 - y0 + 1)
    }

    /// Averaged matrix at `(x, y)`; the tile must cover the halo-expanded region
    pub fn estimate(&self, tile: &SourceTile, x: usize, y: usize) -> PolMatrix {
        let b = window_bounds(self.window, tile, self.image_width, self.image_height, x, y);
        match self.plan {
            Plan::RawDualToC2 => PolMatrix::Two(windowed_mean(b, tile, |t, xx, yy| {
                covariance_from_vector(&read_dual(t, xx, yy))
            })),
            Plan::FormedC2 => PolMatrix::Two(windowed_mean(b, tile, read_formed::<2>)),
            Plan::FullToC3 => PolMatrix::Three(windowed_mean(b, tile, |t, xx, yy| {
                covariance_from_vector(&read_scatter(t, xx, yy).lexicographic3())
            })),
            Plan::FullToT3 => PolMatrix::Three(windowed_mean(b, tile, |t, xx, yy| {
                covariance_from_vector(&read_scatter(t, xx, yy).pauli3())
            })),
            Plan::FullToC4 => PolMatrix::Four(windowed_mean(b, tile, |t, xx, yy| {
                covariance_from_vector(&read_scatter(t, xx, yy).lexicographic4())
            })),
            Plan::FullToT4 => PolMatrix::Four(windowed_mean(b, tile, |t, xx, yy| {
                covariance_from_vector(&read_scatter(t, xx, yy).pauli4())
            })),
            Plan::C3ToC3 | Plan::T3ToT3 => {
                PolMatrix::Three(windowed_mean(b, tile, read_formed::<3>))
            }
            Plan::C3ToT3 => PolMatrix::Three(windowed_mean(b, tile, |t, xx, yy| {
                c3_to_t3(&read_formed::<3>(t, xx, yy))
            })),
            Plan::T3ToC3 => PolMatrix::Three(windowed_mean(b, tile, |t, xx, yy| {
                t3_to_c3(&read_formed::<3>(t, xx, yy))
            })),
            Plan::C4ToC3 => PolMatrix::Three(windowed_mean(b, tile, |t, xx, yy| {
                c4_to_c3(&read_formed::<4>(t, xx, yy))
            })),
            Plan::C4ToT3 => PolMatrix::Three(windowed_mean(b, tile, |t, xx, yy| {
                c3_to_t3(&c4_to_c3(&read_formed::<4>(t, xx, yy)))
            })),
            Plan::C4ToC4 | Plan::T4ToT4 => {
                PolMatrix::Four(windowed_mean(b, tile, read_formed::<4>))
            }
            Plan::C4ToT4 => PolMatrix::Four(windowed_mean(b, tile, |t, xx, yy| {
                c4_to_t4(&read_formed::<4>(t, xx, yy))
            })),
            Plan::T4ToT3 => PolMatrix::Three(windowed_mean(b, tile, |t, xx, yy| {
                t4_to_t3(&read_formed::<4>(t, xx, yy))
            })),
            Plan::T4ToC3 => PolMatrix::Three(windowed_mean(b, tile, |t, xx, yy| {
                t3_to_c3(&t4_to_t3(&read_formed::<4>(t, xx, yy)))
            })),
            Plan::T4ToC4 => PolMatrix::Four(windowed_mean(b, tile, |t, xx, yy| {
                t4_to_c4(&read_formed::<4>(t, xx, yy))
            })),
        }
    }

    /// Averaged C2 at `(x, y)`; fails unless the target is C2
    pub fn estimate_c2(&self, tile: &SourceTile, x: usize, y: usize) -> PolResult<Matrix2> {
        match self.estimate(tile, x, y) {
            PolMatrix::Two(m) => Ok(m),
            other => Err(PolError::UnsupportedMatrix(format!(
                "expected a 2x2 matrix, estimator produces {}x{}",
                other.dimension(),
                other.dimension()
            ))),
        }
    }

    /// Averaged 3x3 matrix at `(x, y)`; fails unless the target is C3 or T3
    pub fn estimate_3x3(&self, tile: &SourceTile, x: usize, y: usize) -> PolResult<Matrix3> {
        match self.estimate(tile, x, y) {
            PolMatrix::Three(m) => Ok(m),
            other => Err(PolError::UnsupportedMatrix(format!(
                "expected a 3x3 matrix, estimator produces {}x{}",
                other.dimension(),
                other.dimension()
            ))),
        }
    }
}

/// Mean 2×2 correlation matrix between two co-registered raw dual-pol acquisitions
#[derive(Debug, Clone)]
pub struct CorrelationEstimator {
    window: PixelWindow,
    image_width: usize,
    image_height: usize,
}

impl CorrelationEstimator {
    pub fn new(
        source: MatrixKind,
        window: PixelWindow,
        image_width: usize,
        image_height: usize,
    ) -> PolResult<Self> {
        if !matches!(source, MatrixKind::DualPol(_) | MatrixKind::CompactPol(_)) {
            return Err(PolError::UnsupportedMatrix(format!(
                "correlation matrix requires raw dual-pol or compact-pol input, got {}",
                source
            )));
        }
        Ok(Self {
            window,
            image_width,
            image_height,
        })
    }

    /// `mean(k_master · k_slaveᴴ)` over the clamped window at `(x, y)`
    pub fn estimate(&self, master: &SourceTile, slave: &SourceTile, x: usize, y: usize) -> Matrix2 {
        let (x0, x1, y0, y1) =
            window_bounds(self.window, master, self.image_width, self.image_height, x, y);
        let mut acc = Matrix2::zeros();
        let mut count = 0usize;
        for yy in y0..=y1 {
            for xx in x0..=x1 {
                acc.plus_equals(&correlation_from_vectors(
                    &read_dual(master, xx, yy),
                    &read_dual(slave, xx, yy),
                ));
                count += 1;
            }
        }
        if count > 0 {
            acc.times_equals(1.0 / count as f64);
        }
        acc
    }
}

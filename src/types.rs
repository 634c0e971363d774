use serde::{Deserialize, Serialize};

/// Small positive floor applied before logarithmic scaling and degeneracy tests
pub const EPS: f64 = 1.0e-10;

/// Polarisation pair carried by a raw dual-pol product
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DualPolPair {
    HhHv,
    VhVv,
    HhVv,
}

/// Transmit handedness of a compact-pol (hybrid) product
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CircularHandedness {
    Left,
    Right,
}

/// Layout of a source band group: raw scattering data or a pre-formed matrix
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MatrixKind {
    /// Full quad-pol scattering matrix (HH, HV, VH, VV as I/Q pairs)
    FullScattering,
    /// Raw dual-pol scattering vector
    DualPol(DualPolPair),
    /// Raw compact-pol scattering vector
    CompactPol(CircularHandedness),
    C2,
    C3,
    C4,
    T3,
    T4,
}

/// Basis a formed matrix is expressed in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MatrixBasis {
    /// Lexicographic polarisation basis (covariance)
    Covariance,
    /// Pauli basis (coherency)
    Coherency,
}

impl MatrixKind {
    /// Whether the source stores complex scattering samples rather than a formed matrix
    pub fn is_raw(&self) -> bool {
        matches!(
            self,
            MatrixKind::FullScattering | MatrixKind::DualPol(_) | MatrixKind::CompactPol(_)
        )
    }

    /// Whether this is a dual-pol or compact-pol source (raw or C2)
    pub fn is_dual_pol(&self) -> bool {
        matches!(
            self,
            MatrixKind::DualPol(_) | MatrixKind::CompactPol(_) | MatrixKind::C2
        )
    }

    /// Whether this is a quad-pol source (raw or formed)
    pub fn is_quad_pol(&self) -> bool {
        matches!(
            self,
            MatrixKind::FullScattering
                | MatrixKind::C3
                | MatrixKind::C4
                | MatrixKind::T3
                | MatrixKind::T4
        )
    }

    /// Matrix dimension the source can natively describe
    pub fn dimension(&self) -> usize {
        match self {
            MatrixKind::DualPol(_) | MatrixKind::CompactPol(_) | MatrixKind::C2 => 2,
            MatrixKind::C3 | MatrixKind::T3 => 3,
            MatrixKind::FullScattering | MatrixKind::C4 | MatrixKind::T4 => 4,
        }
    }

    /// Basis of a formed matrix, `None` for raw scattering data
    pub fn basis(&self) -> Option<MatrixBasis> {
        match self {
            MatrixKind::C2 | MatrixKind::C3 | MatrixKind::C4 => Some(MatrixBasis::Covariance),
            MatrixKind::T3 | MatrixKind::T4 => Some(MatrixBasis::Coherency),
            _ => None,
        }
    }

    /// Number of real channels a band group of this kind carries
    pub fn channel_count(&self) -> usize {
        match self {
            MatrixKind::FullScattering => 8,
            MatrixKind::DualPol(_) | MatrixKind::CompactPol(_) => 4,
            MatrixKind::C2 => 4,
            MatrixKind::C3 | MatrixKind::T3 => 9,
            MatrixKind::C4 | MatrixKind::T4 => 16,
        }
    }
}

impl std::fmt::Display for MatrixKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MatrixKind::FullScattering => write!(f, "full-pol scattering"),
            MatrixKind::DualPol(DualPolPair::HhHv) => write!(f, "dual-pol HH/HV"),
            MatrixKind::DualPol(DualPolPair::VhVv) => write!(f, "dual-pol VH/VV"),
            MatrixKind::DualPol(DualPolPair::HhVv) => write!(f, "dual-pol HH/VV"),
            MatrixKind::CompactPol(CircularHandedness::Left) => write!(f, "compact-pol LCH"),
            MatrixKind::CompactPol(CircularHandedness::Right) => write!(f, "compact-pol RCH"),
            MatrixKind::C2 => write!(f, "C2"),
            MatrixKind::C3 => write!(f, "C3"),
            MatrixKind::C4 => write!(f, "C4"),
            MatrixKind::T3 => write!(f, "T3"),
            MatrixKind::T4 => write!(f, "T4"),
        }
    }
}

/// Unit of the samples in a single-polarisation band group
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SampleUnit {
    Amplitude,
    Intensity,
    /// Real/imaginary channel pair
    Complex,
    IntensityDb,
}

impl SampleUnit {
    pub fn channel_count(&self) -> usize {
        match self {
            SampleUnit::Complex => 2,
            _ => 1,
        }
    }

    /// Linear intensity from the group's channel values at one pixel
    pub fn to_intensity(&self, first: f64, second: f64) -> f64 {
        match self {
            SampleUnit::Amplitude => first * first,
            SampleUnit::Intensity => first,
            SampleUnit::Complex => first * first + second * second,
            SampleUnit::IntensityDb => 10f64.powf(first / 10.0),
        }
    }
}

/// Sliding averaging neighbourhood, stored as half sizes in pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PixelWindow {
    pub half_width: usize,
    pub half_height: usize,
}

impl PixelWindow {
    /// Square window from an odd full window size (1, 3, 5, ...)
    pub fn from_size(window_size: usize) -> PolResult<Self> {
        if window_size == 0 || window_size % 2 == 0 {
            return Err(PolError::InvalidParameter(format!(
                "window size must be an odd integer >= 1, got {}",
                window_size
            )));
        }
        Ok(Self {
            half_width: window_size / 2,
            half_height: window_size / 2,
        })
    }

    /// Single-pixel window
    pub fn single() -> Self {
        Self {
            half_width: 0,
            half_height: 0,
        }
    }
}

/// Error types for polarimetric processing
#[derive(Debug, thiserror::Error)]
pub enum PolError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Unsupported matrix conversion: {0}")]
    UnsupportedMatrix(String),

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Calibration error: {0}")]
    Calibration(String),

    #[error("Metadata error: {0}")]
    Metadata(String),

    #[error("XML parsing error: {0}")]
    XmlParsing(#[from] quick_xml::DeError),

    #[error("Configuration error: {0}")]
    Config(#[from] serde_json::Error),

    #[error("Processing error: {0}")]
    Processing(String),
}

/// Result type for polarimetric operations
pub type PolResult<T> = Result<T, PolError>;

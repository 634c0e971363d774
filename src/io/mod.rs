//! Metadata, calibration table and raster collaborators

pub mod lut;
pub mod metadata;
pub mod raster;

pub use lut::{load_lut_file, parse_lut_xml, CalibrationLut};
pub use metadata::{
    BandGroupInfo, IncidenceAngleGrid, IncidenceAngles, ProductInfo, ProductMetadata,
};
pub use raster::{MemoryProduct, MemorySink};

use crate::types::{PolError, PolResult};
use quick_xml::de::from_str;
use serde::Deserialize;
use std::path::Path;

/// Gain/offset calibration table: one gain per range sample of the full product
#[derive(Debug, Clone, PartialEq)]
pub struct CalibrationLut {
    pub offset: f64,
    pub gains: Vec<f64>,
}

impl CalibrationLut {
    pub fn new(offset: f64, gains: Vec<f64>) -> Self {
        Self { offset, gains }
    }

    pub fn len(&self) -> usize {
        self.gains.len()
    }

    pub fn is_empty(&self) -> bool {
        self.gains.is_empty()
    }

    /// Fail unless the table covers `width` columns starting at `column_offset`
    pub fn check_coverage(&self, width: usize, column_offset: usize) -> PolResult<()> {
        if self.gains.len() < width + column_offset {
            return Err(PolError::Calibration(format!(
                "Calibration LUT is smaller than source product width ({} gains for {} columns at offset {})",
                self.gains.len(),
                width,
                column_offset
            )));
        }
        Ok(())
    }
}

/// Root of a `lutSigma.xml` / `lutGamma.xml` / `lutBeta.xml` document
#[derive(Debug, Deserialize)]
struct LutDocument {
    #[serde(rename = "offset", default)]
    offset: f64,
    #[serde(rename = "gains")]
    gains: String,
}

/// Parse a calibration LUT XML document
pub fn parse_lut_xml(xml_content: &str) -> PolResult<CalibrationLut> {
    let doc: LutDocument = from_str(xml_content)?;
    let gains = parse_space_separated_numbers::<f64>(&doc.gains)?;
    if gains.is_empty() {
        return Err(PolError::Metadata(
            "Calibration LUT contains no gains".to_string(),
        ));
    }
    log::debug!("Parsed calibration LUT: offset {}, {} gains", doc.offset, gains.len());
    Ok(CalibrationLut::new(doc.offset, gains))
}

/// Read and parse a calibration LUT file
pub fn load_lut_file<P: AsRef<Path>>(path: P) -> PolResult<CalibrationLut> {
    let path = path.as_ref();
    log::info!("Reading calibration LUT: {}", path.display());
    let content = std::fs::read_to_string(path)?;
    parse_lut_xml(&content)
}

/// Load every `<name>.xml` table present in a product directory
pub fn load_luts_from_dir<P: AsRef<Path>>(
    dir: P,
    names: &[&str],
) -> PolResult<Vec<(String, CalibrationLut)>> {
    let mut luts = Vec::new();
    for name in names {
        let path = dir.as_ref().join(format!("{}.xml", name));
        if path.is_file() {
            luts.push((name.to_string(), load_lut_file(&path)?));
        } else {
            log::debug!("No {} table in {}", name, dir.as_ref().display());
        }
    }
    Ok(luts)
}

/// Parse space-separated numbers from a string
pub(crate) fn parse_space_separated_numbers<T>(input: &str) -> PolResult<Vec<T>>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    input
        .split_whitespace()
        .map(|s| {
            s.parse::<T>()
                .map_err(|e| PolError::Metadata(format!("Parse error: {}", e)))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const LUT_XML: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
        <lut xmlns="http://www.rsi.ca/rs2/prod/xml/schemas">
            <productId>PDS_00000000</productId>
            <offset>0.000000e+00</offset>
            <gains>1.0e+02 1.5e+02 2.0e+02 2.5e+02</gains>
        </lut>"#;

    #[test]
    fn test_lut_parsing() {
        let lut = parse_lut_xml(LUT_XML).unwrap();
        assert_eq!(lut.offset, 0.0);
        assert_eq!(lut.gains, vec![100.0, 150.0, 200.0, 250.0]);
    }

    #[test]
    fn test_missing_offset_defaults_to_zero() {
        let lut = parse_lut_xml("<lut><gains>3 4</gains></lut>").unwrap();
        assert_eq!(lut.offset, 0.0);
        assert_eq!(lut.len(), 2);
    }

    #[test]
    fn test_coverage() {
        let lut = CalibrationLut::new(0.0, vec![1.0; 10]);
        assert!(lut.check_coverage(10, 0).is_ok());
        assert!(lut.check_coverage(8, 2).is_ok());
        assert!(lut.check_coverage(8, 3).is_err());
    }

    #[test]
    fn test_bad_gain_value() {
        assert!(parse_lut_xml("<lut><gains>1.0 abc</gains></lut>").is_err());
    }

    #[test]
    fn test_space_separated_numbers() {
        let v = parse_space_separated_numbers::<f64>(" 1  2.5\n3e1 ").unwrap();
        assert_eq!(v, vec![1.0, 2.5, 30.0]);
    }
}

use approx::assert_relative_eq;
use ndarray::Array2;
use sarpol::core::calibrate::{CalibratorState, IncidenceAngleSource};
use sarpol::core::tiling::{process_image, Rect, TileOperator};
use sarpol::{
    CalibrationLut, CalibrationParams, CalibrationType, MemoryProduct, MemorySink, PolError,
    ProductInfo, RadiometricCalibrator, SampleUnit,
};
use std::fs;
use tempfile::TempDir;

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn detected_product(width: usize, height: usize, gains: Vec<f64>, offset: f64) -> ProductInfo {
    ProductInfo::new(width, height)
        .with_sample_group("HH", SampleUnit::Intensity)
        .with_lut("lutSigma", CalibrationLut::new(offset, gains))
}

#[test]
fn test_unit_gain_is_identity() {
    init_logging();
    let info = detected_product(4, 3, vec![1.0; 4], 0.0);
    let calibrator = RadiometricCalibrator::initialize(CalibrationParams::default(), &info).unwrap();
    assert_eq!(calibrator.state(), CalibratorState::Ready);
    assert_eq!(calibrator.target_band_names(), vec!["Sigma0_HH"]);

    let data = Array2::from_shape_fn((3, 4), |(r, c)| (r * 4 + c) as f32 * 0.25);
    let product = MemoryProduct::new(4, 3)
        .with_group(vec![data.clone()], None)
        .unwrap();
    let mut sink = MemorySink::new(4, 3);
    process_image(&calibrator, &product, &mut sink, 2).unwrap();
    assert_eq!(sink.band("Sigma0_HH").unwrap(), &data);
}

#[test]
fn test_detected_gain_and_offset_per_column() {
    let info = detected_product(3, 1, vec![2.0, 4.0, 0.0], 1.0);
    let calibrator = RadiometricCalibrator::initialize(CalibrationParams::default(), &info).unwrap();

    assert_relative_eq!(calibrator.calibrate_intensity(3.0, 0, 0).unwrap(), 2.0);
    assert_relative_eq!(calibrator.calibrate_intensity(3.0, 1, 0).unwrap(), 1.0);
    // non-positive gain
    assert_eq!(calibrator.calibrate_intensity(3.0, 2, 0).unwrap(), 0.0);
}

#[test]
fn test_slc_amplitude_and_db_output() {
    let mut info = ProductInfo::new(2, 1)
        .with_sample_group("VV", SampleUnit::Complex)
        .with_lut("lutBeta", CalibrationLut::new(0.0, vec![10.0, 10.0]));
    info.slc = true;
    let params = CalibrationParams {
        calibration_type: CalibrationType::Beta0,
        output_db: true,
        ..Default::default()
    };
    let calibrator = RadiometricCalibrator::initialize(params, &info).unwrap();
    assert_eq!(calibrator.target_band_names(), vec!["Beta0_VV_db"]);

    // |3 + 4i|^2 / 10^2 = 0.25
    let product = MemoryProduct::new(2, 1)
        .with_group(
            vec![Array2::from_elem((1, 2), 3.0), Array2::from_elem((1, 2), 4.0)],
            None,
        )
        .unwrap();
    let out = calibrator.compute_tile(&product, Rect::new(0, 0, 2, 1)).unwrap();
    assert_eq!(out.len(), 1);
    assert_relative_eq!(out[0][[0, 1]], (10.0 * 0.25f64.log10()) as f32, epsilon = 1e-5);
}

#[test]
fn test_complex_output_preserves_phase() {
    let mut info = ProductInfo::new(2, 1)
        .with_sample_group("HV", SampleUnit::Complex)
        .with_lut("lutSigma", CalibrationLut::new(0.0, vec![2.0, 2.0]));
    info.slc = true;
    let params = CalibrationParams {
        output_complex: true,
        ..Default::default()
    };
    let calibrator = RadiometricCalibrator::initialize(params, &info).unwrap();
    assert_eq!(calibrator.target_band_names(), vec!["i_HV", "q_HV"]);

    let product = MemoryProduct::new(2, 1)
        .with_group(
            vec![
                Array2::from_shape_vec((1, 2), vec![3.0, 0.0]).unwrap(),
                Array2::from_shape_vec((1, 2), vec![4.0, 0.0]).unwrap(),
            ],
            None,
        )
        .unwrap();
    let out = calibrator.compute_tile(&product, Rect::new(0, 0, 2, 1)).unwrap();

    // sigma = 25 / 4, so the calibrated magnitude is 2.5 along the input phase
    assert_relative_eq!(out[0][[0, 0]], 1.5, epsilon = 1e-6);
    assert_relative_eq!(out[1][[0, 0]], 2.0, epsilon = 1e-6);
    assert_eq!(out[0][[0, 1]], 0.0);
    assert_eq!(out[1][[0, 1]], 0.0);
}

#[test]
fn test_incidence_correction_round_trip() {
    let info = detected_product(2, 1, vec![1.0, 1.0], 0.0)
        .with_incidence_angles(vec![vec![30.0, 90.0]])
        .unwrap();
    let params = CalibrationParams {
        incidence_angle: IncidenceAngleSource::ProductGrid,
        ..Default::default()
    };
    let calibrator = RadiometricCalibrator::initialize(params, &info).unwrap();

    let corrected = calibrator.calibrate_intensity(4.0, 0, 0).unwrap();
    assert_relative_eq!(corrected, 2.0, epsilon = 1e-12);
    assert_relative_eq!(
        calibrator.remove_incidence_correction(corrected, 0, 0).unwrap(),
        4.0,
        epsilon = 1e-12
    );
    assert_relative_eq!(calibrator.calibrate_intensity(4.0, 1, 0).unwrap(), 4.0, epsilon = 1e-12);
}

#[test]
fn test_lut_loaded_from_product_directory() {
    init_logging();
    let dir = TempDir::new().unwrap();
    fs::write(
        dir.path().join("lutGamma.xml"),
        r#"<?xml version="1.0" encoding="UTF-8"?>
<lut>
    <offset>0.0</offset>
    <gains>2.0 2.0 2.0 2.0 2.0 2.0</gains>
</lut>"#,
    )
    .unwrap();

    let mut info = ProductInfo::new(4, 1)
        .with_sample_group("HH", SampleUnit::Amplitude)
        .with_luts_from_dir(dir.path())
        .unwrap();
    info.subset_offset_x = 2;
    let params = CalibrationParams {
        calibration_type: CalibrationType::Gamma0,
        ..Default::default()
    };
    let calibrator = RadiometricCalibrator::initialize(params, &info).unwrap();
    assert_eq!(calibrator.target_band_names(), vec!["Gamma0_HH"]);
    assert_relative_eq!(calibrator.calibrate_intensity(8.0, 3, 0).unwrap(), 4.0);

    let image = Array2::from_elem((1, 4), 6.0f32);
    let calibrated = calibrator.calibrate_image(&image).unwrap();
    assert!(calibrated.iter().all(|v| *v == 3.0));
}

#[test]
fn test_missing_or_short_lut_is_rejected() {
    let info = ProductInfo::new(4, 1).with_sample_group("HH", SampleUnit::Intensity);
    let err = RadiometricCalibrator::initialize(CalibrationParams::default(), &info).unwrap_err();
    assert!(matches!(err, PolError::Calibration(msg) if msg.contains("lutSigma")));

    let mut info = detected_product(4, 1, vec![1.0; 5], 0.0);
    info.subset_offset_x = 2;
    assert!(RadiometricCalibrator::initialize(CalibrationParams::default(), &info).is_err());
}

#[test]
fn test_invalid_setups_are_rejected() {
    let mut info = detected_product(4, 1, vec![1.0; 4], 0.0);
    info.calibrated = true;
    assert!(matches!(
        RadiometricCalibrator::initialize(CalibrationParams::default(), &info),
        Err(PolError::Calibration(_))
    ));

    // complex output needs SLC I/Q input
    let info = detected_product(4, 1, vec![1.0; 4], 0.0);
    let params = CalibrationParams {
        output_complex: true,
        ..Default::default()
    };
    assert!(RadiometricCalibrator::initialize(params, &info).is_err());

    let params = CalibrationParams {
        output_complex: true,
        output_db: true,
        ..Default::default()
    };
    assert!(RadiometricCalibrator::new(params).is_err());
}

#[test]
fn test_not_ready_calibrator_refuses_work() {
    let info = detected_product(2, 1, vec![1.0, 1.0], 0.0);
    let mut calibrator = RadiometricCalibrator::new(CalibrationParams::default()).unwrap();
    assert_eq!(calibrator.state(), CalibratorState::Uninitialized);
    assert!(calibrator.calibrate_intensity(1.0, 0, 0).is_err());

    calibrator.load_lut(&info).unwrap();
    assert_eq!(calibrator.state(), CalibratorState::LutLoaded);
    assert!(calibrator.calibrate_intensity(1.0, 0, 0).is_err());

    RadiometricCalibrator::prepare(&mut calibrator, &info).unwrap();
    assert_eq!(calibrator.state(), CalibratorState::Ready);
    assert!(calibrator.calibrate_intensity(1.0, 0, 0).is_ok());
}

#[test]
fn test_no_data_pixels_get_output_value() {
    let info = detected_product(2, 1, vec![1.0, 1.0], 0.0);
    let params = CalibrationParams {
        output_no_data: -5.0,
        ..Default::default()
    };
    let calibrator = RadiometricCalibrator::initialize(params, &info).unwrap();
    let product = MemoryProduct::new(2, 1)
        .with_group(
            vec![Array2::from_shape_vec((1, 2), vec![0.0, 7.0]).unwrap()],
            Some(0.0),
        )
        .unwrap();
    let out = calibrator.compute_tile(&product, Rect::new(0, 0, 2, 1)).unwrap();
    assert_eq!(out[0][[0, 0]], -5.0);
    assert_eq!(out[0][[0, 1]], 7.0);
}

#[test]
fn test_wider_source_than_metadata_is_rejected() {
    let info = detected_product(4, 1, vec![1.0; 4], 0.0);
    let calibrator = RadiometricCalibrator::initialize(CalibrationParams::default(), &info).unwrap();
    let product = MemoryProduct::new(6, 1)
        .with_group(vec![Array2::from_elem((1, 6), 2.0)], None)
        .unwrap();

    let mut sink = MemorySink::new(6, 1);
    let err = process_image(&calibrator, &product, &mut sink, 2).unwrap_err();
    assert!(matches!(err, PolError::InvalidParameter(_)));
    assert!(sink.band_names().is_empty());
    assert!(calibrator
        .compute_tile(&product, Rect::new(4, 0, 2, 1))
        .is_err());
    assert!(calibrator.calibrate_intensity(1.0, 9, 0).is_err());
}

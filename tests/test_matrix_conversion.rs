use approx::assert_abs_diff_eq;
use ndarray::Array2;
use sarpol::core::matrix_format::{band_names, parse_band_name};
use sarpol::core::speckle_filter::SpeckleFilterParams;
use sarpol::core::tiling::{process_image, TileOperator};
use sarpol::{
    CircularHandedness, DualPolPair, MatrixConverter, MatrixKind, MemoryProduct, MemorySink,
    PixelWindow, PolError, PolarimetricSpeckleFilter, TargetMatrix,
};

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn scattering_channels(width: usize, height: usize) -> Vec<Array2<f32>> {
    (0..8)
        .map(|ch| {
            Array2::from_shape_fn((height, width), |(r, c)| {
                let t = (r * width + c) as f32 * 0.61 + ch as f32 * 0.9;
                t.cos() * (0.5 + 0.2 * ch as f32)
            })
        })
        .collect()
}

fn run(
    converter: &dyn TileOperator,
    product: &MemoryProduct,
    width: usize,
    height: usize,
) -> MemorySink {
    let mut sink = MemorySink::new(width, height);
    process_image(converter, product, &mut sink, 4).unwrap();
    sink
}

/// Re-read the sink bands as a formed matrix product
fn as_product(sink: &MemorySink, target: TargetMatrix, width: usize, height: usize) -> MemoryProduct {
    let channels = band_names(target)
        .iter()
        .map(|name| sink.band(name).unwrap().clone())
        .collect();
    MemoryProduct::new(width, height)
        .with_group(channels, None)
        .unwrap()
}

#[test]
fn test_conversion_chain_matches_direct_conversion() {
    init_logging();
    let (w, h) = (9, 7);
    let product = MemoryProduct::new(w, h)
        .with_group(scattering_channels(w, h), None)
        .unwrap();

    let to_c3 = MatrixConverter::new(
        &[MatrixKind::FullScattering],
        TargetMatrix::C3,
        PixelWindow::from_size(3).unwrap(),
        (w, h),
    )
    .unwrap();
    let c3_product = as_product(&run(&to_c3, &product, w, h), TargetMatrix::C3, w, h);

    let c3_to_t3 = MatrixConverter::new(
        &[MatrixKind::C3],
        TargetMatrix::T3,
        PixelWindow::single(),
        (w, h),
    )
    .unwrap();
    let chained = run(&c3_to_t3, &c3_product, w, h);

    let direct_op = MatrixConverter::new(
        &[MatrixKind::FullScattering],
        TargetMatrix::T3,
        PixelWindow::from_size(3).unwrap(),
        (w, h),
    )
    .unwrap();
    let direct = run(&direct_op, &product, w, h);

    for name in band_names(TargetMatrix::T3) {
        let a = chained.band(&name).unwrap();
        let b = direct.band(&name).unwrap();
        for (x, y) in a.iter().zip(b.iter()) {
            assert_abs_diff_eq!(*x, *y, epsilon = 1e-4);
        }
    }
}

#[test]
fn test_c4_reduces_to_c3() {
    let (w, h) = (5, 5);
    let product = MemoryProduct::new(w, h)
        .with_group(scattering_channels(w, h), None)
        .unwrap();
    let to_c4 = MatrixConverter::new(
        &[MatrixKind::FullScattering],
        TargetMatrix::C4,
        PixelWindow::single(),
        (w, h),
    )
    .unwrap();
    let c4_sink = run(&to_c4, &product, w, h);
    assert_eq!(c4_sink.band_names().len(), 16);
    let c4_product = as_product(&c4_sink, TargetMatrix::C4, w, h);

    let reduce = MatrixConverter::new(&[MatrixKind::C4], TargetMatrix::C3, PixelWindow::single(), (w, h))
        .unwrap();
    let reduced = run(&reduce, &c4_product, w, h);

    let direct_op = MatrixConverter::new(
        &[MatrixKind::FullScattering],
        TargetMatrix::C3,
        PixelWindow::single(),
        (w, h),
    )
    .unwrap();
    let direct = run(&direct_op, &product, w, h);

    for name in band_names(TargetMatrix::C3) {
        for (x, y) in reduced.band(&name).unwrap().iter().zip(direct.band(&name).unwrap().iter()) {
            assert_abs_diff_eq!(*x, *y, epsilon = 1e-4);
        }
    }
}

#[test]
fn test_identity_and_upsizing_rejected() {
    let window = PixelWindow::single();
    let err = MatrixConverter::new(&[MatrixKind::T3], TargetMatrix::T3, window, (4, 4))
        .err()
        .unwrap();
    assert!(matches!(err, PolError::UnsupportedMatrix(msg) if msg.contains("already in T3")));

    assert!(MatrixConverter::new(&[MatrixKind::C3], TargetMatrix::C4, window, (4, 4)).is_err());
    assert!(MatrixConverter::new(
        &[MatrixKind::DualPol(DualPolPair::HhHv)],
        TargetMatrix::C3,
        window,
        (4, 4)
    )
    .is_err());
    assert!(MatrixConverter::new(&[MatrixKind::FullScattering], TargetMatrix::C2, window, (4, 4))
        .is_err());
    assert!(MatrixConverter::new(&[], TargetMatrix::C3, window, (4, 4)).is_err());
}

#[test]
fn test_band_names_across_groups() {
    let converter = MatrixConverter::new(
        &[
            MatrixKind::DualPol(DualPolPair::HhHv),
            MatrixKind::CompactPol(CircularHandedness::Left),
        ],
        TargetMatrix::C2,
        PixelWindow::from_size(3).unwrap(),
        (4, 4),
    )
    .unwrap();
    let names = converter.target_band_names();
    assert_eq!(
        names,
        vec![
            "C11_G1", "C12_real_G1", "C12_imag_G1", "C22_G1", "C11_G2", "C12_real_G2",
            "C12_imag_G2", "C22_G2",
        ]
    );
    let element = parse_band_name(&names[6]).unwrap();
    assert_eq!((element.row, element.col, element.imaginary), (0, 1, true));
}

#[test]
fn test_speckle_filter_preserves_constant_scene() {
    init_logging();
    let (w, h) = (6, 6);
    // formed T3 bands with constant values
    let values = [2.0f32, 0.3, -0.1, 0.2, 0.05, 1.5, 0.1, 0.0, 1.0];
    let channels = values
        .iter()
        .map(|&v| Array2::from_elem((h, w), v))
        .collect();
    let product = MemoryProduct::new(w, h)
        .with_group(channels, None)
        .unwrap();

    let filter =
        PolarimetricSpeckleFilter::new(SpeckleFilterParams::default(), &[MatrixKind::T3], (w, h))
            .unwrap();
    assert_eq!(filter.target(), TargetMatrix::T3);
    let sink = run(&filter, &product, w, h);
    for (name, v) in band_names(TargetMatrix::T3).iter().zip(values.iter()) {
        for x in sink.band(name).unwrap().iter() {
            assert_abs_diff_eq!(*x, *v, epsilon = 1e-6);
        }
    }
}

#[test]
fn test_speckle_filter_smooths_and_keeps_no_data() {
    let (w, h) = (5, 5);
    let mut hh = Array2::from_elem((h, w), 1.0f32);
    hh[[2, 2]] = 6.0;
    hh[[0, 4]] = -1.0;
    let zeros = Array2::<f32>::zeros((h, w));
    let product = MemoryProduct::new(w, h)
        .with_group(vec![hh, zeros.clone(), zeros.clone(), zeros], Some(-1.0))
        .unwrap();
    let params = SpeckleFilterParams {
        filter_size: 3,
        output_no_data: -2.0,
    };
    let filter = PolarimetricSpeckleFilter::new(
        params,
        &[MatrixKind::DualPol(DualPolPair::HhHv)],
        (w, h),
    )
    .unwrap();
    assert_eq!(filter.target(), TargetMatrix::C2);

    let sink = run(&filter, &product, w, h);
    let c11 = sink.band("C11").unwrap();
    assert_eq!(c11[[0, 4]], -2.0);
    // centre: eight ones and one 36 averaged over nine pixels
    assert_abs_diff_eq!(c11[[2, 2]], 44.0 / 9.0, epsilon = 1e-5);
}

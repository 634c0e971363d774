use super::{
    classify, freeman_durden, h_alpha, pauli, scale_db, sinclair, sinclair_dual, yamaguchi,
    compute_span, Decomposition, DecompositionParams, SpanCell, SpanStatistic,
};
use crate::core::estimator::{MatrixEstimator, PolMatrix};
use crate::core::matrix_format::group_suffixes;
use crate::core::tiling::{
    check_image_size, check_tile_request, Rect, SourceTile, TileOperator, TileSource,
};
use crate::types::{MatrixKind, PixelWindow, PolError, PolResult};
use ndarray::Array2;

/// Applies one decomposition to every source band group, tile by tile
pub struct DecompositionProcessor {
    params: DecompositionParams,
    estimators: Vec<MatrixEstimator>,
    spans: Vec<SpanCell>,
    suffixes: Vec<String>,
    dual_pol: bool,
    image_size: (usize, usize),
}

impl DecompositionProcessor {
    /// Validate the configuration against the source groups
    pub fn new(
        params: DecompositionParams,
        source_kinds: &[MatrixKind],
        image_size: (usize, usize),
    ) -> PolResult<Self> {
        let window = PixelWindow::from_size(params.window_size)?;
        let first = source_kinds
            .first()
            .ok_or_else(|| PolError::InvalidParameter("no source band groups".to_string()))?;
        let dual_pol = first.is_dual_pol();
        if source_kinds.iter().any(|k| k.is_dual_pol() != dual_pol) {
            return Err(PolError::UnsupportedMatrix(
                "source band groups mix dual-pol and quad-pol data".to_string(),
            ));
        }

        let estimators = source_kinds
            .iter()
            .map(|kind| {
                let target = params.algorithm.required_matrix(*kind)?;
                MatrixEstimator::new(*kind, target, window, image_size.0, image_size.1)
            })
            .collect::<PolResult<Vec<_>>>()?;

        log::info!(
            "{} decomposition on {} band group(s), {}x{} window, normalization {}",
            params.algorithm,
            estimators.len(),
            params.window_size,
            params.window_size,
            if params.normalize { "on" } else { "off" }
        );

        Ok(Self {
            spans: source_kinds.iter().map(|_| SpanCell::new()).collect(),
            suffixes: group_suffixes(source_kinds.len()),
            estimators,
            dual_pol,
            image_size,
            params,
        })
    }

    pub fn params(&self) -> &DecompositionParams {
        &self.params
    }

    fn bands_per_group(&self) -> usize {
        self.params.algorithm.band_names(self.dual_pol).len()
    }

    fn needs_span(&self) -> bool {
        self.params.normalize && self.params.algorithm.uses_span()
    }

    /// Span statistic of a group, once `prepare` has computed it
    pub fn span(&self, group: usize) -> Option<SpanStatistic> {
        self.spans.get(group).and_then(SpanCell::get)
    }

    /// Compute the span statistic of every group that needs one.
    ///
    /// Runs the tiled full-image pass at most once per group; `process_image` calls it
    /// before dispatching tiles.
    pub fn prepare_spans(&self, source: &dyn TileSource, tile_size: usize) -> PolResult<()> {
        check_image_size(source, self.image_size)?;
        if !self.needs_span() {
            return Ok(());
        }
        for (group, (estimator, cell)) in self.estimators.iter().zip(self.spans.iter()).enumerate() {
            let span = cell.get_or_compute(|| {
                log::info!("Computing span statistic for band group {}", group);
                compute_span(estimator, source, group, tile_size)
            })?;
            log::debug!("Span of group {}: min {:.4e}, max {:.4e}", group, span.min, span.max);
        }
        Ok(())
    }

    /// Output values at one pixel, in band order
    fn pixel_values(
        &self,
        estimator: &MatrixEstimator,
        tile: &SourceTile,
        x: usize,
        y: usize,
        span: Option<&SpanStatistic>,
        out: &mut [f64],
    ) -> PolResult<()> {
        match (self.params.algorithm, estimator.estimate(tile, x, y)) {
            (Decomposition::Pauli, PolMatrix::Three(c3)) => {
                let p = pauli(&c3);
                out.copy_from_slice(&[scale_db(p.r, None), scale_db(p.g, None), scale_db(p.b, None)]);
            }
            (Decomposition::Sinclair, PolMatrix::Three(c3)) => {
                let p = sinclair(&c3);
                out.copy_from_slice(&[scale_db(p.r, None), scale_db(p.g, None), scale_db(p.b, None)]);
            }
            (Decomposition::Sinclair, PolMatrix::Two(c2)) => {
                let p = sinclair_dual(&c2);
                out.copy_from_slice(&[scale_db(p.r, None), scale_db(p.b, None)]);
            }
            (Decomposition::FreemanDurden, PolMatrix::Three(c3)) => {
                let p = freeman_durden(&c3);
                out.copy_from_slice(&[
                    scale_db(p.double_bounce, span),
                    scale_db(p.volume, span),
                    scale_db(p.surface, span),
                ]);
            }
            (Decomposition::Yamaguchi, PolMatrix::Three(c3)) => {
                let p = yamaguchi(&c3);
                out.copy_from_slice(&[
                    scale_db(p.double_bounce, span),
                    scale_db(p.volume, span),
                    scale_db(p.surface, span),
                    scale_db(p.helix, span),
                ]);
            }
            (Decomposition::CloudePottier, PolMatrix::Two(c2)) => {
                out[0] = classify(&h_alpha(&c2), self.params.partition) as f64;
            }
            (algorithm, m) => {
                return Err(PolError::Processing(format!(
                    "{} cannot use a {}x{} matrix",
                    algorithm,
                    m.dimension(),
                    m.dimension()
                )))
            }
        }
        Ok(())
    }
}

impl TileOperator for DecompositionProcessor {
    fn image_size(&self) -> (usize, usize) {
        self.image_size
    }

    fn prepare(&self, source: &dyn TileSource, tile_size: usize) -> PolResult<()> {
        self.prepare_spans(source, tile_size)
    }

    fn target_band_names(&self) -> Vec<String> {
        let names = self.params.algorithm.band_names(self.dual_pol);
        self.suffixes
            .iter()
            .flat_map(|suffix| names.iter().map(move |n| format!("{}{}", n, suffix)))
            .collect()
    }

    fn compute_tile(&self, source: &dyn TileSource, rect: Rect) -> PolResult<Vec<Array2<f32>>> {
        check_tile_request(source, self.image_size, rect)?;
        let (width, height) = self.image_size;
        let per_group = self.bands_per_group();
        let mut out = Vec::with_capacity(per_group * self.estimators.len());

        for (group, estimator) in self.estimators.iter().enumerate() {
            let span = if self.needs_span() {
                Some(self.spans[group].get().ok_or_else(|| {
                    PolError::Processing(format!(
                        "span statistic of band group {} has not been prepared",
                        group
                    ))
                })?)
            } else {
                None
            };

            let window = estimator.window();
            let tile = source.fetch(
                group,
                rect.expand(window.half_width, window.half_height, width, height),
            )?;
            if tile.channel_count() != estimator.source().channel_count() {
                return Err(PolError::Processing(format!(
                    "group {} has {} channels, {} expects {}",
                    group,
                    tile.channel_count(),
                    estimator.source(),
                    estimator.source().channel_count()
                )));
            }

            let mut bands = vec![Array2::<f32>::zeros((rect.height, rect.width)); per_group];
            let mut values = vec![0.0f64; per_group];
            for y in rect.y..rect.bottom() {
                for x in rect.x..rect.right() {
                    let (r, c) = (y - rect.y, x - rect.x);
                    if tile.is_no_data(x, y) {
                        for band in bands.iter_mut() {
                            band[[r, c]] = self.params.output_no_data;
                        }
                        continue;
                    }
                    self.pixel_values(estimator, &tile, x, y, span.as_ref(), &mut values)?;
                    for (band, v) in bands.iter_mut().zip(values.iter()) {
                        band[[r, c]] = *v as f32;
                    }
                }
            }
            out.extend(bands);
        }
        Ok(out)
    }
}

use crate::core::estimator::MatrixEstimator;
use crate::core::tiling::{tile_grid, Rect, SourceTile, TileSource};
use crate::types::PolResult;
use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};

/// Minimum and maximum total power over a whole band group
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpanStatistic {
    pub min: f64,
    pub max: f64,
}

impl SpanStatistic {
    fn empty() -> Self {
        Self {
            min: f64::INFINITY,
            max: f64::NEG_INFINITY,
        }
    }

    fn include(mut self, v: f64) -> Self {
        if v.is_finite() {
            self.min = self.min.min(v);
            self.max = self.max.max(v);
        }
        self
    }

    fn merge(self, other: Self) -> Self {
        Self {
            min: self.min.min(other.min),
            max: self.max.max(other.max),
        }
    }

    /// `{0, 0}` when no pixel contributed
    fn finish(self) -> Self {
        if self.min > self.max {
            Self { min: 0.0, max: 0.0 }
        } else {
            self
        }
    }
}

/// Span range of the windowed matrices over `rect`, skipping no-data pixels.
///
/// `tile` must cover `rect` plus the estimator's window halo.
pub fn tile_span(estimator: &MatrixEstimator, tile: &SourceTile, rect: Rect) -> SpanStatistic {
    (rect.y..rect.bottom()).fold(SpanStatistic::empty(), |acc, y| {
        (rect.x..rect.right()).fold(acc, |acc, x| {
            if tile.is_no_data(x, y) {
                acc
            } else {
                acc.include(estimator.estimate(tile, x, y).trace())
            }
        })
    })
}

/// Span range of a whole band group, gathered tile by tile with a window halo
pub fn compute_span(
    estimator: &MatrixEstimator,
    source: &dyn TileSource,
    group: usize,
    tile_size: usize,
) -> PolResult<SpanStatistic> {
    let (width, height) = source.image_size();
    let window = estimator.window();
    let span_of = |rect: &Rect| -> PolResult<SpanStatistic> {
        let halo = rect.expand(window.half_width, window.half_height, width, height);
        let tile = source.fetch(group, halo)?;
        Ok(tile_span(estimator, &tile, *rect))
    };
    let tiles = tile_grid(width, height, tile_size);

    #[cfg(feature = "parallel")]
    let stat = {
        use rayon::prelude::*;
        tiles
            .par_iter()
            .map(span_of)
            .try_reduce(SpanStatistic::empty, |a, b| Ok(a.merge(b)))?
    };

    #[cfg(not(feature = "parallel"))]
    let stat = tiles
        .iter()
        .map(span_of)
        .try_fold(SpanStatistic::empty(), |acc, s| s.map(|s| acc.merge(s)))?;

    Ok(stat.finish())
}

/// Compute-once holder of a group's span statistic.
///
/// Concurrent callers block until the first initialization finishes; a failed
/// initialization leaves the cell empty. Operators fill it in `prepare`, before tiles
/// are dispatched to worker threads.
#[derive(Debug, Default)]
pub struct SpanCell {
    cell: OnceCell<SpanStatistic>,
}

impl SpanCell {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self) -> Option<SpanStatistic> {
        self.cell.get().copied()
    }

    pub fn get_or_compute<F>(&self, compute: F) -> PolResult<SpanStatistic>
    where
        F: FnOnce() -> PolResult<SpanStatistic>,
    {
        self.cell.get_or_try_init(compute).copied()
    }
}

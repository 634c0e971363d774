use crate::types::{PolError, PolResult};
use ndarray::Array2;

/// Rectangular pixel region in image coordinates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Rect {
    pub x: usize,
    pub y: usize,
    pub width: usize,
    pub height: usize,
}

impl Rect {
    pub fn new(x: usize, y: usize, width: usize, height: usize) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Exclusive right edge
    pub fn right(&self) -> usize {
        self.x + self.width
    }

    /// Exclusive bottom edge
    pub fn bottom(&self) -> usize {
        self.y + self.height
    }

    pub fn contains(&self, x: usize, y: usize) -> bool {
        x >= self.x && x < self.right() && y >= self.y && y < self.bottom()
    }

    /// Grow by a halo on every side, clamped to `[0, image_width) × [0, image_height)`
    pub fn expand(
        &self,
        half_width: usize,
        half_height: usize,
        image_width: usize,
        image_height: usize,
    ) -> Rect {
        let x0 = self.x.saturating_sub(half_width);
        let y0 = self.y.saturating_sub(half_height);
        let x1 = (self.right() + half_width).min(image_width);
        let y1 = (self.bottom() + half_height).min(image_height);
        Rect::new(x0, y0, x1.saturating_sub(x0), y1.saturating_sub(y0))
    }
}

/// Split an image into row-major tiles of at most `tile_size × tile_size` pixels
pub fn tile_grid(image_width: usize, image_height: usize, tile_size: usize) -> Vec<Rect> {
    let step = tile_size.max(1);
    let mut tiles = Vec::new();
    for y in (0..image_height).step_by(step) {
        for x in (0..image_width).step_by(step) {
            tiles.push(Rect::new(
                x,
                y,
                step.min(image_width - x),
                step.min(image_height - y),
            ));
        }
    }
    tiles
}

/// Channel buffers of one source band group covering a rectangle.
///
/// Buffers are indexed `[[row, col]]` relative to the rectangle origin; accessors take
/// absolute image coordinates.
#[derive(Debug, Clone)]
pub struct SourceTile {
    pub rect: Rect,
    pub channels: Vec<Array2<f32>>,
    pub no_data: Option<f64>,
}

impl SourceTile {
    pub fn new(rect: Rect, channels: Vec<Array2<f32>>, no_data: Option<f64>) -> PolResult<Self> {
        for (i, channel) in channels.iter().enumerate() {
            if channel.dim() != (rect.height, rect.width) {
                return Err(PolError::Processing(format!(
                    "channel {} has shape {:?}, expected {}x{}",
                    i,
                    channel.dim(),
                    rect.height,
                    rect.width
                )));
            }
        }
        Ok(Self {
            rect,
            channels,
            no_data,
        })
    }

    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    #[inline]
    pub fn sample(&self, channel: usize, x: usize, y: usize) -> f64 {
        self.channels[channel][[y - self.rect.y, x - self.rect.x]] as f64
    }

    /// True when any channel at the pixel holds the group's no-data value
    pub fn is_no_data(&self, x: usize, y: usize) -> bool {
        match self.no_data {
            Some(nd) => (0..self.channels.len()).any(|c| self.sample(c, x, y) == nd),
            None => false,
        }
    }
}

/// Supplier of source channel data, one or more band groups sharing an image grid
pub trait TileSource: Sync {
    /// `(width, height)` of the image
    fn image_size(&self) -> (usize, usize);

    fn group_count(&self) -> usize;

    fn fetch(&self, group: usize, rect: Rect) -> PolResult<SourceTile>;
}

/// Receiver of computed target bands
pub trait TileSink {
    fn write(&mut self, band: &str, rect: Rect, values: &Array2<f32>) -> PolResult<()>;
}

/// A per-tile transform producing every target band for a rectangle
pub trait TileOperator: Sync {
    /// `(width, height)` of the image grid the operator was configured for
    fn image_size(&self) -> (usize, usize);

    /// Target band names, in the order `compute_tile` returns them
    fn target_band_names(&self) -> Vec<String>;

    /// Whole-image work that must finish before any tile is computed
    fn prepare(&self, _source: &dyn TileSource, _tile_size: usize) -> PolResult<()> {
        Ok(())
    }

    fn compute_tile(&self, source: &dyn TileSource, rect: Rect) -> PolResult<Vec<Array2<f32>>>;
}

/// Fail unless the source grid has the size an operator was configured for
pub fn check_image_size(source: &dyn TileSource, expected: (usize, usize)) -> PolResult<()> {
    let actual = source.image_size();
    if actual != expected {
        return Err(PolError::InvalidParameter(format!(
            "source image is {}x{}, operator was configured for {}x{}",
            actual.0, actual.1, expected.0, expected.1
        )));
    }
    Ok(())
}

/// Size check plus a bounds check of the requested rectangle
pub fn check_tile_request(
    source: &dyn TileSource,
    expected: (usize, usize),
    rect: Rect,
) -> PolResult<()> {
    check_image_size(source, expected)?;
    if rect.right() > expected.0 || rect.bottom() > expected.1 {
        return Err(PolError::InvalidParameter(format!(
            "tile {:?} lies outside the {}x{} image",
            rect, expected.0, expected.1
        )));
    }
    Ok(())
}

/// Run an operator over the whole image and hand every tile to the sink.
///
/// Tiles are computed in batches of one tile per worker thread; each batch is written
/// before the next one starts, so only a batch of outputs is held in memory.
pub fn process_image(
    operator: &dyn TileOperator,
    source: &dyn TileSource,
    sink: &mut dyn TileSink,
    tile_size: usize,
) -> PolResult<()> {
    check_image_size(source, operator.image_size())?;
    let (width, height) = source.image_size();
    let tiles = tile_grid(width, height, tile_size);
    let band_names = operator.target_band_names();
    log::info!(
        "Processing {}x{} image as {} tiles into {} bands",
        width,
        height,
        tiles.len(),
        band_names.len()
    );

    operator.prepare(source, tile_size)?;

    for batch in tiles.chunks(batch_size()) {
        let results = compute_tiles(operator, source, batch)?;
        for (rect, bands) in batch.iter().zip(results.iter()) {
            if bands.len() != band_names.len() {
                return Err(PolError::Processing(format!(
                    "operator returned {} bands for tile {:?}, expected {}",
                    bands.len(),
                    rect,
                    band_names.len()
                )));
            }
            for (name, values) in band_names.iter().zip(bands.iter()) {
                sink.write(name, *rect, values)?;
            }
        }
    }

    log::debug!("Finished writing {} tiles", tiles.len());
    Ok(())
}

#[cfg(feature = "parallel")]
fn batch_size() -> usize {
    rayon::current_num_threads().max(1)
}

#[cfg(not(feature = "parallel"))]
fn batch_size() -> usize {
    1
}

#[cfg(feature = "parallel")]
fn compute_tiles(
    operator: &dyn TileOperator,
    source: &dyn TileSource,
    tiles: &[Rect],
) -> PolResult<Vec<Vec<Array2<f32>>>> {
    use rayon::prelude::*;

    tiles
        .par_iter()
        .map(|rect| operator.compute_tile(source, *rect))
        .collect()
}

#[cfg(not(feature = "parallel"))]
fn compute_tiles(
    operator: &dyn TileOperator,
    source: &dyn TileSource,
    tiles: &[Rect],
) -> PolResult<Vec<Vec<Array2<f32>>>> {
    tiles
        .iter()
        .map(|rect| operator.compute_tile(source, *rect))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::raster::MemoryProduct;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Source that counts fetched tiles
    struct CountingSource {
        inner: MemoryProduct,
        fetches: AtomicUsize,
    }

    impl TileSource for CountingSource {
        fn image_size(&self) -> (usize, usize) {
            self.inner.image_size()
        }

        fn group_count(&self) -> usize {
            self.inner.group_count()
        }

        fn fetch(&self, group: usize, rect: Rect) -> PolResult<SourceTile> {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            self.inner.fetch(group, rect)
        }
    }

    struct CopyOperator {
        size: (usize, usize),
    }

    impl TileOperator for CopyOperator {
        fn image_size(&self) -> (usize, usize) {
            self.size
        }

        fn target_band_names(&self) -> Vec<String> {
            vec!["copy".to_string()]
        }

        fn compute_tile(&self, source: &dyn TileSource, rect: Rect) -> PolResult<Vec<Array2<f32>>> {
            check_tile_request(source, self.size, rect)?;
            let tile = source.fetch(0, rect)?;
            Ok(vec![tile.channels[0].clone()])
        }
    }

    /// Records how many tiles had been fetched when the first tile was written
    struct RecordingSink<'a> {
        fetches: &'a AtomicUsize,
        fetched_at_first_write: Option<usize>,
        writes: usize,
    }

    impl TileSink for RecordingSink<'_> {
        fn write(&mut self, _band: &str, _rect: Rect, _values: &Array2<f32>) -> PolResult<()> {
            if self.fetched_at_first_write.is_none() {
                self.fetched_at_first_write = Some(self.fetches.load(Ordering::SeqCst));
            }
            self.writes += 1;
            Ok(())
        }
    }

    fn counting_source(width: usize, height: usize) -> CountingSource {
        let data = Array2::from_shape_fn((height, width), |(r, c)| (r * width + c) as f32);
        CountingSource {
            inner: MemoryProduct::new(width, height)
                .with_group(vec![data], None)
                .unwrap(),
            fetches: AtomicUsize::new(0),
        }
    }

    #[test]
    fn test_tiles_are_written_before_the_image_is_finished() {
        let source = counting_source(64, 64);
        let operator = CopyOperator { size: (64, 64) };
        let mut sink = RecordingSink {
            fetches: &source.fetches,
            fetched_at_first_write: None,
            writes: 0,
        };
        process_image(&operator, &source, &mut sink, 4).unwrap();

        assert_eq!(sink.writes, 256);
        assert_eq!(source.fetches.load(Ordering::SeqCst), 256);
        // only the first batch had been fetched when writing began
        assert_eq!(sink.fetched_at_first_write, Some(batch_size().min(256)));
    }

    #[test]
    fn test_size_mismatch_is_rejected() {
        let source = counting_source(6, 4);
        let operator = CopyOperator { size: (4, 4) };
        let mut sink = RecordingSink {
            fetches: &source.fetches,
            fetched_at_first_write: None,
            writes: 0,
        };
        let err = process_image(&operator, &source, &mut sink, 2).unwrap_err();
        assert!(matches!(err, PolError::InvalidParameter(_)));
        assert_eq!(sink.writes, 0);

        let matching = CopyOperator { size: (6, 4) };
        assert!(matching.compute_tile(&source, Rect::new(4, 0, 4, 4)).is_err());
    }

    #[test]
    fn test_expand_clamps_to_image() {
        let rect = Rect::new(0, 5, 4, 4);
        let expanded = rect.expand(2, 2, 6, 10);
        assert_eq!(expanded, Rect::new(0, 3, 6, 7));
    }

    #[test]
    fn test_tile_grid_covers_image() {
        let tiles = tile_grid(10, 7, 4);
        assert_eq!(tiles.len(), 6);
        let area: usize = tiles.iter().map(|t| t.width * t.height).sum();
        assert_eq!(area, 70);
        assert_eq!(tiles[2], Rect::new(8, 0, 2, 4));
    }

    #[test]
    fn test_source_tile_no_data() {
        let rect = Rect::new(2, 3, 2, 1);
        let a = Array2::from_shape_vec((1, 2), vec![1.0, -9999.0]).unwrap();
        let b = Array2::from_shape_vec((1, 2), vec![2.0, 5.0]).unwrap();
        let tile = SourceTile::new(rect, vec![a, b], Some(-9999.0)).unwrap();

        assert_eq!(tile.sample(1, 2, 3), 2.0);
        assert!(!tile.is_no_data(2, 3));
        assert!(tile.is_no_data(3, 3));
    }

    #[test]
    fn test_source_tile_rejects_bad_shape() {
        let rect = Rect::new(0, 0, 3, 3);
        let a = Array2::<f32>::zeros((2, 3));
        assert!(SourceTile::new(rect, vec![a], None).is_err());
    }
}

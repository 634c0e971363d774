use crate::core::tiling::{Rect, SourceTile, TileSink, TileSource};
use crate::types::{PolError, PolResult};
use ndarray::{s, Array2};
use std::collections::HashMap;

/// One band group held in memory
#[derive(Debug, Clone)]
pub struct MemoryBandGroup {
    pub channels: Vec<Array2<f32>>,
    pub no_data: Option<f64>,
}

/// Whole-image tile source backed by in-memory rasters
#[derive(Debug, Clone)]
pub struct MemoryProduct {
    width: usize,
    height: usize,
    groups: Vec<MemoryBandGroup>,
}

impl MemoryProduct {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            groups: Vec::new(),
        }
    }

    /// Append a band group; every channel must be `height × width`
    pub fn add_group(
        &mut self,
        channels: Vec<Array2<f32>>,
        no_data: Option<f64>,
    ) -> PolResult<usize> {
        for (i, channel) in channels.iter().enumerate() {
            if channel.dim() != (self.height, self.width) {
                return Err(PolError::InvalidParameter(format!(
                    "channel {} is {:?}, image is {}x{}",
                    i,
                    channel.dim(),
                    self.width,
                    self.height
                )));
            }
        }
        self.groups.push(MemoryBandGroup { channels, no_data });
        Ok(self.groups.len() - 1)
    }

    pub fn with_group(mut self, channels: Vec<Array2<f32>>, no_data: Option<f64>) -> PolResult<Self> {
        self.add_group(channels, no_data)?;
        Ok(self)
    }
}

impl TileSource for MemoryProduct {
    fn image_size(&self) -> (usize, usize) {
        (self.width, self.height)
    }

    fn group_count(&self) -> usize {
        self.groups.len()
    }

    fn fetch(&self, group: usize, rect: Rect) -> PolResult<SourceTile> {
        let g = self
            .groups
            .get(group)
            .ok_or_else(|| PolError::InvalidParameter(format!("no band group {}", group)))?;
        if rect.right() > self.width || rect.bottom() > self.height {
            return Err(PolError::InvalidParameter(format!(
                "rectangle {:?} outside {}x{} image",
                rect, self.width, self.height
            )));
        }
        let channels = g
            .channels
            .iter()
            .map(|c| {
                c.slice(s![rect.y..rect.bottom(), rect.x..rect.right()])
                    .to_owned()
            })
            .collect();
        SourceTile::new(rect, channels, g.no_data)
    }
}

/// Tile sink assembling full-size output bands in memory
#[derive(Debug, Clone)]
pub struct MemorySink {
    width: usize,
    height: usize,
    bands: HashMap<String, Array2<f32>>,
}

impl MemorySink {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            bands: HashMap::new(),
        }
    }

    pub fn band(&self, name: &str) -> Option<&Array2<f32>> {
        self.bands.get(name)
    }

    pub fn band_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.bands.keys().cloned().collect();
        names.sort();
        names
    }
}

impl TileSink for MemorySink {
    fn write(&mut self, band: &str, rect: Rect, values: &Array2<f32>) -> PolResult<()> {
        if values.dim() != (rect.height, rect.width) {
            return Err(PolError::Processing(format!(
                "tile for {} is {:?}, rectangle is {}x{}",
                band,
                values.dim(),
                rect.width,
                rect.height
            )));
        }
        let (width, height) = (self.width, self.height);
        let target = self
            .bands
            .entry(band.to_string())
            .or_insert_with(|| Array2::zeros((height, width)));
        target
            .slice_mut(s![rect.y..rect.bottom(), rect.x..rect.right()])
            .assign(values);
        Ok(())
    }
}

use std::fmt;

use crate::raster::{Resolution, ResolutionInfo};
use crate::{AbstractRaster, Envelope, Error, GeoReference, RasterDataInfo, Result, SampleNum};

/// Source of the tiles of a [`crate::TiledRaster`].
pub trait TileContainer<T: SampleNum>: Send + Sync + fmt::Debug {
    /// All tiles whose envelope intersects `envelope`, tiles that only touch it included
    fn tiles(&self, envelope: &Envelope) -> Result<Vec<AbstractRaster<T>>>;
    /// The envelope covered by all tiles
    fn envelope(&self) -> Envelope;
    /// A reference describing the grid of all tiles, if known
    fn raster_reference(&self) -> Option<GeoReference>;
    fn raster_data_info(&self) -> Option<RasterDataInfo>;
    fn resolution_info(&self) -> Option<ResolutionInfo>;
}

/// Tile container keeping all tiles in memory
#[derive(Debug, Clone)]
pub struct MemoryTileContainer<T: SampleNum> {
    tiles: Vec<AbstractRaster<T>>,
    envelope: Envelope,
    georef: Option<GeoReference>,
    info: Option<RasterDataInfo>,
}

impl<T: SampleNum> MemoryTileContainer<T> {
    /// Container without tiles, the layout is used when windows are requested that hit no tiles
    pub fn new(envelope: Envelope, georef: Option<GeoReference>, info: Option<RasterDataInfo>) -> Self {
        MemoryTileContainer {
            tiles: Vec::new(),
            envelope,
            georef,
            info,
        }
    }

    pub fn with_tiles(tiles: Vec<AbstractRaster<T>>) -> Result<Self> {
        let mut iter = tiles.into_iter();
        let first = iter
            .next()
            .ok_or_else(|| Error::InvalidArgument("A tile container needs at least one tile".to_string()))?;

        let mut container = MemoryTileContainer::new(first.envelope(), first.raster_reference(), first.raster_data_info());
        container.tiles.push(first);
        for tile in iter {
            container.add_tile(tile)?;
        }

        Ok(container)
    }

    /// Adds a tile, growing the envelope and merging the grid of the tile into the container grid
    pub fn add_tile(&mut self, tile: AbstractRaster<T>) -> Result<()> {
        if let (Some(info), Some(tile_info)) = (&self.info, tile.raster_data_info())
            && info.band_count != tile_info.band_count
        {
            return Err(Error::ShapeMismatch(format!(
                "Tile with {} bands does not fit in a container of {} bands",
                tile_info.band_count, info.band_count
            )));
        }

        let georef = match (&self.georef, tile.raster_reference()) {
            (Some(own), Some(other)) => Some(GeoReference::merger(own, &other)?),
            (own, other) => own.clone().or(other),
        };

        self.georef = georef;
        self.envelope = self.envelope.union(&tile.envelope());
        log::trace!("Tile {} added, container envelope {}", self.tiles.len(), self.envelope);

        if self.info.is_none() {
            self.info = tile.raster_data_info();
        }

        self.tiles.push(tile);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.tiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }
}

impl<T: SampleNum> TileContainer<T> for MemoryTileContainer<T> {
    fn tiles(&self, envelope: &Envelope) -> Result<Vec<AbstractRaster<T>>> {
        Ok(self
            .tiles
            .iter()
            .filter(|tile| tile.envelope().intersects(envelope))
            .cloned()
            .collect())
    }

    fn envelope(&self) -> Envelope {
        self.envelope.clone()
    }

    fn raster_reference(&self) -> Option<GeoReference> {
        self.georef.clone()
    }

    fn raster_data_info(&self) -> Option<RasterDataInfo> {
        self.info
    }

    fn resolution_info(&self) -> Option<ResolutionInfo> {
        self.georef.as_ref().map(|georef| ResolutionInfo::new(Resolution::of(georef)))
    }
}

use std::sync::Arc;

use crate::raster::{AbstractRaster, ResolutionInfo, SimpleRaster};
use crate::{Envelope, Error, GeoReference, MemoryTileContainer, OriginLocation, RasterDataInfo, RasterRect, Result, SampleNum, TileContainer};

/// A raster composed of tiles provided by a [`TileContainer`].
///
/// The envelope, georeference and sample layout are those of the container. Windows are new tiled rasters
/// over windows of the contributing tiles, [`TiledRaster::as_simple_raster`] mosaics all tiles into a
/// single buffer.
#[derive(Debug, Clone)]
pub struct TiledRaster<T: SampleNum> {
    container: Arc<dyn TileContainer<T>>,
}

impl<T: SampleNum> TiledRaster<T> {
    pub fn new(container: Arc<dyn TileContainer<T>>) -> Self {
        TiledRaster { container }
    }

    pub fn container(&self) -> &Arc<dyn TileContainer<T>> {
        &self.container
    }

    pub fn envelope(&self) -> Envelope {
        self.container.envelope()
    }

    pub fn raster_reference(&self) -> Option<GeoReference> {
        self.container.raster_reference()
    }

    pub fn raster_data_info(&self) -> Option<RasterDataInfo> {
        self.container.raster_data_info()
    }

    pub fn resolution_info(&self) -> Option<ResolutionInfo> {
        self.container.resolution_info()
    }

    pub fn columns(&self) -> usize {
        self.size().0
    }

    pub fn rows(&self) -> usize {
        self.size().1
    }

    pub fn band_count(&self) -> usize {
        self.raster_data_info().map_or(0, |info| info.band_count)
    }

    /// All tiles of the container
    pub fn tiles(&self) -> Result<Vec<AbstractRaster<T>>> {
        self.container.tiles(&self.envelope())
    }

    /// The tiles that share an area with `envelope`, each paired with that area.
    ///
    /// Tiles that only touch the envelope along an edge or in a corner, or whose overlap is thinner than the
    /// grid precision, do not contribute.
    pub fn contributing_tiles(&self, envelope: &Envelope) -> Result<Vec<(AbstractRaster<T>, Envelope)>> {
        let envelope = self.native_envelope(envelope);
        let delta = self.raster_reference().map_or(0.0, |georef| georef.delta());

        let mut result = Vec::new();
        for tile in self.container.tiles(&envelope)? {
            let tile_envelope = tile.envelope();
            match tile_envelope.intersection(&envelope).and_then(|g| g.into_area()) {
                Some(area) if area.span0() > delta && area.span1() > delta => result.push((tile, area)),
                _ => log::debug!("Tile {tile_envelope} does not contribute to {envelope}"),
            }
        }

        Ok(result)
    }

    pub fn sub_raster(&self, envelope: &Envelope) -> Result<AbstractRaster<T>> {
        self.sub_raster_with(envelope, None, None)
    }

    /// A tiled raster over the windows of all tiles contributing to `envelope`.
    ///
    /// When no tile contributes a nodata filled raster is returned, which requires the container to know its
    /// grid and sample layout, [`Error::MissingShape`] is returned otherwise.
    pub fn sub_raster_with(&self, envelope: &Envelope, bands: Option<&[usize]>, target: Option<OriginLocation>) -> Result<AbstractRaster<T>> {
        if self.is_same_window(envelope, bands, target) {
            return Ok(AbstractRaster::Tiled(self.clone()));
        }

        let georef = self.raster_reference();
        let info = self
            .raster_data_info()
            .map(|info| info.with_band_count(bands.map_or(info.band_count, <[usize]>::len)));
        let relocated = georef.as_ref().map(|georef| georef.create_relocated_reference(target, envelope));

        let tiles = self.contributing_tiles(envelope)?;
        if tiles.is_empty() {
            return match (info, relocated) {
                (Some(info), Some(relocated)) => {
                    log::debug!("No tiles contribute to {envelope}, creating a nodata raster");
                    Ok(AbstractRaster::Simple(SimpleRaster::create_empty(&info, envelope, &relocated)?))
                }
                _ => Err(Error::MissingShape(envelope.to_string())),
            };
        }

        let footprint = match &relocated {
            Some(relocated) => {
                let (width, height) = relocated.size(envelope);
                relocated.pixel_footprint(&RasterRect::with_size(width, height))
            }
            None => self.native_envelope(envelope),
        };

        log::debug!("Windowing {} tiles for {envelope}", tiles.len());
        let mut container = MemoryTileContainer::new(footprint, relocated, info);
        for (tile, area) in &tiles {
            container.add_tile(tile.sub_raster_with(area, bands, target)?)?;
        }

        Ok(AbstractRaster::Tiled(TiledRaster::new(Arc::new(container))))
    }

    /// Mosaics all contributing tiles into one buffer covering the envelope of this raster.
    /// Where tiles overlap the tile that comes last in the container wins.
    pub fn as_simple_raster(&self) -> Result<SimpleRaster<T>> {
        let envelope = self.envelope();
        let (Some(georef), Some(info)) = (self.raster_reference(), self.raster_data_info()) else {
            return Err(Error::MissingShape(envelope.to_string()));
        };

        let mosaic = SimpleRaster::create_empty(&info, &envelope, &georef)?;
        let tiles = self.contributing_tiles(&envelope)?;
        log::debug!("Mosaicking {} tiles into {}x{}", tiles.len(), mosaic.columns(), mosaic.rows());

        for window in materialize(&tiles) {
            mosaic.paste(&window?)?;
        }

        Ok(mosaic)
    }

    /// Distributes the pixels of `source` within `envelope` over the contributing tiles
    pub fn set_sub_raster(&self, envelope: &Envelope, source: &AbstractRaster<T>) -> Result<()> {
        for (tile, area) in self.contributing_tiles(envelope)? {
            tile.set_sub_raster(&area, source)?;
        }

        Ok(())
    }

    pub fn set_sub_raster_at(&self, x: i64, y: i64, source: &AbstractRaster<T>) -> Result<()> {
        self.for_each_tile_at(x, y, source, |tile, tile_x, tile_y| tile.set_sub_raster_at(tile_x, tile_y, source))
    }

    pub fn set_sub_raster_band(&self, x: i64, y: i64, band: usize, source: &AbstractRaster<T>) -> Result<()> {
        self.for_each_tile_at(x, y, source, |tile, tile_x, tile_y| tile.set_sub_raster_band(tile_x, tile_y, band, source))
    }

    /// Deep copy of all tiles into a new in memory container
    pub fn copy(&self) -> Result<TiledRaster<T>> {
        let mut container = MemoryTileContainer::new(self.envelope(), self.raster_reference(), self.raster_data_info());
        for tile in self.tiles()? {
            container.add_tile(tile.copy()?)?;
        }

        Ok(TiledRaster::new(Arc::new(container)))
    }

    pub fn dispose(&self) {
        match self.tiles() {
            Ok(tiles) => tiles.iter().for_each(AbstractRaster::dispose),
            Err(e) => log::warn!("Failed to obtain the tiles to dispose: {e}"),
        }
    }

    /// Calls `f` for every tile overlapping the placement of `source` at pixel `x`, `y` of this raster,
    /// with the placement expressed in pixels of the tile.
    fn for_each_tile_at(
        &self,
        x: i64,
        y: i64,
        source: &AbstractRaster<T>,
        f: impl Fn(&AbstractRaster<T>, i64, i64) -> Result<()>,
    ) -> Result<()> {
        let georef = self
            .raster_reference()
            .ok_or_else(|| Error::MissingShape(self.envelope().to_string()))?;
        let placement = georef.pixel_footprint(&RasterRect::new(x, y, source.columns(), source.rows()));

        for (tile, _) in self.contributing_tiles(&placement)? {
            let Some(tile_georef) = tile.raster_reference() else {
                continue;
            };

            let rect = tile_georef.convert_envelope_to_raster_crs(&placement);
            f(&tile, rect.x, rect.y)?;
        }

        Ok(())
    }

    fn size(&self) -> (usize, usize) {
        self.raster_reference().map_or((0, 0), |georef| georef.size(&self.envelope()))
    }

    fn native_envelope(&self, envelope: &Envelope) -> Envelope {
        match self.raster_reference() {
            Some(georef) => georef.to_own_crs(envelope),
            None => envelope.clone(),
        }
    }

    fn is_same_window(&self, envelope: &Envelope, bands: Option<&[usize]>, target: Option<OriginLocation>) -> bool {
        let own = self.envelope();
        let georef = self.raster_reference();
        let delta = georef.as_ref().map_or(0.0, GeoReference::delta);

        let same_bands = bands.is_none_or(|bands| bands.iter().copied().eq(0..self.band_count()));
        let same_location = target.is_none_or(|target| georef.as_ref().is_some_and(|g| g.origin_location() == target));
        let same_crs = envelope.crs().is_none() || envelope.crs() == own.crs();

        same_bands
            && same_location
            && same_crs
            && (envelope.min().x() - own.min().x()).abs() <= delta
            && (envelope.min().y() - own.min().y()).abs() <= delta
            && (envelope.max().x() - own.max().x()).abs() <= delta
            && (envelope.max().y() - own.max().y()).abs() <= delta
    }
}

/// Windows the tiles and copies them into single buffers, in tile order
#[cfg(not(feature = "rayon"))]
fn materialize<T: SampleNum>(tiles: &[(AbstractRaster<T>, Envelope)]) -> Vec<Result<SimpleRaster<T>>> {
    tiles
        .iter()
        .map(|(tile, area)| tile.sub_raster(area)?.as_simple_raster())
        .collect()
}

#[cfg(feature = "rayon")]
fn materialize<T: SampleNum>(tiles: &[(AbstractRaster<T>, Envelope)]) -> Vec<Result<SimpleRaster<T>>> {
    use rayon::prelude::*;

    tiles
        .par_iter()
        .map(|(tile, area)| tile.sub_raster(area)?.as_simple_raster())
        .collect()
}

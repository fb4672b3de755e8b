use crate::raster::{AbstractRaster, Resolution, ResolutionInfo};
use crate::{Envelope, Error, GeoReference, OriginLocation, RasterData, RasterDataInfo, RasterRect, Result, SampleNum};

/// A raster backed by a single sample buffer.
///
/// The envelope is always the outer footprint of all pixels. Windows taken from a simple raster are
/// views: they share the samples of this raster, so writing to a window writes to this raster.
#[derive(Debug, Clone)]
pub struct SimpleRaster<T: SampleNum> {
    data: RasterData<T>,
    georef: GeoReference,
    envelope: Envelope,
}

impl<T: SampleNum> SimpleRaster<T> {
    pub fn new(data: RasterData<T>, georef: GeoReference) -> Self {
        let envelope = georef.pixel_footprint(&RasterRect::with_size(data.width(), data.height()));
        SimpleRaster { data, georef, envelope }
    }

    /// Nodata filled raster covering `envelope` on the grid of `georef`
    pub fn create_empty(info: &RasterDataInfo, envelope: &Envelope, georef: &GeoReference) -> Result<Self> {
        if info.data_type != T::TYPE {
            return Err(Error::InvalidArgument(format!(
                "Cannot create a {} raster for {} samples",
                T::TYPE,
                info.data_type
            )));
        }

        let relocated = georef.create_relocated_reference(None, envelope);
        let (width, height) = relocated.size(envelope);
        log::debug!("Creating empty {width}x{height}x{} raster for {envelope}", info.band_count);

        Ok(SimpleRaster::new(RasterData::new(width, height, info.band_count), relocated))
    }

    pub fn data(&self) -> &RasterData<T> {
        &self.data
    }

    pub fn envelope(&self) -> &Envelope {
        &self.envelope
    }

    pub fn raster_reference(&self) -> &GeoReference {
        &self.georef
    }

    pub fn raster_data_info(&self) -> RasterDataInfo {
        self.data.data_info()
    }

    pub fn resolution_info(&self) -> ResolutionInfo {
        ResolutionInfo::new(Resolution::of(&self.georef))
    }

    pub fn columns(&self) -> usize {
        self.data.width()
    }

    pub fn rows(&self) -> usize {
        self.data.height()
    }

    pub fn band_count(&self) -> usize {
        self.data.band_count()
    }

    pub fn sub_raster(&self, envelope: &Envelope) -> Result<SimpleRaster<T>> {
        self.sub_raster_with(envelope, None, None)
    }

    /// A view on the pixels covering `envelope`, fails with [`Error::Bounds`] if the envelope is not
    /// contained in this raster.
    pub fn sub_raster_with(&self, envelope: &Envelope, bands: Option<&[usize]>, target: Option<OriginLocation>) -> Result<SimpleRaster<T>> {
        if self.is_same_window(envelope, bands, target) {
            return Ok(self.clone());
        }

        let same_crs = envelope.crs().is_none() || envelope.crs() == self.envelope.crs();
        let rect = self.georef.convert_envelope_to_raster_crs(envelope);
        let full = RasterRect::with_size(self.columns(), self.rows());
        if (same_crs && !self.envelope.contains_with_tolerance(envelope, self.georef.delta())) || !rect.is_within(&full) {
            return Err(Error::Bounds {
                requested: envelope.to_string(),
                available: self.envelope.to_string(),
            });
        }

        let data = self.data.subset(&rect, bands)?;
        let georef = self.georef.create_relocated_reference(target, envelope);
        Ok(SimpleRaster::new(data, georef))
    }

    /// Copies the pixels of `source` that lie in `envelope` into this raster.
    /// The source is expected on the same grid, its pixels are placed by their footprint.
    pub fn set_sub_raster(&self, envelope: &Envelope, source: &AbstractRaster<T>) -> Result<()> {
        let area = envelope
            .intersection(&self.envelope)
            .and_then(|g| g.into_area())
            .and_then(|area| area.intersection(&source.envelope()))
            .and_then(|g| g.into_area());

        let Some(area) = area else {
            log::debug!("Nothing to copy: {envelope} does not overlap both rasters");
            return Ok(());
        };

        let window = source.sub_raster(&area)?.as_simple_raster()?;
        self.paste(&window)
    }

    /// Copies `source` into this raster at the location of its footprint
    pub(crate) fn paste(&self, source: &SimpleRaster<T>) -> Result<()> {
        let rect = self.georef.convert_envelope_to_raster_crs(source.envelope());
        self.data.set_subset(rect.x, rect.y, source.columns(), source.rows(), source.data())
    }

    pub fn set_sub_raster_at(&self, x: i64, y: i64, source: &AbstractRaster<T>) -> Result<()> {
        let source = source.as_simple_raster()?;
        self.data.set_subset(x, y, source.columns(), source.rows(), source.data())
    }

    pub fn set_sub_raster_band(&self, x: i64, y: i64, band: usize, source: &AbstractRaster<T>) -> Result<()> {
        let source = source.as_simple_raster()?;
        self.data
            .set_subset_band(x, y, source.columns(), source.rows(), band, source.data(), 0)
    }

    /// Deep copy with its own samples
    pub fn copy(&self) -> Result<SimpleRaster<T>> {
        Ok(SimpleRaster {
            data: self.data.deep_copy()?,
            georef: self.georef.clone(),
            envelope: self.envelope.clone(),
        })
    }

    pub fn dispose(&self) {
        self.data.dispose();
    }

    fn is_same_window(&self, envelope: &Envelope, bands: Option<&[usize]>, target: Option<OriginLocation>) -> bool {
        let same_bands = bands.is_none_or(|bands| bands.iter().copied().eq(0..self.band_count()));
        let same_location = target.is_none_or(|target| target == self.georef.origin_location());
        let same_crs = envelope.crs().is_none() || envelope.crs() == self.envelope.crs();
        let delta = self.georef.delta();

        same_bands
            && same_location
            && same_crs
            && (envelope.min().x() - self.envelope.min().x()).abs() <= delta
            && (envelope.min().y() - self.envelope.min().y()).abs() <= delta
            && (envelope.max().x() - self.envelope.max().x()).abs() <= delta
            && (envelope.max().y() - self.envelope.max().y()).abs() <= delta
    }
}

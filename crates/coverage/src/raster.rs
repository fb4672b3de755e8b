//! The raster containers and their shared windowing contract.

mod multirangedraster;
mod simpleraster;
mod tiledraster;

use crate::resample::{GridInterpolator, InterpolationType, Interpolator, RasterTransformer, WarpTransformer};
use crate::{Envelope, Error, GeoReference, OriginLocation, RasterDataInfo, Result, SampleNum};

#[doc(inline)]
pub use multirangedraster::MultiRangedRaster;
#[doc(inline)]
pub use simpleraster::SimpleRaster;
#[doc(inline)]
pub use tiledraster::TiledRaster;

/// Signed size of a pixel in world units along both raster axes
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Resolution {
    pub x: f64,
    pub y: f64,
}

impl Resolution {
    pub const fn new(x: f64, y: f64) -> Self {
        Resolution { x, y }
    }

    pub fn of(georef: &GeoReference) -> Self {
        Resolution::new(georef.resolution_x(), georef.resolution_y())
    }

    /// Compares the pixel sizes, ignoring the axis directions
    pub fn matches(&self, other: &Resolution, tolerance: f64) -> bool {
        (self.x.abs() - other.x.abs()).abs() <= tolerance && (self.y.abs() - other.y.abs()).abs() <= tolerance
    }
}

/// The native resolution of a raster and the other resolutions it can be served at
#[derive(Debug, Clone, PartialEq)]
pub struct ResolutionInfo {
    native: Resolution,
    additional: Vec<Resolution>,
}

impl ResolutionInfo {
    pub fn new(native: Resolution) -> Self {
        ResolutionInfo {
            native,
            additional: Vec::new(),
        }
    }

    pub fn with_resolution(mut self, resolution: Resolution) -> Self {
        self.additional.push(resolution);
        self
    }

    pub fn native(&self) -> Resolution {
        self.native
    }

    /// Native resolution first
    pub fn resolutions(&self) -> impl Iterator<Item = &Resolution> {
        std::iter::once(&self.native).chain(self.additional.iter())
    }
}

/// A raster: a single in memory raster, a composite of tiles or a stack of band groups.
///
/// Cloning is cheap and aliases the samples, use [`AbstractRaster::copy`] for an independent copy.
#[derive(Debug, Clone)]
pub enum AbstractRaster<T: SampleNum> {
    Simple(SimpleRaster<T>),
    Tiled(TiledRaster<T>),
    MultiRanged(MultiRangedRaster<T>),
}

impl<T: SampleNum> From<SimpleRaster<T>> for AbstractRaster<T> {
    fn from(raster: SimpleRaster<T>) -> Self {
        AbstractRaster::Simple(raster)
    }
}

impl<T: SampleNum> From<TiledRaster<T>> for AbstractRaster<T> {
    fn from(raster: TiledRaster<T>) -> Self {
        AbstractRaster::Tiled(raster)
    }
}

impl<T: SampleNum> From<MultiRangedRaster<T>> for AbstractRaster<T> {
    fn from(raster: MultiRangedRaster<T>) -> Self {
        AbstractRaster::MultiRanged(raster)
    }
}

impl<T: SampleNum> AbstractRaster<T> {
    pub fn envelope(&self) -> Envelope {
        match self {
            AbstractRaster::Simple(raster) => raster.envelope().clone(),
            AbstractRaster::Tiled(raster) => raster.envelope(),
            AbstractRaster::MultiRanged(raster) => raster.envelope(),
        }
    }

    /// `None` for composites that do not know their grid (e.g. an empty tile container)
    pub fn raster_reference(&self) -> Option<GeoReference> {
        match self {
            AbstractRaster::Simple(raster) => Some(raster.raster_reference().clone()),
            AbstractRaster::Tiled(raster) => raster.raster_reference(),
            AbstractRaster::MultiRanged(raster) => raster.raster_reference(),
        }
    }

    pub fn raster_data_info(&self) -> Option<RasterDataInfo> {
        match self {
            AbstractRaster::Simple(raster) => Some(raster.raster_data_info()),
            AbstractRaster::Tiled(raster) => raster.raster_data_info(),
            AbstractRaster::MultiRanged(raster) => raster.raster_data_info(),
        }
    }

    pub fn resolution_info(&self) -> Option<ResolutionInfo> {
        match self {
            AbstractRaster::Simple(raster) => Some(raster.resolution_info()),
            AbstractRaster::Tiled(raster) => raster.resolution_info(),
            AbstractRaster::MultiRanged(raster) => raster.resolution_info(),
        }
    }

    pub fn columns(&self) -> usize {
        match self {
            AbstractRaster::Simple(raster) => raster.columns(),
            AbstractRaster::Tiled(raster) => raster.columns(),
            AbstractRaster::MultiRanged(raster) => raster.columns(),
        }
    }

    pub fn rows(&self) -> usize {
        match self {
            AbstractRaster::Simple(raster) => raster.rows(),
            AbstractRaster::Tiled(raster) => raster.rows(),
            AbstractRaster::MultiRanged(raster) => raster.rows(),
        }
    }

    pub fn band_count(&self) -> usize {
        match self {
            AbstractRaster::Simple(raster) => raster.band_count(),
            AbstractRaster::Tiled(raster) => raster.band_count(),
            AbstractRaster::MultiRanged(raster) => raster.band_count(),
        }
    }

    /// The part of the raster covering `envelope`
    pub fn sub_raster(&self, envelope: &Envelope) -> Result<AbstractRaster<T>> {
        self.sub_raster_with(envelope, None, None)
    }

    pub fn sub_raster_with_bands(&self, envelope: &Envelope, bands: Option<&[usize]>) -> Result<AbstractRaster<T>> {
        self.sub_raster_with(envelope, bands, None)
    }

    /// The part of the raster covering `envelope`, limited to `bands` and with its georeference expressed
    /// in the `target` origin convention.
    ///
    /// Single rasters fail with [`Error::Bounds`] if the envelope is not contained in the raster. Requesting
    /// the raster's own envelope and bands returns the raster itself.
    pub fn sub_raster_with(&self, envelope: &Envelope, bands: Option<&[usize]>, target: Option<OriginLocation>) -> Result<AbstractRaster<T>> {
        match self {
            AbstractRaster::Simple(raster) => Ok(AbstractRaster::Simple(raster.sub_raster_with(envelope, bands, target)?)),
            AbstractRaster::Tiled(raster) => raster.sub_raster_with(envelope, bands, target),
            AbstractRaster::MultiRanged(raster) => Ok(AbstractRaster::MultiRanged(raster.sub_raster_with(envelope, bands, target)?)),
        }
    }

    /// Copies the pixels of `source` that fall within `envelope` into this raster
    pub fn set_sub_raster(&self, envelope: &Envelope, source: &AbstractRaster<T>) -> Result<()> {
        match self {
            AbstractRaster::Simple(raster) => raster.set_sub_raster(envelope, source),
            AbstractRaster::Tiled(raster) => raster.set_sub_raster(envelope, source),
            AbstractRaster::MultiRanged(raster) => raster.set_sub_raster(envelope, source),
        }
    }

    /// Copies all pixels of `source` into this raster with its upper left pixel at `x`, `y`
    pub fn set_sub_raster_at(&self, x: i64, y: i64, source: &AbstractRaster<T>) -> Result<()> {
        match self {
            AbstractRaster::Simple(raster) => raster.set_sub_raster_at(x, y, source),
            AbstractRaster::Tiled(raster) => raster.set_sub_raster_at(x, y, source),
            AbstractRaster::MultiRanged(raster) => raster.set_sub_raster_at(x, y, source),
        }
    }

    /// Copies the first band of `source` into band `band` of this raster at `x`, `y`
    pub fn set_sub_raster_band(&self, x: i64, y: i64, band: usize, source: &AbstractRaster<T>) -> Result<()> {
        match self {
            AbstractRaster::Simple(raster) => raster.set_sub_raster_band(x, y, band, source),
            AbstractRaster::Tiled(raster) => raster.set_sub_raster_band(x, y, band, source),
            AbstractRaster::MultiRanged(raster) => raster.set_sub_raster_band(x, y, band, source),
        }
    }

    /// Materializes the raster into one buffer, a simple raster is returned as is
    pub fn as_simple_raster(&self) -> Result<SimpleRaster<T>> {
        match self {
            AbstractRaster::Simple(raster) => Ok(raster.clone()),
            AbstractRaster::Tiled(raster) => raster.as_simple_raster(),
            AbstractRaster::MultiRanged(raster) => raster.as_simple_raster(),
        }
    }

    /// The raster covering `extent` at the requested resolution, see [`AbstractRaster::as_raster_with`]
    pub fn as_raster(&self, extent: &Envelope, resolution: &Resolution, interpolation: InterpolationType) -> Result<Option<AbstractRaster<T>>> {
        self.as_raster_with(extent, resolution, interpolation, &GridInterpolator::new(interpolation), &WarpTransformer)
    }

    /// The raster covering `extent` at the requested resolution.
    ///
    /// * same coordinate system and native resolution: plain windowing
    /// * same coordinate system, other resolution: the window is resampled by `interpolator`
    /// * other coordinate system: the extent is transformed to the raster's system, the covered window
    ///   is handed to `transformer`
    ///
    /// A reprojection failure is not an error: it is logged and `Ok(None)` is returned.
    pub fn as_raster_with(
        &self,
        extent: &Envelope,
        resolution: &Resolution,
        interpolation: InterpolationType,
        interpolator: &dyn Interpolator<T>,
        transformer: &dyn RasterTransformer<T>,
    ) -> Result<Option<AbstractRaster<T>>> {
        let georef = self
            .raster_reference()
            .ok_or_else(|| Error::MissingShape(format!("raster without georeference queried for {extent}")))?;

        let same_crs = match (extent.crs(), georef.crs()) {
            (Some(requested), Some(native)) => requested == native,
            _ => true,
        };

        if same_crs {
            let window = self.sub_raster(extent)?;
            if resolution.matches(&Resolution::of(&georef), georef.delta()) {
                log::debug!("Native resolution requested for {extent}, windowing only");
                return Ok(Some(window));
            }

            // the grid at the requested resolution starts at the upper left corner of the window, source
            // pixels beyond the window are used when the last row or column sticks out of it
            let (target, width, height) = resampled_grid(&window.envelope(), resolution);
            let source = match self.envelope().intersection(&target).and_then(|g| g.into_area()) {
                Some(area) if area != window.envelope() => self.sub_raster(&area)?,
                _ => window,
            };

            log::debug!("Resampling {extent} to {width}x{height} in {target} ({interpolation:?})");
            return Ok(Some(interpolator.interpolate(&source, &target, width, height)?));
        }

        let Some(coordinate_transformer) = georef.transformer() else {
            log::warn!("No coordinate transformer available to serve {extent} from a raster in another system");
            return Ok(None);
        };

        let Some(native_crs) = georef.crs() else {
            return Ok(None);
        };

        let native_extent = match coordinate_transformer.transform_envelope(extent, native_crs) {
            Ok(env) => env,
            Err(e) => {
                log::warn!("Failed to transform {extent} to {native_crs}: {e}");
                return Ok(None);
            }
        };

        let Some(area) = self.envelope().intersection(&native_extent).and_then(|g| g.into_area()) else {
            log::debug!("{extent} does not overlap the raster");
            return Ok(None);
        };

        let window = self.sub_raster(&area)?;
        let (width, height) = target_size(extent, resolution);
        match transformer.transform(&window, extent, width, height, interpolation) {
            Ok(raster) => Ok(Some(raster)),
            Err(Error::Transform(e)) => {
                log::warn!("Failed to reproject raster to {extent}: {e}");
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    /// An independent deep copy
    pub fn copy(&self) -> Result<AbstractRaster<T>> {
        Ok(match self {
            AbstractRaster::Simple(raster) => AbstractRaster::Simple(raster.copy()?),
            AbstractRaster::Tiled(raster) => AbstractRaster::Tiled(raster.copy()?),
            AbstractRaster::MultiRanged(raster) => AbstractRaster::MultiRanged(raster.copy()?),
        })
    }

    /// Releases the samples, safe to call more than once
    pub fn dispose(&self) {
        match self {
            AbstractRaster::Simple(raster) => raster.dispose(),
            AbstractRaster::Tiled(raster) => raster.dispose(),
            AbstractRaster::MultiRanged(raster) => raster.dispose(),
        }
    }
}

/// Pixel size of `extent` at `resolution`, at least one pixel
fn target_size(extent: &Envelope, resolution: &Resolution) -> (usize, usize) {
    (pixel_count(extent.span0(), resolution.x), pixel_count(extent.span1(), resolution.y))
}

/// Grid at `resolution` anchored at the upper left corner of `envelope` that covers it completely
fn resampled_grid(envelope: &Envelope, resolution: &Resolution) -> (Envelope, usize, usize) {
    let (width, height) = target_size(envelope, resolution);
    let (min_x, max_y) = (envelope.min().x(), envelope.max().y());
    let max_x = min_x + width as f64 * resolution.x.abs();
    let min_y = max_y - height as f64 * resolution.y.abs();

    let grid = Envelope::from_bounds(min_x, min_y, max_x, max_y).with_crs(envelope.crs().cloned());
    (grid, width, height)
}

fn pixel_count(span: f64, resolution: f64) -> usize {
    // a span that is a multiple of the resolution up to float noise gets no extra pixel
    (span / resolution.abs() - 1e-6).ceil().max(1.0) as usize
}

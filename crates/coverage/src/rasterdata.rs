//! Sample storage shared between a raster and the views created from it.

use std::sync::{Arc, PoisonError, RwLock};

use crate::{DataType, Error, Nodata, RasterRect, Result, SampleNum};

/// Layout of the samples of a raster
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RasterDataInfo {
    pub band_count: usize,
    pub data_type: DataType,
    pub nodata: Option<f64>,
}

impl RasterDataInfo {
    pub fn new(band_count: usize, data_type: DataType, nodata: Option<f64>) -> Self {
        RasterDataInfo {
            band_count,
            data_type,
            nodata,
        }
    }

    /// Layout for samples of type `T` using its native nodata value
    pub fn for_type<T: SampleNum>(band_count: usize) -> Self {
        RasterDataInfo::new(band_count, T::TYPE, <T as Nodata>::NODATA.to_f64())
    }

    pub fn with_band_count(&self, band_count: usize) -> Self {
        RasterDataInfo { band_count, ..*self }
    }
}

/// Band sequential sample buffer, `None` once disposed
#[derive(Debug)]
struct SampleStorage<T> {
    width: usize,
    height: usize,
    samples: RwLock<Option<Vec<T>>>,
}

impl<T> SampleStorage<T> {
    fn index(&self, band: usize, x: usize, y: usize) -> usize {
        (band * self.height + y) * self.width + x
    }
}

/// A window on shared sample storage.
///
/// Cloning, [`RasterData::subset`] and [`RasterData::as_read_only`] create views that alias the same
/// samples: a write through one view is visible through every other view on the same storage.
/// Individual accesses are serialized by a lock, but the ordering of concurrent writes through
/// overlapping views is up to the caller.
#[derive(Debug, Clone)]
pub struct RasterData<T: SampleNum> {
    storage: Arc<SampleStorage<T>>,
    x_offset: usize,
    y_offset: usize,
    width: usize,
    height: usize,
    /// storage band for every band of this view
    bands: Arc<[usize]>,
    read_only: bool,
}

impl<T: SampleNum> RasterData<T> {
    /// Nodata filled storage
    pub fn new(width: usize, height: usize, band_count: usize) -> Self {
        Self::filled_with(width, height, band_count, <T as Nodata>::NODATA)
    }

    pub fn filled_with(width: usize, height: usize, band_count: usize, value: T) -> Self {
        Self::with_storage(width, height, band_count, vec![value; width * height * band_count])
    }

    /// Wraps band sequential samples: all rows of band 0, followed by all rows of band 1, ...
    pub fn from_samples(width: usize, height: usize, band_count: usize, samples: Vec<T>) -> Result<Self> {
        if samples.len() != width * height * band_count {
            return Err(Error::InvalidArgument(format!(
                "Expected {} samples for {width}x{height}x{band_count}, got {}",
                width * height * band_count,
                samples.len()
            )));
        }

        Ok(Self::with_storage(width, height, band_count, samples))
    }

    fn with_storage(width: usize, height: usize, band_count: usize, samples: Vec<T>) -> Self {
        RasterData {
            storage: Arc::new(SampleStorage {
                width,
                height,
                samples: RwLock::new(Some(samples)),
            }),
            x_offset: 0,
            y_offset: 0,
            width,
            height,
            bands: (0..band_count).collect(),
            read_only: false,
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn band_count(&self) -> usize {
        self.bands.len()
    }

    pub fn data_type(&self) -> DataType {
        T::TYPE
    }

    pub fn data_info(&self) -> RasterDataInfo {
        RasterDataInfo::for_type::<T>(self.band_count())
    }

    pub fn is_read_only(&self) -> bool {
        self.read_only
    }

    /// True if both views alias the same samples
    pub fn shares_storage_with(&self, other: &RasterData<T>) -> bool {
        Arc::ptr_eq(&self.storage, &other.storage)
    }

    pub fn sample(&self, x: usize, y: usize, band: usize) -> Result<T> {
        let index = self.storage_index(x, y, band)?;
        self.read(|samples| samples[index])
    }

    pub fn set_sample(&self, x: usize, y: usize, band: usize, value: T) -> Result<()> {
        let index = self.storage_index(x, y, band)?;
        self.write(|samples| samples[index] = value)
    }

    /// The values of all bands at the pixel location
    pub fn pixel(&self, x: usize, y: usize) -> Result<Vec<T>> {
        self.storage_index(x, y, 0)?;
        self.read(|samples| {
            self.bands
                .iter()
                .map(|&band| samples[self.storage.index(band, self.x_offset + x, self.y_offset + y)])
                .collect()
        })
    }

    /// Row major samples of one band of this view
    pub fn band_samples(&self, band: usize) -> Result<Vec<T>> {
        let storage_band = self.storage_band(band)?;
        self.read(|samples| {
            let mut result = Vec::with_capacity(self.width * self.height);
            for y in 0..self.height {
                let start = self.storage.index(storage_band, self.x_offset, self.y_offset + y);
                result.extend_from_slice(&samples[start..start + self.width]);
            }
            result
        })
    }

    /// Band sequential samples of this view
    pub fn to_vec(&self) -> Result<Vec<T>> {
        let mut result = Vec::with_capacity(self.width * self.height * self.band_count());
        for band in 0..self.band_count() {
            result.extend(self.band_samples(band)?);
        }

        Ok(result)
    }

    /// A view on a part of this view, `bands` selects (and reorders) bands of this view.
    /// The view aliases the samples of this one.
    pub fn subset(&self, rect: &RasterRect, bands: Option<&[usize]>) -> Result<RasterData<T>> {
        let (Ok(x), Ok(y)) = (usize::try_from(rect.x), usize::try_from(rect.y)) else {
            return Err(Error::InvalidArgument(format!("Subset {rect} starts before the raster data")));
        };

        let exceeds = |start: usize, extent: usize, size: usize| start.checked_add(extent).is_none_or(|end| end > size);
        if exceeds(x, rect.width, self.width) || exceeds(y, rect.height, self.height) {
            return Err(Error::InvalidArgument(format!(
                "Subset {rect} exceeds the raster data size {}x{}",
                self.width, self.height
            )));
        }

        Ok(RasterData {
            storage: self.storage.clone(),
            x_offset: self.x_offset + x,
            y_offset: self.y_offset + y,
            width: rect.width,
            height: rect.height,
            bands: self.select_bands(bands)?,
            read_only: self.read_only,
        })
    }

    /// Copies the upper left `width` x `height` samples of `source` to `x`, `y` in this view.
    /// Parts falling outside of either raster are skipped.
    pub fn set_subset(&self, x: i64, y: i64, width: usize, height: usize, source: &RasterData<T>) -> Result<()> {
        self.set_subset_with_offset(x, y, width, height, source, 0, 0)
    }

    /// Copies the `width` x `height` samples at `src_x`, `src_y` of `source` to `x`, `y` in this view
    #[allow(clippy::too_many_arguments)]
    pub fn set_subset_with_offset(
        &self,
        x: i64,
        y: i64,
        width: usize,
        height: usize,
        source: &RasterData<T>,
        src_x: i64,
        src_y: i64,
    ) -> Result<()> {
        if source.band_count() != self.band_count() {
            return Err(Error::ShapeMismatch(format!(
                "Cannot copy {} bands into raster data with {} bands",
                source.band_count(),
                self.band_count()
            )));
        }

        let band_pairs: Vec<(usize, usize)> = (0..self.band_count()).map(|band| (band, band)).collect();
        self.copy_region(RasterRect::new(x, y, width, height), source, src_x, src_y, &band_pairs)
    }

    /// Copies one band of `source` into one band of this view
    #[allow(clippy::too_many_arguments)]
    pub fn set_subset_band(
        &self,
        x: i64,
        y: i64,
        width: usize,
        height: usize,
        dst_band: usize,
        source: &RasterData<T>,
        src_band: usize,
    ) -> Result<()> {
        self.storage_band(dst_band)?;
        source.storage_band(src_band)?;
        self.copy_region(RasterRect::new(x, y, width, height), source, 0, 0, &[(dst_band, src_band)])
    }

    /// New, nodata filled, writable storage with the size of `rect` and the selected band count
    pub fn create_compatible_writable(&self, rect: &RasterRect, bands: Option<&[usize]>) -> Result<RasterData<T>> {
        let band_count = self.select_bands(bands)?.len();
        Ok(RasterData::new(rect.width, rect.height, band_count))
    }

    /// A view on the same samples that rejects writes
    pub fn as_read_only(&self) -> RasterData<T> {
        RasterData {
            read_only: true,
            ..self.clone()
        }
    }

    /// Copies the samples of this view into new storage
    pub fn deep_copy(&self) -> Result<RasterData<T>> {
        RasterData::from_samples(self.width, self.height, self.band_count(), self.to_vec()?)
    }

    /// Releases the samples of the shared storage, every view on it reports [`Error::Disposed`] afterwards.
    /// Disposing more than once, or from several threads, is harmless.
    pub fn dispose(&self) {
        let mut samples = self.storage.samples.write().unwrap_or_else(PoisonError::into_inner);
        if samples.take().is_some() {
            log::debug!("Released {}x{} raster samples", self.storage.width, self.storage.height);
        }
    }

    pub fn is_disposed(&self) -> bool {
        self.storage.samples.read().unwrap_or_else(PoisonError::into_inner).is_none()
    }

    fn select_bands(&self, bands: Option<&[usize]>) -> Result<Arc<[usize]>> {
        match bands {
            None => Ok(self.bands.clone()),
            Some(bands) => bands.iter().map(|&band| self.storage_band(band)).collect(),
        }
    }

    fn storage_band(&self, band: usize) -> Result<usize> {
        self.bands.get(band).copied().ok_or_else(|| {
            Error::InvalidArgument(format!("Band {band} out of range, raster data has {} bands", self.band_count()))
        })
    }

    fn storage_index(&self, x: usize, y: usize, band: usize) -> Result<usize> {
        if x >= self.width || y >= self.height {
            return Err(Error::InvalidArgument(format!(
                "Pixel ({x}, {y}) outside of raster data size {}x{}",
                self.width, self.height
            )));
        }

        Ok(self.storage.index(self.storage_band(band)?, self.x_offset + x, self.y_offset + y))
    }

    fn read<R>(&self, f: impl FnOnce(&[T]) -> R) -> Result<R> {
        let guard = self.storage.samples.read().unwrap_or_else(PoisonError::into_inner);
        let samples = guard.as_deref().ok_or(Error::Disposed)?;
        Ok(f(samples))
    }

    fn write<R>(&self, f: impl FnOnce(&mut [T]) -> R) -> Result<R> {
        if self.read_only {
            return Err(Error::ReadOnly);
        }

        let mut guard = self.storage.samples.write().unwrap_or_else(PoisonError::into_inner);
        let samples = guard.as_deref_mut().ok_or(Error::Disposed)?;
        Ok(f(samples))
    }

    fn copy_region(&self, dst: RasterRect, source: &RasterData<T>, src_x: i64, src_y: i64, band_pairs: &[(usize, usize)]) -> Result<()> {
        if self.read_only {
            return Err(Error::ReadOnly);
        }

        // offsets within the requested region that are valid in both rasters
        let extent = |size: usize| i64::try_from(size).unwrap_or(i64::MAX);
        let col_start = 0i64.max(dst.x.saturating_neg()).max(src_x.saturating_neg());
        let col_end = extent(dst.width)
            .min(extent(self.width).saturating_sub(dst.x))
            .min(extent(source.width).saturating_sub(src_x));
        let row_start = 0i64.max(dst.y.saturating_neg()).max(src_y.saturating_neg());
        let row_end = extent(dst.height)
            .min(extent(self.height).saturating_sub(dst.y))
            .min(extent(source.height).saturating_sub(src_y));

        if col_start >= col_end || row_start >= row_end {
            return Ok(());
        }

        let cols = (col_end - col_start) as usize;
        let rows = (row_end - row_start) as usize;

        // read first and release the lock: source and destination may share the storage
        let values = source.read(|samples| {
            let mut values = Vec::with_capacity(cols * rows * band_pairs.len());
            for &(_, src_band) in band_pairs {
                let band = source.bands[src_band];
                for row in row_start..row_end {
                    let sy = source.y_offset + (src_y + row) as usize;
                    let sx = source.x_offset + (src_x + col_start) as usize;
                    let start = source.storage.index(band, sx, sy);
                    values.extend_from_slice(&samples[start..start + cols]);
                }
            }
            values
        })?;

        self.write(|samples| {
            let mut chunks = values.chunks_exact(cols);
            for &(dst_band, _) in band_pairs {
                let band = self.bands[dst_band];
                for row in row_start..row_end {
                    let dy = self.y_offset + (dst.y + row) as usize;
                    let dx = self.x_offset + (dst.x + col_start) as usize;
                    let start = self.storage.index(band, dx, dy);
                    if let Some(chunk) = chunks.next() {
                        samples[start..start + cols].copy_from_slice(chunk);
                    }
                }
            }
        })
    }
}

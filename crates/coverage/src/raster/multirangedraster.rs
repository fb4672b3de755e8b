use crate::raster::{AbstractRaster, ResolutionInfo, SimpleRaster};
use crate::{Envelope, Error, GeoReference, OriginLocation, RasterData, RasterDataInfo, Result, SampleNum};

/// A stack of rasters covering the same area, each contributing its own bands.
///
/// Bands are numbered across the ranges: the bands of the first range come first.
#[derive(Debug, Clone)]
pub struct MultiRangedRaster<T: SampleNum> {
    ranges: Vec<AbstractRaster<T>>,
}

impl<T: SampleNum> MultiRangedRaster<T> {
    pub fn new(ranges: Vec<AbstractRaster<T>>) -> Result<Self> {
        if ranges.is_empty() {
            return Err(Error::InvalidArgument("A multi ranged raster needs at least one range".to_string()));
        }

        Ok(MultiRangedRaster { ranges })
    }

    pub fn add_range(&mut self, range: AbstractRaster<T>) {
        self.ranges.push(range);
    }

    pub fn ranges(&self) -> &[AbstractRaster<T>] {
        &self.ranges
    }

    pub fn range(&self, index: usize) -> Option<&AbstractRaster<T>> {
        self.ranges.get(index)
    }

    pub fn envelope(&self) -> Envelope {
        self.first().envelope()
    }

    /// The merged reference of all ranges
    pub fn raster_reference(&self) -> Option<GeoReference> {
        let mut references = self.ranges.iter().filter_map(AbstractRaster::raster_reference);
        let first = references.next()?;

        match references.try_fold(first, |merged, georef| GeoReference::merger(&merged, &georef)) {
            Ok(merged) => Some(merged),
            Err(e) => {
                log::warn!("Failed to merge the range references: {e}");
                None
            }
        }
    }

    /// Layout of the first range with the band count of all ranges
    pub fn raster_data_info(&self) -> Option<RasterDataInfo> {
        self.first()
            .raster_data_info()
            .map(|info| info.with_band_count(self.band_count()))
    }

    pub fn resolution_info(&self) -> Option<ResolutionInfo> {
        self.first().resolution_info()
    }

    pub fn columns(&self) -> usize {
        self.first().columns()
    }

    pub fn rows(&self) -> usize {
        self.first().rows()
    }

    pub fn band_count(&self) -> usize {
        self.ranges.iter().map(AbstractRaster::band_count).sum()
    }

    pub fn sub_raster(&self, envelope: &Envelope) -> Result<MultiRangedRaster<T>> {
        self.sub_raster_with(envelope, None, None)
    }

    /// Windows every range. Selected bands are numbered across the ranges and keep the order of the ranges,
    /// ranges without selected bands are left out of the result.
    pub fn sub_raster_with(&self, envelope: &Envelope, bands: Option<&[usize]>, target: Option<OriginLocation>) -> Result<MultiRangedRaster<T>> {
        let mut ranges = Vec::with_capacity(self.ranges.len());
        match bands {
            None => {
                for range in &self.ranges {
                    ranges.push(range.sub_raster_with(envelope, None, target)?);
                }
            }
            Some(bands) => {
                for (range, range_bands) in self.ranges.iter().zip(self.split_bands(bands)?) {
                    if !range_bands.is_empty() {
                        ranges.push(range.sub_raster_with(envelope, Some(&range_bands), target)?);
                    }
                }
            }
        }

        MultiRangedRaster::new(ranges)
    }

    /// Stacks the bands of all ranges into one raster, all ranges must have the same size
    pub fn as_simple_raster(&self) -> Result<SimpleRaster<T>> {
        let rasters = self
            .ranges
            .iter()
            .map(AbstractRaster::as_simple_raster)
            .collect::<Result<Vec<_>>>()?;

        let first = &rasters[0];
        let (width, height) = (first.columns(), first.rows());
        if let Some(other) = rasters.iter().find(|r| r.columns() != width || r.rows() != height) {
            return Err(Error::ShapeMismatch(format!(
                "Cannot stack a {}x{} range on a {width}x{height} range",
                other.columns(),
                other.rows()
            )));
        }

        let data = RasterData::new(width, height, self.band_count());
        let mut band = 0;
        for raster in &rasters {
            for range_band in 0..raster.band_count() {
                data.set_subset_band(0, 0, width, height, band, raster.data(), range_band)?;
                band += 1;
            }
        }

        Ok(SimpleRaster::new(data, first.raster_reference().clone()))
    }

    /// Copies range by range, the source must consist of as many ranges as this raster.
    /// A raster that is not multi ranged counts as a single range.
    pub fn set_sub_raster(&self, envelope: &Envelope, source: &AbstractRaster<T>) -> Result<()> {
        for (range, source_range) in self.ranges.iter().zip(self.matching_ranges(source)?) {
            range.set_sub_raster(envelope, source_range)?;
        }

        Ok(())
    }

    pub fn set_sub_raster_at(&self, x: i64, y: i64, source: &AbstractRaster<T>) -> Result<()> {
        for (range, source_range) in self.ranges.iter().zip(self.matching_ranges(source)?) {
            range.set_sub_raster_at(x, y, source_range)?;
        }

        Ok(())
    }

    /// Copies the first band of `source` into band `band`, counted across the ranges
    pub fn set_sub_raster_band(&self, x: i64, y: i64, band: usize, source: &AbstractRaster<T>) -> Result<()> {
        let mut first_band = 0;
        for range in &self.ranges {
            let count = range.band_count();
            if band < first_band + count {
                return range.set_sub_raster_band(x, y, band - first_band, source);
            }
            first_band += count;
        }

        Err(Error::InvalidArgument(format!("Band {band} out of range, raster has {first_band} bands")))
    }

    pub fn copy(&self) -> Result<MultiRangedRaster<T>> {
        let ranges = self.ranges.iter().map(AbstractRaster::copy).collect::<Result<Vec<_>>>()?;
        MultiRangedRaster::new(ranges)
    }

    pub fn dispose(&self) {
        self.ranges.iter().for_each(AbstractRaster::dispose);
    }

    fn first(&self) -> &AbstractRaster<T> {
        // construction guarantees at least one range
        &self.ranges[0]
    }

    fn matching_ranges<'a>(&self, source: &'a AbstractRaster<T>) -> Result<&'a [AbstractRaster<T>]> {
        let source_ranges = match source {
            AbstractRaster::MultiRanged(multi) => multi.ranges(),
            other => std::slice::from_ref(other),
        };

        if source_ranges.len() != self.ranges.len() {
            return Err(Error::ShapeMismatch(format!(
                "Source has {} ranges, expected {}",
                source_ranges.len(),
                self.ranges.len()
            )));
        }

        Ok(source_ranges)
    }

    /// Distributes global band indexes over the ranges as range local indexes
    fn split_bands(&self, bands: &[usize]) -> Result<Vec<Vec<usize>>> {
        let counts: Vec<usize> = self.ranges.iter().map(AbstractRaster::band_count).collect();
        let total: usize = counts.iter().sum();
        let mut result = vec![Vec::new(); counts.len()];

        for &band in bands {
            if band >= total {
                return Err(Error::InvalidArgument(format!("Band {band} out of range, raster has {total} bands")));
            }

            let mut local = band;
            for (index, &count) in counts.iter().enumerate() {
                if local < count {
                    result[index].push(local);
                    break;
                }
                local -= count;
            }
        }

        Ok(result)
    }
}

//! Resampling and reprojection of raster windows.
//!
//! [`crate::AbstractRaster::as_raster_with`] hands windows to an [`Interpolator`] when only the resolution
//! changes and to a [`RasterTransformer`] when the coordinate system changes. [`GridInterpolator`] and
//! [`WarpTransformer`] are the implementations used by [`crate::AbstractRaster::as_raster`].

use crate::{AbstractRaster, Envelope, Error, GeoReference, OriginLocation, Point, RasterData, Result, SampleNum, SimpleRaster};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum InterpolationType {
    #[default]
    NearestNeighbor,
    Bilinear,
    Bicubic,
}

/// Resamples a raster to another pixel size within its own coordinate system.
/// The result is a `width` x `height` grid covering `target_extent`, pixels without source data are nodata.
pub trait Interpolator<T: SampleNum>: Send + Sync {
    fn interpolate(&self, raster: &AbstractRaster<T>, target_extent: &Envelope, width: usize, height: usize) -> Result<AbstractRaster<T>>;
}

/// Resamples a raster into `target_extent`, which can be expressed in another coordinate system.
/// Failing coordinate transformations are reported as [`Error::Transform`].
pub trait RasterTransformer<T: SampleNum>: Send + Sync {
    fn transform(
        &self,
        raster: &AbstractRaster<T>,
        target_extent: &Envelope,
        width: usize,
        height: usize,
        interpolation: InterpolationType,
    ) -> Result<AbstractRaster<T>>;
}

/// Resamples on the grid of the source raster using the configured kernel.
/// Nodata samples are never blended: if a kernel needs one, the nearest sample is used instead.
#[derive(Debug, Clone, Copy)]
pub struct GridInterpolator {
    interpolation: InterpolationType,
}

impl GridInterpolator {
    pub fn new(interpolation: InterpolationType) -> Self {
        GridInterpolator { interpolation }
    }
}

impl<T: SampleNum> Interpolator<T> for GridInterpolator {
    fn interpolate(&self, raster: &AbstractRaster<T>, target_extent: &Envelope, width: usize, height: usize) -> Result<AbstractRaster<T>> {
        let source = non_empty(raster.as_simple_raster()?)?;
        let target_georef = target_reference(&source, target_extent, width, height)?;
        let points = pixel_centers(&target_georef, width, height);

        log::debug!("Resampling {}x{} source pixels to {width}x{height} in {target_extent}", source.columns(), source.rows());
        let data = sample_at(&source, &points, width, height, self.interpolation)?;
        Ok(AbstractRaster::Simple(SimpleRaster::new(data, target_georef)))
    }
}

/// Reprojects by transforming the center of every target pixel into the coordinate system of the source
/// and sampling the source at that location, using the coordinate transformer of the source reference.
#[derive(Debug, Clone, Copy, Default)]
pub struct WarpTransformer;

impl<T: SampleNum> RasterTransformer<T> for WarpTransformer {
    fn transform(
        &self,
        raster: &AbstractRaster<T>,
        target_extent: &Envelope,
        width: usize,
        height: usize,
        interpolation: InterpolationType,
    ) -> Result<AbstractRaster<T>> {
        let source = non_empty(raster.as_simple_raster()?)?;
        let source_georef = source.raster_reference();
        let target_georef = target_reference(&source, target_extent, width, height)?;
        let mut points = pixel_centers(&target_georef, width, height);

        if let (Some(target_crs), Some(source_crs)) = (target_extent.crs(), source_georef.crs())
            && target_crs != source_crs
        {
            let transformer = source_georef
                .transformer()
                .ok_or_else(|| Error::Transform(format!("No coordinate transformer from {target_crs} to {source_crs}")))?;
            transformer.transform_points(target_crs, source_crs, &mut points)?;
        }

        log::debug!("Warped {}x{} source pixels to {width}x{height} in {target_extent}", source.columns(), source.rows());
        let data = sample_at(&source, &points, width, height, interpolation)?;
        Ok(AbstractRaster::Simple(SimpleRaster::new(data, target_georef)))
    }
}

/// North up reference for the output grid, keeping the coordinate transformer of the source
fn target_reference<T: SampleNum>(source: &SimpleRaster<T>, target_extent: &Envelope, width: usize, height: usize) -> Result<GeoReference> {
    let georef = GeoReference::create(OriginLocation::Outer, target_extent, width, height)?;
    Ok(match source.raster_reference().transformer() {
        Some(transformer) => georef.with_transformer(transformer.clone()),
        None => georef,
    })
}

fn pixel_centers(georef: &GeoReference, width: usize, height: usize) -> Vec<Point> {
    let mut points = Vec::with_capacity(width * height);
    for row in 0..height {
        for col in 0..width {
            points.push(georef.world_coordinate(col as f64 + 0.5, row as f64 + 0.5));
        }
    }

    points
}

/// Samples every band of `source` at the world locations in `points`, given in the system of the source.
/// Locations outside of the source footprint are nodata.
fn sample_at<T: SampleNum>(
    source: &SimpleRaster<T>,
    points: &[Point],
    width: usize,
    height: usize,
    interpolation: InterpolationType,
) -> Result<RasterData<T>> {
    let source_georef = source.raster_reference();
    let locations: Vec<(f64, f64)> = points
        .iter()
        .map(|point| source_georef.raster_coordinate_unrounded(point.x(), point.y()))
        .collect();

    let (source_width, source_height) = (source.columns() as f64, source.rows() as f64);
    let mut samples = Vec::with_capacity(width * height * source.band_count());
    for band in 0..source.band_count() {
        let grid = SampleGrid::new(source.data().band_samples(band)?, source.columns(), source.rows());
        samples.extend(locations.iter().map(|&(x, y)| {
            if (0.0..=source_width).contains(&x) && (0.0..=source_height).contains(&y) {
                grid.sample(x, y, interpolation)
            } else {
                T::NODATA
            }
        }));
    }

    RasterData::from_samples(width, height, source.band_count(), samples)
}

fn non_empty<T: SampleNum>(raster: SimpleRaster<T>) -> Result<SimpleRaster<T>> {
    if raster.columns() == 0 || raster.rows() == 0 {
        return Err(Error::InvalidArgument(format!("Cannot resample the empty raster {}", raster.envelope())));
    }

    Ok(raster)
}

/// Row major samples of a single band
struct SampleGrid<T> {
    samples: Vec<T>,
    width: usize,
    height: usize,
}

impl<T: SampleNum> SampleGrid<T> {
    fn new(samples: Vec<T>, width: usize, height: usize) -> Self {
        SampleGrid { samples, width, height }
    }

    /// Sample at a continuous location measured from the outer corner of the upper left pixel
    fn sample(&self, x: f64, y: f64, interpolation: InterpolationType) -> T {
        match interpolation {
            InterpolationType::NearestNeighbor => self.nearest(x, y),
            InterpolationType::Bilinear => self.bilinear(x, y).unwrap_or_else(|| self.nearest(x, y)),
            InterpolationType::Bicubic => self.bicubic(x, y).unwrap_or_else(|| self.nearest(x, y)),
        }
    }

    fn value(&self, col: i64, row: i64) -> T {
        let col = col.clamp(0, self.width as i64 - 1) as usize;
        let row = row.clamp(0, self.height as i64 - 1) as usize;
        self.samples[row * self.width + col]
    }

    /// `None` if the value is nodata
    fn valid_value(&self, col: i64, row: i64) -> Option<f64> {
        let value = self.value(col, row);
        if value.is_nodata() { None } else { value.to_f64() }
    }

    fn nearest(&self, x: f64, y: f64) -> T {
        self.value(x.floor() as i64, y.floor() as i64)
    }

    fn bilinear(&self, x: f64, y: f64) -> Option<T> {
        let (fx, fy) = (x - 0.5, y - 0.5);
        let (col, row) = (fx.floor() as i64, fy.floor() as i64);
        let (tx, ty) = (fx - fx.floor(), fy - fy.floor());

        let top = lerp(self.valid_value(col, row)?, self.valid_value(col + 1, row)?, tx);
        let bottom = lerp(self.valid_value(col, row + 1)?, self.valid_value(col + 1, row + 1)?, tx);
        Some(cast_sample(lerp(top, bottom, ty)))
    }

    fn bicubic(&self, x: f64, y: f64) -> Option<T> {
        let (fx, fy) = (x - 0.5, y - 0.5);
        let (col, row) = (fx.floor() as i64, fy.floor() as i64);
        let (tx, ty) = (fx - fx.floor(), fy - fy.floor());

        let mut rows = [0.0; 4];
        for (i, dy) in (-1..=2).enumerate() {
            let mut values = [0.0; 4];
            for (j, dx) in (-1..=2).enumerate() {
                values[j] = self.valid_value(col + dx, row + dy)?;
            }
            rows[i] = catmull_rom(values, tx);
        }

        Some(cast_sample(catmull_rom(rows, ty)))
    }
}

fn lerp(a: f64, b: f64, t: f64) -> f64 {
    a + (b - a) * t
}

fn catmull_rom(p: [f64; 4], t: f64) -> f64 {
    let t2 = t * t;
    let t3 = t2 * t;
    0.5 * ((2.0 * p[1]) + (-p[0] + p[2]) * t + (2.0 * p[0] - 5.0 * p[1] + 4.0 * p[2] - p[3]) * t2 + (-p[0] + 3.0 * p[1] - 3.0 * p[2] + p[3]) * t3)
}

/// Rounds for integral sample types and clamps to the range of the type
fn cast_sample<T: SampleNum>(value: f64) -> T {
    let value = if T::TYPE.is_floating_point() { value } else { value.round() };
    let min = T::min_value().to_f64().unwrap_or(f64::MIN);
    let max = T::max_value().to_f64().unwrap_or(f64::MAX);

    num::cast(value.clamp(min, max)).unwrap_or(T::NODATA)
}

use std::sync::Arc;

use crate::{
    AbstractRaster, CoordinateTransformer, Crs, Error, GeoReference, MemoryTileContainer, OriginLocation, Point, RasterData, Result,
    SampleNum, SimpleRaster, TiledRaster,
};

/// Translates coordinates between two systems, any other combination of systems fails
#[derive(Debug)]
pub struct ShiftTransformer {
    source: Crs,
    target: Crs,
    dx: f64,
    dy: f64,
}

impl ShiftTransformer {
    pub fn new(source: Crs, target: Crs, dx: f64, dy: f64) -> Self {
        ShiftTransformer { source, target, dx, dy }
    }
}

impl CoordinateTransformer for ShiftTransformer {
    fn transform_points(&self, source: &Crs, target: &Crs, points: &mut [Point]) -> Result<()> {
        let (dx, dy) = if source == &self.source && target == &self.target {
            (self.dx, self.dy)
        } else if source == &self.target && target == &self.source {
            (-self.dx, -self.dy)
        } else {
            return Err(Error::Transform(format!("No transformation from {source} to {target}")));
        };

        for point in points.iter_mut() {
            *point = Point::new(point.x() + dx, point.y() + dy);
        }

        Ok(())
    }
}

/// North up georeference with the outer corner of the upper left pixel at `origin_x`, `top_y`
pub fn outer_georef(origin_x: f64, top_y: f64, res: f64) -> GeoReference {
    GeoReference::with_origin(OriginLocation::Outer, res, -res, origin_x, top_y, None).expect("valid georeference")
}

/// Single band raster filled with `value`
pub fn simple_raster<T: SampleNum>(origin_x: f64, top_y: f64, width: usize, height: usize, res: f64, value: T) -> SimpleRaster<T> {
    SimpleRaster::new(RasterData::filled_with(width, height, 1, value), outer_georef(origin_x, top_y, res))
}

/// Single band raster where every pixel holds `y * width + x`
pub fn numbered_raster(origin_x: f64, top_y: f64, width: usize, height: usize, res: f64) -> SimpleRaster<i32> {
    let samples = (0..(width * height) as i32).collect();
    let data = RasterData::from_samples(width, height, 1, samples).expect("matching sample count");
    SimpleRaster::new(data, outer_georef(origin_x, top_y, res))
}

/// Tiled raster over the given tiles, in insertion order
pub fn tiled_raster<T: SampleNum>(tiles: Vec<SimpleRaster<T>>) -> TiledRaster<T> {
    let container = MemoryTileContainer::with_tiles(tiles.into_iter().map(AbstractRaster::from).collect()).expect("valid tiles");
    TiledRaster::new(Arc::new(container))
}

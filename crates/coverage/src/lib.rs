#![warn(clippy::unwrap_used)]
#![cfg_attr(docsrs, feature(doc_cfg))]

//! Gridded coverage storage and windowing.
//!
//! The crate maps between pixel space and world space ([`GeoReference`]) and offers three raster
//! containers behind one windowing contract ([`AbstractRaster`]): a single in-memory raster, a tiled
//! composite and a composite of band groups.

pub type Result<T = ()> = std::result::Result<T, Error>;

pub mod crs;
mod datatype;
mod envelope;
mod error;
mod georeference;
mod geotransform;
mod nodata;
pub mod raster;
mod rasterdata;
mod rasterrect;
pub mod resample;
mod samplenum;
mod tilecontainer;

#[cfg(test)]
mod testutils;

#[doc(inline)]
pub use crs::CoordinateTransformer;
#[doc(inline)]
pub use crs::Crs;
#[doc(inline)]
pub use datatype::DataType;
#[doc(inline)]
pub use envelope::Envelope;
#[doc(inline)]
pub use envelope::Geometry;
#[doc(inline)]
pub use error::Error;
#[doc(inline)]
pub use georeference::GeoReference;
#[doc(inline)]
pub use georeference::OriginLocation;
#[doc(inline)]
pub use geotransform::GeoTransform;
pub use nodata::Nodata;
#[doc(inline)]
pub use raster::AbstractRaster;
#[doc(inline)]
pub use raster::MultiRangedRaster;
#[doc(inline)]
pub use raster::Resolution;
#[doc(inline)]
pub use raster::ResolutionInfo;
#[doc(inline)]
pub use raster::SimpleRaster;
#[doc(inline)]
pub use raster::TiledRaster;
#[doc(inline)]
pub use rasterdata::RasterData;
#[doc(inline)]
pub use rasterdata::RasterDataInfo;
#[doc(inline)]
pub use rasterrect::RasterRect;
#[doc(inline)]
pub use resample::InterpolationType;
pub use samplenum::SampleNum;
#[doc(inline)]
pub use tilecontainer::MemoryTileContainer;
#[doc(inline)]
pub use tilecontainer::TileContainer;

#[cfg(feature = "proj4rs")]
#[cfg_attr(docsrs, doc(cfg(feature = "proj4rs")))]
pub use crs::Proj4rsTransformer;

pub type Point<T = f64> = geo_types::Point<T>;

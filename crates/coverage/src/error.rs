use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    /// A requested window lies (partially) outside of the raster it was requested from
    #[error("Requested window {requested} is not contained in the raster envelope {available}")]
    Bounds { requested: String, available: String },
    /// Source and destination disagree on the number of ranges or bands
    #[error("Shape mismatch: {0}")]
    ShapeMismatch(String),
    /// A tiled raster query hit no tiles and the output layout is unknown
    #[error("No tiles intersect {0} and no sample layout is known to create an empty raster")]
    MissingShape(String),
    /// The georeference parameters do not describe an invertible affine transform
    #[error("Invalid georeference: {0}")]
    Construction(String),
    /// Reprojection failed, callers of the core treat this as a recoverable degradation
    #[error("Coordinate transformation failed: {0}")]
    Transform(String),
    #[error("Sample data was already disposed")]
    Disposed,
    #[error("Raster data is read only")]
    ReadOnly,
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
    #[cfg(feature = "proj4rs")]
    #[error("Proj4rs error: {0}")]
    Proj4rs(#[from] proj4rs::errors::Error),
}

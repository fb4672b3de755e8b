//! Coordinate reference system identifiers and the reprojection seam.
//!
//! The core never performs projection math itself, it forwards envelopes and points to a
//! [`CoordinateTransformer`] attached to a [`crate::GeoReference`].

use std::fmt;

use crate::{Envelope, Point, Result};

const DEFAULT_EDGE_POINTS: usize = 20;

/// Opaque coordinate reference system identifier, e.g. `EPSG:31466` or a proj string
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Crs(String);

impl Crs {
    pub fn new(identifier: impl Into<String>) -> Self {
        Crs(identifier.into())
    }

    pub fn from_epsg(code: u16) -> Self {
        Crs(format!("EPSG:{code}"))
    }

    pub fn identifier(&self) -> &str {
        &self.0
    }

    /// The numeric code for identifiers of the form `EPSG:<code>`
    pub fn epsg(&self) -> Option<u16> {
        let (authority, code) = self.0.split_once(':')?;
        if !authority.trim().eq_ignore_ascii_case("epsg") {
            return None;
        }

        code.trim().parse().ok()
    }
}

impl fmt::Display for Crs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Crs {
    fn from(identifier: &str) -> Self {
        Crs::new(identifier)
    }
}

/// Reprojection collaborator, failures are reported as [`crate::Error::Transform`] and treated as
/// recoverable by the windowing code.
pub trait CoordinateTransformer: Send + Sync + fmt::Debug {
    /// Transforms the points in place from the `source` to the `target` system
    fn transform_points(&self, source: &Crs, target: &Crs, points: &mut [Point]) -> Result<()>;

    /// Reprojects an envelope by sampling points along its edges and returning their bounding box.
    /// Envelopes without a coordinate system or already in the `target` system are returned as is.
    fn transform_envelope(&self, envelope: &Envelope, target: &Crs) -> Result<Envelope> {
        let source = match envelope.crs() {
            Some(source) if source != target => source,
            _ => return Ok(envelope.clone()),
        };

        let mut points = edge_points(envelope, DEFAULT_EDGE_POINTS);
        self.transform_points(source, target, &mut points)?;

        let (min_x, max_x, min_y, max_y) = points.iter().fold(
            (f64::INFINITY, f64::NEG_INFINITY, f64::INFINITY, f64::NEG_INFINITY),
            |(min_x, max_x, min_y, max_y), point| (min_x.min(point.x()), max_x.max(point.x()), min_y.min(point.y()), max_y.max(point.y())),
        );

        if !(min_x.is_finite() && max_x.is_finite() && min_y.is_finite() && max_y.is_finite()) {
            return Err(crate::Error::Transform(format!("Envelope {envelope} has no finite image in {target}")));
        }

        Ok(Envelope::new(Point::new(min_x, min_y), Point::new(max_x, max_y)).with_crs(Some(target.clone())))
    }
}

/// Points along the envelope boundary, corners included once
fn edge_points(envelope: &Envelope, points_per_edge: usize) -> Vec<Point> {
    let points_per_edge = points_per_edge.max(2);
    let (min, max) = (envelope.min(), envelope.max());
    let t = |i: usize| i as f64 / (points_per_edge - 1) as f64;
    let lerp = |a: f64, b: f64, t: f64| if t >= 1.0 { b } else { a + t * (b - a) };

    let mut points = Vec::with_capacity(points_per_edge * 4);
    // top, left to right
    for i in 0..points_per_edge {
        points.push(Point::new(lerp(min.x(), max.x(), t(i)), max.y()));
    }
    // right, top to bottom
    for i in 1..points_per_edge - 1 {
        points.push(Point::new(max.x(), lerp(max.y(), min.y(), t(i))));
    }
    // bottom, right to left
    for i in 0..points_per_edge {
        points.push(Point::new(lerp(max.x(), min.x(), t(i)), min.y()));
    }
    // left, bottom to top
    for i in 1..points_per_edge - 1 {
        points.push(Point::new(min.x(), lerp(min.y(), max.y(), t(i))));
    }

    points
}

#[cfg(feature = "proj4rs")]
mod proj4rs_transformer {
    use proj4rs::Proj;
    use proj4rs::transform::transform;

    use super::{CoordinateTransformer, Crs};
    use crate::{Point, Result};

    /// [`CoordinateTransformer`] backed by the pure rust proj4rs library
    #[derive(Debug, Default, Clone, Copy)]
    pub struct Proj4rsTransformer;

    fn projection(crs: &Crs) -> Result<Proj> {
        Ok(match crs.epsg() {
            Some(code) => Proj::from_epsg_code(code)?,
            None => Proj::from_proj_string(crs.identifier())?,
        })
    }

    impl CoordinateTransformer for Proj4rsTransformer {
        fn transform_points(&self, source: &Crs, target: &Crs, points: &mut [Point]) -> Result<()> {
            let source_proj = projection(source)?;
            let target_proj = projection(target)?;

            for point in points.iter_mut() {
                let mut p = if source_proj.is_latlong() {
                    Point::new(point.x().to_radians(), point.y().to_radians())
                } else {
                    *point
                };

                transform(&source_proj, &target_proj, &mut p)
                    .map_err(|e| crate::Error::Transform(format!("{source} -> {target}: {e}")))?;

                *point = if target_proj.is_latlong() {
                    Point::new(p.x().to_degrees(), p.y().to_degrees())
                } else {
                    p
                };
            }

            Ok(())
        }
    }

}

#[cfg(feature = "proj4rs")]
pub use proj4rs_transformer::Proj4rsTransformer;

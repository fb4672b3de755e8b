//! Affine mapping between pixel space and world space.

use std::fmt;
use std::sync::Arc;

use approx::{AbsDiffEq, RelativeEq};

use crate::{CoordinateTransformer, Crs, Envelope, Error, GeoTransform, Point, RasterRect, Result};

/// Raster space values are corrected to this many steps per pixel before rounding
const RASTER_DECIMAL_ACCURACY: f64 = 1e6;
/// Relative to the finest resolution, the tolerance under which calculations are considered exact
const RESOLUTION_TOLERANCE: f64 = 1e-6;
/// Beyond this magnitude every f64 is an integer, so decimal snapping is meaningless
const MAX_EXACT_INTEGER: f64 = 4_503_599_627_370_496.0;

/// Location of the origin within the upper left pixel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum OriginLocation {
    /// The origin is the center of pixel (0, 0)
    Center,
    /// The origin is the outer (upper left) corner of pixel (0, 0)
    #[default]
    Outer,
}

impl OriginLocation {
    /// Offset in pixels between the outer corner and the origin of a pixel
    fn pixel_offset(self) -> f64 {
        match self {
            OriginLocation::Center => 0.5,
            OriginLocation::Outer => 0.0,
        }
    }
}

impl fmt::Display for OriginLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OriginLocation::Center => f.write_str("center"),
            OriginLocation::Outer => f.write_str("outer"),
        }
    }
}

/// Immutable mapping between raster coordinates and world coordinates.
///
/// The mapping is a (possibly rotated) affine transform defined by a per axis resolution and
/// rotation and the world location of pixel (0, 0). The [`OriginLocation`] determines whether that
/// location is the center or the outer corner of the pixel, which affects every rounding decision.
///
/// Raw transform results are corrected for floating point noise before they are floored or rounded,
/// so a value like `25.999999999998` is treated as `26`.
#[derive(Debug, Clone)]
pub struct GeoReference {
    location: OriginLocation,
    res_x: f64,
    res_y: f64,
    rot_x: f64,
    rot_y: f64,
    crs: Option<Crs>,
    transformer: Option<Arc<dyn CoordinateTransformer>>,
    delta: f64,
    world_accuracy: Option<f64>,
    to_world: GeoTransform,
    to_raster: GeoTransform,
}

impl GeoReference {
    /// Creates a reference, fails with [`Error::Construction`] if the parameters do not define an invertible transform
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        location: OriginLocation,
        res_x: f64,
        res_y: f64,
        rot_x: f64,
        rot_y: f64,
        origin_x: f64,
        origin_y: f64,
        crs: Option<Crs>,
    ) -> Result<Self> {
        if !(res_x.is_finite() && res_y.is_finite() && origin_x.is_finite() && origin_y.is_finite()) {
            return Err(Error::Construction(format!(
                "Non finite georeference values: resolution ({res_x}, {res_y}), origin ({origin_x}, {origin_y})"
            )));
        }

        let to_world = GeoTransform::new([
            origin_x,
            rot_x.cos() * res_x,
            -rot_x.sin(),
            origin_y,
            rot_y.sin(),
            rot_y.cos() * res_y,
        ]);
        let to_raster = to_world.invert()?;
        let delta = res_x.abs().min(res_y.abs()) * RESOLUTION_TOLERANCE;

        Ok(GeoReference {
            location,
            res_x,
            res_y,
            rot_x,
            rot_y,
            crs,
            transformer: None,
            delta,
            world_accuracy: world_accuracy(delta),
            to_world,
            to_raster,
        })
    }

    /// Creates an axis aligned reference
    pub fn with_origin(location: OriginLocation, res_x: f64, res_y: f64, origin_x: f64, origin_y: f64, crs: Option<Crs>) -> Result<Self> {
        Self::new(location, res_x, res_y, 0.0, 0.0, origin_x, origin_y, crs)
    }

    /// Creates a north up reference with its origin on the upper left corner of the envelope, the resolution
    /// is derived from the envelope spans and the raster size.
    pub fn create(location: OriginLocation, envelope: &Envelope, width: usize, height: usize) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(Error::Construction(format!(
                "Cannot derive a resolution for envelope {envelope} from raster size {width}x{height}"
            )));
        }

        let res_x = envelope.span0() / width as f64;
        let res_y = -envelope.span1() / height as f64;
        Self::with_origin(location, res_x, res_y, envelope.min().x(), envelope.max().y(), envelope.crs().cloned())
    }

    /// Attaches the reprojection collaborator used for envelopes expressed in another coordinate system
    pub fn with_transformer(mut self, transformer: Arc<dyn CoordinateTransformer>) -> Self {
        self.transformer = Some(transformer);
        self
    }

    pub fn transformer(&self) -> Option<&Arc<dyn CoordinateTransformer>> {
        self.transformer.as_ref()
    }

    pub fn origin_location(&self) -> OriginLocation {
        self.location
    }

    pub fn resolution_x(&self) -> f64 {
        self.res_x
    }

    pub fn resolution_y(&self) -> f64 {
        self.res_y
    }

    pub fn rotation_x(&self) -> f64 {
        self.rot_x
    }

    pub fn rotation_y(&self) -> f64 {
        self.rot_y
    }

    pub fn crs(&self) -> Option<&Crs> {
        self.crs.as_ref()
    }

    /// Tolerance in world units under which two values are considered equal
    pub fn delta(&self) -> f64 {
        self.delta
    }

    /// The world location of the origin in this reference's own convention
    pub fn origin(&self) -> Point {
        self.to_world.translation()
    }

    /// The world location of the upper left pixel in the requested convention
    pub fn origin_for(&self, location: OriginLocation) -> Point {
        if location == self.location {
            return self.origin();
        }

        match self.location {
            OriginLocation::Center => self.world_coordinate(0.0, 0.0),
            OriginLocation::Outer => self.world_coordinate(0.5, 0.5),
        }
    }

    /// The pixel that contains the world coordinate, center references round, outer references floor
    pub fn raster_coordinate(&self, world_x: f64, world_y: f64) -> (i64, i64) {
        let raw = self.to_raster.apply(world_x, world_y);
        let x = remove_raster_imprecision(raw.x());
        let y = remove_raster_imprecision(raw.y());

        match self.location {
            OriginLocation::Center => (round_half_up(x), round_half_up(y)),
            OriginLocation::Outer => (x.floor() as i64, y.floor() as i64),
        }
    }

    /// Continuous raster location of the world coordinate, measured from the outer corner of pixel (0, 0)
    pub fn raster_coordinate_unrounded(&self, world_x: f64, world_y: f64) -> (f64, f64) {
        let raw = self.to_raster.apply(world_x, world_y);
        let offset = self.location.pixel_offset();

        (remove_raster_imprecision(raw.x()) + offset, remove_raster_imprecision(raw.y()) + offset)
    }

    /// World location of a continuous raster location measured from the outer corner of pixel (0, 0)
    pub fn world_coordinate(&self, raster_x: f64, raster_y: f64) -> Point {
        let offset = self.location.pixel_offset();
        let world = self.to_world.apply(raster_x - offset, raster_y - offset);

        Point::new(self.remove_world_imprecision(world.x()), self.remove_world_imprecision(world.y()))
    }

    /// The pixel rectangle covering the envelope.
    ///
    /// The rectangle always covers the complete envelope: its extent is the floor of the minimal and the
    /// ceiling of the maximal raster location of the envelope corners. An envelope in another coordinate
    /// system is reprojected first, if that fails it is used untransformed.
    pub fn convert_envelope_to_raster_crs(&self, envelope: &Envelope) -> RasterRect {
        let envelope = self.to_own_crs(envelope);
        let corners = corners(&envelope);

        let mut x = i64::MAX;
        let mut y = i64::MAX;
        for corner in &corners {
            let (cx, cy) = self.raster_coordinate(corner.x(), corner.y());
            x = x.min(cx);
            y = y.min(cy);
        }

        let (mut min_x, mut min_y) = (f64::INFINITY, f64::INFINITY);
        let (mut max_x, mut max_y) = (f64::NEG_INFINITY, f64::NEG_INFINITY);
        for corner in &corners {
            let (ux, uy) = self.raster_coordinate_unrounded(corner.x(), corner.y());
            min_x = min_x.min(ux);
            min_y = min_y.min(uy);
            max_x = max_x.max(ux);
            max_y = max_y.max(uy);
        }

        let width = (max_x.ceil() - min_x.floor()).max(0.0) as usize;
        let height = (max_y.ceil() - min_y.floor()).max(0.0) as usize;

        RasterRect::new(x, y, width, height)
    }

    /// The world envelope of a pixel rectangle.
    ///
    /// With `target` equal to [`OriginLocation::Outer`] this is the outer footprint of the pixels, with
    /// [`OriginLocation::Center`] the footprint is shifted half a pixel so its corners are pixel centers.
    /// The result is reprojected to `crs` when given, if that fails the envelope stays in this reference's system.
    pub fn envelope(&self, target: OriginLocation, rect: &RasterRect, crs: Option<&Crs>) -> Envelope {
        let null_x = rect.x as f64 + target.pixel_offset();
        let null_y = rect.y as f64 + target.pixel_offset();
        let far_x = null_x + rect.width as f64;
        let far_y = null_y + rect.height as f64;

        let points = [
            self.world_coordinate(null_x, null_y),
            self.world_coordinate(far_x, null_y),
            self.world_coordinate(far_x, far_y),
            self.world_coordinate(null_x, far_y),
        ];

        let (min_x, max_x, min_y, max_y) = points.iter().fold(
            (f64::INFINITY, f64::NEG_INFINITY, f64::INFINITY, f64::NEG_INFINITY),
            |(min_x, max_x, min_y, max_y), p| (min_x.min(p.x()), max_x.max(p.x()), min_y.min(p.y()), max_y.max(p.y())),
        );

        let result = Envelope::from_bounds(min_x, min_y, max_x, max_y).with_crs(self.crs.clone());
        match crs {
            Some(target_crs) => self.to_target_crs(result, target_crs),
            None => result,
        }
    }

    /// Envelope of a raster of the given size in this reference's own convention
    pub fn envelope_for_size(&self, width: usize, height: usize, crs: Option<&Crs>) -> Envelope {
        self.envelope(self.location, &RasterRect::with_size(width, height), crs)
    }

    /// The outer pixel footprint of the rectangle in this reference's coordinate system
    pub fn pixel_footprint(&self, rect: &RasterRect) -> Envelope {
        self.envelope(OriginLocation::Outer, rect, None)
    }

    /// Size in pixels of a raster covering the envelope
    pub fn size(&self, envelope: &Envelope) -> (usize, usize) {
        let rect = self.convert_envelope_to_raster_crs(envelope);
        (rect.width, rect.height)
    }

    /// A reference that can be used for a composite containing both inputs.
    ///
    /// Convention, rotation and coordinate system are taken from `a`. Per axis the finest resolution is
    /// used together with the outermost origin given the direction of that axis.
    pub fn merger(a: &GeoReference, b: &GeoReference) -> Result<GeoReference> {
        let b_origin = b.origin_for(a.location);
        let a_origin = a.origin();

        let (res_x, origin_x) = merge_axis(a.res_x, b.res_x, a_origin.x(), b_origin.x());
        let (res_y, origin_y) = merge_axis(a.res_y, b.res_y, a_origin.y(), b_origin.y());

        let mut merged = GeoReference::new(a.location, res_x, res_y, a.rot_x, a.rot_y, origin_x, origin_y, a.crs.clone())?;
        merged.transformer = a.transformer.clone().or_else(|| b.transformer.clone());
        Ok(merged)
    }

    /// A copy of this reference with its origin snapped to the grid pixel containing the upper left corner
    /// of `envelope`, optionally switching the origin convention.
    pub fn create_relocated_reference(&self, target: Option<OriginLocation>, envelope: &Envelope) -> GeoReference {
        let target = target.unwrap_or(self.location);
        let envelope = self.to_own_crs(envelope);

        let (raster_x, raster_y) = self.raster_coordinate(envelope.min().x(), envelope.max().y());
        let offset = target.pixel_offset();
        let origin = self.world_coordinate(raster_x as f64 + offset, raster_y as f64 + offset);

        self.with_new_origin(target, origin)
    }

    /// The same grid expressed in the `target` origin convention
    pub fn relocated_to(&self, target: OriginLocation) -> GeoReference {
        if target == self.location {
            return self.clone();
        }

        self.with_new_origin(target, self.origin_for(target))
    }

    /// Shifts the envelope corners by half a pixel to express it in the `target` convention
    pub fn relocate_envelope(&self, target: OriginLocation, envelope: &Envelope) -> Envelope {
        if target == self.location {
            return envelope.clone();
        }

        let own = self.to_own_crs(envelope);
        let (min_x, min_y) = self.raster_coordinate_unrounded(own.min().x(), own.min().y());
        let (max_x, max_y) = self.raster_coordinate_unrounded(own.max().x(), own.max().y());

        let shift = match self.location {
            OriginLocation::Center => -0.5,
            OriginLocation::Outer => 0.5,
        };

        let relocated = Envelope::new(
            self.world_coordinate(min_x + shift, min_y + shift),
            self.world_coordinate(max_x + shift, max_y + shift),
        )
        .with_crs(own.crs().cloned());

        match envelope.crs() {
            Some(original) => self.to_target_crs(relocated, original),
            None => relocated,
        }
    }

    fn with_new_origin(&self, location: OriginLocation, origin: Point) -> GeoReference {
        // only the translation changes, so the inverse linear part stays valid
        let mut coefficients = self.to_world.coefficients();
        coefficients[0] = origin.x();
        coefficients[3] = origin.y();

        let mut inverse = self.to_raster.coefficients();
        inverse[0] = -(inverse[1] * origin.x() + inverse[2] * origin.y());
        inverse[3] = -(inverse[4] * origin.x() + inverse[5] * origin.y());

        GeoReference {
            location,
            res_x: self.res_x,
            res_y: self.res_y,
            rot_x: self.rot_x,
            rot_y: self.rot_y,
            crs: self.crs.clone(),
            transformer: self.transformer.clone(),
            delta: self.delta,
            world_accuracy: self.world_accuracy,
            to_world: GeoTransform::new(coefficients),
            to_raster: GeoTransform::new(inverse),
        }
    }

    pub(crate) fn to_own_crs(&self, envelope: &Envelope) -> Envelope {
        let (Some(own), Some(source)) = (self.crs.as_ref(), envelope.crs()) else {
            return envelope.clone();
        };

        if own == source {
            return envelope.clone();
        }

        match &self.transformer {
            Some(transformer) => match transformer.transform_envelope(envelope, own) {
                Ok(transformed) => transformed,
                Err(e) => {
                    log::warn!("Failed to transform {envelope} to {own}, continuing untransformed: {e}");
                    envelope.clone()
                }
            },
            None => {
                log::debug!("No coordinate transformer attached, using {envelope} as if it were in {own}");
                envelope.clone()
            }
        }
    }

    fn to_target_crs(&self, envelope: Envelope, target: &Crs) -> Envelope {
        if self.crs.is_none() || self.crs.as_ref() == Some(target) {
            return envelope;
        }

        match &self.transformer {
            Some(transformer) => match transformer.transform_envelope(&envelope, target) {
                Ok(transformed) => transformed,
                Err(e) => {
                    log::warn!("Failed to transform {envelope} to {target}, keeping the original system: {e}");
                    envelope
                }
            },
            None => {
                log::debug!("No coordinate transformer attached, {envelope} is not transformed to {target}");
                envelope
            }
        }
    }

    fn remove_world_imprecision(&self, value: f64) -> f64 {
        match self.world_accuracy {
            Some(accuracy) => snap_to_decimals(value, accuracy),
            None => value,
        }
    }
}

fn merge_axis(res_a: f64, res_b: f64, origin_a: f64, origin_b: f64) -> (f64, f64) {
    if res_a < 0.0 {
        (res_a.max(res_b), origin_a.max(origin_b))
    } else {
        (res_a.min(res_b), origin_a.min(origin_b))
    }
}

fn corners(envelope: &Envelope) -> [Point; 4] {
    let (min, max) = (envelope.min(), envelope.max());
    [
        Point::new(min.x(), max.y()),
        Point::new(max.x(), max.y()),
        Point::new(max.x(), min.y()),
        Point::new(min.x(), min.y()),
    ]
}

fn round_half_up(value: f64) -> i64 {
    (value + 0.5).floor() as i64
}

/// Steps per world unit used to correct world coordinates: one decade finer than the tolerance
fn world_accuracy(delta: f64) -> Option<f64> {
    if delta <= 0.0 || !delta.is_finite() {
        return None;
    }

    let exponent = delta.log10().floor() as i32 - 1;
    if exponent >= 0 { None } else { Some(10f64.powi(-exponent)) }
}

fn remove_raster_imprecision(value: f64) -> f64 {
    snap_to_decimals(value, RASTER_DECIMAL_ACCURACY)
}

/// Snaps the value to the nearest multiple of `1 / steps`, decimal values already on that grid come back unchanged
fn snap_to_decimals(value: f64, steps: f64) -> f64 {
    if value == 0.0 || !value.is_finite() {
        return value;
    }

    let scaled = value * steps;
    if scaled.abs() >= MAX_EXACT_INTEGER {
        return value;
    }

    scaled.round() / steps
}

impl PartialEq for GeoReference {
    /// The attached transformer does not take part in the comparison
    fn eq(&self, other: &Self) -> bool {
        self.location == other.location
            && self.res_x == other.res_x
            && self.res_y == other.res_y
            && self.rot_x == other.rot_x
            && self.rot_y == other.rot_y
            && self.origin() == other.origin()
            && self.crs == other.crs
    }
}

impl fmt::Display for GeoReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let origin = self.origin();
        write!(
            f,
            "GeoReference(location: {}, origin: ({}, {}), resolution: ({}, {}), rotation: ({}, {})",
            self.location,
            origin.x(),
            origin.y(),
            self.res_x,
            self.res_y,
            self.rot_x,
            self.rot_y
        )?;

        if let Some(crs) = &self.crs {
            write!(f, ", crs: {crs}")?;
        }

        f.write_str(")")
    }
}

impl AbsDiffEq for GeoReference {
    type Epsilon = f64;

    fn default_epsilon() -> Self::Epsilon {
        f64::default_epsilon()
    }

    fn abs_diff_eq(&self, other: &Self, epsilon: Self::Epsilon) -> bool {
        self.location == other.location
            && self.crs == other.crs
            && self.res_x.abs_diff_eq(&other.res_x, epsilon)
            && self.res_y.abs_diff_eq(&other.res_y, epsilon)
            && self.rot_x.abs_diff_eq(&other.rot_x, epsilon)
            && self.rot_y.abs_diff_eq(&other.rot_y, epsilon)
            && self.origin().abs_diff_eq(&other.origin(), epsilon)
    }
}

impl RelativeEq for GeoReference {
    fn default_max_relative() -> Self::Epsilon {
        f64::default_max_relative()
    }

    fn relative_eq(&self, other: &Self, epsilon: Self::Epsilon, max_relative: Self::Epsilon) -> bool {
        self.location == other.location
            && self.crs == other.crs
            && self.res_x.relative_eq(&other.res_x, epsilon, max_relative)
            && self.res_y.relative_eq(&other.res_y, epsilon, max_relative)
            && self.rot_x.relative_eq(&other.rot_x, epsilon, max_relative)
            && self.rot_y.relative_eq(&other.rot_y, epsilon, max_relative)
            && Point::relative_eq(&self.origin(), &other.origin(), epsilon, max_relative)
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;
    use crate::testutils::ShiftTransformer;

    fn ref_center() -> GeoReference {
        GeoReference::with_origin(OriginLocation::Center, 10.0, -10.0, 1000.0, 1000.0, None).expect("valid reference")
    }

    fn ref_outer() -> GeoReference {
        GeoReference::with_origin(OriginLocation::Outer, 10.0, -10.0, 1000.0, 1000.0, None).expect("valid reference")
    }

    #[test]
    fn singular_reference_fails() {
        assert!(matches!(
            GeoReference::with_origin(OriginLocation::Outer, 0.0, -10.0, 0.0, 0.0, None),
            Err(Error::Construction(_))
        ));
        assert!(matches!(
            GeoReference::with_origin(OriginLocation::Outer, f64::NAN, -10.0, 0.0, 0.0, None),
            Err(Error::Construction(_))
        ));
    }

    #[test]
    fn origin_in_other_convention() {
        assert_eq!(ref_center().origin(), Point::new(1000.0, 1000.0));
        assert_relative_eq!(ref_center().origin_for(OriginLocation::Outer), Point::new(995.0, 1005.0));
        assert_relative_eq!(ref_outer().origin_for(OriginLocation::Center), Point::new(1005.0, 995.0));
        assert_eq!(ref_outer().origin_for(OriginLocation::Outer), Point::new(1000.0, 1000.0));
    }

    #[test]
    fn raster_coordinate() {
        let center = ref_center();
        let outer = ref_outer();

        let cases = [
            ((1031.0, 991.0), (3, 1), (3, 0)),
            ((1031.0, 981.0), (3, 2), (3, 1)),
            ((1025.0, 981.0), (3, 2), (2, 1)),
            ((994.0, 995.0), (-1, 1), (-1, 0)),
            ((994.0, 1014.0), (-1, -1), (-1, -2)),
            ((1014.0, 1014.0), (1, -1), (1, -2)),
        ];

        for ((x, y), expected_center, expected_outer) in cases {
            assert_eq!(center.raster_coordinate(x, y), expected_center, "center ({x}, {y})");
            assert_eq!(outer.raster_coordinate(x, y), expected_outer, "outer ({x}, {y})");
        }
    }

    #[test]
    fn raster_coordinate_unrounded() {
        let center = ref_center();
        let outer = ref_outer();

        let cases = [
            ((1031.0, 991.0), (3.6, 1.4), (3.1, 0.9)),
            ((994.0, 995.0), (-0.1, 1.0), (-0.6, 0.5)),
            ((1014.0, 1014.0), (1.9, -0.9), (1.4, -1.4)),
        ];

        for ((x, y), (cx, cy), (ox, oy)) in cases {
            let (rx, ry) = center.raster_coordinate_unrounded(x, y);
            assert_relative_eq!(rx, cx, epsilon = 1e-9);
            assert_relative_eq!(ry, cy, epsilon = 1e-9);

            let (rx, ry) = outer.raster_coordinate_unrounded(x, y);
            assert_relative_eq!(rx, ox, epsilon = 1e-9);
            assert_relative_eq!(ry, oy, epsilon = 1e-9);
        }
    }

    #[test]
    fn world_coordinate() {
        let center = ref_center();
        let outer = ref_outer();

        assert_relative_eq!(center.world_coordinate(2.1, 3.11), Point::new(1016.0, 973.9), epsilon = 1e-9);
        assert_relative_eq!(outer.world_coordinate(2.1, 3.11), Point::new(1021.0, 968.9), epsilon = 1e-9);
        assert_relative_eq!(center.world_coordinate(0.01, 2.18), Point::new(995.1, 983.2), epsilon = 1e-9);
        assert_relative_eq!(outer.world_coordinate(0.01, 2.18), Point::new(1000.1, 978.2), epsilon = 1e-9);
    }

    #[test]
    fn world_coordinate_removes_noise() {
        let outer = GeoReference::with_origin(OriginLocation::Outer, 0.1, -0.1, 0.0, 0.0, None).expect("valid reference");
        // 0.1 * 3 is 0.30000000000000004 in plain floating point
        assert_eq!(outer.world_coordinate(3.0, 0.0).x(), 0.3);
    }

    #[test]
    fn raster_coordinate_removes_noise() {
        let outer = GeoReference::with_origin(OriginLocation::Outer, 0.1, -0.1, 0.0, 0.0, None).expect("valid reference");
        // 0.3 / 0.1 is 2.9999999999999996 in plain floating point
        assert_eq!(outer.raster_coordinate(0.3, -0.3), (3, 3));
        assert_eq!(outer.raster_coordinate_unrounded(0.3, -0.3), (3.0, 3.0));
    }

    #[test]
    fn convert_envelope_to_raster_crs() {
        let env = Envelope::from_bounds(994.0, 995.0, 1016.0, 1014.0);

        assert_eq!(ref_center().convert_envelope_to_raster_crs(&env), RasterRect::new(-1, -1, 4, 2));
        assert_eq!(ref_outer().convert_envelope_to_raster_crs(&env), RasterRect::new(-1, -2, 3, 3));
    }

    #[test]
    fn envelope_for_size() {
        let expected = Envelope::from_bounds(1000.0, 980.0, 1030.0, 1000.0);
        assert_relative_eq!(ref_center().envelope_for_size(3, 2, None), expected, epsilon = 1e-9);
        assert_relative_eq!(ref_outer().envelope_for_size(3, 2, None), expected, epsilon = 1e-9);

        let rect = RasterRect::with_size(3, 2);
        assert_relative_eq!(
            ref_center().envelope(OriginLocation::Outer, &rect, None),
            Envelope::from_bounds(995.0, 985.0, 1025.0, 1005.0),
            epsilon = 1e-9
        );
        assert_relative_eq!(
            ref_outer().envelope(OriginLocation::Center, &rect, None),
            Envelope::from_bounds(1005.0, 975.0, 1035.0, 995.0),
            epsilon = 1e-9
        );
    }

    #[test]
    fn sub_envelope() {
        let rect = RasterRect::new(4, 2, 3, 2);
        let same = Envelope::from_bounds(1040.0, 960.0, 1070.0, 980.0);

        assert_relative_eq!(ref_center().envelope(OriginLocation::Center, &rect, None), same, epsilon = 1e-9);
        assert_relative_eq!(ref_outer().envelope(OriginLocation::Outer, &rect, None), same, epsilon = 1e-9);
        assert_relative_eq!(
            ref_center().envelope(OriginLocation::Outer, &rect, None),
            Envelope::from_bounds(1035.0, 965.0, 1065.0, 985.0),
            epsilon = 1e-9
        );
        assert_relative_eq!(
            ref_outer().envelope(OriginLocation::Center, &rect, None),
            Envelope::from_bounds(1045.0, 955.0, 1075.0, 975.0),
            epsilon = 1e-9
        );
    }

    #[test]
    fn size() {
        let env = Envelope::from_bounds(1005.0, 985.0, 1025.0, 1005.0);
        assert_eq!(ref_center().size(&env), (2, 2));
        assert_eq!(ref_outer().size(&env), (3, 3));
    }

    #[test]
    fn create_from_envelope() -> Result<()> {
        let env = Envelope::from_bounds(0.0, 0.0, 3000.0, 2000.0);
        let georef = GeoReference::create(OriginLocation::Center, &env, 300, 200)?;

        assert_eq!(georef.origin(), Point::new(0.0, 2000.0));
        assert_eq!(georef.resolution_x(), 10.0);
        assert_eq!(georef.resolution_y(), -10.0);
        assert_eq!(georef.origin_location(), OriginLocation::Center);

        assert!(matches!(
            GeoReference::create(OriginLocation::Outer, &env, 0, 200),
            Err(Error::Construction(_))
        ));
        Ok(())
    }

    #[test]
    fn merger() -> Result<()> {
        let merge = |res_a: (f64, f64), res_b: (f64, f64), origin_a: (f64, f64), origin_b: (f64, f64)| -> Result<GeoReference> {
            let a = GeoReference::new(OriginLocation::Outer, res_a.0, res_a.1, 2.0, 1.0, origin_a.0, origin_a.1, None)?;
            let b = GeoReference::new(OriginLocation::Outer, res_b.0, res_b.1, 2.0, 1.0, origin_b.0, origin_b.1, None)?;
            GeoReference::merger(&a, &b)
        };

        let merged = merge((5.0, -4.0), (2.0, -5.0), (1999.0, 1000.0), (2000.0, 999.0))?;
        assert_eq!(merged.origin(), Point::new(1999.0, 1000.0));
        assert_eq!((merged.resolution_x(), merged.resolution_y()), (2.0, -4.0));
        assert_eq!((merged.rotation_x(), merged.rotation_y()), (2.0, 1.0));

        let merged = merge((-5.0, 4.0), (-2.0, 5.0), (1999.0, 1000.0), (2000.0, 999.0))?;
        assert_eq!(merged.origin(), Point::new(2000.0, 999.0));
        assert_eq!((merged.resolution_x(), merged.resolution_y()), (-2.0, 4.0));

        let merged = merge((5.0, 4.0), (2.0, 5.0), (1999.0, 1000.0), (2000.0, 999.0))?;
        assert_eq!(merged.origin(), Point::new(1999.0, 999.0));
        assert_eq!((merged.resolution_x(), merged.resolution_y()), (2.0, 4.0));
        Ok(())
    }

    #[test]
    fn merger_relocates_second_reference() -> Result<()> {
        let merged = GeoReference::merger(&ref_outer(), &ref_center())?;
        assert_eq!(merged.origin_location(), OriginLocation::Outer);
        assert_relative_eq!(merged.origin(), Point::new(995.0, 1005.0));
        Ok(())
    }

    #[test]
    fn merger_is_idempotent() -> Result<()> {
        for georef in [
            ref_center(),
            ref_outer(),
            GeoReference::new(OriginLocation::Outer, 0.25, -0.5, 0.1, 0.2, 12.5, -3.75, Some(Crs::from_epsg(31466)))?,
        ] {
            assert_eq!(GeoReference::merger(&georef, &georef)?, georef);
        }
        Ok(())
    }

    #[test]
    fn relocated_reference() {
        let env = Envelope::from_bounds(1013.0, 955.0, 1040.0, 987.0);

        let center = ref_center().create_relocated_reference(None, &env);
        assert_eq!(center.origin_location(), OriginLocation::Center);
        assert_relative_eq!(center.origin(), Point::new(1010.0, 990.0));

        let outer = ref_outer().create_relocated_reference(None, &env);
        assert_relative_eq!(outer.origin(), Point::new(1010.0, 990.0));

        let switched = ref_outer().create_relocated_reference(Some(OriginLocation::Center), &env);
        assert_eq!(switched.origin_location(), OriginLocation::Center);
        assert_relative_eq!(switched.origin(), Point::new(1015.0, 985.0));

        let switched = ref_center().create_relocated_reference(Some(OriginLocation::Outer), &env);
        assert_eq!(switched.origin_location(), OriginLocation::Outer);
        assert_relative_eq!(switched.origin(), Point::new(1005.0, 995.0));
    }

    #[test]
    fn relocated_reference_keeps_grid() {
        let outer = ref_outer();
        let env = Envelope::from_bounds(1013.0, 955.0, 1040.0, 987.0);
        let relocated = outer.create_relocated_reference(None, &env);

        let world = relocated.world_coordinate(2.0, 1.0);
        assert_eq!(outer.raster_coordinate(world.x(), world.y()), (3, 2));
    }

    #[test]
    fn convention_round_trip() -> Result<()> {
        for georef in [
            ref_center(),
            ref_outer(),
            GeoReference::new(OriginLocation::Center, 0.3, -0.7, 0.05, 0.05, 123.456, 789.012, None)?,
        ] {
            let round_trip = georef
                .relocated_to(OriginLocation::Outer)
                .relocated_to(OriginLocation::Center)
                .relocated_to(georef.origin_location());
            assert_relative_eq!(round_trip.origin(), georef.origin(), epsilon = georef.delta());
        }
        Ok(())
    }

    #[test]
    fn relocate_envelope() {
        let env = Envelope::from_bounds(1000.0, 980.0, 1030.0, 1000.0);

        assert_eq!(ref_outer().relocate_envelope(OriginLocation::Outer, &env), env);
        assert_relative_eq!(
            ref_outer().relocate_envelope(OriginLocation::Center, &env),
            Envelope::from_bounds(1005.0, 975.0, 1035.0, 995.0),
            epsilon = 1e-9
        );
        assert_relative_eq!(
            ref_center().relocate_envelope(OriginLocation::Outer, &env),
            Envelope::from_bounds(995.0, 985.0, 1025.0, 1005.0),
            epsilon = 1e-9
        );
    }

    #[test]
    fn round_trip_raster_world_raster() -> Result<()> {
        let references = [
            ref_center(),
            ref_outer(),
            GeoReference::with_origin(OriginLocation::Outer, 0.1, -0.1, 3.3, 51.7, None)?,
            GeoReference::with_origin(OriginLocation::Center, 0.000_833_333_333_333_333, -0.000_833_333_333_333_333, -180.0, 90.0, None)?,
            GeoReference::with_origin(OriginLocation::Outer, 2.5, 3.0, -10.0, -20.0, None)?,
            GeoReference::new(OriginLocation::Outer, 2.0, -2.0, 0.1, 0.1, 500.0, 800.0, None)?,
            GeoReference::new(OriginLocation::Center, 2.0, -2.0, 0.1, 0.1, 500.0, 800.0, None)?,
        ];

        for georef in &references {
            for px in [-17i64, -1, 0, 1, 2, 99, 1000, 43199] {
                for py in [-3i64, 0, 1, 7, 5000, 21599] {
                    let world = georef.world_coordinate(px as f64, py as f64);
                    assert_eq!(georef.raster_coordinate(world.x(), world.y()), (px, py), "{georef} ({px}, {py})");
                }
            }
        }

        Ok(())
    }

    #[test]
    fn envelope_covers_requested_area() -> Result<()> {
        let references = [
            ref_center(),
            ref_outer(),
            GeoReference::with_origin(OriginLocation::Outer, 0.3, -0.3, 1.05, 2.15, None)?,
            GeoReference::with_origin(OriginLocation::Center, 0.3, -0.3, 1.05, 2.15, None)?,
        ];

        let envelopes = [
            Envelope::from_bounds(994.0, 995.0, 1016.0, 1014.0),
            Envelope::from_bounds(990.0, 980.0, 1020.0, 1010.0),
            Envelope::from_bounds(1003.3, 961.7, 1003.4, 961.8),
            Envelope::from_bounds(-12.34, -56.78, 13.57, 24.68),
            Envelope::from_bounds(5.0, 5.0, 5.0, 5.0),
        ];

        for georef in &references {
            for env in &envelopes {
                let rect = georef.convert_envelope_to_raster_crs(env);
                let covered = georef.envelope(OriginLocation::Outer, &rect, None);
                assert!(
                    covered.contains_with_tolerance(env, georef.delta()),
                    "{georef}: {covered} does not cover {env} (rect {rect})"
                );
            }
        }

        Ok(())
    }

    #[test]
    fn footprint_converts_back_to_same_rect() -> Result<()> {
        for georef in [ref_center(), ref_outer()] {
            for rect in [RasterRect::new(0, 0, 3, 2), RasterRect::new(4, 2, 3, 2), RasterRect::new(-5, 7, 1, 1)] {
                let footprint = georef.pixel_footprint(&rect);
                assert_eq!(georef.convert_envelope_to_raster_crs(&footprint), rect, "{georef}");
            }
        }
        Ok(())
    }

    #[test_log::test]
    fn reprojection_of_requested_envelope() -> Result<()> {
        let own = Crs::new("EPSG:1");
        let other = Crs::new("EPSG:2");
        let georef = GeoReference::with_origin(OriginLocation::Outer, 10.0, -10.0, 1000.0, 1000.0, Some(own.clone()))?
            .with_transformer(Arc::new(ShiftTransformer::new(other.clone(), own.clone(), 1000.0, 1000.0)));

        // (0, -20) - (30, 0) in the other system is (1000, 980) - (1030, 1000) in the own one
        let env = Envelope::from_bounds(0.0, -20.0, 30.0, 0.0).with_crs(Some(other.clone()));
        assert_eq!(georef.convert_envelope_to_raster_crs(&env), RasterRect::new(0, 0, 3, 2));

        let back = georef.envelope(OriginLocation::Outer, &RasterRect::new(0, 0, 3, 2), Some(&other));
        assert_relative_eq!(back, env, epsilon = 1e-9);
        Ok(())
    }

    #[test_log::test]
    fn failed_reprojection_keeps_envelope() -> Result<()> {
        let own = Crs::new("EPSG:1");
        let georef = GeoReference::with_origin(OriginLocation::Outer, 10.0, -10.0, 1000.0, 1000.0, Some(own.clone()))?
            .with_transformer(Arc::new(ShiftTransformer::new(Crs::new("EPSG:7"), own, 1.0, 1.0)));

        let env = Envelope::from_bounds(1000.0, 980.0, 1030.0, 1000.0).with_crs(Some(Crs::new("EPSG:2")));
        assert_eq!(georef.convert_envelope_to_raster_crs(&env), RasterRect::new(0, 0, 3, 2));
        Ok(())
    }

    #[test]
    fn imprecision_removal() {
        assert_eq!(remove_raster_imprecision(0.0), 0.0);
        assert_eq!(remove_raster_imprecision(25.6), 25.6);
        assert_eq!(remove_raster_imprecision(25.599_999_999_998), 25.6);
        assert_eq!(remove_raster_imprecision(2.999_999_999_999_999_6), 3.0);
        assert_eq!(remove_raster_imprecision(-0.500_000_000_001), -0.5);
        assert_eq!(remove_raster_imprecision(1.25e20), 1.25e20);

        assert_eq!(world_accuracy(2e-5), Some(1e6));
        assert_eq!(world_accuracy(2e-6), Some(1e7));
        assert_eq!(world_accuracy(50.0), None);
    }
}

//! World space bounding boxes.

use std::fmt;

use approx::{AbsDiffEq, RelativeEq};

use crate::{Crs, Point};

/// Axis aligned world space bounding box with an optional coordinate system
#[derive(Debug, Clone, PartialEq)]
pub struct Envelope {
    min: Point,
    max: Point,
    crs: Option<Crs>,
}

/// Result of intersecting two envelopes.
/// `Point` and `Curve` are degenerate results that carry no pixel area.
#[derive(Debug, Clone, PartialEq)]
pub enum Geometry {
    Point(Point),
    /// Zero area segment, stored as an envelope with one zero span
    Curve(Envelope),
    Area(Envelope),
}

impl Geometry {
    pub fn is_area(&self) -> bool {
        matches!(self, Geometry::Area(_))
    }

    pub fn into_area(self) -> Option<Envelope> {
        match self {
            Geometry::Area(env) => Some(env),
            Geometry::Point(_) | Geometry::Curve(_) => None,
        }
    }
}

impl Envelope {
    /// Creates an envelope from two corner points, the corners are normalized so `min <= max`
    pub fn new(p1: Point, p2: Point) -> Self {
        Envelope {
            min: Point::new(p1.x().min(p2.x()), p1.y().min(p2.y())),
            max: Point::new(p1.x().max(p2.x()), p1.y().max(p2.y())),
            crs: None,
        }
    }

    pub fn from_bounds(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Self {
        Envelope::new(Point::new(min_x, min_y), Point::new(max_x, max_y))
    }

    pub fn with_crs(mut self, crs: Option<Crs>) -> Self {
        self.crs = crs;
        self
    }

    pub fn min(&self) -> Point {
        self.min
    }

    pub fn max(&self) -> Point {
        self.max
    }

    pub fn crs(&self) -> Option<&Crs> {
        self.crs.as_ref()
    }

    /// Extent along axis 0 (x) or axis 1 (y)
    pub fn span(&self, axis: usize) -> f64 {
        match axis {
            0 => self.span0(),
            _ => self.span1(),
        }
    }

    pub fn span0(&self) -> f64 {
        self.max.x() - self.min.x()
    }

    pub fn span1(&self) -> f64 {
        self.max.y() - self.min.y()
    }

    pub fn contains_point(&self, point: &Point) -> bool {
        point.x() >= self.min.x() && point.x() <= self.max.x() && point.y() >= self.min.y() && point.y() <= self.max.y()
    }

    /// True if `other` lies completely inside this envelope, shared boundaries are allowed
    pub fn contains(&self, other: &Envelope) -> bool {
        self.contains_with_tolerance(other, 0.0)
    }

    pub fn contains_with_tolerance(&self, other: &Envelope, tolerance: f64) -> bool {
        other.min.x() >= self.min.x() - tolerance
            && other.min.y() >= self.min.y() - tolerance
            && other.max.x() <= self.max.x() + tolerance
            && other.max.y() <= self.max.y() + tolerance
    }

    /// True if both envelopes share at least one point, touching boundaries included
    pub fn intersects(&self, other: &Envelope) -> bool {
        self.min.x() <= other.max.x() && self.max.x() >= other.min.x() && self.min.y() <= other.max.y() && self.max.y() >= other.min.y()
    }

    /// The shared part of both envelopes, tagged with this envelope's coordinate system
    pub fn intersection(&self, other: &Envelope) -> Option<Geometry> {
        if !self.intersects(other) {
            return None;
        }

        let min = Point::new(self.min.x().max(other.min.x()), self.min.y().max(other.min.y()));
        let max = Point::new(self.max.x().min(other.max.x()), self.max.y().min(other.max.y()));
        let env = Envelope {
            min,
            max,
            crs: self.crs.clone(),
        };

        Some(match (env.span0() > 0.0, env.span1() > 0.0) {
            (true, true) => Geometry::Area(env),
            (false, false) => Geometry::Point(min),
            _ => Geometry::Curve(env),
        })
    }

    /// Smallest envelope containing both, keeps this envelope's coordinate system
    pub fn union(&self, other: &Envelope) -> Envelope {
        Envelope {
            min: Point::new(self.min.x().min(other.min.x()), self.min.y().min(other.min.y())),
            max: Point::new(self.max.x().max(other.max.x()), self.max.y().max(other.max.y())),
            crs: self.crs.clone().or_else(|| other.crs.clone()),
        }
    }
}

impl fmt::Display for Envelope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[({}, {}) - ({}, {})]", self.min.x(), self.min.y(), self.max.x(), self.max.y())?;
        if let Some(crs) = &self.crs {
            write!(f, " {crs}")?;
        }

        Ok(())
    }
}

impl AbsDiffEq for Envelope {
    type Epsilon = f64;

    fn default_epsilon() -> Self::Epsilon {
        f64::default_epsilon()
    }

    fn abs_diff_eq(&self, other: &Self, epsilon: Self::Epsilon) -> bool {
        self.crs == other.crs && self.min.abs_diff_eq(&other.min, epsilon) && self.max.abs_diff_eq(&other.max, epsilon)
    }
}

impl RelativeEq for Envelope {
    fn default_max_relative() -> Self::Epsilon {
        f64::default_max_relative()
    }

    fn relative_eq(&self, other: &Self, epsilon: Self::Epsilon, max_relative: Self::Epsilon) -> bool {
        self.crs == other.crs
            && Point::relative_eq(&self.min, &other.min, epsilon, max_relative)
            && Point::relative_eq(&self.max, &other.max, epsilon, max_relative)
    }
}

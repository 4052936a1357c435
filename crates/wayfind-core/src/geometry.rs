//! Minimal geometry model: points, envelopes and polygons in one of two
//! spatial references.
//!
//! Only what the workflow needs is here: extents, unions of extents, and
//! projection between geographic (WGS84) and Web Mercator coordinates so
//! results from different sources can share one extent.

use std::f64::consts::PI;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Half the circumference of the Web Mercator world, in meters.
const MERCATOR_HALF_EXTENT: f64 = 20_037_508.342_789_244;

/// Latitude beyond which Web Mercator is undefined.
const MERCATOR_MAX_LATITUDE: f64 = 85.051_128_779_806_59;

/// Spatial reference of a coordinate pair.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum SpatialReference {
    /// Geographic longitude/latitude (wkid 4326)
    #[default]
    Wgs84,
    /// Web Mercator auxiliary sphere (wkid 3857)
    WebMercator,
}

impl SpatialReference {
    /// Well-known ID of this reference.
    pub fn wkid(self) -> u32 {
        match self {
            Self::Wgs84 => 4326,
            Self::WebMercator => 3857,
        }
    }

    /// Looks up a spatial reference by well-known ID.
    ///
    /// 102100 is the legacy Esri code for Web Mercator and is accepted too.
    pub fn from_wkid(wkid: u32) -> Option<Self> {
        match wkid {
            4326 => Some(Self::Wgs84),
            3857 | 102100 | 102113 => Some(Self::WebMercator),
            _ => None,
        }
    }
}

/// A single location.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
    #[serde(default)]
    pub spatial_reference: SpatialReference,
}

impl Point {
    pub fn new(x: f64, y: f64, spatial_reference: SpatialReference) -> Self {
        Self {
            x,
            y,
            spatial_reference,
        }
    }

    /// Geographic point from longitude and latitude.
    pub fn wgs84(lon: f64, lat: f64) -> Self {
        Self::new(lon, lat, SpatialReference::Wgs84)
    }

    /// Returns this point expressed in `target`.
    pub fn project(&self, target: SpatialReference) -> Point {
        match (self.spatial_reference, target) {
            (a, b) if a == b => *self,
            (SpatialReference::Wgs84, SpatialReference::WebMercator) => {
                let lat = self.y.clamp(-MERCATOR_MAX_LATITUDE, MERCATOR_MAX_LATITUDE);
                let x = self.x * MERCATOR_HALF_EXTENT / 180.0;
                let y = ((90.0 + lat) * PI / 360.0).tan().ln() / (PI / 180.0);
                Point::new(
                    x,
                    y * MERCATOR_HALF_EXTENT / 180.0,
                    SpatialReference::WebMercator,
                )
            }
            (SpatialReference::WebMercator, SpatialReference::Wgs84) => {
                let lon = self.x * 180.0 / MERCATOR_HALF_EXTENT;
                let lat = (self.y * PI / MERCATOR_HALF_EXTENT).exp().atan() * 360.0 / PI - 90.0;
                Point::wgs84(lon, lat)
            }
            _ => *self,
        }
    }

    /// Planar distance in the units of this point's spatial reference.
    pub fn distance_to(&self, other: &Point) -> f64 {
        let other = other.project(self.spatial_reference);
        ((self.x - other.x).powi(2) + (self.y - other.y).powi(2)).sqrt()
    }
}

impl fmt::Display for Point {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "({:.6}, {:.6}) [wkid {}]",
            self.x,
            self.y,
            self.spatial_reference.wkid()
        )
    }
}

/// Axis-aligned bounding rectangle.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Envelope {
    pub xmin: f64,
    pub ymin: f64,
    pub xmax: f64,
    pub ymax: f64,
    #[serde(default)]
    pub spatial_reference: SpatialReference,
}

impl Envelope {
    /// Creates an envelope, normalising the corner order.
    pub fn new(x1: f64, y1: f64, x2: f64, y2: f64, spatial_reference: SpatialReference) -> Self {
        Self {
            xmin: x1.min(x2),
            ymin: y1.min(y2),
            xmax: x1.max(x2),
            ymax: y1.max(y2),
            spatial_reference,
        }
    }

    /// Degenerate envelope covering a single point.
    pub fn from_point(point: &Point) -> Self {
        Self::new(point.x, point.y, point.x, point.y, point.spatial_reference)
    }

    /// Bounding envelope of a set of points, projected into the reference of
    /// the first one. `None` for an empty iterator.
    pub fn from_points<'a>(points: impl IntoIterator<Item = &'a Point>) -> Option<Self> {
        let mut iter = points.into_iter();
        let first = Self::from_point(iter.next()?);
        Some(iter.fold(first, |acc, p| acc.union(&Self::from_point(p))))
    }

    pub fn width(&self) -> f64 {
        self.xmax - self.xmin
    }

    pub fn height(&self) -> f64 {
        self.ymax - self.ymin
    }

    pub fn center(&self) -> Point {
        Point::new(
            (self.xmin + self.xmax) / 2.0,
            (self.ymin + self.ymax) / 2.0,
            self.spatial_reference,
        )
    }

    /// Returns this envelope expressed in `target` (corners projected).
    pub fn project(&self, target: SpatialReference) -> Envelope {
        if self.spatial_reference == target {
            return *self;
        }
        let lower = Point::new(self.xmin, self.ymin, self.spatial_reference).project(target);
        let upper = Point::new(self.xmax, self.ymax, self.spatial_reference).project(target);
        Envelope::new(lower.x, lower.y, upper.x, upper.y, target)
    }

    /// Smallest envelope covering both; result is in this envelope's reference.
    pub fn union(&self, other: &Envelope) -> Envelope {
        let other = other.project(self.spatial_reference);
        Envelope {
            xmin: self.xmin.min(other.xmin),
            ymin: self.ymin.min(other.ymin),
            xmax: self.xmax.max(other.xmax),
            ymax: self.ymax.max(other.ymax),
            spatial_reference: self.spatial_reference,
        }
    }

    pub fn contains(&self, point: &Point) -> bool {
        let p = point.project(self.spatial_reference);
        p.x >= self.xmin && p.x <= self.xmax && p.y >= self.ymin && p.y <= self.ymax
    }

    /// Grows the envelope on every side by `ratio` of its size.
    ///
    /// A degenerate (single point) envelope is grown by `min_size` instead so
    /// that a viewpoint on one result is still a usable area.
    pub fn expand_by_ratio(&self, ratio: f64, min_size: f64) -> Envelope {
        let dx = (self.width() * ratio).max(min_size / 2.0);
        let dy = (self.height() * ratio).max(min_size / 2.0);
        Envelope {
            xmin: self.xmin - dx,
            ymin: self.ymin - dy,
            xmax: self.xmax + dx,
            ymax: self.ymax + dy,
            spatial_reference: self.spatial_reference,
        }
    }
}

impl fmt::Display for Envelope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{:.6}, {:.6}, {:.6}, {:.6}] [wkid {}]",
            self.xmin,
            self.ymin,
            self.xmax,
            self.ymax,
            self.spatial_reference.wkid()
        )
    }
}

/// Geometry attached to a result.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Geometry {
    Point(Point),
    /// Rings of vertices; the first ring is the outer boundary.
    Polygon { rings: Vec<Vec<Point>> },
    Envelope(Envelope),
}

impl Geometry {
    /// Bounding envelope; `None` only for a polygon without vertices.
    pub fn extent(&self) -> Option<Envelope> {
        match self {
            Geometry::Point(p) => Some(Envelope::from_point(p)),
            Geometry::Polygon { rings } => Envelope::from_points(rings.iter().flatten()),
            Geometry::Envelope(e) => Some(*e),
        }
    }

    /// Representative location: the point itself, or the extent center.
    pub fn anchor(&self) -> Option<Point> {
        match self {
            Geometry::Point(p) => Some(*p),
            other => other.extent().map(|e| e.center()),
        }
    }
}

impl From<Point> for Geometry {
    fn from(point: Point) -> Self {
        Geometry::Point(point)
    }
}

impl From<Envelope> for Geometry {
    fn from(envelope: Envelope) -> Self {
        Geometry::Envelope(envelope)
    }
}

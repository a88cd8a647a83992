use std::fmt;

use geo::{coord, Intersects, Point, Rect};
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct BoundingRegion {
    pub west: f64,
    pub north: f64,
    pub east: f64,
    pub south: f64,
}

impl Default for BoundingRegion {
    // Columbia, Missouri and its immediate surroundings
    fn default() -> Self {
        Self {
            west: -92.50,
            north: 39.08,
            east: -92.18,
            south: 38.84,
        }
    }
}

impl BoundingRegion {
    pub fn rect(&self) -> Rect {
        Rect::new(
            coord! { x: self.west, y: self.south },
            coord! { x: self.east, y: self.north },
        )
    }

    pub fn contains(&self, point: &Point) -> bool {
        point.x().is_finite() && point.y().is_finite() && self.rect().intersects(point)
    }

    pub fn viewbox(&self) -> String {
        format!("{},{},{},{}", self.west, self.north, self.east, self.south)
    }

    pub fn overpass_bbox(&self) -> String {
        format!("{},{},{},{}", self.south, self.west, self.north, self.east)
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub lat: Option<f64>,
    pub lon: Option<f64>,
}

impl Coordinate {
    pub fn point(&self) -> Option<Point> {
        match (self.lat, self.lon) {
            (Some(lat), Some(lon)) => Some(Point::new(lon, lat)),
            _ => None,
        }
    }

    pub fn is_resolved(&self) -> bool {
        self.point().is_some()
    }
}

impl From<Option<Point>> for Coordinate {
    fn from(point: Option<Point>) -> Self {
        match point {
            Some(p) => Self {
                lat: Some(p.y()),
                lon: Some(p.x()),
            },
            None => Self::default(),
        }
    }
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.lat, self.lon) {
            (Some(lat), Some(lon)) => write!(f, "{lat:.6},{lon:.6}"),
            _ => write!(f, "None,None"),
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum OsmId {
    Node(u64),
    Way(u64),
    Relation(u64),
}

impl OsmId {
    pub fn link(&self) -> String {
        match self {
            Self::Node(x) => format!("https://www.openstreetmap.org/node/{x}"),
            Self::Way(x) => format!("https://www.openstreetmap.org/way/{x}"),
            Self::Relation(x) => format!("https://www.openstreetmap.org/relation/{x}"),
        }
    }
}

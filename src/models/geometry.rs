//! Boundary geometry for country-level entries.
//!
//! Stored in GeoJSON layout: `{"type": "Polygon" | "MultiPolygon", "coordinates": ...}`
//! with positions in `[lng, lat]` order.

use geo::{Centroid, LineString, MultiPolygon, Polygon};
use serde::{Deserialize, Serialize};

use super::poi::Coordinates;

pub type Position = [f64; 2];
pub type Ring = Vec<Position>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "coordinates")]
pub enum Geometry {
    Polygon(Vec<Ring>),
    MultiPolygon(Vec<Vec<Ring>>),
}

fn to_polygon(rings: &[Ring]) -> Option<Polygon<f64>> {
    let (exterior, interiors) = rings.split_first()?;
    if exterior.is_empty() {
        return None;
    }
    let interiors = interiors
        .iter()
        .filter(|ring| !ring.is_empty())
        .map(|ring| LineString::from(ring.clone()))
        .collect();
    Some(Polygon::new(LineString::from(exterior.clone()), interiors))
}

impl Geometry {
    fn to_multi_polygon(&self) -> MultiPolygon<f64> {
        let polygons = match self {
            Geometry::Polygon(rings) => to_polygon(rings).into_iter().collect(),
            Geometry::MultiPolygon(parts) => {
                parts.iter().filter_map(|rings| to_polygon(rings)).collect()
            }
        };
        MultiPolygon::new(polygons)
    }

    /// Area-weighted centroid of the shape. Each part of a multipolygon
    /// contributes in proportion to its area and holes are subtracted, so small
    /// islands barely move the result.
    pub fn centroid(&self) -> Option<Coordinates> {
        let point = self.to_multi_polygon().centroid()?;
        let coordinates = Coordinates {
            lat: point.y(),
            lng: point.x(),
        };
        coordinates.is_valid().then_some(coordinates)
    }

    /// Thins long rings by keeping every 2nd point above 100 points and every
    /// 3rd point above 50. Shorter rings are untouched.
    pub fn decimated(&self) -> Geometry {
        match self {
            Geometry::Polygon(rings) => Geometry::Polygon(rings.iter().map(|r| decimate(r)).collect()),
            Geometry::MultiPolygon(parts) => Geometry::MultiPolygon(
                parts
                    .iter()
                    .map(|rings| rings.iter().map(|r| decimate(r)).collect())
                    .collect(),
            ),
        }
    }
}

fn decimate(ring: &[Position]) -> Ring {
    let step = match ring.len() {
        n if n > 100 => 2,
        n if n > 50 => 3,
        _ => 1,
    };
    ring.iter().step_by(step).copied().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square(x: f64, y: f64, size: f64) -> Ring {
        vec![
            [x, y],
            [x + size, y],
            [x + size, y + size],
            [x, y + size],
            [x, y],
        ]
    }

    /// A tiny square traced with many vertices, to punish vertex averaging.
    fn dense_square(x: f64, y: f64, size: f64, per_side: usize) -> Ring {
        let mut ring = Vec::new();
        let corners = [[x, y], [x + size, y], [x + size, y + size], [x, y + size]];
        for i in 0..4 {
            let [ax, ay] = corners[i];
            let [bx, by] = corners[(i + 1) % 4];
            for step in 0..per_side {
                let t = step as f64 / per_side as f64;
                ring.push([ax + (bx - ax) * t, ay + (by - ay) * t]);
            }
        }
        ring.push([x, y]);
        ring
    }

    #[test]
    fn polygon_centroid_is_center_of_square() {
        let geometry = Geometry::Polygon(vec![square(0.0, 0.0, 10.0)]);
        let c = geometry.centroid().unwrap();
        assert!((c.lng - 5.0).abs() < 1e-9);
        assert!((c.lat - 5.0).abs() < 1e-9);
    }

    #[test]
    fn multipolygon_centroid_stays_in_large_landmass() {
        let geometry = Geometry::MultiPolygon(vec![
            vec![square(0.0, 0.0, 10.0)],
            vec![dense_square(40.0, 40.0, 0.1, 200)],
        ]);

        let c = geometry.centroid().unwrap();
        assert!(c.lng > 0.0 && c.lng < 10.0, "lng {} escaped landmass", c.lng);
        assert!(c.lat > 0.0 && c.lat < 10.0, "lat {} escaped landmass", c.lat);
        assert!((c.lng - 5.0).abs() < 0.01);
    }

    #[test]
    fn holes_shift_the_centroid() {
        let mut hole = square(0.0, 0.0, 5.0);
        hole.reverse();
        let geometry = Geometry::Polygon(vec![square(0.0, 0.0, 10.0), hole]);
        let c = geometry.centroid().unwrap();
        assert!(c.lng > 5.0 && c.lat > 5.0);
    }

    #[test]
    fn empty_geometry_has_no_centroid() {
        assert!(Geometry::MultiPolygon(vec![]).centroid().is_none());
        assert!(Geometry::Polygon(vec![vec![]]).centroid().is_none());
    }

    #[test]
    fn geometry_uses_geojson_layout() {
        let json = r#"{"type":"Polygon","coordinates":[[[0,0],[1,0],[1,1],[0,0]]]}"#;
        let geometry: Geometry = serde_json::from_str(json).unwrap();
        assert!(matches!(geometry, Geometry::Polygon(ref rings) if rings[0].len() == 4));
    }

    #[test]
    fn decimation_thins_only_long_rings() {
        let long = dense_square(0.0, 0.0, 1.0, 30);
        let geometry = Geometry::Polygon(vec![long.clone(), square(0.0, 0.0, 1.0)]);
        let Geometry::Polygon(rings) = geometry.decimated() else {
            panic!("shape changed");
        };
        assert_eq!(rings[0].len(), (long.len() + 1) / 2);
        assert_eq!(rings[1].len(), 5);
    }
}

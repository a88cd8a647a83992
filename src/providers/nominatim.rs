use geo::Point;
use serde::Deserialize;

use crate::{config::Config, model::BoundingRegion, strategy::Target};

use super::{with_locality, Client, Geocoder, ProviderError};

pub struct Nominatim {
    client: Client,
    url: String,
    region: BoundingRegion,
    locality: String,
    suffix: String,
}

impl Nominatim {
    pub fn new(client: Client, config: &Config) -> Self {
        Self {
            client,
            url: config.endpoints.nominatim.clone(),
            region: config.region,
            locality: config.locality.name.clone(),
            suffix: config.locality.suffix.clone(),
        }
    }

    fn search(&self, q: &str, bounded: bool) -> Result<Option<Point>, ProviderError> {
        let viewbox = self.region.viewbox();
        let mut params = vec![("q", q), ("format", "json")];
        if bounded {
            params.extend([("limit", "1"), ("viewbox", viewbox.as_str()), ("bounded", "1")]);
        } else {
            params.push(("limit", "5"));
        }

        let places: Vec<Place> = self.client.get_json(&self.url, &params)?;
        best_match(&places, &self.region)
    }
}

impl Geocoder for Nominatim {
    fn lookup(&self, target: &Target) -> Result<Option<Point>, ProviderError> {
        let Target::Search(text) = target else {
            return Err(ProviderError::Unsupported {
                provider: "nominatim",
                target: target.text(),
            });
        };

        let q = with_locality(text, &self.locality, &self.suffix);
        let bounded = self.search(&q, true)?;
        if bounded.is_some_and(|x| self.region.contains(&x)) {
            return Ok(bounded);
        }

        // out-of-region answers still go to the resolver
        Ok(match (bounded, self.search(&q, false)?) {
            (_, Some(x)) if self.region.contains(&x) => Some(x),
            (bounded, unbounded) => bounded.or(unbounded),
        })
    }
}

// nominatim sends coordinates as strings
#[derive(Debug, Deserialize)]
struct Place {
    lat: String,
    lon: String,
}

impl Place {
    fn point(&self) -> Result<Point, ProviderError> {
        let lat: f64 = self
            .lat
            .parse()
            .map_err(|e| ProviderError::Malformed(format!("invalid lat {:?}: {e}", self.lat)))?;
        let lon: f64 = self
            .lon
            .parse()
            .map_err(|e| ProviderError::Malformed(format!("invalid lon {:?}: {e}", self.lon)))?;
        Ok(Point::new(lon, lat))
    }
}

// first place inside the region, else the first place at all
fn best_match(places: &[Place], region: &BoundingRegion) -> Result<Option<Point>, ProviderError> {
    let points = places
        .iter()
        .map(Place::point)
        .collect::<Result<Vec<_>, _>>()?;
    Ok(points
        .iter()
        .find(|x| region.contains(x))
        .or(points.first())
        .copied())
}

#[cfg(test)]
mod tests {
    use super::*;

    const RESPONSE: &str = r#"[
        {
            "place_id": 297155129,
            "licence": "Data © OpenStreetMap contributors, ODbL 1.0. http://osm.org/copyright",
            "osm_type": "way",
            "osm_id": 19187464,
            "lat": "39.7392364",
            "lon": "-104.984862",
            "display_name": "East Broadway, Denver"
        },
        {
            "place_id": 297155130,
            "osm_type": "way",
            "osm_id": 19187465,
            "lat": "38.9517053",
            "lon": "-92.3290573",
            "display_name": "East Broadway, Columbia, Boone County, Missouri, United States"
        }
    ]"#;

    #[test]
    fn keeps_first_place_inside_region() {
        let places: Vec<Place> = serde_json::from_str(RESPONSE).unwrap();
        let point = best_match(&places, &BoundingRegion::default()).unwrap();
        assert_eq!(point, Some(Point::new(-92.3290573, 38.9517053)));
    }

    #[test]
    fn place_outside_region_is_passed_on() {
        let places: Vec<Place> = serde_json::from_str(RESPONSE).unwrap();
        let region = BoundingRegion::default();
        let point = best_match(&places[..1], &region).unwrap();
        assert_eq!(point, Some(Point::new(-104.984862, 39.7392364)));
        assert!(!region.contains(&point.unwrap()));
        assert_eq!(best_match(&[], &region).unwrap(), None);
    }

    #[test]
    fn bad_coordinates_are_malformed() {
        let places: Vec<Place> = serde_json::from_str(r#"[{"lat": "north", "lon": "1"}]"#).unwrap();
        assert!(matches!(
            best_match(&places, &BoundingRegion::default()),
            Err(ProviderError::Malformed(_))
        ));
    }
}

use geo::Point;
use serde::Deserialize;

use crate::{config::Config, model::BoundingRegion, strategy::Target};

use super::{with_locality, Client, Geocoder, ProviderError};

const BENCHMARK: &str = "Public_AR_Current";

pub struct Census {
    client: Client,
    url: String,
    region: BoundingRegion,
    locality: String,
    suffix: String,
}

impl Census {
    pub fn new(client: Client, config: &Config) -> Self {
        Self {
            client,
            url: config.endpoints.census.clone(),
            region: config.region,
            locality: config.locality.name.clone(),
            suffix: config.locality.suffix.clone(),
        }
    }
}

impl Geocoder for Census {
    fn lookup(&self, target: &Target) -> Result<Option<Point>, ProviderError> {
        let Target::Address(address) = target else {
            return Err(ProviderError::Unsupported {
                provider: "census",
                target: target.text(),
            });
        };

        let address = with_locality(address, &self.locality, &self.suffix);
        let response: Response = self.client.get_json(
            &self.url,
            &[
                ("address", address.as_str()),
                ("benchmark", BENCHMARK),
                ("format", "json"),
            ],
        )?;
        Ok(response.best_match(&self.region))
    }
}

#[derive(Debug, Deserialize)]
struct Response {
    result: MatchResult,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MatchResult {
    #[serde(default)]
    address_matches: Vec<AddressMatch>,
}

#[derive(Debug, Deserialize)]
struct AddressMatch {
    coordinates: Coordinates,
}

#[derive(Debug, Deserialize)]
struct Coordinates {
    x: f64,
    y: f64,
}

impl Response {
    // first match inside the region, else the first match at all
    fn best_match(&self, region: &BoundingRegion) -> Option<Point> {
        let mut points = self
            .result
            .address_matches
            .iter()
            .map(|x| Point::new(x.coordinates.x, x.coordinates.y));
        let first = points.next()?;
        if region.contains(&first) {
            return Some(first);
        }
        points.find(|x| region.contains(x)).or(Some(first))
    }
}

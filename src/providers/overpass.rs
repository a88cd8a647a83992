use std::collections::BTreeMap;

use geo::{Centroid, MultiPoint, Point};
use itertools::Itertools;
use serde::Deserialize;

use crate::{
    config::Config,
    model::{BoundingRegion, OsmId},
    normalize::{highway_number, normalize_street_tokens, strip_directions, strip_street_type},
    strategy::Target,
};

use super::{Client, Geocoder, ProviderError};

const NAME_KEYS: &str = "^(name|ref)$";

pub struct Overpass {
    client: Client,
    url: String,
    region: BoundingRegion,
}

impl Overpass {
    pub fn new(client: Client, config: &Config) -> Self {
        Self {
            client,
            url: config.endpoints.overpass.clone(),
            region: config.region,
        }
    }

    fn query(&self, q: &str) -> Result<Vec<OsmElement>, ProviderError> {
        let payload = format!("[out:json][timeout:25]; {q}");
        let response: OverpassResponse = self
            .client
            .post_form_json(&self.url, &[("data", payload.as_str())])?;

        Ok(response
            .elements
            .into_iter()
            .filter_map(|x| x.refine())
            .filter(|x| self.region.contains(&x.point))
            .collect())
    }

    fn house_number(&self, number: u32, street: &str) -> Result<Option<Point>, ProviderError> {
        let elems = self.query(&house_number_query(number, street, &self.region))?;
        if let Some(x) = elems.first() {
            log::debug!("{number} {street} is {}", x.id.link());
        }
        Ok(elems.first().map(|x| x.point))
    }

    fn way_center(&self, street: &str) -> Result<Option<Point>, ProviderError> {
        let elems = self.query(&way_center_query(street, &self.region))?;
        let centers = MultiPoint::new(elems.iter().map(|x| x.point).collect());
        Ok(centers.centroid())
    }

    fn intersection(&self, a: &[String], b: &[String]) -> Result<Option<Point>, ProviderError> {
        for (a, b) in pattern_pairs(a, b) {
            let nodes = self.query(&intersection_query(&a, &b, &self.region))?;
            if let Some(x) = nodes.first() {
                log::debug!("{a} meets {b} at {}", x.id.link());
                return Ok(Some(x.point));
            }
        }
        Ok(None)
    }
}

impl Geocoder for Overpass {
    fn lookup(&self, target: &Target) -> Result<Option<Point>, ProviderError> {
        match target {
            Target::HouseNumber { number, street } => self.house_number(*number, street),
            Target::WayCenter { street } => self.way_center(street),
            Target::Intersection { a, b } => self.intersection(a, b),
            Target::Search(_) | Target::Address(_) => Err(ProviderError::Unsupported {
                provider: "overpass",
                target: target.text(),
            }),
        }
    }
}

fn literal(s: &str) -> String {
    let mut output = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '.' | '[' | ']' | '{' | '}' | '(' | ')' | '*' | '+' | '?' | '|' | '^' | '$' | '\\' => {
                output.push_str("\\\\");
                output.push(c);
            }
            '"' => output.push_str("\\\""),
            _ => output.push(c),
        }
    }
    output
}

fn alternation<'a>(names: impl IntoIterator<Item = &'a String>) -> String {
    names
        .into_iter()
        .filter(|x| !x.is_empty())
        .unique_by(|x| x.to_uppercase())
        .map(|x| literal(x))
        .join("|")
}

fn name_patterns(names: &[String]) -> Vec<String> {
    let stripped: Vec<_> = names.iter().map(|x| strip_directions(x)).collect();
    let expanded: Vec<_> = names.iter().map(|x| normalize_street_tokens(x)).collect();
    let stems: Vec<_> = expanded
        .iter()
        .map(|x| strip_street_type(&strip_directions(x)))
        .collect();

    let mut patterns = vec![
        format!("^({})$", alternation(names)),
        format!("^({})$", alternation(&stripped)),
        format!("^({})$", alternation(&expanded)),
        format!("(^| )({})( |$)", alternation(&stems)),
    ];
    if let Some(n) = names.iter().find_map(|x| highway_number(x)) {
        patterns.push(format!("(^|;) *((US|MO|I)[ -]?)?{n} *(;|$)"));
    }
    patterns
}

// the side with fewer pattern levels repeats its loosest one
fn pattern_pairs(a: &[String], b: &[String]) -> Vec<(String, String)> {
    let a = name_patterns(a);
    let b = name_patterns(b);
    (0..a.len().max(b.len()))
        .map(|i| (a[i.min(a.len() - 1)].clone(), b[i.min(b.len() - 1)].clone()))
        .unique()
        .collect()
}

fn intersection_query(a: &str, b: &str, region: &BoundingRegion) -> String {
    let bbox = region.overpass_bbox();
    format!(
        r#"
            way["highway"][~"{NAME_KEYS}"~"{a}",i]({bbox})->.a;
            way["highway"][~"{NAME_KEYS}"~"{b}",i]({bbox})->.b;
            node(w.a)(w.b);
            out;
        "#
    )
}

fn way_center_query(street: &str, region: &BoundingRegion) -> String {
    let bbox = region.overpass_bbox();
    let street = literal(street);
    format!(
        r#"
            way["highway"]["name"~"^{street}$",i]({bbox});
            out tags center;
        "#
    )
}

fn house_number_query(number: u32, street: &str, region: &BoundingRegion) -> String {
    let bbox = region.overpass_bbox();
    let street = literal(street);
    format!(
        r#"
            nwr["addr:housenumber"="{number}"]["addr:street"~"^{street}$",i]({bbox});
            out tags center;
        "#
    )
}

#[derive(Deserialize)]
struct OverpassResponse {
    elements: Vec<RawElement>,
}

#[derive(Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
enum RawElement {
    Node {
        id: u64,
        #[serde(flatten)]
        center: RawPosition,
        #[serde(default)]
        tags: BTreeMap<String, String>,
    },
    Way {
        id: u64,
        center: Option<RawPosition>,
        #[serde(default)]
        tags: BTreeMap<String, String>,
    },
    Relation {
        id: u64,
        center: Option<RawPosition>,
        #[serde(default)]
        tags: BTreeMap<String, String>,
    },
}

impl RawElement {
    fn refine(self) -> Option<OsmElement> {
        Some(match self {
            Self::Node { id, center, tags } => OsmElement {
                id: OsmId::Node(id),
                point: center.refine(),
                tags,
            },
            Self::Way { id, center, tags } => OsmElement {
                id: OsmId::Way(id),
                point: center?.refine(),
                tags,
            },
            Self::Relation { id, center, tags } => OsmElement {
                id: OsmId::Relation(id),
                point: center?.refine(),
                tags,
            },
        })
    }
}

#[derive(Deserialize)]
struct RawPosition {
    lat: f64,
    lon: f64,
}

impl RawPosition {
    fn refine(self) -> Point {
        Point::new(self.lon, self.lat)
    }
}

struct OsmElement {
    id: OsmId,
    point: Point,
    #[allow(dead_code)]
    tags: BTreeMap<String, String>,
}

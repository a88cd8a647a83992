use geo::Point;
use serde::Serialize;

use crate::{
    cache::{cache_key, PersistentCache},
    config::Config,
    model::{BoundingRegion, Coordinate},
    providers::Providers,
    strategy::{plan, CandidateQuery, Label, ProviderKind},
};

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Outcome {
    Found { lat: f64, lon: f64 },
    NotFound,
    OutOfRegion { lat: f64, lon: f64 },
    Error { message: String },
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Attempt {
    pub label: Label,
    pub provider: ProviderKind,
    pub query: String,
    pub outcome: Outcome,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct Trace {
    pub raw: String,
    pub key: String,
    pub cached: bool,
    pub attempts: Vec<Attempt>,
    pub winner: Option<Attempt>,
    pub point: Coordinate,
    pub errors: Vec<String>,
}

#[derive(Clone, Debug)]
pub struct Resolution {
    pub point: Option<Point>,
    pub trace: Trace,
}

#[derive(Clone, Debug)]
pub struct Policy {
    pub retry_failed_cache: bool,
    pub probe_offsets: Vec<u32>,
}

impl From<&Config> for Policy {
    fn from(config: &Config) -> Self {
        Self {
            retry_failed_cache: config.retry_failed_cache,
            probe_offsets: config.probe_offsets.clone(),
        }
    }
}

pub struct Resolver {
    providers: Providers,
    region: BoundingRegion,
    policy: Policy,
}

impl Resolver {
    pub fn new(providers: Providers, region: BoundingRegion, policy: Policy) -> Self {
        Self {
            providers,
            region,
            policy,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(Providers::live(config), config.region, config.into())
    }

    pub fn resolve(&self, raw: &str, cache: &PersistentCache) -> Resolution {
        let key = cache_key(raw);
        let mut trace = Trace {
            raw: raw.to_string(),
            key: key.clone(),
            ..Default::default()
        };
        if key.is_empty() {
            return Resolution { point: None, trace };
        }

        if let Some(cached) = cache.get(&key) {
            match cached.point() {
                Some(p) if self.region.contains(&p) => {
                    trace.cached = true;
                    trace.point = cached;
                    return Resolution {
                        point: Some(p),
                        trace,
                    };
                }
                Some(_) => log::debug!("{key}: cached point is outside the region"),
                None if !self.policy.retry_failed_cache => {
                    trace.cached = true;
                    return Resolution { point: None, trace };
                }
                None => {}
            }
        }

        let mut point = None;
        for candidate in plan(raw, &self.policy.probe_offsets) {
            let attempt = self.attempt(&candidate, &mut trace.errors);
            log::debug!("{candidate} => {:?}", attempt.outcome);

            if let Outcome::Found { lat, lon } = attempt.outcome {
                point = Some(Point::new(lon, lat));
                trace.winner = Some(attempt.clone());
                trace.attempts.push(attempt);
                break;
            }
            trace.attempts.push(attempt);
        }

        trace.point = point.into();
        cache.insert(key, trace.point);
        Resolution { point, trace }
    }

    fn attempt(&self, candidate: &CandidateQuery, errors: &mut Vec<String>) -> Attempt {
        let outcome = match self.providers.get(candidate.kind()).lookup(&candidate.target) {
            Ok(Some(p)) if self.region.contains(&p) => Outcome::Found {
                lat: p.y(),
                lon: p.x(),
            },
            Ok(Some(p)) => Outcome::OutOfRegion {
                lat: p.y(),
                lon: p.x(),
            },
            Ok(None) => Outcome::NotFound,
            Err(e) => {
                errors.push(format!("{candidate}: {e}"));
                Outcome::Error {
                    message: e.to_string(),
                }
            }
        };

        Attempt {
            label: candidate.label,
            provider: candidate.kind(),
            query: candidate.target.text(),
            outcome,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::{collections::HashMap, sync::Arc};

    use parking_lot::Mutex;

    use super::*;
    use crate::{
        providers::{Geocoder, ProviderError},
        strategy::Target,
    };

    const EAST_BROADWAY: (f64, f64) = (38.9517, -92.3241);
    const KANSAS_CITY: (f64, f64) = (39.0997, -94.5786);

    #[derive(Clone, Copy)]
    enum Answer {
        Hit(f64, f64),
        Fail,
    }

    #[derive(Clone, Default)]
    struct Mock {
        answers: HashMap<String, Answer>,
        calls: Arc<Mutex<Vec<String>>>,
    }

    impl Mock {
        fn answer(mut self, query: &str, answer: Answer) -> Self {
            self.answers.insert(query.to_string(), answer);
            self
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().clone()
        }
    }

    impl Geocoder for Mock {
        fn lookup(&self, target: &Target) -> Result<Option<Point>, ProviderError> {
            let text = target.text();
            self.calls.lock().push(text.clone());
            match self.answers.get(&text) {
                Some(Answer::Hit(lat, lon)) => Ok(Some(Point::new(*lon, *lat))),
                Some(Answer::Fail) => Err(ProviderError::Status(503)),
                None => Ok(None),
            }
        }
    }

    fn resolver(search: &Mock, address: &Mock, map_graph: &Mock, retry: bool) -> Resolver {
        Resolver::new(
            Providers::new(
                Box::new(search.clone()),
                Box::new(address.clone()),
                Box::new(map_graph.clone()),
            ),
            BoundingRegion::default(),
            Policy {
                retry_failed_cache: retry,
                probe_offsets: vec![0, 50, 99],
            },
        )
    }

    fn labels(trace: &Trace) -> Vec<Label> {
        trace.attempts.iter().map(|x| x.label).collect()
    }

    fn total_calls(mocks: &[&Mock]) -> usize {
        mocks.iter().map(|x| x.calls().len()).sum()
    }

    #[test]
    fn blank_input_makes_no_calls() {
        let search = Mock::default();
        let r = resolver(&search, &Mock::default(), &Mock::default(), true);
        let cache = PersistentCache::default();

        for raw in ["", "   "] {
            let resolution = r.resolve(raw, &cache);
            assert_eq!(resolution.point, None);
            assert!(resolution.trace.attempts.is_empty());
        }
        assert!(search.calls().is_empty());
        assert!(cache.is_empty());
    }

    #[test]
    fn block_address_probes_before_street_center() {
        let search = Mock::default();
        let address = Mock::default();
        let map_graph = Mock::default().answer(
            "East Broadway",
            Answer::Hit(EAST_BROADWAY.0, EAST_BROADWAY.1),
        );
        let r = resolver(&search, &address, &map_graph, true);
        let cache = PersistentCache::default();

        let resolution = r.resolve("1000 BLOCK E BROADWAY", &cache);
        let trace = &resolution.trace;

        assert_eq!(resolution.point, Some(Point::new(EAST_BROADWAY.1, EAST_BROADWAY.0)));
        assert_eq!(
            trace.winner.as_ref().map(|x| x.label),
            Some(Label::OverpassWayCenter)
        );
        assert_eq!(trace.attempts.last(), trace.winner.as_ref());
        assert_eq!(
            map_graph.calls(),
            vec![
                "1000 East Broadway",
                "1050 East Broadway",
                "1099 East Broadway",
                "East Broadway"
            ]
        );
        assert_eq!(address.calls()[..2], ["1000 E BROADWAY", "1000 East Broadway"]);

        let labels = labels(trace);
        let last_probe = labels
            .iter()
            .rposition(|x| *x == Label::CensusBlockToAddress)
            .unwrap();
        let first_no_block = labels.iter().position(|x| *x == Label::NoBlock).unwrap();
        assert!(last_probe < first_no_block);
        assert!(!labels.contains(&Label::Simplified));
        assert!(!labels.contains(&Label::FinalTrim));
    }

    #[test]
    fn intersection_search_wins_before_map_graph() {
        let search = Mock::default().answer(
            "West Sexton Road & McBaine Avenue",
            Answer::Hit(38.9562, -92.3401),
        );
        let map_graph = Mock::default();
        let r = resolver(&search, &Mock::default(), &map_graph, true);

        let resolution = r.resolve("W SEXTON RD/MCBAINE AVE", &PersistentCache::default());
        assert_eq!(
            resolution.trace.winner.as_ref().map(|x| x.label),
            Some(Label::Intersection)
        );
        assert!(map_graph.calls().is_empty());
    }

    #[test]
    fn intersection_falls_through_to_map_graph() {
        let search = Mock::default();
        let map_graph = Mock::default().answer(
            "West Sexton Road | Sexton Road | W SEXTON RD / McBaine Avenue | MCBAINE AVE",
            Answer::Hit(38.9562, -92.3401),
        );
        let r = resolver(&search, &Mock::default(), &map_graph, true);

        let resolution = r.resolve("W SEXTON RD/MCBAINE AVE", &PersistentCache::default());
        let labels = labels(&resolution.trace);
        assert_eq!(labels.last(), Some(&Label::OverpassIntersection));
        assert_eq!(
            labels.iter().filter(|x| **x == Label::Intersection).count(),
            4
        );
        assert!(resolution.point.is_some());
    }

    #[test]
    fn second_resolve_is_served_from_cache() {
        let search = Mock::default().answer("PLATTE ST", Answer::Hit(38.95, -92.33));
        let address = Mock::default();
        let map_graph = Mock::default();
        let r = resolver(&search, &address, &map_graph, true);
        let cache = PersistentCache::default();

        let first = r.resolve("PLATTE ST", &cache);
        let calls = total_calls(&[&search, &address, &map_graph]);
        let second = r.resolve("platte  st", &cache);

        assert_eq!(first.point, second.point);
        assert!(second.trace.cached);
        assert!(second.trace.attempts.is_empty());
        assert_eq!(total_calls(&[&search, &address, &map_graph]), calls);
    }

    #[test]
    fn cached_failure_is_kept_without_retry() {
        let search = Mock::default().answer("PLATTE ST", Answer::Hit(38.95, -92.33));
        let cache = PersistentCache::default();
        cache.insert("PLATTE ST".into(), Coordinate::default());

        let r = resolver(&search, &Mock::default(), &Mock::default(), false);
        let resolution = r.resolve("PLATTE ST", &cache);
        assert_eq!(resolution.point, None);
        assert!(resolution.trace.cached);
        assert!(resolution.trace.attempts.is_empty());
        assert!(search.calls().is_empty());

        let r = resolver(&search, &Mock::default(), &Mock::default(), true);
        let resolution = r.resolve("PLATTE ST", &cache);
        assert!(resolution.point.is_some());
        assert!(cache.get("PLATTE ST").is_some_and(|x| x.is_resolved()));
    }

    #[test]
    fn out_of_region_result_moves_on() {
        let search = Mock::default()
            .answer("1000 BLOCK E BROADWAY", Answer::Hit(KANSAS_CITY.0, KANSAS_CITY.1))
            .answer(
                "1000 Block East Broadway",
                Answer::Hit(EAST_BROADWAY.0, EAST_BROADWAY.1),
            );
        let r = resolver(&search, &Mock::default(), &Mock::default(), true);
        let cache = PersistentCache::default();

        let resolution = r.resolve("1000 BLOCK E BROADWAY", &cache);
        let trace = &resolution.trace;
        assert_eq!(
            trace.attempts[0].outcome,
            Outcome::OutOfRegion {
                lat: KANSAS_CITY.0,
                lon: KANSAS_CITY.1
            }
        );
        assert_eq!(trace.winner.as_ref().map(|x| x.label), Some(Label::Expanded));
        assert_eq!(
            cache.get("1000 BLOCK E BROADWAY").and_then(|x| x.lat),
            Some(EAST_BROADWAY.0)
        );
    }

    #[test]
    fn only_out_of_region_results_are_a_failure() {
        let search = Mock::default().answer("PLATTE ST", Answer::Hit(KANSAS_CITY.0, KANSAS_CITY.1));
        let r = resolver(&search, &Mock::default(), &Mock::default(), true);
        let cache = PersistentCache::default();

        let resolution = r.resolve("PLATTE ST", &cache);
        assert_eq!(resolution.point, None);
        assert_eq!(resolution.trace.winner, None);
        assert_eq!(cache.get("PLATTE ST"), Some(Coordinate::default()));
    }

    #[test]
    fn cached_point_outside_region_is_ignored() {
        let search = Mock::default().answer("PLATTE ST", Answer::Hit(38.95, -92.33));
        let cache = PersistentCache::default();
        cache.insert(
            "PLATTE ST".into(),
            Coordinate {
                lat: Some(KANSAS_CITY.0),
                lon: Some(KANSAS_CITY.1),
            },
        );

        let r = resolver(&search, &Mock::default(), &Mock::default(), false);
        let resolution = r.resolve("PLATTE ST", &cache);
        assert!(!resolution.trace.cached);
        assert_eq!(resolution.point, Some(Point::new(-92.33, 38.95)));
    }

    #[test]
    fn provider_errors_do_not_stop_resolution() {
        let search = Mock::default()
            .answer("1600-8D HANOVER BLVD", Answer::Fail)
            .answer("1600 HANOVER BLVD", Answer::Fail);
        let address = Mock::default().answer("1600 HANOVER BLVD", Answer::Hit(38.9638, -92.2889));
        let r = resolver(&search, &address, &Mock::default(), true);

        let resolution = r.resolve("1600-8D HANOVER BLVD", &PersistentCache::default());
        let trace = &resolution.trace;
        assert_eq!(trace.errors.len(), 2);
        assert_eq!(
            trace.attempts[0].outcome,
            Outcome::Error {
                message: "http status 503".into()
            }
        );
        assert_eq!(
            trace.winner.as_ref().map(|x| x.label),
            Some(Label::CensusAddress)
        );
    }

    #[test]
    fn nothing_found_is_cached_as_failure() {
        let search = Mock::default();
        let address = Mock::default();
        let map_graph = Mock::default();
        let r = resolver(&search, &address, &map_graph, true);
        let cache = PersistentCache::default();

        let resolution = r.resolve("NOWHERE LN", &cache);
        assert_eq!(resolution.point, None);
        assert_eq!(
            resolution.trace.attempts.len(),
            plan("NOWHERE LN", &[0, 50, 99]).len()
        );
        assert_eq!(
            total_calls(&[&search, &address, &map_graph]),
            resolution.trace.attempts.len()
        );
        assert_eq!(cache.get("NOWHERE LN"), Some(Coordinate::default()));
    }

    #[test]
    fn same_answers_same_trace() {
        let run = || {
            let search = Mock::default()
                .answer("1000 BLOCK E BROADWAY", Answer::Fail)
                .answer("1099 East Broadway", Answer::Hit(EAST_BROADWAY.0, EAST_BROADWAY.1));
            let r = resolver(&search, &Mock::default(), &Mock::default(), true);
            r.resolve("1000 BLOCK E BROADWAY", &PersistentCache::default())
                .trace
        };
        assert_eq!(run(), run());
        assert_eq!(
            serde_json::to_string(&run()).unwrap(),
            serde_json::to_string(&run()).unwrap()
        );
    }

    #[test]
    fn trace_serializes_outcomes() {
        let attempt = Attempt {
            label: Label::NoBlock,
            provider: ProviderKind::Search,
            query: "PLATTE ST".into(),
            outcome: Outcome::NotFound,
        };
        assert_eq!(
            serde_json::to_value(&attempt).unwrap(),
            serde_json::json!({
                "label": "no_block",
                "provider": "search",
                "query": "PLATTE ST",
                "outcome": {"kind": "not_found"}
            })
        );
    }
}

use std::{
    thread,
    time::{Duration, Instant},
};

use geo::Point;
use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use thiserror::Error;
use ureq::{Agent, AgentBuilder};

use crate::{
    config::Config,
    strategy::{ProviderKind, Target},
};

mod census;
mod nominatim;
mod overpass;

pub use census::Census;
pub use nominatim::Nominatim;
pub use overpass::Overpass;

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("{provider} cannot look up {target}")]
    Unsupported {
        provider: &'static str,
        target: String,
    },
    #[error("http status {0}")]
    Status(u16),
    #[error("transport failure: {0}")]
    Transport(String),
    #[error("malformed response: {0}")]
    Malformed(String),
}

impl From<ureq::Error> for ProviderError {
    fn from(e: ureq::Error) -> Self {
        match e {
            ureq::Error::Status(code, _) => Self::Status(code),
            ureq::Error::Transport(t) => Self::Transport(t.to_string()),
        }
    }
}

impl From<std::io::Error> for ProviderError {
    fn from(e: std::io::Error) -> Self {
        Self::Malformed(e.to_string())
    }
}

pub trait Geocoder: Send + Sync {
    // Ok(None) is a miss, Err is a provider failure
    fn lookup(&self, target: &Target) -> Result<Option<Point>, ProviderError>;
}

pub struct RateGate {
    interval: Duration,
    next: Mutex<Option<Instant>>,
}

impl RateGate {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            next: Mutex::new(None),
        }
    }

    pub fn wait(&self) {
        let mut next = self.next.lock();
        if let Some(at) = *next {
            let now = Instant::now();
            if at > now {
                thread::sleep(at - now);
            }
        }
        *next = Some(Instant::now() + self.interval);
    }
}

pub struct Client {
    agent: Agent,
    gate: RateGate,
}

impl Client {
    pub fn new(user_agent: &str, timeout: Duration, delay: Duration) -> Self {
        Self {
            agent: AgentBuilder::new()
                .timeout(timeout)
                .user_agent(user_agent)
                .build(),
            gate: RateGate::new(delay),
        }
    }

    pub fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, &str)],
    ) -> Result<T, ProviderError> {
        self.gate.wait();
        let mut request = self.agent.get(url);
        for (k, v) in query {
            request = request.query(k, v);
        }
        Ok(request.call()?.into_json()?)
    }

    pub fn post_form_json<T: DeserializeOwned>(
        &self,
        url: &str,
        form: &[(&str, &str)],
    ) -> Result<T, ProviderError> {
        self.gate.wait();
        Ok(self.agent.post(url).send_form(form)?.into_json()?)
    }
}

pub fn with_locality(query: &str, name: &str, suffix: &str) -> String {
    if query.to_uppercase().contains(&name.to_uppercase()) {
        query.to_string()
    } else {
        format!("{query}, {suffix}")
    }
}

pub struct Providers {
    search: Box<dyn Geocoder>,
    address: Box<dyn Geocoder>,
    map_graph: Box<dyn Geocoder>,
}

impl Providers {
    pub fn new(
        search: Box<dyn Geocoder>,
        address: Box<dyn Geocoder>,
        map_graph: Box<dyn Geocoder>,
    ) -> Self {
        Self {
            search,
            address,
            map_graph,
        }
    }

    pub fn live(config: &Config) -> Self {
        let client = || {
            Client::new(
                &config.user_agent,
                Duration::from_secs(config.timeout_secs),
                config.delay(),
            )
        };
        Self::new(
            Box::new(Nominatim::new(client(), config)),
            Box::new(Census::new(client(), config)),
            Box::new(Overpass::new(client(), config)),
        )
    }

    pub fn get(&self, kind: ProviderKind) -> &dyn Geocoder {
        match kind {
            ProviderKind::Search => self.search.as_ref(),
            ProviderKind::Address => self.address.as_ref(),
            ProviderKind::MapGraph => self.map_graph.as_ref(),
        }
    }
}

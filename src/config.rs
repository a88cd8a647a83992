use std::{
    fs,
    io::ErrorKind,
    path::{Path, PathBuf},
    time::Duration,
};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::model::BoundingRegion;

pub const DEFAULT_CONFIG_FILE_NAME: &str = "dispatch-geocoder.yaml";

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct Config {
    pub cache_path: PathBuf,
    pub output_path: PathBuf,
    pub unmapped_path: PathBuf,
    pub delay_secs: f64,
    pub retry_failed_cache: bool,
    pub timeout_secs: u64,
    pub jobs: usize,
    pub user_agent: String,
    pub region: BoundingRegion,
    pub locality: Locality,
    pub probe_offsets: Vec<u32>,
    pub endpoints: Endpoints,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            cache_path: "geocache.json".into(),
            output_path: "data.json".into(),
            unmapped_path: "unmapped.json".into(),
            delay_secs: 1.0,
            retry_failed_cache: true,
            timeout_secs: 30,
            jobs: 1,
            user_agent: concat!(
                "dispatch-geocoder/",
                env!("CARGO_PKG_VERSION"),
                " (Columbia MO dispatch map)"
            )
            .to_string(),
            region: BoundingRegion::default(),
            locality: Locality::default(),
            probe_offsets: vec![0, 50, 99],
            endpoints: Endpoints::default(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Locality {
    pub name: String,
    pub suffix: String,
}

impl Default for Locality {
    fn default() -> Self {
        Self {
            name: "Columbia".into(),
            suffix: "Columbia, MO, USA".into(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Endpoints {
    pub nominatim: String,
    pub census: String,
    pub overpass: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            nominatim: "https://nominatim.openstreetmap.org/search".into(),
            census: "https://geocoding.geo.census.gov/geocoder/locations/onelineaddress".into(),
            overpass: "https://overpass-api.de/api/interpreter".into(),
        }
    }
}

impl Config {
    pub fn load_or_default(file_path: Option<&Path>) -> Result<Self> {
        let file_path = file_path.unwrap_or_else(|| Path::new(DEFAULT_CONFIG_FILE_NAME));

        let config = match fs::read_to_string(file_path) {
            Ok(raw) => serde_yaml::from_str(&raw)
                .with_context(|| format!("invalid configuration in {}", file_path.display()))?,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                log::info!(
                    "{} not found => load default configuration.",
                    file_path.display()
                );
                Self::default()
            }
            Err(err) => {
                return Err(err).with_context(|| format!("failed to read {}", file_path.display()))
            }
        };
        Ok(config)
    }

    pub fn delay(&self) -> Duration {
        Duration::try_from_secs_f64(self.delay_secs).unwrap_or_default()
    }
}

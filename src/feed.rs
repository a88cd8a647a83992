use std::{collections::HashSet, fs::read_to_string, path::Path};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Incident {
    #[serde(default)]
    pub datetime: String,
    #[serde(default)]
    pub incident: String,
    #[serde(default)]
    pub location_txt: String,
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agency: Option<String>,
}

pub fn load(path: &Path) -> Result<Vec<Incident>> {
    let raw = read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;

    let records: Vec<Incident> = if path.extension().is_some_and(|x| x == "jsonl") {
        raw.lines()
            .enumerate()
            .filter(|(_, line)| !line.trim().is_empty())
            .map(|(i, line)| {
                serde_json::from_str::<Incident>(line)
                    .with_context(|| format!("{}:{}: invalid incident", path.display(), i + 1))
            })
            .collect::<Result<Vec<_>>>()?
    } else {
        serde_json::from_str(&raw)
            .with_context(|| format!("{}: expected a JSON array of incidents", path.display()))?
    };

    Ok(dedup(records))
}

fn dedup(records: Vec<Incident>) -> Vec<Incident> {
    let total = records.len();
    let mut seen = HashSet::new();
    let output: Vec<_> = records
        .into_iter()
        .filter(|x| x.incident.is_empty() || seen.insert(x.incident.clone()))
        .collect();
    if output.len() < total {
        log::info!("dropped {} repeated incidents", total - output.len());
    }
    output
}

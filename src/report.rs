use std::{
    fmt,
    fs::{remove_file, write},
    path::Path,
};

use anyhow::{Context, Result};
use serde::Serialize;

use crate::{
    feed::Incident,
    resolver::{Resolution, Trace},
};

pub struct Row {
    pub incident: Incident,
    pub resolution: Resolution,
}

#[derive(Serialize)]
struct Mapped<'a> {
    #[serde(flatten)]
    incident: &'a Incident,
    lat: Option<f64>,
    lon: Option<f64>,
}

#[derive(Serialize)]
struct Unmapped<'a> {
    #[serde(flatten)]
    incident: &'a Incident,
    trace: &'a Trace,
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let mut output = serde_json::to_string_pretty(value)?;
    output.push('\n');
    write(path, output).with_context(|| format!("failed to write {}", path.display()))
}

pub fn write_mapped(path: &Path, rows: &[Row]) -> Result<()> {
    let mapped: Vec<_> = rows
        .iter()
        .map(|x| Mapped {
            incident: &x.incident,
            lat: x.resolution.point.map(|p| p.y()),
            lon: x.resolution.point.map(|p| p.x()),
        })
        .collect();
    write_json(path, &mapped)
}

pub fn write_unmapped(path: &Path, rows: &[Row]) -> Result<usize> {
    let unmapped: Vec<_> = rows
        .iter()
        .filter(|x| x.resolution.point.is_none())
        .map(|x| Unmapped {
            incident: &x.incident,
            trace: &x.resolution.trace,
        })
        .collect();

    if unmapped.is_empty() {
        if path.exists() {
            remove_file(path).with_context(|| format!("failed to remove {}", path.display()))?;
        }
        return Ok(0);
    }
    write_json(path, &unmapped)?;
    Ok(unmapped.len())
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Summary {
    pub resolved: usize,
    pub skipped: usize,
}

impl Summary {
    pub fn of(rows: &[Row]) -> Self {
        let resolved = rows.iter().filter(|x| x.resolution.point.is_some()).count();
        Self {
            resolved,
            skipped: rows.len() - resolved,
        }
    }
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Geocoded: {}, Skipped: {}", self.resolved, self.skipped)
    }
}

use std::path::Path;

use anyhow::{Context, Result};
use rayon::prelude::*;

use crate::{
    cache::{cache_key, PersistentCache, RunMemo},
    config::Config,
    feed::{self, Incident},
    report::{self, Row, Summary},
    resolver::Resolver,
    utils::progress_bar,
};

pub fn run(config: &Config, input: &Path) -> Result<Summary> {
    let incidents = feed::load(input)?;
    log::info!("Geocoding {} incidents...", incidents.len());

    let cache = PersistentCache::load(&config.cache_path);
    if cache.is_empty() {
        log::info!("Starting without cached locations");
    } else {
        log::info!("{} cached locations, {} resolved", cache.len(), cache.resolved());
    }
    let resolver = Resolver::from_config(config);
    let rows = resolve_all(&resolver, &cache, incidents, config.jobs)?;

    report::write_mapped(&config.output_path, &rows)?;
    let unmapped = report::write_unmapped(&config.unmapped_path, &rows)?;
    if unmapped > 0 {
        log::info!(
            "{unmapped} unresolved locations written to {}",
            config.unmapped_path.display()
        );
    }

    if let Err(e) = cache.save(&config.cache_path) {
        log::warn!("{e}");
    }

    Ok(Summary::of(&rows))
}

pub fn resolve_all(
    resolver: &Resolver,
    cache: &PersistentCache,
    incidents: Vec<Incident>,
    jobs: usize,
) -> Result<Vec<Row>> {
    let memo = RunMemo::default();
    let pb = progress_bar(incidents.len() as u64);
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(jobs.max(1))
        .build()
        .context("failed to start worker threads")?;

    let rows = pool.install(|| {
        incidents
            .into_par_iter()
            .map(|incident| {
                let location = &incident.location_txt;
                let resolution = memo
                    .get_or_resolve(&cache_key(location), || resolver.resolve(location, cache));
                match resolution.point {
                    Some(p) => log::debug!("{location} -> {},{}", p.y(), p.x()),
                    None => pb.suspend(|| log::warn!("unresolved: {location:?}")),
                }
                pb.inc(1);
                Row {
                    incident,
                    resolution,
                }
            })
            .collect()
    });
    pb.finish_and_clear();

    Ok(rows)
}

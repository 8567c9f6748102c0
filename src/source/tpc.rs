//! Trusted Partner Cloud registry lookup

use crate::config::BuildConfig;
use crate::error::SourceError;

const UNIVERSE_PROJECTS: &[(&str, &str)] = &[
    ("prp", "tpczero-system/serverless-runtimes-tpc"),
    ("tsp", "eu0-system/serverless-runtimes-tpc"),
    ("tsq", "tpcone-system/serverless-runtimes-tpc"),
];

const REGION_HOSTNAMES: &[(&str, &str)] = &[
    ("u-us-prp1", "docker.pkg-tpczero.goog"),
    ("u-germany-northeast1q", "docker.pkg-tpcone.goog"),
    ("u-germany-northeast1", "docker.pkg-berlin-build0.goog"),
];

pub fn universe_project(universe: &str) -> Option<&'static str> {
    lookup(UNIVERSE_PROJECTS, universe)
}

pub fn region_hostname(region: &str) -> Option<&'static str> {
    lookup(REGION_HOSTNAMES, region)
}

fn lookup(table: &[(&str, &'static str)], key: &str) -> Option<&'static str> {
    table.iter().find(|(k, _)| *k == key).map(|(_, v)| *v)
}

/// Registry project holding the runtime images: the explicit TPC tarball
/// project, else the project of the build universe
pub fn tarball_project(config: &BuildConfig) -> Result<String, SourceError> {
    if let Some(project) = &config.tpc_project {
        return Ok(project.clone());
    }
    let universe = config.universe.as_deref().unwrap_or_default();
    universe_project(universe)
        .map(String::from)
        .ok_or_else(|| SourceError::UnknownUniverse(universe.to_string()))
}

/// Artifact Registry host: the explicit TPC hostname, else the host serving
/// the configured region
pub fn hostname(config: &BuildConfig) -> Result<String, SourceError> {
    if let Some(hostname) = &config.tpc_hostname {
        return Ok(hostname.clone());
    }
    let region = config
        .region
        .as_deref()
        .ok_or(SourceError::MissingTpcRegion)?;
    region_hostname(region)
        .map(String::from)
        .ok_or_else(|| SourceError::UnknownTpcRegion(region.to_string()))
}

//! Cluster description loading.
//!
//! A thin YAML→struct layer with `anyhow::Context` on every I/O/parse step
//! and defaults for anything the file leaves unspecified. A cluster is a
//! dense, ordered list of workers — worker ids are assigned by position,
//! since worker ids are dense and never reused.

use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;
use tracing::{debug, info};

#[derive(Debug, Deserialize)]
struct ClusterFile {
    workers: Vec<WorkerEntry>,
    #[serde(default)]
    network: NetworkEntry,
}

#[derive(Debug, Deserialize)]
struct WorkerEntry {
    cpus: u32,
}

#[derive(Debug, Deserialize, Default)]
struct NetworkEntry {
    /// Bandwidth for the `Simple` network model, in bytes/second. Absent
    /// means the driver falls back to the `Instant` model.
    bandwidth: Option<f64>,
}

/// A loaded cluster: worker CPU capacities in dense-id order, plus an
/// optional network bandwidth.
#[derive(Debug, Clone, Default)]
pub struct ClusterConfig {
    pub worker_cpus: Vec<u32>,
    pub bandwidth: Option<f64>,
}

impl ClusterConfig {
    /// Parses `path` and returns the cluster it describes.
    ///
    /// # Errors
    /// Returns an error if the file cannot be opened or is not valid YAML
    /// matching the expected shape.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        info!(path = %path.display(), "loading cluster configuration");

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("cannot open cluster file: {}", path.display()))?;

        let file: ClusterFile = serde_yaml::from_str(&content)
            .with_context(|| format!("failed to parse cluster YAML: {}", path.display()))?;

        let worker_cpus: Vec<u32> = file.workers.iter().map(|w| w.cpus).collect();
        debug!(workers = worker_cpus.len(), "parsed cluster workers");

        Ok(Self {
            worker_cpus,
            bandwidth: file.network.bandwidth,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn yaml_tempfile(content: &str) -> NamedTempFile {
        let mut f = NamedTempFile::new().unwrap();
        f.write_all(content.as_bytes()).unwrap();
        f
    }

    #[test]
    fn loads_workers_in_order() {
        let yaml = "workers:\n  - cpus: 4\n  - cpus: 2\n";
        let f = yaml_tempfile(yaml);
        let cluster = ClusterConfig::load_from_file(f.path()).unwrap();
        assert_eq!(cluster.worker_cpus, vec![4, 2]);
        assert_eq!(cluster.bandwidth, None);
    }

    #[test]
    fn loads_optional_bandwidth() {
        let yaml = "workers:\n  - cpus: 1\nnetwork:\n  bandwidth: 100.0\n";
        let f = yaml_tempfile(yaml);
        let cluster = ClusterConfig::load_from_file(f.path()).unwrap();
        assert_eq!(cluster.bandwidth, Some(100.0));
    }

    #[test]
    fn missing_file_errors() {
        let result = ClusterConfig::load_from_file(Path::new("/nonexistent/cluster.yaml"));
        assert!(result.is_err());
    }

    #[test]
    fn malformed_yaml_errors() {
        let f = yaml_tempfile("workers: not-a-list");
        assert!(ClusterConfig::load_from_file(f.path()).is_err());
    }
}

//! # Run file
//!
//! ```toml
//! backend = "synthetic"
//! solver_config = "channel.toml"
//! n_zone = 1
//! marker = "lower"
//! component = 0
//!
//! [output]
//! info_file = "data/info.txt"
//! hdf5_file = "data/wall.h5"
//! write_interval = 10
//! ```
//!
//! Only `solver_config` is required. Relative paths are relative to the
//! directory of the run file.
use crate::error::{DriverError, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Flow driver backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// Prescribed data, for dry runs
    Scripted,
    /// Log-law channel wall data
    Synthetic,
}

impl Default for BackendKind {
    fn default() -> Self {
        Self::Synthetic
    }
}

/// Settings of one driver run
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RunConfig {
    /// Backend to drive
    #[serde(default)]
    pub backend: BackendKind,
    /// Solver configuration file, passed unread to the backend
    pub solver_config: PathBuf,
    /// Number of zones
    #[serde(default = "default_n_zone")]
    pub n_zone: usize,
    /// Wall marker to sample
    #[serde(default = "default_marker")]
    pub marker: String,
    /// Velocity (gradient) component to sample
    #[serde(default)]
    pub component: usize,
    /// Sample output
    #[serde(default)]
    pub output: OutputConfig,
}

/// Where boundary samples go
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OutputConfig {
    /// Text file with marker averages per time iteration
    #[serde(default)]
    pub info_file: Option<PathBuf>,
    /// Hdf5 file with all samples (feature `hdf5`)
    #[serde(default)]
    pub hdf5_file: Option<PathBuf>,
    /// Write every n-th accepted time iteration
    #[serde(default = "default_write_interval")]
    pub write_interval: usize,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            info_file: None,
            hdf5_file: None,
            write_interval: default_write_interval(),
        }
    }
}

fn default_n_zone() -> usize {
    1
}
fn default_marker() -> String {
    "lower".to_owned()
}
fn default_write_interval() -> usize {
    1
}

impl RunConfig {
    /// Parse and validate toml content, paths are kept as written
    ///
    /// # Errors
    /// Malformed toml or invalid values
    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Read a run file, relative paths are resolved against its directory
    ///
    /// # Errors
    /// Unreadable file, malformed toml or invalid values
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| DriverError::Config(format!("cannot read {:?}: {}", path, e)))?;
        let mut config = Self::from_toml(&content)?;
        if let Some(base) = path.parent() {
            config.resolve_paths(base);
        }
        Ok(config)
    }

    /// Replace the sampled marker, `None` keeps the configured one
    ///
    /// # Errors
    /// Empty marker name
    pub fn override_marker(&mut self, marker: Option<String>) -> Result<()> {
        if let Some(marker) = marker {
            if marker.is_empty() {
                return Err(DriverError::Config("marker must not be empty".to_owned()));
            }
            self.marker = marker;
        }
        Ok(())
    }

    /// Prefix relative paths with `base`
    pub fn resolve_paths(&mut self, base: &Path) {
        let resolve = |p: &mut PathBuf| {
            if p.is_relative() {
                *p = base.join(&*p);
            }
        };
        resolve(&mut self.solver_config);
        if let Some(p) = self.output.info_file.as_mut() {
            resolve(p);
        }
        if let Some(p) = self.output.hdf5_file.as_mut() {
            resolve(p);
        }
    }

    fn validate(&self) -> Result<()> {
        if self.marker.is_empty() {
            return Err(DriverError::Config("marker must not be empty".to_owned()));
        }
        if self.n_zone == 0 {
            return Err(DriverError::Config("n_zone must be at least 1".to_owned()));
        }
        if self.output.write_interval == 0 {
            return Err(DriverError::Config(
                "write_interval must be at least 1".to_owned(),
            ));
        }
        #[cfg(not(feature = "hdf5"))]
        if self.output.hdf5_file.is_some() {
            return Err(DriverError::Config(
                "hdf5_file requires the hdf5 feature".to_owned(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = RunConfig::from_toml("solver_config = \"channel.toml\"").unwrap();
        assert_eq!(config.backend, BackendKind::Synthetic);
        assert_eq!(config.n_zone, 1);
        assert_eq!(config.marker, "lower");
        assert_eq!(config.component, 0);
        assert_eq!(config.output, OutputConfig::default());
        assert_eq!(config.output.write_interval, 1);
    }

    #[test]
    fn test_full() {
        let config = RunConfig::from_toml(
            r#"
            backend = "scripted"
            solver_config = "/abs/script.toml"
            marker = "upper"
            component = 1

            [output]
            info_file = "info.txt"
            write_interval = 5
            "#,
        )
        .unwrap();
        assert_eq!(config.backend, BackendKind::Scripted);
        assert_eq!(config.marker, "upper");
        assert_eq!(config.component, 1);
        assert_eq!(config.output.info_file, Some(PathBuf::from("info.txt")));
        assert_eq!(config.output.write_interval, 5);
    }

    #[test]
    fn test_invalid() {
        assert!(matches!(
            RunConfig::from_toml("marker = \"lower\""),
            Err(DriverError::Toml(_))
        ));
        assert!(matches!(
            RunConfig::from_toml("solver_config = \"a\"\nbackend = \"su3\""),
            Err(DriverError::Toml(_))
        ));
        assert!(matches!(
            RunConfig::from_toml("solver_config = \"a\"\nmarker = \"\""),
            Err(DriverError::Config(_))
        ));
        assert!(matches!(
            RunConfig::from_toml("solver_config = \"a\"\n[output]\nwrite_interval = 0"),
            Err(DriverError::Config(_))
        ));
    }

    #[test]
    fn test_override_marker() {
        let mut config = RunConfig::from_toml("solver_config = \"a\"").unwrap();
        config.override_marker(None).unwrap();
        assert_eq!(config.marker, "lower");
        config.override_marker(Some("upper".to_owned())).unwrap();
        assert_eq!(config.marker, "upper");
        assert!(matches!(
            config.override_marker(Some(String::new())),
            Err(DriverError::Config(_))
        ));
        assert_eq!(config.marker, "upper");
    }

    #[test]
    fn test_paths_relative_to_run_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("run.toml");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(
            file,
            "solver_config = \"channel.toml\"\n[output]\ninfo_file = \"data/info.txt\""
        )
        .unwrap();
        let config = RunConfig::from_file(&path).unwrap();
        assert_eq!(config.solver_config, dir.path().join("channel.toml"));
        assert_eq!(
            config.output.info_file,
            Some(dir.path().join("data/info.txt"))
        );
    }
}

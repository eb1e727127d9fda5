use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Configuration file structure for Pipelens.
///
/// Holds the view settings that would otherwise be repeated on every run.
/// Configuration files are loaded from the current directory, the user's config
/// directory, or a path given on the command line.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Config {
    /// Which pipeline to show and how much of its history
    #[serde(default)]
    pub view: ViewConfig,

    /// Where build data is read from
    #[serde(default)]
    pub snapshot: SnapshotConfig,

    /// Downstream build lookup
    #[serde(default)]
    pub resolver: ResolverConfig,

    /// Output format preferences
    #[serde(default)]
    pub output: OutputConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ViewConfig {
    /// Job at the head of the pipeline
    pub first_job: Option<String>,

    /// Number of pipeline instances to show, newest first
    #[serde(default = "default_displayed_builds")]
    pub displayed_builds: usize,

    /// CI server URL used to link builds and jobs
    pub base_url: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct SnapshotConfig {
    /// Snapshot file with jobs and builds
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ResolverConfig {
    /// How many of a downstream job's newest builds to scan, unset for all of them
    pub max_scan_depth: Option<usize>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct OutputConfig {
    #[serde(default)]
    pub format: OutputFormat,

    /// Pretty-print JSON output
    #[serde(default)]
    pub pretty: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Table,
    Json,
}

impl Default for ViewConfig {
    fn default() -> Self {
        Self {
            first_job: None,
            displayed_builds: default_displayed_builds(),
            base_url: None,
        }
    }
}

fn default_displayed_builds() -> usize {
    5
}

const CANDIDATES: [&str; 4] = [
    "pipelens.toml",
    "pipelens.json",
    "pipelens.yaml",
    "pipelens.yml",
];

impl Config {
    /// Load configuration from a file.
    ///
    /// Searches for configuration files in this order:
    /// 1. Specified path
    /// 2. ./pipelens.toml
    /// 3. ./pipelens.json
    /// 4. ./pipelens.yaml
    /// 5. ./pipelens.yml
    /// 6. `<config dir>/pipelens/config.toml`
    ///
    /// Returns default configuration if no file is found. A specified path that
    /// does not exist is an error.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        if let Some(path) = path {
            return Self::load_from_path(path);
        }

        if let Some(path) = Self::discover(Path::new("."), dirs::config_dir().as_deref()) {
            return Self::load_from_path(&path);
        }

        Ok(Self::default())
    }

    fn discover(dir: &Path, config_dir: Option<&Path>) -> Option<PathBuf> {
        CANDIDATES
            .iter()
            .map(|candidate| dir.join(candidate))
            .chain(config_dir.map(|d| d.join("pipelens").join("config.toml")))
            .find(|path| path.exists())
    }

    /// Load configuration from a specific file path.
    fn load_from_path(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let extension = path.extension().and_then(|ext| ext.to_str()).unwrap_or("");

        let config: Self = match extension {
            "toml" => toml::from_str(&contents)
                .with_context(|| format!("Failed to parse TOML config: {}", path.display()))?,
            "json" => serde_json::from_str(&contents)
                .with_context(|| format!("Failed to parse JSON config: {}", path.display()))?,
            "yaml" | "yml" => serde_yaml::from_str(&contents)
                .with_context(|| format!("Failed to parse YAML config: {}", path.display()))?,
            _ => toml::from_str(&contents)
                .or_else(|_| serde_json::from_str(&contents))
                .or_else(|_| serde_yaml::from_str(&contents))
                .with_context(|| format!("Failed to parse config file: {}", path.display()))?,
        };

        config
            .validate()
            .with_context(|| format!("Invalid config file: {}", path.display()))?;
        Ok(config)
    }

    /// Rejects values no view can be built from.
    pub fn validate(&self) -> Result<()> {
        if self.view.displayed_builds == 0 {
            bail!("displayed-builds must be at least 1");
        }
        if self.resolver.max_scan_depth == Some(0) {
            bail!("max-scan-depth must be at least 1 when set");
        }
        Ok(())
    }

    /// Save configuration to a file.
    pub fn save(&self, path: &Path) -> Result<()> {
        let contents = match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => serde_json::to_string_pretty(self)?,
            Some("yaml" | "yml") => serde_yaml::to_string(self)?,
            _ => toml::to_string_pretty(self)?,
        };

        std::fs::write(path, contents)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }
}

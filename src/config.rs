use serde::Deserialize;
use std::path::PathBuf;

fn default_standard_url() -> String {
    "https://data.geo.admin.ch/ch.swisstopo.digitales-hoehenmodell_25/data.zip".to_string()
}

fn default_high_url() -> String {
    "https://cms.geo.admin.ch/ogd/topography/DHM25_MM_ASCII_GRID.zip".to_string()
}

fn default_timeout_secs() -> u64 {
    600
}

/// Where the tier archives are downloaded from.
#[derive(Debug, Deserialize, Clone)]
pub struct SourceConfig {
    #[serde(default = "default_standard_url")]
    pub standard_url: String,
    #[serde(default = "default_high_url")]
    pub high_url: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            standard_url: default_standard_url(),
            high_url: default_high_url(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

#[derive(Debug, Deserialize, Default)]
pub struct FileConfig {
    #[serde(default)]
    pub polygon: Option<PathBuf>,
    #[serde(default)]
    pub output: Option<PathBuf>,
    #[serde(default)]
    pub cache_dir: Option<PathBuf>,
    #[serde(default)]
    pub high: bool,
    #[serde(default)]
    pub ascii: bool,
    #[serde(default)]
    pub verbose: bool,
    #[serde(default)]
    pub source: Option<SourceConfig>,
}

impl FileConfig {
    pub fn load() -> Option<Self> {
        for path in get_config_paths() {
            if path.exists()
                && let Ok(contents) = std::fs::read_to_string(&path)
            {
                match toml::from_str(&contents) {
                    Ok(config) => return Some(config),
                    Err(e) => {
                        eprintln!("Warning: Failed to parse config file {:?}: {}", path, e);
                    }
                }
            }
        }
        None
    }
}

fn get_config_paths() -> Vec<PathBuf> {
    let mut paths = Vec::new();

    paths.push(PathBuf::from("alpenstein.toml"));
    paths.push(PathBuf::from(".alpenstein.toml"));

    if let Some(config_dir) = dirs::config_dir() {
        paths.push(config_dir.join("alpenstein").join("config.toml"));
        paths.push(config_dir.join("alpenstein.toml"));
    }

    if let Some(home) = dirs::home_dir() {
        paths.push(home.join(".alpenstein.toml"));
    }

    paths
}

/// Default on-disk location for grid and STL artifacts.
pub fn default_cache_dir() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("alpenstein")
}

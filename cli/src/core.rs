use anyhow::{Context, Result, anyhow};
use blueprintlib::DEFAULT_NETWORK;
use blueprintlib::patcher::Patcher;
use blueprintlib::rpc::{Network, default_networks};
use blueprintlib::store::Blueprint;
use blueprintlib::util::Saveable;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct Config {
    pub store_file: PathBuf,
    pub default_network: String,
    pub networks: Vec<Network>,
    pub cache: Patcher,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            store_file: PathBuf::from("blueprint.cbor"),
            default_network: DEFAULT_NETWORK.to_string(),
            networks: vec![],
            cache: Patcher::default(),
        }
    }
}

impl Config {
    /// Reads the TOML config, falling back to defaults when the file is absent.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if !path.exists() {
            warn!(path = %path.display(), "config file not found, using defaults");
            return Ok(Config::default());
        }
        let raw = fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        let config: Config =
            toml::from_str(&raw).with_context(|| format!("parsing config {}", path.display()))?;
        info!(path = %path.display(), "loaded config");
        Ok(config)
    }

    pub fn write(&self, path: &Path) -> Result<()> {
        let config_str = toml::to_string_pretty(self)?;
        fs::write(path, config_str).with_context(|| format!("writing config {}", path.display()))?;
        Ok(())
    }

    /// Configured networks shadow built-in ones of the same name.
    pub fn network(&self, name: &str) -> Result<Network> {
        self.networks
            .iter()
            .cloned()
            .chain(default_networks())
            .find(|network| network.name == name)
            .ok_or_else(|| anyhow!("unknown network `{name}`"))
    }
}

pub struct Core {
    pub config: Config,
    pub blueprint: Blueprint,
}

impl Core {
    pub fn load(config_path: &Path) -> Result<Self> {
        let config = Config::load_or_default(config_path)?;
        let blueprint = if config.store_file.exists() {
            Blueprint::load_from_file(&config.store_file)
                .with_context(|| format!("loading store {}", config.store_file.display()))?
        } else {
            Blueprint::new()
        };
        Ok(Core { config, blueprint })
    }

    pub fn save(&self) -> Result<()> {
        self.blueprint
            .save_to_file(&self.config.store_file)
            .with_context(|| format!("saving store {}", self.config.store_file.display()))
    }
}

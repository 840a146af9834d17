//! Host configuration: optional TOML file layered under `LANDREG_*` env vars.

use anyhow::{bail, Result};
use config::{Config, Environment, File as ConfigFile};
use serde::Deserialize;
use std::path::{Path, PathBuf};

pub const DEFAULT_CONFIG_FILE: &str = "landreg.toml";
pub const ENV_PREFIX: &str = "LANDREG";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Pretty,
    Json,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HostConfig {
    /// Directory holding the sled database
    pub data_dir: PathBuf,
    pub log_level: String,
    pub log_format: LogFormat,
}

impl HostConfig {
    /// Resolve configuration.
    ///
    /// An explicit path must exist; otherwise `landreg.toml` in the working
    /// directory is used when present.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let resolved = match explicit {
            Some(path) => {
                if !path.exists() {
                    bail!(
                        "Configuration file {} not found (specified via --config)",
                        path.display()
                    );
                }
                Some(path.to_path_buf())
            }
            None => {
                let path = PathBuf::from(DEFAULT_CONFIG_FILE);
                path.exists().then_some(path)
            }
        };

        let mut builder = Config::builder()
            .set_default("data_dir", "./data/land-registry")?
            .set_default("log_level", "info")?
            .set_default("log_format", "pretty")?;

        if let Some(path) = &resolved {
            builder = builder.add_source(ConfigFile::from(path.as_path()));
        }

        builder = builder.add_source(Environment::with_prefix(ENV_PREFIX));

        Ok(builder.build()?.try_deserialize()?)
    }
}

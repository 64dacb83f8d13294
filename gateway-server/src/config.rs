use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Server settings, read from an optional TOML file overlaid by
/// `GATEWAY__SECTION__KEY` environment variables
#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub server: ListenConfig,
    pub static_files: Option<StaticFilesConfig>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ListenConfig {
    pub host: String,
    pub port: u16,

    /// URL prefix for the gateway endpoints, empty for the root
    pub base_path: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct StaticFilesConfig {
    /// Directory holding the single-page frontend; unknown paths serve its index.html
    pub directory: PathBuf,
}

impl ServerConfig {
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut builder = Config::builder()
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 5000)?
            .set_default("server.base_path", "")?;

        if let Some(path) = path {
            builder = builder.add_source(File::from(path).required(true));
        } else {
            builder = builder.add_source(File::with_name("gateway").required(false));
        }

        builder
            .add_source(Environment::with_prefix("GATEWAY").separator("__"))
            .build()?
            .try_deserialize()
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

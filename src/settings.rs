//! Layered settings for the `subclad` binary: an optional TOML file followed
//! by `SUBCLAD_` environment variables (`SUBCLAD_SEARCH__MAX_DEPTH=2`).
//! List-valued attribute settings accept comma separated values.

use config::{Config, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};

use crate::error::{Result, SubgroupError};
use crate::search::SearchConfig;

pub const DEFAULT_FILE: &str = "subclad";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub enabled: bool,
    pub bind: String,
}
impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            bind: "127.0.0.1:8080".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub dataset: Option<String>,
    pub delimiter: String,
    pub search: SearchConfig,
    pub server: ServerSettings,
}
impl Default for Settings {
    fn default() -> Self {
        Self {
            dataset: None,
            delimiter: ",".to_string(),
            search: SearchConfig::default(),
            server: ServerSettings::default(),
        }
    }
}

fn environment() -> Environment {
    Environment::with_prefix("SUBCLAD")
        .prefix_separator("_")
        .separator("__")
        .try_parsing(true)
        .list_separator(",")
        .with_list_parse_key("search.categorical_attributes")
        .with_list_parse_key("search.numeric_attributes")
}

impl Settings {
    /// Reads `path` (required when given, otherwise `subclad.toml` if present)
    /// and applies environment overrides on top.
    pub fn load(path: Option<&str>) -> Result<Self> {
        let file = File::with_name(path.unwrap_or(DEFAULT_FILE)).required(path.is_some());
        let settings: Settings = Config::builder()
            .add_source(file)
            .add_source(environment())
            .build()?
            .try_deserialize()?;
        settings.check()?;
        Ok(settings)
    }

    pub fn from_toml(text: &str) -> Result<Self> {
        let settings: Settings = Config::builder()
            .add_source(File::from_str(text, FileFormat::Toml))
            .build()?
            .try_deserialize()?;
        settings.check()?;
        Ok(settings)
    }

    fn check(&self) -> Result<()> {
        self.delimiter()?;
        Ok(())
    }

    pub fn delimiter(&self) -> Result<char> {
        let mut chars = self.delimiter.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) => Ok(c),
            _ => Err(SubgroupError::Settings(format!(
                "delimiter must be a single character, got {:?}",
                self.delimiter
            ))),
        }
    }
}

use std::path::{Path, PathBuf};

use ::config::builder::{ConfigBuilder, DefaultState};
use ::config::{Config, ConfigError, Environment, File};
use dirs_next::config_dir;
use serde::Deserialize;

use crate::types::Translation;

pub const ENV_PREFIX: &str = "ANWATCH";
pub const PLAYER_ENV_KEY: &str = "ANWATCH_PLAYER";
pub const DEFAULT_API_BASE_URL: &str = "https://could-harold-awarded-patio.trycloudflare.com";
pub const DEFAULT_EMBED_BASE_URL: &str = "https://megaplay.buzz/stream/s-2";
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/121.0 Safari/537.36";

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub api_base_url: String,
    pub embed_base_url: String,
    /// Player command line, split shell-style into program and arguments.
    pub player: String,
    pub user_agent: String,
    pub open_embeds: bool,
    pub default_translation: Translation,
    pub log_filter: String,
}

impl Settings {
    /// Defaults, then the config file, then `ANWATCH_*` variables.
    ///
    /// An explicit `path` must exist; the per-user file is optional.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let file = match path {
            Some(path) => Some(File::from(path).required(true)),
            None => default_config_path().map(|path| File::from(path).required(false)),
        };

        let mut builder = defaults()?;
        if let Some(file) = file {
            builder = builder.add_source(file);
        }
        builder
            .add_source(Environment::with_prefix(ENV_PREFIX).try_parsing(true))
            .build()?
            .try_deserialize()
    }

    pub fn player_command(&self) -> Option<(String, Vec<String>)> {
        let mut parts = shlex::split(&self.player)?;
        if parts.is_empty() {
            return None;
        }
        let program = parts.remove(0);
        Some((program, parts))
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            embed_base_url: DEFAULT_EMBED_BASE_URL.to_string(),
            player: String::from("mpv"),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            open_embeds: true,
            default_translation: Translation::Sub,
            log_filter: String::from("warn"),
        }
    }
}

fn defaults() -> Result<ConfigBuilder<DefaultState>, ConfigError> {
    let base = Settings::default();
    Config::builder()
        .set_default("api_base_url", base.api_base_url)?
        .set_default("embed_base_url", base.embed_base_url)?
        .set_default("player", base.player)?
        .set_default("user_agent", base.user_agent)?
        .set_default("open_embeds", base.open_embeds)?
        .set_default("default_translation", base.default_translation.as_str())?
        .set_default("log_filter", base.log_filter)
}

pub fn default_config_path() -> Option<PathBuf> {
    config_dir().map(|dir| dir.join("anwatch").join("config.toml"))
}

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::{trace, warn};

use crate::cli::Environment;
use crate::error::ConfigError;

pub const ENVIRONMENT_VAR: &str = "INVENTORY_ENV";
pub const STORE_ROOT_VAR: &str = "INVENTORY_DB_ROOT";
pub const STORE_AUTH_VAR: &str = "INVENTORY_DB_AUTH";
pub const STORE_USER_VAR: &str = "INVENTORY_DB_USER";
pub const STORE_PASSWORD_VAR: &str = "INVENTORY_DB_PASSWORD";

pub const DEFAULT_STORE_ROOT: &str = ".cache/gnome-inventory";
pub const DEFAULT_STORE_USER: &str = "developer";

#[derive(Debug, Clone, PartialEq)]
pub struct StoreSettings {
    pub root: PathBuf,
    pub auth: bool,
    pub user: String,
    pub password: Option<String>,
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            root: PathBuf::from(DEFAULT_STORE_ROOT),
            auth: false,
            user: DEFAULT_STORE_USER.to_string(),
            password: None,
        }
    }
}

impl StoreSettings {
    pub fn database_path(&self, database: &str) -> PathBuf {
        self.root.join(format!("{database}.sqlite"))
    }
}

#[derive(Debug, Default, Deserialize)]
struct ConfigFile {
    #[serde(default)]
    database: Option<DatabaseSection>,
}

#[derive(Debug, Default, Deserialize)]
struct DatabaseSection {
    root: Option<PathBuf>,
    auth: Option<bool>,
    user: Option<String>,
    password: Option<String>,
}

#[derive(Debug, Default, Clone)]
pub struct StoreOverrides {
    pub root: Option<String>,
    pub auth: Option<String>,
    pub user: Option<String>,
    pub password: Option<String>,
}

impl StoreOverrides {
    pub fn from_env() -> Self {
        Self {
            root: std::env::var(STORE_ROOT_VAR).ok(),
            auth: std::env::var(STORE_AUTH_VAR).ok(),
            user: std::env::var(STORE_USER_VAR).ok(),
            password: std::env::var(STORE_PASSWORD_VAR).ok(),
        }
    }
}

pub fn resolve_environment(requested: Option<Environment>) -> Environment {
    if let Some(environment) = requested {
        trace!(environment = environment.as_str(), "environment set on command line");
        return environment;
    }

    let raw = std::env::var(ENVIRONMENT_VAR).ok();
    match parse_environment(raw.as_deref()) {
        Some(environment) => {
            trace!(
                environment = environment.as_str(),
                variable = ENVIRONMENT_VAR,
                "environment set from variable"
            );
            environment
        }
        None => {
            warn!(
                variable = ENVIRONMENT_VAR,
                value = %raw.unwrap_or_default(),
                "environment not set, assuming development"
            );
            Environment::Development
        }
    }
}

pub fn parse_environment(value: Option<&str>) -> Option<Environment> {
    match value.map(str::trim) {
        Some(value) if value.eq_ignore_ascii_case("production") => Some(Environment::Production),
        Some(value) if value.eq_ignore_ascii_case("development") => {
            Some(Environment::Development)
        }
        _ => None,
    }
}

pub fn load_store_settings(config_path: Option<&Path>) -> Result<StoreSettings, ConfigError> {
    let file = match config_path {
        Some(path) => read_config_file(path)?,
        None => ConfigFile::default(),
    };

    build_store_settings(file.database.unwrap_or_default(), &StoreOverrides::from_env())
}

fn read_config_file(path: &Path) -> Result<ConfigFile, ConfigError> {
    let raw = fs::read(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    parse_config_file(&raw).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

fn parse_config_file(raw: &[u8]) -> Result<ConfigFile, serde_json::Error> {
    serde_json::from_slice(raw)
}

fn build_store_settings(
    section: DatabaseSection,
    overrides: &StoreOverrides,
) -> Result<StoreSettings, ConfigError> {
    let mut settings = StoreSettings::default();

    if let Some(root) = section.root {
        settings.root = root;
    }
    if let Some(auth) = section.auth {
        settings.auth = auth;
    }
    if let Some(user) = section.user {
        settings.user = user;
    }
    settings.password = section.password;

    if let Some(root) = overrides.root.as_deref().filter(|value| !value.trim().is_empty()) {
        settings.root = PathBuf::from(root);
    }
    if let Some(auth) = parse_flag(overrides.auth.as_deref()) {
        settings.auth = auth;
    }
    if let Some(user) = overrides.user.as_deref().filter(|value| !value.trim().is_empty()) {
        settings.user = user.to_string();
    }
    if let Some(password) = overrides.password.clone() {
        settings.password = Some(password);
    }

    if settings.auth && settings.password.is_none() {
        return Err(ConfigError::MissingPassword {
            user: settings.user,
        });
    }

    Ok(settings)
}

pub fn parse_flag(value: Option<&str>) -> Option<bool> {
    let value = value?.trim();
    if ["1", "true", "yes", "on"]
        .iter()
        .any(|candidate| value.eq_ignore_ascii_case(candidate))
    {
        Some(true)
    } else if ["0", "false", "no", "off"]
        .iter()
        .any(|candidate| value.eq_ignore_ascii_case(candidate))
    {
        Some(false)
    } else {
        None
    }
}

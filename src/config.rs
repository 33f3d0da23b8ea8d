//! Loading credentials and settings.

use crate::DEFAULT_ENDPOINT;
use chrono_tz::Tz;
use serde_derive::Deserialize;
use std::{
    fmt::{self, Debug, Formatter},
    path::{Path, PathBuf},
};
use url::Url;

/// Overrides the `secret` from the config file.
pub const API_KEY_VAR: &str = "LASTPASS_APIKEY";
/// Overrides the `company_id` from the config file.
pub const COMPANY_ID_VAR: &str = "LASTPASS_COMPANY_ID";
/// When set to anything non-empty, requests and responses are dumped.
pub const DEBUG_VAR: &str = "DEBUG";

const DEFAULT_TIMEZONE: Tz = Tz::UTC;

/// The config file as it appears on disk. Every key is optional.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ConfigFile {
    pub company_id: Option<String>,
    pub end_point_url: Option<String>,
    pub secret: Option<String>,
    pub timezone: Option<String>,
}

impl ConfigFile {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        log::debug!("Reading config from \"{}\"", path.display());

        let src = std::fs::read_to_string(path).map_err(|inner| {
            ConfigError::Read {
                path: path.to_path_buf(),
                inner,
            }
        })?;

        ConfigFile::parse(&src).map_err(|inner| ConfigError::Parse {
            path: path.to_path_buf(),
            inner,
        })
    }

    pub fn parse(src: &str) -> Result<Self, serde_yaml::Error> {
        if src.trim().is_empty() {
            return Ok(ConfigFile::default());
        }

        serde_yaml::from_str(src)
    }
}

/// Everything needed to talk to the provisioning API.
#[derive(Clone, PartialEq)]
pub struct Config {
    pub endpoint: Url,
    pub company_id: String,
    /// The provisioning hash. Never log this.
    pub secret: String,
    /// Where event times get converted to before they're shown.
    pub timezone: Tz,
}

impl Config {
    /// Load the config file (if there is one) and apply any overrides from
    /// the environment.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let file = match path {
            Some(path) => ConfigFile::load(path)?,
            None => ConfigFile::default(),
        };

        Config::resolve(file, |name| std::env::var(name).ok())
    }

    /// Merge a config file with environment variables (looked up using
    /// `env`), falling back to defaults where possible.
    pub fn resolve<F>(file: ConfigFile, env: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let ConfigFile {
            company_id,
            end_point_url,
            secret,
            timezone,
        } = file;
        let non_empty = |value: Option<String>| value.filter(|v| !v.is_empty());

        let secret = non_empty(env(API_KEY_VAR))
            .or_else(|| non_empty(secret))
            .ok_or(ConfigError::MissingApiKey)?;
        let company_id = non_empty(env(COMPANY_ID_VAR))
            .or_else(|| non_empty(company_id))
            .ok_or(ConfigError::MissingCompanyId)?;

        let endpoint = non_empty(end_point_url)
            .unwrap_or_else(|| DEFAULT_ENDPOINT.to_string());
        let endpoint = Url::parse(&endpoint).map_err(|inner| {
            ConfigError::BadEndpoint {
                url: endpoint.clone(),
                inner,
            }
        })?;

        let timezone = match non_empty(timezone) {
            Some(name) => parse_timezone(&name)?,
            None => DEFAULT_TIMEZONE,
        };

        Ok(Config {
            endpoint,
            company_id,
            secret,
            timezone,
        })
    }
}

impl Debug for Config {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("endpoint", &self.endpoint.as_str())
            .field("company_id", &self.company_id)
            .field("secret", &"<redacted>")
            .field("timezone", &self.timezone)
            .finish()
    }
}

/// Look up an IANA timezone (e.g. `Asia/Tokyo`).
pub fn parse_timezone(name: &str) -> Result<Tz, ConfigError> {
    name.parse()
        .map_err(|_| ConfigError::UnknownTimezone(name.to_string()))
}

/// Errors that may occur while loading the [`Config`].
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Unable to read \"{}\"", path.display())]
    Read {
        path: PathBuf,
        #[source]
        inner: std::io::Error,
    },
    #[error("Unable to parse \"{}\"", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        inner: serde_yaml::Error,
    },
    #[error(
        "No API key was provided. Set \"secret\" in the config file or try \
         \"export {}='<Your apikey>'\"",
        API_KEY_VAR
    )]
    MissingApiKey,
    #[error(
        "No company ID was provided. Set \"company_id\" in the config file or \
         try \"export {}='<Your lastpass company id>'\"",
        COMPANY_ID_VAR
    )]
    MissingCompanyId,
    #[error("\"{}\" isn't a valid endpoint URL", url)]
    BadEndpoint {
        url: String,
        #[source]
        inner: url::ParseError,
    },
    #[error("\"{0}\" isn't a known timezone")]
    UnknownTimezone(String),
}

//! Database connection configuration.
//!
//! Connection parameters are resolved once, at startup, into a [`DbConfig`]
//! value that is handed to [`ConnProvider::new`](crate::ConnProvider::new).
//! [`DbConfig::load`] deserializes the value from a TOML file using [Figment],
//! merging `PG_TXN_*` environment variables on top.
//!
//! ## Priority chain
//!
//! [Figment] layers providers with the [`merge`](Figment::merge) strategy
//! (later providers overwrite earlier ones). The resulting priority from
//! highest to lowest:
//!
//! | Priority    | Source                |
//! |-------------|-----------------------|
//! | 1 (highest) | `PG_TXN_*` env vars   |
//! | 2           | TOML file values      |
//!
//! ## Environment variables
//!
//! All env vars are prefixed with `PG_TXN_` and use double underscores to
//! separate nested keys. For example, `PG_TXN_DATABASE__URL` maps to
//! `database.url` in the config file.

use std::path::Path;

use figment::{
    Figment,
    providers::{Env, Format as _, Toml},
};

/// Database connection settings.
///
/// The URL carries the address and, optionally, inline credentials. A
/// credential supplied out-of-band of the URL goes in `password`, wrapped in
/// [`Redacted`] so it never leaks through `Debug` output.
#[derive(Debug, Clone, serde::Deserialize)]
pub struct DbConfig {
    /// Database connection URL (required)
    pub url: String,
    /// Password override, applied on top of any credential in the URL
    #[serde(default)]
    pub password: Option<Redacted<String>>,
    /// `application_name` reported to the server, visible in `pg_stat_activity`
    #[serde(default)]
    pub application_name: Option<String>,
}

impl DbConfig {
    /// Creates a config with the given connection URL and no overrides.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            password: None,
            application_name: None,
        }
    }

    /// Load database configuration from a TOML file with env-var overrides.
    ///
    /// Extracts the `[database]` section. See the [module-level docs](self)
    /// for the priority chain.
    pub fn load(config_path: &Path) -> Result<Self, LoadConfigError> {
        Figment::new()
            .merge(Toml::file(config_path))
            .merge(Env::prefixed("PG_TXN_").split("__"))
            .extract_inner::<DbConfig>("database")
            .map_err(Into::into)
    }
}

/// Errors that can occur when loading a [`DbConfig`] from file and environment.
#[derive(Debug, thiserror::Error)]
pub enum LoadConfigError {
    /// No source provided a valid `[database]` section.
    #[error("Error extracting database config: {0}")]
    Extract(#[from] figment::Error),
}

/// A wrapper that redacts its contents in `Debug` output.
///
/// Useful for wrapping sensitive data like passwords and authentication
/// tokens. The inner value can be accessed transparently via `Deref`, but
/// when printed using `Debug`, it will display `<redacted>` instead of the
/// actual value.
///
/// This type does **not** implement `Serialize` to prevent accidental
/// serialization of sensitive data. It only implements `Deserialize`.
#[derive(Clone, PartialEq, Eq, Ord, PartialOrd, Hash)]
pub struct Redacted<T>(T);

impl<T> Redacted<T> {
    /// Consumes the wrapper and returns the inner value.
    pub fn into_inner(self) -> T {
        self.0
    }
}

impl<T> From<T> for Redacted<T> {
    fn from(value: T) -> Self {
        Self(value)
    }
}

impl<T> std::ops::Deref for Redacted<T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl<T> AsRef<T> for Redacted<T> {
    fn as_ref(&self) -> &T {
        &self.0
    }
}

impl<T> std::borrow::Borrow<T> for Redacted<T> {
    fn borrow(&self) -> &T {
        &self.0
    }
}

impl<T> std::fmt::Debug for Redacted<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("<redacted>")
    }
}

impl<'de, T> serde::Deserialize<'de> for Redacted<T>
where
    T: serde::Deserialize<'de>,
{
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        T::deserialize(deserializer).map(Redacted)
    }
}

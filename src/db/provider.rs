//! Connection provider: opens and closes dedicated connections from resolved configuration

use sqlx::postgres::PgConnectOptions;
use tracing::instrument;

use super::conn::{ConnError, Connection};
use crate::config::DbConfig;

/// Produces live database connections from explicit configuration.
///
/// Connection parameters are parsed and validated once, at construction.
/// Every [`open`](Self::open) call establishes a fresh dedicated session
/// from the same resolved options; [`close`](Self::close) releases it.
///
/// The provider holds no mutable state, so independent `open` calls may run
/// concurrently, each producing its own [`Connection`].
#[derive(Debug, Clone)]
pub struct ConnProvider {
    options: PgConnectOptions,
}

impl ConnProvider {
    /// Resolves the given configuration into connect options.
    ///
    /// Fails with [`ConnError::InvalidConfig`] if the URL is malformed.
    pub fn new(config: DbConfig) -> Result<Self, ConnError> {
        let mut options = config
            .url
            .parse::<PgConnectOptions>()
            .map_err(ConnError::InvalidConfig)?;

        if let Some(password) = &config.password {
            options = options.password(password.as_ref());
        }
        if let Some(application_name) = &config.application_name {
            options = options.application_name(application_name);
        }

        Ok(Self { options })
    }

    /// Establishes a new database session.
    #[instrument(skip_all, err)]
    pub async fn open(&self) -> Result<Connection, ConnError> {
        Connection::connect_with(&self.options).await
    }

    /// Releases the given connection's underlying resources.
    ///
    /// Must be called exactly once per connection. Failure to close is
    /// surfaced as [`ConnError::Close`].
    #[instrument(skip_all, err)]
    pub async fn close(&self, conn: Connection) -> Result<(), ConnError> {
        conn.close().await
    }
}

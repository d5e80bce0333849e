//! Dedicated database connection implementation

use sqlx::{Connection as _, PgConnection, Postgres, postgres::PgConnectOptions};

use super::txn::TxnContext;

/// A dedicated connection to the database.
///
/// Owned exclusively by whichever component currently holds it: the
/// [`ConnProvider`](super::ConnProvider) until handed out, the caller for
/// the duration of its use, the provider again at close.
#[derive(Debug)]
pub struct Connection(PgConnection);

impl Connection {
    /// Establishes a single database session from resolved connect options.
    #[tracing::instrument(skip_all, err)]
    pub(crate) async fn connect_with(options: &PgConnectOptions) -> Result<Self, ConnError> {
        PgConnection::connect_with(options)
            .await
            .map(Self)
            .map_err(ConnError::Connect)
    }

    /// Begins a new database transaction on this connection.
    ///
    /// Issues an explicit `BEGIN`, so no statement auto-commits until the
    /// returned [`TxnContext`] is resolved. The context borrows the
    /// connection; it must be committed, rolled back, or dropped before the
    /// connection can be used again.
    #[tracing::instrument(skip_all, err)]
    pub async fn begin_txn(&mut self) -> Result<TxnContext<'_>, sqlx::Error> {
        let tx = self.0.begin().await?;
        Ok(TxnContext::new(tx))
    }

    /// Gracefully terminates the database session.
    ///
    /// Sends the termination message and flushes before closing the socket.
    /// Failure is surfaced to the caller, never swallowed.
    pub async fn close(self) -> Result<(), ConnError> {
        self.0.close().await.map_err(ConnError::Close)
    }

    /// Returns the server product name and version, e.g. `PostgreSQL 16.4`.
    ///
    /// Diagnostics and testing only.
    pub async fn server_product(&mut self) -> Result<String, sqlx::Error> {
        let version: String = sqlx::query_scalar("SELECT current_setting('server_version')")
            .fetch_one(&mut self.0)
            .await?;
        Ok(format!("PostgreSQL {version}"))
    }
}

impl std::ops::Deref for Connection {
    type Target = PgConnection;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl std::ops::DerefMut for Connection {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.0
    }
}

// Implement sqlx::Executor for &mut Connection by delegating to the underlying PgConnection
impl<'c> sqlx::Executor<'c> for &'c mut Connection {
    type Database = Postgres;

    fn fetch_many<'e, 'q: 'e, E>(
        self,
        query: E,
    ) -> futures::stream::BoxStream<
        'e,
        Result<
            sqlx::Either<
                <Postgres as sqlx::Database>::QueryResult,
                <Postgres as sqlx::Database>::Row,
            >,
            sqlx::Error,
        >,
    >
    where
        'c: 'e,
        E: 'q + sqlx::Execute<'q, Self::Database>,
    {
        (&mut self.0).fetch_many(query)
    }

    fn fetch_optional<'e, 'q: 'e, E>(
        self,
        query: E,
    ) -> futures::future::BoxFuture<
        'e,
        Result<Option<<Postgres as sqlx::Database>::Row>, sqlx::Error>,
    >
    where
        'c: 'e,
        E: 'q + sqlx::Execute<'q, Self::Database>,
    {
        (&mut self.0).fetch_optional(query)
    }

    fn prepare_with<'e, 'q: 'e>(
        self,
        sql: &'q str,
        parameters: &'e [<Postgres as sqlx::Database>::TypeInfo],
    ) -> futures::future::BoxFuture<
        'e,
        Result<<Postgres as sqlx::Database>::Statement<'q>, sqlx::Error>,
    >
    where
        'c: 'e,
    {
        (&mut self.0).prepare_with(sql, parameters)
    }

    fn describe<'e, 'q: 'e>(
        self,
        sql: &'q str,
    ) -> futures::future::BoxFuture<'e, Result<sqlx::Describe<Self::Database>, sqlx::Error>>
    where
        'c: 'e,
    {
        (&mut self.0).describe(sql)
    }
}

impl<'c> super::Executor<'c> for &'c mut Connection {}

impl crate::_priv::Sealed for &mut Connection {}

/// Errors that can occur when acquiring or releasing a database connection.
#[derive(Debug, thiserror::Error)]
pub enum ConnError {
    /// Connection parameters are missing or malformed.
    #[error("Invalid database connection config: {0}")]
    InvalidConfig(#[source] sqlx::Error),

    /// Failed to establish the database session.
    #[error("Error connecting to database: {0}")]
    Connect(#[source] sqlx::Error),

    /// Failed to gracefully release the database session.
    #[error("Error closing database connection: {0}")]
    Close(#[source] sqlx::Error),
}

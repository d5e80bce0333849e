use futures::future::BoxFuture;
use tracing::instrument;

mod config;
mod db;
mod error;

pub use self::{
    config::{DbConfig, LoadConfigError, Redacted},
    db::{ConnError, ConnProvider, Connection, Executor, TxnContext},
    error::ExecError,
};

/// Runs units of work inside database transactions.
///
/// Each [`execute`](Self::execute) call opens a dedicated connection, begins
/// a transaction, invokes the unit of work, commits on success or rolls back
/// on failure, and releases the connection exactly once in either case.
///
/// Clones share nothing but the resolved connect options, so a single
/// executor may serve concurrent `execute` calls, each on its own
/// connection.
#[derive(Clone, Debug)]
pub struct TxnExecutor {
    provider: ConnProvider,
}

impl TxnExecutor {
    /// Creates an executor from database configuration.
    ///
    /// Fails with [`ConnError::InvalidConfig`] if the connection URL is
    /// malformed. No connection is established until the first
    /// [`execute`](Self::execute) call.
    pub fn new(config: DbConfig) -> Result<Self, ConnError> {
        let provider = ConnProvider::new(config)?;
        Ok(Self { provider })
    }

    /// Creates an executor backed by an existing connection provider.
    pub fn from_provider(provider: ConnProvider) -> Self {
        Self { provider }
    }

    /// Returns the connection provider backing this executor.
    pub fn provider(&self) -> &ConnProvider {
        &self.provider
    }

    /// Executes the unit of work inside a single database transaction.
    ///
    /// The sequence is: open a connection, begin a transaction, invoke
    /// `work` with a [`TxnContext`], commit if it returned `Ok`, roll back
    /// if it returned `Err`, then release the connection. The connection is
    /// released exactly once on every path, including begin and commit
    /// failures.
    ///
    /// On failure the most significant error wins: a unit-of-work error is
    /// returned over a rollback or close failure (those are logged), and a
    /// commit error is returned over a close failure.
    ///
    /// # Usage
    ///
    /// The unit of work is a closure returning a boxed future. Annotating
    /// the closure argument helps type inference:
    ///
    /// ```ignore
    /// let count = executor
    ///     .execute(|txn: &mut TxnContext<'_>| {
    ///         Box::pin(async move {
    ///             sqlx::query("INSERT INTO events (name) VALUES ($1)")
    ///                 .bind("created")
    ///                 .execute(txn)
    ///                 .await
    ///                 .map(|done| done.rows_affected())
    ///         })
    ///     })
    ///     .await?;
    /// ```
    #[instrument(skip_all)]
    pub async fn execute<T, E, F>(&self, work: F) -> Result<T, ExecError<E>>
    where
        F: for<'t, 'c> FnOnce(&'t mut TxnContext<'c>) -> BoxFuture<'t, Result<T, E>>,
    {
        let mut conn = self.provider.open().await?;

        let result = run_in_txn(&mut conn, work).await;

        // Release the connection on every path. A close failure must not
        // shadow an earlier, more significant error.
        match self.provider.close(conn).await {
            Ok(()) => result,
            Err(close_err) => match result {
                Ok(_) => Err(ExecError::Connection(close_err)),
                Err(err) => {
                    tracing::error!(
                        error = %close_err,
                        "Failed to close connection after transaction error"
                    );
                    Err(err)
                }
            },
        }
    }
}

/// Runs the unit of work in a transaction on the given connection.
///
/// Commits on `Ok`, rolls back on `Err`. A rollback failure is logged and
/// the original unit-of-work error is returned; the transaction is aborted
/// server-side once the connection drops either way.
async fn run_in_txn<T, E, F>(conn: &mut Connection, work: F) -> Result<T, ExecError<E>>
where
    F: for<'t, 'c> FnOnce(&'t mut TxnContext<'c>) -> BoxFuture<'t, Result<T, E>>,
{
    let mut ctx = conn.begin_txn().await.map_err(ExecError::Begin)?;

    match work(&mut ctx).await {
        Ok(value) => {
            ctx.commit().await.map_err(ExecError::Commit)?;
            Ok(value)
        }
        Err(work_err) => {
            if let Err(rollback_err) = ctx.rollback().await {
                tracing::error!(
                    error = %rollback_err,
                    "Transaction rollback failed; returning original unit-of-work error"
                );
            }
            Err(ExecError::Work(work_err))
        }
    }
}

/// Private module for sealed trait pattern
///
/// This module contains the `Sealed` trait used to prevent external
/// implementations of our `Executor` trait. The trait implementations
/// are co-located with the types in the `db` module.
pub(crate) mod _priv {
    /// Sealed trait to prevent external implementations
    ///
    /// This trait has no methods and serves only as a marker.
    /// Types implement this trait alongside the `Executor` trait
    /// implementation.
    pub trait Sealed {}
}

#[cfg(test)]
mod tests;

//! Error types for transaction execution

use crate::db::ConnError;

/// Errors that can occur while executing a unit of work in a transaction.
///
/// The type parameter `E` is the error type of the unit of work itself.
/// Infrastructure faults (connect, begin, commit, close) and work failures
/// stay distinguishable so callers can react to each differently.
#[derive(Debug, thiserror::Error)]
pub enum ExecError<E> {
    /// Failed to acquire or release the underlying connection.
    #[error(transparent)]
    Connection(#[from] ConnError),

    /// Failed to begin the transaction.
    #[error("Error beginning database transaction: {0}")]
    Begin(#[source] sqlx::Error),

    /// Failed to commit the transaction. Changes were not persisted.
    #[error("Error committing database transaction: {0}")]
    Commit(#[source] sqlx::Error),

    /// The unit of work returned an error. The transaction was rolled back.
    #[error("Unit of work failed: {0}")]
    Work(E),
}

impl<E> ExecError<E> {
    /// Returns `true` if the error is likely to be a transient connection issue.
    ///
    /// This is used to determine if an operation should be retried.
    ///
    /// The following errors are considered retryable:
    /// - `ExecError::Connection`: Establishing or releasing the session failed.
    /// - `sqlx::Error::Io` in begin/commit: An I/O error, often indicating a
    ///   network issue or a closed socket.
    /// - `sqlx::Error::Tls` in begin/commit: An error that occurred during the
    ///   TLS handshake.
    ///
    /// Work errors are opaque to this crate and are never classified as
    /// connection errors.
    pub fn is_connection_error(&self) -> bool {
        match self {
            ExecError::Connection(_) => true,
            ExecError::Begin(err) | ExecError::Commit(err) => {
                matches!(err, sqlx::Error::Io(_) | sqlx::Error::Tls(_))
            }
            ExecError::Work(_) => false,
        }
    }

    /// Returns `true` if the error is retryable.
    ///
    /// This includes both connection errors and transaction-specific errors that are
    /// commonly encountered with concurrent transactions and row-level locking.
    ///
    /// The following errors are considered retryable:
    /// - **Connection errors**: Network issues, TLS errors (checked via `is_connection_error`)
    /// - **Serialization failures** (PostgreSQL error code `40001`): Occur when two transactions
    ///   conflict and one needs to be retried. Common with `SELECT FOR UPDATE` and concurrent updates.
    /// - **Deadlock detected** (PostgreSQL error code `40P01`): Two or more transactions are waiting
    ///   for each other to release locks. One transaction is aborted and should be retried.
    ///
    /// These transaction-specific errors are transient and safe to retry from the beginning
    /// of the transaction.
    pub fn is_retryable(&self) -> bool {
        // Check connection errors first
        if self.is_connection_error() {
            return true;
        }

        // Check for transaction-specific retryable errors
        matches!(
            self,
            ExecError::Begin(sqlx::Error::Database(err)) | ExecError::Commit(sqlx::Error::Database(err))
                if err.code().is_some_and(|code| matches!(
                    code.as_ref(),
                    "40001" | // serialization_failure
                    "40P01"   // deadlock_detected
                ))
        )
    }
}

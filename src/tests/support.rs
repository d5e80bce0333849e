//! Shared helpers for integration tests

use std::time::Duration;

use backon::{ExponentialBuilder, Retryable};
use pgtemp::PgTempDB;

use crate::{ConnError, ConnProvider, Connection, DbConfig, Executor};

/// Builds a connection provider for the given temporary database.
pub(crate) fn provider(temp_db: &PgTempDB) -> ConnProvider {
    ConnProvider::new(DbConfig::new(temp_db.connection_uri()))
        .expect("temporary database URI should be valid")
}

/// Opens a connection, retrying while the temporary database starts up.
pub(crate) async fn open_with_retry(provider: &ConnProvider) -> Result<Connection, ConnError> {
    let retry_policy = ExponentialBuilder::default()
        .with_min_delay(Duration::from_millis(10))
        .with_max_delay(Duration::from_millis(100))
        .with_max_times(20);

    fn is_db_starting_up(err: &ConnError) -> bool {
        matches!(
            err,
            ConnError::Connect(sqlx::Error::Database(db_err))
            if db_err.code().is_some_and(|code| code == "57P03")
        )
    }

    fn notify_retry(err: &ConnError, dur: Duration) {
        tracing::warn!(
            error = %err,
            "Database still starting up during connection. Retrying in {:.1}s",
            dur.as_secs_f32()
        );
    }

    (|| provider.open())
        .retry(retry_policy)
        .when(is_db_starting_up)
        .notify(notify_retry)
        .await
}

/// Creates the table used by the transaction tests.
pub(crate) async fn create_events_table<'c, E>(exe: E)
where
    E: Executor<'c>,
{
    sqlx::query("CREATE TABLE IF NOT EXISTS events (id BIGSERIAL PRIMARY KEY, name TEXT NOT NULL)")
        .execute(exe)
        .await
        .expect("Failed to create events table");
}

/// Counts rows in `events` with the given name.
pub(crate) async fn count_events<'c, E>(exe: E, name: &str) -> i64
where
    E: Executor<'c>,
{
    sqlx::query_scalar("SELECT COUNT(*) FROM events WHERE name = $1")
        .bind(name)
        .fetch_one(exe)
        .await
        .expect("Failed to count events")
}

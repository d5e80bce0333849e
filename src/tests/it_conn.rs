//! Integration tests for the connection provider

use pgtemp::PgTempDB;

use super::support;
use crate::{ConnError, ConnProvider, DbConfig};

#[tokio::test]
async fn open_establishes_session() {
    //* Given
    let temp_db = PgTempDB::new();
    let provider = support::provider(&temp_db);

    //* When
    let mut conn = support::open_with_retry(&provider)
        .await
        .expect("Failed to connect to database");

    //* Then
    let product = conn
        .server_product()
        .await
        .expect("Failed to query server version");
    assert!(
        product.starts_with("PostgreSQL "),
        "unexpected server product: {product}"
    );

    provider
        .close(conn)
        .await
        .expect("Failed to close connection");
}

#[test]
fn invalid_url_is_rejected_at_construction() {
    //* Given
    let config = DbConfig::new("not-a-connection-url");

    //* When
    let result = ConnProvider::new(config);

    //* Then
    assert!(
        matches!(result, Err(ConnError::InvalidConfig(_))),
        "malformed URL should fail provider construction"
    );
}

#[tokio::test]
async fn unreachable_server_fails_to_open() {
    //* Given
    // Valid URL, but nothing listens on port 1.
    let config = DbConfig::new("postgres://127.0.0.1:1/nope");
    let provider = ConnProvider::new(config).expect("URL should parse");

    //* When
    let result = provider.open().await;

    //* Then
    assert!(
        matches!(result, Err(ConnError::Connect(_))),
        "open should fail against an unreachable server"
    );
}

#[tokio::test]
async fn application_name_is_reported_to_server() {
    //* Given
    let temp_db = PgTempDB::new();

    let mut config = DbConfig::new(temp_db.connection_uri());
    config.application_name = Some("pg-txn-it".to_string());
    let provider = ConnProvider::new(config).expect("config should be valid");

    //* When
    let mut conn = support::open_with_retry(&provider)
        .await
        .expect("Failed to connect to database");

    //* Then
    let name: String = sqlx::query_scalar("SELECT current_setting('application_name')")
        .fetch_one(&mut conn)
        .await
        .expect("Failed to query application_name");
    assert_eq!(name, "pg-txn-it");

    provider
        .close(conn)
        .await
        .expect("Failed to close connection");
}

#[tokio::test]
async fn repeated_open_close_releases_server_resources() {
    //* Given
    let temp_db = PgTempDB::new();
    let provider = support::provider(&temp_db);

    // Warm up so startup retries are out of the way.
    let conn = support::open_with_retry(&provider)
        .await
        .expect("Failed to connect to database");
    provider
        .close(conn)
        .await
        .expect("Failed to close connection");

    //* When
    // More iterations than the server's default connection limit, so a
    // leaked session would exhaust the server before the loop finishes.
    for i in 0..110 {
        let conn = provider
            .open()
            .await
            .unwrap_or_else(|err| panic!("Failed to open connection on iteration {i}: {err}"));

        //* Then
        provider
            .close(conn)
            .await
            .unwrap_or_else(|err| panic!("Failed to close connection on iteration {i}: {err}"));
    }
}

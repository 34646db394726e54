//! # SQLite database methods
//!
//! Low-level SQLite interactions, one module per table group. Everything here is a plain function taking a
//! `&mut SqliteConnection`, so callers decide the transaction scope: acquire a connection from the pool for a
//! one-shot query, or pass `&mut *tx` to compose several calls into a single atomic transaction.

use std::env;

use log::info;
use sqlx::{sqlite::SqlitePoolOptions, Error as SqlxError, SqlitePool};

pub mod deliveries;
pub mod items;
pub mod orders;
pub mod payments;

const SQLITE_DB_URL: &str = "sqlite://data/shamba_store.db";

pub fn db_url() -> String {
    let result = env::var("SMP_DATABASE_URL").unwrap_or_else(|_| {
        info!("SMP_DATABASE_URL is not set. Using the default.");
        SQLITE_DB_URL.to_string()
    });
    info!("Using database URL: {result}");
    result
}

pub async fn new_pool(url: &str, max_connections: u32) -> Result<SqlitePool, SqlxError> {
    let pool = SqlitePoolOptions::new().max_connections(max_connections).connect(url).await?;
    Ok(pool)
}

//! Connection helpers shared by the adapters.

use std::path::Path;

use sqlx::any::AnyPoolOptions;
use sqlx::AnyPool;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};

use winddb_common::{WindDbError, WindDbResult};

/// SQL flavor behind a runtime-selected connection URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SqlDialect {
    MySql,
    Sqlite,
}

impl SqlDialect {
    pub fn from_url(url: &str) -> WindDbResult<Self> {
        if url.starts_with("mysql:") || url.starts_with("mariadb:") {
            Ok(SqlDialect::MySql)
        } else if url.starts_with("sqlite:") {
            Ok(SqlDialect::Sqlite)
        } else {
            Err(WindDbError::Config(format!(
                "Unsupported database URL scheme: {}",
                redact_url(url)
            )))
        }
    }

    /// Expression converting a `DATETIME` column to Unix seconds.
    pub fn unix_timestamp(&self, column: &str) -> String {
        match self {
            SqlDialect::MySql => format!("CAST(UNIX_TIMESTAMP({}) AS SIGNED)", column),
            SqlDialect::Sqlite => format!("CAST(strftime('%s', {}) AS INTEGER)", column),
        }
    }

    /// Select item reading a numeric column as a double, named `column`.
    ///
    /// The Any driver cannot decode MySQL `DECIMAL`, `TINYINT` or `MEDIUMINT`
    /// results, so MySQL values are widened to `DOUBLE` in the query.
    pub fn real(&self, column: &str) -> String {
        match self {
            SqlDialect::MySql => format!("({column} + 0e0) AS {column}"),
            SqlDialect::Sqlite => column.to_string(),
        }
    }

    /// Select item reading an integer column as a `BIGINT`, named `column`.
    pub fn integer(&self, column: &str) -> String {
        match self {
            SqlDialect::MySql => format!("CAST({column} AS SIGNED) AS {column}"),
            SqlDialect::Sqlite => column.to_string(),
        }
    }
}

/// Connect through the runtime-selected driver.
///
/// In-memory SQLite URLs get a single connection that never expires so the
/// database outlives individual queries.
pub async fn connect_any(url: &str) -> WindDbResult<AnyPool> {
    sqlx::any::install_default_drivers();

    let mut options = AnyPoolOptions::new().max_connections(5);
    if url.contains(":memory:") || url.contains("mode=memory") {
        options = options
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None);
    }

    options.connect(url).await.map_err(|e| {
        WindDbError::Database(format!(
            "Connection to {} failed: {}",
            redact_url(url),
            e
        ))
    })
}

/// Open an existing SQLite file read-only.
pub async fn open_sqlite(path: &Path) -> WindDbResult<SqlitePool> {
    let options = SqliteConnectOptions::new()
        .filename(path)
        .read_only(true);

    SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await
        .map_err(|e| {
            WindDbError::Database(format!("Failed to open {}: {}", path.display(), e))
        })
}

/// `?, ?, ?` with `n` placeholders, for binding an `IN (...)` list.
pub fn placeholders(n: usize) -> String {
    vec!["?"; n].join(", ")
}

/// Strip credentials from a connection URL before logging it.
pub fn redact_url(url: &str) -> String {
    match (url.find("://"), url.rfind('@')) {
        (Some(scheme_end), Some(at)) if at > scheme_end => {
            format!("{}://***@{}", &url[..scheme_end], &url[at + 1..])
        }
        _ => url.to_string(),
    }
}

pub mod mysql;
pub mod sqlite;

use std::fmt;
use std::str::FromStr;

use dbridge_executor::{Connection, ConnectionDescriptor, Driver, DriverError, ResultSet};
use sqlx::mysql::MySqlConnection;
use sqlx::sqlite::SqliteConnection;

const DRIVER_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::driver");

/// Engines the bridge can talk to, keyed by the descriptor's engine tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineKind {
    MySql,
    Sqlite,
}

impl EngineKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MySql => "MySQL",
            Self::Sqlite => "SQLite",
        }
    }
}

impl fmt::Display for EngineKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EngineKind {
    type Err = DriverError;

    fn from_str(tag: &str) -> Result<Self, Self::Err> {
        match tag.trim().to_ascii_lowercase().as_str() {
            "mysql" | "mariadb" => Ok(Self::MySql),
            "sqlite" | "sqlite3" => Ok(Self::Sqlite),
            _ => Err(DriverError::UnsupportedEngine(tag.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SqlxDriver;

impl SqlxDriver {
    pub fn new() -> Self {
        Self
    }
}

/// A single live sqlx connection. Not pooled: a dropped server connection
/// stays dropped and surfaces as an execution error.
#[derive(Debug)]
pub enum SqlxConnection {
    MySql(MySqlConnection),
    Sqlite(SqliteConnection),
}

impl SqlxConnection {
    pub fn engine(&self) -> EngineKind {
        match self {
            Self::MySql(_) => EngineKind::MySql,
            Self::Sqlite(_) => EngineKind::Sqlite,
        }
    }
}

impl Driver for SqlxDriver {
    type Connection = SqlxConnection;

    async fn connect(&self, descriptor: &ConnectionDescriptor) -> Result<SqlxConnection, DriverError> {
        let engine: EngineKind = descriptor.engine.parse()?;
        tracing::debug!(
            target: DRIVER_TARGET,
            connection = %descriptor.name,
            %engine,
            host = %descriptor.host,
            port = descriptor.port,
            "connecting"
        );
        let connection = match engine {
            EngineKind::MySql => SqlxConnection::MySql(mysql::connect(descriptor).await?),
            EngineKind::Sqlite => SqlxConnection::Sqlite(sqlite::connect(descriptor).await?),
        };
        Ok(connection)
    }
}

impl Connection for SqlxConnection {
    async fn switch_schema(&mut self, schema: &str) -> Result<(), DriverError> {
        match self {
            Self::MySql(conn) => mysql::switch_schema(conn, schema).await,
            Self::Sqlite(_) => Err(DriverError::Unsupported {
                engine: EngineKind::Sqlite.as_str(),
                operation: "schema switching",
            }),
        }
    }

    async fn execute(&mut self, statement: &str) -> Result<Option<ResultSet>, DriverError> {
        match self {
            Self::MySql(conn) => mysql::execute(conn, statement).await,
            Self::Sqlite(conn) => sqlite::execute(conn, statement).await,
        }
    }
}

/// How a cell is read back, decided from its type names alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CellKind {
    Boolean,
    Integer,
    Unsigned,
    Float,
    Timestamp,
    Date,
    Text,
}

/// Build the result from fetched rows, or from the statement's described
/// columns when nothing came back. `None` when there are no columns at all.
fn shape_result(
    columns: Vec<String>,
    rows: Vec<Vec<dbridge_executor::Scalar>>,
) -> Result<Option<ResultSet>, DriverError> {
    if columns.is_empty() {
        return Ok(None);
    }
    ResultSet::new(columns, rows)
        .map(Some)
        .map_err(DriverError::backend)
}

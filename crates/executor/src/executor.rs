use std::sync::Arc;

use thiserror::Error;
use tracing::debug;

use crate::driver::{Connection, Driver, DriverError};
use crate::registry::{NotFoundError, Registry};
use crate::value::ResultSet;

const EXECUTOR_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::executor");

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionErrorKind {
    UnknownConnection,
    SchemaSwitchFailed,
    QueryFailed,
}

#[derive(Debug, Error)]
pub enum ExecutionError {
    #[error("unknown connection: {name}")]
    UnknownConnection { name: String },

    #[error("failed to switch '{name}' to schema '{schema}': {source}")]
    SchemaSwitchFailed {
        name: String,
        schema: String,
        #[source]
        source: DriverError,
    },

    #[error("statement failed on '{name}': {source}")]
    QueryFailed {
        name: String,
        #[source]
        source: DriverError,
    },
}

impl ExecutionError {
    pub fn kind(&self) -> ExecutionErrorKind {
        match self {
            Self::UnknownConnection { .. } => ExecutionErrorKind::UnknownConnection,
            Self::SchemaSwitchFailed { .. } => ExecutionErrorKind::SchemaSwitchFailed,
            Self::QueryFailed { .. } => ExecutionErrorKind::QueryFailed,
        }
    }
}

impl From<NotFoundError> for ExecutionError {
    fn from(err: NotFoundError) -> Self {
        Self::UnknownConnection { name: err.name }
    }
}

/// Runs single statements against registered connections.
pub struct SqlExecutor<D: Driver> {
    registry: Arc<Registry<D>>,
}

impl<D: Driver> Clone for SqlExecutor<D> {
    fn clone(&self) -> Self {
        Self {
            registry: Arc::clone(&self.registry),
        }
    }
}

impl<D: Driver> SqlExecutor<D> {
    pub fn new(registry: Arc<Registry<D>>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &Arc<Registry<D>> {
        &self.registry
    }

    /// Execute `statement` once on the connection named `name`, switching to
    /// `schema` first when one is given. `Ok(None)` means the statement ran
    /// but returned no result shape.
    pub async fn execute(
        &self,
        name: &str,
        statement: &str,
        schema: Option<&str>,
    ) -> Result<Option<ResultSet>, ExecutionError> {
        let handle = self.registry.get(name).await?;
        let mut connection = handle.lock().await;

        if let Some(schema) = schema.filter(|s| !s.is_empty()) {
            connection
                .switch_schema(schema)
                .await
                .map_err(|source| ExecutionError::SchemaSwitchFailed {
                    name: name.to_string(),
                    schema: schema.to_string(),
                    source,
                })?;
        }

        debug!(target: EXECUTOR_TARGET, connection = name, schema, "executing statement");
        connection
            .execute(statement)
            .await
            .map_err(|source| ExecutionError::QueryFailed {
                name: name.to_string(),
                source,
            })
    }
}

use std::error::Error as StdError;
use std::future::Future;

use thiserror::Error;

use crate::descriptor::ConnectionDescriptor;
use crate::value::ResultSet;

/// Failure reported by a database driver. The detail is meant for the log,
/// not for the editor.
#[derive(Debug, Error)]
pub enum DriverError {
    #[error("unsupported engine: {0}")]
    UnsupportedEngine(String),

    #[error("{operation} is not supported by {engine}")]
    Unsupported {
        engine: &'static str,
        operation: &'static str,
    },

    #[error(transparent)]
    Backend(Box<dyn StdError + Send + Sync>),
}

impl DriverError {
    pub fn backend(source: impl Into<Box<dyn StdError + Send + Sync>>) -> Self {
        Self::Backend(source.into())
    }
}

/// An open handle to one database instance.
pub trait Connection: Send + 'static {
    /// Make `schema` the default schema for subsequent statements.
    fn switch_schema(&mut self, schema: &str) -> impl Future<Output = Result<(), DriverError>> + Send;

    /// Run one statement and fetch everything it returns. `Ok(None)` means the
    /// statement produced no result shape (DDL, DML).
    fn execute(
        &mut self,
        statement: &str,
    ) -> impl Future<Output = Result<Option<ResultSet>, DriverError>> + Send;
}

/// Opens connections for the engines it supports.
pub trait Driver: Send + Sync + 'static {
    type Connection: Connection;

    fn connect(
        &self,
        descriptor: &ConnectionDescriptor,
    ) -> impl Future<Output = Result<Self::Connection, DriverError>> + Send;
}

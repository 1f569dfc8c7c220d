//! In-memory driver with scripted behaviour for tests.
//!
//! Connections to hosts marked unreachable fail; statements answer with the
//! result set registered for their text, or with no result shape.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::descriptor::ConnectionDescriptor;
use crate::driver::{Connection, Driver, DriverError};
use crate::value::ResultSet;

/// One statement observed by a [`ScriptedConnection`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Execution {
    pub connection_id: u64,
    pub schema: Option<String>,
    pub statement: String,
}

#[derive(Debug, Default)]
struct Script {
    unreachable_hosts: HashSet<String>,
    missing_schemas: HashSet<String>,
    failing_statements: HashSet<String>,
    responses: HashMap<String, ResultSet>,
    connects: u64,
    executed: Vec<Execution>,
}

#[derive(Debug, Clone, Default)]
pub struct ScriptedDriver {
    script: Arc<Mutex<Script>>,
}

impl ScriptedDriver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn unreachable(self, host: impl Into<String>) -> Self {
        self.lock().unreachable_hosts.insert(host.into());
        self
    }

    pub fn missing_schema(self, schema: impl Into<String>) -> Self {
        self.lock().missing_schemas.insert(schema.into());
        self
    }

    pub fn failing(self, statement: impl Into<String>) -> Self {
        self.lock().failing_statements.insert(statement.into());
        self
    }

    pub fn respond(self, statement: impl Into<String>, result: ResultSet) -> Self {
        self.lock().responses.insert(statement.into(), result);
        self
    }

    /// Flip reachability after construction, e.g. between two bridge starts.
    pub fn set_reachable(&self, host: &str, reachable: bool) {
        let mut script = self.lock();
        if reachable {
            script.unreachable_hosts.remove(host);
        } else {
            script.unreachable_hosts.insert(host.to_string());
        }
    }

    /// Number of successful connects.
    pub fn connects(&self) -> u64 {
        self.lock().connects
    }

    pub fn executed(&self) -> Vec<Execution> {
        self.lock().executed.clone()
    }

    fn lock(&self) -> MutexGuard<'_, Script> {
        self.script.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[derive(Debug)]
pub struct ScriptedConnection {
    id: u64,
    schema: Option<String>,
    script: Arc<Mutex<Script>>,
}

impl ScriptedConnection {
    pub fn id(&self) -> u64 {
        self.id
    }

    fn lock(&self) -> MutexGuard<'_, Script> {
        self.script.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Driver for ScriptedDriver {
    type Connection = ScriptedConnection;

    async fn connect(
        &self,
        descriptor: &ConnectionDescriptor,
    ) -> Result<ScriptedConnection, DriverError> {
        let mut script = self.lock();
        if script.unreachable_hosts.contains(&descriptor.host) {
            return Err(DriverError::backend(format!(
                "Can't connect to server on '{}' ({})",
                descriptor.host, descriptor.port
            )));
        }
        script.connects += 1;
        Ok(ScriptedConnection {
            id: script.connects,
            schema: None,
            script: Arc::clone(&self.script),
        })
    }
}

impl Connection for ScriptedConnection {
    async fn switch_schema(&mut self, schema: &str) -> Result<(), DriverError> {
        if self.lock().missing_schemas.contains(schema) {
            return Err(DriverError::backend(format!("Unknown database '{schema}'")));
        }
        self.schema = Some(schema.to_string());
        Ok(())
    }

    async fn execute(&mut self, statement: &str) -> Result<Option<ResultSet>, DriverError> {
        let execution = Execution {
            connection_id: self.id,
            schema: self.schema.clone(),
            statement: statement.to_string(),
        };
        let mut script = self.lock();
        script.executed.push(execution);
        if script.failing_statements.contains(statement) {
            return Err(DriverError::backend(format!(
                "You have an error in your SQL syntax near '{statement}'"
            )));
        }
        Ok(script.responses.get(statement).cloned())
    }
}

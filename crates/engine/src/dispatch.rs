//! Command routing.
//!
//! The dispatcher is stateless between commands. Each handler returns the
//! directives to send back; failures are logged with their detail and turned
//! into fixed notifications, so dispatch itself never fails.

use std::sync::Arc;

use dbridge_executor::{ConnectionDescriptor, Driver, Registry, SqlExecutor, encode};
use dbridge_protocol::{Command, Directive, Envelope};
use tracing::{debug, info, trace, warn};

pub(crate) const DISPATCH_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::dispatch");

pub const SQL_ERROR_MESSAGE: &str = "Sql Error, please check the bridge log.";
pub const CONNECT_ERROR_MESSAGE: &str = "database connect error";

const SHOW_DATABASES_SQL: &str = "show databases";
const SHOW_TABLES_SQL: &str = "show tables";

pub struct Dispatcher<D: Driver> {
    registry: Arc<Registry<D>>,
    executor: SqlExecutor<D>,
}

impl<D: Driver> Dispatcher<D> {
    pub fn new(registry: Arc<Registry<D>>) -> Self {
        let executor = SqlExecutor::new(Arc::clone(&registry));
        Self { registry, executor }
    }

    pub fn registry(&self) -> &Arc<Registry<D>> {
        &self.registry
    }

    /// Decode and dispatch one envelope. Envelopes whose arguments do not fit
    /// the command are logged and produce nothing.
    pub async fn dispatch_envelope(&self, envelope: &Envelope) -> Vec<Directive> {
        match envelope.command() {
            Ok(command) => self.dispatch(command).await,
            Err(error) => {
                warn!(
                    target: DISPATCH_TARGET,
                    command = envelope.command_name().unwrap_or_default(),
                    header = %envelope.header,
                    %error,
                    "rejected envelope"
                );
                Vec::new()
            }
        }
    }

    pub async fn dispatch(&self, command: Command) -> Vec<Directive> {
        debug!(target: DISPATCH_TARGET, command = command.name(), "dispatching");
        match command {
            Command::RunSql {
                connection,
                schema,
                sql,
            } => self.run_sql(&connection, schema.as_deref(), &sql).await,
            Command::NewDatabase {
                connection,
                engine,
                host,
                port,
                user,
                password,
            } => {
                let descriptor =
                    ConnectionDescriptor::new(connection, engine, host, port, user, password);
                self.new_database(descriptor).await
            }
            Command::GetDbMeta { connection } => {
                self.get_db_meta(&connection).await;
                Vec::new()
            }
            Command::ShowDatabases { connection } => {
                self.list(&connection, SHOW_DATABASES_SQL, None, Directive::SetDatabases)
                    .await
            }
            Command::ShowTables { connection, schema } => {
                self.list(&connection, SHOW_TABLES_SQL, schema.as_deref(), Directive::SetTables)
                    .await
            }
            Command::Unknown(name) => {
                trace!(target: DISPATCH_TARGET, command = %name, "ignoring unknown command");
                Vec::new()
            }
        }
    }

    async fn run_sql(&self, connection: &str, schema: Option<&str>, sql: &str) -> Vec<Directive> {
        match self.executor.execute(connection, sql, schema).await {
            Ok(Some(result)) => {
                let encoded = encode(Some(&result));
                vec![Directive::ShowResults {
                    columns: encoded.columns,
                    rows: encoded.rows,
                }]
            }
            Ok(None) => Vec::new(),
            Err(error) => {
                warn!(target: DISPATCH_TARGET, connection, kind = ?error.kind(), %error, "run_sql failed");
                execution_failed()
            }
        }
    }

    async fn new_database(&self, descriptor: ConnectionDescriptor) -> Vec<Directive> {
        match self.registry.register(descriptor).await {
            Ok(_) => Vec::new(),
            Err(error) => {
                warn!(target: DISPATCH_TARGET, %error, "new_database failed");
                vec![Directive::notify(CONNECT_ERROR_MESSAGE)]
            }
        }
    }

    async fn get_db_meta(&self, connection: &str) {
        match self.registry.describe(connection).await {
            Some(descriptor) => info!(target: DISPATCH_TARGET, ?descriptor, "connection meta"),
            None => info!(target: DISPATCH_TARGET, connection, "no stored meta for connection"),
        }
    }

    /// Run a listing statement and unwrap its single-column rows into
    /// `directive`. An empty listing leaves the editor's view untouched.
    async fn list(
        &self,
        connection: &str,
        statement: &str,
        schema: Option<&str>,
        directive: fn(Vec<String>) -> Directive,
    ) -> Vec<Directive> {
        match self.executor.execute(connection, statement, schema).await {
            Ok(result) => {
                let names = result.map(|r| r.first_column_text()).unwrap_or_default();
                if names.is_empty() {
                    debug!(target: DISPATCH_TARGET, connection, statement, "empty listing");
                    return Vec::new();
                }
                vec![directive(names)]
            }
            Err(error) => {
                warn!(target: DISPATCH_TARGET, connection, statement, %error, "listing failed");
                execution_failed()
            }
        }
    }
}

fn execution_failed() -> Vec<Directive> {
    vec![Directive::notify(SQL_ERROR_MESSAGE), Directive::OpenManagementView]
}

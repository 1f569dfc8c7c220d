use serde_json::Value;

use crate::error::ProtocolError;

/// One decoded inbound message: `[header, [command, args...]]`.
#[derive(Debug, Clone)]
pub struct Envelope {
    pub header: Value,
    pub payload: Vec<Value>,
}

impl Envelope {
    /// Parse a single JSON line. Surrounding whitespace is ignored.
    pub fn parse(line: &[u8]) -> Result<Self, ProtocolError> {
        let value: Value = serde_json::from_slice(line.trim_ascii())?;
        Self::from_value(value)
    }

    pub fn from_value(value: Value) -> Result<Self, ProtocolError> {
        let Value::Array(mut parts) = value else {
            return Err(ProtocolError::invalid_envelope("expected a two element array"));
        };
        if parts.len() != 2 {
            return Err(ProtocolError::invalid_envelope(format!(
                "expected 2 elements, got {}",
                parts.len()
            )));
        }
        let payload = match parts.pop() {
            Some(Value::Array(items)) if !items.is_empty() => items,
            _ => {
                return Err(ProtocolError::invalid_envelope(
                    "payload must be a non-empty array",
                ));
            }
        };
        let header = parts.pop().unwrap_or(Value::Null);
        Ok(Self { header, payload })
    }

    /// Command name with surrounding whitespace removed.
    pub fn command_name(&self) -> Option<&str> {
        self.payload.first().and_then(Value::as_str).map(str::trim)
    }

    /// Decode the payload into a typed command.
    pub fn command(&self) -> Result<Command, ProtocolError> {
        Command::decode(&self.payload)
    }
}

/// Commands understood by the bridge. Anything else decodes to
/// [`Command::Unknown`] so the dispatcher can ignore it explicitly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    RunSql {
        connection: String,
        schema: Option<String>,
        sql: String,
    },
    NewDatabase {
        connection: String,
        engine: String,
        host: String,
        port: u16,
        user: String,
        password: String,
    },
    GetDbMeta {
        connection: String,
    },
    ShowDatabases {
        connection: String,
    },
    ShowTables {
        connection: String,
        schema: Option<String>,
    },
    Unknown(String),
}

impl Command {
    pub const RUN_SQL: &'static str = "run_sql";
    pub const NEW_DATABASE: &'static str = "new_database";
    pub const GET_DB_META: &'static str = "get_db_meta";
    pub const SHOW_DATABASES: &'static str = "show_databases";
    pub const SHOW_TABLES: &'static str = "show_tables";

    /// Decode `[command, args...]`. Argument positions are fixed per command.
    pub fn decode(payload: &[Value]) -> Result<Self, ProtocolError> {
        let name = payload
            .first()
            .and_then(Value::as_str)
            .map(str::trim)
            .ok_or_else(|| ProtocolError::invalid_envelope("command name must be a string"))?;

        let command = match name {
            Self::RUN_SQL => {
                let args = Args::new(Self::RUN_SQL, payload);
                Self::RunSql {
                    connection: args.string(1)?,
                    schema: args.optional_string(2)?,
                    sql: args.string(3)?,
                }
            }
            Self::NEW_DATABASE => {
                let args = Args::new(Self::NEW_DATABASE, payload);
                Self::NewDatabase {
                    connection: args.string(1)?,
                    engine: args.string(2)?,
                    host: args.string(3)?,
                    port: args.port(4)?,
                    user: args.optional_string(5)?.unwrap_or_default(),
                    password: args.optional_string(6)?.unwrap_or_default(),
                }
            }
            Self::GET_DB_META => Self::GetDbMeta {
                connection: Args::new(Self::GET_DB_META, payload).string(1)?,
            },
            Self::SHOW_DATABASES => Self::ShowDatabases {
                connection: Args::new(Self::SHOW_DATABASES, payload).string(1)?,
            },
            Self::SHOW_TABLES => {
                let args = Args::new(Self::SHOW_TABLES, payload);
                Self::ShowTables {
                    connection: args.string(1)?,
                    schema: args.optional_string(2)?,
                }
            }
            other => Self::Unknown(other.to_string()),
        };
        Ok(command)
    }

    /// Canonical wire name of the command.
    pub fn name(&self) -> &str {
        match self {
            Self::RunSql { .. } => Self::RUN_SQL,
            Self::NewDatabase { .. } => Self::NEW_DATABASE,
            Self::GetDbMeta { .. } => Self::GET_DB_META,
            Self::ShowDatabases { .. } => Self::SHOW_DATABASES,
            Self::ShowTables { .. } => Self::SHOW_TABLES,
            Self::Unknown(name) => name,
        }
    }
}

/// Positional argument reader for one command payload.
struct Args<'a> {
    command: &'static str,
    values: &'a [Value],
}

impl<'a> Args<'a> {
    fn new(command: &'static str, values: &'a [Value]) -> Self {
        Self { command, values }
    }

    fn get(&self, idx: usize) -> Result<&'a Value, ProtocolError> {
        self.values.get(idx).ok_or_else(|| {
            ProtocolError::invalid_arguments(self.command, format!("missing argument {idx}"))
        })
    }

    fn string(&self, idx: usize) -> Result<String, ProtocolError> {
        match self.get(idx)? {
            Value::String(s) => Ok(s.clone()),
            other => Err(ProtocolError::invalid_arguments(
                self.command,
                format!("argument {idx} must be a string, got {other}"),
            )),
        }
    }

    /// Null, a missing trailing argument, and the empty string all mean "absent".
    fn optional_string(&self, idx: usize) -> Result<Option<String>, ProtocolError> {
        match self.values.get(idx) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::String(s)) if s.is_empty() => Ok(None),
            Some(Value::String(s)) => Ok(Some(s.clone())),
            Some(other) => Err(ProtocolError::invalid_arguments(
                self.command,
                format!("argument {idx} must be a string or null, got {other}"),
            )),
        }
    }

    /// Ports arrive either as JSON numbers or as numeric strings.
    fn port(&self, idx: usize) -> Result<u16, ProtocolError> {
        let value = self.get(idx)?;
        let parsed = match value {
            Value::Number(n) => n.as_u64().and_then(|n| u16::try_from(n).ok()),
            Value::String(s) => s.trim().parse::<u16>().ok(),
            _ => None,
        };
        parsed.ok_or_else(|| {
            ProtocolError::invalid_arguments(self.command, format!("invalid port: {value}"))
        })
    }
}

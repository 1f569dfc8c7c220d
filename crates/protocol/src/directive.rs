use serde_json::Value;

use crate::outbound::Outbound;
use crate::sexp::Sexp;

/// Editor-side application name of the connection-management view.
pub const MANAGEMENT_VIEW: &str = "database";

const SHOW_RESULTS_FN: &str = "websocket-bridge-database-show";
const DATABASES_VAR: &str = "websocket-bridge-database-db-databases";
const TABLES_VAR: &str = "websocket-bridge-database-db-tables";
const METAS_VAR: &str = "websocket-bridge-database-db-metas";
const OPEN_BUFFER_FN: &str = "websocket-bridge-app-open-buffer";

/// One outbound instruction for the editor.
#[derive(Debug, Clone, PartialEq)]
pub enum Directive {
    /// Render a result grid.
    ShowResults {
        columns: Vec<String>,
        rows: Vec<Vec<Value>>,
    },
    /// Populate the editor's database list.
    SetDatabases(Vec<String>),
    /// Populate the editor's table list.
    SetTables(Vec<String>),
    /// Populate the editor's lookup table of stored connections.
    SetConnectionMetas(Value),
    /// Plain text notification.
    Notify(String),
    /// Surface the connection-management view.
    OpenManagementView,
}

impl Directive {
    pub fn notify(text: impl Into<String>) -> Self {
        Self::Notify(text.into())
    }

    /// The elisp form evaluated by the editor, or `None` for notifications.
    pub fn to_sexp(&self) -> Option<Sexp> {
        let form = match self {
            Self::ShowResults { columns, rows } => {
                let rows = Sexp::List(
                    rows.iter()
                        .map(|row| Sexp::List(row.iter().map(Sexp::from).collect()))
                        .collect(),
                );
                Sexp::call(
                    SHOW_RESULTS_FN,
                    [Sexp::quoted_strings(columns.iter().cloned()), Sexp::quote(rows)],
                )
            }
            Self::SetDatabases(names) => setq(DATABASES_VAR, Sexp::quoted_strings(names.iter().cloned())),
            Self::SetTables(names) => setq(TABLES_VAR, Sexp::quoted_strings(names.iter().cloned())),
            Self::SetConnectionMetas(metas) => setq(
                METAS_VAR,
                Sexp::call("ht<-plist", [Sexp::quote(Sexp::from(metas))]),
            ),
            Self::OpenManagementView => {
                Sexp::call(OPEN_BUFFER_FN, [Sexp::quote(Sexp::symbol(MANAGEMENT_VIEW))])
            }
            Self::Notify(_) => return None,
        };
        Some(form)
    }

    /// Frame the directive for the transport.
    pub fn to_outbound(&self) -> Outbound {
        match self {
            Self::Notify(text) => Outbound::Message { text: text.clone() },
            _ => Outbound::Eval {
                code: self.to_sexp().map(|form| form.to_string()).unwrap_or_default(),
            },
        }
    }
}

fn setq(var: &str, value: Sexp) -> Sexp {
    Sexp::call("setq", [Sexp::symbol(var), value])
}

use chrono::{NaiveDate, NaiveDateTime};
use dbridge_executor::{ConnectionDescriptor, DriverError, ResultSet, Scalar};
use sqlx::mysql::{MySqlConnectOptions, MySqlConnection, MySqlRow};
use sqlx::{Column, ConnectOptions, Executor, Row, TypeInfo, ValueRef};

use super::{CellKind, DRIVER_TARGET, shape_result};

fn connect_options(descriptor: &ConnectionDescriptor) -> MySqlConnectOptions {
    let options = MySqlConnectOptions::new()
        .host(&descriptor.host)
        .port(descriptor.port)
        .username(&descriptor.user);
    if descriptor.password.is_empty() {
        options
    } else {
        options.password(&descriptor.password)
    }
}

pub(crate) async fn connect(descriptor: &ConnectionDescriptor) -> Result<MySqlConnection, DriverError> {
    connect_options(descriptor)
        .connect()
        .await
        .map_err(DriverError::backend)
}

/// Backtick-quote an identifier, doubling embedded backticks.
pub(crate) fn quote_identifier(name: &str) -> String {
    format!("`{}`", name.replace('`', "``"))
}

pub(crate) async fn switch_schema(conn: &mut MySqlConnection, schema: &str) -> Result<(), DriverError> {
    let sql = format!("USE {}", quote_identifier(schema));
    Executor::execute(&mut *conn, sql.as_str())
        .await
        .map(|_| ())
        .map_err(DriverError::backend)
}

/// Run `statement` over the text protocol (so SHOW, USE and friends work) and
/// fetch every row.
pub(crate) async fn execute(
    conn: &mut MySqlConnection,
    statement: &str,
) -> Result<Option<ResultSet>, DriverError> {
    let rows = Executor::fetch_all(&mut *conn, statement)
        .await
        .map_err(DriverError::backend)?;

    let columns: Vec<String> = match rows.first() {
        Some(row) => row.columns().iter().map(|c| c.name().to_string()).collect(),
        None => described_columns(conn, statement).await,
    };
    let col_len = columns.len();
    let out_rows = rows
        .iter()
        .map(|row| (0..col_len).map(|i| decode_cell(row, i)).collect())
        .collect();
    shape_result(columns, out_rows)
}

/// Column names of a statement that returned no rows. Statements the server
/// refuses to prepare are treated as having no result shape.
async fn described_columns(conn: &mut MySqlConnection, statement: &str) -> Vec<String> {
    match Executor::describe(&mut *conn, statement).await {
        Ok(describe) => describe
            .columns()
            .iter()
            .map(|c| c.name().to_string())
            .collect(),
        Err(error) => {
            tracing::debug!(target: DRIVER_TARGET, %error, "statement has no describable result");
            Vec::new()
        }
    }
}

fn decode_cell(row: &MySqlRow, idx: usize) -> Scalar {
    let kind = match row.try_get_raw(idx) {
        Ok(raw) if raw.is_null() => return Scalar::Null,
        Ok(raw) => cell_kind(raw.type_info().name()),
        Err(_) => return Scalar::Null,
    };

    let typed = match kind {
        CellKind::Boolean => row.try_get::<bool, _>(idx).ok().map(Scalar::Boolean),
        CellKind::Unsigned => row.try_get::<u64, _>(idx).ok().map(|u| match i64::try_from(u) {
            Ok(i) => Scalar::Integer(i),
            Err(_) => Scalar::Text(u.to_string()),
        }),
        CellKind::Integer => row.try_get::<i64, _>(idx).ok().map(Scalar::Integer),
        CellKind::Float => row.try_get::<f64, _>(idx).ok().map(Scalar::Float),
        CellKind::Timestamp => row
            .try_get::<NaiveDateTime, _>(idx)
            .ok()
            .map(Scalar::Timestamp),
        CellKind::Date => row.try_get::<NaiveDate, _>(idx).ok().map(Scalar::Date),
        CellKind::Text => None,
    };
    typed.unwrap_or_else(|| decode_text(row, idx))
}

fn cell_kind(type_name: &str) -> CellKind {
    let type_name = type_name.to_ascii_uppercase();
    match type_name.as_str() {
        "BOOLEAN" => CellKind::Boolean,
        name if is_integer(name) && name.ends_with("UNSIGNED") => CellKind::Unsigned,
        name if is_integer(name) => CellKind::Integer,
        "FLOAT" | "DOUBLE" => CellKind::Float,
        "DATETIME" | "TIMESTAMP" => CellKind::Timestamp,
        "DATE" => CellKind::Date,
        _ => CellKind::Text,
    }
}

/// Text-protocol fallback: DECIMAL, TIME, zero dates, ENUM and binary data
/// all arrive as bytes.
fn decode_text(row: &MySqlRow, idx: usize) -> Scalar {
    row.try_get_unchecked::<String, _>(idx)
        .map(Scalar::Text)
        .or_else(|_| {
            row.try_get_unchecked::<Vec<u8>, _>(idx)
                .map(|bytes| Scalar::Text(String::from_utf8_lossy(&bytes).into_owned()))
        })
        .unwrap_or(Scalar::Null)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn quotes_identifiers() {
        assert_eq!(quote_identifier("app"), "`app`");
        assert_eq!(quote_identifier("we`ird"), "`we``ird`");
    }

    #[rstest]
    #[case("BOOLEAN", CellKind::Boolean)]
    #[case("INT", CellKind::Integer)]
    #[case("BIGINT", CellKind::Integer)]
    #[case("BIGINT UNSIGNED", CellKind::Unsigned)]
    #[case("TINYINT UNSIGNED", CellKind::Unsigned)]
    #[case("DOUBLE", CellKind::Float)]
    #[case("FLOAT", CellKind::Float)]
    #[case("DATETIME", CellKind::Timestamp)]
    #[case("TIMESTAMP", CellKind::Timestamp)]
    #[case("DATE", CellKind::Date)]
    #[case("DECIMAL", CellKind::Text)]
    #[case("TIME", CellKind::Text)]
    #[case("VARCHAR", CellKind::Text)]
    #[case("ENUM", CellKind::Text)]
    fn maps_server_types_to_cells(#[case] type_name: &str, #[case] expected: CellKind) {
        assert_eq!(cell_kind(type_name), expected);
    }

    #[test]
    fn recognises_integer_types() {
        assert!(is_integer("INT"));
        assert!(is_integer("BIGINT UNSIGNED"));
        assert!(!is_integer("INTERVAL"));
        assert!(!is_integer("DOUBLE"));
    }
}

use std::str::FromStr;

use chrono::{NaiveDate, NaiveDateTime};
use dbridge_executor::{ConnectionDescriptor, DriverError, ResultSet, Scalar};
use sqlx::sqlite::{SqliteConnectOptions, SqliteConnection, SqliteRow};
use sqlx::{Column, ConnectOptions, Executor, Row, TypeInfo, ValueRef};

use super::{CellKind, DRIVER_TARGET, shape_result};

/// The descriptor's host is the database location: a path, `:memory:`, or a
/// full `sqlite:` URL.
pub(crate) fn database_url(host: &str) -> String {
    if host.starts_with("sqlite:") {
        host.to_string()
    } else if host == ":memory:" {
        "sqlite::memory:".to_string()
    } else {
        format!("sqlite:{host}")
    }
}

pub(crate) async fn connect(descriptor: &ConnectionDescriptor) -> Result<SqliteConnection, DriverError> {
    let url = database_url(&descriptor.host);
    SqliteConnectOptions::from_str(&url)
        .map_err(DriverError::backend)?
        .create_if_missing(true)
        .connect()
        .await
        .map_err(DriverError::backend)
}

pub(crate) async fn execute(
    conn: &mut SqliteConnection,
    statement: &str,
) -> Result<Option<ResultSet>, DriverError> {
    let rows = Executor::fetch_all(&mut *conn, statement)
        .await
        .map_err(DriverError::backend)?;

    let columns: Vec<String> = match rows.first() {
        Some(row) => row.columns().iter().map(|c| c.name().to_string()).collect(),
        None => match Executor::describe(&mut *conn, statement).await {
            Ok(describe) => describe
                .columns()
                .iter()
                .map(|c| c.name().to_string())
                .collect(),
            Err(error) => {
                tracing::debug!(target: DRIVER_TARGET, %error, "statement has no describable result");
                Vec::new()
            }
        },
    };
    let col_len = columns.len();
    let mut out_rows: Vec<Vec<Scalar>> = Vec::with_capacity(rows.len());
    for row in rows.iter() {
        let mut row_vals: Vec<Scalar> = Vec::with_capacity(col_len);
        for i in 0..col_len {
            row_vals.push(decode_cell(row, i));
        }
        out_rows.push(row_vals);
    }
    shape_result(columns, out_rows)
}

/// SQLite values carry a storage class; the column's declared type says
/// whether a TEXT or INTEGER value is really a timestamp, date or flag.
fn decode_cell(row: &SqliteRow, idx: usize) -> Scalar {
    let storage = match row.try_get_raw(idx) {
        Ok(raw) if raw.is_null() => return Scalar::Null,
        Ok(raw) => raw.type_info().name().to_string(),
        Err(_) => return Scalar::Null,
    };
    let declared = row
        .columns()
        .get(idx)
        .map(|column| column.type_info().name().to_string())
        .unwrap_or_default();

    let typed = match cell_kind(&declared, &storage) {
        CellKind::Boolean => row.try_get::<bool, _>(idx).ok().map(Scalar::Boolean),
        CellKind::Integer | CellKind::Unsigned => {
            row.try_get::<i64, _>(idx).ok().map(Scalar::Integer)
        }
        CellKind::Float => row.try_get::<f64, _>(idx).ok().map(Scalar::Float),
        CellKind::Timestamp => row
            .try_get::<NaiveDateTime, _>(idx)
            .ok()
            .map(Scalar::Timestamp),
        CellKind::Date => row.try_get::<NaiveDate, _>(idx).ok().map(Scalar::Date),
        CellKind::Text => None,
    };
    typed.unwrap_or_else(|| {
        row.try_get_unchecked::<String, _>(idx)
            .map(Scalar::Text)
            .or_else(|_| {
                row.try_get_unchecked::<Vec<u8>, _>(idx)
                    .map(|bytes| Scalar::Text(String::from_utf8_lossy(&bytes).into_owned()))
            })
            .unwrap_or(Scalar::Null)
    })
}

fn cell_kind(declared: &str, storage: &str) -> CellKind {
    let declared = declared.to_ascii_uppercase();
    let storage = storage.to_ascii_uppercase();
    match (declared.as_str(), storage.as_str()) {
        ("BOOLEAN", "INTEGER") => CellKind::Boolean,
        ("DATETIME" | "TIMESTAMP", "TEXT" | "INTEGER" | "REAL") => CellKind::Timestamp,
        ("DATE", "TEXT") => CellKind::Date,
        (_, "INTEGER") => CellKind::Integer,
        (_, "REAL") => CellKind::Float,
        _ => CellKind::Text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(":memory:", "sqlite::memory:")]
    #[case("/tmp/app.db", "sqlite:/tmp/app.db")]
    #[case("sqlite://data.db", "sqlite://data.db")]
    fn normalises_locations(#[case] host: &str, #[case] expected: &str) {
        assert_eq!(database_url(host), expected);
    }

    #[rstest]
    #[case("DATETIME", "TEXT", CellKind::Timestamp)]
    #[case("DATETIME", "INTEGER", CellKind::Timestamp)]
    #[case("DATE", "TEXT", CellKind::Date)]
    #[case("BOOLEAN", "INTEGER", CellKind::Boolean)]
    #[case("BOOLEAN", "TEXT", CellKind::Text)]
    #[case("INTEGER", "INTEGER", CellKind::Integer)]
    #[case("", "INTEGER", CellKind::Integer)]
    #[case("NULL", "REAL", CellKind::Float)]
    #[case("TEXT", "TEXT", CellKind::Text)]
    #[case("", "BLOB", CellKind::Text)]
    fn declared_type_refines_the_storage_class(
        #[case] declared: &str,
        #[case] storage: &str,
        #[case] expected: CellKind,
    ) {
        assert_eq!(cell_kind(declared, storage), expected);
    }
}

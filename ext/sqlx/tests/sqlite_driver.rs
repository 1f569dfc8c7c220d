use chrono::{NaiveDate, NaiveDateTime};
use dbridge_executor::{Connection, ConnectionDescriptor, Driver, DriverError, Scalar, encode};
use dbridge_ext_sqlx::{EngineKind, SqlxConnection, SqlxDriver};

fn memory(name: &str) -> ConnectionDescriptor {
    ConnectionDescriptor::new(name, "SQLite", ":memory:", 0, "", "")
}

async fn connect() -> SqlxConnection {
    SqlxDriver::new()
        .connect(&memory("mem"))
        .await
        .expect("in-memory sqlite")
}

#[tokio::test]
async fn selects_return_columns_and_rows() {
    let mut conn = connect().await;
    assert_eq!(conn.engine(), EngineKind::Sqlite);

    let result = conn
        .execute("select 1 as one, 'two' as two, 2.5 as three, null as four")
        .await
        .expect("select")
        .expect("result shape");
    assert_eq!(result.columns(), ["one", "two", "three", "four"]);
    assert_eq!(
        result.rows(),
        [vec![
            Scalar::Integer(1),
            Scalar::from("two"),
            Scalar::Float(2.5),
            Scalar::Null
        ]]
    );
}

#[tokio::test]
async fn ddl_and_dml_have_no_result_shape() {
    let mut conn = connect().await;
    let created = conn
        .execute("create table t (id integer primary key, name text)")
        .await
        .expect("create");
    assert!(created.is_none());

    let inserted = conn
        .execute("insert into t (name) values ('a'), ('b')")
        .await
        .expect("insert");
    assert!(inserted.is_none());

    let rows = conn
        .execute("select name from t order by id")
        .await
        .expect("select")
        .expect("rows");
    assert_eq!(rows.first_column_text(), vec!["a", "b"]);
}

#[tokio::test]
async fn empty_selects_keep_their_columns() {
    let mut conn = connect().await;
    conn.execute("create table t (id integer, name text)")
        .await
        .expect("create");

    let result = conn
        .execute("select id, name from t")
        .await
        .expect("select")
        .expect("result shape");
    assert_eq!(result.columns(), ["id", "name"]);
    assert!(result.is_empty());
}

#[tokio::test]
async fn declared_column_types_decode_dates_and_flags() {
    let mut conn = connect().await;
    conn.execute("create table t (c DATETIME, d DATE, b BOOLEAN, n INTEGER)")
        .await
        .expect("create");
    conn.execute("insert into t values ('2024-01-02 03:04:05', '2024-01-02', 1, 9)")
        .await
        .expect("insert");

    let result = conn
        .execute("select c, d, b, n from t")
        .await
        .expect("select")
        .expect("rows");

    let created: NaiveDateTime = "2024-01-02T03:04:05".parse().expect("timestamp");
    let day: NaiveDate = "2024-01-02".parse().expect("date");
    assert_eq!(
        result.rows(),
        [vec![
            Scalar::Timestamp(created),
            Scalar::Date(day),
            Scalar::Boolean(true),
            Scalar::Integer(9)
        ]]
    );
    let encoded = encode(Some(&result));
    assert_eq!(encoded.rows[0][0], "2024-01-02T03:04:05");
}

#[tokio::test]
async fn syntax_errors_surface_as_driver_errors() {
    let mut conn = connect().await;
    let err = conn.execute("selec 1").await.expect_err("syntax");
    assert!(matches!(err, DriverError::Backend(_)));
}

#[tokio::test]
async fn schema_switching_is_unsupported() {
    let mut conn = connect().await;
    let err = conn.switch_schema("main").await.expect_err("unsupported");
    assert!(matches!(err, DriverError::Unsupported { .. }));
}

#[tokio::test]
async fn unknown_engines_are_rejected_at_connect() {
    let descriptor = ConnectionDescriptor::new("x", "Oracle", "h", 1521, "u", "p");
    let err = SqlxDriver::new()
        .connect(&descriptor)
        .await
        .expect_err("unsupported");
    assert!(matches!(err, DriverError::UnsupportedEngine(_)));
}

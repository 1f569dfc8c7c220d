//! Start-up, JSON-line transport and shutdown.

use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};

use dbridge_engine::{Bridge, BridgeConfig, BridgeError};
use dbridge_executor::testing::ScriptedDriver;
use dbridge_executor::{ResultSet, Scalar};
use rstest::{fixture, rstest};
use serde_json::{Value, json};
use tempfile::TempDir;
use tokio::io::{AsyncBufRead, AsyncRead, AsyncReadExt, BufReader, ReadBuf};

#[fixture]
fn dir() -> TempDir {
    tempfile::tempdir().expect("tempdir")
}

fn config(dir: &TempDir) -> BridgeConfig {
    BridgeConfig::default().set_data_dir(dir.path())
}

/// Run the bridge over `input` and collect every output line as JSON.
async fn run(bridge: &Bridge<ScriptedDriver>, input: &str) -> Vec<Value> {
    let (result, out) = run_reader(bridge, input.as_bytes()).await;
    result.expect("bridge run");
    out
}

async fn run_reader<R>(
    bridge: &Bridge<ScriptedDriver>,
    input: R,
) -> (Result<(), BridgeError>, Vec<Value>)
where
    R: AsyncBufRead + Unpin,
{
    let (writer, mut reader) = tokio::io::duplex(64 * 1024);
    let collect = async move {
        let mut out = String::new();
        reader.read_to_string(&mut out).await.expect("read output");
        out
    };
    let (result, out) = tokio::join!(bridge.run(input, writer), collect);
    let lines = out
        .lines()
        .map(|line| serde_json::from_str(line).expect("json line"))
        .collect();
    (result, lines)
}

/// Input that fails on the first read, like a closed pipe.
struct BrokenPipe;

impl AsyncRead for BrokenPipe {
    fn poll_read(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        _buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        Poll::Ready(Err(io::Error::new(io::ErrorKind::BrokenPipe, "stdin went away")))
    }
}

fn write_store(dir: &TempDir, document: &Value) {
    std::fs::write(
        dir.path().join("database.json"),
        serde_json::to_vec(document).expect("encode"),
    )
    .expect("seed store");
}

#[rstest]
#[tokio::test]
async fn first_start_creates_the_store_and_announces_no_connections(dir: TempDir) {
    let bridge = Bridge::new(config(&dir), ScriptedDriver::new());

    let out = run(&bridge, "").await;

    assert_eq!(
        out,
        vec![json!({"type": "eval", "code": "(setq websocket-bridge-database-db-metas (ht<-plist '()))"})]
    );
    let stored = std::fs::read_to_string(dir.path().join("database.json")).expect("store");
    assert_eq!(stored, "{}");
}

#[rstest]
#[tokio::test]
async fn restart_reconnects_only_reachable_connections(dir: TempDir) {
    let seeded = json!({
        "up": {"engine": "MySQL", "host": "localhost", "port": 3306, "user": "root", "password": "pw"},
        "down": {"db_type": "MySQL", "host": "10.0.0.9", "port": "3307", "user": "root", "password": ""}
    });
    write_store(&dir, &seeded);
    let bridge = Bridge::new(config(&dir), ScriptedDriver::new().unreachable("10.0.0.9"));

    let out = run(&bridge, "").await;

    assert!(bridge.registry().is_live("up").await);
    assert!(!bridge.registry().is_live("down").await);

    let code = out[0]["code"].as_str().expect("metas eval");
    assert!(code.starts_with("(setq websocket-bridge-database-db-metas (ht<-plist '("));
    assert!(code.contains("down (engine \"MySQL\" host \"10.0.0.9\""));
    assert!(code.contains("up (engine \"MySQL\" host \"localhost\""));

    let stored: Value = serde_json::from_str(
        &std::fs::read_to_string(dir.path().join("database.json")).expect("store"),
    )
    .expect("json");
    let names: Vec<&str> = stored
        .as_object()
        .expect("object")
        .keys()
        .map(String::as_str)
        .collect();
    assert_eq!(names, ["down", "up"]);
}

#[rstest]
#[tokio::test]
async fn failures_surface_as_a_message_then_the_management_view(dir: TempDir) {
    let bridge = Bridge::new(config(&dir), ScriptedDriver::new());
    let input = concat!(
        "\n",
        "not json\n",
        r#"[{}, ["run_sql", "missing", null, "select 1"]]"#,
        "\n",
    );

    let out = run(&bridge, input).await;

    assert_eq!(out.len(), 3);
    assert_eq!(
        out[1],
        json!({"type": "message", "text": "Sql Error, please check the bridge log."})
    );
    assert_eq!(
        out[2],
        json!({"type": "eval", "code": "(websocket-bridge-app-open-buffer 'database)"})
    );
}

#[rstest]
#[tokio::test]
async fn query_results_are_rendered_for_the_editor(dir: TempDir) {
    write_store(
        &dir,
        &json!({"db1": {"engine": "MySQL", "host": "localhost", "port": 3306, "user": "root", "password": "pw"}}),
    );
    let tables = ResultSet::single_column("Tables_in_db1", [Scalar::from("t1"), Scalar::from("t2")]);
    let bridge = Bridge::new(config(&dir), ScriptedDriver::new().respond("show tables", tables));
    let input = concat!(
        r#"[{}, ["show_tables", "db1", "db1"]]"#,
        "\n",
    );

    let out = run(&bridge, input).await;

    assert_eq!(
        out.last(),
        Some(&json!({
            "type": "eval",
            "code": "(setq websocket-bridge-database-db-tables '(\"t1\" \"t2\"))"
        }))
    );
}

#[rstest]
#[tokio::test]
async fn input_eof_waits_for_in_flight_commands(dir: TempDir) {
    let driver = ScriptedDriver::new();
    let bridge = Bridge::new(config(&dir), driver.clone());
    let input = concat!(
        r#"[{}, ["new_database", "a", "MySQL", "localhost", 3306, "root", ""]]"#,
        "\n",
        r#"[{}, ["new_database", "b", "MySQL", "localhost", "3306", "root", ""]]"#,
        "\n",
    );

    run(&bridge, input).await;

    assert_eq!(driver.connects(), 2);
    let snapshot = bridge.registry().snapshot().await;
    assert_eq!(snapshot.keys().map(String::as_str).collect::<Vec<_>>(), ["a", "b"]);
}

#[rstest]
#[tokio::test]
async fn lines_that_are_not_utf8_are_skipped(dir: TempDir) {
    let driver = ScriptedDriver::new();
    let bridge = Bridge::new(config(&dir), driver.clone());
    let mut input = Vec::new();
    input.extend_from_slice(br#"[{}, ["new_database", "a", "MySQL", "localhost", 3306, "root", ""]]"#);
    input.extend_from_slice(b"\n\xff\xfe garbage\n");
    input.extend_from_slice(br#"[{}, ["run_sql", "missing", null, "select 1"]]"#);
    input.push(b'\n');

    let (result, out) = run_reader(&bridge, input.as_slice()).await;

    result.expect("bridge run");
    assert_eq!(driver.connects(), 1);
    assert!(bridge.registry().is_live("a").await);
    assert_eq!(out.len(), 3);
    assert_eq!(out[1]["type"], "message");
    assert_eq!(out[2]["code"], "(websocket-bridge-app-open-buffer 'database)");
}

#[rstest]
#[tokio::test]
async fn read_errors_finish_accepted_commands_before_failing(dir: TempDir) {
    let driver = ScriptedDriver::new();
    let bridge = Bridge::new(config(&dir), driver.clone());
    let accepted: &[u8] = b"[{}, [\"run_sql\", \"missing\", null, \"select 1\"]]\n";
    let input = BufReader::new(accepted.chain(BrokenPipe));

    let (result, out) = run_reader(&bridge, input).await;

    assert!(matches!(result, Err(BridgeError::Io(_))));
    assert_eq!(out.len(), 3, "metas plus the failure directives");
    assert_eq!(out[1]["type"], "message");
}

#[rstest]
#[tokio::test]
async fn connections_fixed_between_restarts_come_back_live(dir: TempDir) {
    write_store(
        &dir,
        &json!({"db1": {"engine": "MySQL", "host": "10.0.0.9", "port": 3306, "user": "root", "password": "pw"}}),
    );
    let driver = ScriptedDriver::new().unreachable("10.0.0.9");

    let first = Bridge::new(config(&dir), driver.clone());
    run(&first, "").await;
    assert!(!first.registry().is_live("db1").await);

    driver.set_reachable("10.0.0.9", true);
    let second = Bridge::new(config(&dir), driver.clone());
    run(&second, "").await;
    assert!(second.registry().is_live("db1").await);
    assert_eq!(driver.connects(), 1);
}

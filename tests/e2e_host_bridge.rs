//! End-to-end tests for the `festival-host` binary (stdin/stdout JSON bridge).
//!
//! Each test spawns the binary against a private config, lineup and store in
//! a temp directory, sends JSON commands over stdin, and reads JSON
//! responses and events from stdout.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use serde_json::{Value, json};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, BufWriter, Lines};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};

// Far enough out that every reminder lies in the future.
const CONFIG: &str = r#"
[calendar]
Thursday = "2099-06-11"
Friday = "2099-06-12"
Saturday = "2099-06-13"
Sunday = "2099-06-14"

[reminders]
default_offsets = [15, 0]
"#;

const LINEUP: &str = r#"[
  {"id": 1, "name": "Aurora Drive", "stage": "What Stage", "day": "Friday",
   "start": "8:00 PM", "end": "9:30 PM"},
  {"id": 2, "name": "Night Owls", "stage": "That Tent", "day": "Thursday",
   "start": "2:00 AM", "end": "3:00 AM"}
]"#;

struct HostBridgeHarness {
    child: Child,
    stdin: BufWriter<ChildStdin>,
    reader: Lines<BufReader<ChildStdout>>,
    events: Vec<Value>,
}

impl HostBridgeHarness {
    fn write_fixtures(dir: &Path) {
        let data_dir = dir.join("store");
        let config = format!(
            "{CONFIG}\n[storage]\ndata_dir = {}\n",
            toml::Value::String(data_dir.display().to_string())
        );
        std::fs::write(dir.join("config.toml"), config).unwrap();
        std::fs::write(dir.join("lineup.json"), LINEUP).unwrap();
    }

    async fn spawn(dir: &Path) -> Self {
        let mut child = Command::new(env!("CARGO_BIN_EXE_festival-host"))
            .env("FESTIVAL_CONFIG", dir.join("config.toml"))
            .env("FESTIVAL_DATA_DIR", dir)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .expect("failed to spawn festival-host");

        let child_stdin = child.stdin.take().expect("no stdin on child process");
        let child_stdout = child.stdout.take().expect("no stdout on child process");

        Self {
            child,
            stdin: BufWriter::new(child_stdin),
            reader: BufReader::new(child_stdout).lines(),
            events: Vec::new(),
        }
    }

    /// Send a command and return its response, collecting events seen on the way.
    async fn send(&mut self, cmd: Value) -> Value {
        let mut json = serde_json::to_string(&cmd).unwrap();
        json.push('\n');
        self.stdin.write_all(json.as_bytes()).await.unwrap();
        self.stdin.flush().await.unwrap();
        self.read_response().await
    }

    async fn read_line(&mut self) -> Option<Value> {
        let line = tokio::time::timeout(Duration::from_secs(10), self.reader.next_line())
            .await
            .expect("timeout reading from festival-host")
            .expect("IO error reading from festival-host")?;
        Some(serde_json::from_str(&line).unwrap_or_else(|e| {
            panic!("invalid JSON from festival-host: {e}\nraw line: {line}");
        }))
    }

    async fn read_response(&mut self) -> Value {
        loop {
            let value = self.read_line().await.expect("unexpected EOF from festival-host");
            if value.get("ok").is_some() {
                return value;
            }
            self.events.push(value);
        }
    }

    /// Stop the bridge and collect any trailing events until stdout closes.
    async fn shutdown(mut self) -> Vec<Value> {
        let resp = self.send(cmd("stop", "runtime.stop", json!({}))).await;
        assert_eq!(resp["ok"], true);
        while let Some(value) = self.read_line().await {
            self.events.push(value);
        }
        let status = tokio::time::timeout(Duration::from_secs(10), self.child.wait())
            .await
            .expect("festival-host did not exit")
            .unwrap();
        assert!(status.success());
        self.events
    }
}

fn cmd(request_id: &str, command: &str, payload: Value) -> Value {
    json!({
        "v": 1,
        "request_id": request_id,
        "command": command,
        "payload": payload,
    })
}

fn events_named<'a>(events: &'a [Value], name: &str) -> Vec<&'a Value> {
    events.iter().filter(|e| e["event"] == name).collect()
}

#[tokio::test]
async fn ping_and_version() {
    let dir = tempfile::tempdir().unwrap();
    HostBridgeHarness::write_fixtures(dir.path());
    let mut host = HostBridgeHarness::spawn(dir.path()).await;

    let pong = host.send(cmd("p1", "host.ping", json!({}))).await;
    assert_eq!(pong["ok"], true);
    assert_eq!(pong["request_id"], "p1");
    assert_eq!(pong["payload"]["pong"], true);

    let version = host.send(cmd("v1", "host.version", json!({}))).await;
    assert_eq!(version["payload"]["contract_version"], 1);

    host.shutdown().await;
}

#[tokio::test]
async fn grid_pins_early_morning_set_to_previous_night() {
    let dir = tempfile::tempdir().unwrap();
    HostBridgeHarness::write_fixtures(dir.path());
    let mut host = HostBridgeHarness::spawn(dir.path()).await;

    let friday = host
        .send(cmd("g1", "schedule.grid", json!({"day": "Friday"})))
        .await;
    assert_eq!(friday["ok"], true);
    let ids: Vec<_> = friday["payload"]["placements"]
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["performance_id"].as_u64().unwrap())
        .collect();
    assert_eq!(ids, vec![1, 2]);

    let thursday = host
        .send(cmd("g2", "schedule.grid", json!({"day": "Thursday"})))
        .await;
    assert!(thursday["payload"]["placements"].as_array().unwrap().is_empty());

    host.shutdown().await;
}

#[tokio::test]
async fn toggling_a_favorite_emits_notification_events() {
    let dir = tempfile::tempdir().unwrap();
    HostBridgeHarness::write_fixtures(dir.path());
    let mut host = HostBridgeHarness::spawn(dir.path()).await;

    let on = host
        .send(cmd("t1", "favorites.toggle", json!({"performance_id": 1})))
        .await;
    assert_eq!(on["ok"], true);
    assert_eq!(on["payload"]["favorited"], true);
    assert_eq!(on["payload"]["reminders"], 2);

    let off = host
        .send(cmd("t2", "favorites.toggle", json!({"performance_id": 1})))
        .await;
    assert_eq!(off["payload"]["favorited"], false);
    assert_eq!(off["payload"]["reminders"], 0);

    let events = host.shutdown().await;
    let scheduled = events_named(&events, "notification.schedule");
    assert_eq!(scheduled.len(), 2);
    assert_eq!(scheduled[0]["payload"]["fire_at"], "2099-06-12T19:45:00");
    assert_eq!(scheduled[1]["payload"]["fire_at"], "2099-06-12T20:00:00");
    assert_eq!(events_named(&events, "notification.cancel").len(), 2);
}

#[tokio::test]
async fn favorites_persist_across_restarts() {
    let dir = tempfile::tempdir().unwrap();
    HostBridgeHarness::write_fixtures(dir.path());

    let mut host = HostBridgeHarness::spawn(dir.path()).await;
    host.send(cmd("t1", "favorites.toggle", json!({"performance_id": 2})))
        .await;
    let saved = host
        .send(cmd("s1", "settings.save", json!({"offsets": [30]})))
        .await;
    assert_eq!(saved["payload"]["offsets"], json!([30]));
    host.shutdown().await;

    let mut host = HostBridgeHarness::spawn(dir.path()).await;
    let list = host.send(cmd("l1", "favorites.list", json!({}))).await;
    assert_eq!(list["payload"]["performance_ids"], json!([2]));
    let settings = host.send(cmd("g1", "settings.get", json!({}))).await;
    assert_eq!(settings["payload"]["offsets"], json!([30]));
    host.shutdown().await;
}

#[tokio::test]
async fn bad_input_gets_error_responses() {
    let dir = tempfile::tempdir().unwrap();
    HostBridgeHarness::write_fixtures(dir.path());
    let mut host = HostBridgeHarness::spawn(dir.path()).await;

    host.stdin.write_all(b"{ not json\n").await.unwrap();
    host.stdin.flush().await.unwrap();
    let parse = host.read_response().await;
    assert_eq!(parse["ok"], false);
    assert_eq!(parse["request_id"], "parse-error");

    let unknown = host
        .send(cmd("t1", "favorites.toggle", json!({"performance_id": 99})))
        .await;
    assert_eq!(unknown["ok"], false);
    assert_eq!(unknown["request_id"], "t1");

    host.shutdown().await;
}

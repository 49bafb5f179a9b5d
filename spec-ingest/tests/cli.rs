mod support;

use std::fs::write;
use std::path::Path;
use std::sync::{Arc, Mutex};

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

use support::{StubState, API_KEY};

const SPEC_YAML: &str = "openapi: 3.0.1\ninfo:\n  title: TechCorp Payments API\n  version: 1.0.0\npaths: {}\n";

fn spec_dir() -> TempDir {
    let dir = tempfile::tempdir().expect("temp dir");
    write(dir.path().join("openapi.yaml"), SPEC_YAML).expect("write spec");
    dir
}

/// The binary with a clean environment, run from `dir`.
fn ingest_cmd(dir: &Path) -> Command {
    let mut cmd = Command::cargo_bin("spec-ingest").expect("Binary exists");
    cmd.env_clear().current_dir(dir);
    cmd
}

#[tokio::test(flavor = "multi_thread")]
async fn local_spec_mode_creates_spec_and_exits_zero() {
    let (base, state) = support::start(StubState::default()).await;
    let dir = spec_dir();

    let assert = tokio::task::spawn_blocking({
        let dir = dir.path().to_path_buf();
        move || {
            ingest_cmd(&dir)
                .args(["--workspace-id", "ws-1", "--local-spec", "openapi.yaml"])
                .args(["--spec-name", "TechCorp Payments API (Spec Hub)"])
                .env("POSTMAN_API_KEY", API_KEY)
                .env("POSTMAN_API_BASE", &base)
                .assert()
        }
    })
    .await
    .unwrap();

    assert
        .success()
        .stdout(predicate::str::contains(
            "Created spec: TechCorp Payments API (Spec Hub) (id=spec-1)",
        ));

    let s = state.lock().unwrap();
    let upserts: Vec<_> = s
        .requests
        .iter()
        .filter(|r| (r.method == "POST" && r.path == "/specs") || r.method == "PUT")
        .collect();
    assert_eq!(upserts.len(), 1, "exactly one upsert call expected");
    assert_eq!(upserts[0].body["name"], "TechCorp Payments API (Spec Hub)");
    assert_eq!(upserts[0].body["schema"], SPEC_YAML);
    assert_eq!(
        s.requests_matching("POST", "/specs/spec-1/generations/collection")
            .len(),
        1
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn second_run_updates_instead_of_creating() {
    let (base, state) = support::start(StubState::default()).await;
    let dir = spec_dir();

    for expected in ["Created spec", "Updated spec"] {
        let dir = dir.path().to_path_buf();
        let base = base.clone();
        let assert = tokio::task::spawn_blocking(move || {
            ingest_cmd(&dir)
                .args(["--workspace-id", "ws-1", "--local-spec", "openapi.yaml"])
                .env("POSTMAN_API_KEY", API_KEY)
                .env("POSTMAN_API_BASE", &base)
                .assert()
        })
        .await
        .unwrap();
        assert.success().stdout(predicate::str::contains(expected));
    }

    assert_eq!(state.lock().unwrap().specs.len(), 1);
}

#[tokio::test(flavor = "multi_thread")]
async fn export_mode_missing_rest_api_id_is_configuration_error_without_network() {
    let (base, state) = support::start(StubState::default()).await;
    let dir = tempfile::tempdir().unwrap();

    let assert = tokio::task::spawn_blocking({
        let dir = dir.path().to_path_buf();
        move || {
            ingest_cmd(&dir)
                .args(["--workspace-id", "ws-1", "--region", "us-east-1"])
                .args(["--stage-name", "dev"])
                .env("POSTMAN_API_KEY", API_KEY)
                .env("POSTMAN_API_BASE", &base)
                .assert()
        }
    })
    .await
    .unwrap();

    assert
        .code(2)
        .stderr(predicate::str::contains("configuration error"))
        .stderr(predicate::str::contains("--rest-api-id"));
    assert!(
        state.lock().unwrap().requests.is_empty(),
        "no network calls expected"
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn authentication_failure_exits_non_zero_without_generation() {
    let (base, state) = support::start(StubState::default()).await;
    let dir = spec_dir();

    let assert = tokio::task::spawn_blocking({
        let dir = dir.path().to_path_buf();
        move || {
            ingest_cmd(&dir)
                .args(["--workspace-id", "ws-1", "--local-spec", "openapi.yaml"])
                .env("POSTMAN_API_KEY", "PMAK-revoked")
                .env("POSTMAN_API_BASE", &base)
                .assert()
        }
    })
    .await
    .unwrap();

    assert
        .code(5)
        .stderr(predicate::str::contains("sync error"))
        .stderr(predicate::str::contains("authentication failed"));

    let s = state.lock().unwrap();
    assert!(s.specs.is_empty());
    assert!(s
        .requests
        .iter()
        .all(|r| !r.path.contains("/generations/")));
}

#[test]
fn missing_api_key_exits_two() {
    let dir = spec_dir();
    ingest_cmd(dir.path())
        .args(["--workspace-id", "ws-1", "--local-spec", "openapi.yaml"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("POSTMAN_API_KEY"));
}

#[test]
fn missing_spec_file_exits_three() {
    let dir = tempfile::tempdir().unwrap();
    ingest_cmd(dir.path())
        .args(["--workspace-id", "ws-1", "--local-spec", "nope.yaml"])
        .env("POSTMAN_API_KEY", API_KEY)
        // Never reached: the file check fails first.
        .env("POSTMAN_API_BASE", "http://127.0.0.1:9")
        .assert()
        .code(3)
        .stderr(predicate::str::contains("nope.yaml"));
}

#[test]
fn flags_can_come_from_environment() {
    let dir = tempfile::tempdir().unwrap();
    ingest_cmd(dir.path())
        .env("POSTMAN_WORKSPACE_ID", "ws-1")
        .env("AWS_REGION", "us-east-1")
        .env("STAGE_NAME", "dev")
        .env("REST_API_ID", "")
        .env("POSTMAN_API_KEY", API_KEY)
        .assert()
        .code(2)
        .stderr(predicate::str::contains("--rest-api-id"));
}

#[tokio::test(flavor = "multi_thread")]
async fn out_copy_is_written_for_artifact_upload() {
    let (base, _state) = support::start(StubState::default()).await;
    let dir = spec_dir();

    let assert = tokio::task::spawn_blocking({
        let dir = dir.path().to_path_buf();
        move || {
            ingest_cmd(&dir)
                .args(["--workspace-id", "ws-1", "--local-spec", "openapi.yaml"])
                .args(["--out", "artifacts/openapi.yaml"])
                .env("POSTMAN_API_KEY", API_KEY)
                .env("POSTMAN_API_BASE", &base)
                .assert()
        }
    })
    .await
    .unwrap();

    assert.success();
    let copy = std::fs::read_to_string(dir.path().join("artifacts/openapi.yaml")).unwrap();
    assert_eq!(copy, SPEC_YAML);
}

#[tokio::test(flavor = "multi_thread")]
async fn empty_env_values_fall_back_to_config_file_and_default_name() {
    let (base, state) = support::start(StubState::default()).await;
    let dir = spec_dir();
    write(
        dir.path().join("spec-ingest.yaml"),
        "workspace_id: ws-from-file\nlocal_spec: openapi.yaml\n",
    )
    .unwrap();

    let assert = tokio::task::spawn_blocking({
        let dir = dir.path().to_path_buf();
        move || {
            ingest_cmd(&dir)
                .args(["--config", "spec-ingest.yaml"])
                .env("POSTMAN_WORKSPACE_ID", "")
                .env("SPEC_NAME", "")
                .env("LOCAL_SPEC", "")
                .env("POSTMAN_API_KEY", API_KEY)
                .env("POSTMAN_API_BASE", &base)
                .assert()
        }
    })
    .await
    .unwrap();

    assert.success().stdout(predicate::str::contains(
        "Created spec: TechCorp Payments API (Spec Hub) (id=spec-1)",
    ));
    let s = state.lock().unwrap();
    let creates = s.requests_matching("POST", "/specs");
    assert_eq!(creates[0].query.as_deref(), Some("workspaceId=ws-from-file"));
}

use tracing_subscriber::prelude::*;
use tracing_subscriber::{layer::Context, Layer, Registry};

/// Custom Layer to collect emitted event messages.
struct EventCollector {
    events: Arc<Mutex<Vec<String>>>,
}

impl<S> Layer<S> for EventCollector
where
    S: tracing::Subscriber,
{
    fn on_event(&self, event: &tracing::Event<'_>, _ctx: Context<'_, S>) {
        self.events.lock().unwrap().push(format!("{:?}", event));
    }
}

#[tokio::test]
async fn emits_trace_initialised_event() {
    let events = Arc::new(Mutex::new(Vec::new()));
    let collector = EventCollector {
        events: events.clone(),
    };
    let subscriber = Registry::default().with(collector);
    let _guard = tracing::subscriber::set_default(subscriber);

    use spec_ingest::cli::{run, Cli};

    // No workspace id: fails in configuration, before any I/O.
    let err = run(Cli::default()).await.unwrap_err();
    assert_eq!(spec_ingest::cli::exit_code_for(&err), 2);

    let event_msgs = events.lock().unwrap();
    assert!(
        event_msgs.iter().any(|msg| msg.contains("trace_initialised")),
        "Expected a 'trace_initialised' trace event, got: {:?}",
        event_msgs
    );
}

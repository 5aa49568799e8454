use assert_cmd::Command;
use assert_cmd::cargo;
use mockito::{Matcher, Server};
use predicates::prelude::*;
use std::io::Write;

const ENV_VARS: &[&str] = &[
    "DOCUSEAL_URL",
    "DOCUSEAL_API_KEY",
    "DOCUSEAL_TIMEOUT",
    "DOCUSEAL_RETRIES",
    "DOCUSEAL_RETRY_BASE_DELAY_MS",
    "DOCUSEAL_INSECURE_SKIP_VERIFY",
    "DOCUSEAL_OUTPUT",
];

/// A command with a clean DocuSeal environment pointed at `url`.
fn docuseal(url: &str) -> Command {
    let mut cmd = Command::new(cargo::cargo_bin!("docuseal"));
    for var in ENV_VARS {
        cmd.env_remove(var);
    }
    cmd.env("DOCUSEAL_URL", url)
        .env("DOCUSEAL_API_KEY", "test-key")
        .env("RUST_LOG", "error");
    cmd
}

#[test]
fn test_list_webhooks_prints_json() {
    let mut server = Server::new();
    let mock = server
        .mock("GET", "/api/webhooks")
        .match_header("X-Auth-Token", "test-key")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"data":[{"id":7,"url":"https://example.com/hook","events":["form.completed"],"active":true}]}"#)
        .create();

    docuseal(&server.url())
        .args(["webhooks", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"id\": 7"))
        .stdout(predicate::str::contains("form.completed"));

    mock.assert();
}

#[test]
fn test_raw_api_post() {
    let mut server = Server::new();
    let mock = server
        .mock("POST", "/api/submissions")
        .match_header("Idempotency-Key", Matcher::Regex("^[0-9a-f-]{36}$".into()))
        .match_body(Matcher::Json(serde_json::json!({"template_id": 1})))
        .with_status(200)
        .with_body(r#"[{"id":1,"status":"pending"}]"#)
        .create();

    docuseal(&server.url())
        .args(["api", "post", "/submissions", "--data", r#"{"template_id":1}"#])
        .assert()
        .success()
        .stdout(predicate::str::contains("pending"));

    mock.assert();
}

#[test]
fn test_raw_api_post_without_data_sends_no_body() {
    let mut server = Server::new();
    let mock = server
        .mock("POST", "/api/submitters/4/resend")
        .match_body(Matcher::Exact(String::new()))
        .with_status(200)
        .with_body(r#"{"id":4}"#)
        .create();

    docuseal(&server.url())
        .args(["api", "post", "/submitters/4/resend"])
        .assert()
        .success();

    mock.assert();
}

#[test]
fn test_create_template_from_html_file() {
    let mut server = Server::new();
    let mock = server
        .mock("POST", "/api/templates/html")
        .match_body(Matcher::Json(serde_json::json!({
            "name": "NDA",
            "html": "<h1>Agreement</h1>",
        })))
        .with_status(200)
        .with_body(r#"{"id":31,"name":"NDA"}"#)
        .create();

    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(b"<h1>Agreement</h1>").unwrap();

    docuseal(&server.url())
        .args(["templates", "create-html", "--name", "NDA", "--file"])
        .arg(file.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("\"id\": 31"));

    mock.assert();
}

#[test]
fn test_create_template_rejects_non_html_file() {
    let mut server = Server::new();
    let mock = server.mock("POST", Matcher::Any).expect(0).create();

    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(b"plain text only").unwrap();

    docuseal(&server.url())
        .args(["templates", "create-html", "--name", "NDA", "--file"])
        .arg(file.path())
        .assert()
        .code(2)
        .stderr(predicate::str::contains("valid HTML tags"));

    mock.assert();
}

#[test]
fn test_not_configured_exit_code() {
    let mut cmd = Command::new(cargo::cargo_bin!("docuseal"));
    for var in ENV_VARS {
        cmd.env_remove(var);
    }
    cmd.args(["webhooks", "list"])
        .assert()
        .code(5)
        .stderr(predicate::str::contains("not configured"));
}

#[test]
fn test_auth_failure_exit_code_hides_detail() {
    let mut server = Server::new();
    let mock = server
        .mock("GET", "/api/webhooks/1")
        .with_status(401)
        .with_body(r#"{"error":"API key sk_test_999 expired"}"#)
        .expect(1)
        .create();

    docuseal(&server.url())
        .args(["webhooks", "get", "1"])
        .assert()
        .code(3)
        .stderr(predicate::str::contains("authentication failed"))
        .stderr(predicate::str::contains("sk_test_999").not());

    mock.assert();
}

#[test]
fn test_rate_limit_json_report() {
    let mut server = Server::new();
    let mock = server
        .mock("GET", "/api/webhooks")
        .with_status(429)
        .expect(2)
        .create();

    let output = docuseal(&server.url())
        .args([
            "webhooks",
            "list",
            "--retries",
            "1",
            "--retry-base-delay-ms",
            "1000",
            "--output",
            "json",
        ])
        .assert()
        .code(4)
        .get_output()
        .clone();

    mock.assert();
    let report: serde_json::Value = serde_json::from_slice(&output.stderr).unwrap();
    assert_eq!(report["type"], "rate_limit");
    assert_eq!(report["exit_code"], 4);
    assert_eq!(report["retry_after_seconds"], 2);
}

#[test]
fn test_validation_error_makes_no_request() {
    let mut server = Server::new();
    let mock = server.mock("POST", Matcher::Any).expect(0).create();

    docuseal(&server.url())
        .args([
            "webhooks",
            "create",
            "--url",
            "http://169.254.169.254/latest",
            "--events",
            "form.completed",
        ])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("validation error on field 'url'"));

    mock.assert();
}

#[test]
fn test_server_error_is_sanitized() {
    let mut server = Server::new();
    let mock = server
        .mock("DELETE", "/api/webhooks/4")
        .with_status(500)
        .with_body(r#"{"error":"db down","password":"hunter2"}"#)
        .expect(1)
        .create();

    docuseal(&server.url())
        .args(["webhooks", "delete", "4"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("API error (status 500)"))
        .stderr(predicate::str::contains("[REDACTED]"))
        .stderr(predicate::str::contains("hunter2").not());

    mock.assert();
}

#[test]
fn test_deadline_cuts_backoff_short() {
    let mut server = Server::new();
    let _mock = server.mock("GET", "/api/webhooks").with_status(429).create();

    docuseal(&server.url())
        .args([
            "webhooks",
            "list",
            "--retry-base-delay-ms",
            "30000",
            "--deadline",
            "1",
            "--output",
            "json",
        ])
        .timeout(std::time::Duration::from_secs(20))
        .assert()
        .code(7)
        .stderr(predicate::str::contains("\"type\":\"timeout\""));
}

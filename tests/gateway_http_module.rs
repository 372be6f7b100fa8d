mod support;

use credisphere::config::GatewayConfig;
use credisphere::gateway::{AnalysisGateway, ApiCallPayload, GatewayError, HttpGateway, UploadFile};
use credisphere::shared::ReportId;
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::sync::Mutex;
use support::{ok_json, MockHttpServer, MockReply};

static ENV_LOCK: Mutex<()> = Mutex::new(());

fn report_id() -> ReportId {
    ReportId::parse("rpt-test-0001").expect("report id")
}

fn config_for(server: &MockHttpServer) -> GatewayConfig {
    GatewayConfig {
        classify_url: server.url("/add_context"),
        analyze_url: server.url("/selected-apis"),
        upload_url: server.url("/upload_pdfs"),
        chat_url: server.url("/chat"),
        auth_token_env: "CREDISPHERE_TEST_UNSET_TOKEN".to_string(),
        timeout_ms: 5_000,
        retry_backoff_ms: 1,
        ..GatewayConfig::default()
    }
}

fn body_json(raw: &str) -> Value {
    serde_json::from_str(raw).expect("request body json")
}

#[test]
fn classify_posts_context_with_bearer_token() {
    let server = MockHttpServer::start(1, |_| {
        ok_json(json!({
            "api_calls": ["bureauA", "bureauB"],
            "requested_data": [["ssn", "name"], ["name", "income"]],
        }))
    });
    let gateway =
        HttpGateway::new(&config_for(&server)).with_auth_token(Some("test-token".to_string()));

    let classification = gateway
        .classify("Assess Acme Corp", &report_id())
        .expect("classify");
    assert_eq!(classification.api_calls, vec!["bureauA", "bureauB"]);

    let requests = server.finish();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].path, "/add_context");
    assert_eq!(requests[0].auth_header, "Bearer test-token");
    let body = body_json(&requests[0].body);
    assert_eq!(body["context"], "Assess Acme Corp");
    assert_eq!(body["report_id"], "rpt-test-0001");
}

#[test]
fn classify_rejects_mismatched_shapes_as_schema_errors() {
    let server = MockHttpServer::start(1, |_| {
        ok_json(json!({
            "api_calls": ["bureauA", "bureauB"],
            "requested_data": [["ssn"]],
        }))
    });
    let gateway = HttpGateway::new(&config_for(&server));

    let err = gateway
        .classify("q", &report_id())
        .expect_err("length mismatch");
    assert!(err.is_schema(), "unexpected error: {err}");
    server.finish();
}

#[test]
fn error_status_is_reported_without_retry() {
    let server = MockHttpServer::start(1, |_| {
        MockReply::Json(500, json!({"error": "boom"}).to_string())
    });
    let mut config = config_for(&server);
    config.max_retries = 3;
    let gateway = HttpGateway::new(&config);

    let err = gateway.classify("q", &report_id()).expect_err("status");
    match err {
        GatewayError::Status { status, body, .. } => {
            assert_eq!(status, 500);
            assert!(body.contains("boom"));
        }
        other => panic!("expected status error, got {other}"),
    }
    assert_eq!(server.finish().len(), 1);
}

#[test]
fn transport_failures_are_retried_when_configured() {
    let server = MockHttpServer::start(3, |_| MockReply::Hangup);
    let mut config = config_for(&server);
    config.max_retries = 2;
    let gateway = HttpGateway::new(&config);

    let err = gateway
        .chat(&report_id(), "hello")
        .expect_err("every attempt hangs up");
    assert!(err.is_transport(), "unexpected error: {err}");
    assert_eq!(server.finish().len(), 3);
}

#[test]
fn retry_recovers_after_a_dropped_connection() {
    let attempts = Mutex::new(0_u32);
    let server = MockHttpServer::start(2, move |_| {
        let mut seen = attempts.lock().expect("lock attempts");
        *seen += 1;
        if *seen == 1 {
            MockReply::Hangup
        } else {
            ok_json(json!({"response": "recovered"}))
        }
    });
    let mut config = config_for(&server);
    config.max_retries = 1;
    let gateway = HttpGateway::new(&config);

    let reply = gateway.chat(&report_id(), "hello").expect("second attempt");
    assert_eq!(reply.response.as_deref(), Some("recovered"));
    assert_eq!(server.finish().len(), 2);
}

#[test]
fn analyze_without_markdown_is_still_success() {
    let server = MockHttpServer::start(1, |_| ok_json(json!({"scores": {"bureauA": 700}})));
    let gateway = HttpGateway::new(&config_for(&server));

    let calls = vec![ApiCallPayload {
        endpoint: "bureauA".to_string(),
        fields: BTreeMap::from([("ssn".to_string(), "123".to_string())]),
    }];
    let response = gateway.analyze(&calls, &report_id()).expect("analyze");
    assert!(response.markdown.is_none());
    assert_eq!(response.raw["scores"]["bureauA"], 700);

    let requests = server.finish();
    assert_eq!(requests[0].path, "/selected-apis");
    let body = body_json(&requests[0].body);
    assert_eq!(body["api_calls"][0]["endpoint"], "bureauA");
    assert_eq!(body["api_calls"][0]["fields"]["ssn"], "123");
    assert_eq!(body["report_id"], "rpt-test-0001");
}

#[test]
fn upload_sends_multipart_form_with_report_id() {
    let server = MockHttpServer::start(1, |_| ok_json(json!({"stored": 2})));
    let gateway = HttpGateway::new(&config_for(&server));

    let files = vec![
        UploadFile::new("statement.pdf", b"%PDF-1.4 statement".to_vec()),
        UploadFile::new("notes.txt", b"plain notes".to_vec()),
    ];
    let receipt = gateway.upload(&files, &report_id()).expect("upload");
    assert_eq!(receipt.raw["stored"], 2);

    let requests = server.finish();
    let request = &requests[0];
    assert_eq!(request.path, "/upload_pdfs");
    assert!(request
        .content_type
        .starts_with("multipart/form-data; boundary="));
    assert!(request.body.contains("name=\"report_id\""));
    assert!(request.body.contains("rpt-test-0001"));
    assert!(request.body.contains("filename=\"statement.pdf\""));
    assert!(request.body.contains("Content-Type: application/pdf"));
    assert_eq!(request.body.matches("name=\"files\"").count(), 2);
}

#[test]
fn chat_reply_without_response_field_is_empty() {
    let server = MockHttpServer::start(1, |_| ok_json(json!({"status": "ok"})));
    let gateway = HttpGateway::new(&config_for(&server));

    let reply = gateway.chat(&report_id(), "hi").expect("chat");
    assert!(reply.response.is_none());

    let requests = server.finish();
    assert_eq!(requests[0].path, "/chat");
    assert_eq!(body_json(&requests[0].body)["message"], "hi");
}

#[test]
fn token_is_read_from_configured_env_var() {
    let _guard = ENV_LOCK.lock().expect("env lock");
    let server = MockHttpServer::start(1, |_| ok_json(json!({"response": "ok"})));
    let mut config = config_for(&server);
    config.auth_token_env = "CREDISPHERE_TEST_GATEWAY_TOKEN".to_string();
    config.auth_token = Some("inline-token".to_string());
    std::env::set_var("CREDISPHERE_TEST_GATEWAY_TOKEN", "env-token");
    let gateway = HttpGateway::new(&config);
    std::env::remove_var("CREDISPHERE_TEST_GATEWAY_TOKEN");

    gateway.chat(&report_id(), "hi").expect("chat");
    let requests = server.finish();
    assert_eq!(requests[0].auth_header, "Bearer env-token");
}

use flate2::read::GzDecoder;
use influx_gateway::config::SenderConfig;
use influx_gateway::domain::{ConsistencyLevel, Point, Precision};
use influx_gateway::sender::{DEFAULT_USER_AGENT, Sender, SenderError};
use std::io::Read;
use std::time::Duration;
use wiremock::{
    Mock, MockServer, ResponseTemplate,
    matchers::{basic_auth, header, method, path, query_param},
};

fn cpu_point(value: f64, ts: i64) -> Point {
    Point::builder("cpu")
        .tag("host", "server01")
        .field("value", value)
        .timestamp_ns(ts)
        .build()
        .unwrap()
}

#[tokio::test]
async fn test_write_points_no_content_is_success() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/write"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&mock_server)
        .await;

    let sender = Sender::new(&SenderConfig::with_addr(mock_server.uri())).unwrap();
    let outcome = sender
        .write_points("telegraf", "", ConsistencyLevel::One, &[cpu_point(0.5, 1)])
        .await
        .unwrap();

    assert_eq!(outcome.status, 204);
    assert_eq!(outcome.points, 1);

    let stats = sender.metrics().snapshot();
    assert_eq!(stats.requests, 1);
    assert_eq!(stats.successes, 1);
    assert_eq!(stats.points_sent, 1);
}

#[tokio::test]
async fn test_write_points_ok_is_success() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/write"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&mock_server)
        .await;

    let sender = Sender::new(&SenderConfig::with_addr(mock_server.uri())).unwrap();
    let result = sender
        .write_points("telegraf", "", ConsistencyLevel::One, &[cpu_point(0.5, 1)])
        .await;

    assert!(result.is_ok());
}

#[tokio::test]
async fn test_write_points_server_error_carries_body() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/write"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&mock_server)
        .await;

    let sender = Sender::new(&SenderConfig::with_addr(mock_server.uri())).unwrap();
    let err = sender
        .write_points("telegraf", "", ConsistencyLevel::One, &[cpu_point(0.5, 1)])
        .await
        .unwrap_err();

    match &err {
        SenderError::Status { status, body } => {
            assert_eq!(*status, 500);
            assert_eq!(body, "boom");
        }
        other => panic!("Expected Status error, got {other:?}"),
    }
    assert!(err.to_string().contains("boom"));
    assert_eq!(err.response_body(), Some("boom"));
    assert_eq!(sender.metrics().snapshot().failures, 1);
}

#[tokio::test]
async fn test_query_parameters_match_call_and_config() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/write"))
        .and(query_param("db", "metrics db"))
        .and(query_param("rp", "autogen"))
        .and(query_param("precision", "ms"))
        .and(query_param("consistency", "quorum"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&mock_server)
        .await;

    let config = SenderConfig {
        precision: Some(Precision::Milliseconds),
        consistency: Some(ConsistencyLevel::Quorum),
        ..SenderConfig::with_addr(mock_server.uri())
    };
    let sender = Sender::new(&config).unwrap();

    // The configured consistency wins over the caller's
    sender
        .write_points("metrics db", "autogen", ConsistencyLevel::Any, &[cpu_point(1.0, 1)])
        .await
        .unwrap();
}

#[tokio::test]
async fn test_base_path_is_preserved() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/influx/write"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&mock_server)
        .await;

    let sender =
        Sender::new(&SenderConfig::with_addr(format!("{}/influx/", mock_server.uri()))).unwrap();
    sender
        .write_points("db", "", ConsistencyLevel::One, &[cpu_point(1.0, 1)])
        .await
        .unwrap();
}

#[tokio::test]
async fn test_headers_and_basic_auth() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/write"))
        .and(header("user-agent", "probe/2.0"))
        .and(basic_auth("admin", "s3cret"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&mock_server)
        .await;

    let config = SenderConfig {
        username: "admin".to_string(),
        password: "s3cret".to_string(),
        user_agent: "probe/2.0".to_string(),
        ..SenderConfig::with_addr(mock_server.uri())
    };
    let sender = Sender::new(&config).unwrap();

    sender
        .write_points("db", "", ConsistencyLevel::One, &[cpu_point(1.0, 1)])
        .await
        .unwrap();
}

#[tokio::test]
async fn test_no_auth_header_without_username() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/write"))
        .respond_with(ResponseTemplate::new(204))
        .mount(&mock_server)
        .await;

    let sender = Sender::new(&SenderConfig::with_addr(mock_server.uri())).unwrap();
    sender
        .write_points("db", "", ConsistencyLevel::One, &[cpu_point(1.0, 1)])
        .await
        .unwrap();

    let requests = mock_server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 1);
    assert!(!requests[0].headers.contains_key("authorization"));
    assert_eq!(
        requests[0].headers.get("user-agent").unwrap(),
        DEFAULT_USER_AGENT
    );
}

#[tokio::test]
async fn test_gzip_body_and_header() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/write"))
        .and(header("content-encoding", "gzip"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&mock_server)
        .await;

    let config = SenderConfig {
        gzip: true,
        ..SenderConfig::with_addr(mock_server.uri())
    };
    let sender = Sender::new(&config).unwrap();
    let points = vec![cpu_point(0.5, 10), cpu_point(0.75, 20)];

    sender
        .write_points("db", "", ConsistencyLevel::One, &points)
        .await
        .unwrap();

    let requests = mock_server.received_requests().await.unwrap();
    let mut decoded = String::new();
    GzDecoder::new(requests[0].body.as_slice())
        .read_to_string(&mut decoded)
        .unwrap();

    assert_eq!(
        decoded,
        "cpu,host=server01 value=0.5 10\ncpu,host=server01 value=0.75 20\n"
    );
}

#[tokio::test]
async fn test_empty_batch_still_posts() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/write"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&mock_server)
        .await;

    let sender = Sender::new(&SenderConfig::with_addr(mock_server.uri())).unwrap();
    let outcome = sender
        .write_points("db", "", ConsistencyLevel::One, &[])
        .await
        .unwrap();

    assert_eq!(outcome.bytes_sent, 0);
    let requests = mock_server.received_requests().await.unwrap();
    assert!(requests[0].body.is_empty());
}

#[tokio::test]
async fn test_timeout_is_network_error() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/write"))
        .respond_with(ResponseTemplate::new(204).set_delay(Duration::from_secs(3)))
        .mount(&mock_server)
        .await;

    let config = SenderConfig {
        timeout: 1,
        ..SenderConfig::with_addr(mock_server.uri())
    };
    let sender = Sender::new(&config).unwrap();

    let err = sender
        .write_points("db", "", ConsistencyLevel::One, &[cpu_point(1.0, 1)])
        .await
        .unwrap_err();

    assert!(matches!(err, SenderError::Network(_)));
}

#[test]
fn test_unsupported_scheme_rejected() {
    for addr in ["udp://localhost:8089", "ftp://example.com", "file:///tmp/x"] {
        let err = Sender::new(&SenderConfig::with_addr(addr)).unwrap_err();
        assert!(
            matches!(err, SenderError::UnsupportedScheme(_)),
            "{addr} should be rejected, got {err:?}"
        );
    }
}

#[test]
fn test_malformed_address_rejected() {
    let err = Sender::new(&SenderConfig::with_addr("not a url")).unwrap_err();
    assert!(matches!(err, SenderError::InvalidUrl { .. }));
}

#[test]
fn test_http_and_https_accepted() {
    assert!(Sender::new(&SenderConfig::with_addr("http://localhost:8086")).is_ok());
    assert!(Sender::new(&SenderConfig::with_addr("https://influx.example.com")).is_ok());
}

#[test]
fn test_defaults_applied_for_empty_config() {
    let sender = Sender::new(&SenderConfig::with_addr("http://localhost:8086")).unwrap();

    assert_eq!(sender.precision(), Precision::Nanoseconds);
    assert_eq!(sender.consistency(), ConsistencyLevel::One);
    assert_eq!(sender.timeout(), Duration::from_secs(1));
    assert_eq!(sender.user_agent(), DEFAULT_USER_AGENT);
    assert!(!sender.gzip());
}

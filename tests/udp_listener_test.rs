use async_trait::async_trait;
use influx_gateway::config::{Config, SenderConfig, UdpConfig};
use influx_gateway::domain::{ConsistencyLevel, FieldValue};
use influx_gateway::gateway::{
    DatabaseInfo, Gateway, MetaClient, MetaError, NoopMetaClient, Service, ServiceError,
};
use influx_gateway::listener::UdpListener;
use influx_gateway::sender::{PointsWriter, WriteError, WriteRequest};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::UdpSocket;
use wiremock::{
    Mock, MockServer, ResponseTemplate,
    matchers::{method, path, query_param},
};

#[derive(Default)]
struct RecordingWriter {
    requests: Mutex<Vec<WriteRequest>>,
}

impl RecordingWriter {
    fn batches(&self) -> Vec<WriteRequest> {
        self.requests.lock().clone()
    }
}

#[async_trait]
impl PointsWriter for RecordingWriter {
    async fn write_points(&self, request: WriteRequest) -> Result<(), WriteError> {
        self.requests.lock().push(request);
        Ok(())
    }
}

struct RejectingWriter;

#[async_trait]
impl PointsWriter for RejectingWriter {
    async fn write_points(&self, _request: WriteRequest) -> Result<(), WriteError> {
        Err(WriteError::QueueFull { capacity: 1 })
    }
}

#[derive(Default)]
struct RecordingMeta {
    created: Mutex<Vec<String>>,
    fail: bool,
}

#[async_trait]
impl MetaClient for RecordingMeta {
    async fn create_database(&self, name: &str) -> Result<Option<DatabaseInfo>, MetaError> {
        self.created.lock().push(name.to_string());
        if self.fail {
            return Err(MetaError::CreateDatabase {
                database: name.to_string(),
                reason: "catalog unavailable".to_string(),
            });
        }
        Ok(Some(DatabaseInfo {
            name: name.to_string(),
            default_retention_policy: None,
        }))
    }
}

fn udp_config(batch_size: usize, batch_timeout: Duration) -> UdpConfig {
    UdpConfig {
        enabled: true,
        bind_address: "127.0.0.1:0".to_string(),
        database: "sensors".to_string(),
        retention_policy: "short".to_string(),
        batch_size,
        batch_timeout,
        ..UdpConfig::default()
    }
}

async fn send(listener: &UdpListener, payload: &str) {
    let target = listener.local_addr().unwrap();
    let client = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    client.send_to(payload.as_bytes(), target).await.unwrap();
}

async fn wait_for<F: Fn() -> bool>(condition: F) {
    tokio::time::timeout(Duration::from_secs(5), async {
        while !condition() {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("condition not met in time");
}

#[tokio::test]
async fn test_full_batch_written_and_remainder_flushed_on_close() {
    let writer = Arc::new(RecordingWriter::default());
    let mut listener = UdpListener::new(
        udp_config(2, Duration::from_secs(60)),
        writer.clone(),
        Arc::new(NoopMetaClient),
    );
    listener.open().await.unwrap();

    send(&listener, "cpu,host=a value=1 1\ncpu,host=a value=2 2\nnot a point\n").await;
    wait_for(|| writer.batches().len() == 1).await;

    send(&listener, "cpu,host=b value=3i 3").await;
    wait_for(|| listener.stats().points_received == 3).await;

    listener.close().await.unwrap();

    let batches = writer.batches();
    assert_eq!(batches.len(), 2);
    assert_eq!(batches[0].database, "sensors");
    assert_eq!(batches[0].retention_policy, "short");
    assert_eq!(batches[0].consistency, ConsistencyLevel::Any);
    assert_eq!(batches[0].points.len(), 2);
    assert_eq!(batches[0].points[1].timestamp_ns(), 2);

    assert_eq!(batches[1].points.len(), 1);
    assert_eq!(
        batches[1].points[0].fields().get("value"),
        Some(&FieldValue::Integer(3))
    );

    let stats = listener.stats();
    assert_eq!(stats.datagrams, 2);
    assert_eq!(stats.parse_failures, 1);
    assert_eq!(stats.batches_written, 2);
    assert!(!listener.is_open());
}

#[tokio::test]
async fn test_partial_batch_flushed_after_timeout() {
    let writer = Arc::new(RecordingWriter::default());
    let mut listener = UdpListener::new(
        udp_config(1000, Duration::from_millis(50)),
        writer.clone(),
        Arc::new(NoopMetaClient),
    );
    listener.open().await.unwrap();

    send(&listener, "mem free=512i 100").await;
    wait_for(|| writer.batches().len() == 1).await;

    assert_eq!(writer.batches()[0].points.len(), 1);
    listener.close().await.unwrap();
    assert_eq!(writer.batches().len(), 1);
}

#[tokio::test]
async fn test_write_failures_are_counted() {
    let mut listener = UdpListener::new(
        udp_config(1, Duration::from_secs(60)),
        Arc::new(RejectingWriter),
        Arc::new(NoopMetaClient),
    );
    listener.open().await.unwrap();

    send(&listener, "cpu value=1 1").await;
    wait_for(|| listener.stats().write_failures == 1).await;

    listener.close().await.unwrap();
    assert_eq!(listener.stats().batches_written, 0);
}

#[tokio::test]
async fn test_open_provisions_database_and_tolerates_meta_failure() {
    let meta = Arc::new(RecordingMeta {
        fail: true,
        ..RecordingMeta::default()
    });
    let mut listener = UdpListener::new(
        udp_config(10, Duration::from_secs(1)),
        Arc::new(RecordingWriter::default()),
        meta.clone(),
    );

    listener.open().await.unwrap();
    assert_eq!(*meta.created.lock(), vec!["sensors"]);
    listener.close().await.unwrap();
}

#[tokio::test]
async fn test_open_twice_and_close_unopened() {
    let mut listener = UdpListener::new(
        udp_config(10, Duration::from_secs(1)),
        Arc::new(RecordingWriter::default()),
        Arc::new(NoopMetaClient),
    );

    listener.close().await.unwrap();

    listener.open().await.unwrap();
    assert!(matches!(
        listener.open().await,
        Err(ServiceError::AlreadyOpen)
    ));
    listener.close().await.unwrap();
}

#[tokio::test]
async fn test_bind_conflict_is_open_error() {
    let occupied = std::net::UdpSocket::bind("127.0.0.1:0").unwrap();
    let config = UdpConfig {
        bind_address: occupied.local_addr().unwrap().to_string(),
        ..udp_config(10, Duration::from_secs(1))
    };

    let mut listener = UdpListener::new(
        config,
        Arc::new(RecordingWriter::default()),
        Arc::new(NoopMetaClient),
    );

    assert!(matches!(
        listener.open().await,
        Err(ServiceError::Bind { .. })
    ));
}

#[tokio::test]
async fn test_datagram_reaches_destination_through_gateway() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/write"))
        .and(query_param("db", "sensors"))
        .and(query_param("rp", "short"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&mock_server)
        .await;

    let config = Config {
        sender: SenderConfig::with_addr(mock_server.uri()),
        ..Config::default()
    };
    let mut gateway = Gateway::new(&config).unwrap();
    gateway.open().await.unwrap();

    let mut listener = UdpListener::new(
        udp_config(100, Duration::from_secs(60)),
        gateway.writer(),
        Arc::new(NoopMetaClient),
    );
    listener.open().await.unwrap();

    send(&listener, "weather,city=Oslo temp=-3.5 1700000000000000000").await;
    wait_for(|| listener.stats().points_received == 1).await;

    listener.close().await.unwrap();
    let report = gateway.close().await.unwrap();
    assert!(report.drained);

    let requests = mock_server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 1);
    assert_eq!(
        String::from_utf8_lossy(&requests[0].body),
        "weather,city=Oslo temp=-3.5 1700000000000000000\n"
    );

    let stats = gateway.sender().metrics().snapshot();
    assert_eq!(stats.successes, 1);
    assert_eq!(stats.enqueued, 1);
}

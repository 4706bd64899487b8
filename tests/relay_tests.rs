// tests/relay_tests.rs
use heartbeat_relay::config::{Config, MonitorMode};
use heartbeat_relay::heartbeat::HeartbeatBuffer;
use heartbeat_relay::metrics::{start_metrics_server, MetricsCollector, MetricsRegistry};
use heartbeat_relay::relay::Relay;
use heartbeat_relay::server::{bind_tcp, RequestHandler, ServerBuilder};
use reqwest::{Client, StatusCode};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::oneshot;
use tokio::time::{sleep, timeout};

struct TestRelay {
    addr: SocketAddr,
    client: Client,
    _shutdown: oneshot::Sender<()>,
}

impl TestRelay {
    async fn start(mode: MonitorMode) -> Self {
        Self::start_with_metrics(mode, None).await
    }

    async fn start_with_metrics(
        mode: MonitorMode,
        metrics: Option<Arc<MetricsCollector>>,
    ) -> Self {
        let mut config = Config::default();
        config.server.host = "127.0.0.1".to_string();
        config.monitor.mode = mode;

        let buffer = Arc::new(HeartbeatBuffer::new());
        let relay = Arc::new(Relay::new(&config, buffer, metrics));
        let listener = bind_tcp("127.0.0.1:0".parse().unwrap()).await.unwrap();
        let addr = listener.local_addr().unwrap();

        let (tx, rx) = oneshot::channel::<()>();
        let server = ServerBuilder::new(addr)
            .with_handler(RequestHandler::new(relay))
            .with_shutdown(async move {
                let _ = rx.await;
            });
        tokio::spawn(server.serve_on(listener));

        Self {
            addr,
            client: Client::builder().no_proxy().build().unwrap(),
            _shutdown: tx,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    async fn rcv(&self) -> StatusCode {
        self.client
            .post(self.url("/rcv"))
            .send()
            .await
            .unwrap()
            .status()
    }

    async fn mon(&self) -> reqwest::Response {
        self.client.get(self.url("/mon")).send().await.unwrap()
    }
}

#[tokio::test]
async fn test_heartbeat_then_probe_reports_alive() {
    let relay = TestRelay::start(MonitorMode::NonBlocking).await;

    assert_eq!(relay.rcv().await, StatusCode::OK);

    let response = relay.mon().await;
    assert_eq!(response.status(), StatusCode::OK);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body, serde_json::json!({ "status": "ok" }));
}

#[tokio::test]
async fn test_probe_without_heartbeat_is_not_found() {
    let relay = TestRelay::start(MonitorMode::NonBlocking).await;

    let start = Instant::now();
    let response = relay.mon().await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert!(start.elapsed() < Duration::from_secs(1));
}

#[tokio::test]
async fn test_one_heartbeat_satisfies_one_probe() {
    let relay = TestRelay::start(MonitorMode::NonBlocking).await;

    assert_eq!(relay.rcv().await, StatusCode::OK);
    assert_eq!(relay.mon().await.status(), StatusCode::OK);
    assert_eq!(relay.mon().await.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_burst_of_heartbeats_collapses_to_one() {
    let relay = Arc::new(TestRelay::start(MonitorMode::NonBlocking).await);

    let senders: Vec<_> = (0..20)
        .map(|_| {
            let relay = relay.clone();
            tokio::spawn(async move { relay.rcv().await })
        })
        .collect();
    for sender in senders {
        assert_eq!(sender.await.unwrap(), StatusCode::OK);
    }

    let probes: Vec<_> = (0..20)
        .map(|_| {
            let relay = relay.clone();
            tokio::spawn(async move { relay.mon().await.status() })
        })
        .collect();
    let mut alive = 0;
    for probe in probes {
        match probe.await.unwrap() {
            StatusCode::OK => alive += 1,
            status => assert_eq!(status, StatusCode::NOT_FOUND),
        }
    }

    assert_eq!(alive, 1);
}

#[tokio::test]
async fn test_blocking_probe_completes_after_late_heartbeat() {
    let relay = Arc::new(TestRelay::start(MonitorMode::Blocking).await);

    let start = Instant::now();
    let probe = {
        let relay = relay.clone();
        tokio::spawn(async move { relay.mon().await.status() })
    };

    sleep(Duration::from_secs(2)).await;
    assert!(!probe.is_finished());
    assert_eq!(relay.rcv().await, StatusCode::OK);

    let status = timeout(Duration::from_secs(1), probe)
        .await
        .expect("probe not released by heartbeat")
        .unwrap();
    assert_eq!(status, StatusCode::OK);
    assert!(start.elapsed() >= Duration::from_secs(2));
}

#[tokio::test]
async fn test_blocking_probe_returns_pending_heartbeat_immediately() {
    let relay = TestRelay::start(MonitorMode::Blocking).await;

    assert_eq!(relay.rcv().await, StatusCode::OK);
    let response = timeout(Duration::from_secs(1), relay.mon())
        .await
        .expect("pending heartbeat should not block");
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_receive_never_waits_for_monitor() {
    let relay = TestRelay::start(MonitorMode::Blocking).await;

    // Nobody consumes: every heartbeat after the first is dropped, quietly.
    for _ in 0..5 {
        let status = timeout(Duration::from_secs(1), relay.rcv())
            .await
            .expect("receive endpoint blocked");
        assert_eq!(status, StatusCode::OK);
    }
}

#[tokio::test]
async fn test_unknown_paths_and_methods() {
    let relay = TestRelay::start(MonitorMode::NonBlocking).await;

    let response = relay.client.get(relay.url("/")).send().await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = relay.client.delete(relay.url("/mon")).send().await.unwrap();
    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
}

#[tokio::test]
async fn test_metrics_count_outcomes() {
    let registry = MetricsRegistry::new().unwrap();
    let relay =
        TestRelay::start_with_metrics(MonitorMode::NonBlocking, Some(registry.collector())).await;
    let metrics_addr = start_metrics_server(
        "127.0.0.1:0".parse().unwrap(),
        registry,
        "/metrics".to_string(),
    )
    .await
    .unwrap();

    relay.rcv().await;
    relay.rcv().await;
    relay.mon().await;
    relay.mon().await;

    let text = relay
        .client
        .get(format!("http://{}/metrics", metrics_addr))
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert!(text.contains(r#"hb_heartbeats_total{outcome="accepted"} 1"#));
    assert!(text.contains(r#"hb_heartbeats_total{outcome="dropped"} 1"#));
    assert!(text.contains(r#"hb_probes_total{mode="non_blocking",outcome="alive"} 1"#));
    assert!(text.contains(r#"hb_probes_total{mode="non_blocking",outcome="absent"} 1"#));

    let response = relay
        .client
        .get(format!("http://{}/other", metrics_addr))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_shutdown_stops_accept_loop() {
    let config = Config::default();
    let relay = Arc::new(Relay::new(&config, Arc::new(HeartbeatBuffer::new()), None));
    let listener = bind_tcp("127.0.0.1:0".parse().unwrap()).await.unwrap();
    let addr = listener.local_addr().unwrap();

    let (tx, rx) = oneshot::channel::<()>();
    let server = tokio::spawn(
        ServerBuilder::new(addr)
            .with_handler(RequestHandler::new(relay))
            .with_shutdown(async move {
                let _ = rx.await;
            })
            .serve_on(listener),
    );

    tx.send(()).unwrap();
    let result = timeout(Duration::from_secs(1), server)
        .await
        .expect("server did not stop")
        .unwrap();
    assert!(result.is_ok());
}

#[tokio::test]
async fn test_serve_fails_when_port_is_taken() {
    let holder = bind_tcp("127.0.0.1:0".parse().unwrap()).await.unwrap();
    let addr = holder.local_addr().unwrap();
    let buffer = Arc::new(HeartbeatBuffer::new());
    let relay = Arc::new(Relay::new(&Config::default(), buffer, None));

    let result = timeout(
        Duration::from_secs(1),
        ServerBuilder::new(addr)
            .with_handler(RequestHandler::new(relay))
            .serve(),
    )
    .await
    .expect("bind failure must be immediate");
    assert!(result.is_err());
}

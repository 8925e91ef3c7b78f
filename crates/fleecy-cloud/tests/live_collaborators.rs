//! Live collaborators against an in-process fake of the identity, compute
//! and Prometheus HTTP APIs.

use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpListener;
use url::Url;

use fleecy_cloud::{HttpClient, LiveUtilization, OpenStackClient, PrometheusClient};
use fleecy_core::{Participant, SelectionCriteria};
use fleecy_selection::{
    CollaboratorError, ExclusionReason, SelectionError, SelectionStage, VmSelector,
};

// ── Fake cloud ──────────────────────────────────────────────────────

type Reply = (u16, Vec<(&'static str, String)>, String);

/// Requests the fake has served, by kind.
#[derive(Default)]
struct Hits {
    auth: AtomicUsize,
    targets: AtomicUsize,
}

#[derive(Clone, Default)]
struct FakeCloud {
    reject_credentials: bool,
    /// Instance label whose usage queries return no samples.
    silent_instance: Option<&'static str>,
    hits: Arc<Hits>,
}

impl FakeCloud {
    fn route(&self, method: &str, target: &str) -> Reply {
        let url = Url::parse(&format!("http://fake{target}")).expect("target");
        match (method, url.path()) {
            ("POST", "/identity/v3/auth/tokens") => {
                self.hits.auth.fetch_add(1, Ordering::SeqCst);
                if self.reject_credentials {
                    (401, vec![], r#"{"error":{"code":401}}"#.to_string())
                } else {
                    (201, vec![("X-Subject-Token", "tok-1".to_string())], "{}".to_string())
                }
            }
            ("GET", "/compute/v2.1/servers/detail") => (200, vec![], SERVERS.to_string()),
            ("GET", "/compute/v2.1/flavors/f-large") => (200, vec![], FLAVOR_LARGE.to_string()),
            ("GET", "/compute/v2.1/flavors/f-medium") => (200, vec![], FLAVOR_MEDIUM.to_string()),
            ("GET", path) if path.starts_with("/compute/v2.1/flavors/") => {
                (404, vec![], r#"{"itemNotFound":{}}"#.to_string())
            }
            ("GET", path) if path.starts_with("/compute/v2.1/servers/") => {
                (200, vec![], r#"{"server":{"status":"ACTIVE"}}"#.to_string())
            }
            ("GET", "/api/v1/query") => {
                let query = url
                    .query_pairs()
                    .find(|(k, _)| k == "query")
                    .map(|(_, v)| v.into_owned())
                    .unwrap_or_default();
                (200, vec![], self.prometheus(&query))
            }
            _ => (404, vec![], "not found".to_string()),
        }
    }

    fn prometheus(&self, query: &str) -> String {
        if query.starts_with("up{") {
            self.hits.targets.fetch_add(1, Ordering::SeqCst);
            return vector(&[("10.0.0.12:9100", "1"), ("10.0.0.13:9100", "1")]);
        }
        if let Some(silent) = self.silent_instance {
            if query.contains(silent) {
                return vector(&[]);
            }
        }
        let value = if query.contains("node_cpu_seconds_total") {
            "20"
        } else if query.contains("node_memory_MemAvailable_bytes") {
            "30"
        } else {
            "10"
        };
        let instance = if query.contains("10.0.0.13") { "10.0.0.13:9100" } else { "10.0.0.12:9100" };
        vector(&[(instance, value)])
    }
}

fn vector(samples: &[(&str, &str)]) -> String {
    let result: Vec<_> = samples
        .iter()
        .map(|(instance, value)| {
            serde_json::json!({"metric": {"instance": instance, "job": "node-exporter"}, "value": [1718000000.0, value]})
        })
        .collect();
    serde_json::json!({"status": "success", "data": {"resultType": "vector", "result": result}}).to_string()
}

const SERVERS: &str = r#"{"servers": [
    {"id": "vm-large", "name": "large", "status": "ACTIVE", "flavor": {"id": "f-large"},
     "addresses": {"private": [{"addr": "10.0.0.12", "OS-EXT-IPS:type": "fixed"}]}},
    {"id": "vm-medium", "name": "medium", "status": "ACTIVE", "flavor": {"id": "f-medium"},
     "addresses": {"private": [{"addr": "10.0.0.13", "OS-EXT-IPS:type": "fixed"}]}},
    {"id": "vm-mystery", "name": "mystery", "status": "ACTIVE", "flavor": {"id": "f-gone"},
     "addresses": {}}
]}"#;

const FLAVOR_LARGE: &str = r#"{"flavor": {"id": "f-large", "name": "m1.large", "vcpus": 8, "ram": 16384, "disk": 100}}"#;
const FLAVOR_MEDIUM: &str = r#"{"flavor": {"id": "f-medium", "name": "m1.medium", "vcpus": 4, "ram": 8192, "disk": 50}}"#;

async fn start_fake_cloud(cloud: FakeCloud) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind to random port");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        while let Ok((stream, _)) = listener.accept().await {
            let cloud = cloud.clone();
            tokio::spawn(async move {
                let mut reader = BufReader::new(stream);
                let mut request_line = String::new();
                if reader.read_line(&mut request_line).await.is_err() {
                    return;
                }
                let mut content_length = 0usize;
                loop {
                    let mut line = String::new();
                    match reader.read_line(&mut line).await {
                        Ok(0) | Err(_) => return,
                        Ok(_) => {}
                    }
                    if line == "\r\n" {
                        break;
                    }
                    if let Some(v) = line.to_ascii_lowercase().strip_prefix("content-length:") {
                        content_length = v.trim().parse().unwrap_or(0);
                    }
                }
                let mut body = vec![0u8; content_length];
                if reader.read_exact(&mut body).await.is_err() {
                    return;
                }

                let mut parts = request_line.split_whitespace();
                let method = parts.next().unwrap_or_default();
                let target = parts.next().unwrap_or("/");
                let (status, headers, body) = cloud.route(method, target);

                let mut response = format!(
                    "HTTP/1.1 {status} X\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n",
                    body.len()
                );
                for (name, value) in headers {
                    response.push_str(&format!("{name}: {value}\r\n"));
                }
                response.push_str("\r\n");
                response.push_str(&body);
                let _ = reader.get_mut().write_all(response.as_bytes()).await;
            });
        }
    });
    addr
}

fn participant(addr: SocketAddr) -> Participant {
    Participant {
        openstack_endpoint: format!("http://{addr}"),
        application_credential_id: "cred-id".to_string(),
        application_credential_secret: "cred-secret".to_string(),
        prometheus_url: Some(format!("http://{addr}")),
        ..Participant::new("p-1", "lab")
    }
}

fn live_selector() -> VmSelector {
    let http = HttpClient::new(Duration::from_secs(5));
    let openstack = OpenStackClient::new(http.clone());
    let live = LiveUtilization::new(openstack.clone(), PrometheusClient::new(http), 9090);
    VmSelector::new(Arc::new(openstack), Arc::new(live))
}

// ── Inventory ───────────────────────────────────────────────────────

#[tokio::test]
async fn lists_servers_with_flavors_resolved() {
    let addr = start_fake_cloud(FakeCloud {
        reject_credentials: false,
        silent_instance: None,
        ..FakeCloud::default()
    })
    .await;
    let client = OpenStackClient::new(HttpClient::new(Duration::from_secs(5)));

    let servers = client.list_servers(&participant(addr)).await.unwrap();

    assert_eq!(servers.len(), 3);
    assert_eq!(servers[0].flavor.vcpus, 8);
    assert_eq!(servers[1].flavor.name, "m1.medium");
    // Missing flavor degrades instead of failing the listing.
    assert_eq!(servers[2].flavor.name, "Unknown");
    assert_eq!(servers[2].flavor.ram, 0);
}

#[tokio::test]
async fn rejected_credentials_fail_the_selection() {
    let addr = start_fake_cloud(FakeCloud {
        reject_credentials: true,
        silent_instance: None,
        ..FakeCloud::default()
    })
    .await;

    let err = live_selector()
        .select(&participant(addr), &SelectionCriteria::default())
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        SelectionError::Inventory(CollaboratorError::Unauthorized(_))
    ));
}

#[tokio::test]
async fn health_probe_reads_compute_status() {
    let addr = start_fake_cloud(FakeCloud {
        reject_credentials: false,
        silent_instance: None,
        ..FakeCloud::default()
    })
    .await;
    let client = OpenStackClient::new(HttpClient::new(Duration::from_secs(5)));

    let health = client.health_check(&participant(addr), "vm-large").await;
    assert!(health.healthy);
    assert_eq!(health.status, "ACTIVE");
}

// ── Selection over live data ────────────────────────────────────────

#[tokio::test]
async fn live_selection_prefers_the_large_server() {
    let addr = start_fake_cloud(FakeCloud {
        reject_credentials: false,
        silent_instance: None,
        ..FakeCloud::default()
    })
    .await;

    let report = live_selector()
        .select(&participant(addr), &SelectionCriteria::default())
        .await
        .unwrap();

    assert_eq!(report.stage, SelectionStage::Selected);
    assert_eq!(report.selected.as_ref().unwrap().id, "vm-large");
    let usage = report.utilization.unwrap();
    assert_eq!(
        (usage.cpu_usage_percent, usage.memory_usage_percent, usage.disk_usage_percent),
        (20.0, 30.0, 10.0)
    );
    assert!(usage.is_healthy);
    assert_eq!(report.score.unwrap().priority, 300.0);
    assert!(!report.simulated);
    // The unknown flavor fails the vCPU floor.
    assert!(report
        .exclusions
        .iter()
        .any(|e| e.candidate_id == "vm-mystery" && matches!(e.reason, ExclusionReason::TooFewVcpus { .. })));
}

#[tokio::test]
async fn one_token_and_target_list_serve_every_candidate() {
    let cloud = FakeCloud::default();
    let hits = cloud.hits.clone();
    let addr = start_fake_cloud(cloud).await;
    let selector = live_selector();

    let report = selector
        .select(&participant(addr), &SelectionCriteria::default())
        .await
        .unwrap();
    assert_eq!(report.selected.unwrap().id, "vm-large");

    // Inventory listing plus one shared session for both measured servers.
    assert_eq!(hits.auth.load(Ordering::SeqCst), 2);
    assert_eq!(hits.targets.load(Ordering::SeqCst), 1);

    // A second pass inside the session window reuses it.
    selector.utilizations(&participant(addr)).await.unwrap();
    assert_eq!(hits.auth.load(Ordering::SeqCst), 3);
    assert_eq!(hits.targets.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn missing_series_excludes_only_that_server() {
    let addr = start_fake_cloud(FakeCloud {
        reject_credentials: false,
        silent_instance: Some("10.0.0.12"),
        ..FakeCloud::default()
    })
    .await;

    let report = live_selector()
        .select(&participant(addr), &SelectionCriteria::default())
        .await
        .unwrap();

    assert_eq!(report.selected.as_ref().unwrap().id, "vm-medium");
    assert_eq!(report.fetch_failures, 1);
}

#[tokio::test]
async fn utilization_table_marks_unreadable_rows() {
    let addr = start_fake_cloud(FakeCloud {
        reject_credentials: false,
        silent_instance: Some("10.0.0.13"),
        ..FakeCloud::default()
    })
    .await;

    let rows = live_selector().utilizations(&participant(addr)).await.unwrap();

    assert_eq!(rows.len(), 3);
    assert!(rows[0].available);
    assert!((rows[0].utilization_score - 22.0).abs() < 1e-9);
    assert!(!rows[1].available);
    assert!(!rows[1].utilization.is_healthy);
    // No IPv4 address, so no metrics either.
    assert!(!rows[2].available);
}

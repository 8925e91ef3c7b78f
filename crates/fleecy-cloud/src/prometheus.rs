//! Prometheus instant-query client for node-exporter usage figures.

use std::collections::HashMap;

use serde::Deserialize;
use tracing::debug;
use url::Url;

use crate::error::{CloudError, CloudResult};
use crate::transport::HttpClient;

/// Port node-exporter listens on when no scrape target matches.
const NODE_EXPORTER_PORT: u16 = 9100;

#[derive(Debug, Clone, Deserialize)]
pub struct QueryResponse {
    pub status: String,
    #[serde(default)]
    pub data: QueryData,
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct QueryData {
    #[serde(rename = "resultType", default)]
    pub result_type: String,
    #[serde(default)]
    pub result: Vec<Sample>,
}

/// One instant-vector sample: labels plus `[timestamp, "value"]`.
#[derive(Debug, Clone, Deserialize)]
pub struct Sample {
    #[serde(default)]
    pub metric: HashMap<String, String>,
    pub value: (f64, String),
}

impl QueryResponse {
    /// Value of the first sample.
    pub fn first_value(&self) -> CloudResult<f64> {
        if self.status != "success" {
            return Err(CloudError::Malformed(format!(
                "query status {}: {}",
                self.status,
                self.error.as_deref().unwrap_or("no error message")
            )));
        }
        let sample = self
            .data
            .result
            .first()
            .ok_or_else(|| CloudError::NoData("query returned no samples".to_string()))?;
        let value: f64 = sample
            .value
            .1
            .parse()
            .map_err(|_| CloudError::Malformed(format!("non-numeric sample value {:?}", sample.value.1)))?;
        if !value.is_finite() {
            return Err(CloudError::NoData(format!("sample value is {value}")));
        }
        Ok(value)
    }

    /// `instance` label of the first sample whose host part equals `ip`.
    pub fn instance_for_ip(&self, ip: &str) -> Option<String> {
        self.data
            .result
            .iter()
            .filter_map(|s| s.metric.get("instance"))
            .find(|instance| instance_host(instance) == ip)
            .cloned()
    }
}

/// Instance label for `ip` from an already fetched target list, else `ip:9100`.
pub fn instance_or_default(targets: Option<&QueryResponse>, ip: &str) -> String {
    if let Some(instance) = targets.and_then(|t| t.instance_for_ip(ip)) {
        return instance;
    }
    debug!(ip, "no node-exporter target matches, using default port");
    format!("{ip}:{NODE_EXPORTER_PORT}")
}

fn instance_host(instance: &str) -> &str {
    match instance.rsplit_once(':') {
        Some((host, port)) if port.chars().all(|c| c.is_ascii_digit()) => host,
        _ => instance,
    }
}

pub fn cpu_query(instance: &str) -> String {
    format!(
        r#"100 - (avg by (instance) (irate(node_cpu_seconds_total{{mode="idle",instance="{instance}"}}[5m])) * 100)"#
    )
}

pub fn memory_query(instance: &str) -> String {
    format!(
        r#"(1 - (node_memory_MemAvailable_bytes{{instance="{instance}"}} / node_memory_MemTotal_bytes{{instance="{instance}"}})) * 100"#
    )
}

pub fn disk_query(instance: &str) -> String {
    format!(
        r#"(1 - (node_filesystem_avail_bytes{{instance="{instance}",mountpoint="/"}} / node_filesystem_size_bytes{{instance="{instance}",mountpoint="/"}})) * 100"#
    )
}

const TARGETS_QUERY: &str = r#"up{job="node-exporter"}"#;

/// CPU, memory and root-disk usage of one node, in percent.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NodeUsage {
    pub cpu_percent: f64,
    pub memory_percent: f64,
    pub disk_percent: f64,
}

#[derive(Debug, Clone)]
pub struct PrometheusClient {
    http: HttpClient,
}

impl PrometheusClient {
    pub fn new(http: HttpClient) -> Self {
        Self { http }
    }

    pub async fn query(&self, base: &Url, promql: &str) -> CloudResult<QueryResponse> {
        let mut url = base.join("api/v1/query").map_err(|e| CloudError::InvalidUrl {
            url: base.to_string(),
            message: e.to_string(),
        })?;
        url.query_pairs_mut().append_pair("query", promql);

        let response = self.http.get(&url, &[]).await?.expect_success(&url)?;
        response.json(&url)
    }

    pub async fn query_value(&self, base: &Url, promql: &str) -> CloudResult<f64> {
        self.query(base, promql).await?.first_value()
    }

    /// Current node-exporter scrape targets.
    pub async fn targets(&self, base: &Url) -> CloudResult<QueryResponse> {
        self.query(base, TARGETS_QUERY).await
    }

    /// Run the three usage queries concurrently. Any failure fails the lot.
    pub async fn node_usage(&self, base: &Url, instance: &str) -> CloudResult<NodeUsage> {
        let (cpu, memory, disk) = (cpu_query(instance), memory_query(instance), disk_query(instance));
        let (cpu_percent, memory_percent, disk_percent) = tokio::try_join!(
            self.query_value(base, &cpu),
            self.query_value(base, &memory),
            self.query_value(base, &disk),
        )?;
        Ok(NodeUsage {
            cpu_percent,
            memory_percent,
            disk_percent,
        })
    }
}

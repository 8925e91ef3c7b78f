//! Domain types shared across the fleecy workspace.
//!
//! These types describe participant clouds, the provider-native VM
//! listings their inventories return, and the admission criteria a caller
//! submits for one federated-learning task. All of them serialize to/from
//! JSON and TOML.

use std::collections::BTreeMap;
use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Unique identifier for a participant cloud.
pub type ParticipantId = String;

/// Provider-assigned identifier for a VM instance.
pub type InstanceId = String;

// ── Participant ───────────────────────────────────────────────────

/// A participant cloud whose VM inventory can be searched.
#[derive(Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct Participant {
    pub id: ParticipantId,
    #[serde(default)]
    pub name: String,
    /// Base URL of the participant's OpenStack deployment.
    #[serde(default)]
    pub openstack_endpoint: String,
    #[serde(default)]
    pub application_credential_id: String,
    #[serde(default)]
    pub application_credential_secret: String,
    /// Prometheus base URL. When absent, the endpoint host plus the
    /// configured metrics port is used.
    #[serde(default)]
    pub prometheus_url: Option<String>,
}

impl Participant {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            ..Self::default()
        }
    }

    /// Whether an application credential is configured.
    pub fn has_credentials(&self) -> bool {
        !self.application_credential_id.is_empty()
            && !self.application_credential_secret.is_empty()
    }
}

impl fmt::Debug for Participant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Participant")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("openstack_endpoint", &self.openstack_endpoint)
            .field("application_credential_id", &self.application_credential_id)
            .field("application_credential_secret", &"<redacted>")
            .field("prometheus_url", &self.prometheus_url)
            .finish()
    }
}

// ── VM status ─────────────────────────────────────────────────────

/// Lifecycle status reported by the compute provider.
///
/// Status text is case-insensitive. Parsing trims and upper-cases it, so
/// every variant, [`VmStatus::Other`] included, holds the canonical
/// spelling and compares by it. The compute API's `BUILD` is an alias of
/// `BUILDING`; [`VmStatus::as_str`] always yields the canonical name, and
/// parsing a canonical name gives back the same status.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum VmStatus {
    Active,
    Building,
    Error,
    Shutoff,
    Other(String),
}

impl VmStatus {
    pub fn as_str(&self) -> &str {
        match self {
            VmStatus::Active => "ACTIVE",
            VmStatus::Building => "BUILDING",
            VmStatus::Error => "ERROR",
            VmStatus::Shutoff => "SHUTOFF",
            VmStatus::Other(s) => s,
        }
    }

    /// True for an `Other` status with no text (an unset status).
    pub fn is_blank(&self) -> bool {
        matches!(self, VmStatus::Other(s) if s.trim().is_empty())
    }
}

impl From<&str> for VmStatus {
    fn from(s: &str) -> Self {
        let canonical = s.trim().to_ascii_uppercase();
        match canonical.as_str() {
            "ACTIVE" => VmStatus::Active,
            "BUILD" | "BUILDING" => VmStatus::Building,
            "ERROR" => VmStatus::Error,
            "SHUTOFF" => VmStatus::Shutoff,
            _ => VmStatus::Other(canonical),
        }
    }
}

impl From<String> for VmStatus {
    fn from(s: String) -> Self {
        VmStatus::from(s.as_str())
    }
}

impl From<VmStatus> for String {
    fn from(status: VmStatus) -> Self {
        status.as_str().to_string()
    }
}

impl FromStr for VmStatus {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(VmStatus::from(s))
    }
}

impl fmt::Display for VmStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── Provider-native listing ───────────────────────────────────────

/// Hardware profile of a server (OpenStack "flavor").
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct FlavorDetails {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub vcpus: u32,
    /// Memory in MB.
    #[serde(default)]
    pub ram: u64,
    /// Root disk in GB.
    #[serde(default)]
    pub disk: u64,
}

impl FlavorDetails {
    /// Placeholder used when a flavor lookup fails.
    pub fn unknown(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: "Unknown".to_string(),
            ..Self::default()
        }
    }
}

/// One address attached to a server on a named network.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ServerAddress {
    pub addr: String,
    /// "fixed" or "floating".
    #[serde(rename = "OS-EXT-IPS:type", default)]
    pub kind: String,
}

/// A server as listed by the compute provider.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ServerListing {
    pub id: InstanceId,
    pub name: String,
    pub status: VmStatus,
    pub flavor: FlavorDetails,
    /// Network name → addresses.
    #[serde(default)]
    pub addresses: BTreeMap<String, Vec<ServerAddress>>,
    #[serde(rename = "OS-EXT-STS:power_state", default)]
    pub power_state: i32,
    #[serde(rename = "OS-EXT-AZ:availability_zone", default)]
    pub availability_zone: String,
}

impl ServerListing {
    /// IPv4 addresses across all networks, in network-name order.
    pub fn ipv4_addresses(&self) -> Vec<String> {
        self.addresses
            .values()
            .flatten()
            .filter(|a| !a.addr.contains(':'))
            .map(|a| a.addr.clone())
            .collect()
    }
}

// ── Selection criteria ────────────────────────────────────────────

/// Admission contract for one task, as submitted by a caller.
///
/// Numeric fields are signed so malformed input stays representable and
/// can be rejected explicitly. Zero means "use the default".
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct SelectionCriteria {
    pub min_vcpus: i64,
    pub min_ram_mb: i64,
    pub min_disk_gb: i64,
    pub required_status: Option<VmStatus>,
    pub max_cpu_usage_percent: f64,
    pub model_size_mb: i64,
}

impl SelectionCriteria {
    /// Criteria with only the model size set.
    pub fn for_model(model_size_mb: i64) -> Self {
        Self {
            model_size_mb,
            ..Self::default()
        }
    }

    /// Layer `over` on top of `self`: every non-zero field of `over` wins.
    pub fn overlay(&self, over: &SelectionCriteria) -> SelectionCriteria {
        fn pick_i(base: i64, over: i64) -> i64 {
            if over != 0 { over } else { base }
        }
        SelectionCriteria {
            min_vcpus: pick_i(self.min_vcpus, over.min_vcpus),
            min_ram_mb: pick_i(self.min_ram_mb, over.min_ram_mb),
            min_disk_gb: pick_i(self.min_disk_gb, over.min_disk_gb),
            required_status: over
                .required_status
                .clone()
                .filter(|s| !s.is_blank())
                .or_else(|| self.required_status.clone()),
            max_cpu_usage_percent: if over.max_cpu_usage_percent != 0.0 {
                over.max_cpu_usage_percent
            } else {
                self.max_cpu_usage_percent
            },
            model_size_mb: pick_i(self.model_size_mb, over.model_size_mb),
        }
    }
}

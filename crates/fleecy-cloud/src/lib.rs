//! fleecy-cloud: the collaborators a selection runs against.
//!
//! - **`openstack`**: identity v3 auth, compute inventory, health probe
//! - **`prometheus`**: node-exporter usage through instant queries
//! - **`live`**: [`LiveUtilization`], usage + health for one candidate
//! - **`mock`**: deterministic five-VM fleet
//! - **`provider`**: pick the pair above by [`fleecy_core::ProviderMode`]
//! - **`transport`**: the HTTP client underneath
//!
//! All traffic is plain HTTP/1.1 over hyper, one connection per request.

pub mod error;
pub mod live;
pub mod mock;
pub mod openstack;
pub mod prometheus;
pub mod provider;
pub mod transport;

pub use error::{CloudError, CloudResult};
pub use live::{LiveUtilization, prometheus_base};
pub use mock::{MockInventory, mock_fleet};
pub use openstack::{InstanceHealth, OpenStackClient};
pub use prometheus::{NodeUsage, PrometheusClient, QueryResponse};
pub use provider::{Collaborators, build_collaborators, build_selector};
pub use transport::{HttpClient, HttpResponse, endpoint_url};

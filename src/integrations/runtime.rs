//! Container runtime contract - the collaborator that actually pulls, stops,
//! creates and starts containers, plus the inventory data it hands back.

use async_trait::async_trait;
use std::collections::{BTreeMap, BTreeSet};

/// Transport protocol of a published port
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub enum Protocol {
    #[default]
    Tcp,
    Udp,
}

impl std::fmt::Display for Protocol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Tcp => write!(f, "tcp"),
            Self::Udp => write!(f, "udp"),
        }
    }
}

impl Protocol {
    /// Parse a runtime protocol label. Anything but tcp/udp is unsupported.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "" | "tcp" => Some(Self::Tcp),
            "udp" => Some(Self::Udp),
            _ => None,
        }
    }
}

/// Wildcard address the runtime reports for IPv6 "all interfaces"
const IPV6_UNSPECIFIED: &str = "::";

/// A declared mapping between a container port and a host endpoint.
///
/// `host_port == 0` means the host side is unassigned and gets resolved at
/// update time. An empty `host_ip` binds all interfaces.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PortBinding {
    pub container_port: u16,
    pub host_port: u16,
    pub host_ip: String,
    pub protocol: Protocol,
}

impl PortBinding {
    pub fn new(container_port: u16, host_port: u16) -> Self {
        Self {
            container_port,
            host_port,
            host_ip: String::new(),
            protocol: Protocol::Tcp,
        }
    }

    pub fn with_host_ip(mut self, host_ip: &str) -> Self {
        self.host_ip = normalize_host_ip(host_ip);
        self
    }

    pub fn with_protocol(mut self, protocol: Protocol) -> Self {
        self.protocol = protocol;
        self
    }

    /// Key the runtime uses for an exposed port, e.g. `8080/tcp`
    pub fn identity(&self) -> String {
        format!("{}/{}", self.container_port, self.protocol)
    }

    pub fn is_wildcard(&self) -> bool {
        self.host_port == 0
    }
}

impl std::fmt::Display for PortBinding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let ip = if self.host_ip.is_empty() {
            "*"
        } else {
            self.host_ip.as_str()
        };
        if self.is_wildcard() {
            write!(f, "{}->{}/{}", ip, self.container_port, self.protocol)
        } else {
            write!(
                f,
                "{}:{}->{}/{}",
                ip, self.host_port, self.container_port, self.protocol
            )
        }
    }
}

/// Map the runtime's wildcard address sentinel onto "unset"
pub fn normalize_host_ip(ip: &str) -> String {
    let trimmed = ip.trim();
    if trimmed == IPV6_UNSPECIFIED {
        String::new()
    } else {
        trimmed.to_string()
    }
}

/// A running container as seen at inventory-list time
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerSnapshot {
    pub id: String,
    /// Name as listed by the runtime, including its leading `/`
    pub name: String,
    pub image: String,
    pub command: String,
    pub image_id: String,
    pub bindings: Vec<PortBinding>,
}

impl ContainerSnapshot {
    pub fn exposes_ports(&self) -> bool {
        !self.bindings.is_empty()
    }

    pub fn display_name(&self) -> &str {
        self.name.trim_start_matches('/')
    }

    pub fn ports_label(&self) -> String {
        self.bindings
            .iter()
            .map(|b| b.to_string())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// Host side of a published port
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostEndpoint {
    pub host_ip: String,
    pub host_port: u16,
}

/// Port exposure and publishing configuration handed to `create_container`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PortExposure {
    pub exposed_ports: BTreeSet<String>,
    pub port_map: BTreeMap<String, HostEndpoint>,
}

impl PortExposure {
    pub fn from_bindings(bindings: &[PortBinding]) -> Self {
        let mut exposure = Self::default();
        for binding in bindings {
            let key = binding.identity();
            exposure.exposed_ports.insert(key.clone());
            exposure.port_map.insert(
                key,
                HostEndpoint {
                    host_ip: binding.host_ip.clone(),
                    host_port: binding.host_port,
                },
            );
        }
        exposure
    }

    pub fn is_empty(&self) -> bool {
        self.exposed_ports.is_empty()
    }
}

/// Everything needed to create the replacement container
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecreateSpec {
    pub image: String,
    pub exposure: PortExposure,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FetchError {
    #[error("container runtime unavailable: {0}")]
    RuntimeUnavailable(String),
    #[error("permission denied by container runtime: {0}")]
    PermissionDenied(String),
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PullError {
    #[error("image not found: {0}")]
    ImageNotFound(String),
    #[error("network error: {0}")]
    Network(String),
    #[error("registry authentication failed: {0}")]
    Auth(String),
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StopError {
    #[error("container not found: {0}")]
    NotFound(String),
    #[error("runtime error: {0}")]
    Runtime(String),
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CreateError {
    #[error("host port conflict: {0}")]
    PortConflict(String),
    #[error("invalid container configuration: {0}")]
    InvalidConfig(String),
    #[error("runtime error: {0}")]
    Runtime(String),
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StartError {
    #[error("host port conflict: {0}")]
    PortConflict(String),
    #[error("runtime error: {0}")]
    Runtime(String),
}

/// Operations the update pipeline calls through; never reimplemented locally.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ContainerRuntime: Send + Sync {
    async fn list_containers(&self) -> Result<Vec<ContainerSnapshot>, FetchError>;

    async fn pull_image(&self, image: &str) -> Result<(), PullError>;

    async fn stop_container(&self, name: &str, grace_seconds: i64) -> Result<(), StopError>;

    /// Returns the id of the newly created container
    async fn create_container(&self, spec: &RecreateSpec) -> Result<String, CreateError>;

    async fn start_container(&self, id: &str) -> Result<(), StartError>;
}

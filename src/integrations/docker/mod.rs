//! Docker integration - inventory listing and the container lifecycle calls
//! the update pipeline drives

use anyhow::Result;
use async_trait::async_trait;
use bollard::container::{
    Config, CreateContainerOptions, ListContainersOptions, StartContainerOptions,
    StopContainerOptions,
};
use bollard::errors::Error as BollardError;
use bollard::image::CreateImageOptions;
use bollard::models::{ContainerSummary, HostConfig, PortBinding as DockerPortBinding};
use bollard::{ClientVersion, Docker};
use futures::StreamExt;
use std::collections::{HashMap, HashSet};

use crate::config::DockerConfig;
use crate::integrations::runtime::{
    ContainerRuntime, ContainerSnapshot, CreateError, FetchError, PortBinding, Protocol,
    PullError, RecreateSpec, StartError, StopError,
};

/// Environment variable selecting the Docker API version
pub const API_VERSION_ENV: &str = "DOCKER_API_VERSION";

/// Environment variable naming the daemon address
pub const DOCKER_HOST_ENV: &str = "DOCKER_HOST";

#[cfg(unix)]
const DEFAULT_DOCKER_HOST: &str = "unix:///var/run/docker.sock";
#[cfg(windows)]
const DEFAULT_DOCKER_HOST: &str = "npipe:////./pipe/docker_engine";

/// Docker client wrapper
pub struct DockerClient {
    docker: Docker,
}

impl DockerClient {
    /// Connect using the configured socket and API version.
    ///
    /// An explicit version (environment first, then config) is used as-is;
    /// otherwise the version is negotiated with the daemon.
    pub async fn connect(config: &DockerConfig) -> Result<Self> {
        Self::connect_with(
            config,
            std::env::var(API_VERSION_ENV).ok(),
            std::env::var(DOCKER_HOST_ENV).ok(),
        )
        .await
    }

    async fn connect_with(
        config: &DockerConfig,
        env_version: Option<String>,
        env_host: Option<String>,
    ) -> Result<Self> {
        let requested = env_version.or_else(|| config.api_version.clone());

        let docker = match requested {
            Some(version) => {
                let client_version = parse_api_version(&version)?;
                let host = docker_host(config.socket.as_deref(), env_host);
                tracing::info!(%host, api_version = %version, "connecting to docker");
                connect_pinned(&host, config.timeout_secs, &client_version)?
            }
            None => {
                let docker = match config.socket.as_deref() {
                    Some(socket) => Docker::connect_with_socket(
                        socket,
                        config.timeout_secs,
                        bollard::API_DEFAULT_VERSION,
                    )?,
                    None => Docker::connect_with_local_defaults()?,
                };
                docker.negotiate_version().await?
            }
        };

        Ok(Self { docker })
    }

    /// Check if Docker is reachable
    pub async fn ping(&self) -> Result<()> {
        self.docker.ping().await?;
        Ok(())
    }
}

#[async_trait]
impl ContainerRuntime for DockerClient {
    async fn list_containers(&self) -> Result<Vec<ContainerSnapshot>, FetchError> {
        let options = ListContainersOptions::<String> {
            all: false,
            ..Default::default()
        };

        let containers = self
            .docker
            .list_containers(Some(options))
            .await
            .map_err(|e| classify_fetch(&e))?;

        let snapshots: Vec<ContainerSnapshot> =
            containers.into_iter().map(snapshot_from_summary).collect();
        tracing::debug!(count = snapshots.len(), "listed running containers");
        Ok(snapshots)
    }

    async fn pull_image(&self, image: &str) -> Result<(), PullError> {
        let reference = ImageRef::parse(image);
        let options = CreateImageOptions {
            from_image: reference.from_image(),
            tag: reference.pull_tag(),
            ..Default::default()
        };

        let mut stream = self.docker.create_image(Some(options), None, None);
        while let Some(item) = stream.next().await {
            match item {
                Ok(info) => {
                    if let Some(error) = info.error {
                        return Err(classify_pull_message(None, error));
                    }
                    if let Some(status) = info.status {
                        tracing::trace!(image, %status, "pull progress");
                    }
                }
                Err(e) => return Err(classify_pull(&e)),
            }
        }
        Ok(())
    }

    async fn stop_container(&self, name: &str, grace_seconds: i64) -> Result<(), StopError> {
        let options = StopContainerOptions { t: grace_seconds };
        match self.docker.stop_container(name, Some(options)).await {
            Ok(()) => Ok(()),
            Err(e) => match server_error(&e) {
                // already stopped
                Some((304, _)) => Ok(()),
                Some((404, message)) => Err(StopError::NotFound(message.to_string())),
                _ => Err(StopError::Runtime(error_message(&e))),
            },
        }
    }

    async fn create_container(&self, spec: &RecreateSpec) -> Result<String, CreateError> {
        let response = self
            .docker
            .create_container(None::<CreateContainerOptions<String>>, container_config(spec))
            .await
            .map_err(|e| classify_create(&e))?;

        for warning in &response.warnings {
            tracing::warn!(image = %spec.image, "create warning: {}", warning);
        }
        Ok(response.id)
    }

    async fn start_container(&self, id: &str) -> Result<(), StartError> {
        self.docker
            .start_container(id, None::<StartContainerOptions<String>>)
            .await
            .map_err(|e| {
                let message = error_message(&e);
                if is_port_conflict(&message) {
                    StartError::PortConflict(message)
                } else {
                    StartError::Runtime(message)
                }
            })
    }
}

/// Build an inventory snapshot from a runtime listing entry.
///
/// The runtime reports one entry per address family for each published
/// port; those collapse onto one binding per container port and protocol.
pub fn snapshot_from_summary(summary: ContainerSummary) -> ContainerSnapshot {
    let name = summary
        .names
        .and_then(|n| n.first().cloned())
        .unwrap_or_default();

    let mut seen = HashSet::new();
    let mut bindings = Vec::new();
    for port in summary.ports.unwrap_or_default() {
        let label = port.typ.map(|t| t.to_string()).unwrap_or_default();
        let Some(protocol) = Protocol::parse(&label) else {
            tracing::warn!(container = %name, port = port.private_port, protocol = %label, "skipping unsupported protocol");
            continue;
        };
        if !seen.insert((port.private_port, protocol)) {
            continue;
        }
        bindings.push(
            PortBinding::new(port.private_port, port.public_port.unwrap_or(0))
                .with_host_ip(port.ip.as_deref().unwrap_or_default())
                .with_protocol(protocol),
        );
    }

    ContainerSnapshot {
        id: summary.id.unwrap_or_default(),
        name,
        image: summary.image.unwrap_or_default(),
        command: summary.command.unwrap_or_default(),
        image_id: summary.image_id.unwrap_or_default(),
        bindings,
    }
}

/// Create configuration for the replacement container
pub fn container_config(spec: &RecreateSpec) -> Config<String> {
    let exposure = &spec.exposure;
    if exposure.is_empty() {
        return Config {
            image: Some(spec.image.clone()),
            ..Default::default()
        };
    }

    let exposed_ports: HashMap<String, HashMap<(), ()>> = exposure
        .exposed_ports
        .iter()
        .map(|key| (key.clone(), HashMap::new()))
        .collect();

    let port_bindings = exposure
        .port_map
        .iter()
        .map(|(key, endpoint)| {
            let binding = DockerPortBinding {
                host_ip: (!endpoint.host_ip.is_empty()).then(|| endpoint.host_ip.clone()),
                // an unset host port lets the runtime pick an ephemeral one
                host_port: (endpoint.host_port != 0).then(|| endpoint.host_port.to_string()),
            };
            (key.clone(), Some(vec![binding]))
        })
        .collect();

    Config {
        image: Some(spec.image.clone()),
        exposed_ports: Some(exposed_ports),
        host_config: Some(HostConfig {
            port_bindings: Some(port_bindings),
            ..Default::default()
        }),
        ..Default::default()
    }
}

/// Image reference split into the parts a pull request needs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageRef {
    pub repository: String,
    pub tag: Option<String>,
    pub digest: Option<String>,
}

impl ImageRef {
    pub fn parse(reference: &str) -> Self {
        let reference = reference.trim();
        if let Some((repository, digest)) = reference.split_once('@') {
            return Self {
                repository: repository.to_string(),
                tag: None,
                digest: Some(digest.to_string()),
            };
        }

        // a colon before the last slash belongs to a registry host:port
        let last_slash = reference.rfind('/').map(|i| i + 1).unwrap_or(0);
        match reference[last_slash..].rfind(':') {
            Some(i) => {
                let split = last_slash + i;
                Self {
                    repository: reference[..split].to_string(),
                    tag: Some(reference[split + 1..].to_string()),
                    digest: None,
                }
            }
            None => Self {
                repository: reference.to_string(),
                tag: None,
                digest: None,
            },
        }
    }

    /// Value for the pull's `fromImage` field
    pub fn from_image(&self) -> String {
        match &self.digest {
            Some(digest) => format!("{}@{}", self.repository, digest),
            None => self.repository.clone(),
        }
    }

    /// Tag to pull; an empty tag would pull every tag of the repository
    pub fn pull_tag(&self) -> String {
        if self.digest.is_some() {
            return String::new();
        }
        self.tag.clone().unwrap_or_else(|| "latest".to_string())
    }
}

impl std::fmt::Display for ImageRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match (&self.digest, &self.tag) {
            (Some(_), _) => write!(f, "{}", self.from_image()),
            (None, _) => write!(f, "{}:{}", self.repository, self.pull_tag()),
        }
    }
}

/// Daemon address: configured socket, then `DOCKER_HOST`, then the platform default
fn docker_host(socket: Option<&str>, env_host: Option<String>) -> String {
    socket
        .map(str::to_string)
        .or_else(|| env_host.filter(|h| !h.trim().is_empty()))
        .unwrap_or_else(|| DEFAULT_DOCKER_HOST.to_string())
}

/// Connect to `host` speaking exactly `version`, picking the transport from the scheme
fn connect_pinned(host: &str, timeout_secs: u64, version: &ClientVersion) -> Result<Docker> {
    let docker = if host.starts_with("tcp://") || host.starts_with("http://") {
        Docker::connect_with_http(host, timeout_secs, version)?
    } else {
        let path = host.strip_prefix("unix://").unwrap_or(host);
        Docker::connect_with_socket(path, timeout_secs, version)?
    };
    Ok(docker)
}

fn parse_api_version(version: &str) -> Result<ClientVersion> {
    let trimmed = version.trim().trim_start_matches('v');
    let (major, minor) = trimmed
        .split_once('.')
        .ok_or_else(|| anyhow::anyhow!("invalid Docker API version '{}'", version))?;
    Ok(ClientVersion {
        major_version: major.parse()?,
        minor_version: minor.parse()?,
    })
}

fn server_error(err: &BollardError) -> Option<(u16, &str)> {
    match err {
        BollardError::DockerResponseServerError {
            status_code,
            message,
        } => Some((*status_code, message.as_str())),
        _ => None,
    }
}

fn error_message(err: &BollardError) -> String {
    match server_error(err) {
        Some((_, message)) => message.to_string(),
        None => err.to_string(),
    }
}

fn is_port_conflict(message: &str) -> bool {
    let lower = message.to_lowercase();
    lower.contains("port is already allocated") || lower.contains("address already in use")
}

fn classify_fetch(err: &BollardError) -> FetchError {
    let message = error_message(err);
    match server_error(err) {
        Some((401 | 403, _)) => FetchError::PermissionDenied(message),
        _ if message.to_lowercase().contains("permission denied") => {
            FetchError::PermissionDenied(message)
        }
        _ => FetchError::RuntimeUnavailable(message),
    }
}

fn classify_pull(err: &BollardError) -> PullError {
    classify_pull_message(server_error(err).map(|(status, _)| status), error_message(err))
}

fn classify_pull_message(status: Option<u16>, message: String) -> PullError {
    let lower = message.to_lowercase();
    match status {
        Some(401 | 403) => PullError::Auth(message),
        Some(404) => PullError::ImageNotFound(message),
        _ if lower.contains("unauthorized") || lower.contains("authentication required") => {
            PullError::Auth(message)
        }
        _ if lower.contains("not found") || lower.contains("does not exist") => {
            PullError::ImageNotFound(message)
        }
        _ => PullError::Network(message),
    }
}

fn classify_create(err: &BollardError) -> CreateError {
    let message = error_message(err);
    if is_port_conflict(&message) {
        return CreateError::PortConflict(message);
    }
    match server_error(err) {
        Some((400, _)) => CreateError::InvalidConfig(message),
        _ => CreateError::Runtime(message),
    }
}

/// Print the running-container inventory for the CLI
pub async fn print_inventory(client: &DockerClient) -> Result<()> {
    let containers = client.list_containers().await?;

    if containers.is_empty() {
        println!("No running containers");
        return Ok(());
    }

    println!("{:<20} {:<32} PORTS", "NAME", "IMAGE");
    println!("{}", "-".repeat(80));

    for container in containers {
        println!(
            "{:<20} {:<32} {}",
            truncate(container.display_name(), 18),
            truncate(&container.image, 30),
            container.ports_label()
        );
    }

    Ok(())
}

fn truncate(s: &str, max_len: usize) -> String {
    let char_count = s.chars().count();
    if char_count <= max_len {
        s.to_string()
    } else if max_len > 3 {
        format!("{}...", s.chars().take(max_len - 3).collect::<String>())
    } else {
        s.chars().take(max_len).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::integrations::runtime::PortExposure;
    use bollard::models::{Port, PortTypeEnum};
    use pretty_assertions::assert_eq;

    fn port(ip: &str, private: u16, public: Option<u16>, typ: PortTypeEnum) -> Port {
        Port {
            ip: Some(ip.to_string()),
            private_port: private,
            public_port: public,
            typ: Some(typ),
        }
    }

    #[test]
    fn test_snapshot_collapses_address_families() {
        let summary = ContainerSummary {
            id: Some("c0ffee".to_string()),
            names: Some(vec!["/web".to_string()]),
            image: Some("nginx:1.27".to_string()),
            image_id: Some("sha256:abc".to_string()),
            command: Some("nginx".to_string()),
            ports: Some(vec![
                port("0.0.0.0", 80, Some(8080), PortTypeEnum::TCP),
                port("::", 80, Some(8080), PortTypeEnum::TCP),
                port("::", 53, Some(5353), PortTypeEnum::UDP),
            ]),
            ..Default::default()
        };

        let snapshot = snapshot_from_summary(summary);

        assert_eq!(snapshot.name, "/web");
        assert_eq!(snapshot.display_name(), "web");
        assert_eq!(
            snapshot.bindings,
            vec![
                PortBinding::new(80, 8080).with_host_ip("0.0.0.0"),
                PortBinding::new(53, 5353).with_protocol(Protocol::Udp),
            ]
        );
    }

    #[test]
    fn test_snapshot_unpublished_port_is_wildcard() {
        let summary = ContainerSummary {
            names: Some(vec!["/db".to_string()]),
            ports: Some(vec![Port {
                ip: None,
                private_port: 5432,
                public_port: None,
                typ: Some(PortTypeEnum::TCP),
            }]),
            ..Default::default()
        };

        let snapshot = snapshot_from_summary(summary);

        assert_eq!(snapshot.bindings, vec![PortBinding::new(5432, 0)]);
    }

    #[test]
    fn test_snapshot_without_ports() {
        let snapshot = snapshot_from_summary(ContainerSummary {
            names: Some(vec!["/worker".to_string()]),
            ..Default::default()
        });

        assert!(!snapshot.exposes_ports());
    }

    #[test]
    fn test_image_ref_parse() {
        assert_eq!(
            ImageRef::parse("nginx"),
            ImageRef {
                repository: "nginx".to_string(),
                tag: None,
                digest: None,
            }
        );
        assert_eq!(ImageRef::parse("nginx").pull_tag(), "latest");
        assert_eq!(ImageRef::parse("nginx:1.27").pull_tag(), "1.27");

        let registry = ImageRef::parse("localhost:5000/team/app");
        assert_eq!(registry.repository, "localhost:5000/team/app");
        assert_eq!(registry.pull_tag(), "latest");

        let tagged = ImageRef::parse("localhost:5000/team/app:v2");
        assert_eq!(tagged.repository, "localhost:5000/team/app");
        assert_eq!(tagged.to_string(), "localhost:5000/team/app:v2");

        let pinned = ImageRef::parse("redis@sha256:deadbeef");
        assert_eq!(pinned.from_image(), "redis@sha256:deadbeef");
        assert_eq!(pinned.pull_tag(), "");
    }

    #[test]
    fn test_container_config_without_ports() {
        let spec = RecreateSpec {
            image: "busybox".to_string(),
            exposure: PortExposure::default(),
        };

        let config = container_config(&spec);

        assert_eq!(config.image.as_deref(), Some("busybox"));
        assert!(config.exposed_ports.is_none());
        assert!(config.host_config.is_none());
    }

    #[test]
    fn test_container_config_maps_bindings() {
        let spec = RecreateSpec {
            image: "nginx".to_string(),
            exposure: PortExposure::from_bindings(&[
                PortBinding::new(80, 8080),
                PortBinding::new(443, 0).with_host_ip("127.0.0.1"),
            ]),
        };

        let config = container_config(&spec);

        let exposed = config.exposed_ports.unwrap();
        assert!(exposed.contains_key("80/tcp"));
        assert!(exposed.contains_key("443/tcp"));

        let bindings = config.host_config.unwrap().port_bindings.unwrap();
        assert_eq!(
            bindings["80/tcp"],
            Some(vec![DockerPortBinding {
                host_ip: None,
                host_port: Some("8080".to_string()),
            }])
        );
        assert_eq!(
            bindings["443/tcp"],
            Some(vec![DockerPortBinding {
                host_ip: Some("127.0.0.1".to_string()),
                host_port: None,
            }])
        );
    }

    #[test]
    fn test_classify_server_errors() {
        let conflict = BollardError::DockerResponseServerError {
            status_code: 500,
            message: "Bind for 0.0.0.0:8080 failed: port is already allocated".to_string(),
        };
        assert!(matches!(
            classify_create(&conflict),
            CreateError::PortConflict(_)
        ));

        let invalid = BollardError::DockerResponseServerError {
            status_code: 400,
            message: "invalid port specification".to_string(),
        };
        assert!(matches!(
            classify_create(&invalid),
            CreateError::InvalidConfig(_)
        ));

        let missing = BollardError::DockerResponseServerError {
            status_code: 404,
            message: "manifest unknown".to_string(),
        };
        assert!(matches!(classify_pull(&missing), PullError::ImageNotFound(_)));

        let denied = BollardError::DockerResponseServerError {
            status_code: 403,
            message: "forbidden".to_string(),
        };
        assert!(matches!(
            classify_fetch(&denied),
            FetchError::PermissionDenied(_)
        ));
    }

    #[test]
    fn test_classify_pull_stream_messages() {
        assert!(matches!(
            classify_pull_message(None, "unauthorized: authentication required".to_string()),
            PullError::Auth(_)
        ));
        assert!(matches!(
            classify_pull_message(None, "connection reset by peer".to_string()),
            PullError::Network(_)
        ));
    }

    #[test]
    fn test_parse_api_version() {
        let version = parse_api_version("1.41").unwrap();
        assert_eq!(version.major_version, 1);
        assert_eq!(version.minor_version, 41);
        assert!(parse_api_version("latest").is_err());
    }

    #[test]
    fn test_docker_host_precedence() {
        assert_eq!(
            docker_host(Some("/run/user/1000/docker.sock"), Some("tcp://remote:2375".to_string())),
            "/run/user/1000/docker.sock"
        );
        assert_eq!(
            docker_host(None, Some("unix:///home/me/.colima/docker.sock".to_string())),
            "unix:///home/me/.colima/docker.sock"
        );
        assert_eq!(docker_host(None, Some("  ".to_string())), DEFAULT_DOCKER_HOST);
        assert_eq!(docker_host(None, None), DEFAULT_DOCKER_HOST);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_pinned_version_connects_to_docker_host_socket() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("docker.sock");
        let _listener = std::os::unix::net::UnixListener::bind(&path).unwrap();

        let client = DockerClient::connect_with(
            &DockerConfig::default(),
            Some("1.41".to_string()),
            Some(format!("unix://{}", path.display())),
        )
        .await;

        assert!(client.is_ok(), "{:?}", client.err());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_configured_socket_wins_over_docker_host() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("docker.sock");
        let _listener = std::os::unix::net::UnixListener::bind(&path).unwrap();
        let config = DockerConfig {
            socket: Some(path.display().to_string()),
            ..Default::default()
        };

        let client = DockerClient::connect_with(
            &config,
            Some("1.41".to_string()),
            Some("unix:///nonexistent/docker.sock".to_string()),
        )
        .await;

        assert!(client.is_ok(), "{:?}", client.err());
    }
}

//! Per-container update state machine: pull, stop, recreate, start

use crate::integrations::ports::PortProbe;
use crate::integrations::runtime::{
    ContainerRuntime, ContainerSnapshot, CreateError, PortExposure, PullError, RecreateSpec,
    StartError, StopError,
};
use crate::update::allocator::PortAllocator;

/// Where a single container update currently is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UpdateStage {
    Idle,
    Pulling,
    Stopping,
    Recreating,
    Starting,
    Done,
    Failed,
}

impl std::fmt::Display for UpdateStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::Pulling => write!(f, "pulling"),
            Self::Stopping => write!(f, "stopping"),
            Self::Recreating => write!(f, "recreating"),
            Self::Starting => write!(f, "starting"),
            Self::Done => write!(f, "done"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

/// Failure of one stage, carrying the runtime's own message
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum UpdateError {
    #[error("pull failed: {0}")]
    Pull(#[from] PullError),
    #[error("stop failed: {0}")]
    Stop(#[from] StopError),
    #[error("create failed: {0}")]
    Create(#[from] CreateError),
    #[error("start failed: {0}")]
    Start(#[from] StartError),
}

impl UpdateError {
    /// The stage that was running when the failure happened
    pub fn stage(&self) -> UpdateStage {
        match self {
            Self::Pull(_) => UpdateStage::Pulling,
            Self::Stop(_) => UpdateStage::Stopping,
            Self::Create(_) => UpdateStage::Recreating,
            Self::Start(_) => UpdateStage::Starting,
        }
    }

    /// The old container is stopped and no replacement is known to run.
    /// There is no rollback for this case.
    pub fn left_stopped(&self) -> bool {
        matches!(self, Self::Create(_) | Self::Start(_))
    }
}

/// Terminal result of one container update
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateOutcome {
    Updated { new_id: String },
    Failed(UpdateError),
}

impl UpdateOutcome {
    pub fn is_updated(&self) -> bool {
        matches!(self, Self::Updated { .. })
    }

    pub fn stage(&self) -> UpdateStage {
        match self {
            Self::Updated { .. } => UpdateStage::Done,
            Self::Failed(_) => UpdateStage::Failed,
        }
    }
}

/// Drives a container through pull, stop, recreate and start.
///
/// Each stage runs only when the previous one succeeded. Success means the
/// runtime accepted the start call; the new container's health is not checked.
pub struct UpdateOrchestrator<'a> {
    runtime: &'a dyn ContainerRuntime,
    allocator: PortAllocator<'a>,
    stop_grace_seconds: i64,
}

impl<'a> UpdateOrchestrator<'a> {
    pub fn new(
        runtime: &'a dyn ContainerRuntime,
        probe: &'a dyn PortProbe,
        stop_grace_seconds: i64,
    ) -> Self {
        Self {
            runtime,
            allocator: PortAllocator::new(probe),
            stop_grace_seconds,
        }
    }

    /// Update one container, reporting every stage entered to `on_stage`
    pub async fn update<F>(&self, container: &ContainerSnapshot, mut on_stage: F) -> UpdateOutcome
    where
        F: FnMut(UpdateStage) + Send,
    {
        let outcome = match self.run(container, &mut on_stage).await {
            Ok(new_id) => {
                tracing::info!(container = %container.name, %new_id, "container updated");
                UpdateOutcome::Updated { new_id }
            }
            Err(e) => {
                tracing::warn!(
                    container = %container.name,
                    stage = %e.stage(),
                    "update failed: {}",
                    e
                );
                if e.left_stopped() {
                    tracing::warn!(
                        container = %container.name,
                        "old container is stopped and no replacement is running"
                    );
                }
                UpdateOutcome::Failed(e)
            }
        };
        on_stage(outcome.stage());
        outcome
    }

    async fn run<F>(
        &self,
        container: &ContainerSnapshot,
        on_stage: &mut F,
    ) -> Result<String, UpdateError>
    where
        F: FnMut(UpdateStage) + Send,
    {
        let name = container.name.as_str();

        Self::enter(name, UpdateStage::Pulling, on_stage);
        self.runtime.pull_image(&container.image).await?;

        Self::enter(name, UpdateStage::Stopping, on_stage);
        self.runtime
            .stop_container(name, self.stop_grace_seconds)
            .await?;

        Self::enter(name, UpdateStage::Recreating, on_stage);
        let bindings = self.allocator.resolve(&container.bindings);
        let spec = RecreateSpec {
            image: container.image.clone(),
            exposure: PortExposure::from_bindings(&bindings),
        };
        let new_id = self.runtime.create_container(&spec).await?;

        Self::enter(name, UpdateStage::Starting, on_stage);
        self.runtime.start_container(&new_id).await?;

        Ok(new_id)
    }

    fn enter<F>(name: &str, stage: UpdateStage, on_stage: &mut F)
    where
        F: FnMut(UpdateStage) + Send,
    {
        tracing::debug!(container = %name, %stage, "entering stage");
        on_stage(stage);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::integrations::runtime::{HostEndpoint, MockContainerRuntime, PortBinding};
    use crate::update::allocator::testing::FixedProbe;
    use mockall::Sequence;
    use pretty_assertions::assert_eq;

    fn snapshot(name: &str, bindings: Vec<PortBinding>) -> ContainerSnapshot {
        ContainerSnapshot {
            id: format!("{}-id", name),
            name: format!("/{}", name),
            image: format!("{}:latest", name),
            command: String::new(),
            image_id: "sha256:old".to_string(),
            bindings,
        }
    }

    #[tokio::test]
    async fn test_container_without_ports_walks_every_stage() {
        let mut runtime = MockContainerRuntime::new();
        let mut seq = Sequence::new();
        runtime
            .expect_pull_image()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|image| {
                assert_eq!(image, "worker:latest");
                Ok(())
            });
        runtime
            .expect_stop_container()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|name, grace| {
                assert_eq!(name, "/worker");
                assert_eq!(grace, 0);
                Ok(())
            });
        runtime
            .expect_create_container()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|spec| {
                assert_eq!(spec.image, "worker:latest");
                assert!(spec.exposure.is_empty());
                Ok("new-worker".to_string())
            });
        runtime
            .expect_start_container()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|id| {
                assert_eq!(id, "new-worker");
                Ok(())
            });

        let probe = FixedProbe::default();
        let orchestrator = UpdateOrchestrator::new(&runtime, &probe, 0);
        let mut stages = Vec::new();

        let outcome = orchestrator
            .update(&snapshot("worker", vec![]), |stage| stages.push(stage))
            .await;

        assert_eq!(
            outcome,
            UpdateOutcome::Updated {
                new_id: "new-worker".to_string()
            }
        );
        assert_eq!(
            stages,
            vec![
                UpdateStage::Pulling,
                UpdateStage::Stopping,
                UpdateStage::Recreating,
                UpdateStage::Starting,
                UpdateStage::Done,
            ]
        );
    }

    #[tokio::test]
    async fn test_recreate_uses_allocator_resolved_ports() {
        let mut runtime = MockContainerRuntime::new();
        runtime.expect_pull_image().returning(|_| Ok(()));
        runtime.expect_stop_container().returning(|_, _| Ok(()));
        runtime.expect_create_container().times(1).returning(|spec| {
            assert_eq!(
                spec.exposure.port_map["8080/tcp"],
                HostEndpoint {
                    host_ip: String::new(),
                    host_port: 8080,
                }
            );
            assert_eq!(spec.exposure.port_map["9090/tcp"].host_port, 0);
            Ok("new-web".to_string())
        });
        runtime.expect_start_container().returning(|_| Ok(()));

        let probe = FixedProbe::taking(&[9000]);
        let orchestrator = UpdateOrchestrator::new(&runtime, &probe, 0);
        let container = snapshot(
            "web",
            vec![PortBinding::new(8080, 0), PortBinding::new(9090, 9000)],
        );

        let outcome = orchestrator.update(&container, |_| {}).await;

        assert!(outcome.is_updated());
    }

    #[tokio::test]
    async fn test_pull_failure_stops_the_pipeline() {
        let mut runtime = MockContainerRuntime::new();
        runtime
            .expect_pull_image()
            .times(1)
            .returning(|_| Err(PullError::ImageNotFound("no such image".to_string())));
        runtime.expect_stop_container().never();
        runtime.expect_create_container().never();
        runtime.expect_start_container().never();

        let probe = FixedProbe::default();
        let orchestrator = UpdateOrchestrator::new(&runtime, &probe, 0);
        let mut stages = Vec::new();

        let outcome = orchestrator
            .update(&snapshot("web", vec![]), |stage| stages.push(stage))
            .await;

        let UpdateOutcome::Failed(error) = outcome else {
            panic!("expected a failed outcome");
        };
        assert_eq!(error.stage(), UpdateStage::Pulling);
        assert!(!error.left_stopped());
        assert_eq!(stages, vec![UpdateStage::Pulling, UpdateStage::Failed]);
    }

    #[tokio::test]
    async fn test_stop_uses_configured_grace_period() {
        let mut runtime = MockContainerRuntime::new();
        runtime.expect_pull_image().returning(|_| Ok(()));
        runtime
            .expect_stop_container()
            .times(1)
            .returning(|_, grace| {
                assert_eq!(grace, 10);
                Err(StopError::NotFound("gone".to_string()))
            });
        runtime.expect_create_container().never();

        let probe = FixedProbe::default();
        let orchestrator = UpdateOrchestrator::new(&runtime, &probe, 10);

        let outcome = orchestrator.update(&snapshot("web", vec![]), |_| {}).await;

        assert_eq!(
            outcome,
            UpdateOutcome::Failed(UpdateError::Stop(StopError::NotFound("gone".to_string())))
        );
    }

    #[tokio::test]
    async fn test_late_port_conflict_is_a_reported_failure() {
        let mut runtime = MockContainerRuntime::new();
        runtime.expect_pull_image().returning(|_| Ok(()));
        runtime.expect_stop_container().returning(|_, _| Ok(()));
        runtime.expect_create_container().returning(|_| Ok("new".to_string()));
        runtime.expect_start_container().times(1).returning(|_| {
            Err(StartError::PortConflict(
                "port is already allocated".to_string(),
            ))
        });

        let probe = FixedProbe::default();
        let orchestrator = UpdateOrchestrator::new(&runtime, &probe, 0);

        let outcome = orchestrator
            .update(&snapshot("web", vec![PortBinding::new(80, 0)]), |_| {})
            .await;

        let UpdateOutcome::Failed(error) = outcome else {
            panic!("expected a failed outcome");
        };
        assert_eq!(error.stage(), UpdateStage::Starting);
        assert!(error.left_stopped());
        assert_eq!(
            error.to_string(),
            "start failed: host port conflict: port is already allocated"
        );
    }
}

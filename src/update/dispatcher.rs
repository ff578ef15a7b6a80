//! Runs a batch of container updates on one background task

use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::config::UpdateConfig;
use crate::core::events::Event;
use crate::integrations::ports::PortProbe;
use crate::integrations::runtime::{ContainerRuntime, ContainerSnapshot};
use crate::update::orchestrator::{UpdateOrchestrator, UpdateOutcome, UpdateStage};

/// Result of one container in a batch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerReport {
    pub name: String,
    pub image: String,
    pub outcome: UpdateOutcome,
}

impl ContainerReport {
    pub fn display_name(&self) -> &str {
        self.name.trim_start_matches('/')
    }

    /// One-line summary: `updated` or the failed stage with its message
    pub fn describe(&self) -> String {
        match &self.outcome {
            UpdateOutcome::Updated { .. } => format!("{}: updated", self.display_name()),
            UpdateOutcome::Failed(e) => {
                format!("{}: failed at {}: {}", self.display_name(), e.stage(), e)
            }
        }
    }
}

/// Aggregate completion notification for a batch, in selection order
#[derive(Debug, Clone)]
pub struct BatchReport {
    pub entries: Vec<ContainerReport>,
    pub started_at: chrono::DateTime<chrono::Utc>,
    pub finished_at: chrono::DateTime<chrono::Utc>,
    /// Set when the batch task died before every container was reported
    pub interrupted: Option<String>,
}

impl BatchReport {
    /// Report for a batch whose task ended abnormally; outcomes are unknown
    pub fn interrupted(started_at: chrono::DateTime<chrono::Utc>, reason: String) -> Self {
        Self {
            entries: Vec::new(),
            started_at,
            finished_at: chrono::Utc::now(),
            interrupted: Some(reason),
        }
    }

    pub fn updated_count(&self) -> usize {
        self.entries.iter().filter(|e| e.outcome.is_updated()).count()
    }

    pub fn failed_count(&self) -> usize {
        self.entries.len() - self.updated_count()
    }

    /// Containers that were stopped but not verifiably replaced
    pub fn stranded(&self) -> Vec<&ContainerReport> {
        self.entries
            .iter()
            .filter(|e| matches!(&e.outcome, UpdateOutcome::Failed(err) if err.left_stopped()))
            .collect()
    }

    pub fn summary(&self) -> String {
        if let Some(reason) = &self.interrupted {
            return format!("Update batch aborted: {}", reason);
        }
        match self.failed_count() {
            0 => format!("Updated {} container(s)", self.updated_count()),
            failed => format!(
                "Updated {} container(s), {} failed",
                self.updated_count(),
                failed
            ),
        }
    }

    pub fn duration_ms(&self) -> i64 {
        self.finished_at
            .signed_duration_since(self.started_at)
            .num_milliseconds()
    }
}

/// Update every container in order. A failure never skips later containers.
pub async fn run_batch<F>(
    runtime: &dyn ContainerRuntime,
    probe: &dyn PortProbe,
    settings: &UpdateConfig,
    containers: &[ContainerSnapshot],
    mut on_progress: F,
) -> BatchReport
where
    F: FnMut(&ContainerSnapshot, UpdateStage) + Send,
{
    let started_at = chrono::Utc::now();
    let orchestrator = UpdateOrchestrator::new(runtime, probe, settings.stop_grace_seconds);
    let mut entries = Vec::with_capacity(containers.len());

    for container in containers {
        let outcome = orchestrator
            .update(container, |stage| on_progress(container, stage))
            .await;
        entries.push(ContainerReport {
            name: container.name.clone(),
            image: container.image.clone(),
            outcome,
        });
    }

    let report = BatchReport {
        entries,
        started_at,
        finished_at: chrono::Utc::now(),
        interrupted: None,
    };
    tracing::info!(
        updated = report.updated_count(),
        failed = report.failed_count(),
        duration_ms = report.duration_ms(),
        "batch finished"
    );
    report
}

/// Launches batches on a background task and reports back on the event channel
#[derive(Clone)]
pub struct Dispatcher {
    runtime: Arc<dyn ContainerRuntime>,
    probe: Arc<dyn PortProbe>,
    settings: UpdateConfig,
}

impl Dispatcher {
    pub fn new(
        runtime: Arc<dyn ContainerRuntime>,
        probe: Arc<dyn PortProbe>,
        settings: UpdateConfig,
    ) -> Self {
        Self {
            runtime,
            probe,
            settings,
        }
    }

    /// Spawn the batch. Exactly one `BatchCompleted` is sent once every
    /// container reached a terminal state, or once the batch task died.
    pub fn spawn(
        &self,
        containers: Vec<ContainerSnapshot>,
        event_tx: mpsc::UnboundedSender<Event>,
    ) -> JoinHandle<()> {
        let this = self.clone();
        tracing::info!(count = containers.len(), "dispatching update batch");

        tokio::spawn(async move {
            let started_at = chrono::Utc::now();
            let batch = tokio::spawn(this.run(containers, event_tx.clone()));

            let report = match batch.await {
                Ok(report) => report,
                Err(e) => {
                    tracing::error!("update batch task failed: {}", e);
                    BatchReport::interrupted(started_at, e.to_string())
                }
            };

            if event_tx.send(Event::BatchCompleted(report)).is_err() {
                tracing::warn!("event loop gone before batch completion was delivered");
            }
        })
    }

    async fn run(
        self,
        containers: Vec<ContainerSnapshot>,
        progress_tx: mpsc::UnboundedSender<Event>,
    ) -> BatchReport {
        run_batch(
            self.runtime.as_ref(),
            self.probe.as_ref(),
            &self.settings,
            &containers,
            |container, stage| {
                let _ = progress_tx.send(Event::UpdateProgress {
                    name: container.display_name().to_string(),
                    stage,
                });
            },
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::integrations::runtime::{
        CreateError, FetchError, MockContainerRuntime, PullError, RecreateSpec, StartError,
        StopError,
    };
    use crate::update::allocator::testing::FixedProbe;
    use crate::update::orchestrator::UpdateError;
    use pretty_assertions::assert_eq;

    fn snapshot(name: &str) -> ContainerSnapshot {
        ContainerSnapshot {
            id: format!("{}-id", name),
            name: format!("/{}", name),
            image: format!("{}:latest", name),
            command: String::new(),
            image_id: String::new(),
            bindings: vec![],
        }
    }

    fn runtime_failing_stop_for(failing: &'static str) -> MockContainerRuntime {
        let mut runtime = MockContainerRuntime::new();
        runtime.expect_pull_image().returning(|_| Ok(()));
        runtime.expect_stop_container().returning(move |name, _| {
            if name == failing {
                Err(StopError::Runtime("cannot stop".to_string()))
            } else {
                Ok(())
            }
        });
        runtime
            .expect_create_container()
            .returning(|spec| Ok(format!("new-{}", spec.image)));
        runtime.expect_start_container().returning(|_| Ok(()));
        runtime
    }

    #[tokio::test]
    async fn test_failure_does_not_abort_later_containers() {
        let runtime = runtime_failing_stop_for("/first");
        let probe = FixedProbe::default();
        let containers = vec![snapshot("first"), snapshot("second")];

        let report = run_batch(
            &runtime,
            &probe,
            &UpdateConfig::default(),
            &containers,
            |_, _| {},
        )
        .await;

        assert_eq!(
            report
                .entries
                .iter()
                .map(|e| e.outcome.stage())
                .collect::<Vec<_>>(),
            vec![UpdateStage::Failed, UpdateStage::Done]
        );
        assert_eq!(
            report.entries[0].outcome,
            UpdateOutcome::Failed(UpdateError::Stop(StopError::Runtime(
                "cannot stop".to_string()
            )))
        );
        assert_eq!(
            report.entries[0].describe(),
            "first: failed at stopping: stop failed: runtime error: cannot stop"
        );
        assert_eq!(report.entries[1].describe(), "second: updated");
        assert_eq!(report.summary(), "Updated 1 container(s), 1 failed");
        assert!(report.stranded().is_empty());
    }

    #[tokio::test]
    async fn test_every_container_reported_once_in_order() {
        let runtime = runtime_failing_stop_for("/none");
        let probe = FixedProbe::default();
        let containers = vec![snapshot("c"), snapshot("a"), snapshot("b")];

        let report = run_batch(
            &runtime,
            &probe,
            &UpdateConfig::default(),
            &containers,
            |_, _| {},
        )
        .await;

        assert_eq!(
            report
                .entries
                .iter()
                .map(|e| e.name.as_str())
                .collect::<Vec<_>>(),
            vec!["/c", "/a", "/b"]
        );
        assert_eq!(report.updated_count(), 3);
    }

    #[tokio::test]
    async fn test_progress_is_reported_per_container() {
        let runtime = runtime_failing_stop_for("/none");
        let probe = FixedProbe::default();
        let containers = vec![snapshot("a"), snapshot("b")];
        let mut seen = Vec::new();

        run_batch(
            &runtime,
            &probe,
            &UpdateConfig::default(),
            &containers,
            |container, stage| seen.push((container.display_name().to_string(), stage)),
        )
        .await;

        assert_eq!(seen.len(), 10);
        assert_eq!(seen[0], ("a".to_string(), UpdateStage::Pulling));
        assert_eq!(seen[4], ("a".to_string(), UpdateStage::Done));
        assert_eq!(seen[9], ("b".to_string(), UpdateStage::Done));
    }

    #[tokio::test]
    async fn test_spawn_sends_single_completion() {
        let runtime: Arc<dyn ContainerRuntime> = Arc::new(runtime_failing_stop_for("/none"));
        let dispatcher = Dispatcher::new(
            runtime,
            Arc::new(FixedProbe::default()),
            UpdateConfig::default(),
        );
        let (tx, mut rx) = mpsc::unbounded_channel();

        dispatcher
            .spawn(vec![snapshot("a"), snapshot("b")], tx)
            .await
            .unwrap();

        let mut completions = Vec::new();
        let mut progress = 0;
        while let Ok(event) = rx.try_recv() {
            match event {
                Event::BatchCompleted(report) => completions.push(report),
                Event::UpdateProgress { .. } => progress += 1,
                _ => {}
            }
        }

        assert_eq!(completions.len(), 1);
        assert_eq!(completions[0].entries.len(), 2);
        assert_eq!(progress, 10);
    }

    /// Runtime whose client blows up on the first call
    struct CrashingRuntime;

    #[async_trait::async_trait]
    impl ContainerRuntime for CrashingRuntime {
        async fn list_containers(&self) -> Result<Vec<ContainerSnapshot>, FetchError> {
            Ok(vec![])
        }

        async fn pull_image(&self, _image: &str) -> Result<(), PullError> {
            panic!("runtime client crashed")
        }

        async fn stop_container(&self, _name: &str, _grace: i64) -> Result<(), StopError> {
            unreachable!()
        }

        async fn create_container(&self, _spec: &RecreateSpec) -> Result<String, CreateError> {
            unreachable!()
        }

        async fn start_container(&self, _id: &str) -> Result<(), StartError> {
            unreachable!()
        }
    }

    #[tokio::test]
    async fn test_panicking_batch_still_completes_once() {
        let dispatcher = Dispatcher::new(
            Arc::new(CrashingRuntime),
            Arc::new(FixedProbe::default()),
            UpdateConfig::default(),
        );
        let (tx, mut rx) = mpsc::unbounded_channel();

        dispatcher.spawn(vec![snapshot("a")], tx).await.unwrap();

        let mut completions = Vec::new();
        while let Ok(event) = rx.try_recv() {
            if let Event::BatchCompleted(report) = event {
                completions.push(report);
            }
        }

        assert_eq!(completions.len(), 1);
        assert!(completions[0].interrupted.is_some());
        assert!(completions[0].entries.is_empty());
        assert!(completions[0]
            .summary()
            .starts_with("Update batch aborted: "));
    }
}

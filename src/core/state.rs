//! Application state: inventory, selection and the processing state machine.
//!
//! Owned exclusively by the foreground loop. The background batch only ever
//! sees a copy of the selected snapshots and answers through an event.

use std::collections::BTreeSet;

use crate::integrations::runtime::{ContainerSnapshot, FetchError};
use crate::update::{BatchReport, UpdateStage};

/// Whether a batch update is in flight
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProcessingState {
    #[default]
    Idle,
    Running,
}

/// Notification
#[derive(Debug, Clone)]
pub struct Notification {
    pub id: uuid::Uuid,
    pub message: String,
    pub level: NotificationLevel,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub duration_ms: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationLevel {
    Info,
    Success,
    Warning,
    Error,
}

/// Container currently moving through the pipeline
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Progress {
    pub name: String,
    pub stage: UpdateStage,
}

/// Main application state
#[derive(Debug, Clone, Default)]
pub struct AppState {
    pub inventory: Vec<ContainerSnapshot>,
    /// Row indices into `inventory`
    pub selected: BTreeSet<usize>,
    pub cursor: usize,
    pub processing: ProcessingState,
    pub progress: Option<Progress>,
    pub last_report: Option<BatchReport>,
    pub fetch_error: Option<String>,
    pub fact: Option<String>,
    pub spinner_frame: usize,
    pub notifications: Vec<Notification>,
    pub terminal_size: (u16, u16),
}

impl AppState {
    pub fn new() -> Self {
        Self {
            terminal_size: (80, 24),
            ..Default::default()
        }
    }

    pub fn is_running(&self) -> bool {
        self.processing == ProcessingState::Running
    }

    /// Replace the whole inventory with a fresh listing, or keep the previous
    /// one and surface the error when the listing failed.
    pub fn apply_fetch(&mut self, result: Result<Vec<ContainerSnapshot>, FetchError>) {
        match result {
            Ok(inventory) => {
                self.inventory = inventory;
                self.selected.clear();
                self.cursor = self.cursor.min(self.inventory.len().saturating_sub(1));
                self.fetch_error = None;
            }
            Err(e) => {
                tracing::warn!("inventory fetch failed: {}", e);
                self.fetch_error = Some(e.to_string());
                self.add_notification(
                    format!("Could not list containers: {}", e),
                    NotificationLevel::Error,
                );
            }
        }
    }

    /// Whether an operator reload may run now
    pub fn can_reload(&self) -> bool {
        !self.is_running()
    }

    /// Apply an operator-requested listing. Refused while a batch runs so
    /// the selection the batch was built from stays intact.
    pub fn apply_reload(&mut self, result: Result<Vec<ContainerSnapshot>, FetchError>) -> bool {
        if !self.can_reload() {
            return false;
        }
        if result.is_ok() {
            self.add_notification(
                "Container list reloaded".to_string(),
                NotificationLevel::Info,
            );
        }
        self.apply_fetch(result);
        true
    }

    pub fn move_up(&mut self) {
        self.cursor = self.cursor.saturating_sub(1);
    }

    pub fn move_down(&mut self) {
        if self.cursor + 1 < self.inventory.len() {
            self.cursor += 1;
        }
    }

    /// Flip selection of the row under the cursor. Ignored while running.
    pub fn toggle_selected(&mut self) -> bool {
        if self.is_running() || self.cursor >= self.inventory.len() {
            return false;
        }
        if !self.selected.remove(&self.cursor) {
            self.selected.insert(self.cursor);
        }
        true
    }

    /// Move to `Running` and hand out the selected snapshots in row order.
    /// `None` when already running or nothing is selected.
    pub fn begin_batch(&mut self) -> Option<Vec<ContainerSnapshot>> {
        if self.is_running() || self.selected.is_empty() {
            return None;
        }

        let batch: Vec<ContainerSnapshot> = self
            .selected
            .iter()
            .filter_map(|&i| self.inventory.get(i).cloned())
            .collect();
        if batch.is_empty() {
            return None;
        }

        self.processing = ProcessingState::Running;
        self.progress = None;
        Some(batch)
    }

    pub fn record_progress(&mut self, name: String, stage: UpdateStage) {
        if self.is_running() {
            self.progress = Some(Progress { name, stage });
        }
    }

    /// Back to `Idle` with the batch report and a freshly fetched inventory.
    /// Selection never survives a batch, even when the re-fetch fails.
    pub fn finish_batch(
        &mut self,
        report: BatchReport,
        refetch: Result<Vec<ContainerSnapshot>, FetchError>,
        fact: Option<String>,
    ) {
        self.processing = ProcessingState::Idle;
        self.progress = None;
        self.selected.clear();

        let level = if report.interrupted.is_none() && report.failed_count() == 0 {
            NotificationLevel::Success
        } else {
            NotificationLevel::Error
        };
        self.add_notification(report.summary(), level);

        if report.interrupted.is_some() {
            self.add_notification(
                "Some containers may be stopped, check the list".to_string(),
                NotificationLevel::Warning,
            );
        }

        let stranded = report.stranded();
        if !stranded.is_empty() {
            let names: Vec<&str> = stranded.iter().map(|r| r.display_name()).collect();
            self.add_notification(
                format!("Stopped without replacement: {}", names.join(", ")),
                NotificationLevel::Warning,
            );
        }

        self.last_report = Some(report);
        self.fact = fact;
        self.apply_fetch(refetch);
    }

    pub fn tick(&mut self) {
        self.spinner_frame = self.spinner_frame.wrapping_add(1);
        self.remove_expired_notifications();
    }

    pub fn add_notification(&mut self, message: String, level: NotificationLevel) {
        let notification = Notification {
            id: uuid::Uuid::new_v4(),
            message,
            level,
            created_at: chrono::Utc::now(),
            duration_ms: 5000,
        };
        self.notifications.push(notification);
    }

    pub fn remove_expired_notifications(&mut self) {
        let now = chrono::Utc::now();
        self.notifications.retain(|n| {
            let elapsed = now.signed_duration_since(n.created_at).num_milliseconds() as u64;
            elapsed < n.duration_ms
        });
    }
}

//! Fixtures shared by unit tests.

use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use tempfile::TempDir;
use tokio::sync::{Notify, Semaphore};
use uuid::Uuid;

use crate::{
    db::{init_pool, run_migrations, DbPool},
    error::AppError,
    services::{mailer::Notifier, notifications::NotificationJob},
};

/// A migrated SQLite database living in a fresh temp dir.
pub(crate) async fn temp_pool() -> (TempDir, DbPool) {
    let dir = TempDir::new().expect("create temp dir");
    let url = format!("sqlite://{}", dir.path().join("journey.sqlite").display());
    let pool = init_pool(&url).await.expect("open sqlite pool");
    run_migrations(&pool).await.expect("run migrations");
    (dir, pool)
}

/// Notifier fake that records every call.
#[derive(Default)]
pub(crate) struct RecordingNotifier {
    jobs: Mutex<Vec<NotificationJob>>,
    fail: bool,
    gate: Option<Gate>,
}

struct Gate {
    started: Notify,
    open: Semaphore,
}

impl RecordingNotifier {
    pub(crate) fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    /// Every call parks until [`RecordingNotifier::release`].
    pub(crate) fn blocked() -> Self {
        Self {
            gate: Some(Gate {
                started: Notify::new(),
                open: Semaphore::new(0),
            }),
            ..Self::default()
        }
    }

    pub(crate) async fn wait_until_started(&self) {
        if let Some(gate) = &self.gate {
            gate.started.notified().await;
        }
    }

    pub(crate) fn release(&self) {
        if let Some(gate) = &self.gate {
            gate.open.close();
        }
    }

    pub(crate) fn jobs(&self) -> Vec<NotificationJob> {
        self.jobs
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub(crate) fn count(&self, kind: &str) -> usize {
        self.jobs().iter().filter(|job| job.kind() == kind).count()
    }

    async fn record(&self, job: NotificationJob) -> Result<(), AppError> {
        self.jobs
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(job);
        if let Some(gate) = &self.gate {
            gate.started.notify_one();
            let _ = gate.open.acquire().await;
        }
        if self.fail {
            return Err(AppError::Mail("smtp unavailable".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send_owner_confirmation_email(&self, trip_id: Uuid) -> Result<(), AppError> {
        self.record(NotificationJob::OwnerConfirmation { trip_id })
            .await
    }

    async fn send_trip_confirmed_emails(&self, trip_id: Uuid) -> Result<(), AppError> {
        self.record(NotificationJob::TripConfirmed { trip_id }).await
    }
}

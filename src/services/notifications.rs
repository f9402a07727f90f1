//! Fire-and-forget delivery of notification emails.
//!
//! Workflow operations hand a [`NotificationJob`] to the dispatcher and return
//! immediately. A fixed pool of worker tasks pulls jobs from a bounded queue
//! and calls the [`Notifier`]. Jobs are detached from the request that created
//! them: a client disconnect does not cancel them, and their failures are only
//! logged.
//!
//! The queue lives in memory. A job that is dropped because the queue is full,
//! or that fails to deliver, is logged at `error` with its trip id so it can be
//! replayed by hand.

use std::sync::{Arc, Mutex, PoisonError};

use tokio::{
    sync::mpsc::{self, error::TrySendError},
    task::JoinHandle,
};
use tracing::{debug, error, info};
use uuid::Uuid;

use super::mailer::Notifier;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationJob {
    OwnerConfirmation { trip_id: Uuid },
    TripConfirmed { trip_id: Uuid },
}

impl NotificationJob {
    pub fn kind(&self) -> &'static str {
        match self {
            NotificationJob::OwnerConfirmation { .. } => "owner_confirmation",
            NotificationJob::TripConfirmed { .. } => "trip_confirmed",
        }
    }

    pub fn trip_id(&self) -> Uuid {
        match self {
            NotificationJob::OwnerConfirmation { trip_id }
            | NotificationJob::TripConfirmed { trip_id } => *trip_id,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct DispatcherConfig {
    pub workers: usize,
    pub queue_size: usize,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            workers: 2,
            queue_size: 256,
        }
    }
}

#[derive(Clone)]
pub struct NotificationDispatcher {
    inner: Arc<Inner>,
}

struct Inner {
    sender: Mutex<Option<mpsc::Sender<NotificationJob>>>,
    workers: Mutex<Vec<JoinHandle<()>>>,
}

type SharedReceiver = Arc<tokio::sync::Mutex<mpsc::Receiver<NotificationJob>>>;

impl NotificationDispatcher {
    /// Spawns the worker pool on the current tokio runtime.
    pub fn start(notifier: Arc<dyn Notifier>, config: DispatcherConfig) -> Self {
        let workers = config.workers.max(1);
        let (sender, receiver) = mpsc::channel(config.queue_size.max(1));
        let receiver: SharedReceiver = Arc::new(tokio::sync::Mutex::new(receiver));

        let handles = (0..workers)
            .map(|worker| {
                let notifier = Arc::clone(&notifier);
                let receiver = Arc::clone(&receiver);
                tokio::spawn(worker_loop(worker, notifier, receiver))
            })
            .collect();

        info!(workers, queue_size = config.queue_size, "notification workers started");

        Self {
            inner: Arc::new(Inner {
                sender: Mutex::new(Some(sender)),
                workers: Mutex::new(handles),
            }),
        }
    }

    /// Queues `job` without waiting. Returns whether it was accepted.
    pub fn dispatch(&self, job: NotificationJob) -> bool {
        let sender = self
            .inner
            .sender
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let Some(sender) = sender.as_ref() else {
            error!(trip_id = %job.trip_id(), job = job.kind(), "notification dropped: dispatcher is shut down");
            return false;
        };

        match sender.try_send(job) {
            Ok(()) => {
                debug!(trip_id = %job.trip_id(), job = job.kind(), "notification queued");
                true
            }
            Err(TrySendError::Full(job)) => {
                error!(trip_id = %job.trip_id(), job = job.kind(), "notification dropped: queue full");
                false
            }
            Err(TrySendError::Closed(job)) => {
                error!(trip_id = %job.trip_id(), job = job.kind(), "notification dropped: workers gone");
                false
            }
        }
    }

    /// Stops accepting jobs and waits until every queued job has been handled.
    pub async fn shutdown(&self) {
        self.inner
            .sender
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        let handles = std::mem::take(
            &mut *self
                .inner
                .workers
                .lock()
                .unwrap_or_else(PoisonError::into_inner),
        );
        for handle in handles {
            if let Err(err) = handle.await {
                error!("notification worker ended abnormally: {err}");
            }
        }
        info!("notification workers stopped");
    }
}

async fn worker_loop(worker: usize, notifier: Arc<dyn Notifier>, receiver: SharedReceiver) {
    loop {
        let job = receiver.lock().await.recv().await;
        let Some(job) = job else {
            debug!(worker, "notification queue closed");
            break;
        };

        // Run each delivery in its own task so a panicking notifier only loses one job.
        let notifier = Arc::clone(&notifier);
        let delivery = tokio::spawn(async move { deliver(notifier.as_ref(), job).await });
        if let Err(err) = delivery.await {
            error!(worker, trip_id = %job.trip_id(), job = job.kind(), "notification task failed: {err}");
        }
    }
}

async fn deliver(notifier: &dyn Notifier, job: NotificationJob) {
    let result = match job {
        NotificationJob::OwnerConfirmation { trip_id } => {
            notifier.send_owner_confirmation_email(trip_id).await
        }
        NotificationJob::TripConfirmed { trip_id } => {
            notifier.send_trip_confirmed_emails(trip_id).await
        }
    };

    match result {
        Ok(()) => debug!(trip_id = %job.trip_id(), job = job.kind(), "notification delivered"),
        Err(err) => error!(
            trip_id = %job.trip_id(),
            job = job.kind(),
            error = %err,
            "failed to deliver notification"
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::RecordingNotifier;

    #[tokio::test]
    async fn delivers_every_queued_job_before_shutdown_returns() {
        let notifier = Arc::new(RecordingNotifier::default());
        let dispatcher = NotificationDispatcher::start(notifier.clone(), DispatcherConfig::default());
        let trips: Vec<Uuid> = (0..5).map(|_| Uuid::new_v4()).collect();

        for trip_id in &trips {
            assert!(dispatcher.dispatch(NotificationJob::OwnerConfirmation { trip_id: *trip_id }));
        }
        dispatcher.shutdown().await;

        let mut delivered: Vec<Uuid> = notifier.jobs().iter().map(|job| job.trip_id()).collect();
        delivered.sort();
        let mut expected = trips.clone();
        expected.sort();
        assert_eq!(delivered, expected);
    }

    #[tokio::test]
    async fn failures_do_not_stop_the_workers() {
        let notifier = Arc::new(RecordingNotifier::failing());
        let dispatcher = NotificationDispatcher::start(
            notifier.clone(),
            DispatcherConfig {
                workers: 1,
                queue_size: 4,
            },
        );

        dispatcher.dispatch(NotificationJob::TripConfirmed { trip_id: Uuid::new_v4() });
        dispatcher.dispatch(NotificationJob::TripConfirmed { trip_id: Uuid::new_v4() });
        dispatcher.shutdown().await;

        assert_eq!(notifier.jobs().len(), 2);
    }

    #[tokio::test]
    async fn rejects_jobs_after_shutdown() {
        let notifier = Arc::new(RecordingNotifier::default());
        let dispatcher = NotificationDispatcher::start(notifier.clone(), DispatcherConfig::default());
        dispatcher.shutdown().await;

        assert!(!dispatcher.dispatch(NotificationJob::OwnerConfirmation { trip_id: Uuid::new_v4() }));
        assert!(notifier.jobs().is_empty());
    }

    #[tokio::test]
    async fn full_queue_drops_instead_of_blocking() {
        let notifier = Arc::new(RecordingNotifier::blocked());
        let dispatcher = NotificationDispatcher::start(
            notifier.clone(),
            DispatcherConfig {
                workers: 1,
                queue_size: 1,
            },
        );

        // The single worker parks on the first job; the second fills the queue.
        assert!(dispatcher.dispatch(NotificationJob::OwnerConfirmation { trip_id: Uuid::new_v4() }));
        notifier.wait_until_started().await;
        assert!(dispatcher.dispatch(NotificationJob::OwnerConfirmation { trip_id: Uuid::new_v4() }));
        assert!(!dispatcher.dispatch(NotificationJob::OwnerConfirmation { trip_id: Uuid::new_v4() }));

        notifier.release();
        dispatcher.shutdown().await;
        assert_eq!(notifier.jobs().len(), 2);
    }
}

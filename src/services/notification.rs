//! Notification dispatch
//!
//! Fire-and-forget job submission towards the external notification sender.
//! Enqueueing is best-effort by contract: a failed enqueue is reported to
//! the caller, who logs it and moves on. It never fails the business
//! operation that produced the job.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::info;
use uuid::Uuid;

use crate::models::Activity;

/// Errors produced when handing a job to the queue.
#[derive(Error, Debug)]
pub enum NotificationError {
    #[error("notification queue is closed")]
    QueueClosed,
}

/// Kinds of background jobs the core emits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobKind {
    SendConfirmationEmail,
}

/// One queued notification job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationJob {
    pub id: Uuid,
    pub kind: JobKind,
    pub params: HashMap<String, String>,
}

impl NotificationJob {
    /// Confirmation email for a freshly created activity, addressed to the
    /// owner with a snapshot of the activity taken at creation time.
    pub fn confirmation_email(email: &str, activity: &Activity) -> Self {
        let mut params = HashMap::new();
        params.insert("email".to_string(), email.to_string());
        params.insert("activity_info".to_string(), activity.to_string());
        Self {
            id: Uuid::new_v4(),
            kind: JobKind::SendConfirmationEmail,
            params,
        }
    }
}

/// Job submission interface handed to the coordinator.
pub trait NotificationQueue: Send + Sync {
    fn enqueue(&self, job: NotificationJob) -> Result<(), NotificationError>;
}

/// Channel-backed queue drained by [`run_worker`].
#[derive(Clone)]
pub struct TaskQueue {
    sender: mpsc::UnboundedSender<NotificationJob>,
}

impl TaskQueue {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<NotificationJob>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }
}

impl NotificationQueue for TaskQueue {
    fn enqueue(&self, job: NotificationJob) -> Result<(), NotificationError> {
        self.sender
            .send(job)
            .map_err(|_| NotificationError::QueueClosed)
    }
}

/// Drain the queue, handing each job to the delivery side. Actual delivery
/// lives outside this crate; the worker records what it would dispatch.
pub async fn run_worker(mut receiver: mpsc::UnboundedReceiver<NotificationJob>) {
    while let Some(job) = receiver.recv().await {
        info!(job_id = %job.id, kind = ?job.kind, "dispatching notification job");
    }
}

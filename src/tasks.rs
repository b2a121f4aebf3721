//! Detached background sequences (blinks, scans)
//!
//! Tasks are fire-and-forget for the request that started them: their errors
//! are logged here and never reach the caller. Each task gets a cancellation
//! token derived from the registry root, so they can be stopped one by one or
//! all together on shutdown.

use std::{collections::HashMap, future::Future, sync::Arc, time::Duration};

use chrono::{DateTime, Utc};
use parse_display::Display;
use serde_derive::Serialize;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Display)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum TaskKind {
    #[display("blink U{unum}")]
    BlinkUnit { unum: u32 },
    #[display("blink U{start}-U{end}")]
    BlinkUnitRange { start: u32, end: u32 },
    #[display("blink equipment {equipment}")]
    BlinkEquipment { equipment: String },
    #[display("scan U{from}-U{to}")]
    ScanUnits { from: u32, to: u32 },
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskInfo {
    pub id: Uuid,
    #[serde(flatten)]
    pub kind: TaskKind,
    pub started_at: DateTime<Utc>,
}

struct TaskEntry {
    info: TaskInfo,
    token: CancellationToken,
}

#[derive(Clone)]
pub struct TaskRegistry {
    root: CancellationToken,
    tasks: Arc<Mutex<HashMap<Uuid, TaskEntry>>>,
}

impl Default for TaskRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl TaskRegistry {
    pub fn new() -> Self {
        Self {
            root: CancellationToken::new(),
            tasks: Default::default(),
        }
    }

    /// Spawn the sequence built by `f` and return immediately
    ///
    /// `f` receives the cancellation token of the new task.
    pub async fn spawn<F, Fut, E>(&self, kind: TaskKind, f: F) -> TaskInfo
    where
        F: FnOnce(CancellationToken) -> Fut,
        Fut: Future<Output = Result<(), E>> + Send + 'static,
        E: std::fmt::Display + Send + 'static,
    {
        let info = TaskInfo {
            id: Uuid::new_v4(),
            kind,
            started_at: Utc::now(),
        };

        let token = self.root.child_token();
        self.tasks.lock().await.insert(
            info.id,
            TaskEntry {
                info: info.clone(),
                token: token.clone(),
            },
        );

        let span = info_span!("task", id = %info.id, kind = %info.kind);
        let sequence = f(token.clone());
        let tasks = self.tasks.clone();
        let id = info.id;

        tokio::spawn(
            async move {
                match sequence.await {
                    Ok(()) if token.is_cancelled() => info!("task cancelled"),
                    Ok(()) => debug!("task completed"),
                    Err(error) => warn!(error = %error, "task failed"),
                }

                tasks.lock().await.remove(&id);
            }
            .instrument(span),
        );

        info
    }

    /// Running tasks, oldest first
    pub async fn list(&self) -> Vec<TaskInfo> {
        let mut tasks: Vec<_> = self
            .tasks
            .lock()
            .await
            .values()
            .map(|entry| entry.info.clone())
            .collect();

        tasks.sort_by_key(|info| info.started_at);
        tasks
    }

    /// Request cancellation of one task. The task stops at its next delay point.
    pub async fn cancel(&self, id: Uuid) -> Option<TaskInfo> {
        self.tasks.lock().await.get(&id).map(|entry| {
            entry.token.cancel();
            entry.info.clone()
        })
    }

    /// Request cancellation of every running task, returns how many were signalled
    pub async fn cancel_all(&self) -> usize {
        let tasks = self.tasks.lock().await;
        for entry in tasks.values() {
            entry.token.cancel();
        }

        tasks.len()
    }

    /// Cancel all current and future tasks
    pub fn shutdown(&self) {
        self.root.cancel();
    }
}

/// Sleep for `duration`, returns `false` if `token` was cancelled first
pub async fn pause(token: &CancellationToken, duration: Duration) -> bool {
    tokio::select! {
        _ = token.cancelled() => false,
        _ = tokio::time::sleep(duration) => true,
    }
}

use std::{
    future::Future,
    sync::{Mutex, MutexGuard, PoisonError},
};

use tokio::task::JoinSet;

use crate::ServiceError;

/// Best-effort tasks started after a transition has been applied.
///
/// A failing task is logged and otherwise ignored: the primary update is
/// authoritative once it succeeded.
#[derive(Debug, Default)]
pub struct BackgroundEffects {
    tasks: Mutex<JoinSet<()>>,
}

impl BackgroundEffects {
    pub fn new() -> Self {
        Self::default()
    }

    /// Spawns `effect` on the current runtime.
    pub fn spawn<F>(&self, label: &'static str, effect: F)
    where
        F: Future<Output = Result<(), ServiceError>> + Send + 'static,
    {
        let mut tasks = self.lock();
        while tasks.try_join_next().is_some() {}
        tasks.spawn(async move {
            match effect.await {
                Ok(()) => tracing::debug!(effect = label, "background effect done"),
                Err(err) => tracing::warn!(effect = label, "background effect failed: {err}"),
            }
        });
    }

    /// Number of tasks not yet reaped.
    pub fn pending(&self) -> usize {
        self.lock().len()
    }

    /// Waits for every spawned task to finish.
    pub async fn drain(&self) {
        let mut tasks = std::mem::take(&mut *self.lock());
        while let Some(joined) = tasks.join_next().await {
            if let Err(err) = joined {
                tracing::warn!("background effect aborted: {err}");
            }
        }
    }

    fn lock(&self) -> MutexGuard<'_, JoinSet<()>> {
        self.tasks.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

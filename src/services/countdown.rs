// src/services/countdown.rs

use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use tokio::task::JoinHandle;
use uuid::Uuid;

type Tasks = HashMap<Uuid, (u64, JoinHandle<()>)>;

/// Running question countdowns, at most one per session.
#[derive(Clone, Default)]
pub struct Countdowns {
    tasks: Arc<Mutex<Tasks>>,
    generation: Arc<AtomicU64>,
}

impl Countdowns {
    /// Spawns `countdown` for `session_id`, aborting any previous one. The
    /// entry is dropped again once the task runs to completion.
    pub fn start<F>(&self, session_id: Uuid, countdown: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let generation = self.generation.fetch_add(1, Ordering::Relaxed);
        let registry = self.clone();

        // Held across the spawn so the task cannot release before it is stored.
        let mut tasks = self.lock();
        let handle = tokio::spawn(async move {
            countdown.await;
            registry.release(session_id, generation);
        });
        if let Some((_, previous)) = tasks.insert(session_id, (generation, handle)) {
            previous.abort();
        }
    }

    /// Best effort: a task already past its last tick finishes its writes.
    pub fn cancel(&self, session_id: Uuid) {
        let entry = self.lock().remove(&session_id);
        if let Some((_, handle)) = entry {
            tracing::debug!("Cancelling countdown for session {}", session_id);
            handle.abort();
        }
    }

    pub fn is_running(&self, session_id: Uuid) -> bool {
        self.lock()
            .get(&session_id)
            .is_some_and(|(_, h)| !h.is_finished())
    }

    fn release(&self, session_id: Uuid, generation: u64) {
        let mut tasks = self.lock();
        if tasks.get(&session_id).is_some_and(|(g, _)| *g == generation) {
            tasks.remove(&session_id);
        }
    }

    fn lock(&self) -> MutexGuard<'_, Tasks> {
        match self.tasks.lock() {
            Ok(tasks) => tasks,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

//! Named worker threads with liveness checks
//!
//! The standard library cannot enumerate the threads of a process, so
//! threads whose liveness matters are spawned through a [`ThreadRegistry`].

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, OnceLock};
use std::thread::{self, JoinHandle};

use crate::error::UtilsError;

static GLOBAL: OnceLock<ThreadRegistry> = OnceLock::new();

#[derive(Debug, Default)]
pub struct ThreadRegistry {
    threads: Mutex<HashMap<String, Vec<JoinHandle<()>>>>,
}

impl ThreadRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Process-wide registry
    pub fn global() -> &'static ThreadRegistry {
        GLOBAL.get_or_init(ThreadRegistry::new)
    }

    /// Spawn a named OS thread and track it
    pub fn spawn<F>(&self, name: &str, f: F) -> crate::Result<()>
    where
        F: FnOnce() + Send + 'static,
    {
        let handle = thread::Builder::new()
            .name(name.to_string())
            .spawn(f)
            .map_err(|e| UtilsError::Thread {
                message: format!("Unable to spawn thread {}: {}", name, e),
            })?;

        log::debug!("Spawned thread {}", name);
        self.lock().entry(name.to_string()).or_default().push(handle);
        Ok(())
    }

    /// Determines if there's an active thread for a given name.
    pub fn is_thread_running(&self, name: &str) -> bool {
        let mut threads = self.lock();
        let running = match threads.get_mut(name) {
            Some(handles) => {
                handles.retain(|h| !h.is_finished());
                !handles.is_empty()
            }
            None => false,
        };

        if !running {
            threads.remove(name);
        }

        running
    }

    /// Wait for every thread registered under `name`, returning how many were joined
    pub fn join(&self, name: &str) -> crate::Result<usize> {
        let handles = self.lock().remove(name).unwrap_or_default();
        let count = handles.len();

        for handle in handles {
            handle.join().map_err(|_| UtilsError::Thread {
                message: format!("Thread {} panicked", name),
            })?;
        }

        Ok(count)
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Vec<JoinHandle<()>>>> {
        // A panic while holding the lock leaves the map itself consistent.
        self.threads.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Determines if a thread spawned through the global registry is running.
pub fn is_thread_running(thread_name: &str) -> bool {
    ThreadRegistry::global().is_thread_running(thread_name)
}

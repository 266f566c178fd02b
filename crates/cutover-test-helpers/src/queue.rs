//! In-memory job queue

use std::collections::VecDeque;
use std::sync::Mutex;

use cutover_core::Result;
use cutover_jobs::{JobQueue, ReindexJob, Worker};

/// A FIFO queue double. Jobs accumulate until drained or run; uniqueness
/// and retry policies are deliberately not enforced, so tests can exercise
/// duplicate and out-of-order delivery.
#[derive(Debug, Default)]
pub struct MemoryQueue {
    jobs: Mutex<VecDeque<ReindexJob>>,
}

impl MemoryQueue {
    /// Create an empty queue
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of pending jobs
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Whether no jobs are pending
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Remove and return every pending job, in enqueue order
    #[must_use]
    pub fn drain(&self) -> Vec<ReindexJob> {
        self.lock().drain(..).collect()
    }

    /// Execute every pending job FIFO through the worker, including jobs
    /// enqueued while running. Stops at the first job error.
    ///
    /// # Errors
    /// Returns the first failing job's error; remaining jobs stay queued.
    pub fn run_all(&self, worker: &Worker) -> Result<()> {
        while let Some(job) = self.lock().pop_front() {
            worker.perform(&job)?;
        }
        Ok(())
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, VecDeque<ReindexJob>> {
        self.jobs.lock().expect("queue lock poisoned")
    }
}

impl JobQueue for MemoryQueue {
    fn enqueue(&self, job: ReindexJob) -> Result<()> {
        self.lock().push_back(job);
        Ok(())
    }
}

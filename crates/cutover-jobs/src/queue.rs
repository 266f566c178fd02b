//! Queue backend boundary

use cutover_core::Result;

use crate::job::ReindexJob;

/// A queue backend that accepts jobs for later execution.
///
/// The backend is expected to honor the job's [`JobPolicy`](crate::JobPolicy)
/// for queue placement, retry, and uniqueness. Delivery is at-least-once;
/// ordering across queues is not guaranteed.
pub trait JobQueue: Send + Sync {
    /// Accept a job for background execution
    ///
    /// # Errors
    /// Returns an error when the backend rejects the job; callers decide
    /// whether to fall back to synchronous execution.
    fn enqueue(&self, job: ReindexJob) -> Result<()>;
}

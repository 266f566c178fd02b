//! Job payloads and routing policy
//!
//! A `ReindexJob` is a self-contained, serializable unit of work. Payloads
//! carry ids, never record snapshots: the worker re-reads the datastore at
//! execution time, so a stale job converges to current truth instead of
//! replaying old state.

use serde::{Deserialize, Serialize};

/// Queue for population and deploy jobs. No automatic retry: a failed
/// population batch is rescheduled by the operator, not replayed blindly
/// against a half-built version.
pub const QUEUE_INDEXING: &str = "indexing";

/// Near-real-time queue for reconciliation and removal jobs. Retried on
/// failure; both job types are idempotent.
pub const QUEUE_RECONCILE: &str = "nrt";

/// One unit of background index work
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "job", rename_all = "snake_case")]
pub enum ReindexJob {
    /// Index a batch of records into one explicit version, in the current
    /// format. Used by distributed population.
    IndexBatch {
        /// Type discriminator of the records
        type_tag: String,
        /// Record ids to fetch and index
        ids: Vec<String>,
        /// The physical version under population
        version: String,
    },
    /// Re-check a set of ids against the datastore: records still present
    /// are reindexed, vanished ones are deleted from the index.
    Reconcile {
        /// Type discriminator of the records
        type_tag: String,
        /// Record ids to reconcile
        ids: Vec<String>,
    },
    /// Delete documents by id from the type's live version(s)
    RemoveDocuments {
        /// Type discriminator of the documents
        type_tag: String,
        /// Document ids to delete
        ids: Vec<String>,
    },
    /// Promote a version to serve live traffic, optionally pruning after
    Deploy {
        /// Logical index name
        logical: String,
        /// Physical version to promote
        version: String,
        /// Prune older versions once the alias has moved
        prune: bool,
    },
    /// Point the previous alias at a superseded version
    Retire {
        /// Logical index name
        logical: String,
        /// Physical version to retire
        version: String,
        /// Prune older versions afterwards
        prune: bool,
    },
}

impl ReindexJob {
    /// The job's kind discriminator
    #[must_use]
    pub const fn kind(&self) -> JobKind {
        match self {
            Self::IndexBatch { .. } => JobKind::IndexBatch,
            Self::Reconcile { .. } => JobKind::Reconcile,
            Self::RemoveDocuments { .. } => JobKind::RemoveDocuments,
            Self::Deploy { .. } => JobKind::Deploy,
            Self::Retire { .. } => JobKind::Retire,
        }
    }

    /// The routing policy for this job
    #[must_use]
    pub const fn policy(&self) -> JobPolicy {
        JobPolicy::for_kind(self.kind())
    }
}

/// Job kind discriminator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JobKind {
    /// Population batch write
    IndexBatch,
    /// Datastore-truth reconciliation
    Reconcile,
    /// Document removal
    RemoveDocuments,
    /// Alias promotion
    Deploy,
    /// Previous-alias retirement
    Retire,
}

/// How a job kind is routed and scheduled by the queue backend
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JobPolicy {
    /// Queue name the job lands on
    pub queue: &'static str,
    /// Whether the backend should retry the job on failure
    pub retry: bool,
    /// Whether the backend should deduplicate identical pending jobs
    pub unique: bool,
}

impl JobPolicy {
    /// The fixed policy for a job kind.
    ///
    /// Population and lifecycle jobs run on the indexing queue without
    /// retry; reconciliation and removal run on the nrt queue with retry.
    /// Every kind is marked unique: duplicates are wasted work, never a
    /// correctness risk.
    #[must_use]
    pub const fn for_kind(kind: JobKind) -> Self {
        match kind {
            JobKind::IndexBatch | JobKind::Deploy | JobKind::Retire => Self {
                queue: QUEUE_INDEXING,
                retry: false,
                unique: true,
            },
            JobKind::Reconcile | JobKind::RemoveDocuments => Self {
                queue: QUEUE_RECONCILE,
                retry: true,
                unique: true,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn policies_route_by_kind() {
        let batch = ReindexJob::IndexBatch {
            type_tag: "article".into(),
            ids: vec!["1".into()],
            version: "article_v1_2.0".into(),
        };
        assert_eq!(batch.policy().queue, QUEUE_INDEXING);
        assert!(!batch.policy().retry);

        let reconcile = ReindexJob::Reconcile {
            type_tag: "article".into(),
            ids: vec!["1".into()],
        };
        assert_eq!(reconcile.policy().queue, QUEUE_RECONCILE);
        assert!(reconcile.policy().retry);

        let remove = ReindexJob::RemoveDocuments {
            type_tag: "article".into(),
            ids: vec!["1".into()],
        };
        assert_eq!(remove.policy().queue, QUEUE_RECONCILE);
        assert!(remove.policy().retry);
        assert!(remove.policy().unique);
    }

    #[test]
    fn lifecycle_jobs_share_the_indexing_queue() {
        let deploy = ReindexJob::Deploy {
            logical: "article".into(),
            version: "article_v1_2.0".into(),
            prune: false,
        };
        let retire = ReindexJob::Retire {
            logical: "article".into(),
            version: "article_v0_1.0".into(),
            prune: true,
        };
        assert_eq!(deploy.policy().queue, QUEUE_INDEXING);
        assert_eq!(retire.policy().queue, QUEUE_INDEXING);
        assert!(!deploy.policy().retry);
    }

    #[test]
    fn payload_serde_round_trip() {
        let job = ReindexJob::IndexBatch {
            type_tag: "article".into(),
            ids: vec!["1".into(), "2".into()],
            version: "article_v1_1700000000.000001".into(),
        };
        let json = serde_json::to_string(&job).unwrap();
        assert!(json.contains("\"job\":\"index_batch\""));
        let back: ReindexJob = serde_json::from_str(&json).unwrap();
        assert_eq!(back, job);
    }

    #[test]
    fn payload_is_ids_not_snapshots() {
        // the wire shape carries ids only; a worker with newer data wins
        let job = ReindexJob::Reconcile {
            type_tag: "article".into(),
            ids: vec!["42".into()],
        };
        let value = serde_json::to_value(&job).unwrap();
        assert_eq!(value["ids"][0], "42");
        assert!(value.get("attributes").is_none());
    }
}

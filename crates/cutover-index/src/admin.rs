//! Index version manager
//!
//! Owns the create → deploy → prune state machine for each logical index.
//! A logical index is only ever addressed through its aliases; the sole
//! atomic operation readers observe is the alias swap, which is what allows
//! a new version to be built in the background for any length of time with
//! zero read downtime.

use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};

use chrono::{DateTime, Utc};
use tracing::{debug, info};

use cutover_core::error::tolerate_absent;
use cutover_core::{
    CutoverError, DEFAULT_SCHEMA_VERSION, ModelConfig, Result, extract_schema_version,
    is_version_of, version_name, version_timestamp,
};

use crate::gateway::{AliasActions, SearchEngine};

/// The alias readers resolve for live traffic
#[must_use]
pub fn current_alias(logical: &str) -> String {
    format!("current_{logical}")
}

/// The alias pointing at the superseded version during a migration
#[must_use]
pub fn previous_alias(logical: &str) -> String {
    format!("previous_{logical}")
}

/// Manages physical index versions and their alias bindings
#[derive(Clone)]
pub struct VersionManager {
    engine: Arc<dyn SearchEngine>,
    // last timestamp handed out, in epoch microseconds; versions created in
    // the same microsecond would otherwise collide on name
    last_created: Arc<AtomicI64>,
}

impl VersionManager {
    /// Create a manager over the given engine gateway
    #[must_use]
    pub fn new(engine: Arc<dyn SearchEngine>) -> Self {
        Self {
            engine,
            last_created: Arc::new(AtomicI64::new(0)),
        }
    }

    /// Wall clock, strictly increasing across this manager's creations
    fn next_creation_stamp(&self) -> DateTime<Utc> {
        let now = Utc::now().timestamp_micros();
        let mut prev = self.last_created.load(Ordering::Relaxed);
        let stamp = loop {
            let candidate = now.max(prev + 1);
            match self.last_created.compare_exchange(
                prev,
                candidate,
                Ordering::Relaxed,
                Ordering::Relaxed,
            ) {
                Ok(_) => break candidate,
                Err(actual) => prev = actual,
            }
        };
        DateTime::from_timestamp_micros(stamp).unwrap_or_else(Utc::now)
    }

    /// Create a new physical version for the model's logical index.
    ///
    /// The version is named with the current wall clock and the model's
    /// declared schema version, created with the model's settings, and given
    /// the model's field mapping when one is configured. Returns the new
    /// version name; the caller decides when (and whether) to deploy it.
    ///
    /// # Errors
    /// Returns `EngineUnavailable` when the gateway call fails; the caller
    /// decides whether to retry.
    pub fn create_version(&self, config: &ModelConfig) -> Result<String> {
        let name = version_name(
            &config.index_name,
            &config.current_schema_version,
            self.next_creation_stamp(),
        );
        self.engine.create_index(&name, &config.index_settings)?;
        if let Some(mapping) = &config.mapping {
            self.engine.put_mapping(&name, &config.type_tag, mapping)?;
        }
        info!(version = %name, logical = %config.index_name, "created index version");
        Ok(name)
    }

    /// Resolve the version currently serving live traffic.
    ///
    /// `None` means the logical index has never been deployed.
    pub fn current_version(&self, logical: &str) -> Result<Option<String>> {
        match self.engine.index_status(Some(&current_alias(logical))) {
            Ok(status) => Ok(status.keys().next().cloned()),
            Err(CutoverError::IndexAbsent(_)) => Ok(None),
            Err(err) => Err(err),
        }
    }

    /// Schema version of the live current version, `"0"` when undeployed
    pub fn current_schema_version(&self, logical: &str) -> Result<String> {
        Ok(self
            .current_version(logical)?
            .map_or_else(|| DEFAULT_SCHEMA_VERSION.to_owned(), |v| {
                extract_schema_version(&v)
            }))
    }

    /// List every physical version of a logical index, oldest first,
    /// regardless of alias state.
    pub fn list_versions(&self, logical: &str) -> Result<Vec<String>> {
        let status = self.engine.index_status(None)?;
        let mut versions: Vec<String> = status
            .keys()
            .filter(|name| is_version_of(logical, name))
            .cloned()
            .collect();
        versions.sort_by(|a, b| version_timestamp(a).total_cmp(&version_timestamp(b)));
        Ok(versions)
    }

    /// Promote a version to serve live traffic.
    ///
    /// Refreshes the version first so every document written during
    /// population is searchable the instant the alias lands, then performs
    /// the swap (add new binding, drop the old one) in a single atomic
    /// engine call. The initial deploy is add-only.
    pub fn deploy(&self, logical: &str, new_version: &str) -> Result<()> {
        self.engine.refresh(new_version)?;
        let alias = current_alias(logical);
        let mut actions = AliasActions::default().add(new_version, &alias);
        let displaced = self.current_version(logical)?;
        if let Some(old) = &displaced {
            if old != new_version {
                actions = actions.remove(old, &alias);
            }
        }
        self.engine.update_aliases(&actions)?;
        info!(logical, version = %new_version, displaced = ?displaced, "deployed index version");
        Ok(())
    }

    /// Point the `previous_<logical>` alias at a superseded version, so
    /// callers still writing the previous schema format have a stable
    /// target. Optionally prunes once the alias has moved.
    pub fn retire(&self, logical: &str, old_version: &str, prune: bool) -> Result<()> {
        let alias = previous_alias(logical);
        let mut actions = AliasActions::default().add(old_version, &alias);
        // an absent alias means no prior binding; any other status failure
        // must surface, or the stale binding would survive an add-only swap
        let prior = match self.engine.index_status(Some(&alias)) {
            Ok(status) => status.keys().next().cloned(),
            Err(CutoverError::IndexAbsent(_)) => None,
            Err(err) => return Err(err),
        };
        if let Some(prior) = prior {
            if prior != old_version {
                actions = actions.remove(prior, &alias);
            }
        }
        self.engine.update_aliases(&actions)?;
        debug!(logical, version = %old_version, "retired index version to previous alias");
        if prune {
            self.prune(logical)?;
        }
        Ok(())
    }

    /// Delete every version strictly older than the current one.
    ///
    /// Never deletes the current version; a no-op when no current version is
    /// resolvable. Returns how many versions were deleted. Versions already
    /// gone count as deleted, not as failures.
    pub fn prune(&self, logical: &str) -> Result<usize> {
        let Some(current) = self.current_version(logical)? else {
            debug!(logical, "prune skipped, no current version");
            return Ok(0);
        };
        let cutoff = version_timestamp(&current);
        let mut removed = 0;
        for version in self.list_versions(logical)? {
            if version_timestamp(&version) < cutoff {
                tolerate_absent(self.engine.delete_index(&version))?;
                removed += 1;
            }
        }
        info!(logical, current = %current, removed, "pruned index versions");
        Ok(removed)
    }

    /// Remove every version of a logical index, its aliases, and any bare
    /// legacy index sharing the logical name. Absent indices are success.
    pub fn delete_logical_index(&self, logical: &str) -> Result<()> {
        let current = self.current_version(logical)?;
        for version in self.list_versions(logical)? {
            if current.as_deref() == Some(version.as_str()) {
                self.engine.update_aliases(
                    &AliasActions::default().remove(&version, current_alias(logical)),
                )?;
            }
            tolerate_absent(self.engine.delete_index(&version))?;
        }
        // A pre-versioning deployment may have written a bare index under
        // the logical name itself.
        tolerate_absent(self.engine.delete_index(logical))?;
        info!(logical, "deleted logical index");
        Ok(())
    }
}

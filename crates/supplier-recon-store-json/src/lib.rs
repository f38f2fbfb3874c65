//! Durable JSON-document stores for the supplier reconciliation engine.
//!
//! Each store is a single pretty-printed JSON array read and written
//! wholesale; the usage model is single-writer and single-session, so there
//! is no locking and no record-level granularity. Writes go through a
//! temp-file-then-rename so a failed write never leaves a truncated
//! document behind. [`ReconWorkspace`] is the explicit session-state object
//! that owns both stores plus the live in-memory copies.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;
use supplier_recon_core::{
    aggregate, build_view, upsert_qualification, AggregateReport, OrderRow, QualificationRecord,
    ReconError, SupplierIdentity, SupplierMetric, UnifiedRow,
};

pub const METRICS_DOCUMENT: &str = "supplier_metrics.json";
pub const LEGACY_METRICS_DOCUMENT: &str = "supplier_delays.json";
pub const QUALIFICATIONS_DOCUMENT: &str = "qualifications.json";
pub const LEGACY_QUALIFICATIONS_DOCUMENT: &str = "qualification_grid.json";

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("storage unavailable at {path}: {source}")]
    Unavailable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("corrupt store document at {path}: {source}")]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("legacy migration from {legacy} to {primary} failed: {source}")]
    Migration {
        primary: PathBuf,
        legacy: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, thiserror::Error)]
pub enum WorkspaceError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Recon(#[from] ReconError),
}

/// Copies the legacy document to the primary path when the primary is
/// absent. The legacy document is never modified, so a failed or repeated
/// migration is always safe to retry. Returns whether a copy happened.
///
/// # Errors
/// Returns [`StoreError::Migration`] when the copy itself fails. A single
/// `fs::copy` error does not say which side broke, so the error names both
/// documents.
pub fn migrate_legacy(primary: &Path, legacy: &Path) -> Result<bool, StoreError> {
    if primary.exists() || !legacy.exists() {
        return Ok(false);
    }
    fs::copy(legacy, primary).map_err(|source| StoreError::Migration {
        primary: primary.to_path_buf(),
        legacy: legacy.to_path_buf(),
        source,
    })?;
    Ok(true)
}

fn read_document<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>, StoreError> {
    let raw = match fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(err) if err.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
        Err(source) => {
            return Err(StoreError::Unavailable {
                path: path.to_path_buf(),
                source,
            })
        }
    };

    if raw.trim().is_empty() {
        return Ok(Vec::new());
    }

    serde_json::from_str(&raw).map_err(|source| StoreError::Corrupt {
        path: path.to_path_buf(),
        source,
    })
}

fn write_document<T: Serialize>(path: &Path, records: &[T]) -> Result<(), StoreError> {
    let serialized =
        serde_json::to_string_pretty(records).map_err(|source| StoreError::Corrupt {
            path: path.to_path_buf(),
            source,
        })?;

    let mut tmp_name = path.as_os_str().to_os_string();
    tmp_name.push(".tmp");
    let tmp_path = PathBuf::from(tmp_name);

    let unavailable = |source: std::io::Error| StoreError::Unavailable {
        path: path.to_path_buf(),
        source,
    };
    fs::write(&tmp_path, serialized).map_err(unavailable)?;
    fs::rename(&tmp_path, path).map_err(unavailable)?;
    Ok(())
}

/// Durable keyed collection of human-entered qualification records.
#[derive(Debug, Clone)]
pub struct QualificationStore {
    path: PathBuf,
    legacy_path: PathBuf,
}

impl QualificationStore {
    #[must_use]
    pub fn open(path: PathBuf, legacy_path: PathBuf) -> Self {
        Self { path, legacy_path }
    }

    /// Loads the whole collection, running legacy migration first. A
    /// missing document is the empty collection.
    ///
    /// # Errors
    /// Returns [`StoreError`] when the document cannot be read or decoded.
    pub fn load(&self) -> Result<Vec<QualificationRecord>, StoreError> {
        migrate_legacy(&self.path, &self.legacy_path)?;
        read_document(&self.path)
    }

    /// Overwrites the whole collection.
    ///
    /// # Errors
    /// Returns [`StoreError::Unavailable`] when the document cannot be
    /// written.
    pub fn persist(&self, records: &[QualificationRecord]) -> Result<(), StoreError> {
        write_document(&self.path, records)
    }

    /// Looks up one record by normalized identity.
    ///
    /// # Errors
    /// Returns [`StoreError`] when the collection cannot be loaded.
    pub fn get(
        &self,
        identity: &SupplierIdentity,
    ) -> Result<Option<QualificationRecord>, StoreError> {
        let records = self.load()?;
        Ok(records
            .into_iter()
            .find(|record| record.identity() == *identity))
    }

    /// Replaces any record with a matching identity, otherwise appends,
    /// then persists. Returns the updated collection; exactly one record
    /// carries the upserted identity afterwards.
    ///
    /// # Errors
    /// Returns [`StoreError`] when load or persist fails; a failed persist
    /// leaves the stored document untouched.
    pub fn upsert(
        &self,
        record: QualificationRecord,
    ) -> Result<Vec<QualificationRecord>, StoreError> {
        let mut records = self.load()?;
        upsert_qualification(&mut records, record);
        self.persist(&records)?;
        Ok(records)
    }
}

/// Durable snapshot of the latest aggregation run. No upsert granularity:
/// every successful import replaces the entire collection, since metrics
/// are derived state rather than independently editable records.
#[derive(Debug, Clone)]
pub struct MetricsStore {
    path: PathBuf,
    legacy_path: PathBuf,
}

impl MetricsStore {
    #[must_use]
    pub fn open(path: PathBuf, legacy_path: PathBuf) -> Self {
        Self { path, legacy_path }
    }

    /// Loads the stored metrics, running legacy migration first.
    ///
    /// # Errors
    /// Returns [`StoreError`] when the document cannot be read or decoded.
    pub fn load(&self) -> Result<Vec<SupplierMetric>, StoreError> {
        migrate_legacy(&self.path, &self.legacy_path)?;
        read_document(&self.path)
    }

    /// Overwrites the stored metrics wholesale.
    ///
    /// # Errors
    /// Returns [`StoreError::Unavailable`] when the document cannot be
    /// written.
    pub fn persist(&self, metrics: &[SupplierMetric]) -> Result<(), StoreError> {
        write_document(&self.path, metrics)
    }
}

/// Session-state object for the reconciliation workflow.
///
/// Owns both stores and the in-memory copies kept alive across
/// interactions; `load` and the mutating operations are the only points at
/// which the in-memory copies and the documents exchange state. A failed
/// operation leaves the in-memory copies as they were.
#[derive(Debug)]
pub struct ReconWorkspace {
    qualification_store: QualificationStore,
    metrics_store: MetricsStore,
    metrics: Vec<SupplierMetric>,
    qualifications: Vec<QualificationRecord>,
}

impl ReconWorkspace {
    /// Opens a workspace over the conventional document paths under one
    /// data directory.
    #[must_use]
    pub fn open(data_dir: &Path) -> Self {
        Self {
            qualification_store: QualificationStore::open(
                data_dir.join(QUALIFICATIONS_DOCUMENT),
                data_dir.join(LEGACY_QUALIFICATIONS_DOCUMENT),
            ),
            metrics_store: MetricsStore::open(
                data_dir.join(METRICS_DOCUMENT),
                data_dir.join(LEGACY_METRICS_DOCUMENT),
            ),
            metrics: Vec::new(),
            qualifications: Vec::new(),
        }
    }

    /// Loads both collections into memory, running legacy migration.
    ///
    /// # Errors
    /// Returns [`WorkspaceError`] when either store fails to load; the
    /// in-memory copies are only replaced after both loads succeed.
    pub fn load(&mut self) -> Result<(), WorkspaceError> {
        let metrics = self.metrics_store.load()?;
        let qualifications = self.qualification_store.load()?;
        self.metrics = metrics;
        self.qualifications = qualifications;
        Ok(())
    }

    /// Runs one import cycle: aggregates the rows, persists the resulting
    /// metrics wholesale, then replaces the in-memory metrics.
    ///
    /// # Errors
    /// Returns [`WorkspaceError`] when aggregation fails structurally or
    /// the metrics document cannot be written; either way the previous
    /// in-memory metrics are kept.
    pub fn import(&mut self, rows: &[OrderRow]) -> Result<AggregateReport, WorkspaceError> {
        let report = aggregate(rows)?;
        self.metrics_store.persist(&report.metrics)?;
        self.metrics.clone_from(&report.metrics);
        Ok(report)
    }

    /// Records or replaces one qualification assessment (upsert by
    /// normalized identity), then refreshes the in-memory copy.
    ///
    /// # Errors
    /// Returns [`WorkspaceError`] when the record fails validation or the
    /// store cannot be updated.
    pub fn record_qualification(
        &mut self,
        record: QualificationRecord,
    ) -> Result<(), WorkspaceError> {
        record.validate().map_err(WorkspaceError::Recon)?;
        let updated = self.qualification_store.upsert(record)?;
        self.qualifications = updated;
        Ok(())
    }

    #[must_use]
    pub fn metrics(&self) -> &[SupplierMetric] {
        &self.metrics
    }

    #[must_use]
    pub fn qualifications(&self) -> &[QualificationRecord] {
        &self.qualifications
    }

    /// Looks up the in-memory qualification for a display name.
    #[must_use]
    pub fn qualification(&self, supplier_name: &str) -> Option<&QualificationRecord> {
        let identity = SupplierIdentity::normalize(Some(supplier_name));
        self.qualifications
            .iter()
            .find(|record| record.identity() == identity)
    }

    /// Builds the unified per-supplier view from the in-memory copies.
    #[must_use]
    pub fn unified_view(&self) -> Vec<UnifiedRow> {
        build_view(&self.metrics, &self.qualifications)
    }
}

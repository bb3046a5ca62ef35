//!
//! brickline storage module
//! ------------------------
//! Generic persisted record store for the marketplace's domain collections
//! (listings, bookings, favorites). Records live on disk as one JSON document
//! per record under `<root>/<collection>/<id>.json`. Identifiers and the
//! `created_at`/`updated_at` timestamps are always server-assigned; callers
//! only ever hand over a JSON body.
//!
//! The `ResourceStore` trait is the seam handlers program against, so tests
//! substitute spies and a hosted database can replace the disk store without
//! touching the handlers.

use anyhow::{Context, Result};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Envelope around one stored document. The body is flattened so a record
/// serializes as a single flat object: `{"id": ..., "created_at": ...,
/// "updated_at": ..., <body fields>}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredRecord {
    pub id: String,
    pub created_at: i64,
    pub updated_at: i64,
    #[serde(flatten)]
    pub body: serde_json::Map<String, Value>,
}

pub trait ResourceStore: Send + Sync {
    fn insert(&self, collection: &str, body: serde_json::Map<String, Value>) -> Result<StoredRecord>;
    fn get(&self, collection: &str, id: &str) -> Result<Option<StoredRecord>>;
    fn update(&self, collection: &str, id: &str, body: serde_json::Map<String, Value>) -> Result<Option<StoredRecord>>;
    fn delete(&self, collection: &str, id: &str) -> Result<bool>;
    fn list(&self, collection: &str) -> Result<Vec<StoredRecord>>;
}

/// Disk-backed store rooted at a configured folder.
pub struct Store {
    root: PathBuf,
    // serializes read-modify-write cycles on individual records
    write_lock: Mutex<()>,
}

impl Store {
    pub fn new<P: AsRef<Path>>(root: P) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root)
            .with_context(|| format!("creating record store root {}", root.display()))?;
        Ok(Self { root, write_lock: Mutex::new(()) })
    }

    pub fn root_path(&self) -> &PathBuf { &self.root }

    // Identifiers are server-assigned uuids; anything else (and in particular
    // anything path-like) is rejected before touching the filesystem.
    fn id_is_safe(id: &str) -> bool {
        !id.is_empty() && id.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
    }

    fn collection_dir(&self, collection: &str) -> PathBuf {
        self.root.join(collection)
    }

    fn record_path(&self, collection: &str, id: &str) -> PathBuf {
        self.collection_dir(collection).join(format!("{id}.json"))
    }

    fn read_record(&self, path: &Path) -> Result<StoredRecord> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("reading record {}", path.display()))?;
        let rec = serde_json::from_str(&raw)
            .with_context(|| format!("parsing record {}", path.display()))?;
        Ok(rec)
    }

    fn write_record(&self, collection: &str, rec: &StoredRecord) -> Result<()> {
        let dir = self.collection_dir(collection);
        fs::create_dir_all(&dir)
            .with_context(|| format!("creating collection folder {}", dir.display()))?;
        let path = self.record_path(collection, &rec.id);
        fs::write(&path, serde_json::to_string_pretty(rec)?)
            .with_context(|| format!("writing record {}", path.display()))?;
        Ok(())
    }
}

impl ResourceStore for Store {
    fn insert(&self, collection: &str, body: serde_json::Map<String, Value>) -> Result<StoredRecord> {
        let _g = self.write_lock.lock();
        let now = chrono::Utc::now().timestamp_millis();
        let rec = StoredRecord {
            id: uuid::Uuid::new_v4().to_string(),
            created_at: now,
            updated_at: now,
            body,
        };
        self.write_record(collection, &rec)?;
        debug!(target: "brickline::storage", "insert collection='{}' id='{}'", collection, rec.id);
        Ok(rec)
    }

    fn get(&self, collection: &str, id: &str) -> Result<Option<StoredRecord>> {
        if !Self::id_is_safe(id) { return Ok(None); }
        let path = self.record_path(collection, id);
        if !path.exists() { return Ok(None); }
        Ok(Some(self.read_record(&path)?))
    }

    fn update(&self, collection: &str, id: &str, body: serde_json::Map<String, Value>) -> Result<Option<StoredRecord>> {
        if !Self::id_is_safe(id) { return Ok(None); }
        let _g = self.write_lock.lock();
        let path = self.record_path(collection, id);
        if !path.exists() { return Ok(None); }
        let existing = self.read_record(&path)?;
        let rec = StoredRecord {
            id: existing.id,
            created_at: existing.created_at,
            updated_at: chrono::Utc::now().timestamp_millis(),
            body,
        };
        self.write_record(collection, &rec)?;
        debug!(target: "brickline::storage", "update collection='{}' id='{}'", collection, rec.id);
        Ok(Some(rec))
    }

    fn delete(&self, collection: &str, id: &str) -> Result<bool> {
        if !Self::id_is_safe(id) { return Ok(false); }
        let _g = self.write_lock.lock();
        let path = self.record_path(collection, id);
        if !path.exists() { return Ok(false); }
        fs::remove_file(&path)
            .with_context(|| format!("deleting record {}", path.display()))?;
        debug!(target: "brickline::storage", "delete collection='{}' id='{}'", collection, id);
        Ok(true)
    }

    fn list(&self, collection: &str) -> Result<Vec<StoredRecord>> {
        let dir = self.collection_dir(collection);
        if !dir.exists() { return Ok(Vec::new()); }
        let mut out = Vec::new();
        for entry in fs::read_dir(&dir).with_context(|| format!("listing {}", dir.display()))? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") { continue; }
            match self.read_record(&path) {
                Ok(rec) => out.push(rec),
                Err(e) => debug!(target: "brickline::storage", "skipping unreadable record {}: {e}", path.display()),
            }
        }
        out.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        Ok(out)
    }
}

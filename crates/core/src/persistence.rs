//! Persistence records and hooks
//!
//! The store emits its complete per-page collections as an
//! [`AnnotationSnapshot`] after every mutation. An [`AnnotationSink`] decides
//! what to do with it; [`JsonSidecarSink`] writes it as JSON keyed by the
//! open document's name and size.

use crate::annotation::{ShapeObject, StrokePath};
use crate::error::AnnotatorResult;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Serializable form of every annotation in a document
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnnotationSnapshot {
    #[serde(default)]
    pub paths: BTreeMap<u32, Vec<StrokePath>>,
    #[serde(default)]
    pub shapes: BTreeMap<u32, Vec<ShapeObject>>,
}

#[derive(Deserialize)]
struct RawSnapshot {
    #[serde(default)]
    paths: BTreeMap<u32, Vec<serde_json::Value>>,
    #[serde(default)]
    shapes: BTreeMap<u32, Vec<serde_json::Value>>,
}

impl AnnotationSnapshot {
    pub fn to_json(&self) -> AnnotatorResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Decode a snapshot, skipping records that fail to parse
    ///
    /// Only a document that is not a snapshot object at all is an error.
    /// Individual malformed paths or shapes of an unknown variant are logged
    /// and dropped.
    pub fn from_json_lenient(json: &str) -> AnnotatorResult<Self> {
        let raw: RawSnapshot = serde_json::from_str(json)?;

        Ok(Self {
            paths: decode_pages(raw.paths, "stroke path"),
            shapes: decode_pages(raw.shapes, "shape"),
        })
    }

    pub fn path_count(&self) -> usize {
        self.paths.values().map(Vec::len).sum()
    }

    pub fn shape_count(&self) -> usize {
        self.shapes.values().map(Vec::len).sum()
    }
}

fn decode_pages<T: serde::de::DeserializeOwned>(
    pages: BTreeMap<u32, Vec<serde_json::Value>>,
    what: &str,
) -> BTreeMap<u32, Vec<T>> {
    pages
        .into_iter()
        .map(|(page, records)| {
            let decoded = records
                .into_iter()
                .enumerate()
                .filter_map(|(index, record)| match serde_json::from_value(record) {
                    Ok(value) => Some(value),
                    Err(e) => {
                        log::warn!("skipping malformed {what} #{index} on page {page}: {e}");
                        None
                    }
                })
                .collect();
            (page, decoded)
        })
        .collect()
}

/// Receives the store's collections after every mutation
pub trait AnnotationSink {
    fn annotations_changed(&mut self, snapshot: &AnnotationSnapshot);
}

impl<F> AnnotationSink for F
where
    F: FnMut(&AnnotationSnapshot),
{
    fn annotations_changed(&mut self, snapshot: &AnnotationSnapshot) {
        self(snapshot)
    }
}

/// Identifies an open document for storage purposes
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DocumentKey {
    pub file_name: String,
    pub file_size: u64,
}

impl DocumentKey {
    pub fn new(file_name: impl Into<String>, file_size: u64) -> Self {
        Self { file_name: file_name.into(), file_size }
    }

    /// Build a key from a file on disk
    pub fn from_path(path: &Path) -> AnnotatorResult<Self> {
        let file_size = fs::metadata(path)?.len();
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "document".to_string());
        Ok(Self { file_name, file_size })
    }

    /// File-system safe storage key
    pub fn storage_key(&self) -> String {
        let name: String = self
            .file_name
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') { c } else { '_' })
            .collect();
        format!("{name}-{}", self.file_size)
    }
}

/// Writes snapshots as JSON files in a directory, one per document
#[derive(Debug, Clone)]
pub struct JsonSidecarSink {
    dir: PathBuf,
    key: DocumentKey,
}

impl JsonSidecarSink {
    pub fn new(dir: impl Into<PathBuf>, key: DocumentKey) -> Self {
        Self { dir: dir.into(), key }
    }

    pub fn path(&self) -> PathBuf {
        snapshot_path(&self.dir, &self.key)
    }

    /// Write a snapshot atomically using a temporary file
    pub fn save(&self, snapshot: &AnnotationSnapshot) -> AnnotatorResult<PathBuf> {
        fs::create_dir_all(&self.dir)?;
        let path = self.path();
        let temp_path = path.with_extension("tmp");
        fs::write(&temp_path, snapshot.to_json()?)?;
        fs::rename(&temp_path, &path)?;
        Ok(path)
    }
}

impl AnnotationSink for JsonSidecarSink {
    fn annotations_changed(&mut self, snapshot: &AnnotationSnapshot) {
        if let Err(e) = self.save(snapshot) {
            log::error!("failed to persist annotations for {}: {e}", self.key.storage_key());
        }
    }
}

/// Location of a document's snapshot inside `dir`
pub fn snapshot_path(dir: &Path, key: &DocumentKey) -> PathBuf {
    dir.join(format!("{}.annotations.json", key.storage_key()))
}

/// Load a previously saved snapshot, `None` if the document has none yet
pub fn load_snapshot(dir: &Path, key: &DocumentKey) -> AnnotatorResult<Option<AnnotationSnapshot>> {
    let path = snapshot_path(dir, key);
    if !path.exists() {
        return Ok(None);
    }
    let json = fs::read_to_string(&path)?;
    AnnotationSnapshot::from_json_lenient(&json).map(Some)
}

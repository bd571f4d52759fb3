//! Persisted conversion state
//!
//! Layout under `<root>/<conversion id>/`:
//!
//! - `fragments/fragment_<index>.json`: one [`FragmentRecord`] per translated fragment
//! - `descriptor.json`: latest descriptor version
//! - `merged.json`: final artifact
//!
//! Every write goes to a temporary file first and is renamed into place, so
//! a crash leaves either the previous record or the new one.

use crate::error::StoreError;
use crate::types::ConversionId;
use chrono::{DateTime, Utc};
use mig_artifact::{ContentHash, Fragment, FragmentResult, Issue, StructuralDescriptor};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

const FRAGMENTS_DIR: &str = "fragments";
const DESCRIPTOR_FILE: &str = "descriptor.json";
const MERGED_FILE: &str = "merged.json";

/// Result type for store operations
pub type Result<T> = std::result::Result<T, StoreError>;

/// A translated fragment as persisted
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FragmentRecord {
    pub index: usize,
    pub translated_text: String,
    pub source_fragment_text: String,
    /// Fingerprint of the source text; a changed fragment is not resumed
    pub source_hash: ContentHash,
    #[serde(default)]
    pub notes: String,
    #[serde(default)]
    pub issues: Vec<String>,
    #[serde(default)]
    pub uses_storage: bool,
    pub saved_at: DateTime<Utc>,
}

impl FragmentRecord {
    /// Record for `result`, produced from `fragment`
    #[must_use]
    pub fn new(fragment: &Fragment, result: &FragmentResult) -> Self {
        Self {
            index: fragment.index,
            translated_text: result.translated_text.clone(),
            source_fragment_text: fragment.text.clone(),
            source_hash: fragment.hash,
            notes: result.notes.clone(),
            issues: result.issues.clone(),
            uses_storage: result.uses_storage,
            saved_at: Utc::now(),
        }
    }

    /// Whether this record was produced from exactly `fragment`
    #[inline]
    #[must_use]
    pub fn matches(&self, fragment: &Fragment) -> bool {
        self.index == fragment.index && self.source_hash == fragment.hash
    }

    /// Back to a fragment result
    #[must_use]
    pub fn into_result(self) -> FragmentResult {
        FragmentResult {
            fragment_index: self.index,
            translated_text: self.translated_text,
            notes: self.notes,
            issues: self.issues,
            uses_storage: self.uses_storage,
            failed: false,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct DescriptorRecord {
    descriptor: StructuralDescriptor,
    saved_at: DateTime<Utc>,
}

/// Final artifact as persisted
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MergedRecord {
    pub text: String,
    pub issues: Vec<Issue>,
    #[serde(default)]
    pub notes: String,
    pub saved_at: DateTime<Utc>,
}

/// File-backed state of one conversion
#[derive(Debug, Clone)]
pub struct ConversionStore {
    dir: PathBuf,
}

impl ConversionStore {
    /// Open (creating if needed) the state directory of conversion `id`
    ///
    /// # Errors
    /// [`StoreError::Io`] when the directory cannot be created
    pub async fn open(root: impl AsRef<Path>, id: ConversionId) -> Result<Self> {
        let dir = root.as_ref().join(id.to_string());
        let fragments = dir.join(FRAGMENTS_DIR);
        tokio::fs::create_dir_all(&fragments)
            .await
            .map_err(|e| StoreError::io(&fragments, e))?;
        debug!("opened conversion store at {}", dir.display());
        Ok(Self { dir })
    }

    /// State directory
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Persist a translated fragment
    ///
    /// # Errors
    /// [`StoreError`] when the record cannot be written
    pub async fn save_fragment(&self, record: &FragmentRecord) -> Result<()> {
        let path = self.fragment_path(record.index);
        write_json(&path, record).await
    }

    /// Every readable fragment record, by index
    ///
    /// Unreadable records are skipped; their fragments get translated again.
    ///
    /// # Errors
    /// [`StoreError::Io`] when the fragment directory cannot be listed
    pub async fn load_fragments(&self) -> Result<BTreeMap<usize, FragmentRecord>> {
        let dir = self.dir.join(FRAGMENTS_DIR);
        let mut entries = tokio::fs::read_dir(&dir)
            .await
            .map_err(|e| StoreError::io(&dir, e))?;
        let mut records = BTreeMap::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| StoreError::io(&dir, e))?
        {
            let path = entry.path();
            let is_record = path
                .file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.starts_with("fragment_") && n.ends_with(".json"));
            if !is_record {
                continue;
            }
            match read_json::<FragmentRecord>(&path).await {
                Ok(Some(record)) => {
                    records.insert(record.index, record);
                }
                Ok(None) => {}
                Err(e) => warn!("skipping fragment record: {e}"),
            }
        }
        Ok(records)
    }

    /// Persist the current descriptor version
    ///
    /// # Errors
    /// [`StoreError`] when the record cannot be written
    pub async fn save_descriptor(&self, descriptor: &StructuralDescriptor) -> Result<()> {
        let record = DescriptorRecord {
            descriptor: descriptor.clone(),
            saved_at: Utc::now(),
        };
        write_json(&self.dir.join(DESCRIPTOR_FILE), &record).await
    }

    /// Latest persisted descriptor, if any
    ///
    /// # Errors
    /// [`StoreError`] when the record exists but cannot be read
    pub async fn load_descriptor(&self) -> Result<Option<StructuralDescriptor>> {
        Ok(read_json::<DescriptorRecord>(&self.dir.join(DESCRIPTOR_FILE))
            .await?
            .map(|r| r.descriptor))
    }

    /// Persist the final artifact
    ///
    /// # Errors
    /// [`StoreError`] when the record cannot be written
    pub async fn save_merged(&self, text: &str, issues: &[Issue], notes: &str) -> Result<()> {
        let record = MergedRecord {
            text: text.to_string(),
            issues: issues.to_vec(),
            notes: notes.to_string(),
            saved_at: Utc::now(),
        };
        write_json(&self.dir.join(MERGED_FILE), &record).await
    }

    /// Persisted final artifact, if the conversion finished
    ///
    /// # Errors
    /// [`StoreError`] when the record exists but cannot be read
    pub async fn load_merged(&self) -> Result<Option<MergedRecord>> {
        read_json(&self.dir.join(MERGED_FILE)).await
    }

    fn fragment_path(&self, index: usize) -> PathBuf {
        self.dir
            .join(FRAGMENTS_DIR)
            .join(format!("fragment_{index}.json"))
    }
}

async fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let bytes = serde_json::to_vec_pretty(value).map_err(|e| StoreError::serde(path, e))?;
    let tmp = path.with_extension("json.tmp");
    tokio::fs::write(&tmp, bytes)
        .await
        .map_err(|e| StoreError::io(&tmp, e))?;
    tokio::fs::rename(&tmp, path)
        .await
        .map_err(|e| StoreError::io(path, e))
}

async fn read_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>> {
    let bytes = match tokio::fs::read(path).await {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(StoreError::io(path, e)),
    };
    serde_json::from_slice(&bytes)
        .map(Some)
        .map_err(|e| StoreError::serde(path, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use mig_artifact::{BoundaryKind, IssueKind, SourceDocument, TypeDescriptor, TypeKind};
    use pretty_assertions::assert_eq;

    fn fragment(index: usize, text: &str) -> Fragment {
        let doc = SourceDocument::from_text(text);
        let mut fragment = Fragment::new(&doc, 0, 0..doc.line_count(), 0, BoundaryKind::EndOfDocument);
        fragment.index = index;
        fragment
    }

    #[tokio::test]
    async fn fragments_survive_reopen() {
        let root = tempfile::tempdir().unwrap();
        let id = ConversionId::new();
        let source = fragment(1, "       MOVE A TO B.");
        let result = FragmentResult::translated(1, "b = a;")
            .with_notes("simple move")
            .with_storage(true);

        let store = ConversionStore::open(root.path(), id).await.unwrap();
        store
            .save_fragment(&FragmentRecord::new(&source, &result))
            .await
            .unwrap();

        let reopened = ConversionStore::open(root.path(), id).await.unwrap();
        let records = reopened.load_fragments().await.unwrap();
        assert_eq!(records.len(), 1);
        let record = records[&1].clone();
        assert!(record.matches(&source));
        assert_eq!(record.source_fragment_text, "       MOVE A TO B.");
        assert_eq!(record.into_result(), result);
    }

    #[tokio::test]
    async fn changed_source_does_not_match() {
        let record = FragmentRecord::new(
            &fragment(0, "MOVE A TO B."),
            &FragmentResult::translated(0, "b = a;"),
        );
        assert!(!record.matches(&fragment(0, "MOVE B TO A.")));
    }

    #[tokio::test]
    async fn descriptor_and_merged_records() {
        let root = tempfile::tempdir().unwrap();
        let store = ConversionStore::open(root.path(), ConversionId::new())
            .await
            .unwrap();
        assert!(store.load_descriptor().await.unwrap().is_none());
        assert!(store.load_merged().await.unwrap().is_none());

        let descriptor = StructuralDescriptor::empty("Payroll")
            .with_type(TypeDescriptor::named("Employee", TypeKind::Class));
        store.save_descriptor(&descriptor).await.unwrap();
        assert_eq!(store.load_descriptor().await.unwrap(), Some(descriptor));

        let issues = vec![Issue::new(IssueKind::UnbalancedDelimiters, "appended 1")];
        store.save_merged("class A {}\n", &issues, "notes").await.unwrap();
        let merged = store.load_merged().await.unwrap().unwrap();
        assert_eq!(merged.text, "class A {}\n");
        assert_eq!(merged.issues, issues);
    }

    #[tokio::test]
    async fn corrupt_fragment_record_is_skipped() {
        let root = tempfile::tempdir().unwrap();
        let store = ConversionStore::open(root.path(), ConversionId::new())
            .await
            .unwrap();
        tokio::fs::write(store.fragment_path(0), b"{ not json")
            .await
            .unwrap();
        assert!(store.load_fragments().await.unwrap().is_empty());
    }
}

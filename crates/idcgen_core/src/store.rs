//! File-backed record store.
//!
//! Each record kind owns a namespace directory under the store root and each
//! record lives in `<namespace>/<slot>.json`.

use std::fs;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};

use tracing::debug;
use walkdir::WalkDir;

use crate::error::{CoreError, CoreResult};
use crate::records::{DocumentKind, Record, RecordKind};

/// How a read should treat a namespace that does not exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Absence {
    /// Yield no records.
    Empty,
    /// Fail with [`CoreError::NamespaceMissing`].
    Fatal,
}

/// Durable mapping from (kind, slot) to a serialized record.
#[derive(Debug, Clone)]
pub struct RecordStore {
    root: PathBuf,
}

impl RecordStore {
    /// Create a store rooted at the given directory.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn namespace_dir(&self, kind: RecordKind) -> PathBuf {
        self.root.join(kind.namespace())
    }

    pub fn document_dir(&self, kind: DocumentKind) -> PathBuf {
        self.root.join(kind.namespace())
    }

    /// Persist a record, replacing any previous record in the same slot.
    pub fn put<R: Record>(&self, record: &R) -> CoreResult<PathBuf> {
        let dir = self.namespace_dir(R::KIND);
        fs::create_dir_all(&dir)?;

        let path = dir.join(format!("{}.json", record.slot()));
        let mut json = serde_json::to_string_pretty(record)?;
        json.push('\n');
        fs::write(&path, json)?;

        debug!("Stored {} record {:?}", R::KIND, path);
        Ok(path)
    }

    /// Load a single record by slot.
    pub fn get<R: Record>(&self, slot: &str) -> CoreResult<Option<R>> {
        let path = self
            .namespace_dir(R::KIND)
            .join(format!("{}.json", slot));
        if !path.exists() {
            return Ok(None);
        }
        read_record(&path).map(Some)
    }

    /// Lazily iterate all records of a kind in case-insensitive slot order.
    pub fn list_all<R: Record>(&self, absence: Absence) -> CoreResult<RecordIter<R>> {
        let dir = self.namespace_dir(R::KIND);
        let paths = if dir.is_dir() {
            sorted_json_files(&dir)
        } else if absence == Absence::Empty {
            Vec::new()
        } else {
            return Err(CoreError::NamespaceMissing {
                namespace: R::KIND.namespace().to_string(),
                path: dir,
            });
        };

        Ok(RecordIter {
            paths: paths.into_iter(),
            _record: PhantomData,
        })
    }

    /// Collect all records of a kind, failing on the first malformed one.
    pub fn load_all<R: Record>(&self, absence: Absence) -> CoreResult<Vec<R>> {
        self.list_all(absence)?.collect()
    }

    /// Persist a raw JSON document (policy body) under a document namespace.
    pub fn put_document(
        &self,
        kind: DocumentKind,
        slot: &str,
        document: &serde_json::Value,
    ) -> CoreResult<PathBuf> {
        let dir = self.document_dir(kind);
        fs::create_dir_all(&dir)?;

        let path = dir.join(format!("{}.json", slot));
        let mut json = serde_json::to_string_pretty(document)?;
        json.push('\n');
        fs::write(&path, json)?;

        debug!("Stored document {:?}", path);
        Ok(path)
    }

    /// Document files of a namespace, sorted like records.
    pub fn list_documents(&self, kind: DocumentKind) -> Vec<PathBuf> {
        let dir = self.document_dir(kind);
        if dir.is_dir() {
            sorted_json_files(&dir)
        } else {
            Vec::new()
        }
    }

    /// Remove every record of a kind.
    pub fn clear(&self, kind: RecordKind) -> CoreResult<()> {
        let dir = self.namespace_dir(kind);
        if dir.exists() {
            fs::remove_dir_all(&dir)?;
            debug!("Cleared namespace {:?}", dir);
        }
        Ok(())
    }

    /// Remove everything in the store.
    pub fn clear_all(&self) -> CoreResult<()> {
        self.clear_all_except(&[])
    }

    /// Remove everything in the store except the namespaces of the given
    /// kinds (and the documents nested inside them).
    pub fn clear_all_except(&self, retained: &[RecordKind]) -> CoreResult<()> {
        if !self.root.exists() {
            return Ok(());
        }

        let keep: Vec<&str> = retained
            .iter()
            .filter_map(|kind| kind.namespace().split('/').next())
            .collect();

        for entry in fs::read_dir(&self.root)? {
            let entry = entry?;
            let name = entry.file_name();
            if keep.iter().any(|k| name.to_string_lossy() == *k) {
                debug!("Retaining namespace {:?}", entry.path());
                continue;
            }

            let path = entry.path();
            if path.is_dir() {
                fs::remove_dir_all(&path)?;
            } else {
                fs::remove_file(&path)?;
            }
        }

        Ok(())
    }
}

/// Lazy sequence of records read from a namespace.
pub struct RecordIter<R> {
    paths: std::vec::IntoIter<PathBuf>,
    _record: PhantomData<R>,
}

impl<R: Record> Iterator for RecordIter<R> {
    type Item = CoreResult<R>;

    fn next(&mut self) -> Option<Self::Item> {
        self.paths.next().map(|path| read_record(&path))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.paths.size_hint()
    }
}

fn read_record<R: Record>(path: &Path) -> CoreResult<R> {
    let content = fs::read_to_string(path)?;
    serde_json::from_str(&content).map_err(|e| CoreError::MalformedRecord {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}

fn sorted_json_files(dir: &Path) -> Vec<PathBuf> {
    let mut files: Vec<(String, PathBuf)> = WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .filter(|e| e.path().extension().is_some_and(|ext| ext == "json"))
        .map(|e| {
            let stem = e
                .path()
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_default();
            (stem, e.into_path())
        })
        .collect();

    files.sort_by(|(a, _), (b, _)| a.to_lowercase().cmp(&b.to_lowercase()).then(a.cmp(b)));
    files.into_iter().map(|(_, path)| path).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::{AccountRecord, ManagedPolicyRecord};
    use tempfile::tempdir;

    fn account(name: &str) -> AccountRecord {
        AccountRecord {
            id: format!("id-{}", name),
            email: None,
            status: "ACTIVE".to_string(),
            resource_name: name.to_string(),
            original_name: name.to_string(),
        }
    }

    #[test]
    fn test_put_overwrites_slot() {
        let temp = tempdir().unwrap();
        let store = RecordStore::new(temp.path());

        store.put(&account("prod")).unwrap();
        let mut updated = account("prod");
        updated.status = "SUSPENDED".to_string();
        store.put(&updated).unwrap();

        let all: Vec<AccountRecord> = store.load_all(Absence::Fatal).unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].status, "SUSPENDED");
    }

    #[test]
    fn test_list_all_is_case_insensitive_ordered() {
        let temp = tempdir().unwrap();
        let store = RecordStore::new(temp.path());
        for name in ["beta", "Alpha", "gamma", "Delta"] {
            store.put(&account(name)).unwrap();
        }

        let names: Vec<String> = store
            .list_all::<AccountRecord>(Absence::Fatal)
            .unwrap()
            .map(|r| r.unwrap().resource_name)
            .collect();
        assert_eq!(names, vec!["Alpha", "beta", "Delta", "gamma"]);
    }

    #[test]
    fn test_missing_namespace_absence_policy() {
        let temp = tempdir().unwrap();
        let store = RecordStore::new(temp.path());

        let empty: Vec<AccountRecord> = store.load_all(Absence::Empty).unwrap();
        assert!(empty.is_empty());

        let err = store.load_all::<AccountRecord>(Absence::Fatal).unwrap_err();
        assert!(err.is_source_unavailable());
        assert!(err.to_string().contains("accounts"));
    }

    #[test]
    fn test_malformed_record_is_reported() {
        let temp = tempdir().unwrap();
        let store = RecordStore::new(temp.path());
        let dir = store.namespace_dir(RecordKind::Account);
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("broken.json"), r#"{"Id":"1","ResourceName":"broken"}"#).unwrap();

        let err = store.load_all::<AccountRecord>(Absence::Fatal).unwrap_err();
        let message = err.to_string();
        assert!(message.contains("broken.json"));
        assert!(message.contains("Status"));
    }

    #[test]
    fn test_clear_all_except_keeps_managed_policies() {
        let temp = tempdir().unwrap();
        let store = RecordStore::new(temp.path());
        store.put(&account("prod")).unwrap();
        store
            .put(&ManagedPolicyRecord {
                policy_name: "ReadOnlyAccess".to_string(),
                arn: "arn:aws:iam::aws:policy/ReadOnlyAccess".to_string(),
                policy_id: None,
                default_version_id: None,
                path: None,
                resource_name: "ReadOnlyAccess".to_string(),
            })
            .unwrap();
        store
            .put_document(
                DocumentKind::ManagedPolicyDocument,
                "ReadOnlyAccess",
                &serde_json::json!({"Version": "2012-10-17"}),
            )
            .unwrap();

        store.clear_all_except(&[RecordKind::ManagedPolicy]).unwrap();

        assert!(!store.namespace_dir(RecordKind::Account).exists());
        assert!(store.namespace_dir(RecordKind::ManagedPolicy).exists());
        assert_eq!(store.list_documents(DocumentKind::ManagedPolicyDocument).len(), 1);

        store.clear_all().unwrap();
        assert!(!store.namespace_dir(RecordKind::ManagedPolicy).exists());
    }

    #[test]
    fn test_get_by_slot() {
        let temp = tempdir().unwrap();
        let store = RecordStore::new(temp.path());
        store.put(&account("prod")).unwrap();

        let found: Option<AccountRecord> = store.get("prod").unwrap();
        assert_eq!(found.unwrap().id, "id-prod");
        assert!(store.get::<AccountRecord>("missing").unwrap().is_none());
    }
}

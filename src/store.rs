use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("listing '{prefix}' failed: {reason}")]
    List { prefix: String, reason: String },
    #[error("object '{0}' not found")]
    Missing(String),
    #[error("reading '{key}' failed: {source}")]
    Io { key: String, source: std::io::Error },
    #[error("writing '{key}' failed: {source}")]
    Write { key: String, source: std::io::Error },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectMeta {
    pub key: String,
    pub last_modified: DateTime<Utc>,
}

/// Key/value blob storage holding the dataset files and published dashboards.
pub trait BlobStore {
    fn list(&self, prefix: &str) -> Result<Vec<ObjectMeta>, StoreError>;
    fn get(&self, key: &str) -> Result<Vec<u8>, StoreError>;
    /// Create or replace the object at `key`.
    fn put(&mut self, key: &str, body: &[u8]) -> Result<(), StoreError>;
}

/// In-process store, keyed by `/`-separated paths.
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    objects: BTreeMap<String, (DateTime<Utc>, Vec<u8>)>,
}

impl MemoryStore {
    pub fn new() -> Self { Self::default() }

    pub fn insert(&mut self, key: impl Into<String>, last_modified: DateTime<Utc>, body: impl Into<Vec<u8>>) {
        self.objects.insert(key.into(), (last_modified, body.into()));
    }
}

impl BlobStore for MemoryStore {
    fn list(&self, prefix: &str) -> Result<Vec<ObjectMeta>, StoreError> {
        Ok(self
            .objects
            .range(prefix.to_string()..)
            .take_while(|(k, _)| k.starts_with(prefix))
            .map(|(k, (t, _))| ObjectMeta { key: k.clone(), last_modified: *t })
            .collect())
    }

    fn get(&self, key: &str) -> Result<Vec<u8>, StoreError> {
        self.objects
            .get(key)
            .map(|(_, body)| body.clone())
            .ok_or_else(|| StoreError::Missing(key.to_string()))
    }

    fn put(&mut self, key: &str, body: &[u8]) -> Result<(), StoreError> {
        self.insert(key, Utc::now(), body);
        Ok(())
    }
}

/// Directory-backed store. Keys are paths relative to `root` using `/`.
#[derive(Debug, Clone)]
pub struct FsStore {
    root: PathBuf,
}

impl FsStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path { &self.root }

    fn walk(&self, dir: &Path, out: &mut Vec<ObjectMeta>) -> std::io::Result<()> {
        for entry in std::fs::read_dir(dir)? {
            let entry = entry?;
            let path = entry.path();
            let meta = entry.metadata()?;
            if meta.is_dir() {
                self.walk(&path, out)?;
            } else if meta.is_file() {
                let rel = path.strip_prefix(&self.root).unwrap_or(&path);
                let key = rel
                    .components()
                    .map(|c| c.as_os_str().to_string_lossy())
                    .collect::<Vec<_>>()
                    .join("/");
                let last_modified = meta.modified().map(DateTime::<Utc>::from).unwrap_or_default();
                out.push(ObjectMeta { key, last_modified });
            }
        }
        Ok(())
    }
}

impl BlobStore for FsStore {
    fn list(&self, prefix: &str) -> Result<Vec<ObjectMeta>, StoreError> {
        // Walk from the deepest directory named by the prefix, then filter by the full prefix.
        let dir_part = match prefix.rfind('/') {
            Some(i) => &prefix[..i],
            None => "",
        };
        let start = self.root.join(dir_part);
        if !start.is_dir() {
            return Ok(Vec::new());
        }
        let mut out = Vec::new();
        self.walk(&start, &mut out).map_err(|e| StoreError::List {
            prefix: prefix.to_string(),
            reason: e.to_string(),
        })?;
        out.retain(|m| m.key.starts_with(prefix));
        out.sort_by(|a, b| a.key.cmp(&b.key));
        Ok(out)
    }

    fn get(&self, key: &str) -> Result<Vec<u8>, StoreError> {
        let path = self.root.join(key);
        std::fs::read(&path).map_err(|source| match source.kind() {
            std::io::ErrorKind::NotFound => StoreError::Missing(key.to_string()),
            _ => StoreError::Io { key: key.to_string(), source },
        })
    }

    fn put(&mut self, key: &str, body: &[u8]) -> Result<(), StoreError> {
        let path = self.root.join(key);
        let write = || -> std::io::Result<()> {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(&path, body)
        };
        write().map_err(|source| StoreError::Write { key: key.to_string(), source })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn memory_store_lists_by_prefix_only() {
        let t = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let mut s = MemoryStore::new();
        s.insert("alerts/a.csv", t, "x");
        s.insert("alerts/b.csv", t, "y");
        s.insert("alerts_old/c.csv", t, "z");
        s.insert("tickets/d.csv", t, "w");
        let keys: Vec<String> = s.list("alerts/").unwrap().into_iter().map(|m| m.key).collect();
        assert_eq!(keys, vec!["alerts/a.csv", "alerts/b.csv"]);
        assert_eq!(s.get("alerts/b.csv").unwrap(), b"y".to_vec());
        assert!(matches!(s.get("nope"), Err(StoreError::Missing(_))));

        s.put("alerts/b.csv", b"z").unwrap();
        assert_eq!(s.get("alerts/b.csv").unwrap(), b"z".to_vec());
    }

    #[test]
    fn fs_store_walks_nested_directories() {
        let root = std::env::temp_dir().join(format!("chartscope-store-{}", std::process::id()));
        let _ = std::fs::remove_dir_all(&root);
        std::fs::create_dir_all(root.join("alerts/2024")).unwrap();
        std::fs::write(root.join("alerts/2024/a_2024-01-01.csv"), "h\n1\n").unwrap();
        std::fs::write(root.join("alerts/b.csv"), "h\n2\n").unwrap();

        let s = FsStore::new(&root);
        let keys: Vec<String> = s.list("alerts/").unwrap().into_iter().map(|m| m.key).collect();
        assert_eq!(keys, vec!["alerts/2024/a_2024-01-01.csv", "alerts/b.csv"]);
        assert_eq!(s.get("alerts/b.csv").unwrap(), b"h\n2\n".to_vec());
        assert!(s.list("missing/").unwrap().is_empty());
        assert!(matches!(s.get("alerts/none.csv"), Err(StoreError::Missing(_))));

        let mut s = s;
        s.put("dashboards/2024/d.html", b"<html>").unwrap();
        assert_eq!(std::fs::read(root.join("dashboards/2024/d.html")).unwrap(), b"<html>".to_vec());
        assert_eq!(s.list("dashboards/").unwrap().len(), 1);

        let _ = std::fs::remove_dir_all(&root);
    }
}

//! Durable collection store backed by one JSON snapshot per collection.
//!
//! Layout: `<root>/collections/<name>.json`. Every mutation rewrites the
//! affected snapshot through a temp file in the same directory followed by an
//! atomic rename, so a crash leaves either the old or the new snapshot.

use async_trait::async_trait;
use dimensia_core::{
    CollectionStats, CollectionStore, Document, DocumentId, PendingDocument, SearchQuery,
    SearchResult, StoreError,
};
use std::fs;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use tokio::sync::{Mutex, OnceCell};
use tracing::{debug, info, warn};

use crate::collection::CollectionData;
use crate::memory::MemoryStore;

const COLLECTIONS_DIR: &str = "collections";
const SNAPSHOT_EXT: &str = "json";

/// Collection store that persists to JSON files.
///
/// Reads are served from memory. Snapshots are loaded on the first call to
/// [`CollectionStore::init`] or on first use.
pub struct JsonStore {
    root: PathBuf,
    inner: MemoryStore,
    /// Serializes mutations so the snapshot on disk matches memory
    write_lock: Mutex<()>,
    loaded: OnceCell<()>,
}

impl JsonStore {
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            inner: MemoryStore::new(),
            write_lock: Mutex::new(()),
            loaded: OnceCell::new(),
        }
    }

    fn collections_dir(&self) -> PathBuf {
        self.root.join(COLLECTIONS_DIR)
    }

    fn snapshot_path(&self, name: &str) -> PathBuf {
        self.collections_dir().join(format!("{name}.{SNAPSHOT_EXT}"))
    }

    async fn ensure_loaded(&self) -> Result<(), StoreError> {
        self.loaded
            .get_or_try_init(|| async {
                let dir = self.collections_dir();
                let collections = tokio::task::spawn_blocking(move || load_all_collections(&dir))
                    .await
                    .map_err(|e| StoreError::Init(format!("load task failed: {e}")))??;
                info!(
                    "Loaded {} collections from {:?}",
                    collections.len(),
                    self.root
                );
                self.inner.load(collections).await;
                Ok::<(), StoreError>(())
            })
            .await
            .map(|_| ())
    }

    async fn persist(&self, data: CollectionData) -> Result<CollectionData, StoreError> {
        let dir = self.collections_dir();
        tokio::task::spawn_blocking(move || save_collection(&data, &dir).map(|()| data))
            .await
            .map_err(|e| StoreError::Persist(format!("save task failed: {e}")))?
    }
}

#[async_trait]
impl CollectionStore for JsonStore {
    async fn init(&self) -> Result<(), StoreError> {
        let dir = self.collections_dir();
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|e| StoreError::Init(format!("cannot create {}: {e}", dir.display())))?;
        self.ensure_loaded().await
    }

    async fn list_collections(&self) -> Result<Vec<String>, StoreError> {
        self.ensure_loaded().await?;
        self.inner.list_collections().await
    }

    async fn create_collection(
        &self,
        name: &str,
        vector_size: Option<usize>,
    ) -> Result<(), StoreError> {
        self.ensure_loaded().await?;
        let _guard = self.write_lock.lock().await;

        let data = CollectionData::new(name, vector_size)?;
        if self.inner.contains(name).await {
            return Err(StoreError::CollectionExists(name.to_string()));
        }
        // A snapshot that failed to load still owns its name
        let path = self.snapshot_path(name);
        if tokio::fs::try_exists(&path).await.unwrap_or(true) {
            warn!("Refusing to replace unloaded snapshot {:?}", path);
            return Err(StoreError::CollectionExists(name.to_string()));
        }

        let data = self.persist(data).await?;
        self.inner.put(data).await;
        debug!("Created persistent collection {}", name);
        Ok(())
    }

    async fn insert_documents(
        &self,
        collection: &str,
        documents: Vec<PendingDocument>,
    ) -> Result<Vec<DocumentId>, StoreError> {
        self.ensure_loaded().await?;
        let _guard = self.write_lock.lock().await;

        let mut data = self.inner.snapshot(collection).await?;
        let ids = data.insert(documents)?;
        if ids.is_empty() {
            return Ok(ids);
        }

        let data = self.persist(data).await?;
        self.inner.put(data).await;
        Ok(ids)
    }

    async fn search(
        &self,
        collection: &str,
        query: SearchQuery,
    ) -> Result<Vec<SearchResult>, StoreError> {
        self.ensure_loaded().await?;
        self.inner.search(collection, query).await
    }

    async fn get_document(
        &self,
        collection: &str,
        id: DocumentId,
    ) -> Result<Option<Document>, StoreError> {
        self.ensure_loaded().await?;
        self.inner.get_document(collection, id).await
    }

    async fn get_all_documents(&self, collection: &str) -> Result<Vec<Document>, StoreError> {
        self.ensure_loaded().await?;
        self.inner.get_all_documents(collection).await
    }

    async fn stats(&self, collection: &str) -> Result<CollectionStats, StoreError> {
        self.ensure_loaded().await?;
        self.inner.stats(collection).await
    }
}

/// Write one collection snapshot with an atomic rename.
fn save_collection(data: &CollectionData, dir: &Path) -> Result<(), StoreError> {
    let persist_err = |e: std::io::Error| StoreError::Persist(format!("{}: {e}", data.name));

    fs::create_dir_all(dir).map_err(persist_err)?;
    let path = dir.join(format!("{}.{SNAPSHOT_EXT}", data.name));

    let tmp = tempfile::NamedTempFile::new_in(dir).map_err(persist_err)?;
    {
        let mut writer = BufWriter::new(tmp.as_file());
        serde_json::to_writer_pretty(&mut writer, data)
            .map_err(|e| StoreError::Persist(format!("{}: {e}", data.name)))?;
        writer.flush().map_err(persist_err)?;
    }
    tmp.as_file().sync_all().map_err(persist_err)?;
    tmp.persist(&path)
        .map_err(|e| StoreError::Persist(format!("{}: {}", data.name, e.error)))?;

    debug!(
        "Saved collection '{}' ({} documents) to {:?}",
        data.name,
        data.len(),
        path
    );
    Ok(())
}

fn load_collection(path: &Path) -> Result<CollectionData, StoreError> {
    let file = fs::File::open(path)
        .map_err(|e| StoreError::Init(format!("cannot open {}: {e}", path.display())))?;
    let data: CollectionData = serde_json::from_reader(BufReader::new(file))
        .map_err(|e| StoreError::Init(format!("cannot parse {}: {e}", path.display())))?;
    data.validate()?;

    let stem = path.file_stem().and_then(|s| s.to_str());
    if stem != Some(data.name.as_str()) {
        return Err(StoreError::Init(format!(
            "snapshot {} holds collection {:?}",
            path.display(),
            data.name
        )));
    }

    Ok(data)
}

/// Load every snapshot in `dir`, skipping files that fail to load.
fn load_all_collections(dir: &Path) -> Result<Vec<CollectionData>, StoreError> {
    if !dir.exists() {
        return Ok(Vec::new());
    }

    let entries = fs::read_dir(dir)
        .map_err(|e| StoreError::Init(format!("cannot read {}: {e}", dir.display())))?;

    let mut collections = Vec::new();
    for entry in entries {
        let path = match entry {
            Ok(entry) => entry.path(),
            Err(e) => {
                warn!("Skipping unreadable entry in {:?}: {}", dir, e);
                continue;
            }
        };
        if path.extension().and_then(|s| s.to_str()) != Some(SNAPSHOT_EXT) {
            continue;
        }
        match load_collection(&path) {
            Ok(data) => {
                debug!("Loaded collection '{}' ({} documents)", data.name, data.len());
                collections.push(data);
            }
            Err(e) => warn!("Failed to load {:?}: {}", path, e),
        }
    }

    Ok(collections)
}

#[cfg(test)]
mod tests {
    use super::*;
    use dimensia_core::{DistanceMetric, Metadata};
    use serde_json::json;
    use tempfile::tempdir;

    fn create_test_document(content: &str, embedding: Vec<f32>) -> PendingDocument {
        let mut metadata = Metadata::new();
        metadata.insert("source".to_string(), json!("test"));
        PendingDocument {
            content: content.to_string(),
            metadata,
            embedding,
            embedding_model: Some("test".to_string()),
        }
    }

    #[tokio::test]
    async fn test_init_creates_layout() {
        let dir = tempdir().unwrap();
        let store = JsonStore::new(dir.path());
        store.init().await.unwrap();

        assert!(dir.path().join("collections").is_dir());
        assert!(store.list_collections().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_create_writes_snapshot() {
        let dir = tempdir().unwrap();
        let store = JsonStore::new(dir.path());
        store.init().await.unwrap();
        store.create_collection("notes", Some(2)).await.unwrap();

        assert!(dir.path().join("collections/notes.json").is_file());
    }

    #[tokio::test]
    async fn test_reopen_restores_documents_and_ids() {
        let dir = tempdir().unwrap();
        {
            let store = JsonStore::new(dir.path());
            store.init().await.unwrap();
            store.create_collection("notes", None).await.unwrap();
            store
                .insert_documents(
                    "notes",
                    vec![
                        create_test_document("one", vec![1.0, 0.0]),
                        create_test_document("two", vec![0.0, 1.0]),
                    ],
                )
                .await
                .unwrap();
        }

        let store = JsonStore::new(dir.path());
        store.init().await.unwrap();

        assert_eq!(store.list_collections().await.unwrap(), vec!["notes"]);
        let doc = store.get_document("notes", 2).await.unwrap().unwrap();
        assert_eq!(doc.content, "two");
        assert_eq!(doc.metadata.get("source"), Some(&json!("test")));

        let stats = store.stats("notes").await.unwrap();
        assert_eq!(stats.vector_size, Some(2));
        assert_eq!(stats.embedding_model.as_deref(), Some("test"));

        let ids = store
            .insert_documents("notes", vec![create_test_document("three", vec![1.0, 1.0])])
            .await
            .unwrap();
        assert_eq!(ids, vec![3]);

        let results = store
            .search(
                "notes",
                SearchQuery {
                    embedding: vec![1.0, 0.0],
                    top_k: 1,
                    metric: DistanceMetric::Cosine,
                },
            )
            .await
            .unwrap();
        assert_eq!(results[0].document.content, "one");
    }

    #[tokio::test]
    async fn test_lazy_load_without_init() {
        let dir = tempdir().unwrap();
        {
            let store = JsonStore::new(dir.path());
            store.init().await.unwrap();
            store.create_collection("lazy", None).await.unwrap();
        }

        let store = JsonStore::new(dir.path());
        assert_eq!(store.list_collections().await.unwrap(), vec!["lazy"]);
    }

    #[tokio::test]
    async fn test_duplicate_create_keeps_existing_snapshot() {
        let dir = tempdir().unwrap();
        let store = JsonStore::new(dir.path());
        store.init().await.unwrap();
        store.create_collection("notes", None).await.unwrap();
        store
            .insert_documents("notes", vec![create_test_document("kept", vec![1.0])])
            .await
            .unwrap();

        let err = store.create_collection("notes", None).await.unwrap_err();
        assert!(matches!(err, StoreError::CollectionExists(_)));

        let reopened = JsonStore::new(dir.path());
        assert_eq!(reopened.stats("notes").await.unwrap().document_count, 1);
    }

    #[tokio::test]
    async fn test_failed_insert_leaves_state_unchanged() {
        let dir = tempdir().unwrap();
        let store = JsonStore::new(dir.path());
        store.init().await.unwrap();
        store.create_collection("notes", Some(2)).await.unwrap();

        let err = store
            .insert_documents("notes", vec![create_test_document("bad", vec![1.0])])
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::DimensionMismatch { .. }));
        assert_eq!(store.stats("notes").await.unwrap().document_count, 0);

        let reopened = JsonStore::new(dir.path());
        assert_eq!(reopened.stats("notes").await.unwrap().document_count, 0);
    }

    #[tokio::test]
    async fn test_corrupt_snapshot_skipped() {
        let dir = tempdir().unwrap();
        let collections = dir.path().join("collections");
        fs::create_dir_all(&collections).unwrap();
        fs::write(collections.join("broken.json"), "{ not json").unwrap();
        fs::write(collections.join("README.txt"), "ignored").unwrap();

        let store = JsonStore::new(dir.path());
        store.init().await.unwrap();
        store.create_collection("fine", None).await.unwrap();

        assert_eq!(store.list_collections().await.unwrap(), vec!["fine"]);
    }

    #[tokio::test]
    async fn test_create_does_not_replace_unloadable_snapshot() {
        let dir = tempdir().unwrap();
        {
            let store = JsonStore::new(dir.path());
            store.init().await.unwrap();
            store.create_collection("notes", None).await.unwrap();
            store
                .insert_documents("notes", vec![create_test_document("precious", vec![1.0])])
                .await
                .unwrap();
        }

        // next_id behind the stored ids fails validation on load
        let path = dir.path().join("collections/notes.json");
        let mut snapshot: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        snapshot["next_id"] = json!(1);
        let broken = serde_json::to_string_pretty(&snapshot).unwrap();
        fs::write(&path, &broken).unwrap();

        let store = JsonStore::new(dir.path());
        store.init().await.unwrap();
        assert!(store.list_collections().await.unwrap().is_empty());

        let err = store.create_collection("notes", None).await.unwrap_err();
        assert!(matches!(err, StoreError::CollectionExists(ref n) if n == "notes"));
        assert_eq!(fs::read_to_string(&path).unwrap(), broken);
        assert!(broken.contains("precious"));
    }

    #[tokio::test]
    async fn test_renamed_snapshot_skipped() {
        let dir = tempdir().unwrap();
        {
            let store = JsonStore::new(dir.path());
            store.init().await.unwrap();
            store.create_collection("original", None).await.unwrap();
        }
        let collections = dir.path().join("collections");
        fs::rename(collections.join("original.json"), collections.join("copy.json")).unwrap();

        let store = JsonStore::new(dir.path());
        store.init().await.unwrap();
        assert!(store.list_collections().await.unwrap().is_empty());
    }
}

//! Process-local document backend.
//!
//! Mirrors the replace/merge semantics of a real document store so that the
//! sync path can be exercised without a network. Failures can be switched on
//! to observe remote-soft error handling.

use super::{
    Document, DocumentBackend, RemoteConnector, RemoteError, RemoteResult, WriteMode,
};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

type Collection = BTreeMap<String, Document>;

/// In-memory collections keyed by owner, then document id.
#[derive(Default)]
pub struct InMemoryBackend {
    owners: Mutex<BTreeMap<String, Collection>>,
    fail_requests: AtomicBool,
    completed_ops: AtomicUsize,
    closed: AtomicBool,
}

impl InMemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every subsequent request fail with `RemoteError::Backend`.
    pub fn set_failing(&self, failing: bool) {
        self.fail_requests.store(failing, Ordering::SeqCst);
    }

    /// Number of requests that reached the backend, failed or not.
    pub fn completed_ops(&self) -> usize {
        self.completed_ops.load(Ordering::SeqCst)
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    pub fn document(&self, owner_id: &str, doc_id: &str) -> Option<Document> {
        self.lock()
            .get(owner_id)
            .and_then(|collection| collection.get(doc_id))
            .cloned()
    }

    pub fn document_ids(&self, owner_id: &str) -> Vec<String> {
        self.lock()
            .get(owner_id)
            .map(|collection| collection.keys().cloned().collect())
            .unwrap_or_default()
    }

    /// Seeds a document directly, bypassing the request counters.
    pub fn insert_document(&self, owner_id: &str, doc_id: &str, document: Document) {
        self.lock()
            .entry(owner_id.to_string())
            .or_default()
            .insert(doc_id.to_string(), document);
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, BTreeMap<String, Collection>> {
        self.owners.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn begin(&self, operation: &str) -> RemoteResult<()> {
        if self.fail_requests.load(Ordering::SeqCst) {
            self.completed_ops.fetch_add(1, Ordering::SeqCst);
            return Err(RemoteError::Backend(format!("{operation} rejected")));
        }
        Ok(())
    }

    fn finish(&self) {
        self.completed_ops.fetch_add(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl DocumentBackend for InMemoryBackend {
    fn backend_id(&self) -> &str {
        "memory"
    }

    async fn put_document(
        &self,
        owner_id: &str,
        doc_id: &str,
        document: Document,
        mode: WriteMode,
    ) -> RemoteResult<()> {
        self.begin("put")?;
        {
            let mut owners = self.lock();
            let collection = owners.entry(owner_id.to_string()).or_default();
            match collection.get_mut(doc_id) {
                Some(existing) if mode == WriteMode::Merge => existing.extend(document),
                _ => {
                    collection.insert(doc_id.to_string(), document);
                }
            }
        }
        self.finish();
        Ok(())
    }

    async fn delete_document(&self, owner_id: &str, doc_id: &str) -> RemoteResult<()> {
        self.begin("delete")?;
        if let Some(collection) = self.lock().get_mut(owner_id) {
            collection.remove(doc_id);
        }
        self.finish();
        Ok(())
    }

    async fn list_documents(&self, owner_id: &str) -> RemoteResult<Vec<Document>> {
        self.begin("list")?;
        let documents = self
            .lock()
            .get(owner_id)
            .map(|collection| collection.values().cloned().collect())
            .unwrap_or_default();
        self.finish();
        Ok(documents)
    }

    fn close(&self) -> RemoteResult<()> {
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}

/// Connector handing out one shared `InMemoryBackend` for any locator.
pub struct InMemoryConnector {
    backend: Arc<InMemoryBackend>,
}

impl InMemoryConnector {
    pub fn new(backend: Arc<InMemoryBackend>) -> Self {
        Self { backend }
    }
}

impl RemoteConnector for InMemoryConnector {
    fn connect(&self, _credentials: &str) -> RemoteResult<Arc<dyn DocumentBackend>> {
        Ok(self.backend.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::InMemoryBackend;
    use crate::remote::{DocumentBackend, WriteMode};
    use serde_json::json;

    fn doc(value: serde_json::Value) -> crate::remote::Document {
        value.as_object().cloned().unwrap()
    }

    #[tokio::test]
    async fn merge_keeps_unlisted_fields_and_replace_drops_them() {
        let backend = InMemoryBackend::new();
        backend
            .put_document("u", "1", doc(json!({"title": "a", "extra": 1})), WriteMode::Replace)
            .await
            .unwrap();

        backend
            .put_document("u", "1", doc(json!({"title": "b"})), WriteMode::Merge)
            .await
            .unwrap();
        let merged = backend.document("u", "1").unwrap();
        assert_eq!(merged["title"], "b");
        assert_eq!(merged["extra"], 1);

        backend
            .put_document("u", "1", doc(json!({"title": "c"})), WriteMode::Replace)
            .await
            .unwrap();
        let replaced = backend.document("u", "1").unwrap();
        assert_eq!(replaced["title"], "c");
        assert!(!replaced.contains_key("extra"));
    }

    #[tokio::test]
    async fn failing_backend_counts_rejected_requests() {
        let backend = InMemoryBackend::new();
        backend.set_failing(true);

        assert!(backend.delete_document("u", "1").await.is_err());
        assert_eq!(backend.completed_ops(), 1);
    }
}

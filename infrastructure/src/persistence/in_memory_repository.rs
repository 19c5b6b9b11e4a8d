use application::{ApplicationError, DocumentRepository};
use async_trait::async_trait;
use domain::{Document, DocumentId, SearchRequest};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, instrument, trace};

/// In-memory document store keyed by identifier.
///
/// One readers-writer lock guards the whole map: `save` is the only writer,
/// and a search filters under a single read guard so it never observes a
/// half-applied save. Clones share the same underlying map.
#[derive(Debug, Clone, Default)]
pub struct InMemoryDocumentRepository {
    // Document ID -> Document
    documents: Arc<RwLock<HashMap<DocumentId, Arc<Document>>>>,
}

impl InMemoryDocumentRepository {
    pub fn new() -> Self {
        Self {
            documents: Arc::new(RwLock::new(HashMap::new())),
        }
    }
}

#[async_trait]
impl DocumentRepository for InMemoryDocumentRepository {
    #[instrument(skip(self, document))]
    async fn save(&self, id: &DocumentId, document: &Document) -> Result<(), ApplicationError> {
        debug!(doc_id = %id, "Saving document to in-memory store");
        let replaced = self
            .documents
            .write()
            .await
            .insert(id.clone(), Arc::new(document.clone()))
            .is_some();
        trace!(doc_id = %id, replaced, "Document stored");
        Ok(())
    }

    #[instrument(skip(self))]
    async fn get(&self, id: &DocumentId) -> Result<Option<Document>, ApplicationError> {
        debug!(doc_id = %id, "Getting document from in-memory store");
        let documents = self.documents.read().await;
        Ok(documents.get(id).map(|doc| (**doc).clone()))
    }

    #[instrument(skip(self, request))]
    async fn search(&self, request: &SearchRequest) -> Result<Vec<Document>, ApplicationError> {
        let documents = self.documents.read().await;
        let hits: Vec<Document> = documents
            .values()
            .filter(|doc| request.matches(doc))
            .map(|doc| (**doc).clone())
            .collect();
        debug!(
            scanned = documents.len(),
            total_hits = hits.len(),
            "In-memory search finished"
        );
        Ok(hits)
    }

    async fn count(&self) -> Result<usize, ApplicationError> {
        Ok(self.documents.read().await.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use domain::Author;

    fn document(id: &str, title: &str) -> Document {
        Document::new(
            title,
            "body",
            Author::new("a1", "Ann"),
            Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
        )
        .with_id(id)
    }

    #[tokio::test]
    async fn save_then_get_returns_stored_copy() {
        let repo = InMemoryDocumentRepository::new();
        let doc = document("d1", "First");
        repo.save(&DocumentId::new("d1"), &doc).await.unwrap();

        let found = repo.get(&DocumentId::new("d1")).await.unwrap();
        assert_eq!(found, Some(doc));
        assert_eq!(repo.get(&DocumentId::new("d2")).await.unwrap(), None);
    }

    #[tokio::test]
    async fn save_with_same_id_replaces_entry() {
        let repo = InMemoryDocumentRepository::new();
        let id = DocumentId::new("d1");
        repo.save(&id, &document("d1", "Old")).await.unwrap();
        repo.save(&id, &document("d1", "New")).await.unwrap();

        assert_eq!(repo.count().await.unwrap(), 1);
        let stored = repo.get(&id).await.unwrap().unwrap();
        assert_eq!(stored.title, "New");
    }

    #[tokio::test]
    async fn search_filters_by_request() {
        let repo = InMemoryDocumentRepository::new();
        for (id, title) in [("d1", "Alpha"), ("d2", "Beta"), ("d3", "Alphabet")] {
            repo.save(&DocumentId::new(id), &document(id, title))
                .await
                .unwrap();
        }

        let request = SearchRequest {
            title_prefixes: Some(vec!["Alpha".to_string()]),
            ..Default::default()
        };
        let mut titles: Vec<String> = repo
            .search(&request)
            .await
            .unwrap()
            .into_iter()
            .map(|doc| doc.title)
            .collect();
        titles.sort();
        assert_eq!(titles, vec!["Alpha", "Alphabet"]);

        let all = repo.search(&SearchRequest::default()).await.unwrap();
        assert_eq!(all.len(), 3);
    }

    #[tokio::test]
    async fn clones_share_the_same_store() {
        let repo = InMemoryDocumentRepository::new();
        let other = repo.clone();
        repo.save(&DocumentId::new("d1"), &document("d1", "Shared"))
            .await
            .unwrap();
        assert_eq!(other.count().await.unwrap(), 1);
    }
}

use async_trait::async_trait;
use domain::{Document, DocumentId, SearchRequest};
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use sysinfo::{MemoryRefreshKind, Pid, System};
use thiserror::Error;
use tracing::{debug, error, info, instrument, warn};

// --- Application Errors ---
#[derive(Error, Debug)]
pub enum ApplicationError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
    #[error("Document not found: {0}")]
    NotFound(String),
    #[error("Infrastructure error: {0}")]
    InfrastructureError(String),
}

// --- Infrastructure Interfaces (Traits) ---

/// Interface for the identifier-keyed document store.
#[async_trait]
pub trait DocumentRepository: Send + Sync {
    /// Inserts the document under `id`, replacing any previous value.
    async fn save(&self, id: &DocumentId, document: &Document) -> Result<(), ApplicationError>;
    /// Retrieves a document by its ID.
    async fn get(&self, id: &DocumentId) -> Result<Option<Document>, ApplicationError>;
    /// Returns every stored document matching the request, in no particular order.
    async fn search(&self, request: &SearchRequest) -> Result<Vec<Document>, ApplicationError>;
    /// Returns the number of stored documents.
    async fn count(&self) -> Result<usize, ApplicationError>;
}

// --- Request/Response Models (Data Transfer Objects - DTOs) ---

#[derive(Serialize, Debug)]
pub struct SearchResponse {
    /// Matching documents, unordered.
    pub documents: Vec<Document>,
    /// Number of matching documents.
    pub total_hits: usize,
    /// Time taken by the search operation in milliseconds.
    pub processing_time_ms: u128,
}

#[derive(Serialize, Debug)]
pub struct MemoryStats {
    total_bytes: u64,
    used_bytes: u64,
    available_bytes: u64,
    process_used_bytes: u64,
}

#[derive(Serialize, Debug)]
pub struct EngineStats {
    total_documents: usize,
}

#[derive(Serialize, Debug)]
pub struct SystemInfo {
    os_name: String,
    os_version: String,
}

/// Response for the /stats endpoint.
#[derive(Serialize, Debug)]
pub struct StatsResponse {
    system_info: SystemInfo,
    memory: MemoryStats,
    engine: EngineStats,
}

impl StatsResponse {
    pub fn total_documents(&self) -> usize {
        self.engine.total_documents
    }
}

// --- Application Services (Use Cases) ---

/// Upsert, lookup and filtered search over the document store.
pub struct DocumentService {
    repo: Arc<dyn DocumentRepository>,
}

impl DocumentService {
    pub fn new(repo: Arc<dyn DocumentRepository>) -> Self {
        Self { repo }
    }

    /// Stores the document, generating an identifier when it has none, and
    /// returns the stored value. An existing document with the same
    /// identifier is replaced as a whole.
    #[instrument(skip(self, document))]
    pub async fn save(&self, document: Option<Document>) -> Result<Document, ApplicationError> {
        let Some(mut document) = document else {
            warn!("Save rejected: no document supplied");
            return Err(ApplicationError::InvalidArgument(
                "Document cannot be null".to_string(),
            ));
        };

        let had_id = document.id().is_some();
        let doc_id = document.ensure_id();
        if !had_id {
            debug!(doc_id = %doc_id, "Generated identifier for document");
        }

        self.repo.save(&doc_id, &document).await?;
        info!(doc_id = %doc_id, "Document saved");
        Ok(document)
    }

    /// Looks a document up by identifier. A missing or empty identifier is
    /// answered with `None`, not an error.
    #[instrument(skip(self))]
    pub async fn find_by_id(&self, id: Option<&str>) -> Result<Option<Document>, ApplicationError> {
        let Some(id) = id.filter(|id| !id.is_empty()) else {
            debug!("Lookup with empty identifier, returning nothing");
            return Ok(None);
        };
        let document = self.repo.get(&DocumentId::new(id)).await?;
        debug!(doc_id = %id, found = document.is_some(), "Lookup finished");
        Ok(document)
    }

    /// Returns the documents matching every set criterion. `None` returns all
    /// stored documents.
    #[instrument(skip(self, request))]
    pub async fn search(
        &self,
        request: Option<SearchRequest>,
    ) -> Result<Vec<Document>, ApplicationError> {
        let request = request.unwrap_or_default();
        let documents = self.repo.search(&request).await?;
        debug!(
            unconstrained = request.is_unconstrained(),
            total_hits = documents.len(),
            "Search finished"
        );
        Ok(documents)
    }

    /// Returns every stored document.
    pub async fn search_all(&self) -> Result<Vec<Document>, ApplicationError> {
        self.search(None).await
    }

    /// Returns the number of stored documents.
    #[instrument(skip(self))]
    pub async fn count(&self) -> Result<usize, ApplicationError> {
        self.repo.count().await
    }

    /// Like [`DocumentService::search`], with hit count and timing for the API.
    #[instrument(skip(self, request))]
    pub async fn search_documents(
        &self,
        request: Option<SearchRequest>,
    ) -> Result<SearchResponse, ApplicationError> {
        let start_time = Instant::now();
        let documents = self.search(request).await?;
        let processing_time_ms = start_time.elapsed().as_millis();
        info!(
            total_hits = documents.len(),
            time_ms = processing_time_ms,
            "Search successful"
        );
        Ok(SearchResponse {
            total_hits: documents.len(),
            documents,
            processing_time_ms,
        })
    }
}

pub struct StatsService {
    repo: Arc<dyn DocumentRepository>,
}

impl StatsService {
    pub fn new(repo: Arc<dyn DocumentRepository>) -> Self {
        Self { repo }
    }

    #[instrument(skip(self))]
    pub async fn get_stats(&self) -> Result<StatsResponse, ApplicationError> {
        info!("Gathering engine and system statistics");

        let total_documents = self.repo.count().await.map_err(|e| {
            error!("Failed to get document count for stats: {}", e);
            ApplicationError::InfrastructureError("Failed to retrieve document count".to_string())
        })?;
        let engine = EngineStats { total_documents };

        // sysinfo refreshes are blocking
        let (system_info, memory) = tokio::task::spawn_blocking(|| {
            let mut sys = System::new_all();
            sys.refresh_memory_specifics(MemoryRefreshKind::everything());

            let current_pid = Pid::from(std::process::id() as usize);
            let memory = MemoryStats {
                total_bytes: sys.total_memory(),
                used_bytes: sys.used_memory(),
                available_bytes: sys.available_memory(),
                process_used_bytes: sys.process(current_pid).map_or(0, |p| p.memory()),
            };
            let system_info = SystemInfo {
                os_name: System::name().unwrap_or_else(|| "Unknown OS".to_string()),
                os_version: System::os_version().unwrap_or_else(|| "Unknown Version".to_string()),
            };
            (system_info, memory)
        })
        .await
        .map_err(|e| {
            ApplicationError::InfrastructureError(format!(
                "System stat gathering task failed: {}",
                e
            ))
        })?;
        debug!(?system_info, ?memory, ?engine, "Stats gathered");

        Ok(StatsResponse {
            system_info,
            memory,
            engine,
        })
    }
}

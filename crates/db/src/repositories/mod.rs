use async_trait::async_trait;
use thiserror::Error;

use paintvox_core::domain::customer::Customer;
use paintvox_core::domain::draft::{Draft, DraftId};
use paintvox_core::errors::ApplicationError;
use paintvox_core::promotion::EstimatePayload;

pub mod customer;
pub mod draft;
pub mod estimate;
pub mod memory;

pub use customer::SqlCustomerDirectory;
pub use draft::SqlDraftRepository;
pub use estimate::SqlEstimateRepository;
pub use memory::{InMemoryCustomerDirectory, InMemoryDraftRepository, InMemoryEstimateRepository};

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("decode error: {0}")]
    Decode(String),
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl From<RepositoryError> for ApplicationError {
    fn from(error: RepositoryError) -> Self {
        ApplicationError::Persistence(error.to_string())
    }
}

/// Keyed draft storage plus the single "active draft" pointer.
#[async_trait]
pub trait DraftRepository: Send + Sync {
    async fn find_by_id(&self, id: &DraftId) -> Result<Option<Draft>, RepositoryError>;
    /// Writes the whole record, replacing any previous version.
    async fn save(&self, draft: Draft) -> Result<(), RepositoryError>;
    async fn delete(&self, id: &DraftId) -> Result<bool, RepositoryError>;
    /// Most recently updated first.
    async fn list(&self) -> Result<Vec<Draft>, RepositoryError>;
    async fn active_draft_id(&self) -> Result<Option<DraftId>, RepositoryError>;
    async fn set_active_draft_id(&self, id: Option<DraftId>) -> Result<(), RepositoryError>;
}

#[async_trait]
pub trait CustomerDirectory: Send + Sync {
    async fn find_by_name(&self, query: &str) -> Result<Option<Customer>, RepositoryError>;
    async fn save(&self, customer: Customer) -> Result<(), RepositoryError>;
}

/// Write side of the estimate store that promoted drafts are handed to.
#[async_trait]
pub trait EstimateRepository: Send + Sync {
    /// Stores the payload and returns the new estimate id.
    async fn create(
        &self,
        draft_id: &DraftId,
        payload: &EstimatePayload,
    ) -> Result<String, RepositoryError>;
    async fn find_payload(&self, id: &str) -> Result<Option<EstimatePayload>, RepositoryError>;
}

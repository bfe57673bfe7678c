use std::collections::HashMap;

use tokio::sync::RwLock;
use uuid::Uuid;

use paintvox_core::domain::customer::{best_match, Customer};
use paintvox_core::domain::draft::{Draft, DraftId};
use paintvox_core::promotion::EstimatePayload;

use super::{CustomerDirectory, DraftRepository, EstimateRepository, RepositoryError};

#[derive(Default)]
pub struct InMemoryDraftRepository {
    drafts: RwLock<HashMap<String, Draft>>,
    active: RwLock<Option<DraftId>>,
}

#[async_trait::async_trait]
impl DraftRepository for InMemoryDraftRepository {
    async fn find_by_id(&self, id: &DraftId) -> Result<Option<Draft>, RepositoryError> {
        let drafts = self.drafts.read().await;
        Ok(drafts.get(id.as_str()).cloned())
    }

    async fn save(&self, draft: Draft) -> Result<(), RepositoryError> {
        let mut drafts = self.drafts.write().await;
        drafts.insert(draft.id.0.clone(), draft);
        Ok(())
    }

    async fn delete(&self, id: &DraftId) -> Result<bool, RepositoryError> {
        let removed = self.drafts.write().await.remove(id.as_str()).is_some();
        let mut active = self.active.write().await;
        if active.as_ref() == Some(id) {
            *active = None;
        }
        Ok(removed)
    }

    async fn list(&self) -> Result<Vec<Draft>, RepositoryError> {
        let drafts = self.drafts.read().await;
        let mut all = drafts.values().cloned().collect::<Vec<_>>();
        all.sort_by(|a, b| b.updated_at.cmp(&a.updated_at).then_with(|| a.id.cmp(&b.id)));
        Ok(all)
    }

    async fn active_draft_id(&self) -> Result<Option<DraftId>, RepositoryError> {
        Ok(self.active.read().await.clone())
    }

    async fn set_active_draft_id(&self, id: Option<DraftId>) -> Result<(), RepositoryError> {
        *self.active.write().await = id;
        Ok(())
    }
}

#[derive(Default)]
pub struct InMemoryCustomerDirectory {
    customers: RwLock<Vec<Customer>>,
}

impl InMemoryCustomerDirectory {
    pub fn with_customers(customers: Vec<Customer>) -> Self {
        Self { customers: RwLock::new(customers) }
    }
}

#[async_trait::async_trait]
impl CustomerDirectory for InMemoryCustomerDirectory {
    async fn find_by_name(&self, query: &str) -> Result<Option<Customer>, RepositoryError> {
        let customers = self.customers.read().await;
        Ok(best_match(query, &customers).cloned())
    }

    async fn save(&self, customer: Customer) -> Result<(), RepositoryError> {
        let mut customers = self.customers.write().await;
        match customers.iter_mut().find(|existing| existing.id == customer.id) {
            Some(existing) => *existing = customer,
            None => customers.push(customer),
        }
        Ok(())
    }
}

#[derive(Default)]
pub struct InMemoryEstimateRepository {
    estimates: RwLock<HashMap<String, (DraftId, EstimatePayload)>>,
}

impl InMemoryEstimateRepository {
    pub async fn len(&self) -> usize {
        self.estimates.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.estimates.read().await.is_empty()
    }
}

#[async_trait::async_trait]
impl EstimateRepository for InMemoryEstimateRepository {
    async fn create(
        &self,
        draft_id: &DraftId,
        payload: &EstimatePayload,
    ) -> Result<String, RepositoryError> {
        let mut estimates = self.estimates.write().await;
        if estimates.values().any(|(existing, _)| existing == draft_id) {
            return Err(RepositoryError::Decode(format!(
                "draft `{draft_id}` already has a promoted estimate"
            )));
        }
        let id = format!("est-{}", Uuid::new_v4());
        estimates.insert(id.clone(), (draft_id.clone(), payload.clone()));
        Ok(id)
    }

    async fn find_payload(&self, id: &str) -> Result<Option<EstimatePayload>, RepositoryError> {
        let estimates = self.estimates.read().await;
        Ok(estimates.get(id).map(|(_, payload)| payload.clone()))
    }
}

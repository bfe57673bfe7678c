use std::sync::Arc;

use chrono::Utc;
use paintvox_core::domain::business::BusinessDefaults;
use paintvox_core::domain::draft::{Draft, DraftField, DraftId, DraftUpdate, SpeakerRole};
use paintvox_core::errors::{ApplicationError, DomainError};
use paintvox_core::pricing::DeterministicRecalculator;
use paintvox_db::DraftRepository;

/// Result of merging a partial update into a stored draft.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FieldChange {
    pub draft: Draft,
    pub changed: Vec<DraftField>,
}

/// Single mutation authority for drafts. Every field write goes through
/// [`DraftLifecycle::update_fields`], which recalculates before persisting.
pub struct DraftLifecycle {
    drafts: Arc<dyn DraftRepository>,
    recalculator: DeterministicRecalculator,
}

impl DraftLifecycle {
    pub fn new(drafts: Arc<dyn DraftRepository>, defaults: BusinessDefaults) -> Self {
        Self { drafts, recalculator: DeterministicRecalculator::new(defaults) }
    }

    pub fn recalculator(&self) -> &DeterministicRecalculator {
        &self.recalculator
    }

    /// Creates an empty draft and makes it the active one.
    pub async fn create(&self) -> Result<Draft, ApplicationError> {
        let mut draft = Draft::new(Utc::now());
        self.recalculator.apply(&mut draft);
        self.drafts.save(draft.clone()).await?;
        self.drafts.set_active_draft_id(Some(draft.id.clone())).await?;
        Ok(draft)
    }

    pub async fn get(&self, id: &DraftId) -> Result<Draft, ApplicationError> {
        self.drafts
            .find_by_id(id)
            .await?
            .ok_or_else(|| DomainError::DraftNotFound(id.clone()).into())
    }

    pub async fn list(&self) -> Result<Vec<Draft>, ApplicationError> {
        Ok(self.drafts.list().await?)
    }

    /// The draft the active pointer refers to, if it still exists.
    pub async fn active(&self) -> Result<Option<Draft>, ApplicationError> {
        let Some(id) = self.drafts.active_draft_id().await? else {
            return Ok(None);
        };
        Ok(self.drafts.find_by_id(&id).await?)
    }

    pub async fn set_active(&self, id: &DraftId) -> Result<Draft, ApplicationError> {
        let draft = self.get(id).await?;
        self.drafts.set_active_draft_id(Some(id.clone())).await?;
        Ok(draft)
    }

    pub async fn clear_active(&self) -> Result<(), ApplicationError> {
        Ok(self.drafts.set_active_draft_id(None).await?)
    }

    pub async fn update_fields(
        &self,
        id: &DraftId,
        update: DraftUpdate,
    ) -> Result<FieldChange, ApplicationError> {
        let mut draft = self.get(id).await?;
        let changed = draft.apply(update);
        self.recalculator.apply(&mut draft);
        draft.updated_at = Utc::now();
        self.drafts.save(draft.clone()).await?;
        Ok(FieldChange { draft, changed })
    }

    /// Persists a transcript entry. Extraction and recalculation are the caller's call.
    pub async fn append_conversation_entry(
        &self,
        id: &DraftId,
        role: SpeakerRole,
        message: impl Into<String>,
    ) -> Result<Draft, ApplicationError> {
        let mut draft = self.get(id).await?;
        let now = Utc::now();
        draft.push_turn(role, message, now);
        draft.updated_at = now;
        self.drafts.save(draft.clone()).await?;
        Ok(draft)
    }

    pub async fn mark_complete(&self, id: &DraftId) -> Result<Draft, ApplicationError> {
        let mut draft = self.get(id).await?;
        if !draft.is_complete {
            draft.is_complete = true;
            draft.updated_at = Utc::now();
            self.drafts.save(draft.clone()).await?;
        }
        Ok(draft)
    }

    /// Links a promoted estimate. A draft may be linked at most once, and the
    /// linked draft stops being the active one.
    pub async fn link_to_final_estimate(
        &self,
        id: &DraftId,
        estimate_id: impl Into<String>,
    ) -> Result<Draft, ApplicationError> {
        let mut draft = self.get(id).await?;
        if let Some(existing) = &draft.final_estimate_id {
            return Err(DomainError::DraftAlreadyLinked {
                draft_id: id.clone(),
                estimate_id: existing.clone(),
            }
            .into());
        }

        draft.final_estimate_id = Some(estimate_id.into());
        draft.is_complete = true;
        draft.updated_at = Utc::now();
        self.drafts.save(draft.clone()).await?;

        if self.drafts.active_draft_id().await?.as_ref() == Some(id) {
            self.drafts.set_active_draft_id(None).await?;
        }
        Ok(draft)
    }

    /// Removes the draft; deleting the active draft clears the active pointer.
    pub async fn delete(&self, id: &DraftId) -> Result<bool, ApplicationError> {
        let was_active = self.drafts.active_draft_id().await?.as_ref() == Some(id);
        let removed = self.drafts.delete(id).await?;
        if was_active {
            self.drafts.set_active_draft_id(None).await?;
        }
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use rust_decimal::Decimal;

    use paintvox_core::domain::business::BusinessDefaults;
    use paintvox_core::domain::draft::{DraftField, DraftId, DraftUpdate, SpeakerRole};
    use paintvox_core::errors::{ApplicationError, DomainError};
    use paintvox_db::repositories::InMemoryDraftRepository;
    use paintvox_db::DraftRepository;

    use super::DraftLifecycle;

    fn lifecycle() -> (Arc<InMemoryDraftRepository>, DraftLifecycle) {
        let repo = Arc::new(InMemoryDraftRepository::default());
        let lifecycle = DraftLifecycle::new(repo.clone(), BusinessDefaults::default());
        (repo, lifecycle)
    }

    #[tokio::test]
    async fn create_makes_the_new_draft_active() {
        let (repo, lifecycle) = lifecycle();
        let draft = lifecycle.create().await.expect("create");

        assert_eq!(repo.active_draft_id().await.expect("active"), Some(draft.id.clone()));
        assert_eq!(lifecycle.active().await.expect("active draft"), Some(draft));
    }

    #[tokio::test]
    async fn update_fields_recalculates_before_saving() {
        let (_, lifecycle) = lifecycle();
        let draft = lifecycle.create().await.expect("create");

        let change = lifecycle
            .update_fields(
                &draft.id,
                DraftUpdate {
                    number_of_painters: Some(2),
                    estimated_days: Some(Decimal::from(3)),
                    hourly_rate: Some(Decimal::from(65)),
                    ..DraftUpdate::default()
                },
            )
            .await
            .expect("update");

        assert_eq!(
            change.changed,
            vec![DraftField::NumberOfPainters, DraftField::EstimatedDays, DraftField::HourlyRate]
        );
        assert_eq!(change.draft.labor_cost, Some(Decimal::from(3120)));
        assert!(lifecycle.recalculator().is_consistent(&change.draft));

        let stored = lifecycle.get(&draft.id).await.expect("stored");
        assert_eq!(stored.estimate_total, Decimal::from(3120));
        assert!(stored.updated_at >= draft.updated_at);
    }

    #[tokio::test]
    async fn appending_turns_keeps_history_in_order() {
        let (_, lifecycle) = lifecycle();
        let draft = lifecycle.create().await.expect("create");

        lifecycle
            .append_conversation_entry(&draft.id, SpeakerRole::Agent, "Who is this for?")
            .await
            .expect("agent turn");
        let updated = lifecycle
            .append_conversation_entry(&draft.id, SpeakerRole::User, "John Smith")
            .await
            .expect("user turn");

        let messages =
            updated.conversation.iter().map(|entry| entry.message.as_str()).collect::<Vec<_>>();
        assert_eq!(messages, vec!["Who is this for?", "John Smith"]);
    }

    #[tokio::test]
    async fn linking_twice_is_rejected_and_clears_active() {
        let (repo, lifecycle) = lifecycle();
        let draft = lifecycle.create().await.expect("create");

        let linked = lifecycle.link_to_final_estimate(&draft.id, "est-1").await.expect("link");
        assert_eq!(linked.final_estimate_id.as_deref(), Some("est-1"));
        assert!(linked.is_complete);
        assert_eq!(repo.active_draft_id().await.expect("active"), None);

        let error = lifecycle
            .link_to_final_estimate(&draft.id, "est-2")
            .await
            .expect_err("second link must fail");
        assert!(matches!(
            error,
            ApplicationError::Domain(DomainError::DraftAlreadyLinked { .. })
        ));
    }

    #[tokio::test]
    async fn deleting_the_active_draft_clears_the_pointer() {
        let (repo, lifecycle) = lifecycle();
        let draft = lifecycle.create().await.expect("create");

        assert!(lifecycle.delete(&draft.id).await.expect("delete"));
        assert_eq!(repo.active_draft_id().await.expect("active"), None);
        assert!(matches!(
            lifecycle.get(&draft.id).await,
            Err(ApplicationError::Domain(DomainError::DraftNotFound(_)))
        ));
    }

    #[tokio::test]
    async fn set_active_requires_an_existing_draft() {
        let (_, lifecycle) = lifecycle();
        let missing = DraftId("missing".to_string());
        assert!(lifecycle.set_active(&missing).await.is_err());

        let first = lifecycle.create().await.expect("first");
        let _second = lifecycle.create().await.expect("second");
        let active = lifecycle.set_active(&first.id).await.expect("set active");
        assert_eq!(active.id, first.id);
    }
}

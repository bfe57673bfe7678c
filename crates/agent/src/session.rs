use std::sync::Arc;

use paintvox_core::completion::{completion, CompletionReport};
use paintvox_core::context::resume_context;
use paintvox_core::domain::business::BusinessDefaults;
use paintvox_core::domain::draft::{Draft, DraftField, DraftId, SpeakerRole};
use paintvox_core::errors::{ApplicationError, DomainError};
use paintvox_core::extraction::FieldExtractor;
use paintvox_core::promotion::build_payload;
use paintvox_db::{CustomerDirectory, DraftRepository, EstimateRepository};
use serde::Serialize;
use serde_json::Value;
use tracing::{info, warn};

use crate::drafts::{DraftLifecycle, FieldChange};
use crate::tools::{
    BusinessConfigSource, BusinessConfigTool, CustomerLookupTool, ToolEffect, ToolRegistry,
};

#[derive(Clone, Debug)]
pub struct SessionSettings {
    pub defaults: BusinessDefaults,
    pub completion_threshold_pct: u8,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self { defaults: BusinessDefaults::default(), completion_threshold_pct: 100 }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SessionStart {
    pub draft: Draft,
    pub resumed: bool,
    pub progress: CompletionReport,
    pub context: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct TurnOutcome {
    pub draft: Draft,
    pub applied_fields: Vec<DraftField>,
    pub progress: CompletionReport,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SessionClose {
    pub draft: Draft,
    pub applied_fields: Vec<DraftField>,
    pub progress: CompletionReport,
}

/// Orchestrates one voice conversation against the active draft.
///
/// Methods take `&mut self`, so a session handles one turn or tool call at a
/// time. The active draft id is explicit session state and is only set by
/// [`VoiceSession::start_or_resume`].
pub struct VoiceSession {
    lifecycle: DraftLifecycle,
    extractor: FieldExtractor,
    tools: ToolRegistry,
    completion_threshold_pct: u8,
    active: Option<DraftId>,
}

impl VoiceSession {
    pub fn new(
        drafts: Arc<dyn DraftRepository>,
        tools: ToolRegistry,
        settings: SessionSettings,
    ) -> Self {
        Self {
            lifecycle: DraftLifecycle::new(drafts, settings.defaults.clone()),
            extractor: FieldExtractor::new(settings.defaults),
            tools,
            completion_threshold_pct: settings.completion_threshold_pct,
            active: None,
        }
    }

    /// Session wired with the customer lookup and business defaults tools.
    pub fn with_standard_tools(
        drafts: Arc<dyn DraftRepository>,
        customers: Arc<dyn CustomerDirectory>,
        business: Arc<dyn BusinessConfigSource>,
        settings: SessionSettings,
    ) -> Self {
        let mut tools = ToolRegistry::default();
        tools.register(CustomerLookupTool::new(customers));
        tools.register(BusinessConfigTool::new(business));
        Self::new(drafts, tools, settings)
    }

    pub fn lifecycle(&self) -> &DraftLifecycle {
        &self.lifecycle
    }

    pub fn active_draft_id(&self) -> Option<&DraftId> {
        self.active.as_ref()
    }

    /// Resumes the stored active draft unless it is finished, otherwise starts a new one.
    pub async fn start_or_resume(&mut self) -> Result<SessionStart, ApplicationError> {
        let resumable = self
            .lifecycle
            .active()
            .await?
            .filter(|draft| !draft.is_complete && draft.final_estimate_id.is_none());

        let (draft, resumed) = match resumable {
            Some(draft) => (draft, true),
            None => (self.lifecycle.create().await?, false),
        };
        self.active = Some(draft.id.clone());

        let progress = completion(&draft);
        info!(
            event_name = "voice.session.started",
            draft_id = %draft.id,
            correlation_id = %draft.id,
            resumed,
            completion_pct = progress.percent,
            "voice session ready"
        );

        let context = resume_context(&draft);
        Ok(SessionStart { draft, resumed, progress, context })
    }

    pub async fn ingest_turn(
        &mut self,
        role: SpeakerRole,
        message: &str,
    ) -> Result<TurnOutcome, ApplicationError> {
        let id = self.require_active()?;
        self.lifecycle.append_conversation_entry(&id, role, message).await?;
        info!(
            event_name = "voice.turn.ingested",
            draft_id = %id,
            correlation_id = %id,
            role = ?role,
            chars = message.chars().count(),
            "conversation turn appended"
        );

        let change = self.extract_and_merge(&id).await?;
        let progress = completion(&change.draft);
        Ok(TurnOutcome { draft: change.draft, applied_fields: change.changed, progress })
    }

    /// Runs a tool and applies its effect to the active draft. Returns the
    /// JSON string handed back to the dialogue transport.
    pub async fn call_tool(&mut self, name: &str, input: Value) -> Result<String, ApplicationError> {
        let active = match &self.active {
            Some(id) => Some(self.lifecycle.get(id).await?),
            None => None,
        };

        let output = self.tools.call(name, input, active.as_ref()).await;
        let mut applied = Vec::new();
        match (output.effect, active) {
            (ToolEffect::UpdateActiveDraft(update), Some(draft)) => {
                applied = self.lifecycle.update_fields(&draft.id, update).await?.changed;
            }
            (ToolEffect::UpdateActiveDraft(_), None) => {
                warn!(
                    event_name = "voice.tool.effect_skipped",
                    tool = name,
                    "tool produced a draft update but no draft is active"
                );
            }
            (ToolEffect::None, _) => {}
        }

        info!(
            event_name = "voice.tool.called",
            tool = name,
            draft_id = self.active.as_ref().map(DraftId::as_str).unwrap_or("none"),
            applied_fields = ?applied,
            "tool call handled"
        );

        serde_json::to_string(&output.payload)
            .map_err(|error| ApplicationError::Integration(format!("tool `{name}` payload: {error}")))
    }

    /// Explicit end of the conversation. Always marks the draft complete.
    pub async fn finish(&mut self) -> Result<SessionClose, ApplicationError> {
        self.close(true).await
    }

    /// Transport dropped. The draft is marked complete only when it meets the
    /// configured completion threshold; otherwise it stays resumable.
    pub async fn disconnect(&mut self) -> Result<SessionClose, ApplicationError> {
        self.close(false).await
    }

    pub async fn resume_context(&self) -> Result<String, ApplicationError> {
        let id = self.require_active()?;
        let draft = self.lifecycle.get(&id).await?;
        Ok(resume_context(&draft))
    }

    pub async fn progress(&self) -> Result<CompletionReport, ApplicationError> {
        let id = self.require_active()?;
        Ok(completion(&self.lifecycle.get(&id).await?))
    }

    /// Hands the active draft to the estimate store and links the returned id.
    pub async fn promote(
        &mut self,
        estimates: &dyn EstimateRepository,
        defaults: &BusinessDefaults,
    ) -> Result<Draft, ApplicationError> {
        let id = self.require_active()?;
        let draft = self.lifecycle.get(&id).await?;
        let payload = build_payload(&draft, defaults)?;
        let estimate_id = estimates.create(&id, &payload).await?;
        let linked = self.lifecycle.link_to_final_estimate(&id, estimate_id.clone()).await?;
        self.active = None;

        info!(
            event_name = "voice.draft.promoted",
            draft_id = %id,
            correlation_id = %id,
            estimate_id = %estimate_id,
            project_name = %payload.project_name,
            "draft promoted to estimate"
        );
        Ok(linked)
    }

    async fn close(&mut self, explicit: bool) -> Result<SessionClose, ApplicationError> {
        let id = self.require_active()?;
        // Final pass so nothing spoken since the last merge is lost.
        let change = self.extract_and_merge(&id).await?;
        let progress = completion(&change.draft);

        let complete = explicit || progress.meets(self.completion_threshold_pct);
        let draft =
            if complete { self.lifecycle.mark_complete(&id).await? } else { change.draft };

        info!(
            event_name = "voice.session.finished",
            draft_id = %id,
            correlation_id = %id,
            explicit,
            marked_complete = draft.is_complete,
            completion_pct = progress.percent,
            "voice session closed"
        );
        Ok(SessionClose { draft, applied_fields: change.changed, progress })
    }

    async fn extract_and_merge(&self, id: &DraftId) -> Result<FieldChange, ApplicationError> {
        let draft = self.lifecycle.get(id).await?;
        let update = self.extractor.extract(&draft.conversation, &draft);
        if update.is_empty() {
            return Ok(FieldChange { draft, changed: Vec::new() });
        }

        let change = self.lifecycle.update_fields(id, update).await?;
        info!(
            event_name = "voice.draft.updated",
            draft_id = %id,
            correlation_id = %id,
            fields = ?change.changed,
            estimate_total = %change.draft.estimate_total,
            "draft fields merged from transcript"
        );
        Ok(change)
    }

    fn require_active(&self) -> Result<DraftId, ApplicationError> {
        self.active.clone().ok_or_else(|| DomainError::NoActiveDraft.into())
    }
}

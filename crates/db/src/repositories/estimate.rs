use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use paintvox_core::domain::draft::DraftId;
use paintvox_core::promotion::EstimatePayload;

use super::{EstimateRepository, RepositoryError};
use crate::DbPool;

pub struct SqlEstimateRepository {
    pool: DbPool,
}

impl SqlEstimateRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl EstimateRepository for SqlEstimateRepository {
    async fn create(
        &self,
        draft_id: &DraftId,
        payload: &EstimatePayload,
    ) -> Result<String, RepositoryError> {
        let id = format!("est-{}", Uuid::new_v4());

        sqlx::query(
            r#"
            INSERT INTO promoted_estimate (
                id, draft_id, project_name, estimate_total, payload, created_at
            ) VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&id)
        .bind(draft_id.as_str())
        .bind(&payload.project_name)
        .bind(payload.estimate_total.to_string())
        .bind(serde_json::to_string(payload)?)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(id)
    }

    async fn find_payload(&self, id: &str) -> Result<Option<EstimatePayload>, RepositoryError> {
        let payload: Option<String> =
            sqlx::query_scalar("SELECT payload FROM promoted_estimate WHERE id = ?")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;

        payload
            .map(|raw| {
                serde_json::from_str(&raw).map_err(|error| {
                    RepositoryError::Decode(format!("estimate `{id}` payload: {error}"))
                })
            })
            .transpose()
    }
}

use async_trait::async_trait;
use chrono::Utc;
use sqlx::{sqlite::SqliteRow, Row};

use paintvox_core::domain::draft::{Draft, DraftId};

use super::{DraftRepository, RepositoryError};
use crate::DbPool;

/// Drafts are stored as one JSON document per row. The indexed columns mirror
/// document fields for listing and operator queries only.
pub struct SqlDraftRepository {
    pool: DbPool,
}

impl SqlDraftRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl DraftRepository for SqlDraftRepository {
    async fn find_by_id(&self, id: &DraftId) -> Result<Option<Draft>, RepositoryError> {
        let row = sqlx::query("SELECT id, document FROM voice_draft WHERE id = ?")
            .bind(id.as_str())
            .fetch_optional(&self.pool)
            .await?;

        row.map(|value| draft_from_row(&value)).transpose()
    }

    async fn save(&self, draft: Draft) -> Result<(), RepositoryError> {
        let document = serde_json::to_string(&draft)?;

        sqlx::query(
            r#"
            INSERT INTO voice_draft (
                id, document, customer_name, is_complete, final_estimate_id,
                created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                document = excluded.document,
                customer_name = excluded.customer_name,
                is_complete = excluded.is_complete,
                final_estimate_id = excluded.final_estimate_id,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(draft.id.as_str())
        .bind(document)
        .bind(draft.customer_name.as_deref())
        .bind(draft.is_complete)
        .bind(draft.final_estimate_id.as_deref())
        .bind(draft.created_at.to_rfc3339())
        .bind(draft.updated_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn delete(&self, id: &DraftId) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM voice_draft WHERE id = ?")
            .bind(id.as_str())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn list(&self) -> Result<Vec<Draft>, RepositoryError> {
        let rows = sqlx::query("SELECT id, document FROM voice_draft ORDER BY updated_at DESC, id")
            .fetch_all(&self.pool)
            .await?;

        rows.iter().map(draft_from_row).collect()
    }

    async fn active_draft_id(&self) -> Result<Option<DraftId>, RepositoryError> {
        let draft_id: Option<Option<String>> =
            sqlx::query_scalar("SELECT draft_id FROM active_draft WHERE slot = 1")
                .fetch_optional(&self.pool)
                .await?;
        Ok(draft_id.flatten().map(DraftId))
    }

    async fn set_active_draft_id(&self, id: Option<DraftId>) -> Result<(), RepositoryError> {
        sqlx::query(
            r#"
            INSERT INTO active_draft (slot, draft_id, updated_at) VALUES (1, ?, ?)
            ON CONFLICT(slot) DO UPDATE SET
                draft_id = excluded.draft_id,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(id.as_ref().map(DraftId::as_str))
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

fn draft_from_row(row: &SqliteRow) -> Result<Draft, RepositoryError> {
    let id: String = row.try_get("id")?;
    let document: String = row.try_get("document")?;
    serde_json::from_str(&document)
        .map_err(|error| RepositoryError::Decode(format!("draft `{id}` document: {error}")))
}

use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use chrono::Utc;
use paintvox_db::DbPool;
use serde::Serialize;

#[derive(Clone)]
pub struct HealthState {
    db_pool: DbPool,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HealthCheck {
    pub status: &'static str,
    pub detail: String,
}

impl HealthCheck {
    fn ready(detail: impl Into<String>) -> Self {
        Self { status: "ready", detail: detail.into() }
    }

    fn degraded(detail: impl Into<String>) -> Self {
        Self { status: "degraded", detail: detail.into() }
    }

    fn is_ready(&self) -> bool {
        self.status == "ready"
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub database: HealthCheck,
    pub draft_store: HealthCheck,
    pub active_draft_id: Option<String>,
    pub checked_at: String,
}

pub fn router(db_pool: DbPool) -> Router {
    Router::new().route("/health", get(health)).with_state(HealthState { db_pool })
}

pub async fn health(State(state): State<HealthState>) -> (StatusCode, Json<HealthResponse>) {
    let database = database_check(&state.db_pool).await;
    let (draft_store, active_draft_id) = if database.is_ready() {
        draft_store_check(&state.db_pool).await
    } else {
        (HealthCheck::degraded("skipped: database unreachable"), None)
    };
    let ready = database.is_ready() && draft_store.is_ready();

    let payload = HealthResponse {
        status: if ready { "ready" } else { "degraded" },
        database,
        draft_store,
        active_draft_id,
        checked_at: Utc::now().to_rfc3339(),
    };

    let status_code = if ready { StatusCode::OK } else { StatusCode::SERVICE_UNAVAILABLE };
    (status_code, Json(payload))
}

async fn database_check(pool: &DbPool) -> HealthCheck {
    match sqlx::query_scalar::<_, i64>("SELECT 1").fetch_one(pool).await {
        Ok(_) => HealthCheck::ready("database query succeeded"),
        Err(error) => HealthCheck::degraded(format!("database query failed: {error}")),
    }
}

/// Confirms the draft tables exist (migrations ran) and reports the active pointer.
async fn draft_store_check(pool: &DbPool) -> (HealthCheck, Option<String>) {
    let drafts = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM voice_draft")
        .fetch_one(pool)
        .await;
    let drafts = match drafts {
        Ok(count) => count,
        Err(error) => {
            return (
                HealthCheck::degraded(format!("draft store unavailable (run `paintvox migrate`): {error}")),
                None,
            )
        }
    };

    let active = sqlx::query_scalar::<_, Option<String>>(
        "SELECT draft_id FROM active_draft WHERE slot = 1",
    )
    .fetch_optional(pool)
    .await
    .ok()
    .flatten()
    .flatten();

    (HealthCheck::ready(format!("{drafts} draft(s) stored")), active)
}

#[cfg(test)]
mod tests {
    use axum::{extract::State, http::StatusCode, Json};
    use paintvox_db::{connect_with_settings, migrations};

    use crate::health::{health, HealthState};

    #[tokio::test]
    async fn health_returns_ready_when_migrated_database_is_reachable() {
        let pool = connect_with_settings("sqlite::memory:", 1, 5)
            .await
            .expect("pool should connect");
        migrations::run_pending(&pool).await.expect("migrations");

        let (status, Json(payload)) = health(State(HealthState { db_pool: pool.clone() })).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(payload.status, "ready");
        assert_eq!(payload.database.status, "ready");
        assert_eq!(payload.draft_store.detail, "0 draft(s) stored");
        assert_eq!(payload.active_draft_id, None);

        pool.close().await;
    }

    #[tokio::test]
    async fn health_is_degraded_before_migrations() {
        let pool = connect_with_settings("sqlite::memory:", 1, 5)
            .await
            .expect("pool should connect");

        let (status, Json(payload)) = health(State(HealthState { db_pool: pool.clone() })).await;

        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(payload.database.status, "ready");
        assert_eq!(payload.draft_store.status, "degraded");

        pool.close().await;
    }

    #[tokio::test]
    async fn health_returns_service_unavailable_when_database_is_unavailable() {
        let pool = connect_with_settings("sqlite::memory:", 1, 5)
            .await
            .expect("pool should connect");
        pool.close().await;

        let (status, Json(payload)) = health(State(HealthState { db_pool: pool })).await;

        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(payload.status, "degraded");
        assert_eq!(payload.database.status, "degraded");
        assert_eq!(payload.draft_store.status, "degraded");
    }
}

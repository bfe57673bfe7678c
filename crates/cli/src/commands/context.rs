use paintvox_core::completion::completion;
use paintvox_core::context::resume_context;
use paintvox_core::domain::draft::DraftId;
use paintvox_db::repositories::SqlDraftRepository;
use paintvox_db::{connect_with_config, DraftRepository};

use crate::commands::{prepare, CommandResult};

pub fn run(draft_id: &str) -> CommandResult {
    let draft_id = draft_id.trim();
    if draft_id.is_empty() {
        return CommandResult::failure("context", "invalid_input", "draft id must not be empty", 7);
    }

    let (config, runtime) = match prepare("context") {
        Ok(prepared) => prepared,
        Err(failure) => return failure,
    };

    let result = runtime.block_on(async {
        let pool = connect_with_config(&config.database)
            .await
            .map_err(|error| ("db_connectivity", error.to_string(), 4u8))?;
        let drafts = SqlDraftRepository::new(pool.clone());
        let draft = drafts
            .find_by_id(&DraftId(draft_id.to_string()))
            .await
            .map_err(|error| ("persistence", error.to_string(), 5u8));
        pool.close().await;
        draft?.ok_or_else(|| ("draft_not_found", format!("draft `{draft_id}` was not found"), 8u8))
    });

    match result {
        Ok(draft) => {
            let progress = completion(&draft);
            CommandResult::success(
                "context",
                format!(
                    "draft {} ({}% complete{})\n\n{}",
                    draft.id,
                    progress.percent,
                    if draft.is_complete { ", finished" } else { "" },
                    resume_context(&draft)
                ),
            )
        }
        Err((error_class, message, exit_code)) => {
            CommandResult::failure("context", error_class, message, exit_code)
        }
    }
}

//! Offline replay of a voice transcript through the full session pipeline.
//!
//! Transcript files hold one turn per line, prefixed by the speaker
//! (`user:` / `customer:` or `agent:` / `assistant:`). Blank lines and lines
//! starting with `#` are ignored.

use std::fs;
use std::path::Path;
use std::sync::Arc;

use paintvox_agent::{SessionSettings, StaticBusinessConfig, VoiceSession};
use paintvox_core::domain::draft::SpeakerRole;
use paintvox_core::errors::ApplicationError;
use paintvox_db::repositories::{InMemoryCustomerDirectory, InMemoryDraftRepository};
use serde::Serialize;

use crate::commands::{prepare, CommandResult};

#[derive(Debug, Serialize)]
struct TurnLine {
    turn: usize,
    role: SpeakerRole,
    applied_fields: Vec<&'static str>,
    completion_pct: u8,
    missing: Vec<String>,
    estimate_total: String,
}

pub fn run(path: &Path) -> CommandResult {
    let raw = match fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(error) => {
            return CommandResult::failure(
                "replay",
                "transcript_read",
                format!("failed to read `{}`: {error}", path.display()),
                7,
            )
        }
    };
    let turns = match parse_transcript(&raw) {
        Ok(turns) => turns,
        Err(message) => return CommandResult::failure("replay", "transcript_parse", message, 7),
    };

    let (config, runtime) = match prepare("replay") {
        Ok(prepared) => prepared,
        Err(failure) => return failure,
    };

    let defaults = config.business.defaults();
    let mut session = VoiceSession::with_standard_tools(
        Arc::new(InMemoryDraftRepository::default()),
        Arc::new(InMemoryCustomerDirectory::default()),
        Arc::new(StaticBusinessConfig::new(defaults.clone())),
        SessionSettings {
            defaults,
            completion_threshold_pct: config.session.completion_threshold_pct,
        },
    );

    let mut lines = Vec::with_capacity(turns.len());
    let result = runtime.block_on(async {
        session.start_or_resume().await?;
        for (index, (role, message)) in turns.iter().enumerate() {
            let outcome = session.ingest_turn(*role, message).await?;
            lines.push(TurnLine {
                turn: index + 1,
                role: *role,
                applied_fields: outcome.applied_fields.iter().map(|field| field.as_str()).collect(),
                completion_pct: outcome.progress.percent,
                estimate_total: outcome.draft.estimate_total.to_string(),
                missing: outcome.progress.missing,
            });
        }

        let closed = session.disconnect().await?;
        let context = session.resume_context().await?;
        Ok::<_, ApplicationError>((closed, context))
    });

    let preamble = match lines.iter().map(serde_json::to_string).collect::<Result<Vec<_>, _>>() {
        Ok(preamble) => preamble,
        Err(error) => {
            return CommandResult::failure("replay", "serialization", error.to_string(), 6)
        }
    };

    match result {
        Ok((closed, context)) => CommandResult::success(
            "replay",
            format!(
                "{} turns replayed, {}% complete{}\n\n{context}",
                turns.len(),
                closed.progress.percent,
                if closed.draft.is_complete { ", marked complete" } else { "" },
            ),
        )
        .with_preamble(preamble),
        Err(error) => {
            CommandResult::failure("replay", "session", error.to_string(), 6).with_preamble(preamble)
        }
    }
}

pub fn parse_transcript(raw: &str) -> Result<Vec<(SpeakerRole, String)>, String> {
    let mut turns = Vec::new();
    for (number, line) in raw.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let Some((speaker, message)) = line.split_once(':') else {
            return Err(format!("line {}: expected `user:` or `agent:` prefix", number + 1));
        };
        let role = speaker
            .parse::<SpeakerRole>()
            .map_err(|error| format!("line {}: {error}", number + 1))?;
        let message = message.trim();
        if message.is_empty() {
            return Err(format!("line {}: empty {} turn", number + 1, speaker.trim()));
        }
        turns.push((role, message.to_string()));
    }

    if turns.is_empty() {
        return Err("transcript has no turns".to_string());
    }
    Ok(turns)
}

#[cfg(test)]
mod tests {
    use paintvox_core::domain::draft::SpeakerRole;

    use super::parse_transcript;

    #[test]
    fn parses_roles_and_skips_comments() {
        let turns = parse_transcript(
            "# call with John\nagent: Who is this for?\n\nUser: John Smith, 12 Elm St.\nassistant: Thanks!",
        )
        .expect("parse");

        assert_eq!(
            turns,
            vec![
                (SpeakerRole::Agent, "Who is this for?".to_string()),
                (SpeakerRole::User, "John Smith, 12 Elm St.".to_string()),
                (SpeakerRole::Agent, "Thanks!".to_string()),
            ]
        );
    }

    #[test]
    fn rejects_unknown_speakers_with_line_numbers() {
        let error = parse_transcript("user: hi\nnarrator: meanwhile").expect_err("bad speaker");
        assert!(error.starts_with("line 2:"), "{error}");
        assert!(error.contains("narrator"));
    }

    #[test]
    fn rejects_empty_transcripts() {
        assert_eq!(parse_transcript("# nothing\n\n"), Err("transcript has no turns".to_string()));
        assert!(parse_transcript("just words").is_err());
    }
}

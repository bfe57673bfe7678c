use std::sync::OnceLock;

use regex::Regex;
use rust_decimal::Decimal;

use super::numbers::{parse_number, NUM};
use super::rules::Turn;

struct BillableTask {
    description: &'static str,
    phrase: &'static str,
    default_hours: i64,
}

const TASKS: &[BillableTask] = &[
    BillableTask {
        description: "Pressure washing",
        phrase: r"(?:pressure|power)[\s-]?wash(?:ing|ed)?",
        default_hours: 3,
    },
    BillableTask { description: "Carpentry", phrase: r"carpentry", default_hours: 2 },
    BillableTask {
        description: "Wallpaper removal",
        phrase: r"(?:wall\s?paper\s+(?:removal|stripping)|(?:remove|removing|strip|stripping)\s+(?:the\s+|some\s+)?wall\s?paper)",
        default_hours: 4,
    },
];

struct TaskPatterns {
    mention: Regex,
    hours_before: Regex,
    hours_after: Regex,
}

fn task_patterns() -> &'static Vec<TaskPatterns> {
    static PATTERNS: OnceLock<Vec<TaskPatterns>> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        TASKS
            .iter()
            .map(|task| {
                let phrase = task.phrase;
                TaskPatterns {
                    mention: Regex::new(&format!(r"(?i)\b{phrase}\b"))
                        .expect("add-on phrase compiles"),
                    hours_before: Regex::new(&format!(
                        r"(?i)\b{NUM}\s+(?:more\s+)?hours?\s+(?:of\s+|for\s+)?(?:the\s+)?{phrase}\b"
                    ))
                    .expect("add-on hours-before pattern compiles"),
                    hours_after: Regex::new(&format!(
                        r"(?i)\b{phrase}\b[\s,:]*(?:(?:is|will|be|take|takes|about|around|for|maybe|probably)\s+){{0,3}}{NUM}\s+hours?\b"
                    ))
                    .expect("add-on hours-after pattern compiles"),
                }
            })
            .collect()
    })
}

/// A billable task heard in the transcript with its hour count resolved.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AddOnMention {
    pub description: &'static str,
    pub hours: Decimal,
}

/// Tasks in the order they were first mentioned. The most recent stated hour
/// count wins; otherwise the task's default applies.
pub fn add_on_mentions(turns: &[Turn]) -> Vec<AddOnMention> {
    let mut first_seen = Vec::new();
    for (task, patterns) in TASKS.iter().zip(task_patterns()) {
        let first = turns.iter().find_map(|turn| {
            patterns.mention.find(&turn.text).map(|found| (turn.index, found.start()))
        });
        let Some(position) = first else {
            continue;
        };

        let hours = turns
            .iter()
            .rev()
            .find_map(|turn| {
                let after = patterns.hours_after.captures_iter(&turn.text).last();
                let before = patterns.hours_before.captures_iter(&turn.text).last();
                after.or(before).and_then(|captures| parse_number(&captures[1]))
            })
            .filter(|hours| *hours > Decimal::ZERO && *hours <= Decimal::from(200))
            .unwrap_or_else(|| Decimal::from(task.default_hours));

        first_seen.push((position, AddOnMention { description: task.description, hours }));
    }

    first_seen.sort_by_key(|(position, _)| *position);
    first_seen.into_iter().map(|(_, mention)| mention).collect()
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use rust_decimal::Decimal;

    use super::add_on_mentions;
    use crate::domain::draft::{ConversationEntry, SpeakerRole};
    use crate::extraction::rules::Turn;

    fn turns(messages: &[&str]) -> Vec<Turn> {
        let conversation = messages
            .iter()
            .map(|message| ConversationEntry {
                role: SpeakerRole::User,
                message: (*message).to_string(),
                timestamp: Utc::now(),
            })
            .collect::<Vec<_>>();
        Turn::from_conversation(&conversation)
    }

    fn summary(messages: &[&str]) -> Vec<(&'static str, Decimal)> {
        add_on_mentions(&turns(messages))
            .into_iter()
            .map(|mention| (mention.description, mention.hours))
            .collect()
    }

    #[test]
    fn hours_may_precede_or_follow_the_task() {
        assert_eq!(
            summary(&["4 hours of pressure washing", "carpentry will take about 6 hours"]),
            vec![("Pressure washing", Decimal::from(4)), ("Carpentry", Decimal::from(6))]
        );
    }

    #[test]
    fn missing_hours_use_task_defaults() {
        assert_eq!(
            summary(&["we need to strip the wallpaper in the bathroom", "and power wash the deck"]),
            vec![("Wallpaper removal", Decimal::from(4)), ("Pressure washing", Decimal::from(3))]
        );
    }

    #[test]
    fn later_hour_counts_replace_earlier_ones() {
        assert_eq!(
            summary(&["pressure washing, 2 hours", "actually 5 hours of pressure washing"]),
            vec![("Pressure washing", Decimal::from(5))]
        );
    }

    #[test]
    fn no_tasks_no_mentions() {
        assert!(summary(&["just the kitchen walls"]).is_empty());
    }
}

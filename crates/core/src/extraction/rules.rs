use regex::{Captures, Regex};

use crate::domain::draft::{ConversationEntry, SpeakerRole};

/// One conversation turn prepared for pattern matching.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Turn {
    pub index: usize,
    pub role: SpeakerRole,
    pub text: String,
}

impl Turn {
    pub fn from_conversation(conversation: &[ConversationEntry]) -> Vec<Turn> {
        conversation
            .iter()
            .enumerate()
            .map(|(index, entry)| Turn { index, role: entry.role, text: normalize(&entry.message) })
            .collect()
    }

    /// Customer-spoken turns only; indexes still refer to the full conversation.
    pub fn customer_turns(conversation: &[ConversationEntry]) -> Vec<Turn> {
        Self::from_conversation(conversation)
            .into_iter()
            .filter(|turn| turn.role == SpeakerRole::User)
            .collect()
    }
}

fn normalize(message: &str) -> String {
    message.replace(['\u{2019}', '\u{2018}'], "'").replace(['\u{201c}', '\u{201d}'], "\"")
}

/// A named pattern plus the function that turns a match into a value.
///
/// The extractor may reject a match (returning `None`), which lets a rule
/// guard against noise such as out-of-range numbers.
pub struct Rule<T> {
    pub name: &'static str,
    pattern: Regex,
    extract: fn(&Captures<'_>) -> Option<T>,
}

impl<T> Rule<T> {
    pub fn new(name: &'static str, pattern: &str, extract: fn(&Captures<'_>) -> Option<T>) -> Self {
        let pattern = Regex::new(pattern).expect("extraction rule patterns are static and valid");
        Self { name, pattern, extract }
    }

    /// Value of the last accepted match in `text`.
    pub fn last_in(&self, text: &str) -> Option<T> {
        self.pattern.captures_iter(text).filter_map(|captures| (self.extract)(&captures)).last()
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct RuleHit<T> {
    pub rule: &'static str,
    pub value: T,
    pub turn: usize,
}

impl<T> RuleHit<T> {
    /// Conversation length at which this evidence was available.
    pub fn observed_at(&self) -> usize {
        self.turn + 1
    }
}

/// Ordered alternatives for a single field; earlier rules take precedence.
pub struct RuleTable<T> {
    rules: Vec<Rule<T>>,
}

impl<T> RuleTable<T> {
    pub fn new(rules: Vec<Rule<T>>) -> Self {
        Self { rules }
    }

    pub fn rule_names(&self) -> Vec<&'static str> {
        self.rules.iter().map(|rule| rule.name).collect()
    }

    /// First rule (in table order) that produces a value for `text`.
    pub fn first_in(&self, text: &str) -> Option<(&'static str, T)> {
        self.rules.iter().find_map(|rule| rule.last_in(text).map(|value| (rule.name, value)))
    }

    /// Scans turns from the most recent backwards and returns the first hit.
    pub fn latest(&self, turns: &[Turn]) -> Option<RuleHit<T>> {
        turns.iter().rev().find_map(|turn| {
            self.first_in(&turn.text).map(|(rule, value)| RuleHit { rule, value, turn: turn.index })
        })
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::{Rule, RuleTable, Turn};
    use crate::domain::draft::{ConversationEntry, SpeakerRole};

    fn table() -> RuleTable<u32> {
        RuleTable::new(vec![
            Rule::new("exact", r"\bexactly (\d+)\b", |caps| caps[1].parse().ok()),
            Rule::new("loose", r"\babout (\d+)\b", |caps| {
                caps[1].parse().ok().filter(|value: &u32| *value < 100)
            }),
        ])
    }

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

    #[test]
    fn table_order_decides_within_a_turn() {
        let hit = table().first_in("about 4, exactly 7");
        assert_eq!(hit, Some(("exact", 7)));
    }

    #[test]
    fn last_accepted_match_wins_inside_a_rule() {
        let hit = table().first_in("about 4 or about 6 or about 500");
        assert_eq!(hit, Some(("loose", 6)));
    }

    #[test]
    fn latest_prefers_the_most_recent_turn() {
        let hit = table().latest(&turns(&["exactly 3", "nothing here", "about 9"])).expect("hit");
        assert_eq!((hit.rule, hit.value, hit.turn, hit.observed_at()), ("loose", 9, 2, 3));
    }

    #[test]
    fn customer_turns_keep_conversation_indexes() {
        let conversation = [
            (SpeakerRole::User, "for Ann Lee"),
            (SpeakerRole::Agent, "Interior or exterior?"),
            (SpeakerRole::User, "outside"),
        ]
        .iter()
        .map(|(role, message)| ConversationEntry {
            role: *role,
            message: (*message).to_string(),
            timestamp: Utc::now(),
        })
        .collect::<Vec<_>>();

        let spoken = Turn::customer_turns(&conversation);
        assert_eq!(spoken.iter().map(|turn| turn.index).collect::<Vec<_>>(), vec![0, 2]);
    }

    #[test]
    fn curly_apostrophes_are_normalized() {
        let prepared = turns(&["it\u{2019}s for the Smiths"]);
        assert_eq!(prepared[0].text, "it's for the Smiths");
    }
}

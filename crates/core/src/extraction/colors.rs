use std::sync::OnceLock;

use regex::Regex;

use super::rules::Turn;
use crate::domain::draft::ColorAssignment;

const COLORS: &[(&str, &str)] = &[
    ("Naval", "SW 6244"),
    ("Tricorn Black", "SW 6258"),
    ("Alabaster", "SW 7008"),
    ("Pure White", "SW 7005"),
    ("Extra White", "SW 7006"),
    ("Agreeable Gray", "SW 7029"),
    ("Repose Gray", "SW 7015"),
    ("Accessible Beige", "SW 7036"),
    ("Iron Ore", "SW 7069"),
    ("Sea Salt", "SW 6204"),
    ("Snowbound", "SW 7004"),
    ("Urbane Bronze", "SW 7048"),
    ("Mindful Gray", "SW 7016"),
    ("Evergreen Fog", "SW 9130"),
    ("Greek Villa", "SW 7551"),
    ("Dover White", "SW 6385"),
    ("Peppercorn", "SW 7674"),
    ("Worldly Gray", "SW 7043"),
];

const QUALIFIERS: &[(&str, &str)] = &[
    ("body", "body"),
    ("trim", "trim"),
    ("door", "door"),
    ("doors", "door"),
    ("exterior", "exterior"),
    ("walls", "walls"),
    ("ceiling", "ceiling"),
    ("ceilings", "ceiling"),
    ("accent", "accent"),
    ("siding", "siding"),
    ("shutters", "shutters"),
];

const SCAN_WINDOW: usize = 4;
const CLAUSE_BREAKS: &[&str] = &["and", "but", "with", ",", ".", ";", "!", "?"];

fn name_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        let mut names = COLORS.iter().map(|(name, _)| *name).collect::<Vec<_>>();
        names.sort_by(|left, right| right.len().cmp(&left.len()));
        let alternation = names
            .iter()
            .map(|name| regex::escape(&name.to_ascii_lowercase()).replace("gray", "gr[ae]y"))
            .map(|name| name.replace(' ', r"\s+"))
            .collect::<Vec<_>>()
            .join("|");
        Regex::new(&format!(r"(?i)\b({alternation})\b")).expect("color names compile")
    })
}

fn code_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"(?i)\b(?:sw|sherwin[\s-]williams)\s*#?\s*(\d{4})\b")
            .expect("color code pattern compiles")
    })
}

fn lookup(spoken: &str) -> Option<(&'static str, &'static str)> {
    let normalized = spoken
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_ascii_lowercase()
        .replace("grey", "gray");
    COLORS.iter().copied().find(|(name, _)| name.to_ascii_lowercase() == normalized)
}

/// Color assignments in transcript order. Named colors pick up the nearest
/// area qualifier; bare codes are recorded verbatim under "general".
pub fn color_assignments(turns: &[Turn]) -> Vec<ColorAssignment> {
    let mut assignments: Vec<ColorAssignment> = Vec::new();

    for turn in turns {
        let mut mentions = Vec::new();
        for captures in name_pattern().captures_iter(&turn.text) {
            let Some(whole) = captures.get(0) else {
                continue;
            };
            if let Some((name, code)) = lookup(whole.as_str()) {
                let area = qualifier_near(&turn.text, whole.start(), whole.end());
                mentions.push((
                    whole.start(),
                    ColorAssignment {
                        area: area.unwrap_or("general").to_string(),
                        color: name.to_string(),
                        sw_code: code.to_string(),
                    },
                ));
            }
        }
        for captures in code_pattern().captures_iter(&turn.text) {
            let Some(whole) = captures.get(0) else {
                continue;
            };
            let code = format!("SW {}", &captures[1]);
            mentions.push((
                whole.start(),
                ColorAssignment { area: "general".to_string(), color: code.clone(), sw_code: code },
            ));
        }

        mentions.sort_by_key(|(position, _)| *position);
        for (_, assignment) in mentions {
            if !assignments.iter().any(|existing| existing.duplicates(&assignment)) {
                assignments.push(assignment);
            }
        }
    }

    assignments
}

/// Nearest qualifier within the scan window on either side of the mention,
/// stopping at clause breaks. Ties go to the following word.
fn qualifier_near(text: &str, start: usize, end: usize) -> Option<&'static str> {
    let before = tokens(&text[..start]);
    let after = tokens(&text[end..]);

    let scan = |tokens: &mut dyn Iterator<Item = String>| -> Option<(usize, &'static str)> {
        for (distance, token) in tokens.take(SCAN_WINDOW).enumerate() {
            if CLAUSE_BREAKS.contains(&token.as_str()) {
                return None;
            }
            if let Some((_, area)) = QUALIFIERS.iter().find(|(word, _)| *word == token) {
                return Some((distance, *area));
            }
        }
        None
    };

    let following = scan(&mut after.into_iter());
    let preceding = scan(&mut before.into_iter().rev());
    match (preceding, following) {
        (Some((back, area)), Some((ahead, _))) if back < ahead => Some(area),
        (_, Some((_, area))) => Some(area),
        (Some((_, area)), None) => Some(area),
        (None, None) => None,
    }
}

fn tokens(text: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut word = String::new();
    for character in text.chars() {
        if character.is_ascii_alphanumeric() || character == '\'' || character == '-' {
            word.push(character.to_ascii_lowercase());
            continue;
        }
        if !word.is_empty() {
            tokens.push(std::mem::take(&mut word));
        }
        if matches!(character, ',' | '.' | ';' | '!' | '?') {
            tokens.push(character.to_string());
        }
    }
    if !word.is_empty() {
        tokens.push(word);
    }
    tokens
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::color_assignments;
    use crate::domain::draft::{ColorAssignment, ConversationEntry, SpeakerRole};
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

    fn pairs(assignments: &[ColorAssignment]) -> Vec<(&str, &str, &str)> {
        assignments
            .iter()
            .map(|a| (a.area.as_str(), a.color.as_str(), a.sw_code.as_str()))
            .collect()
    }

    #[test]
    fn bare_code_is_recorded_under_general() {
        let found = color_assignments(&turns(&["let's go with SW 6244", "Naval it is"]));
        assert_eq!(pairs(&found), vec![("general", "SW 6244", "SW 6244")]);
    }

    #[test]
    fn named_colors_take_the_nearest_qualifier() {
        let found = color_assignments(&turns(&[
            "Naval for the body and Alabaster on the trim",
            "front door in Tricorn Black",
        ]));
        assert_eq!(
            pairs(&found),
            vec![
                ("body", "Naval", "SW 6244"),
                ("trim", "Alabaster", "SW 7008"),
                ("door", "Tricorn Black", "SW 6258"),
            ]
        );
    }

    #[test]
    fn qualifier_scan_stops_at_clause_breaks() {
        let found = color_assignments(&turns(&["the trim, then agreeable grey"]));
        assert_eq!(pairs(&found), vec![("general", "Agreeable Gray", "SW 7029")]);
    }

    #[test]
    fn codes_are_normalized_and_deduplicated() {
        let found = color_assignments(&turns(&["sherwin williams #7008 and SW7008 again"]));
        assert_eq!(pairs(&found), vec![("general", "SW 7008", "SW 7008")]);
    }
}

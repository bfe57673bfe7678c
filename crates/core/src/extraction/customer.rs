use std::sync::OnceLock;

use regex::{Captures, Regex};

use super::rules::{Rule, RuleHit, RuleTable, Turn};
use crate::domain::draft::{ProjectType, SpeakerRole};

const NAME: &str = r"([A-Z][A-Za-z'\-]*(?:[ \t]+[A-Z][A-Za-z'\-]*){0,2})";

/// Capitalized words that follow "for" in painting talk but are never names.
const NAME_DENYLIST: &[&str] = &[
    "a", "i", "sw", "sherwin", "williams", "benjamin", "moore", "behr", "ppg", "valspar",
    "duration", "emerald", "superpaint", "cashmere", "promar", "proclassic", "loxon", "harmony",
    "captivate", "naval", "alabaster", "tricorn", "agreeable", "repose", "accessible", "iron",
    "sea", "snowbound", "urbane", "mindful", "evergreen", "greek", "dover", "peppercorn", "worldly",
    "white", "black", "gray", "grey", "blue", "green", "red", "beige", "monday", "tuesday",
    "wednesday", "thursday", "friday", "saturday", "sunday", "kitchen", "bedroom", "bathroom",
    "living", "dining", "body", "trim", "exterior", "interior", "both", "the", "this", "that",
    "it", "my", "our", "now", "today", "tomorrow", "labor", "paint", "primer", "estimate",
];

pub fn name_rules() -> &'static RuleTable<String> {
    static TABLE: OnceLock<RuleTable<String>> = OnceLock::new();
    TABLE.get_or_init(|| {
        RuleTable::new(vec![
            Rule::new(
                "customer_is",
                &format!(r"(?i:\b(?:customer|client)(?:'s name| name)?(?: is|'s))\s+{NAME}"),
                clean_name,
            ),
            Rule::new(
                "name_is",
                &format!(r"(?i:\b(?:their|his|her) name is)\s+{NAME}"),
                clean_name,
            ),
            Rule::new("its_for_the", &format!(r"(?i:\bit'?s for the)\s+{NAME}"), clean_name),
            Rule::new("for", &format!(r"(?i:\bfor)\s+{NAME}"), clean_name),
        ])
    })
}

fn clean_name(captures: &Captures<'_>) -> Option<String> {
    let tokens = captures[1]
        .split_whitespace()
        .map(|token| token.strip_suffix("'s").unwrap_or(token).trim_matches('\''))
        .take_while(|token| !NAME_DENYLIST.contains(&token.to_ascii_lowercase().as_str()))
        .filter(|token| !token.is_empty())
        .collect::<Vec<_>>();
    if tokens.is_empty() {
        None
    } else {
        Some(tokens.join(" "))
    }
}

const STREET_SUFFIX: &str = r"(?:street|st|avenue|ave|drive|dr|road|rd|lane|ln|court|ct|boulevard|blvd|way|place|pl|circle|cir|terrace|parkway|pkwy|trail|highway|hwy)";

/// Words that show a number is a quantity rather than a house number.
const QUANTITY_WORDS: &[&str] = &[
    "gallon", "gallons", "day", "days", "week", "weeks", "hour", "hours", "guys", "painters",
    "people", "workers", "rooms", "coats", "feet", "dollars", "bucks", "percent",
];

pub fn address_rules() -> &'static RuleTable<String> {
    static TABLE: OnceLock<RuleTable<String>> = OnceLock::new();
    TABLE.get_or_init(|| {
        RuleTable::new(vec![
            Rule::new("address_is", r"(?i)\baddress is\s+(\d[^,.;!?]*)", |caps| {
                let address = caps[1].trim();
                (address.split_whitespace().count() >= 2).then(|| address.to_string())
            }),
            Rule::new(
                "house_number_street",
                &format!(r"(?i)\b(\d{{1,6}}(?:\s+[A-Za-z0-9']+){{1,4}}?\s+{STREET_SUFFIX})\b\.?"),
                |caps| {
                    let address = caps[1].trim();
                    let is_quantity = address
                        .split_whitespace()
                        .skip(1)
                        .any(|word| QUANTITY_WORDS.contains(&word.to_ascii_lowercase().as_str()));
                    (!is_quantity).then(|| address.to_string())
                },
            ),
        ])
    })
}

pub fn phone_rules() -> &'static RuleTable<String> {
    static TABLE: OnceLock<RuleTable<String>> = OnceLock::new();
    TABLE.get_or_init(|| {
        RuleTable::new(vec![Rule::new(
            "north_american_phone",
            r"(?:\((\d{3})\)\s?|\b(\d{3})[-.\s])(\d{3})[-.\s](\d{4})\b",
            |caps| {
                let area = caps.get(1).or_else(|| caps.get(2))?.as_str();
                Some(format!("({area}) {}-{}", &caps[3], &caps[4]))
            },
        )])
    })
}

pub fn email_rules() -> &'static RuleTable<String> {
    static TABLE: OnceLock<RuleTable<String>> = OnceLock::new();
    TABLE.get_or_init(|| {
        RuleTable::new(vec![
            Rule::new(
                "written_email",
                r"(?i)\b([a-z0-9._%+-]+@[a-z0-9-]+(?:\.[a-z0-9-]+)*\.[a-z]{2,})\b",
                |caps| Some(caps[1].to_ascii_lowercase()),
            ),
            Rule::new(
                "spoken_email",
                r"(?i)\b([a-z0-9._-]+) at ([a-z0-9-]+) dot (com|net|org|edu|us|io)\b",
                |caps| {
                    Some(format!("{}@{}.{}", &caps[1], &caps[2], &caps[3]).to_ascii_lowercase())
                },
            ),
        ])
    })
}

const INTERIOR_TOKENS: &[&str] = &["interior", "inside", "indoor", "indoors"];
const EXTERIOR_TOKENS: &[&str] = &["exterior", "outside", "outdoor", "outdoors"];
const INTERIOR_VOCABULARY: &[&str] = &[
    "kitchen", "bedroom", "bedrooms", "bathroom", "bathrooms", "living room", "dining room",
    "hallway", "ceiling", "ceilings", "cabinets", "closet", "drywall", "baseboards", "basement",
];
const EXTERIOR_VOCABULARY: &[&str] = &[
    "siding", "deck", "fence", "shutters", "porch", "garage door", "soffit", "soffits", "fascia",
    "stucco", "gutters", "eaves",
];

/// Keyword presence test over customer-spoken turns. The agent's own
/// "interior or exterior?" question never decides the type.
pub fn project_type(turns: &[Turn]) -> Option<RuleHit<ProjectType>> {
    let mut seen = Seen::default();
    for turn in turns.iter().filter(|turn| turn.role == SpeakerRole::User) {
        let text = turn.text.to_ascii_lowercase();
        let words = words(&text);
        let has_word = |list: &[&str]| list.iter().any(|token| words.contains(token));
        let has_phrase = |list: &[&str]| list.iter().any(|phrase| contains_phrase(&text, phrase));

        mark(has_word(INTERIOR_TOKENS), &mut seen.interior_token, turn.index);
        mark(has_word(EXTERIOR_TOKENS), &mut seen.exterior_token, turn.index);
        mark(has_phrase(INTERIOR_VOCABULARY), &mut seen.interior_vocab, turn.index);
        mark(has_phrase(EXTERIOR_VOCABULARY), &mut seen.exterior_vocab, turn.index);
    }

    let (rule, value, turns) = match seen {
        Seen { interior_token: Some(a), exterior_token: Some(b), .. } => {
            ("interior_and_exterior", ProjectType::Both, [a, b])
        }
        Seen { exterior_token: Some(a), .. } => ("exterior", ProjectType::Exterior, [a, a]),
        Seen { interior_token: Some(a), .. } => ("interior", ProjectType::Interior, [a, a]),
        Seen { interior_vocab: Some(a), exterior_vocab: Some(b), .. } => {
            ("mixed_vocabulary", ProjectType::Both, [a, b])
        }
        Seen { exterior_vocab: Some(a), .. } => {
            ("exterior_vocabulary", ProjectType::Exterior, [a, a])
        }
        Seen { interior_vocab: Some(a), .. } => {
            ("interior_vocabulary", ProjectType::Interior, [a, a])
        }
        _ => return None,
    };
    Some(RuleHit { rule, value, turn: turns[0].max(turns[1]) })
}

#[derive(Clone, Copy, Default)]
struct Seen {
    interior_token: Option<usize>,
    exterior_token: Option<usize>,
    interior_vocab: Option<usize>,
    exterior_vocab: Option<usize>,
}

fn mark(present: bool, slot: &mut Option<usize>, turn: usize) {
    if present {
        *slot = Some(turn);
    }
}

fn words(text: &str) -> Vec<&str> {
    text.split(|character: char| !character.is_ascii_alphanumeric())
        .filter(|word| !word.is_empty())
        .collect()
}

fn contains_phrase(text: &str, phrase: &str) -> bool {
    static BOUNDARY: OnceLock<Regex> = OnceLock::new();
    let boundary =
        BOUNDARY.get_or_init(|| Regex::new(r"[^a-z0-9]+").expect("valid boundary regex"));
    let padded = format!(" {} ", boundary.replace_all(text, " "));
    padded.contains(&format!(" {phrase} "))
}
